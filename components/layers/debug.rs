/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A simple indenting tree dumper for debugging layer trees, driven by the
//! `dump_layer_tree` debug option and emitted through `log`.

use log::debug;

use crate::layer::{LayerFlags, LayerId};
use crate::tree::LayerTree;

/// Prints subsequent items nested under a tree of levels. Text goes to the
/// `log` output at debug level.
pub struct PrintTree {
    /// The current level of recursion.
    level: u32,
    /// An item which is queued up, so that it only prints as a level when
    /// it turns out to have children.
    queued_item: Option<String>,
}

impl PrintTree {
    pub fn new(title: &str) -> PrintTree {
        debug!("\u{250c} {}", title);
        PrintTree {
            level: 1,
            queued_item: None,
        }
    }

    /// Descend one level in the tree with the given title.
    pub fn new_level(&mut self, title: String) {
        self.flush_queued_item("\u{251C}\u{2500}");
        debug!("{}\u{251C}\u{2500} {}", self.level_prefix(), title);
        self.level += 1;
    }

    /// Ascend one level in the tree.
    pub fn end_level(&mut self) {
        self.flush_queued_item("\u{2514}\u{2500}");
        self.level -= 1;
    }

    /// Add an item to the current level in the tree.
    pub fn add_item(&mut self, text: String) {
        self.flush_queued_item("\u{251C}\u{2500}");
        self.queued_item = Some(text);
    }

    fn level_prefix(&self) -> String {
        let mut prefix = String::new();
        for _ in 0..self.level {
            prefix.push_str("\u{2502}  ");
        }
        prefix
    }

    fn flush_queued_item(&mut self, prefix: &str) {
        if let Some(queued_item) = self.queued_item.take() {
            debug!("{}{} {}", self.level_prefix(), prefix, queued_item);
        }
    }
}

impl Drop for PrintTree {
    fn drop(&mut self) {
        self.flush_queued_item("\u{2514}\u{2500}");
    }
}

pub(crate) fn dump_layer_tree(tree: &LayerTree) {
    let root = match tree.root() {
        Some(root) => root,
        None => return,
    };
    let mut print_tree = PrintTree::new("Layer tree");
    dump_layer(tree, root, &mut print_tree);
}

fn dump_layer(tree: &LayerTree, id: LayerId, print_tree: &mut PrintTree) {
    print_tree.new_level(describe_layer(tree, id));
    for child in tree.children(id) {
        dump_layer(tree, child, print_tree);
    }
    if let Some(reflection) = tree.layer(id).reflection() {
        print_tree.add_item(format!("reflection: {:?}", reflection));
    }
    print_tree.end_level();
}

fn describe_layer(tree: &LayerTree, id: LayerId) -> String {
    let layer = tree.layer(id);
    let mut description = format!(
        "{:?} origin={:?} size={:?} z={:?}",
        id,
        layer.info().origin,
        layer.info().size,
        layer.info().z_index,
    );
    if tree.is_stacking_context(id) {
        description.push_str(" (stacking context)");
    }
    if layer.flags().contains(LayerFlags::HAS_OVERFLOW_CONTROLS) {
        description.push_str(" (overflow controls)");
    }
    if !layer.has_visible_content() {
        description.push_str(" (hidden)");
    }
    description
}
