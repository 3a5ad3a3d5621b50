/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The z-order engine. Every stacking context owns two buckets of descendant
//! stacking contexts, split by z-index sign and stable-sorted by z-index so
//! equal values keep source order, per CSS 2.1 Appendix E. Layers that do
//! not stack are painted inline through their parent's normal-flow list and
//! are never bucketed; collection recurses straight through them.
//!
//! Lists are rebuilt in full when dirty, never patched incrementally, and
//! dirtying touches only the nearest enclosing stacking context: no other
//! context's buckets can be affected by a change below it.

use log::{debug, log_enabled, Level};

use crate::layer::{LayerFlags, LayerId, ZOrderLists};
use crate::tree::LayerTree;

/// Recomputes the z-order buckets and the normal-flow list of every layer
/// that needs it, in one pre-order pass. Called before each traversal.
pub(crate) fn update_layer_lists(tree: &mut LayerTree, id: LayerId) {
    if tree.is_stacking_context(id) &&
        tree.layer(id).flags().contains(LayerFlags::Z_ORDER_DIRTY)
    {
        rebuild_z_order_lists(tree, id);
    }
    if tree.layer(id).flags().contains(LayerFlags::NORMAL_FLOW_DIRTY) {
        update_normal_flow_list(tree, id);
    }
    for child in tree.child_ids(id) {
        update_layer_lists(tree, child);
    }
    if let Some(reflection) = tree.layer(id).reflection() {
        update_layer_lists(tree, reflection);
    }
}

/// Rebuilds both buckets of a stacking context from scratch.
pub(crate) fn rebuild_z_order_lists(tree: &mut LayerTree, id: LayerId) {
    debug_assert!(tree.is_stacking_context(id));
    debug_assert!(tree.layer(id).flags().contains(LayerFlags::Z_ORDER_DIRTY));

    let mut positive = Vec::new();
    let mut negative = Vec::new();
    let include_hidden = tree.requires_hidden_layers();
    // The reflection child is painted separately by its host and is not in
    // the child list, so iteration naturally skips it.
    for child in tree.child_ids(id) {
        collect_layers(tree, child, include_hidden, &mut positive, &mut negative);
    }

    // Stable by construction: ties keep collection order, which is source
    // order, as same-z-index siblings must paint in document order.
    positive.sort_by_key(|&layer| tree.layer(layer).effective_z_index());
    negative.sort_by_key(|&layer| tree.layer(layer).effective_z_index());

    if log_enabled!(Level::Debug) && tree.debug.dump_z_order_lists {
        debug!(
            "z-order lists for {:?}: negative {:?} positive {:?}",
            id, negative, positive
        );
    }

    let layer = tree.layer_mut(id);
    layer.z_order = Some(ZOrderLists { negative, positive });
    layer.flags.remove(LayerFlags::Z_ORDER_DIRTY);
}

/// Appends `id` to the bucket of its nearest stacking-context ancestor, or
/// recurses through it when it does not stack itself. Invisible subtrees are
/// skipped entirely unless the tree is tracking hidden layers, which is what
/// makes them free during the z-order walk.
fn collect_layers(
    tree: &mut LayerTree,
    id: LayerId,
    include_hidden: bool,
    positive: &mut Vec<LayerId>,
    negative: &mut Vec<LayerId>,
) {
    tree.update_descendant_visibility(id);

    if tree.is_stacking_context(id) {
        let layer = tree.layer(id);
        let include =
            include_hidden || layer.has_visible_content() || layer.has_visible_descendant();
        if include {
            if layer.effective_z_index() < 0 {
                negative.push(id);
            } else {
                positive.push(id);
            }
        }
        // Its descendants belong to its own lists, not the caller's.
        return;
    }

    for child in tree.child_ids(id) {
        collect_layers(tree, child, include_hidden, positive, negative);
    }
}

/// Rebuilds the list of direct children painted inline with this layer's
/// foreground phase.
pub(crate) fn update_normal_flow_list(tree: &mut LayerTree, id: LayerId) {
    let mut normal_flow = Vec::new();
    for child in tree.child_ids(id) {
        if !tree.is_stacking_context(child) {
            normal_flow.push(child);
        }
    }
    let layer = tree.layer_mut(id);
    layer.normal_flow = normal_flow;
    layer.flags.remove(LayerFlags::NORMAL_FLOW_DIRTY);
}

/// Marks the given stacking context's own lists dirty.
pub(crate) fn dirty_z_order_lists(tree: &mut LayerTree, id: LayerId) {
    if tree.is_stacking_context(id) {
        tree.layer_mut(id).flags.insert(LayerFlags::Z_ORDER_DIRTY);
    }
    tree.layer_mut(id)
        .flags
        .insert(LayerFlags::NORMAL_FLOW_DIRTY);
}

/// Marks the lists of the nearest strict-ancestor stacking context dirty.
/// Only that context's buckets can contain `id`, so dirtying stops there.
pub(crate) fn dirty_stacking_context_z_order_lists(tree: &mut LayerTree, id: LayerId) {
    if let Some(context) = tree.stacking_context_ancestor(id) {
        dirty_z_order_lists(tree, context);
    }
}

/// Dirties every list in the subtree. Used when a tree-wide collection
/// policy (hidden-layer tracking) changes.
pub(crate) fn dirty_z_order_lists_recursive(tree: &mut LayerTree, id: LayerId) {
    dirty_z_order_lists(tree, id);
    for child in tree.child_ids(id) {
        dirty_z_order_lists_recursive(tree, child);
    }
    if let Some(reflection) = tree.layer(id).reflection() {
        dirty_z_order_lists_recursive(tree, reflection);
    }
}
