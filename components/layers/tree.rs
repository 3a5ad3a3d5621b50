/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The layer tree. A slab arena owns every [`Layer`]; parents own the tree
//! structure through sibling links. The two ancestor relations the rest of
//! the crate needs (nearest stacking context, offset to an ancestor) are
//! computed by walking the real tree, never stored separately.
//!
//! Structural mutation is forbidden while a paint or hit-test traversal is
//! active; removals requested mid-walk are queued and performed when the
//! outermost traversal ends.

use app_units::Au;
use euclid::default::{Point2D, Rect, Size2D, Vector2D};
use log::debug;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::graphics::OverflowControlHost;
use crate::layer::{Layer, LayerFlags, LayerId, LayerInfo, PositionScheme, ZOrderLists};
use crate::scroll::{self, OverflowControls};
use crate::stacking;

/// Debug switches in the spirit of the `-Z` dump options: when set, tree and
/// z-order dumps go to the `log` output after each pre-traversal update.
#[derive(Clone, Copy, Debug, Default)]
pub struct DebugOptions {
    pub dump_layer_tree: bool,
    pub dump_z_order_lists: bool,
}

pub struct LayerTree {
    slots: Vec<Option<Layer>>,
    free_slots: Vec<usize>,
    root: Option<LayerId>,
    /// Bumped on structural changes; clip cache entries from older
    /// generations never answer lookups.
    clip_generation: u64,
    traversal_depth: u32,
    pending_removals: Vec<LayerId>,
    /// When true, z-order collection keeps layers with no visible content so
    /// an off-screen compositor can still observe them.
    requires_hidden_layers: bool,
    pub debug: DebugOptions,
    pub(crate) overflow_controls: FxHashMap<LayerId, OverflowControls>,
}

impl LayerTree {
    pub fn new() -> LayerTree {
        LayerTree::with_debug_options(DebugOptions::default())
    }

    pub fn with_debug_options(debug: DebugOptions) -> LayerTree {
        LayerTree {
            slots: Vec::new(),
            free_slots: Vec::new(),
            root: None,
            clip_generation: 0,
            traversal_depth: 0,
            pending_removals: Vec::new(),
            requires_hidden_layers: false,
            debug,
            overflow_controls: FxHashMap::default(),
        }
    }

    pub fn root(&self) -> Option<LayerId> {
        self.root
    }

    pub fn layer(&self, id: LayerId) -> &Layer {
        self.slots[id.0].as_ref().expect("stale layer id")
    }

    pub(crate) fn layer_mut(&mut self, id: LayerId) -> &mut Layer {
        self.slots[id.0].as_mut().expect("stale layer id")
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.slots.get(id.0).is_some_and(|slot| slot.is_some())
    }

    pub(crate) fn clip_generation(&self) -> u64 {
        self.clip_generation
    }

    pub fn set_requires_hidden_layers(&mut self, required: bool) {
        if self.requires_hidden_layers != required {
            self.requires_hidden_layers = required;
            if let Some(root) = self.root {
                stacking::dirty_z_order_lists_recursive(self, root);
            }
        }
    }

    pub(crate) fn requires_hidden_layers(&self) -> bool {
        self.requires_hidden_layers
    }

    /// Layers of the tree, root included, in no particular order.
    pub fn layer_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    // Structure.

    fn allocate(&mut self, layer: Layer) -> LayerId {
        match self.free_slots.pop() {
            Some(index) => {
                self.slots[index] = Some(layer);
                LayerId(index)
            },
            None => {
                self.slots.push(Some(layer));
                LayerId(self.slots.len() - 1)
            },
        }
    }

    pub fn create_root(&mut self, info: LayerInfo) -> LayerId {
        self.assert_mutation_allowed();
        debug_assert!(self.root.is_none(), "tree already has a root");
        let id = self.allocate(Layer::new(info));
        self.root = Some(id);
        self.update_self_painting(id);
        debug!("created root layer {:?}", id);
        id
    }

    /// Creates a layer as the last child of `parent`.
    pub fn create_layer(&mut self, parent: LayerId, info: LayerInfo) -> LayerId {
        self.create_layer_before(parent, None, info)
    }

    /// Creates a layer as a child of `parent`, in front of `before` (or last
    /// when `before` is `None`).
    pub fn create_layer_before(
        &mut self,
        parent: LayerId,
        before: Option<LayerId>,
        info: LayerInfo,
    ) -> LayerId {
        self.assert_mutation_allowed();
        let id = self.allocate(Layer::new(info));
        self.link_child(parent, before, id);
        if self.layer(id).establishes_stacking_context() {
            self.layer_mut(id).z_order = Some(ZOrderLists::default());
        }
        self.update_self_painting(id);
        self.note_child_list_changed(parent);
        debug!("created layer {:?} under {:?}", id, parent);
        id
    }

    /// Attaches a reflection layer to `host`. The reflection lives outside
    /// the sibling list and outside z-order collection; painting visits it
    /// through its host only.
    pub fn attach_reflection(&mut self, host: LayerId, info: LayerInfo) -> LayerId {
        self.assert_mutation_allowed();
        debug_assert!(
            self.layer(host).reflection.is_none(),
            "layer already has a reflection"
        );
        let id = self.allocate(Layer::new(info));
        {
            let layer = self.layer_mut(id);
            layer.parent = Some(host);
            layer.flags.insert(LayerFlags::IS_REFLECTION);
        }
        self.layer_mut(host).reflection = Some(id);
        self.update_self_painting(id);
        // Gaining a reflection makes the host a stacking context.
        self.note_stacking_context_status(host);
        self.note_child_list_changed(host);
        id
    }

    /// Removes a layer. Its children are re-parented to the nearest
    /// surviving ancestor in place of the removed layer, preserving order;
    /// layers below a removed layer never disappear from the tree. During an
    /// active traversal the removal is deferred to the end of the walk.
    pub fn remove_layer(&mut self, id: LayerId) {
        if self.traversal_depth > 0 {
            debug!("deferring removal of {:?} until traversal ends", id);
            self.pending_removals.push(id);
            return;
        }
        self.remove_layer_now(id);
    }

    fn remove_layer_now(&mut self, id: LayerId) {
        if !self.contains(id) {
            return;
        }

        if let Some(reflection) = self.layer(id).reflection {
            self.layer_mut(id).reflection = None;
            self.remove_layer_now(reflection);
        }

        let parent = self.layer(id).parent;
        let origin = self.layer(id).info.origin.to_vector();
        let children = self.child_ids(id);

        match parent {
            Some(parent) => {
                let next = self.layer(id).next_sibling;
                self.unlink_child(id);
                for &child in &children {
                    self.unlink_child(child);
                    // Keep the child where it was on screen: fold the removed
                    // layer's offset into the child until layout resupplies
                    // geometry.
                    let child_layer = self.layer_mut(child);
                    child_layer.info.origin += origin;
                    self.link_child(parent, next, child);
                }
                self.note_child_list_changed(parent);
            },
            None => {
                // Removing the root takes the whole tree with it. Children
                // removed one by one re-parent their own children into the
                // root's list, so keep draining until it is empty.
                debug!("removing root layer {:?}", id);
                while let Some(child) = self.layer(id).first_child {
                    self.remove_layer_now(child);
                }
                self.root = None;
            },
        }

        self.overflow_controls.remove(&id);
        self.clip_generation += 1;
        self.slots[id.0] = None;
        self.free_slots.push(id.0);
        debug!("removed layer {:?}", id);
    }

    fn link_child(&mut self, parent: LayerId, before: Option<LayerId>, id: LayerId) {
        {
            let layer = self.layer_mut(id);
            layer.parent = Some(parent);
            layer.next_sibling = before;
        }
        match before {
            Some(before) => {
                let prev = self.layer(before).prev_sibling;
                self.layer_mut(id).prev_sibling = prev;
                self.layer_mut(before).prev_sibling = Some(id);
                match prev {
                    Some(prev) => self.layer_mut(prev).next_sibling = Some(id),
                    None => self.layer_mut(parent).first_child = Some(id),
                }
            },
            None => {
                let last = self.layer(parent).last_child;
                self.layer_mut(id).prev_sibling = last;
                match last {
                    Some(last) => self.layer_mut(last).next_sibling = Some(id),
                    None => self.layer_mut(parent).first_child = Some(id),
                }
                self.layer_mut(parent).last_child = Some(id);
            },
        }
    }

    fn unlink_child(&mut self, id: LayerId) {
        let (parent, prev, next) = {
            let layer = self.layer(id);
            (layer.parent, layer.prev_sibling, layer.next_sibling)
        };
        match prev {
            Some(prev) => self.layer_mut(prev).next_sibling = next,
            None => {
                if let Some(parent) = parent {
                    self.layer_mut(parent).first_child = next;
                }
            },
        }
        match next {
            Some(next) => self.layer_mut(next).prev_sibling = prev,
            None => {
                if let Some(parent) = parent {
                    self.layer_mut(parent).last_child = prev;
                }
            },
        }
        let layer = self.layer_mut(id);
        layer.parent = None;
        layer.prev_sibling = None;
        layer.next_sibling = None;
    }

    pub(crate) fn child_ids(&self, id: LayerId) -> SmallVec<[LayerId; 8]> {
        let mut children = SmallVec::new();
        let mut cursor = self.layer(id).first_child;
        while let Some(child) = cursor {
            children.push(child);
            cursor = self.layer(child).next_sibling;
        }
        children
    }

    pub fn children(&self, id: LayerId) -> ChildLayers {
        ChildLayers {
            tree: self,
            next: self.layer(id).first_child,
        }
    }

    // Lookup relations. These walk the real tree every time; they are never
    // stored, so they cannot desynchronize from it.

    /// Whether `id` is a stacking context: the root always is, everything
    /// else by style.
    pub fn is_stacking_context(&self, id: LayerId) -> bool {
        self.root == Some(id) || self.layer(id).establishes_stacking_context()
    }

    /// The nearest strict ancestor that is a stacking context.
    pub fn stacking_context_ancestor(&self, id: LayerId) -> Option<LayerId> {
        let mut cursor = self.layer(id).parent;
        while let Some(ancestor) = cursor {
            if self.is_stacking_context(ancestor) {
                return Some(ancestor);
            }
            cursor = self.layer(ancestor).parent;
        }
        None
    }

    /// `id` itself when it is a stacking context, otherwise its nearest
    /// stacking context ancestor.
    pub fn enclosing_stacking_context(&self, id: LayerId) -> LayerId {
        if self.is_stacking_context(id) {
            return id;
        }
        self.stacking_context_ancestor(id)
            .unwrap_or_else(|| self.root.expect("tree has no root"))
    }

    /// The offset from `ancestor`'s origin to `id`'s origin, accounting for
    /// scroll offsets of the containers in between. Fixed-position layers do
    /// not move with their scrolling containers.
    pub fn offset_from_ancestor(&self, id: LayerId, ancestor: LayerId) -> Vector2D<Au> {
        let mut offset = Vector2D::zero();
        let mut cursor = id;
        while cursor != ancestor {
            let layer = self.layer(cursor);
            offset += layer.info.origin.to_vector();
            let parent = match layer.parent {
                Some(parent) => parent,
                None => break,
            };
            if self.layer(parent).scrolls_overflow() &&
                layer.info.position != PositionScheme::Fixed
            {
                offset -= self.layer(parent).scroll_offset;
            }
            cursor = parent;
        }
        offset
    }

    /// A coarse bound on everything this subtree can paint, in `id`'s local
    /// coordinates. Transforms of descendants are ignored; this is only used
    /// to skip subtrees that cannot intersect the dirty rectangle.
    pub fn subtree_bounds(&self, id: LayerId) -> Rect<Au> {
        let layer = self.layer(id);
        let bounds = layer.local_bounds().union(&layer.local_overflow());

        let mut descendants: Option<Rect<Au>> = None;
        let mut union_in = |rect: Rect<Au>| {
            descendants = Some(match descendants {
                Some(so_far) => so_far.union(&rect),
                None => rect,
            });
        };
        let mut cursor = layer.first_child;
        while let Some(child) = cursor {
            let child_layer = self.layer(child);
            union_in(
                self.subtree_bounds(child)
                    .translate(child_layer.info.origin.to_vector() - layer.scroll_offset),
            );
            cursor = child_layer.next_sibling;
        }
        if let Some(reflection) = layer.reflection {
            let reflection_layer = self.layer(reflection);
            union_in(
                self.subtree_bounds(reflection)
                    .translate(reflection_layer.info.origin.to_vector()),
            );
        }

        let mut descendants = descendants.unwrap_or_else(Rect::zero);
        if layer.clips_overflow() {
            descendants = descendants
                .intersection(&layer.local_bounds())
                .unwrap_or_else(Rect::zero);
        }
        bounds.union(&descendants)
    }

    /// The transform that maps `id`'s local coordinates into `root`'s,
    /// combining the layer's own matrix with its offset from `root`. `None`
    /// when the layer has no transform.
    pub(crate) fn layer_transform(
        &self,
        id: LayerId,
        root: LayerId,
    ) -> Option<euclid::default::Transform3D<f32>> {
        let transform = self.layer(id).info().transform?;
        let offset = crate::geometry::au_vector_to_f32_vector(self.offset_from_ancestor(id, root));
        Some(transform.then_translate(euclid::default::Vector3D::new(offset.x, offset.y, 0.0)))
    }

    /// The nearest non-stacking-context ancestor of `child` that establishes
    /// a multicolumn container, if any, stopping at `root` and at stacking
    /// contexts. Such a child is painted and probed once per column stripe.
    pub(crate) fn enclosing_column_layer(
        &self,
        child: LayerId,
        root: LayerId,
    ) -> Option<LayerId> {
        let mut cursor = self.layer(child).parent();
        while let Some(current) = cursor {
            if current == root || self.is_stacking_context(current) {
                return None;
            }
            if !self.layer(current).info().columns.is_empty() {
                return Some(current);
            }
            cursor = self.layer(current).parent();
        }
        None
    }

    // Geometry updates from the layout collaborator.

    pub fn update_position(&mut self, id: LayerId, origin: Point2D<Au>) {
        self.assert_mutation_allowed();
        if self.layer(id).info.origin == origin {
            return;
        }
        self.layer_mut(id).info.origin = origin;
        self.clear_clip_rects_subtree(id);
    }

    pub fn update_size(&mut self, id: LayerId, size: Size2D<Au>) {
        self.assert_mutation_allowed();
        if self.layer(id).info.size == size {
            return;
        }
        self.layer_mut(id).info.size = size;
        self.clear_clip_rects_subtree(id);
    }

    pub fn update_overflow(&mut self, id: LayerId, overflow: Rect<Au>) {
        self.assert_mutation_allowed();
        self.layer_mut(id).info.overflow = overflow;
    }

    /// Replaces the full style/geometry snapshot for a layer and performs
    /// every invalidation the difference requires: stacking context flips,
    /// z-order dirtying, clip cache clears, visibility and 3D bookkeeping,
    /// and overflow-control widget updates through `host`.
    pub fn update_info(
        &mut self,
        host: &mut dyn OverflowControlHost,
        id: LayerId,
        info: LayerInfo,
    ) {
        self.assert_mutation_allowed();
        let was_stacking_context = self.is_stacking_context(id);
        let (clip_changed, visibility_changed, z_index_changed, transform_changed) = {
            let old = &self.layer(id).info;
            (
                old.position != info.position ||
                    old.overflow_x != info.overflow_x ||
                    old.overflow_y != info.overflow_y ||
                    old.clip != info.clip ||
                    old.has_rounded_corners != info.has_rounded_corners ||
                    old.transform != info.transform ||
                    old.origin != info.origin ||
                    old.size != info.size,
                old.visible != info.visible || old.has_content != info.has_content,
                old.z_index != info.z_index,
                old.transform != info.transform || old.preserves_3d != info.preserves_3d,
            )
        };

        self.layer_mut(id).info = info;
        self.layer_mut(id).update_visible_content_flag();
        scroll::update_overflow_controls(self, host, id);

        if clip_changed {
            self.clear_clip_rects_subtree(id);
        }
        if visibility_changed {
            self.note_visibility_changed(id);
        }
        if transform_changed {
            self.note_transform_changed(id);
        }

        let is_stacking_context = self.is_stacking_context(id);
        if was_stacking_context != is_stacking_context {
            self.note_stacking_context_flip(id, is_stacking_context);
        } else if z_index_changed {
            stacking::dirty_stacking_context_z_order_lists(self, id);
        }
        self.update_self_painting(id);
    }

    pub(crate) fn note_stacking_context_status(&mut self, id: LayerId) {
        let is_stacking_context = self.is_stacking_context(id);
        let had_lists = self.layer(id).z_order.is_some();
        if is_stacking_context != had_lists {
            self.note_stacking_context_flip(id, is_stacking_context);
            self.update_self_painting(id);
        }
    }

    fn note_stacking_context_flip(&mut self, id: LayerId, is_stacking_context: bool) {
        {
            let layer = self.layer_mut(id);
            if is_stacking_context {
                layer.z_order = Some(ZOrderLists::default());
                layer.flags.insert(LayerFlags::Z_ORDER_DIRTY);
            } else {
                // Our former out-of-plane descendants belong to an ancestor
                // context now; the ancestor rebuild below recollects them.
                layer.z_order = None;
            }
        }
        stacking::dirty_stacking_context_z_order_lists(self, id);
        if let Some(parent) = self.layer(id).parent {
            self.layer_mut(parent)
                .flags
                .insert(LayerFlags::NORMAL_FLOW_DIRTY);
        }
    }

    pub(crate) fn update_self_painting(&mut self, id: LayerId) {
        let self_painting = self.is_stacking_context(id) ||
            self.layer(id).flags.contains(LayerFlags::HAS_OVERFLOW_CONTROLS) ||
            self.layer(id).is_reflection();
        self.layer_mut(id)
            .flags
            .set(LayerFlags::SELF_PAINTING, self_painting);
    }

    // Cache invalidation and lazy derived state.

    pub(crate) fn clear_clip_rects_subtree(&mut self, id: LayerId) {
        self.layer_mut(id).clip_cache.clear();
        for child in self.child_ids(id) {
            self.clear_clip_rects_subtree(child);
        }
        if let Some(reflection) = self.layer(id).reflection {
            self.clear_clip_rects_subtree(reflection);
        }
    }

    fn note_child_list_changed(&mut self, parent: LayerId) {
        self.layer_mut(parent)
            .flags
            .insert(LayerFlags::NORMAL_FLOW_DIRTY);
        let context = self.enclosing_stacking_context(parent);
        stacking::dirty_z_order_lists(self, context);
        self.mark_visible_descendant_dirty(parent);
        self.mark_3d_descendant_dirty(parent);
    }

    pub(crate) fn note_visibility_changed(&mut self, id: LayerId) {
        if let Some(parent) = self.layer(id).parent {
            self.mark_visible_descendant_dirty(parent);
        }
        // Hidden layers drop out of z-order collection entirely, so the
        // enclosing context must recollect.
        stacking::dirty_stacking_context_z_order_lists(self, id);
        // While a subtree was invisible the positions-after-scroll pass
        // skipped it, so whatever it has cached may be stale.
        self.clear_clip_rects_subtree(id);
    }

    fn note_transform_changed(&mut self, id: LayerId) {
        self.layer_mut(id)
            .flags
            .insert(LayerFlags::HAS_3D_DESCENDANT_DIRTY);
        if let Some(parent) = self.layer(id).parent {
            self.mark_3d_descendant_dirty(parent);
        }
        self.clear_clip_rects_subtree(id);
    }

    fn mark_visible_descendant_dirty(&mut self, id: LayerId) {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            {
                let layer = self.layer_mut(current);
                if layer.flags.contains(LayerFlags::VISIBLE_DESCENDANT_DIRTY) {
                    break;
                }
                layer.flags.insert(LayerFlags::VISIBLE_DESCENDANT_DIRTY);
            }
            // Visibility decides whether a context is collected at all, so
            // the bucket that would hold it has to recollect.
            if self.is_stacking_context(current) {
                if let Some(ancestor) = self.stacking_context_ancestor(current) {
                    self.layer_mut(ancestor)
                        .flags
                        .insert(LayerFlags::Z_ORDER_DIRTY);
                }
            }
            cursor = self.layer(current).parent;
        }
    }

    fn mark_3d_descendant_dirty(&mut self, id: LayerId) {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let layer = self.layer_mut(current);
            if layer.flags.contains(LayerFlags::HAS_3D_DESCENDANT_DIRTY) {
                break;
            }
            layer.flags.insert(LayerFlags::HAS_3D_DESCENDANT_DIRTY);
            cursor = layer.parent;
        }
    }

    /// Recomputes `HAS_VISIBLE_DESCENDANT` bottom-up wherever the dirty bit
    /// is set. Subtrees without the bit cannot contain changes.
    pub(crate) fn update_descendant_visibility(&mut self, id: LayerId) {
        if !self
            .layer(id)
            .flags
            .contains(LayerFlags::VISIBLE_DESCENDANT_DIRTY)
        {
            return;
        }

        let mut children = self.child_ids(id);
        if let Some(reflection) = self.layer(id).reflection {
            children.push(reflection);
        }
        let mut any_visible = false;
        for &child in &children {
            self.update_descendant_visibility(child);
            let child_layer = self.layer(child);
            any_visible |=
                child_layer.has_visible_content() || child_layer.has_visible_descendant();
        }

        let layer = self.layer_mut(id);
        layer
            .flags
            .set(LayerFlags::HAS_VISIBLE_DESCENDANT, any_visible);
        layer.flags.remove(LayerFlags::VISIBLE_DESCENDANT_DIRTY);
    }

    /// Recomputes `HAS_3D_DESCENDANT` bottom-up wherever dirty. A flattening
    /// child hides its own 3D content from ancestors, so only children that
    /// preserve 3D propagate the bit upward.
    pub(crate) fn update_3d_descendant_status(&mut self, id: LayerId) {
        if !self
            .layer(id)
            .flags
            .contains(LayerFlags::HAS_3D_DESCENDANT_DIRTY)
        {
            return;
        }

        let children = self.child_ids(id);
        let mut any_3d = false;
        for &child in &children {
            self.update_3d_descendant_status(child);
            let child_layer = self.layer(child);
            any_3d |= child_layer.has_3d_transform() ||
                (child_layer.info().preserves_3d &&
                    child_layer.flags().contains(LayerFlags::HAS_3D_DESCENDANT));
        }

        let layer = self.layer_mut(id);
        layer.flags.set(LayerFlags::HAS_3D_DESCENDANT, any_3d);
        layer.flags.remove(LayerFlags::HAS_3D_DESCENDANT_DIRTY);
    }

    pub(crate) fn has_3d_descendants(&self, id: LayerId) -> bool {
        self.layer(id).flags().contains(LayerFlags::HAS_3D_DESCENDANT)
    }

    // Traversal bookkeeping.

    pub(crate) fn begin_traversal(&mut self) {
        self.traversal_depth += 1;
    }

    pub(crate) fn end_traversal(&mut self) {
        debug_assert!(self.traversal_depth > 0);
        self.traversal_depth -= 1;
        if self.traversal_depth == 0 && !self.pending_removals.is_empty() {
            let pending = std::mem::take(&mut self.pending_removals);
            for id in pending {
                self.remove_layer_now(id);
            }
        }
    }

    fn assert_mutation_allowed(&self) {
        debug_assert_eq!(
            self.traversal_depth, 0,
            "layer tree mutated during an active traversal"
        );
    }

    /// Brings every piece of lazily maintained derived state up to date:
    /// visibility flags, 3D bookkeeping, and dirty z-order/normal-flow
    /// lists. Paint and hit-test traversals call this before walking.
    pub(crate) fn update_before_traversal(&mut self) {
        if let Some(root) = self.root {
            self.update_descendant_visibility(root);
            self.update_3d_descendant_status(root);
            stacking::update_layer_lists(self, root);
            if self.debug.dump_layer_tree {
                crate::debug::dump_layer_tree(self);
            }
        }
    }
}

impl Default for LayerTree {
    fn default() -> Self {
        LayerTree::new()
    }
}

pub struct ChildLayers<'a> {
    tree: &'a LayerTree,
    next: Option<LayerId>,
}

impl<'a> Iterator for ChildLayers<'a> {
    type Item = LayerId;

    fn next(&mut self) -> Option<LayerId> {
        let current = self.next?;
        self.next = self.tree.layer(current).next_sibling;
        Some(current)
    }
}
