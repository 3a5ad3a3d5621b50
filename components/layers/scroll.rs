/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Scrolling and overflow controls. Scroll offsets are clamped against the
//! scrollable overhang, applied to the layer, and followed by a lightweight
//! positions-after-scroll pass that only touches layers that can observe the
//! scroll. Scroll indicator and resizer widgets belong to the platform
//! collaborator; this module only tells it when they appear and disappear.

use app_units::Au;
use euclid::default::Vector2D;
use log::debug;

use crate::graphics::{OverflowControlHost, ScrollbarOrientation, ScrollbarStyle};
use crate::layer::{Layer, LayerFlags, LayerId, PositionScheme};
use crate::tree::LayerTree;

/// The outcome of a scroll request, so callers can bubble unhandled deltas
/// to an enclosing scrollable layer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScrollResult {
    /// The layer does not scroll its overflow.
    Unhandled,
    /// The layer scrolls, but the clamped offset equals the current one.
    Unchanged,
    /// The scroll offset changed.
    Changed,
}

/// Which widgets currently exist for a scrollable layer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct OverflowControls {
    pub horizontal: bool,
    pub vertical: bool,
    pub resizer: bool,
}

/// Clamps `offset` into `[0, content - viewport]` per axis, with zero when
/// the content is smaller than the viewport. Idempotent.
pub fn clamp_scroll_offset(layer: &Layer, offset: Vector2D<Au>) -> Vector2D<Au> {
    let viewport = layer.visible_size();
    let content = layer.info().content_size;
    let max = Vector2D::new(
        (content.width - viewport.width).max(Au(0)),
        (content.height - viewport.height).max(Au(0)),
    );
    Vector2D::new(
        offset.x.max(Au(0)).min(max.x),
        offset.y.max(Au(0)).min(max.y),
    )
}

/// Scrolls a layer to the given offset. The offset is clamped, applied, and
/// the caches of layers that can observe the scroll are invalidated.
pub fn scroll_to(tree: &mut LayerTree, id: LayerId, offset: Vector2D<Au>) -> ScrollResult {
    if !tree.layer(id).scrolls_overflow() {
        return ScrollResult::Unhandled;
    }

    let clamped = clamp_scroll_offset(tree.layer(id), offset);
    if clamped == tree.layer(id).scroll_offset() {
        return ScrollResult::Unchanged;
    }

    debug!("scrolling {:?} to {:?}", id, clamped);
    tree.layer_mut(id).scroll_offset = clamped;

    // Cached rects below here embed scrolled positions; clear everything in
    // the subtree that can observe the scroll.
    tree.layer_mut(id).clip_cache.clear();
    for child in tree.child_ids(id) {
        update_positions_after_scroll(tree, child);
    }
    ScrollResult::Changed
}

/// Scrolls by a relative delta at a cursor position, deepest scrollable
/// layer first: children under the cursor get the first chance to consume
/// the delta, and a layer that cannot move further hands it back to its
/// nearest scrollable ancestor. `cursor` is in `id`'s local coordinates.
pub fn handle_scroll_event(
    tree: &mut LayerTree,
    id: LayerId,
    delta: Vector2D<Au>,
    cursor: euclid::default::Point2D<Au>,
) -> ScrollResult {
    // Cursor in content coordinates, so scrolled-away children still match.
    let content_cursor = cursor + tree.layer(id).scroll_offset();
    let children = tree.child_ids(id);
    for &child in children.iter().rev() {
        let child_layer = tree.layer(child);
        if !child_layer.border_box().contains(content_cursor) {
            continue;
        }
        let child_cursor = content_cursor - child_layer.info().origin.to_vector();
        match handle_scroll_event(tree, child, delta, child_cursor) {
            ScrollResult::Unhandled | ScrollResult::Unchanged => {},
            handled => return handled,
        }
    }

    if !tree.layer(id).scrolls_overflow() {
        return ScrollResult::Unhandled;
    }
    scroll_to(tree, id, tree.layer(id).scroll_offset() + delta)
}

/// The positions-after-scroll pass: clears position-dependent caches below a
/// scrolled layer. Skips subtrees that cannot observe the scroll: invisible
/// subtrees (their caches are cleared again when they become visible) and
/// fixed-position subtrees (they do not move with the scroller).
fn update_positions_after_scroll(tree: &mut LayerTree, id: LayerId) {
    let layer = tree.layer(id);
    if layer.info().position == PositionScheme::Fixed {
        return;
    }
    if !layer.has_visible_content() && !layer.has_visible_descendant() {
        return;
    }

    tree.layer_mut(id).clip_cache.clear();
    for child in tree.child_ids(id) {
        update_positions_after_scroll(tree, child);
    }
    if let Some(reflection) = tree.layer(id).reflection() {
        update_positions_after_scroll(tree, reflection);
    }
}

/// Reconciles which scroll indicator and resizer widgets exist for a layer
/// with what its style and content currently require, and keeps the
/// `HAS_OVERFLOW_CONTROLS` and self-painting flags in step.
pub(crate) fn update_overflow_controls(
    tree: &mut LayerTree,
    host: &mut dyn OverflowControlHost,
    id: LayerId,
) {
    let layer = tree.layer(id);
    let needed = OverflowControls {
        horizontal: layer.scrolls_overflow() && layer.needs_horizontal_scrollbar(),
        vertical: layer.scrolls_overflow() && layer.needs_vertical_scrollbar(),
        resizer: layer.needs_resizer(),
    };
    let style = layer.info().scrollbar_style;
    let existing = tree
        .overflow_controls
        .get(&id)
        .copied()
        .unwrap_or_default();

    if needed == existing {
        position_overflow_controls(tree, host, id);
        return;
    }

    if needed.horizontal != existing.horizontal {
        if needed.horizontal {
            host.create_scroll_indicator(id, ScrollbarOrientation::Horizontal, style);
        } else {
            host.destroy_scroll_indicator(id, ScrollbarOrientation::Horizontal);
        }
    }
    if needed.vertical != existing.vertical {
        if needed.vertical {
            host.create_scroll_indicator(id, ScrollbarOrientation::Vertical, style);
        } else {
            host.destroy_scroll_indicator(id, ScrollbarOrientation::Vertical);
        }
    }
    if needed.resizer != existing.resizer {
        if needed.resizer {
            host.create_resizer(id);
        } else {
            host.destroy_resizer(id);
        }
    }

    let has_controls = needed.horizontal || needed.vertical || needed.resizer;
    if has_controls {
        tree.overflow_controls.insert(id, needed);
    } else {
        tree.overflow_controls.remove(&id);
    }
    tree.layer_mut(id)
        .flags
        .set(LayerFlags::HAS_OVERFLOW_CONTROLS, has_controls);
    tree.update_self_painting(id);
    position_overflow_controls(tree, host, id);
}

/// Pushes current widget geometry to the host, in tree-root coordinates.
pub(crate) fn position_overflow_controls(
    tree: &mut LayerTree,
    host: &mut dyn OverflowControlHost,
    id: LayerId,
) {
    let controls = match tree.overflow_controls.get(&id) {
        Some(controls) => *controls,
        None => return,
    };
    let root = match tree.root() {
        Some(root) => root,
        None => return,
    };
    let offset = tree.offset_from_ancestor(id, root);
    let layer = tree.layer(id);
    if controls.horizontal {
        let rect = layer.scrollbar_rect(true).translate(offset);
        host.position_scroll_indicator(id, ScrollbarOrientation::Horizontal, &rect);
    }
    if controls.vertical {
        let rect = layer.scrollbar_rect(false).translate(offset);
        host.position_scroll_indicator(id, ScrollbarOrientation::Vertical, &rect);
    }
}

/// Whether this layer paints overlay scroll indicators, which happen in a
/// dedicated late pass so they stay above sibling content.
pub(crate) fn has_overlay_controls(tree: &LayerTree, id: LayerId) -> bool {
    tree.layer(id).info().scrollbar_style == ScrollbarStyle::Overlay &&
        tree.overflow_controls
            .get(&id)
            .is_some_and(|controls| controls.horizontal || controls.vertical)
}
