/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The paint orchestrator. Walks a stacking-context subtree in the order
//! mandated by CSS 2.1 Appendix E and drives the abstract drawing backend:
//! backgrounds, then negative z-order children, then the layer's own
//! content and normal-flow children, then positive z-order children,
//! outlines, and masks, with overlay scroll indicators in a dedicated
//! second pass over the whole tree so they stay above sibling content.
//!
//! Transparency groups open lazily, ancestors first, when the first real
//! drawing operation in a transparent subtree happens, and close at the end
//! of the owning layer's phases. A layer whose transform cannot be inverted
//! is skipped entirely: visually there is nothing there.

use app_units::Au;
use bitflags::bitflags;
use euclid::default::{Rect, Transform3D};
use log::trace;
use smallvec::SmallVec;

use crate::clip::{
    background_clip_rect, calculate_rects, ClipRect, ClipRectsContext, ClipRectsKind,
    OverflowRespect,
};
use crate::geometry::{au_vector_to_f32_vector, max_rect, project_rect};
use crate::graphics::{OverflowControlHost, PaintBackend, PaintPhase, ScrollbarOrientation};
use crate::layer::{LayerFlags, LayerId};
use crate::scroll;
use crate::tree::LayerTree;

bitflags! {
    #[derive(Clone, Copy, Debug)]
    pub(crate) struct PaintFlags: u8 {
        /// The layer's transform is already on the backend; re-entry must
        /// not apply it again.
        const APPLIED_TRANSFORM = 1 << 0;
    }
}

/// Per-traversal context, threaded by reference through every call. The
/// root changes at transform boundaries: inside a transformed subtree all
/// rectangles are expressed in that subtree's coordinates.
#[derive(Clone, Copy)]
pub(crate) struct PaintingInfo {
    pub root: LayerId,
    pub dirty_rect: Rect<Au>,
}

/// Paints everything that intersects `dirty_rect`. Returns the region this
/// walk completed, which the caller compares against the requested region
/// to decide whether another repaint is needed.
pub fn paint(
    tree: &mut LayerTree,
    backend: &mut dyn PaintBackend,
    host: &mut dyn OverflowControlHost,
    dirty_rect: Rect<Au>,
) -> Rect<Au> {
    let root = match tree.root() {
        Some(root) => root,
        None => return Rect::zero(),
    };

    tree.update_before_traversal();
    tree.begin_traversal();
    let info = PaintingInfo { root, dirty_rect };
    paint_layer(tree, backend, host, root, &info, PaintFlags::empty());
    paint_overlay_scrollbars(tree, backend, host, &info, root);
    tree.end_traversal();
    dirty_rect
}

pub(crate) fn paint_layer(
    tree: &mut LayerTree,
    backend: &mut dyn PaintBackend,
    host: &mut dyn OverflowControlHost,
    id: LayerId,
    info: &PaintingInfo,
    flags: PaintFlags,
) {
    if tree.layer(id).paints_with_transform() && !flags.contains(PaintFlags::APPLIED_TRANSFORM) {
        // The ancestor clip applies in the outer coordinate space, before
        // the transform re-roots everything.
        let cx = ClipRectsContext::new(info.root, ClipRectsKind::Painting);
        let clip = background_clip_rect(tree, id, &cx);
        if !clip.rect.intersects(&info.dirty_rect) {
            return;
        }

        let transform = match tree.layer_transform(id, info.root) {
            Some(transform) => transform,
            None => return,
        };
        let inverse = match transform.inverse() {
            Some(inverse) => inverse,
            None => {
                trace!("skipping {:?}: non-invertible transform", id);
                return;
            },
        };

        // Ancestor transparency groups must be open before we re-root;
        // inside the subtree the walk up stops at the new root.
        let (will_draw, parent) = {
            let layer = tree.layer(id);
            (
                layer.has_visible_content() || layer.has_visible_descendant(),
                layer.parent(),
            )
        };
        if will_draw {
            if let Some(parent) = parent {
                begin_transparency_layers(tree, backend, parent, info);
            }
        }

        backend.save();
        if !clip.is_infinite() {
            backend.clip_to_rect(&clip.rect, clip.has_rounded_corners);
        }
        backend.concat_transform(&transform);

        // Re-express the dirty rectangle in the subtree's local space.
        let local_dirty = project_rect(&inverse, &info.dirty_rect).unwrap_or_else(max_rect);
        let local_info = PaintingInfo {
            root: id,
            dirty_rect: local_dirty,
        };
        paint_layer(
            tree,
            backend,
            host,
            id,
            &local_info,
            flags | PaintFlags::APPLIED_TRANSFORM,
        );
        backend.restore();
        return;
    }

    paint_layer_contents(tree, backend, host, id, info);
}

fn paint_layer_contents(
    tree: &mut LayerTree,
    backend: &mut dyn PaintBackend,
    host: &mut dyn OverflowControlHost,
    id: LayerId,
    info: &PaintingInfo,
) {
    let (visible_content, visible_descendant) = {
        let layer = tree.layer(id);
        (layer.has_visible_content(), layer.has_visible_descendant())
    };
    if !visible_content && !visible_descendant && !tree.requires_hidden_layers() {
        return;
    }

    // Coarse early-out: nothing below here can touch the dirty rectangle.
    let offset = tree.offset_from_ancestor(id, info.root);
    let coarse_bounds = tree.subtree_bounds(id).translate(offset);
    if !coarse_bounds.intersects(&info.dirty_rect) {
        return;
    }

    trace!("painting {:?}", id);
    let self_painting = tree.layer(id).is_self_painting();
    let cx = ClipRectsContext::new(info.root, ClipRectsKind::Painting);
    let mut rects = calculate_rects(tree, id, &cx);

    // The clip-path pre-clip narrows every subsequent phase of this layer.
    if tree.layer(id).info().has_clip_path {
        let pre_clip = ClipRect {
            rect: rects.bounds,
            has_rounded_corners: true,
        };
        rects.background = rects.background.intersect(&pre_clip);
        rects.foreground = rects.foreground.intersect(&pre_clip);
    }

    // Filters redirect the remaining phases to an offscreen target sized to
    // the filter's source rect; a zero-size region short-circuits the whole
    // interception.
    let mut filter_active = false;
    if self_painting && tree.layer(id).paints_with_filters() {
        let outset = tree.layer(id).info().filter_outset;
        let source_rect = rects.bounds.inflate(outset, outset);
        if !source_rect.is_empty() {
            // The group opacity has to wrap the composited filter result.
            begin_transparency_layers(tree, backend, id, info);
            backend.begin_filter(&source_rect);
            filter_active = true;
        }
    }

    // Background phase: own background and border, then the negative
    // z-order children, each fully phased.
    if self_painting && visible_content {
        draw_phase(tree, backend, id, PaintPhase::Background, rects.background, info);
    }
    let negative: Vec<LayerId> = tree
        .layer(id)
        .z_order()
        .map(|lists| lists.negative.clone())
        .unwrap_or_default();
    for child in negative {
        paint_child(tree, backend, host, child, info);
    }

    // The reflection paints between the backdrop and the host's own
    // content, outside the sibling lists.
    if let Some(reflection) = tree.layer(id).reflection() {
        paint_layer(tree, backend, host, reflection, info, PaintFlags::empty());
    }

    // Foreground phase: own block backgrounds, floats and content under the
    // foreground clip, then normal-flow children in source order (they are
    // not independently stacked), then positive z-order children.
    if self_painting && visible_content {
        draw_phase(
            tree,
            backend,
            id,
            PaintPhase::BlockBackgrounds,
            rects.foreground,
            info,
        );
        draw_phase(tree, backend, id, PaintPhase::Floats, rects.foreground, info);
        draw_phase(
            tree,
            backend,
            id,
            PaintPhase::Foreground,
            rects.foreground,
            info,
        );
    }
    let normal_flow: Vec<LayerId> = tree.layer(id).normal_flow().to_vec();
    for child in normal_flow {
        paint_child(tree, backend, host, child, info);
    }
    let positive: Vec<LayerId> = tree
        .layer(id)
        .z_order()
        .map(|lists| lists.positive.clone())
        .unwrap_or_default();
    for child in positive {
        paint_child(tree, backend, host, child, info);
    }

    // Outline phase: clip rects recomputed with overflow clipping ignored,
    // so an outline can escape a scrolled or clipped container.
    if self_painting && visible_content && tree.layer(id).info().has_outline {
        // Temporary kind: this one-off policy variant must not evict the
        // regular painting entries along the ancestor chain.
        let outline_cx = ClipRectsContext {
            kind: ClipRectsKind::Temporary,
            respect_overflow: OverflowRespect::Ignore,
            ..cx
        };
        let outline_rects = calculate_rects(tree, id, &outline_cx);
        draw_phase(
            tree,
            backend,
            id,
            PaintPhase::Outline,
            outline_rects.background,
            info,
        );
    }

    if filter_active {
        backend.end_filter();
    }

    // Classic overflow controls paint with their layer; overlay ones wait
    // for the late pass.
    if self_painting && !scroll::has_overlay_controls(tree, id) {
        paint_layer_overflow_controls(tree, backend, host, id, info);
    }

    // Mask phase, under the background clip.
    if self_painting && visible_content && tree.layer(id).info().has_mask {
        draw_phase(tree, backend, id, PaintPhase::Mask, rects.background, info);
    }

    if tree
        .layer(id)
        .flags()
        .contains(LayerFlags::USED_TRANSPARENCY)
    {
        backend.end_transparency_layer();
        tree.layer_mut(id)
            .flags
            .remove(LayerFlags::USED_TRANSPARENCY);
    }
}

/// One drawing operation, clipped and culled against the dirty rectangle.
/// This is the point where pending transparency groups actually open.
fn draw_phase(
    tree: &mut LayerTree,
    backend: &mut dyn PaintBackend,
    id: LayerId,
    phase: PaintPhase,
    clip: ClipRect,
    info: &PaintingInfo,
) {
    if clip.is_empty() {
        return;
    }
    let offset = tree.offset_from_ancestor(id, info.root);
    let bounds = Rect::new(offset.to_point(), tree.layer(id).info().size);
    let draw_rect = match bounds.intersection(&info.dirty_rect) {
        Some(rect) => rect,
        None => return,
    };
    if !clip.rect.intersects(&draw_rect) {
        return;
    }

    begin_transparency_layers(tree, backend, id, info);
    backend.save();
    if !clip.is_infinite() {
        backend.clip_to_rect(&clip.rect, clip.has_rounded_corners);
    }
    backend.draw_layer_into_rect(id, phase, &draw_rect);
    backend.restore();
}

/// Opens the transparency groups of every transparent-but-unopened layer
/// from `id` up to the painting root, outermost first, so each group
/// encloses its descendants' groups. Groups stay open across phases and are
/// closed by their owning layer after its mask phase.
fn begin_transparency_layers(
    tree: &mut LayerTree,
    backend: &mut dyn PaintBackend,
    id: LayerId,
    info: &PaintingInfo,
) {
    let mut chain: SmallVec<[LayerId; 8]> = SmallVec::new();
    let mut cursor = Some(id);
    while let Some(current) = cursor {
        let layer = tree.layer(current);
        if layer.is_transparent() && !layer.flags().contains(LayerFlags::USED_TRANSPARENCY) {
            chain.push(current);
        }
        if current == info.root {
            break;
        }
        cursor = layer.parent();
    }

    for &layer in chain.iter().rev() {
        let opacity = tree.layer(layer).info().opacity;
        trace!("opening transparency layer for {:?}", layer);
        backend.begin_transparency_layer(opacity);
        tree.layer_mut(layer)
            .flags
            .insert(LayerFlags::USED_TRANSPARENCY);
    }
}

/// Paints a child layer, splitting it per column stripe when its nearest
/// non-stacking-context ancestor is a multicolumn container.
fn paint_child(
    tree: &mut LayerTree,
    backend: &mut dyn PaintBackend,
    host: &mut dyn OverflowControlHost,
    child: LayerId,
    info: &PaintingInfo,
) {
    match tree.enclosing_column_layer(child, info.root) {
        None => paint_layer(tree, backend, host, child, info, PaintFlags::empty()),
        Some(column_layer) => {
            paint_child_in_columns(tree, backend, host, child, column_layer, info)
        },
    }
}

fn paint_child_in_columns(
    tree: &mut LayerTree,
    backend: &mut dyn PaintBackend,
    host: &mut dyn OverflowControlHost,
    child: LayerId,
    column_layer: LayerId,
    info: &PaintingInfo,
) {
    let stripes = tree.layer(column_layer).info().columns.clone();
    let column_offset = tree.offset_from_ancestor(column_layer, info.root);
    for stripe in &stripes {
        let stripe_rect = stripe.rect.translate(column_offset);
        if !stripe_rect.intersects(&info.dirty_rect) {
            continue;
        }

        // Fresh clip and translation state per stripe; nothing leaks from
        // one column into the next.
        backend.save();
        backend.clip_to_rect(&stripe_rect, false);
        let translation = au_vector_to_f32_vector(stripe.translation);
        backend.concat_transform(&Transform3D::translation(translation.x, translation.y, 0.0));
        let shifted = PaintingInfo {
            root: info.root,
            dirty_rect: info.dirty_rect.translate(-stripe.translation),
        };
        paint_layer(tree, backend, host, child, &shifted, PaintFlags::empty());
        backend.restore();
    }
}

fn paint_layer_overflow_controls(
    tree: &mut LayerTree,
    backend: &mut dyn PaintBackend,
    host: &mut dyn OverflowControlHost,
    id: LayerId,
    info: &PaintingInfo,
) {
    let controls = match tree.overflow_controls.get(&id) {
        Some(controls) => *controls,
        None => return,
    };
    let offset = tree.offset_from_ancestor(id, info.root);
    if controls.horizontal {
        let rect = tree.layer(id).scrollbar_rect(true).translate(offset);
        if rect.intersects(&info.dirty_rect) {
            host.paint_scroll_indicator(backend, id, ScrollbarOrientation::Horizontal, &rect);
        }
    }
    if controls.vertical {
        let rect = tree.layer(id).scrollbar_rect(false).translate(offset);
        if rect.intersects(&info.dirty_rect) {
            host.paint_scroll_indicator(backend, id, ScrollbarOrientation::Vertical, &rect);
        }
    }
    if controls.resizer {
        let rect = tree.layer(id).resizer_rect().translate(offset);
        if rect.intersects(&info.dirty_rect) {
            host.paint_resizer(backend, id, &rect);
        }
    }
}

/// The dedicated second pass for overlay scroll indicators: they paint above
/// everything in their tree regardless of stacking order.
fn paint_overlay_scrollbars(
    tree: &mut LayerTree,
    backend: &mut dyn PaintBackend,
    host: &mut dyn OverflowControlHost,
    info: &PaintingInfo,
    id: LayerId,
) {
    if scroll::has_overlay_controls(tree, id) && tree.layer(id).has_visible_content() {
        paint_layer_overflow_controls(tree, backend, host, id, info);
    }
    for child in tree.child_ids(id) {
        paint_overlay_scrollbars(tree, backend, host, info, child);
    }
}
