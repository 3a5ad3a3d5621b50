/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Clip rectangles and their per-layer cache.
//!
//! Three clip variants are threaded down the tree so that each positioning
//! scheme inherits the right ancestor clip: the overflow clip (for in-flow
//! boxes), the positioned clip (for absolutely positioned boxes), and the
//! fixed clip (for fixed boxes). Results are memoized per layer and per
//! cache kind; an entry is valid only for the exact (root, policy, policy,
//! generation) tuple it was computed under.

use app_units::Au;
use euclid::default::Rect;

use crate::geometry::max_rect;
use crate::layer::{LayerId, PositionScheme};
use crate::tree::LayerTree;

/// What the computed rects will be used for. Painting and hit-testing rects
/// are cached independently; `Temporary` bypasses the cache entirely.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClipRectsKind {
    Painting,
    HitTesting,
    Temporary,
}

const CACHED_KINDS: usize = 2;

impl ClipRectsKind {
    fn cache_slot(self) -> Option<usize> {
        match self {
            ClipRectsKind::Painting => Some(0),
            ClipRectsKind::HitTesting => Some(1),
            ClipRectsKind::Temporary => None,
        }
    }
}

/// Whether overflow clipping of the layers along the chain applies. The
/// outline phase ignores it so outlines can escape scrolled containers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OverflowRespect {
    Respect,
    Ignore,
}

/// Whether classic scrollbar thickness shrinks the content clip.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScrollbarPolicy {
    IncludeScrollbars,
    IgnoreScrollbarSize,
}

/// The full cache key for one clip-rect computation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipRectsContext {
    /// Coordinates are expressed relative to this layer, whose own clip is
    /// taken as infinite.
    pub root: LayerId,
    pub kind: ClipRectsKind,
    pub respect_overflow: OverflowRespect,
    pub scrollbars: ScrollbarPolicy,
}

impl ClipRectsContext {
    pub fn new(root: LayerId, kind: ClipRectsKind) -> ClipRectsContext {
        ClipRectsContext {
            root,
            kind,
            respect_overflow: OverflowRespect::Respect,
            scrollbars: ScrollbarPolicy::IncludeScrollbars,
        }
    }
}

/// An axis-aligned clip plus a flag recording that some clipping box along
/// the way had border radius, in which case painting pushes an extra rounded
/// clip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipRect {
    pub rect: Rect<Au>,
    pub has_rounded_corners: bool,
}

impl ClipRect {
    pub fn infinite() -> ClipRect {
        ClipRect {
            rect: max_rect(),
            has_rounded_corners: false,
        }
    }

    pub fn new(rect: Rect<Au>) -> ClipRect {
        ClipRect {
            rect,
            has_rounded_corners: false,
        }
    }

    pub fn is_infinite(&self) -> bool {
        self.rect == max_rect()
    }

    pub fn is_empty(&self) -> bool {
        self.rect.is_empty()
    }

    /// Intersection; an empty result stays empty rather than becoming
    /// `None`, because an empty clip is meaningful (nothing paints).
    pub fn intersect(&self, other: &ClipRect) -> ClipRect {
        ClipRect {
            rect: self.rect.intersection(&other.rect).unwrap_or_else(Rect::zero),
            has_rounded_corners: self.has_rounded_corners || other.has_rounded_corners,
        }
    }

    pub fn contains(&self, point: euclid::default::Point2D<Au>) -> bool {
        self.rect.contains(point)
    }
}

/// The three clip variants inherited by a layer's descendants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipRects {
    /// Clip for in-flow (static and relative) descendants.
    pub overflow: ClipRect,
    /// Clip for absolutely positioned descendants.
    pub positioned: ClipRect,
    /// Clip for fixed-position descendants.
    pub fixed: ClipRect,
}

impl ClipRects {
    pub fn infinite() -> ClipRects {
        ClipRects {
            overflow: ClipRect::infinite(),
            positioned: ClipRect::infinite(),
            fixed: ClipRect::infinite(),
        }
    }

    /// The clip that applies to a box with the given position scheme.
    pub fn for_position(&self, position: PositionScheme) -> ClipRect {
        match position {
            PositionScheme::Fixed => self.fixed,
            PositionScheme::Absolute => self.positioned,
            PositionScheme::Static | PositionScheme::Relative => self.overflow,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct ClipRectsEntry {
    root: LayerId,
    respect_overflow: OverflowRespect,
    scrollbars: ScrollbarPolicy,
    generation: u64,
    rects: ClipRects,
}

/// Per-layer memoization table, one slot per cached [`ClipRectsKind`]. An
/// entry answers a lookup only when every component of the key matches; any
/// variance forces recomputation for this layer.
#[derive(Default)]
pub struct ClipRectsCache {
    entries: [Option<ClipRectsEntry>; CACHED_KINDS],
}

impl ClipRectsCache {
    fn get(&self, cx: &ClipRectsContext, generation: u64) -> Option<ClipRects> {
        let slot = cx.kind.cache_slot()?;
        let entry = self.entries[slot].as_ref()?;
        if entry.root == cx.root &&
            entry.respect_overflow == cx.respect_overflow &&
            entry.scrollbars == cx.scrollbars &&
            entry.generation == generation
        {
            Some(entry.rects)
        } else {
            None
        }
    }

    fn insert(&mut self, cx: &ClipRectsContext, generation: u64, rects: ClipRects) {
        if let Some(slot) = cx.kind.cache_slot() {
            self.entries[slot] = Some(ClipRectsEntry {
                root: cx.root,
                respect_overflow: cx.respect_overflow,
                scrollbars: cx.scrollbars,
                generation,
                rects,
            });
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries = [None; CACHED_KINDS];
    }

    #[cfg(test)]
    pub(crate) fn is_populated(&self, kind: ClipRectsKind) -> bool {
        kind.cache_slot()
            .map_or(false, |slot| self.entries[slot].is_some())
    }
}

/// The clip rects a layer passes on to its descendants: the parent's rects,
/// adjusted for this layer's position scheme, intersected with this layer's
/// own clips. Memoized; the whole ancestor chain up to `cx.root` is filled
/// in on the way.
pub fn clip_rects(tree: &mut LayerTree, id: LayerId, cx: &ClipRectsContext) -> ClipRects {
    let generation = tree.clip_generation();
    if let Some(cached) = tree.layer(id).clip_cache.get(cx, generation) {
        return cached;
    }

    let rects = compute_clip_rects(tree, id, cx);
    tree.layer_mut(id).clip_cache.insert(cx, generation, rects);
    rects
}

fn compute_clip_rects(tree: &mut LayerTree, id: LayerId, cx: &ClipRectsContext) -> ClipRects {
    if id == cx.root {
        // The requested root's clip is defined as infinite; its own clips
        // apply to descendants via the recursion below.
        let mut rects = ClipRects::infinite();
        apply_own_clips(tree, id, cx, &mut rects);
        return rects;
    }

    let parent = match tree.layer(id).parent() {
        Some(parent) => parent,
        None => return ClipRects::infinite(),
    };
    let mut rects = clip_rects(tree, parent, cx);

    // A positioning scheme change re-roots which variant descendants start
    // from: fixed boxes escape to the fixed clip, absolute boxes to the
    // positioned clip, and positioned containers re-anchor the positioned
    // clip at the overflow clip accumulated so far.
    match tree.layer(id).info().position {
        PositionScheme::Fixed => {
            rects.overflow = rects.fixed;
            rects.positioned = rects.fixed;
        },
        PositionScheme::Absolute => {
            rects.overflow = rects.positioned;
        },
        PositionScheme::Relative => {
            rects.positioned = rects.overflow;
        },
        PositionScheme::Static => {},
    }

    apply_own_clips(tree, id, cx, &mut rects);
    rects
}

fn apply_own_clips(tree: &LayerTree, id: LayerId, cx: &ClipRectsContext, rects: &mut ClipRects) {
    let offset = tree.offset_from_ancestor(id, cx.root);
    let layer = tree.layer(id);

    if layer.clips_overflow() && cx.respect_overflow == OverflowRespect::Respect {
        let size = match cx.scrollbars {
            ScrollbarPolicy::IncludeScrollbars => layer.visible_size(),
            ScrollbarPolicy::IgnoreScrollbarSize => layer.info().size,
        };
        let clip = ClipRect {
            rect: Rect::new(offset.to_point(), size),
            has_rounded_corners: layer.info().has_rounded_corners,
        };
        rects.overflow = rects.overflow.intersect(&clip);
        if layer.info().position != PositionScheme::Static {
            rects.positioned = rects.positioned.intersect(&clip);
        }
        if layer.paints_with_transform() {
            // A transformed box is the containing block even for fixed
            // descendants, so its clip reaches them too.
            rects.fixed = rects.fixed.intersect(&clip);
        }
    }

    if let Some(css_clip) = layer.info().clip {
        if layer.info().position.is_absolutely_positioned() {
            let clip = ClipRect::new(css_clip.translate(offset));
            rects.overflow = rects.overflow.intersect(&clip);
            rects.positioned = rects.positioned.intersect(&clip);
            rects.fixed = rects.fixed.intersect(&clip);
        }
    }
}

/// The clips and bounds needed to paint or hit-test one layer.
#[derive(Clone, Copy, Debug)]
pub struct LayerRects {
    /// Border box in `cx.root` coordinates.
    pub bounds: Rect<Au>,
    /// Clip for the layer's own background, border, outline and mask.
    pub background: ClipRect,
    /// Clip for the layer's content: the background clip further reduced by
    /// the layer's own overflow clip.
    pub foreground: ClipRect,
}

/// Clip inherited by this layer from its ancestors, before its own clips.
pub fn background_clip_rect(tree: &mut LayerTree, id: LayerId, cx: &ClipRectsContext) -> ClipRect {
    if id == cx.root {
        return ClipRect::infinite();
    }
    let parent = match tree.layer(id).parent() {
        Some(parent) => parent,
        None => return ClipRect::infinite(),
    };
    let position = tree.layer(id).info().position;
    clip_rects(tree, parent, cx).for_position(position)
}

pub fn calculate_rects(tree: &mut LayerTree, id: LayerId, cx: &ClipRectsContext) -> LayerRects {
    let background = background_clip_rect(tree, id, cx);
    let offset = tree.offset_from_ancestor(id, cx.root);
    let layer = tree.layer(id);
    let bounds = Rect::new(offset.to_point(), layer.info().size);

    let mut foreground = background;
    if layer.clips_overflow() && cx.respect_overflow == OverflowRespect::Respect {
        let size = match cx.scrollbars {
            ScrollbarPolicy::IncludeScrollbars => layer.visible_size(),
            ScrollbarPolicy::IgnoreScrollbarSize => layer.info().size,
        };
        foreground = foreground.intersect(&ClipRect {
            rect: Rect::new(offset.to_point(), size),
            has_rounded_corners: layer.info().has_rounded_corners,
        });
    }

    LayerRects {
        bounds,
        background,
        foreground,
    }
}
