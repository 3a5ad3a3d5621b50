/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A retained tree of paint layers: the stage between layout and pixels.
//!
//! Layout hands each box that needs independent paint, clip, scroll, or
//! transform identity a [`Layer`] in a [`LayerTree`], then pushes geometry
//! and resolved style into it. From there this crate answers the two
//! questions that matter: *paint everything that intersects this rectangle,
//! in the right order* ([`paint`]), and *which layer is frontmost under this
//! point* ([`hit_test`]). The two walks are exact mirrors of each other,
//! including through CSS transforms, multicolumn fragmentation, and 3D
//! rendering contexts; that symmetry is the correctness contract of the
//! whole crate.
//!
//! Everything here is derived, in-memory state: clip rectangles, z-order
//! lists and visibility bits are caches over layout's output, rebuilt
//! lazily when dirtied and never persisted. Rasterization is somebody
//! else's job; painting drives an abstract [`PaintBackend`] of rectangle
//! fills, clips, transforms, and composite groups.

#![deny(unsafe_code)]

pub mod clip;
pub mod debug;
pub mod geometry;
pub mod graphics;
pub mod layer;
pub mod paint;
pub mod scroll;
pub mod stacking;
pub mod tree;

pub use crate::clip::{ClipRect, ClipRects, ClipRectsContext, ClipRectsKind};
pub use crate::graphics::{
    OverflowControlHost, PaintBackend, PaintPhase, ScrollbarOrientation, ScrollbarStyle,
};
pub use crate::hit_test::{hit_test, hit_test_rect, HitTestResult};
pub use crate::layer::{
    ColumnStripe, Layer, LayerId, LayerInfo, MixBlendMode, Overflow, PositionScheme, ResizeMode,
    ZIndex,
};
pub use crate::paint::paint;
pub use crate::scroll::{clamp_scroll_offset, handle_scroll_event, scroll_to, ScrollResult};
pub use crate::tree::{DebugOptions, LayerTree};
