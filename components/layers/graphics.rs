/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The seams between the layer tree and its collaborators: the 2D drawing
//! backend that turns paint phases into pixels, and the platform widget host
//! that owns scroll indicators and the corner resizer.

use app_units::Au;
use euclid::default::{Rect, Transform3D};

use crate::layer::LayerId;

/// The phases a single layer's own content is drawn in. The orchestrator
/// guarantees these arrive in stacking order; the backend only has to fill
/// rectangles.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PaintPhase {
    /// The layer's own background and border.
    Background,
    /// Backgrounds and borders of in-flow block descendants of the layer's
    /// box that have no layer of their own.
    BlockBackgrounds,
    /// Floated descendants without their own layer.
    Floats,
    /// Inline and atomic content, including that of layerless descendants.
    Foreground,
    /// The layer's own outline. Painted against clip rectangles that ignore
    /// ancestor overflow so outlines can escape scrolled containers.
    Outline,
    /// The layer's mask image, under the background clip.
    Mask,
}

/// An abstract 2D drawing surface. The paint orchestrator drives one of
/// these; it never rasterizes anything itself.
///
/// `save`/`restore` and the transparency/filter begin/end pairs are always
/// balanced by the orchestrator.
pub trait PaintBackend {
    fn save(&mut self);
    fn restore(&mut self);

    /// Intersects the current clip with `rect`. `has_rounded_corners` asks
    /// the backend to also apply the clipping box's border radius.
    fn clip_to_rect(&mut self, rect: &Rect<Au>, has_rounded_corners: bool);

    /// Multiplies `transform` onto the current coordinate system.
    fn concat_transform(&mut self, transform: &Transform3D<f32>);

    /// Opens an offscreen group; everything drawn until the matching end call
    /// is composited back with `opacity` applied once to the whole group.
    fn begin_transparency_layer(&mut self, opacity: f32);
    fn end_transparency_layer(&mut self);

    /// Redirects drawing to an offscreen target covering `source_rect`; the
    /// matching end call runs the filter chain and composites the result.
    fn begin_filter(&mut self, source_rect: &Rect<Au>);
    fn end_filter(&mut self);

    /// Draws one phase of one layer's content into `rect`. The abstract
    /// equivalent of handing the box subtree a graphics context.
    fn draw_layer_into_rect(&mut self, layer: LayerId, phase: PaintPhase, rect: &Rect<Au>);
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScrollbarOrientation {
    Horizontal,
    Vertical,
}

/// Classic scrollbars consume layout space along the box edge; overlay
/// scrollbars float above content and paint in a dedicated late pass.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScrollbarStyle {
    Classic,
    Overlay,
}

/// Thickness reserved by a classic scroll indicator, and drawn by an overlay
/// one.
pub const SCROLLBAR_THICKNESS: Au = Au(15 * 60);

/// The platform widget collaborator. Owns the native (or native-looking)
/// scroll indicator and resizer widgets for scrollable layers; the tree only
/// tells it when widgets appear, move, or need painting.
pub trait OverflowControlHost {
    fn create_scroll_indicator(
        &mut self,
        layer: LayerId,
        orientation: ScrollbarOrientation,
        style: ScrollbarStyle,
    );
    fn destroy_scroll_indicator(&mut self, layer: LayerId, orientation: ScrollbarOrientation);
    fn position_scroll_indicator(
        &mut self,
        layer: LayerId,
        orientation: ScrollbarOrientation,
        rect: &Rect<Au>,
    );
    fn paint_scroll_indicator(
        &mut self,
        backend: &mut dyn PaintBackend,
        layer: LayerId,
        orientation: ScrollbarOrientation,
        rect: &Rect<Au>,
    );

    fn create_resizer(&mut self, layer: LayerId);
    fn destroy_resizer(&mut self, layer: LayerId);
    fn paint_resizer(&mut self, backend: &mut dyn PaintBackend, layer: LayerId, rect: &Rect<Au>);
}

/// A host for embedders that draw no native widgets (tests, headless runs).
pub struct NullOverflowControlHost;

impl OverflowControlHost for NullOverflowControlHost {
    fn create_scroll_indicator(
        &mut self,
        _layer: LayerId,
        _orientation: ScrollbarOrientation,
        _style: ScrollbarStyle,
    ) {
    }
    fn destroy_scroll_indicator(&mut self, _layer: LayerId, _orientation: ScrollbarOrientation) {}
    fn position_scroll_indicator(
        &mut self,
        _layer: LayerId,
        _orientation: ScrollbarOrientation,
        _rect: &Rect<Au>,
    ) {
    }
    fn paint_scroll_indicator(
        &mut self,
        _backend: &mut dyn PaintBackend,
        _layer: LayerId,
        _orientation: ScrollbarOrientation,
        _rect: &Rect<Au>,
    ) {
    }
    fn create_resizer(&mut self, _layer: LayerId) {}
    fn destroy_resizer(&mut self, _layer: LayerId) {}
    fn paint_resizer(
        &mut self,
        _backend: &mut dyn PaintBackend,
        _layer: LayerId,
        _rect: &Rect<Au>,
    ) {
    }
}
