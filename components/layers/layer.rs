/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A layer is one node of the paint tree: a box that needs independent
//! painting, clipping, transform, or scrolling identity. Layout pushes a
//! [`LayerInfo`] snapshot into each layer; everything else in this crate is
//! derived from those snapshots plus the tree structure.

use std::fmt;

use app_units::Au;
use bitflags::bitflags;
use euclid::default::{Point2D, Rect, Size2D, Transform3D, Vector2D};

use crate::clip::ClipRectsCache;
use crate::geometry::has_3d_component;
use crate::graphics::{ScrollbarStyle, SCROLLBAR_THICKNESS};

/// An index into the layer tree's slab. Only meaningful for the tree that
/// issued it.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct LayerId(pub(crate) usize);

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Layer({})", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PositionScheme {
    Static,
    Relative,
    Absolute,
    Fixed,
}

impl PositionScheme {
    pub fn is_absolutely_positioned(self) -> bool {
        matches!(self, PositionScheme::Absolute | PositionScheme::Fixed)
    }
}

/// `z-index` as resolved style hands it over. Only meaningful among
/// stacking-context siblings.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ZIndex {
    Auto,
    Integer(i32),
}

impl ZIndex {
    pub fn is_auto(self) -> bool {
        matches!(self, ZIndex::Auto)
    }

    /// `auto` sorts as zero, per CSS 2.1 Appendix E.
    pub fn effective(self) -> i32 {
        match self {
            ZIndex::Auto => 0,
            ZIndex::Integer(value) => value,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Overflow {
    Visible,
    Hidden,
    Scroll,
    Auto,
}

impl Overflow {
    pub fn clips(self) -> bool {
        !matches!(self, Overflow::Visible)
    }

    pub fn scrolls(self) -> bool {
        matches!(self, Overflow::Scroll | Overflow::Auto)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MixBlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
}

/// The `resize` property. A value other than `None` grows a resizer widget
/// in the box corner.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResizeMode {
    None,
    Horizontal,
    Vertical,
    Both,
}

/// One column stripe of a multicolumn container, in the container's local
/// coordinates. `translation` moves content flowed into this stripe from its
/// flowed position to its on-screen position.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnStripe {
    pub rect: Rect<Au>,
    pub translation: Vector2D<Au>,
}

/// Geometry and resolved style for one layer, produced by the layout
/// collaborator. This is the entire interface between layout and painting:
/// layout computes, we consume.
#[derive(Clone, Debug)]
pub struct LayerInfo {
    /// Offset of the border box from the parent layer's origin.
    pub origin: Point2D<Au>,
    /// Border box size.
    pub size: Size2D<Au>,
    /// Visual overflow of this layer's own box subtree, in local coordinates.
    pub overflow: Rect<Au>,
    /// Size of the scrollable content, for overflow containers.
    pub content_size: Size2D<Au>,
    pub position: PositionScheme,
    pub z_index: ZIndex,
    pub opacity: f32,
    /// The box's full transform (including any perspective contribution),
    /// relative to the border box origin.
    pub transform: Option<Transform3D<f32>>,
    /// Whether this box keeps its children in the 3D rendering context it
    /// participates in (`transform-style: preserve-3d`). When false the box
    /// is a flattening boundary.
    pub preserves_3d: bool,
    pub backface_visible: bool,
    pub overflow_x: Overflow,
    pub overflow_y: Overflow,
    /// The CSS `clip` rectangle. Applies to absolutely positioned boxes only.
    pub clip: Option<Rect<Au>>,
    pub has_rounded_corners: bool,
    pub has_clip_path: bool,
    pub has_filter: bool,
    /// How far the filter chain reads outside the border box.
    pub filter_outset: Au,
    pub has_mask: bool,
    pub has_outline: bool,
    pub blend_mode: MixBlendMode,
    pub resize: ResizeMode,
    /// Style visibility. An invisible layer can still have visible
    /// descendants.
    pub visible: bool,
    /// Whether the box subtree paints anything at all (a box with no
    /// background, border, or content does not).
    pub has_content: bool,
    pub scrollbar_style: ScrollbarStyle,
    /// Non-empty when this box establishes a multicolumn container.
    pub columns: Vec<ColumnStripe>,
}

impl Default for LayerInfo {
    fn default() -> Self {
        LayerInfo {
            origin: Point2D::zero(),
            size: Size2D::zero(),
            overflow: Rect::zero(),
            content_size: Size2D::zero(),
            position: PositionScheme::Static,
            z_index: ZIndex::Auto,
            opacity: 1.0,
            transform: None,
            preserves_3d: false,
            backface_visible: true,
            overflow_x: Overflow::Visible,
            overflow_y: Overflow::Visible,
            clip: None,
            has_rounded_corners: false,
            has_clip_path: false,
            has_filter: false,
            filter_outset: Au(0),
            has_mask: false,
            has_outline: false,
            blend_mode: MixBlendMode::Normal,
            resize: ResizeMode::None,
            visible: true,
            has_content: true,
            scrollbar_style: ScrollbarStyle::Classic,
            columns: Vec::new(),
        }
    }
}

bitflags! {
    /// Derived per-layer state. The `*_DIRTY` bits implement the lazy
    /// recomputation contract: setters only dirty, traversals recompute on
    /// demand.
    #[derive(Clone, Copy, Debug)]
    pub struct LayerFlags: u16 {
        /// This layer draws its own phases rather than being covered by the
        /// nearest self-painting ancestor's draws.
        const SELF_PAINTING = 1 << 0;
        /// Visible style and a box subtree that paints something.
        const HAS_VISIBLE_CONTENT = 1 << 1;
        /// Some descendant layer has visible content.
        const HAS_VISIBLE_DESCENDANT = 1 << 2;
        const VISIBLE_DESCENDANT_DIRTY = 1 << 3;
        /// The z-order buckets need a full rebuild before the next traversal.
        const Z_ORDER_DIRTY = 1 << 4;
        const NORMAL_FLOW_DIRTY = 1 << 5;
        /// Scroll indicator or resizer widgets exist for this layer.
        const HAS_OVERFLOW_CONTROLS = 1 << 6;
        /// Some descendant inside this stacking context leaves the z = 0
        /// plane, so hit testing must depth-sort here.
        const HAS_3D_DESCENDANT = 1 << 7;
        const HAS_3D_DESCENDANT_DIRTY = 1 << 8;
        /// Per-paint scratch: this layer opened a transparency group that is
        /// still waiting for its end call.
        const USED_TRANSPARENCY = 1 << 9;
        /// This layer is the reflection of its parent, stored outside the
        /// sibling list.
        const IS_REFLECTION = 1 << 10;
    }
}

/// The z-order buckets of a stacking context. Weak references into the tree;
/// rebuilt in full whenever dirty, never patched.
#[derive(Clone, Debug, Default)]
pub struct ZOrderLists {
    /// Descendant stacking contexts with negative z-index, ascending.
    pub negative: Vec<LayerId>,
    /// Descendant stacking contexts with non-negative z-index, ascending;
    /// ties keep collection (source) order.
    pub positive: Vec<LayerId>,
}

pub struct Layer {
    pub(crate) parent: Option<LayerId>,
    pub(crate) first_child: Option<LayerId>,
    pub(crate) last_child: Option<LayerId>,
    pub(crate) prev_sibling: Option<LayerId>,
    pub(crate) next_sibling: Option<LayerId>,
    /// The reflection child, excluded from the sibling list and from layer
    /// collection; painted separately by its host.
    pub(crate) reflection: Option<LayerId>,

    pub(crate) info: LayerInfo,
    pub(crate) scroll_offset: Vector2D<Au>,
    pub(crate) flags: LayerFlags,

    /// `Some` iff this layer is a stacking context.
    pub(crate) z_order: Option<ZOrderLists>,
    /// Direct children without stacking contexts of their own, painted
    /// inline with this layer's foreground phase in source order.
    pub(crate) normal_flow: Vec<LayerId>,

    pub(crate) clip_cache: ClipRectsCache,
}

impl Layer {
    pub(crate) fn new(info: LayerInfo) -> Layer {
        let mut layer = Layer {
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            reflection: None,
            info,
            scroll_offset: Vector2D::zero(),
            flags: LayerFlags::Z_ORDER_DIRTY |
                LayerFlags::NORMAL_FLOW_DIRTY |
                LayerFlags::VISIBLE_DESCENDANT_DIRTY |
                LayerFlags::HAS_3D_DESCENDANT_DIRTY,
            z_order: None,
            normal_flow: Vec::new(),
            clip_cache: ClipRectsCache::default(),
        };
        layer.update_visible_content_flag();
        layer
    }

    pub fn info(&self) -> &LayerInfo {
        &self.info
    }

    pub fn parent(&self) -> Option<LayerId> {
        self.parent
    }

    pub fn reflection(&self) -> Option<LayerId> {
        self.reflection
    }

    /// The z-order buckets; `Some` iff this layer is a stacking context.
    pub fn z_order(&self) -> Option<&ZOrderLists> {
        self.z_order.as_ref()
    }

    /// Direct children painted inline with this layer's foreground phase.
    pub fn normal_flow(&self) -> &[LayerId] {
        &self.normal_flow
    }

    pub fn scroll_offset(&self) -> Vector2D<Au> {
        self.scroll_offset
    }

    pub fn flags(&self) -> LayerFlags {
        self.flags
    }

    /// Whether this layer's style establishes a stacking context. The tree
    /// root is additionally always a stacking context regardless of style.
    pub fn establishes_stacking_context(&self) -> bool {
        let info = &self.info;
        info.transform.is_some() ||
            info.opacity < 1.0 ||
            info.has_mask ||
            info.has_filter ||
            info.blend_mode != MixBlendMode::Normal ||
            self.reflection.is_some() ||
            self.flags.contains(LayerFlags::IS_REFLECTION) ||
            (info.position.is_absolutely_positioned() && !info.z_index.is_auto()) ||
            self.scrolls_overflow()
    }

    pub fn effective_z_index(&self) -> i32 {
        self.info.z_index.effective()
    }

    pub fn is_self_painting(&self) -> bool {
        self.flags.contains(LayerFlags::SELF_PAINTING)
    }

    pub fn has_visible_content(&self) -> bool {
        self.flags.contains(LayerFlags::HAS_VISIBLE_CONTENT)
    }

    pub fn has_visible_descendant(&self) -> bool {
        self.flags.contains(LayerFlags::HAS_VISIBLE_DESCENDANT)
    }

    pub(crate) fn update_visible_content_flag(&mut self) {
        self.flags.set(
            LayerFlags::HAS_VISIBLE_CONTENT,
            self.info.visible && self.info.has_content,
        );
    }

    /// The border box, in the parent layer's coordinates.
    pub fn border_box(&self) -> Rect<Au> {
        Rect::new(self.info.origin, self.info.size)
    }

    /// The border box in this layer's own coordinates.
    pub fn local_bounds(&self) -> Rect<Au> {
        Rect::new(Point2D::zero(), self.info.size)
    }

    /// Visual overflow in this layer's own coordinates.
    pub fn local_overflow(&self) -> Rect<Au> {
        self.info.overflow
    }

    pub fn clips_overflow(&self) -> bool {
        self.info.overflow_x.clips() || self.info.overflow_y.clips()
    }

    pub fn scrolls_overflow(&self) -> bool {
        self.info.overflow_x.scrolls() || self.info.overflow_y.scrolls()
    }

    /// Whether a scroll indicator is warranted on the given axis right now.
    /// `scroll` always shows one; `auto` only once content actually
    /// overflows.
    pub fn needs_horizontal_scrollbar(&self) -> bool {
        match self.info.overflow_x {
            Overflow::Scroll => true,
            Overflow::Auto => self.info.content_size.width > self.info.size.width,
            _ => false,
        }
    }

    pub fn needs_vertical_scrollbar(&self) -> bool {
        match self.info.overflow_y {
            Overflow::Scroll => true,
            Overflow::Auto => self.info.content_size.height > self.info.size.height,
            _ => false,
        }
    }

    pub fn needs_resizer(&self) -> bool {
        self.info.resize != ResizeMode::None
    }

    /// The viewport available to scrolled content: the border box minus any
    /// space classic scrollbars consume. Overlay scrollbars cost nothing.
    pub fn visible_size(&self) -> Size2D<Au> {
        let mut size = self.info.size;
        if self.info.scrollbar_style == ScrollbarStyle::Classic {
            if self.needs_vertical_scrollbar() {
                size.width = (size.width - SCROLLBAR_THICKNESS).max(Au(0));
            }
            if self.needs_horizontal_scrollbar() {
                size.height = (size.height - SCROLLBAR_THICKNESS).max(Au(0));
            }
        }
        size
    }

    /// The box the given scroll indicator occupies, in local coordinates.
    pub fn scrollbar_rect(&self, horizontal: bool) -> Rect<Au> {
        let visible = self.visible_size();
        if horizontal {
            Rect::new(
                Point2D::new(Au(0), visible.height),
                Size2D::new(visible.width, SCROLLBAR_THICKNESS),
            )
        } else {
            Rect::new(
                Point2D::new(visible.width, Au(0)),
                Size2D::new(SCROLLBAR_THICKNESS, visible.height),
            )
        }
    }

    pub fn resizer_rect(&self) -> Rect<Au> {
        let visible = self.visible_size();
        Rect::new(
            Point2D::new(visible.width, visible.height),
            Size2D::new(SCROLLBAR_THICKNESS, SCROLLBAR_THICKNESS),
        )
    }

    pub fn is_transparent(&self) -> bool {
        self.info.opacity < 1.0
    }

    pub fn paints_with_transform(&self) -> bool {
        self.info.transform.is_some()
    }

    pub fn paints_with_filters(&self) -> bool {
        self.info.has_filter
    }

    pub fn has_3d_transform(&self) -> bool {
        self.info
            .transform
            .as_ref()
            .is_some_and(has_3d_component)
    }

    pub fn is_reflection(&self) -> bool {
        self.flags.contains(LayerFlags::IS_REFLECTION)
    }
}
