/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Test doubles and fixtures shared by the layer tests: a recording drawing
//! backend and widget host writing into one shared command log, so ordering
//! across the two collaborators can be asserted.

use std::cell::RefCell;
use std::rc::Rc;

use app_units::Au;
use euclid::default::{Point2D, Rect, Size2D, Transform3D};
use layers::{
    LayerId, LayerInfo, OverflowControlHost, PaintBackend, PaintPhase, PositionScheme,
    ScrollbarOrientation, ScrollbarStyle, ZIndex,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Save,
    Restore,
    Clip(Rect<Au>, bool),
    Transform(Transform3D<f32>),
    BeginTransparency(f32),
    EndTransparency,
    BeginFilter(Rect<Au>),
    EndFilter,
    Draw(LayerId, PaintPhase, Rect<Au>),
    ScrollIndicator(LayerId, ScrollbarOrientation),
    Resizer(LayerId),
}

/// One log shared by the backend and the widget host.
#[derive(Clone, Default)]
pub struct CommandLog(Rc<RefCell<Vec<Command>>>);

impl CommandLog {
    pub fn push(&self, command: Command) {
        self.0.borrow_mut().push(command);
    }

    pub fn commands(&self) -> Vec<Command> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

pub struct RecordingBackend {
    pub log: CommandLog,
}

impl RecordingBackend {
    pub fn new(log: CommandLog) -> RecordingBackend {
        RecordingBackend { log }
    }
}

impl PaintBackend for RecordingBackend {
    fn save(&mut self) {
        self.log.push(Command::Save);
    }
    fn restore(&mut self) {
        self.log.push(Command::Restore);
    }
    fn clip_to_rect(&mut self, rect: &Rect<Au>, has_rounded_corners: bool) {
        self.log.push(Command::Clip(*rect, has_rounded_corners));
    }
    fn concat_transform(&mut self, transform: &Transform3D<f32>) {
        self.log.push(Command::Transform(*transform));
    }
    fn begin_transparency_layer(&mut self, opacity: f32) {
        self.log.push(Command::BeginTransparency(opacity));
    }
    fn end_transparency_layer(&mut self) {
        self.log.push(Command::EndTransparency);
    }
    fn begin_filter(&mut self, source_rect: &Rect<Au>) {
        self.log.push(Command::BeginFilter(*source_rect));
    }
    fn end_filter(&mut self) {
        self.log.push(Command::EndFilter);
    }
    fn draw_layer_into_rect(&mut self, layer: LayerId, phase: PaintPhase, rect: &Rect<Au>) {
        self.log.push(Command::Draw(layer, phase, *rect));
    }
}

#[derive(Default)]
pub struct RecordingHost {
    pub log: CommandLog,
    pub created: Vec<(LayerId, ScrollbarOrientation, ScrollbarStyle)>,
    pub destroyed: Vec<(LayerId, ScrollbarOrientation)>,
}

impl RecordingHost {
    pub fn new(log: CommandLog) -> RecordingHost {
        RecordingHost {
            log,
            created: Vec::new(),
            destroyed: Vec::new(),
        }
    }
}

impl OverflowControlHost for RecordingHost {
    fn create_scroll_indicator(
        &mut self,
        layer: LayerId,
        orientation: ScrollbarOrientation,
        style: ScrollbarStyle,
    ) {
        self.created.push((layer, orientation, style));
    }
    fn destroy_scroll_indicator(&mut self, layer: LayerId, orientation: ScrollbarOrientation) {
        self.destroyed.push((layer, orientation));
    }
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
        layer: LayerId,
        orientation: ScrollbarOrientation,
        _rect: &Rect<Au>,
    ) {
        self.log.push(Command::ScrollIndicator(layer, orientation));
    }
    fn create_resizer(&mut self, _layer: LayerId) {}
    fn destroy_resizer(&mut self, _layer: LayerId) {}
    fn paint_resizer(&mut self, _backend: &mut dyn PaintBackend, layer: LayerId, _rect: &Rect<Au>) {
        self.log.push(Command::Resizer(layer));
    }
}

pub fn px_rect(x: i32, y: i32, width: i32, height: i32) -> Rect<Au> {
    Rect::new(
        Point2D::new(Au::from_px(x), Au::from_px(y)),
        Size2D::new(Au::from_px(width), Au::from_px(height)),
    )
}

pub fn px_point(x: i32, y: i32) -> Point2D<Au> {
    Point2D::new(Au::from_px(x), Au::from_px(y))
}

/// A box that paints content and fills the given rectangle of its parent.
pub fn content_box(x: i32, y: i32, width: i32, height: i32) -> LayerInfo {
    let rect = px_rect(x, y, width, height);
    LayerInfo {
        origin: rect.origin,
        size: rect.size,
        overflow: Rect::new(Point2D::zero(), rect.size),
        ..LayerInfo::default()
    }
}

/// An absolutely positioned box with an explicit z-index, which makes it a
/// stacking context.
pub fn stacking_box(x: i32, y: i32, width: i32, height: i32, z_index: i32) -> LayerInfo {
    LayerInfo {
        position: PositionScheme::Absolute,
        z_index: ZIndex::Integer(z_index),
        ..content_box(x, y, width, height)
    }
}

/// The sequence of layers whose background phase was drawn, in draw order.
pub fn background_draw_order(commands: &[Command]) -> Vec<LayerId> {
    commands
        .iter()
        .filter_map(|command| match command {
            Command::Draw(layer, PaintPhase::Background, _) => Some(*layer),
            _ => None,
        })
        .collect()
}

/// The draws of `layer`, as (phase, rect) pairs in order.
pub fn draws_of(commands: &[Command], layer: LayerId) -> Vec<(PaintPhase, Rect<Au>)> {
    commands
        .iter()
        .filter_map(|command| match command {
            Command::Draw(drawn, phase, rect) if *drawn == layer => Some((*phase, *rect)),
            _ => None,
        })
        .collect()
}

/// The index of the first draw of `layer` with `phase`.
pub fn draw_index(commands: &[Command], layer: LayerId, phase: PaintPhase) -> Option<usize> {
    commands.iter().position(
        |command| matches!(command, Command::Draw(drawn, p, _) if *drawn == layer && *p == phase),
    )
}
