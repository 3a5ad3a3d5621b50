/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use app_units::Au;
use euclid::default::{Size2D, Vector2D};
use layers::{
    handle_scroll_event, scroll_to, LayerInfo, LayerTree, Overflow, ResizeMode,
    ScrollbarOrientation, ScrollResult, ScrollbarStyle,
};

use crate::common::*;

fn scroller_info(content_w: i32, content_h: i32) -> LayerInfo {
    LayerInfo {
        overflow_x: Overflow::Scroll,
        overflow_y: Overflow::Scroll,
        content_size: Size2D::new(Au::from_px(content_w), Au::from_px(content_h)),
        scrollbar_style: ScrollbarStyle::Overlay,
        ..content_box(0, 0, 100, 100)
    }
}

#[test]
fn scenario_c_offsets_clamp_against_the_overhang() {
    let mut tree = LayerTree::new();
    let root = tree.create_root(content_box(0, 0, 200, 200));
    // content - viewport = (50, 200).
    let scroller = tree.create_layer(root, scroller_info(150, 300));

    let result = scroll_to(
        &mut tree,
        scroller,
        Vector2D::new(Au::from_px(10), Au::from_px(1000)),
    );
    assert_eq!(result, ScrollResult::Changed);
    assert_eq!(
        tree.layer(scroller).scroll_offset(),
        Vector2D::new(Au::from_px(10), Au::from_px(200)),
    );
}

#[test]
fn scrolling_to_the_same_offset_reports_unchanged() {
    let mut tree = LayerTree::new();
    let root = tree.create_root(content_box(0, 0, 200, 200));
    let scroller = tree.create_layer(root, scroller_info(150, 300));

    let offset = Vector2D::new(Au::from_px(10), Au::from_px(10));
    assert_eq!(scroll_to(&mut tree, scroller, offset), ScrollResult::Changed);
    assert_eq!(
        scroll_to(&mut tree, scroller, offset),
        ScrollResult::Unchanged,
    );
}

#[test]
fn scroll_events_reach_the_scroller_under_the_cursor() {
    let mut tree = LayerTree::new();
    let root = tree.create_root(content_box(0, 0, 200, 200));
    let scroller = tree.create_layer(root, scroller_info(100, 400));

    let result = handle_scroll_event(
        &mut tree,
        root,
        Vector2D::new(Au(0), Au::from_px(25)),
        px_point(50, 50),
    );
    assert_eq!(result, ScrollResult::Changed);
    assert_eq!(
        tree.layer(scroller).scroll_offset(),
        Vector2D::new(Au(0), Au::from_px(25)),
    );

    // A cursor outside every scroller leaves the tree untouched.
    let result = handle_scroll_event(
        &mut tree,
        root,
        Vector2D::new(Au(0), Au::from_px(25)),
        px_point(150, 150),
    );
    assert_eq!(result, ScrollResult::Unhandled);
}

#[test]
fn style_changes_create_and_destroy_overflow_controls() {
    let mut tree = LayerTree::new();
    let root = tree.create_root(content_box(0, 0, 200, 200));
    let info = scroller_info(150, 300);
    let target = tree.create_layer(root, info.clone());

    let log = CommandLog::default();
    let mut host = RecordingHost::new(log.clone());
    tree.update_info(&mut host, target, info);
    assert!(host
        .created
        .iter()
        .any(|(layer, orientation, _)| {
            *layer == target && *orientation == ScrollbarOrientation::Vertical
        }));
    assert!(host
        .created
        .iter()
        .any(|(layer, orientation, _)| {
            *layer == target && *orientation == ScrollbarOrientation::Horizontal
        }));

    // Back to overflow: visible; both indicators go away.
    let mut plain = tree.layer(target).info().clone();
    plain.overflow_x = Overflow::Visible;
    plain.overflow_y = Overflow::Visible;
    tree.update_info(&mut host, target, plain);
    assert!(host
        .destroyed
        .contains(&(target, ScrollbarOrientation::Vertical)));
    assert!(host
        .destroyed
        .contains(&(target, ScrollbarOrientation::Horizontal)));
}

#[test]
fn resize_mode_alone_does_not_create_a_stacking_context() {
    let mut tree = LayerTree::new();
    let root = tree.create_root(content_box(0, 0, 200, 200));
    let info = LayerInfo {
        resize: ResizeMode::Both,
        ..content_box(0, 0, 50, 50)
    };
    let target = tree.create_layer(root, info.clone());

    let log = CommandLog::default();
    let mut host = RecordingHost::new(log.clone());
    tree.update_info(&mut host, target, info);

    assert!(!tree.is_stacking_context(target));
    assert!(tree.layer(target).is_self_painting());
}
