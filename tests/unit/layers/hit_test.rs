/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use app_units::Au;
use euclid::default::{Size2D, Transform3D, Vector2D};
use euclid::Angle;
use layers::{
    hit_test, hit_test_rect, paint, scroll_to, ColumnStripe, LayerInfo, LayerTree, Overflow,
    PositionScheme, ScrollbarStyle,
};

use crate::common::*;

#[test]
fn scenario_a_topmost_of_equal_z_siblings_wins() {
    let mut tree = LayerTree::new();
    let root = tree.create_root(content_box(0, 0, 200, 200));
    let _minus_two = tree.create_layer(root, stacking_box(0, 0, 10, 10, -2));
    let _zero_first = tree.create_layer(root, stacking_box(20, 20, 20, 20, 0));
    let _three = tree.create_layer(root, stacking_box(60, 60, 10, 10, 3));
    let zero_second = tree.create_layer(root, stacking_box(30, 30, 20, 20, 0));

    // (35, 35) lies in the overlap of the two z-index 0 siblings; the
    // second is visually on top because it paints later.
    let hit = hit_test(&mut tree, px_point(35, 35)).unwrap();
    assert_eq!(hit.layer, zero_second);
    assert_eq!(hit.point, px_point(5, 5));
}

#[test]
fn hit_order_is_the_inverse_of_paint_order() {
    let mut tree = LayerTree::new();
    let root = tree.create_root(content_box(0, 0, 200, 200));
    let _a = tree.create_layer(root, stacking_box(10, 10, 50, 50, 0));
    let _b = tree.create_layer(root, stacking_box(20, 20, 50, 50, 0));
    let _c = tree.create_layer(root, stacking_box(30, 30, 50, 50, 0));

    let log = CommandLog::default();
    let mut backend = RecordingBackend::new(log.clone());
    let mut host = RecordingHost::new(log.clone());
    paint(
        &mut tree,
        &mut backend,
        &mut host,
        px_rect(-1000, -1000, 4000, 4000),
    );
    let commands = log.commands();

    for point in [px_point(15, 15), px_point(25, 25), px_point(35, 35), px_point(65, 65)] {
        // The layer painted last among those containing the point is the one
        // hit-tested first.
        let expected = commands
            .iter()
            .filter_map(|command| match command {
                Command::Draw(layer, _, rect) if rect.contains(point) => Some(*layer),
                _ => None,
            })
            .last();
        let hit = hit_test(&mut tree, point).map(|result| result.layer);
        assert_eq!(hit, expected, "at {:?}", point);
    }
}

#[test]
fn scenario_d_depth_sorting_beats_paint_order_in_3d_contexts() {
    let mut tree = LayerTree::new();
    let root = tree.create_root(content_box(0, 0, 200, 200));
    let near = tree.create_layer(
        root,
        LayerInfo {
            transform: Some(Transform3D::translation(0.0, 0.0, 10.0)),
            ..content_box(0, 0, 100, 100)
        },
    );
    // Painted later (same z-index, later in source order), but further from
    // the viewer.
    let far = tree.create_layer(
        root,
        LayerInfo {
            transform: Some(Transform3D::translation(0.0, 0.0, 5.0)),
            ..content_box(0, 0, 100, 100)
        },
    );

    let hit = hit_test(&mut tree, px_point(50, 50)).unwrap();
    assert_eq!(hit.layer, near);
    assert_ne!(hit.layer, far);
    assert_eq!(hit.point, px_point(50, 50));
}

#[test]
fn flat_overlapping_transforms_keep_paint_order() {
    let mut tree = LayerTree::new();
    let root = tree.create_root(content_box(0, 0, 200, 200));
    let _first = tree.create_layer(
        root,
        LayerInfo {
            transform: Some(Transform3D::identity()),
            ..content_box(0, 0, 100, 100)
        },
    );
    let second = tree.create_layer(
        root,
        LayerInfo {
            transform: Some(Transform3D::identity()),
            ..content_box(0, 0, 100, 100)
        },
    );

    // No 3D content anywhere: the later sibling wins on walk order alone.
    let hit = hit_test(&mut tree, px_point(50, 50)).unwrap();
    assert_eq!(hit.layer, second);
}

#[test]
fn backface_culling_excludes_only_the_culled_node() {
    let mut tree = LayerTree::new();
    let root = tree.create_root(content_box(0, 0, 200, 200));
    let flipped = tree.create_layer(
        root,
        LayerInfo {
            transform: Some(Transform3D::rotation(0.0, 1.0, 0.0, Angle::pi())),
            backface_visible: false,
            ..content_box(0, 0, 50, 50)
        },
    );
    let sibling = tree.create_layer(root, stacking_box(100, 100, 50, 50, 0));

    // The flipped box shows its back: it is not a candidate anywhere.
    let over_flipped = hit_test(&mut tree, px_point(-25, 25));
    assert!(over_flipped.map_or(true, |result| result.layer != flipped));

    // Unrelated siblings are unaffected.
    let hit = hit_test(&mut tree, px_point(125, 125)).unwrap();
    assert_eq!(hit.layer, sibling);
}

#[test]
fn visible_backfaces_still_hit() {
    let mut tree = LayerTree::new();
    let root = tree.create_root(content_box(0, 0, 200, 200));
    let flipped = tree.create_layer(
        root,
        LayerInfo {
            transform: Some(Transform3D::rotation(0.0, 1.0, 0.0, Angle::pi())),
            ..content_box(0, 0, 50, 50)
        },
    );

    // Rotation about the y axis of the border box origin mirrors the box to
    // negative x.
    let hit = hit_test(&mut tree, px_point(-25, 25)).unwrap();
    assert_eq!(hit.layer, flipped);
}

#[test]
fn non_invertible_transforms_miss_entirely() {
    let mut tree = LayerTree::new();
    let root = tree.create_root(LayerInfo {
        has_content: false,
        ..content_box(0, 0, 200, 200)
    });
    let _degenerate = tree.create_layer(
        root,
        LayerInfo {
            transform: Some(Transform3D::scale(0.0, 0.0, 1.0)),
            ..content_box(0, 0, 100, 100)
        },
    );

    assert_eq!(hit_test(&mut tree, px_point(50, 50)), None);
}

#[test]
fn scrolled_content_hits_at_its_shifted_position() {
    let mut tree = LayerTree::new();
    let root = tree.create_root(content_box(0, 0, 200, 200));
    let scroller = tree.create_layer(
        root,
        LayerInfo {
            overflow_y: Overflow::Scroll,
            content_size: Size2D::new(Au::from_px(100), Au::from_px(400)),
            scrollbar_style: ScrollbarStyle::Overlay,
            ..content_box(0, 0, 100, 100)
        },
    );
    let child = tree.create_layer(scroller, stacking_box(0, 150, 20, 20, 0));

    // Unscrolled, the child sits below the viewport.
    assert_ne!(
        hit_test(&mut tree, px_point(10, 55)).map(|r| r.layer),
        Some(child),
    );

    scroll_to(&mut tree, scroller, Vector2D::new(Au(0), Au::from_px(100)));
    let hit = hit_test(&mut tree, px_point(10, 55)).unwrap();
    assert_eq!(hit.layer, child);
    assert_eq!(hit.point, px_point(10, 5));
}

#[test]
fn ancestor_clips_reject_before_transforms_are_entered() {
    let mut tree = LayerTree::new();
    let root = tree.create_root(content_box(0, 0, 200, 200));
    let clipping = tree.create_layer(
        root,
        LayerInfo {
            position: PositionScheme::Relative,
            overflow_x: Overflow::Hidden,
            overflow_y: Overflow::Hidden,
            ..content_box(0, 0, 50, 50)
        },
    );
    let shifted = tree.create_layer(
        clipping,
        LayerInfo {
            transform: Some(Transform3D::translation(60.0, 0.0, 0.0)),
            ..content_box(0, 0, 40, 40)
        },
    );

    // The transform moves the box to x in [60, 100], but the ancestor clip
    // ends at x = 50: the point never reaches the transformed subtree.
    let hit = hit_test(&mut tree, px_point(70, 10)).unwrap();
    assert_ne!(hit.layer, shifted);
    assert_eq!(hit.layer, root);
}

#[test]
fn area_queries_collect_every_hit_topmost_first() {
    let mut tree = LayerTree::new();
    let root = tree.create_root(content_box(0, 0, 200, 200));
    let below = tree.create_layer(root, stacking_box(10, 10, 50, 50, -1));
    let above = tree.create_layer(root, stacking_box(20, 20, 50, 50, 2));
    let _elsewhere = tree.create_layer(root, stacking_box(300, 300, 50, 50, 0));

    let hits = hit_test_rect(&mut tree, px_rect(25, 25, 10, 10));
    assert_eq!(hits, vec![above, root, below]);
}

#[test]
fn column_fragments_probe_the_last_column_first() {
    let mut tree = LayerTree::new();
    let root = tree.create_root(content_box(0, 0, 200, 200));
    let multicol = tree.create_layer(
        root,
        LayerInfo {
            columns: vec![
                ColumnStripe {
                    rect: px_rect(0, 0, 50, 100),
                    translation: Vector2D::zero(),
                },
                ColumnStripe {
                    rect: px_rect(50, 0, 50, 100),
                    translation: Vector2D::new(Au::from_px(50), Au::from_px(-100)),
                },
            ],
            ..content_box(0, 0, 100, 100)
        },
    );
    let fragmented = tree.create_layer(multicol, stacking_box(0, 150, 20, 20, 0));

    // The fragment flows at y = 150 and displays in the second column.
    let hit = hit_test(&mut tree, px_point(55, 55)).unwrap();
    assert_eq!(hit.layer, fragmented);
    assert_eq!(hit.point, px_point(5, 5));
}
