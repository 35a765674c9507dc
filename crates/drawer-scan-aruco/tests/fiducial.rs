use drawer_scan_aruco::{
    CaseCorner, FiducialDetector, FiducialError, FiducialParams, PreprocessPass, DICT_4X4_50,
};
use image::{Rgb, RgbImage};
use nalgebra::Point2;

const CELL: u32 = 10;

/// Draw a DICT_4X4_50 marker with a one-cell black border, upright, with
/// its top-left pixel at `(x0, y0)`.
fn draw_marker(img: &mut RgbImage, id: usize, x0: u32, y0: u32) {
    let code = DICT_4X4_50.codes[id];
    for cy in 0..6u32 {
        for cx in 0..6u32 {
            let border = cx == 0 || cy == 0 || cx == 5 || cy == 5;
            let black = border || (code >> ((cy - 1) * 4 + (cx - 1))) & 1 == 1;
            let px = if black { Rgb([15, 15, 15]) } else { Rgb([240, 240, 240]) };
            for yy in 0..CELL {
                for xx in 0..CELL {
                    img.put_pixel(x0 + cx * CELL + xx, y0 + cy * CELL + yy, px);
                }
            }
        }
    }
}

fn case_image(ids: &[usize]) -> RgbImage {
    let mut img = RgbImage::from_pixel(400, 300, Rgb([225, 225, 225]));
    let places = [(1, 20, 20), (3, 320, 20), (4, 20, 220), (2, 320, 220)];
    for (id, x, y) in places {
        if ids.contains(&id) {
            draw_marker(&mut img, id, x, y);
        }
    }
    img
}

fn assert_near(got: Point2<f32>, want: (f32, f32)) {
    let d = (got - Point2::new(want.0, want.1)).norm();
    assert!(d < 1.0, "got {got:?}, want {want:?}");
}

#[test]
fn inner_marker_corners_become_case_corners() {
    let detector = FiducialDetector::new(FiducialParams::default()).expect("detector");
    let found = detector.detect(&case_image(&[1, 2, 3, 4])).expect("all corners");

    assert_eq!(found.passes_run, 1);
    assert_near(found.corners.get(CaseCorner::TopLeft), (79.5, 79.5));
    assert_near(found.corners.get(CaseCorner::TopRight), (319.5, 79.5));
    assert_near(found.corners.get(CaseCorner::BottomLeft), (79.5, 219.5));
    assert_near(found.corners.get(CaseCorner::BottomRight), (319.5, 219.5));
}

#[test]
fn missing_marker_is_reported_after_all_passes() {
    let params = FiducialParams::default();
    let n_passes = params.passes.len();
    let detector = FiducialDetector::new(params).expect("detector");

    let err = detector
        .detect(&case_image(&[1, 3, 4]))
        .expect_err("bottom-right marker is absent");
    match err {
        FiducialError::MissingCorners(missing) => {
            assert_eq!(missing.len(), 1);
            assert_eq!(missing[0].corner, CaseCorner::BottomRight);
            assert_eq!(missing[0].marker_id, 2);
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(n_passes > 1);
}

#[test]
fn upscaled_pass_recovers_marker_at_image_edge() {
    // Marker 1 sits 2 px from the top-left edge, inside the raw pass's
    // 3 px border exclusion; at twice the size it clears the border.
    let mut img = case_image(&[2, 3, 4]);
    draw_marker(&mut img, 1, 2, 2);

    let raw_only = FiducialDetector::new(FiducialParams {
        passes: vec![PreprocessPass::Raw],
        ..FiducialParams::default()
    })
    .expect("detector");
    match raw_only.detect(&img) {
        Err(FiducialError::MissingCorners(missing)) => {
            assert_eq!(missing.len(), 1);
            assert_eq!(missing[0].marker_id, 1);
        }
        other => panic!("raw pass alone should miss marker 1, got {other:?}"),
    }

    let detector = FiducialDetector::new(FiducialParams {
        passes: vec![PreprocessPass::Raw, PreprocessPass::Upscaled { factor: 2.0 }],
        ..FiducialParams::default()
    })
    .expect("detector");
    let found = detector.detect(&img).expect("all corners");
    assert_eq!(found.passes_run, 2);

    // Recovered corner is in input-image coordinates.
    assert_near(found.corners.get(CaseCorner::TopLeft), (61.5, 61.5));

    // Markers from the raw pass keep their raw corners; the upscaled pass
    // re-finds them with slightly different values.
    let reference = FiducialDetector::new(FiducialParams {
        passes: vec![PreprocessPass::Raw],
        ..FiducialParams::default()
    })
    .expect("detector")
    .detect(&case_image(&[1, 2, 3, 4]))
    .expect("all corners");
    for id in [2u32, 3, 4] {
        let got = found.markers[&id].corners;
        let want = reference.markers[&id].corners;
        for (g, w) in got.iter().zip(want.iter()) {
            assert!((g - w).norm() < 1e-4, "marker {id}: {g:?} vs {w:?}");
        }
    }
}

#[test]
fn upscaled_first_pass_reports_input_coordinates() {
    let detector = FiducialDetector::new(FiducialParams {
        passes: vec![PreprocessPass::Upscaled { factor: 2.0 }],
        ..FiducialParams::default()
    })
    .expect("detector");
    let found = detector.detect(&case_image(&[1, 2, 3, 4])).expect("all corners");

    assert_eq!(found.passes_run, 1);
    assert_near(found.corners.get(CaseCorner::TopLeft), (79.5, 79.5));
    assert_near(found.corners.get(CaseCorner::TopRight), (319.5, 79.5));
    assert_near(found.corners.get(CaseCorner::BottomLeft), (79.5, 219.5));
    assert_near(found.corners.get(CaseCorner::BottomRight), (319.5, 219.5));
}
