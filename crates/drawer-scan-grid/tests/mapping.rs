use approx::assert_relative_eq;
use drawer_scan_core::PixelRect;
use drawer_scan_grid::{
    CellDefinition, CellPosition, GridMapper, LabelCandidate, LayoutTemplate, MappingPolicy,
    SizeClass,
};

fn size(name: &str, w: u32, h: u32) -> SizeClass {
    SizeClass {
        name: name.to_string(),
        width_units: w,
        height_units: h,
    }
}

fn drawer(row: u32, col: u32, size: &str) -> CellDefinition {
    CellDefinition {
        row,
        col,
        size: size.to_string(),
    }
}

fn label(cx: u32, cy: u32, w: u32, h: u32) -> LabelCandidate {
    let bbox = PixelRect::new(cx - w / 2, cy - h / 2, w, h);
    LabelCandidate::from_bbox(bbox, (w * h) as f32)
}

/// 4×2 case: a double-width drawer at (1,1) spanning columns 1-2, singles
/// elsewhere.
fn mixed_case() -> (LayoutTemplate, Vec<SizeClass>) {
    let layout = LayoutTemplate {
        name: "Mixed 4x2".to_string(),
        columns: 4,
        rows: 2,
        cells: vec![
            drawer(1, 1, "double"),
            drawer(1, 3, "single"),
            drawer(1, 4, "single"),
            drawer(2, 1, "single"),
            drawer(2, 2, "single"),
            drawer(2, 3, "single"),
            drawer(2, 4, "single"),
        ],
    };
    (layout, vec![size("single", 1, 1), size("double", 2, 1)])
}

#[test]
fn double_width_drawer_gets_twice_the_unit_width() {
    let (layout, sizes) = mixed_case();
    let bounds = PixelRect::from_size(800, 400);
    let m = GridMapper::default().map(&[], &bounds, &layout, &sizes);

    let double = m
        .boundaries
        .iter()
        .find(|b| b.position == CellPosition::new(1, 1))
        .expect("boundary");
    assert_relative_eq!(m.unit_width, 200.0);
    assert_relative_eq!(double.width(), 2.0 * m.unit_width);
    assert_eq!(double.height(), m.unit_height);
}

#[test]
fn label_centered_in_wide_drawer_maps_to_it() {
    let (layout, sizes) = mixed_case();
    let bounds = PixelRect::from_size(800, 400);
    // Centered on the column 1/2 seam, where no 1x1 cell owns it.
    let labels = vec![label(200, 100, 160, 40), label(500, 100, 140, 40)];
    let m = GridMapper::default().map(&labels, &bounds, &layout, &sizes);

    assert_eq!(m.policy, MappingPolicy::VariableSize);
    assert_eq!(m.get(CellPosition::new(1, 1)).map(|a| a.candidate_index), Some(0));
    assert_eq!(m.get(CellPosition::new(1, 3)).map(|a| a.candidate_index), Some(1));
    assert!(m.get(CellPosition::new(1, 2)).is_none());
}

#[test]
fn far_away_label_is_dropped() {
    let layout = LayoutTemplate {
        name: "Sparse".to_string(),
        columns: 4,
        rows: 4,
        cells: vec![drawer(1, 1, "single")],
    };
    let sizes = vec![size("single", 1, 1)];
    let bounds = PixelRect::from_size(400, 400);
    let m = GridMapper::default().map(&[label(350, 350, 60, 20)], &bounds, &layout, &sizes);
    assert!(m.assignments.is_empty());
}

#[test]
fn mapping_is_repeatable() {
    let (layout, sizes) = mixed_case();
    let bounds = PixelRect::from_size(800, 400);
    let labels = vec![
        label(300, 300, 120, 30),
        label(320, 290, 150, 30),
        label(700, 100, 120, 30),
        label(100, 300, 120, 30),
    ];
    let mapper = GridMapper::default();
    let a = mapper.map(&labels, &bounds, &layout, &sizes);
    let b = mapper.map(&labels, &bounds, &layout, &sizes);
    assert_eq!(a, b);
    // The larger of the two overlapping labels wins drawer (2,2).
    assert_eq!(a.get(CellPosition::new(2, 2)).map(|x| x.candidate_index), Some(1));
}
