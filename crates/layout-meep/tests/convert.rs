use layout_meep::{
    device_to_meep, get_layer_mapping, layout_file_to_meep, translate, Cell, LayerMapping,
    LayerMaterial, LayerSet, Layout, LayoutError, MeepGeometry, MeepPrimitive, Medium, Polygon,
    PolygonGroup, TranslationConfig, LAYER_PORT, LAYER_SOURCE,
};
use nalgebra::{Point2, Vector3};
use pretty_assertions::assert_eq;
use std::io::Write;

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
    Polygon::new(vec![
        Point2::new(x0, y0),
        Point2::new(x1, y0),
        Point2::new(x1, y1),
        Point2::new(x0, y1),
    ])
}

fn mapping() -> LayerMapping {
    get_layer_mapping(&LayerSet::photonic()).unwrap()
}

fn floorplan(w: f64, h: f64) -> PolygonGroup {
    PolygonGroup::new(99, vec![rect(-w / 2.0, -h / 2.0, w / 2.0, h / 2.0)])
}

fn vertices(g: &MeepGeometry) -> &[Vector3<f64>] {
    match &g.primitive {
        MeepPrimitive::Prism { vertices, .. } => vertices,
        other => panic!("Expected Prism, got {:?}", other),
    }
}

#[test]
fn loop_mirror_scenario() {
    let guide = vec![
        Point2::new(0.0, 0.0),
        Point2::new(8.0, 0.0),
        Point2::new(8.0, 0.35),
        Point2::new(0.0, 0.35),
    ];
    let groups = vec![
        floorplan(31.0, 15.0),
        PolygonGroup::new(22, vec![Polygon::new(guide)]),
        PolygonGroup::new(LAYER_SOURCE, vec![rect(-7.05, -0.5, -6.95, 0.5)]),
        PolygonGroup::new(LAYER_PORT, vec![rect(-6.05, -0.5, -5.95, 0.5)]),
    ];

    let conv = device_to_meep(groups, &mapping()).unwrap();

    assert_eq!(conv.cell_size, Vector3::new(31.0, 15.0, 0.0));
    assert_eq!(conv.geometry.len(), 1);
    assert_eq!(
        vertices(&conv.geometry[0]),
        &[
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(8.0, 0.0, 0.0),
            Vector3::new(8.0, 0.35, 0.0),
            Vector3::new(0.0, 0.35, 0.0),
        ]
    );
    assert_eq!(conv.geometry[0].material, Medium::silicon());
    match &conv.geometry[0].primitive {
        MeepPrimitive::Prism { height, .. } => assert_eq!(*height, 0.0),
        other => panic!("Expected Prism, got {:?}", other),
    }
    assert!(conv.skipped_layers.is_empty());
}

#[test]
fn solid_count_equals_polygon_count() {
    let mut mapping = mapping();
    mapping.insert(21, LayerMaterial::Physical(Medium::from_index("Si", 3.45)));

    let groups = vec![
        floorplan(20.0, 10.0),
        PolygonGroup::new(22, vec![rect(0.0, 0.0, 1.0, 1.0), rect(1.0, 0.0, 2.0, 1.0), rect(3.0, 0.0, 4.0, 2.0)]),
        PolygonGroup::new(21, vec![rect(0.0, 3.0, 5.0, 4.0), rect(0.0, 5.0, 5.0, 6.0)]),
    ];
    let conv = device_to_meep(groups, &mapping).unwrap();
    assert_eq!(conv.geometry.len(), 5);
}

#[test]
fn metadata_layers_never_emit_solids() {
    let base = vec![
        floorplan(20.0, 10.0),
        PolygonGroup::new(22, vec![rect(0.0, 0.0, 1.0, 1.0)]),
    ];
    let mut with_markers = base.clone();
    with_markers.insert(1, PolygonGroup::new(LAYER_SOURCE, vec![rect(-2.0, -1.0, -1.9, 1.0)]));
    with_markers.push(PolygonGroup::new(LAYER_PORT, vec![rect(5.0, -1.0, 5.1, 1.0), rect(6.0, -1.0, 6.1, 1.0)]));

    let plain = device_to_meep(base, &mapping()).unwrap();
    let marked = device_to_meep(with_markers, &mapping()).unwrap();
    assert_eq!(plain, marked);
}

#[test]
fn cell_size_comes_only_from_boundary_layer() {
    let convert = |guide: Polygon, boundary: PolygonGroup| {
        device_to_meep(vec![PolygonGroup::new(22, vec![guide]), boundary], &mapping())
            .unwrap()
            .cell_size
    };

    let small_guide = convert(rect(0.0, 0.0, 1.0, 1.0), floorplan(31.0, 15.0));
    let huge_guide = convert(rect(-100.0, -100.0, 100.0, 100.0), floorplan(31.0, 15.0));
    assert_eq!(small_guide, huge_guide);

    let resized = convert(rect(0.0, 0.0, 1.0, 1.0), floorplan(12.0, 4.0));
    assert_eq!(resized, Vector3::new(12.0, 4.0, 0.0));
}

#[test]
fn unknown_layer_is_skipped() {
    let groups = vec![
        PolygonGroup::new(22, vec![rect(0.0, 0.0, 1.0, 1.0)]),
        PolygonGroup::new(42, vec![rect(0.0, 0.0, 50.0, 50.0)]),
        floorplan(20.0, 10.0),
        PolygonGroup::new(22, vec![rect(2.0, 0.0, 3.0, 1.0)]),
    ];
    let conv = device_to_meep(groups, &mapping()).unwrap();
    assert_eq!(conv.geometry.len(), 2);
    assert_eq!(conv.skipped_layers, vec![42]);
    assert_eq!(conv.cell_size, Vector3::new(20.0, 10.0, 0.0));
}

#[test]
fn solids_preserve_group_order() {
    let mut mapping = mapping();
    mapping
        .insert(30, LayerMaterial::Physical(Medium::from_epsilon("a", 2.0)))
        .insert(31, LayerMaterial::Physical(Medium::from_epsilon("b", 3.0)))
        .insert(32, LayerMaterial::Physical(Medium::from_epsilon("c", 4.0)));

    let groups = vec![
        PolygonGroup::new(31, vec![rect(0.0, 0.0, 1.0, 1.0)]),
        floorplan(20.0, 10.0),
        PolygonGroup::new(30, vec![rect(0.0, 0.0, 1.0, 1.0), rect(1.0, 0.0, 2.0, 1.0)]),
        PolygonGroup::new(32, vec![rect(0.0, 0.0, 1.0, 1.0)]),
    ];
    let conv = device_to_meep(groups, &mapping).unwrap();
    let order: Vec<_> = conv.geometry.iter().map(|g| g.material.name.as_str()).collect();
    assert_eq!(order, vec!["b", "a", "a", "c"]);
}

#[test]
fn boundary_errors_are_explicit() {
    let none = vec![PolygonGroup::new(22, vec![rect(0.0, 0.0, 1.0, 1.0)])];
    assert!(matches!(
        device_to_meep(none, &mapping()),
        Err(LayoutError::MissingCellBoundary)
    ));

    let two = vec![floorplan(1.0, 1.0), floorplan(2.0, 2.0)];
    assert!(matches!(
        device_to_meep(two, &mapping()),
        Err(LayoutError::MultipleCellBoundaries { count: 2, .. })
    ));
}

fn loop_mirror_layout() -> Layout {
    let mut access = Cell::new("access");
    access.add_rect(22, [0.0, -0.175], [8.0, 0.175]);

    let mut top = Cell::new("loopmirror");
    top.add_centered_rect(99, [0.0, 0.0], [31.0, 15.0])
        .add_centered_rect(LAYER_SOURCE, [-8.5, 0.0], [0.25, 1.0])
        .add_centered_rect(LAYER_PORT, [-7.5, 0.0], [0.25, 1.0])
        .add_centered_rect(63, [0.0, 0.0], [1.0, 1.0])
        .add_reference(layout_meep::CellReference::new("access").at(-15.5, 0.0));

    let mut layout = Layout::new(top);
    layout.add_cell(access);
    layout
}

#[test]
fn layout_file_round_trip() {
    let layout = loop_mirror_layout();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(layout.to_json().unwrap().as_bytes()).unwrap();

    let conv = layout_file_to_meep(file.path(), &LayerSet::photonic()).unwrap();
    assert_eq!(conv.cell_size, Vector3::new(31.0, 15.0, 0.0));
    assert_eq!(conv.geometry.len(), 1);
    assert_eq!(vertices(&conv.geometry[0])[0], Vector3::new(-15.5, -0.175, 0.0));
    assert_eq!(conv.skipped_layers, vec![63]);
}

#[test]
fn missing_layout_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = layout_file_to_meep(dir.path().join("absent.json"), &LayerSet::photonic());
    assert!(matches!(result, Err(LayoutError::Io(_))));
}

#[test]
fn translate_to_script() {
    let json = loop_mirror_layout().to_json().unwrap();
    let script = translate(&json, &LayerSet::photonic(), &TranslationConfig::default()).unwrap();

    assert!(script.contains("CELL_SIZE = mp.Vector3(31.0, 15.0, 0.0)"));
    assert_eq!(script.matches("mp.Prism(").count(), 1);
    assert!(script.contains("center=mp.Vector3(-8.5, 0.0, 0.0)"));
    assert!(script.contains("monitors[\"port_1\"]"));
    assert!(script.contains("DEFAULT_MATERIAL = mp.Medium(epsilon=2.25)"));
}

#[test]
fn translate_requires_registry_layers() {
    let json = loop_mirror_layout().to_json().unwrap();
    let mut lys = LayerSet::new();
    lys.add_layer("wg_deep", 22);
    let err = translate(&json, &lys, &TranslationConfig::default()).unwrap_err();
    assert!(err.to_string().contains("FLOORPLAN"));
}
