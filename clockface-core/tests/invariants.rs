//! Contract Invariant Tests
//!
//! These tests verify the guarantees callers rely on.

use clockface_core::{
    canonical_json,
    config::{MajorShape, NumeralStyle, Placement},
    polar_to_point, DialConfiguration, ExportError, ExportService, ImageLoader, ImageStatus, Layer,
    Point, PresetRegistry, Primitive, RenderPipeline, Section, Session,
};
use serde_json::json;

fn render(config: &DialConfiguration) -> clockface_core::Scene {
    RenderPipeline::new().render(config, ImageStatus::Idle)
}

fn major_lines(config: &DialConfiguration) -> Vec<(Point, Point)> {
    render(config)
        .layer(Layer::MajorScales)
        .filter_map(|p| match p {
            Primitive::Line { from, to, .. } => Some((*from, *to)),
            _ => None,
        })
        .collect()
}

#[test]
fn invariant_polar_point_on_circle() {
    let center = Point::new(400.0, 400.0);
    for step in 0..72 {
        let angle = step as f64 * 5.0 - 180.0;
        let p = polar_to_point(center.x, center.y, 320.0, angle);
        assert!((p.distance(&center) - 320.0).abs() < 1e-9, "angle {}", angle);
    }
    // bearing is clockwise from 12 o'clock
    let east = polar_to_point(0.0, 0.0, 1.0, 90.0);
    assert!((east.x - 1.0).abs() < 1e-12 && east.y.abs() < 1e-12);
}

#[test]
fn invariant_major_tick_count_and_spacing() {
    for n in [1, 3, 12, 60] {
        let mut config = DialConfiguration::default();
        config.major_scales.count = n;
        config.major_scales.rotation_offset = 15.0;
        let lines = major_lines(&config);
        assert_eq!(lines.len(), n as usize);

        let first = polar_to_point(400.0, 400.0, 320.0, 15.0);
        assert!(lines[0].0.distance(&first) < 1e-9);
    }
}

#[test]
fn invariant_outside_line_endpoint() {
    let mut config = DialConfiguration::default();
    config.major_scales.shape = MajorShape::Line;
    config.major_scales.placement = Placement::Outside;
    config.major_scales.length = 30.0;

    let (from, to) = major_lines(&config)[0];
    assert!(from.distance(&Point::new(400.0, 80.0)) < 1e-9);
    assert!(to.distance(&Point::new(400.0, 50.0)) < 1e-9);
}

#[test]
fn invariant_empty_custom_text_falls_back_to_position() {
    let mut config = DialConfiguration::default();
    config.numbers.style = NumeralStyle::Custom;
    config.numbers.custom_texts = (1..=12).map(|i| format!("T{}", i)).collect();
    config.numbers.custom_texts[4] = String::new();

    let texts: Vec<String> = render(&config)
        .layer(Layer::Numerals)
        .filter_map(|p| match p {
            Primitive::Text { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(texts[4], "5");
    assert_eq!(texts[0], "T1");
}

#[test]
fn invariant_style_none_emits_no_numerals() {
    let mut config = DialConfiguration::default();
    config.numbers.style = NumeralStyle::None;
    assert_eq!(render(&config).count(Layer::Numerals), 0);
}

#[test]
fn invariant_layers_in_paint_order() {
    let scene = render(&DialConfiguration::default());
    let layers: Vec<Layer> = scene.elements.iter().map(|e| e.layer).collect();
    let mut sorted = layers.clone();
    sorted.sort();
    assert_eq!(layers, sorted);
    assert_eq!(layers.first(), Some(&Layer::Background));
    assert_eq!(layers.last(), Some(&Layer::Frame));
}

#[test]
fn invariant_any_preset_then_reset_is_default() {
    let registry = PresetRegistry::with_builtins();
    for preset in registry.list() {
        let mut session = Session::new();
        session.update(Section::Canvas, &json!({"width": 300})).unwrap();
        session.apply_preset(&registry, &preset.id).unwrap();
        session.reset_to_default();
        assert_eq!(session.config(), &DialConfiguration::default(), "{}", preset.id);
    }
}

#[test]
fn invariant_vector_export_idempotent() {
    let mut session = Session::new();
    session.update(Section::Numbers, &json!({"style": "roman"})).unwrap();

    let a = session.export_vector().unwrap();
    let b = session.export_vector().unwrap();
    assert_eq!(a.data, b.data);
    assert_eq!(a.content_hash, b.content_hash);
}

#[test]
fn invariant_raster_dimensions_scale_with_dpi() {
    let mut session = Session::new();
    session.update(Section::Numbers, &json!({"visible": false})).unwrap();

    let file = session.export_raster(Some(300)).unwrap();
    assert_eq!(file.size, [3333, 3333]);

    // IHDR width and height
    let width = u32::from_be_bytes(file.data[16..20].try_into().unwrap());
    let height = u32::from_be_bytes(file.data[20..24].try_into().unwrap());
    assert_eq!((width, height), (3333, 3333));
}

#[test]
fn invariant_stale_image_load_ignored() {
    let mut session = Session::new();
    session
        .update(Section::Background, &json!({"kind": "image", "image": {"url": "a.png"}}))
        .unwrap();
    let stale = session.take_pending_image_load().unwrap();
    session
        .update(Section::Background, &json!({"image": {"url": "b.png"}}))
        .unwrap();

    let result = clockface_core::images::fetch("https://example.com/a.png");
    assert!(!session.complete_image_load(stale.token, result));
    assert_eq!(session.image_status(), ImageStatus::Loading);
}

#[test]
fn invariant_failed_image_falls_back_to_solid() {
    let mut session = Session::new();
    session
        .update(
            Section::Background,
            &json!({"kind": "image", "color": "#123456", "image": {"url": "/no/such/file.png"}}),
        )
        .unwrap();

    assert_eq!(session.load_background_image_blocking(), ImageStatus::Failed);
    let background: Vec<_> = session.scene().layer(Layer::Background).collect();
    assert_eq!(background.len(), 1);
    assert!(matches!(background[0], Primitive::Rect { .. }));
}

#[test]
fn invariant_export_in_progress_rejected() {
    let service = ExportService::new();
    let scene = render(&DialConfiguration::default());
    let images = ImageLoader::new();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| service.export_vector(&scene, &images)))
            .collect();
        for handle in handles {
            match handle.join().unwrap() {
                Ok(file) => assert!(!file.data.is_empty()),
                Err(e) => assert!(matches!(e, ExportError::InProgress)),
            }
        }
    });
    assert!(!service.is_busy());
}

#[test]
fn invariant_export_writes_complete_file() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::new();
    let file = session.export_vector().unwrap();

    let path = file.write_to_dir(dir.path()).unwrap();
    assert!(path.file_name().unwrap().to_string_lossy().starts_with("clock-face-"));
    assert_eq!(std::fs::read(&path).unwrap(), file.data);
}

#[test]
fn invariant_canonical_json_deterministic() {
    let obj1 = json!({"z": 1, "a": 2, "m": {"b": 1, "a": 2}});
    let obj2 = json!({"a": 2, "m": {"a": 2, "b": 1}, "z": 1});

    // Must be identical despite different input ordering
    assert_eq!(canonical_json(&obj1).unwrap(), canonical_json(&obj2).unwrap());
}
