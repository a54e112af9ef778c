//! Integration tests for the export crate
//!
//! Covers:
//! - model round-trip through the writer and the loader
//! - byte-identical repeated exports
//! - empty animations and skipped frame ranges
//! - the single-head layout example
//! - template output

use cubekit_anim::{sample_animation, SampleRequest};
use cubekit_core::{Error, Vec3};
use cubekit_export::animation::{self, AnimationOptions, LoopMode};
use cubekit_export::format::vec3;
use cubekit_export::model::{self, CubeUvEntry, ModelLoader, ModelMetadata};
use cubekit_export::{AnimationSettings, DocumentWriter, ExportRun, ExportSettings};
use cubekit_geometry::{build, uv, Bone, BoneTree, Cube, Face, SceneDescription};

const ZOMBIE: &str = r#"
bones:
  - name: body
    pivot: [0, 24, 0]
    cubes:
      - from: [-4, 12, -2]
        to: [4, 24, 2]
  - name: head
    parent: body
    pivot: [0, 24, 0]
    locators:
      - name: hat
        offset: [0, 33, 0]
    cubes:
      - from: [-4, 24, -4]
        to: [4, 32, 4]
      - from: [-4.5, 23.5, -4.5]
        to: [4.5, 32.5, 4.5]
        inflate: 0.5
  - name: right_arm
    parent: body
    pivot: [-5, 22, 0]
    cubes:
      - from: [-8, 12, -2]
        to: [-4, 24, 2]
animation:
  frame_rate: 20
  tracks:
    right_arm:
      rotation:
        - { frame: 0, value: [0, 0, 0] }
        - { frame: 10, value: [-90, 0, 0] }
        - { frame: 20, value: [0, 0, 0] }
  properties:
    body:
      sound:
        - { frame: 10, value: "mob.zombie.say" }
"#;

fn zombie() -> SceneDescription {
    SceneDescription::from_yaml_str(ZOMBIE).unwrap()
}

fn zombie_settings() -> ExportSettings {
    let mut walk = AnimationSettings::new("walk", 0, 20);
    walk.loop_mode = LoopMode::Loop;
    ExportSettings {
        model: "zombie".into(),
        animations: vec![walk, AnimationSettings::new("idle", 0, 20)],
        ..ExportSettings::default()
    }
}

#[test]
fn test_model_round_trip() {
    let scene = zombie();
    let tree = build(&scene).unwrap();
    let layout = uv::assign(&tree, 64, Some(64)).value;
    let doc = model::serialize(&tree, &layout, &ModelMetadata::new("zombie")).unwrap();

    let text = DocumentWriter::new().to_string(&doc).unwrap();
    let loaded = ModelLoader::new("zombie.geo.json").parse_str(&text).unwrap();
    model::validate_document(&loaded).unwrap();
    assert_eq!(loaded, doc);

    let geo = loaded.primary().unwrap();
    assert_eq!(geo.bones.len(), tree.len());
    for bone in tree.bones() {
        let entry = geo.bone(&bone.name).unwrap();
        assert_eq!(vec3(entry.pivot), bone.pivot);
        for (cube, written) in bone.cubes.iter().zip(&entry.cubes) {
            assert_eq!(vec3(written.size), cube.size());
            assert_eq!(vec3(written.origin), cube.origin());
        }
    }

    let head = geo.bone("head").unwrap();
    assert_eq!(head.cubes[1].inflate.map(|n| n.value()), Some(0.5));
    assert_eq!(vec3(head.locators.get("hat").unwrap().offset()), Vec3::new(0.0, 33.0, 0.0));
}

#[test]
fn test_export_is_byte_identical() {
    let scene = zombie();
    let settings = zombie_settings();
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    let report = ExportRun::new(&scene, &settings).run(first.path()).unwrap();
    ExportRun::new(&scene, &settings).run(second.path()).unwrap();

    assert_eq!(report.written.len(), 2);
    for path in &report.written {
        let name = path.file_name().unwrap();
        let a = std::fs::read(first.path().join(name)).unwrap();
        let b = std::fs::read(second.path().join(name)).unwrap();
        assert_eq!(a, b, "{} differs between runs", name.to_string_lossy());
    }
}

#[test]
fn test_export_writes_animations() {
    let scene = zombie();
    let settings = zombie_settings();
    let dir = tempfile::tempdir().unwrap();

    let report = ExportRun::new(&scene, &settings).run(dir.path()).unwrap();
    assert_eq!(report.bones, 3);
    assert_eq!(report.cubes, 4);
    assert_eq!(report.animations, 2);

    let text = std::fs::read_to_string(dir.path().join("zombie.animation.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    let walk = &json["animations"]["animation.zombie.walk"];
    assert_eq!(walk["loop"], true);
    assert_eq!(walk["animation_length"], 1.0);
    assert_eq!(walk["bones"]["right_arm"]["rotation"]["0.5"], serde_json::json!([-90, 0, 0]));
    assert!(walk["bones"].get("head").is_none());
    assert_eq!(
        walk["sound_effects"]["0.5"],
        serde_json::json!([{"effect": "mob.zombie.say"}])
    );
}

#[test]
fn test_empty_animation_warns() {
    let scene = SceneDescription::from_yaml_str(
        "bones:\n  - name: body\n    pivot: [0, 0, 0]\n",
    )
    .unwrap();
    let tree = build(&scene).unwrap();
    let channels = sample_animation(&tree, &scene, &scene, &SampleRequest::new(0, 10)).unwrap();
    let doc = animation::serialize(&channels, &AnimationOptions::new("m", "still")).unwrap();

    assert!(matches!(doc.warnings[..], [Error::NoAnimatedChannels { .. }]));
    assert!(doc.warnings[0].is_recoverable());
    let text = DocumentWriter::new().with_pretty(false).to_string(&doc.value).unwrap();
    assert_eq!(
        text,
        "{\"format_version\":\"1.8.0\",\"animations\":{\"animation.m.still\":{\"bones\":{}}}}\n"
    );
}

#[test]
fn test_half_turn_rotation_keeps_direction() {
    let scene = SceneDescription::from_yaml_str(
        r#"
bones:
  - name: body
    pivot: [0, 0, 0]
animation:
  tracks:
    body:
      rotation:
        - { frame: 0, value: [0, 0, 0] }
        - { frame: 10, value: [0, 0, -180] }
        - { frame: 20, value: [0, 0, 0] }
"#,
    )
    .unwrap();
    let tree = build(&scene).unwrap();
    let channels = sample_animation(&tree, &scene, &scene, &SampleRequest::new(0, 20)).unwrap();
    let doc = animation::serialize(&channels, &AnimationOptions::new("m", "spin")).unwrap();

    let json = serde_json::to_value(&doc.value).unwrap();
    assert_eq!(
        json["animations"]["animation.m.spin"]["bones"]["body"]["rotation"],
        serde_json::json!({"0.0": [0, 0, 0], "0.5": [0, 0, -180], "1.0": [0, 0, 0]})
    );
}

#[test]
fn test_negative_start_frame_is_rejected() {
    let scene = zombie();
    let tree = build(&scene).unwrap();
    let err = sample_animation(&tree, &scene, &scene, &SampleRequest::new(-10, 0)).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
}

#[test]
fn test_empty_range_skips_only_that_animation() {
    let scene = zombie();
    let mut settings = zombie_settings();
    settings.animations.push(AnimationSettings::new("broken", 10, 0));

    let artifacts = ExportRun::new(&scene, &settings).produce().unwrap().value;
    let document = artifacts.animations.unwrap();
    assert_eq!(document.animations.len(), 2);
    assert_eq!(artifacts.skipped.len(), 1);
    assert_eq!(artifacts.skipped[0].0, "animation.zombie.broken");
}

#[test]
fn test_head_example() {
    let tree = BoneTree::new(vec![Bone::new("head", Vec3::ZERO).with_cube(
        Cube::new(Vec3::ZERO, Vec3::new(8.0, 8.0, 8.0), 0.0).unwrap(),
    )])
    .unwrap();
    let layout = uv::assign(&tree, 64, Some(64));
    assert!(layout.warnings.is_empty());

    let doc = model::serialize(&tree, &layout.value, &ModelMetadata::new("head")).unwrap();
    let cube = &doc.geometry[0].bones[0].cubes[0];
    let CubeUvEntry::PerFace(faces) = &cube.uv else {
        panic!("expected per-face uv");
    };

    for face in Face::ALL {
        let written = faces.get(face).unwrap();
        let (u, v) = (written.uv[0].value(), written.uv[1].value());
        let (w, h) = (written.uv_size[0].value(), written.uv_size[1].value());
        for x in [u, u + w] {
            assert!((0.0..=64.0).contains(&x), "{face} u out of range");
        }
        for y in [v, v + h] {
            assert!((0.0..=64.0).contains(&y), "{face} v out of range");
        }
    }
}

#[test]
fn test_overflow_is_reported_not_fatal() {
    let scene = zombie();
    let settings = ExportSettings {
        model: "tiny".into(),
        texture_width: 16,
        texture_height: Some(16),
        ..ExportSettings::default()
    };
    let artifacts = ExportRun::new(&scene, &settings).produce().unwrap();
    assert!(artifacts
        .warnings
        .iter()
        .any(|w| matches!(w, Error::UvOverflow { .. })));
    assert_eq!(artifacts.value.model.geometry[0].description.texture_width, 16);
}

#[test]
fn test_template_output() {
    let scene = zombie();
    let settings = ExportSettings {
        model: "zombie".into(),
        template: true,
        texture_height: None,
        ..ExportSettings::default()
    };
    let dir = tempfile::tempdir().unwrap();
    let report = ExportRun::new(&scene, &settings).run(dir.path()).unwrap();

    let png = dir.path().join("zombie.png");
    assert!(report.written.contains(&png));
    let image = image::open(&png).unwrap();
    let geo = cubekit_export::ModelLoader::from_path(dir.path().join("zombie.geo.json")).unwrap();
    let description = &geo.primary().unwrap().description;
    assert_eq!(image.width(), description.texture_width);
    assert_eq!(image.height(), description.texture_height);
}

#[test]
fn test_demo_files_export() {
    let demos = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos");
    let scene = SceneDescription::from_path(demos.join("zombie.yaml")).unwrap();
    let settings = ExportSettings::from_path(demos.join("export.yaml")).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let report = ExportRun::new(&scene, &settings).run(dir.path()).unwrap();
    assert_eq!(report.bones, 6);
    assert_eq!(report.animations, 3);
    assert!(report.skipped.is_empty());
    assert_eq!(report.written.len(), 3);

    let text = std::fs::read_to_string(dir.path().join("zombie.animation.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    let nod = &json["animations"]["animation.zombie.nod"];
    assert_eq!(nod["loop"], "hold_on_last_frame");
    assert_eq!(nod["bones"]["head"]["rotation"]["0.0"], serde_json::json!([0, 0, 0]));
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn tree_strategy() -> impl Strategy<Value = Vec<(i32, i32, i32, i32)>> {
        prop::collection::vec((-16i32..16, 1i32..12, 0i32..10, 1i32..12), 1..6)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn round_trip_keeps_geometry(cubes in tree_strategy()) {
            let bones: Vec<Bone> = cubes
                .iter()
                .enumerate()
                .map(|(i, (x, w, h, d))| {
                    let cube = Cube::new(
                        Vec3::new(*x as f64, 0.0, 0.0),
                        Vec3::new(*w as f64, *h as f64, *d as f64),
                        0.0,
                    )
                    .unwrap();
                    Bone::new(format!("bone{i}"), Vec3::new(*x as f64, 0.0, 0.0)).with_cube(cube)
                })
                .collect();
            let tree = BoneTree::new(bones).unwrap();
            let layout = uv::assign(&tree, 64, None).value;
            let doc = model::serialize(&tree, &layout, &ModelMetadata::new("p")).unwrap();

            let text = DocumentWriter::new().to_string(&doc).unwrap();
            let loaded = ModelLoader::new("p").parse_str(&text).unwrap();
            prop_assert_eq!(&loaded, &doc);

            let geo = loaded.primary().unwrap();
            prop_assert_eq!(geo.bones.len(), cubes.len());
            for (entry, (_, w, h, d)) in geo.bones.iter().zip(&cubes) {
                prop_assert_eq!(
                    vec3(entry.cubes[0].size),
                    Vec3::new(*w as f64, *h as f64, *d as f64)
                );
            }
        }
    }
}
