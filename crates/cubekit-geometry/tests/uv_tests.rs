//! Integration tests for scene building and UV assignment
//!
//! Covers:
//! - building a tree from a scene description
//! - the single-head example layout
//! - non-overlap of packed cubes (including property-based checks)

use cubekit_core::{Error, Vec3};
use cubekit_geometry::uv::{self, PixelRect};
use cubekit_geometry::{
    build, Bone, BoneTree, Cube, CubeId, Face, SceneDescription, UvMapper, UvOptions,
};

const HUMANOID: &str = r#"
bones:
  - name: body
    pivot: [0, 24, 0]
    cubes:
      - from: [-4, 12, -2]
        to: [4, 24, 2]
  - name: head
    parent: body
    pivot: [0, 24, 0]
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
        uv_group: arm
  - name: left_arm
    parent: body
    pivot: [5, 22, 0]
    mirror: true
    cubes:
      - from: [4, 12, -2]
        to: [8, 24, 2]
        uv_group: arm
"#;

fn humanoid() -> BoneTree {
    let scene = SceneDescription::from_yaml_str(HUMANOID).unwrap();
    build(&scene).unwrap()
}

fn assert_no_overlap(tree: &BoneTree, assignment: &uv::UvAssignment) {
    let rects: Vec<(CubeId, PixelRect)> = assignment
        .rects()
        .map(|(id, rect)| (id, rect.region()))
        .collect();

    for (i, (id_a, a)) in rects.iter().enumerate() {
        for (id_b, b) in rects.iter().skip(i + 1) {
            if id_a == id_b {
                continue;
            }
            let cube_a = &tree.bones()[id_a.bone].cubes[id_a.cube];
            let cube_b = &tree.bones()[id_b.bone].cubes[id_b.cube];
            let shared = cube_a.uv_group.is_some() && cube_a.uv_group == cube_b.uv_group;
            if !shared {
                assert!(!a.intersects(b), "{:?} {:?} overlaps {:?} {:?}", id_a, a, id_b, b);
            }
        }
    }
}

#[test]
fn test_head_example_fits_texture() {
    let tree = BoneTree::new(vec![Bone::new("head", Vec3::ZERO)
        .with_cube(Cube::new(Vec3::ZERO, Vec3::splat(8.0), 0.0).unwrap())])
    .unwrap();

    let result = uv::assign(&tree, 64, Some(64));
    assert!(result.warnings.is_empty());

    let uv = result.value.get(CubeId { bone: 0, cube: 0 }).unwrap();
    let texture = PixelRect::new(0, 0, 64, 64);
    for rect in &uv.faces {
        let r = rect.region();
        assert!(r.x0 >= texture.x0 && r.x1 <= texture.x1, "{:?}", rect);
        assert!(r.y0 >= texture.y0 && r.y1 <= texture.y1, "{:?}", rect);
    }

    for (i, a) in uv.faces.iter().enumerate() {
        for b in uv.faces.iter().skip(i + 1) {
            assert!(!a.overlaps(b), "{:?} overlaps {:?}", a.face, b.face);
        }
    }
}

#[test]
fn test_humanoid_layout() {
    let tree = humanoid();
    assert_eq!(tree.len(), 4);
    assert_eq!(tree.cube_count(), 5);

    // inflated head layer has the same logical size as the head
    let head = tree.find("head").unwrap();
    assert_eq!(head.cubes[1].size(), Vec3::splat(8.0));
    assert_eq!(head.cubes[1].inflate(), 0.5);

    let result = uv::assign(&tree, 64, None);
    assert!(result.warnings.is_empty());
    assert_no_overlap(&tree, &result.value);

    let right = result.value.get(CubeId { bone: 2, cube: 0 }).unwrap();
    let left = result.value.get(CubeId { bone: 3, cube: 0 }).unwrap();
    assert_eq!(right.anchor, left.anchor);
    assert!(left.face(Face::West).size[0] < 0);
    assert!(right.face(Face::West).size[0] > 0);
}

#[test]
fn test_small_texture_reports_overflow() {
    let tree = humanoid();
    let result = uv::assign(&tree, 64, Some(16));

    assert_eq!(result.warnings.len(), 1);
    match &result.warnings[0] {
        Error::UvOverflow {
            required_height,
            texture_height,
            ..
        } => {
            assert!(required_height > texture_height);
            assert_eq!(*texture_height, 16);
        }
        other => panic!("unexpected warning {:?}", other),
    }
    assert!(result.warnings[0].is_recoverable());
    assert_no_overlap(&tree, &result.value);
}

#[test]
fn test_keep_existing_packs_around_fixed() {
    let fixed = Cube::new(Vec3::ZERO, Vec3::new(4.0, 12.0, 4.0), 0.0)
        .unwrap()
        .with_fixed_uv([16, 0]);
    let free = Cube::new(Vec3::ZERO, Vec3::splat(4.0), 0.0).unwrap();
    let tree = BoneTree::new(vec![Bone::new("root", Vec3::ZERO)
        .with_cube(free.clone())
        .with_cube(fixed)
        .with_cube(free.clone())
        .with_cube(free)])
    .unwrap();

    let result = UvMapper::new(32, None)
        .with_options(UvOptions { keep_existing: true })
        .assign(&tree);

    assert_eq!(result.value.get(CubeId { bone: 0, cube: 1 }).unwrap().anchor, [16, 0]);
    assert_no_overlap(&tree, &result.value);
}

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_cube() -> impl Strategy<Value = (u32, u32, u32, bool)> {
        (0u32..12, 0u32..12, 0u32..12, any::<bool>())
    }

    fn tree_from(cubes: &[(u32, u32, u32, bool)], bones: usize) -> BoneTree {
        let mut out: Vec<Bone> = (0..bones.max(1))
            .map(|i| Bone::new(format!("bone{}", i), Vec3::ZERO))
            .collect();
        for (i, (w, h, d, mirror)) in cubes.iter().enumerate() {
            let size = Vec3::new(*w as f64, *h as f64, *d as f64);
            let cube = Cube::new(Vec3::ZERO, size, 0.0).unwrap().with_mirror(*mirror);
            let idx = i % out.len();
            out[idx].cubes.push(cube);
        }
        BoneTree::new(out).unwrap()
    }

    proptest! {
        #[test]
        fn test_packing_never_overlaps(
            cubes in prop::collection::vec(arb_cube(), 1..24),
            bones in 1usize..5,
            width in 16u32..128,
        ) {
            let tree = tree_from(&cubes, bones);
            let result = uv::assign(&tree, width, None);

            let footprints: Vec<PixelRect> = result
                .value
                .cube_uvs()
                .map(|(_, uv)| uv.footprint())
                .collect();
            for (i, a) in footprints.iter().enumerate() {
                for b in footprints.iter().skip(i + 1) {
                    prop_assert!(!a.intersects(b));
                }
            }
        }

        #[test]
        fn test_faces_stay_inside_footprint(cube in arb_cube(), u in 0u32..64, v in 0u32..64) {
            let (w, h, d, mirror) = cube;
            let uv = uv::CubeUv::new([u, v], (w, h, d), mirror);
            let footprint = uv.footprint();
            for rect in &uv.faces {
                let r = rect.region();
                prop_assert!(r.x0 >= footprint.x0 && r.x1 <= footprint.x1);
                prop_assert!(r.y0 >= footprint.y0 && r.y1 <= footprint.y1);
            }
        }

        #[test]
        fn test_auto_height_never_overflows(
            cubes in prop::collection::vec(arb_cube(), 1..16),
        ) {
            // widest footprint is 2 * (11 + 11) = 44
            let tree = tree_from(&cubes, 1);
            let result = uv::assign(&tree, 64, None);
            prop_assert!(result.warnings.is_empty());
            prop_assert!(result.value.texture_height >= result.value.required_height);
        }
    }
}
