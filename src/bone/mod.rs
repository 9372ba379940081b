pub mod clip;
pub mod hierarchy;
pub mod id;
pub mod pose;

pub use clip::*;
pub use hierarchy::*;
pub use id::*;
pub use pose::*;

#[cfg(test)]
pub(crate) mod test_rig {
    //! Small rig shared by the pose and scene tests.
    //!
    //! root -> hips -> (spine -> head, ik_helper -> hand)
    //! `root` and `ik_helper` carry no skin weights.

    use super::*;
    use crate::math::{Mat4, Vec3};

    pub fn bind_locals() -> [(&'static str, Vec3); 5] {
        [
            ("hips", Vec3::new(0.0, 1.0, 0.0)),
            ("spine", Vec3::new(0.0, 0.5, 0.0)),
            ("head", Vec3::new(0.0, 0.4, 0.0)),
            ("ik_helper", Vec3::new(0.3, 0.4, 0.0)),
            ("hand", Vec3::new(0.3, 0.0, 0.0)),
        ]
    }

    pub fn skeleton() -> Skeleton {
        let node = |name: &str, children: &[&str]| NodeDesc {
            name: name.to_string(),
            children: children.iter().map(|c| c.to_string()).collect(),
        };
        // Offsets are inverse bind globals.
        let bone = |name: &str, bind: Vec3| BoneDesc {
            name: name.to_string(),
            offset: Mat4::from_translation(bind).inverse(),
        };
        Skeleton::new(SkeletonDesc {
            nodes: vec![
                node("root", &["hips"]),
                node("hips", &["spine", "ik_helper"]),
                node("spine", &["head"]),
                node("head", &[]),
                node("ik_helper", &["hand"]),
                node("hand", &[]),
            ],
            bones: vec![
                bone("hips", Vec3::new(0.0, 1.0, 0.0)),
                bone("spine", Vec3::new(0.0, 1.5, 0.0)),
                bone("head", Vec3::new(0.0, 1.9, 0.0)),
                bone("hand", Vec3::new(0.6, 1.4, 0.0)),
            ],
            root_transform: Mat4::IDENTITY,
            root_motion_node: Some(DEFAULT_ROOT_MOTION_NODE.to_string()),
        })
        .unwrap()
    }

    /// Clip that holds the bind pose, with a 90 degree spine sway at mid
    /// clip and a root translation.
    pub fn sway_clip() -> AnimationClip {
        let mut tracks = std::collections::HashMap::new();
        for (name, t) in bind_locals() {
            tracks.insert(
                name.to_string(),
                BoneTracks {
                    translation: Some(Track::constant(t)),
                    ..Default::default()
                },
            );
        }
        if let Some(spine) = tracks.get_mut("spine") {
            spine.rotation = Some(Track::new(vec![
                Keyframe { time: 0.0, value: crate::math::Quat::IDENTITY },
                Keyframe {
                    time: 15.0,
                    value: crate::math::Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
                },
                Keyframe { time: 30.0, value: crate::math::Quat::IDENTITY },
            ]));
        }
        tracks.insert(
            "root".to_string(),
            BoneTracks {
                translation: Some(Track::constant(Vec3::new(0.0, 0.0, 5.0))),
                ..Default::default()
            },
        );
        AnimationClip {
            name: "sway".to_string(),
            ticks_per_second: 30.0,
            duration: 30.0,
            root_motion: false,
            tracks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_rig::*;
    use super::*;
    use crate::math::{Mat4, MatrixConvention, Vec3};

    fn assert_mat_eq(a: &Mat4, b: &Mat4, eps: f32) {
        assert!(a.abs_diff_eq(*b, eps), "expected\n{b:?}\ngot\n{a:?}");
    }

    #[test]
    fn test_bind_clip_gives_identity_palette() {
        let skeleton = skeleton();
        let clip = sway_clip();
        clip.validate(&skeleton).unwrap();

        // Spine rotation is identity at t = 0.
        let palette = evaluate_pose(Some(&clip), 0.0, &skeleton);
        assert_eq!(palette.len(), skeleton.bone_count());
        for m in palette.iter() {
            assert_mat_eq(m, &Mat4::IDENTITY, 1e-5);
        }
    }

    #[test]
    fn test_no_clip_leaves_offsets() {
        let skeleton = skeleton();
        let palette = evaluate_pose(None, 3.0, &skeleton);
        for b in 0..skeleton.bone_count() {
            let bone = BoneIndex::new(b as u32);
            assert_mat_eq(palette.get(bone).unwrap(), &skeleton.bone_offset(bone), 0.0);
        }
    }

    #[test]
    fn test_pose_is_deterministic() {
        let skeleton = skeleton();
        let clip = sway_clip();
        let a = evaluate_pose(Some(&clip), 0.37, &skeleton);
        let b = evaluate_pose(Some(&clip), 0.37, &skeleton);
        assert_eq!(a, b);

        // Reused scratch buffer gives the same answer.
        let mut pose = Pose::new(&skeleton);
        pose.evaluate_into(&skeleton, Some(&clip), 0.9);
        pose.evaluate_into(&skeleton, Some(&clip), 0.37);
        assert_eq!(pose.palette(), &a);
    }

    #[test]
    fn test_pose_loops_with_clip_duration() {
        let skeleton = skeleton();
        let clip = sway_clip();
        let period = clip.duration_seconds();
        for k in 1..4 {
            let a = evaluate_pose(Some(&clip), 0.2, &skeleton);
            let b = evaluate_pose(Some(&clip), 0.2 + k as f32 * period, &skeleton);
            for (ma, mb) in a.iter().zip(b.iter()) {
                assert_mat_eq(ma, mb, 1e-3);
            }
        }
    }

    #[test]
    fn test_spine_sway_moves_descendants_only() {
        let skeleton = skeleton();
        let clip = sway_clip();
        let mut pose = Pose::new(&skeleton);
        pose.evaluate_into(&skeleton, Some(&clip), 0.5);

        let head = skeleton.find_node("head").unwrap();
        let hand = skeleton.find_node("hand").unwrap();
        // Spine rotated 90 degrees about Z at (0, 1.5): head swings to -X.
        let head_pos = pose.global(head).transform_point3(Vec3::ZERO);
        assert!(head_pos.abs_diff_eq(Vec3::new(-0.4, 1.5, 0.0), 1e-4), "{head_pos}");
        // The hand hangs off a helper under hips and is untouched.
        let hand_pos = pose.global(hand).transform_point3(Vec3::ZERO);
        assert!(hand_pos.abs_diff_eq(Vec3::new(0.6, 1.4, 0.0), 1e-5), "{hand_pos}");

        let hand_bone = skeleton.find_bone("hand").unwrap();
        assert_mat_eq(pose.palette().get(hand_bone).unwrap(), &Mat4::IDENTITY, 1e-5);
    }

    #[test]
    fn test_root_motion_suppressed_unless_enabled() {
        let skeleton = skeleton();
        let mut clip = sway_clip();
        let hips = skeleton.find_bone("hips").unwrap();

        let palette = evaluate_pose(Some(&clip), 0.0, &skeleton);
        assert_mat_eq(palette.get(hips).unwrap(), &Mat4::IDENTITY, 1e-5);

        clip.root_motion = true;
        let palette = evaluate_pose(Some(&clip), 0.0, &skeleton);
        let moved = palette.get(hips).unwrap().transform_point3(Vec3::new(0.0, 1.0, 0.0));
        assert!(moved.abs_diff_eq(Vec3::new(0.0, 1.0, 5.0), 1e-5), "{moved}");
    }

    #[test]
    fn test_root_transform_applies_to_every_bone() {
        let mut skeleton = skeleton();
        let correction = Mat4::from_rotation_x(-std::f32::consts::FRAC_PI_2);
        skeleton.set_root_transform(correction);
        let palette = evaluate_pose(Some(&sway_clip()), 0.0, &skeleton);
        for m in palette.iter() {
            assert_mat_eq(m, &correction, 1e-5);
        }
    }

    #[test]
    fn test_gpu_export_layouts() {
        let skeleton = skeleton();
        let palette = evaluate_pose(None, 0.0, &skeleton);
        let cols = palette.to_gpu(MatrixConvention::ColumnMajor);
        let rows = palette.to_gpu(MatrixConvention::RowMajor);
        assert_eq!(cols.len(), 16 * skeleton.bone_count());
        // hips offset translates by -1 in y.
        assert_eq!(cols[13], -1.0);
        assert_eq!(rows[7], -1.0);
    }
}
