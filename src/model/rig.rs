use nalgebra_glm as glm;

use crate::animation::{AnimationSystem, Bone, Channel, Pose, RotationInterpolation, Skeleton};
use crate::error::{Error, Result};
use crate::model::mesh::vertex_buffer;
use crate::skinning::{deform_with, SkinnedMesh, VertexInfluences};

/// Unvalidated rig contents as produced by a loader.
#[derive(Debug, Clone, Default)]
pub struct RigData {
    pub name: String,
    pub triangles: Vec<[u32; 3]>,
    pub positions: Vec<glm::Vec3>,
    pub influences: Vec<VertexInfluences>,
    pub bones: Vec<Bone>,
    pub channels: Vec<Channel>,
}

/// Skinned mesh together with the animated skeleton that drives it.
#[derive(Debug, Clone)]
pub struct Rig {
    name: String,
    mesh: SkinnedMesh,
    animation: AnimationSystem,
}

/// Pose and deformed vertex positions at one instant.
#[derive(Debug, Clone)]
pub struct Frame {
    pub pose: Pose,
    pub positions: Vec<glm::Vec3>,
}

impl Frame {
    pub fn vertex_buffer(&self) -> Vec<[f32; 3]> {
        vertex_buffer(&self.positions)
    }
}

impl Rig {
    pub fn from_data(data: RigData) -> Result<Self> {
        let skeleton = Skeleton::new(data.bones)?;
        let mesh = SkinnedMesh::new(data.triangles, data.positions, data.influences)?;
        if let Some(bone) = mesh.max_bone().filter(|&b| b >= skeleton.len()) {
            return Err(Error::out_of_range("influence bone", bone, skeleton.len()));
        }
        let animation = AnimationSystem::new(skeleton, data.channels)?;

        log::info!(
            "rig '{}': {} vertices, {} triangles, {} bones, {} channels",
            data.name,
            mesh.vertex_count(),
            mesh.triangles().len(),
            animation.skeleton().len(),
            animation.channels().len()
        );

        Ok(Self {
            name: data.name,
            mesh,
            animation,
        })
    }

    pub fn with_rotation_interpolation(mut self, rotation: RotationInterpolation) -> Self {
        self.animation = self.animation.with_rotation_interpolation(rotation);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mesh(&self) -> &SkinnedMesh {
        &self.mesh
    }

    pub fn animation(&self) -> &AnimationSystem {
        &self.animation
    }

    pub fn duration(&self) -> f32 {
        self.animation.duration()
    }

    /// Evaluate the pose at `time` and skin the mesh with it.
    ///
    /// Influence bones were checked against the skeleton in
    /// [`Rig::from_data`], so this cannot fail.
    pub fn frame(&self, time: f32) -> Frame {
        let pose = self.animation.pose(time);
        let skin = pose.skinning_matrices(self.animation.skeleton());
        let positions = deform_with(&self.mesh, &skin);
        Frame { pose, positions }
    }

    /// [`Rig::frame`] with `time` wrapped into the animation's duration.
    pub fn looped_frame(&self, time: f32) -> Frame {
        self.frame(self.animation.loop_time(time))
    }
}

/// Playback clock, advanced by wall-clock deltas.
#[derive(Debug, Clone, PartialEq)]
pub struct Playback {
    pub time: f32,
    pub speed: f32,
    pub looping: bool,
    pub playing: bool,
}

impl Default for Playback {
    fn default() -> Self {
        Self {
            time: 0.0,
            speed: 1.0,
            looping: true,
            playing: true,
        }
    }
}

impl Playback {
    pub fn new(speed: f32, looping: bool) -> Self {
        Self {
            speed,
            looping,
            ..Default::default()
        }
    }

    /// Advance by `delta` seconds over an animation of length `duration`.
    /// Without looping the clock stops at the end.
    pub fn advance(&mut self, delta: f32, duration: f32) -> f32 {
        if !self.playing {
            return self.time;
        }

        self.time += delta * self.speed;
        if self.time >= duration {
            if self.looping && duration > 0.0 {
                self.time = self.time.rem_euclid(duration);
            } else {
                self.time = duration;
                self.playing = false;
            }
        }
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{ChannelValues, Trs};
    use approx::assert_relative_eq;

    fn rig() -> Rig {
        let mut child = Bone::new(Some(0), glm::Mat4::identity());
        child.rest = Trs::from_translation(glm::vec3(0.0, 1.0, 0.0));
        let slide = Channel::new(
            1,
            vec![0.0, 1.0],
            ChannelValues::Translation(vec![glm::vec3(0.0, 1.0, 0.0), glm::vec3(2.0, 1.0, 0.0)]),
        )
        .unwrap();

        Rig::from_data(RigData {
            name: "slider".into(),
            triangles: vec![[0, 1, 2]],
            positions: vec![
                glm::vec3(0.0, 0.0, 0.0),
                glm::vec3(1.0, 0.0, 0.0),
                glm::vec3(0.0, 1.0, 0.0),
            ],
            influences: vec![
                VertexInfluences::single(0),
                VertexInfluences::new([0, 1, 0, 0], [0.5, 0.5, 0.0, 0.0]),
                VertexInfluences::single(1),
            ],
            bones: vec![Bone::default(), child],
            channels: vec![slide],
        })
        .unwrap()
    }

    #[test]
    fn frames_follow_the_animation() {
        let rig = rig();
        assert_eq!(rig.duration(), 1.0);

        // child moves +x by 2 over the clip, its translation includes the rest offset
        let frame = rig.frame(0.5);
        assert_relative_eq!(frame.positions[0], glm::vec3(0.0, 0.0, 0.0));
        assert_relative_eq!(frame.positions[1], glm::vec3(1.5, 0.5, 0.0), epsilon = 1e-6);
        assert_relative_eq!(frame.positions[2], glm::vec3(1.0, 2.0, 0.0), epsilon = 1e-6);
        assert_eq!(frame.vertex_buffer().len(), 3);
    }

    #[test]
    fn looped_frame_wraps() {
        let rig = rig();
        let a = rig.looped_frame(1.25);
        let b = rig.frame(0.25);
        assert_eq!(a.positions, b.positions);
    }

    #[test]
    fn rejects_influence_past_skeleton() {
        let data = RigData {
            triangles: vec![],
            positions: vec![glm::Vec3::zeros()],
            influences: vec![VertexInfluences::single(3)],
            bones: vec![Bone::default()],
            ..Default::default()
        };
        assert!(matches!(
            Rig::from_data(data),
            Err(Error::IndexOutOfRange { index: 3, .. })
        ));
    }

    #[test]
    fn playback_loops_or_stops() {
        let mut looping = Playback::new(2.0, true);
        assert_relative_eq!(looping.advance(0.75, 1.0), 0.5);
        assert!(looping.playing);

        let mut once = Playback::new(1.0, false);
        once.advance(0.6, 1.0);
        assert_relative_eq!(once.advance(0.6, 1.0), 1.0);
        assert!(!once.playing);
        assert_relative_eq!(once.advance(0.6, 1.0), 1.0);
    }
}
