use crate::error::TrackSmoothingError;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to an object owned by the host scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectHandle(pub u32);

/// Keyframeable properties written by the importer. Delta location is a
/// static bias and never keyframed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Location,
    RotationEuler,
    DeltaRotationEuler,
    Scale,
    Lens,
}

impl Channel {
    pub fn is_rotation(self) -> bool {
        matches!(self, Channel::RotationEuler | Channel::DeltaRotationEuler)
    }

    pub fn label(self) -> &'static str {
        match self {
            Channel::Location => "location",
            Channel::RotationEuler => "rotation_euler",
            Channel::DeltaRotationEuler => "delta_rotation_euler",
            Channel::Scale => "scale",
            Channel::Lens => "lens",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Property values to assign before keyframing. `None` leaves the property
/// untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransformUpdate {
    pub location: Option<Vec3>,
    pub rotation_euler: Option<Vec3>,
    pub delta_location: Option<Vec3>,
    pub delta_rotation_euler: Option<Vec3>,
    pub scale: Option<Vec3>,
    pub lens: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionBlurPosition {
    #[default]
    Start,
    Center,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionBlurSettings {
    pub enabled: bool,
    pub position: MotionBlurPosition,
    /// Shutter length in frames.
    pub shutter: f32,
}

impl MotionBlurSettings {
    /// Full-frame shutter opening on the frame, approximating the blur the
    /// recording was captured with.
    pub const fn recorded() -> Self {
        Self { enabled: true, position: MotionBlurPosition::Start, shutter: 1.0 }
    }
}

impl Default for MotionBlurSettings {
    fn default() -> Self {
        Self { enabled: false, position: MotionBlurPosition::Center, shutter: 0.5 }
    }
}

/// Host scene the tracking parser writes into. Every write goes through this
/// handle; the parser never reads ambient host state.
pub trait SceneWriter {
    /// Camera the scene renders through, if one exists.
    fn active_camera(&self) -> Option<ObjectHandle>;

    fn create_camera(&mut self, name: &str) -> ObjectHandle;

    /// Creates a fresh object that transforms can be keyed on. Name collisions
    /// are resolved by the host.
    fn create_poseable_object(&mut self, name: &str) -> ObjectHandle;

    /// Vertical sensor size of a camera in millimetres.
    fn sensor_height(&self, camera: ObjectHandle) -> f32;

    fn set_transform(&mut self, object: ObjectHandle, update: &TransformUpdate);

    /// Records the current value of `channel` at `frame`.
    fn insert_keyframe(&mut self, object: ObjectHandle, channel: Channel, frame: i32);

    /// Removes artificial jumps from the object's rotation curves.
    fn apply_discontinuity_smoothing(&mut self, object: ObjectHandle) -> Result<(), TrackSmoothingError>;

    fn set_scene_frame_rate(&mut self, fps: u32);

    fn set_render_resolution(&mut self, width: u32, height: u32);

    fn set_motion_blur(&mut self, settings: MotionBlurSettings);

    /// Makes `object` the only selected object. Headless hosts may ignore it.
    fn set_active_object(&mut self, _object: ObjectHandle) {}
}
