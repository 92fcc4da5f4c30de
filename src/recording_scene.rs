use crate::error::TrackSmoothingError;
use crate::scene_writer::{Channel, MotionBlurSettings, ObjectHandle, SceneWriter, TransformUpdate};
use crate::wrap_angle;
use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const DEFAULT_SENSOR_HEIGHT: f32 = 24.0;

/// In-memory host scene. Records every keyframe the importer writes and can be
/// saved as JSON for inspection or hand-off to another tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingScene {
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_camera: Option<ObjectHandle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_object: Option<ObjectHandle>,
    /// Objects whose rotation curves were smoothed, in call order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub smoothed: Vec<ObjectHandle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    pub fps: u32,
    pub resolution: [u32; 2],
    pub motion_blur: MotionBlurSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self { fps: 24, resolution: [1920, 1080], motion_blur: MotionBlurSettings::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Camera,
    Armature,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneObject {
    pub handle: ObjectHandle,
    pub name: String,
    pub kind: ObjectKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_height: Option<f32>,
    #[serde(default)]
    pub transform: ObjectTransform,
    #[serde(default)]
    pub channels: BTreeMap<Channel, Vec<Keyframe>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectTransform {
    pub location: [f32; 3],
    pub rotation_euler: [f32; 3],
    pub delta_location: [f32; 3],
    pub delta_rotation_euler: [f32; 3],
    pub scale: [f32; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lens: Option<f32>,
}

impl Default for ObjectTransform {
    fn default() -> Self {
        Self {
            location: [0.0; 3],
            rotation_euler: [0.0; 3],
            delta_location: [0.0; 3],
            delta_rotation_euler: [0.0; 3],
            scale: [1.0; 3],
            lens: None,
        }
    }
}

impl ObjectTransform {
    fn channel_value(&self, channel: Channel) -> Vec<f32> {
        match channel {
            Channel::Location => self.location.to_vec(),
            Channel::RotationEuler => self.rotation_euler.to_vec(),
            Channel::DeltaRotationEuler => self.delta_rotation_euler.to_vec(),
            Channel::Scale => self.scale.to_vec(),
            Channel::Lens => self.lens.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub frame: i32,
    pub value: Vec<f32>,
}

impl Keyframe {
    pub fn vec3(&self) -> Option<Vec3> {
        match self.value.as_slice() {
            [x, y, z] => Some(Vec3::new(*x, *y, *z)),
            _ => None,
        }
    }

    pub fn scalar(&self) -> Option<f32> {
        self.value.first().copied()
    }
}

impl SceneObject {
    pub fn keyframes(&self, channel: Channel) -> &[Keyframe] {
        self.channels.get(&channel).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn keyframe_count(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }

    fn smooth_rotations(&mut self) -> Result<(), TrackSmoothingError> {
        for (channel, keys) in &self.channels {
            if !channel.is_rotation() {
                continue;
            }
            if let Some(bad) = keys.iter().find(|key| key.value.iter().any(|v| !v.is_finite())) {
                return Err(TrackSmoothingError {
                    object: self.name.clone(),
                    reason: format!("non-finite {channel} value at frame {}", bad.frame),
                });
            }
        }
        for (channel, keys) in self.channels.iter_mut() {
            if !channel.is_rotation() {
                continue;
            }
            for i in 1..keys.len() {
                let (before, after) = keys.split_at_mut(i);
                let prev = &before[i - 1].value;
                for (axis, value) in after[0].value.iter_mut().enumerate() {
                    if let Some(&previous) = prev.get(axis) {
                        *value = previous + wrap_angle(*value - previous);
                    }
                }
            }
        }
        Ok(())
    }
}

impl RecordingScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scene that already renders through a camera named `name`.
    pub fn with_camera(name: &str) -> Self {
        let mut scene = Self::new();
        let camera = scene.create_camera(name);
        scene.active_camera = Some(camera);
        scene
    }

    pub fn object(&self, handle: ObjectHandle) -> Option<&SceneObject> {
        self.objects.get(handle.0 as usize)
    }

    pub fn object_by_name(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.name == name)
    }

    pub fn keyframes(&self, handle: ObjectHandle, channel: Channel) -> &[Keyframe] {
        self.object(handle).map(|object| object.keyframes(channel)).unwrap_or(&[])
    }

    pub fn total_keyframes(&self) -> usize {
        self.objects.iter().map(SceneObject::keyframe_count).sum()
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Reading scene file {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("Parsing scene file {}", path.display()))
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating scene directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json.as_bytes()).with_context(|| format!("Writing scene file {}", path.display()))?;
        Ok(())
    }

    fn unique_name(&self, name: &str) -> String {
        if self.object_by_name(name).is_none() {
            return name.to_string();
        }
        (1u32..)
            .map(|suffix| format!("{name}.{suffix:03}"))
            .find(|candidate| self.object_by_name(candidate).is_none())
            .unwrap_or_else(|| name.to_string())
    }

    fn spawn(&mut self, name: &str, kind: ObjectKind) -> ObjectHandle {
        let handle = ObjectHandle(self.objects.len() as u32);
        let sensor_height = (kind == ObjectKind::Camera).then_some(DEFAULT_SENSOR_HEIGHT);
        self.objects.push(SceneObject {
            handle,
            name: self.unique_name(name),
            kind,
            sensor_height,
            transform: ObjectTransform::default(),
            channels: BTreeMap::new(),
        });
        handle
    }

    fn object_mut(&mut self, handle: ObjectHandle) -> Option<&mut SceneObject> {
        self.objects.get_mut(handle.0 as usize)
    }
}

impl SceneWriter for RecordingScene {
    fn active_camera(&self) -> Option<ObjectHandle> {
        self.active_camera
    }

    fn create_camera(&mut self, name: &str) -> ObjectHandle {
        let camera = self.spawn(name, ObjectKind::Camera);
        if self.active_camera.is_none() {
            self.active_camera = Some(camera);
        }
        camera
    }

    fn create_poseable_object(&mut self, name: &str) -> ObjectHandle {
        self.spawn(name, ObjectKind::Armature)
    }

    fn sensor_height(&self, camera: ObjectHandle) -> f32 {
        self.object(camera).and_then(|object| object.sensor_height).unwrap_or(DEFAULT_SENSOR_HEIGHT)
    }

    fn set_transform(&mut self, object: ObjectHandle, update: &TransformUpdate) {
        let Some(target) = self.object_mut(object) else {
            log::warn!("set_transform on unknown object {object:?}");
            return;
        };
        let transform = &mut target.transform;
        if let Some(location) = update.location {
            transform.location = location.to_array();
        }
        if let Some(rotation) = update.rotation_euler {
            transform.rotation_euler = rotation.to_array();
        }
        if let Some(delta) = update.delta_location {
            transform.delta_location = delta.to_array();
        }
        if let Some(delta) = update.delta_rotation_euler {
            transform.delta_rotation_euler = delta.to_array();
        }
        if let Some(scale) = update.scale {
            transform.scale = scale.to_array();
        }
        if let Some(lens) = update.lens {
            transform.lens = Some(lens);
        }
    }

    fn insert_keyframe(&mut self, object: ObjectHandle, channel: Channel, frame: i32) {
        let Some(target) = self.object_mut(object) else {
            log::warn!("insert_keyframe on unknown object {object:?}");
            return;
        };
        let value = target.transform.channel_value(channel);
        if value.is_empty() {
            log::debug!("'{}' has no {channel} value to key at frame {frame}", target.name);
            return;
        }
        let keys = target.channels.entry(channel).or_default();
        let key = Keyframe { frame, value };
        match keys.binary_search_by_key(&frame, |existing| existing.frame) {
            Ok(index) => keys[index] = key,
            Err(index) => keys.insert(index, key),
        }
    }

    fn apply_discontinuity_smoothing(&mut self, object: ObjectHandle) -> Result<(), TrackSmoothingError> {
        let Some(target) = self.object_mut(object) else {
            return Err(TrackSmoothingError {
                object: format!("{object:?}"),
                reason: "object does not exist".to_string(),
            });
        };
        target.smooth_rotations()?;
        self.smoothed.push(object);
        Ok(())
    }

    fn set_scene_frame_rate(&mut self, fps: u32) {
        self.render.fps = fps;
    }

    fn set_render_resolution(&mut self, width: u32, height: u32) {
        self.render.resolution = [width, height];
    }

    fn set_motion_blur(&mut self, settings: MotionBlurSettings) {
        self.render.motion_blur = settings;
    }

    fn set_active_object(&mut self, object: ObjectHandle) {
        self.active_object = Some(object);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn keyed_rotation(scene: &mut RecordingScene, object: ObjectHandle, values: &[f32]) {
        for (frame, z) in values.iter().enumerate() {
            let update = TransformUpdate { rotation_euler: Some(Vec3::new(0.0, 0.0, *z)), ..Default::default() };
            scene.set_transform(object, &update);
            scene.insert_keyframe(object, Channel::RotationEuler, frame as i32);
        }
    }

    #[test]
    fn colliding_names_get_suffixes() {
        let mut scene = RecordingScene::new();
        let a = scene.create_poseable_object("17");
        let b = scene.create_poseable_object("17");
        let c = scene.create_poseable_object("17");
        assert_eq!(scene.object(a).unwrap().name, "17");
        assert_eq!(scene.object(b).unwrap().name, "17.001");
        assert_eq!(scene.object(c).unwrap().name, "17.002");
    }

    #[test]
    fn keyframe_at_same_frame_replaces_value() {
        let mut scene = RecordingScene::new();
        let object = scene.create_poseable_object("probe");
        for x in [1.0, 2.0] {
            scene.set_transform(object, &TransformUpdate { location: Some(Vec3::X * x), ..Default::default() });
            scene.insert_keyframe(object, Channel::Location, 5);
        }
        let keys = scene.keyframes(object, Channel::Location);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].vec3(), Some(Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn lens_is_not_keyed_before_it_is_set() {
        let mut scene = RecordingScene::with_camera("Camera");
        let camera = scene.active_camera().unwrap();
        scene.insert_keyframe(camera, Channel::Lens, 1);
        assert!(scene.keyframes(camera, Channel::Lens).is_empty());
        scene.set_transform(camera, &TransformUpdate { lens: Some(35.0), ..Default::default() });
        scene.insert_keyframe(camera, Channel::Lens, 1);
        assert_eq!(scene.keyframes(camera, Channel::Lens)[0].scalar(), Some(35.0));
    }

    #[test]
    fn smoothing_unwraps_rotation_jumps() {
        let mut scene = RecordingScene::new();
        let object = scene.create_poseable_object("spinner");
        keyed_rotation(&mut scene, object, &[PI - 0.1, -PI + 0.1, -PI + 0.3]);
        scene.apply_discontinuity_smoothing(object).expect("smoothing");
        let z: Vec<f32> =
            scene.keyframes(object, Channel::RotationEuler).iter().map(|key| key.value[2]).collect();
        assert!((z[1] - (PI + 0.1)).abs() < 1e-4, "{z:?}");
        assert!((z[2] - (PI + 0.3)).abs() < 1e-4, "{z:?}");
        assert_eq!(scene.smoothed, vec![object]);
    }

    #[test]
    fn smoothing_handles_huge_rotation_jumps() {
        let mut scene = RecordingScene::new();
        let object = scene.create_poseable_object("spinner");
        keyed_rotation(&mut scene, object, &[1.0e12f32.to_radians(), 0.0, 1.0e9]);
        scene.apply_discontinuity_smoothing(object).expect("smoothing");
        let keys = scene.keyframes(object, Channel::RotationEuler);
        assert_eq!(keys.len(), 3);
        assert!(keys.iter().all(|key| key.value.iter().all(|v| v.is_finite())));
        assert_eq!(scene.smoothed, vec![object]);
    }

    #[test]
    fn wrap_angle_stays_in_range() {
        for value in [0.0, PI - 0.1, 3.0 * PI + 0.5, -7.5, 6.7e7, -1.0e12] {
            let wrapped = wrap_angle(value);
            assert!((-PI..=PI).contains(&wrapped), "{value} -> {wrapped}");
        }
        assert!((wrap_angle(2.0 * PI + 0.25) - 0.25).abs() < 1e-5);
    }

    #[test]
    fn smoothing_rejects_non_finite_rotations() {
        let mut scene = RecordingScene::new();
        let object = scene.create_poseable_object("broken");
        keyed_rotation(&mut scene, object, &[0.0, f32::NAN]);
        let err = scene.apply_discontinuity_smoothing(object).unwrap_err();
        assert_eq!(err.object, "broken");
        assert!(scene.smoothed.is_empty());
    }

    #[test]
    fn scene_round_trips_through_json() -> Result<()> {
        let mut scene = RecordingScene::with_camera("Camera");
        let object = scene.create_poseable_object("7");
        scene.set_transform(object, &TransformUpdate { location: Some(Vec3::ONE), ..Default::default() });
        scene.insert_keyframe(object, Channel::Location, 3);
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out/scene.json");
        scene.save_to_path(&path)?;
        let restored = RecordingScene::load_from_path(&path)?;
        assert_eq!(restored.objects.len(), 2);
        assert_eq!(restored.keyframes(object, Channel::Location)[0].frame, 3);
        assert_eq!(restored.active_camera, scene.active_camera);
        Ok(())
    }
}
