use crate::geometry::AxisConvention;
use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// User-facing import settings. Every field has a default so partial preset
/// files are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Scene frame the first imported keyframe lands on.
    #[serde(default = "ImportOptions::default_frame_offset")]
    pub frame_offset: i32,
    #[serde(default = "ImportOptions::default_enabled")]
    pub import_camera: bool,
    #[serde(default = "ImportOptions::default_enabled")]
    pub import_entities: bool,
    #[serde(default = "ImportOptions::default_enabled")]
    pub import_morphs: bool,
    /// Run the discontinuity (euler) filter after every imported track.
    #[serde(default = "ImportOptions::default_enabled")]
    pub euler_filter: bool,
    /// Static location bias applied to every imported object.
    #[serde(default)]
    pub delta_location: [i32; 3],
    /// Rotation offset for morph trackers. Exposed for presets but not yet
    /// applied by the parser.
    #[serde(default)]
    pub morph_rotation: [i32; 3],
    /// Keep going after a section fails instead of cancelling the batch.
    #[serde(default)]
    pub ignore_errors: bool,
    /// Trackers with this many samples or fewer are skipped.
    #[serde(default = "ImportOptions::default_min_keyframes")]
    pub min_keyframes: usize,
    #[serde(default)]
    pub axis: AxisConvention,
    /// Name of the camera created when the scene has none.
    #[serde(default = "ImportOptions::default_camera_name")]
    pub camera_name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOptionsOverrides {
    pub frame_offset: Option<i32>,
    pub import_camera: Option<bool>,
    pub import_entities: Option<bool>,
    pub import_morphs: Option<bool>,
    pub euler_filter: Option<bool>,
    pub delta_location: Option<[i32; 3]>,
    pub ignore_errors: Option<bool>,
    pub min_keyframes: Option<usize>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            frame_offset: Self::default_frame_offset(),
            import_camera: Self::default_enabled(),
            import_entities: Self::default_enabled(),
            import_morphs: Self::default_enabled(),
            euler_filter: Self::default_enabled(),
            delta_location: [0; 3],
            morph_rotation: [0; 3],
            ignore_errors: false,
            min_keyframes: Self::default_min_keyframes(),
            axis: AxisConvention::default(),
            camera_name: Self::default_camera_name(),
        }
    }
}

impl ImportOptions {
    const fn default_frame_offset() -> i32 {
        1
    }

    const fn default_enabled() -> bool {
        true
    }

    const fn default_min_keyframes() -> usize {
        1
    }

    fn default_camera_name() -> String {
        "Camera".to_string()
    }

    pub fn delta_location(&self) -> Vec3 {
        let [x, y, z] = self.delta_location;
        Vec3::new(x as f32, y as f32, z as f32)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read import options {}", path.display()))?;
        let options = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse import options {}", path.display()))?;
        Ok(options)
    }

    pub fn apply_overrides(&mut self, overrides: &ImportOptionsOverrides) {
        if let Some(frame_offset) = overrides.frame_offset {
            self.frame_offset = frame_offset;
        }
        if let Some(enabled) = overrides.import_camera {
            self.import_camera = enabled;
        }
        if let Some(enabled) = overrides.import_entities {
            self.import_entities = enabled;
        }
        if let Some(enabled) = overrides.import_morphs {
            self.import_morphs = enabled;
        }
        if let Some(enabled) = overrides.euler_filter {
            self.euler_filter = enabled;
        }
        if let Some(delta) = overrides.delta_location {
            self.delta_location = delta;
        }
        if let Some(ignore) = overrides.ignore_errors {
            self.ignore_errors = ignore;
        }
        if let Some(min) = overrides.min_keyframes {
            self.min_keyframes = min;
        }
    }
}

impl ImportOptionsOverrides {
    pub fn is_empty(&self) -> bool {
        self.applied_fields().is_empty()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.frame_offset.is_some() {
            fields.push("frame_offset");
        }
        if self.import_camera.is_some() {
            fields.push("import_camera");
        }
        if self.import_entities.is_some() {
            fields.push("import_entities");
        }
        if self.import_morphs.is_some() {
            fields.push("import_morphs");
        }
        if self.euler_filter.is_some() {
            fields.push("euler_filter");
        }
        if self.delta_location.is_some() {
            fields.push("delta_location");
        }
        if self.ignore_errors.is_some() {
            fields.push("ignore_errors");
        }
        if self.min_keyframes.is_some() {
            fields.push("min_keyframes");
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_preset_keeps_defaults() {
        let options: ImportOptions =
            serde_json::from_str(r#"{ "frame_offset": 10, "axis": "pos_y" }"#).expect("parse options");
        assert_eq!(options.frame_offset, 10);
        assert_eq!(options.axis, AxisConvention::PosY);
        assert!(options.import_camera && options.import_entities && options.import_morphs);
        assert!(options.euler_filter);
        assert_eq!(options.min_keyframes, 1);
        assert_eq!(options.camera_name, "Camera");
    }

    #[test]
    fn overrides_only_touch_given_fields() {
        let mut options = ImportOptions::default();
        let overrides = ImportOptionsOverrides {
            delta_location: Some([1, -2, 3]),
            ignore_errors: Some(true),
            ..Default::default()
        };
        options.apply_overrides(&overrides);
        assert_eq!(options.delta_location(), Vec3::new(1.0, -2.0, 3.0));
        assert!(options.ignore_errors);
        assert_eq!(options.frame_offset, 1);
        assert_eq!(overrides.applied_fields(), ["delta_location", "ignore_errors"]);
        assert!(ImportOptionsOverrides::default().is_empty());
    }

    #[test]
    fn missing_preset_is_an_error() {
        let err = ImportOptions::load("does/not/exist.json").unwrap_err();
        assert!(format!("{err:#}").contains("does/not/exist.json"), "{err:#}");
    }
}
