use crate::error::Section;
use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Parsed tracking recording. Sections are decoded on demand so a malformed
/// sample only fails the phase that reads it.
#[derive(Debug, Clone)]
pub struct TrackingDocument {
    root: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaInfo {
    pub required_import_version: u32,
    pub fps: f32,
    pub motionblur_fps: f32,
    pub resolution: [u32; 2],
    pub dynamic_fov: bool,
}

impl MetaInfo {
    /// Scene frame rate; recordings store it as an integer.
    pub fn fps(&self) -> u32 {
        self.fps as u32
    }

    /// Source samples per emitted keyframe.
    pub fn sample_stride(&self) -> f32 {
        self.motionblur_fps.round() / self.fps() as f32
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraSample {
    pub position: [f32; 3],
    /// `[fov, yaw, roll, pitch]` in degrees.
    pub angle: [f32; 4],
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntitySample {
    pub position: [f32; 3],
    #[serde(default)]
    pub body_rotation: Option<[f32; 3]>,
    #[serde(default)]
    pub frame: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MorphSample {
    pub position: [f32; 3],
    /// Row-major 3x3 rotation.
    pub rotation: [[f32; 3]; 3],
    pub scale: [f32; 3],
    #[serde(default)]
    pub frame: Option<u32>,
}

/// Samples of one entity or morph tracker, keyed by its id.
pub type Track<T> = (String, Vec<T>);

impl TrackingDocument {
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(anyhow!("tracking data must be a JSON object, found {}", json_kind(&other))),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes).context("Parsing tracking data")?;
        Self::from_value(value)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Reading tracking file {}", path.display()))?;
        Self::from_slice(&bytes).with_context(|| format!("Parsing tracking file {}", path.display()))
    }

    pub fn has_section(&self, section: Section) -> bool {
        self.root.contains_key(section.key())
    }

    /// Reads only the schema version, so newer recordings whose meta section
    /// no longer decodes are still reported as a version mismatch.
    pub fn required_import_version(&self) -> Result<u32> {
        let meta = self.required(Section::Meta)?;
        let version = meta
            .get("required_import_version")
            .ok_or_else(|| anyhow!("missing 'required_import_version'"))?;
        decode(version, "required_import_version")
    }

    pub fn meta(&self) -> Result<MetaInfo> {
        decode(self.required(Section::Meta)?, Section::Meta.key())
    }

    pub fn camera(&self) -> Result<Vec<CameraSample>> {
        decode(self.required(Section::Camera)?, Section::Camera.key())
    }

    /// `None` when the recording has no entity section.
    pub fn entities(&self) -> Result<Option<Vec<Track<EntitySample>>>> {
        self.tracks(Section::Entities)
    }

    /// `None` when the recording has no morph section.
    pub fn morphs(&self) -> Result<Option<Vec<Track<MorphSample>>>> {
        self.tracks(Section::Morphs)
    }

    fn required(&self, section: Section) -> Result<&Value> {
        self.root.get(section.key()).ok_or_else(|| anyhow!("missing '{}' section", section.key()))
    }

    fn tracks<T: DeserializeOwned>(&self, section: Section) -> Result<Option<Vec<Track<T>>>> {
        let Some(value) = self.root.get(section.key()) else {
            return Ok(None);
        };
        let Value::Object(entries) = value else {
            return Err(anyhow!(
                "'{}' must map tracker ids to samples, found {}",
                section.key(),
                json_kind(value)
            ));
        };
        let mut tracks = Vec::with_capacity(entries.len());
        for (key, samples) in entries {
            let samples: Vec<T> = decode(samples, &format!("{} '{key}'", section.key()))?;
            tracks.push((key.clone(), samples));
        }
        Ok(Some(tracks))
    }
}

fn decode<T: DeserializeOwned>(value: &Value, what: &str) -> Result<T> {
    T::deserialize(value).with_context(|| format!("Decoding {what}"))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
