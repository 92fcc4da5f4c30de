use crate::config::ImportOptions;
use crate::document::{MetaInfo, TrackingDocument};
use crate::error::{ImportError, ImportResult, Section};
use crate::frame_rate::SampleStride;
use crate::geometry::{self, AxisConvention};
use crate::scene_writer::{Channel, MotionBlurSettings, ObjectHandle, SceneWriter, TransformUpdate};
use anyhow::{bail, Context, Result};

/// Mutable state threaded through the phases of one document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParserState {
    /// Scene frame of reduced sample 0.
    pub frame_offset: i32,
    pub stride: SampleStride,
    pub dynamic_fov: bool,
    pub axis: AxisConvention,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraSummary {
    pub camera: ObjectHandle,
    pub samples: usize,
    pub keyframes: usize,
    /// Frames the camera track spans on the scene timeline.
    pub reduced_len: u32,
    pub smoothed: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSummary {
    pub created: Vec<(String, ObjectHandle)>,
    pub skipped: Vec<String>,
    pub keyframes: usize,
    pub smoothing_failures: usize,
}

/// Turns one tracking document into keyframes. Phases must run in order:
/// meta, camera, entities, morphs.
pub struct TrackingParser<'a> {
    document: &'a TrackingDocument,
    options: &'a ImportOptions,
    state: ParserState,
}

impl<'a> TrackingParser<'a> {
    /// `accumulated_offset` is the timeline length already used by earlier
    /// documents of the same batch.
    pub fn new(document: &'a TrackingDocument, options: &'a ImportOptions, accumulated_offset: i32) -> Self {
        let state = ParserState {
            frame_offset: options.frame_offset.saturating_add(accumulated_offset),
            stride: SampleStride::ONE,
            dynamic_fov: true,
            axis: options.axis,
        };
        Self { document, options, state }
    }

    pub fn state(&self) -> &ParserState {
        &self.state
    }

    /// Checks the schema version and applies render settings. Nothing is
    /// written to the scene when the version or meta section is rejected.
    pub fn parse_meta(&mut self, scene: &mut dyn SceneWriter, importer_version: u32) -> ImportResult<MetaInfo> {
        let required = self
            .document
            .required_import_version()
            .map_err(|err| ImportError::section(Section::Meta, err))?;
        if importer_version < required {
            return Err(ImportError::VersionIncompatible { required, supported: importer_version });
        }
        let meta = self.document.meta().map_err(|err| ImportError::section(Section::Meta, err))?;
        let stride = SampleStride::from_meta(&meta).map_err(|err| ImportError::section(Section::Meta, err))?;

        scene.set_scene_frame_rate(meta.fps());
        scene.set_render_resolution(meta.resolution[0], meta.resolution[1]);
        scene.set_motion_blur(MotionBlurSettings::recorded());

        self.state.stride = stride;
        self.state.dynamic_fov = meta.dynamic_fov;
        log::info!(
            "tracking data: {} fps, motion blur {} fps (stride {}), {}x{}, dynamic fov {}",
            meta.fps(),
            meta.motionblur_fps,
            stride.get(),
            meta.resolution[0],
            meta.resolution[1],
            meta.dynamic_fov
        );
        Ok(meta)
    }

    pub fn parse_camera(&mut self, scene: &mut dyn SceneWriter) -> ImportResult<CameraSummary> {
        let samples = self.document.camera().map_err(|err| ImportError::section(Section::Camera, err))?;
        let base_frame = self
            .track_base_frame(samples.len(), None)
            .map_err(|err| ImportError::section(Section::Camera, err))?;
        let camera = match scene.active_camera() {
            Some(camera) => camera,
            None => scene.create_camera(&self.options.camera_name),
        };
        let sensor_height = scene.sensor_height(camera);
        let delta_location = self.options.delta_location();

        let mut keyframes = 0;
        for (index, sample) in samples.iter().enumerate() {
            let Some(reduced) = self.state.stride.reduce(index) else {
                continue;
            };
            let frame = base_frame + reduced as i32;
            let update = TransformUpdate {
                location: Some(self.state.axis.remap(sample.position)),
                rotation_euler: Some(geometry::camera_euler(sample.angle)),
                delta_location: Some(delta_location),
                // static in principle, keyed every frame like the location
                delta_rotation_euler: Some(geometry::camera_delta_euler(sample.angle)),
                scale: None,
                lens: Some(geometry::focal_length(sample.angle[0], self.state.dynamic_fov, sensor_height)),
            };
            scene.set_transform(camera, &update);
            scene.insert_keyframe(camera, Channel::Location, frame);
            scene.insert_keyframe(camera, Channel::RotationEuler, frame);
            scene.insert_keyframe(camera, Channel::DeltaRotationEuler, frame);
            scene.insert_keyframe(camera, Channel::Lens, frame);
            keyframes += 1;
        }

        scene.set_active_object(camera);
        let smoothed = samples.len() > 1 && self.smooth(scene, camera);
        log::info!("camera: {keyframes} keyframes from {} samples", samples.len());
        Ok(CameraSummary {
            camera,
            samples: samples.len(),
            keyframes,
            reduced_len: self.state.stride.reduced_len(samples.len()),
            smoothed,
        })
    }

    pub fn parse_entities(&mut self, scene: &mut dyn SceneWriter) -> ImportResult<TrackSummary> {
        let tracks = self.document.entities().map_err(|err| ImportError::section(Section::Entities, err))?;
        let Some(tracks) = tracks else {
            return Ok(TrackSummary::default());
        };
        let delta_location = self.options.delta_location();
        let mut summary = TrackSummary::default();

        for (key, samples) in tracks {
            if samples.len() <= self.options.min_keyframes {
                log::debug!("entity '{key}': {} samples, skipped", samples.len());
                summary.skipped.push(key);
                continue;
            }
            let first_frame = samples.first().and_then(|sample| sample.frame);
            let base_frame = self
                .track_base_frame(samples.len(), first_frame)
                .with_context(|| format!("entity '{key}'"))
                .map_err(|err| ImportError::section(Section::Entities, err))?;
            let object = scene.create_poseable_object(&key);
            for (index, sample) in samples.iter().enumerate() {
                let Some(reduced) = self.state.stride.reduce(index) else {
                    continue;
                };
                let frame = base_frame + reduced as i32;

                if let Some(rotation) = sample.body_rotation {
                    let update = TransformUpdate {
                        delta_rotation_euler: Some(geometry::body_delta_euler(rotation)),
                        ..Default::default()
                    };
                    scene.set_transform(object, &update);
                    scene.insert_keyframe(object, Channel::DeltaRotationEuler, frame);
                }
                let update = TransformUpdate {
                    location: Some(self.state.axis.remap(sample.position)),
                    delta_location: Some(delta_location),
                    ..Default::default()
                };
                scene.set_transform(object, &update);
                scene.insert_keyframe(object, Channel::Location, frame);
                summary.keyframes += 1;
            }
            if samples.len() > 1 && !self.smooth(scene, object) && self.options.euler_filter {
                summary.smoothing_failures += 1;
            }
            summary.created.push((key, object));
        }
        log::info!(
            "entities: {} tracks imported, {} skipped, {} keyframes",
            summary.created.len(),
            summary.skipped.len(),
            summary.keyframes
        );
        Ok(summary)
    }

    pub fn parse_morphs(&mut self, scene: &mut dyn SceneWriter) -> ImportResult<TrackSummary> {
        let tracks = self.document.morphs().map_err(|err| ImportError::section(Section::Morphs, err))?;
        let Some(tracks) = tracks else {
            return Ok(TrackSummary::default());
        };
        if self.options.morph_rotation != [0; 3] {
            log::warn!(
                "morph rotation offset {:?} is not supported yet and will be ignored",
                self.options.morph_rotation
            );
        }
        let delta_location = self.options.delta_location();
        let mut summary = TrackSummary::default();

        for (key, samples) in tracks {
            if samples.len() <= self.options.min_keyframes {
                log::debug!("morph '{key}': {} samples, skipped", samples.len());
                summary.skipped.push(key);
                continue;
            }
            let first_frame = samples.first().and_then(|sample| sample.frame);
            let base_frame = self
                .track_base_frame(samples.len(), first_frame)
                .with_context(|| format!("morph '{key}'"))
                .map_err(|err| ImportError::section(Section::Morphs, err))?;
            let object = scene.create_poseable_object(&key);
            for (index, sample) in samples.iter().enumerate() {
                let Some(reduced) = self.state.stride.reduce(index) else {
                    continue;
                };
                let frame = base_frame + reduced as i32;

                let world =
                    geometry::morph_world_matrix(sample.rotation, sample.position, sample.scale, self.state.axis);
                let parts = geometry::decompose(world);
                let update = TransformUpdate {
                    location: Some(parts.location),
                    rotation_euler: Some(parts.rotation),
                    delta_location: Some(delta_location),
                    scale: Some(parts.scale),
                    ..Default::default()
                };
                scene.set_transform(object, &update);
                insert_loc_rot_scale(scene, object, frame);
                summary.keyframes += 1;
            }
            if samples.len() > 1 && !self.smooth(scene, object) && self.options.euler_filter {
                summary.smoothing_failures += 1;
            }
            summary.created.push((key, object));
        }
        log::info!(
            "morphs: {} tracks imported, {} skipped, {} keyframes",
            summary.created.len(),
            summary.skipped.len(),
            summary.keyframes
        );
        Ok(summary)
    }

    /// Scene frame of the first reduced sample of a track. Fails when any key
    /// of the track would fall outside the `i32` timeline.
    fn track_base_frame(&self, sample_count: usize, first_frame: Option<u32>) -> Result<i32> {
        let start_frame = first_frame.map_or(0, |explicit| self.state.stride.start_frame(explicit));
        let last = self.state.stride.reduced_len(sample_count).saturating_sub(1);
        let base = i64::from(self.state.frame_offset) + i64::from(start_frame);
        let end = base + i64::from(last);
        if i32::try_from(end).is_err() || i32::try_from(last).is_err() {
            bail!("track ends at frame {end}, outside the scene timeline");
        }
        i32::try_from(base).with_context(|| format!("track starts at frame {base}, outside the scene timeline"))
    }

    /// Runs the discontinuity filter when enabled. Failures are logged and
    /// leave the keys already written in place.
    fn smooth(&self, scene: &mut dyn SceneWriter, object: ObjectHandle) -> bool {
        if !self.options.euler_filter {
            return false;
        }
        match scene.apply_discontinuity_smoothing(object) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("{err}; keeping unfiltered keys");
                false
            }
        }
    }
}

fn insert_loc_rot_scale(scene: &mut dyn SceneWriter, object: ObjectHandle, frame: i32) {
    scene.insert_keyframe(object, Channel::RotationEuler, frame);
    scene.insert_keyframe(object, Channel::Location, frame);
    scene.insert_keyframe(object, Channel::Scale, frame);
}
