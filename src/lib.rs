pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod frame_rate;
pub mod geometry;
pub mod importer;
pub mod parser;
pub mod recording_scene;
pub mod scene_writer;

pub use config::{ImportOptions, ImportOptionsOverrides};
pub use document::TrackingDocument;
pub use error::{ImportError, Section, TrackSmoothingError};
pub use importer::{FileOutcome, FileReport, ImportReport, ImportStatus, TrackingImporter};
pub use parser::TrackingParser;
pub use recording_scene::RecordingScene;
pub use scene_writer::{Channel, ObjectHandle, SceneWriter, TransformUpdate};

/// Schema version understood by this importer. Documents declaring a higher
/// `required_import_version` are refused.
pub const IMPORTER_VERSION: u32 = 161;

/// Release page shown to users whose data needs a newer importer.
pub const RELEASES_URL: &str = "https://github.com/Chryfi/io_import_aperture_tracking/releases";

/// Wraps `radians` into `[-PI, PI)`. Constant time for any finite input.
pub(crate) fn wrap_angle(radians: f32) -> f32 {
    use std::f32::consts::PI;
    (radians + PI).rem_euclid(2.0 * PI) - PI
}
