use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Phase of a tracking document that failed to import.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Section {
    Meta,
    Camera,
    Entities,
    Morphs,
}

impl Section {
    /// Label used in user-facing warnings.
    pub fn label(self) -> &'static str {
        match self {
            Section::Meta => "information data",
            Section::Camera => "camera data",
            Section::Entities => "entities data",
            Section::Morphs => "morphs data",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Section::Meta => "information",
            Section::Camera => "camera_tracking",
            Section::Entities => "entity_tracking",
            Section::Morphs => "morph_tracking",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(
        "The version of the import script is not compatible with the data! \
         (data requires version {required}, importer is version {supported})"
    )]
    VersionIncompatible { required: u32, supported: u32 },

    #[error("Something went wrong while parsing the {section}!")]
    Section {
        section: Section,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to load tracking document {}", .path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl ImportError {
    pub fn section(section: Section, source: anyhow::Error) -> Self {
        ImportError::Section { section, source }
    }

    /// Version mismatches abort the whole batch regardless of `ignore_errors`.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ImportError::VersionIncompatible { .. })
    }
}

/// Raised by a host when a rotation curve cannot be made continuous.
/// Never aborts an import; the track keeps the keys written so far.
#[derive(Debug, Error)]
#[error("discontinuity filter failed on '{object}': {reason}")]
pub struct TrackSmoothingError {
    pub object: String,
    pub reason: String,
}

pub type ImportResult<T> = std::result::Result<T, ImportError>;
