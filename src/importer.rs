use crate::config::ImportOptions;
use crate::document::TrackingDocument;
use crate::error::ImportError;
use crate::parser::TrackingParser;
use crate::scene_writer::SceneWriter;
use crate::{IMPORTER_VERSION, RELEASES_URL};
use serde::Serialize;
use std::path::{Path, PathBuf};

const DEFAULT_ERROR_END: &str = "Read the log for further information.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Finished,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
    Passed,
    /// Some sections failed but the run continued.
    Warnings,
    /// The file stopped the batch or could not be imported at all.
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub label: String,
    pub outcome: FileOutcome,
    pub warnings: Vec<String>,
    /// Scene frame the file's timeline starts on.
    pub frame_offset: i32,
    pub camera_keyframes: usize,
    pub entity_tracks: usize,
    pub morph_tracks: usize,
}

impl FileReport {
    fn new(label: String) -> Self {
        Self {
            label,
            outcome: FileOutcome::Passed,
            warnings: Vec::new(),
            frame_offset: 0,
            camera_keyframes: 0,
            entity_tracks: 0,
            morph_tracks: 0,
        }
    }

    fn record(&mut self, err: &ImportError) {
        log::error!("[{}] {err:?}", self.label);
        self.warnings.push(format!("{err} {DEFAULT_ERROR_END}"));
        self.outcome = FileOutcome::Warnings;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub status: ImportStatus,
    pub files: Vec<FileReport>,
}

impl ImportReport {
    pub fn is_cancelled(&self) -> bool {
        self.status == ImportStatus::Cancelled
    }

    pub fn warning_count(&self) -> usize {
        self.files.iter().map(|file| file.warnings.len()).sum()
    }
}

enum Flow {
    Continue,
    Cancel,
}

/// Imports a batch of tracking files into one scene, chaining their
/// timelines so each file starts where the previous camera track ended.
pub struct TrackingImporter {
    options: ImportOptions,
    importer_version: u32,
}

impl TrackingImporter {
    pub fn new(options: ImportOptions) -> Self {
        Self { options, importer_version: IMPORTER_VERSION }
    }

    pub fn with_importer_version(mut self, version: u32) -> Self {
        self.importer_version = version;
        self
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Imports files in file-name order.
    pub fn import_paths(&self, paths: &[PathBuf], scene: &mut dyn SceneWriter) -> ImportReport {
        let mut sorted: Vec<&PathBuf> = paths.iter().collect();
        sorted.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        let entries = sorted.into_iter().map(|path| {
            let loaded = TrackingDocument::load(path).map_err(|source| ImportError::Document {
                path: path.clone(),
                source,
            });
            (display_label(path), loaded)
        });
        self.run(entries, scene)
    }

    /// Imports already parsed documents in label order.
    pub fn import_documents(
        &self,
        documents: &[(String, TrackingDocument)],
        scene: &mut dyn SceneWriter,
    ) -> ImportReport {
        let mut sorted: Vec<&(String, TrackingDocument)> = documents.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        let entries = sorted
            .into_iter()
            .map(|(label, document)| (label.clone(), Ok::<_, ImportError>(document.clone())));
        self.run(entries, scene)
    }

    fn run<I>(&self, entries: I, scene: &mut dyn SceneWriter) -> ImportReport
    where
        I: IntoIterator<Item = (String, std::result::Result<TrackingDocument, ImportError>)>,
    {
        let mut files = Vec::new();
        let mut accumulated = 0;
        for (label, loaded) in entries {
            let mut report = FileReport::new(label);
            let flow = match loaded {
                Ok(document) => self.import_document(&document, scene, &mut accumulated, &mut report),
                Err(err) => self.fail_section(&mut report, err),
            };
            files.push(report);
            if let Flow::Cancel = flow {
                return ImportReport { status: ImportStatus::Cancelled, files };
            }
        }
        ImportReport { status: ImportStatus::Finished, files }
    }

    fn import_document(
        &self,
        document: &TrackingDocument,
        scene: &mut dyn SceneWriter,
        accumulated: &mut i32,
        report: &mut FileReport,
    ) -> Flow {
        let options = &self.options;
        let mut parser = TrackingParser::new(document, options, *accumulated);
        report.frame_offset = parser.state().frame_offset;
        log::info!("importing '{}' at frame {}", report.label, report.frame_offset);

        match parser.parse_meta(scene, self.importer_version) {
            Ok(_) => {}
            Err(err) if err.is_fatal() => {
                log::error!("[{}] {err}", report.label);
                report
                    .warnings
                    .push(format!("{err}\nDownload the newest version of the script at {RELEASES_URL}."));
                report.outcome = FileOutcome::Failed;
                return Flow::Cancel;
            }
            // without a stride the remaining phases cannot run
            Err(err) => return self.fail_section(report, err),
        }

        if options.import_camera {
            match parser.parse_camera(scene) {
                Ok(summary) => {
                    report.camera_keyframes = summary.keyframes;
                    *accumulated = accumulated.saturating_add(i32::try_from(summary.reduced_len).unwrap_or(i32::MAX));
                }
                Err(err) => {
                    if let Flow::Cancel = self.fail_section(report, err) {
                        return Flow::Cancel;
                    }
                }
            }
        }

        if options.import_entities {
            match parser.parse_entities(scene) {
                Ok(summary) => report.entity_tracks = summary.created.len(),
                Err(err) => {
                    if let Flow::Cancel = self.fail_section(report, err) {
                        return Flow::Cancel;
                    }
                }
            }
        }

        if options.import_morphs {
            match parser.parse_morphs(scene) {
                Ok(summary) => report.morph_tracks = summary.created.len(),
                Err(err) => {
                    if let Flow::Cancel = self.fail_section(report, err) {
                        return Flow::Cancel;
                    }
                }
            }
        }
        Flow::Continue
    }

    fn fail_section(&self, report: &mut FileReport, err: ImportError) -> Flow {
        report.record(&err);
        if self.options.ignore_errors {
            Flow::Continue
        } else {
            report.outcome = FileOutcome::Failed;
            Flow::Cancel
        }
    }
}

fn display_label(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}
