use anyhow::{anyhow, Result};
use std::process;
use tracking_import::cli::CliArgs;
use tracking_import::importer::{FileOutcome, ImportReport};
use tracking_import::{ImportOptions, RecordingScene, TrackingImporter};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run() {
        Ok(Some(report)) if report.is_cancelled() => process::exit(1),
        Ok(_) => {}
        Err(err) => {
            eprintln!("tracking_import error: {err:?}");
            process::exit(1);
        }
    }
}

fn run() -> Result<Option<ImportReport>> {
    let args = CliArgs::parse_from_env()?;
    if args.show_help {
        print_usage();
        return Ok(None);
    }
    if args.inputs.is_empty() {
        return Err(anyhow!("no tracking files given (see --help)"));
    }

    let mut options = match &args.options_path {
        Some(path) => ImportOptions::load(path)?,
        None => ImportOptions::default(),
    };
    let overrides = args.overrides.into_options_overrides();
    if !overrides.is_empty() {
        log::info!("option overrides: {}", overrides.applied_fields().join(", "));
        options.apply_overrides(&overrides);
    }

    let mut scene = RecordingScene::with_camera(&options.camera_name);
    let report = TrackingImporter::new(options).import_paths(&args.inputs, &mut scene);
    for file in &report.files {
        let status = match file.outcome {
            FileOutcome::Passed => "OK",
            FileOutcome::Warnings => "WARN",
            FileOutcome::Failed => "FAIL",
        };
        println!(
            "{status} {} (frame {}, {} camera keys, {} entities, {} morphs)",
            file.label, file.frame_offset, file.camera_keyframes, file.entity_tracks, file.morph_tracks
        );
        for warning in &file.warnings {
            println!("  {warning}");
        }
    }

    if report.is_cancelled() {
        println!("Import cancelled after {} file(s)", report.files.len());
        return Ok(Some(report));
    }
    println!(
        "Imported {} file(s): {} objects, {} keyframes, {} warnings",
        report.files.len(),
        scene.objects.len(),
        scene.total_keyframes(),
        report.warning_count()
    );
    if let Some(out) = &args.out_path {
        scene.save_to_path(out)?;
        println!("Wrote {}", out.display());
    }
    Ok(Some(report))
}

fn print_usage() {
    eprintln!(
        "Tracking Import

Usage:
  tracking_import [flags] <file.json> [<file.json>...]

Files are imported in file-name order; each file's timeline starts where the
previous file's camera track ended.

Flags:
  --options <path>          JSON preset with import options
  --out <path>              write the keyframed scene as JSON
  --frame-offset <n>        first scene frame (default 1)
  --delta-location <x,y,z>  static location bias
  --camera on|off           import the camera track
  --entities on|off         import entity trackers
  --morphs on|off           import morph trackers
  --euler-filter on|off     smooth rotation curves after each track
  --ignore-errors on|off    continue after a section fails
  --min-keyframes <n>       skip trackers with at most n samples
"
    );
}
