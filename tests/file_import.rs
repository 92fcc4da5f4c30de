use anyhow::Result;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracking_import::{Channel, FileOutcome, ImportOptions, ImportStatus, RecordingScene, TrackingImporter};

fn write_json(dir: &Path, name: &str, value: &Value) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec_pretty(value)?)?;
    Ok(path)
}

fn recording(camera_samples: usize, stride: u32) -> Value {
    let camera: Vec<Value> =
        (0..camera_samples).map(|i| json!({ "position": [0, i, 0], "angle": [60, i, 0, 0] })).collect();
    json!({
        "information": {
            "required_import_version": 161,
            "fps": 24,
            "motionblur_fps": 24 * stride,
            "resolution": [1280, 720],
            "dynamic_fov": true
        },
        "camera_tracking": camera
    })
}

#[test]
fn files_are_imported_in_name_order() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let second = write_json(dir.path(), "take_02.json", &recording(4, 1))?;
    let first = write_json(dir.path(), "take_01.json", &recording(6, 2))?;

    let mut scene = RecordingScene::new();
    let options = ImportOptions { frame_offset: 0, ..Default::default() };
    let report = TrackingImporter::new(options).import_paths(&[second, first], &mut scene);

    assert_eq!(report.status, ImportStatus::Finished);
    let labels: Vec<&str> = report.files.iter().map(|file| file.label.as_str()).collect();
    assert_eq!(labels, ["take_01.json", "take_02.json"]);
    // six samples at stride two span three frames
    assert_eq!(report.files[0].camera_keyframes, 3);
    assert_eq!(report.files[1].frame_offset, 3);

    let camera = scene.active_camera.expect("camera");
    let frames: Vec<i32> = scene.keyframes(camera, Channel::Lens).iter().map(|key| key.frame).collect();
    assert_eq!(frames, [0, 1, 2, 3, 4, 5, 6]);
    Ok(())
}

#[test]
fn unreadable_file_is_a_warning_when_ignoring_errors() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let broken = dir.path().join("a_broken.json");
    fs::write(&broken, b"{ not json")?;
    let good = write_json(dir.path(), "b_good.json", &recording(2, 1))?;

    let mut scene = RecordingScene::new();
    let options = ImportOptions { ignore_errors: true, ..Default::default() };
    let report = TrackingImporter::new(options).import_paths(&[good.clone(), broken.clone()], &mut scene);
    assert_eq!(report.status, ImportStatus::Finished);
    assert_eq!(report.files[0].outcome, FileOutcome::Warnings);
    assert_eq!(report.files[1].outcome, FileOutcome::Passed);
    assert_eq!(report.files[1].frame_offset, 1, "failed file does not advance the timeline");

    let mut scene = RecordingScene::new();
    let report = TrackingImporter::new(ImportOptions::default()).import_paths(&[good, broken], &mut scene);
    assert!(report.is_cancelled());
    assert_eq!(report.files.len(), 1);
    assert!(scene.objects.is_empty());
    Ok(())
}

#[test]
fn imported_scene_can_be_saved() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_json(dir.path(), "shot.json", &recording(3, 1))?;
    let mut scene = RecordingScene::new();
    TrackingImporter::new(ImportOptions::default()).import_paths(&[input], &mut scene);

    let out = dir.path().join("export/scene.json");
    scene.save_to_path(&out)?;
    let restored = RecordingScene::load_from_path(&out)?;
    let camera = restored.active_camera.expect("camera survives");
    assert_eq!(restored.keyframes(camera, Channel::Location).len(), 3);
    assert_eq!(restored.render.fps, 24);
    Ok(())
}
