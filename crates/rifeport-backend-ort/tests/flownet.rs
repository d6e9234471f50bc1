use std::path::PathBuf;

use anyhow::{ensure, Result};
use rifeport_backend_ort::{OrtBackend, FLOWNET_FILE};
use rifeport_core::{EngineConfig, Frame, FrameShape, InterpolationEngine, ModelStore};

// Exported networks are not checked in; drop them under `models/<name>/` at
// the workspace root to run these.
fn fixture_models() -> Vec<(ModelStore, String)> {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../models");
    let store = ModelStore::from_models_dir(&dir);
    let Ok(names) = store.list() else {
        return Vec::new();
    };
    names
        .into_iter()
        .filter(|name| dir.join(name).join(FLOWNET_FILE).is_file())
        .map(|name| (ModelStore::from_models_dir(&dir), name))
        .collect()
}

fn textured(shape: FrameShape, seed: u32) -> Frame {
    let data: Vec<u8> = (0..shape.byte_len() as u32)
        .map(|i| ((i / shape.channels as u32 + seed * 11) % 200 + 20) as u8)
        .collect();
    Frame::with_shape(shape, data).expect("frame")
}

fn max_diff(a: &[u8], b: &[u8]) -> u8 {
    a.iter().zip(b).map(|(x, y)| x.abs_diff(*y)).max().unwrap_or(0)
}

#[test]
fn identical_frames_interpolate_to_themselves() -> Result<()> {
    for (store, name) in fixture_models() {
        let mut engine =
            InterpolationEngine::create_with_store(&OrtBackend::new(), EngineConfig::new(&name), &store)?;

        // Neither edge is a multiple of the pad alignment.
        let frame = textured(FrameShape::new(37, 21, 3), 1);
        for t in [0.25f32, 0.5, 0.9] {
            let out = engine.process(&frame, &frame, t)?;
            ensure!(out.shape() == frame.shape(), "{name}: shape changed at t={t}");
            let diff = max_diff(out.data(), frame.data());
            ensure!(diff <= 12, "{name}: t={t} drifted by {diff}");
        }
    }
    Ok(())
}

#[test]
fn alpha_and_gray_frames_round_trip() -> Result<()> {
    for (store, name) in fixture_models() {
        let mut engine =
            InterpolationEngine::create_with_store(&OrtBackend::new(), EngineConfig::new(&name), &store)?;

        let a = textured(FrameShape::new(40, 24, 4), 2);
        let b = textured(FrameShape::new(40, 24, 4), 5);
        let out = engine.process(&a, &b, 0.5)?;
        ensure!(out.channels() == 4, "{name}: alpha dropped");
        for ((o, x), y) in out.data().chunks(4).zip(a.data().chunks(4)).zip(b.data().chunks(4)) {
            let expected = ((x[3] as f32 + y[3] as f32) / 2.0 + 0.5).floor() as u8;
            ensure!(o[3].abs_diff(expected) <= 1, "{name}: alpha {} vs {expected}", o[3]);
        }

        let gray = textured(FrameShape::new(33, 17, 1), 3);
        let out = engine.process(&gray, &gray, 0.5)?;
        ensure!(out.channels() == 1, "{name}: gray became {} channels", out.channels());
        let diff = max_diff(out.data(), gray.data());
        ensure!(diff <= 12, "{name}: gray drifted by {diff}");
    }
    Ok(())
}
