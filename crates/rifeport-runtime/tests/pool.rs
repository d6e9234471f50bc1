use std::collections::HashSet;

use rifeport_backend_cpu::CpuBackend;
use rifeport_core::{
    EngineConfig, Frame, FrameShape, InterpError, InterpolationEngine, ModelStore,
};
use rifeport_runtime::EnginePool;
use tempfile::TempDir;

const MODEL: &str = "rife-v4.6";

fn model_store() -> (TempDir, ModelStore) {
    let root = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(root.path().join("models").join(MODEL)).expect("model dir");
    let store = ModelStore::new(root.path());
    (root, store)
}

fn frame(seed: u8) -> Frame {
    let shape = FrameShape::new(24, 16, 3);
    let data: Vec<u8> = (0..shape.byte_len())
        .map(|i| (i as u8).wrapping_mul(13).wrapping_add(seed))
        .collect();
    Frame::with_shape(shape, data).expect("frame")
}

async fn start_pool(workers: usize, store: ModelStore, model: &str) -> anyhow::Result<EnginePool> {
    let model = model.to_string();
    EnginePool::start(workers, move |_id| {
        InterpolationEngine::create_with_store(&CpuBackend::new(), EngineConfig::new(model.clone()), &store)
    })
    .await
}

#[tokio::test]
async fn pool_matches_direct_engine_call() {
    let (_root, store) = model_store();
    let mut direct =
        InterpolationEngine::create_with_store(&CpuBackend::new(), EngineConfig::new(MODEL), &store)
            .unwrap();
    let pool = start_pool(2, store, MODEL).await.unwrap();
    assert_eq!(pool.workers(), 2);

    let (a, b) = (frame(1), frame(90));
    for t in [0.25f32, 0.5, 0.75] {
        let reply = pool.submit(a.clone(), b.clone(), t).await.unwrap();
        assert_eq!(reply.frame, direct.process(&a, &b, t).unwrap());
    }

    pool.shutdown().await.unwrap();
}

#[tokio::test]
async fn requests_spread_across_workers() {
    let (_root, store) = model_store();
    let pool = start_pool(3, store, MODEL).await.unwrap();

    let mut workers = HashSet::new();
    for i in 0..6u8 {
        let reply = pool.submit(frame(i), frame(i + 1), 0.5).await.unwrap();
        workers.insert(reply.worker_id);
    }
    assert_eq!(workers, HashSet::from([0, 1, 2]));

    pool.shutdown().await.unwrap();
}

#[tokio::test]
async fn engine_errors_reach_the_caller() {
    let (_root, store) = model_store();
    let pool = start_pool(1, store, MODEL).await.unwrap();

    let small = Frame::new(4, 4, 3, vec![0u8; 48]).unwrap();
    let err = pool.submit(frame(0), small, 0.5).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<InterpError>(),
        Some(InterpError::ShapeMismatch { .. })
    ));

    // The worker survives a failed request.
    assert!(pool.submit(frame(0), frame(1), 0.5).await.is_ok());
    pool.shutdown().await.unwrap();
}

#[tokio::test]
async fn startup_fails_when_an_engine_cannot_be_built() {
    let (_root, store) = model_store();
    let err = start_pool(2, store, "rife-missing").await.err().unwrap();
    assert!(matches!(
        err.downcast_ref::<InterpError>(),
        Some(InterpError::ModelNotFound { .. })
    ));
}

#[tokio::test]
async fn zero_workers_is_rejected() {
    let (_root, store) = model_store();
    assert!(start_pool(0, store, MODEL).await.is_err());
}
