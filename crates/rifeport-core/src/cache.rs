//! Fast-path state for sequential interpolation.
//!
//! In a stream of pairs `(F0, F1), (F1, F2), ...` the second frame of one
//! call is the first frame of the next. The cache holds that frame between
//! calls so the kernel is fed from engine-owned storage.

use bytes::Bytes;
use tracing::debug;

use crate::{Frame, FrameShape, InterpError, Result};

/// Observable state of the fast-path cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    Uninitialized,
    Primed(FrameShape),
    /// A fast call failed; `reset()` is required before the next one.
    Poisoned,
}

#[derive(Debug, Default)]
enum CachedFrameState {
    #[default]
    Uninitialized,
    Primed {
        shape: FrameShape,
        held: Bytes,
    },
    Poisoned,
}

/// Held frame lent to one fast call. Handed back through [`FrameCache::commit`].
#[derive(Debug)]
pub struct FastCall {
    pub shape: FrameShape,
    pub held: Bytes,
}

#[derive(Debug, Default)]
pub struct FrameCache {
    state: CachedFrameState,
}

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> CacheStatus {
        match &self.state {
            CachedFrameState::Uninitialized => CacheStatus::Uninitialized,
            CachedFrameState::Primed { shape, .. } => CacheStatus::Primed(*shape),
            CachedFrameState::Poisoned => CacheStatus::Poisoned,
        }
    }

    pub fn reset(&mut self) {
        self.state = CachedFrameState::Uninitialized;
    }

    /// Checks the call against the cached geometry and lends out the held
    /// frame. Until [`commit`](Self::commit) runs, the
    /// cache reads as poisoned.
    ///
    /// `shape_hint` is `(height, width)`; when absent the geometry of the
    /// first call is taken from `frame0`.
    pub fn begin(
        &mut self,
        frame0: &Frame,
        frame1: &Frame,
        shape_hint: Option<(u32, u32)>,
        channels: u8,
        verify: bool,
    ) -> Result<FastCall> {
        match std::mem::replace(&mut self.state, CachedFrameState::Poisoned) {
            CachedFrameState::Uninitialized => {
                // A rejected first call leaves nothing to invalidate.
                let call = Self::seed(frame0, frame1, shape_hint, channels);
                if call.is_err() {
                    self.state = CachedFrameState::Uninitialized;
                }
                call
            }
            CachedFrameState::Primed { shape, held } => {
                if let Some((height, width)) = shape_hint {
                    let hinted = FrameShape::new(width, height, channels);
                    if hinted != shape {
                        return Err(stale(format!(
                            "cache primed for {shape}, call asked for {hinted}"
                        )));
                    }
                }
                for frame in [frame0, frame1] {
                    if frame.shape() != shape {
                        return Err(stale(format!(
                            "cache primed for {shape}, got a {} frame",
                            frame.shape()
                        )));
                    }
                }
                if verify && frame0.data() != held.as_ref() {
                    return Err(stale(
                        "first frame differs from the frame held since the previous call".into(),
                    ));
                }
                Ok(FastCall { shape, held })
            }
            CachedFrameState::Poisoned => Err(stale(
                "a previous fast call failed; reset the engine first".into(),
            )),
        }
    }

    /// Stores `next_held` (the call's second frame) for the next call.
    pub fn commit(&mut self, call: FastCall, next_held: Bytes) {
        self.state = CachedFrameState::Primed {
            shape: call.shape,
            held: next_held,
        };
    }

    fn seed(
        frame0: &Frame,
        frame1: &Frame,
        shape_hint: Option<(u32, u32)>,
        channels: u8,
    ) -> Result<FastCall> {
        let shape = match shape_hint {
            Some((height, width)) => FrameShape::new(width, height, channels),
            None => frame0.shape(),
        };
        shape.validate()?;

        for frame in [frame0, frame1] {
            if frame.shape() != shape {
                return Err(InterpError::ShapeMismatch {
                    first: shape,
                    second: frame.shape(),
                });
            }
        }

        debug!(%shape, "priming fast-path cache");
        Ok(FastCall {
            shape,
            held: frame0.bytes().clone(),
        })
    }
}

fn stale(msg: String) -> InterpError {
    InterpError::StaleCache(msg)
}
