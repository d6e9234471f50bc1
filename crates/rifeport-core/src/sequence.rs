use tracing::debug;

use crate::{Frame, InterpolationEngine, Result};

/// Evenly spaced interior timesteps for an N× frame-rate multiplier:
/// 2× → `[0.5]`, 4× → `[0.25, 0.5, 0.75]`.
pub fn timesteps_for_multiplier(multiplier: u32) -> Vec<f32> {
    (1..multiplier)
        .map(|i| i as f32 / multiplier as f32)
        .collect()
}

/// Multiplies the frame rate of an ordered frame stream.
///
/// Consecutive pairs share a frame, so the last timestep of every pair goes
/// through [`InterpolationEngine::process_fast`]; earlier timesteps of the
/// same pair use the stateless path so the held frame stays valid. A change
/// of frame geometry starts a new segment: the cache is reset and nothing is
/// interpolated across the cut.
#[derive(Debug)]
pub struct SequenceInterpolator {
    timesteps: Vec<f32>,
    previous: Option<Frame>,
}

impl SequenceInterpolator {
    pub fn new(multiplier: u32) -> Self {
        Self {
            timesteps: timesteps_for_multiplier(multiplier),
            previous: None,
        }
    }

    pub fn multiplier(&self) -> u32 {
        self.timesteps.len() as u32 + 1
    }

    /// Feeds the next frame and returns what should be emitted, in order:
    /// the interpolated frames between the previous frame and `frame`,
    /// followed by `frame` itself.
    pub fn push(&mut self, engine: &mut InterpolationEngine, frame: Frame) -> Result<Vec<Frame>> {
        let Some(previous) = self.previous.take() else {
            engine.reset();
            self.previous = Some(frame.clone());
            return Ok(vec![frame]);
        };

        if previous.shape() != frame.shape() {
            debug!(from = %previous.shape(), to = %frame.shape(), "frame geometry changed; new segment");
            engine.reset();
            self.previous = Some(frame.clone());
            return Ok(vec![frame]);
        }

        let mut out = Vec::with_capacity(self.timesteps.len() + 1);
        if let Some((&last, rest)) = self.timesteps.split_last() {
            for &t in rest {
                out.push(engine.process(&previous, &frame, t)?);
            }
            out.push(engine.process_fast(&previous, &frame, last)?);
        }
        out.push(frame.clone());

        self.previous = Some(frame);
        Ok(out)
    }

    /// Forgets the previous frame; the next push starts a new segment.
    pub fn restart(&mut self) {
        self.previous = None;
    }
}
