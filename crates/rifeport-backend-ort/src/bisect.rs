use anyhow::Result;

/// Midpoint-only networks reach other timesteps by repeated halving.
pub const MAX_DEPTH: usize = 4;
const EPSILON: f32 = 1e-3;

/// Narrows `[0, 1]` around `timestep` with repeated midpoint `step`s.
///
/// Stops as soon as a midpoint lands within `EPSILON` of `timestep`; after
/// `MAX_DEPTH` steps the nearer end of the remaining interval wins.
pub fn bisect<F>(img0: Vec<f32>, img1: Vec<f32>, timestep: f32, mut step: F) -> Result<Vec<f32>>
where
    F: FnMut(&[f32], &[f32]) -> Result<Vec<f32>>,
{
    let (mut lo, mut hi) = (img0, img1);
    let (mut t_lo, mut t_hi) = (0.0f32, 1.0f32);

    for _ in 0..MAX_DEPTH {
        let mid = step(&lo, &hi)?;
        let t_mid = (t_lo + t_hi) / 2.0;
        if (timestep - t_mid).abs() < EPSILON {
            return Ok(mid);
        }
        if timestep < t_mid {
            hi = mid;
            t_hi = t_mid;
        } else {
            lo = mid;
            t_lo = t_mid;
        }
    }

    Ok(if timestep - t_lo <= t_hi - timestep {
        lo
    } else {
        hi
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // A "network" whose output is the average of its inputs, so a one-value
    // plane tracks the timestep it represents.
    fn run(timestep: f32) -> (f32, usize) {
        let mut runs = 0;
        let out = bisect(vec![0.0], vec![1.0], timestep, |a, b| {
            runs += 1;
            Ok(vec![(a[0] + b[0]) / 2.0])
        })
        .unwrap();
        (out[0], runs)
    }

    #[test]
    fn midpoint_takes_one_run() {
        assert_eq!(run(0.5), (0.5, 1));
    }

    #[test]
    fn quarter_takes_two_runs() {
        assert_eq!(run(0.25), (0.25, 2));
        assert_eq!(run(0.75), (0.75, 2));
    }

    #[test]
    fn depth_is_capped_with_nearest_endpoint() {
        // 0.5, 0.75, 0.875, 0.9375; 0.9 sits closer to 0.875.
        assert_eq!(run(0.9), (0.875, MAX_DEPTH));
        // 0.5, 0.25, 0.375, 0.3125; 1/3 sits closer to 0.3125.
        assert_eq!(run(1.0 / 3.0), (0.3125, MAX_DEPTH));
    }

    #[test]
    fn step_errors_propagate() {
        let err = bisect(vec![0.0], vec![1.0], 0.3, |_, _| anyhow::bail!("session failed"))
            .unwrap_err();
        assert_eq!(err.to_string(), "session failed");
    }
}
