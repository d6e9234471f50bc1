use crate::FrameShape;

/// Mirrors a packed frame left-to-right, keeping channel order per pixel.
pub fn flip_horizontal(src: &[u8], shape: FrameShape) -> Vec<u8> {
    let channels = shape.channels as usize;
    let mut out = Vec::with_capacity(src.len());
    for row in src.chunks_exact(shape.row_bytes()) {
        for pixel in row.chunks_exact(channels).rev() {
            out.extend_from_slice(pixel);
        }
    }
    out
}

/// Running per-byte sum over augmentation passes.
#[derive(Debug)]
pub struct Accumulator {
    sums: Vec<u32>,
    passes: u32,
}

impl Accumulator {
    pub fn new(len: usize) -> Self {
        Self {
            sums: vec![0; len],
            passes: 0,
        }
    }

    pub fn add(&mut self, pass: &[u8]) {
        debug_assert_eq!(pass.len(), self.sums.len());
        for (sum, &value) in self.sums.iter_mut().zip(pass) {
            *sum += u32::from(value);
        }
        self.passes += 1;
    }

    pub fn passes(&self) -> u32 {
        self.passes
    }

    /// Mean of all passes, rounding halves up.
    pub fn finish(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), self.sums.len());
        let n = self.passes.max(1);
        for (dst, &sum) in out.iter_mut().zip(&self.sums) {
            *dst = ((sum + n / 2) / n) as u8;
        }
    }
}
