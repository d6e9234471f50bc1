use rifeport_core::FrameShape;

/// Padded network geometry for one frame shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaneGeometry {
    pub height: usize,
    pub width: usize,
    pub padded_height: usize,
    pub padded_width: usize,
}

impl PlaneGeometry {
    pub fn new(shape: FrameShape, alignment: u32) -> Self {
        let alignment = alignment.max(1) as usize;
        let (height, width) = (shape.height as usize, shape.width as usize);
        Self {
            height,
            width,
            padded_height: height.div_ceil(alignment) * alignment,
            padded_width: width.div_ceil(alignment) * alignment,
        }
    }

    pub fn plane_len(&self) -> usize {
        self.padded_height * self.padded_width
    }

    /// `[1, 3, H, W]` in padded coordinates.
    pub fn dims(&self, channels: usize) -> Vec<usize> {
        vec![1, channels, self.padded_height, self.padded_width]
    }
}

/// Mirrors coordinates past the edge back into `0..len`, edge included.
fn reflect(i: usize, len: usize) -> usize {
    if i < len {
        i
    } else {
        (2 * len - 1).saturating_sub(i)
    }
}

fn has_color(channels: usize) -> bool {
    channels >= 3
}

fn has_alpha(channels: usize) -> bool {
    channels == 2 || channels == 4
}

pub fn to_planes(src: &[u8], shape: FrameShape, geometry: PlaneGeometry) -> Vec<f32> {
    let channels = shape.channels as usize;
    let plane = geometry.plane_len();
    let mut planes = vec![0.0f32; 3 * plane];

    for py in 0..geometry.padded_height {
        let y = reflect(py, geometry.height);
        for px in 0..geometry.padded_width {
            let x = reflect(px, geometry.width);
            let i = (y * geometry.width + x) * channels;
            let rgb = if has_color(channels) {
                [src[i], src[i + 1], src[i + 2]]
            } else {
                [src[i]; 3]
            };
            let p = py * geometry.padded_width + px;
            for (k, value) in rgb.into_iter().enumerate() {
                planes[k * plane + p] = f32::from(value) / 255.0;
            }
        }
    }
    planes
}

/// Writes the cropped network output into `out`; alpha comes from the two
/// source frames blended at `timestep`.
pub fn from_planes(
    planes: &[f32],
    geometry: PlaneGeometry,
    shape: FrameShape,
    alpha_sources: (&[u8], &[u8]),
    timestep: f32,
    out: &mut [u8],
) {
    let channels = shape.channels as usize;
    let plane = geometry.plane_len();

    for y in 0..geometry.height {
        for x in 0..geometry.width {
            let p = y * geometry.padded_width + x;
            let rgb = [
                to_byte(planes[p]),
                to_byte(planes[plane + p]),
                to_byte(planes[2 * plane + p]),
            ];
            let i = (y * geometry.width + x) * channels;
            if has_color(channels) {
                out[i..i + 3].copy_from_slice(&rgb);
            } else {
                let sum: u32 = rgb.iter().map(|&v| u32::from(v)).sum();
                out[i] = ((sum + 1) / 3) as u8;
            }
            if has_alpha(channels) {
                let a = i + channels - 1;
                out[a] = blend(alpha_sources.0[a], alpha_sources.1[a], timestep);
            }
        }
    }
}

fn to_byte(value: f32) -> u8 {
    (value * 255.0 + 0.5).clamp(0.0, 255.0) as u8
}

fn blend(a: u8, b: u8, timestep: f32) -> u8 {
    let value = f32::from(a) * (1.0 - timestep) + f32::from(b) * timestep;
    value.round().clamp(0.0, 255.0) as u8
}

/// Concatenates both frames and a constant timestep plane into one
/// `[1, 7, H, W]` buffer.
pub fn concat_with_timestep(img0: &[f32], img1: &[f32], plane_len: usize, timestep: f32) -> Vec<f32> {
    let mut input = Vec::with_capacity(img0.len() + img1.len() + plane_len);
    input.extend_from_slice(img0);
    input.extend_from_slice(img1);
    input.resize(input.len() + plane_len, timestep);
    input
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_to_alignment() {
        let geometry = PlaneGeometry::new(FrameShape::new(1920, 1080, 3), 32);
        assert_eq!((geometry.padded_width, geometry.padded_height), (1920, 1088));

        let geometry = PlaneGeometry::new(FrameShape::new(1920, 1080, 3), 64);
        assert_eq!((geometry.padded_width, geometry.padded_height), (1920, 1088));

        let geometry = PlaneGeometry::new(FrameShape::new(100, 64, 3), 64);
        assert_eq!((geometry.padded_width, geometry.padded_height), (128, 64));
        assert_eq!(geometry.dims(3), vec![1, 3, 64, 128]);
    }

    #[test]
    fn reflects_past_the_edge() {
        assert_eq!(reflect(3, 5), 3);
        assert_eq!(reflect(5, 5), 4);
        assert_eq!(reflect(6, 5), 3);
        assert_eq!(reflect(40, 5), 0);
    }

    #[test]
    fn padding_mirrors_edge_pixels() {
        let shape = FrameShape::new(3, 1, 1);
        let geometry = PlaneGeometry::new(shape, 4);
        let planes = to_planes(&[0, 51, 255], shape, geometry);

        assert_eq!(geometry.plane_len(), 16);
        let row: Vec<f32> = planes[..4].to_vec();
        assert_eq!(row, vec![0.0, 0.2, 1.0, 1.0]);
        // Gray is replicated into every plane; padded rows mirror row 0.
        assert_eq!(&planes[16..20], row.as_slice());
        assert_eq!(&planes[4..8], row.as_slice());
    }

    #[test]
    fn color_and_gray_survive_the_trip_through_planes() {
        for channels in [1u8, 3] {
            let shape = FrameShape::new(5, 3, channels);
            let src: Vec<u8> = (0..shape.byte_len()).map(|i| (i * 17 % 256) as u8).collect();
            let geometry = PlaneGeometry::new(shape, 32);

            let planes = to_planes(&src, shape, geometry);
            let mut out = vec![0u8; src.len()];
            from_planes(&planes, geometry, shape, (&src, &src), 0.5, &mut out);
            assert_eq!(out, src, "channels = {channels}");
        }
    }

    #[test]
    fn alpha_is_blended_not_inferred() {
        let shape = FrameShape::new(1, 1, 4);
        let geometry = PlaneGeometry::new(shape, 32);
        let (a, b) = ([10u8, 20, 30, 0], [10u8, 20, 30, 200]);

        let planes = to_planes(&a, shape, geometry);
        let mut out = [0u8; 4];
        from_planes(&planes, geometry, shape, (&a, &b), 0.25, &mut out);
        assert_eq!(out, [10, 20, 30, 50]);
    }

    #[test]
    fn concatenation_appends_timestep_plane() {
        let input = concat_with_timestep(&[0.1; 6], &[0.9; 6], 2, 0.3);
        assert_eq!(input.len(), 14);
        assert_eq!(&input[12..], &[0.3, 0.3]);
        assert_eq!(input[6], 0.9);
    }
}
