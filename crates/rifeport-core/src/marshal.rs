use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};

use crate::{Frame, InterpError, Result};

impl TryFrom<RgbImage> for Frame {
    type Error = InterpError;

    fn try_from(image: RgbImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Frame::new(width, height, 3, image.into_raw())
    }
}

impl TryFrom<RgbaImage> for Frame {
    type Error = InterpError;

    fn try_from(image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Frame::new(width, height, 4, image.into_raw())
    }
}

impl TryFrom<GrayImage> for Frame {
    type Error = InterpError;

    fn try_from(image: GrayImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Frame::new(width, height, 1, image.into_raw())
    }
}

impl TryFrom<DynamicImage> for Frame {
    type Error = InterpError;

    /// 8-bit layouts map directly; deeper images are narrowed to 8-bit RGB(A).
    fn try_from(image: DynamicImage) -> Result<Self> {
        match image {
            DynamicImage::ImageLuma8(gray) => gray.try_into(),
            DynamicImage::ImageLumaA8(gray_alpha) => {
                let (width, height) = gray_alpha.dimensions();
                Frame::new(width, height, 2, gray_alpha.into_raw())
            }
            DynamicImage::ImageRgb8(rgb) => rgb.try_into(),
            DynamicImage::ImageRgba8(rgba) => rgba.try_into(),
            other if other.color().has_alpha() => other.into_rgba8().try_into(),
            other => other.into_rgb8().try_into(),
        }
    }
}

impl TryFrom<&Frame> for DynamicImage {
    type Error = InterpError;

    fn try_from(frame: &Frame) -> Result<Self> {
        let (width, height) = (frame.width(), frame.height());
        let raw = frame.data().to_vec();
        let image = match frame.channels() {
            1 => GrayImage::from_raw(width, height, raw).map(DynamicImage::ImageLuma8),
            2 => GrayAlphaImage::from_raw(width, height, raw).map(DynamicImage::ImageLumaA8),
            3 => RgbImage::from_raw(width, height, raw).map(DynamicImage::ImageRgb8),
            4 => RgbaImage::from_raw(width, height, raw).map(DynamicImage::ImageRgba8),
            _ => None,
        };
        image.ok_or_else(|| {
            InterpError::InvalidFrame(format!("cannot express a {} frame as an image", frame.shape()))
        })
    }
}

/// Swaps the first and third channel of every pixel (RGB ↔ BGR). Frames with
/// fewer than three channels come back unchanged.
pub fn swap_red_blue(frame: &Frame) -> Result<Frame> {
    let channels = frame.channels() as usize;
    if channels < 3 {
        return Ok(frame.clone());
    }

    let mut data = frame.data().to_vec();
    for pixel in data.chunks_exact_mut(channels) {
        pixel.swap(0, 2);
    }
    Frame::with_shape(frame.shape(), data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_image_becomes_three_channel_frame() {
        let image = RgbImage::from_fn(3, 2, |x, y| image::Rgb([x as u8, y as u8, 7]));
        let frame = Frame::try_from(image.clone()).unwrap();
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.data(), image.as_raw().as_slice());

        let back = DynamicImage::try_from(&frame).unwrap();
        assert_eq!(back.into_rgb8(), image);
    }

    #[test]
    fn dynamic_images_keep_their_layout() {
        let gray = DynamicImage::new_luma8(4, 4);
        assert_eq!(Frame::try_from(gray).unwrap().channels(), 1);

        let rgba = DynamicImage::new_rgba8(4, 4);
        assert_eq!(Frame::try_from(rgba).unwrap().channels(), 4);

        let deep = DynamicImage::new_rgb16(4, 4);
        assert_eq!(Frame::try_from(deep).unwrap().channels(), 3);
    }

    #[test]
    fn empty_images_are_rejected() {
        assert!(Frame::try_from(RgbImage::new(0, 0)).is_err());
    }

    #[test]
    fn red_blue_swap_is_an_involution() {
        let frame = Frame::new(2, 1, 4, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let swapped = swap_red_blue(&frame).unwrap();
        assert_eq!(swapped.data(), &[3, 2, 1, 4, 7, 6, 5, 8]);
        assert_eq!(swap_red_blue(&swapped).unwrap(), frame);

        let rgb = Frame::new(1, 1, 3, vec![10, 20, 30]).unwrap();
        assert_eq!(swap_red_blue(&rgb).unwrap().data(), &[30, 20, 10]);

        let gray = Frame::new(2, 1, 1, vec![9, 9]).unwrap();
        assert!(swap_red_blue(&gray).unwrap().shares_storage(&gray));
    }
}
