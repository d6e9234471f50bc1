//! Overlapping tile grid for UHD mode.
//!
//! Each tile's `input` rect is what the kernel sees; only its `core` rect is
//! written back. Cores partition the frame; inputs extend each core by the
//! overlap on interior edges.

use crate::FrameShape;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
    pub input: Rect,
    pub core: Rect,
}

impl Tile {
    pub fn input_shape(&self, channels: u8) -> FrameShape {
        FrameShape::new(self.input.width, self.input.height, channels)
    }
}

#[derive(Clone, Copy, Debug)]
struct Span {
    input_start: u32,
    input_len: u32,
    core_start: u32,
    core_len: u32,
}

fn split_axis(len: u32, tile_size: u32, overlap: u32) -> Vec<Span> {
    if len <= tile_size {
        return vec![Span {
            input_start: 0,
            input_len: len,
            core_start: 0,
            core_len: len,
        }];
    }

    let step = tile_size - 2 * overlap;
    let mut spans = Vec::with_capacity(len.div_ceil(step) as usize);
    let mut core_start = 0;
    while core_start < len {
        let core_end = (core_start + step).min(len);
        let input_start = core_start.saturating_sub(overlap);
        let input_end = (core_end + overlap).min(len);
        spans.push(Span {
            input_start,
            input_len: input_end - input_start,
            core_start,
            core_len: core_end - core_start,
        });
        core_start = core_end;
    }
    spans
}

/// Tiles in row-major order. A frame that fits in one tile yields a single
/// tile covering it.
pub fn plan(width: u32, height: u32, tile_size: u32, overlap: u32) -> Vec<Tile> {
    debug_assert!(tile_size > 2 * overlap);
    let cols = split_axis(width, tile_size, overlap);
    let rows = split_axis(height, tile_size, overlap);

    rows.iter()
        .flat_map(|row| {
            cols.iter().map(move |col| Tile {
                input: Rect {
                    x: col.input_start,
                    y: row.input_start,
                    width: col.input_len,
                    height: row.input_len,
                },
                core: Rect {
                    x: col.core_start,
                    y: row.core_start,
                    width: col.core_len,
                    height: row.core_len,
                },
            })
        })
        .collect()
}

/// Copies `rect` out of a packed frame.
pub fn crop(src: &[u8], shape: FrameShape, rect: Rect) -> Vec<u8> {
    let channels = shape.channels as usize;
    let row_len = rect.width as usize * channels;
    let mut out = Vec::with_capacity(row_len * rect.height as usize);
    for y in rect.y..rect.y + rect.height {
        let start = (y as usize * shape.width as usize + rect.x as usize) * channels;
        out.extend_from_slice(&src[start..start + row_len]);
    }
    out
}

/// Writes the core region of a tile's output back into the full frame.
pub fn blit_core(tile_out: &[u8], tile: &Tile, dst: &mut [u8], shape: FrameShape) {
    let channels = shape.channels as usize;
    let tile_width = tile.input.width as usize;
    let row_len = tile.core.width as usize * channels;
    let dx = (tile.core.x - tile.input.x) as usize;
    let dy = (tile.core.y - tile.input.y) as usize;

    for row in 0..tile.core.height as usize {
        let src_start = ((dy + row) * tile_width + dx) * channels;
        let dst_y = tile.core.y as usize + row;
        let dst_start = (dst_y * shape.width as usize + tile.core.x as usize) * channels;
        dst[dst_start..dst_start + row_len].copy_from_slice(&tile_out[src_start..src_start + row_len]);
    }
}
