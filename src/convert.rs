//! Pixel formats and RGB24 frame conversion
//!
//! Decoders hand back frames in whatever layout the source produced; the
//! session always exposes RGB24 at its negotiated geometry. Conversion runs
//! in two steps when needed: colorspace transform at source geometry, then a
//! Catmull-Rom bicubic resample to the destination geometry. Same-size
//! frames skip the resample entirely.

use crate::error::{CaptureError, CaptureResult};

/// Raw frame layouts understood by the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 3 bytes per pixel, R G B
    Rgb24,
    /// 3 bytes per pixel, B G R
    Bgr24,
    /// 4 bytes per pixel, R G B A
    Rgba32,
    /// YUV 4:2:0 planar (Y plane, U plane, V plane)
    Yuv420p,
    /// YUV 4:2:0 semi-planar (Y plane, interleaved UV plane)
    Nv12,
    /// YUV 4:2:2 packed (Y0 U Y1 V)
    Yuyv422,
}

impl PixelFormat {
    /// Short name as used in format hints and log lines.
    pub fn name(&self) -> &'static str {
        match self {
            PixelFormat::Rgb24 => "rgb24",
            PixelFormat::Bgr24 => "bgr24",
            PixelFormat::Rgba32 => "rgba",
            PixelFormat::Yuv420p => "yuv420p",
            PixelFormat::Nv12 => "nv12",
            PixelFormat::Yuyv422 => "yuyv422",
        }
    }
}

/// Byte length of one frame in the given layout.
///
/// Chroma planes of 4:2:0 layouts round up on odd geometry.
pub fn frame_byte_size(format: PixelFormat, width: u32, height: u32) -> usize {
    let w = width as usize;
    let h = height as usize;
    match format {
        PixelFormat::Rgb24 | PixelFormat::Bgr24 => w * h * 3,
        PixelFormat::Rgba32 => w * h * 4,
        PixelFormat::Yuv420p | PixelFormat::Nv12 => w * h + 2 * w.div_ceil(2) * h.div_ceil(2),
        PixelFormat::Yuyv422 => w * h * 2,
    }
}

/// A raw decoded video frame.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Pixel data
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel format
    pub format: PixelFormat,
}

/// Converts raw frames to RGB24 at a fixed destination geometry.
///
/// The destination geometry is set once when the session opens and never
/// changes; the scratch buffer is reused across frames on the scaled path.
#[derive(Debug)]
pub struct FrameConverter {
    dst_width: u32,
    dst_height: u32,
    scratch: Vec<u8>,
}

impl FrameConverter {
    /// Create a converter targeting the given output geometry.
    pub fn new(dst_width: u32, dst_height: u32) -> Self {
        Self {
            dst_width,
            dst_height,
            scratch: Vec::new(),
        }
    }

    /// Destination width in pixels.
    pub fn width(&self) -> u32 {
        self.dst_width
    }

    /// Destination height in pixels.
    pub fn height(&self) -> u32 {
        self.dst_height
    }

    /// Convert `frame` into `dst`, which must hold exactly one RGB24 frame
    /// at the destination geometry. Every destination byte is written.
    pub fn convert(&mut self, frame: &RawFrame, dst: &mut [u8]) -> CaptureResult<()> {
        let expected = frame_byte_size(PixelFormat::Rgb24, self.dst_width, self.dst_height);
        if dst.len() != expected {
            return Err(CaptureError::InvalidFrameData {
                expected,
                actual: dst.len(),
            });
        }
        let src_expected = frame_byte_size(frame.format, frame.width, frame.height);
        if frame.data.len() < src_expected {
            return Err(CaptureError::InvalidFrameData {
                expected: src_expected,
                actual: frame.data.len(),
            });
        }

        if frame.width == self.dst_width && frame.height == self.dst_height {
            to_rgb24(frame, dst);
        } else {
            let mut scratch = std::mem::take(&mut self.scratch);
            scratch.resize(
                frame_byte_size(PixelFormat::Rgb24, frame.width, frame.height),
                0,
            );
            to_rgb24(frame, &mut scratch);
            resample_bicubic(
                &scratch,
                frame.width,
                frame.height,
                dst,
                self.dst_width,
                self.dst_height,
            );
            self.scratch = scratch;
        }
        Ok(())
    }
}

/// Colorspace transform into an RGB24 buffer at source geometry.
fn to_rgb24(frame: &RawFrame, dst: &mut [u8]) {
    let w = frame.width as usize;
    let h = frame.height as usize;
    match frame.format {
        PixelFormat::Rgb24 => dst.copy_from_slice(&frame.data[..w * h * 3]),
        PixelFormat::Bgr24 => {
            for (out, px) in dst.chunks_exact_mut(3).zip(frame.data.chunks_exact(3)) {
                out[0] = px[2];
                out[1] = px[1];
                out[2] = px[0];
            }
        }
        PixelFormat::Rgba32 => {
            for (out, px) in dst.chunks_exact_mut(3).zip(frame.data.chunks_exact(4)) {
                out.copy_from_slice(&px[..3]);
            }
        }
        PixelFormat::Yuv420p => yuv420p_to_rgb24(&frame.data, w, h, dst),
        PixelFormat::Nv12 => nv12_to_rgb24(&frame.data, w, h, dst),
        PixelFormat::Yuyv422 => yuyv422_to_rgb24(&frame.data, w, h, dst),
    }
}

/// BT.601 full-range YUV to RGB for one pixel.
fn yuv_to_rgb(y: f32, u: f32, v: f32) -> [u8; 3] {
    let r = (y + 1.402 * v).round().clamp(0.0, 255.0) as u8;
    let g = (y - 0.344 * u - 0.714 * v).round().clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).round().clamp(0.0, 255.0) as u8;
    [r, g, b]
}

fn yuv420p_to_rgb24(src: &[u8], w: usize, h: usize, dst: &mut [u8]) {
    let y_size = w * h;
    let uv_w = w.div_ceil(2);
    let uv_size = uv_w * h.div_ceil(2);
    let y_plane = &src[..y_size];
    let u_plane = &src[y_size..y_size + uv_size];
    let v_plane = &src[y_size + uv_size..y_size + 2 * uv_size];

    for row in 0..h {
        for col in 0..w {
            let y = y_plane[row * w + col] as f32;
            let uv_idx = (row / 2) * uv_w + (col / 2);
            let u = u_plane[uv_idx] as f32 - 128.0;
            let v = v_plane[uv_idx] as f32 - 128.0;
            let out = (row * w + col) * 3;
            dst[out..out + 3].copy_from_slice(&yuv_to_rgb(y, u, v));
        }
    }
}

fn nv12_to_rgb24(src: &[u8], w: usize, h: usize, dst: &mut [u8]) {
    let y_size = w * h;
    let uv_w = w.div_ceil(2);
    let y_plane = &src[..y_size];
    let uv_plane = &src[y_size..];

    for row in 0..h {
        for col in 0..w {
            let y = y_plane[row * w + col] as f32;
            let uv_idx = ((row / 2) * uv_w + (col / 2)) * 2;
            let u = uv_plane[uv_idx] as f32 - 128.0;
            let v = uv_plane[uv_idx + 1] as f32 - 128.0;
            let out = (row * w + col) * 3;
            dst[out..out + 3].copy_from_slice(&yuv_to_rgb(y, u, v));
        }
    }
}

fn yuyv422_to_rgb24(src: &[u8], w: usize, h: usize, dst: &mut [u8]) {
    // Packed pairs: Y0 U Y1 V covers two horizontally adjacent pixels.
    for row in 0..h {
        for pair in 0..w / 2 {
            let idx = (row * w + pair * 2) * 2;
            let y0 = src[idx] as f32;
            let u = src[idx + 1] as f32 - 128.0;
            let y1 = src[idx + 2] as f32;
            let v = src[idx + 3] as f32 - 128.0;
            let out = (row * w + pair * 2) * 3;
            dst[out..out + 3].copy_from_slice(&yuv_to_rgb(y0, u, v));
            dst[out + 3..out + 6].copy_from_slice(&yuv_to_rgb(y1, u, v));
        }
        if w % 2 == 1 {
            // Trailing pixel of an odd row reuses the last chroma pair.
            let idx = (row * w + w - 1) * 2;
            let y = src[idx] as f32;
            let u = src[idx + 1] as f32 - 128.0;
            let v = if idx >= 2 { src[idx - 1] as f32 - 128.0 } else { 0.0 };
            let out = (row * w + w - 1) * 3;
            dst[out..out + 3].copy_from_slice(&yuv_to_rgb(y, u, v));
        }
    }
}

/// Catmull-Rom weight for a sample at distance `t` (|t| <= 2).
fn catmull_rom(t: f32) -> f32 {
    let t = t.abs();
    if t < 1.0 {
        1.5 * t * t * t - 2.5 * t * t + 1.0
    } else if t < 2.0 {
        -0.5 * t * t * t + 2.5 * t * t - 4.0 * t + 2.0
    } else {
        0.0
    }
}

/// Bicubic resample of an RGB24 image.
///
/// Edge samples clamp to the image border. Weights are renormalized per
/// pixel so rounding never pushes values outside [0, 255] by accumulation.
fn resample_bicubic(src: &[u8], sw: u32, sh: u32, dst: &mut [u8], dw: u32, dh: u32) {
    let sw = sw as usize;
    let sh = sh as usize;
    let dw = dw as usize;
    let dh = dh as usize;
    let x_ratio = sw as f32 / dw as f32;
    let y_ratio = sh as f32 / dh as f32;

    for dy in 0..dh {
        let sy = (dy as f32 + 0.5) * y_ratio - 0.5;
        let sy0 = sy.floor() as isize;
        let fy = sy - sy0 as f32;
        for dx in 0..dw {
            let sx = (dx as f32 + 0.5) * x_ratio - 0.5;
            let sx0 = sx.floor() as isize;
            let fx = sx - sx0 as f32;

            let mut acc = [0.0f32; 3];
            let mut weight_sum = 0.0f32;
            for j in -1..=2isize {
                let wy = catmull_rom(j as f32 - fy);
                if wy == 0.0 {
                    continue;
                }
                let py = (sy0 + j).clamp(0, sh as isize - 1) as usize;
                for i in -1..=2isize {
                    let wx = catmull_rom(i as f32 - fx);
                    if wx == 0.0 {
                        continue;
                    }
                    let px = (sx0 + i).clamp(0, sw as isize - 1) as usize;
                    let weight = wx * wy;
                    let idx = (py * sw + px) * 3;
                    acc[0] += src[idx] as f32 * weight;
                    acc[1] += src[idx + 1] as f32 * weight;
                    acc[2] += src[idx + 2] as f32 * weight;
                    weight_sum += weight;
                }
            }

            let out = (dy * dw + dx) * 3;
            for c in 0..3 {
                dst[out + c] = (acc[c] / weight_sum).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}
