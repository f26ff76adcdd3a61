//! Video4Linux2 input backend (Linux)
//!
//! The generic list-devices backend: capture-capable `/dev/video*` nodes are
//! the device list, mode enumeration walks the driver's format/size/interval
//! tables, and open negotiates a format and wraps a memory-mapped capture
//! stream as a [`DecodeContext`] whose packets are the driver's buffers.

use bytes::Bytes;
use v4l::buffer::Type;
use v4l::capability::Flags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

use crate::catalog::DeviceDescriptor;
use crate::convert::PixelFormat;
use crate::decode::{CodecId, CodedPacket, DecodeContext, StreamInfo, StreamKind};
use crate::error::{CaptureError, CaptureResult};
use crate::mode::{VideoMode, UNSPECIFIED_RATE};

use super::{is_desktop_device_id, InputBackend, OpenOptions};

/// Common geometries probed against stepwise size ranges.
const STEPWISE_PROBE_SIZES: [(u32, u32); 4] = [(640, 480), (1280, 720), (1920, 1080), (3840, 2160)];

/// Number of memory-mapped capture buffers per open device.
const CAPTURE_BUFFERS: u32 = 4;

/// V4L2 input backend.
pub struct V4l2Backend;

impl V4l2Backend {
    /// Create the backend. Construction never touches devices.
    pub fn new() -> Self {
        Self
    }
}

impl Default for V4l2Backend {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a driver fourcc to a codec this crate can decode.
fn fourcc_to_codec(fourcc: FourCC) -> Option<CodecId> {
    match &fourcc.repr {
        b"RGB3" => Some(CodecId::Raw(PixelFormat::Rgb24)),
        b"BGR3" => Some(CodecId::Raw(PixelFormat::Bgr24)),
        b"YUYV" => Some(CodecId::Raw(PixelFormat::Yuyv422)),
        b"NV12" => Some(CodecId::Raw(PixelFormat::Nv12)),
        b"YU12" => Some(CodecId::Raw(PixelFormat::Yuv420p)),
        b"MJPG" => Some(CodecId::Mjpeg),
        b"H264" => Some(CodecId::H264),
        _ => None,
    }
}

/// Opaque mode tag for a fourcc.
fn fourcc_tag(fourcc: FourCC) -> u32 {
    u32::from_le_bytes(fourcc.repr)
}

/// Highest frame rate the driver reports for a geometry.
fn best_rate(device: &Device, fourcc: FourCC, width: u32, height: u32) -> f32 {
    let intervals = match device.enum_frameintervals(fourcc, width, height) {
        Ok(intervals) => intervals,
        Err(_) => return UNSPECIFIED_RATE,
    };
    let mut best = UNSPECIFIED_RATE;
    for interval in intervals {
        match interval.interval {
            v4l::frameinterval::FrameIntervalEnum::Discrete(fraction) => {
                if fraction.numerator > 0 {
                    let fps = fraction.denominator as f32 / fraction.numerator as f32;
                    if fps > best {
                        best = fps;
                    }
                }
            }
            v4l::frameinterval::FrameIntervalEnum::Stepwise(step) => {
                // The minimum interval is the maximum rate
                if step.min.numerator > 0 {
                    let fps = step.min.denominator as f32 / step.min.numerator as f32;
                    if fps > best {
                        best = fps;
                    }
                }
            }
        }
    }
    best
}

fn push_mode(
    modes: &mut Vec<VideoMode>,
    device: &Device,
    fourcc: FourCC,
    width: u32,
    height: u32,
) {
    let mode = VideoMode {
        width: width as i32,
        height: height as i32,
        fps: best_rate(device, fourcc, width, height),
        pixel_format: fourcc_tag(fourcc),
        ..VideoMode::default()
    };
    if !modes.contains(&mode) {
        modes.push(mode);
    }
}

/// Map an open/stream error, recognizing a busy device.
fn open_error(device_id: &str, error: std::io::Error) -> CaptureError {
    // EBUSY: the device is exclusively owned by another consumer
    if error.raw_os_error() == Some(16) {
        CaptureError::DeviceUnavailable {
            device_id: device_id.to_string(),
        }
    } else {
        CaptureError::Backend {
            message: format!("{device_id}: {error}"),
        }
    }
}

impl InputBackend for V4l2Backend {
    fn name(&self) -> &'static str {
        "v4l2"
    }

    fn list_devices(&self) -> CaptureResult<Vec<DeviceDescriptor>> {
        let mut devices = Vec::new();
        for node in v4l::context::enum_devices() {
            let path = node.path().to_path_buf();
            let device = match Device::with_path(&path) {
                Ok(device) => device,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping unopenable node");
                    continue;
                }
            };
            let caps = match device.query_caps() {
                Ok(caps) => caps,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "capability query failed");
                    continue;
                }
            };
            if !caps.capabilities.contains(Flags::VIDEO_CAPTURE)
                || !caps.capabilities.contains(Flags::STREAMING)
            {
                continue;
            }
            devices.push(DeviceDescriptor {
                id: path.to_string_lossy().into_owned(),
                name: caps.card,
            });
        }
        // enum_devices order follows readdir; keep ids stable for callers
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(devices)
    }

    fn list_modes(&self, device_id: &str) -> CaptureResult<Vec<VideoMode>> {
        if is_desktop_device_id(device_id) {
            // Desktop regions have no driver mode table
            return Ok(Vec::new());
        }
        let device =
            Device::with_path(device_id).map_err(|_| CaptureError::DeviceUnavailable {
                device_id: device_id.to_string(),
            })?;

        let mut modes = Vec::new();
        let formats = device.enum_formats().map_err(|e| CaptureError::Backend {
            message: format!("format enumeration failed: {e}"),
        })?;
        for desc in formats {
            if fourcc_to_codec(desc.fourcc).is_none() {
                tracing::debug!(fourcc = %desc.fourcc, "skipping undecodable format");
                continue;
            }
            let sizes = match device.enum_framesizes(desc.fourcc) {
                Ok(sizes) => sizes,
                Err(e) => {
                    tracing::debug!(fourcc = %desc.fourcc, error = %e, "no frame sizes");
                    continue;
                }
            };
            for size in sizes {
                match size.size {
                    v4l::framesize::FrameSizeEnum::Discrete(discrete) => {
                        push_mode(&mut modes, &device, desc.fourcc, discrete.width, discrete.height);
                    }
                    v4l::framesize::FrameSizeEnum::Stepwise(step) => {
                        for (width, height) in STEPWISE_PROBE_SIZES {
                            if width >= step.min_width
                                && width <= step.max_width
                                && height >= step.min_height
                                && height <= step.max_height
                            {
                                push_mode(&mut modes, &device, desc.fourcc, width, height);
                            }
                        }
                    }
                }
            }
        }
        Ok(modes)
    }

    fn open(&self, device_id: &str, options: &OpenOptions) -> CaptureResult<Box<dyn DecodeContext>> {
        if is_desktop_device_id(device_id) {
            // Desktop entries are enumeration-level; there is no grabber here
            return Err(CaptureError::DeviceUnavailable {
                device_id: device_id.to_string(),
            });
        }
        let mut device =
            Device::with_path(device_id).map_err(|e| open_error(device_id, e))?;

        let current = device.format().map_err(|e| open_error(device_id, e))?;
        let (width, height) = match options.mode {
            Some(mode) if mode.width > 0 && mode.height > 0 => {
                (mode.width as u32, mode.height as u32)
            }
            _ => (current.width, current.height),
        };

        // Honor the pixel format hint when the driver can emulate it, then
        // fall back to whatever the driver negotiates.
        let mut wanted = Format::new(width, height, current.fourcc);
        if options.pixel_format_hint == Some(PixelFormat::Rgb24) {
            wanted.fourcc = FourCC::new(b"RGB3");
        }
        let mut actual = device
            .set_format(&wanted)
            .map_err(|e| open_error(device_id, e))?;
        if fourcc_to_codec(actual.fourcc).is_none() {
            let formats = device.enum_formats().map_err(|e| open_error(device_id, e))?;
            for desc in formats {
                if fourcc_to_codec(desc.fourcc).is_some() {
                    actual = device
                        .set_format(&Format::new(width, height, desc.fourcc))
                        .map_err(|e| open_error(device_id, e))?;
                    break;
                }
            }
        }
        let codec = fourcc_to_codec(actual.fourcc).ok_or_else(|| CaptureError::Backend {
            message: format!("{device_id}: no decodable pixel format offered"),
        })?;

        let fps = best_rate(&device, actual.fourcc, actual.width, actual.height);
        let stream = MmapStream::with_buffers(&mut device, Type::VideoCapture, CAPTURE_BUFFERS)
            .map_err(|e| open_error(device_id, e))?;

        tracing::info!(
            device = device_id,
            width = actual.width,
            height = actual.height,
            fourcc = %actual.fourcc,
            "opened capture device"
        );

        let mode = VideoMode {
            width: actual.width as i32,
            height: actual.height as i32,
            fps,
            pixel_format: fourcc_tag(actual.fourcc),
            ..VideoMode::default()
        };
        Ok(Box::new(V4l2DecodeContext {
            streams: vec![StreamInfo {
                index: 0,
                kind: StreamKind::Video,
                codec,
                mode,
            }],
            stream,
        }))
    }
}

/// One open V4L2 capture stream.
///
/// The stream keeps the device handle alive internally; every dequeued
/// buffer becomes one coded packet on stream index 0.
struct V4l2DecodeContext {
    streams: Vec<StreamInfo>,
    stream: MmapStream<'static>,
}

impl DecodeContext for V4l2DecodeContext {
    fn streams(&self) -> &[StreamInfo] {
        &self.streams
    }

    fn read_packet(&mut self) -> CaptureResult<Option<CodedPacket>> {
        match self.stream.next() {
            Ok((data, meta)) => {
                if meta.bytesused == 0 || data.is_empty() {
                    // Some drivers deliver empty buffers while the sensor warms up
                    return Ok(None);
                }
                let used = (meta.bytesused as usize).min(data.len());
                Ok(Some(CodedPacket {
                    stream_index: 0,
                    data: Bytes::copy_from_slice(&data[..used]),
                }))
            }
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock
                        | std::io::ErrorKind::TimedOut
                        | std::io::ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(CaptureError::Backend {
                message: format!("frame dequeue failed: {e}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_mapping() {
        assert_eq!(
            fourcc_to_codec(FourCC::new(b"YUYV")),
            Some(CodecId::Raw(PixelFormat::Yuyv422))
        );
        assert_eq!(fourcc_to_codec(FourCC::new(b"MJPG")), Some(CodecId::Mjpeg));
        assert_eq!(fourcc_to_codec(FourCC::new(b"H264")), Some(CodecId::H264));
        assert_eq!(fourcc_to_codec(FourCC::new(b"S263")), None);
    }

    #[test]
    fn test_fourcc_tag_is_stable() {
        assert_eq!(fourcc_tag(FourCC::new(b"YUYV")), u32::from_le_bytes(*b"YUYV"));
    }

    #[test]
    fn test_desktop_ids_are_refused() {
        let backend = V4l2Backend::new();
        let err = backend
            .open("x11grab#:0", &OpenOptions::default())
            .unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable { .. }));
        assert!(backend.list_modes("x11grab#:0").unwrap().is_empty());
    }
}
