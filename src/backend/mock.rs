//! Synthetic input backend for tests and unsupported platforms
//!
//! Produces a deterministic packet stream so the whole decode/convert path
//! can run without hardware. Failure modes (busy device, source without a
//! video stream, broken enumeration) are injectable per device.

use std::collections::{HashMap, HashSet};

use bytes::Bytes;

use crate::catalog::DeviceDescriptor;
use crate::convert::{frame_byte_size, PixelFormat};
use crate::decode::{CodecId, CodedPacket, DecodeContext, StreamInfo, StreamKind};
use crate::error::{CaptureError, CaptureResult};
use crate::mode::VideoMode;

use super::{InputBackend, OpenOptions};

/// Configurable synthetic input backend.
pub struct MockInputBackend {
    devices: Vec<DeviceDescriptor>,
    modes: HashMap<String, Vec<VideoMode>>,
    busy: HashSet<String>,
    without_video: HashSet<String>,
    fail_enumeration: bool,
}

impl MockInputBackend {
    /// One synthetic camera offering VGA, HD and Full HD.
    pub fn new() -> Self {
        let mut modes = HashMap::new();
        modes.insert(
            "mock0".to_string(),
            vec![
                VideoMode::new(640, 480, 30.0),
                VideoMode::new(1280, 720, 30.0),
                VideoMode::new(1920, 1080, 30.0),
            ],
        );
        Self {
            devices: vec![DeviceDescriptor {
                id: "mock0".to_string(),
                name: "Mock Camera".to_string(),
            }],
            modes,
            busy: HashSet::new(),
            without_video: HashSet::new(),
            fail_enumeration: false,
        }
    }

    /// Backend with an explicit device list and no modes.
    pub fn with_devices(devices: Vec<(&str, &str)>) -> Self {
        Self {
            devices: devices
                .into_iter()
                .map(|(id, name)| DeviceDescriptor {
                    id: id.to_string(),
                    name: name.to_string(),
                })
                .collect(),
            modes: HashMap::new(),
            busy: HashSet::new(),
            without_video: HashSet::new(),
            fail_enumeration: false,
        }
    }

    /// Replace the mode list of one device.
    pub fn set_modes(&mut self, device_id: &str, modes: Vec<VideoMode>) {
        self.modes.insert(device_id.to_string(), modes);
    }

    /// Make opening this device fail as busy/unavailable.
    pub fn set_busy(&mut self, device_id: &str) {
        self.busy.insert(device_id.to_string());
    }

    /// Make this device open into a source with only an audio stream.
    pub fn set_without_video(&mut self, device_id: &str) {
        self.without_video.insert(device_id.to_string());
    }

    /// Make device enumeration itself fail.
    pub fn set_fail_enumeration(&mut self) {
        self.fail_enumeration = true;
    }
}

impl Default for MockInputBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBackend for MockInputBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn list_devices(&self) -> CaptureResult<Vec<DeviceDescriptor>> {
        if self.fail_enumeration {
            return Err(CaptureError::Backend {
                message: "enumeration failure injected".to_string(),
            });
        }
        Ok(self.devices.clone())
    }

    fn list_modes(&self, device_id: &str) -> CaptureResult<Vec<VideoMode>> {
        if self.fail_enumeration {
            return Err(CaptureError::Backend {
                message: "enumeration failure injected".to_string(),
            });
        }
        Ok(self.modes.get(device_id).cloned().unwrap_or_default())
    }

    fn open(&self, device_id: &str, options: &OpenOptions) -> CaptureResult<Box<dyn DecodeContext>> {
        if !self.devices.iter().any(|dev| dev.id == device_id) || self.busy.contains(device_id) {
            return Err(CaptureError::DeviceUnavailable {
                device_id: device_id.to_string(),
            });
        }

        if self.without_video.contains(device_id) {
            return Ok(Box::new(MockDecodeContext {
                streams: vec![StreamInfo {
                    index: 0,
                    kind: StreamKind::Audio,
                    codec: CodecId::Raw(PixelFormat::Rgb24),
                    mode: VideoMode::default(),
                }],
                width: 0,
                height: 0,
                tick: 0,
            }));
        }

        let (width, height) = match options.mode {
            Some(mode) if mode.width > 0 && mode.height > 0 => {
                (mode.width as u32, mode.height as u32)
            }
            _ => (640, 480),
        };
        Ok(Box::new(MockDecodeContext {
            streams: vec![
                StreamInfo {
                    index: 0,
                    kind: StreamKind::Video,
                    codec: CodecId::Raw(PixelFormat::Yuyv422),
                    mode: VideoMode::new(width as i32, height as i32, 30.0),
                },
                StreamInfo {
                    index: 1,
                    kind: StreamKind::Audio,
                    codec: CodecId::Raw(PixelFormat::Rgb24),
                    mode: VideoMode::default(),
                },
            ],
            width,
            height,
            tick: 0,
        }))
    }
}

/// Deterministic synthetic source.
///
/// The packet plan cycles: video frame, audio packet, video frame, nothing.
/// Video frames are YUYV gradients that change every tick.
struct MockDecodeContext {
    streams: Vec<StreamInfo>,
    width: u32,
    height: u32,
    tick: u64,
}

impl MockDecodeContext {
    fn gradient_frame(&self) -> Bytes {
        let len = frame_byte_size(PixelFormat::Yuyv422, self.width, self.height);
        let tick = self.tick as usize;
        let data: Vec<u8> = (0..len).map(|i| ((i / 2 + tick * 7) % 200 + 16) as u8).collect();
        Bytes::from(data)
    }
}

impl DecodeContext for MockDecodeContext {
    fn streams(&self) -> &[StreamInfo] {
        &self.streams
    }

    fn read_packet(&mut self) -> CaptureResult<Option<CodedPacket>> {
        let tick = self.tick;
        self.tick += 1;
        match tick % 4 {
            // Audio packet: must be filtered out by the session
            1 => Ok(Some(CodedPacket {
                stream_index: 1,
                data: Bytes::from_static(&[0u8; 16]),
            })),
            // Transient gap: nothing available this tick
            3 => Ok(None),
            _ => Ok(Some(CodedPacket {
                stream_index: 0,
                data: self.gradient_frame(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_packet_plan() {
        let backend = MockInputBackend::new();
        let mut context = backend.open("mock0", &OpenOptions::default()).unwrap();

        let first = context.read_packet().unwrap().expect("video packet");
        assert_eq!(first.stream_index, 0);
        assert_eq!(first.data.len(), frame_byte_size(PixelFormat::Yuyv422, 640, 480));

        let second = context.read_packet().unwrap().expect("audio packet");
        assert_eq!(second.stream_index, 1);

        let third = context.read_packet().unwrap().expect("video packet");
        assert_eq!(third.stream_index, 0);
        assert_ne!(first.data, third.data, "frames vary per tick");

        assert!(context.read_packet().unwrap().is_none(), "transient gap");
    }

    #[test]
    fn test_mock_honors_negotiated_mode() {
        let backend = MockInputBackend::new();
        let options = OpenOptions {
            mode: Some(VideoMode::new(1280, 720, 30.0)),
            ..OpenOptions::default()
        };
        let context = backend.open("mock0", &options).unwrap();
        assert_eq!(context.streams()[0].mode.width, 1280);
        assert_eq!(context.streams()[0].mode.height, 720);
    }

    #[test]
    fn test_mock_busy_device() {
        let mut backend = MockInputBackend::new();
        backend.set_busy("mock0");
        assert!(matches!(
            backend.open("mock0", &OpenOptions::default()),
            Err(CaptureError::DeviceUnavailable { .. })
        ));
    }
}
