//! Capture session: one open device and its decode-and-convert loop
//!
//! A session owns its demux/decode context, decoder and output buffer. The
//! external driver calls [`CaptureSession::update`] once per tick to pull a
//! coded packet, decode it and convert the result to RGB24 in place; the
//! consumer reads the output buffer at its own cadence through
//! [`CaptureSession::read_frame`].
//!
//! Sessions are shared as `Arc<Mutex<_>>`: the single mutex guards the
//! output buffer together with its dirty flag, so a consumer thread can read
//! while a driver thread ticks without tearing.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::backend::OpenOptions;
use crate::catalog::{DeviceCatalog, INVALID_DEVICE_ID, NONE_DEVICE_ID};
use crate::convert::{frame_byte_size, FrameConverter, PixelFormat};
use crate::decode::{new_decoder, DecodeContext, FrameDecoder, StreamKind};
use crate::error::{CaptureError, CaptureResult};
use crate::mode::{closest_mode, VideoMode};
use crate::registry::SessionRegistry;

/// Shared handle to a live session.
pub type SharedSession = Arc<Mutex<CaptureSession>>;

/// Registry-unique session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Open,
    Playing,
    Paused,
    Closed,
}

/// One open capture device.
pub struct CaptureSession {
    id: SessionId,
    state: SessionState,
    looping: bool,
    start_time: f64,
    start_frame_time: f64,
    context: Option<Box<dyn DecodeContext>>,
    decoder: Option<Box<dyn FrameDecoder>>,
    video_stream: usize,
    converter: FrameConverter,
    frame: Vec<u8>,
    dirty: bool,
    width: u32,
    height: u32,
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("looping", &self.looping)
            .field("start_time", &self.start_time)
            .field("start_frame_time", &self.start_frame_time)
            .field("context", &self.context.as_ref().map(|_| "<DecodeContext>"))
            .field("decoder", &self.decoder.as_ref().map(|_| "<FrameDecoder>"))
            .field("video_stream", &self.video_stream)
            .field("dirty", &self.dirty)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

fn wall_clock_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

impl CaptureSession {
    /// Open a capture device and register the session.
    ///
    /// `device_id` of `None` resolves the catalog's default device. A
    /// requested mode gates device selection: the closest offered mode
    /// within tolerance is negotiated, and the open fails with
    /// [`CaptureError::UnsupportedMode`] before any device resource is
    /// acquired when nothing qualifies. Failure at any later step releases
    /// everything acquired so far; a failed open is never registered.
    pub fn open(
        catalog: &DeviceCatalog,
        registry: &SessionRegistry,
        device_id: Option<&str>,
        requested_mode: Option<VideoMode>,
    ) -> CaptureResult<SharedSession> {
        let device_id = match device_id {
            Some(id) => id.to_string(),
            None => catalog.default_device_id(),
        };
        if device_id == NONE_DEVICE_ID || device_id == INVALID_DEVICE_ID {
            return Err(CaptureError::DeviceUnavailable { device_id });
        }
        let backend = catalog
            .backend()
            .ok_or_else(|| CaptureError::DeviceUnavailable {
                device_id: device_id.clone(),
            })?;

        let mut options = OpenOptions::default();
        if let Some(requested) = requested_mode.filter(|mode| !mode.is_unset()) {
            let offered = catalog.list_modes(&device_id);
            let matched = closest_mode(&requested, &offered).ok_or_else(|| {
                CaptureError::UnsupportedMode {
                    requested,
                    nearest: offered
                        .iter()
                        .min_by_key(|mode| requested.norm(mode))
                        .copied(),
                }
            })?;
            debug!(%requested, %matched, "negotiated capture mode");
            options.mode = Some(matched);
        }

        let context = backend.open(&device_id, &options)?;

        // Dropping the context on any failure below releases the device.
        let stream = context
            .streams()
            .iter()
            .find(|stream| stream.kind == StreamKind::Video)
            .cloned()
            .ok_or(CaptureError::NoVideoStream)?;
        let decoder = new_decoder(&stream)?;

        let width = stream.mode.width.max(0) as u32;
        let height = stream.mode.height.max(0) as u32;
        let frame = vec![0u8; frame_byte_size(PixelFormat::Rgb24, width, height)];

        info!(
            device = %device_id,
            width,
            height,
            codec = stream.codec.name(),
            "capture session open"
        );

        let session = CaptureSession {
            id: registry.allocate_id(),
            state: SessionState::Open,
            looping: false,
            start_time: 0.0,
            start_frame_time: 0.0,
            video_stream: stream.index,
            converter: FrameConverter::new(width, height),
            context: Some(context),
            decoder: Some(decoder),
            frame,
            dirty: false,
            width,
            height,
        };
        let shared = Arc::new(Mutex::new(session));
        registry.register(Arc::clone(&shared));
        Ok(shared)
    }

    /// Registry identifier of this session.
    pub fn id(&self) -> SessionId {
        self.id
    }

    fn ensure_open(&self) -> CaptureResult<()> {
        if self.state == SessionState::Closed {
            Err(CaptureError::SessionClosed)
        } else {
            Ok(())
        }
    }

    /// Advance the session by one tick: read one packet, decode, convert.
    ///
    /// An empty tick (no packet, packet of another stream, incomplete
    /// frame) is a normal no-op; decode hiccups are logged and swallowed.
    /// Only use after close is an error.
    pub fn update(&mut self) -> CaptureResult<()> {
        self.ensure_open()?;
        let context = self.context.as_mut().ok_or(CaptureError::SessionClosed)?;

        let packet = match context.read_packet() {
            Ok(Some(packet)) => packet,
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!(error = %e, "packet read failed");
                return Ok(());
            }
        };
        if packet.stream_index != self.video_stream {
            return Ok(());
        }

        let decoder = self.decoder.as_mut().ok_or(CaptureError::SessionClosed)?;
        match decoder.decode(&packet) {
            Ok(Some(raw)) => {
                if let Err(e) = self.converter.convert(&raw, &mut self.frame) {
                    warn!(error = %e, "frame conversion failed");
                } else {
                    self.dirty = true;
                }
            }
            // Frame completes on a later packet
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "decode failed");
            }
        }
        // The packet drops here whether or not a frame completed.
        Ok(())
    }

    /// Start playback bookkeeping. No decode side effect.
    pub fn play(&mut self) -> CaptureResult<()> {
        self.ensure_open()?;
        self.state = SessionState::Playing;
        self.start_time = wall_clock_secs();
        Ok(())
    }

    /// Pause playback bookkeeping. No decode side effect.
    pub fn pause(&mut self) -> CaptureResult<()> {
        self.ensure_open()?;
        self.state = SessionState::Paused;
        Ok(())
    }

    /// Record a seek target. Stub: no frame-accurate behavior is promised.
    pub fn seek_to(&mut self, timestamp_secs: f64) -> CaptureResult<()> {
        self.ensure_open()?;
        self.start_frame_time = timestamp_secs;
        Ok(())
    }

    /// Negotiated frame width in pixels. Fixed for the session's lifetime.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Negotiated frame height in pixels. Fixed for the session's lifetime.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Read the output buffer: `width × height × 3` bytes of RGB24,
    /// row-major, no padding.
    ///
    /// Reading acknowledges the current frame (clears the dirty flag). When
    /// nothing new was decoded since the last read the previous content
    /// comes back unchanged.
    pub fn read_frame(&mut self) -> CaptureResult<Vec<u8>> {
        self.ensure_open()?;
        self.dirty = false;
        Ok(self.frame.clone())
    }

    /// True when the buffer holds a frame decoded since the last read.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True until the session is closed.
    pub fn is_loaded(&self) -> bool {
        self.state != SessionState::Closed
    }

    /// True while playback bookkeeping says "playing".
    pub fn is_playing(&self) -> bool {
        self.state == SessionState::Playing
    }

    /// Loop flag bookkeeping.
    pub fn looping(&self) -> bool {
        self.looping
    }

    /// Set the loop flag.
    pub fn set_looping(&mut self, looping: bool) -> CaptureResult<()> {
        self.ensure_open()?;
        self.looping = looping;
        Ok(())
    }

    /// Timestamp recorded by the last [`play`](Self::play).
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Timestamp recorded by the last [`seek_to`](Self::seek_to).
    pub fn start_frame_time(&self) -> f64 {
        self.start_frame_time
    }

    /// Close the session: release the decoder, the demux context and the
    /// frame buffers in that order, then unregister.
    ///
    /// Safe to call mid-playback or right after a partial frame. Every
    /// operation after close fails with [`CaptureError::SessionClosed`].
    pub fn close(&mut self, registry: &SessionRegistry) -> CaptureResult<()> {
        self.ensure_open()?;
        drop(self.decoder.take());
        drop(self.context.take());
        self.frame = Vec::new();
        self.dirty = false;
        self.state = SessionState::Closed;
        registry.unregister(self.id);
        info!(session = self.id.0, "capture session closed");
        Ok(())
    }
}
