//! # framegrab
//!
//! Cross-platform camera and desktop-capture input with decode and RGB24
//! frame delivery. The crate enumerates capture devices with their supported
//! modes, opens one device per session, and turns its packet stream into a
//! double-buffered RGB24 frame the consumer reads at its own cadence.
//!
//! The moving parts, leaves first: [`mode::VideoMode`] describes one capture
//! geometry/rate tuple and knows how close two modes are; the
//! [`catalog::DeviceCatalog`] reconciles the platform backend into one
//! canonical device list that is never fatally absent; a
//! [`session::CaptureSession`] owns an open device and performs the
//! per-tick read/decode/convert step; the [`registry::SessionRegistry`]
//! advances every open session on one external tick.

#![warn(clippy::all)]

pub mod backend;
pub mod catalog;
pub mod convert;
pub mod decode;
pub mod error;
pub mod mode;
pub mod registry;
pub mod session;

// Re-export main types
pub use backend::{DesktopFormat, InputBackend, OpenOptions};
pub use catalog::{DeviceCatalog, DeviceDescriptor, INVALID_DEVICE_ID, NONE_DEVICE_ID};
pub use convert::{frame_byte_size, FrameConverter, PixelFormat, RawFrame};
pub use decode::{CodecId, CodedPacket, DecodeContext, FrameDecoder, StreamInfo, StreamKind};
pub use error::{CaptureError, CaptureResult};
pub use mode::{closest_mode, VideoMode, UNSPECIFIED_RATE};
pub use registry::SessionRegistry;
pub use session::{CaptureSession, SessionId, SharedSession};

/// One-time process-wide initialization.
///
/// Registers nothing with the OS (decoders and input formats resolve
/// lazily) but gives embedders the required idempotent hook to call before
/// any enumeration or open, and logs what this platform can offer. Extra
/// calls are no-ops.
pub fn init() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        tracing::debug!(
            formats = ?backend::input_format_candidates(),
            "framegrab initialized"
        );
    });
}
