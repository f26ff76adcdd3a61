//! Capture error types and handling
//!
//! This module defines all error types used throughout the capture library,
//! providing clear error messages and context for debugging and error handling.

use thiserror::Error;

use crate::mode::VideoMode;

/// Main error type for capture operations
#[derive(Error, Debug)]
pub enum CaptureError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// No usable input backend on this platform, or the named device is not
    /// present (or is busy and cannot be shared)
    #[error("Device unavailable: {device_id}")]
    DeviceUnavailable {
        /// Device identifier
        device_id: String,
    },

    /// Platform input layer failure
    #[error("Backend error: {message}")]
    Backend {
        /// Error message
        message: String,
    },

    /// The opened source exposes no video stream
    #[error("No video stream in source")]
    NoVideoStream,

    /// No decoder is available for the stream's codec
    #[error("No decoder for codec: {codec}")]
    DecoderUnavailable {
        /// Codec name
        codec: String,
    },

    /// Requested mode has no match within tolerance on the target device
    #[error("No mode within tolerance of {requested}")]
    UnsupportedMode {
        /// The mode the caller asked for
        requested: VideoMode,
        /// Closest mode the device offered, if it offered any at all
        nearest: Option<VideoMode>,
    },

    /// Operation invoked on a session that was already closed
    #[error("Session closed")]
    SessionClosed,

    /// Frame buffer size does not match the negotiated geometry
    #[error("Invalid frame data: expected {expected} bytes, got {actual}")]
    InvalidFrameData {
        /// Expected data size
        expected: usize,
        /// Actual data size
        actual: usize,
    },
}

/// Result type alias for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

impl CaptureError {
    /// Check whether this error aborts an `open` call.
    ///
    /// Everything except a closed-session misuse is fatal to open; the
    /// distinction matters to callers that retry with an unconstrained mode.
    pub fn is_fatal_to_open(&self) -> bool {
        !matches!(self, CaptureError::SessionClosed)
    }

    /// True when retrying the open without a requested mode may succeed.
    pub fn is_mode_mismatch(&self) -> bool {
        matches!(self, CaptureError::UnsupportedMode { .. })
    }
}
