//! Platform input backends
//!
//! An [`InputBackend`] is the platform's way of turning a device identifier
//! into an open [`DecodeContext`], plus the enumeration of devices and their
//! supported modes. One variant exists per platform; the resolver tries an
//! ordered list of candidate format names and returns the first one that is
//! constructible, mirroring how media stacks probe their default input
//! format. Nothing here is a global: the catalog owns whatever the resolver
//! returns.

pub mod dshow;
pub mod mock;
#[cfg(target_os = "linux")]
pub mod v4l2;

use crate::catalog::DeviceDescriptor;
use crate::convert::PixelFormat;
use crate::decode::DecodeContext;
use crate::error::CaptureResult;
use crate::mode::VideoMode;

/// Options passed to [`InputBackend::open`].
///
/// These are hints: a backend that cannot honor a field ignores it.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Preferred output pixel format of the source
    pub pixel_format_hint: Option<PixelFormat>,
    /// Negotiated capture mode; geometry the backend should configure
    pub mode: Option<VideoMode>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            pixel_format_hint: Some(PixelFormat::Rgb24),
            mode: None,
        }
    }
}

/// Platform-specific input backend.
pub trait InputBackend: Send + Sync {
    /// Input format name ("v4l2", "dshow", ...).
    fn name(&self) -> &'static str;

    /// Enumerate currently available capture devices.
    ///
    /// The synthetic "none" entry is *not* included here; the catalog
    /// prepends it.
    fn list_devices(&self) -> CaptureResult<Vec<DeviceDescriptor>>;

    /// Enumerate the modes supported by one device.
    fn list_modes(&self, device_id: &str) -> CaptureResult<Vec<VideoMode>>;

    /// Bind a demux/decode context to a device.
    fn open(&self, device_id: &str, options: &OpenOptions) -> CaptureResult<Box<dyn DecodeContext>>;
}

/// Webcam input format candidates for this platform, in probe order.
pub fn input_format_candidates() -> &'static [&'static str] {
    #[cfg(target_os = "linux")]
    {
        &["v4l2"]
    }
    #[cfg(target_os = "windows")]
    {
        &["dshow", "vfwcap"]
    }
    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        &[]
    }
}

/// Construct a backend by input format name, if this build carries it.
pub fn backend_by_name(name: &str) -> Option<Box<dyn InputBackend>> {
    match name {
        #[cfg(target_os = "linux")]
        "v4l2" => Some(Box::new(v4l2::V4l2Backend::new())),
        #[cfg(target_os = "windows")]
        "dshow" => dshow::DirectShowBackend::system()
            .map(|backend| Box::new(backend) as Box<dyn InputBackend>),
        _ => None,
    }
}

/// Resolve the platform's default input backend.
///
/// Tries every candidate name in order; `None` when the platform has no
/// usable input format, in which case enumeration degrades to the sentinel
/// catalog.
pub fn resolve_input_backend() -> Option<Box<dyn InputBackend>> {
    for &name in input_format_candidates() {
        if let Some(backend) = backend_by_name(name) {
            tracing::debug!(backend = backend.name(), "resolved input backend");
            return Some(backend);
        }
    }
    tracing::warn!("no valid input format found");
    None
}

/// A detected desktop-capture input format.
///
/// Desktop grabbers are enumeration-level: the catalog lists them so a
/// caller can present "capture the desktop" next to cameras.
#[derive(Debug, Clone)]
pub struct DesktopFormat {
    /// Grabber input format name ("x11grab", "gdigrab")
    pub name: &'static str,
    /// Device identifier for the whole-desktop region
    pub device_id: String,
}

/// Probe the platform's desktop-capture input format.
pub fn resolve_desktop_format() -> Option<DesktopFormat> {
    #[cfg(target_os = "linux")]
    {
        let display = std::env::var("DISPLAY").ok()?;
        Some(DesktopFormat {
            name: "x11grab",
            device_id: format!("x11grab#{display}"),
        })
    }
    #[cfg(target_os = "windows")]
    {
        Some(DesktopFormat {
            name: "gdigrab",
            device_id: "gdigrab#desktop".to_string(),
        })
    }
    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        None
    }
}

/// True when an identifier names a desktop-capture region rather than a
/// camera (grabber ids are `<format>#<region>`).
pub fn is_desktop_device_id(device_id: &str) -> bool {
    device_id.starts_with("x11grab#") || device_id.starts_with("gdigrab#")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_options_default_hints_rgb24() {
        let options = OpenOptions::default();
        assert_eq!(options.pixel_format_hint, Some(PixelFormat::Rgb24));
        assert!(options.mode.is_none());
    }

    #[test]
    fn test_desktop_device_ids() {
        assert!(is_desktop_device_id("x11grab#:0"));
        assert!(is_desktop_device_id("gdigrab#desktop"));
        assert!(!is_desktop_device_id("/dev/video0"));
        assert!(!is_desktop_device_id("video=USB_Camera"));
        // DirectShow pnp paths contain '#' but are not grabber regions
        assert!(!is_desktop_device_id(r"video=@device_pnp_\\?\usb#vid_046d"));
    }
}
