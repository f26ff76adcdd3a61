//! Device catalog: enumeration of capture devices and their modes
//!
//! The catalog reconciles whatever platform backend is available into one
//! canonical list. It is designed to never be fatally absent: every backend
//! failure is absorbed and downgraded to the degenerate catalog (the
//! synthetic "none" entry alone), so enumeration calls cannot fail.

use crate::backend::{self, DesktopFormat, InputBackend};
use crate::mode::VideoMode;

/// Identifier of the synthetic "no device selected" entry.
pub const NONE_DEVICE_ID: &str = "none";

/// Identifier returned when no default device can be resolved.
pub const INVALID_DEVICE_ID: &str = "invalid";

/// One enumerated capture device.
///
/// Produced fresh on every enumeration call; nothing is cached across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Backend-specific identifier, usable with `open`
    pub id: String,
    /// Human-readable display name
    pub name: String,
}

impl DeviceDescriptor {
    fn none_sentinel() -> Self {
        Self {
            id: NONE_DEVICE_ID.to_string(),
            name: "No camera device set".to_string(),
        }
    }
}

/// Catalog of available capture devices.
///
/// Owns the resolved platform backend and desktop-format probe result; both
/// are injected at construction so nothing here is process-global.
pub struct DeviceCatalog {
    backend: Option<Box<dyn InputBackend>>,
    desktop: Option<DesktopFormat>,
}

impl DeviceCatalog {
    /// Catalog over an explicit backend (or none) and desktop probe result.
    pub fn new(backend: Option<Box<dyn InputBackend>>, desktop: Option<DesktopFormat>) -> Self {
        Self { backend, desktop }
    }

    /// Catalog over the platform's default input backend.
    pub fn with_default_backend() -> Self {
        Self::new(
            backend::resolve_input_backend(),
            backend::resolve_desktop_format(),
        )
    }

    /// Name of the resolved input format, if any.
    pub fn backend_name(&self) -> Option<&'static str> {
        self.backend.as_deref().map(|backend| backend.name())
    }

    pub(crate) fn backend(&self) -> Option<&dyn InputBackend> {
        self.backend.as_deref()
    }

    /// List the available capture devices.
    ///
    /// The first entry is always the "none" sentinel; a desktop-capture
    /// entry is appended when the platform has a grabber format. Backend
    /// failures degrade to the sentinel-only list.
    pub fn list_devices(&self) -> Vec<DeviceDescriptor> {
        let mut devices = vec![DeviceDescriptor::none_sentinel()];

        match &self.backend {
            Some(backend) => match backend.list_devices() {
                Ok(found) => devices.extend(found),
                Err(e) => {
                    tracing::warn!(backend = backend.name(), error = %e, "device enumeration failed");
                }
            },
            None => {
                tracing::debug!("no input backend; returning sentinel catalog");
            }
        }

        if let Some(desktop) = &self.desktop {
            devices.push(DeviceDescriptor {
                id: desktop.device_id.clone(),
                name: "Desktop as a camera input for screen sharing".to_string(),
            });
        }

        devices
    }

    /// List the modes supported by one device.
    ///
    /// Unknown devices and backend failures yield an empty list.
    pub fn list_modes(&self, device_id: &str) -> Vec<VideoMode> {
        let Some(backend) = &self.backend else {
            return Vec::new();
        };
        match backend.list_modes(device_id) {
            Ok(modes) => modes,
            Err(e) => {
                tracing::warn!(device = device_id, error = %e, "mode enumeration failed");
                Vec::new()
            }
        }
    }

    /// Resolve the default device: the last enumerated camera.
    ///
    /// Returns [`INVALID_DEVICE_ID`] when no backend is available or it
    /// reports no devices.
    pub fn default_device_id(&self) -> String {
        let Some(backend) = &self.backend else {
            return INVALID_DEVICE_ID.to_string();
        };
        let devices = match backend.list_devices() {
            Ok(devices) => devices,
            Err(e) => {
                tracing::warn!(backend = backend.name(), error = %e, "device enumeration failed");
                return INVALID_DEVICE_ID.to_string();
            }
        };
        devices
            .last()
            .map(|device| device.id.clone())
            .unwrap_or_else(|| INVALID_DEVICE_ID.to_string())
    }
}
