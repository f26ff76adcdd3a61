//! DirectShow-style property enumeration backend (Windows)
//!
//! Device and mode discovery walks the system device-category enumerator:
//! every video-input moniker yields a stable identifier (its display name,
//! with the `:` delimiter normalized away so the id round-trips through a
//! later device-open call) and a friendly name; mode discovery inspects each
//! output pin of the device filter, keeps only capture-category pins, and
//! reads the maximum output geometry and minimum frame interval of every
//! stream capability.
//!
//! The COM walk itself lives behind the [`DeviceProperties`] seam so the
//! conversion and filtering logic stays platform-neutral and testable.

use crate::catalog::DeviceDescriptor;
use crate::decode::DecodeContext;
use crate::error::{CaptureError, CaptureResult};
use crate::mode::{VideoMode, UNSPECIFIED_RATE};

use super::{InputBackend, OpenOptions};

/// Prefix marking an identifier as a video input device.
///
/// Identifiers carry it so they can be handed to the demuxer open call
/// unchanged; mode enumeration strips it again.
pub const DEVICE_ID_PREFIX: &str = "video=";

/// Frame intervals are expressed in 100-nanosecond ticks.
pub const INTERVAL_TICKS_PER_SECOND: f64 = 1.0e7;

/// Replace the field delimiter in a raw device identifier.
///
/// The demuxer uses `:` to separate sources, so it cannot appear inside an
/// identifier.
pub fn normalize_device_id(raw: &str) -> String {
    raw.replace(':', "_")
}

/// Full device id as reported by enumeration.
pub fn prefixed_device_id(raw: &str) -> String {
    format!("{DEVICE_ID_PREFIX}{}", normalize_device_id(raw))
}

/// Remove the [`DEVICE_ID_PREFIX`] if present.
pub fn strip_device_prefix(device_id: &str) -> &str {
    device_id.strip_prefix(DEVICE_ID_PREFIX).unwrap_or(device_id)
}

/// Convert a minimum frame interval to a rate in Hz.
pub fn rate_from_interval(min_frame_interval: i64) -> f32 {
    if min_frame_interval <= 0 {
        UNSPECIFIED_RATE
    } else {
        (INTERVAL_TICKS_PER_SECOND / min_frame_interval as f64) as f32
    }
}

/// Direction of a device filter pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    /// Input pin
    Input,
    /// Output pin
    Output,
}

/// Category of a device filter pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinCategory {
    /// Live capture output
    Capture,
    /// Anything else (preview, still, VBI, ...)
    Other,
}

/// One stream capability record read from a pin.
#[derive(Debug, Clone)]
pub struct StreamCaps {
    /// Maximum output width in pixels
    pub max_output_width: i32,
    /// Maximum output height in pixels
    pub max_output_height: i32,
    /// Minimum frame interval in 100ns ticks (maximum rate)
    pub min_frame_interval: i64,
    /// True when the record carries a video-info format block
    pub is_video_info: bool,
}

/// One enumerated pin with its capability records.
#[derive(Debug, Clone)]
pub struct PinProbe {
    /// Pin direction
    pub direction: PinDirection,
    /// Pin category
    pub category: PinCategory,
    /// Capability records read from the pin
    pub caps: Vec<StreamCaps>,
}

/// Raw properties of one enumerated device.
#[derive(Debug, Clone)]
pub struct RawDeviceProps {
    /// Backend display name, before delimiter normalization
    pub display_name: String,
    /// Human-readable friendly name
    pub friendly_name: String,
}

/// Seam over the system device enumerator.
///
/// The real implementation walks COM; tests drive the backend with canned
/// probe data.
pub trait DeviceProperties: Send + Sync {
    /// All video-input devices currently registered.
    fn devices(&self) -> CaptureResult<Vec<RawDeviceProps>>;

    /// Pin probes for the device with the given (raw) display name.
    fn pins(&self, display_name: &str) -> CaptureResult<Vec<PinProbe>>;
}

/// Convert pin probes to the device's mode list.
///
/// Only output pins of capture category contribute; capability records
/// without a video-info block are skipped; identical modes collapse.
pub fn modes_from_pins(pins: &[PinProbe]) -> Vec<VideoMode> {
    let mut modes: Vec<VideoMode> = Vec::new();
    for pin in pins {
        if pin.direction != PinDirection::Output || pin.category != PinCategory::Capture {
            continue;
        }
        for caps in &pin.caps {
            if !caps.is_video_info {
                continue;
            }
            let mode = VideoMode::new(
                caps.max_output_width,
                caps.max_output_height,
                rate_from_interval(caps.min_frame_interval),
            );
            if !modes.contains(&mode) {
                modes.push(mode);
            }
        }
    }
    modes
}

/// Property-enumeration input backend.
pub struct DirectShowBackend<P: DeviceProperties> {
    props: P,
}

impl<P: DeviceProperties> DirectShowBackend<P> {
    /// Build the backend over an enumerator implementation.
    pub fn new(props: P) -> Self {
        Self { props }
    }
}

#[cfg(target_os = "windows")]
impl DirectShowBackend<com::SystemDeviceEnumerator> {
    /// Backend over the live system device enumerator.
    pub fn system() -> Option<Self> {
        com::SystemDeviceEnumerator::new().map(Self::new)
    }
}

impl<P: DeviceProperties> InputBackend for DirectShowBackend<P> {
    fn name(&self) -> &'static str {
        "dshow"
    }

    fn list_devices(&self) -> CaptureResult<Vec<DeviceDescriptor>> {
        let devices = self.props.devices()?;
        Ok(devices
            .into_iter()
            .map(|dev| DeviceDescriptor {
                id: prefixed_device_id(&dev.display_name),
                name: dev.friendly_name,
            })
            .collect())
    }

    fn list_modes(&self, device_id: &str) -> CaptureResult<Vec<VideoMode>> {
        let wanted = strip_device_prefix(device_id);
        let device = self
            .props
            .devices()?
            .into_iter()
            .find(|dev| normalize_device_id(&dev.display_name) == wanted)
            .ok_or_else(|| CaptureError::DeviceUnavailable {
                device_id: device_id.to_string(),
            })?;
        let pins = self.props.pins(&device.display_name)?;
        Ok(modes_from_pins(&pins))
    }

    fn open(&self, device_id: &str, _options: &OpenOptions) -> CaptureResult<Box<dyn DecodeContext>> {
        // TODO: wire an IMFSourceReader-backed DecodeContext so dshow ids
        // open natively instead of only enumerating.
        Err(CaptureError::Backend {
            message: format!("dshow source reader not wired for {device_id}"),
        })
    }
}

/// Live COM walk over the system device enumerator.
#[cfg(target_os = "windows")]
mod com {
    use super::{DeviceProperties, PinCategory, PinDirection, PinProbe, RawDeviceProps, StreamCaps};
    use crate::error::{CaptureError, CaptureResult};

    use windows::core::Interface;
    use windows::Win32::Media::DirectShow::{
        IAMStreamConfig, IBaseFilter, ICreateDevEnum, IKsPropertySet, IPin, AMPROPSETID_Pin,
        AM_MEDIA_TYPE, CLSID_SystemDeviceEnum, CLSID_VideoInputDeviceCategory, FORMAT_VideoInfo,
        FORMAT_VideoInfo2, PINDIR_OUTPUT, PIN_CATEGORY_CAPTURE, VIDEO_STREAM_CONFIG_CAPS,
    };
    use windows::Win32::System::Com::StructuredStorage::IPropertyBag;
    use windows::Win32::System::Com::{
        CoCreateInstance, CoInitializeEx, CoTaskMemFree, CreateBindCtx, IMoniker,
        CLSCTX_INPROC_SERVER, COINIT_MULTITHREADED,
    };
    use windows::Win32::System::Variant::VARIANT;

    fn com_error(context: &str, error: windows::core::Error) -> CaptureError {
        CaptureError::Backend {
            message: format!("{context}: {error}"),
        }
    }

    /// Enumerator over the video input device category.
    pub struct SystemDeviceEnumerator;

    impl SystemDeviceEnumerator {
        /// Probe for the device enumerator service; `None` when COM is not
        /// available in this process.
        pub fn new() -> Option<Self> {
            unsafe {
                // S_FALSE (already initialized) is fine.
                let _ = CoInitializeEx(None, COINIT_MULTITHREADED);
                CoCreateInstance::<_, ICreateDevEnum>(
                    &CLSID_SystemDeviceEnum,
                    None,
                    CLSCTX_INPROC_SERVER,
                )
                .ok()
                .map(|_| Self)
            }
        }

        fn for_each_moniker<T>(
            &self,
            mut visit: impl FnMut(&IMoniker, String) -> CaptureResult<Option<T>>,
        ) -> CaptureResult<Option<T>> {
            unsafe {
                let devenum: ICreateDevEnum = CoCreateInstance(
                    &CLSID_SystemDeviceEnum,
                    None,
                    CLSCTX_INPROC_SERVER,
                )
                .map_err(|e| com_error("create device enumerator", e))?;

                let mut classenum = None;
                devenum
                    .CreateClassEnumerator(&CLSID_VideoInputDeviceCategory, &mut classenum, 0)
                    .map_err(|e| com_error("enumerate video input category", e))?;
                let Some(classenum) = classenum else {
                    // Empty category
                    return Ok(None);
                };

                loop {
                    let mut monikers = [None];
                    if classenum.Next(&mut monikers, None).is_err() {
                        return Ok(None);
                    }
                    let Some(moniker) = monikers[0].take() else {
                        return Ok(None);
                    };

                    let bind_ctx =
                        CreateBindCtx(0).map_err(|e| com_error("create bind context", e))?;
                    let olestr = match moniker.GetDisplayName(&bind_ctx, None) {
                        Ok(s) => s,
                        Err(_) => continue,
                    };
                    let display_name = olestr.to_string().unwrap_or_default();
                    CoTaskMemFree(Some(olestr.0 as _));

                    if let Some(result) = visit(&moniker, display_name)? {
                        return Ok(Some(result));
                    }
                }
            }
        }
    }

    impl DeviceProperties for SystemDeviceEnumerator {
        fn devices(&self) -> CaptureResult<Vec<RawDeviceProps>> {
            let mut devices = Vec::new();
            self.for_each_moniker(|moniker, display_name| {
                unsafe {
                    let bag: IPropertyBag = match moniker.BindToStorage(None, None) {
                        Ok(bag) => bag,
                        Err(_) => return Ok(None::<()>),
                    };
                    let mut value = VARIANT::default();
                    if bag
                        .Read(windows::core::w!("FriendlyName"), &mut value, None)
                        .is_err()
                    {
                        return Ok(None);
                    }
                    let friendly_name = value.to_string();
                    devices.push(RawDeviceProps {
                        display_name,
                        friendly_name,
                    });
                }
                Ok(None)
            })?;
            Ok(devices)
        }

        fn pins(&self, wanted: &str) -> CaptureResult<Vec<PinProbe>> {
            let wanted = wanted.to_string();
            let filter = self.for_each_moniker(|moniker, display_name| {
                if display_name != wanted {
                    return Ok(None);
                }
                unsafe {
                    let bound: windows::core::Result<IBaseFilter> =
                        moniker.BindToObject(None, None);
                    Ok(bound.ok())
                }
            })?;
            let Some(filter) = filter else {
                tracing::warn!(device = %wanted, "could not find the device");
                return Ok(Vec::new());
            };

            let mut probes = Vec::new();
            unsafe {
                let pins = filter
                    .EnumPins()
                    .map_err(|e| com_error("enumerate pins", e))?;
                loop {
                    let mut slot = [None];
                    if pins.Next(&mut slot, None).is_err() {
                        break;
                    }
                    let Some(pin) = slot[0].take() else {
                        break;
                    };
                    probes.push(probe_pin(&pin));
                }
            }
            Ok(probes)
        }
    }

    unsafe fn probe_pin(pin: &IPin) -> PinProbe {
        let mut probe = PinProbe {
            direction: PinDirection::Input,
            category: PinCategory::Other,
            caps: Vec::new(),
        };

        if let Ok(info) = pin.QueryPinInfo() {
            if info.dir == PINDIR_OUTPUT {
                probe.direction = PinDirection::Output;
            }
            drop(std::mem::ManuallyDrop::into_inner(info.pFilter));
        }
        if probe.direction != PinDirection::Output {
            return probe;
        }

        let Ok(property_set) = pin.cast::<IKsPropertySet>() else {
            return probe;
        };
        let mut category = windows::core::GUID::zeroed();
        let mut returned = 0u32;
        if property_set
            .Get(
                &AMPROPSETID_Pin,
                0, // AMPROPERTY_PIN_CATEGORY
                std::ptr::null(),
                0,
                &mut category as *mut _ as *mut std::ffi::c_void,
                std::mem::size_of::<windows::core::GUID>() as u32,
                &mut returned,
            )
            .is_err()
        {
            return probe;
        }
        if category == PIN_CATEGORY_CAPTURE {
            probe.category = PinCategory::Capture;
        } else {
            return probe;
        }

        let Ok(config) = pin.cast::<IAMStreamConfig>() else {
            return probe;
        };
        let mut count = 0i32;
        let mut size = 0i32;
        if config.GetNumberOfCapabilities(&mut count, &mut size).is_err()
            || size as usize != std::mem::size_of::<VIDEO_STREAM_CONFIG_CAPS>()
        {
            return probe;
        }

        for index in 0..count {
            let mut media_type: *mut AM_MEDIA_TYPE = std::ptr::null_mut();
            let mut caps = VIDEO_STREAM_CONFIG_CAPS::default();
            if config
                .GetStreamCaps(index, &mut media_type, &mut caps as *mut _ as *mut u8)
                .is_err()
            {
                continue;
            }
            let is_video_info = !media_type.is_null()
                && ((*media_type).formattype == FORMAT_VideoInfo
                    || (*media_type).formattype == FORMAT_VideoInfo2);
            probe.caps.push(StreamCaps {
                max_output_width: caps.MaxOutputSize.cx,
                max_output_height: caps.MaxOutputSize.cy,
                min_frame_interval: caps.MinFrameInterval,
                is_video_info,
            });
            if !media_type.is_null() {
                if !(*media_type).pbFormat.is_null() {
                    CoTaskMemFree(Some((*media_type).pbFormat as _));
                }
                CoTaskMemFree(Some(media_type as _));
            }
        }
        probe
    }
}
