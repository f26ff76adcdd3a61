//! Demux/decode abstractions and the decoder registry
//!
//! A [`DecodeContext`] represents one open media source: it reports stream
//! metadata and hands out coded packets on demand. A [`FrameDecoder`] turns
//! packets of one codec into raw frames. Both are trait seams so platform
//! input layers and synthetic test sources plug in the same way.

use bytes::Bytes;

use crate::convert::{frame_byte_size, PixelFormat, RawFrame};
use crate::error::{CaptureError, CaptureResult};
use crate::mode::VideoMode;

/// Media type of a stream inside an open source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Video stream
    Video,
    /// Audio stream (never decoded here; packets are discarded)
    Audio,
}

/// Codec carried by a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecId {
    /// Uncompressed frames in the given layout
    Raw(PixelFormat),
    /// Motion JPEG (one JPEG image per packet)
    Mjpeg,
    /// H.264 / AVC
    H264,
}

impl CodecId {
    /// Codec name for error messages and log lines.
    pub fn name(&self) -> &'static str {
        match self {
            CodecId::Raw(format) => format.name(),
            CodecId::Mjpeg => "mjpeg",
            CodecId::H264 => "h264",
        }
    }
}

/// Metadata for one stream of an open source.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    /// Stream index, as tagged on packets
    pub index: usize,
    /// Media type
    pub kind: StreamKind,
    /// Codec of the stream's packets
    pub codec: CodecId,
    /// Negotiated geometry and rate
    pub mode: VideoMode,
}

/// One unit of coded data read from a source, tagged with its stream.
///
/// Packets are transient: they are dropped after every decode attempt,
/// whether or not the attempt produced a frame.
#[derive(Debug, Clone)]
pub struct CodedPacket {
    /// Index of the stream this packet belongs to
    pub stream_index: usize,
    /// Coded payload
    pub data: Bytes,
}

/// One open media source bound to exactly one device.
pub trait DecodeContext: Send {
    /// Stream metadata, fixed for the lifetime of the context.
    fn streams(&self) -> &[StreamInfo];

    /// Pull the next coded packet.
    ///
    /// `Ok(None)` means nothing is available this tick (end of stream or
    /// transient unavailability) and is not an error.
    fn read_packet(&mut self) -> CaptureResult<Option<CodedPacket>>;
}

/// Decodes coded packets of one codec into raw frames.
pub trait FrameDecoder: Send {
    /// Decode one packet.
    ///
    /// `Ok(None)` means the packet was consumed without completing a frame
    /// (parameter sets, slices of a multi-packet frame).
    fn decode(&mut self, packet: &CodedPacket) -> CaptureResult<Option<RawFrame>>;
}

/// Resolve a decoder for a stream's codec.
///
/// Fails with [`CaptureError::DecoderUnavailable`] when no decoder backend
/// for the codec is compiled in.
pub fn new_decoder(stream: &StreamInfo) -> CaptureResult<Box<dyn FrameDecoder>> {
    match stream.codec {
        CodecId::Raw(format) => Ok(Box::new(RawFrameDecoder {
            format,
            width: stream.mode.width.max(0) as u32,
            height: stream.mode.height.max(0) as u32,
        })),
        #[cfg(feature = "mjpeg")]
        CodecId::Mjpeg => Ok(Box::new(MjpegDecoder)),
        #[cfg(feature = "h264")]
        CodecId::H264 => Ok(Box::new(H264FrameDecoder::new()?)),
        #[allow(unreachable_patterns)]
        other => Err(CaptureError::DecoderUnavailable {
            codec: other.name().to_string(),
        }),
    }
}

/// Passthrough "decoder" for uncompressed streams.
///
/// Validates that each packet carries exactly one frame at the negotiated
/// geometry; short packets are dropped as incomplete.
struct RawFrameDecoder {
    format: PixelFormat,
    width: u32,
    height: u32,
}

impl FrameDecoder for RawFrameDecoder {
    fn decode(&mut self, packet: &CodedPacket) -> CaptureResult<Option<RawFrame>> {
        let expected = frame_byte_size(self.format, self.width, self.height);
        if packet.data.len() < expected {
            tracing::debug!(
                got = packet.data.len(),
                expected,
                "short raw frame packet, skipping"
            );
            return Ok(None);
        }
        Ok(Some(RawFrame {
            data: packet.data[..expected].to_vec(),
            width: self.width,
            height: self.height,
            format: self.format,
        }))
    }
}

/// Motion JPEG decoder: each packet is a standalone JPEG image.
#[cfg(feature = "mjpeg")]
struct MjpegDecoder;

#[cfg(feature = "mjpeg")]
impl FrameDecoder for MjpegDecoder {
    fn decode(&mut self, packet: &CodedPacket) -> CaptureResult<Option<RawFrame>> {
        let image = image::load_from_memory_with_format(&packet.data, image::ImageFormat::Jpeg)
            .map_err(|e| CaptureError::Backend {
                message: format!("jpeg decode failed: {e}"),
            })?;
        let rgb = image.to_rgb8();
        let (width, height) = (rgb.width(), rgb.height());
        Ok(Some(RawFrame {
            data: rgb.into_raw(),
            width,
            height,
            format: PixelFormat::Rgb24,
        }))
    }
}

/// H.264 decoder wrapping OpenH264.
#[cfg(feature = "h264")]
use openh264::formats::YUVSource;

/// H.264 decoder wrapping OpenH264.
#[cfg(feature = "h264")]
struct H264FrameDecoder {
    decoder: openh264::decoder::Decoder,
}

#[cfg(feature = "h264")]
impl H264FrameDecoder {
    fn new() -> CaptureResult<Self> {
        let api = openh264::OpenH264API::from_source();
        let decoder =
            openh264::decoder::Decoder::with_api_config(api, openh264::decoder::DecoderConfig::new())
                .map_err(|e| CaptureError::DecoderUnavailable {
                    codec: format!("h264 ({e})"),
                })?;
        Ok(Self { decoder })
    }
}

#[cfg(feature = "h264")]
impl FrameDecoder for H264FrameDecoder {
    fn decode(&mut self, packet: &CodedPacket) -> CaptureResult<Option<RawFrame>> {
        let decoded = self
            .decoder
            .decode(&packet.data)
            .map_err(|e| CaptureError::Backend {
                message: format!("h264 decode failed: {e}"),
            })?;

        match decoded {
            Some(yuv) => {
                let (width, height) = yuv.dimensions();
                let mut rgba = vec![0u8; width * height * 4];
                yuv.write_rgba8(&mut rgba);
                Ok(Some(RawFrame {
                    data: rgba,
                    width: width as u32,
                    height: height as u32,
                    format: PixelFormat::Rgba32,
                }))
            }
            // Parameter sets and partial access units complete later
            None => Ok(None),
        }
    }
}
