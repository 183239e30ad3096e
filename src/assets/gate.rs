//! Structural admission check for slideshow images.
//!
//! Panels can only display baseline JPEGs at their native 720x720 resolution.
//! The gate walks the marker structure to find the frame header and never
//! decodes pixel data, so it is cheap enough to run on every upload.

use serde::Serialize;
use thiserror::Error;

use super::cursor::MarkerCursor;
use crate::error::ErrorKind;

pub const REQUIRED_WIDTH: u16 = 720;
pub const REQUIRED_HEIGHT: u16 = 720;

const START_OF_IMAGE: [u8; 2] = [0xFF, 0xD8];

// Marker codes (second byte after 0xFF)
const SOF0: u8 = 0xC0;
const SOF2: u8 = 0xC2;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const TEM: u8 = 0x01;

// Frame header layout relative to the marker: FF Cn | length(2) | precision(1) | height(2) | width(2)
const FRAME_HEIGHT_OFFSET: usize = 5;
const FRAME_WIDTH_OFFSET: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Baseline,
    Progressive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameInfo {
    pub width: u16,
    pub height: u16,
    pub encoding: Encoding,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Not a JPEG image: missing start-of-image signature")]
    NotJpeg,
    #[error("Invalid JPEG: no frame header found")]
    NoFrame,
    #[error("Progressive JPEGs are not supported by the panels; re-save the image as baseline")]
    Progressive,
    #[error(
        "Image must be {}x{} pixels, got {width}x{height}",
        REQUIRED_WIDTH,
        REQUIRED_HEIGHT
    )]
    Dimensions { width: u16, height: u16 },
}

impl Rejection {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Rejection::NotJpeg | Rejection::NoFrame => ErrorKind::InvalidFormat,
            Rejection::Progressive | Rejection::Dimensions { .. } => ErrorKind::ValidationFailed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted(FrameInfo),
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }

    /// Human-readable reason for a rejection, `None` when accepted.
    pub fn reason(&self) -> Option<String> {
        match self {
            Verdict::Accepted(_) => None,
            Verdict::Rejected(rejection) => Some(rejection.to_string()),
        }
    }
}

/// Inspect a candidate image and decide whether it may be admitted.
///
/// Pure over `bytes` and total: malformed input always yields a rejection.
pub fn inspect(bytes: &[u8]) -> Verdict {
    if !bytes.starts_with(&START_OF_IMAGE) {
        return Verdict::Rejected(Rejection::NotJpeg);
    }

    match scan_frame(bytes) {
        Some(frame) => evaluate(frame),
        None => Verdict::Rejected(Rejection::NoFrame),
    }
}

fn evaluate(frame: FrameInfo) -> Verdict {
    if frame.encoding == Encoding::Progressive {
        return Verdict::Rejected(Rejection::Progressive);
    }
    if frame.width != REQUIRED_WIDTH || frame.height != REQUIRED_HEIGHT {
        return Verdict::Rejected(Rejection::Dimensions {
            width: frame.width,
            height: frame.height,
        });
    }
    Verdict::Accepted(frame)
}

/// Walk markers until EOI or the end of the buffer, keeping the last frame
/// header seen. A segment whose length runs past the end stops the walk.
fn scan_frame(bytes: &[u8]) -> Option<FrameInfo> {
    let mut cursor = MarkerCursor::new(bytes);
    cursor.skip(START_OF_IMAGE.len());

    let mut frame = None;
    while let Some(marker) = cursor.next_marker() {
        let advanced = match marker.code {
            SOF0 | SOF2 => {
                let encoding = if marker.code == SOF0 {
                    Encoding::Baseline
                } else {
                    Encoding::Progressive
                };
                if let Some(info) = read_frame(&cursor, encoding) {
                    frame = Some(info);
                }
                cursor.skip_segment()
            }
            EOI => break,
            0xD0..=0xD7 | SOI | TEM => cursor.skip(2),
            _ => cursor.skip_segment(),
        };

        if !advanced {
            tracing::trace!(offset = marker.offset, "Segment runs past end of buffer");
            break;
        }
    }

    frame
}

fn read_frame(cursor: &MarkerCursor<'_>, encoding: Encoding) -> Option<FrameInfo> {
    let height = cursor.read_u16(FRAME_HEIGHT_OFFSET)?;
    let width = cursor.read_u16(FRAME_WIDTH_OFFSET)?;
    Some(FrameInfo {
        width,
        height,
        encoding,
    })
}
