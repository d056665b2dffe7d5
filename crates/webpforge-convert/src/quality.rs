//! Resolution of `quality = "auto"` into a concrete value.
//!
//! For JPEG sources the original encoder quality is estimated from the
//! luminance quantization table, so a low-quality JPEG is not re-encoded at a
//! needlessly high quality.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use image::ImageFormat;
use webpforge_common::{ConversionOptions, Quality};

use crate::source::SourceDescriptor;

/// IJG standard luminance quantization table (natural order; only the sum
/// matters here so the zigzag order of the file does not).
const STD_LUMINANCE: [u16; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61, //
    12, 12, 14, 19, 26, 58, 60, 55, //
    14, 13, 16, 24, 40, 57, 69, 56, //
    14, 17, 22, 29, 51, 87, 80, 62, //
    18, 22, 37, 56, 68, 109, 103, 77, //
    24, 35, 55, 64, 81, 104, 113, 92, //
    49, 64, 78, 87, 103, 121, 120, 101, //
    72, 92, 95, 98, 112, 100, 103, 99,
];

/// Quantization tables live in the header; no need to read the scan data.
const HEADER_READ_LIMIT: u64 = 256 * 1024;

/// Concrete quality for `source` under `options`.
pub fn resolve_quality(options: &ConversionOptions, source: &SourceDescriptor) -> u8 {
    match options.quality {
        Quality::Fixed(q) => q.min(100),
        Quality::Auto => {
            let format = source.format();
            let estimate = if format == Some(ImageFormat::Jpeg) {
                estimate_jpeg_quality(source.path())
            } else {
                None
            };
            let resolved = auto_quality(options, format, estimate);
            tracing::debug!(
                source = %source.path().display(),
                estimate = ?estimate,
                resolved,
                "resolved auto quality"
            );
            resolved
        }
    }
}

/// The auto-quality rule, given the detected format and JPEG estimate.
pub fn auto_quality(
    options: &ConversionOptions,
    format: Option<ImageFormat>,
    jpeg_estimate: Option<u8>,
) -> u8 {
    match (format, jpeg_estimate) {
        (Some(ImageFormat::Jpeg), Some(estimate)) => estimate.min(options.max_quality),
        (Some(ImageFormat::Jpeg), None) => options.default_quality,
        _ => options.max_quality,
    }
}

/// Estimate the quality a JPEG file was saved with.
pub fn estimate_jpeg_quality(path: &Path) -> Option<u8> {
    let mut header = Vec::new();
    File::open(path)
        .ok()?
        .take(HEADER_READ_LIMIT)
        .read_to_end(&mut header)
        .ok()?;
    estimate_jpeg_quality_from_bytes(&header)
}

/// Estimate JPEG quality from the file's leading bytes.
///
/// Inverts the IJG scaling: the luminance table is `std * scale / 100` where
/// `scale` is `5000 / q` below quality 50 and `200 - 2q` from 50 up.
pub fn estimate_jpeg_quality_from_bytes(data: &[u8]) -> Option<u8> {
    let table = find_luminance_table(data)?;
    let sum: u32 = table.iter().map(|&v| u32::from(v)).sum();
    let std_sum: u32 = STD_LUMINANCE.iter().map(|&v| u32::from(v)).sum();

    let scale = f64::from(sum) * 100.0 / f64::from(std_sum);
    if scale <= 0.0 {
        return None;
    }
    let quality = if scale <= 100.0 {
        (200.0 - scale) / 2.0
    } else {
        5000.0 / scale
    };
    Some(quality.round().clamp(1.0, 100.0) as u8)
}

/// Walk the marker segments up to the first scan and return table 0.
fn find_luminance_table(data: &[u8]) -> Option<Vec<u16>> {
    if data.get(..2)? != [0xFF, 0xD8] {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        // Fill bytes and standalone markers carry no length.
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }
        // Start of scan or end of image: no tables past this point.
        if marker == 0xDA || marker == 0xD9 {
            return None;
        }

        let len = usize::from(u16::from_be_bytes([data[pos + 2], data[pos + 3]]));
        if len < 2 {
            return None;
        }
        let body = data.get(pos + 4..pos + 2 + len)?;

        if marker == 0xDB {
            if let Some(table) = luminance_from_dqt(body) {
                return Some(table);
            }
        }
        pos += 2 + len;
    }
    None
}

/// A DQT segment may hold several tables; each starts with a Pq/Tq byte.
fn luminance_from_dqt(mut body: &[u8]) -> Option<Vec<u16>> {
    while let Some((&pq_tq, rest)) = body.split_first() {
        let precision16 = pq_tq >> 4 != 0;
        let id = pq_tq & 0x0F;
        let size = if precision16 { 128 } else { 64 };
        let raw = rest.get(..size)?;

        if id == 0 {
            let table = if precision16 {
                raw.chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect()
            } else {
                raw.iter().map(|&v| u16::from(v)).collect()
            };
            return Some(table);
        }
        body = &rest[size..];
    }
    None
}
