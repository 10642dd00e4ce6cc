//! Fixed width integer conversions and logical path handling.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{InvalidPathError, Result};
use crate::types::MAX_NAME_LENGTH;

pub fn u16_to_bytes(value: u16) -> [u8; 2] {
    let mut bytes = [0u8; 2];
    LittleEndian::write_u16(&mut bytes, value);
    bytes
}

pub fn bytes_to_u16(bytes: [u8; 2]) -> u16 {
    LittleEndian::read_u16(&bytes)
}

pub fn u64_to_bytes(value: u64) -> [u8; 8] {
    let mut bytes = [0u8; 8];
    LittleEndian::write_u64(&mut bytes, value);
    bytes
}

pub fn bytes_to_u64(bytes: [u8; 8]) -> u64 {
    LittleEndian::read_u64(&bytes)
}

/// Split a logical archive path into its segments.
///
/// Backslashes are treated as separators and empty segments are dropped, so `a//b`, `/a/b/`
/// and `a\b` all name the same entry. An empty result denotes the archive root.
pub fn normalize_path(path: &str) -> Result<Vec<String>> {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| -> Result<String> {
            validate_segment(segment)?;
            Ok(segment.to_owned())
        })
        .collect()
}

fn validate_segment(segment: &str) -> core::result::Result<(), InvalidPathError> {
    if segment == "." || segment == ".." {
        return Err(InvalidPathError::Reserved(segment.to_owned()));
    }
    if segment.contains('\0') {
        return Err(InvalidPathError::Nul(segment.to_owned()));
    }
    if segment.len() > MAX_NAME_LENGTH {
        return Err(InvalidPathError::SegmentTooLong(segment.to_owned()));
    }
    Ok(())
}

/// Render a byte count with a binary unit, e.g. `1.5 KB`
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if size.fract() == 0.0 {
        format!("{:.0} {}", size, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
