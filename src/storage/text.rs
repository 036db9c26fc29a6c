//! Text encodings used by Jet files.
//!
//! Jet3 stores text as single-byte Latin-1. Jet4 stores UCS-2 (UTF-16LE).
//! Columns flagged for compressed unicode may instead start with an `FF FE`
//! marker that switches to one byte per character; each 0x00 byte then
//! toggles between one-byte and two-byte runs. Values of such columns
//! without the marker are plain UCS-2.

use crate::storage::format::FormatConstants;

const COMPRESSED_MARKER: [u8; 2] = [0xFF, 0xFE];

/// Decodes text whose compression is not known up front, such as object
/// names: the marker alone decides.
pub fn decode_text(bytes: &[u8], format: &FormatConstants) -> Result<String, String> {
    decode_column_text(bytes, format, true)
}

/// Decodes a column value. The marker is honored only when the column
/// carries the compressed-unicode flag.
pub fn decode_column_text(
    bytes: &[u8],
    format: &FormatConstants,
    compressed_unicode: bool,
) -> Result<String, String> {
    if !format.is_jet4() {
        return Ok(decode_latin1(bytes));
    }
    match bytes.strip_prefix(&COMPRESSED_MARKER) {
        Some(rest) if compressed_unicode => decode_compressed(rest),
        _ => decode_utf16le(bytes),
    }
}

pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

pub fn decode_utf16le(bytes: &[u8]) -> Result<String, String> {
    if bytes.len() % 2 != 0 {
        return Err(format!("odd UCS-2 byte length {}", bytes.len()));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| format!("invalid UCS-2 text: {}", e))
}

fn decode_compressed(bytes: &[u8]) -> Result<String, String> {
    let mut out = String::with_capacity(bytes.len());
    let mut compressed = true;
    let mut units = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == 0x00 {
            flush_units(&mut units, &mut out)?;
            compressed = !compressed;
            i += 1;
        } else if compressed {
            out.push(bytes[i] as char);
            i += 1;
        } else {
            let pair = bytes
                .get(i..i + 2)
                .ok_or_else(|| "truncated UCS-2 run in compressed text".to_string())?;
            units.push(u16::from_le_bytes([pair[0], pair[1]]));
            i += 2;
        }
    }
    flush_units(&mut units, &mut out)?;
    Ok(out)
}

fn flush_units(units: &mut Vec<u16>, out: &mut String) -> Result<(), String> {
    if !units.is_empty() {
        let run = String::from_utf16(units).map_err(|e| format!("invalid UCS-2 text: {}", e))?;
        out.push_str(&run);
        units.clear();
    }
    Ok(())
}

/// Inverse of `decode_text`. Jet4 text made only of non-NUL Latin-1
/// characters is written compressed when `compress` is set.
pub fn encode_text(text: &str, format: &FormatConstants, compress: bool) -> Vec<u8> {
    if !format.is_jet4() {
        return text.chars().map(|c| if (c as u32) < 256 { c as u8 } else { b'?' }).collect();
    }
    let compressible = text.chars().all(|c| (c as u32) > 0 && (c as u32) < 256);
    if compress && compressible {
        let mut out = COMPRESSED_MARKER.to_vec();
        out.extend(text.chars().map(|c| c as u8));
        return out;
    }
    text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}
