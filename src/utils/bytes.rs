//! Little-endian field readers over page buffers. All of them return `None`
//! instead of panicking when the field would run past the buffer.

pub fn u8_at(buf: &[u8], offset: usize) -> Option<u8> {
    buf.get(offset).copied()
}

pub fn u16_le(buf: &[u8], offset: usize) -> Option<u16> {
    let bytes = buf.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

pub fn i16_le(buf: &[u8], offset: usize) -> Option<i16> {
    u16_le(buf, offset).map(|v| v as i16)
}

/// Three-byte page numbers used by long-value row pointers.
pub fn u24_le(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset.checked_add(3)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]))
}

pub fn u32_le(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub fn i32_le(buf: &[u8], offset: usize) -> Option<i32> {
    u32_le(buf, offset).map(|v| v as i32)
}

pub fn i64_le(buf: &[u8], offset: usize) -> Option<i64> {
    let bytes = buf.get(offset..offset.checked_add(8)?)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Some(i64::from_le_bytes(raw))
}

pub fn f32_le(buf: &[u8], offset: usize) -> Option<f32> {
    u32_le(buf, offset).map(f32::from_bits)
}

pub fn f64_le(buf: &[u8], offset: usize) -> Option<f64> {
    i64_le(buf, offset).map(|v| f64::from_bits(v as u64))
}

pub fn slice(buf: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    buf.get(offset..offset.checked_add(len)?)
}
