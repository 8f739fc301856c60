use crate::error::{Error, Result};

/// UTF-16 buffer filled in by a Win32 call, up to the first nul (or the whole
/// buffer if there isn't one).
pub fn string_from_wide(buf: &[u16]) -> Result<String> {
    let end = buf.iter().position(|c| *c == 0).unwrap_or(buf.len());
    String::from_utf16(&buf[..end]).map_err(|_| {
        Error::data_format("UTF-16 string", String::from_utf16_lossy(&buf[..end]))
    })
}

/// Null terminated UTF-16, what the raw buffers expect.
#[cfg(test)]
pub fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}
