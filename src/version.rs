use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Dotted version, `major.minor[.build[.revision]]`.
///
/// Components that weren't given compare as 0, so `1.5` and `1.5.0` are equal.
#[derive(Debug, Clone, Copy)]
pub struct Version {
    parts: [u32; 4],
    len: usize,
}

impl Version {
    #[cfg(test)]
    pub fn new(major: u32, minor: u32) -> Self {
        Self {
            parts: [major, minor, 0, 0],
            len: 2,
        }
    }

    pub fn parts(&self) -> &[u32] {
        &self.parts[..self.len]
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::data_format("version", s);
        let s = s.trim();
        let mut parts = [0u32; 4];
        let mut len = 0;
        for piece in s.split('.') {
            if len == parts.len() {
                return Err(invalid());
            }
            // u32::from_str takes a leading '+', we don't
            if piece.is_empty() || !piece.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let value: u32 = piece.parse().map_err(|_| invalid())?;
            if value > i32::MAX as u32 {
                return Err(invalid());
            }
            parts[len] = value;
            len += 1;
        }
        if len < 2 {
            return Err(invalid());
        }
        Ok(Self { parts, len })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for part in self.parts() {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{part}")?;
            first = false;
        }
        Ok(())
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // unset parts are already zero, so 1.5 == 1.5.0 and --maxversion 1.5 keeps
        // a 1.5.0 product. Ranking a missing part below 0 would skip it instead.
        self.parts.cmp(&other.parts)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}
