//! Geometry primitives: ad-slot dimensions and page regions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An exact pixel dimension of an advertisement slot.
///
/// Matching against page elements is zero-tolerance: a surface qualifies
/// only when its rounded bounding box equals these values exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dimension {
    pub width: u32,
    pub height: u32,
}

impl Dimension {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Dimension {
    type Err = String;

    /// Parse a `"300x250"`-style key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WxH, got `{s}`"))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("bad width in `{s}`: {e}"))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("bad height in `{s}`: {e}"))?;
        Ok(Self { width, height })
    }
}

/// A rectangle in CSS pixels, viewport-relative unless stated otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_display_roundtrip() {
        let d = Dimension::new(300, 250);
        assert_eq!(d.to_string(), "300x250");
        assert_eq!("300x250".parse::<Dimension>().unwrap(), d);
        assert_eq!("728X90".parse::<Dimension>().unwrap(), Dimension::new(728, 90));
    }

    #[test]
    fn dimension_parse_rejects_garbage() {
        assert!("300".parse::<Dimension>().is_err());
        assert!("x250".parse::<Dimension>().is_err());
        assert!("300x".parse::<Dimension>().is_err());
        assert!("wide x tall".parse::<Dimension>().is_err());
        assert!("".parse::<Dimension>().is_err());
    }

    #[test]
    fn dimension_parse_tolerates_spaces() {
        assert_eq!(
            "320 x 50".parse::<Dimension>().unwrap(),
            Dimension::new(320, 50)
        );
    }
}
