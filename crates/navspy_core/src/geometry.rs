//! Viewport geometry
//!
//! All rectangles handed to the tracker are viewport relative: `y == 0` is the
//! top edge of the visible area, and scrolling down moves content to negative
//! `y` values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Size of the visible area in pixels
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// The viewport as a rectangle at the origin
    pub fn bounds(&self) -> Bounds {
        Bounds::new(0.0, 0.0, self.width, self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

/// Axis-aligned bounding box of a rendered region
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    /// X position (viewport relative)
    pub x: f32,
    /// Y position (viewport relative)
    pub y: f32,
    /// Computed width
    pub width: f32,
    /// Computed height
    pub height: f32,
}

impl Bounds {
    /// Create new bounds
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Overlap with another rectangle
    ///
    /// Edge-adjacent rectangles produce a zero-area intersection rather than
    /// `None`, matching how viewport observers treat touching edges.
    pub fn intersection(&self, other: &Bounds) -> Option<Bounds> {
        let left = self.left().max(other.left());
        let right = self.right().min(other.right());
        let top = self.top().max(other.top());
        let bottom = self.bottom().min(other.bottom());

        if left > right || top > bottom {
            return None;
        }
        Some(Bounds::new(left, top, right - left, bottom - top))
    }

    /// Grow (positive) or shrink (negative) each edge by the resolved margin
    pub fn expand(&self, margin: &RootMargin) -> Bounds {
        let top = margin.top.resolve(self.height);
        let right = margin.right.resolve(self.width);
        let bottom = margin.bottom.resolve(self.height);
        let left = margin.left.resolve(self.width);

        Bounds::new(
            self.x - left,
            self.y - top,
            (self.width + left + right).max(0.0),
            (self.height + top + bottom).max(0.0),
        )
    }
}

/// A CSS-style length used in root margins
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Length {
    /// Absolute pixels
    Px(f32),
    /// Percentage of the reference dimension
    Percent(f32),
}

impl Length {
    pub const ZERO: Length = Length::Px(0.0);

    /// Resolve to pixels against the reference dimension
    pub fn resolve(&self, reference: f32) -> f32 {
        match *self {
            Length::Px(px) => px,
            Length::Percent(pct) => reference * pct / 100.0,
        }
    }
}

impl Default for Length {
    fn default() -> Self {
        Length::ZERO
    }
}

impl FromStr for Length {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || CoreError::InvalidLength(s.to_string());

        let parse = |n: &str| -> Result<f32> {
            let value: f32 = n.trim().parse().map_err(|_| invalid())?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(invalid())
            }
        };

        if let Some(n) = trimmed.strip_suffix("px") {
            return Ok(Length::Px(parse(n)?));
        }
        if let Some(n) = trimmed.strip_suffix('%') {
            return Ok(Length::Percent(parse(n)?));
        }

        // Unitless lengths are only allowed for zero
        match parse(trimmed)? {
            v if v == 0.0 => Ok(Length::ZERO),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Length {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Length> for String {
    fn from(value: Length) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Length::Px(px) => write!(f, "{px}px"),
            Length::Percent(pct) => write!(f, "{pct}%"),
        }
    }
}

/// Margins applied to the viewport before intersecting, in CSS order
///
/// Negative values shrink the observed area. Percentages resolve against the
/// viewport height for the vertical edges and the width for the horizontal
/// ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RootMargin {
    pub top: Length,
    pub right: Length,
    pub bottom: Length,
    pub left: Length,
}

impl RootMargin {
    pub fn new(top: Length, right: Length, bottom: Length, left: Length) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Margin that only trims the top and bottom edges
    pub fn vertical(top: Length, bottom: Length) -> Self {
        Self::new(top, Length::ZERO, bottom, Length::ZERO)
    }
}

impl FromStr for RootMargin {
    type Err = CoreError;

    /// Parse the CSS margin shorthand (`"-64px 0px -55% 0px"`)
    fn from_str(s: &str) -> Result<Self> {
        let parts = s
            .split_whitespace()
            .map(str::parse::<Length>)
            .collect::<Result<Vec<_>>>()?;

        match parts.as_slice() {
            [all] => Ok(Self::new(*all, *all, *all, *all)),
            [v, h] => Ok(Self::new(*v, *h, *v, *h)),
            [t, h, b] => Ok(Self::new(*t, *h, *b, *h)),
            [t, r, b, l] => Ok(Self::new(*t, *r, *b, *l)),
            _ => Err(CoreError::InvalidMargin(s.to_string())),
        }
    }
}

impl TryFrom<String> for RootMargin {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RootMargin> for String {
    fn from(value: RootMargin) -> Self {
        value.to_string()
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_parse() {
        assert_eq!("-64px".parse::<Length>(), Ok(Length::Px(-64.0)));
        assert_eq!("-55%".parse::<Length>(), Ok(Length::Percent(-55.0)));
        assert_eq!("0".parse::<Length>(), Ok(Length::ZERO));
        assert!("12".parse::<Length>().is_err());
        assert!("abc".parse::<Length>().is_err());
    }

    #[test]
    fn test_root_margin_shorthand() {
        let margin: RootMargin = "-64px 0px -55% 0px".parse().unwrap();
        assert_eq!(margin.top, Length::Px(-64.0));
        assert_eq!(margin.bottom, Length::Percent(-55.0));

        let two: RootMargin = "10px 5%".parse().unwrap();
        assert_eq!(two.left, Length::Percent(5.0));
        assert_eq!(two.bottom, Length::Px(10.0));

        assert!("1px 2px 3px 4px 5px".parse::<RootMargin>().is_err());
        assert!("".parse::<RootMargin>().is_err());
    }

    #[test]
    fn test_expand_viewport_with_nav_margin() {
        let root = Viewport::new(1000.0, 800.0)
            .bounds()
            .expand(&"-64px 0px -55% 0px".parse().unwrap());

        assert_eq!(root.top(), 64.0);
        assert_eq!(root.bottom(), 360.0);
        assert_eq!(root.width, 1000.0);
    }

    #[test]
    fn test_intersection() {
        let a = Bounds::new(0.0, 0.0, 100.0, 100.0);
        let b = Bounds::new(50.0, 50.0, 100.0, 100.0);
        assert_eq!(a.intersection(&b), Some(Bounds::new(50.0, 50.0, 50.0, 50.0)));

        let touching = Bounds::new(0.0, 100.0, 100.0, 10.0);
        assert_eq!(a.intersection(&touching).map(|r| r.area()), Some(0.0));

        let apart = Bounds::new(0.0, 200.0, 10.0, 10.0);
        assert_eq!(a.intersection(&apart), None);
    }

    #[test]
    fn test_margin_serde_roundtrip_in_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            margin: RootMargin,
        }

        let parsed: Wrapper = toml::from_str(r#"margin = "-64px 0px -55% 0px""#).unwrap();
        assert_eq!(parsed.margin.bottom, Length::Percent(-55.0));
    }
}
