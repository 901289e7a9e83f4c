//! RGBA colour values used in style properties and marker paint.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MarkerError, MarkerResult};

/// Straight (non-premultiplied) 8-bit RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn transparent() -> Self {
        Self::rgba(0, 0, 0, 0)
    }

    /// Parse `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r,g,b)`, `rgba(r,g,b,a)`
    /// or a colour name.
    pub fn parse(s: &str) -> MarkerResult<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex_color(hex).ok_or_else(|| MarkerError::InvalidColor(s.to_string()));
        }
        if let Some(args) = s
            .strip_prefix("rgba(")
            .or_else(|| s.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_rgb_function(args).ok_or_else(|| MarkerError::InvalidColor(s.to_string()));
        }
        named_color(s).ok_or_else(|| MarkerError::InvalidColor(s.to_string()))
    }

    /// Alpha as a 0..1 fraction.
    pub fn alpha_f32(&self) -> f32 {
        self.a as f32 / 255.0
    }

    /// Convert into the raster backend's colour, folding in `opacity`.
    pub fn to_skia(&self, opacity: f32) -> tiny_skia::Color {
        let alpha = (self.alpha_f32() * opacity.clamp(0.0, 1.0)).clamp(0.0, 1.0);
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, (alpha * 255.0).round() as u8)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for Color {
    type Error = MarkerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

fn parse_hex_color(s: &str) -> Option<Color> {
    let nibble = |i: usize| u8::from_str_radix(&s[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).ok();

    if !s.is_ascii() {
        return None;
    }
    match s.len() {
        3 => Some(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

fn parse_rgb_function(args: &str) -> Option<Color> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let channel = |p: &str| p.parse::<u8>().ok();
    match parts.as_slice() {
        [r, g, b] => Some(Color::rgb(channel(r)?, channel(g)?, channel(b)?)),
        [r, g, b, a] => {
            let alpha: f32 = a.parse().ok()?;
            let alpha = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
            Some(Color::rgba(channel(r)?, channel(g)?, channel(b)?, alpha))
        }
        _ => None,
    }
}

fn named_color(name: &str) -> Option<Color> {
    let color = match name.to_lowercase().as_str() {
        "transparent" => Color::transparent(),
        "black" => Color::rgb(0, 0, 0),
        "white" => Color::rgb(255, 255, 255),
        "red" => Color::rgb(255, 0, 0),
        "green" => Color::rgb(0, 128, 0),
        "lime" => Color::rgb(0, 255, 0),
        "blue" => Color::rgb(0, 0, 255),
        "yellow" => Color::rgb(255, 255, 0),
        "cyan" => Color::rgb(0, 255, 255),
        "magenta" => Color::rgb(255, 0, 255),
        "orange" => Color::rgb(255, 165, 0),
        "purple" => Color::rgb(128, 0, 128),
        "gray" | "grey" => Color::rgb(128, 128, 128),
        "steelblue" => Color::rgb(70, 130, 180),
        _ => return None,
    };
    Some(color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parsing() {
        assert_eq!(Color::parse("#FF5500").unwrap(), Color::rgb(255, 85, 0));
        assert_eq!(Color::parse("#f50").unwrap(), Color::rgb(255, 85, 0));
        assert_eq!(
            Color::parse("#ff000080").unwrap(),
            Color::rgba(255, 0, 0, 128)
        );
        assert_eq!(Color::parse("rgb(1, 2, 3)").unwrap(), Color::rgb(1, 2, 3));
        assert_eq!(
            Color::parse("rgba(1,2,3,0.5)").unwrap(),
            Color::rgba(1, 2, 3, 128)
        );
        assert_eq!(Color::parse("Red").unwrap(), Color::rgb(255, 0, 0));
        assert!(Color::parse("#GGGGGG").is_err());
        assert!(Color::parse("not-a-colour").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let c = Color::rgba(10, 20, 30, 40);
        assert_eq!(Color::parse(&c.to_string()).unwrap(), c);
        assert_eq!(Color::BLUE.to_string(), "#0000ff");
    }
}
