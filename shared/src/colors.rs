use std::str::FromStr;

use crate::error::ColorError;

/// Below this chroma a color has no meaningful hue.
const ACHROMATIC_CHROMA: f64 = 1e-4;

/// Chroma that `100%` maps to in `oklch()` notation.
const OKLCH_PERCENT_CHROMA: f64 = 0.4;

const NAMED_COLORS: &[(&str, (u8, u8, u8))] = &[
    ("aqua", (0, 255, 255)),
    ("black", (0, 0, 0)),
    ("blue", (0, 0, 255)),
    ("cyan", (0, 255, 255)),
    ("fuchsia", (255, 0, 255)),
    ("gold", (255, 215, 0)),
    ("gray", (128, 128, 128)),
    ("green", (0, 128, 0)),
    ("grey", (128, 128, 128)),
    ("lightgray", (211, 211, 211)),
    ("lightgrey", (211, 211, 211)),
    ("lime", (0, 255, 0)),
    ("magenta", (255, 0, 255)),
    ("maroon", (128, 0, 0)),
    ("navy", (0, 0, 128)),
    ("olive", (128, 128, 0)),
    ("orange", (255, 165, 0)),
    ("purple", (128, 0, 128)),
    ("red", (255, 0, 0)),
    ("silver", (192, 192, 192)),
    ("teal", (0, 128, 128)),
    ("white", (255, 255, 255)),
    ("yellow", (255, 255, 0)),
];

/// Gamma-encoded sRGB color. Channels may fall outside `0..=1` when the
/// source was specified in a wider space; they are clipped on output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// Cylindrical OKLab: lightness `0..=1`, chroma `>= 0`, hue in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Oklch {
    pub l: f64,
    pub c: f64,
    pub h: f64,
}

impl Color {
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        }
    }

    pub fn to_rgb8(self) -> (u8, u8, u8) {
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        (channel(self.r), channel(self.g), channel(self.b))
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(self) -> String {
        let (r, g, b) = self.to_rgb8();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// Parse a CSS color: `#rgb`, `#rrggbb`, `rgb()`, `hsl()`, `oklch()` or a
    /// common color keyword. Alpha components are accepted and ignored.
    pub fn parse(text: &str) -> Result<Self, ColorError> {
        let trimmed = text.trim();
        let lower = trimmed.to_ascii_lowercase();
        let invalid = || ColorError::Invalid(trimmed.to_owned());

        if let Some(hex) = lower.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(invalid);
        }
        if let Some((name, args)) = split_function(&lower) {
            let parsed = match name {
                "rgb" | "rgba" => parse_rgb_args(args),
                "hsl" | "hsla" => parse_hsl_args(args),
                "oklch" => parse_oklch_args(args).map(Self::from_oklch),
                _ => None,
            };
            return parsed.ok_or_else(invalid);
        }
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, (r, g, b))| Self::from_rgb8(*r, *g, *b))
            .ok_or_else(invalid)
    }

    pub fn to_oklch(self) -> Oklch {
        let (l, a, b) = linear_to_oklab(
            srgb_to_linear(self.r),
            srgb_to_linear(self.g),
            srgb_to_linear(self.b),
        );
        let c = (a * a + b * b).sqrt();
        if c < ACHROMATIC_CHROMA {
            return Oklch { l, c: 0.0, h: 0.0 };
        }
        Oklch {
            l,
            c,
            h: b.atan2(a).to_degrees().rem_euclid(360.0),
        }
    }

    pub fn from_oklch(lch: Oklch) -> Self {
        let h = lch.h.to_radians();
        let (r, g, b) = oklab_to_linear(lch.l, lch.c * h.cos(), lch.c * h.sin());
        Self {
            r: linear_to_srgb(r),
            g: linear_to_srgb(g),
            b: linear_to_srgb(b),
        }
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Interpolate between two OKLCH colors using the shortest hue path.
/// An achromatic endpoint borrows the other endpoint's hue.
pub fn interpolate_oklch(from: Oklch, to: Oklch, t: f64) -> Oklch {
    let from_achromatic = from.c < ACHROMATIC_CHROMA;
    let to_achromatic = to.c < ACHROMATIC_CHROMA;
    let (from_h, to_h) = match (from_achromatic, to_achromatic) {
        (true, false) => (to.h, to.h),
        (false, true) => (from.h, from.h),
        _ => (from.h, to.h),
    };

    let mut dh = to_h - from_h;
    if dh > 180.0 {
        dh -= 360.0;
    } else if dh < -180.0 {
        dh += 360.0;
    }

    Oklch {
        l: from.l + (to.l - from.l) * t,
        c: from.c + (to.c - from.c) * t,
        h: (from_h + dh * t).rem_euclid(360.0),
    }
}

/// Two-stop scale blended in OKLCH. Percentages at or beyond the ends return
/// the endpoint colors exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    min: Color,
    max: Color,
    from: Oklch,
    to: Oklch,
}

impl ColorScale {
    pub fn new(min: Color, max: Color) -> Self {
        Self {
            min,
            max,
            from: min.to_oklch(),
            to: max.to_oklch(),
        }
    }

    pub fn color_at(&self, percentage: f64) -> Color {
        if percentage <= 0.0 {
            self.min
        } else if percentage >= 100.0 {
            self.max
        } else {
            Color::from_oklch(self.oklch_at(percentage))
        }
    }

    pub fn oklch_at(&self, percentage: f64) -> Oklch {
        interpolate_oklch(self.from, self.to, (percentage / 100.0).clamp(0.0, 1.0))
    }
}

/// Convert HSL to RGB.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s.abs() < f64::EPSILON {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;
    let h = h.rem_euclid(360.0) / 360.0;

    let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h);
    let b = hue_to_rgb(p, q, h - 1.0 / 3.0);

    (
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let (r, g, b) = match hex.len() {
        3 | 4 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|v| v * 17);
            (digit(0)?, digit(1)?, digit(2)?)
        }
        6 | 8 => {
            let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            (pair(0)?, pair(2)?, pair(4)?)
        }
        _ => return None,
    };
    Some(Color::from_rgb8(r, g, b))
}

fn split_function(text: &str) -> Option<(&str, &str)> {
    let open = text.find('(')?;
    let args = text[open + 1..].strip_suffix(')')?;
    Some((text[..open].trim(), args))
}

/// Split function arguments on commas or whitespace, dropping any `/ alpha`.
fn components(args: &str) -> Vec<&str> {
    let color_part = args.split('/').next().unwrap_or_default();
    color_part
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect()
}

fn parse_number(part: &str) -> Option<f64> {
    if part == "none" {
        return Some(0.0);
    }
    part.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_percent(part: &str) -> Option<f64> {
    part.strip_suffix('%').and_then(parse_number).map(|v| v / 100.0)
}

fn parse_rgb_args(args: &str) -> Option<Color> {
    let parts = components(args);
    let &[r, g, b] = parts.get(..3)? else {
        return None;
    };
    let channel = |part: &str| {
        parse_percent(part).or_else(|| parse_number(part).map(|v| v / 255.0))
    };
    Some(Color {
        r: channel(r)?.clamp(0.0, 1.0),
        g: channel(g)?.clamp(0.0, 1.0),
        b: channel(b)?.clamp(0.0, 1.0),
    })
}

fn parse_hsl_args(args: &str) -> Option<Color> {
    let parts = components(args);
    let &[h, s, l] = parts.get(..3)? else {
        return None;
    };
    let h = parse_number(h.trim_end_matches("deg"))?;
    let s = parse_percent(s).or_else(|| parse_number(s).map(|v| v / 100.0))?;
    let l = parse_percent(l).or_else(|| parse_number(l).map(|v| v / 100.0))?;
    let (r, g, b) = hsl_to_rgb(h, s.clamp(0.0, 1.0), l.clamp(0.0, 1.0));
    Some(Color::from_rgb8(r, g, b))
}

fn parse_oklch_args(args: &str) -> Option<Oklch> {
    let parts = components(args);
    let &[l, c, h] = parts.get(..3)? else {
        return None;
    };
    let l = parse_percent(l).or_else(|| parse_number(l))?;
    let c = parse_percent(c)
        .map(|v| v * OKLCH_PERCENT_CHROMA)
        .or_else(|| parse_number(c))?;
    let h = parse_number(h.trim_end_matches("deg"))?;
    Some(Oklch {
        l: l.clamp(0.0, 1.0),
        c: c.max(0.0),
        h: h.rem_euclid(360.0),
    })
}

fn srgb_to_linear(c: f64) -> f64 {
    let magnitude = c.abs();
    let linear = if magnitude <= 0.04045 {
        magnitude / 12.92
    } else {
        ((magnitude + 0.055) / 1.055).powf(2.4)
    };
    linear.copysign(c)
}

fn linear_to_srgb(c: f64) -> f64 {
    let magnitude = c.abs();
    let encoded = if magnitude <= 0.003_130_8 {
        magnitude * 12.92
    } else {
        1.055 * magnitude.powf(1.0 / 2.4) - 0.055
    };
    encoded.copysign(c)
}

fn linear_to_oklab(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let l = 0.412_221_470_8 * r + 0.536_332_536_3 * g + 0.051_445_992_9 * b;
    let m = 0.211_903_498_2 * r + 0.680_699_545_1 * g + 0.107_396_956_6 * b;
    let s = 0.088_302_461_9 * r + 0.281_718_837_6 * g + 0.629_978_700_5 * b;

    let (l, m, s) = (l.cbrt(), m.cbrt(), s.cbrt());

    (
        0.210_454_255_3 * l + 0.793_617_785_0 * m - 0.004_072_046_8 * s,
        1.977_998_495_1 * l - 2.428_592_205_0 * m + 0.450_593_709_9 * s,
        0.025_904_037_1 * l + 0.782_771_766_2 * m - 0.808_675_766_0 * s,
    )
}

fn oklab_to_linear(l: f64, a: f64, b: f64) -> (f64, f64, f64) {
    let l_ = l + 0.396_337_777_4 * a + 0.215_803_757_3 * b;
    let m_ = l - 0.105_561_345_8 * a - 0.063_854_172_8 * b;
    let s_ = l - 0.089_484_177_5 * a - 1.291_485_548_0 * b;

    let (l, m, s) = (l_ * l_ * l_, m_ * m_ * m_, s_ * s_ * s_);

    (
        4.076_741_662_1 * l - 3.307_711_591_3 * m + 0.230_969_929_2 * s,
        -1.268_438_004_6 * l + 2.609_757_401_1 * m - 0.341_319_396_5 * s,
        -0.004_196_086_3 * l - 0.703_418_614_7 * m + 1.707_614_701_0 * s,
    )
}
