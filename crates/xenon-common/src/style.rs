use std::fmt::Write as _;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// A terminal colour.
///
/// `Normal` is the terminal's own default. `Standard`/`Bright` carry a base
/// palette index 0..=7; `Extended` is the full 256-colour palette; `Rgb` is
/// 24-bit truecolor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Color {
    #[default]
    Normal,
    Standard(u8),
    Bright(u8),
    Extended(u8),
    Rgb(u8, u8, u8),
}

/// Base 16-colour palette as RGB, xterm defaults.
const BASE_PALETTE: [(u8, u8, u8); 16] = [
    (0, 0, 0),
    (205, 0, 0),
    (0, 205, 0),
    (205, 205, 0),
    (0, 0, 238),
    (205, 0, 205),
    (0, 205, 205),
    (229, 229, 229),
    (127, 127, 127),
    (255, 0, 0),
    (0, 255, 0),
    (255, 255, 0),
    (92, 92, 255),
    (255, 0, 255),
    (0, 255, 255),
    (255, 255, 255),
];

impl Color {
    /// SGR parameters selecting this colour as the foreground.
    pub fn fg_params(&self) -> String {
        match *self {
            Color::Normal => "39".to_string(),
            Color::Standard(n) => format!("{}", 30 + n as u16),
            Color::Bright(n) => format!("{}", 90 + n as u16),
            Color::Extended(n) => format!("38;5;{n}"),
            Color::Rgb(r, g, b) => format!("38;2;{r};{g};{b}"),
        }
    }

    /// SGR parameters selecting this colour as the background.
    pub fn bg_params(&self) -> String {
        match *self {
            Color::Normal => "49".to_string(),
            Color::Standard(n) => format!("{}", 40 + n as u16),
            Color::Bright(n) => format!("{}", 100 + n as u16),
            Color::Extended(n) => format!("48;5;{n}"),
            Color::Rgb(r, g, b) => format!("48;2;{r};{g};{b}"),
        }
    }

    /// Palette index `n` expressed with the most compact variant: 0..=7 as
    /// `Standard`, 8..=15 as `Bright`, the rest as `Extended`.
    pub fn optimized_extended(n: u8) -> Color {
        match n {
            0..=7 => Color::Standard(n),
            8..=15 => Color::Bright(n - 8),
            _ => Color::Extended(n),
        }
    }

    /// The RGB value of this colour.
    ///
    /// Palette entries 16..=231 are the 6x6x6 cube (channel = 0 or 55+40c),
    /// 232..=255 the 24-step grayscale ramp (8+10i). `Normal` answers with
    /// the Standard(7) grey so the conversion lattice stays total.
    pub fn rgb(&self) -> (u8, u8, u8) {
        match *self {
            Color::Normal => BASE_PALETTE[7],
            Color::Standard(n) => BASE_PALETTE[(n & 7) as usize],
            Color::Bright(n) => BASE_PALETTE[(n & 7) as usize + 8],
            Color::Extended(n) => match n {
                0..=15 => BASE_PALETTE[n as usize],
                16..=231 => {
                    let i = n - 16;
                    let cube = |c: u8| if c == 0 { 0 } else { 55 + c * 40 };
                    (cube(i / 36), cube(i / 6 % 6), cube(i % 6))
                }
                _ => {
                    let gray = 8 + (n - 232) * 10;
                    (gray, gray, gray)
                }
            },
            Color::Rgb(r, g, b) => (r, g, b),
        }
    }

    /// Nearest 256-palette colour (cube + ramp for RGB input).
    pub fn to_extended(&self) -> Color {
        match *self {
            Color::Normal | Color::Extended(_) => *self,
            Color::Standard(n) => Color::Extended(n),
            Color::Bright(n) => Color::Extended(n + 8),
            Color::Rgb(..) => {
                let idx = (16..=255u16)
                    .min_by_key(|&i| self.distance_to(Color::Extended(i as u8)))
                    .unwrap_or(16);
                Color::Extended(idx as u8)
            }
        }
    }

    /// Nearest of the 16 base colours.
    pub fn to_ansi(&self) -> Color {
        match *self {
            Color::Normal | Color::Standard(_) | Color::Bright(_) => *self,
            _ => {
                let idx = (0..16u8)
                    .min_by_key(|&i| self.distance_to(Color::Extended(i)))
                    .unwrap_or(0);
                Color::optimized_extended(idx)
            }
        }
    }

    /// Nearest of the 8 standard colours.
    pub fn to_standard(&self) -> Color {
        match *self {
            Color::Normal | Color::Standard(_) => *self,
            _ => {
                let idx = (0..8u8)
                    .min_by_key(|&i| self.distance_to(Color::Standard(i)))
                    .unwrap_or(0);
                Color::Standard(idx)
            }
        }
    }

    fn distance_to(&self, other: Color) -> u32 {
        let (r1, g1, b1) = self.rgb();
        let (r2, g2, b2) = other.rgb();
        let d = |a: u8, b: u8| {
            let d = a as i32 - b as i32;
            (d * d) as u32
        };
        d(r1, r2) + d(g1, g2) + d(b1, b2)
    }
}

bitflags! {
    /// Text rendition effects.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
    pub struct TextEffects: u8 {
        const INTENSE = 1 << 0;
        const FAINT = 1 << 1;
        const ITALIC = 1 << 2;
        const UNDERLINE = 1 << 3;
        const DOUBLE_UNDERLINE = 1 << 4;
        const SLOW_BLINK = 1 << 5;
        const FAST_BLINK = 1 << 6;
        const CROSSED_OUT = 1 << 7;
    }
}

impl TextEffects {
    /// Every single-bit effect with its SGR on/off parameters.
    ///
    /// Intense and faint share off=22, both underline kinds share off=24,
    /// both blinks share off=25.
    pub const TABLE: [(TextEffects, u8, u8); 8] = [
        (TextEffects::INTENSE, 1, 22),
        (TextEffects::FAINT, 2, 22),
        (TextEffects::ITALIC, 3, 23),
        (TextEffects::UNDERLINE, 4, 24),
        (TextEffects::DOUBLE_UNDERLINE, 21, 24),
        (TextEffects::SLOW_BLINK, 5, 25),
        (TextEffects::FAST_BLINK, 6, 25),
        (TextEffects::CROSSED_OUT, 9, 29),
    ];

    /// Semicolon-joined `on` parameters for every set effect.
    pub fn on_params(&self) -> String {
        let mut out = String::new();
        for (flag, on, _) in Self::TABLE {
            if self.contains(flag) {
                if !out.is_empty() {
                    out.push(';');
                }
                let _ = write!(out, "{on}");
            }
        }
        out
    }
}

/// Colour and effects for painting foreground glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ForegroundStyle {
    pub color: Color,
    pub effects: TextEffects,
}

impl ForegroundStyle {
    pub fn new(color: Color, effects: TextEffects) -> Self {
        Self { color, effects }
    }

    pub fn colored(color: Color) -> Self {
        Self {
            color,
            effects: TextEffects::empty(),
        }
    }
}

/// A styled foreground glyph.
///
/// `code_unit == 0` is the sentinel for "no foreground glyph is painted":
/// the cell's visible content, if any, comes from a grapheme attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Foreground {
    pub style: ForegroundStyle,
    pub code_unit: u16,
}

impl Foreground {
    pub fn new(style: ForegroundStyle, code_unit: u16) -> Self {
        Self { style, code_unit }
    }

    /// A glyph-free foreground carrying only the style.
    pub fn blank(style: ForegroundStyle) -> Self {
        Self {
            style,
            code_unit: 0,
        }
    }

    pub fn has_glyph(&self) -> bool {
        self.code_unit != 0
    }
}

/// A grapheme cluster attached to a cell.
///
/// A double-width grapheme spans two adjacent cells: the left cell stores
/// `is_second == false`, the right cell the same `data` with
/// `is_second == true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grapheme {
    pub data: String,
    pub width: u8,
    pub is_second: bool,
}

impl Grapheme {
    pub fn new(data: impl Into<String>, width: u8) -> Self {
        Self {
            data: data.into(),
            width,
            is_second: false,
        }
    }

    /// The right-half marker for a double-width grapheme.
    pub fn second_half(&self) -> Self {
        Self {
            data: self.data.clone(),
            width: self.width,
            is_second: true,
        }
    }
}
