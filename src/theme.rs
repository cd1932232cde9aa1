//! Theme loading: btop-style `theme[key]="value"` files mapped onto tile and UI colours.

use crate::board::Symbol;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Number of tile colours, one per symbol kind.
pub const TILE_COLOURS: usize = Symbol::ALL.len();

/// Theme keys read for each tile colour, in `Symbol::ALL` order.
const TILE_KEYS: [&str; TILE_COLOURS] = [
    "tile_apple",
    "tile_grape",
    "tile_orange",
    "tile_banana",
    "tile_melon",
    "tile_kiwi",
    "tile_strawberry",
    "tile_pineapple",
];

/// One Dark defaults for the tiles, in `Symbol::ALL` order.
const ONEDARK_TILES: [(u8, u8, u8); TILE_COLOURS] = [
    (0xE0, 0x6C, 0x75), // red
    (0xC6, 0x78, 0xDD), // magenta
    (0xD1, 0x9A, 0x66), // orange
    (0xE5, 0xC0, 0x7B), // yellow
    (0x56, 0xB6, 0xC2), // cyan
    (0x98, 0xC3, 0x79), // green
    (0xBE, 0x50, 0x46), // dark red
    (0x61, 0xAF, 0xEF), // blue
];

/// Colours for tiles and chrome.
#[derive(Debug, Clone)]
pub struct Theme {
    pub tiles: [Color; TILE_COLOURS],
    /// Board background.
    pub bg: Color,
    /// Borders.
    pub div_line: Color,
    /// Text (score, level).
    pub main_fg: Color,
    /// Titles and the cursor frame.
    pub title: Color,
    /// Selected tile highlight.
    pub selected: Color,
    /// Hints and secondary text.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark()
    }
}

impl Theme {
    pub fn onedark() -> Self {
        Self {
            tiles: ONEDARK_TILES.map(|(r, g, b)| Color::Rgb(r, g, b)),
            bg: Color::Rgb(0x28, 0x2C, 0x34),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
            selected: Color::Rgb(0xFF, 0xFF, 0xFF),
            inactive_fg: Color::Rgb(0x5C, 0x63, 0x70),
        }
    }

    /// Load a theme file. Missing path or file means One Dark; keys absent from the file
    /// keep their One Dark value. `palette` then overrides tile colours.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let map = parse_theme_file(&std::fs::read_to_string(p)?);
                Self::from_map(&map)?
            }
            _ => Self::onedark(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: crate::Palette) {
        let rgb = |v: [(u8, u8, u8); TILE_COLOURS]| v.map(|(r, g, b)| Color::Rgb(r, g, b));
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.tiles = rgb([
                    (0xFF, 0x00, 0x00),
                    (0xFF, 0x00, 0xFF),
                    (0xFF, 0x88, 0x00),
                    (0xFF, 0xFF, 0x00),
                    (0x00, 0xFF, 0xFF),
                    (0x00, 0xFF, 0x00),
                    (0xFF, 0xFF, 0xFF),
                    (0x00, 0x88, 0xFF),
                ]);
            }
            crate::Palette::Colorblind => {
                // Paul Tol's muted qualitative scheme.
                self.tiles = rgb([
                    (0xCC, 0x66, 0x77),
                    (0x88, 0x22, 0x55),
                    (0xDD, 0xCC, 0x77),
                    (0x11, 0x77, 0x33),
                    (0x88, 0xCC, 0xEE),
                    (0x44, 0xAA, 0x99),
                    (0xAA, 0x44, 0x99),
                    (0x33, 0x22, 0x88),
                ]);
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Result<Self, ThemeError> {
        let mut theme = Self::onedark();
        let get = |key: &str| map.get(key).map(|v| parse_hex(v)).transpose();
        for (slot, key) in theme.tiles.iter_mut().zip(TILE_KEYS) {
            if let Some(c) = get(key)? {
                *slot = c;
            }
        }
        let chrome: [(&str, &mut Color); 6] = [
            ("main_bg", &mut theme.bg),
            ("div_line", &mut theme.div_line),
            ("main_fg", &mut theme.main_fg),
            ("title", &mut theme.title),
            ("selected_fg", &mut theme.selected),
            ("inactive_fg", &mut theme.inactive_fg),
        ];
        for (key, slot) in chrome {
            if let Some(c) = get(key)? {
                *slot = c;
            }
        }
        Ok(theme)
    }

    #[inline]
    pub fn tile_color(&self, symbol: Symbol) -> Color {
        self.tiles[symbol.index() % TILE_COLOURS]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| {
            let rest = l.strip_prefix("theme[")?;
            let (key, rest) = rest.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let hex = s.trim().trim_start_matches('#');
    let bad = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>, scale: u8| {
        hex.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .map(|v| v * scale)
            .ok_or_else(bad)
    };
    match hex.len() {
        6 => Ok(Color::Rgb(channel(0..2, 1)?, channel(2..4, 1)?, channel(4..6, 1)?)),
        3 => Ok(Color::Rgb(channel(0..1, 17)?, channel(1..2, 17)?, channel(2..3, 17)?)),
        _ => Err(bad()),
    }
}
