use ratatui::style::{Color, Modifier, Style};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::terminal;

// Color palette structure
#[derive(Clone, Debug)]
pub struct Base16Palette {
    pub base_00: Color, // Background
    pub base_01: Color, // Lighter background
    pub base_02: Color, // Selection background
    pub base_03: Color, // Comments, invisibles
    pub base_04: Color, // Dark foreground
    pub base_05: Color, // Default foreground
    pub base_06: Color, // Light foreground
    pub base_07: Color, // Light background
    pub base_08: Color, // Red
    pub base_09: Color, // Orange
    pub base_0a: Color, // Yellow
    pub base_0b: Color, // Green
    pub base_0c: Color, // Cyan
    pub base_0d: Color, // Blue
    pub base_0e: Color, // Purple
    pub base_0f: Color, // Brown
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ThemeId {
    OceanicNext = 0,
    CatppuccinMocha = 1,
}

impl ThemeId {
    pub fn name(&self) -> &'static str {
        match self {
            ThemeId::OceanicNext => "Oceanic Next",
            ThemeId::CatppuccinMocha => "Catppuccin Mocha",
        }
    }

    pub fn all() -> &'static [ThemeId] {
        &[ThemeId::OceanicNext, ThemeId::CatppuccinMocha]
    }

    /// Match a configured theme name, case-insensitively
    pub fn from_name(name: &str) -> Option<ThemeId> {
        Self::all()
            .iter()
            .copied()
            .find(|id| id.name().eq_ignore_ascii_case(name.trim()))
    }

    fn from_index(idx: usize) -> Self {
        match idx {
            1 => ThemeId::CatppuccinMocha,
            _ => ThemeId::OceanicNext,
        }
    }
}

static CURRENT_THEME_INDEX: AtomicUsize = AtomicUsize::new(0);

static TRUE_COLOR: LazyLock<bool> = LazyLock::new(terminal::supports_true_color);

pub fn current_theme_id() -> ThemeId {
    ThemeId::from_index(CURRENT_THEME_INDEX.load(Ordering::Relaxed))
}

pub fn set_theme(theme: ThemeId) {
    CURRENT_THEME_INDEX.store(theme as usize, Ordering::Relaxed);
}

pub fn current_theme() -> &'static Base16Palette {
    match current_theme_id() {
        ThemeId::OceanicNext => &OCEANIC_NEXT_PALETTE,
        ThemeId::CatppuccinMocha => &CATPPUCCIN_MOCHA_PALETTE,
    }
}

/// RGB when the terminal can show it, nearest xterm-256 entry otherwise
pub fn smart_color(hex: u32) -> Color {
    let (r, g, b) = ((hex >> 16) as u8, (hex >> 8) as u8, hex as u8);
    if *TRUE_COLOR {
        Color::Rgb(r, g, b)
    } else {
        Color::Indexed(rgb_to_ansi256(r, g, b))
    }
}

fn rgb_to_ansi256(r: u8, g: u8, b: u8) -> u8 {
    // Grays get the 24-step ramp
    if r == g && g == b {
        if r < 8 {
            return 16;
        }
        if r > 248 {
            return 231;
        }
        return 232 + ((u16::from(r) - 8) * 24 / 247) as u8;
    }

    let level = |v: u8| -> u8 {
        if v < 48 {
            0
        } else if v < 115 {
            1
        } else {
            ((v - 35) / 40).min(5)
        }
    };
    16 + 36 * level(r) + 6 * level(g) + level(b)
}

// Oceanic Next theme
static OCEANIC_NEXT_PALETTE: LazyLock<Base16Palette> = LazyLock::new(|| Base16Palette {
    base_00: smart_color(0x1B2B34),
    base_01: smart_color(0x343D46),
    base_02: smart_color(0x4F5B66),
    base_03: smart_color(0x65737E),
    base_04: smart_color(0xA7ADBA),
    base_05: smart_color(0xC0C5CE),
    base_06: smart_color(0xCDD3DE),
    base_07: smart_color(0xF0F4F8),
    base_08: smart_color(0xEC5F67),
    base_09: smart_color(0xF99157),
    base_0a: smart_color(0xFAC863),
    base_0b: smart_color(0x99C794),
    base_0c: smart_color(0x5FB3B3),
    base_0d: smart_color(0x6699CC),
    base_0e: smart_color(0xC594C5),
    base_0f: smart_color(0xAB7967),
});

// Catppuccin Mocha theme
// Mapped from: base=#1E1E2E, surface0=#313244, surface1=#45475A, overlay0=#6C7086
// overlay1=#7F849C, subtext0=#A6ADC8, text=#CDD6F4, rosewater=#F5E0DC
// red=#F38BA8, peach=#FAB387, yellow=#F9E2AF, green=#A6E3A1
// teal=#94E2D5, blue=#89B4FA, mauve=#CBA6F7, maroon=#EBA0AC
static CATPPUCCIN_MOCHA_PALETTE: LazyLock<Base16Palette> = LazyLock::new(|| Base16Palette {
    base_00: smart_color(0x1E1E2E),
    base_01: smart_color(0x313244),
    base_02: smart_color(0x45475A),
    base_03: smart_color(0x6C7086),
    base_04: smart_color(0x7F849C),
    base_05: smart_color(0xA6ADC8),
    base_06: smart_color(0xCDD6F4),
    base_07: smart_color(0xF5E0DC),
    base_08: smart_color(0xF38BA8),
    base_09: smart_color(0xFAB387),
    base_0a: smart_color(0xF9E2AF),
    base_0b: smart_color(0xA6E3A1),
    base_0c: smart_color(0x94E2D5),
    base_0d: smart_color(0x89B4FA),
    base_0e: smart_color(0xCBA6F7),
    base_0f: smart_color(0xEBA0AC),
});

// Roles used by the viewer and its overlays
impl Base16Palette {
    /// Header and status bar: (fg, bg)
    pub fn chrome_colors(&self) -> (Color, Color) {
        (self.base_05, self.base_01)
    }

    /// Document text: (fg, bg)
    pub fn page_colors(&self) -> (Color, Color) {
        (self.base_06, self.base_00)
    }

    /// Raw selection highlight: (bg, fg)
    pub fn selection_colors(&self) -> (Color, Color) {
        (self.base_02, self.base_07)
    }

    /// Popup border: focused vs. idle
    pub fn popup_border(&self, is_focused: bool) -> Color {
        if is_focused { self.base_0d } else { self.base_03 }
    }

    pub fn button_style(&self, enabled: bool) -> Style {
        if enabled {
            Style::default()
                .fg(self.base_00)
                .bg(self.base_0d)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.base_03).bg(self.base_01)
        }
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.base_08).add_modifier(Modifier::BOLD)
    }

    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.base_03)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_lookup_by_name() {
        assert_eq!(
            ThemeId::from_name("catppuccin mocha"),
            Some(ThemeId::CatppuccinMocha)
        );
        assert_eq!(ThemeId::from_name("Solarized"), None);
    }

    #[test]
    fn ansi256_fallback() {
        assert_eq!(rgb_to_ansi256(0, 0, 0), 16);
        assert_eq!(rgb_to_ansi256(255, 255, 255), 231);
        assert_eq!(rgb_to_ansi256(255, 0, 0), 196);
        assert_eq!(rgb_to_ansi256(0, 0, 255), 21);
    }
}
