use ratatui::style::{Color, Modifier, Style};

pub const BG: u32 = 0x0a0e1c;
pub const PANEL_BORDER: u32 = 0x475569;
pub const TEXT: u32 = 0xe2e8f0;
pub const MUTED: u32 = 0x94a3b8;
pub const OK: u32 = 0x22c55e;
pub const WARN: u32 = 0xf59e0b;
pub const CRITICAL: u32 = 0xef4444;
pub const ORBIT_PATH: u32 = 0x232a42;
pub const STAR: u32 = 0x3a4161;
pub const SUN_CORE: u32 = 0xffd75e;

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(0xbf, 0xdb, 0xfe))
    .add_modifier(Modifier::BOLD);

/// Glow color ramp around the sun, ordered by priority: an actively
/// speaking agent outranks a verified speaker, which outranks a merely
/// running agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlowTier {
    Speaking,
    Verified,
    Running,
    Idle,
}

impl GlowTier {
    pub fn for_signals(speaking: bool, verified: bool, running: bool) -> Self {
        if speaking {
            GlowTier::Speaking
        } else if verified {
            GlowTier::Verified
        } else if running {
            GlowTier::Running
        } else {
            GlowTier::Idle
        }
    }

    pub fn color(self) -> u32 {
        match self {
            GlowTier::Speaking => 0xffc247,
            GlowTier::Verified => 0x74d68a,
            GlowTier::Running => 0xff9d45,
            GlowTier::Idle => 0x4f5a78,
        }
    }
}

/// Lighten a 24-bit RGB value by `percent` (each channel +2.55/percent,
/// clamped to 255).
pub fn lighten(rgb: u32, percent: f64) -> u32 {
    shift(rgb, (2.55 * percent).round() as i32)
}

/// Darken a 24-bit RGB value by `percent`.
pub fn darken(rgb: u32, percent: f64) -> u32 {
    shift(rgb, -((2.55 * percent).round() as i32))
}

fn shift(rgb: u32, delta: i32) -> u32 {
    let r = (((rgb >> 16) & 0xff) as i32 + delta).clamp(0, 255) as u32;
    let g = (((rgb >> 8) & 0xff) as i32 + delta).clamp(0, 255) as u32;
    let b = ((rgb & 0xff) as i32 + delta).clamp(0, 255) as u32;
    (r << 16) | (g << 8) | b
}

/// Decode a 24-bit RGB value into a terminal color.
pub fn tint(rgb: u32) -> Color {
    Color::Rgb(
        ((rgb >> 16) & 0xff) as u8,
        ((rgb >> 8) & 0xff) as u8,
        (rgb & 0xff) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lighten_and_darken_shift_each_channel() {
        // 10% is a delta of round(25.5) = 26 per channel.
        assert_eq!(lighten(0x102030, 10.0), 0x2a3a4a);
        assert_eq!(darken(0x2a3a4a, 10.0), 0x102030);
    }

    #[test]
    fn channel_shifts_clamp_at_the_byte_range() {
        assert_eq!(lighten(0xff00f0, 20.0), 0xff33ff);
        assert_eq!(darken(0x100010, 20.0), 0x000000);
        assert_eq!(lighten(0xffffff, 100.0), 0xffffff);
        assert_eq!(darken(0x000000, 100.0), 0x000000);
    }

    #[test]
    fn zero_percent_is_identity() {
        assert_eq!(lighten(0xabcdef, 0.0), 0xabcdef);
        assert_eq!(darken(0xabcdef, 0.0), 0xabcdef);
    }

    #[test]
    fn speaking_outranks_every_other_tier() {
        assert_eq!(
            GlowTier::for_signals(true, true, true),
            GlowTier::Speaking
        );
        assert_eq!(
            GlowTier::for_signals(false, true, true),
            GlowTier::Verified
        );
        assert_eq!(
            GlowTier::for_signals(false, false, true),
            GlowTier::Running
        );
        assert_eq!(
            GlowTier::for_signals(false, false, false),
            GlowTier::Idle
        );
    }

    #[test]
    fn tint_decodes_the_three_channels() {
        assert_eq!(tint(0x123456), Color::Rgb(0x12, 0x34, 0x56));
    }
}
