//! Display mode value type and capability ranking.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A width/height/refresh-rate combination an output can be driven at.
///
/// Equality is structural. Ranking for mode selection uses
/// [`Mode::capability_cmp`]: larger pixel area first, then higher refresh
/// rate, so the most capable mode sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mode {
    /// Width in physical pixels.
    pub width: u32,
    /// Height in physical pixels.
    pub height: u32,
    /// Refresh rate in Hz.
    pub refresh_hz: u32,
}

impl Mode {
    pub fn new(width: u32, height: u32, refresh_hz: u32) -> Self {
        Self {
            width,
            height,
            refresh_hz,
        }
    }

    /// Pixel area, used as the primary ranking key.
    pub fn pixel_area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// A mode is usable only with positive dimensions; platforms have been
    /// seen reporting zero-sized placeholder modes during enumeration.
    pub fn is_usable(&self) -> bool {
        self.width > 0 && self.height > 0 && self.refresh_hz > 0
    }

    /// Capability ordering: pixel area descending, then refresh descending.
    pub fn capability_cmp(&self, other: &Mode) -> Ordering {
        other
            .pixel_area()
            .cmp(&self.pixel_area())
            .then(other.refresh_hz.cmp(&self.refresh_hz))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} @ {}Hz", self.width, self.height, self.refresh_hz)
    }
}

/// Deduplicate and rank a list of modes, most capable first.
///
/// Unusable (zero-sized) modes are dropped.
pub fn rank_modes(modes: &[Mode]) -> Vec<Mode> {
    let mut ranked: Vec<Mode> = Vec::with_capacity(modes.len());
    for mode in modes {
        if mode.is_usable() && !ranked.contains(mode) {
            ranked.push(*mode);
        }
    }
    ranked.sort_by(|a, b| a.capability_cmp(b));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_human_readable() {
        assert_eq!(Mode::new(1920, 1080, 60).to_string(), "1920x1080 @ 60Hz");
    }

    #[test]
    fn ranking_is_area_descending_then_refresh_descending() {
        let modes = [
            Mode::new(1920, 1080, 60),
            Mode::new(3840, 2160, 30),
            Mode::new(1920, 1080, 144),
            Mode::new(1280, 720, 60),
        ];
        let ranked = rank_modes(&modes);
        assert_eq!(
            ranked,
            vec![
                Mode::new(3840, 2160, 30),
                Mode::new(1920, 1080, 144),
                Mode::new(1920, 1080, 60),
                Mode::new(1280, 720, 60),
            ]
        );
    }

    #[test]
    fn ranking_deduplicates_and_drops_zero_sized_modes() {
        let modes = [
            Mode::new(1920, 1080, 60),
            Mode::new(1920, 1080, 60),
            Mode::new(0, 1080, 60),
            Mode::new(1920, 0, 60),
        ];
        assert_eq!(rank_modes(&modes), vec![Mode::new(1920, 1080, 60)]);
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(Mode::new(800, 600, 75), Mode::new(800, 600, 75));
        assert_ne!(Mode::new(800, 600, 75), Mode::new(800, 600, 60));
    }
}
