//! bl-core: Shared types for the Barline timeline
//!
//! Foundational value types used across all Barline crates: musical
//! position arithmetic, timeline settings, and decibel helpers.

mod error;
mod position;
mod settings;

pub use error::*;
pub use position::*;
pub use settings::*;

/// Decibel value wrapper
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Decibels(pub f64);

impl Decibels {
    pub const ZERO: Self = Self(0.0);
    pub const NEG_INF: Self = Self(f64::NEG_INFINITY);

    #[inline]
    pub fn from_gain(gain: f64) -> Self {
        if gain <= 0.0 {
            Self::NEG_INF
        } else {
            Self(20.0 * gain.log10())
        }
    }

    #[inline]
    pub fn to_gain(self) -> f64 {
        if self.0 <= -144.0 {
            0.0
        } else {
            10.0_f64.powf(self.0 / 20.0)
        }
    }
}

impl Default for Decibels {
    fn default() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_decibels_gain_round_trip() {
        assert_relative_eq!(Decibels::ZERO.to_gain(), 1.0);
        assert_relative_eq!(Decibels(-6.0).to_gain(), 0.5011872336272722);
        assert_eq!(Decibels::NEG_INF.to_gain(), 0.0);
        assert_eq!(Decibels::from_gain(0.0), Decibels::NEG_INF);
        assert_relative_eq!(Decibels::from_gain(Decibels(-37.0).to_gain()).0, -37.0);
    }
}
