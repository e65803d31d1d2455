//! Tempo and Time Signature Settings
//!
//! Timeline-wide musical configuration:
//! - Time signature (beats per bar, note value)
//! - Tempo in BPM, clamped to a sane range
//! - PPQ (pulses per quarter note) resolution
//! - Snap grid unit in beats
//!
//! Settings are read-only input to every position conversion. Nothing in
//! this crate holds an ambient copy; callers pass `&TimelineSettings`
//! explicitly and mutate it only through the setters below.

use serde::{Deserialize, Serialize};

/// Pulses per quarter note (industry standard: 960)
pub const PPQ: u32 = 960;

/// Minimum tempo
pub const MIN_TEMPO: f64 = 20.0;

/// Maximum tempo
pub const MAX_TEMPO: f64 = 400.0;

/// Time signature (e.g., 4/4, 3/4, 6/8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Numerator (beats per bar)
    pub numerator: u8,
    /// Denominator (note value that gets one beat)
    pub denominator: u8,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }
}

impl TimeSignature {
    pub fn new(numerator: u8, denominator: u8) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Common time (4/4)
    pub const COMMON: Self = Self {
        numerator: 4,
        denominator: 4,
    };

    /// Waltz time (3/4)
    pub const WALTZ: Self = Self {
        numerator: 3,
        denominator: 4,
    };

    /// Is compound meter (6/8, 9/8, 12/8)
    pub fn is_compound(&self) -> bool {
        self.denominator == 8 && self.numerator % 3 == 0
    }
}

impl std::fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Timeline-wide settings consumed by position arithmetic
///
/// Every field is mutated only through its setter; nothing changes settings
/// implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineSettings {
    /// Tempo in BPM
    tempo: f64,
    /// Time signature
    time_signature: TimeSignature,
    /// Pulses per quarter note
    ppq: u32,
    /// Snap grid unit in beats (1.0 = one beat, 0.25 = sixteenth in 4/4)
    grid: f64,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            tempo: 120.0,
            time_signature: TimeSignature::default(),
            ppq: PPQ,
            grid: 1.0,
        }
    }
}

impl TimelineSettings {
    pub fn new(tempo: f64, time_signature: TimeSignature) -> Self {
        Self {
            tempo: tempo.clamp(MIN_TEMPO, MAX_TEMPO),
            time_signature,
            ppq: PPQ,
            grid: 1.0,
        }
    }

    /// Tempo in BPM
    #[inline]
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Set tempo, clamped to `[MIN_TEMPO, MAX_TEMPO]`
    pub fn set_tempo(&mut self, bpm: f64) {
        let clamped = bpm.clamp(MIN_TEMPO, MAX_TEMPO);
        if clamped != bpm {
            log::warn!("Tempo {} outside [{}, {}], clamped", bpm, MIN_TEMPO, MAX_TEMPO);
        }
        self.tempo = clamped;
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn set_time_signature(&mut self, time_signature: TimeSignature) {
        self.time_signature = time_signature;
    }

    /// Pulses per quarter note
    #[inline]
    pub fn ppq(&self) -> u32 {
        self.ppq
    }

    /// Set the tick resolution; at least one pulse per quarter
    pub fn set_ppq(&mut self, ppq: u32) {
        self.ppq = ppq.max(1);
    }

    /// Snap grid unit in beats
    #[inline]
    pub fn grid(&self) -> f64 {
        self.grid
    }

    /// Set the snap grid unit; zero or less disables snapping
    pub fn set_grid(&mut self, grid: f64) {
        self.grid = grid.max(0.0);
    }

    /// Ticks per beat at this time signature
    ///
    /// A quarter note = `ppq` ticks; the denominator tells us what note
    /// value gets one beat (4 = quarter, 8 = eighth, 2 = half).
    #[inline]
    pub fn ticks_per_beat(&self) -> u64 {
        self.ppq as u64 * 4 / self.time_signature.denominator as u64
    }

    /// Beats per bar (the configured numerator, never a hardcoded 4)
    #[inline]
    pub fn beats_per_bar(&self) -> u64 {
        self.time_signature.numerator as u64
    }

    /// Ticks per bar at this time signature
    #[inline]
    pub fn ticks_per_bar(&self) -> u64 {
        self.ticks_per_beat() * self.beats_per_bar()
    }

    /// Ticks per second at the current tempo
    #[inline]
    pub fn ticks_per_second(&self) -> f64 {
        self.tempo * self.ticks_per_beat() as f64 / 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_per_bar_respects_numerator() {
        let waltz = TimelineSettings::new(120.0, TimeSignature::WALTZ);
        assert_eq!(waltz.ticks_per_beat(), 960);
        assert_eq!(waltz.ticks_per_bar(), 2880);

        let common = TimelineSettings::default();
        assert_eq!(common.ticks_per_bar(), 3840);
    }

    #[test]
    fn test_ticks_per_beat_from_denominator() {
        let six_eight = TimelineSettings::new(120.0, TimeSignature::new(6, 8));
        assert_eq!(six_eight.ticks_per_beat(), 480);
        assert_eq!(six_eight.ticks_per_bar(), 2880);
        assert!(six_eight.time_signature().is_compound());
    }

    #[test]
    fn test_ppq_and_grid_setters_bound_input() {
        let mut settings = TimelineSettings::default();

        settings.set_ppq(480);
        assert_eq!(settings.ppq(), 480);
        settings.set_ppq(0);
        assert_eq!(settings.ppq(), 1);

        settings.set_grid(0.25);
        assert_eq!(settings.grid(), 0.25);
        settings.set_grid(-2.0);
        assert_eq!(settings.grid(), 0.0);
    }

    #[test]
    fn test_tempo_clamped() {
        let mut settings = TimelineSettings::default();
        settings.set_tempo(5000.0);
        assert_eq!(settings.tempo(), MAX_TEMPO);
        settings.set_tempo(1.0);
        assert_eq!(settings.tempo(), MIN_TEMPO);
    }
}
