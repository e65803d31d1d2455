//! Musical Position Arithmetic
//!
//! Bar/beat/tick positions with exact, drift-free conversion:
//! - Canonical absolute-tick representation for comparison and snapping
//! - Bars/beats/ticks ↔ ticks ↔ seconds round-tripping
//! - Grid snapping (floor/ceil/round)
//!
//! Every operation takes the `TimelineSettings` it converts under; there is
//! no ambient tempo or time signature. Positions are immutable values and
//! every operation returns a new, normalized instance
//! (`0 <= tick < ticks_per_beat`, `0 <= beat < beats_per_bar`).
//!
//! Integer ticks are the source of truth. Scheduling and overlap decisions
//! compare tick counts, never floats, so repeated snap/compare cycles are
//! bit-exact.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::settings::TimelineSettings;

/// Snap rounding direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SnapDirection {
    Floor,
    Ceil,
    #[default]
    Round,
}

/// Musical position (bars, beats, ticks), 0-indexed internally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MusicalPosition {
    /// Bar number
    pub bar: u32,
    /// Beat within bar
    pub beat: u32,
    /// Tick within beat
    pub tick: u32,
}

impl MusicalPosition {
    pub const ZERO: Self = Self {
        bar: 0,
        beat: 0,
        tick: 0,
    };

    pub fn new(bar: u32, beat: u32, tick: u32) -> Self {
        Self { bar, beat, tick }
    }

    /// Canonical absolute tick count:
    /// `bar * beats_per_bar * ticks_per_beat + beat * ticks_per_beat + tick`
    #[inline]
    pub fn to_ticks(&self, settings: &TimelineSettings) -> u64 {
        self.bar as u64 * settings.ticks_per_bar()
            + self.beat as u64 * settings.ticks_per_beat()
            + self.tick as u64
    }

    /// Inverse of [`to_ticks`](Self::to_ticks), via successive floor division
    pub fn from_ticks(ticks: u64, settings: &TimelineSettings) -> Self {
        let ticks_per_bar = settings.ticks_per_bar();
        let ticks_per_beat = settings.ticks_per_beat();

        let bar = ticks / ticks_per_bar;
        let remaining = ticks % ticks_per_bar;
        let beat = remaining / ticks_per_beat;
        let tick = remaining % ticks_per_beat;

        Self {
            bar: bar as u32,
            beat: beat as u32,
            tick: tick as u32,
        }
    }

    /// Add component deltas, carrying tick overflow into beats and beat
    /// overflow into bars
    pub fn add(&self, bars: u32, beats: u32, ticks: u32, settings: &TimelineSettings) -> Self {
        let ticks_per_beat = settings.ticks_per_beat();
        let beats_per_bar = settings.beats_per_bar();

        let tick = self.tick as u64 + ticks as u64;
        let beat = self.beat as u64 + beats as u64 + tick / ticks_per_beat;
        let bar = self.bar as u64 + bars as u64 + beat / beats_per_bar;

        Self {
            bar: bar as u32,
            beat: (beat % beats_per_bar) as u32,
            tick: (tick % ticks_per_beat) as u32,
        }
    }

    /// Subtract another position, clamping at zero (never negative)
    pub fn saturating_sub(&self, other: &Self, settings: &TimelineSettings) -> Self {
        let ticks = self
            .to_ticks(settings)
            .saturating_sub(other.to_ticks(settings));
        Self::from_ticks(ticks, settings)
    }

    /// Total order consistent with [`to_ticks`](Self::to_ticks)
    #[inline]
    pub fn compare(&self, other: &Self, settings: &TimelineSettings) -> Ordering {
        self.to_ticks(settings).cmp(&other.to_ticks(settings))
    }

    /// Absolute time in seconds at the settings' tempo
    #[inline]
    pub fn to_seconds(&self, settings: &TimelineSettings) -> f64 {
        self.to_ticks(settings) as f64 / settings.ticks_per_second()
    }

    /// Position at an absolute time in seconds at the settings' tempo
    pub fn from_seconds(seconds: f64, settings: &TimelineSettings) -> Self {
        let ticks = (seconds * settings.ticks_per_second()).round().max(0.0) as u64;
        Self::from_ticks(ticks, settings)
    }

    /// Snap to the nearest multiple of `grid_beats` beats
    ///
    /// A grid of zero or less is a no-op and returns an equal copy.
    pub fn snap(
        &self,
        grid_beats: f64,
        direction: SnapDirection,
        settings: &TimelineSettings,
    ) -> Self {
        let grid_ticks = grid_beats * settings.ticks_per_beat() as f64;
        if grid_ticks <= 0.0 {
            return *self;
        }

        let steps = self.to_ticks(settings) as f64 / grid_ticks;
        let snapped = match direction {
            SnapDirection::Floor => steps.floor(),
            SnapDirection::Ceil => steps.ceil(),
            SnapDirection::Round => steps.round(),
        };

        Self::from_ticks((snapped * grid_ticks).round() as u64, settings)
    }

    /// Snap to the settings' configured grid unit
    #[inline]
    pub fn snap_to_grid(&self, direction: SnapDirection, settings: &TimelineSettings) -> Self {
        self.snap(settings.grid(), direction, settings)
    }

    /// Display format: "Bar.Beat.Tick" (1-indexed)
    pub fn to_display_string(&self) -> String {
        format!("{}.{}.{:03}", self.bar + 1, self.beat + 1, self.tick)
    }

    /// Parse from display string
    pub fn from_display_string(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return None;
        }

        let bar = parts[0].parse::<u32>().ok()?.checked_sub(1)?;
        let beat = parts[1].parse::<u32>().ok()?.checked_sub(1)?;
        let tick = parts[2].parse::<u32>().ok()?;

        Some(Self { bar, beat, tick })
    }
}
