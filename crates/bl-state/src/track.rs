//! Timeline Tracks
//!
//! A track exclusively owns its clip arrangement and automation lanes.
//! Ownership is tree-shaped (Track → Clip / AutomationLane → Node), so
//! editing operations never need cross-track arbitration.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use bl_core::{BlError, BlResult, MusicalPosition, TimelineSettings};

use crate::automation::{AutomationLane, AutomationParameter, LaneId};
use crate::clip::ClipArrangement;

static NEXT_TRACK_ID: AtomicU64 = AtomicU64::new(1);

/// Unique track identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub u64);

fn new_track_id() -> TrackId {
    TrackId(NEXT_TRACK_ID.fetch_add(1, Ordering::Relaxed))
}

/// A timeline track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Unique identifier
    pub id: TrackId,
    /// Track name
    pub name: String,
    /// Track color (RGB)
    pub color: u32,
    /// Mute state
    pub muted: bool,
    /// Solo state
    pub soloed: bool,
    /// Armed for recording
    pub armed: bool,
    /// Clips on this track
    pub clips: ClipArrangement,
    /// Automation lanes
    pub lanes: Vec<AutomationLane>,
}

impl Track {
    pub fn new(name: &str) -> Self {
        Self {
            id: new_track_id(),
            name: name.to_string(),
            color: 0x4a9eff,
            muted: false,
            soloed: false,
            armed: false,
            clips: ClipArrangement::new(),
            lanes: Vec::new(),
        }
    }

    /// Add an automation lane for a parameter
    pub fn add_lane(&mut self, parameter: AutomationParameter) -> LaneId {
        let lane = AutomationLane::new(parameter);
        let id = lane.id;
        self.lanes.push(lane);
        id
    }

    pub fn lane(&self, id: LaneId) -> Option<&AutomationLane> {
        self.lanes.iter().find(|l| l.id == id)
    }

    pub fn lane_mut(&mut self, id: LaneId) -> Option<&mut AutomationLane> {
        self.lanes.iter_mut().find(|l| l.id == id)
    }

    /// Remove an automation lane
    pub fn remove_lane(&mut self, id: LaneId) -> BlResult<AutomationLane> {
        let idx = self
            .lanes
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| BlError::State(format!("no automation lane with id {id}")))?;
        Ok(self.lanes.remove(idx))
    }

    /// Interpolated value of a lane at a playback position
    pub fn lane_value_at(
        &self,
        id: LaneId,
        position: &MusicalPosition,
        settings: &TimelineSettings,
    ) -> BlResult<f64> {
        let lane = self
            .lane(id)
            .ok_or_else(|| BlError::State(format!("no automation lane with id {id}")))?;
        Ok(lane.value_at(position, settings))
    }

    /// Check clip and lane invariants
    pub fn validate(&self, settings: &TimelineSettings) -> BlResult<()> {
        self.clips.validate(settings)?;
        for lane in &self.lanes {
            lane.validate(settings)?;
        }
        Ok(())
    }
}
