//! Project Serialization
//!
//! Plain-data JSON representation of the timeline tree (settings, tracks,
//! clips, automation lanes). Serialization is pure: no file I/O, no side
//! effects. Structural invariants (non-overlapping clips, sorted automation
//! nodes) are re-validated on load so a corrupt document never becomes live
//! state.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use bl_core::{BlError, BlResult, TimelineSettings};

use crate::track::{Track, TrackId};

/// Current project schema version
pub const PROJECT_VERSION: u32 = 1;

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Project metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMeta {
    /// Schema version
    pub version: u32,
    /// Project name
    pub name: String,
    /// Creation timestamp (Unix ms)
    pub created_at: u64,
    /// Last modified timestamp (Unix ms)
    pub modified_at: u64,
}

impl Default for ProjectMeta {
    fn default() -> Self {
        let now = current_timestamp();
        Self {
            version: PROJECT_VERSION,
            name: "Untitled Project".to_string(),
            created_at: now,
            modified_at: now,
        }
    }
}

impl ProjectMeta {
    /// Update modified timestamp
    pub fn touch(&mut self) {
        self.modified_at = current_timestamp();
    }
}

/// Complete timeline state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    pub meta: ProjectMeta,
    pub settings: TimelineSettings,
    pub tracks: Vec<Track>,
}

impl Project {
    /// Create new project with name
    pub fn new(name: &str) -> Self {
        Self {
            meta: ProjectMeta {
                name: name.to_string(),
                ..ProjectMeta::default()
            },
            settings: TimelineSettings::default(),
            tracks: Vec::new(),
        }
    }

    /// Touch modified timestamp
    pub fn touch(&mut self) {
        self.meta.touch();
    }

    /// Add a track, returning its id
    pub fn add_track(&mut self, track: Track) -> TrackId {
        let id = track.id;
        self.tracks.push(track);
        id
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    /// Remove a track
    pub fn remove_track(&mut self, id: TrackId) -> BlResult<Track> {
        let idx = self
            .tracks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| BlError::State(format!("no track with id {}", id.0)))?;
        Ok(self.tracks.remove(idx))
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> BlResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| BlError::Serialization(e.to_string()))
    }

    /// Deserialize from JSON, re-checking structural invariants
    pub fn from_json(json: &str) -> BlResult<Self> {
        let project: Self =
            serde_json::from_str(json).map_err(|e| BlError::Serialization(e.to_string()))?;

        if project.meta.version > PROJECT_VERSION {
            return Err(BlError::Serialization(format!(
                "project version {} is newer than supported version {}",
                project.meta.version, PROJECT_VERSION
            )));
        }

        project.validate()?;
        Ok(project)
    }

    /// Check every track's clip and automation invariants
    pub fn validate(&self) -> BlResult<()> {
        for track in &self.tracks {
            track.validate(&self.settings)?;
        }
        Ok(())
    }
}
