//! Parameter Automation
//!
//! Per-track, per-parameter automation curves:
//! - Nodes kept sorted ascending by position, unique positions
//! - Linear interpolation between bracketing nodes
//! - Volume curves blend in the linear-gain domain so `-inf dB` nodes
//!   interpolate to finite values everywhere except the node itself
//! - Off/Read/Write/Touch/Latch recording modes driven by external
//!   gesture and playback signals

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use bl_core::{BlError, BlResult, Decibels, MusicalPosition, TimelineSettings};
use bl_core::{MAX_TEMPO, MIN_TEMPO};

static NEXT_LANE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Lane ID
pub type LaneId = u64;

/// Node ID
pub type NodeId = u64;

fn new_lane_id() -> LaneId {
    NEXT_LANE_ID.fetch_add(1, Ordering::Relaxed)
}

fn new_node_id() -> NodeId {
    NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Automatable parameter (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutomationParameter {
    /// Track volume in dB; additionally accepts `-inf`
    Volume,
    /// Stereo balance, -1.0 (left) to 1.0 (right)
    Pan,
    /// Send level, normalized
    Send,
    /// Filter amount, normalized (1.0 = open)
    Filter,
    /// Tempo in BPM
    Tempo,
    /// Generic effect parameter, normalized
    Effect,
}

impl AutomationParameter {
    /// Value range for this parameter
    pub fn range(&self) -> (f64, f64) {
        match self {
            Self::Volume => (-90.0, 6.0),
            Self::Pan => (-1.0, 1.0),
            Self::Send => (0.0, 1.0),
            Self::Filter => (0.0, 1.0),
            Self::Tempo => (MIN_TEMPO, MAX_TEMPO),
            Self::Effect => (0.0, 1.0),
        }
    }

    /// Default baseline returned by an empty lane
    pub fn baseline(&self) -> f64 {
        match self {
            Self::Volume => 0.0, // unity gain
            Self::Pan => 0.0,    // center
            Self::Send => 0.0,
            Self::Filter => 1.0, // open
            Self::Tempo => 120.0,
            Self::Effect => 0.0,
        }
    }
}

/// A (position, value) anchor point on an automation curve
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AutomationNode {
    pub id: NodeId,
    pub position: MusicalPosition,
    pub value: f64,
}

/// Automation lane for a single parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationLane {
    pub id: LaneId,
    pub parameter: AutomationParameter,
    pub enabled: bool,
    pub min_value: f64,
    pub max_value: f64,
    nodes: Vec<AutomationNode>,
}

impl AutomationLane {
    pub fn new(parameter: AutomationParameter) -> Self {
        let (min_value, max_value) = parameter.range();
        Self {
            id: new_lane_id(),
            parameter,
            enabled: true,
            min_value,
            max_value,
            nodes: Vec::new(),
        }
    }

    /// Nodes in position order
    pub fn nodes(&self) -> &[AutomationNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Clamp a value into the lane range
    ///
    /// Volume lanes additionally permit `-inf` (silence). Out-of-range
    /// writes are clamped, never rejected, so playback never stalls.
    fn clamp(&self, value: f64) -> f64 {
        if self.parameter == AutomationParameter::Volume && value == f64::NEG_INFINITY {
            return value;
        }
        let clamped = value.clamp(self.min_value, self.max_value);
        if clamped != value {
            log::warn!(
                "automation value {} outside [{}, {}], clamped",
                value,
                self.min_value,
                self.max_value
            );
        }
        clamped
    }

    /// Add a node, replacing any node already at that position
    pub fn add_node(
        &mut self,
        position: MusicalPosition,
        value: f64,
        settings: &TimelineSettings,
    ) -> NodeId {
        let value = self.clamp(value);
        let tick = position.to_ticks(settings);

        match self
            .nodes
            .binary_search_by_key(&tick, |n| n.position.to_ticks(settings))
        {
            Ok(idx) => {
                self.nodes[idx].value = value;
                self.nodes[idx].id
            }
            Err(idx) => {
                let node = AutomationNode {
                    id: new_node_id(),
                    position,
                    value,
                };
                let id = node.id;
                self.nodes.insert(idx, node);
                id
            }
        }
    }

    /// Remove a node; neighbors are unaffected
    pub fn delete_node(&mut self, id: NodeId) -> BlResult<AutomationNode> {
        let idx = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| BlError::State(format!("no automation node with id {id}")))?;
        Ok(self.nodes.remove(idx))
    }

    /// Remove nodes strictly inside the half-open tick range
    fn remove_nodes_in(&mut self, start_ticks: u64, end_ticks: u64, settings: &TimelineSettings) {
        self.nodes.retain(|n| {
            let t = n.position.to_ticks(settings);
            t < start_ticks || t >= end_ticks
        });
    }

    /// Interpolated value at a position
    ///
    /// Before the first node the first value holds; at/after the last node
    /// the last value holds; an empty lane yields the parameter baseline.
    pub fn value_at(&self, position: &MusicalPosition, settings: &TimelineSettings) -> f64 {
        if self.nodes.is_empty() {
            return self.parameter.baseline();
        }

        let tick = position.to_ticks(settings);
        let idx = match self
            .nodes
            .binary_search_by_key(&tick, |n| n.position.to_ticks(settings))
        {
            Ok(idx) => return self.nodes[idx].value,
            Err(idx) => idx,
        };

        if idx == 0 {
            return self.nodes[0].value;
        }
        if idx >= self.nodes.len() {
            return self.nodes[self.nodes.len() - 1].value;
        }

        let lower = &self.nodes[idx - 1];
        let upper = &self.nodes[idx];
        let lower_tick = lower.position.to_ticks(settings);
        let upper_tick = upper.position.to_ticks(settings);
        let frac = (tick - lower_tick) as f64 / (upper_tick - lower_tick) as f64;

        if self.parameter == AutomationParameter::Volume {
            // Blend volume in the linear-gain domain so a -inf endpoint
            // stays finite until the node itself
            let g1 = Decibels(lower.value).to_gain();
            let g2 = Decibels(upper.value).to_gain();
            Decibels::from_gain(g1 + frac * (g2 - g1)).0
        } else {
            lower.value + frac * (upper.value - lower.value)
        }
    }

    /// Check the sorted/unique-position invariant
    pub fn validate(&self, settings: &TimelineSettings) -> BlResult<()> {
        for pair in self.nodes.windows(2) {
            if pair[0].position.to_ticks(settings) >= pair[1].position.to_ticks(settings) {
                return Err(BlError::Validation(format!(
                    "automation nodes {} and {} out of order",
                    pair[0].id, pair[1].id
                )));
            }
        }
        Ok(())
    }
}

/// Automation mode: read existing automation or record live input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AutomationMode {
    /// Lane ignored entirely
    Off,
    /// Playback reads the curve, never mutates it
    #[default]
    Read,
    /// Live parameter changes are recorded continuously
    Write,
    /// Reads until a touch gesture begins, writes until it ends
    Touch,
    /// Like Touch, but keeps writing until playback stops
    Latch,
}

/// Per-lane recording state machine
///
/// Transitions are driven externally by gesture and playback signals; the
/// recorder itself only decides whether a given playhead step reads or
/// writes. Writes arrive in non-decreasing position order as the playhead
/// advances, so inserts hit the append fast path and nodes the playhead
/// passed since the previous write are overwritten.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutomationRecorder {
    mode: AutomationMode,
    touching: bool,
    latched: bool,
    last_written_tick: Option<u64>,
}

impl AutomationRecorder {
    pub fn new(mode: AutomationMode) -> Self {
        Self {
            mode,
            touching: false,
            latched: false,
            last_written_tick: None,
        }
    }

    pub fn mode(&self) -> AutomationMode {
        self.mode
    }

    /// Change mode, resetting any in-flight gesture state
    pub fn set_mode(&mut self, mode: AutomationMode) {
        self.mode = mode;
        self.touching = false;
        self.latched = false;
        self.last_written_tick = None;
    }

    /// A touch gesture began
    pub fn touch_begin(&mut self) {
        self.touching = true;
        if self.mode == AutomationMode::Latch {
            self.latched = true;
        }
    }

    /// The touch gesture ended
    pub fn touch_end(&mut self) {
        self.touching = false;
        // A latched pass keeps writing, so its overwrite window stays open
        if !self.is_writing() {
            self.last_written_tick = None;
        }
    }

    /// The current playback pass stopped
    pub fn playback_stopped(&mut self) {
        self.latched = false;
        self.last_written_tick = None;
    }

    /// Whether the next playhead step records live input
    pub fn is_writing(&self) -> bool {
        match self.mode {
            AutomationMode::Off | AutomationMode::Read => false,
            AutomationMode::Write => true,
            AutomationMode::Touch => self.touching,
            AutomationMode::Latch => self.touching || self.latched,
        }
    }

    /// Process one playhead step
    ///
    /// Returns the effective parameter value at `position`, or `None` when
    /// the lane is ignored (`Off` mode or disabled lane). In a writing
    /// state, a live value is recorded and nodes passed since the previous
    /// write are overwritten.
    pub fn process(
        &mut self,
        lane: &mut AutomationLane,
        position: &MusicalPosition,
        live_value: Option<f64>,
        settings: &TimelineSettings,
    ) -> Option<f64> {
        if self.mode == AutomationMode::Off || !lane.enabled {
            return None;
        }

        if self.is_writing() {
            if let Some(value) = live_value {
                let tick = position.to_ticks(settings);
                if let Some(last) = self.last_written_tick {
                    if tick > last {
                        // Overwrite nodes the playhead passed, keeping the
                        // node written at the previous step
                        lane.remove_nodes_in(last + 1, tick, settings);
                    }
                }
                lane.add_node(*position, value, settings);
                self.last_written_tick = Some(tick);
                return Some(lane.value_at(position, settings));
            }
        }

        Some(lane.value_at(position, settings))
    }
}
