//! Clip Arrangement for Timeline Tracks
//!
//! Per-track clip management:
//! - Non-destructive move, resize, split, duplicate, consolidate
//! - Deterministic overlap resolution (later placements win)
//! - Half-open `[start, end)` intervals compared in absolute ticks
//!
//! After any successful operation, no two clips on a track overlap. Content
//! is an opaque reference owned by an external collaborator; this module
//! only tracks the reference and the offset into it.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use bl_core::{BlError, BlResult, MusicalPosition, TimelineSettings};

/// Unique clip ID generator
static NEXT_CLIP_ID: AtomicU64 = AtomicU64::new(1);

/// Clip ID (timeline item)
pub type ClipId = u64;

fn new_clip_id() -> ClipId {
    NEXT_CLIP_ID.fetch_add(1, Ordering::Relaxed)
}

/// A placed, time-bounded reference to content on a track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    /// Unique clip ID
    pub id: ClipId,
    /// Display name
    pub name: String,
    /// Start position (inclusive)
    pub start: MusicalPosition,
    /// End position (exclusive)
    pub end: MusicalPosition,
    /// Loop boundary within the clip, if looped
    pub loop_end: Option<MusicalPosition>,
    /// Earliest position the start may be dragged to
    pub start_limit: Option<MusicalPosition>,
    /// Latest position the end may be dragged to
    pub end_limit: Option<MusicalPosition>,
    /// Muted
    pub muted: bool,
    /// Locked (prevent editing)
    pub locked: bool,
    /// Opaque reference to external content
    pub content_id: Option<u64>,
    /// Offset into the source content (ticks)
    pub offset_ticks: u64,
}

impl Clip {
    pub fn new(name: &str, start: MusicalPosition, end: MusicalPosition) -> Self {
        Self {
            id: new_clip_id(),
            name: name.to_string(),
            start,
            end,
            loop_end: None,
            start_limit: None,
            end_limit: None,
            muted: false,
            locked: false,
            content_id: None,
            offset_ticks: 0,
        }
    }

    /// Length in ticks
    pub fn duration_ticks(&self, settings: &TimelineSettings) -> u64 {
        self.end
            .to_ticks(settings)
            .saturating_sub(self.start.to_ticks(settings))
    }

    /// Check if position is within `[start, end)`
    pub fn contains(&self, pos: &MusicalPosition, settings: &TimelineSettings) -> bool {
        let t = pos.to_ticks(settings);
        t >= self.start.to_ticks(settings) && t < self.end.to_ticks(settings)
    }

    /// Check if the clip intersects the half-open tick range
    pub fn overlaps(&self, start_ticks: u64, end_ticks: u64, settings: &TimelineSettings) -> bool {
        self.start.to_ticks(settings) < end_ticks && self.end.to_ticks(settings) > start_ticks
    }
}

/// Ordered, non-overlapping set of clips on one track
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClipArrangement {
    clips: Vec<Clip>,
}

impl ClipArrangement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Clips in start order
    pub fn iter(&self) -> impl Iterator<Item = &Clip> {
        self.clips.iter()
    }

    pub fn get(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    fn get_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == id)
    }

    fn require(&self, id: ClipId) -> BlResult<&Clip> {
        self.get(id)
            .ok_or_else(|| BlError::State(format!("no clip with id {id}")))
    }

    /// The non-muted clip active at a playback position, if any
    pub fn clip_at(&self, pos: &MusicalPosition, settings: &TimelineSettings) -> Option<&Clip> {
        self.clips
            .iter()
            .find(|c| !c.muted && c.contains(pos, settings))
    }

    /// Insert a clip, resolving overlaps with existing clips
    ///
    /// Existing content fully inside the new interval is deleted; content
    /// that sticks out on one side is truncated to that side; content that
    /// sticks out on both sides is split into the two remainders.
    pub fn insert(&mut self, clip: Clip, settings: &TimelineSettings) -> BlResult<ClipId> {
        let start_ticks = clip.start.to_ticks(settings);
        let end_ticks = clip.end.to_ticks(settings);
        if start_ticks >= end_ticks {
            return Err(BlError::Validation(format!(
                "inverted clip interval: [{}, {})",
                clip.start.to_display_string(),
                clip.end.to_display_string()
            )));
        }

        self.resolve_overlaps(start_ticks, end_ticks, settings);

        let id = clip.id;
        let idx = self.insertion_index(start_ticks, settings);
        self.clips.insert(idx, clip);
        log::debug!("inserted clip {} at [{}, {})", id, start_ticks, end_ticks);
        Ok(id)
    }

    /// Move a clip to a new start, preserving its length
    pub fn move_clip(
        &mut self,
        id: ClipId,
        new_start: MusicalPosition,
        settings: &TimelineSettings,
    ) -> BlResult<()> {
        let clip = self.require(id)?;
        if clip.locked {
            return Err(BlError::Validation(format!("clip {id} is locked")));
        }

        let duration = clip.duration_ticks(settings);
        let new_start_ticks = new_start.to_ticks(settings);

        // Delete-then-insert keeps the overlap rule in one place
        let mut clip = self.delete(id)?;
        clip.start = new_start;
        clip.end = MusicalPosition::from_ticks(new_start_ticks + duration, settings);
        self.insert(clip, settings)?;
        Ok(())
    }

    /// Resize a clip to a new interval
    ///
    /// Rejected without state change if the interval is inverted. Limits, if
    /// present, bound how far either edge may be dragged. Moving the start
    /// edge shifts the content offset so the underlying content stays put.
    pub fn resize(
        &mut self,
        id: ClipId,
        new_start: MusicalPosition,
        new_end: MusicalPosition,
        settings: &TimelineSettings,
    ) -> BlResult<()> {
        let clip = self.require(id)?;
        if clip.locked {
            return Err(BlError::Validation(format!("clip {id} is locked")));
        }

        let mut start_ticks = new_start.to_ticks(settings);
        let mut end_ticks = new_end.to_ticks(settings);
        if start_ticks >= end_ticks {
            return Err(BlError::Validation(format!(
                "inverted resize interval: [{}, {})",
                new_start.to_display_string(),
                new_end.to_display_string()
            )));
        }

        if let Some(limit) = &clip.start_limit {
            start_ticks = start_ticks.max(limit.to_ticks(settings));
        }
        if let Some(limit) = &clip.end_limit {
            end_ticks = end_ticks.min(limit.to_ticks(settings));
        }
        if start_ticks >= end_ticks {
            return Err(BlError::Validation(
                "resize interval collapsed by clip limits".to_string(),
            ));
        }

        let old_start_ticks = clip.start.to_ticks(settings);

        let mut clip = self.delete(id)?;
        clip.offset_ticks = shift_offset(clip.offset_ticks, old_start_ticks, start_ticks);
        clip.start = MusicalPosition::from_ticks(start_ticks, settings);
        clip.end = MusicalPosition::from_ticks(end_ticks, settings);
        self.insert(clip, settings)?;
        Ok(())
    }

    /// Split a clip at a position strictly inside it
    ///
    /// Returns the (left, right) clip ids. The left clip keeps the original
    /// id; the right clip gets a fresh id and its content offset advanced so
    /// playback stays continuous across the split point.
    pub fn split(
        &mut self,
        id: ClipId,
        position: MusicalPosition,
        settings: &TimelineSettings,
    ) -> BlResult<(ClipId, ClipId)> {
        let idx = self
            .clips
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| BlError::State(format!("no clip with id {id}")))?;
        let clip = &self.clips[idx];
        let at = position.to_ticks(settings);
        let start_ticks = clip.start.to_ticks(settings);
        let end_ticks = clip.end.to_ticks(settings);
        if at <= start_ticks || at >= end_ticks {
            return Err(BlError::Validation(format!(
                "split position {} outside clip ({}, {})",
                position.to_display_string(),
                clip.start.to_display_string(),
                clip.end.to_display_string()
            )));
        }
        let mut right = self.clips[idx].clone();
        right.id = new_clip_id();
        right.start = position;
        right.offset_ticks += at - start_ticks;

        self.clips[idx].end = position;
        self.clips[idx].loop_end = None;

        let right_id = right.id;
        self.clips.insert(idx + 1, right);
        Ok((id, right_id))
    }

    /// Duplicate a clip at a caller-specified start, or adjacent to the
    /// original if none is given
    pub fn duplicate(
        &mut self,
        id: ClipId,
        at: Option<MusicalPosition>,
        settings: &TimelineSettings,
    ) -> BlResult<ClipId> {
        let source = self.require(id)?;
        let duration = source.duration_ticks(settings);
        let start = at.unwrap_or(source.end);
        let start_ticks = start.to_ticks(settings);

        let mut copy = source.clone();
        copy.id = new_clip_id();
        copy.start = start;
        copy.end = MusicalPosition::from_ticks(start_ticks + duration, settings);
        self.insert(copy, settings)
    }

    /// Replace the selected clips with one clip spanning their bounds
    ///
    /// Content materialization is delegated to an external collaborator;
    /// this only computes the resulting interval and removes the sources.
    pub fn consolidate(
        &mut self,
        ids: &[ClipId],
        settings: &TimelineSettings,
    ) -> BlResult<ClipId> {
        if ids.is_empty() {
            return Err(BlError::Validation("nothing to consolidate".to_string()));
        }

        // Validate the whole selection before touching state; a repeated id
        // collapses to one, an unknown id rejects with nothing removed
        let mut selected: Vec<ClipId> = Vec::with_capacity(ids.len());
        let mut start_ticks = u64::MAX;
        let mut end_ticks = 0u64;
        let mut name = String::new();
        for &id in ids {
            let clip = self.require(id)?;
            if selected.contains(&id) {
                continue;
            }
            start_ticks = start_ticks.min(clip.start.to_ticks(settings));
            end_ticks = end_ticks.max(clip.end.to_ticks(settings));
            if name.is_empty() {
                name = clip.name.clone();
            }
            selected.push(id);
        }

        self.clips.retain(|c| !selected.contains(&c.id));

        let merged = Clip::new(
            &name,
            MusicalPosition::from_ticks(start_ticks, settings),
            MusicalPosition::from_ticks(end_ticks, settings),
        );
        self.insert(merged, settings)
    }

    /// Remove a clip
    pub fn delete(&mut self, id: ClipId) -> BlResult<Clip> {
        let idx = self
            .clips
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| BlError::State(format!("no clip with id {id}")))?;
        Ok(self.clips.remove(idx))
    }

    /// Flip the mute flag; no interval effect
    pub fn toggle_mute(&mut self, id: ClipId) -> BlResult<bool> {
        let clip = self
            .get_mut(id)
            .ok_or_else(|| BlError::State(format!("no clip with id {id}")))?;
        clip.muted = !clip.muted;
        Ok(clip.muted)
    }

    /// Check the non-overlap and start-order invariants
    pub fn validate(&self, settings: &TimelineSettings) -> BlResult<()> {
        for pair in self.clips.windows(2) {
            let prev_end = pair[0].end.to_ticks(settings);
            let next_start = pair[1].start.to_ticks(settings);
            if next_start < prev_end {
                return Err(BlError::Validation(format!(
                    "clips {} and {} overlap",
                    pair[0].id, pair[1].id
                )));
            }
        }
        Ok(())
    }

    fn insertion_index(&self, start_ticks: u64, settings: &TimelineSettings) -> usize {
        self.clips
            .partition_point(|c| c.start.to_ticks(settings) < start_ticks)
    }

    /// Carve the `[start_ticks, end_ticks)` range out of the existing clips
    fn resolve_overlaps(&mut self, start_ticks: u64, end_ticks: u64, settings: &TimelineSettings) {
        let mut remainders = Vec::new();

        self.clips.retain_mut(|existing| {
            if !existing.overlaps(start_ticks, end_ticks, settings) {
                return true; // disjoint
            }
            let ex_start = existing.start.to_ticks(settings);
            let ex_end = existing.end.to_ticks(settings);

            if ex_start >= start_ticks && ex_end <= end_ticks {
                log::debug!("clip {} fully covered, removed", existing.id);
                return false;
            }

            if ex_start < start_ticks && ex_end > end_ticks {
                // Sticks out on both sides: keep the left part, spawn the right
                let mut right = existing.clone();
                right.id = new_clip_id();
                right.start = MusicalPosition::from_ticks(end_ticks, settings);
                right.offset_ticks += end_ticks - ex_start;
                remainders.push(right);

                existing.end = MusicalPosition::from_ticks(start_ticks, settings);
                return true;
            }

            if ex_start < start_ticks {
                // Overhangs on the left: keep everything before the new clip
                existing.end = MusicalPosition::from_ticks(start_ticks, settings);
            } else {
                // Overhangs on the right: keep everything after the new clip
                existing.offset_ticks += end_ticks - ex_start;
                existing.start = MusicalPosition::from_ticks(end_ticks, settings);
            }
            true
        });

        for right in remainders {
            let idx = self.insertion_index(right.start.to_ticks(settings), settings);
            self.clips.insert(idx, right);
        }
    }
}

/// Shift a content offset by the movement of the clip's start edge
fn shift_offset(offset: u64, old_start_ticks: u64, new_start_ticks: u64) -> u64 {
    if new_start_ticks >= old_start_ticks {
        offset + (new_start_ticks - old_start_ticks)
    } else {
        offset.saturating_sub(old_start_ticks - new_start_ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bl_core::TimeSignature;

    fn settings() -> TimelineSettings {
        let mut s = TimelineSettings::new(120.0, TimeSignature::COMMON);
        s.set_ppq(480);
        s
    }

    fn pos(ticks: u64, s: &TimelineSettings) -> MusicalPosition {
        MusicalPosition::from_ticks(ticks, s)
    }

    fn ranges(arr: &ClipArrangement, s: &TimelineSettings) -> Vec<(u64, u64)> {
        arr.iter()
            .map(|c| (c.start.to_ticks(s), c.end.to_ticks(s)))
            .collect()
    }

    #[test]
    fn test_insert_truncates_partial_overlap() {
        // [0,100) + insert [50,150) => [0,50), [50,150)
        let s = settings();
        let mut arr = ClipArrangement::new();
        arr.insert(Clip::new("a", pos(0, &s), pos(100, &s)), &s).unwrap();
        arr.insert(Clip::new("b", pos(50, &s), pos(150, &s)), &s).unwrap();

        assert_eq!(ranges(&arr, &s), vec![(0, 50), (50, 150)]);
        arr.validate(&s).unwrap();
    }

    #[test]
    fn test_insert_removes_covered_clip() {
        let s = settings();
        let mut arr = ClipArrangement::new();
        arr.insert(Clip::new("a", pos(100, &s), pos(200, &s)), &s).unwrap();
        let big = arr
            .insert(Clip::new("b", pos(0, &s), pos(400, &s)), &s)
            .unwrap();

        assert_eq!(arr.len(), 1);
        assert_eq!(arr.iter().next().unwrap().id, big);
    }

    #[test]
    fn test_insert_splits_containing_clip() {
        let s = settings();
        let mut arr = ClipArrangement::new();
        let mut host = Clip::new("a", pos(0, &s), pos(400, &s));
        host.content_id = Some(7);
        arr.insert(host, &s).unwrap();

        arr.insert(Clip::new("b", pos(100, &s), pos(200, &s)), &s).unwrap();

        assert_eq!(ranges(&arr, &s), vec![(0, 100), (100, 200), (200, 400)]);
        let right = arr.iter().last().unwrap();
        assert_eq!(right.content_id, Some(7));
        assert_eq!(right.offset_ticks, 200);
        arr.validate(&s).unwrap();
    }

    #[test]
    fn test_insert_truncates_right_overhang() {
        // New clip covers the head of an existing clip
        let s = settings();
        let mut arr = ClipArrangement::new();
        arr.insert(Clip::new("a", pos(100, &s), pos(300, &s)), &s).unwrap();
        arr.insert(Clip::new("b", pos(0, &s), pos(200, &s)), &s).unwrap();

        assert_eq!(ranges(&arr, &s), vec![(0, 200), (200, 300)]);
        assert_eq!(arr.iter().last().unwrap().offset_ticks, 100);
    }

    #[test]
    fn test_insert_rejects_inverted_interval() {
        let s = settings();
        let mut arr = ClipArrangement::new();
        let err = arr
            .insert(Clip::new("a", pos(100, &s), pos(100, &s)), &s)
            .unwrap_err();
        assert!(matches!(err, BlError::Validation(_)));
        assert!(arr.is_empty());
    }

    #[test]
    fn test_move_preserves_length_and_resolves_overlap() {
        let s = settings();
        let mut arr = ClipArrangement::new();
        let a = arr
            .insert(Clip::new("a", pos(0, &s), pos(100, &s)), &s)
            .unwrap();
        arr.insert(Clip::new("b", pos(200, &s), pos(300, &s)), &s).unwrap();

        arr.move_clip(a, pos(150, &s), &s).unwrap();
        assert_eq!(ranges(&arr, &s), vec![(150, 250), (250, 300)]);
        arr.validate(&s).unwrap();
    }

    #[test]
    fn test_resize_rejects_inverted_and_leaves_state() {
        let s = settings();
        let mut arr = ClipArrangement::new();
        let a = arr
            .insert(Clip::new("a", pos(0, &s), pos(100, &s)), &s)
            .unwrap();

        let err = arr.resize(a, pos(90, &s), pos(10, &s), &s).unwrap_err();
        assert!(matches!(err, BlError::Validation(_)));
        assert_eq!(ranges(&arr, &s), vec![(0, 100)]);
    }

    #[test]
    fn test_resize_shifts_content_offset() {
        let s = settings();
        let mut arr = ClipArrangement::new();
        let a = arr
            .insert(Clip::new("a", pos(100, &s), pos(300, &s)), &s)
            .unwrap();

        arr.resize(a, pos(150, &s), pos(300, &s), &s).unwrap();
        assert_eq!(arr.get(a).unwrap().offset_ticks, 50);

        arr.resize(a, pos(120, &s), pos(300, &s), &s).unwrap();
        assert_eq!(arr.get(a).unwrap().offset_ticks, 20);
    }

    #[test]
    fn test_resize_respects_limits() {
        let s = settings();
        let mut arr = ClipArrangement::new();
        let mut clip = Clip::new("a", pos(100, &s), pos(200, &s));
        clip.start_limit = Some(pos(80, &s));
        clip.end_limit = Some(pos(240, &s));
        let a = arr.insert(clip, &s).unwrap();

        arr.resize(a, pos(0, &s), pos(400, &s), &s).unwrap();
        assert_eq!(ranges(&arr, &s), vec![(80, 240)]);
    }

    #[test]
    fn test_split_partitions_exactly() {
        let s = settings();
        let mut arr = ClipArrangement::new();
        let a = arr
            .insert(Clip::new("a", pos(0, &s), pos(200, &s)), &s)
            .unwrap();

        let (left, right) = arr.split(a, pos(80, &s), &s).unwrap();
        assert_eq!(ranges(&arr, &s), vec![(0, 80), (80, 200)]);
        assert_eq!(left, a);
        assert_eq!(arr.get(right).unwrap().offset_ticks, 80);
        arr.validate(&s).unwrap();
    }

    #[test]
    fn test_split_rejects_boundaries() {
        let s = settings();
        let mut arr = ClipArrangement::new();
        let a = arr
            .insert(Clip::new("a", pos(0, &s), pos(200, &s)), &s)
            .unwrap();

        assert!(arr.split(a, pos(0, &s), &s).is_err());
        assert!(arr.split(a, pos(200, &s), &s).is_err());
        assert!(arr.split(a, pos(300, &s), &s).is_err());
        assert_eq!(arr.len(), 1);
    }

    #[test]
    fn test_duplicate_adjacent_by_default() {
        let s = settings();
        let mut arr = ClipArrangement::new();
        let a = arr
            .insert(Clip::new("a", pos(0, &s), pos(100, &s)), &s)
            .unwrap();

        let copy = arr.duplicate(a, None, &s).unwrap();
        assert_ne!(copy, a);
        assert_eq!(ranges(&arr, &s), vec![(0, 100), (100, 200)]);
    }

    #[test]
    fn test_consolidate_spans_bounds() {
        let s = settings();
        let mut arr = ClipArrangement::new();
        let a = arr
            .insert(Clip::new("a", pos(0, &s), pos(100, &s)), &s)
            .unwrap();
        let b = arr
            .insert(Clip::new("b", pos(300, &s), pos(400, &s)), &s)
            .unwrap();

        let merged = arr.consolidate(&[a, b], &s).unwrap();
        assert_eq!(arr.len(), 1);
        let clip = arr.get(merged).unwrap();
        assert_eq!(clip.start.to_ticks(&s), 0);
        assert_eq!(clip.end.to_ticks(&s), 400);
    }

    #[test]
    fn test_consolidate_unknown_id_leaves_state_unchanged() {
        let s = settings();
        let mut arr = ClipArrangement::new();
        let a = arr
            .insert(Clip::new("a", pos(0, &s), pos(100, &s)), &s)
            .unwrap();
        arr.insert(Clip::new("b", pos(300, &s), pos(400, &s)), &s).unwrap();

        let err = arr.consolidate(&[a, 999], &s).unwrap_err();
        assert!(matches!(err, BlError::State(_)));
        assert_eq!(ranges(&arr, &s), vec![(0, 100), (300, 400)]);
    }

    #[test]
    fn test_consolidate_collapses_duplicate_ids() {
        let s = settings();
        let mut arr = ClipArrangement::new();
        let a = arr
            .insert(Clip::new("a", pos(0, &s), pos(100, &s)), &s)
            .unwrap();
        let b = arr
            .insert(Clip::new("b", pos(300, &s), pos(400, &s)), &s)
            .unwrap();

        let merged = arr.consolidate(&[a, a, b], &s).unwrap();
        assert_eq!(arr.len(), 1);
        let clip = arr.get(merged).unwrap();
        assert_eq!(clip.start.to_ticks(&s), 0);
        assert_eq!(clip.end.to_ticks(&s), 400);
    }

    #[test]
    fn test_overlaps_is_half_open() {
        let s = settings();
        let clip = Clip::new("a", pos(100, &s), pos(200, &s));

        assert!(clip.overlaps(150, 250, &s));
        assert!(clip.overlaps(0, 101, &s));
        assert!(!clip.overlaps(200, 300, &s)); // end is exclusive
        assert!(!clip.overlaps(0, 100, &s));
    }

    #[test]
    fn test_unknown_id_is_state_error() {
        let s = settings();
        let mut arr = ClipArrangement::new();
        assert!(matches!(arr.delete(999), Err(BlError::State(_))));
        assert!(matches!(
            arr.move_clip(999, pos(0, &s), &s),
            Err(BlError::State(_))
        ));
        assert!(matches!(arr.toggle_mute(999), Err(BlError::State(_))));
    }

    #[test]
    fn test_toggle_mute_and_clip_at() {
        let s = settings();
        let mut arr = ClipArrangement::new();
        let a = arr
            .insert(Clip::new("a", pos(0, &s), pos(100, &s)), &s)
            .unwrap();

        assert!(arr.clip_at(&pos(50, &s), &s).is_some());
        assert!(arr.clip_at(&pos(100, &s), &s).is_none()); // end is exclusive

        assert!(arr.toggle_mute(a).unwrap());
        assert!(arr.clip_at(&pos(50, &s), &s).is_none());
    }

    #[test]
    fn test_locked_clip_rejects_move() {
        let s = settings();
        let mut arr = ClipArrangement::new();
        let mut clip = Clip::new("a", pos(0, &s), pos(100, &s));
        clip.locked = true;
        let a = arr.insert(clip, &s).unwrap();

        assert!(matches!(
            arr.move_clip(a, pos(200, &s), &s),
            Err(BlError::Validation(_))
        ));
        assert_eq!(ranges(&arr, &s), vec![(0, 100)]);
    }
}
