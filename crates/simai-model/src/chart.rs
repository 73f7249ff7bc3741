use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::note::{
    Hold, HoldKind, Note, Slide, Tap, TapKind, TempoMarker, TouchHold, TouchTap, TouchZone,
    round_measure,
};

/// A parsed chart: notes and tempo changes, each kept in insertion order.
///
/// Order matters on export. Taps at one measure are written in the order they
/// were added, and the first tempo added at a measure is the one that governs it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    notes: Vec<Note>,
    tempo_markers: Vec<TempoMarker>,
}

impl Chart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn tempo_markers(&self) -> &[TempoMarker] {
        &self.tempo_markers
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.tempo_markers.is_empty()
    }

    pub fn add_tap(&mut self, measure: f64, position: u8, kind: TapKind) -> Result<()> {
        self.notes.push(Note::Tap(Tap::new(measure, position, kind)?));
        Ok(())
    }

    pub fn add_hold(
        &mut self,
        measure: f64,
        position: u8,
        duration: f64,
        kind: HoldKind,
    ) -> Result<()> {
        self.notes
            .push(Note::Hold(Hold::new(measure, position, duration, kind)?));
        Ok(())
    }

    /// Slides carry too many fields for a flat argument list, so they are
    /// built with [`Slide::new`] first.
    pub fn add_slide(&mut self, slide: Slide) {
        self.notes.push(Note::Slide(slide));
    }

    pub fn add_touch_tap(
        &mut self,
        measure: f64,
        position: u8,
        zone: TouchZone,
        is_firework: bool,
    ) -> Result<()> {
        self.notes.push(Note::TouchTap(TouchTap::new(
            measure,
            position,
            zone,
            is_firework,
        )?));
        Ok(())
    }

    pub fn add_touch_hold(
        &mut self,
        measure: f64,
        position: u8,
        zone: TouchZone,
        duration: f64,
        is_firework: bool,
    ) -> Result<()> {
        self.notes.push(Note::TouchHold(TouchHold::new(
            measure,
            position,
            zone,
            duration,
            is_firework,
        )?));
        Ok(())
    }

    pub fn set_tempo(&mut self, measure: f64, bpm: f64) -> Result<()> {
        self.tempo_markers.push(TempoMarker::new(measure, bpm)?);
        Ok(())
    }

    /// BPM in effect at `measure`.
    ///
    /// Picks the greatest marker measure not past the query; when several
    /// markers share it, the first one added wins.
    pub fn lookup_tempo(&self, measure: f64) -> Option<f64> {
        let governing = self
            .tempo_markers
            .iter()
            .map(|marker| marker.measure)
            .filter(|&m| m <= measure)
            .max_by(f64::total_cmp)?;
        self.tempo_markers
            .iter()
            .find(|marker| marker.measure == governing)
            .map(|marker| marker.bpm)
    }

    /// Move everything by `offset` measures. A tempo marker at exactly 1.0
    /// stays put so the chart keeps its starting tempo.
    pub fn shift(&mut self, offset: f64) {
        for note in &mut self.notes {
            note.set_measure(note.measure() + offset);
        }
        for marker in &mut self.tempo_markers {
            if marker.measure == 1.0 {
                continue;
            }
            marker.measure = round_measure(marker.measure + offset);
        }
    }

    /// Drop everything added after the given note and marker counts.
    pub(crate) fn truncate(&mut self, note_count: usize, tempo_count: usize) {
        self.notes.truncate(note_count);
        self.tempo_markers.truncate(tempo_count);
    }

    /// `(measure, bpm)` pairs sorted by measure, for [`crate::time`].
    pub fn tempo_breakpoints(&self) -> Vec<(f64, f64)> {
        let mut breakpoints: Vec<(f64, f64)> = self
            .tempo_markers
            .iter()
            .map(|marker| (marker.measure, marker.bpm))
            .collect();
        breakpoints.sort_by(|a, b| a.0.total_cmp(&b.0));
        breakpoints
    }
}
