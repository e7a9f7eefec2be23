use thiserror::Error;

/// A single timed note event. Velocity 0 is the conventional note-off.
///
/// `duration` is only used at insertion time to place the paired note-off;
/// the serializer never reads it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub pitch: u8,
    pub velocity: u8,
    /// Logical instrument id; positive, program number = instrument - 1.
    pub instrument: u32,
    /// Absolute onset in ticks (480 per quarter note).
    pub onset: u32,
    pub duration: u32,
}

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Out of memory while inserting a note event..!")]
    OutOfMemory,
}

/// Ordered store of note events for one piece.
///
/// Invariant: onsets are non-decreasing from first to last. Among events
/// sharing an onset, the most recently inserted comes first.
#[derive(Debug, Default)]
pub struct Score {
    events: Vec<NoteEvent>,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards all events; the store becomes empty.
    pub fn reset(&mut self) {
        self.events.clear();
    }

    /// Inserts a note, keeping onsets ordered. A non-zero velocity also
    /// inserts the companion note-off (velocity 0) at `onset + duration`,
    /// as a second independent insertion under the same ordering rule.
    pub fn insert(
        &mut self,
        pitch: u8,
        velocity: u8,
        instrument: u32,
        onset: u32,
        duration: u32,
    ) -> Result<(), ScoreError> {
        self.insert_one(NoteEvent {
            pitch,
            velocity,
            instrument,
            onset,
            duration,
        })?;

        if velocity != 0 {
            self.insert_one(NoteEvent {
                pitch,
                velocity: 0,
                instrument,
                onset: onset + duration,
                duration: 0,
            })?;
        }

        Ok(())
    }

    fn insert_one(&mut self, event: NoteEvent) -> Result<(), ScoreError> {
        self.events
            .try_reserve(1)
            .map_err(|_| ScoreError::OutOfMemory)?;

        // Insert before the first event whose onset is >= the new onset,
        // so the latest insertion wins ties.
        let at = self
            .events
            .iter()
            .position(|e| event.onset <= e.onset)
            .unwrap_or(self.events.len());
        self.events.insert(at, event);

        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &NoteEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
