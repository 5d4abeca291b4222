//! Merge a historical baseline with live insert events into one bounded,
//! ordered view.
//!
//! The reconciler is a plain state machine; it performs no I/O. Every
//! mutation is tagged with the [`Generation`] it was started under, so
//! results that arrive after a device switch or reload are discarded.
//!
//! Invariants held by [`Reconciler::entries`]:
//! - ascending by `(created_at, id)`;
//! - no two entries share an `id`;
//! - never longer than the configured capacity (oldest evicted first).

use std::collections::{HashSet, VecDeque};

use chrono::{FixedOffset, Offset, Utc};
use envmon_core::types::DbId;

use crate::row::ReadingRow;

/// Monotonic tag identifying one initialization of the view.
pub type Generation = u64;

/// Lifecycle of the view for the current device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    /// No device selected.
    Idle,
    /// Waiting for the baseline; feed events are buffered.
    Loading,
    /// Baseline applied; feed events are folded in.
    Ready,
    /// Baseline fetch failed. Entries stay empty until the next switch.
    Error(String),
}

/// One row of the view, with its display time rendered once on arrival.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveEntry {
    pub row: ReadingRow,
    /// `HH:MM` in the configured display offset.
    pub time: String,
}

/// What [`Reconciler::apply_event`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Added after the newest entry.
    Appended,
    /// Older than the newest entry; placed at its chronological position.
    Inserted,
    /// Held until the baseline arrives.
    Buffered,
    /// Already present.
    Duplicate,
    /// Belongs to a device other than the one observed.
    OtherDevice,
    /// Tagged with a superseded generation.
    Stale,
    /// The view is idle or in error.
    NotAccepting,
}

/// Immutable copy of the view, suitable for publishing to observers.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSnapshot {
    pub device_id: Option<String>,
    pub generation: Generation,
    pub state: ViewState,
    pub entries: Vec<LiveEntry>,
}

impl LiveSnapshot {
    /// Most recent entry, if any.
    pub fn latest(&self) -> Option<&LiveEntry> {
        self.entries.last()
    }
}

impl Default for LiveSnapshot {
    fn default() -> Self {
        Self {
            device_id: None,
            generation: 0,
            state: ViewState::Idle,
            entries: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct Reconciler {
    device_id: Option<String>,
    generation: Generation,
    state: ViewState,
    entries: VecDeque<LiveEntry>,
    ids: HashSet<DbId>,
    pending: Vec<ReadingRow>,
    capacity: usize,
    offset: FixedOffset,
}

impl Reconciler {
    /// Create an idle reconciler rendering times in UTC.
    pub fn new(capacity: usize) -> Self {
        Self::with_offset(capacity, Utc.fix())
    }

    pub fn with_offset(capacity: usize, offset: FixedOffset) -> Self {
        Self {
            device_id: None,
            generation: 0,
            state: ViewState::Idle,
            entries: VecDeque::new(),
            ids: HashSet::new(),
            pending: Vec::new(),
            capacity: capacity.max(1),
            offset,
        }
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn entries(&self) -> impl ExactSizeIterator<Item = &LiveEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> LiveSnapshot {
        LiveSnapshot {
            device_id: self.device_id.clone(),
            generation: self.generation,
            state: self.state.clone(),
            entries: self.entries.iter().cloned().collect(),
        }
    }

    /// Start observing `device_id`: clear everything and wait for a baseline.
    pub fn switch_device(&mut self, device_id: impl Into<String>) -> Generation {
        self.generation += 1;
        self.device_id = Some(device_id.into());
        self.state = ViewState::Loading;
        self.clear();
        self.generation
    }

    /// Re-initialize the same device after the feed dropped.
    ///
    /// Entries stay visible until the new baseline replaces them. Returns
    /// `None` when `generation` is no longer current.
    pub fn begin_reload(&mut self, generation: Generation) -> Option<Generation> {
        if generation != self.generation || self.device_id.is_none() {
            return None;
        }
        self.generation += 1;
        self.state = ViewState::Loading;
        self.pending.clear();
        Some(self.generation)
    }

    /// Stop observing any device.
    pub fn teardown(&mut self) {
        self.generation += 1;
        self.device_id = None;
        self.state = ViewState::Idle;
        self.clear();
    }

    /// Replace the view with a baseline fetched newest-first, then fold in
    /// any events buffered while loading.
    ///
    /// Returns `false` (and changes nothing) if the result is stale.
    pub fn apply_history(&mut self, generation: Generation, newest_first: Vec<ReadingRow>) -> bool {
        if !self.is_loading(generation) {
            return false;
        }
        self.entries.clear();
        self.ids.clear();

        let device_id = self.device_id.clone();
        for row in newest_first.into_iter().rev() {
            if device_id.as_deref() == Some(row.device_id.as_str()) {
                self.insert(row);
            }
        }
        let buffered = std::mem::take(&mut self.pending);
        let folded = buffered.len();
        for row in buffered {
            self.insert(row);
        }

        self.state = ViewState::Ready;
        tracing::debug!(
            device_id = ?self.device_id,
            generation,
            entries = self.entries.len(),
            buffered = folded,
            "Baseline applied",
        );
        true
    }

    /// Record a failed baseline fetch. Entries are emptied.
    pub fn apply_error(&mut self, generation: Generation, message: impl Into<String>) -> bool {
        if !self.is_loading(generation) {
            return false;
        }
        self.clear();
        self.state = ViewState::Error(message.into());
        true
    }

    /// Fold one live insert event.
    pub fn apply_event(&mut self, generation: Generation, row: ReadingRow) -> EventOutcome {
        if generation != self.generation {
            return EventOutcome::Stale;
        }
        if self.device_id.as_deref() != Some(row.device_id.as_str()) {
            return EventOutcome::OtherDevice;
        }
        match self.state {
            ViewState::Loading => {
                if self.pending.iter().any(|p| p.id == row.id) {
                    return EventOutcome::Duplicate;
                }
                if self.pending.len() == self.capacity {
                    self.pending.remove(0);
                }
                self.pending.push(row);
                EventOutcome::Buffered
            }
            ViewState::Ready => self.insert(row),
            ViewState::Idle | ViewState::Error(_) => EventOutcome::NotAccepting,
        }
    }

    fn is_loading(&self, generation: Generation) -> bool {
        generation == self.generation && self.state == ViewState::Loading
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.ids.clear();
        self.pending.clear();
    }

    fn insert(&mut self, row: ReadingRow) -> EventOutcome {
        if !self.ids.insert(row.id) {
            return EventOutcome::Duplicate;
        }
        let key = (row.created_at, row.id);
        let position = self
            .entries
            .partition_point(|e| (e.row.created_at, e.row.id) <= key);
        let outcome = if position == self.entries.len() {
            EventOutcome::Appended
        } else {
            EventOutcome::Inserted
        };

        let time = row
            .created_at
            .with_timezone(&self.offset)
            .format("%H:%M")
            .to_string();
        self.entries.insert(position, LiveEntry { row, time });

        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                self.ids.remove(&evicted.row.id);
            }
        }
        outcome
    }
}
