//! Staleness and fallback cache for sensor slots.
//!
//! Each slot remembers the last value a valid cycle produced for it. What a
//! slot exposes is resolved on every read, in this order:
//!
//! 1. the value from the most recent cycle, if that cycle was valid
//! 2. the last valid value, however old, after failed cycles
//! 3. the snapshot restored at startup, while no cycle has succeeded yet
//!    and only if its time is inside the admission window
//! 4. nothing
//!
//! A valid cycle with fewer departures than the slot index keeps the slot's
//! last valid value, like a failed cycle does, but discards the restored
//! snapshot. Only a departure for the slot overwrites it; availability ages
//! the kept value out once it leaves the admission window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Departure, Slot, is_admissible, parse_timestamp};

/// What one polling cycle means for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotUpdate {
    /// The cycle produced a departure for this slot.
    Fresh(Departure),
    /// The cycle was valid but had no departure for this slot.
    Empty,
    /// The cycle failed.
    Fault,
}

impl SlotUpdate {
    /// Update for `slot` from a valid cycle's departures.
    pub fn from_departures(departures: &[Departure], slot: Slot) -> Self {
        match departures.get(slot.index()) {
            Some(d) => SlotUpdate::Fresh(d.clone()),
            None => SlotUpdate::Empty,
        }
    }
}

/// A slot's state from before a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoredSnapshot {
    pub state: Option<String>,
    pub attributes: Option<Departure>,
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Fresh,
    Cached,
    Restored,
}

/// The value a slot exposes at a given moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSlot {
    pub state: String,
    pub attributes: Option<Departure>,
    pub provenance: Provenance,
}

/// Per-slot memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorSlotState {
    /// Last departure a valid cycle produced for this slot.
    last_valid: Option<Departure>,
    /// Whether the latest cycle produced `last_valid`.
    fresh: bool,
    restored: Option<RestoredSnapshot>,
}

impl SensorSlotState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with a snapshot loaded at startup.
    pub fn with_restored(mut self, snapshot: RestoredSnapshot) -> Self {
        self.restored = Some(snapshot);
        self
    }

    /// Take in one cycle's result.
    pub fn absorb(&mut self, update: &SlotUpdate) {
        match update {
            SlotUpdate::Fresh(departure) => {
                self.last_valid = Some(departure.clone());
                self.fresh = true;
                self.restored = None;
            }
            SlotUpdate::Empty => {
                self.fresh = false;
                self.restored = None;
            }
            SlotUpdate::Fault => self.fresh = false,
        }
    }

    /// Resolve what the slot exposes at `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> Option<ResolvedSlot> {
        match &self.last_valid {
            Some(d) => Some(ResolvedSlot {
                state: d.state(),
                attributes: Some(d.clone()),
                provenance: if self.fresh {
                    Provenance::Fresh
                } else {
                    Provenance::Cached
                },
            }),
            None => self.resolve_restored(now),
        }
    }

    fn resolve_restored(&self, now: DateTime<Utc>) -> Option<ResolvedSlot> {
        let restored = self.restored.as_ref()?;
        let state = restored.state.as_deref()?;
        let time = parse_timestamp(state)?;

        is_admissible(&time, now).then(|| ResolvedSlot {
            state: state.to_string(),
            attributes: restored.attributes.clone(),
            provenance: Provenance::Restored,
        })
    }

    pub fn current_state(&self, now: DateTime<Utc>) -> Option<String> {
        self.resolve(now).map(|r| r.state)
    }

    pub fn current_attributes(&self, now: DateTime<Utc>) -> Option<Departure> {
        self.resolve(now).and_then(|r| r.attributes)
    }

    /// Whether the resolved state is a time inside the admission window.
    pub fn availability(&self, now: DateTime<Utc>) -> bool {
        self.current_state(now)
            .and_then(|s| parse_timestamp(&s))
            .is_some_and(|t| is_admissible(&t, now))
    }
}

/// Everything a station's sensors read, published after every cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationSnapshot {
    slots: [SensorSlotState; 3],
    /// Set by an authentication fault, cleared by the next valid cycle.
    pub auth_blocked: bool,
    pub last_success: Option<DateTime<Utc>>,
}

impl StationSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, slot: Slot) -> &SensorSlotState {
        &self.slots[slot.index()]
    }

    pub fn restore(&mut self, slot: Slot, snapshot: RestoredSnapshot) {
        let state = std::mem::take(&mut self.slots[slot.index()]);
        self.slots[slot.index()] = state.with_restored(snapshot);
    }

    /// Absorb a valid cycle's sorted departures.
    pub fn absorb_departures(&mut self, departures: &[Departure], now: DateTime<Utc>) {
        for slot in Slot::ALL {
            self.slots[slot.index()].absorb(&SlotUpdate::from_departures(departures, slot));
        }
        self.auth_blocked = false;
        self.last_success = Some(now);
    }

    /// Absorb a failed cycle. Slots keep their last valid values.
    pub fn absorb_fault(&mut self, auth: bool) {
        for state in &mut self.slots {
            state.absorb(&SlotUpdate::Fault);
        }
        if auth {
            self.auth_blocked = true;
        }
    }

    /// Whether `slot` should be reported available at `now`.
    pub fn available(&self, slot: Slot, now: DateTime<Utc>) -> bool {
        !self.auth_blocked && self.slot(slot).availability(now)
    }
}
