/// A logical request channel. Requests in one slot supersede each other;
/// slots are independent of one another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    Selection,
    Search,
    Route,
}

impl Slot {
    fn index(&self) -> usize {
        match self {
            Self::Selection => 0,
            Self::Search => 1,
            Self::Route => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct SlotState {
    issued: u64,
    pending: bool,
}

/// Per-slot monotonic sequence counters.
///
/// A response is applied only when its stamp equals the slot's latest issued
/// number; anything lower is stale.
#[derive(Clone, Debug, Default)]
pub struct SlotCounters {
    slots: [SlotState; 3],
}

impl SlotCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps a new request and marks the slot as awaiting it.
    pub fn issue(&mut self, slot: Slot) -> u64 {
        let state = &mut self.slots[slot.index()];
        state.issued += 1;
        state.pending = true;
        state.issued
    }

    /// Supersedes whatever is in flight without issuing a new request.
    pub fn invalidate(&mut self, slot: Slot) {
        let state = &mut self.slots[slot.index()];
        state.issued += 1;
        state.pending = false;
    }

    pub fn is_current(&self, slot: Slot, seq: u64) -> bool {
        self.slots[slot.index()].issued == seq
    }

    /// Accepts a completion. Returns false (and changes nothing) when stale.
    pub fn complete(&mut self, slot: Slot, seq: u64) -> bool {
        if !self.is_current(slot, seq) {
            return false;
        }

        self.slots[slot.index()].pending = false;
        true
    }

    pub fn is_pending(&self, slot: Slot) -> bool {
        self.slots[slot.index()].pending
    }

    pub fn latest(&self, slot: Slot) -> u64 {
        self.slots[slot.index()].issued
    }
}

#[test]
fn newer_request_supersedes_older() {
    let mut slots = SlotCounters::new();

    let first = slots.issue(Slot::Selection);
    let second = slots.issue(Slot::Selection);

    assert!(slots.complete(Slot::Selection, second));
    assert!(!slots.complete(Slot::Selection, first));
    assert!(!slots.is_pending(Slot::Selection));
}

#[test]
fn stale_completion_keeps_slot_pending() {
    let mut slots = SlotCounters::new();

    let first = slots.issue(Slot::Route);
    slots.issue(Slot::Route);

    assert!(!slots.complete(Slot::Route, first));
    assert!(slots.is_pending(Slot::Route));
}

#[test]
fn slots_are_independent() {
    let mut slots = SlotCounters::new();

    let search = slots.issue(Slot::Search);
    slots.issue(Slot::Route);
    slots.invalidate(Slot::Selection);

    assert!(slots.is_current(Slot::Search, search));
    assert_eq!(slots.latest(Slot::Route), 1);
    assert_eq!(slots.latest(Slot::Selection), 1);
}

#[test]
fn invalidate_discards_in_flight() {
    let mut slots = SlotCounters::new();

    let seq = slots.issue(Slot::Search);
    slots.invalidate(Slot::Search);

    assert!(!slots.is_pending(Slot::Search));
    assert!(!slots.complete(Slot::Search, seq));
}
