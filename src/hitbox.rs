use rustc_hash::FxHashSet;

use crate::grid::CellRange;
use crate::queue::EventId;
use crate::state::HitboxState;

/// Stable handle to a hitbox owned by a [`Collider`](crate::Collider).
///
/// Slots are reused after deletion; the generation tells a handle to a
/// deleted hitbox apart from the slot's new occupant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HitboxId {
    index: u32,
    generation: u32,
}

impl HitboxId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index, shared by a deleted hitbox and whatever reuses its slot.
    pub fn index(self) -> u32 {
        self.index
    }
}

/// A tracked hitbox as seen by an [`InteractTester`](crate::InteractTester).
pub struct Hitbox<O> {
    id: HitboxId,
    start_time: f64,
    /// State the driver supplied, as of `start_time`.
    state: HitboxState,
    /// How long `state` is trusted by the collider from `start_time`; at most
    /// `state.remaining_time`, shorter when a reiteration tick was scheduled.
    horizon: f64,
    /// Grid cells this hitbox is indexed under, `None` while ungrouped.
    pub(crate) cells: Option<CellRange>,
    pub(crate) overlaps: FxHashSet<HitboxId>,
    pub(crate) pending: FxHashSet<EventId>,
    /// Bumped on every commit; queued events stamp it to detect staleness.
    epoch: u64,
    test_mark: u64,
    owner: O,
}

impl<O> Hitbox<O> {
    pub(crate) fn new(id: HitboxId, owner: O) -> Self {
        Self {
            id,
            start_time: 0.0,
            state: HitboxState::new(Default::default(), crate::geom::Shape::circle(0.0)).in_group(-1),
            horizon: f64::INFINITY,
            cells: None,
            overlaps: FxHashSet::default(),
            pending: FxHashSet::default(),
            epoch: 0,
            test_mark: 0,
            owner,
        }
    }

    /// Handle this hitbox is tracked under.
    pub fn id(&self) -> HitboxId {
        self.id
    }

    /// Payload attached by the driver.
    pub fn owner(&self) -> &O {
        &self.owner
    }

    pub(crate) fn owner_mut(&mut self) -> &mut O {
        &mut self.owner
    }

    pub(crate) fn into_owner(self) -> O {
        self.owner
    }

    /// Group of the committed state; negative while ungrouped.
    pub fn group(&self) -> i32 {
        self.state.group
    }

    /// Time of the last state change.
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// State as supplied at [`start_time`](Self::start_time).
    pub fn state_at_start(&self) -> &HitboxState {
        &self.state
    }

    /// Whether `other` collided with this hitbox and has not separated since.
    pub fn is_overlapping(&self, other: HitboxId) -> bool {
        self.overlaps.contains(&other)
    }

    /// Tracked overlaps, in no particular order.
    pub fn overlaps(&self) -> impl Iterator<Item = HitboxId> + '_ {
        self.overlaps.iter().copied()
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The driver-facing state at `now`.
    pub(crate) fn state_at(&self, now: f64) -> HitboxState {
        self.state.advanced(now - self.start_time)
    }

    /// The state at `start_time` with the collider's own horizon.
    pub(crate) fn internal_state_at_start(&self) -> HitboxState {
        let mut s = self.state.clone();
        s.remaining_time = self.horizon;
        s
    }

    /// State the solvers see at `now`.
    pub(crate) fn internal_state_at(&self, now: f64) -> HitboxState {
        self.internal_state_at_start().advanced(now - self.start_time)
    }

    pub(crate) fn expires_at(&self) -> f64 {
        self.start_time + self.state.remaining_time
    }

    pub(crate) fn commit(&mut self, now: f64, mut state: HitboxState, horizon: f64) {
        state.clear_interactivity_change();
        self.start_time = now;
        self.state = state;
        self.horizon = horizon;
        self.epoch += 1;
    }

    /// Stamp this hitbox for query `test_id`; false if already stamped.
    pub(crate) fn mark(&mut self, test_id: u64) -> bool {
        if self.test_mark == test_id {
            return false;
        }
        self.test_mark = test_id;
        true
    }
}

struct Slot<O> {
    generation: u32,
    hitbox: Option<Hitbox<O>>,
}

/// Slot storage for hitboxes with generation-checked handles.
pub(crate) struct HitboxArena<O> {
    slots: Vec<Slot<O>>,
    free: Vec<u32>,
    len: usize,
}

impl<O> HitboxArena<O> {
    pub(crate) fn new() -> Self {
        Self { slots: Vec::new(), free: Vec::new(), len: 0 }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn insert_with(&mut self, make: impl FnOnce(HitboxId) -> Hitbox<O>) -> HitboxId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot { generation: 0, hitbox: None });
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let id = HitboxId::new(index, slot.generation);
        slot.hitbox = Some(make(id));
        self.len += 1;
        id
    }

    pub(crate) fn get(&self, id: HitboxId) -> Option<&Hitbox<O>> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.hitbox.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: HitboxId) -> Option<&mut Hitbox<O>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.hitbox.as_mut()
    }

    pub(crate) fn remove(&mut self, id: HitboxId) -> Option<Hitbox<O>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let hitbox = slot.hitbox.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(hitbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_generations_detect_stale_handles() {
        let mut arena: HitboxArena<&str> = HitboxArena::new();
        let a = arena.insert_with(|id| Hitbox::new(id, "a"));
        let b = arena.insert_with(|id| Hitbox::new(id, "b"));
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a).map(|h| *h.owner()), Some("a"));

        let removed = arena.remove(a).unwrap();
        assert_eq!(removed.into_owner(), "a");
        assert!(arena.get(a).is_none());
        assert!(arena.remove(a).is_none());

        // slot is reused under a new generation
        let c = arena.insert_with(|id| Hitbox::new(id, "c"));
        assert_eq!(c.index(), a.index());
        assert_ne!(c, a);
        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(c).map(|h| h.id()), Some(c));
        assert!(arena.get(b).is_some());
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_commit_bumps_epoch_and_clears_flag() {
        let mut hb = Hitbox::new(HitboxId::new(0, 0), ());
        assert_eq!(hb.group(), -1);
        let mut state = HitboxState::new(Default::default(), crate::geom::Shape::square(1.0)).valid_for(5.0);
        state.mark_interactivity_change();
        let before = hb.epoch();
        hb.commit(2.0, state, 3.0);
        assert_eq!(hb.epoch(), before + 1);
        assert!(!hb.state_at_start().interactivity_change());
        assert_eq!(hb.start_time(), 2.0);
        assert_eq!(hb.expires_at(), 7.0);
        assert_eq!(hb.internal_state_at_start().remaining_time, 3.0);
        assert_eq!(hb.internal_state_at(3.0).remaining_time, 2.0);
        assert_eq!(hb.state_at(3.0).remaining_time, 4.0);
    }

    #[test]
    fn test_mark_once_per_query() {
        let mut hb = Hitbox::new(HitboxId::new(0, 0), ());
        assert!(hb.mark(1));
        assert!(!hb.mark(1));
        assert!(hb.mark(2));
    }
}
