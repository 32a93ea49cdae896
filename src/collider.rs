use std::iter;

use crate::api::{InteractTester, SweepApi};
use crate::error::{ColliderError, Result};
use crate::grid::Grid;
use crate::hitbox::{Hitbox, HitboxArena, HitboxId};
use crate::narrowphase::Narrowphase;
use crate::queue::{Action, EventId, EventQueue, ScheduledEvent};
use crate::state::HitboxState;
use crate::types::{ColliderConfig, ColliderEvent, ColliderStats, EventKind, Normal};

/// Event-driven continuous collision detection over a set of hitboxes.
///
/// The collider owns a simulation clock. Hitbox states are given as affine
/// motions from the current time, and [`advance`](Self::advance) moves the
/// clock forward, stopping at the first collision or separation between
/// interacting hitboxes so the driver can react to it.
///
/// `O` is the payload attached to each hitbox; `T` decides which pairs are
/// tested at all.
pub struct Collider<O, T> {
    cfg: ColliderConfig,
    tester: T,
    time: f64,
    grid: Grid,
    hitboxes: HitboxArena<O>,
    queue: EventQueue,
    test_id: u64,
    num_overlaps: usize,
}

impl<O, T: InteractTester<O>> Collider<O, T> {
    /// Empty collider at time zero. Fails if `cfg` does not validate.
    pub fn new(cfg: ColliderConfig, tester: T) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            tester,
            time: 0.0,
            grid: Grid::new(cfg.cell_width),
            hitboxes: HitboxArena::new(),
            queue: EventQueue::new(),
            test_id: 0,
            num_overlaps: 0,
        })
    }

    /// Configuration this collider was built with.
    pub fn config(&self) -> &ColliderConfig {
        &self.cfg
    }

    /// The tester deciding which pairs interact.
    pub fn tester(&self) -> &T {
        &self.tester
    }

    /// Mutable access to the tester. If this changes what `can_interact`
    /// returns for existing hitboxes, follow up with a state update marked
    /// with [`HitboxState::mark_interactivity_change`].
    pub fn tester_mut(&mut self) -> &mut T {
        &mut self.tester
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Time of the earliest queued event, internal ones included, or `+inf`.
    /// Advancing to this time does not necessarily produce an event.
    pub fn peek_next_event_time(&self) -> f64 {
        self.queue.peek_time()
    }

    /// Track a new hitbox starting from `state` at the current time.
    pub fn new_hitbox(&mut self, state: HitboxState, owner: O) -> Result<HitboxId> {
        check_remaining_time(&state)?;
        let id = self.hitboxes.insert_with(|id| Hitbox::new(id, owner));
        log::debug!("new hitbox {id:?} in group {} at t={}", state.group, self.time);
        self.update(id, state);
        Ok(id)
    }

    /// Replace the state of `id` as of the current time and reschedule its events.
    pub fn set_state(&mut self, id: HitboxId, state: HitboxState) -> Result<()> {
        check_remaining_time(&state)?;
        let hitbox = self.live(id)?;
        self.check_not_expired(hitbox)?;
        if !state.interactivity_change() && hitbox.state_at(self.time) == state {
            return Ok(());
        }
        self.update(id, state);
        Ok(())
    }

    /// State of `id` at the current time.
    pub fn get_state(&self, id: HitboxId) -> Result<HitboxState> {
        let hitbox = self.live(id)?;
        self.check_not_expired(hitbox)?;
        Ok(hitbox.state_at(self.time))
    }

    /// Remove `id` without reporting separations from its overlaps, and hand
    /// back its owner. The handle is stale afterwards.
    pub fn delete(&mut self, id: HitboxId) -> Result<O> {
        self.live(id)?;
        self.clear_related_events(id);
        let hitbox = self.hitboxes.remove(id).ok_or(ColliderError::StaleHitbox(id))?;
        self.grid.remove(id, hitbox.group(), hitbox.cells, None);
        for other in hitbox.overlaps() {
            if let Some(peer) = self.hitboxes.get_mut(other) {
                peer.overlaps.remove(&id);
            }
            self.num_overlaps -= 1;
        }
        log::debug!("deleted hitbox {id:?} at t={}", self.time);
        Ok(hitbox.into_owner())
    }

    /// Advance the clock toward `max_time`, stopping early at the next
    /// collision or separation. With `inclusive`, an event exactly at
    /// `max_time` is reported too.
    pub fn advance(&mut self, max_time: f64, inclusive: bool) -> Result<Option<ColliderEvent>> {
        if !max_time.is_finite() {
            return Err(ColliderError::InvalidTime(max_time));
        }
        if max_time < self.time {
            return Err(ColliderError::TimeRewind { now: self.time, requested: max_time });
        }
        while let Some((event_id, event)) = self.queue.pop_due(max_time, inclusive) {
            debug_assert!(event.time >= self.time);
            self.time = event.time;
            let (first, second) = event.action.hitboxes();
            for id in iter::once(first).chain(second) {
                if let Some(hitbox) = self.hitboxes.get_mut(id) {
                    hitbox.pending.remove(&event_id);
                }
            }
            if let Some(resolved) = self.resolve(event) {
                return Ok(Some(resolved));
            }
        }
        self.time = max_time;
        Ok(None)
    }

    /// [`advance`](Self::advance) that also reports events exactly at `max_time`.
    pub fn advance_inclusive(&mut self, max_time: f64) -> Result<Option<ColliderEvent>> {
        self.advance(max_time, true)
    }

    /// The tracked hitbox behind `id`.
    pub fn hitbox(&self, id: HitboxId) -> Result<&Hitbox<O>> {
        self.live(id)
    }

    /// Payload of `id`.
    pub fn owner(&self, id: HitboxId) -> Result<&O> {
        self.live(id).map(Hitbox::owner)
    }

    /// Mutable payload of `id`. Does not touch scheduled events.
    pub fn owner_mut(&mut self, id: HitboxId) -> Result<&mut O> {
        self.hitboxes.get_mut(id).map(Hitbox::owner_mut).ok_or(ColliderError::StaleHitbox(id))
    }

    /// Normal from `src` toward `dst` at the current time.
    pub fn normal(&self, src: HitboxId, dst: HitboxId) -> Result<Normal> {
        let src = self.get_state(src)?.placed();
        let dst = self.get_state(dst)?.placed();
        Ok(Narrowphase::normal(&src, &dst))
    }

    /// Signed overlap between `a` and `b`; negative values are the gap.
    pub fn overlap(&self, a: HitboxId, b: HitboxId) -> Result<f64> {
        self.normal(a, b).map(|n| n.overlap)
    }

    /// Whether `a` and `b` geometrically overlap right now, whatever the
    /// tester says about them.
    pub fn is_overlapping(&self, a: HitboxId, b: HitboxId) -> Result<bool> {
        self.overlap(a, b).map(|overlap| overlap > 0.0)
    }

    /// Peers `id` has collided with and not yet separated from, in id order.
    pub fn overlapping(&self, id: HitboxId) -> Result<Vec<HitboxId>> {
        let mut peers: Vec<_> = self.live(id)?.overlaps().collect();
        peers.sort_unstable();
        Ok(peers)
    }

    /// Current bookkeeping counters.
    pub fn stats(&self) -> ColliderStats {
        ColliderStats {
            hitboxes: self.hitboxes.len(),
            grid_entries: self.grid.entries(),
            queued_events: self.queue.len(),
            overlaps: self.num_overlaps,
        }
    }

    /// Log [`stats`](Self::stats) at info level.
    pub fn log_stats(&self) {
        let stats = self.stats();
        log::info!(
            "collider t={}: {} hitboxes, {} grid entries, {} queued events, {} overlaps",
            self.time,
            stats.hitboxes,
            stats.grid_entries,
            stats.queued_events,
            stats.overlaps
        );
    }

    fn live(&self, id: HitboxId) -> Result<&Hitbox<O>> {
        self.hitboxes.get(id).ok_or(ColliderError::StaleHitbox(id))
    }

    fn check_not_expired(&self, hitbox: &Hitbox<O>) -> Result<()> {
        let expired_at = hitbox.expires_at();
        if expired_at < self.time {
            return Err(ColliderError::StateExpired { expired_at, now: self.time });
        }
        Ok(())
    }

    /// How long the collider trusts `state` before re-indexing it.
    fn horizon_for(&self, state: &HitboxState) -> f64 {
        if state.group < 0 || !state.is_moving() {
            return state.remaining_time;
        }
        state
            .remaining_time
            .min(self.grid.grid_period(state))
            .min(self.cfg.max_foresight_time)
    }

    /// Commit `state` for `id` and rebuild everything derived from it: grid
    /// cells, tracked overlaps, and queued events.
    fn update(&mut self, id: HitboxId, state: HitboxState) {
        self.clear_related_events(id);
        self.test_id += 1;
        let now = self.time;

        let Some(hitbox) = self.hitboxes.get(id) else { return };
        let old_group = hitbox.group();
        let old_cells = hitbox.cells;
        let new_group = state.group;
        let interactivity_change = state.interactivity_change() || new_group != old_group;

        let horizon = self.horizon_for(&state);
        let new_cells = (new_group >= 0).then(|| self.grid.index_bounds(&state.clone().valid_for(horizon)));
        if old_group == new_group {
            self.grid.remove(id, old_group, old_cells, new_cells);
            self.grid.add(id, new_group, old_cells, new_cells);
        } else {
            log::debug!("hitbox {id:?} moves from group {old_group} to {new_group}");
            self.grid.remove(id, old_group, old_cells, None);
            self.grid.add(id, new_group, None, new_cells);
        }

        let clamped = horizon < state.remaining_time;
        let Some(hitbox) = self.hitboxes.get_mut(id) else { return };
        hitbox.cells = new_cells;
        hitbox.commit(now, state, horizon);

        let Some(cells) = new_cells else {
            self.clear_overlaps(id);
            return;
        };

        let Some(hitbox) = self.hitboxes.get(id) else { return };
        let groups = self.tester.interact_groups(hitbox);
        let test_id = self.test_id;
        let mut candidates = Vec::new();
        for other in self.grid.members(cells, &groups) {
            if other == id {
                continue;
            }
            if let Some(peer) = self.hitboxes.get_mut(other) {
                if peer.mark(test_id) {
                    candidates.push(other);
                }
            }
        }
        for other in candidates {
            let (Some(hitbox), Some(peer)) = (self.hitboxes.get(id), self.hitboxes.get(other)) else {
                continue;
            };
            if hitbox.is_overlapping(other) || !self.tester.can_interact(hitbox, peer) {
                continue;
            }
            self.collision_check(id, other);
        }

        let overlaps: Vec<_> = match self.hitboxes.get(id) {
            Some(hitbox) => hitbox.overlaps().collect(),
            None => return,
        };
        for other in overlaps {
            let keep = !interactivity_change
                || match (self.hitboxes.get(id), self.hitboxes.get(other)) {
                    (Some(hitbox), Some(peer)) => self.tester.can_interact(hitbox, peer),
                    _ => false,
                };
            if keep {
                self.separation_check(id, other);
            } else {
                // TODO: confirm whether losing interactivity should report a separation
                log::trace!("dropping overlap {id:?}/{other:?} without separation");
                self.unlink(id, other);
            }
        }

        if clamped {
            if let Some(hitbox) = self.hitboxes.get(id) {
                let action = Action::Reiterate { hitbox: id, epoch: hitbox.epoch() };
                self.schedule(now + horizon, action);
            }
        }
    }

    fn resolve(&mut self, event: ScheduledEvent) -> Option<ColliderEvent> {
        match event.action {
            Action::Reiterate { hitbox: id, epoch } => {
                let hitbox = self.hitboxes.get(id).filter(|h| h.epoch() == epoch);
                let Some(hitbox) = hitbox else {
                    log::trace!("discarding stale reiteration of {id:?}");
                    return None;
                };
                log::trace!("reiterating {id:?} at t={}", self.time);
                let state = hitbox.state_at(self.time);
                self.update(id, state);
                None
            }
            Action::Pair { a, b, epoch_a, epoch_b, kind } => {
                if !self.epoch_matches(a, epoch_a) || !self.epoch_matches(b, epoch_b) {
                    log::trace!("discarding stale {kind:?} of {a:?}/{b:?}");
                    return None;
                }
                log::trace!("{kind:?} of {a:?}/{b:?} at t={}", self.time);
                match kind {
                    EventKind::Collide => {
                        self.link(a, b);
                        self.separation_check(a, b);
                    }
                    EventKind::Separate => {
                        self.unlink(a, b);
                        if self.can_interact(a, b) {
                            self.collision_check(a, b);
                        }
                    }
                }
                Some(ColliderEvent { time: self.time, kind, a, b })
            }
        }
    }

    fn epoch_matches(&self, id: HitboxId, epoch: u64) -> bool {
        self.hitboxes.get(id).is_some_and(|h| h.epoch() == epoch)
    }

    fn can_interact(&self, a: HitboxId, b: HitboxId) -> bool {
        match (self.hitboxes.get(a), self.hitboxes.get(b)) {
            (Some(a), Some(b)) => self.tester.can_interact(a, b),
            _ => false,
        }
    }

    fn collision_check(&mut self, a: HitboxId, b: HitboxId) {
        self.pair_check(a, b, EventKind::Collide);
    }

    fn separation_check(&mut self, a: HitboxId, b: HitboxId) {
        self.pair_check(a, b, EventKind::Separate);
    }

    fn pair_check(&mut self, a: HitboxId, b: HitboxId, kind: EventKind) {
        debug_assert_ne!(a, b);
        let now = self.time;
        let (Some(ha), Some(hb)) = (self.hitboxes.get(a), self.hitboxes.get(b)) else { return };
        let (sa, sb) = (ha.internal_state_at(now), hb.internal_state_at(now));
        let dt = match kind {
            EventKind::Collide => Narrowphase::collide_time(&sa, &sb),
            EventKind::Separate => Narrowphase::separate_time(&sa, &sb, self.cfg.separate_buffer),
        };
        let Some(dt) = dt else { return };
        let action = Action::Pair { a, b, epoch_a: ha.epoch(), epoch_b: hb.epoch(), kind };
        self.schedule(now + dt, action);
    }

    fn schedule(&mut self, time: f64, action: Action) {
        log::trace!("scheduling {action:?} at t={time}");
        let event_id = self.queue.push(ScheduledEvent { time, action });
        let (first, second) = action.hitboxes();
        for id in iter::once(first).chain(second) {
            if let Some(hitbox) = self.hitboxes.get_mut(id) {
                hitbox.pending.insert(event_id);
            }
        }
    }

    fn clear_related_events(&mut self, id: HitboxId) {
        let Some(hitbox) = self.hitboxes.get_mut(id) else { return };
        let pending: Vec<EventId> = hitbox.pending.drain().collect();
        for event_id in pending {
            let Some(event) = self.queue.cancel(event_id) else { continue };
            let (first, second) = event.action.hitboxes();
            for other in iter::once(first).chain(second).filter(|&other| other != id) {
                if let Some(peer) = self.hitboxes.get_mut(other) {
                    peer.pending.remove(&event_id);
                }
            }
        }
    }

    fn link(&mut self, a: HitboxId, b: HitboxId) {
        let added_a = self.hitboxes.get_mut(a).is_some_and(|h| h.overlaps.insert(b));
        let added_b = self.hitboxes.get_mut(b).is_some_and(|h| h.overlaps.insert(a));
        debug_assert!(added_a && added_b, "overlap sets out of sync for {a:?}/{b:?}");
        self.num_overlaps += 1;
    }

    fn unlink(&mut self, a: HitboxId, b: HitboxId) {
        let removed_a = self.hitboxes.get_mut(a).is_some_and(|h| h.overlaps.remove(&b));
        let removed_b = self.hitboxes.get_mut(b).is_some_and(|h| h.overlaps.remove(&a));
        debug_assert!(removed_a && removed_b, "overlap sets out of sync for {a:?}/{b:?}");
        self.num_overlaps -= 1;
    }

    fn clear_overlaps(&mut self, id: HitboxId) {
        let Some(hitbox) = self.hitboxes.get_mut(id) else { return };
        let peers: Vec<_> = hitbox.overlaps.drain().collect();
        for other in peers {
            if let Some(peer) = self.hitboxes.get_mut(other) {
                peer.overlaps.remove(&id);
            }
            self.num_overlaps -= 1;
        }
    }
}

fn check_remaining_time(state: &HitboxState) -> Result<()> {
    if state.remaining_time >= 0.0 {
        Ok(())
    } else {
        Err(ColliderError::NegativeRemainingTime(state.remaining_time))
    }
}
