use crate::geom::PlacedShape;
use crate::hitbox::Hitbox;
use crate::state::HitboxState;
use crate::types::{GroupSet, Normal};

/// Decides which hitboxes are tested against each other. Implemented by the
/// driver and owned by the [`Collider`](crate::Collider).
pub trait InteractTester<O> {
    /// Whether `a` and `b` should report collisions. Must be symmetric, and may
    /// only change its answer for a pair when one side changes group, marks an
    /// interactivity change, or an event fires for that pair.
    fn can_interact(&self, a: &Hitbox<O>, b: &Hitbox<O>) -> bool;

    /// Groups whose members `hitbox` is tested against. Groups left out are
    /// never tested, whatever `can_interact` would say.
    fn interact_groups(&self, hitbox: &Hitbox<O>) -> GroupSet;
}

/// Pairwise sweep solvers the collider schedules events with.
pub trait SweepApi {
    /// Earliest time from now at which `a` and `b` overlap, if it falls
    /// before either horizon. `Some(0.0)` if they already overlap.
    fn collide_time(a: &HitboxState, b: &HitboxState) -> Option<f64>;

    /// Earliest time from now at which `a` and `b` are at least `padding`
    /// apart, if it falls before either horizon.
    fn separate_time(a: &HitboxState, b: &HitboxState, padding: f64) -> Option<f64>;

    /// Direction from `src` toward `dst` along which `dst` would move to get
    /// clear, with the signed overlap along it.
    fn normal(src: &PlacedShape, dst: &PlacedShape) -> Normal;
}

/// Tester under which every pair interacts. Each hitbox is tested against the
/// same fixed groups.
#[derive(Clone, Debug, Default)]
pub struct InteractAll {
    groups: GroupSet,
}

impl InteractAll {
    pub fn new(groups: &[i32]) -> Self {
        Self { groups: GroupSet::from_slice(groups) }
    }
}

impl<O> InteractTester<O> for InteractAll {
    fn can_interact(&self, _a: &Hitbox<O>, _b: &Hitbox<O>) -> bool {
        true
    }

    fn interact_groups(&self, _hitbox: &Hitbox<O>) -> GroupSet {
        self.groups.clone()
    }
}
