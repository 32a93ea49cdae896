use glam::DVec2;
use smallvec::SmallVec;

use crate::error::{ColliderError, Result};
use crate::hitbox::HitboxId;

/// Groups a hitbox is tested against. Usually one to three entries.
pub type GroupSet = SmallVec<[i32; 4]>;

/// Construction-time settings for a [`Collider`](crate::Collider).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColliderConfig {
    /// Width and height of a grid cell in world units.
    /// Most hitboxes should be smaller than one cell; if the game is tile based,
    /// the tile size (or a power of two times it) is a good choice.
    pub cell_width: f64,
    /// Roughly how far two collided hitboxes must drift apart before a
    /// separation is reported. Must be non-zero for numerical stability;
    /// about a tenth of a pixel is unnoticeable.
    pub separate_buffer: f64,
    /// Upper bound on how far ahead events are scheduled for moving hitboxes.
    pub max_foresight_time: f64,
}

impl ColliderConfig {
    pub fn new(cell_width: f64, separate_buffer: f64) -> Self {
        Self { cell_width, separate_buffer, max_foresight_time: f64::INFINITY }
    }

    pub fn with_max_foresight_time(mut self, max_foresight_time: f64) -> Self {
        self.max_foresight_time = max_foresight_time;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.cell_width > 0.0 && self.cell_width.is_finite()) {
            return Err(ColliderError::InvalidCellWidth(self.cell_width));
        }
        if !(self.separate_buffer > 0.0 && self.separate_buffer.is_finite()) {
            return Err(ColliderError::InvalidSeparateBuffer(self.separate_buffer));
        }
        if !(self.max_foresight_time > 0.0) {
            return Err(ColliderError::InvalidForesightTime(self.max_foresight_time));
        }
        Ok(())
    }
}

/// Event discriminator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    Collide,
    Separate,
}

impl EventKind {
    pub fn opposite(self) -> Self {
        match self {
            EventKind::Collide => EventKind::Separate,
            EventKind::Separate => EventKind::Collide,
        }
    }
}

/// A collision or separation reported by [`Collider::advance`](crate::Collider::advance).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColliderEvent {
    pub time: f64,
    pub kind: EventKind,
    pub a: HitboxId,
    pub b: HitboxId,
}

impl ColliderEvent {
    pub fn is_collision(&self) -> bool {
        self.kind == EventKind::Collide
    }

    pub fn is_separation(&self) -> bool {
        self.kind == EventKind::Separate
    }

    pub fn involves(&self, id: HitboxId) -> bool {
        self.a == id || self.b == id
    }

    /// The hitbox paired with `id` in this event.
    pub fn other(&self, id: HitboxId) -> Option<HitboxId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }

    pub fn swapped(self) -> Self {
        Self { a: self.b, b: self.a, ..self }
    }
}

/// Separation direction between two hitboxes at the current time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Normal {
    /// Unit vector pointing from the source hitbox toward the destination.
    pub dir: DVec2,
    /// Penetration depth; negative values are the gap between the shapes.
    pub overlap: f64,
}

/// Bookkeeping counters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ColliderStats {
    pub hitboxes: usize,
    /// Sum over cells of the hitboxes indexed in that cell.
    pub grid_entries: usize,
    pub queued_events: usize,
    /// Tracked overlapping pairs.
    pub overlaps: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "serde")]
    #[test]
    fn test_reported_events_are_serializable() {
        fn serializable<T: serde::Serialize + serde::de::DeserializeOwned>() {}
        serializable::<ColliderEvent>();
        serializable::<HitboxId>();
        serializable::<ColliderConfig>();
    }

    #[test]
    fn test_config_validation() {
        assert!(ColliderConfig::new(2.0, 0.1).validate().is_ok());
        assert_eq!(
            ColliderConfig::new(0.0, 0.1).validate(),
            Err(ColliderError::InvalidCellWidth(0.0))
        );
        assert_eq!(
            ColliderConfig::new(1.0, -0.1).validate(),
            Err(ColliderError::InvalidSeparateBuffer(-0.1))
        );
        assert!(ColliderConfig::new(f64::NAN, 0.1).validate().is_err());
        assert!(ColliderConfig::new(1.0, 0.1).with_max_foresight_time(0.0).validate().is_err());
        assert!(ColliderConfig::new(1.0, 0.1).with_max_foresight_time(2.0).validate().is_ok());
    }

    #[test]
    fn test_event_helpers() {
        let a = HitboxId::new(0, 0);
        let b = HitboxId::new(1, 0);
        let c = HitboxId::new(2, 0);
        let ev = ColliderEvent { time: 1.0, kind: EventKind::Collide, a, b };
        assert!(ev.is_collision() && !ev.is_separation());
        assert_eq!(ev.other(a), Some(b));
        assert_eq!(ev.other(b), Some(a));
        assert_eq!(ev.other(c), None);
        assert!(ev.involves(b) && !ev.involves(c));
        let sw = ev.swapped();
        assert_eq!((sw.a, sw.b), (b, a));
        assert_eq!(EventKind::Collide.opposite(), EventKind::Separate);
    }
}
