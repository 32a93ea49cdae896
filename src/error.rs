use thiserror::Error;

use crate::geom::ShapeKind;
use crate::hitbox::HitboxId;

/// Contract violations reported by the collider.
///
/// None of these are transient: each one means the caller broke a documented
/// precondition, and the operation that detected it had no effect.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ColliderError {
    #[error("cell width must be positive and finite, got {0}")]
    InvalidCellWidth(f64),
    #[error("separate buffer must be positive and finite, got {0}")]
    InvalidSeparateBuffer(f64),
    #[error("max foresight time must be positive, got {0}")]
    InvalidForesightTime(f64),
    #[error("remaining time must be non-negative, got {0}")]
    NegativeRemainingTime(f64),
    #[error("time must be finite, got {0}")]
    InvalidTime(f64),
    #[error("cannot move the clock back from {now} to {requested}")]
    TimeRewind { now: f64, requested: f64 },
    #[error("hitbox {0:?} was deleted")]
    StaleHitbox(HitboxId),
    #[error("hitbox state expired at {expired_at}, clock is at {now}")]
    StateExpired { expired_at: f64, now: f64 },
    #[error("shape kind mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch { expected: ShapeKind, found: ShapeKind },
    #[error("cannot advance a state by {dt}, it is only valid for {remaining}")]
    BeyondHorizon { dt: f64, remaining: f64 },
}

pub type Result<T, E = ColliderError> = std::result::Result<T, E>;
