//! sweepbox: continuous collision detection for moving, resizing axis-aligned
//! rectangles and circles.
//!
//! A [`Collider`] predicts the exact times at which pairs of hitboxes start or
//! stop overlapping and steps a simulation clock from one such event to the
//! next. Which pairs are tested is decided by an [`InteractTester`].

pub mod api;
pub mod collider;
pub mod error;
pub mod geom;
mod grid;
pub mod hitbox;
pub mod narrowphase;
mod queue;
pub mod state;
pub mod types;

pub use crate::api::*;
pub use crate::collider::Collider;
pub use crate::error::{ColliderError, Result};
pub use crate::geom::{Aabb, CardDir, PlacedShape, RectSector, Shape, ShapeKind};
pub use crate::hitbox::{Hitbox, HitboxId};
pub use crate::narrowphase::Narrowphase;
pub use crate::state::HitboxState;
pub use crate::types::*;
