use glam::DVec2;

use crate::error::{ColliderError, Result};
use crate::geom::{Aabb, PlacedShape, Shape};

/// Snapshot of a hitbox: where it is, how it moves, and for how long that
/// motion is promised to hold.
///
/// `shape` and `shape_vel` always share a [`ShapeKind`](crate::ShapeKind);
/// the setters that could break this return [`ColliderError::ShapeMismatch`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HitboxState {
    /// Center position.
    pub pos: DVec2,
    /// Center velocity.
    pub vel: DVec2,
    shape: Shape,
    shape_vel: Shape,
    /// How long this state stays valid before the driver must refresh it.
    pub remaining_time: f64,
    /// Negative groups are never tested for collisions.
    pub group: i32,
    interactivity_change: bool,
}

impl HitboxState {
    /// A still hitbox in group 0, valid forever.
    pub fn new(pos: DVec2, shape: Shape) -> Self {
        Self {
            pos,
            vel: DVec2::ZERO,
            shape,
            shape_vel: Shape::zero(shape.kind()),
            remaining_time: f64::INFINITY,
            group: 0,
            interactivity_change: false,
        }
    }

    pub fn from_placed(placed: PlacedShape) -> Self {
        Self::new(placed.pos, placed.shape)
    }

    pub fn moving(mut self, vel: DVec2) -> Self {
        self.vel = vel;
        self
    }

    pub fn resizing(mut self, shape_vel: Shape) -> Result<Self> {
        self.set_shape_vel(shape_vel)?;
        Ok(self)
    }

    pub fn in_group(mut self, group: i32) -> Self {
        self.group = group;
        self
    }

    pub fn valid_for(mut self, remaining_time: f64) -> Self {
        self.remaining_time = remaining_time;
        self
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn shape_vel(&self) -> Shape {
        self.shape_vel
    }

    pub fn set_shape(&mut self, shape: Shape) -> Result<()> {
        check_kind(self.shape, shape)?;
        self.shape = shape;
        Ok(())
    }

    pub fn set_shape_vel(&mut self, shape_vel: Shape) -> Result<()> {
        check_kind(self.shape_vel, shape_vel)?;
        self.shape_vel = shape_vel;
        Ok(())
    }

    /// Ask the collider to re-run `can_interact` against every tracked overlap
    /// when this state is applied. Cleared once the state is committed.
    pub fn mark_interactivity_change(&mut self) {
        self.interactivity_change = true;
    }

    pub fn interactivity_change(&self) -> bool {
        self.interactivity_change
    }

    pub(crate) fn clear_interactivity_change(&mut self) {
        self.interactivity_change = false;
    }

    pub fn placed(&self) -> PlacedShape {
        PlacedShape::new(self.pos, self.shape)
    }

    /// Velocity of the center and of the dimensions, as a `PlacedShape`.
    pub fn placed_vel(&self) -> PlacedShape {
        PlacedShape::new(self.vel, self.shape_vel)
    }

    pub fn is_moving(&self) -> bool {
        self.vel != DVec2::ZERO || self.shape_vel.dims() != DVec2::ZERO
    }

    /// Fastest speed of any edge of the bounding box.
    pub fn max_edge_vel(&self) -> f64 {
        let half = 0.5 * self.shape_vel.dims().abs();
        (self.vel.x.abs() + half.x).max(self.vel.y.abs() + half.y)
    }

    /// State after `dt`, with `remaining_time` reduced accordingly.
    pub fn advance(&self, dt: f64) -> Result<Self> {
        if !(dt >= 0.0 && dt <= self.remaining_time) {
            return Err(ColliderError::BeyondHorizon { dt, remaining: self.remaining_time });
        }
        Ok(self.advanced(dt))
    }

    /// Unchecked [`advance`](Self::advance) for callers that already bound `dt`.
    pub(crate) fn advanced(&self, dt: f64) -> Self {
        let mut out = self.clone();
        out.pos += self.vel * dt;
        out.shape = self.shape.resized(self.shape_vel.dims() * dt);
        out.remaining_time -= dt;
        out
    }

    /// Same state with every dimension grown by `2 * padding`.
    pub(crate) fn padded(&self, padding: f64) -> Self {
        let mut out = self.clone();
        out.shape = self.shape.resized(DVec2::splat(2.0 * padding));
        out
    }

    /// Same state running backwards in time.
    pub(crate) fn reversed(&self) -> Self {
        let mut out = self.clone();
        out.vel = -self.vel;
        out.shape_vel = self.shape_vel.scaled(-1.0);
        out
    }

    /// Bounding box of the shape over `[0, remaining_time]`.
    pub fn swept_bounds(&self) -> Aabb {
        let t = self.remaining_time;
        let end = PlacedShape::new(
            self.pos + DVec2::new(displacement(self.vel.x, t), displacement(self.vel.y, t)),
            self.shape.resized(DVec2::new(
                displacement(self.shape_vel.width(), t),
                displacement(self.shape_vel.height(), t),
            )),
        );
        self.placed().bounds().union(end.bounds())
    }
}

// 0 * inf would poison the bounds with NaN
fn displacement(rate: f64, t: f64) -> f64 {
    if rate == 0.0 { 0.0 } else { rate * t }
}

fn check_kind(current: Shape, replacement: Shape) -> Result<()> {
    if current.kind() == replacement.kind() {
        Ok(())
    } else {
        Err(ColliderError::ShapeMismatch { expected: current.kind(), found: replacement.kind() })
    }
}
