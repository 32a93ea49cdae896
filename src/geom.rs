//! Axis-aligned geometry shared by the solvers and the grid.

use glam::DVec2;

/// Discriminant of [`Shape`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShapeKind {
    Circle,
    Rect,
}

/// Dimensions of a hitbox, or the rate of change of those dimensions.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shape {
    /// Circle given by its diameter.
    Circle { diam: f64 },
    /// Axis-aligned rectangle given by width and height.
    Rect { w: f64, h: f64 },
}

impl Shape {
    pub const fn circle(diam: f64) -> Self {
        Shape::Circle { diam }
    }

    pub const fn rect(w: f64, h: f64) -> Self {
        Shape::Rect { w, h }
    }

    pub const fn square(side: f64) -> Self {
        Shape::Rect { w: side, h: side }
    }

    /// Zero-sized shape of the given kind (a still shape-velocity).
    pub const fn zero(kind: ShapeKind) -> Self {
        match kind {
            ShapeKind::Circle => Shape::Circle { diam: 0.0 },
            ShapeKind::Rect => Shape::Rect { w: 0.0, h: 0.0 },
        }
    }

    pub const fn kind(self) -> ShapeKind {
        match self {
            Shape::Circle { .. } => ShapeKind::Circle,
            Shape::Rect { .. } => ShapeKind::Rect,
        }
    }

    pub const fn width(self) -> f64 {
        match self {
            Shape::Circle { diam } => diam,
            Shape::Rect { w, .. } => w,
        }
    }

    pub const fn height(self) -> f64 {
        match self {
            Shape::Circle { diam } => diam,
            Shape::Rect { h, .. } => h,
        }
    }

    pub fn dims(self) -> DVec2 {
        DVec2::new(self.width(), self.height())
    }

    /// Grow each dimension by `delta`, keeping the kind.
    /// Circles only read `delta.x`.
    pub fn resized(self, delta: DVec2) -> Self {
        match self {
            Shape::Circle { diam } => Shape::Circle { diam: diam + delta.x },
            Shape::Rect { w, h } => Shape::Rect { w: w + delta.x, h: h + delta.y },
        }
    }

    pub fn scaled(self, factor: f64) -> Self {
        match self {
            Shape::Circle { diam } => Shape::Circle { diam: diam * factor },
            Shape::Rect { w, h } => Shape::Rect { w: w * factor, h: h * factor },
        }
    }

    pub fn place(self, pos: DVec2) -> PlacedShape {
        PlacedShape { pos, shape: self }
    }
}

/// A shape centered at a position.
///
/// The same type describes velocities: `pos` is the velocity of the center and
/// `shape` the rate of change of the dimensions, so edge arithmetic on a
/// velocity `PlacedShape` yields edge velocities.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlacedShape {
    pub pos: DVec2,
    pub shape: Shape,
}

impl PlacedShape {
    pub fn new(pos: DVec2, shape: Shape) -> Self {
        Self { pos, shape }
    }

    pub fn left(&self) -> f64 {
        self.pos.x - 0.5 * self.shape.width()
    }

    pub fn right(&self) -> f64 {
        self.pos.x + 0.5 * self.shape.width()
    }

    pub fn bottom(&self) -> f64 {
        self.pos.y - 0.5 * self.shape.height()
    }

    pub fn top(&self) -> f64 {
        self.pos.y + 0.5 * self.shape.height()
    }

    /// Signed edge coordinate along `dir`: the coordinate itself for east/north,
    /// negated for west/south, so that larger always means "further out".
    pub fn edge(&self, dir: CardDir) -> f64 {
        match dir {
            CardDir::East => self.right(),
            CardDir::North => self.top(),
            CardDir::West => -self.left(),
            CardDir::South => -self.bottom(),
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb {
            min: DVec2::new(self.left(), self.bottom()),
            max: DVec2::new(self.right(), self.top()),
        }
    }

    /// Which of the 9 regions around this rectangle `point` lies in.
    pub fn sector(&self, point: DVec2) -> RectSector {
        RectSector {
            x: interval_sector(self.left(), self.right(), point.x),
            y: interval_sector(self.bottom(), self.top(), point.y),
        }
    }

    /// Corner of this rectangle facing a corner sector.
    pub fn corner(&self, sector: RectSector) -> DVec2 {
        debug_assert!(sector.is_corner(), "corner() needs a corner sector");
        let x = if sector.x > 0 { self.right() } else { self.left() };
        let y = if sector.y > 0 { self.top() } else { self.bottom() };
        DVec2::new(x, y)
    }
}

fn interval_sector(lo: f64, hi: f64, value: f64) -> i8 {
    if value < lo {
        -1
    } else if value > hi {
        1
    } else {
        0
    }
}

/// Overlap of `a` and `b` along `dir`; negative when they are apart on that side.
pub fn rect_overlap(a: &PlacedShape, b: &PlacedShape, dir: CardDir) -> f64 {
    a.edge(dir) + b.edge(dir.reverse())
}

/// Position of a point relative to a rectangle, per axis: -1 below, 0 within, 1 above.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RectSector {
    pub x: i8,
    pub y: i8,
}

impl RectSector {
    pub fn is_corner(self) -> bool {
        self.x != 0 && self.y != 0
    }
}

/// The four axis directions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CardDir {
    East,
    North,
    West,
    South,
}

impl CardDir {
    pub const ALL: [CardDir; 4] = [CardDir::East, CardDir::North, CardDir::West, CardDir::South];

    pub fn reverse(self) -> Self {
        match self {
            CardDir::East => CardDir::West,
            CardDir::North => CardDir::South,
            CardDir::West => CardDir::East,
            CardDir::South => CardDir::North,
        }
    }

    pub fn unit(self) -> DVec2 {
        match self {
            CardDir::East => DVec2::X,
            CardDir::North => DVec2::Y,
            CardDir::West => DVec2::NEG_X,
            CardDir::South => DVec2::NEG_Y,
        }
    }
}

/// Axis-aligned bounding box as (min, max) corners.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: DVec2,
    pub max: DVec2,
}

impl Aabb {
    pub fn union(self, other: Aabb) -> Aabb {
        Aabb { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    /// Touching boxes count as overlapping.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }
}
