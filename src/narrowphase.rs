use glam::DVec2;

use crate::api::SweepApi;
use crate::geom::{CardDir, PlacedShape, ShapeKind, rect_overlap};
use crate::state::HitboxState;
use crate::types::{EventKind, Normal};

/// Analytic sweep solvers over pairs of [`HitboxState`]s.
///
/// Times are measured from the instant both states describe and are bounded
/// by the shorter of the two `remaining_time` horizons; a result at or past
/// that horizon is reported as `None`.
pub struct Narrowphase;

impl SweepApi for Narrowphase {
    fn collide_time(a: &HitboxState, b: &HitboxState) -> Option<f64> {
        let (a, b) = with_common_horizon(a, b);
        if !a.swept_bounds().overlaps(&b.swept_bounds()) {
            return None;
        }
        time_unpadded(&a, &b, EventKind::Collide)
    }

    fn separate_time(a: &HitboxState, b: &HitboxState, padding: f64) -> Option<f64> {
        let (mut a, mut b) = with_common_horizon(a, b);
        match (a.shape().kind(), b.shape().kind()) {
            (ShapeKind::Rect, ShapeKind::Rect) | (ShapeKind::Circle, _) => a = a.padded(padding),
            (ShapeKind::Rect, ShapeKind::Circle) => b = b.padded(padding),
        }
        if !a.swept_bounds().overlaps(&b.swept_bounds()) {
            return within_horizon(0.0, a.remaining_time);
        }
        time_unpadded(&a, &b, EventKind::Separate)
    }

    fn normal(src: &PlacedShape, dst: &PlacedShape) -> Normal {
        match (src.shape.kind(), dst.shape.kind()) {
            (ShapeKind::Rect, ShapeKind::Rect) => rect_rect_normal(src, dst),
            (ShapeKind::Rect, ShapeKind::Circle) => rect_circle_normal(src, dst),
            (ShapeKind::Circle, ShapeKind::Rect) => {
                let n = rect_circle_normal(dst, src);
                Normal { dir: -n.dir, overlap: n.overlap }
            }
            (ShapeKind::Circle, ShapeKind::Circle) => circle_circle_normal(
                src.pos,
                0.5 * src.shape.width(),
                dst.pos,
                0.5 * dst.shape.width(),
            ),
        }
    }
}

fn with_common_horizon(a: &HitboxState, b: &HitboxState) -> (HitboxState, HitboxState) {
    let horizon = a.remaining_time.min(b.remaining_time);
    (a.clone().valid_for(horizon), b.clone().valid_for(horizon))
}

fn within_horizon(t: f64, horizon: f64) -> Option<f64> {
    // NaN and +inf both fall through to None
    (t < horizon).then_some(t)
}

fn time_unpadded(a: &HitboxState, b: &HitboxState, kind: EventKind) -> Option<f64> {
    let t = match (a.shape().kind(), b.shape().kind()) {
        (ShapeKind::Rect, ShapeKind::Rect) => rect_rect_time(a, b, kind),
        (ShapeKind::Rect, ShapeKind::Circle) => rect_circle_time(a, b, kind),
        (ShapeKind::Circle, ShapeKind::Rect) => rect_circle_time(b, a, kind),
        (ShapeKind::Circle, ShapeKind::Circle) => {
            circle_circle_time(&Disc::of(a), &Disc::of(b), kind)
        }
    };
    within_horizon(t, a.remaining_time.min(b.remaining_time))
}

/// Separating-axis sweep with overlaps linear in time. Circles are treated
/// as their bounding squares.
fn rect_rect_time(a: &HitboxState, b: &HitboxState, kind: EventKind) -> f64 {
    let collide = kind == EventKind::Collide;
    let (pa, pb) = (a.placed(), b.placed());
    let (va, vb) = (a.placed_vel(), b.placed_vel());
    let mut start = 0.0_f64;
    let mut end = f64::INFINITY;
    for dir in CardDir::ALL {
        let overlap = rect_overlap(&pa, &pb, dir);
        let overlap_vel = rect_overlap(&va, &vb, dir);
        if overlap < 0.0 {
            if !collide {
                return 0.0;
            }
            if overlap_vel <= 0.0 {
                return f64::INFINITY;
            }
            start = start.max(-overlap / overlap_vel);
        } else if overlap_vel < 0.0 {
            end = end.min(-overlap / overlap_vel);
        }
        if start >= end {
            return if collide { f64::INFINITY } else { 0.0 };
        }
    }
    if collide { start } else { end }
}

/// A circle (or a point, with zero radius) moving and growing linearly.
struct Disc {
    pos: DVec2,
    vel: DVec2,
    rad: f64,
    rad_vel: f64,
}

impl Disc {
    fn of(state: &HitboxState) -> Self {
        Self {
            pos: state.pos,
            vel: state.vel,
            rad: 0.5 * state.shape().width(),
            rad_vel: 0.5 * state.shape_vel().width(),
        }
    }
}

/// First non-negative root of `|dpos(t)|^2 = rad(t)^2`, signed so that the
/// root marks entry for collisions and exit for separations.
fn circle_circle_time(a: &Disc, b: &Disc, kind: EventKind) -> f64 {
    let sign = if kind == EventKind::Collide { 1.0 } else { -1.0 };

    let net_rad = a.rad + b.rad;
    let dist = a.pos - b.pos;
    let c = sign * (net_rad * net_rad - dist.length_squared());
    if c > 0.0 {
        return 0.0;
    }

    let net_rad_vel = a.rad_vel + b.rad_vel;
    let dist_vel = a.vel - b.vel;
    let qa = sign * (net_rad_vel * net_rad_vel - dist_vel.length_squared());
    let qb = sign * 2.0 * (net_rad * net_rad_vel - dist.dot(dist_vel));

    let t = quad_root_ascending(qa, qb, c);
    if t >= 0.0 { t } else { f64::INFINITY }
}

/// The smaller root of `a t^2 + b t + c` when `a` is negative, picking the
/// formula that avoids cancellation. NaN if there is no real root.
fn quad_root_ascending(a: f64, b: f64, c: f64) -> f64 {
    let det = b * b - 4.0 * a * c;
    if det < 0.0 {
        return f64::NAN;
    }
    if b >= 0.0 { (2.0 * c) / (-b - det.sqrt()) } else { (-b + det.sqrt()) / (2.0 * a) }
}

fn rect_circle_time(rect: &HitboxState, circle: &HitboxState, kind: EventKind) -> f64 {
    match kind {
        EventKind::Collide => rect_circle_collide_time(rect, circle),
        EventKind::Separate => rect_circle_separate_time(rect, circle),
    }
}

fn rect_circle_collide_time(rect: &HitboxState, circle: &HitboxState) -> f64 {
    let base = rect_rect_time(rect, circle, EventKind::Collide);
    if base == f64::INFINITY {
        return base;
    }
    base + rebased_rect_circle_collide_time(&rect.advanced(base), &circle.advanced(base))
}

/// Collision time given the bounding square already touches the rectangle:
/// immediate unless the circle sits off a corner, in which case the corner
/// is swept as a point against the circle.
fn rebased_rect_circle_collide_time(rect: &HitboxState, circle: &HitboxState) -> f64 {
    let placed = rect.placed();
    let sector = placed.sector(circle.pos);
    if !sector.is_corner() {
        return 0.0;
    }
    let corner = Disc {
        pos: placed.corner(sector),
        vel: rect.placed_vel().corner(sector),
        rad: 0.0,
        rad_vel: 0.0,
    };
    circle_circle_time(&corner, &Disc::of(circle), EventKind::Collide)
}

/// Runs the collision solver backwards from the moment the bounding square
/// separates.
fn rect_circle_separate_time(rect: &HitboxState, circle: &HitboxState) -> f64 {
    let base = rect_rect_time(rect, circle, EventKind::Separate);
    if base == 0.0 || base == f64::INFINITY {
        return base;
    }
    let rect = rect.advanced(base).reversed();
    let circle = circle.advanced(base).reversed();
    (base - rebased_rect_circle_collide_time(&rect, &circle)).max(0.0)
}

fn rect_rect_normal(src: &PlacedShape, dst: &PlacedShape) -> Normal {
    let mut best = Normal { dir: CardDir::East.unit(), overlap: f64::INFINITY };
    for dir in CardDir::ALL {
        let overlap = rect_overlap(src, dst, dir);
        if overlap < best.overlap {
            best = Normal { dir: dir.unit(), overlap };
        }
    }
    best
}

fn rect_circle_normal(src: &PlacedShape, dst: &PlacedShape) -> Normal {
    let sector = src.sector(dst.pos);
    if sector.is_corner() {
        circle_circle_normal(src.corner(sector), 0.0, dst.pos, 0.5 * dst.shape.width())
    } else {
        rect_rect_normal(src, dst)
    }
}

fn circle_circle_normal(src: DVec2, src_rad: f64, dst: DVec2, dst_rad: f64) -> Normal {
    let delta = dst - src;
    let dist = delta.length();
    let dir = if dist == 0.0 { DVec2::X } else { delta / dist };
    Normal { dir, overlap: src_rad + dst_rad - dist }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::geom::Shape;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> HitboxState {
        HitboxState::new(DVec2::new(x, y), Shape::rect(w, h))
    }

    fn circle(x: f64, y: f64, diam: f64) -> HitboxState {
        HitboxState::new(DVec2::new(x, y), Shape::circle(diam))
    }

    fn approx(t: Option<f64>, expected: f64) -> bool {
        t.is_some_and(|t| (t - expected).abs() < 1e-9)
    }

    #[test]
    fn test_rect_rect_head_on() {
        let a = rect(-3.0, 0.0, 2.0, 2.0).moving(DVec2::new(5.0, 0.0));
        let b = rect(0.0, 0.0, 2.0, 2.0);
        assert!(approx(Narrowphase::collide_time(&a, &b), 0.2));
        assert!(approx(Narrowphase::collide_time(&b, &a), 0.2));
    }

    #[test]
    fn test_rect_rect_miss_and_recede() {
        // passes above
        let a = rect(-3.0, 3.0, 2.0, 2.0).moving(DVec2::new(5.0, 0.0));
        let b = rect(0.0, 0.0, 2.0, 2.0);
        assert_eq!(Narrowphase::collide_time(&a, &b), None);
        // moving away
        let a = rect(-3.0, 0.0, 2.0, 2.0).moving(DVec2::new(-1.0, 0.0));
        assert_eq!(Narrowphase::collide_time(&a, &b), None);
        // touching and receding
        let a = rect(-2.0, 0.0, 2.0, 2.0).moving(DVec2::new(-1.0, 0.0));
        assert_eq!(Narrowphase::collide_time(&a, &b), None);
    }

    #[test]
    fn test_rect_rect_growing_into_contact() {
        let a = rect(0.0, 0.0, 2.0, 2.0).resizing(Shape::rect(2.0, 0.0)).unwrap();
        let b = rect(3.0, 0.0, 2.0, 2.0);
        // right edge moves at 1 per unit time and must cover a gap of 1
        assert!(approx(Narrowphase::collide_time(&a, &b), 1.0));
    }

    #[test]
    fn test_already_overlapping_collides_now() {
        let a = rect(0.0, 0.0, 2.0, 2.0);
        let b = circle(0.5, 0.5, 1.0);
        assert_eq!(Narrowphase::collide_time(&a, &b), Some(0.0));
        assert_eq!(Narrowphase::collide_time(&b, &b.clone()), Some(0.0));
    }

    #[test]
    fn test_horizon_bounds_results() {
        let a = rect(-3.0, 0.0, 2.0, 2.0).moving(DVec2::new(5.0, 0.0)).valid_for(0.1);
        let b = rect(0.0, 0.0, 2.0, 2.0);
        assert_eq!(Narrowphase::collide_time(&a, &b), None);
        // a hit exactly at the horizon is left for the next state
        let a = a.valid_for(0.2);
        assert_eq!(Narrowphase::collide_time(&a, &b), None);
        let a = a.valid_for(0.25);
        assert!(approx(Narrowphase::collide_time(&a, &b), 0.2));
        let b = b.valid_for(0.0);
        assert_eq!(Narrowphase::collide_time(&a, &b), None);
    }

    #[test]
    fn test_circle_circle_head_on() {
        let a = circle(-3.0, 0.0, 2.0).moving(DVec2::new(5.0, 0.0));
        let b = circle(0.0, 0.0, 2.0);
        assert!(approx(Narrowphase::collide_time(&a, &b), 0.2));
        assert!(approx(Narrowphase::collide_time(&b, &a), 0.2));
    }

    #[test]
    fn test_circle_circle_glancing_miss() {
        let a = circle(-3.0, 2.01, 2.0).moving(DVec2::new(5.0, 0.0));
        let b = circle(0.0, 0.0, 2.0);
        assert_eq!(Narrowphase::collide_time(&a, &b), None);
        let a = circle(-3.0, 1.99, 2.0).moving(DVec2::new(5.0, 0.0));
        assert!(Narrowphase::collide_time(&a, &b).is_some());
    }

    #[test]
    fn test_circle_circle_separate() {
        let a = circle(0.0, 0.0, 2.0);
        let b = circle(1.0, 0.0, 2.0).moving(DVec2::new(1.0, 0.0));
        // padding one circle moves the contact distance out to 2.1
        assert!(approx(Narrowphase::separate_time(&a, &b, 0.1), 1.1));
        assert!(approx(Narrowphase::separate_time(&b, &a, 0.1), 1.1));
        let still = circle(1.0, 0.0, 2.0);
        assert_eq!(Narrowphase::separate_time(&a, &still, 0.1), None);
    }

    #[test]
    fn test_rect_circle_side_hit() {
        let r = rect(10.0, 0.0, 2.0, 2.0).moving(DVec2::new(-1.0, 0.0));
        let c = circle(0.0, 0.0, 2.0).moving(DVec2::new(1.0, 0.0));
        assert!(approx(Narrowphase::collide_time(&r, &c), 4.0));
        assert!(approx(Narrowphase::collide_time(&c, &r), 4.0));

        let r = r.advance(4.0).unwrap();
        let c = c.advance(4.0).unwrap();
        assert!(approx(Narrowphase::separate_time(&c, &r, 0.1), 2.05));
        assert!(approx(Narrowphase::separate_time(&r, &c, 0.1), 2.05));
    }

    #[test]
    fn test_rect_circle_corner_hit() {
        let r = rect(0.0, 0.0, 2.0, 2.0);
        let c = circle(3.0, 3.0, 2.0).moving(DVec2::new(-1.0, -1.0));
        // bounding square touches at t = 1, then the corner at (1, 1) is
        // still 1/sqrt(2) of travel away from the circle's edge
        let expected = 2.0 - std::f64::consts::FRAC_1_SQRT_2;
        assert!(approx(Narrowphase::collide_time(&r, &c), expected));
        assert!(approx(Narrowphase::collide_time(&c, &r), expected));
    }

    #[test]
    fn test_rect_circle_corner_miss() {
        let r = rect(0.0, 0.0, 2.0, 2.0);
        // the bounding square clips the corner but the circle passes 1.2 away
        let c = circle(3.85, -0.15, 2.0).moving(DVec2::new(-1.0, 1.0));
        assert_eq!(Narrowphase::collide_time(&r, &c), None);
    }

    #[test]
    fn test_rect_circle_separate_through_corner() {
        let r = rect(0.0, 0.0, 2.0, 2.0);
        // leaves diagonally past the (1, 1) corner
        let c = circle(1.5, 1.5, 2.0).moving(DVec2::new(1.0, 1.0));
        let t = Narrowphase::separate_time(&r, &c, 0.1).unwrap();
        let end = c.advance(t).unwrap();
        let gap = (end.pos - DVec2::new(1.0, 1.0)).length();
        assert!((gap - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_rect_rect_separate() {
        let a = rect(0.0, 0.0, 2.0, 2.0);
        let b = rect(1.5, 0.0, 2.0, 2.0).moving(DVec2::new(1.0, 0.0));
        assert!(approx(Narrowphase::separate_time(&a, &b, 0.1), 0.6));
        // already apart, even with the padding
        let b = rect(3.5, 0.0, 2.0, 2.0);
        assert_eq!(Narrowphase::separate_time(&a, &b, 0.1), Some(0.0));
    }

    #[test]
    fn test_quad_root_ascending() {
        // -(t - 1)(t - 3) = -t^2 + 4t - 3
        assert!((quad_root_ascending(-1.0, 4.0, -3.0) - 1.0).abs() < 1e-12);
        assert!((quad_root_ascending(-1.0, -4.0, -3.0) - -3.0).abs() < 1e-12);
        assert!(quad_root_ascending(1.0, 0.0, 1.0).is_nan());
    }

    #[test]
    fn test_normals() {
        let a = Shape::square(2.0).place(DVec2::ZERO);
        let b = Shape::square(2.0).place(DVec2::new(1.5, 0.2));
        let n = Narrowphase::normal(&a, &b);
        assert_eq!(n.dir, DVec2::X);
        assert!((n.overlap - 0.5).abs() < 1e-12);

        let c = Shape::circle(2.0).place(DVec2::new(0.0, -3.0));
        let d = Shape::circle(2.0).place(DVec2::ZERO);
        let n = Narrowphase::normal(&c, &d);
        assert_eq!(n.dir, DVec2::Y);
        assert!((n.overlap + 1.0).abs() < 1e-12);

        let n = Narrowphase::normal(&d, &d);
        assert_eq!(n.dir, DVec2::X);
        assert_eq!(n.overlap, 2.0);
    }

    #[test]
    fn test_rect_circle_normals() {
        let r = Shape::square(2.0).place(DVec2::ZERO);
        let corner = Shape::circle(2.0).place(DVec2::new(2.0, 2.0));
        let n = Narrowphase::normal(&r, &corner);
        let diag = DVec2::splat(std::f64::consts::FRAC_1_SQRT_2);
        assert!((n.dir - diag).length() < 1e-12);
        assert!((n.overlap - (1.0 - std::f64::consts::SQRT_2)).abs() < 1e-12);

        let flipped = Narrowphase::normal(&corner, &r);
        assert!((flipped.dir + diag).length() < 1e-12);
        assert_eq!(flipped.overlap, n.overlap);

        // beside an edge the circle acts as its bounding square
        let side = Shape::circle(2.0).place(DVec2::new(0.5, 1.5));
        let n = Narrowphase::normal(&r, &side);
        assert_eq!(n.dir, DVec2::Y);
        assert!((n.overlap - 0.5).abs() < 1e-12);
    }

    fn arb_shape() -> impl Strategy<Value = Shape> {
        prop_oneof![
            (0.1..4.0f64).prop_map(Shape::circle),
            (0.1..4.0f64, 0.1..4.0f64).prop_map(|(w, h)| Shape::rect(w, h)),
        ]
    }

    fn arb_state() -> impl Strategy<Value = HitboxState> {
        (-10.0..10.0f64, -10.0..10.0f64, -5.0..5.0f64, -5.0..5.0f64, arb_shape(), 0.5..20.0f64)
            .prop_map(|(x, y, vx, vy, shape, remaining)| {
                HitboxState::new(DVec2::new(x, y), shape)
                    .moving(DVec2::new(vx, vy))
                    .valid_for(remaining)
            })
    }

    proptest! {
        #[test]
        fn collide_time_is_symmetric(a in arb_state(), b in arb_state()) {
            prop_assert_eq!(Narrowphase::collide_time(&a, &b), Narrowphase::collide_time(&b, &a));
        }

        #[test]
        fn collide_time_is_within_horizon(a in arb_state(), b in arb_state()) {
            if let Some(t) = Narrowphase::collide_time(&a, &b) {
                prop_assert!(t >= 0.0);
                prop_assert!(t < a.remaining_time.min(b.remaining_time));
            }
        }

        #[test]
        fn normal_overlap_is_symmetric(a in arb_state(), b in arb_state()) {
            let ab = Narrowphase::normal(&a.placed(), &b.placed());
            let ba = Narrowphase::normal(&b.placed(), &a.placed());
            prop_assert!((ab.overlap - ba.overlap).abs() < 1e-9);
            prop_assert!((ab.dir.length() - 1.0).abs() < 1e-9);
        }
    }
}
