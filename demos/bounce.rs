use glam::DVec2;
use sweepbox::*;

/// What a hitbox is in this little scene.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Body {
    Ball,
    Wall,
}

/// Walls only ever meet balls; balls meet each other and walls.
struct Rules;

impl InteractTester<Body> for Rules {
    fn can_interact(&self, a: &Hitbox<Body>, b: &Hitbox<Body>) -> bool {
        !(*a.owner() == Body::Wall && *b.owner() == Body::Wall)
    }

    fn interact_groups(&self, hitbox: &Hitbox<Body>) -> GroupSet {
        match hitbox.owner() {
            Body::Ball => GroupSet::from_slice(&[0, 1]),
            Body::Wall => GroupSet::from_slice(&[0]),
        }
    }
}

const BALL_GROUP: i32 = 0;
const WALL_GROUP: i32 = 1;

fn main() -> Result<()> {
    let mut collider = Collider::new(ColliderConfig::new(4.0, 0.01), Rules)?;

    // a 20 x 12 box of walls
    for (pos, shape) in [
        (DVec2::new(0.0, 6.5), Shape::rect(22.0, 1.0)),
        (DVec2::new(0.0, -6.5), Shape::rect(22.0, 1.0)),
        (DVec2::new(10.5, 0.0), Shape::rect(1.0, 12.0)),
        (DVec2::new(-10.5, 0.0), Shape::rect(1.0, 12.0)),
    ] {
        collider.new_hitbox(HitboxState::new(pos, shape).in_group(WALL_GROUP), Body::Wall)?;
    }

    let balls = [
        (DVec2::new(-5.0, 0.0), DVec2::new(3.0, 1.0), Shape::circle(1.0)),
        (DVec2::new(4.0, 2.0), DVec2::new(-2.0, -2.5), Shape::circle(1.5)),
        (DVec2::new(0.0, -3.0), DVec2::new(1.0, 4.0), Shape::square(1.0)),
    ];
    for (pos, vel, shape) in balls {
        let state = HitboxState::new(pos, shape).moving(vel).in_group(BALL_GROUP);
        let id = collider.new_hitbox(state, Body::Ball)?;
        println!("Inserted ball {:?} at ({:.1},{:.1})", id, pos.x, pos.y);
    }

    let end = 20.0;
    let mut bounces = 0usize;
    while let Some(ev) = collider.advance_inclusive(end)? {
        if !ev.is_collision() {
            continue;
        }
        // reflect every ball involved along the contact normal
        for (me, other) in [(ev.a, ev.b), (ev.b, ev.a)] {
            if *collider.owner(me)? != Body::Ball {
                continue;
            }
            let n = collider.normal(other, me)?;
            let mut state = collider.get_state(me)?;
            let along = state.vel.dot(n.dir);
            if along < 0.0 {
                state.vel -= 2.0 * along * n.dir;
                collider.set_state(me, state)?;
            }
        }
        bounces += 1;
        println!(
            "t={:.3} {:?} hit {:?} ({:?} vs {:?})",
            ev.time,
            ev.a,
            ev.b,
            collider.owner(ev.a)?,
            collider.owner(ev.b)?
        );
    }

    let stats = collider.stats();
    println!(
        "t={:.1} bounces={} hitboxes={} grid_entries={} queued={} overlaps={}",
        collider.time(),
        bounces,
        stats.hitboxes,
        stats.grid_entries,
        stats.queued_events,
        stats.overlaps
    );
    Ok(())
}
