use glam::DVec2;
use std::time::Instant;
use sweepbox::*;

fn lcg(seed: &mut u32) -> u32 {
    *seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
    *seed
}

fn unit(seed: &mut u32) -> f64 {
    f64::from(lcg(seed)) / f64::from(u32::MAX)
}

fn main() -> Result<()> {
    let cfg = ColliderConfig::new(2.0, 0.01);
    let mut collider: Collider<usize, _> = Collider::new(cfg, InteractAll::new(&[0]))?;

    let n = 5_000usize; // number of hitboxes
    let mut seed = 1u32;
    let t0 = Instant::now();
    for i in 0..n {
        let pos = DVec2::new(unit(&mut seed) * 200.0 - 100.0, unit(&mut seed) * 200.0 - 100.0);
        let vel = DVec2::new(unit(&mut seed) * 4.0 - 2.0, unit(&mut seed) * 4.0 - 2.0);
        let shape = if i % 2 == 0 { Shape::square(1.0) } else { Shape::circle(1.0) };
        collider.new_hitbox(HitboxState::new(pos, shape).moving(vel), i)?;
    }
    let t_insert = t0.elapsed();

    let end = 10.0;
    let (mut collisions, mut separations) = (0usize, 0usize);
    let t1 = Instant::now();
    while let Some(ev) = collider.advance_inclusive(end)? {
        match ev.kind {
            EventKind::Collide => collisions += 1,
            EventKind::Separate => separations += 1,
        }
    }
    let t_run = t1.elapsed();

    let stats = collider.stats();
    println!(
        "N={} cell_width={} insert={:?} run={:?} collisions={} separations={}",
        n, collider.config().cell_width, t_insert, t_run, collisions, separations
    );
    println!(
        "grid_entries={} queued_events={} overlaps={}",
        stats.grid_entries, stats.queued_events, stats.overlaps
    );
    Ok(())
}
