//! Uniform grid over swept bounding boxes, keyed by (cell, group).

use rustc_hash::FxHashMap;

use crate::hitbox::HitboxId;
use crate::state::HitboxState;

/// Inclusive range of cells `[l, r] x [b, t]`. Never empty.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct CellRange {
    pub l: i32,
    pub b: i32,
    pub r: i32,
    pub t: i32,
}

impl CellRange {
    pub fn cells(self) -> impl Iterator<Item = (i32, i32)> {
        (self.b..=self.t).flat_map(move |y| (self.l..=self.r).map(move |x| (x, y)))
    }

    /// Cells of `self` outside `sub`, skipping the shared block row by row
    /// instead of filtering it cell by cell.
    pub fn diff(self, sub: Option<CellRange>) -> impl Iterator<Item = (i32, i32)> {
        let (l, r) = (i64::from(self.l), i64::from(self.r));
        (self.b..=self.t).flat_map(move |y| {
            let (left_hi, right_lo) = match sub {
                Some(s) if s.b <= y && y <= s.t => {
                    (r.min(i64::from(s.l) - 1), l.max(i64::from(s.r) + 1))
                }
                _ => (r, r + 1),
            };
            (l..=left_hi).chain(right_lo..=r).map(move |x| (x as i32, y))
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct CellKey {
    x: i32,
    y: i32,
    group: i32,
}

/// Spatial index from (cell, group) to the hitboxes whose swept bounds touch that cell.
pub(crate) struct Grid {
    cell_width: f64,
    cells: FxHashMap<CellKey, Vec<HitboxId>>,
    entries: usize,
}

impl Grid {
    pub fn new(cell_width: f64) -> Self {
        debug_assert!(cell_width > 0.0);
        Self { cell_width, cells: FxHashMap::default(), entries: 0 }
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Cells covered by the swept bounding box of `state`.
    pub fn index_bounds(&self, state: &HitboxState) -> CellRange {
        let bounds = state.swept_bounds();
        let cw = self.cell_width;
        let l = (bounds.min.x / cw).floor() as i32;
        let b = (bounds.min.y / cw).floor() as i32;
        let r = l.max(((bounds.max.x / cw).ceil() as i32).saturating_sub(1));
        let t = b.max(((bounds.max.y / cw).ceil() as i32).saturating_sub(1));
        CellRange { l, b, r, t }
    }

    /// Time until the swept bounds of `state` would outgrow a cell in any
    /// direction; infinite for a still hitbox.
    pub fn grid_period(&self, state: &HitboxState) -> f64 {
        let speed = state.max_edge_vel();
        if speed <= 0.0 { f64::INFINITY } else { self.cell_width / speed }
    }

    /// Index `id` under the cells of `new` that are not in `old`.
    pub fn add(&mut self, id: HitboxId, group: i32, old: Option<CellRange>, new: Option<CellRange>) {
        if group < 0 {
            return;
        }
        let Some(new) = new else { return };
        for (x, y) in new.diff(old) {
            let members = self.cells.entry(CellKey { x, y, group }).or_default();
            debug_assert!(!members.contains(&id), "hitbox indexed twice in one cell");
            members.push(id);
            self.entries += 1;
        }
    }

    /// Drop `id` from the cells of `old` that are not in `new`.
    pub fn remove(&mut self, id: HitboxId, group: i32, old: Option<CellRange>, new: Option<CellRange>) {
        if group < 0 {
            return;
        }
        let Some(old) = old else { return };
        for (x, y) in old.diff(new) {
            let key = CellKey { x, y, group };
            let Some(members) = self.cells.get_mut(&key) else {
                debug_assert!(false, "hitbox missing from grid cell");
                continue;
            };
            if let Some(pos) = members.iter().position(|&m| m == id) {
                members.swap_remove(pos);
                self.entries -= 1;
            }
            if members.is_empty() {
                self.cells.remove(&key);
            }
        }
    }

    /// Every hitbox indexed in `range` under any of `groups`, cell by cell.
    /// A hitbox spanning several cells is yielded once per cell; callers
    /// dedupe with [`Hitbox::mark`](crate::Hitbox).
    pub fn members<'a>(&'a self, range: CellRange, groups: &'a [i32]) -> impl Iterator<Item = HitboxId> + 'a {
        range.cells().flat_map(move |(x, y)| {
            groups.iter().flat_map(move |&group| {
                self.cells.get(&CellKey { x, y, group }).into_iter().flatten().copied()
            })
        })
    }
}
