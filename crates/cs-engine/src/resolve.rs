//! Spin resolution — visible specials, clear/swap structural effects
//!
//! Runs after the reels have stopped and before scoring. Order is fixed:
//! clears relocate other visible specials off the grid, then swaps mutate
//! reel contents, then the (possibly changed) grid is re-extracted at the
//! already-chosen stops. Both stages always run to completion; a relocation
//! or swap with no valid target degrades to a flagged no-op.

use std::collections::BTreeMap;

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::GridLayout;
use crate::effects::{EffectDefinition, EffectKind, SlotKey, SpecialTable, SwapMode};
use crate::grid::{Coord, GRID_DIM, Grid, visible_offsets};
use crate::reels::swap_reel_symbols;
use crate::symbols::{Reel, SymbolPool};

/// One special effect visible in the current window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibleSpecial {
    pub key: SlotKey,
    pub coord: Coord,
    pub def: EffectDefinition,
}

/// Numeric effect buckets for the result processor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectSummary {
    pub multipliers: Vec<f64>,
    pub penalties: Vec<i64>,
    pub bonus_points: Vec<i64>,
    pub free_spins: Vec<u32>,
    pub respins: u32,
    pub reverse_spins: u32,
}

impl EffectSummary {
    fn add(&mut self, def: &EffectDefinition) {
        match def.kind {
            EffectKind::Multiplier { factor } => self.multipliers.push(factor),
            EffectKind::Penalty { score_delta } => self.penalties.push(score_delta),
            EffectKind::BonusPoints { score_delta } => self.bonus_points.push(score_delta),
            EffectKind::FreeSpin { free_spins } => self.free_spins.push(free_spins),
            EffectKind::Respin { respins } => self.respins += respins,
            EffectKind::ReverseSpin => self.reverse_spins += 1,
            // Structural effects are handled by the resolution stages and
            // surface as reports, not numeric buckets.
            EffectKind::Swap { .. } | EffectKind::Clear => {}
        }
    }

    /// Build from the specials still visible after structural resolution
    pub fn from_visible<'a>(visible: impl Iterator<Item = &'a VisibleSpecial>) -> Self {
        let mut summary = Self::default();
        for vs in visible {
            summary.add(&vs.def);
        }
        summary
    }
}

/// Human-readable record of one resolved swap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapReport {
    pub effect_id: String,
    /// Grid position of the swap effect
    pub from: Coord,
    /// Grid position of the partner cell, if it is visible
    pub to_visible: Option<Coord>,
    /// "NameA ⇄ NameB"
    pub label: String,
}

/// Record of one resolved clear
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearReport {
    pub effect_id: String,
    pub coord: Coord,
    /// Effects relocated off the grid
    pub moved: Vec<String>,
    /// Effects that could not be relocated (no free hidden slot)
    pub stuck: Vec<String>,
}

/// Everything the structural stage produced for one spin
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub swaps: Vec<SwapReport>,
    pub clears: Vec<ClearReport>,
}

/// Output of [`resolve_spin`]
#[derive(Debug, Clone)]
pub struct SpinResolution {
    /// Grid re-extracted after structural mutation
    pub grid: Grid,
    /// Numeric buckets of the specials that actually fired
    pub summary: EffectSummary,
    /// Swap/clear narration for the presenter
    pub report: ResolutionReport,
    /// Table keys consumed by this spin (still-visible specials)
    pub consumed: Vec<SlotKey>,
}

/// Collect the table entries visible at the given stops, keyed for
/// deterministic iteration.
pub fn collect_visible(
    table: &SpecialTable,
    reels: &[Reel],
    stops: &[usize],
    layout: GridLayout,
) -> BTreeMap<SlotKey, VisibleSpecial> {
    let mut visible = BTreeMap::new();
    for (reel_idx, reel) in reels.iter().enumerate().take(GRID_DIM) {
        if reel.is_empty() {
            continue;
        }
        let offsets = visible_offsets(stops[reel_idx], reel.len());
        for (slot, &pos) in offsets.iter().enumerate() {
            let key = SlotKey::new(reel_idx, pos);
            if let Some(def) = table.get(key) {
                visible.insert(
                    key,
                    VisibleSpecial {
                        key,
                        coord: layout.cell(reel_idx, slot),
                        def: def.clone(),
                    },
                );
            }
        }
    }
    visible
}

/// Run the full structural stage for one spin.
///
/// Mutates `reels` (swaps) and `table` (clear relocations) in place.
/// Consumption of fired specials is left to the caller via
/// [`SpinResolution::consumed`].
pub fn resolve_spin<R: Rng>(
    reels: &mut [Reel],
    table: &mut SpecialTable,
    pool: &SymbolPool,
    stops: &[usize],
    layout: GridLayout,
    rng: &mut R,
) -> SpinResolution {
    let mut visible = collect_visible(table, reels, stops, layout);
    let mut report = ResolutionReport::default();

    resolve_clears(&mut visible, table, reels, stops, rng, &mut report);
    resolve_swaps(&visible, reels, pool, stops, layout, rng, &mut report);

    let summary = EffectSummary::from_visible(visible.values());
    let grid = Grid::extract(reels, stops, layout);
    let consumed = visible.keys().copied().collect();

    SpinResolution {
        grid,
        summary,
        report,
        consumed,
    }
}

/// Stage 1: every visible clear relocates every *other* visible special to
/// a random non-visible unassigned slot.
///
/// Simultaneous clears are processed in ascending key order over a snapshot
/// and share one shuffled pool of free slots; a clear already relocated by
/// an earlier clear no longer triggers. When the pool runs dry the
/// remaining effects are stuck: they stay in place and keep contributing to
/// the summary.
fn resolve_clears<R: Rng>(
    visible: &mut BTreeMap<SlotKey, VisibleSpecial>,
    table: &mut SpecialTable,
    reels: &[Reel],
    stops: &[usize],
    rng: &mut R,
    report: &mut ResolutionReport,
) {
    let clear_keys: Vec<SlotKey> = visible
        .iter()
        .filter(|(_, vs)| matches!(vs.def.kind, EffectKind::Clear))
        .map(|(k, _)| *k)
        .collect();
    if clear_keys.is_empty() {
        return;
    }

    let reel_lengths: Vec<usize> = reels.iter().map(|r| r.len()).collect();
    // Every slot in the visible window is off-limits as a relocation
    // target, whether or not it currently holds a special.
    let mut window: Vec<SlotKey> = Vec::with_capacity(GRID_DIM * GRID_DIM);
    for (reel_idx, reel) in reels.iter().enumerate().take(GRID_DIM) {
        if reel.is_empty() {
            continue;
        }
        for pos in visible_offsets(stops[reel_idx], reel.len()) {
            window.push(SlotKey::new(reel_idx, pos));
        }
    }
    let mut free_pool = table.free_slots(&reel_lengths, &window);
    free_pool.shuffle(rng);

    for clear_key in clear_keys {
        // Relocated off-grid by an earlier clear
        if !visible.contains_key(&clear_key) || !table.contains(clear_key) {
            continue;
        }
        let clear_coord = visible[&clear_key].coord;
        let clear_id = visible[&clear_key].def.id.clone();
        let mut moved = Vec::new();
        let mut stuck = Vec::new();

        let others: Vec<SlotKey> = visible
            .keys()
            .copied()
            .filter(|&k| k != clear_key)
            .collect();
        for key in others {
            let effect_id = visible[&key].def.id.clone();
            match free_pool.pop() {
                Some(target) => {
                    let ok = table.relocate(key, target);
                    debug_assert!(ok, "relocation target must be free");
                    visible.remove(&key);
                    moved.push(effect_id);
                }
                None => {
                    log::warn!("clear at {key:?}: no free slot for {effect_id}, stuck");
                    stuck.push(effect_id);
                }
            }
        }

        report.clears.push(ClearReport {
            effect_id: clear_id,
            coord: clear_coord,
            moved,
            stuck,
        });
    }
}

/// Stage 2: every still-visible swap exchanges its underlying reel position
/// with a target chosen per its mode. Reel contents mutate for real, so the
/// change persists into future spins.
fn resolve_swaps<R: Rng>(
    visible: &BTreeMap<SlotKey, VisibleSpecial>,
    reels: &mut [Reel],
    pool: &SymbolPool,
    stops: &[usize],
    layout: GridLayout,
    rng: &mut R,
    report: &mut ResolutionReport,
) {
    let swaps: Vec<(SlotKey, Coord, SwapMode, String)> = visible
        .values()
        .filter_map(|vs| match vs.def.kind {
            EffectKind::Swap { mode } => Some((vs.key, vs.coord, mode, vs.def.id.clone())),
            _ => None,
        })
        .collect();

    for (_key, coord, mode, effect_id) in swaps {
        let (reel_p, offset_p) = layout.slot(coord);
        if reels[reel_p].is_empty() {
            continue;
        }
        let pos_p = visible_offsets(stops[reel_p], reels[reel_p].len())[offset_p];

        let target = match mode {
            SwapMode::Adjacent => pick_adjacent_target(coord, stops, reels, layout, rng),
            SwapMode::RowAny => pick_reel_target(reel_p, pos_p, stops, reels, layout, rng),
        };
        let Some((reel_t, pos_t, to_visible)) = target else {
            continue;
        };

        let name_a = reels[reel_p]
            .symbol_at(pos_p)
            .map(|id| pool.name(id).to_string())
            .unwrap_or_default();
        let name_b = reels[reel_t]
            .symbol_at(pos_t)
            .map(|id| pool.name(id).to_string())
            .unwrap_or_default();

        swap_reel_symbols(reels, (reel_p, pos_p), (reel_t, pos_t));
        log::debug!("swap {effect_id}: {name_a} ⇄ {name_b}");

        report.swaps.push(SwapReport {
            effect_id,
            from: coord,
            to_visible,
            label: format!("{name_a} ⇄ {name_b}"),
        });
    }
}

/// Adjacent mode: random horizontally adjacent visible column in the same
/// grid row, falling back to any other column in the row.
fn pick_adjacent_target<R: Rng>(
    coord: Coord,
    stops: &[usize],
    reels: &[Reel],
    layout: GridLayout,
    rng: &mut R,
) -> Option<(usize, usize, Option<Coord>)> {
    let neighbors: Vec<usize> = [coord.col.checked_sub(1), coord.col.checked_add(1)]
        .into_iter()
        .flatten()
        .filter(|&c| c < GRID_DIM)
        .collect();
    let fallback: Vec<usize> = (0..GRID_DIM).filter(|&c| c != coord.col).collect();

    let col = *neighbors
        .choose(rng)
        .or_else(|| fallback.choose(rng))?;
    let target = Coord::new(coord.row, col);
    let (reel_t, offset_t) = layout.slot(target);
    if reels.get(reel_t).is_none_or(|r| r.is_empty()) {
        return None;
    }
    let pos_t = visible_offsets(stops[reel_t], reels[reel_t].len())[offset_t];
    Some((reel_t, pos_t, Some(target)))
}

/// RowAny mode: uniformly random *other* index on the same physical reel,
/// which may or may not be visible.
fn pick_reel_target<R: Rng>(
    reel: usize,
    pos: usize,
    stops: &[usize],
    reels: &[Reel],
    layout: GridLayout,
    rng: &mut R,
) -> Option<(usize, usize, Option<Coord>)> {
    let len = reels[reel].len();
    if len < 2 {
        return None;
    }
    let mut pos_t = rng.random_range(0..len - 1);
    if pos_t >= pos {
        pos_t += 1;
    }

    let offsets = visible_offsets(stops[reel], len);
    let to_visible = offsets
        .iter()
        .position(|&p| p == pos_t)
        .map(|offset| layout.cell(reel, offset));
    Some((reel, pos_t, to_visible))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::effects::EffectDefinition;
    use crate::symbols::Symbol;

    fn pool(n: u32) -> SymbolPool {
        let roster = (1..=n).map(|i| Symbol::new(i, format!("CHAR{i:02}"))).collect();
        SymbolPool::from_roster(roster, &HashSet::new())
    }

    fn reels_of(p: &SymbolPool) -> Vec<Reel> {
        let ids = p.ids();
        (0..3).map(|_| Reel::new(ids.clone())).collect()
    }

    fn def(id: &str, kind: EffectKind) -> EffectDefinition {
        EffectDefinition::new(id, kind, 1.0, 1, id)
    }

    fn table_with(entries: &[(SlotKey, EffectDefinition)]) -> SpecialTable {
        let mut table = SpecialTable::default();
        for (key, d) in entries {
            assert!(table.insert(*key, d.clone()));
        }
        table
    }

    #[test]
    fn test_clear_relocates_other_visible_effects() {
        let p = pool(8);
        let mut reels = reels_of(&p);
        let stops = [1usize, 1, 1]; // Visible positions 0,1,2 on every reel

        let mut table = table_with(&[
            (SlotKey::new(0, 1), def("clear", EffectKind::Clear)),
            (
                SlotKey::new(1, 0),
                def("bonus", EffectKind::BonusPoints { score_delta: 100 }),
            ),
            (
                SlotKey::new(2, 2),
                def("respin", EffectKind::Respin { respins: 1 }),
            ),
        ]);

        let counts_before = table.effect_counts();
        let mut rng = StdRng::seed_from_u64(11);
        let res = resolve_spin(
            &mut reels,
            &mut table,
            &p,
            &stops,
            GridLayout::ColumnMajor,
            &mut rng,
        );

        // Others were moved off-grid: no numeric contribution remains
        assert!(res.summary.bonus_points.is_empty());
        assert_eq!(res.summary.respins, 0);
        assert_eq!(res.report.clears.len(), 1);
        assert_eq!(res.report.clears[0].moved.len(), 2);
        assert!(res.report.clears[0].stuck.is_empty());

        // Conservation: instances moved, never created or destroyed
        assert_eq!(table.effect_counts(), counts_before);
        // Relocated entries are now on non-visible slots
        assert!(!table.contains(SlotKey::new(1, 0)));
        assert!(!table.contains(SlotKey::new(2, 2)));
        for (key, d) in table.iter() {
            if d.id != "clear" {
                assert!(
                    !(0..=2).contains(&key.pos),
                    "{} relocated onto visible slot {key:?}",
                    d.id
                );
            }
        }
        // The clear itself stayed put and is the only consumed special
        assert_eq!(res.consumed, vec![SlotKey::new(0, 1)]);
    }

    #[test]
    fn test_clear_relocation_capped_by_hidden_slots() {
        // Length-4 reels leave exactly one hidden slot (pos 3) per reel:
        // three relocation targets for five displaced effects.
        let p = pool(4);
        let mut reels = reels_of(&p);
        let stops = [1usize, 1, 1];

        let mut table = table_with(&[
            (SlotKey::new(0, 1), def("clear", EffectKind::Clear)),
            (
                SlotKey::new(0, 0),
                def("b1", EffectKind::BonusPoints { score_delta: 10 }),
            ),
            (
                SlotKey::new(0, 2),
                def("b2", EffectKind::BonusPoints { score_delta: 10 }),
            ),
            (
                SlotKey::new(1, 0),
                def("b3", EffectKind::BonusPoints { score_delta: 10 }),
            ),
            (
                SlotKey::new(1, 1),
                def("b4", EffectKind::BonusPoints { score_delta: 10 }),
            ),
            (
                SlotKey::new(2, 2),
                def("b5", EffectKind::BonusPoints { score_delta: 10 }),
            ),
        ]);

        let counts_before = table.effect_counts();
        let mut rng = StdRng::seed_from_u64(23);
        let res = resolve_spin(
            &mut reels,
            &mut table,
            &p,
            &stops,
            GridLayout::ColumnMajor,
            &mut rng,
        );

        assert_eq!(res.report.clears.len(), 1);
        assert_eq!(res.report.clears[0].moved.len(), 3);
        assert_eq!(res.report.clears[0].stuck.len(), 2);

        // Moved entries landed on the hidden positions only
        let hidden: Vec<SlotKey> = table
            .iter()
            .filter(|(_, d)| d.id.starts_with('b'))
            .map(|(k, _)| k)
            .filter(|k| k.pos == 3)
            .collect();
        assert_eq!(hidden.len(), 3);

        // Stuck entries stay visible and keep contributing
        assert_eq!(res.summary.bonus_points, vec![10, 10]);
        assert_eq!(table.effect_counts(), counts_before);
        // Consumed: the clear plus the two stuck effects
        assert_eq!(res.consumed.len(), 3);
        assert!(res.consumed.contains(&SlotKey::new(0, 1)));
    }

    #[test]
    fn test_clear_with_no_free_slots_is_stuck() {
        // 3 reels × 3 symbols: every slot is visible, nowhere to relocate
        let p = pool(3);
        let mut reels = reels_of(&p);
        let stops = [1usize, 1, 1];

        let mut table = table_with(&[
            (SlotKey::new(0, 0), def("clear", EffectKind::Clear)),
            (
                SlotKey::new(1, 1),
                def("mult", EffectKind::Multiplier { factor: 2.0 }),
            ),
            (
                SlotKey::new(2, 0),
                def("respin", EffectKind::Respin { respins: 1 }),
            ),
        ]);

        let counts_before = table.effect_counts();
        let mut rng = StdRng::seed_from_u64(4);
        let res = resolve_spin(
            &mut reels,
            &mut table,
            &p,
            &stops,
            GridLayout::ColumnMajor,
            &mut rng,
        );

        assert_eq!(res.report.clears[0].stuck.len(), 2);
        assert!(res.report.clears[0].moved.is_empty());
        // Stuck effects keep contributing
        assert_eq!(res.summary.multipliers, vec![2.0]);
        assert_eq!(res.summary.respins, 1);
        // Table unchanged
        assert_eq!(table.effect_counts(), counts_before);
        assert!(table.contains(SlotKey::new(1, 1)));
    }

    #[test]
    fn test_swap_mutates_reels_and_conserves_symbols() {
        let p = pool(8);
        let mut reels = reels_of(&p);
        let stops = [1usize, 1, 1];

        let mut table = table_with(&[(
            SlotKey::new(1, 1),
            def("swap", EffectKind::Swap { mode: SwapMode::Adjacent }),
        )]);

        let before: Vec<_> = {
            let mut all: Vec<_> = reels.iter().flat_map(|r| r.symbols().to_vec()).collect();
            all.sort();
            all
        };

        let mut rng = StdRng::seed_from_u64(21);
        let res = resolve_spin(
            &mut reels,
            &mut table,
            &p,
            &stops,
            GridLayout::ColumnMajor,
            &mut rng,
        );

        assert_eq!(res.report.swaps.len(), 1);
        assert!(res.report.swaps[0].label.contains('⇄'));
        assert!(res.report.swaps[0].to_visible.is_some());

        let mut after: Vec<_> = reels.iter().flat_map(|r| r.symbols().to_vec()).collect();
        after.sort();
        assert_eq!(after, before);
    }

    #[test]
    fn test_row_any_swap_can_target_hidden_positions() {
        let p = pool(8);
        let stops = [1usize, 1, 1];

        let mut hit_hidden = false;
        for seed in 0..50 {
            let mut reels = reels_of(&p);
            let mut table = table_with(&[(
                SlotKey::new(0, 1),
                def("warp", EffectKind::Swap { mode: SwapMode::RowAny }),
            )]);
            let mut rng = StdRng::seed_from_u64(seed);
            let res = resolve_spin(
                &mut reels,
                &mut table,
                &p,
                &stops,
                GridLayout::ColumnMajor,
                &mut rng,
            );
            if res.report.swaps[0].to_visible.is_none() {
                hit_hidden = true;
                break;
            }
        }
        assert!(hit_hidden, "RowAny never targeted a hidden position");
    }

    #[test]
    fn test_summary_buckets() {
        let p = pool(8);
        let mut reels = reels_of(&p);
        let stops = [1usize, 1, 1];

        let mut table = table_with(&[
            (
                SlotKey::new(0, 0),
                def("mult", EffectKind::Multiplier { factor: 2.0 }),
            ),
            (
                SlotKey::new(0, 2),
                def("pen", EffectKind::Penalty { score_delta: -50 }),
            ),
            (
                SlotKey::new(1, 1),
                def("fs", EffectKind::FreeSpin { free_spins: 2 }),
            ),
            (SlotKey::new(2, 0), def("rev", EffectKind::ReverseSpin)),
        ]);

        let mut rng = StdRng::seed_from_u64(2);
        let res = resolve_spin(
            &mut reels,
            &mut table,
            &p,
            &stops,
            GridLayout::ColumnMajor,
            &mut rng,
        );

        assert_eq!(res.summary.multipliers, vec![2.0]);
        assert_eq!(res.summary.penalties, vec![-50]);
        assert_eq!(res.summary.free_spins, vec![2]);
        assert_eq!(res.summary.reverse_spins, 1);
        assert_eq!(res.consumed.len(), 4);
    }
}
