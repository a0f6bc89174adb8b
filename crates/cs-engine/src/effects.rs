//! Special-effect catalog and the per-session assignment table

use std::collections::BTreeMap;

use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Broad effect category, used for summary bucketing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectCategory {
    Multiplier,
    Penalty,
    FreeSpin,
    Respin,
    ReverseSpin,
    BonusPoints,
    Swap,
    Clear,
}

/// Target selection rule for swap effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapMode {
    /// Swap with a horizontally adjacent visible cell in the same grid row,
    /// falling back to any other column in that row
    Adjacent,
    /// Swap with a uniformly random other position on the same physical
    /// reel, visible or not
    RowAny,
}

/// Category-specific effect payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectKind {
    /// Multiply the spin total; factors below 1.0 are losses
    Multiplier { factor: f64 },
    /// Flat score loss
    Penalty { score_delta: i64 },
    /// Flat score gain
    BonusPoints { score_delta: i64 },
    /// Award free spins, score-neutral
    FreeSpin { free_spins: u32 },
    /// Queue automatic respins, score-neutral
    Respin { respins: u32 },
    /// Flip the scroll direction of subsequent spins
    ReverseSpin,
    /// Exchange two reel positions' symbols
    Swap { mode: SwapMode },
    /// Relocate every other visible special off the grid
    Clear,
}

impl EffectKind {
    pub fn category(&self) -> EffectCategory {
        match self {
            EffectKind::Multiplier { .. } => EffectCategory::Multiplier,
            EffectKind::Penalty { .. } => EffectCategory::Penalty,
            EffectKind::BonusPoints { .. } => EffectCategory::BonusPoints,
            EffectKind::FreeSpin { .. } => EffectCategory::FreeSpin,
            EffectKind::Respin { .. } => EffectCategory::Respin,
            EffectKind::ReverseSpin => EffectCategory::ReverseSpin,
            EffectKind::Swap { .. } => EffectCategory::Swap,
            EffectKind::Clear => EffectCategory::Clear,
        }
    }
}

/// Static catalog entry for one special effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDefinition {
    /// Stable identifier (e.g. "mult_x2")
    pub id: String,
    /// Category-specific payload
    pub kind: EffectKind,
    /// Per-placement Bernoulli parameter, clamped to [0, 1]
    pub chance: f64,
    /// Placement quota for one session
    pub max_per_spin: u32,
    /// Short badge label for the presenter
    pub badge: String,
}

impl EffectDefinition {
    pub fn new(
        id: impl Into<String>,
        kind: EffectKind,
        chance: f64,
        max_per_spin: u32,
        badge: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            chance: chance.clamp(0.0, 1.0),
            max_per_spin,
            badge: badge.into(),
        }
    }

    pub fn category(&self) -> EffectCategory {
        self.kind.category()
    }
}

/// The standard effect catalog
pub fn standard_catalog() -> Vec<EffectDefinition> {
    vec![
        EffectDefinition::new("mult_x2", EffectKind::Multiplier { factor: 2.0 }, 0.25, 2, "×2"),
        EffectDefinition::new("mult_half", EffectKind::Multiplier { factor: 0.5 }, 0.15, 1, "×½"),
        EffectDefinition::new("penalty_50", EffectKind::Penalty { score_delta: -50 }, 0.20, 2, "-50"),
        EffectDefinition::new("bonus_100", EffectKind::BonusPoints { score_delta: 100 }, 0.20, 2, "+100"),
        EffectDefinition::new("free_spin_2", EffectKind::FreeSpin { free_spins: 2 }, 0.15, 2, "FS"),
        EffectDefinition::new("respin", EffectKind::Respin { respins: 1 }, 0.15, 2, "RE"),
        EffectDefinition::new("reverse", EffectKind::ReverseSpin, 0.10, 1, "REV"),
        EffectDefinition::new("swap_adjacent", EffectKind::Swap { mode: SwapMode::Adjacent }, 0.15, 1, "SWAP"),
        EffectDefinition::new("swap_row", EffectKind::Swap { mode: SwapMode::RowAny }, 0.10, 1, "WARP"),
        EffectDefinition::new("clear", EffectKind::Clear, 0.08, 1, "CLR"),
    ]
}

/// Key into the assignment table: one physical reel position
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SlotKey {
    pub reel: usize,
    pub pos: usize,
}

impl SlotKey {
    pub fn new(reel: usize, pos: usize) -> Self {
        Self { reel, pos }
    }
}

/// Badge view of one table entry, for presenter rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeView {
    pub key: SlotKey,
    pub badge: String,
    pub category: EffectCategory,
}

/// The per-session special assignment table
///
/// Built once at session start; afterwards entries are only ever removed
/// (consumed) or relocated (clear resolution). `BTreeMap` keeps iteration
/// order deterministic for tie-breaks and tests.
#[derive(Debug, Clone, Default)]
pub struct SpecialTable {
    entries: BTreeMap<SlotKey, EffectDefinition>,
}

impl SpecialTable {
    /// Probabilistic, quota-respecting assignment.
    ///
    /// Every reel position goes into one shuffled candidate pool; each
    /// catalog definition then attempts up to `max_per_spin` placements,
    /// each gated by an independent Bernoulli trial, each success consuming
    /// one candidate. A consumed position is unavailable to every later
    /// attempt, so no key is ever bound twice and the table never exceeds
    /// the summed quotas.
    pub fn assign<R: Rng>(
        reel_lengths: &[usize],
        catalog: &[EffectDefinition],
        rng: &mut R,
    ) -> Self {
        let mut candidates: Vec<SlotKey> = reel_lengths
            .iter()
            .enumerate()
            .flat_map(|(reel, &len)| (0..len).map(move |pos| SlotKey::new(reel, pos)))
            .collect();
        candidates.shuffle(rng);

        let mut entries = BTreeMap::new();
        'catalog: for def in catalog {
            for _ in 0..def.max_per_spin {
                if rng.random::<f64>() >= def.chance {
                    continue;
                }
                let Some(key) = candidates.pop() else {
                    break 'catalog;
                };
                entries.insert(key, def.clone());
            }
        }

        log::debug!("assigned {} special effects", entries.len());
        Self { entries }
    }

    pub fn get(&self, key: SlotKey) -> Option<&EffectDefinition> {
        self.entries.get(&key)
    }

    pub fn contains(&self, key: SlotKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Direct placement, for scripted scenarios and tests. Refuses an
    /// occupied key so the at-most-one-effect-per-key invariant holds.
    pub fn insert(&mut self, key: SlotKey, def: EffectDefinition) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, def);
        true
    }

    /// Consume the entry at `key`
    pub fn remove(&mut self, key: SlotKey) -> Option<EffectDefinition> {
        self.entries.remove(&key)
    }

    /// Move an entry to an unoccupied key. Returns false (and leaves the
    /// table untouched) if `from` is empty or `to` is occupied.
    pub fn relocate(&mut self, from: SlotKey, to: SlotKey) -> bool {
        if from == to || self.entries.contains_key(&to) {
            return false;
        }
        match self.entries.remove(&from) {
            Some(def) => {
                self.entries.insert(to, def);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotKey, &EffectDefinition)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// All unassigned keys not in `excluded` (typically the visible window)
    pub fn free_slots(&self, reel_lengths: &[usize], excluded: &[SlotKey]) -> Vec<SlotKey> {
        reel_lengths
            .iter()
            .enumerate()
            .flat_map(|(reel, &len)| (0..len).map(move |pos| SlotKey::new(reel, pos)))
            .filter(|k| !self.entries.contains_key(k) && !excluded.contains(k))
            .collect()
    }

    /// Instance count per effect ID (conservation checks)
    pub fn effect_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for def in self.entries.values() {
            *counts.entry(def.id.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Badge metadata for every entry, for presenter rendering
    pub fn badges(&self) -> Vec<BadgeView> {
        self.entries
            .iter()
            .map(|(key, def)| BadgeView {
                key: *key,
                badge: def.badge.clone(),
                category: def.category(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_assignment_respects_quotas() {
        let catalog = standard_catalog();
        let quota: u32 = catalog.iter().map(|d| d.max_per_spin).sum();

        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let table = SpecialTable::assign(&[8, 8, 8], &catalog, &mut rng);
            assert!(table.len() <= quota as usize);

            for (id, count) in table.effect_counts() {
                let def = catalog.iter().find(|d| d.id == id).unwrap();
                assert!(count <= def.max_per_spin as usize, "{id} over quota");
            }
        }
    }

    #[test]
    fn test_assignment_exhausts_candidates_gracefully() {
        let catalog = vec![EffectDefinition::new(
            "always",
            EffectKind::BonusPoints { score_delta: 1 },
            1.0,
            50,
            "+1",
        )];
        let mut rng = StdRng::seed_from_u64(3);
        let table = SpecialTable::assign(&[2, 2], &catalog, &mut rng);
        assert_eq!(table.len(), 4); // Every position bound exactly once
    }

    #[test]
    fn test_relocate_refuses_occupied_target() {
        let catalog = vec![EffectDefinition::new(
            "always",
            EffectKind::BonusPoints { score_delta: 1 },
            1.0,
            2,
            "+1",
        )];
        let mut rng = StdRng::seed_from_u64(5);
        let mut table = SpecialTable::assign(&[2], &catalog, &mut rng);
        assert_eq!(table.len(), 2);

        let keys: Vec<_> = table.iter().map(|(k, _)| k).collect();
        assert!(!table.relocate(keys[0], keys[1]));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_free_slots_excludes_visible_and_occupied() {
        let catalog = vec![EffectDefinition::new(
            "always",
            EffectKind::BonusPoints { score_delta: 1 },
            1.0,
            1,
            "+1",
        )];
        let mut rng = StdRng::seed_from_u64(8);
        let table = SpecialTable::assign(&[4], &catalog, &mut rng);
        let occupied = table.iter().next().unwrap().0;

        let visible = [SlotKey::new(0, 0)];
        let free = table.free_slots(&[4], &visible);
        assert!(!free.contains(&occupied));
        assert!(!free.contains(&visible[0]));
    }
}
