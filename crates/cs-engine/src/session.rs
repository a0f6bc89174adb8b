//! Session controller — spin lifecycle and resource accounting
//!
//! State machine: `Idle → Spinning → Resolving → Idle`. A spin request is
//! guarded on `Idle`; the presenter acknowledges each reel settling and the
//! final acknowledgment runs resolution synchronously. There is no pause or
//! cancel: a dispatched spin always resolves.

use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::effects::{EffectDefinition, SpecialTable, standard_catalog};
use crate::error::EngineResult;
use crate::io::{Presenter, RosterProvider, SessionView, SpinDirection, StatsStore};
use crate::outcome::{Outcome, ResultProcessor, WinLevel};
use crate::reels::{build_reels, determine_stops};
use crate::resolve::resolve_spin;
use crate::symbols::{Reel, SymbolId, SymbolPool};

/// Lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Spinning,
    Resolving,
}

/// Why a spin request was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// A spin is already in flight
    AlreadySpinning,
    /// Neither free spins nor score cover the cost
    NeedsRefill,
}

/// Result of a spin request — denial is a value, not an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinGate {
    Started,
    Denied(DenyReason),
}

/// Per-session aggregate statistics
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub spins: u64,
    pub wins: u64,
    pub jackpots: u64,
    pub line_wins: u64,
    pub free_spins_used: u64,
    pub free_spins_granted: u64,
    pub respins_chained: u64,
    pub catch_up_grants: u64,
    pub peak_score: i64,
}

impl SessionStats {
    /// Fraction of spins with at least one win group
    pub fn hit_rate(&self) -> f64 {
        if self.spins > 0 {
            self.wins as f64 / self.spins as f64
        } else {
            0.0
        }
    }
}

#[derive(Debug)]
struct PendingSpin {
    stops: Vec<usize>,
    settled: Vec<bool>,
    /// Paid with a free spin or an auto-spin credit
    free_spin: bool,
}

/// Orchestrates one play session
pub struct SessionController<P: Presenter> {
    config: EngineConfig,
    catalog: Vec<EffectDefinition>,
    pool: SymbolPool,
    reels: Vec<Reel>,
    table: SpecialTable,
    rng: StdRng,
    presenter: P,
    store: Box<dyn StatsStore>,
    persisted: crate::io::PersistedStats,

    session_score: i64,
    free_spins: u32,
    auto_spin_credits: u32,
    direction: SpinDirection,
    picked: Option<SymbolId>,
    phase: SessionPhase,
    pending: Option<PendingSpin>,
    /// One catch-up grant per depletion episode
    catch_up_armed: bool,
    stats: SessionStats,
}

impl<P: Presenter> SessionController<P> {
    /// Start a session with the standard effect catalog
    pub fn start(
        roster: &dyn RosterProvider,
        presenter: P,
        store: Box<dyn StatsStore>,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        Self::start_with_catalog(roster, presenter, store, config, standard_catalog())
    }

    /// Start a session with a custom effect catalog
    pub fn start_with_catalog(
        roster: &dyn RosterProvider,
        mut presenter: P,
        store: Box<dyn StatsStore>,
        config: EngineConfig,
        catalog: Vec<EffectDefinition>,
    ) -> EngineResult<Self> {
        config.validate()?;

        let pool = SymbolPool::from_roster(roster.character_pool()?, &roster.blacklist());
        let mut rng = StdRng::from_os_rng();
        let reels = build_reels(&pool, &config, &mut rng)?;
        let reel_lengths: Vec<usize> = reels.iter().map(|r| r.len()).collect();
        let table = SpecialTable::assign(&reel_lengths, &catalog, &mut rng);
        let persisted = store.load();

        log::info!(
            "session start: {} symbols in pool, {} specials assigned",
            pool.len(),
            table.len()
        );

        presenter.build_reel_view(&reels, &pool);
        presenter.render_special_badges(&table.badges());

        let starting_score = config.starting_score;
        let controller = Self {
            config,
            catalog,
            pool,
            reels,
            table,
            rng,
            presenter,
            store,
            persisted,
            session_score: starting_score,
            free_spins: 0,
            auto_spin_credits: 0,
            direction: SpinDirection::Forward,
            picked: None,
            phase: SessionPhase::Idle,
            pending: None,
            catch_up_armed: true,
            stats: SessionStats::default(),
        };
        Ok(controller)
    }

    /// Reseed the RNG and rebuild reels + assignment table reproducibly.
    /// Test/simulator hook, mirrors a fresh session under a known seed.
    pub fn seed(&mut self, seed: u64) -> EngineResult<()> {
        self.rng = StdRng::seed_from_u64(seed);
        self.reels = build_reels(&self.pool, &self.config, &mut self.rng)?;
        let reel_lengths: Vec<usize> = self.reels.iter().map(|r| r.len()).collect();
        self.table = SpecialTable::assign(&reel_lengths, &self.catalog, &mut self.rng);
        self.presenter.build_reel_view(&self.reels, &self.pool);
        self.presenter.render_special_badges(&self.table.badges());
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SPIN LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════

    /// Request a regular spin
    pub fn request_spin(&mut self) -> SpinGate {
        self.request_spin_inner(false)
    }

    /// Demo path: force every reel onto the same symbol
    pub fn request_demo_spin(&mut self) -> SpinGate {
        self.request_spin_inner(true)
    }

    fn request_spin_inner(&mut self, force_jackpot: bool) -> SpinGate {
        if self.phase != SessionPhase::Idle {
            return SpinGate::Denied(DenyReason::AlreadySpinning);
        }

        let free_spin = match self.charge_for_spin() {
            Some(free) => free,
            None => {
                self.maybe_grant_catch_up();
                return SpinGate::Denied(DenyReason::NeedsRefill);
            }
        };

        let stops = determine_stops(&self.reels, force_jackpot, &mut self.rng);
        self.pending = Some(PendingSpin {
            settled: vec![false; self.reels.len()],
            stops: stops.clone(),
            free_spin,
        });
        self.phase = SessionPhase::Spinning;
        self.presenter
            .animate_spin(&stops, &self.reels, self.picked, self.direction);
        SpinGate::Started
    }

    /// Free spins are consumed in preference to score; an active pick
    /// doubles the free-spin cost for that spin; auto-spin credits bypass
    /// both. Returns whether the spin counts as free, or None if nothing
    /// covers it.
    fn charge_for_spin(&mut self) -> Option<bool> {
        if self.auto_spin_credits > 0 {
            self.auto_spin_credits -= 1;
            self.stats.respins_chained += 1;
            return Some(true);
        }
        let free_cost: u32 = if self.picked.is_some() { 2 } else { 1 };
        if self.free_spins >= free_cost {
            self.free_spins -= free_cost;
            self.stats.free_spins_used += u64::from(free_cost);
            return Some(true);
        }
        if self.session_score >= self.config.spin_cost {
            self.session_score -= self.config.spin_cost;
            return Some(false);
        }
        None
    }

    /// Presenter acknowledgment that one reel has settled. The final
    /// acknowledgment crosses the barrier and resolves the spin.
    pub fn reel_settled(&mut self, reel: usize) -> Option<Outcome> {
        if self.phase != SessionPhase::Spinning {
            return None;
        }
        {
            let pending = self.pending.as_mut()?;
            if reel >= pending.settled.len() || pending.settled[reel] {
                return None;
            }
            pending.settled[reel] = true;
            if !pending.settled.iter().all(|&s| s) {
                return None;
            }
        }
        let pending = self.pending.take()?;
        Some(self.resolve(pending))
    }

    fn resolve(&mut self, pending: PendingSpin) -> Outcome {
        self.phase = SessionPhase::Resolving;

        let resolution = resolve_spin(
            &mut self.reels,
            &mut self.table,
            &self.pool,
            &pending.stops,
            self.config.layout,
            &mut self.rng,
        );

        let processor =
            ResultProcessor::new(&self.pool, &self.config.scores, &self.config.pick);
        let outcome = processor.calculate(
            &resolution.grid,
            self.picked,
            pending.free_spin,
            &resolution.summary,
            &resolution.report,
        );

        // Fired specials are consumed; relocated ones live on under new keys
        for key in &resolution.consumed {
            self.table.remove(*key);
        }

        self.apply_outcome(&outcome);

        self.presenter.apply_swap_visuals(&resolution.report.swaps);
        self.presenter
            .highlight_winning_groups(&outcome.winning_groups);
        self.presenter.show_score_events(&outcome.events);
        self.presenter.render_special_badges(&self.table.badges());
        let view = self.view();
        self.presenter.update_stats_display(&view);

        self.phase = SessionPhase::Idle;
        self.maybe_grant_catch_up();
        outcome
    }

    fn apply_outcome(&mut self, outcome: &Outcome) {
        self.session_score = (self.session_score + outcome.total_score).max(0);
        self.free_spins += outcome.free_spins_awarded;
        self.auto_spin_credits += outcome.respin_count;
        if outcome.reverse_spin_count % 2 == 1 {
            self.direction = self.direction.flipped();
        }

        let jackpots = outcome
            .winning_groups
            .iter()
            .filter(|g| g.win_level == WinLevel::Jackpot)
            .count() as u64;
        let lines = outcome
            .winning_groups
            .iter()
            .filter(|g| g.win_level == WinLevel::Nearmiss)
            .count() as u64;

        self.stats.spins += 1;
        if !outcome.winning_groups.is_empty() {
            self.stats.wins += 1;
        }
        self.stats.jackpots += jackpots;
        self.stats.line_wins += lines;
        self.stats.free_spins_granted += u64::from(outcome.free_spins_awarded);
        self.stats.peak_score = self.stats.peak_score.max(self.session_score);

        self.persisted.total_spins += 1;
        self.persisted.total_jackpots += jackpots;
        self.persisted.high_score = self.persisted.high_score.max(self.session_score);
        self.store.save(&self.persisted);

        if self.can_afford_spin() {
            self.catch_up_armed = true;
        }
    }

    /// Catch-up mechanic: when score, free spins and auto-credits are all
    /// exhausted, grant a small random batch of free spins, once per
    /// depletion episode.
    fn maybe_grant_catch_up(&mut self) {
        if self.can_afford_spin() || self.auto_spin_credits > 0 || !self.catch_up_armed {
            return;
        }
        let (lo, hi) = self.config.catch_up_spins;
        let granted = self.rng.random_range(lo..=hi);
        self.free_spins += granted;
        self.catch_up_armed = false;
        self.stats.catch_up_grants += 1;
        self.stats.free_spins_granted += u64::from(granted);
        log::info!("catch-up grant: {granted} free spins");
        let view = self.view();
        self.presenter.update_stats_display(&view);
    }

    fn can_afford_spin(&self) -> bool {
        self.free_spins > 0 || self.session_score >= self.config.spin_cost
    }

    // ═══════════════════════════════════════════════════════════════════════
    // STATE ACCESS
    // ═══════════════════════════════════════════════════════════════════════

    /// Pick (or clear) the favorite symbol. Only allowed while idle.
    pub fn set_picked(&mut self, picked: Option<SymbolId>) -> bool {
        if self.phase != SessionPhase::Idle {
            return false;
        }
        if let Some(id) = picked {
            if self.pool.get(id).is_none() {
                return false;
            }
        }
        self.picked = picked;
        true
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_score: self.session_score,
            free_spins: self.free_spins,
            auto_spin_credits: self.auto_spin_credits,
            direction: self.direction,
            picked: self.picked,
            high_score: self.persisted.high_score,
            total_spins: self.persisted.total_spins,
            total_jackpots: self.persisted.total_jackpots,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn score(&self) -> i64 {
        self.session_score
    }

    pub fn free_spins(&self) -> u32 {
        self.free_spins
    }

    pub fn auto_spin_credits(&self) -> u32 {
        self.auto_spin_credits
    }

    pub fn direction(&self) -> SpinDirection {
        self.direction
    }

    pub fn picked(&self) -> Option<SymbolId> {
        self.picked
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn reels(&self) -> &[Reel] {
        &self.reels
    }

    pub fn table(&self) -> &SpecialTable {
        &self.table
    }

    pub fn pool(&self) -> &SymbolPool {
        &self.pool
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Export the active config as pretty JSON
    pub fn export_config(&self) -> String {
        self.config.to_json()
    }
}
