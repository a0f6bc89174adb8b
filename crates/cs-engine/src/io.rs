//! Collaborator interfaces — roster, presenter, persistence
//!
//! The engine never reaches for ambient globals; every outward dependency
//! is one of these constructor-injected traits.

use std::collections::HashSet;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::effects::BadgeView;
use crate::error::EngineResult;
use crate::outcome::{OutcomeEvent, WinGroup};
use crate::resolve::SwapReport;
use crate::symbols::{Reel, Symbol, SymbolId, SymbolPool};

/// Scroll direction for spin animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinDirection {
    Forward,
    Reverse,
}

impl SpinDirection {
    pub fn flipped(self) -> Self {
        match self {
            SpinDirection::Forward => SpinDirection::Reverse,
            SpinDirection::Reverse => SpinDirection::Forward,
        }
    }
}

impl Default for SpinDirection {
    fn default() -> Self {
        Self::Forward
    }
}

/// Read-only session snapshot for stats displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub session_score: i64,
    pub free_spins: u32,
    pub auto_spin_credits: u32,
    pub direction: SpinDirection,
    pub picked: Option<SymbolId>,
    pub high_score: i64,
    pub total_spins: u64,
    pub total_jackpots: u64,
}

/// Supplies the character roster the session is built from
pub trait RosterProvider {
    /// The raw character pool; may contain duplicates
    fn character_pool(&self) -> EngineResult<Vec<Symbol>>;

    /// IDs excluded from play
    fn blacklist(&self) -> HashSet<SymbolId> {
        HashSet::new()
    }
}

/// Receives state and renders/animates it. The engine calls these with
/// plain data and never depends on how (or whether) they draw.
pub trait Presenter {
    fn build_reel_view(&mut self, reels: &[Reel], pool: &SymbolPool);
    fn render_special_badges(&mut self, badges: &[BadgeView]);
    /// Spin dispatched; the presenter answers by calling
    /// `SessionController::reel_settled` once per reel.
    fn animate_spin(
        &mut self,
        stops: &[usize],
        reels: &[Reel],
        picked: Option<SymbolId>,
        direction: SpinDirection,
    );
    fn apply_swap_visuals(&mut self, swaps: &[SwapReport]);
    fn highlight_winning_groups(&mut self, groups: &[WinGroup]);
    fn show_score_events(&mut self, events: &[OutcomeEvent]);
    fn update_stats_display(&mut self, view: &SessionView);
}

/// Presenter that renders nothing (simulator, tests)
#[derive(Debug, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn build_reel_view(&mut self, _reels: &[Reel], _pool: &SymbolPool) {}
    fn render_special_badges(&mut self, _badges: &[BadgeView]) {}
    fn animate_spin(
        &mut self,
        _stops: &[usize],
        _reels: &[Reel],
        _picked: Option<SymbolId>,
        _direction: SpinDirection,
    ) {
    }
    fn apply_swap_visuals(&mut self, _swaps: &[SwapReport]) {}
    fn highlight_winning_groups(&mut self, _groups: &[WinGroup]) {}
    fn show_score_events(&mut self, _events: &[OutcomeEvent]) {}
    fn update_stats_display(&mut self, _view: &SessionView) {}
}

/// Cross-session counters owned by an external persistence collaborator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedStats {
    pub total_spins: u64,
    pub high_score: i64,
    pub total_jackpots: u64,
}

/// Opaque counter storage, loaded at session start and saved after every
/// resolved spin
pub trait StatsStore {
    fn load(&self) -> PersistedStats;
    fn save(&self, stats: &PersistedStats);
}

/// In-memory store (default, simulator, tests)
#[derive(Debug, Default)]
pub struct MemoryStatsStore {
    inner: RwLock<PersistedStats>,
}

impl MemoryStatsStore {
    pub fn new(initial: PersistedStats) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }
}

impl StatsStore for MemoryStatsStore {
    fn load(&self) -> PersistedStats {
        *self.inner.read()
    }

    fn save(&self, stats: &PersistedStats) {
        *self.inner.write() = *stats;
    }
}

/// Fixed roster handed in as a plain vector
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    pub symbols: Vec<Symbol>,
    pub blacklist: HashSet<SymbolId>,
}

impl StaticRoster {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self {
            symbols,
            blacklist: HashSet::new(),
        }
    }
}

impl RosterProvider for StaticRoster {
    fn character_pool(&self) -> EngineResult<Vec<Symbol>> {
        Ok(self.symbols.clone())
    }

    fn blacklist(&self) -> HashSet<SymbolId> {
        self.blacklist.clone()
    }
}
