//! Win detection and score composition — pure function of its inputs
//!
//! Detection claims coordinates first-match-wins: jackpot lines, then the
//! remaining straight lines, then exact-3 scatters, then adjacent pairs.
//! A coordinate belongs to at most one win group per spin.

use serde::{Deserialize, Serialize};

use crate::config::{PickTable, ScoreTable};
use crate::grid::{Coord, GRID_DIM, Grid};
use crate::resolve::{EffectSummary, ResolutionReport};
use crate::symbols::{SymbolId, SymbolPool};

/// Win tier, ascending
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WinLevel {
    NormalWin,
    Nearmiss,
    Jackpot,
}

/// Which pattern produced a win (selects the pick multiplier)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinKind {
    Jackpot,
    Line,
    Scatter,
    Pair,
}

/// One winning coordinate group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinGroup {
    pub win_level: WinLevel,
    pub kind: WinKind,
    pub symbol: SymbolId,
    pub coords: Vec<Coord>,
    pub score: i64,
}

/// One scoring (or descriptive) step of the outcome, in application order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutcomeEvent {
    BaseWin {
        kind: WinKind,
        symbol_name: String,
        score: i64,
    },
    /// Pick participated in a win: delta on top of that win's score
    PickBonus {
        symbol_name: String,
        kind: WinKind,
        delta: i64,
    },
    /// Pick did not win: flat award by visible cell count
    PickCells {
        symbol_name: String,
        cells: usize,
        delta: i64,
    },
    /// All multiplier factors combined into one compound application
    CompoundMultiplier { factor: f64, delta: i64 },
    Penalty { delta: i64 },
    BonusPoints { delta: i64 },
    FreeSpins { count: u32 },
    Swap { label: String },
    Clear { moved: usize, stuck: usize },
    Respins { count: u32 },
    ReverseSpins { count: u32 },
}

impl OutcomeEvent {
    /// Score contribution of this event (0 for descriptive events)
    pub fn score_delta(&self) -> i64 {
        match *self {
            OutcomeEvent::BaseWin { score, .. } => score,
            OutcomeEvent::PickBonus { delta, .. }
            | OutcomeEvent::PickCells { delta, .. }
            | OutcomeEvent::CompoundMultiplier { delta, .. }
            | OutcomeEvent::Penalty { delta }
            | OutcomeEvent::BonusPoints { delta } => delta,
            _ => 0,
        }
    }
}

/// Complete result of one spin, consumed by the session and the presenter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Net score contribution of the spin (may be negative)
    pub total_score: i64,
    pub highest_win_type: Option<WinLevel>,
    pub winning_groups: Vec<WinGroup>,
    pub free_spins_awarded: u32,
    pub respin_count: u32,
    pub reverse_spin_count: u32,
    pub events: Vec<OutcomeEvent>,
}

// Line topology. The two jackpot lines come first; the six remaining lines
// follow in detection order.
const MIDDLE_ROW: [(usize, usize); 3] = [(1, 0), (1, 1), (1, 2)];
const MIDDLE_COL: [(usize, usize); 3] = [(0, 1), (1, 1), (2, 1)];
const OTHER_LINES: [[(usize, usize); 3]; 6] = [
    [(0, 0), (0, 1), (0, 2)], // Top row
    [(2, 0), (2, 1), (2, 2)], // Bottom row
    [(0, 0), (1, 0), (2, 0)], // Left column
    [(0, 2), (1, 2), (2, 2)], // Right column
    [(0, 0), (1, 1), (2, 2)], // Main diagonal
    [(0, 2), (1, 1), (2, 0)], // Anti diagonal
];

// Adjacency deltas for pair detection: right, down, down-right, down-left
const PAIR_DELTAS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Stateless win/score evaluator over one grid
pub struct ResultProcessor<'a> {
    pub pool: &'a SymbolPool,
    pub scores: &'a ScoreTable,
    pub pick: &'a PickTable,
}

impl<'a> ResultProcessor<'a> {
    pub fn new(pool: &'a SymbolPool, scores: &'a ScoreTable, pick: &'a PickTable) -> Self {
        Self { pool, scores, pick }
    }

    /// Evaluate one spin. Deterministic: identical inputs yield an
    /// identical `Outcome`.
    pub fn calculate(
        &self,
        grid: &Grid,
        picked: Option<SymbolId>,
        was_free_spin: bool,
        summary: &EffectSummary,
        report: &ResolutionReport,
    ) -> Outcome {
        let mut claimed = [[false; GRID_DIM]; GRID_DIM];
        let mut groups = Vec::new();

        self.detect_jackpot_lines(grid, &mut claimed, &mut groups);
        self.detect_other_lines(grid, &mut claimed, &mut groups);
        self.detect_scatters(grid, &mut claimed, &mut groups);
        self.detect_pairs(grid, &mut claimed, &mut groups);

        let mut events = Vec::new();
        let mut total: i64 = groups.iter().map(|g| g.score).sum();
        for group in &groups {
            events.push(OutcomeEvent::BaseWin {
                kind: group.kind,
                symbol_name: self.pool.name(group.symbol).to_string(),
                score: group.score,
            });
        }

        if let Some(picked) = picked {
            if let Some(event) = self.pick_event(grid, picked, was_free_spin, &groups) {
                total += event.score_delta();
                events.push(event);
            }
        }

        // Special-effect composition, fixed order: (a) compound multiplier,
        // (b) penalties, (c) bonus points, (d) free spins, (e) swap/clear
        // narration, (f) respin/reverse counters.
        if !summary.multipliers.is_empty() {
            let factor: f64 = summary.multipliers.iter().product();
            let delta = ((total as f64) * factor).round() as i64 - total;
            total += delta;
            events.push(OutcomeEvent::CompoundMultiplier { factor, delta });
        }
        for &delta in &summary.penalties {
            total += delta;
            events.push(OutcomeEvent::Penalty { delta });
        }
        for &delta in &summary.bonus_points {
            total += delta;
            events.push(OutcomeEvent::BonusPoints { delta });
        }
        let free_spins_awarded: u32 = summary.free_spins.iter().sum();
        if free_spins_awarded > 0 {
            events.push(OutcomeEvent::FreeSpins {
                count: free_spins_awarded,
            });
        }
        for swap in &report.swaps {
            events.push(OutcomeEvent::Swap {
                label: swap.label.clone(),
            });
        }
        for clear in &report.clears {
            events.push(OutcomeEvent::Clear {
                moved: clear.moved.len(),
                stuck: clear.stuck.len(),
            });
        }
        if summary.respins > 0 {
            events.push(OutcomeEvent::Respins {
                count: summary.respins,
            });
        }
        if summary.reverse_spins > 0 {
            events.push(OutcomeEvent::ReverseSpins {
                count: summary.reverse_spins,
            });
        }

        Outcome {
            total_score: total,
            highest_win_type: groups.iter().map(|g| g.win_level).max(),
            winning_groups: groups,
            free_spins_awarded,
            respin_count: summary.respins,
            reverse_spin_count: summary.reverse_spins,
            events,
        }
    }

    fn detect_jackpot_lines(
        &self,
        grid: &Grid,
        claimed: &mut [[bool; GRID_DIM]; GRID_DIM],
        groups: &mut Vec<WinGroup>,
    ) {
        for line in [MIDDLE_ROW, MIDDLE_COL] {
            if let Some(symbol) = identical_line(grid, claimed, &line) {
                claim_line(claimed, &line);
                groups.push(WinGroup {
                    win_level: WinLevel::Jackpot,
                    kind: WinKind::Jackpot,
                    symbol,
                    coords: line.iter().map(|&(r, c)| Coord::new(r, c)).collect(),
                    score: self.scores.jackpot,
                });
            }
        }
    }

    fn detect_other_lines(
        &self,
        grid: &Grid,
        claimed: &mut [[bool; GRID_DIM]; GRID_DIM],
        groups: &mut Vec<WinGroup>,
    ) {
        for line in OTHER_LINES {
            if let Some(symbol) = identical_line(grid, claimed, &line) {
                claim_line(claimed, &line);
                groups.push(WinGroup {
                    win_level: WinLevel::Nearmiss,
                    kind: WinKind::Line,
                    symbol,
                    coords: line.iter().map(|&(r, c)| Coord::new(r, c)).collect(),
                    score: self.scores.line,
                });
            }
        }
    }

    /// Exactly-3 occurrences among unclaimed cells. The middle-column
    /// distribution rule is a deliberate special case: 2 of 3 occurrences
    /// in the middle column pays its own constant.
    fn detect_scatters(
        &self,
        grid: &Grid,
        claimed: &mut [[bool; GRID_DIM]; GRID_DIM],
        groups: &mut Vec<WinGroup>,
    ) {
        let mut seen: Vec<SymbolId> = Vec::new();
        for coord in Grid::coords() {
            if claimed[coord.row][coord.col] {
                continue;
            }
            let Some(symbol) = grid.at(coord) else { continue };
            if seen.contains(&symbol) {
                continue;
            }
            seen.push(symbol);

            let coords: Vec<Coord> = Grid::coords()
                .filter(|&c| !claimed[c.row][c.col] && grid.at(c) == Some(symbol))
                .collect();
            if coords.len() != 3 {
                continue;
            }

            let in_middle_col = coords.iter().filter(|c| c.col == 1).count();
            let score = if in_middle_col == 2 {
                self.scores.scatter_mid_col
            } else {
                self.scores.scatter
            };
            for c in &coords {
                claimed[c.row][c.col] = true;
            }
            groups.push(WinGroup {
                win_level: WinLevel::NormalWin,
                kind: WinKind::Scatter,
                symbol,
                coords,
                score,
            });
        }
    }

    /// Greedy first-found adjacent pairs over the remaining cells
    fn detect_pairs(
        &self,
        grid: &Grid,
        claimed: &mut [[bool; GRID_DIM]; GRID_DIM],
        groups: &mut Vec<WinGroup>,
    ) {
        for coord in Grid::coords() {
            if claimed[coord.row][coord.col] {
                continue;
            }
            let Some(symbol) = grid.at(coord) else { continue };

            for (dr, dc) in PAIR_DELTAS {
                let row = coord.row as isize + dr;
                let col = coord.col as isize + dc;
                if !(0..GRID_DIM as isize).contains(&row) || !(0..GRID_DIM as isize).contains(&col)
                {
                    continue;
                }
                let other = Coord::new(row as usize, col as usize);
                if claimed[other.row][other.col] || grid.at(other) != Some(symbol) {
                    continue;
                }

                claimed[coord.row][coord.col] = true;
                claimed[other.row][other.col] = true;
                groups.push(WinGroup {
                    win_level: WinLevel::NormalWin,
                    kind: WinKind::Pair,
                    symbol,
                    coords: vec![coord, other],
                    score: self.scores.pair,
                });
                break;
            }
        }
    }

    /// Picked-symbol bonus/penalty.
    ///
    /// If the pick participates in a win: its single highest-scoring win is
    /// multiplied by the kind-specific factor and the delta is awarded.
    /// Otherwise a flat award keyed on how many cells show the pick; the
    /// zero-cells penalty applies to paid spins only.
    fn pick_event(
        &self,
        grid: &Grid,
        picked: SymbolId,
        was_free_spin: bool,
        groups: &[WinGroup],
    ) -> Option<OutcomeEvent> {
        let symbol_name = self.pool.name(picked).to_string();

        if let Some(best) = groups
            .iter()
            .filter(|g| g.symbol == picked)
            .max_by_key(|g| g.score)
        {
            let mult = match best.kind {
                WinKind::Jackpot => self.pick.jackpot_mult,
                WinKind::Line => self.pick.line_mult,
                WinKind::Scatter => self.pick.scatter_mult,
                WinKind::Pair => self.pick.pair_mult,
            };
            let delta = ((best.score as f64) * mult).round() as i64 - best.score;
            return Some(OutcomeEvent::PickBonus {
                symbol_name,
                kind: best.kind,
                delta,
            });
        }

        let cells = grid.count_of(picked);
        let delta = match cells {
            3 => self.pick.cells_3,
            2 => self.pick.cells_2,
            1 => self.pick.cells_1,
            _ if !was_free_spin => self.pick.miss_penalty,
            _ => return None,
        };
        Some(OutcomeEvent::PickCells {
            symbol_name,
            cells,
            delta,
        })
    }
}

fn identical_line(
    grid: &Grid,
    claimed: &[[bool; GRID_DIM]; GRID_DIM],
    line: &[(usize, usize); 3],
) -> Option<SymbolId> {
    if line.iter().any(|&(r, c)| claimed[r][c]) {
        return None;
    }
    let first = grid.at(Coord::new(line[0].0, line[0].1))?;
    line.iter()
        .all(|&(r, c)| grid.at(Coord::new(r, c)) == Some(first))
        .then_some(first)
}

fn claim_line(claimed: &mut [[bool; GRID_DIM]; GRID_DIM], line: &[(usize, usize); 3]) {
    for &(r, c) in line {
        claimed[r][c] = true;
    }
}
