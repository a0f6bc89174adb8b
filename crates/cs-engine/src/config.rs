//! Engine configuration and score constants

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Grid orientation: whether reels scroll as rows or as columns
///
/// Purely a coordinate transform between `(reel, visible offset)` and
/// `(row, col)`; see [`crate::grid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridLayout {
    /// Each reel is one grid row; visible offsets run left to right
    RowMajor,
    /// Each reel is one grid column; visible offsets run top to bottom
    ColumnMajor,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::ColumnMajor
    }
}

/// Base win scores per pattern kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreTable {
    /// Middle row / middle column triple
    pub jackpot: i64,
    /// Any other identical line (rows, columns, diagonals)
    pub line: i64,
    /// Three of a kind scattered, exactly 2 of 3 in the middle column
    pub scatter_mid_col: i64,
    /// Three of a kind scattered, any other distribution
    pub scatter: i64,
    /// Two adjacent identical symbols
    pub pair: i64,
}

impl Default for ScoreTable {
    fn default() -> Self {
        Self {
            jackpot: 1000,
            line: 300,
            scatter_mid_col: 250,
            scatter: 150,
            pair: 50,
        }
    }
}

/// Picked-symbol bonus/penalty constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickTable {
    /// Multiplier applied to the highest win the pick participates in,
    /// by win kind. The awarded amount is the delta, not the re-multiplied
    /// total.
    pub jackpot_mult: f64,
    pub line_mult: f64,
    pub scatter_mult: f64,
    pub pair_mult: f64,
    /// Flat award when the pick shows on 3 / 2 / 1 cells without winning
    pub cells_3: i64,
    pub cells_2: i64,
    pub cells_1: i64,
    /// Flat penalty when the pick is absent (paid spins only)
    pub miss_penalty: i64,
}

impl Default for PickTable {
    fn default() -> Self {
        Self {
            jackpot_mult: 3.0,
            line_mult: 2.5,
            scatter_mult: 2.0,
            pair_mult: 1.5,
            cells_3: 200,
            cells_2: 100,
            cells_1: 40,
            miss_penalty: -60,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of reels (the visible grid is always 3×3)
    pub reel_count: usize,
    /// Symbols sampled onto each reel
    pub symbols_per_reel: usize,
    /// Minimum usable pool size; below this the session refuses to start
    pub min_pool_size: usize,
    /// Grid orientation
    pub layout: GridLayout,
    /// Score cost of one paid spin
    pub spin_cost: i64,
    /// Score granted at session start
    pub starting_score: i64,
    /// Catch-up grant range (free spins), inclusive
    pub catch_up_spins: (u32, u32),
    /// Base win scores
    pub scores: ScoreTable,
    /// Picked-symbol constants
    pub pick: PickTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reel_count: 3,
            symbols_per_reel: 8,
            min_pool_size: 8,
            layout: GridLayout::default(),
            spin_cost: 10,
            starting_score: 100,
            catch_up_spins: (2, 5),
            scores: ScoreTable::default(),
            pick: PickTable::default(),
        }
    }
}

impl EngineConfig {
    /// The standard 3-reel configuration
    pub fn standard() -> Self {
        Self::default()
    }

    /// Validate structural constraints
    pub fn validate(&self) -> EngineResult<()> {
        if self.reel_count != 3 {
            return Err(EngineError::InvalidConfig(format!(
                "reel_count must be 3 for a 3×3 grid, got {}",
                self.reel_count
            )));
        }
        if self.symbols_per_reel < 3 {
            return Err(EngineError::InvalidConfig(format!(
                "symbols_per_reel must be at least 3, got {}",
                self.symbols_per_reel
            )));
        }
        if self.min_pool_size < self.symbols_per_reel {
            return Err(EngineError::InvalidConfig(format!(
                "min_pool_size ({}) must cover symbols_per_reel ({})",
                self.min_pool_size, self.symbols_per_reel
            )));
        }
        if self.catch_up_spins.0 > self.catch_up_spins.1 {
            return Err(EngineError::InvalidConfig(
                "catch_up_spins range is inverted".into(),
            ));
        }
        Ok(())
    }

    /// Export as pretty JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Import from JSON
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_thin_reels() {
        let config = EngineConfig {
            symbols_per_reel: 2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = EngineConfig::standard();
        let json = config.to_json();
        let back = EngineConfig::from_json(&json).unwrap();
        assert_eq!(back.spin_cost, config.spin_cost);
        assert_eq!(back.layout, config.layout);
    }
}
