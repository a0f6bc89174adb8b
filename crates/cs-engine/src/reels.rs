//! Reel construction and stop selection

use rand::prelude::*;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::symbols::{Reel, SymbolId, SymbolPool};

/// Build the session's reels from the pool.
///
/// Samples `min(symbols_per_reel, |pool|)` distinct symbols without
/// replacement as the base set, then gives every reel an independent
/// shuffle of that same set. All reels therefore share one symbol multiset,
/// which is what makes lines, columns, diagonals and scatters reachable.
pub fn build_reels<R: Rng>(
    pool: &SymbolPool,
    config: &EngineConfig,
    rng: &mut R,
) -> EngineResult<Vec<Reel>> {
    if pool.len() < config.min_pool_size {
        return Err(EngineError::PoolTooSmall {
            got: pool.len(),
            min: config.min_pool_size,
        });
    }

    let mut base = pool.ids();
    base.shuffle(rng);
    base.truncate(config.symbols_per_reel.min(base.len()));

    let mut reels = Vec::with_capacity(config.reel_count);
    for _ in 0..config.reel_count {
        let mut order = base.clone();
        order.shuffle(rng);
        reels.push(Reel::new(order));
    }
    Ok(reels)
}

/// Pick a resting position for each reel.
///
/// `force_jackpot` aligns every reel on one symbol picked from the first
/// non-empty reel (demo/test path only); reels missing that symbol fall
/// back to a random stop.
pub fn determine_stops<R: Rng>(reels: &[Reel], force_jackpot: bool, rng: &mut R) -> Vec<usize> {
    let forced: Option<SymbolId> = if force_jackpot {
        reels
            .iter()
            .find(|r| !r.is_empty())
            .and_then(|r| r.symbols().choose(rng).copied())
    } else {
        None
    };

    reels
        .iter()
        .map(|reel| {
            if reel.is_empty() {
                return 0;
            }
            forced
                .and_then(|id| reel.position_of(id))
                .unwrap_or_else(|| rng.random_range(0..reel.len()))
        })
        .collect()
}

/// Exchange the symbols stored at two reel positions (possibly on different
/// reels). Positions wrap; the multiset of symbols across all reels is
/// preserved.
pub fn swap_reel_symbols(reels: &mut [Reel], a: (usize, usize), b: (usize, usize)) {
    if a == b {
        return;
    }
    let sa = reels[a.0].symbol_at(a.1);
    let sb = reels[b.0].symbol_at(b.1);
    if let (Some(sa), Some(sb)) = (sa, sb) {
        reels[a.0].replace_at(a.1, sb);
        reels[b.0].replace_at(b.1, sa);
    }
}
