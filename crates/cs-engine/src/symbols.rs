//! Character symbols, the session pool, and reel storage

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Opaque symbol handle
///
/// Identity is the only thing the engine ever compares; display names are
/// presentation data carried alongside.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SymbolId(pub u32);

/// A character symbol as supplied by the roster provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Unique symbol ID
    pub id: SymbolId,
    /// Display name (e.g. a character's name)
    pub display_name: String,
}

impl Symbol {
    pub fn new(id: u32, display_name: impl Into<String>) -> Self {
        Self {
            id: SymbolId(id),
            display_name: display_name.into(),
        }
    }
}

/// The deduplicated set of symbols available to one session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolPool {
    symbols: Vec<Symbol>,
}

impl SymbolPool {
    /// Build a pool from a raw roster: duplicates (by ID) collapse to their
    /// first occurrence, blacklisted IDs are dropped.
    pub fn from_roster(roster: Vec<Symbol>, blacklist: &HashSet<SymbolId>) -> Self {
        let mut seen = HashSet::new();
        let symbols = roster
            .into_iter()
            .filter(|s| !blacklist.contains(&s.id) && seen.insert(s.id))
            .collect();
        Self { symbols }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Look up a symbol by ID
    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.id == id)
    }

    /// Display name for an ID, empty if unknown
    pub fn name(&self, id: SymbolId) -> &str {
        self.get(id).map(|s| s.display_name.as_str()).unwrap_or("")
    }

    pub fn ids(&self) -> Vec<SymbolId> {
        self.symbols.iter().map(|s| s.id).collect()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
}

/// One reel: an ordered sequence of distinct symbols
///
/// Wrap-around indexing everywhere; position arithmetic is always done
/// modulo the reel length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reel {
    symbols: Vec<SymbolId>,
}

impl Reel {
    pub fn new(symbols: Vec<SymbolId>) -> Self {
        Self { symbols }
    }

    /// Symbol at position (wraps around)
    pub fn symbol_at(&self, position: usize) -> Option<SymbolId> {
        if self.symbols.is_empty() {
            return None;
        }
        Some(self.symbols[position % self.symbols.len()])
    }

    /// First position holding `id`, if present
    pub fn position_of(&self, id: SymbolId) -> Option<usize> {
        self.symbols.iter().position(|&s| s == id)
    }

    /// Replace the symbol at a position, returning the previous occupant.
    /// Used only by swap resolution; the reel stays a permutation because
    /// swaps always exchange two positions.
    pub fn replace_at(&mut self, position: usize, id: SymbolId) -> Option<SymbolId> {
        if self.symbols.is_empty() {
            return None;
        }
        let len = self.symbols.len();
        let slot = &mut self.symbols[position % len];
        Some(std::mem::replace(slot, id))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[SymbolId] {
        &self.symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Symbol> {
        vec![
            Symbol::new(1, "Akane"),
            Symbol::new(2, "Botan"),
            Symbol::new(1, "Akane (dup)"),
            Symbol::new(3, "Chise"),
        ]
    }

    #[test]
    fn test_pool_dedup() {
        let pool = SymbolPool::from_roster(roster(), &HashSet::new());
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.name(SymbolId(1)), "Akane");
    }

    #[test]
    fn test_pool_blacklist() {
        let blacklist = HashSet::from([SymbolId(2)]);
        let pool = SymbolPool::from_roster(roster(), &blacklist);
        assert_eq!(pool.len(), 2);
        assert!(pool.get(SymbolId(2)).is_none());
    }

    #[test]
    fn test_reel_wrap() {
        let reel = Reel::new(vec![SymbolId(1), SymbolId(2), SymbolId(3)]);
        assert_eq!(reel.symbol_at(0), Some(SymbolId(1)));
        assert_eq!(reel.symbol_at(3), Some(SymbolId(1))); // Wraps
        assert_eq!(reel.symbol_at(5), Some(SymbolId(3)));
    }

    #[test]
    fn test_reel_replace() {
        let mut reel = Reel::new(vec![SymbolId(1), SymbolId(2)]);
        let prev = reel.replace_at(1, SymbolId(9));
        assert_eq!(prev, Some(SymbolId(2)));
        assert_eq!(reel.symbol_at(1), Some(SymbolId(9)));
    }
}
