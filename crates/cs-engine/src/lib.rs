//! # cs-engine — CharaSpin rules/state engine
//!
//! A slot-machine style minigame engine over a roster of "character" symbols.
//! The engine owns all game rules and long-lived session state; rendering,
//! animation and persistence are constructor-injected collaborators.
//!
//! ## Architecture
//!
//! ```text
//! SessionController
//!     │
//!     ├── SymbolPool (deduplicated, blacklist-filtered roster)
//!     ├── Vec<Reel> (shuffled permutations of one sampled base set)
//!     └── SpecialTable (per-session probabilistic modifier assignment)
//!           │
//!           v  per spin
//!     visible specials → clear/swap resolution → Grid → Outcome
//! ```
//!
//! Resolution is single-threaded and synchronous; the only suspension point
//! is the per-reel settle barrier between `request_spin` and `reel_settled`.

pub mod config;
pub mod effects;
pub mod error;
pub mod grid;
pub mod io;
pub mod outcome;
pub mod reels;
pub mod resolve;
pub mod session;
pub mod symbols;

pub use config::*;
pub use effects::*;
pub use error::*;
pub use grid::*;
pub use io::*;
pub use outcome::*;
pub use reels::*;
pub use resolve::*;
pub use session::*;
pub use symbols::*;
