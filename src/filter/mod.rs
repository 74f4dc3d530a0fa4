//! Token filtering module
//!
//! Static thresholds, external reputation oracles and a local wash-trading
//! heuristic combined into a single accept/reject decision, with a
//! blacklist that remembers every token (and developer) that failed.

pub mod blacklist;
pub mod heuristics;
pub mod oracles;
pub mod pipeline;
pub mod types;

pub use blacklist::{Blacklist, BlacklistEntry, BlacklistKind};
pub use heuristics::FakeVolumeHeuristic;
pub use oracles::{AuthorityOracle, ReputationOracle, TokenAuthorities, WashTradingOracle};
pub use pipeline::{Evaluation, FilterPipeline, FilterReport};
pub use types::{
    FilterStats, Gate, GateOutcome, RejectReason, ReputationStatus, ScreenedToken, TokenCandidate,
    UNKNOWN_DEVELOPER,
};
