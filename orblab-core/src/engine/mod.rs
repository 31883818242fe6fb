//! Execution engine: the per-session ORB state machine and its cost model.
//!
//! Stages run strictly in order, each reading only bars its predecessor has
//! released:
//! 1. `range` — opening range from the leading window bars
//! 2. `breakout` — close-based confirmation after the window
//! 3. `fill` — entry fill under one of three execution modes
//! 4. `cost_model` — minimum-viable-risk gate, realized RR
//! 5. `outcome` — stop/target walk with MAE/MFE tracking

pub mod breakout;
pub mod cost_model;
pub mod fill;
pub mod outcome;
pub mod range;
pub mod session;

pub use breakout::detect_breakout;
pub use cost_model::{CostModel, RealizedResult, MAX_FRICTION_RATIO};
pub use fill::{forced_market_entry, resolve_fill, FillResolution};
pub use outcome::{resolve_outcome, OutcomeResolver, ResolverState};
pub use range::{compute_opening_range, RangeError};
pub use session::{simulate_forced_entry, simulate_session, ForcedEntry, SessionResult};
