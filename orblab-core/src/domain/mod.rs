//! Domain types for ORB Lab

pub mod bar;
pub mod fill;
pub mod instrument;
pub mod params;
pub mod range;
pub mod signal;
pub mod trade;

pub use bar::{Bar, Session};
pub use fill::{ExecutionMode, Fill};
pub use instrument::{InstrumentError, InstrumentSpec};
pub use params::{ParamError, ParameterCandidate, SizeFilter, StrategyParams};
pub use range::{OpeningRange, RangeWindow};
pub use signal::{Direction, Signal};
pub use trade::{Outcome, SkipReason, StopMode, StopTarget, TradeOutcome, TradeRecord};
