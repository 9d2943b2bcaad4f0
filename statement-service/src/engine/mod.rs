//! Statement ledger engine: computation, sequencing, ripple and aggregation.
//!
//! Everything here is synchronous and storage-agnostic. The service layer
//! loads a [`Ledger`], runs the engine over it and commits the result.

mod aggregator;
mod computer;
mod ledger;
mod ripple;
mod sequencer;

pub use aggregator::{Period, PeriodAggregator};
pub use computer::{ComputeInput, StatementComputer};
pub use ledger::Ledger;
pub use ripple::RippleRecalculator;
pub use sequencer::LedgerSequencer;
