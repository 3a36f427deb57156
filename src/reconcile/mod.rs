//! Running balance accumulation, excess correction, and pool rebalance
//! leaf construction.

pub mod accumulator;
pub mod cycle;
pub mod excess;
pub mod leaves;
pub mod threshold;
