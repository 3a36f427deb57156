//! Foundational types: chains, tokens, events, ledgers, and parameters.

pub mod chain;
pub mod event;
pub mod ledger;
pub mod params;
pub mod token;
