//! Root bundle records, proposal-window history, and block range
//! resolution.

pub mod history;
pub mod range;
pub mod roots;
