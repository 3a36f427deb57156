use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Split of a running balance into the part released now and the part
/// carried into the next cycle. At most one side is nonzero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetSendAndCarry {
    /// Amount the hub transfers this cycle (signed: negative means the
    /// spoke returns funds to the hub).
    pub net_send: Decimal,
    /// Amount left in the running balance for the next cycle.
    pub carry: Decimal,
}

/// Decide whether a running balance is large enough to move.
///
/// A balance whose magnitude reaches `threshold` is released in full as
/// the net send; anything smaller carries forward untouched. The split
/// is exhaustive: `net_send + carry` always equals `running_balance`,
/// and the two are never both nonzero. A zero threshold releases every
/// balance.
pub fn net_send_and_carry(threshold: Decimal, running_balance: Decimal) -> NetSendAndCarry {
    if running_balance.abs() >= threshold {
        NetSendAndCarry {
            net_send: running_balance,
            carry: Decimal::ZERO,
        }
    } else {
        NetSendAndCarry {
            net_send: Decimal::ZERO,
            carry: running_balance,
        }
    }
}
