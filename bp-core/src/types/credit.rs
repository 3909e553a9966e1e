//! Store Credit Types
//!
//! The credit log is the system of record; a player's balance is the
//! running balance of their latest transaction.

use super::common::PlayerId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Transaction direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CreditDirection {
    In,
    Out,
}

impl CreditDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
        }
    }
}

/// One append-only credit transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransaction {
    /// Position in the log, assigned by storage
    pub seq: u64,
    pub player_id: PlayerId,
    /// IN adds to the balance, OUT draws it down
    pub direction: CreditDirection,
    /// Signed: positive for IN, negative for OUT
    pub amount: Decimal,
    /// Balance after this transaction
    pub running_balance: Decimal,
    /// Free-text reason shown in the log
    pub memo: String,
    /// Who recorded the transaction
    pub operator: String,
    /// Time the transaction was built
    pub timestamp: DateTime<Utc>,
}

impl CreditTransaction {
    /// Build the next transaction on top of `previous_balance`.
    /// `magnitude` is the unsigned amount.
    pub fn next(
        player_id: PlayerId,
        direction: CreditDirection,
        magnitude: Decimal,
        previous_balance: Decimal,
        memo: impl Into<String>,
        operator: impl Into<String>,
    ) -> Self {
        let amount = match direction {
            CreditDirection::In => magnitude,
            CreditDirection::Out => -magnitude,
        };
        Self {
            seq: 0,
            player_id,
            direction,
            amount,
            running_balance: previous_balance + amount,
            memo: memo.into(),
            operator: operator.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Latest running balance for a player by scanning the log backward
pub fn derive_balance(log: &[CreditTransaction], player_id: &PlayerId) -> Decimal {
    log.iter()
        .rev()
        .find(|tx| &tx.player_id == player_id)
        .map(|tx| tx.running_balance)
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_is_signed_negative() {
        let tx = CreditTransaction::next(
            PlayerId::new("p1"),
            CreditDirection::Out,
            Decimal::new(250, 2),
            Decimal::new(1000, 2),
            "booster",
            "staff",
        );
        assert_eq!(tx.amount, Decimal::new(-250, 2));
        assert_eq!(tx.running_balance, Decimal::new(750, 2));
    }

    #[test]
    fn test_derive_balance_uses_latest_entry_for_player() {
        let p1 = PlayerId::new("p1");
        let p2 = PlayerId::new("p2");
        let a = CreditTransaction::next(p1.clone(), CreditDirection::In, Decimal::new(10, 0), Decimal::ZERO, "", "");
        let b = CreditTransaction::next(p2.clone(), CreditDirection::In, Decimal::new(3, 0), Decimal::ZERO, "", "");
        let c = CreditTransaction::next(p1.clone(), CreditDirection::Out, Decimal::new(4, 0), a.running_balance, "", "");
        let log = vec![a, b, c];

        assert_eq!(derive_balance(&log, &p1), Decimal::new(6, 0));
        assert_eq!(derive_balance(&log, &p2), Decimal::new(3, 0));
        assert_eq!(derive_balance(&log, &PlayerId::new("p3")), Decimal::ZERO);
    }
}
