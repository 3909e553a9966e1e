//! Store Credit Ledger
//!
//! The transaction log is the only system of record. Balances come from the
//! running balance of a player's latest transaction; the cache in front of
//! that lookup can be dropped at any time without losing anything.

use bp_core::types::{AuditAction, AuditStatus, CreditDirection, CreditTransaction, PlayerId};
use bp_core::{BpError, BpResult};
use bp_store::LedgerStorage;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::audit::AuditTrail;

pub struct CreditLedger {
    storage: Arc<dyn LedgerStorage>,
    audit: Arc<AuditTrail>,
    /// Latest balance per player. Held across read-then-append so two writes
    /// for one player cannot interleave.
    cache: Mutex<HashMap<PlayerId, Decimal>>,
    use_cache: bool,
}

impl CreditLedger {
    pub fn new(storage: Arc<dyn LedgerStorage>, audit: Arc<AuditTrail>) -> Self {
        Self {
            storage,
            audit,
            cache: Mutex::new(HashMap::new()),
            use_cache: true,
        }
    }

    /// Always scan the log
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    /// Add credit
    pub async fn credit(
        &self,
        player_id: &PlayerId,
        amount: Decimal,
        memo: &str,
        operator: &str,
    ) -> BpResult<CreditTransaction> {
        self.post(player_id, CreditDirection::In, amount, memo, operator)
            .await
    }

    /// Spend credit; fails without writing when the balance is short
    pub async fn debit(
        &self,
        player_id: &PlayerId,
        amount: Decimal,
        memo: &str,
        operator: &str,
    ) -> BpResult<CreditTransaction> {
        self.post(player_id, CreditDirection::Out, amount, memo, operator)
            .await
    }

    pub async fn balance(&self, player_id: &PlayerId) -> BpResult<Decimal> {
        let mut cache = self.cache.lock().await;
        self.current_balance(&mut cache, player_id).await
    }

    pub async fn history(&self, player_id: &PlayerId) -> BpResult<Vec<CreditTransaction>> {
        Ok(self.storage.credit_history(player_id).await?)
    }

    async fn post(
        &self,
        player_id: &PlayerId,
        direction: CreditDirection,
        amount: Decimal,
        memo: &str,
        operator: &str,
    ) -> BpResult<CreditTransaction> {
        if amount <= Decimal::ZERO {
            return Err(BpError::invalid_input(format!(
                "credit amount must be positive, got {}",
                amount
            )));
        }

        let mut cache = self.cache.lock().await;
        let previous = self.current_balance(&mut cache, player_id).await?;
        if direction == CreditDirection::Out && amount > previous {
            return Err(BpError::InsufficientBalance {
                player_id: player_id.to_string(),
                required: amount,
                available: previous,
            });
        }

        let tx = CreditTransaction::next(
            player_id.clone(),
            direction,
            amount,
            previous,
            memo,
            operator,
        );
        let tx = self.storage.append_credit(tx).await?;
        if self.use_cache {
            cache.insert(player_id.clone(), tx.running_balance);
        }
        drop(cache);

        info!(
            player_id = %player_id,
            direction = direction.as_str(),
            amount = %amount,
            balance = %tx.running_balance,
            "Credit posted"
        );
        let action = match direction {
            CreditDirection::In => AuditAction::CreditIn,
            CreditDirection::Out => AuditAction::CreditOut,
        };
        let entry = self
            .audit
            .entry(action, AuditStatus::Success)
            .with_operator(operator)
            .with_player(player_id.clone())
            .with_details(
                serde_json::json!({
                    "seq": tx.seq,
                    "amount": tx.amount.to_string(),
                    "running_balance": tx.running_balance.to_string(),
                    "memo": memo,
                })
                .to_string(),
            );
        self.audit.record(entry).await;

        Ok(tx)
    }

    async fn current_balance(
        &self,
        cache: &mut HashMap<PlayerId, Decimal>,
        player_id: &PlayerId,
    ) -> BpResult<Decimal> {
        if self.use_cache {
            if let Some(balance) = cache.get(player_id) {
                return Ok(*balance);
            }
        }
        let balance = self
            .storage
            .last_credit_for(player_id)
            .await?
            .map(|tx| tx.running_balance)
            .unwrap_or(Decimal::ZERO);
        if self.use_cache {
            cache.insert(player_id.clone(), balance);
        }
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bp_core::types::derive_balance;
    use bp_store::MemoryStorage;
    use std::str::FromStr;

    fn ledger() -> (CreditLedger, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let audit = Arc::new(AuditTrail::new(storage.clone(), "test"));
        (CreditLedger::new(storage.clone(), audit), storage)
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_running_balance() {
        let (ledger, _) = ledger();
        let p = PlayerId::new("p1");

        ledger.credit(&p, d("10.50"), "top-up", "ops").await.unwrap();
        let tx = ledger.debit(&p, d("4.25"), "snack", "ops").await.unwrap();

        assert_eq!(tx.amount, d("-4.25"));
        assert_eq!(tx.running_balance, d("6.25"));
        assert_eq!(ledger.balance(&p).await.unwrap(), d("6.25"));
    }

    #[tokio::test]
    async fn test_overdraw_rejected() {
        let (ledger, storage) = ledger();
        let p = PlayerId::new("p1");
        ledger.credit(&p, d("5"), "", "ops").await.unwrap();

        let err = ledger.debit(&p, d("5.01"), "", "ops").await.unwrap_err();
        assert!(matches!(err, BpError::InsufficientBalance { .. }));
        assert_eq!(storage.audit_len().await, 1);
        assert_eq!(ledger.history(&p).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let (ledger, _) = ledger();
        let p = PlayerId::new("p1");
        assert!(ledger.credit(&p, Decimal::ZERO, "", "ops").await.is_err());
        assert!(ledger.credit(&p, d("-1"), "", "ops").await.is_err());
    }

    #[tokio::test]
    async fn test_cache_agrees_with_log() {
        let (cached, storage) = ledger();
        let p = PlayerId::new("p1");
        let q = PlayerId::new("p2");
        cached.credit(&p, d("3"), "", "ops").await.unwrap();
        cached.credit(&q, d("7"), "", "ops").await.unwrap();
        cached.debit(&p, d("1"), "", "ops").await.unwrap();

        let uncached = CreditLedger::new(
            storage.clone(),
            Arc::new(AuditTrail::new(storage.clone(), "test")),
        )
        .without_cache();
        assert_eq!(uncached.balance(&p).await.unwrap(), d("2"));
        assert_eq!(cached.balance(&p).await.unwrap(), d("2"));

        let log = storage.credit_history(&p).await.unwrap();
        assert_eq!(derive_balance(&log, &p), d("2"));
    }
}
