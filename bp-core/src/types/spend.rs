//! Spent Pool Types

use super::common::{BatchId, EventId};
use crate::error::{BpError, BpResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A priced line item proposed for spending, before it is committed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendLineItem {
    pub item_code: String,
    pub item_name: String,
    pub level: Option<String>,
    pub qty: u32,
    pub unit_cost: u64,
}

impl SpendLineItem {
    pub fn new(item_code: impl Into<String>, qty: u32, unit_cost: u64) -> Self {
        Self {
            item_code: item_code.into(),
            item_name: String::new(),
            level: None,
            qty,
            unit_cost,
        }
    }

    pub fn with_name(mut self, item_name: impl Into<String>) -> Self {
        self.item_name = item_name.into();
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// `qty * unit_cost`, rejecting overflow
    pub fn total(&self) -> BpResult<u64> {
        self.unit_cost
            .checked_mul(u64::from(self.qty))
            .ok_or_else(|| BpError::invalid_input(format!("line total overflows for {}", self.item_code)))
    }

    pub fn validate(&self) -> BpResult<()> {
        if self.item_code.trim().is_empty() {
            return Err(BpError::invalid_input("item code must not be empty"));
        }
        if self.qty == 0 {
            return Err(BpError::invalid_input(format!("qty must be positive for {}", self.item_code)));
        }
        self.total().map(|_| ())
    }
}

/// Committed spend line.
///
/// `total` is fixed at write time; only `reverted` changes afterwards, and
/// only from false to true.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpentPoolEntry {
    pub event_id: EventId,
    pub item_code: String,
    pub item_name: String,
    /// Prize tier, if the event has one
    pub level: Option<String>,
    pub qty: u32,
    /// Points per unit
    pub unit_cost: u64,
    /// `qty * unit_cost`, checked at write time
    pub total: u64,
    /// Write time, shared by every entry in the batch
    pub timestamp: DateTime<Utc>,
    /// Commit that wrote this entry
    pub batch_id: BatchId,
    /// Excluded from event totals once set
    pub reverted: bool,
    /// Free-form event kind, e.g. `prize_draw`
    pub event_type: String,
}

impl SpentPoolEntry {
    /// Price a line item into a pool entry for the given batch
    pub fn from_line(
        event_id: &EventId,
        event_type: &str,
        batch_id: &BatchId,
        line: &SpendLineItem,
        timestamp: DateTime<Utc>,
    ) -> BpResult<Self> {
        line.validate()?;
        Ok(Self {
            event_id: event_id.clone(),
            item_code: line.item_code.clone(),
            item_name: line.item_name.clone(),
            level: line.level.clone(),
            qty: line.qty,
            unit_cost: line.unit_cost,
            total: line.total()?,
            timestamp,
            batch_id: batch_id.clone(),
            reverted: false,
            event_type: event_type.to_string(),
        })
    }

    /// Mark reverted; returns whether this call changed the entry
    pub fn mark_reverted(&mut self) -> bool {
        if self.reverted {
            return false;
        }
        self.reverted = true;
        true
    }

    /// Flatten to the ordered external record layout:
    /// EventId, ItemCode, ItemName, Level, Qty, UnitCost, Total, Timestamp,
    /// BatchId, Reverted, EventType
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.event_id.0.clone(),
            self.item_code.clone(),
            self.item_name.clone(),
            self.level.clone().unwrap_or_default(),
            self.qty.to_string(),
            self.unit_cost.to_string(),
            self.total.to_string(),
            self.timestamp.to_rfc3339(),
            self.batch_id.0.clone(),
            self.reverted.to_string().to_uppercase(),
            self.event_type.clone(),
        ]
    }
}

/// Sum of non-reverted totals
pub fn active_total<'a>(entries: impl IntoIterator<Item = &'a SpentPoolEntry>) -> u64 {
    entries
        .into_iter()
        .filter(|e| !e.reverted)
        .fold(0u64, |acc, e| acc.saturating_add(e.total))
}
