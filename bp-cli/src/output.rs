//! Output Formatting

use crate::commands::OutputFormat;
use bp_core::types::{AuditLogEntry, CommitOutcome, CreditTransaction, PreviewArtifact, SpentPoolEntry};
use bp_engine::{AwardResult, PlayerSummary};
use rust_decimal::Decimal;
use serde::Serialize;

/// Print any serializable value as JSON
pub fn print_output<T: Serialize>(data: &T, _format: OutputFormat) {
    print_json(data);
}

fn print_json<T: Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error formatting JSON: {}", e),
    }
}

pub fn print_award_result(result: &AwardResult, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(result),
        OutputFormat::Table => {
            println!("Award Result");
            println!("============");
            let status = if result.success { "OK" } else { "FAILED" };
            print_row("Status:", status);
            if let Some(player) = &result.player_id {
                print_row("Player:", player.as_str());
            }
            if result.success {
                print_row("Current BP:", &result.current_bp.to_string());
                print_row("Historical BP:", &result.historical_bp.to_string());
                print_row("Overflow:", &result.overflow.to_string());
                print_row("Prestige:", &result.prestige.to_string());
            }
            if !result.tags.is_empty() {
                print_row("Tags:", &result.tags.join(","));
            }
            if let Some(failure) = &result.failure {
                print_row("Code:", &failure.code);
                if let Some(stage) = failure.stage {
                    print_row("Failed stage:", stage.as_str());
                }
                print_row("Message:", &failure.message);
            }
        }
    }
}

pub fn print_summary(summary: &PlayerSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(summary),
        OutputFormat::Table => {
            println!("Player {}", summary.player_id);
            print_separator();
            for (source, points) in &summary.total.source_points {
                print_row(&format!("{}:", source), &points.to_string());
            }
            print_row("Raw total:", &summary.total.raw_total.to_string());
            print_row("Historical BP:", &summary.total.historical_bp.to_string());
            print_row("Current BP:", &summary.total.current_bp.to_string());
            print_row("Redeemed:", &summary.total_redeemed.to_string());
            print_row("Prestige:", &summary.prestige.prestige.to_string());
            print_row(
                "Overflow (cum.):",
                &summary.prestige.total_overflow_cumulative.to_string(),
            );
            print_row("Store credit:", &summary.credit_balance.to_string());
        }
    }
}

pub fn print_preview(artifact: &PreviewArtifact, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(artifact),
        OutputFormat::Table => {
            print_row("Preview:", artifact.id.as_str());
            print_row("Event:", artifact.event_id.as_str());
            print_row("Hash:", &artifact.preview_hash.to_hex());
            print_row("Expires:", &artifact.expires_at.to_rfc3339());
        }
    }
}

pub fn print_commit_outcome(outcome: &CommitOutcome, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(outcome),
        OutputFormat::Table => match outcome {
            CommitOutcome::Committed {
                batch_id,
                entries_written,
                total,
            } => {
                print_row("Status:", "COMMITTED");
                print_row("Batch:", batch_id.as_str());
                print_row("Entries:", &entries_written.to_string());
                print_row("Total:", &total.to_string());
            }
            CommitOutcome::Aborted { reason } => {
                print_row("Status:", "ABORTED");
                print_row("Reason:", reason.as_str());
            }
        },
    }
}

pub fn print_entries(entries: &[SpentPoolEntry], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&entries),
        OutputFormat::Table => {
            println!(
                "{:<10} {:<28} {:>5} {:>8} {:>8}  {}",
                "ITEM", "BATCH", "QTY", "UNIT", "TOTAL", "REVERTED"
            );
            for e in entries {
                println!(
                    "{:<10} {:<28} {:>5} {:>8} {:>8}  {}",
                    e.item_code, e.batch_id, e.qty, e.unit_cost, e.total, e.reverted
                );
            }
        }
    }
}

pub fn print_credit(tx: &CreditTransaction, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(tx),
        OutputFormat::Table => {
            print_row("Player:", tx.player_id.as_str());
            print_row("Direction:", tx.direction.as_str());
            print_row("Amount:", &tx.amount.to_string());
            print_row("Balance:", &tx.running_balance.to_string());
        }
    }
}

pub fn print_credit_history(history: &[CreditTransaction], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&history),
        OutputFormat::Table => {
            for tx in history {
                println!(
                    "{:>6} {:<4} {:>12} {:>12}  {}",
                    tx.seq,
                    tx.direction.as_str(),
                    tx.amount,
                    tx.running_balance,
                    tx.memo
                );
            }
        }
    }
}

pub fn print_balance(player: &str, balance: Decimal, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "player_id": player, "balance": balance })),
        OutputFormat::Table => print_row("Balance:", &balance.to_string()),
    }
}

pub fn print_audit(entries: &[AuditLogEntry], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&entries),
        OutputFormat::Table => {
            for entry in entries {
                println!("{}", entry.to_record().join(" | "));
            }
        }
    }
}

pub fn print_info(message: &str) {
    println!("{}", message);
}

pub fn print_warning(message: &str) {
    eprintln!("Warning: {}", message);
}

/// Print a table row
pub fn print_row(key: &str, value: &str) {
    println!("{:<20} {}", key, value);
}

pub fn print_separator() {
    println!("{}", "-".repeat(40));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_row_format() {
        print_row("Key", "Value");
    }
}
