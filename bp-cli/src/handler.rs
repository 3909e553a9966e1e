//! Command Handlers

use crate::commands::{
    audit::AuditCommands, credit::CreditCommands, event::EventCommands, parse_meta, Cli,
    Commands, OutputFormat,
};
use crate::error::{CliError, CliResult};
use crate::output;
use bp_core::canon::Canonicalizer;
use bp_core::types::{BatchId, CommitOutcome, Digest, EventId, SpendLineItem};
use bp_core::BpConfig;
use bp_engine::{AwardRequest, BpEngine, CommitRequest, PreviewRequest, RosterResolver};
use bp_store::{SledStorage, StorageConfig};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Run the CLI with parsed arguments
pub async fn run(cli: Cli) -> CliResult<()> {
    // Hashing needs no ledger
    if let Commands::Event(EventCommands::Hash { allocation }) = &cli.command {
        let allocation: serde_json::Value = read_json(allocation)?;
        let digest = Canonicalizer::v1().allocation_hash(&allocation)?;
        output::print_info(&digest.to_hex());
        return Ok(());
    }

    let engine = open_engine(&cli)?;
    let result = dispatch(&engine, &cli.operator, cli.command, cli.format).await;

    let dropped = engine.audit_failures();
    if dropped > 0 {
        output::print_warning(&format!("{} audit entries could not be written", dropped));
    }
    result
}

/// Open the sled ledger at `--data-dir` with the `--roster` resolver
pub fn open_engine(cli: &Cli) -> CliResult<BpEngine> {
    let mut config = BpConfig::from_env();
    config.data_dir = cli.data_dir.clone();

    let roster = match &cli.roster {
        Some(path) => load_roster(path)?,
        None => RosterResolver::new(Vec::<String>::new()),
    };
    debug!(data_dir = %config.data_dir, players = roster.len(), "Opening ledger");

    let storage = Arc::new(SledStorage::new(&StorageConfig::new(config.data_dir.clone()))?);
    Ok(BpEngine::with_storage(config, storage, Arc::new(roster))?)
}

fn load_roster(path: &str) -> CliResult<RosterResolver> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::config(format!("cannot read roster {}: {}", path, e)))?;
    let roster = RosterResolver::from_lines(&text);
    if roster.is_empty() {
        return Err(CliError::config(format!("roster {} lists no players", path)));
    }
    Ok(roster)
}

fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> CliResult<T> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Execute one command against an open engine
pub async fn dispatch(
    engine: &BpEngine,
    operator: &str,
    command: Commands,
    format: OutputFormat,
) -> CliResult<()> {
    match command {
        Commands::Award {
            player,
            amount,
            source,
            meta,
        } => handle_award(engine, operator, player, amount, source, meta, format).await,
        Commands::Resync { player } => {
            let result = engine.resync(&player, operator).await;
            output::print_award_result(&result, format);
            award_outcome(&result)
        }
        Commands::Balance { player } => {
            let summary = engine.player_summary(&player).await?;
            output::print_summary(&summary, format);
            Ok(())
        }
        Commands::Redeem { player, amount } => {
            let record = engine.record_redemption(&player, amount).await?;
            output::print_output(&record, format);
            Ok(())
        }
        Commands::Event(cmd) => handle_event(engine, operator, cmd, format).await,
        Commands::Credit(cmd) => handle_credit(engine, operator, cmd, format).await,
        Commands::Audit(cmd) => handle_audit(engine, cmd, format).await,
    }
}

async fn handle_award(
    engine: &BpEngine,
    operator: &str,
    player: String,
    amount: i64,
    source: String,
    meta: Vec<String>,
    format: OutputFormat,
) -> CliResult<()> {
    let mut request = AwardRequest::new(player, amount, source).with_operator(operator);
    for raw in &meta {
        let (key, value) = parse_meta(raw)
            .ok_or_else(|| CliError::invalid_arg(format!("metadata must be key=value: {}", raw)))?;
        request = request.with_metadata(key, value);
    }

    let result = engine.award(request).await;
    output::print_award_result(&result, format);
    award_outcome(&result)
}

fn award_outcome(result: &bp_engine::AwardResult) -> CliResult<()> {
    match &result.failure {
        None => Ok(()),
        Some(failure) => Err(CliError::AwardFailed {
            code: failure.code.clone(),
            stage: failure.stage,
            message: failure.message.clone(),
        }),
    }
}

async fn handle_event(
    engine: &BpEngine,
    operator: &str,
    cmd: EventCommands,
    format: OutputFormat,
) -> CliResult<()> {
    match cmd {
        EventCommands::Hash { allocation } => {
            let allocation: serde_json::Value = read_json(&allocation)?;
            output::print_info(&engine.hash_allocation(&allocation)?.to_hex());
        }
        EventCommands::Preview {
            event,
            allocation,
            seed,
        } => {
            let allocation: serde_json::Value = read_json(&allocation)?;
            let artifact = engine
                .preview(PreviewRequest {
                    event_id: EventId::new(event),
                    allocation,
                    seed,
                    operator: operator.to_string(),
                })
                .await?;
            output::print_preview(&artifact, format);
        }
        EventCommands::Commit {
            event,
            event_type,
            hash,
            lines,
        } => {
            let commit_hash = Digest::from_hex(&hash)?;
            let lines: Vec<SpendLineItem> = read_json(&lines)?;
            let outcome = engine
                .commit(CommitRequest {
                    event_id: EventId::new(event),
                    event_type,
                    commit_hash,
                    lines,
                    operator: operator.to_string(),
                })
                .await?;
            output::print_commit_outcome(&outcome, format);
            if let CommitOutcome::Aborted { reason } = outcome {
                return Err(CliError::Aborted {
                    reason: reason.as_str().to_string(),
                });
            }
        }
        EventCommands::Revert { batch } => {
            let count = engine.revert_batch(&BatchId::new(batch), operator).await?;
            output::print_row("Reverted:", &count.to_string());
        }
        EventCommands::Spent { event, entries } => {
            let event_id = EventId::new(event);
            if entries {
                let list = engine.spend().entries_for_event(&event_id).await?;
                output::print_entries(&list, format);
            } else {
                let total = engine.event_spent(&event_id).await?;
                output::print_output(&serde_json::json!({ "event_id": event_id, "spent": total }), format);
            }
        }
        EventCommands::State { event } => {
            let state = engine.preview_state(&EventId::new(event)).await?;
            output::print_output(&state, format);
        }
    }
    Ok(())
}

async fn handle_credit(
    engine: &BpEngine,
    operator: &str,
    cmd: CreditCommands,
    format: OutputFormat,
) -> CliResult<()> {
    match cmd {
        CreditCommands::Add {
            player,
            amount,
            memo,
        } => {
            let player_id = engine.resolve_player(&player)?;
            let tx = engine.credit().credit(&player_id, amount, &memo, operator).await?;
            output::print_credit(&tx, format);
        }
        CreditCommands::Spend {
            player,
            amount,
            memo,
        } => {
            let player_id = engine.resolve_player(&player)?;
            let tx = engine.credit().debit(&player_id, amount, &memo, operator).await?;
            output::print_credit(&tx, format);
        }
        CreditCommands::Balance { player } => {
            let player_id = engine.resolve_player(&player)?;
            let balance = engine.credit().balance(&player_id).await?;
            output::print_balance(player_id.as_str(), balance, format);
        }
        CreditCommands::History { player } => {
            let player_id = engine.resolve_player(&player)?;
            let history = engine.credit().history(&player_id).await?;
            output::print_credit_history(&history, format);
        }
    }
    Ok(())
}

async fn handle_audit(engine: &BpEngine, cmd: AuditCommands, format: OutputFormat) -> CliResult<()> {
    let entries = match cmd {
        AuditCommands::Tail { limit } => engine.audit_tail(limit).await?,
        AuditCommands::Event { event } => engine.audit_for_event(&EventId::new(event)).await?,
    };
    output::print_audit(&entries, format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bp_store::MemoryStorage;
    use std::io::Write;

    fn engine() -> BpEngine {
        let roster = RosterResolver::new(["P", "Q"]);
        BpEngine::with_storage(BpConfig::test(), Arc::new(MemoryStorage::new()), Arc::new(roster))
            .unwrap()
    }

    fn json_file(value: serde_json::Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", value).unwrap();
        file
    }

    fn path(file: &tempfile::NamedTempFile) -> String {
        file.path().to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_award_failure_becomes_error() {
        let engine = engine();
        let err = dispatch(
            &engine,
            "ops",
            Commands::Award {
                player: "nobody".into(),
                amount: 10,
                source: "dice".into(),
                meta: vec![],
            },
            OutputFormat::Json,
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), 21);
    }

    #[tokio::test]
    async fn test_bad_metadata_rejected_before_award() {
        let engine = engine();
        let err = dispatch(
            &engine,
            "ops",
            Commands::Award {
                player: "P".into(),
                amount: 10,
                source: "dice".into(),
                meta: vec!["oops".into()],
            },
            OutputFormat::Table,
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(engine.player_summary("P").await.unwrap().total.raw_total, 0);
    }

    #[tokio::test]
    async fn test_preview_then_commit_from_files() {
        let engine = engine();
        let allocation = serde_json::json!({ "winners": ["P", "Q"] });
        let allocation_file = json_file(allocation.clone());
        let lines_file = json_file(serde_json::json!([
            { "item_code": "PIN", "item_name": "Pin", "level": null, "qty": 2, "unit_cost": 5 }
        ]));

        dispatch(
            &engine,
            "ops",
            Commands::Event(EventCommands::Preview {
                event: "E".into(),
                allocation: path(&allocation_file),
                seed: Some("1".into()),
            }),
            OutputFormat::Json,
        )
        .await
        .unwrap();

        let hash = engine.hash_allocation(&allocation).unwrap().to_hex();
        dispatch(
            &engine,
            "ops",
            Commands::Event(EventCommands::Commit {
                event: "E".into(),
                event_type: "raffle".into(),
                hash,
                lines: path(&lines_file),
            }),
            OutputFormat::Json,
        )
        .await
        .unwrap();

        assert_eq!(engine.event_spent(&EventId::new("E")).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_aborted_commit_exit_code() {
        let engine = engine();
        let lines_file = json_file(serde_json::json!([]));
        let err = dispatch(
            &engine,
            "ops",
            Commands::Event(EventCommands::Commit {
                event: "E".into(),
                event_type: "raffle".into(),
                hash: Digest::sha256(b"x").to_hex(),
                lines: path(&lines_file),
            }),
            OutputFormat::Table,
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), 40);
    }

    #[tokio::test]
    async fn test_credit_overdraw_exit_code() {
        let engine = engine();
        let err = dispatch(
            &engine,
            "ops",
            Commands::Credit(CreditCommands::Spend {
                player: "P".into(),
                amount: rust_decimal::Decimal::new(5, 0),
                memo: String::new(),
            }),
            OutputFormat::Table,
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), 25);
    }
}
