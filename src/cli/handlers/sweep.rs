use super::HandlerContext;
use crate::ai;
use crate::cli::OutputFormatter;
use crate::config::Config;
use crate::error::Result;
use crate::events::TicketEvent;
use crate::storage::FailureLog;
use crate::triage::{Triage, TriageOutcome, TriageWorker, stale_open_ids};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Default, Serialize)]
struct SweepReport {
    found: usize,
    triaged: usize,
    unchanged: usize,
    failed: usize,
}

/// Triage every stale `OPEN` ticket once, without a running server
///
/// Tickets in the failure log are skipped unless `include_failed` is set.
pub async fn handle_sweep(
    config: Config,
    older_than: Option<u64>,
    include_failed: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let ctx = HandlerContext::new(config).await?;
    let age = Duration::from_secs(older_than.unwrap_or(ctx.config.sweep.stale_after_secs));

    let triage = Triage::new(
        ctx.storage.clone(),
        ctx.storage.clone(),
        ai::from_config(&ctx.config.ai)?,
        ctx.storage.clone(),
    )
    .configure(&ctx.config.triage, &ctx.config.ai);
    let worker = TriageWorker::new(triage, 1);

    let failures: Option<&dyn FailureLog> = if include_failed {
        None
    } else {
        Some(ctx.storage.as_ref())
    };
    let stale = stale_open_ids(ctx.storage.as_ref(), failures, age).await?;
    let mut report = SweepReport {
        found: stale.len(),
        ..SweepReport::default()
    };
    for ticket_id in stale {
        match worker.process(TicketEvent::Created { ticket_id }).await {
            TriageOutcome::Triaged { assigned_to } => {
                report.triaged += 1;
                let assignee = assigned_to.map_or_else(|| "nobody".to_string(), |id| id.to_string());
                formatter.info(&format!("  {} -> {assignee}", ticket_id.short()));
            },
            TriageOutcome::Unchanged { .. } => report.unchanged += 1,
            TriageOutcome::GaveUp { attempts } => {
                report.failed += 1;
                formatter.warning(&format!(
                    "{} still OPEN after {attempts} attempts",
                    ticket_id.short()
                ));
            },
        }
    }

    if formatter.is_json() {
        return formatter.print_json(&report);
    }
    formatter.success(&format!(
        "Swept {} stale tickets: {} triaged, {} unchanged, {} failed",
        report.found, report.triaged, report.unchanged, report.failed
    ));
    Ok(())
}
