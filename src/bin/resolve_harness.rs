//! Diagnostic harness: resolve time expressions and optionally attach them
//! to an in-memory trigger store.
//!
//! ```text
//! fae-reminders-resolve [--tz ZONE] [--reference RFC3339] [--config PATH] [--attach] EXPR...
//! ```
//!
//! Prints one JSON object per expression on stdout. Tracing goes to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use fae_reminders::memory::{InMemoryReminderRepository, InMemoryTriggerScheduler};
use fae_reminders::{
    NewReminder, PersonId, RemindersConfig, TimeExpressionResolver, TriggerLifecycleManager,
};
use tokio_util::sync::CancellationToken;

const USAGE: &str = "usage: fae-reminders-resolve [--tz ZONE] [--reference RFC3339] [--config PATH] [--attach] EXPR...";

#[derive(Debug, Default)]
struct Args {
    timezone: Option<String>,
    reference: Option<DateTime<Utc>>,
    config: Option<PathBuf>,
    attach: bool,
    expressions: Vec<String>,
}

fn parse_args(raw: impl IntoIterator<Item = String>) -> anyhow::Result<Args> {
    let mut args = Args::default();
    let mut raw = raw.into_iter();
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--tz" => args.timezone = Some(raw.next().context("--tz needs a value")?),
            "--reference" => {
                let value = raw.next().context("--reference needs a value")?;
                let parsed = DateTime::parse_from_rfc3339(&value)
                    .with_context(|| format!("invalid --reference {value:?}"))?;
                args.reference = Some(parsed.with_timezone(&Utc));
            }
            "--config" => {
                args.config = Some(PathBuf::from(raw.next().context("--config needs a value")?));
            }
            "--attach" => args.attach = true,
            "-h" | "--help" => anyhow::bail!(USAGE),
            _ => args.expressions.push(arg),
        }
    }
    if args.expressions.is_empty() {
        anyhow::bail!(USAGE);
    }
    Ok(args)
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<RemindersConfig> {
    let path = path.unwrap_or_else(RemindersConfig::default_config_path);
    if !path.exists() {
        return Ok(RemindersConfig::default());
    }
    RemindersConfig::from_file(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let config = load_config(args.config.clone())?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.filter)),
        )
        .init();

    let resolver = TimeExpressionResolver::from_config(&config.resolver);
    let reference = args.reference.unwrap_or_else(Utc::now);
    let cancel = CancellationToken::new();

    let scheduler = Arc::new(InMemoryTriggerScheduler::new());
    let repository = Arc::new(InMemoryReminderRepository::new());
    let manager = TriggerLifecycleManager::new(scheduler.clone(), repository.clone());

    tracing::info!(%reference, fallback = resolver.has_fallback(), "fae-reminders-resolve starting");

    for expression in &args.expressions {
        let line = match resolver
            .resolve_detailed(expression, reference, args.timezone.as_deref(), &cancel)
            .await
        {
            Ok(resolution) => {
                let mut line = serde_json::json!({
                    "input": expression,
                    "instant": resolution.instant.to_rfc3339(),
                    "stage": resolution.stage.to_string(),
                });
                if args.attach {
                    let request =
                        NewReminder::new(PersonId::new("harness"), expression.clone(), resolution.instant);
                    match manager.attach_reminder(request).await {
                        Ok(reminder) => {
                            line["reminder_id"] = serde_json::json!(reminder.id);
                            line["trigger_id"] = serde_json::json!(reminder.trigger_id);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "attach failed");
                            line["error"] = serde_json::json!(e.code());
                        }
                    }
                }
                line
            }
            Err(e) => serde_json::json!({
                "input": expression,
                "error": e.code(),
                "message": e.user_message(),
            }),
        };
        println!("{line}");
    }

    if args.attach {
        let triggers = scheduler.live_triggers();
        tracing::info!(
            triggers = triggers.len(),
            reminders = repository.live_reminders().len(),
            "attached reminders"
        );
    }
    Ok(())
}
