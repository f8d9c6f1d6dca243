use std::time::Duration;

use clap::{Subcommand, ValueEnum};
use mindbell_core::wakeup::{run as run_loop, Answer, LaunchReport, SystemClock, WakeupScheduler};
use mindbell_core::{Config, Database, SqliteWakeService};
use serde_json::json;
use tracing::warn;

use crate::feedback::{OutputMode, TerminalFeedback};

type CliScheduler = WakeupScheduler<SqliteWakeService, Database, TerminalFeedback, SystemClock>;

#[derive(Subcommand)]
pub enum WakeupAction {
    /// Schedule the next check-in (no-op if one is already pending)
    Start,
    /// Show the pending check-in, if any
    Status,
    /// Stay running and deliver check-ins as they come due
    Watch {
        /// Poll interval in milliseconds (defaults to service.poll_interval_ms)
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// Answer the "still aware?" prompt
    Answer {
        #[arg(value_enum)]
        answer: AnswerArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AnswerArg {
    Aware,
    Distracted,
}

impl From<AnswerArg> for Answer {
    fn from(arg: AnswerArg) -> Self {
        match arg {
            AnswerArg::Aware => Answer::Aware,
            AnswerArg::Distracted => Answer::Distracted,
        }
    }
}

/// Open the backends and reconcile. Every invocation is a process start.
fn launch(
    config: &Config,
    mode: OutputMode,
) -> Result<(CliScheduler, LaunchReport), Box<dyn std::error::Error>> {
    let settings = config.settings()?;
    let service = SqliteWakeService::open()?.with_max_pending(config.service.max_pending);
    let store = Database::open()?;
    let feedback = TerminalFeedback::new(mode, config.notifications.vibration);
    Ok(WakeupScheduler::launch(
        service,
        store,
        feedback,
        SystemClock,
        settings,
    ))
}

pub fn run(action: WakeupAction, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mode = if json_output {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    match action {
        WakeupAction::Start => {
            let (mut scheduler, launch_report) = launch(&config, mode)?;
            let outcome = scheduler.request_wakeup()?;
            if json_output {
                let doc = json!({
                    "launch": launch_report,
                    "outcome": outcome,
                    "messages": scheduler.feedback().messages(),
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            }
        }
        WakeupAction::Status => {
            let (mut scheduler, launch_report) = launch(&config, mode)?;
            let status = scheduler.poll_status();
            if json_output {
                let doc = json!({
                    "launch": launch_report,
                    "status": status,
                    "messages": scheduler.feedback().messages(),
                    "pulses": scheduler.feedback().pulses(),
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            }
        }
        WakeupAction::Watch {
            interval_ms,
            duration_secs,
        } => {
            let interval = interval_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.poll_interval());
            let (mut scheduler, _) = launch(&config, mode)?;

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let summary = runtime.block_on(run_loop(
                &mut scheduler,
                interval,
                shutdown_signal(duration_secs.map(Duration::from_secs)),
            ));
            if json_output {
                let doc = json!({
                    "summary": summary,
                    "messages": scheduler.feedback().messages(),
                    "pulses": scheduler.feedback().pulses(),
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            }
        }
        WakeupAction::Answer { answer } => {
            let (mut scheduler, _) = launch(&config, mode)?;
            scheduler.acknowledge(answer.into());
            if json_output {
                let doc = json!({ "messages": scheduler.feedback().messages() });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            }
        }
    }
    Ok(())
}

async fn shutdown_signal(limit: Option<Duration>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    match limit {
        Some(limit) => {
            tokio::select! {
                _ = tokio::time::sleep(limit) => {}
                _ = ctrl_c => {}
            }
        }
        None => ctrl_c.await,
    }
}
