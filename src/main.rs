//! callwatch: watch a call log, keep a history of calls, and prompt for
//! follow-up messages.
//!
//! ## Subcommands
//!
//! - `watch`: poll an exported call log and record every new call
//! - `history`: print the most recent recorded calls
//! - `link`: print the click-to-chat link for a number

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use callwatch_lib::followup::{self, FollowUp, FollowUpStage, OutboundMessage};
use callwatch_lib::settings::FollowUpSettings;
use callwatch_lib::{init_logging, AppState, Database, HistoryRecorder, JsonFileCallLog};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "callwatch")]
#[command(about = "Watch the call log and follow up on calls")]
#[command(version)]
struct Cli {
    /// Directory holding the history database and settings
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll an exported call log (JSON array, newest first) for new calls
    Watch {
        #[arg(long, value_name = "FILE")]
        call_log: PathBuf,

        /// Poll interval in milliseconds; overrides the saved setting
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Ask the client-check and message prompts for each new call
        #[arg(long)]
        interactive: bool,
    },

    /// Print recently recorded calls, newest first
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Print the follow-up message link for a phone number
    Link {
        #[arg(value_name = "NUMBER")]
        number: String,
    },

    /// Show the follow-up message template, or save a new one
    Template {
        /// New template; `{number}` is replaced with the caller's number
        #[arg(value_name = "TEXT")]
        text: Option<String>,

        /// Also prompt for calls with an unrecognised type code
        #[arg(long)]
        prompt_unknown: Option<bool>,
    },
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        error!("callwatch failed: {err:?}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    let app = AppState::open(&data_dir)?;

    match cli.command {
        Commands::Watch {
            call_log,
            interval_ms,
            interactive,
        } => watch(app, call_log, interval_ms, interactive).await,
        Commands::History { limit } => print_history(&app.db, limit).await,
        Commands::Link { number } => {
            let template = app.settings.follow_up().message_template;
            let message = OutboundMessage::compose(&number, &template)?;
            println!("{}", message.link);
            Ok(())
        }
        Commands::Template {
            text,
            prompt_unknown,
        } => {
            let current = app.settings.follow_up();
            if text.is_none() && prompt_unknown.is_none() {
                println!("{}", current.message_template);
                return Ok(());
            }

            let updated = FollowUpSettings {
                message_template: text.unwrap_or(current.message_template),
                prompt_unknown_calls: prompt_unknown.unwrap_or(current.prompt_unknown_calls),
            };
            app.settings.update_follow_up(updated)?;
            info!("follow-up settings saved");
            Ok(())
        }
    }
}

fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("callwatch"))
        .ok_or_else(|| anyhow!("no platform data directory; pass --data-dir"))
}

async fn watch(
    app: AppState,
    call_log: PathBuf,
    interval_ms: Option<u64>,
    interactive: bool,
) -> Result<()> {
    let provider = Arc::new(JsonFileCallLog::new(call_log));
    let source = provider.path().display().to_string();
    let mut watcher = app.watcher(provider, interval_ms.map(Duration::from_millis));

    let _history = HistoryRecorder::attach(&app.channel, app.db.clone());
    let _echo = app.channel.subscribe(|call| {
        println!(
            "{} call from {} ({}s)",
            call.outcome, call.phone_number, call.duration_seconds
        );
        Ok(())
    });

    let prompts = if interactive {
        let (subscription, queue) = followup::attach_queue(&app.channel, app.settings.follow_up());
        let template = app.settings.follow_up().message_template;
        let db = app.db.clone();
        Some((
            subscription,
            tokio::spawn(async move { run_prompts(queue, db, template).await }),
        ))
    } else {
        None
    };

    watcher.start().await;
    info!(
        "watching {source} every {:?}; press Ctrl-C to stop",
        watcher.config().poll_interval
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    watcher.stop().await?;
    if let Some((subscription, task)) = prompts {
        subscription.unsubscribe();
        task.abort();
    }
    Ok(())
}

async fn run_prompts(
    mut queue: mpsc::UnboundedReceiver<FollowUp>,
    db: Database,
    template: String,
) {
    let mut answers = spawn_stdin_reader();

    while let Some(mut flow) = queue.recv().await {
        let call = flow.call().clone();
        let question = format!("{} call from {}: is this a client?", call.outcome, call.phone_number);
        let Some(is_client) = confirm(&question, &mut answers).await else {
            return;
        };
        if let Err(err) = flow.answer_client_check(is_client) {
            warn!("client check rejected: {err}");
            continue;
        }

        if flow.stage() == &FollowUpStage::MessagePrompt {
            let Some(send) = confirm("Send a follow-up message?", &mut answers).await else {
                return;
            };
            let outcome = flow
                .answer_message_prompt(send, &template)
                .map(|stage| stage.clone());
            match outcome {
                Ok(FollowUpStage::Sent(message)) => println!("Open to send: {}", message.link),
                Ok(_) => {}
                Err(err) => {
                    warn!("cannot message {}: {err}", call.phone_number);
                    if let Err(err) = flow.answer_message_prompt(false, &template) {
                        warn!("failed to dismiss follow-up: {err}");
                    }
                }
            }
        }

        if let Err(err) = db
            .record_follow_up(
                &call.identity(),
                flow.is_client().unwrap_or(false),
                flow.message_sent(),
            )
            .await
        {
            warn!("failed to record follow-up for {}: {err:?}", call.phone_number);
        }
    }
}

/// Lines from stdin, read on a plain thread so shutdown never waits on it.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = thread::Builder::new()
        .name("callwatch-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        error!("failed to start stdin reader: {err}");
    }
    rx
}

/// Ask a yes/no question. `None` once stdin is closed.
async fn confirm(question: &str, answers: &mut mpsc::UnboundedReceiver<String>) -> Option<bool> {
    print!("{question} [y/N] ");
    let _ = io::stdout().flush();
    let line = answers.recv().await?;
    Some(matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

async fn print_history(db: &Database, limit: usize) -> Result<()> {
    let records = db.list_recent_calls(limit).await?;
    if records.is_empty() {
        println!("no calls recorded yet");
        return Ok(());
    }

    for record in records {
        let when = DateTime::from_timestamp_millis(record.occurred_at_epoch_millis)
            .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| record.occurred_at_epoch_millis.to_string());
        let follow_up = match &record.follow_up {
            Some(f) if f.message_sent => "messaged",
            Some(f) if f.is_client => "client",
            Some(_) => "not a client",
            None => "-",
        };
        println!(
            "{when}  {:<8}  {:<16}  {:>5}s  {follow_up}",
            record.outcome.as_str(),
            record.phone_number,
            record.duration_seconds
        );
    }
    Ok(())
}
