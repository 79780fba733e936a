//! Interactive session.
//!
//! Drives a [`ModeController`] on a current-thread tokio runtime. The loop
//! sleeps until the controller's next scheduled task, a line on stdin, or
//! Ctrl-C, whichever comes first; every handler runs to completion before
//! the next one, so no locking is needed.

use std::rc::Rc;

use clap::{Args, Parser, Subcommand};
use flipclock_core::{Config, CountdownInputs, ModeController, SystemTimeSource, TimeSource};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{Duration, Instant};

use super::render;

#[derive(Args)]
pub struct RunArgs {
    /// Print events as JSON lines instead of drawing the clock
    #[arg(long)]
    pub json: bool,
}

/// One line typed into the session.
#[derive(Parser)]
#[command(no_binary_name = true, disable_help_flag = true, disable_version_flag = true)]
struct SessionLine {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Start a countdown from H M S, or from the input fields if none given
    Start {
        #[arg(num_args = 0..=3, allow_hyphen_values = true)]
        fields: Vec<String>,
    },
    /// Fill the countdown input fields
    Inputs {
        #[arg(allow_hyphen_values = true)]
        hours: String,
        #[arg(allow_hyphen_values = true)]
        minutes: String,
        #[arg(allow_hyphen_values = true)]
        seconds: String,
    },
    /// Show the wall clock
    Clock,
    /// Show the countdown
    Countdown,
    /// Add pending time to today's total
    Add,
    /// Drop pending time
    Clear,
    /// Replace pending time (HH:MM:SS)
    Edit { time: String },
    /// Set the goal; no text clears it
    Goal { text: Vec<String> },
    /// Print the current state as JSON
    Status,
    /// End the session
    #[command(alias = "exit")]
    Quit,
}

enum Flow {
    Continue,
    Quit,
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(session(&config, args.json))
}

async fn session(config: &Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let time: Rc<dyn TimeSource> = Rc::new(SystemTimeSource);
    let mut ctl = ModeController::new(config, time, render::renderer(json));
    ctl.subscribe(render::sink(json));
    tracing::info!(mode = ?ctl.mode(), "session started");

    let origin = Instant::now();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        ctl.pump(elapsed_ms(origin));
        let deadline = ctl
            .next_due()
            .map(|due| origin + Duration::from_millis(due));

        tokio::select! {
            _ = sleep_until(deadline) => {}
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                ctl.pump(elapsed_ms(origin));
                ctl.note_activity();
                if let Flow::Quit = handle_line(&mut ctl, &line) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    ctl.shutdown();
    tracing::info!("session ended");
    Ok(())
}

fn handle_line(ctl: &mut ModeController, line: &str) -> Flow {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Flow::Continue;
    }

    let command = match SessionLine::try_parse_from(words) {
        Ok(parsed) => parsed.command,
        Err(e) => {
            eprintln!("{e}");
            return Flow::Continue;
        }
    };

    match command {
        SessionCommand::Start { fields } => match fields.as_slice() {
            [] => ctl.start_countdown(),
            [h, m, s] => {
                ctl.set_inputs(CountdownInputs::new(h, m, s));
                ctl.start_countdown();
            }
            _ => eprintln!("start takes either no fields or H M S"),
        },
        SessionCommand::Inputs {
            hours,
            minutes,
            seconds,
        } => ctl.set_inputs(CountdownInputs::new(&hours, &minutes, &seconds)),
        SessionCommand::Clock => ctl.show_clock(),
        SessionCommand::Countdown => ctl.show_countdown(),
        SessionCommand::Add => ctl.commit_pending(),
        SessionCommand::Clear => ctl.clear_pending(),
        SessionCommand::Edit { time } => {
            if let Err(e) = ctl.edit_pending_str(&time) {
                eprintln!("error: {e}");
            }
        }
        SessionCommand::Goal { text } => ctl.set_goal(&text.join(" ")),
        SessionCommand::Status => {
            let snapshot = ctl.snapshot();
            match serde_json::to_string_pretty(&snapshot) {
                Ok(json) => println!("\n{json}"),
                Err(e) => eprintln!("error: {e}"),
            }
        }
        SessionCommand::Quit => return Flow::Quit,
    }
    Flow::Continue
}

fn elapsed_ms(origin: Instant) -> u64 {
    u64::try_from(origin.elapsed().as_millis()).unwrap_or(u64::MAX)
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
