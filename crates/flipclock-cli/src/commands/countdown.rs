use std::cell::Cell;
use std::rc::Rc;

use clap::Args;
use flipclock_core::{
    Config, CountdownInputs, Event, Hms, ModeController, SystemTimeSource, TimeSource,
};
use tokio::time::{Duration, Instant};

use super::render;

#[derive(Args)]
pub struct CountdownArgs {
    /// Hours (defaults to the configured countdown)
    #[arg(short = 'H', long, allow_hyphen_values = true)]
    pub hours: Option<String>,
    /// Minutes
    #[arg(short, long, allow_hyphen_values = true)]
    pub minutes: Option<String>,
    /// Seconds
    #[arg(short, long, allow_hyphen_values = true)]
    pub seconds: Option<String>,
    /// Add the finished countdown to today's effective time
    #[arg(long)]
    pub commit: bool,
    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
}

impl CountdownArgs {
    /// Flags given on the command line; any that are missing come from config.
    fn inputs(&self, config: &Config) -> CountdownInputs {
        if self.hours.is_none() && self.minutes.is_none() && self.seconds.is_none() {
            return CountdownInputs::from_hms(config.default_duration());
        }
        let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "0".to_string());
        CountdownInputs {
            hours: field(&self.hours),
            minutes: field(&self.minutes),
            seconds: field(&self.seconds),
        }
    }
}

/// Run one countdown to expiry, then report the staged pending time.
pub fn run(args: CountdownArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(countdown(&config, &args))
}

async fn countdown(config: &Config, args: &CountdownArgs) -> Result<(), Box<dyn std::error::Error>> {
    let time: Rc<dyn TimeSource> = Rc::new(SystemTimeSource);
    let mut ctl = ModeController::new(config, time, render::renderer(args.json));
    ctl.subscribe(render::sink(args.json));

    let finished = Rc::new(Cell::new(false));
    let flag = finished.clone();
    ctl.subscribe(Box::new(move |event: &Event| {
        if let Event::Expired { .. } = event {
            flag.set(true);
        }
    }));

    ctl.show_countdown();
    ctl.set_inputs(args.inputs(config));
    ctl.start_countdown();

    let origin = Instant::now();
    while !finished.get() {
        let Some(due) = ctl.next_due() else { break };
        tokio::select! {
            _ = tokio::time::sleep_until(origin + Duration::from_millis(due)) => {
                let elapsed = u64::try_from(origin.elapsed().as_millis()).unwrap_or(u64::MAX);
                ctl.pump(elapsed);
            }
            _ = tokio::signal::ctrl_c() => {
                ctl.shutdown();
                return Err("countdown interrupted".into());
            }
        }
    }

    if args.commit {
        ctl.commit_pending();
    }
    ctl.shutdown();

    if !args.json {
        let snapshot = ctl.snapshot();
        println!(
            "\npending {} | effective today {}",
            Hms::from_secs(snapshot.pending_secs),
            Hms::from_secs(snapshot.committed_secs)
        );
    }
    Ok(())
}
