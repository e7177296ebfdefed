//! chassis-buttons service
//!
//! Loads the GPIO definitions file, builds every supported control and runs
//! the event loop until it fails.

use anyhow::{Context, Result};
use chassis_buttons::consts;
use chassis_buttons::sysfs::{self, SysfsLineSource};
use chassis_buttons::{
    ButtonService, DebouncePolicy, Env, GpioDefinitions, JsonLinesSink, LineSource, LogSink,
    Reactor, Registry, RuntimeSettings, StateSink,
};
use clap::Parser;
use log::{error, info, warn};
use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Duration;

/// Decode chassis buttons and host selector switches from GPIO lines
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the GPIO definitions file
    #[arg(short, long, default_value = consts::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Root of the sysfs GPIO class directory
    #[arg(long, default_value = consts::DEFAULT_SYSFS_GPIO_ROOT)]
    gpio_root: PathBuf,

    /// Line scan interval in milliseconds. A press and release shorter than
    /// one interval can be missed.
    #[arg(long, default_value_t = consts::DEFAULT_POLL_INTERVAL_MS)]
    poll_interval_ms: u64,

    /// Debounce by re-sampling after this many milliseconds instead of
    /// committing every changed sample
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Write state updates to stdout as JSON lines
    #[arg(long)]
    json: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn settings(&self) -> RuntimeSettings {
        RuntimeSettings {
            debounce: match self.settle_ms {
                Some(ms) => DebouncePolicy::Settle {
                    interval: Duration::from_millis(ms),
                },
                None => DebouncePolicy::EdgeCompare,
            },
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    // RUST_LOG wins over --log-level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(args: &Args) -> Result<()> {
    info!("Start chassis buttons service...");
    let settings = args.settings();
    info!("Debounce policy: {:?}", settings.debounce);

    let defs = GpioDefinitions::load(&args.config)
        .with_context(|| format!("cannot load GPIO definitions from {}", args.config.display()))?;

    let base = match sysfs::first_chip_base(&args.gpio_root) {
        Ok(Some(base)) => base,
        Ok(None) => 0,
        Err(e) => {
            warn!("Cannot read gpiochip base under {}: {}", args.gpio_root.display(), e);
            0
        }
    };

    let lines: Rc<RefCell<dyn LineSource>> = Rc::new(RefCell::new(SysfsLineSource::new(
        &args.gpio_root,
        settings.poll_interval,
    )));
    let sink: Rc<RefCell<dyn StateSink>> = if args.json {
        Rc::new(RefCell::new(JsonLinesSink::new(io::stdout())))
    } else {
        Rc::new(RefCell::new(LogSink))
    };
    let env = Env::new(lines.clone(), sink, settings.debounce);

    let registry = Registry::with_builtin();
    let mut service = ButtonService::build(
        &registry,
        &env,
        defs.button_configs(base),
        Reactor::new(lines),
    )
    .context("cannot attach controls to the event loop")?;

    if service.controls().is_empty() {
        warn!("No supported controls configured, nothing to watch");
        return Ok(());
    }
    service.run().context("event loop failed")?;
    Ok(())
}
