//! Random persons - mini-flux sample
//!
//! Loads a batch of generated persons through the store, applies a filter
//! and prints what is left. Every action and the state changes it caused
//! are logged by the `LoggerInterceptor`.
//!
//! # Usage
//!
//! ```sh
//! # Load 10 persons
//! cargo run -p persons-demo
//!
//! # Load 30, keep those named "lu*" and sort by name
//! cargo run -p persons-demo -- --count 30 --filter lu --sort name
//!
//! # Only persons within 1km of Madrid, as JSON
//! cargo run -p persons-demo -- --within-km 1 --json
//! ```

use std::io;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use mini_flux::debug::LoggerConfig;
use mini_flux::Store;
use persons_demo::{
    LatLon, LifecycleStage, LoadPersonsAction, OnLifecycleAction, OnTrimMemoryAction,
    PersonState, PersonsApp, PersonsFilter, SampleSource, UpdateFilterAction,
};
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SortBy {
    None,
    Name,
    Gender,
}

/// Random persons - mini-flux example
#[derive(Parser, Debug)]
#[command(name = "persons")]
#[command(about = "Load, filter and list random persons through a mini-flux store")]
struct Args {
    /// Number of persons to load
    #[arg(long, short, default_value = "10")]
    count: usize,

    /// Case-insensitive text matched against name, surname and email
    #[arg(long, short)]
    filter: Option<String>,

    /// Keep persons closer than this many kilometres to Madrid
    #[arg(long)]
    within_km: Option<f32>,

    /// Sort order of the printed list
    #[arg(long, value_enum, default_value = "none")]
    sort: SortBy,

    /// Seed for the generated persons
    #[arg(long, default_value = "24301")]
    seed: u64,

    /// Simulated source latency in milliseconds
    #[arg(long, default_value = "150")]
    latency_ms: u64,

    /// Make the person source fail
    #[arg(long)]
    fail: bool,

    /// Logger config as JSON (include/exclude patterns, diff, capacity)
    #[arg(long)]
    log_config: Option<String>,

    /// Print whole states instead of field diffs
    #[arg(long)]
    no_diff: bool,

    /// Print the persons as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logs
    #[arg(long, short)]
    verbose: bool,
}

impl Args {
    fn persons_filter(&self) -> PersonsFilter {
        let mut filter = PersonsFilter::new();
        if let Some(text) = &self.filter {
            filter = filter.with_text(text.clone());
        }
        if let Some(km) = self.within_km {
            filter = filter.within_km(km, LatLon::MADRID);
        }
        match self.sort {
            SortBy::Name => filter.sorted_by_name(),
            SortBy::Gender => filter.sorted_by_gender(),
            SortBy::None => filter,
        }
    }

    fn logger_config(&self) -> io::Result<LoggerConfig> {
        let config = match &self.log_config {
            Some(json) => LoggerConfig::from_json(json)?,
            None => LoggerConfig::default(),
        };
        Ok(if self.no_diff {
            config.with_diff(false)
        } else {
            config
        })
    }
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    let mut source = SampleSource::new(args.seed).with_latency(Duration::from_millis(args.latency_ms));
    if args.fail {
        source = source.failing();
    }

    let ui = mini_flux::UiContext::spawn("ui")?;
    let app = PersonsApp::new(ui, Arc::new(source), runtime.handle().clone())
        .with_logger(args.logger_config()?);
    app.start();

    let dispatcher = app.dispatcher();
    dispatcher.dispatch_on_ui_sync(OnLifecycleAction {
        stage: LifecycleStage::Created,
    });
    dispatcher.dispatch_on_ui_sync(OnLifecycleAction {
        stage: LifecycleStage::Started,
    });
    dispatcher.dispatch_on_ui_sync(LoadPersonsAction { count: args.count });

    let loaded = runtime.block_on(wait_for_load(app.store().observe_state()));
    let Some(loaded) = loaded else {
        eprintln!("Error: persons did not load in time");
        app.shutdown();
        std::process::exit(1);
    };
    if let Some(error) = &loaded.load_persons_task.error {
        eprintln!("Error: could not load persons: {error}");
        app.shutdown();
        std::process::exit(1);
    }

    dispatcher.dispatch_on_ui_sync(UpdateFilterAction {
        filter: args.persons_filter(),
    });

    let state = app.store().state();
    let visible = state.visible_persons();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&visible)?);
    } else {
        let total = state.persons.as_ref().map(Vec::len).unwrap_or(0);
        println!("{} of {} persons", visible.len(), total);
        for person in &visible {
            println!(
                "  {:<22} {:<32} {:?} {:>6.2}km",
                person.full_name(),
                person.email,
                person.gender,
                person.location.lat_lon.distance_to(&LatLon::MADRID)
            );
        }
    }

    if let Some(logger) = app.logger() {
        tracing::debug!(actions = logger.action_count(), "actions logged");
    }

    dispatcher.dispatch_on_ui_sync(OnTrimMemoryAction { level: 80 });
    dispatcher.dispatch_on_ui_sync(OnLifecycleAction {
        stage: LifecycleStage::Destroyed,
    });
    app.shutdown();
    Ok(())
}

/// First state whose load task reached a terminal status
async fn wait_for_load(
    states: impl tokio_stream::Stream<Item = Arc<PersonState>> + Send,
) -> Option<Arc<PersonState>> {
    let states = std::pin::pin!(states);
    let mut states = states.filter(|state| state.load_persons_task.is_terminal());
    tokio::time::timeout(Duration::from_secs(10), states.next())
        .await
        .ok()
        .flatten()
}
