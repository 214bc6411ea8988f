//! Long running tracking of the current task.
//!
//! Three parts run side by side: the [collector::TickCollector] turns passing time into events,
//! [input] forwards the user's answers and [processing::ProcessingModule] applies both to the
//! session, one event at a time.

use std::{path::Path, time::Duration};

use anyhow::Result;
use collector::TickCollector;
use events::TrackingEvent;
use idle::{IdleEvaluator, IdleSource, NoIdleSource};
use processing::{ProcessingModule, SessionProcessor};
use tokio::{io::AsyncBufRead, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    config::Config,
    ids::UuidIds,
    notify::ConsoleNotifier,
    session::SessionController,
    storage::{json_storage::JsonTaskStorage, TaskStorage},
    utils::{
        clock::{to_std_duration, Clock, DefaultClock},
        dir::TASKS_DIR,
    },
};

pub mod collector;
pub mod events;
pub mod idle;
pub mod input;
pub mod processing;
pub mod shutdown;

const MIN_COLLECTION_INTERVAL: Duration = Duration::from_millis(100);

/// Tracks time on the current task until ctrl-c or `quit`.
pub async fn start_tracker(dir: &Path, config: &Config) -> Result<()> {
    let storage = JsonTaskStorage::new(dir.join(TASKS_DIR))?;
    let (collections, current) = storage.load().await?;
    let session = SessionController::new(
        collections,
        current,
        config,
        Box::new(DefaultClock),
        Box::new(UuidIds),
        Box::new(ConsoleNotifier),
    );
    match session.get_current() {
        Some(task) => println!("Tracking {}", task.title),
        None => println!("No current task, nothing is tracked until one is started"),
    }
    println!("{}", input::INPUT_HELP);

    let shutdown_token = CancellationToken::new();
    let input = tokio::io::BufReader::new(tokio::io::stdin());

    let (_, result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        run_tracker(
            session,
            storage,
            NoIdleSource,
            input,
            config,
            DefaultClock,
            shutdown_token.clone(),
        ),
    );
    info!("Tracker stopped");
    result
}

/// Runs collection, input and processing until `shutdown_token` is cancelled. The tasks are saved
/// one last time on the way out.
pub async fn run_tracker(
    session: SessionController,
    storage: impl TaskStorage,
    idle_source: impl IdleSource + 'static,
    input: impl AsyncBufRead + Unpin,
    config: &Config,
    clock: impl Clock,
    shutdown_token: CancellationToken,
) -> Result<()> {
    let (sender, receiver) = mpsc::channel::<TrackingEvent>(10);

    let collector = create_collector(sender.clone(), idle_source, &shutdown_token, config, clock);
    let processor = ProcessingModule::new(receiver, SessionProcessor::new(session, storage));

    let (collection_result, input_result, processing_result) = tokio::join!(
        collector.run(),
        input::read_input(input, sender, shutdown_token.clone()),
        processor.run(),
    );

    if let Err(collection_result) = collection_result {
        error!("Collection module got an error {:?}", collection_result);
    }

    if let Err(input_result) = input_result {
        error!("Reading input got an error {:?}", input_result);
    }

    processing_result.inspect_err(|e| error!("Processing module got an error {e:?}"))
}

fn create_collector(
    sender: mpsc::Sender<TrackingEvent>,
    idle_source: impl IdleSource + 'static,
    shutdown_token: &CancellationToken,
    config: &Config,
    clock: impl Clock,
) -> TickCollector {
    TickCollector::new(
        sender,
        Box::new(idle_source),
        shutdown_token.clone(),
        IdleEvaluator::new(config.idle_threshold),
        to_std_duration(config.tracking_interval.as_chrono()).max(MIN_COLLECTION_INTERVAL),
        Box::new(clock),
    )
}
