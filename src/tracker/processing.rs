use anyhow::Result;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info, warn};

use crate::{
    session::{SessionController, TickOutcome},
    storage::TaskStorage,
    utils::duration::TrackedDuration,
};

use super::events::TrackingEvent;

/// Something that consumes tracking events one at a time.
pub trait EventProcessor {
    fn process_next(&mut self, event: TrackingEvent) -> impl std::future::Future<Output = Result<()>>;

    fn finalize(&mut self) -> impl std::future::Future<Output = Result<()>>;
}

/// Receives events and hands them to a processor until every sender is gone.
pub struct ProcessingModule<Processor> {
    receiver: Receiver<TrackingEvent>,
    processor: Processor,
}

impl<P: EventProcessor> ProcessingModule<P> {
    pub fn new(receiver: Receiver<TrackingEvent>, processor: P) -> Self {
        Self {
            receiver,
            processor,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(event) = self.receiver.recv().await {
            debug!("Processing event {:?}", event);
            match self.processor.process_next(event.clone()).await {
                Ok(_) => {
                    debug!("Processed event {:?}", event)
                }
                Err(e) => {
                    error!("Error processing event {:?}: {e:?}", event)
                }
            }
        }

        let result = self.processor.finalize().await;
        self.receiver.close();
        result
    }
}

/// Applies events to the session and writes the tasks back after each of them.
pub struct SessionProcessor<S> {
    session: SessionController,
    storage: S,
    /// Idle period the user hasn't decided about yet.
    pending_idle: Option<TrackedDuration>,
}

impl<S: TaskStorage> SessionProcessor<S> {
    pub fn new(session: SessionController, storage: S) -> Self {
        Self {
            session,
            storage,
            pending_idle: None,
        }
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    async fn persist(&self) -> Result<()> {
        self.storage
            .save(self.session.collections(), self.session.current_id())
            .await?;
        Ok(())
    }
}

impl<S: TaskStorage> EventProcessor for SessionProcessor<S> {
    async fn process_next(&mut self, event: TrackingEvent) -> Result<()> {
        match event {
            TrackingEvent::Tick {
                time_spent,
                idle_time,
            } => match self.session.on_tick(time_spent, idle_time)? {
                TickOutcome::Tracked { .. } => (),
                // nothing changed, nothing to save
                TickOutcome::NoCurrentTask | TickOutcome::Dropped => return Ok(()),
            },
            TrackingEvent::Idle { idle_time } => {
                if self.session.on_idle(idle_time) {
                    self.pending_idle = Some(idle_time);
                }
                return Ok(());
            }
            TrackingEvent::IdleResolved(decision) => {
                let Some(idle_time) = self.pending_idle.take() else {
                    warn!("Got {decision:?} without an idle period");
                    return Ok(());
                };
                info!("Idle time of {idle_time} resolved as {decision:?}");
                self.session.resolve_idle(decision, idle_time)?;
            }
            TrackingEvent::BreakResponse(response) => {
                self.session.respond_to_reminder(response);
                return Ok(());
            }
        }

        self.persist().await
    }

    async fn finalize(&mut self) -> Result<()> {
        if self.pending_idle.take().is_some() {
            info!("Idle period left undecided, it is not tracked");
        }
        self.persist().await
    }
}
