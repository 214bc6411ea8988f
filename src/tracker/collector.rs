use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::utils::{clock::Clock, duration::TrackedDuration};

use super::{
    events::TrackingEvent,
    idle::{IdleEvaluator, IdleSource},
};

/// Turns the passing of time into [TrackingEvent]s. Time while the user is idle isn't ticked,
/// instead a single [TrackingEvent::Idle] covering the whole period is sent when they come back.
pub struct TickCollector {
    next: mpsc::Sender<TrackingEvent>,
    idle_source: Box<dyn IdleSource>,
    shutdown: CancellationToken,
    idle_evaluator: IdleEvaluator,
    collection_frequency: Duration,
    time_provider: Box<dyn Clock>,
    /// Longest idle time seen during the current idle period.
    idle_period: Option<TrackedDuration>,
}

impl TickCollector {
    pub fn new(
        next: mpsc::Sender<TrackingEvent>,
        idle_source: Box<dyn IdleSource>,
        shutdown: CancellationToken,
        idle_evaluator: IdleEvaluator,
        collection_frequency: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            next,
            idle_source,
            shutdown,
            idle_evaluator,
            collection_frequency,
            time_provider,
            idle_period: None,
        }
    }

    fn collect(&mut self, time_spent: TrackedDuration) -> Result<Option<TrackingEvent>> {
        let idle_time = self.idle_source.get_idle_time()?;

        if self.idle_evaluator.is_idle(idle_time) {
            self.idle_period = Some(self.idle_period.map_or(idle_time, |v| v.max(idle_time)));
            return Ok(None);
        }

        // the interval the user came back in belongs to the idle period
        if let Some(idle_period) = self.idle_period.take() {
            return Ok(Some(TrackingEvent::Idle {
                idle_time: idle_period + time_spent,
            }));
        }

        Ok(Some(TrackingEvent::Tick {
            time_spent,
            idle_time,
        }))
    }

    /// Executes the collector event loop.
    pub async fn run(mut self) -> Result<()> {
        let mut collection_point = self.time_provider.instant();
        let mut last_collection = self.time_provider.instant();
        loop {
            collection_point += self.collection_frequency;

            tokio::select! {
                // Cancelation means we stop execution of the event loop. Which means we also drop
                // the sender channel and consequently stop processing module.
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(collection_point) => ()
            }

            let now = self.time_provider.instant();
            let elapsed = TrackedDuration::from_millis((now - last_collection).as_millis() as u64);
            last_collection = now;

            match self.collect(elapsed) {
                Ok(Some(event)) => {
                    debug!("Sending event {:?}", event);
                    self.next
                        .send(event)
                        .await
                        .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
                }
                Ok(None) => {
                    debug!("User is idle, not tracking")
                }
                Err(e) => {
                    error!("Encountered an error during collection {:?}", e)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::{
        tracker::{
            events::TrackingEvent,
            idle::{IdleEvaluator, MockIdleSource},
        },
        utils::{clock::DefaultClock, duration::TrackedDuration},
    };

    use super::TickCollector;

    #[tokio::test(start_paused = true)]
    async fn test_idle_period_becomes_single_event() -> Result<()> {
        let readings = [0u64, 1000, 200_000, 260_000, 500, 0];
        let mut readings = readings.into_iter();
        let mut idle_source = MockIdleSource::new();
        idle_source
            .expect_get_idle_time()
            .returning(move || Ok(TrackedDuration::from_millis(readings.next().unwrap_or(0))));

        let (sender, mut receiver) = mpsc::channel(10);
        let shutdown = CancellationToken::new();
        let collector = TickCollector::new(
            sender,
            Box::new(idle_source),
            shutdown.clone(),
            IdleEvaluator::new(TrackedDuration::from_minutes(2)),
            Duration::from_secs(1),
            Box::new(DefaultClock),
        );

        let (result, events) = tokio::join!(collector.run(), async {
            let mut events = vec![];
            for _ in 0..5 {
                events.push(receiver.recv().await.unwrap());
            }
            shutdown.cancel();
            events
        });
        result?;

        let second = TrackedDuration::from_secs(1);
        assert_eq!(
            events,
            vec![
                TrackingEvent::Tick { time_spent: second, idle_time: TrackedDuration::ZERO },
                TrackingEvent::Tick { time_spent: second, idle_time: TrackedDuration::from_millis(1000) },
                TrackingEvent::Idle { idle_time: TrackedDuration::from_millis(261_000) },
                TrackingEvent::Tick { time_spent: second, idle_time: TrackedDuration::ZERO },
                TrackingEvent::Tick { time_spent: second, idle_time: TrackedDuration::ZERO },
            ]
        );
        Ok(())
    }
}
