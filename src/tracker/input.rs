use anyhow::Result;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::session::breaks::{BreakResponse, IdleDecision};

use super::events::TrackingEvent;

pub const INPUT_HELP: &str =
    "Answers: work | break (idle time), took (took a break) | dismiss (break reminder), quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerInput {
    Event(TrackingEvent),
    Quit,
}

/// Parses one line typed by the user. Unknown input gives `None`.
pub fn parse_input(line: &str) -> Option<TrackerInput> {
    let event = match line.trim().to_lowercase().as_str() {
        "w" | "work" => TrackingEvent::IdleResolved(IdleDecision::CountAsWork),
        "b" | "break" => TrackingEvent::IdleResolved(IdleDecision::DiscardAsBreak),
        "t" | "took" => TrackingEvent::BreakResponse(BreakResponse::AlreadyTookBreak),
        "d" | "dismiss" => TrackingEvent::BreakResponse(BreakResponse::Dismissed),
        "q" | "quit" => return Some(TrackerInput::Quit),
        _ => return None,
    };
    Some(TrackerInput::Event(event))
}

/// Forwards the user's answers to the processing module. Closed input only stops the reading,
/// tracking carries on.
pub async fn read_input(
    reader: impl AsyncBufRead + Unpin,
    next: mpsc::Sender<TrackingEvent>,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut lines = reader.lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            debug!("Input closed");
            return Ok(());
        };

        match parse_input(&line) {
            Some(TrackerInput::Event(event)) => next.send(event).await?,
            Some(TrackerInput::Quit) => {
                shutdown.cancel();
                return Ok(());
            }
            None if line.trim().is_empty() => (),
            None => {
                warn!("Unknown input {line:?}");
                println!("{INPUT_HELP}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::{
        session::breaks::{BreakResponse, IdleDecision},
        tracker::events::TrackingEvent,
    };

    use super::{parse_input, read_input, TrackerInput};

    #[test]
    fn test_parse_input() {
        assert_eq!(
            parse_input(" Work\n"),
            Some(TrackerInput::Event(TrackingEvent::IdleResolved(
                IdleDecision::CountAsWork
            )))
        );
        assert_eq!(
            parse_input("took"),
            Some(TrackerInput::Event(TrackingEvent::BreakResponse(
                BreakResponse::AlreadyTookBreak
            )))
        );
        assert_eq!(parse_input("q"), Some(TrackerInput::Quit));
        assert_eq!(parse_input("lunch"), None);
    }

    #[tokio::test]
    async fn test_quit_cancels() -> Result<()> {
        let (sender, mut receiver) = mpsc::channel(10);
        let shutdown = CancellationToken::new();

        read_input(&b"break\nnonsense\n\nquit\ndismiss\n"[..], sender, shutdown.clone()).await?;

        assert!(shutdown.is_cancelled());
        assert_eq!(
            receiver.recv().await,
            Some(TrackingEvent::IdleResolved(IdleDecision::DiscardAsBreak))
        );
        // everything after quit is ignored and the sender is gone
        assert_eq!(receiver.recv().await, None);
        Ok(())
    }
}
