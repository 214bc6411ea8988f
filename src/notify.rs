use tracing::info;

/// A fire-and-forget notification shown outside of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub sound: bool,
    /// Keep the notification around until the user dismisses it.
    pub wait: bool,
}

#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send {
    fn notify(&mut self, notification: Notification);
}

/// Prints notifications to the terminal the tracker runs in.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, notification: Notification) {
        info!(title = %notification.title, "{}", notification.message);
        let bell = if notification.sound { "\x07" } else { "" };
        println!(
            "{bell}{}: {}",
            ansi_term::Style::new().bold().paint(&notification.title),
            notification.message
        );
    }
}
