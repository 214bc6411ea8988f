use tokio::select;
use tokio_util::sync::CancellationToken;

/// Cancels the tracker on ctrl-c. Stops waiting once the tracker got cancelled some other way.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => (),
    };
}
