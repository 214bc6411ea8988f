use anyhow::Result;

/// Tracking is single threaded and cooperative. Every event runs to completion before the next
/// one is looked at, so there is no reason to spread it over several workers.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
