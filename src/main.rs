use anyhow::Result;
use tracing::error;
use worktally::{cli::run_cli, utils::runtime::single_thread_runtime};

fn main() -> Result<()> {
    let runtime = single_thread_runtime()?;
    let result = runtime.block_on(run_cli());
    // A pending read of stdin would keep the process alive otherwise.
    runtime.shutdown_background();

    result.inspect_err(|e| {
        error!("Error running cli {e:?}");
    })
}
