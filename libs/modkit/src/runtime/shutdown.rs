use anyhow::Result;

/// Resolves on the first termination request: SIGTERM, SIGINT or Ctrl+C.
pub async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => tracing::debug!("shutdown: SIGTERM"),
            _ = sigint.recv() => tracing::debug!("shutdown: SIGINT"),
            _ = tokio::signal::ctrl_c() => tracing::debug!("shutdown: ctrl_c"),
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok(())
    }
}
