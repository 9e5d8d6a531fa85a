use super::{client, ensure_valid, runtime};
use chirp_core::config::Config;
use chirp_core::scheduler::Scheduler;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub fn run(config: &Config, api_base_url: Option<&str>) -> anyhow::Result<()> {
    ensure_valid(config)?;
    let client = client(api_base_url)?;
    let enabled: Vec<&str> = config.enabled_actions().iter().map(|k| k.as_str()).collect();
    info!(actions = %enabled.join(","), "starting chirp");

    let rt = runtime()?;
    let reason = rt.block_on(async {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
                on_signal.cancel();
            }
        });

        Scheduler::new(&client, config, cancel).run().await
    })?;

    if reason.is_fatal() {
        anyhow::bail!("bot stopped: {reason}");
    }
    Ok(())
}
