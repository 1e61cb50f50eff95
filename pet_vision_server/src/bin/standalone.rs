use pet_vision_server::{HubHandle, ServerConfig, init_tracing, start_server};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let cfg = ServerConfig::from_env();
    info!(history_capacity = cfg.history_capacity, "starting activity hub");
    let (hub, _actor) = HubHandle::spawn(cfg.history_capacity, cfg.listener_capacity);

    let handle = start_server(hub, cfg).await?;
    // Park until the server task ends
    handle.await.ok();
    Ok(())
}
