//! mst-daemon entry point. The boot sequence lives in `boot.rs` so the
//! `mst` CLI can drive the same code path.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mst_daemon::run().await
}
