#[tokio::main(flavor = "current_thread")]
async fn main() -> std::io::Result<()> {
    chain_sync::run_with_config().await
}
