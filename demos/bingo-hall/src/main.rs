use bingo::prelude::*;

#[tokio::main]
async fn main() -> Result<(), BingoError> {
    bingo::telemetry::init_tracing("info");

    let config = ServerConfig::from_env();
    let server = BingoServerBuilder::with_config(config).build().await?;

    tracing::info!(addr = %server.local_addr()?, "Bingo Hall listening");
    server.run().await
}
