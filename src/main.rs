#[tokio::main]
async fn main() -> anyhow::Result<()> {
    market_analyzer::run().await?;
    Ok(())
}
