#[tokio::main]
async fn main() -> std::io::Result<()> {
    poker_client::run().await
}
