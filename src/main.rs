#[tokio::main]
async fn main() -> anyhow::Result<()> {
    quizcore::run_worker().await
}
