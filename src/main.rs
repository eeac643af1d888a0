#[tokio::main]
async fn main() -> anyhow::Result<()> {
    campus_auth::cli::run_cli().await
}
