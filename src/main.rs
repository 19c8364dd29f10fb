#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = exam_studio_api::run().await {
        eprintln!("exam-studio-api fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
