use studycrawl::db::types::TestKind;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let kind = match std::env::args().nth(1).as_deref() {
        Some("reading") => TestKind::Reading,
        Some("listening") => TestKind::Listening,
        _ => {
            eprintln!("usage: studycrawl <reading|listening>");
            std::process::exit(2);
        }
    };

    if let Err(err) = studycrawl::run_crawl(kind).await {
        eprintln!("studycrawl fatal: {err:#}");
        std::process::exit(1);
    }
    Ok(())
}
