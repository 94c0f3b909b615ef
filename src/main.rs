// src/main.rs

use ci_auto::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("ci-auto error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(
        args.log_level,
        args.log_dir.as_deref(),
        args.command.log_file_prefix(),
    )?;
    run(args).await
}
