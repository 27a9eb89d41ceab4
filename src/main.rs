use clap::Parser;

use hdfs_stage::cli;
use hdfs_stage::error::Result;

use hdfs_stage::cli::Args;
use hdfs_stage::config::load_stage_config;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    if let Err(e) = run_app(args).await {
        eprintln!("Error: {e}");
        std::process::exit(e.kind().exit_code());
    }
}

async fn run_app(args: Args) -> Result<()> {
    let config = load_stage_config()?;
    cli::run(args, config).await?;
    Ok(())
}
