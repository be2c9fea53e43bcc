use anyhow::Result;
use clap::Parser;
use shepherd_core::Supervisor;

mod config;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run(config::Cli::parse()).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run(cli: config::Cli) -> Result<()> {
    let services = shepherd_config::load_from_path(&cli.file)?;
    let supervisor = Supervisor::new(services, cli.verbose);
    supervisor.start().await?;
    Ok(())
}
