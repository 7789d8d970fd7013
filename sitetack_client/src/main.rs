use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so rendered results stay clean on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting the Sitetack client");

    let cli = cli::Cli::parse();
    cli.execute()?;
    Ok(())
}
