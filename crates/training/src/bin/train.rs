use clap::Parser;
use training::util::{run_train, TrainArgs};

fn main() -> anyhow::Result<()> {
    cli_support::init_tracing();
    let args = TrainArgs::parse();
    let artifacts = run_train(args)?;
    tracing::info!(
        "saved {}, {} and {}",
        artifacts.weights.display(),
        artifacts.plot.display(),
        artifacts.losses.display()
    );
    Ok(())
}
