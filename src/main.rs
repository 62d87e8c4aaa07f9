use anyhow::{Context, Result};
use clap::Parser;
use engine::SnapshotHolder;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
struct Args {
    /// Transactions CSV to load.
    #[arg(long, default_value = "transactions.csv")]
    path: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let store = engine::load_columnar(&args.path)?;
    let data = engine::aggregate(&store);
    drop(store);

    let holder = SnapshotHolder::new();
    holder.set(data);
    info!("snapshot published");

    let snapshot = holder.get().context("snapshot missing after publish")?;
    println!("{}", serde_json::to_string_pretty(snapshot.as_ref())?);
    Ok(())
}
