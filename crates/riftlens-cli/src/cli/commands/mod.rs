use super::args::*;

pub mod analyze;
pub mod guard;
pub mod score;

use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Score(args) => score::run(args),
        Command::Analyze(args) => analyze::run(args).await,
        Command::Guard(args) => guard::run(args),
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
