//! Dump command

use super::build_client;
use crate::SourceArgs;
use anyhow::Result;
use restcfg_client::hooks::Hooks;

/// Print the merged API definitions as YAML, or JSON with `--format json`
pub async fn run(source: &SourceArgs, format: &str) -> Result<()> {
    let client = build_client(source, Hooks::new())?;
    let tree = client.api_config().await;

    if format == "json" {
        println!("{}", tree.to_pretty_string());
    } else {
        print!("{}", serde_yaml::to_string(tree)?);
    }

    Ok(())
}
