//! Endpoint command

use super::{build_client, optional, parse_pairs};
use crate::SourceArgs;
use anyhow::{Result, bail};
use owo_colors::OwoColorize;
use restcfg_client::hooks::Hooks;

/// Print the resolved method and URL without sending anything
pub async fn run(
    source: &SourceArgs,
    api: &str,
    params: &[String],
    query: &[String],
    format: &str,
) -> Result<()> {
    let client = build_client(source, Hooks::new())?;
    let path_param = optional(parse_pairs(params)?);
    let query = optional(parse_pairs(query)?);

    let Some(endpoint) = client
        .get_api_endpoint(api, path_param.as_ref(), query.as_ref())
        .await?
    else {
        bail!("`{api}` is not an endpoint definition");
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&endpoint)?);
    } else {
        println!("{} {}", endpoint.method.to_string().bold(), endpoint.end_point);
    }

    Ok(())
}
