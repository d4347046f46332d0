//! Call command

use super::{build_client, optional, parse_headers, parse_pairs};
use crate::SourceArgs;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use restcfg_client::hooks::Hooks;
use restcfg_core::HeaderPayload;
use serde_json::Value;

/// Arguments of one `call` invocation
pub struct CallRequest<'a> {
    pub api: &'a str,
    pub params: &'a [String],
    pub query: &'a [String],
    pub data: Option<&'a str>,
    pub headers: &'a [String],
    pub ignore_http_errors: bool,
}

/// Send the request and print the response body
pub async fn run(source: &SourceArgs, request: &CallRequest<'_>, format: &str) -> Result<()> {
    let hooks = if request.ignore_http_errors {
        Hooks::new().on_response_error(|_| false)
    } else {
        Hooks::new()
    };
    let client = build_client(source, hooks)?;

    let path_param = optional(parse_pairs(request.params)?);
    let query = optional(parse_pairs(request.query)?);
    let body = request
        .data
        .map(|raw| serde_json::from_str::<Value>(raw).context("--data is not valid JSON"))
        .transpose()?;
    let headers = parse_headers(request.headers)?;
    let headers = (!headers.is_empty()).then_some(HeaderPayload::Flat(headers));

    let response = client
        .call(request.api, path_param.as_ref(), query.as_ref(), body, headers)
        .await?;

    match (response, format) {
        (Some(value), "json") => println!("{}", serde_json::to_string_pretty(&value)?),
        (None, "json") => println!("null"),
        (Some(Value::String(text)), _) => println!("{text}"),
        (Some(value), _) => println!("{}", serde_json::to_string_pretty(&value)?),
        (None, _) => eprintln!("{}", "No content (HTTP error ignored)".dimmed()),
    }

    Ok(())
}
