//! restcfg - call REST APIs declared in YAML
//!
//! Resolves logical API names against local or remote API documents and
//! either sends the request or prints what would be sent.

use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

use commands::{call, dump, endpoint};

/// Configuration-driven REST client
#[derive(Parser)]
#[command(name = "restcfg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    #[command(flatten)]
    source: SourceArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Where API documents come from
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Document names, merged in order
    #[arg(short, long, global = true, value_delimiter = ',', default_value = "RestClient")]
    pub names: Vec<String>,

    /// Directory holding `{name}.yml` documents
    #[arg(long, global = true, env = "RESTCFG_CFG_DIR")]
    pub cfg_dir: Option<PathBuf>,

    /// Environment designator selecting `{name}.{env}.yml` overrides
    #[arg(long = "env", global = true, env = "RESTCFG_ENV")]
    pub environment: Option<String>,

    /// Fetch documents from this URL instead of the local directory
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// URL of the common parameters document (with --base-url)
    #[arg(long, global = true, requires = "base_url")]
    pub common_param_url: Option<String>,

    /// Outbound proxy, installed process-wide
    #[arg(long, global = true, env = "RESTCFG_PROXY")]
    pub proxy: Option<String>,

    /// Common template parameter (repeatable)
    #[arg(short = 'c', long = "common", global = true, value_name = "KEY=VALUE")]
    pub common: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a request to a configured API
    Call {
        /// Dotted API name, e.g. example.ipify1
        api: String,

        /// Path template parameter (repeatable)
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Query string parameter (repeatable)
        #[arg(short = 'q', long = "query", value_name = "KEY=VALUE")]
        query: Vec<String>,

        /// JSON request body
        #[arg(short = 'd', long = "data", value_name = "JSON")]
        data: Option<String>,

        /// Request header (repeatable)
        #[arg(short = 'H', long = "header", value_name = "NAME:VALUE")]
        headers: Vec<String>,

        /// Treat HTTP error statuses as an empty result
        #[arg(long)]
        ignore_http_errors: bool,
    },

    /// Print the method and URL an API resolves to
    Endpoint {
        /// Dotted API name
        api: String,

        /// Path template parameter (repeatable)
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Query string parameter (repeatable)
        #[arg(short = 'q', long = "query", value_name = "KEY=VALUE")]
        query: Vec<String>,
    },

    /// Print the merged API definitions
    Dump,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("restcfg=debug,restcfg_client=debug,restcfg_core=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    // The proxy rewrites the process environment, so it goes in while this
    // is still the only thread.
    if cli.source.base_url.is_none() {
        if let Some(ref proxy) = cli.source.proxy {
            restcfg_client::apply_proxy(proxy);
        }
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{} failed to start async runtime: {}", "Error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(cli));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Call {
            api,
            params,
            query,
            data,
            headers,
            ignore_http_errors,
        } => {
            let request = call::CallRequest {
                api: &api,
                params: &params,
                query: &query,
                data: data.as_deref(),
                headers: &headers,
                ignore_http_errors,
            };
            call::run(&cli.source, &request, &cli.format).await
        }

        Commands::Endpoint { api, params, query } => {
            endpoint::run(&cli.source, &api, &params, &query, &cli.format).await
        }

        Commands::Dump => dump::run(&cli.source, &cli.format).await,
    }
}
