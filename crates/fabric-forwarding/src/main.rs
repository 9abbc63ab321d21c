//! fabricctl - inspects the configuration and static tables of the fabric
//! forwarding application.
//!
//! The application itself runs inside the controller; this tool loads and
//! validates its configuration file and prints the fat-tree tables it
//! forwards with.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fabric_forwarding::config::DEFAULT_CONFIG_PATH;
use fabric_forwarding::topology::dpid::{switch_by_number, switch_label, FABRIC_SWITCHES};
use fabric_forwarding::{FabricConfig, FanOutTable, PodIndex};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{debug, info};

/// Fabric forwarding control tool
#[derive(Parser, Debug)]
#[command(name = "fabricctl")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Module option applied over the file (idletimeout=N, hardtimeout=N)
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE", value_parser = parse_option)]
    options: Vec<(String, String)>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Cmd {
    /// Load and validate the configuration file
    Validate,
    /// Print the effective configuration as TOML
    ShowConfig,
    /// Print the flood fan-out table
    FanOut {
        /// Only rows of this rack number (e.g. 101)
        #[arg(long)]
        switch: Option<u16>,
    },
    /// Print pod membership
    Pods,
    /// Print every fabric switch with its datapath id and placement
    Switches,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.json_logs);
    debug!(?args, "fabricctl starting");

    let config = load_config(&args)?;

    let output = run(&args.command, &config)?;
    println!("{}", output);
    Ok(())
}

fn parse_option(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

fn load_config(args: &Args) -> Result<FabricConfig> {
    let mut config = FabricConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if !args.options.is_empty() {
        config
            .forwarding
            .apply_module_options(args.options.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    Ok(config)
}

fn init_logging(level: &str, json: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr).json())
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr).compact())
            .init();
    }
}

fn run(command: &Cmd, config: &FabricConfig) -> Result<String> {
    match command {
        Cmd::Validate => {
            config.validate().context("configuration is invalid")?;
            info!("configuration is valid");
            Ok("ok".to_string())
        }
        Cmd::ShowConfig => toml::to_string_pretty(config).context("serializing configuration"),
        Cmd::FanOut { switch } => {
            let table = FanOutTable::fat_tree();
            let mut rows = table.entries();
            if let Some(number) = switch {
                let Some(dpid) = switch_by_number(*number) else {
                    bail!("no fabric switch numbered {}", number);
                };
                rows.retain(|row| row.switch == dpid);
            }
            Ok(serde_json::to_string_pretty(&rows)?)
        }
        Cmd::Pods => Ok(serde_json::to_string_pretty(&pods_json(&PodIndex::fat_tree()))?),
        Cmd::Switches => Ok(serde_json::to_string_pretty(&switches_json(
            &PodIndex::fat_tree(),
        ))?),
    }
}

fn pods_json(index: &PodIndex) -> Value {
    let pods: Vec<Value> = index
        .pod_numbers()
        .map(|pod| {
            let members: Vec<String> = index
                .members(pod)
                .unwrap_or_default()
                .iter()
                .map(|dpid| switch_label(*dpid))
                .collect();
            json!({ "pod": pod, "members": members })
        })
        .collect();
    let labels = |pool: &[fabric_types::Dpid]| -> Vec<String> {
        pool.iter().map(|dpid| switch_label(*dpid)).collect()
    };
    json!({
        "pods": pods,
        "tors": labels(index.tors()),
        "aggs": labels(index.aggs()),
    })
}

fn switches_json(index: &PodIndex) -> Value {
    FABRIC_SWITCHES
        .iter()
        .map(|(number, dpid)| {
            json!({
                "number": number,
                "dpid": dpid.to_string(),
                "name": switch_label(*dpid),
                "pod": index.pod_of(*dpid),
                "tier": index.tier_of(*dpid),
            })
        })
        .collect()
}
