//! pneuma CLI
//!
//! Entry point for the `pneuma` command-line tool.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use pneuma::report::{render_device, DeviceSummary, OutputFormat};
use pneuma::{DefaultsOverride, FileInventory, Inventory, LoadedInventory, Metadata};
use pneuma_inventory::parse_timeout;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pneuma")]
#[command(about = "Network device inventory with group inheritance", version)]
struct Cli {
    /// Path to inventory file (.yml, .yaml or .toml)
    #[arg(long, short = 'i', global = true, default_value = "inventory.yml")]
    inventory: PathBuf,

    /// Port for devices that have none after group folding
    #[arg(long, global = true)]
    default_port: Option<u16>,

    /// Timeout for devices that have none after group folding (e.g. 10, 30s, 500ms)
    #[arg(long, global = true, value_parser = parse_timeout)]
    default_timeout: Option<Duration>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and resolve the inventory, reporting any error
    Validate {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List devices, optionally filtered
    List {
        /// Regular expression matched against device names
        #[arg(long, short = 'n')]
        name: Option<String>,

        /// Effective platform, e.g. arista_eos
        #[arg(long, short = 'p')]
        platform: Option<String>,

        /// Required labels (comma-separated key=value pairs)
        #[arg(long, short = 'l', value_delimiter = ',', value_parser = parse_label)]
        label: Vec<(String, String)>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show a device's effective configuration
    Show {
        /// Device name
        device: String,

        /// Output format
        #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,

        /// Print passwords and other secrets instead of redacting them
        #[arg(long)]
        show_secrets: bool,
    },
}

fn parse_label(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let loaded = load_inventory(&cli);

    match cli.command {
        Commands::Validate { json } => run_validate(&loaded, json),
        Commands::List {
            name,
            platform,
            label,
            json,
        } => run_list(&loaded.inventory, name, platform, label, json),
        Commands::Show {
            device,
            format,
            show_secrets,
        } => run_show(&loaded.inventory, &device, format, show_secrets),
    }
}

fn load_inventory(cli: &Cli) -> LoadedInventory {
    let overrides = DefaultsOverride {
        port: cli.default_port,
        timeout: cli.default_timeout,
    };

    match FileInventory::new(&cli.inventory)
        .with_overrides(overrides)
        .load_with_provenance()
    {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading inventory: {}", e);
            process::exit(1);
        }
    }
}

fn run_validate(loaded: &LoadedInventory, json_output: bool) {
    let inventory = &loaded.inventory;
    let unknown_platforms: Vec<&str> = inventory
        .devices
        .values()
        .filter(|d| !d.platform().is_empty() && !pneuma::platform::is_known(d.platform()))
        .map(|d| d.name.as_str())
        .collect();
    let missing_hostnames: Vec<&str> = inventory
        .devices
        .values()
        .filter(|d| d.connection().hostname.is_empty())
        .map(|d| d.name.as_str())
        .collect();

    if json_output {
        let output = serde_json::json!({
            "source": loaded.source,
            "defaults": loaded.defaults,
            "devices": inventory.len(),
            "groups": inventory.groups.len(),
            "unknown_platforms": unknown_platforms,
            "missing_hostnames": missing_hostnames,
        });
        print_json(&output);
        return;
    }

    println!("Inventory valid: {}", loaded.source.path);
    println!();
    println!("  Format: {}", loaded.source.format);
    println!("  SHA-256: {}", loaded.source.digest);
    println!("  Devices: {}", inventory.len());
    println!("  Groups: {}", inventory.groups.len());
    println!(
        "  Defaults: port {}, timeout {}",
        loaded.defaults.port,
        pneuma_inventory::format_timeout(loaded.defaults.timeout)
    );
    if !unknown_platforms.is_empty() {
        println!("  Unknown platform: {}", unknown_platforms.join(", "));
    }
    if !missing_hostnames.is_empty() {
        println!("  No hostname: {}", missing_hostnames.join(", "));
    }
}

fn run_list(
    inventory: &Inventory,
    name: Option<String>,
    platform: Option<String>,
    labels: Vec<(String, String)>,
    json_output: bool,
) {
    let filtered = match select(inventory, name.as_deref(), platform, labels) {
        Ok(filtered) => filtered,
        Err(e) => {
            eprintln!("Error filtering inventory: {}", e);
            process::exit(1);
        }
    };

    let summaries: Vec<DeviceSummary> = filtered
        .devices
        .values()
        .map(DeviceSummary::from_device)
        .collect();

    if json_output {
        print_json(&summaries);
        return;
    }

    if summaries.is_empty() {
        if filtered.len() == inventory.len() {
            println!("No devices configured.");
        } else {
            println!("No devices found matching the specified filters.");
        }
        return;
    }

    println!("Devices ({} of {}):\n", summaries.len(), inventory.len());
    for summary in summaries {
        let platform = if summary.platform.is_empty() {
            "no platform"
        } else {
            summary.platform.as_str()
        };
        println!("  {} ({})", summary.name, platform);
        if summary.username.is_empty() {
            println!("    Address: {}", summary.address);
        } else {
            println!("    Address: {}@{}", summary.username, summary.address);
        }
        println!("    Timeout: {}", summary.timeout);
        if !summary.groups.is_empty() {
            println!("    Groups: {}", summary.groups.join(", "));
        }
        println!();
    }
}

fn select(
    inventory: &Inventory,
    name: Option<&str>,
    platform: Option<String>,
    labels: Vec<(String, String)>,
) -> Result<Inventory, pneuma::FilterError> {
    let criteria = labels
        .into_iter()
        .fold(Metadata::default(), |m, (k, v)| m.with_label(k, v))
        .with_platform(platform.unwrap_or_default());

    let filtered = inventory.filter_metadata(&criteria)?;
    match name {
        Some(pattern) => filtered.filter_name(pattern),
        None => Ok(filtered),
    }
}

fn run_show(inventory: &Inventory, name: &str, format: OutputFormat, show_secrets: bool) {
    let device = match inventory.get(name) {
        Some(device) => device,
        None => {
            eprintln!("Device '{}' not found in inventory", name);
            process::exit(1);
        }
    };

    match render_device(device, format, show_secrets) {
        Ok(output) => print!("{}", ensure_newline(output)),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn ensure_newline(mut output: String) -> String {
    if !output.ends_with('\n') {
        output.push('\n');
    }
    output
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}
