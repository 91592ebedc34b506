use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use pp_app::{
    AppResult, PlantOptions, dump_json, format_status, list_profiles, parse_address,
    parse_value, profile_service, read_status, register_dump, resolve_profile, status_json,
};
use pp_modbus::{DEFAULT_PORT, RegisterClient, ServerConfig};
use pp_sim::RunConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pp-world")]
#[command(about = "Power plant world - steam plant emulator behind a Modbus/TCP server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Target {
    /// Plant address to connect to
    #[arg(short = 't', long = "target")]
    host: String,
    /// Modbus/TCP port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the plant and serve its registers until Ctrl-C
    Serve {
        /// Address to bind the server to
        #[arg(short = 't', long = "target")]
        bind: String,
        /// Modbus/TCP port
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Simulation ticks per second
        #[arg(long, default_value_t = 60.0)]
        tick_hz: f64,
        /// Built-in profile name (see `profiles`)
        #[arg(long)]
        profile: Option<String>,
        /// Profile YAML file; overrides --profile
        #[arg(long)]
        profile_file: Option<PathBuf>,
    },
    /// Read a block of holding registers
    Read {
        #[command(flatten)]
        target: Target,
        /// First register address
        #[arg(long, default_value_t = 1)]
        start: u16,
        /// Number of registers
        #[arg(long, default_value_t = 24)]
        count: u16,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write one holding register
    Write {
        #[command(flatten)]
        target: Target,
        /// Register address: decimal, 0x hex, or a name like fuel_valve
        address: String,
        /// Value to write (decimal or 0x hex)
        value: String,
    },
    /// Show the decoded plant status
    Status {
        #[command(flatten)]
        target: Target,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the device identification objects
    Identify {
        #[command(flatten)]
        target: Target,
    },
    /// List built-in plant profiles
    Profiles {
        /// Print one profile as YAML
        #[arg(long)]
        show: Option<String>,
        /// Write the shown profile to a file instead of stdout
        #[arg(short, long, requires = "show")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            port,
            tick_hz,
            profile,
            profile_file,
        } => {
            cmd_serve(
                bind,
                port,
                tick_hz,
                profile.as_deref(),
                profile_file.as_deref(),
            )
            .await
        }
        Commands::Read {
            target,
            start,
            count,
            json,
        } => cmd_read(&target, start, count, json).await,
        Commands::Write {
            target,
            address,
            value,
        } => cmd_write(&target, &address, &value).await,
        Commands::Status { target, json } => cmd_status(&target, json).await,
        Commands::Identify { target } => cmd_identify(&target).await,
        Commands::Profiles { show, output } => cmd_profiles(show.as_deref(), output.as_deref()),
    }
}

async fn connect(target: &Target) -> AppResult<RegisterClient> {
    Ok(RegisterClient::connect((target.host.as_str(), target.port)).await?)
}

async fn cmd_serve(
    bind: String,
    port: u16,
    tick_hz: f64,
    profile: Option<&str>,
    profile_file: Option<&Path>,
) -> AppResult<()> {
    let opts = PlantOptions {
        server: ServerConfig::new(bind).with_port(port),
        run: RunConfig::default().with_tick_hz(tick_hz),
        profile: resolve_profile(profile, profile_file)?,
    };
    println!(
        "Serving profile '{}' on {} at {} Hz (Ctrl-C to stop)",
        opts.profile.name,
        opts.server.listen_addr(),
        tick_hz
    );

    let report = pp_app::run_until_ctrl_c(opts).await?;
    println!(
        "✓ Stopped after {} ticks ({} overruns, slowest tick {:.3} ms)",
        report.ticks,
        report.overruns,
        report.max_tick_seconds * 1e3
    );
    Ok(())
}

async fn cmd_read(target: &Target, start: u16, count: u16, json: bool) -> AppResult<()> {
    let mut client = connect(target).await?;
    let values = client.read_holding(start, count).await?;
    let entries = register_dump(start, &values);

    if json {
        println!("{}", dump_json(&entries)?);
    } else {
        for entry in entries {
            println!(
                "  0x{:02x}  {:<24} {}",
                entry.address,
                entry.name.unwrap_or("-"),
                entry.value
            );
        }
    }
    Ok(())
}

async fn cmd_write(target: &Target, address: &str, value: &str) -> AppResult<()> {
    let address = parse_address(address)?;
    let value = parse_value(value)?;
    let mut client = connect(target).await?;
    client.write_single(address, value).await?;
    println!("✓ Wrote {} to 0x{:02x}", value, address);
    Ok(())
}

async fn cmd_status(target: &Target, json: bool) -> AppResult<()> {
    let mut client = connect(target).await?;
    let status = read_status(&mut client).await?;
    if json {
        println!("{}", status_json(&status)?);
    } else {
        println!("{}", format_status(&status));
    }
    Ok(())
}

async fn cmd_identify(target: &Target) -> AppResult<()> {
    let mut client = connect(target).await?;
    let id = client.read_device_id().await?;
    println!("  Vendor:        {}", id.vendor_name);
    println!("  Product code:  {}", id.product_code);
    println!("  Revision:      {}", id.revision);
    println!("  Vendor URL:    {}", id.vendor_url);
    println!("  Product name:  {}", id.product_name);
    println!("  Model name:    {}", id.model_name);
    Ok(())
}

fn cmd_profiles(show: Option<&str>, output: Option<&Path>) -> AppResult<()> {
    let Some(name) = show else {
        println!("Built-in profiles:");
        for p in list_profiles() {
            println!(
                "  {:<10} {} ({} heating, {} water steps, {} fuel steps)",
                p.name, p.description, p.heating, p.water_steps, p.fuel_steps
            );
        }
        return Ok(());
    };

    let profile = profile_service::builtin_profile(name)?;
    match output {
        Some(path) => {
            profile_service::save_profile(path, &profile)?;
            println!("✓ Wrote profile '{}' to {}", name, path.display());
        }
        None => print!("{}", profile_service::profile_yaml(&profile)?),
    }
    Ok(())
}
