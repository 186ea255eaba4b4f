//! geoblock: pack GeoIP databases into an asset bundle and query them.

use clap::{Parser, Subcommand};
use geoblock::{
    assets, open_database, AssetBundle, AssetCompiler, Config, DatabaseChain, Guard, MaxMindEngine,
};
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "geoblock")]
#[command(version = "0.1.0")]
#[command(about = "Country based admission control with embedded GeoIP databases", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress database files into an asset bundle
    Pack {
        /// Database files to embed
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output bundle file
        #[arg(short, long, default_value = "assets.json")]
        output: PathBuf,
    },

    /// Resolve the country of IP addresses
    Lookup {
        /// Database paths (one per address family)
        #[arg(short, long = "database", required = true)]
        databases: Vec<PathBuf>,

        /// Asset bundle used when a database file is absent
        #[arg(short, long)]
        assets: Option<PathBuf>,

        /// Addresses to resolve
        #[arg(required = true)]
        ips: Vec<IpAddr>,
    },

    /// Evaluate IP addresses against a YAML configuration
    Check {
        /// Configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Addresses to evaluate
        #[arg(required = true)]
        ips: Vec<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Pack { inputs, output } => pack(&inputs, &output),
        Commands::Lookup {
            databases,
            assets,
            ips,
        } => lookup(&databases, assets, &ips),
        Commands::Check { config, ips } => check(&config, &ips),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn pack(inputs: &[PathBuf], output: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let mut compiler = AssetCompiler::new();
    for input in inputs {
        compiler.add_file(input)?;
    }

    let bundle = compiler.write(output)?;
    println!("Packed {} database(s) into {:?}", bundle.len(), output);
    Ok(())
}

fn lookup(
    databases: &[PathBuf],
    bundle: Option<PathBuf>,
    ips: &[IpAddr],
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = bundle {
        assets::install(AssetBundle::load(path)?)?;
    }

    let mut chain: DatabaseChain<MaxMindEngine> = DatabaseChain::new();
    for path in databases {
        let database = open_database::<MaxMindEngine>(path)?;
        println!("{}: {}", database.name(), database.origin());
        chain.add(database);
    }

    for ip in ips {
        match chain.country(*ip) {
            Ok(country) => println!("{}\t{}", ip, country),
            Err(e) => println!("{}\terror: {}", ip, e),
        }
    }
    Ok(())
}

fn check(config: &PathBuf, ips: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load(config)?;
    config.enabled = true;

    let guard: Guard = Guard::new("geoblock", config)?;
    let evaluator = guard
        .evaluator()
        .ok_or("evaluator not initialized")?;

    for ip in ips {
        match evaluator.evaluate(ip) {
            Ok(result) => println!(
                "{}\t{}\t{}",
                ip,
                if result.allowed { "ALLOW" } else { "BLOCK" },
                result.country.as_deref().unwrap_or("")
            ),
            Err(e) => println!("{}\tBLOCK\terror: {}", ip, e),
        }
    }
    Ok(())
}
