// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bondrucker: Bluetooth receipt printer manager
//
// Entry point. Initialises logging, loads the manager settings, and runs one
// command against the host's Bluetooth bridge.

mod data_dir;
mod demo;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use bondrucker_bridge::BluetoothAdapter;
use bondrucker_core::config::{load_config, save_config};
use bondrucker_core::human_errors::humanize_error;
use bondrucker_core::repository::NoOrders;
use bondrucker_core::ManagerConfig;
use bondrucker_core::types::{PaperWidth, PrinterConfig};
use bondrucker_layout::{ContentSanitizer, OrderTemplate};
use bondrucker_print::ReceiptPrinter;
use clap::{Parser, Subcommand};

/// Bondrucker - Bluetooth receipt printer manager
#[derive(Parser, Debug)]
#[command(name = "bondrucker")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to the data directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List paired and nearby printers
    Scan,

    /// Print the test page
    TestPrint {
        /// Printer Bluetooth address
        #[arg(long)]
        address: String,

        /// Paper width in millimetres (57, 58 or 80)
        #[arg(long, default_value = "57", value_parser = parse_paper)]
        paper: PaperWidth,
    },

    /// Connect and run link diagnostics
    Diagnose {
        /// Printer Bluetooth address
        #[arg(long)]
        address: String,

        /// Paper width in millimetres (57, 58 or 80)
        #[arg(long, default_value = "57", value_parser = parse_paper)]
        paper: PaperWidth,
    },

    /// Render a sample receipt to stdout
    Preview {
        /// Paper width in millimetres (57, 58 or 80)
        #[arg(long, default_value = "80", value_parser = parse_paper)]
        paper: PaperWidth,

        /// Render the printer test page instead of an order
        #[arg(long)]
        test_page: bool,
    },

    /// Write the current settings (defaults when none exist) to the settings file
    InitConfig,
}

fn parse_paper(value: &str) -> Result<PaperWidth, String> {
    let mm: u32 = value
        .trim_end_matches("mm")
        .parse()
        .map_err(|_| format!("'{value}' is not a width in millimetres"))?;
    PaperWidth::from_millimetres(mm).ok_or_else(|| format!("unsupported paper width {mm}mm (use 57 or 80)"))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(data_dir::default_config_path);
    let config = load_config(&config_path);
    tracing::debug!(path = %config_path.display(), "settings loaded");

    let ok = match cli.command {
        Commands::Scan => scan(config).await,
        Commands::TestPrint { address, paper } => test_print(config, &address, paper).await,
        Commands::Diagnose { address, paper } => diagnose(config, &address, paper).await,
        Commands::Preview { paper, test_page } => preview(&config, paper, test_page),
        Commands::InitConfig => match save_config(&config_path, &config) {
            Ok(()) => {
                println!("Settings written to {}", config_path.display());
                true
            }
            Err(e) => {
                let human = humanize_error(&e);
                eprintln!("{}\n{}", human.message, human.suggestion);
                false
            }
        },
    };

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn manager(config: ManagerConfig) -> Arc<ReceiptPrinter> {
    let adapter: Arc<dyn BluetoothAdapter> = Arc::from(bondrucker_bridge::platform_bridge());
    ReceiptPrinter::new(adapter, Arc::new(NoOrders), None, config)
}

/// Printer settings for an address given on the command line. A saved
/// default printer with the same address keeps its template toggles.
fn printer_for(config: &ManagerConfig, address: &str, paper: PaperWidth) -> PrinterConfig {
    match &config.default_printer {
        Some(saved) if saved.address.eq_ignore_ascii_case(address) => saved.clone(),
        _ => PrinterConfig::bluetooth("", address, paper),
    }
}

async fn scan(config: ManagerConfig) -> bool {
    let manager = manager(config);
    let devices = manager.scan_printers().await;
    if devices.is_empty() {
        println!("No printers found. Check that Bluetooth is on and the printer is paired.");
        return true;
    }
    for device in &devices {
        let paired = if device.paired { "paired" } else { "nearby" };
        println!("{:<24} {}  {:<6}  {:?}", device.name, device.address, paired, device.status);
    }
    manager.scanner().stop_discovery().await;
    true
}

async fn test_print(config: ManagerConfig, address: &str, paper: PaperWidth) -> bool {
    let printer = printer_for(&config, address, paper);
    let manager = manager(config);
    if manager.print_test(&printer).await {
        println!("Test page sent to {}", printer.display_name());
        true
    } else {
        eprintln!(
            "Could not print on {} (status: {:?}). Run `bondrucker diagnose --address {address}` for details.",
            printer.display_name(),
            manager.status(&printer.address)
        );
        false
    }
}

async fn diagnose(config: ManagerConfig, address: &str, paper: PaperWidth) -> bool {
    let printer = printer_for(&config, address, paper);
    let manager = manager(config);
    let connected = manager.connect(&printer).await;
    println!("{}", manager.run_diagnostics(&printer).await);
    manager.disconnect(&printer).await;
    connected
}

fn preview(config: &ManagerConfig, paper: PaperWidth, test_page: bool) -> bool {
    let printer = PrinterConfig::bluetooth("Preview", "00:00:00:00:00:00", paper);
    let template = OrderTemplate::new(config.store.clone());
    let markup = if test_page {
        template.render_test_page(&printer)
    } else {
        template.render_order(&demo::sample_order(), &printer)
    };
    println!("{}", ContentSanitizer::new().sanitize(&markup));
    true
}
