//! Shipscreen CLI - operator commands against a running daemon

mod render;
mod rpc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use rpc::RpcClient;
use serde_json::json;
use std::path::PathBuf;

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9640";

#[derive(Parser)]
#[command(name = "shipscreen-cli")]
#[command(about = "Ship screening engine CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "SHIPSCREEN_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create and schedule a screening of a ship for an account
    Screen {
        #[arg(short, long)]
        account: String,
        /// 7-digit IMO number
        imo: String,
    },

    /// Show a screening and its checks
    Show { screening_id: String },

    /// Show the completed runs of a screening, newest first
    History { screening_id: String },

    /// Schedule a screening again
    Reschedule { screening_id: String },

    /// Ship master data
    #[command(subcommand)]
    Ship(ShipCommands),

    /// Screen many ships at once
    Bulk {
        #[arg(short, long)]
        account: String,
        /// IMO numbers
        imos: Vec<String>,
        /// File with one IMO per line
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show bulk screening rows
    BulkStatus { bulk_ids: Vec<String> },

    /// Show system status
    Status,

    /// Run maintenance operations
    Maintenance {
        /// Force VACUUM even if not needed
        #[arg(long)]
        force_vacuum: bool,
    },
}

#[derive(Subcommand)]
enum ShipCommands {
    /// Insert or update a ship from a JSON file
    Upsert { file: PathBuf },
    /// Show a ship
    Show { imo: String },
}

fn read_imos(inline: Vec<String>, file: Option<PathBuf>) -> Result<Vec<String>> {
    let mut imos = inline;
    if let Some(path) = file {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        imos.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }
    anyhow::ensure!(!imos.is_empty(), "No IMO numbers given");
    Ok(imos)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = RpcClient::new(cli.rpc_url);

    match cli.command {
        Commands::Screen { account, imo } => {
            let result = client
                .call(
                    "screening.create.v1",
                    json!({ "account_id": account, "imo": imo }),
                )
                .await?;
            println!("{}", "✓ Screening scheduled".green().bold());
            println!("  {} {}", "ID:".bold(), result["screening_id"]);
            println!("  {} {}", "Status:".bold(), result["status"]);
        }

        Commands::Show { screening_id } => {
            let screening = client
                .call("screening.get.v1", json!({ "screening_id": screening_id }))
                .await?;
            render::print_screening(&screening);
        }

        Commands::History { screening_id } => {
            let history = client
                .call("screening.history.v1", json!({ "screening_id": screening_id }))
                .await?;
            render::print_history(&history);
        }

        Commands::Reschedule { screening_id } => {
            let result = client
                .call("screening.schedule.v1", json!({ "screening_id": screening_id }))
                .await?;
            println!(
                "{} {}",
                "✓ Screening rescheduled:".green().bold(),
                result["status"]
            );
        }

        Commands::Ship(ShipCommands::Upsert { file }) => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let ship: serde_json::Value =
                serde_json::from_str(&content).context("Invalid ship JSON")?;

            let result = client.call("ship.upsert.v1", json!({ "ship": ship })).await?;
            if result["changed"].as_bool().unwrap_or(false) {
                println!(
                    "{} {} screening(s) rescheduled",
                    "✓ Ship updated:".green().bold(),
                    result["rescheduled"]
                );
            } else {
                println!("{}", "○ Ship unchanged".yellow());
            }
        }

        Commands::Ship(ShipCommands::Show { imo }) => {
            let ship = client.call("ship.get.v1", json!({ "imo": imo })).await?;
            println!("{}", serde_json::to_string_pretty(&ship)?);
        }

        Commands::Bulk {
            account,
            imos,
            file,
        } => {
            let imos = read_imos(imos, file)?;
            let result = client
                .call(
                    "bulk.create.v1",
                    json!({ "account_id": account, "imos": imos }),
                )
                .await?;
            let ids = result["bulk_ids"].as_array().cloned().unwrap_or_default();
            println!("{} {} row(s)", "✓ Bulk screening queued:".green().bold(), ids.len());
            for id in ids {
                println!("  {}", id.as_str().unwrap_or_default());
            }
        }

        Commands::BulkStatus { bulk_ids } => {
            let mut rows = Vec::with_capacity(bulk_ids.len());
            for bulk_id in bulk_ids {
                rows.push(client.call("bulk.get.v1", json!({ "bulk_id": bulk_id })).await?);
            }
            render::print_bulk(&rows);
        }

        Commands::Status => {
            println!("{}", "System Status".cyan().bold());
            println!();

            match client.call("admin.stats.v1", json!({})).await {
                Ok(stats) => {
                    println!("  {} {}", "RPC URL:".bold(), client.url());
                    println!("  {} {}", "Status:".bold(), "ONLINE".green());
                    println!();
                    let jobs = &stats["jobs"];
                    println!("  {} {}", "Jobs queued:".bold(), jobs["queued"]);
                    println!("  {} {}", "Jobs running:".bold(), jobs["running"]);
                    println!("  {} {}", "Jobs done:".bold(), jobs["done"]);
                    println!("  {} {}", "Jobs failed:".bold(), jobs["failed"]);
                    println!();
                    let screenings = &stats["screenings"];
                    println!("  {} {}", "Screenings scheduled:".bold(), screenings["scheduled"]);
                    println!("  {} {}", "Screenings in progress:".bold(), screenings["in_progress"]);
                    println!("  {} {}", "Screenings done:".bold(), screenings["done"]);
                    println!();
                    println!("  {} {}", "Cache entries:".bold(), stats["cache_entries"]);
                    println!(
                        "  {} {:.2} MB",
                        "DB Size:".bold(),
                        render::megabytes(&stats["db_size_bytes"])
                    );
                    println!("  {} {} seconds", "Uptime:".bold(), stats["uptime_seconds"]);
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }

        Commands::Maintenance { force_vacuum } => {
            println!("{}", "Running maintenance...".cyan().bold());

            let result = client
                .call("admin.maintenance.v1", json!({ "force_vacuum": force_vacuum }))
                .await?;

            if result["vacuum_run"].as_bool().unwrap_or(false) {
                println!("  {} VACUUM executed", "✓".green());
            } else {
                println!("  ○ VACUUM skipped (not needed)");
            }
            println!("  {} {} jobs deleted", "✓".green(), result["jobs_deleted"]);
            println!(
                "  {} {} cache entries deleted",
                "✓".green(),
                result["cache_entries_deleted"]
            );
            println!(
                "  {} {:.2} MB → {:.2} MB",
                "DB Size:".bold(),
                render::megabytes(&result["db_size_before"]),
                render::megabytes(&result["db_size_after"])
            );
        }
    }

    Ok(())
}
