use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use muster::batch::{BatchCreated, BatchRequest, BatchStatusReport, CancelOutcome};
use muster::config::{QueueConfig, ServerConfig};
use muster::server::Server;
use muster::store::ExecutionKind;

#[derive(Parser, Debug)]
#[command(name = "muster")]
#[command(version)]
#[command(about = "Batch execution orchestrator for infrastructure automation")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start a muster server
    Serve(ServeArgs),

    /// Batch management commands
    Batch {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: BatchCommands,
    },

    /// Admission queue commands
    Queue {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: QueueCommands,
    },
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Port to listen on for the HTTP API
    #[arg(long, default_value = "8470")]
    port: u16,

    /// Maximum number of concurrently running executions
    #[arg(long, default_value = "10")]
    limit: usize,

    /// Maximum number of executions waiting in the backlog
    #[arg(long, default_value = "50")]
    queue_size: usize,

    /// JSON file to seed the node/group inventory from
    #[arg(long)]
    inventory: Option<PathBuf>,
}

// =============================================================================
// Client Arguments (shared by batch and queue commands)
// =============================================================================

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Server address
    #[arg(long, short = 'a', default_value = "http://127.0.0.1:8470")]
    addr: String,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Command,
    Task,
}

impl From<KindArg> for ExecutionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Command => ExecutionKind::Command,
            KindArg::Task => ExecutionKind::Task,
        }
    }
}

// =============================================================================
// Batch Commands
// =============================================================================

#[derive(clap::Subcommand, Debug)]
enum BatchCommands {
    /// Submit a new batch
    Submit {
        /// Execution kind
        #[arg(long, default_value = "command")]
        kind: KindArg,

        /// The command line or task name to run on each node
        action: String,

        /// Explicit target node ids (comma-separated)
        #[arg(long, default_value = "")]
        nodes: String,

        /// Target group ids to expand (comma-separated)
        #[arg(long, default_value = "")]
        groups: String,

        /// Opaque execution parameters as a JSON object
        #[arg(long)]
        parameters: Option<String>,

        /// User to attribute the batch to
        #[arg(long, default_value = "cli")]
        user: String,
    },
    /// Get status of a batch
    Status {
        /// The batch ID (UUID)
        batch_id: Uuid,

        /// Only list executions with this status (queued/running/success/failed)
        #[arg(long)]
        status: Option<String>,
    },
    /// Cancel a batch
    Cancel {
        /// The batch ID (UUID)
        batch_id: Uuid,
    },
}

// =============================================================================
// Queue Commands
// =============================================================================

#[derive(clap::Subcommand, Debug)]
enum QueueCommands {
    /// Show admission queue occupancy
    Status,
}

// =============================================================================
// Helper Functions
// =============================================================================

fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

async fn check_response(
    response: reqwest::Response,
) -> Result<reqwest::Response, Box<dyn std::error::Error>> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body: serde_json::Value = response.json().await.unwrap_or_default();
    let message = body
        .get("error")
        .and_then(|e| e.as_str())
        .unwrap_or("unknown error")
        .to_string();
    eprintln!("Error ({}): {}", status, message);
    std::process::exit(1);
}

// =============================================================================
// Client Command Handlers
// =============================================================================

async fn handle_batch_submit(
    client: &reqwest::Client,
    args: &ClientArgs,
    request: BatchRequest,
    user: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut body = serde_json::to_value(&request)?;
    body["user_id"] = serde_json::Value::String(user);

    let response = client
        .post(format!("{}/api/batches", args.addr))
        .json(&body)
        .send()
        .await?;
    let created: BatchCreated = check_response(response).await?.json().await?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&created)?),
        OutputFormat::Table => {
            println!("Batch submitted successfully!");
            println!("Batch ID:     {}", created.batch_id);
            println!("Target count: {}", created.target_count);
            println!("Targets:      {}", created.expanded_node_ids.join(", "));
        }
    }
    Ok(())
}

async fn handle_batch_status(
    client: &reqwest::Client,
    args: &ClientArgs,
    batch_id: Uuid,
    status: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut url = format!("{}/api/batches/{}", args.addr, batch_id);
    if let Some(filter) = &status {
        url = format!("{}?status={}", url, filter);
    }

    let response = client.get(url).send().await?;
    let report: BatchStatusReport = check_response(response).await?.json().await?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => {
            let batch = &report.batch;
            println!("Batch ID:  {}", batch.id);
            println!("Status:    {} ({}%)", batch.status, report.progress);
            println!("User:      {}", batch.user_id);
            println!("Action:    {} ({})", batch.action, batch.kind);
            println!(
                "Stats:     total {}, queued {}, running {}, success {}, failed {}",
                batch.stats.total,
                batch.stats.queued,
                batch.stats.running,
                batch.stats.success,
                batch.stats.failed
            );
            println!();
            println!("{:<38} {:<10} NODE", "EXECUTION ID", "STATUS");
            println!("{}", "-".repeat(70));
            for view in &report.executions {
                let node = view
                    .node_name
                    .clone()
                    .or_else(|| view.execution.target_nodes.first().cloned())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<38} {:<10} {}",
                    view.execution.id, view.execution.status, node
                );
            }
        }
    }
    Ok(())
}

async fn handle_batch_cancel(
    client: &reqwest::Client,
    args: &ClientArgs,
    batch_id: Uuid,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = client
        .post(format!("{}/api/batches/{}/cancel", args.addr, batch_id))
        .send()
        .await?;
    let outcome: CancelOutcome = check_response(response).await?.json().await?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Table => {
            println!("Batch {} cancelled.", batch_id);
            println!("Executions cancelled: {}", outcome.cancelled_count);
        }
    }
    Ok(())
}

async fn handle_queue_status(
    client: &reqwest::Client,
    args: &ClientArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = client
        .get(format!("{}/api/queue", args.addr))
        .send()
        .await?;
    let status: serde_json::Value = check_response(response).await?.json().await?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Table => {
            println!(
                "Running: {} / {}",
                status["running"].as_u64().unwrap_or(0),
                status["limit"].as_u64().unwrap_or(0)
            );
            println!("Queued:  {}", status["queued"].as_u64().unwrap_or(0));
            if let Some(queue) = status["queue"].as_array() {
                if !queue.is_empty() {
                    println!();
                    println!("{:<38} {:<10} TARGET", "ID", "KIND");
                    println!("{}", "-".repeat(70));
                    for unit in queue {
                        println!(
                            "{:<38} {:<10} {}",
                            unit["id"].as_str().unwrap_or("-"),
                            unit["kind"].as_str().unwrap_or("-"),
                            unit["target"].as_str().unwrap_or("-")
                        );
                    }
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// Server Implementation
// =============================================================================

async fn run_server(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = ServerConfig::default().with_queue(QueueConfig::new(args.limit, args.queue_size));
    config.listen_addr = format!("0.0.0.0:{}", args.port).parse()?;
    if let Some(path) = args.inventory {
        config = config.with_inventory_path(path);
    }

    let server = Server::new(config).await?;
    server.run().await?;
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Serve(serve_args) => {
            run_server(serve_args).await?;
        }
        Commands::Batch { client, command } => {
            let http = reqwest::Client::new();
            match command {
                BatchCommands::Submit {
                    kind,
                    action,
                    nodes,
                    groups,
                    parameters,
                    user,
                } => {
                    let parameters = match parameters {
                        Some(raw) => Some(serde_json::from_str(&raw)?),
                        None => None,
                    };
                    let request = BatchRequest {
                        kind: kind.into(),
                        action,
                        parameters,
                        target_node_ids: split_ids(&nodes),
                        target_group_ids: split_ids(&groups),
                    };
                    handle_batch_submit(&http, &client, request, user).await?;
                }
                BatchCommands::Status { batch_id, status } => {
                    handle_batch_status(&http, &client, batch_id, status).await?;
                }
                BatchCommands::Cancel { batch_id } => {
                    handle_batch_cancel(&http, &client, batch_id).await?;
                }
            }
        }
        Commands::Queue { client, command } => {
            let http = reqwest::Client::new();
            match command {
                QueueCommands::Status => {
                    handle_queue_status(&http, &client).await?;
                }
            }
        }
    }

    Ok(())
}
