//! QEP DB Bootstrap - 本地 Postgres 容器引导
//!
//! Usage:
//! - Start a database: `qep-db` or `qep-db up`
//! - Custom port: `POSTGRES_PORT=6000 qep-db up`
//! - List running instances: `qep-db status [--json]`
//! - Stop running instances: `qep-db down`
//! - Smoke-test a query: `qep-db query "EXPLAIN SELECT * FROM orders LIMIT 10;"`

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use qep_db_bootstrap::config::constants::VERSION;
use qep_db_bootstrap::domain::ContainerInfo;
use qep_db_bootstrap::infra::stderr_sink;
use qep_db_bootstrap::{BootstrapError, Bootstrapper, DockerCli, EnvConfig};

/// Local Postgres bootstrap for the query execution plan project
#[derive(Parser, Debug)]
#[command(name = "qep-db", version = VERSION, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Image build context directory (overrides QEP_DB_BUILD_CONTEXT)
    #[arg(long, global = true)]
    context: Option<PathBuf>,

    /// Container runtime executable (overrides QEP_DB_DOCKER)
    #[arg(long, global = true)]
    docker: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the image and start a new Postgres container (default)
    Up,
    /// List running bootstrap containers
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Stop every running bootstrap container
    Down,
    /// Run a read-only SQL statement in the running container
    Query {
        /// SQL to execute, e.g. "EXPLAIN SELECT * FROM orders LIMIT 10;"
        sql: String,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let code = rt.block_on(run(cli));
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

async fn run(cli: Cli) -> i32 {
    let mut config = match EnvConfig::from_env() {
        Ok(config) => config,
        Err(e) => return report_error(e),
    };
    if let Some(context) = cli.context {
        config.build_context = context;
    }
    if let Some(docker) = cli.docker {
        config.docker_bin = docker;
    }

    // Ctrl-C 终止正在运行的 docker 子进程
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping");
                cancel.cancel();
            }
        });
    }

    let runtime = DockerCli::new(config.docker_bin.clone(), stderr_sink(), cancel);
    let bootstrapper = Bootstrapper::new(runtime, config);

    let result = match cli.command.unwrap_or(Commands::Up) {
        Commands::Up => bootstrapper.up().await.map(|report| {
            eprintln!("{}", report.ready_message());
        }),
        Commands::Status { json } => bootstrapper
            .status()
            .await
            .and_then(|containers| print_containers(&containers, json)),
        Commands::Down => bootstrapper.down().await.map(|stopped| {
            eprintln!("Stopped {} container(s)", stopped.len());
        }),
        Commands::Query { sql } => bootstrapper.query(&sql).await.map(|out| {
            print!("{}", out);
        }),
    };

    match result {
        Ok(()) => 0,
        Err(e) => report_error(e),
    }
}

/// 列表是命令结果，写 stdout；空列表提示写 stderr
fn print_containers(containers: &[ContainerInfo], json: bool) -> Result<(), BootstrapError> {
    if json {
        let body = serde_json::to_string_pretty(containers)?;
        println!("{}", body);
        return Ok(());
    }

    if containers.is_empty() {
        eprintln!("No running bootstrap containers");
        return Ok(());
    }

    println!("{:<14} {:<28} {:<20} PORTS", "ID", "NAME", "STATUS");
    for c in containers {
        println!(
            "{:<14} {:<28} {:<20} {}",
            c.id,
            c.name,
            c.status,
            c.ports.join(", ")
        );
    }
    Ok(())
}

fn report_error(e: BootstrapError) -> i32 {
    debug!(error = ?e, "qep-db failed");
    eprintln!("{}", e);
    e.exit_code()
}
