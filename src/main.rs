use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use comfy_table::Table;
use configuration::{load_settings, SslMode};
use database::{run_migrations, DbRepository};
use serde_json::json;
use web_server::EXPECTED_TABLES;

/// The main entry point for the opsdash dashboard backend.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine: the PG* variables may come from the environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut settings = load_settings()?;
    if let Some(ssl_mode) = cli.ssl_mode {
        settings.database.ssl_mode = ssl_mode;
    }

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = configuration::init_tracing(settings.server.log_dir.as_deref())?;
    tracing::debug!(database = ?settings.database, "Settings loaded.");

    // Execute the appropriate command
    match cli.command {
        Commands::Serve(args) => {
            if let Some(addr) = args.addr {
                settings.server.addr = addr;
            }
            settings.server.sample_mode |= args.sample;
            web_server::run_server(settings).await?;
        }
        Commands::Check => handle_check(DbRepository::connect_lazy(&settings.database), &settings.database.display_target()).await?,
        Commands::Schema(args) => handle_schema(DbRepository::connect_lazy(&settings.database), args).await?,
        Commands::Migrate => {
            let db_repo = DbRepository::connect_lazy(&settings.database);
            let pool = db_repo.pools().get_pool();
            run_migrations(&pool).await?;
            db_repo.pools().invalidate();
            println!("Migrations applied to {}.", settings.database.display_target());
        }
    }

    Ok(())
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Backend for the HR and operations analytics dashboard.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Override PGSSLMODE for this invocation.
    #[arg(long, global = true, value_enum)]
    ssl_mode: Option<SslMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Probe the database and report schema completeness as JSON.
    Check,
    /// Print the tables and columns of the public schema.
    Schema(SchemaArgs),
    /// Apply the bundled migrations.
    Migrate,
}

#[derive(Parser)]
struct ServeArgs {
    /// Address to listen on, e.g. "127.0.0.1:8080". Overrides OPSDASH_ADDR.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Serve sample data instead of querying the database.
    #[arg(long)]
    sample: bool,
}

#[derive(Parser)]
struct SchemaArgs {
    /// Only describe this table.
    #[arg(long)]
    table: Option<String>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_check(db_repo: DbRepository, target: &str) -> anyhow::Result<()> {
    let connected = db_repo.test_connection().await;

    let report = if !connected {
        json!({ "target": target, "connected": false })
    } else {
        match db_repo.missing_tables(EXPECTED_TABLES).await {
            Ok(missing) => json!({
                "target": target,
                "connected": true,
                "schema_complete": missing.is_empty(),
                "missing_tables": missing,
            }),
            Err(e) => json!({
                "target": target,
                "connected": true,
                "error": e.diagnosis(),
            }),
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    db_repo.pools().invalidate();

    if !connected {
        anyhow::bail!("database at {target} is unreachable");
    }
    Ok(())
}

async fn handle_schema(db_repo: DbRepository, args: SchemaArgs) -> anyhow::Result<()> {
    let tables = match args.table {
        Some(table) => vec![table],
        None => db_repo.list_tables().await?,
    };

    let mut table = Table::new();
    table.set_header(vec!["Table", "Column", "Type", "Nullable"]);
    for name in &tables {
        let columns = db_repo.list_columns(name).await?;
        if columns.is_empty() {
            table.add_row(vec![name.as_str(), "-", "(missing)", "-"]);
        }
        for column in columns {
            table.add_row(vec![
                name.clone(),
                column.name,
                column.data_type,
                if column.nullable { "yes" } else { "no" }.to_string(),
            ]);
        }
    }

    println!("{table}");
    db_repo.pools().invalidate();
    Ok(())
}
