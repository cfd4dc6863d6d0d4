//! Maintenance commands. Each one walks the whole dataset, logs every entity
//! it touches and prints a summary per job at the end.

use anyhow::Context;
use clap::Parser;
use studyrooms::{config::Config, connect, init_tracing, maintenance::{self, Task}};

#[derive(Parser)]
#[command(name = "studyrooms-admin")]
#[command(about = "Consistency and seeding jobs for rooms and channels")]
struct Cli {
    #[command(subcommand)]
    task: Task,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let database_url = Config::database_url_from_env()?;
    let db_pool = connect(&database_url, 1)
        .await
        .context("could not open the database")?;

    let reports = maintenance::run_task(&db_pool, cli.task).await?;

    for report in &reports {
        println!("{report}");
        for (entity, reason) in &report.skipped {
            println!("  skipped {entity}: {reason}");
        }
        for (entity, error) in &report.failed {
            println!("  failed {entity}: {error}");
        }
    }
    Ok(())
}
