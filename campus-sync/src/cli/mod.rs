//! Command-line interface: argument definitions and handlers.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::api::term::is_term_code;
use crate::api::{CanvasClient, DriveClient, RegistrarClient};
use crate::config::Config;
use crate::services::oec::{rows, CoursesDiff, TermSetupTask};
use crate::services::rosters::RosterService;

#[derive(Parser)]
#[command(
    name = "campus-sync",
    version,
    about = "Synchronize rosters, enrollments and course-evaluation exports across campus systems"
)]
pub struct Cli {
    /// Config file path (defaults to <config_dir>/campus-sync/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile a course roster against the registrar and print it
    Rosters {
        /// LMS course id
        #[arg(long)]
        course_id: u64,
        /// LMS login id of the requesting teacher
        #[arg(long)]
        teacher: String,
    },
    /// Course-evaluation tooling
    #[command(subcommand)]
    Oec(OecCommands),
}

#[derive(Subcommand)]
pub enum OecCommands {
    /// Diff an expected course export against a department-confirmed one
    Diff {
        /// Department name used as the diff label
        #[arg(long)]
        dept: String,
        /// CSV file with the expected (queried) rows
        #[arg(long)]
        expected: PathBuf,
        /// CSV file with the confirmed rows
        #[arg(long)]
        confirmed: PathBuf,
        /// Output directory for the artifact (defaults to the configured one)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Provision the remote workspace for a new evaluation term
    TermSetup {
        /// Term code, e.g. 2015-D
        #[arg(long)]
        term: String,
    },
}

pub async fn handle_command(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)?;

    match cli.command {
        Commands::Rosters { course_id, teacher } => {
            handle_rosters(&config, course_id, &teacher).await
        }
        Commands::Oec(OecCommands::Diff {
            dept,
            expected,
            confirmed,
            output_dir,
        }) => handle_diff(&config, &dept, &expected, &confirmed, output_dir),
        Commands::Oec(OecCommands::TermSetup { term }) => {
            handle_term_setup(&config, &term).await
        }
    }
}

async fn handle_rosters(config: &Config, course_id: u64, teacher: &str) -> Result<()> {
    let lms = CanvasClient::new(&config.canvas);
    let registrar = RegistrarClient::new(&config.registrar);
    let service = RosterService::new(lms, registrar, course_id, teacher);

    let feed = service
        .get_feed()
        .await
        .with_context(|| format!("Failed to reconcile roster for course {}", course_id))?;

    println!("{}", serde_json::to_string_pretty(feed)?);
    Ok(())
}

fn handle_diff(
    config: &Config,
    dept: &str,
    expected: &Path,
    confirmed: &Path,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    for path in [expected, confirmed] {
        if !path.exists() {
            anyhow::bail!("Input file does not exist: {}", path.display());
        }
    }

    let expected_rows = rows::read_rows(expected)
        .with_context(|| format!("Failed to read expected rows: {}", expected.display()))?;
    let confirmed_rows = rows::read_rows(confirmed)
        .with_context(|| format!("Failed to read confirmed rows: {}", confirmed.display()))?;

    let output_dir = output_dir.unwrap_or_else(|| config.output_dir.clone());
    let diff = CoursesDiff::new(dept, &output_dir);
    let outcome = diff
        .export(&expected_rows, &confirmed_rows)
        .with_context(|| format!("Diff failed for department {}", dept))?;

    if outcome.was_difference_found {
        println!("Differences found: {}", outcome.artifact_path.display());
    } else {
        println!("No differences found for {}", dept);
    }
    Ok(())
}

async fn handle_term_setup(config: &Config, term: &str) -> Result<()> {
    if !is_term_code(term) {
        anyhow::bail!("Invalid term code '{}': expected <year>-<letter>, e.g. 2015-D", term);
    }

    let drive = DriveClient::new(&config.drive);
    let task = TermSetupTask::new(drive, term, &config.drive.root_folder_id, &config.output_dir);
    // Errors are contained and logged inside the task.
    task.run().await;
    Ok(())
}
