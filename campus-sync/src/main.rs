//! campus-sync: batch synchronization of rosters, enrollments and
//! course-evaluation exports across campus systems.

mod api;
mod cli;
mod config;
mod error;
mod services;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = cli::Cli::parse();
    cli::handle_command(cli).await
}
