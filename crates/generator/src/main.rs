//! Clickstream Generator CLI

use anyhow::Context;
use clap::Parser;
use clickstream_generator::cli::{Cli, CommandRunner, Commands};
use clickstream_shared::config::AppConfig;
use clickstream_shared::observability;

const SERVICE_NAME: &str = "clickstream-generator";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(SERVICE_NAME).context("加载配置失败")?;
    cli.apply_to(&mut config);
    if let Commands::Run(args) = &cli.command {
        args.apply_to(&mut config);
    }

    // RUST_LOG 优先于配置中的日志级别
    let _guard = observability::init(&config.service_name, &config.observability).await?;

    let runner = CommandRunner::new(config);
    match &cli.command {
        Commands::Run(args) => runner.run_generate(args).await?,
        Commands::Table => runner.run_table()?,
    }

    Ok(())
}
