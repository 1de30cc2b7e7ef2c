use anyhow::Context;
use clap::Parser;
use moe_build::Cli;
use moe_domain::config::Settings;
use moe_kernel::config::load_config;
use moe_logger::Logger;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings: Settings =
        load_config(cli.config.as_deref()).context("Critical: Configuration is malformed")?;

    let _log = Logger::from_settings(env!("CARGO_PKG_NAME"), &settings.log)?.init()?;

    moe_build::run(&cli, &settings.build).await
}
