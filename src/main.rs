use anyhow::Result;
use clap::Parser;

use tinylinker::cli::{Cli, Commands};
use tinylinker::config::{get_config, init_config_from};
use tinylinker::runtime::modes;
use tinylinker::system::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config_from(&cli.config);
    let config = get_config();

    match cli.command {
        // generate-config 输出到 stdout，不初始化日志
        Some(command @ Commands::GenerateConfig { .. }) => modes::run_cli(command, &config).await,
        command => {
            let _guard = init_logging(&config.logging)?;
            match command {
                Some(command) => modes::run_cli(command, &config).await,
                None => modes::run_server(&config).await,
            }
        }
    }
}
