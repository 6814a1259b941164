//! `daylist` server entry point.

use daylist_core::init_logging;
use daylist_server::{ServerConfig, ServerError};
use log::error;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let result = start().await;
    if let Err(err) = &result {
        error!("event=server_exit module=server status=error error={err}");
        eprintln!("daylist: {err}");
    }
    log::logger().flush();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

async fn start() -> Result<(), ServerError> {
    let config = ServerConfig::load()?;
    init_logging(&config.log_level, config.log_dir.as_deref()).map_err(ServerError::Logging)?;
    daylist_server::run(config).await
}
