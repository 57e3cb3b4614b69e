use anyhow::{Context, Result};
use futures::future::join_all;
use std::{env, path::PathBuf};
use tokio::signal::unix::{self, SignalKind};

use boardlink::{
    board::{self, Board},
    config::Config,
    contract,
    tracing::{self, prelude::*},
    transport::SerialPortFactory,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing::init_journald_or_stdout();

    let backends = contract::verify_registry().context("backend registry is inconsistent")?;
    debug!(backends, "Backend contracts verified.");

    let path: PathBuf = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: boardlinkd <config.toml>")?;
    let config = Config::load_from(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    let mut boards: Vec<Box<dyn Board>> = Vec::with_capacity(config.boards.len());
    for board_config in &config.boards {
        let opened = board::open(board_config, &config.serial, &SerialPortFactory).await;
        match opened {
            Ok(mut board) => {
                match board.firmware_version().await {
                    Ok(Some(version)) => info!(board = %board, version = %version, "Firmware"),
                    Ok(None) => info!(board = %board, "Firmware version unknown"),
                    Err(e) => warn!(board = %board, error = %e, "Failed to read firmware version"),
                }
                boards.push(board);
            }
            Err(e) => {
                // Leave whatever was already opened in a safe state.
                make_safe(&mut boards).await;
                return Err(e).with_context(|| {
                    format!("failed to open board {} on {}", board_config.serial, board_config.port)
                });
            }
        }
    }
    info!(boards = boards.len(), "Started.");

    let mut sigint = unix::signal(SignalKind::interrupt())?;
    let mut sigterm = unix::signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {},
        _ = sigterm.recv() => {},
    }

    trace!("Shutting down.");
    make_safe(&mut boards).await;
    info!("Exiting.");
    Ok(())
}

async fn make_safe(boards: &mut [Box<dyn Board>]) {
    join_all(boards.iter_mut().map(|board| board.make_safe())).await;
}
