//! Gridplay Daemon - grid-world play and replay service
//!
//! This daemon owns the interactive state of the grid-world frontend:
//! - Manual play sessions (map + rule set, keyboard stepping)
//! - Replays of stored or Q-table-derived optimal paths
//! - A line-delimited JSON IPC server for UI clients and `gridplay-cli`
//!
//! Storage locations (override with `GRIDPLAY_DATA_DIR`):
//! - Linux: ~/.local/share/gridplay/
//! - Windows: %APPDATA%\gridplay\
//! - MacOS: ~/Library/Application Support/gridplay/

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tracing::{error, info};

mod config;
mod error;
mod paths;
mod protocol;
mod state;

use config::DaemonConfig;
use error::DaemonError;
use paths::{AppPaths, DocKind};
use protocol::{Request, Response};
use state::{DaemonState, SharedState};

fn error_response(e: DaemonError) -> Response {
    Response::Error {
        message: e.to_string(),
    }
}

async fn dispatch(request: Request, state: &SharedState) -> Result<Response, DaemonError> {
    Ok(match request {
        Request::ListMaps => {
            let paths = state.read().await.paths().clone();
            Response::Maps {
                maps: state::list_docs(&paths, DocKind::Map).await?,
            }
        }
        Request::ListRules => {
            let paths = state.read().await.paths().clone();
            Response::Rules {
                rules: state::list_rules(&paths).await?,
            }
        }

        Request::StartSession { map_id, rule_id } => {
            Response::Session(Box::new(state::start_session(state, &map_id, &rule_id).await?))
        }
        Request::Restart => Response::Session(Box::new(state.write().await.restart()?)),
        Request::Step { direction } => Response::Step(state.write().await.step(&direction)?),
        Request::GetSession => Response::Session(Box::new(state.read().await.session_snapshot()?)),

        Request::LoadReplay { map_id, path_id } => {
            Response::Replay(Box::new(state::load_replay(state, &map_id, &path_id).await?))
        }
        Request::LoadOptimalPath {
            map_id,
            qtable_id,
            rule_id,
        } => Response::Replay(Box::new(
            state::load_optimal_path(state, &map_id, &qtable_id, rule_id.as_deref()).await?,
        )),
        Request::ReplayAdvance => Response::Replay(Box::new(state.write().await.replay_advance()?)),
        Request::ReplayReset => Response::Replay(Box::new(state.write().await.replay_reset()?)),
        Request::ReplayPlay => {
            Response::Replay(Box::new(state.write().await.replay_set_playing(true)?))
        }
        Request::ReplayPause => {
            Response::Replay(Box::new(state.write().await.replay_set_playing(false)?))
        }
        Request::GetReplay => Response::Replay(Box::new(state.read().await.replay_snapshot()?)),
    })
}

async fn handle_client(
    stream: TcpStream,
    state: SharedState,
) -> Result<(), Box<dyn std::error::Error>> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(req) => dispatch(req, &state).await.unwrap_or_else(error_response),
            Err(e) => Response::Error {
                message: format!("Invalid request: {}", e),
            },
        };
        writer
            .write_all(serde_json::to_string(&response)?.as_bytes())
            .await?;
        writer.write_all(b"\n").await?;
    }
    Ok(())
}

/// Advances a playing replay once per `interval`.
async fn run_replay_ticker(state: SharedState, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        state.write().await.tick();
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Main
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (RUST_LOG filters)
    tracing_subscriber::fmt::init();

    let paths = AppPaths::new()?;
    info!("Data directory: {:?}", paths.data_dir());

    let config = DaemonConfig::load(&paths.config_file())?;
    info!(
        "Config: listen_addr={} replay_interval_ms={}",
        config.listen_addr, config.replay_interval_ms
    );

    let state: SharedState = Arc::new(RwLock::new(DaemonState::new(paths)));

    // Replay timer task
    tokio::spawn(run_replay_ticker(
        Arc::clone(&state),
        config.replay_interval(),
    ));

    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!("Gridplay daemon listening on {}", config.listen_addr);

    // Accept client connections until Ctrl-C
    loop {
        let (stream, addr) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C: shutting down");
                return Ok(());
            }
        };
        info!("Client connected: {}", addr);
        let state_clone = Arc::clone(&state);

        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, state_clone).await {
                error!("Client handler error: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn requests_without_state_report_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let state: SharedState = Arc::new(RwLock::new(DaemonState::new(
            AppPaths::at(tmp.path()).unwrap(),
        )));

        let resp = dispatch(Request::Step { direction: "up".into() }, &state)
            .await
            .unwrap_or_else(error_response);
        assert!(matches!(resp, Response::Error { ref message } if message == "no session loaded"));

        let resp = dispatch(Request::ListMaps, &state).await.unwrap();
        assert!(matches!(resp, Response::Maps { ref maps } if maps.is_empty()));
    }

    #[tokio::test]
    async fn ticker_plays_a_replay_to_the_end() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::at(tmp.path()).unwrap();
        std::fs::write(
            paths.doc_file(DocKind::Map, "line").unwrap(),
            r#"{"map":[["S","0","0","G"]]}"#,
        )
        .unwrap();
        std::fs::write(
            paths.doc_file(DocKind::Path, "walk").unwrap(),
            "[[0,0],[0,1],[0,2],[0,3]]",
        )
        .unwrap();
        let state: SharedState = Arc::new(RwLock::new(DaemonState::new(paths)));

        let load = Request::LoadReplay {
            map_id: "line".into(),
            path_id: "walk".into(),
        };
        assert!(matches!(dispatch(load, &state).await.unwrap(), Response::Replay(_)));
        dispatch(Request::ReplayPlay, &state).await.unwrap();

        let ticker = tokio::spawn(run_replay_ticker(
            Arc::clone(&state),
            Duration::from_millis(5),
        ));
        let mut snap = state.read().await.replay_snapshot().unwrap();
        for _ in 0..200 {
            if snap.at_end {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            snap = state.read().await.replay_snapshot().unwrap();
        }
        ticker.abort();

        assert!(snap.at_end);
        assert_eq!(snap.index, 3);
        assert!(!state.read().await.replay_snapshot().unwrap().playing);
    }
}
