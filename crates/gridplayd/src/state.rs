//! Daemon-held play session and replay, and the loads that feed them.
//!
//! Documents are read with `tokio::fs` while the state lock is released. Each
//! load takes a ticket first and installs its result only if no newer load of
//! the same kind was issued meanwhile.

use std::sync::Arc;

use gridplay::env::{Session, StepResult};
use gridplay::grid::GridMap;
use gridplay::loader::{LoadSequencer, LoadTicket};
use gridplay::policy::{greedy_path, score_path, QTable};
use gridplay::replay::{PathDocument, PathReplay};
use gridplay::rules::RuleSet;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::DaemonError;
use crate::paths::{AppPaths, DocKind};
use crate::protocol::{ReplaySnapshot, RuleSummary, SessionSnapshot};

pub type SharedState = Arc<RwLock<DaemonState>>;

struct ActiveSession {
    map_id: String,
    rule_id: String,
    session: Session,
}

/// A loaded replay plus its play/pause flag.
pub struct ActiveReplay {
    map_id: String,
    source: String,
    replay: PathReplay,
    playing: bool,
}

impl ActiveReplay {
    pub fn new(map_id: impl Into<String>, source: impl Into<String>, replay: PathReplay) -> Self {
        Self {
            map_id: map_id.into(),
            source: source.into(),
            replay,
            playing: false,
        }
    }
}

pub struct DaemonState {
    paths: AppPaths,
    session_loads: LoadSequencer,
    replay_loads: LoadSequencer,
    session: Option<ActiveSession>,
    replay: Option<ActiveReplay>,
}

impl DaemonState {
    pub fn new(paths: AppPaths) -> Self {
        Self {
            paths,
            session_loads: LoadSequencer::new(),
            replay_loads: LoadSequencer::new(),
            session: None,
            replay: None,
        }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    // ─────────────────────────────────────────────────────────────────────
    // Manual play
    // ─────────────────────────────────────────────────────────────────────

    pub fn begin_session_load(&mut self) -> LoadTicket {
        self.session_loads.begin()
    }

    /// Installs `session` if `ticket` is still the latest session load.
    pub fn finish_session_load(
        &mut self,
        ticket: LoadTicket,
        map_id: &str,
        rule_id: &str,
        session: Session,
    ) -> Result<SessionSnapshot, DaemonError> {
        let session = self
            .session_loads
            .accept(ticket, session)
            .ok_or(DaemonError::Superseded)?;
        info!("Session started: map={} rules={}", map_id, rule_id);
        self.session = Some(ActiveSession {
            map_id: map_id.to_string(),
            rule_id: rule_id.to_string(),
            session,
        });
        self.session_snapshot()
    }

    pub fn restart(&mut self) -> Result<SessionSnapshot, DaemonError> {
        let active = self.session.as_mut().ok_or(DaemonError::NotLoaded("session"))?;
        active.session.restart();
        debug!("Session restarted: map={}", active.map_id);
        self.session_snapshot()
    }

    pub fn step(&mut self, direction: &str) -> Result<StepResult, DaemonError> {
        let active = self.session.as_mut().ok_or(DaemonError::NotLoaded("session"))?;
        Ok(active.session.step_str(direction)?)
    }

    pub fn session_snapshot(&self) -> Result<SessionSnapshot, DaemonError> {
        let active = self.session.as_ref().ok_or(DaemonError::NotLoaded("session"))?;
        let s = &active.session;
        Ok(SessionSnapshot {
            map_id: active.map_id.clone(),
            rule_id: active.rule_id.clone(),
            grid: s.grid().to_codes(),
            position: s.position(),
            score: s.score(),
            step_count: s.step_count(),
            max_steps: s.rules().max_steps,
            terminated: s.is_terminated(),
            last_event: s.last_event(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Replay
    // ─────────────────────────────────────────────────────────────────────

    pub fn begin_replay_load(&mut self) -> LoadTicket {
        self.replay_loads.begin()
    }

    pub fn finish_replay_load(
        &mut self,
        ticket: LoadTicket,
        replay: ActiveReplay,
    ) -> Result<ReplaySnapshot, DaemonError> {
        let replay = self
            .replay_loads
            .accept(ticket, replay)
            .ok_or(DaemonError::Superseded)?;
        info!(
            "Replay loaded: map={} source={} len={}",
            replay.map_id,
            replay.source,
            replay.replay.len()
        );
        self.replay = Some(replay);
        self.replay_snapshot()
    }

    fn active_replay(&mut self) -> Result<&mut ActiveReplay, DaemonError> {
        self.replay.as_mut().ok_or(DaemonError::NotLoaded("replay"))
    }

    pub fn replay_advance(&mut self) -> Result<ReplaySnapshot, DaemonError> {
        self.active_replay()?.replay.advance();
        self.replay_snapshot()
    }

    /// Rewinds to index 0; a playing replay keeps playing from there.
    pub fn replay_reset(&mut self) -> Result<ReplaySnapshot, DaemonError> {
        self.active_replay()?.replay.reset();
        self.replay_snapshot()
    }

    pub fn replay_set_playing(&mut self, playing: bool) -> Result<ReplaySnapshot, DaemonError> {
        let active = self.active_replay()?;
        active.playing = playing && !active.replay.is_at_end();
        self.replay_snapshot()
    }

    /// One timer tick: advances a playing replay and stops it at the end.
    /// Returns whether the index moved.
    pub fn tick(&mut self) -> bool {
        let Some(active) = self.replay.as_mut().filter(|r| r.playing) else {
            return false;
        };
        let moved = active.replay.advance();
        if active.replay.is_at_end() {
            active.playing = false;
            debug!("Replay reached the end of {}", active.source);
        }
        moved
    }

    pub fn replay_snapshot(&self) -> Result<ReplaySnapshot, DaemonError> {
        let active = self.replay.as_ref().ok_or(DaemonError::NotLoaded("replay"))?;
        let r = &active.replay;
        Ok(ReplaySnapshot {
            map_id: active.map_id.clone(),
            source: active.source.clone(),
            grid: r.map().grid().to_codes(),
            index: r.index(),
            len: r.len(),
            position: r.current_position(),
            score: r.current_score(),
            at_end: r.is_at_end(),
            playing: active.playing,
            trail: r.trail(r.index()),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Document loading
// ═══════════════════════════════════════════════════════════════════════════

async fn read_doc(paths: &AppPaths, kind: DocKind, id: &str) -> Result<String, DaemonError> {
    let path = paths.doc_file(kind, id)?;
    debug!("Reading {:?}", path);
    Ok(tokio::fs::read_to_string(&path).await?)
}

pub async fn load_map(paths: &AppPaths, id: &str) -> Result<GridMap, DaemonError> {
    Ok(GridMap::from_json(&read_doc(paths, DocKind::Map, id).await?)?)
}

pub async fn load_rules(paths: &AppPaths, id: &str) -> Result<RuleSet, DaemonError> {
    let mut rules = RuleSet::from_json(&read_doc(paths, DocKind::Rules, id).await?)?;
    if rules.id.is_empty() {
        rules.id = id.to_string();
    }
    Ok(rules)
}

/// Sorted ids (file stems) of the `.json` documents of one kind.
pub async fn list_docs(paths: &AppPaths, kind: DocKind) -> Result<Vec<String>, DaemonError> {
    let mut ids = Vec::new();
    let mut entries = tokio::fs::read_dir(paths.doc_dir(kind)).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            ids.push(stem.to_string());
        }
    }
    ids.sort();
    Ok(ids)
}

/// Rule sets that parse and validate; broken files are skipped with a warning.
pub async fn list_rules(paths: &AppPaths) -> Result<Vec<RuleSummary>, DaemonError> {
    let mut out = Vec::new();
    for id in list_docs(paths, DocKind::Rules).await? {
        match load_rules(paths, &id).await {
            Ok(r) => out.push(RuleSummary {
                name: if r.name.is_empty() { id.clone() } else { r.name },
                id,
                max_steps: r.max_steps,
            }),
            Err(e) => warn!("Skipping rules {}: {}", id, e),
        }
    }
    Ok(out)
}

async fn paths_of(state: &SharedState) -> AppPaths {
    state.read().await.paths().clone()
}

pub async fn start_session(
    state: &SharedState,
    map_id: &str,
    rule_id: &str,
) -> Result<SessionSnapshot, DaemonError> {
    let ticket = state.write().await.begin_session_load();
    let paths = paths_of(state).await;

    let map = load_map(&paths, map_id).await?;
    let rules = load_rules(&paths, rule_id).await?;
    let session = Session::new(Arc::new(map), rules)?;

    state
        .write()
        .await
        .finish_session_load(ticket, map_id, rule_id, session)
}

pub async fn load_replay(
    state: &SharedState,
    map_id: &str,
    path_id: &str,
) -> Result<ReplaySnapshot, DaemonError> {
    let ticket = state.write().await.begin_replay_load();
    let paths = paths_of(state).await;

    let map = Arc::new(load_map(&paths, map_id).await?);
    let doc = PathDocument::from_json(&read_doc(&paths, DocKind::Path, path_id).await?)?;
    let replay = PathReplay::from_document(map, doc)?;

    state.write().await.finish_replay_load(
        ticket,
        ActiveReplay::new(map_id, format!("path:{path_id}"), replay),
    )
}

pub async fn load_optimal_path(
    state: &SharedState,
    map_id: &str,
    qtable_id: &str,
    rule_id: Option<&str>,
) -> Result<ReplaySnapshot, DaemonError> {
    let ticket = state.write().await.begin_replay_load();
    let paths = paths_of(state).await;

    let map = Arc::new(load_map(&paths, map_id).await?);
    let q = QTable::from_json(&read_doc(&paths, DocKind::QTable, qtable_id).await?)?;
    let path = greedy_path(&map, &q);
    let scores = match rule_id {
        Some(id) => {
            let rules = load_rules(&paths, id).await?;
            Some(score_path(Arc::clone(&map), rules, &path)?)
        }
        None => None,
    };
    debug!("Greedy path over {} has {} positions", map_id, path.len());
    let replay = PathReplay::new(map, path, scores)?;

    state.write().await.finish_replay_load(
        ticket,
        ActiveReplay::new(map_id, format!("qtable:{qtable_id}"), replay),
    )
}
