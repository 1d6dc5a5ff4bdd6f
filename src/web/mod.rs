//! Headless HTTP front for a running simulation.
//!
//! The engine runs on a blocking task and publishes one frame per tick; the
//! server exposes the latest frame, the full frame history, a live SSE feed
//! and, once the run has finished, the save game of the final world.

use std::{
    convert::Infallible,
    net::SocketAddr,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use serde::Serialize;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{error, info, warn};

use crate::{
    engine::{EngineBuilder, EngineSettings},
    save::SaveGame,
    systems::Cadence,
    world::{World, WorldSnapshot},
};

#[derive(Clone, Serialize)]
pub struct Frame {
    pub snapshot: WorldSnapshot,
    pub completed: bool,
}

#[derive(Clone, Serialize)]
pub struct StateEnvelope {
    pub scenario: String,
    pub total_ticks: u64,
    pub frame: Option<Frame>,
    pub completed: bool,
}

#[derive(Default)]
struct Published {
    latest: Option<Frame>,
    frames: Vec<Frame>,
    final_save: Option<Bytes>,
}

#[derive(Clone)]
struct AppState {
    broadcaster: broadcast::Sender<String>,
    published: Arc<Mutex<Published>>,
    total_ticks: u64,
    scenario_name: String,
    simulation_done: Arc<AtomicBool>,
}

fn lock(published: &Mutex<Published>) -> MutexGuard<'_, Published> {
    // A panicking simulation must not take the read endpoints down with it.
    published.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct WebServerConfig {
    pub world: World,
    pub scenario_name: String,
    pub seed: u64,
    pub cadence: Cadence,
    pub ticks: u64,
    pub snapshot_interval: u64,
    pub snapshot_dir: PathBuf,
    pub host: String,
    pub port: u16,
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        mut world,
        scenario_name,
        seed,
        cadence,
        ticks,
        snapshot_interval,
        snapshot_dir,
        host,
        port,
    } = config;

    let settings = EngineSettings {
        scenario_name: scenario_name.clone(),
        seed,
        snapshot_interval_ticks: snapshot_interval,
        snapshot_dir,
    };
    let mut engine = EngineBuilder::new(settings)
        .with_standard_systems(&cadence)
        .build();

    let (tx, _) = broadcast::channel::<String>(512);
    let published = Arc::new(Mutex::new(Published::default()));
    let simulation_done = Arc::new(AtomicBool::new(false));

    let published_for_sim = published.clone();
    let done_for_sim = simulation_done.clone();
    let tx_for_sim = tx.clone();
    let scenario_for_sim = scenario_name.clone();

    let sim_handle = tokio::task::spawn_blocking(move || -> Result<()> {
        engine.run_with_hook(&mut world, ticks, |snapshot| {
            let frame = Frame {
                snapshot,
                completed: false,
            };
            if let Ok(payload) = serde_json::to_string(&frame) {
                let _ = tx_for_sim.send(payload);
            }
            let mut guard = lock(&published_for_sim);
            guard.latest = Some(frame.clone());
            guard.frames.push(frame);
        })?;

        let save = SaveGame::new(scenario_for_sim.clone(), seed, world.clone()).to_json()?;
        let final_frame = Frame {
            snapshot: world.snapshot(&scenario_for_sim),
            completed: true,
        };
        {
            let mut guard = lock(&published_for_sim);
            guard.latest = Some(final_frame.clone());
            match guard.frames.last_mut() {
                Some(last) => *last = final_frame.clone(),
                None => guard.frames.push(final_frame.clone()),
            }
            guard.final_save = Some(Bytes::from(save));
        }
        done_for_sim.store(true, Ordering::SeqCst);
        if let Ok(payload) = serde_json::to_string(&final_frame) {
            let _ = tx_for_sim.send(payload);
        }
        Ok(())
    });

    let state = Arc::new(AppState {
        broadcaster: tx.clone(),
        published,
        total_ticks: ticks,
        scenario_name: scenario_name.clone(),
        simulation_done,
    });

    let scenario_label = scenario_name.clone();
    tokio::spawn(async move {
        match sim_handle.await {
            Ok(Ok(())) => {
                info!(target: "civitas::web", scenario = %scenario_label, "simulation.completed");
            }
            Ok(Err(err)) => {
                error!(target: "civitas::web", error = ?err, "simulation.failed");
            }
            Err(err) => {
                error!(target: "civitas::web", error = ?err, "simulation.task_failed");
            }
        }
    });

    let router = Router::new()
        .route("/api/state", get(latest_state))
        .route("/api/frames", get(all_frames))
        .route("/api/events", get(stream_events))
        .route("/api/save", get(final_save))
        .with_state(state);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;

    info!(target: "civitas::web", %addr, scenario = %scenario_name, "server.listening");

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target: "civitas::web", error = %err, "ctrl_c handler failed");
    }
    info!(target: "civitas::web", "server.shutdown");
}

async fn latest_state(State(state): State<Arc<AppState>>) -> Json<StateEnvelope> {
    let frame = lock(&state.published).latest.clone();
    Json(StateEnvelope {
        scenario: state.scenario_name.clone(),
        total_ticks: state.total_ticks,
        frame,
        completed: state.simulation_done.load(Ordering::SeqCst),
    })
}

#[derive(Serialize)]
struct FramesResponse {
    scenario: String,
    total_ticks: u64,
    completed: bool,
    frames: Vec<Frame>,
}

async fn all_frames(State(state): State<Arc<AppState>>) -> Json<FramesResponse> {
    let frames = lock(&state.published).frames.clone();
    Json(FramesResponse {
        scenario: state.scenario_name.clone(),
        total_ticks: state.total_ticks,
        completed: state.simulation_done.load(Ordering::SeqCst),
        frames,
    })
}

async fn final_save(State(state): State<Arc<AppState>>) -> Response {
    let save = lock(&state.published).final_save.clone();
    match save {
        Some(bytes) => (
            [
                (header::CONTENT_TYPE, "application/json"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"save.json\""),
            ],
            Body::from(bytes),
        )
            .into_response(),
        None => (StatusCode::CONFLICT, "simulation still running").into_response(),
    }
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}
