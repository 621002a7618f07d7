//! HTTP observer and control surface
//!
//! `GET /state`, `GET /result`, `GET /events?from=N&limit=M` and
//! `POST /stop`. Nothing here mutates the auction; a stop only raises
//! the shared flag checked between items.
use super::{LoopService, ServiceControl};
use crate::event_log::{self, LogEvent, Offset, WithOffset};
use crate::observer::{AuctionResult, AuctionSnapshot, SharedObserver};
use anyhow::{format_err, Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::{runtime::Runtime, sync::oneshot};
use tracing::{info, warn};

pub(crate) const MAX_EVENTS_PER_PAGE: usize = 500;

#[derive(Clone)]
pub(crate) struct UiState {
    pub(crate) observer: SharedObserver,
    pub(crate) event_reader: event_log::SharedReader,
    pub(crate) control: ServiceControl,
}

#[derive(Deserialize)]
pub(crate) struct EventsQuery {
    #[serde(default)]
    pub(crate) from: Offset,
    pub(crate) limit: Option<usize>,
}

pub(crate) async fn get_state(State(state): State<UiState>) -> Json<AuctionSnapshot> {
    Json(state.observer.snapshot())
}

pub(crate) async fn get_result(State(state): State<UiState>) -> Result<Json<AuctionResult>, StatusCode> {
    state.observer.result().map(Json).ok_or(StatusCode::NOT_FOUND)
}

pub(crate) async fn get_events(
    State(state): State<UiState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<WithOffset<Vec<LogEvent>>>, StatusCode> {
    let limit = query
        .limit
        .unwrap_or(MAX_EVENTS_PER_PAGE)
        .min(MAX_EVENTS_PER_PAGE);
    state
        .event_reader
        .read(query.from, limit, Some(Duration::ZERO))
        .map(Json)
        .map_err(|e| {
            warn!(error = %e, from = query.from, "bad event read");
            StatusCode::BAD_REQUEST
        })
}

pub(crate) async fn post_stop(State(state): State<UiState>) -> StatusCode {
    info!("stop requested over http");
    state.control.stop_all();
    StatusCode::ACCEPTED
}

async fn run_http_server(addr: SocketAddr, state: UiState) -> Result<()> {
    let app = Router::new()
        .route("/state", get(get_state))
        .route("/result", get(get_result))
        .route("/events", get(get_events))
        .route("/stop", post(post_stop))
        .with_state(state);

    info!(%addr, "observer listening");
    axum::Server::try_bind(&addr)?
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

pub struct Ui {
    // cancels all tasks on drop
    _runtime: Runtime,
    server_rx: oneshot::Receiver<Result<()>>,
}

impl Ui {
    pub fn new(
        addr: &str,
        observer: SharedObserver,
        event_reader: event_log::SharedReader,
        control: ServiceControl,
    ) -> Result<Self> {
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("invalid bind address {}", addr))?;
        let runtime = Runtime::new()?;

        let (tx, rx) = oneshot::channel();

        let state = UiState {
            observer,
            event_reader,
            control,
        };
        runtime.spawn(async move {
            // receiver only goes away together with the runtime
            let _ = tx.send(
                run_http_server(addr, state)
                    .await
                    .context("failed to run http server"),
            );
        });

        Ok(Self {
            _runtime: runtime,
            server_rx: rx,
        })
    }
}

impl LoopService for Ui {
    fn run_iteration(&mut self) -> Result<ControlFlow<()>> {
        // don't hog the cpu
        std::thread::sleep(Duration::from_millis(100));

        match self.server_rx.try_recv() {
            Ok(res) => res.map(|()| ControlFlow::Break(())),
            Err(oneshot::error::TryRecvError::Empty) => Ok(ControlFlow::Continue(())),
            Err(oneshot::error::TryRecvError::Closed) => {
                Err(format_err!("ui server died without leaving a response"))
            }
        }
    }
}
