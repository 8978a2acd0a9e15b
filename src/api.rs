// src/api.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::cards::Card;
use crate::controller::SectionController;
use crate::ingest::Section;
use crate::render::{Frame, NewsDisplay, QuoteDisplay};

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SectionController>,
}

impl AppState {
    pub fn new(controller: SectionController) -> Self {
        Self {
            controller: Arc::new(controller),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/carousel", get(current).delete(deactivate))
        .route("/carousel/next", post(next))
        .route("/carousel/previous", post(previous))
        .route("/carousel/toggle", post(toggle))
        .route("/carousel/section/{section}", post(activate))
        .route("/carousel/refresh", post(refresh))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Frame plus the display strings a client would otherwise recompute.
#[derive(Serialize)]
struct FrameOut {
    #[serde(flatten)]
    frame: Frame,
    display: DisplayOut,
}

#[derive(Serialize)]
#[serde(untagged)]
enum DisplayOut {
    News(NewsDisplay),
    Quote(QuoteDisplay),
}

impl From<Frame> for FrameOut {
    fn from(frame: Frame) -> Self {
        let display = match &frame.card {
            Card::News(n) => DisplayOut::News(NewsDisplay::from(n)),
            Card::Quote(q) => DisplayOut::Quote(QuoteDisplay::from(q)),
        };
        Self { frame, display }
    }
}

/// 200 with the frame, or 204 while nothing is on screen.
fn frame_response(frame: Option<Frame>) -> Response {
    match frame {
        Some(f) => Json(FrameOut::from(f)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn current(State(state): State<AppState>) -> Response {
    frame_response(state.controller.frame())
}

async fn next(State(state): State<AppState>) -> Response {
    frame_response(state.controller.next())
}

async fn previous(State(state): State<AppState>) -> Response {
    frame_response(state.controller.previous())
}

async fn toggle(State(state): State<AppState>) -> Response {
    frame_response(state.controller.toggle_play())
}

#[derive(Serialize)]
struct Accepted {
    section: Section,
    generation: u64,
}

async fn activate(State(state): State<AppState>, Path(raw): Path<String>) -> Response {
    let section: Section = match raw.parse() {
        Ok(s) => s,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    // The fetch runs detached; clients poll GET /carousel.
    drop(state.controller.activate(section));
    let generation = state.controller.generation();
    (StatusCode::ACCEPTED, Json(Accepted { section, generation })).into_response()
}

async fn refresh(State(state): State<AppState>) -> Response {
    if state.controller.refresh().is_none() {
        return (StatusCode::CONFLICT, "no active section").into_response();
    }
    let generation = state.controller.generation();
    match state.controller.active_section() {
        Some(section) => (StatusCode::ACCEPTED, Json(Accepted { section, generation })).into_response(),
        // deactivated in between
        None => (StatusCode::CONFLICT, "no active section").into_response(),
    }
}

async fn deactivate(State(state): State<AppState>) -> StatusCode {
    state.controller.deactivate();
    StatusCode::NO_CONTENT
}
