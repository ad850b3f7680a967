//! Dashboard read endpoints: clock, weather, calendar

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use super::ApiState;
use crate::assistant::AssistantStatus;
use crate::calendar::{CalendarCell, CalendarMonth};
use crate::clock::ClockReading;
use crate::environment::EnvironmentSnapshot;
use crate::inference::EngineStatus;

/// Build dashboard router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/calendar", get(calendar))
        .with_state(state)
}

/// Month grid with its cells laid out
#[derive(Debug, Serialize)]
pub struct CalendarView {
    #[serde(flatten)]
    pub month: CalendarMonth,
    pub cells: Vec<CalendarCell>,
}

impl From<CalendarMonth> for CalendarView {
    fn from(month: CalendarMonth) -> Self {
        let cells = month.cells();
        Self { month, cells }
    }
}

/// Everything the dashboard page renders
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub clock: ClockReading,
    pub weather: EnvironmentSnapshot,
    pub calendar: CalendarView,
    pub assistant: AssistantStatus,
    pub engine: EngineStatus,
}

async fn dashboard(State(state): State<Arc<ApiState>>) -> Json<DashboardResponse> {
    Json(DashboardResponse {
        clock: state.clock.borrow().clone(),
        weather: state.snapshot.current(),
        calendar: CalendarMonth::current().into(),
        assistant: state.assistant.status(),
        engine: state.engine.borrow().clone(),
    })
}

async fn calendar() -> Json<CalendarView> {
    Json(CalendarMonth::current().into())
}
