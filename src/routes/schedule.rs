use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::error::ApiError;
use crate::models::{DoseStatus, HistoryEntry, ScheduleEntry};
use crate::scheduler::{build_schedule, dose_status, next_dose_time};
use crate::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/schedule", get(get_schedule))
        .route("/schedule/:id/taken", post(mark_taken))
        .route("/schedule/:id/missed", post(mark_missed))
        .with_state(state)
}

async fn get_schedule(State(state): State<AppState>) -> Result<Json<Vec<ScheduleEntry>>, ApiError> {
    let medications = state.store.load_medications().await?;
    let history = state.store.load_history().await?;

    Ok(Json(build_schedule(&medications, &history, state.clock.now())))
}

async fn mark_taken(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<HistoryEntry>), ApiError> {
    record_dose(&state, id, true).await
}

async fn mark_missed(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<HistoryEntry>), ApiError> {
    record_dose(&state, id, false).await
}

async fn record_dose(
    state: &AppState,
    id: i64,
    taken: bool,
) -> Result<(StatusCode, Json<HistoryEntry>), ApiError> {
    let medications = state.store.load_medications().await?;
    let Some(medication) = medications
        .into_iter()
        .find(|m| m.id == id && m.is_active())
    else {
        return Err(ApiError::not_found(format!("No active medication with id {}", id)));
    };

    let now = state.clock.now();
    let Some(next_dose) = next_dose_time(medication.start_date, medication.frequency_hours, now)
    else {
        return Err(ApiError::unprocessable(format!(
            "Medication {} has no schedulable frequency",
            id
        )));
    };

    let entry = HistoryEntry {
        date: now,
        medication,
        taken,
    };
    let recorded = state
        .store
        .append_history_unless(entry.clone(), |history| {
            dose_status(&entry.medication, next_dose, history) == DoseStatus::Completed
        })
        .await?;
    if !recorded {
        tracing::info!("🚫 Dose of {} due {} already taken", entry.medication.name, next_dose);
        return Err(ApiError::conflict(format!(
            "Dose of medication {} due at {} is already taken",
            id, next_dose
        )));
    }

    tracing::info!(
        "📝 Dose of {} recorded as {}",
        entry.medication.name,
        if taken { "taken" } else { "missed" }
    );
    Ok((StatusCode::CREATED, Json(entry)))
}
