use axum::{extract::State, http::StatusCode, routing::get, Json, Router};

use crate::error::ApiError;
use crate::models::{Medication, MedicationStatus, MedicationSummary, NewMedication};
use crate::scheduler::{
    frequency_label, is_allowed_frequency, next_dose_from_clock, ALLOWED_FREQUENCIES,
};
use crate::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/medications", get(list_active).post(create_medication))
        .with_state(state)
}

async fn list_active(
    State(state): State<AppState>,
) -> Result<Json<Vec<MedicationSummary>>, ApiError> {
    let medications = state.store.load_medications().await?;

    let summaries = medications
        .into_iter()
        .filter(Medication::is_active)
        .filter_map(|medication| {
            let Some(next_dose_time) = next_dose_from_clock(
                medication.start_date,
                medication.frequency_hours,
                &state.clock,
            ) else {
                tracing::warn!(
                    "⚠️ Medication {} has no valid frequency, skipping",
                    medication.id
                );
                return None;
            };
            Some(MedicationSummary {
                next_dose_time,
                frequency_label: frequency_label(medication.frequency_hours),
                dose_label: medication.dose_label(),
                medication,
            })
        })
        .collect();

    Ok(Json(summaries))
}

async fn create_medication(
    State(state): State<AppState>,
    Json(body): Json<NewMedication>,
) -> Result<(StatusCode, Json<Medication>), ApiError> {
    validate(&body).map_err(|msg| {
        tracing::info!("🚫 Rejected medication: {}", msg);
        ApiError::unprocessable(msg)
    })?;

    let now = state.clock.now();
    let medication = state
        .store
        .add_medication(now, |id| Medication {
            id,
            name: body.name.trim().to_string(),
            dose_amount: body.dose_amount.trim().to_string(),
            dose_unit: body.dose_unit,
            frequency_hours: body.frequency_hours,
            start_date: now,
            status: MedicationStatus::Active,
            treatment: body.treatment,
            notes: body.notes.filter(|n| !n.trim().is_empty()),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(medication)))
}

fn validate(body: &NewMedication) -> Result<(), String> {
    if body.name.trim().is_empty() {
        return Err("name is required".into());
    }

    match body.dose_amount.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 => {}
        _ => return Err("doseAmount must be a positive number".into()),
    }

    if !is_allowed_frequency(body.frequency_hours) {
        return Err(format!(
            "frequencyHours must be one of {:?}",
            ALLOWED_FREQUENCIES
        ));
    }

    if matches!(&body.treatment, Some(t) if t.amount == 0) {
        return Err("treatment amount must be positive".into());
    }

    Ok(())
}
