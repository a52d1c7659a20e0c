use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::history::{grouped_history, HistoryPeriod};
use crate::models::HistoryDay;
use crate::AppState;

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    period: HistoryPeriod,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/history", get(get_history))
        .with_state(state)
}

async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryDay>>, ApiError> {
    let history = state.store.load_history().await?;
    Ok(Json(grouped_history(&history, query.period, state.clock.now())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HistoryEntry;
    use crate::routes::test_support::{body_json, state_at};
    use crate::store::tests::sample_medication;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{DateTime, TimeZone, Utc};
    use tower::ServiceExt;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
    }

    async fn seeded_app(now: DateTime<Utc>) -> Router {
        let state = state_at(now);
        let med = sample_medication(1, "Paracetamol", at(1, 0));
        for date in [at(2, 8), at(10, 8), at(10, 16)] {
            state
                .store
                .append_history(HistoryEntry {
                    date,
                    medication: med.clone(),
                    taken: true,
                })
                .await
                .unwrap();
        }
        routes(state)
    }

    #[tokio::test]
    async fn test_grouped_descending() {
        let app = seeded_app(at(12, 0)).await;
        let req = Request::builder().uri("/history").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let days = body_json(resp.into_body()).await;
        let days = days.as_array().unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0]["date"], "2024-01-10");
        assert_eq!(days[0]["entries"].as_array().unwrap().len(), 2);
        assert_eq!(days[0]["entries"][0]["doseUnit"], "mg");
        assert_eq!(days[1]["date"], "2024-01-02");
    }

    #[tokio::test]
    async fn test_period_filter() {
        let app = seeded_app(at(12, 0)).await;
        let req = Request::builder()
            .uri("/history?period=week")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let days = body_json(resp.into_body()).await;
        assert_eq!(days.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_period_rejected() {
        let app = seeded_app(at(12, 0)).await;
        let req = Request::builder()
            .uri("/history?period=decade")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
