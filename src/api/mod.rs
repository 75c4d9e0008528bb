use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::TravelEtaError;
use crate::map::MapScene;
use crate::planner::{BoardSnapshot, DeviceFix, EtaPlanner, RouteReport};

type AppState = Arc<EtaPlanner>;

#[derive(Serialize, Deserialize)]
pub struct ApiNode {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
pub struct EstimateQuery {
    pub start: String,
    pub end: String,
}

#[derive(Serialize, Deserialize)]
pub struct EstimateResponse {
    /// False when a newer request took over the display while this one ran
    pub published: bool,
    pub report: RouteReport,
}

/// Error body; `alert` is the text to show the user
#[derive(Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub alert: String,
    pub detail: String,
}

pub struct ApiError(TravelEtaError);

impl From<TravelEtaError> for ApiError {
    fn from(error: TravelEtaError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_user_error() {
            StatusCode::BAD_REQUEST
        } else {
            match &self.0 {
                TravelEtaError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
                TravelEtaError::Api { .. } => StatusCode::BAD_GATEWAY,
                TravelEtaError::Geolocation { .. } => StatusCode::SERVICE_UNAVAILABLE,
                TravelEtaError::GeolocationUnsupported => StatusCode::NOT_IMPLEMENTED,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        };
        let body = ApiErrorBody {
            alert: self.0.user_message(),
            detail: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(planner: Arc<EtaPlanner>) -> Router {
    Router::new()
        .route("/nodes", get(get_nodes))
        .route("/map", get(get_map))
        .route("/estimate", get(get_estimate))
        .route("/display", get(get_display))
        .route("/device-location", get(get_device_location))
        .with_state(planner)
}

async fn get_nodes(State(planner): State<AppState>) -> Json<Vec<ApiNode>> {
    let nodes = planner
        .resolver()
        .nodes()
        .map(|(label, coordinate)| ApiNode {
            label: label.to_string(),
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
        })
        .collect();
    Json(nodes)
}

async fn get_map(State(planner): State<AppState>) -> Json<MapScene> {
    Json(planner.empty_scene())
}

async fn get_estimate(
    State(planner): State<AppState>,
    Query(query): Query<EstimateQuery>,
) -> Result<Json<EstimateResponse>, ApiError> {
    let outcome = planner.run(&query.start, &query.end).await?;
    Ok(Json(EstimateResponse {
        published: outcome.is_published(),
        report: outcome.report().clone(),
    }))
}

async fn get_display(State(planner): State<AppState>) -> Json<Option<BoardSnapshot>> {
    Json(planner.board().snapshot())
}

async fn get_device_location(State(planner): State<AppState>) -> Result<Json<DeviceFix>, ApiError> {
    Ok(Json(planner.locate_device().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TravelEtaError::invalid_node("Z"), StatusCode::BAD_REQUEST)]
    #[case(TravelEtaError::validation("negative distance"), StatusCode::BAD_REQUEST)]
    #[case(TravelEtaError::route_not_found("no candidates"), StatusCode::NOT_FOUND)]
    #[case(TravelEtaError::api("timeout"), StatusCode::BAD_GATEWAY)]
    #[case(TravelEtaError::geolocation("denied"), StatusCode::SERVICE_UNAVAILABLE)]
    #[case(TravelEtaError::GeolocationUnsupported, StatusCode::NOT_IMPLEMENTED)]
    #[case(TravelEtaError::config("bad url"), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_error_status(#[case] error: TravelEtaError, #[case] expected: StatusCode) {
        assert_eq!(error.is_user_error(), expected == StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(error).into_response().status(), expected);
    }
}
