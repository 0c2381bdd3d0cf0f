use super::common::{created_response, success_response};
use crate::{
    errors::ServiceError,
    handlers::AppState,
    services::crates::{CrateDraft, CrateRecord},
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;

/// JSON create payload. `weight` may arrive as a number or a string (both are
/// accepted at the wire and validated in the service).
#[derive(Debug, Deserialize)]
pub struct CreateCrateRequest {
    pub run_number: Option<String>,
    pub puc: Option<String>,
    pub farm_name: Option<String>,
    pub commodity: Option<String>,
    pub variety: Option<String>,
    pub grade_class: Option<String>,
    pub size: Option<String>,
    pub weight: Option<Value>,
    pub date_received: Option<String>,
    pub inspector_notes: Option<String>,
}

impl CreateCrateRequest {
    fn into_draft(self) -> Result<CrateDraft, ServiceError> {
        let weight = match self.weight {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(other) => {
                return Err(ServiceError::ValidationError(format!(
                    "weight must be a number, got {}",
                    other
                )))
            }
        };

        Ok(CrateDraft {
            run_number: self.run_number,
            puc: self.puc,
            farm_name: self.farm_name,
            commodity: self.commodity,
            variety: self.variety,
            grade_class: self.grade_class,
            size: self.size,
            weight,
            date_received: self.date_received,
            inspector_notes: self.inspector_notes,
        })
    }
}

/// GET /api/crates — every record, newest id first
pub async fn list_crates(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let crates = state.services.crates.list_all().await?;
    let records: Vec<CrateRecord> = crates.into_iter().map(CrateRecord::from).collect();
    Ok(success_response(records))
}

/// POST /api/crates — create a record, 201 with the stored serialization
pub async fn create_crate(
    State(state): State<AppState>,
    Json(payload): Json<CreateCrateRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let draft = payload.into_draft()?;
    let record = state.services.crates.create(draft).await?;
    Ok(created_response(CrateRecord::from(record)))
}
