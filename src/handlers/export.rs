use crate::{errors::ServiceError, handlers::AppState};
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

/// GET /export/csv — all records as a downloadable attachment
pub async fn export_csv(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let export = state.services.crates.export_csv().await?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export.filename),
        ),
    ];

    Ok((headers, export.body).into_response())
}
