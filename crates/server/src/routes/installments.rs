use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::models::Installment,
    error::{AppError, Result},
    middleware::auth::Session,
    services::installments::{InstallmentLedger, NewInstallment, SlipUpload},
    AppState,
};

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/:id/installments",
            get(list_installments).post(schedule_installments),
        )
        .route(
            "/:id/installments/:installment_id/slip",
            post(upload_slip).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}

#[derive(Debug, Serialize)]
pub struct InstallmentListResponse {
    pub installments: Vec<Installment>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub installments: Vec<NewInstallment>,
}

#[derive(Debug, Deserialize)]
pub struct SlipPathParams {
    pub id: String,
    pub installment_id: String,
}

async fn list_installments(
    State(state): State<AppState>,
    session: Session,
    Path(project_id): Path<String>,
) -> Result<Json<InstallmentListResponse>> {
    let installments = InstallmentLedger::list(&state.db.pool, &session, &project_id).await?;
    Ok(Json(InstallmentListResponse { installments }))
}

async fn schedule_installments(
    State(state): State<AppState>,
    session: Session,
    Path(project_id): Path<String>,
    Json(body): Json<ScheduleRequest>,
) -> Result<Json<InstallmentListResponse>> {
    let installments =
        InstallmentLedger::schedule(&state.db.pool, &session, &project_id, &body.installments)
            .await?;
    Ok(Json(InstallmentListResponse { installments }))
}

async fn upload_slip(
    State(state): State<AppState>,
    session: Session,
    Path(params): Path<SlipPathParams>,
    mut multipart: Multipart,
) -> Result<Json<Installment>> {
    let mut slip = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read multipart", e))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::Validation("Missing filename".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error("Failed to read file", e))?;

        slip = Some(SlipUpload {
            filename,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let slip = slip.ok_or_else(|| AppError::Validation("No slip file uploaded".to_string()))?;

    let installment = InstallmentLedger::record_payment(
        &state.db.pool,
        state.blobs.as_ref(),
        &session,
        &params.id,
        &params.installment_id,
        slip,
    )
    .await?;

    Ok(Json(installment))
}

fn multipart_error(context: &str, err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("Slip exceeds the upload size limit: {err}"))
    } else {
        AppError::Validation(format!("{context}: {err}"))
    }
}
