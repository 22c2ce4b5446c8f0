//! Installment ledger: payment milestones and slip-driven payment.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    db::models::{Installment, InstallmentStatus},
    error::{AppError, Result},
    middleware::auth::Session,
    policy::Action,
    services::{
        blobs::{sanitize_filename, BlobStore},
        projects::ProjectRegistry,
    },
};

const COLUMNS: &str =
    "id, project_id, sequence, title, amount, status, due_date, slip_url, paid_at";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInstallment {
    pub sequence: i64,
    pub title: String,
    pub amount: f64,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<InstallmentStatus>,
}

/// An uploaded payment slip.
#[derive(Debug, Clone)]
pub struct SlipUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

pub struct InstallmentLedger;

impl InstallmentLedger {
    /// Installments of a project in `sequence` order.
    pub async fn list(
        pool: &SqlitePool,
        session: &Session,
        project_id: &str,
    ) -> Result<Vec<Installment>> {
        ProjectRegistry::get_authorized(pool, session, project_id, Action::View).await?;
        Self::list_for_project(pool, project_id).await
    }

    pub(crate) async fn list_for_project(
        pool: &SqlitePool,
        project_id: &str,
    ) -> Result<Vec<Installment>> {
        let query =
            format!("SELECT {COLUMNS} FROM installments WHERE project_id = ? ORDER BY sequence ASC");
        let installments = sqlx::query_as::<_, Installment>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await?;
        Ok(installments)
    }

    pub async fn find(
        pool: &SqlitePool,
        project_id: &str,
        installment_id: &str,
    ) -> Result<Option<Installment>> {
        let query = format!("SELECT {COLUMNS} FROM installments WHERE id = ? AND project_id = ?");
        let installment = sqlx::query_as::<_, Installment>(&query)
            .bind(installment_id)
            .bind(project_id)
            .fetch_optional(pool)
            .await?;
        Ok(installment)
    }

    /// Creates a batch of unpaid installments in one transaction.
    pub async fn schedule(
        pool: &SqlitePool,
        session: &Session,
        project_id: &str,
        batch: &[NewInstallment],
    ) -> Result<Vec<Installment>> {
        ProjectRegistry::get_authorized(pool, session, project_id, Action::Administer).await?;

        for item in batch {
            if item.title.trim().is_empty() {
                return Err(AppError::Validation(
                    "Installment title is required".to_string(),
                ));
            }
            if !item.amount.is_finite() || item.amount < 0.0 {
                return Err(AppError::Validation(
                    "Installment amount must be a non-negative number".to_string(),
                ));
            }
            if item.status == Some(InstallmentStatus::Paid) {
                return Err(AppError::Validation(
                    "Installments become paid only through a slip upload".to_string(),
                ));
            }
        }

        let mut tx = pool.begin().await?;
        for item in batch {
            sqlx::query(
                "INSERT INTO installments (id, project_id, sequence, title, amount, status, due_date) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(project_id)
            .bind(item.sequence)
            .bind(item.title.trim())
            .bind(item.amount)
            .bind(item.status.unwrap_or(InstallmentStatus::Pending))
            .bind(item.due_date)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::conflict_on_unique(
                    e,
                    &format!("Installment sequence {} already exists", item.sequence),
                )
            })?;
        }
        tx.commit().await?;

        tracing::info!(project_id, count = batch.len(), "Scheduled installments");
        Self::list_for_project(pool, project_id).await
    }

    /// Stores the slip, then marks the installment paid.
    ///
    /// The blob upload and the row update are separate steps: if the update
    /// fails, the uploaded blob stays behind unreferenced. Repeated uploads
    /// overwrite the slip URL and payment time.
    pub async fn record_payment(
        pool: &SqlitePool,
        blobs: &dyn BlobStore,
        session: &Session,
        project_id: &str,
        installment_id: &str,
        slip: SlipUpload,
    ) -> Result<Installment> {
        ProjectRegistry::get_authorized(pool, session, project_id, Action::RecordPayment).await?;

        if Self::find(pool, project_id, installment_id).await?.is_none() {
            return Err(AppError::NotFound("Installment not found".to_string()));
        }
        if slip.bytes.is_empty() {
            return Err(AppError::Validation("Slip file is empty".to_string()));
        }
        let filename = sanitize_filename(&slip.filename)
            .ok_or_else(|| AppError::Validation("Slip filename is invalid".to_string()))?;

        let key = format!("slips/{project_id}/{installment_id}_{filename}");
        let handle = blobs.upload(&key, &slip.bytes).await?;
        let url = blobs.download_url(&handle);

        let query = format!(
            "UPDATE installments SET slip_url = ?, status = ?, paid_at = ? WHERE id = ? AND project_id = ? RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Installment>(&query)
            .bind(&url)
            .bind(InstallmentStatus::Paid)
            .bind(Utc::now())
            .bind(installment_id)
            .bind(project_id)
            .fetch_optional(pool)
            .await;

        match updated {
            Ok(Some(installment)) => {
                tracing::info!(
                    project_id,
                    installment_id,
                    paid_by = %session.user.id,
                    "Recorded payment"
                );
                Ok(installment)
            }
            Ok(None) => {
                tracing::warn!(key = %key, "Installment vanished after slip upload; blob orphaned");
                Err(AppError::NotFound("Installment not found".to_string()))
            }
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "Payment update failed; blob orphaned");
                Err(err.into())
            }
        }
    }
}
