use axum::{
    extract::{Query, State},
    Json,
};
use redb::{ReadableTable, ReadableTableMetadata};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::constants::POINTS_COLLECTION;
use crate::db::{tables, DbError};
use crate::{error::Result, AppError, AppState};

/// Query parameters for admin stats endpoint
#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    /// Admin secret key for authentication
    pub key: String,
}

/// Database statistics response
#[derive(Debug, Serialize)]
pub struct AdminStatsResponse {
    pub account_count: u64,
    pub balance_record_count: u64,
    pub total_points: u64,
    pub active_sessions: usize,
    pub database_size_bytes: u64,
    pub database_size_human: String,
}

/// Format bytes into human-readable string
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Admin stats endpoint
///
/// Returns account and balance statistics for monitoring.
/// Disabled unless `ADMIN_SECRET_KEY` is configured.
///
/// GET /admin/stats?key=<admin_secret_key>
pub async fn admin_stats(
    State(state): State<AppState>,
    Query(params): Query<AdminQuery>,
) -> Result<Json<AdminStatsResponse>> {
    let admin_key = state
        .config
        .admin_secret_key
        .as_ref()
        .ok_or(AppError::Unauthorized)?;

    if params.key != *admin_key {
        tracing::warn!("Invalid admin key attempt");
        return Err(AppError::Unauthorized);
    }

    let database_size_bytes = fs::metadata(&state.config.database_path)
        .map(|m| m.len())
        .unwrap_or(0);

    let db = state.db.clone();
    let (account_count, balance_record_count, total_points) =
        tokio::task::spawn_blocking(move || -> std::result::Result<(u64, u64, u64), DbError> {
            let read_txn = db.begin_read()?;

            let account_count = read_txn.open_table(tables::ACCOUNTS)?.len()?;

            let prefix = tables::document_key(POINTS_COLLECTION, "");
            let documents = read_txn.open_table(tables::DOCUMENTS)?;
            let mut record_count = 0;
            let mut total_points: u64 = 0;
            for entry in documents.range(prefix.as_str()..)? {
                let (key, value) = entry?;
                if !key.value().starts_with(&prefix) {
                    break;
                }
                record_count += 1;
                let doc: serde_json::Value = serde_json::from_slice(value.value())?;
                let points = doc["points"].as_u64().unwrap_or(0);
                total_points = total_points.saturating_add(points);
            }

            Ok((account_count, record_count, total_points))
        })
        .await??;

    tracing::info!(
        "Admin stats requested: {} accounts, {} balance records, {} database",
        account_count,
        balance_record_count,
        format_bytes(database_size_bytes)
    );

    Ok(Json(AdminStatsResponse {
        account_count,
        balance_record_count,
        total_points,
        active_sessions: state.sessions.len(),
        database_size_bytes,
        database_size_human: format_bytes(database_size_bytes),
    }))
}
