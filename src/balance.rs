//! Balance record operations: fetch-or-create and clamped adjustment.

use serde_json::json;
use thiserror::Error;

use crate::constants::{
    ERR_INIT_USER_DATA, ERR_INVALID_NUMBER, ERR_UPDATE_POINTS, POINTS_COLLECTION, POINTS_FIELD,
};
use crate::models::{Account, PointsRecord};
use crate::store::{DocumentStore, FieldValue, StoreError};

#[derive(Error, Debug)]
pub enum BalanceError {
    #[error("{}", ERR_INVALID_NUMBER)]
    InvalidNumber,

    #[error("{}", ERR_INIT_USER_DATA)]
    Init(#[source] StoreError),

    #[error("Failed to read user data.")]
    Read(#[source] StoreError),

    #[error("{}", ERR_UPDATE_POINTS)]
    Update(#[source] StoreError),
}

/// Parse user input into a signed delta
///
/// Blank input is `Ok(None)`. Otherwise the leading integer is used, so
/// `"12.5"` is 12 and `"7 points"` is 7. Input without leading digits, or a
/// value outside `i64`, is rejected.
pub fn parse_adjustment(input: &str) -> Result<Option<i64>, BalanceError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let sign_len = usize::from(trimmed.starts_with(['+', '-']));
    let digits = trimmed[sign_len..]
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return Err(BalanceError::InvalidNumber);
    }

    trimmed[..sign_len + digits]
        .parse()
        .map(Some)
        .map_err(|_| BalanceError::InvalidNumber)
}

/// `max(0, current + delta)`, saturating at `u64::MAX`
pub fn apply_adjustment(current: u64, delta: i64) -> u64 {
    if delta >= 0 {
        current.saturating_add(delta.unsigned_abs())
    } else {
        current.saturating_sub(delta.unsigned_abs())
    }
}

/// Read the persisted balance for an account, `None` if it has no record
pub async fn read_balance<S: DocumentStore>(
    store: &S,
    uid: &str,
) -> Result<Option<u64>, BalanceError> {
    let doc = store
        .read_document(POINTS_COLLECTION, uid)
        .await
        .map_err(BalanceError::Read)?;

    doc.map(|doc| {
        PointsRecord::from_document(doc)
            .map(|record| record.points)
            .map_err(|e| BalanceError::Read(e.into()))
    })
    .transpose()
}

/// Return the account's balance, creating a zero balance record if absent
///
/// Never touches an existing record. Creation is a single insert-if-absent,
/// so a record written by another session in the meantime is returned as is.
pub async fn ensure_balance_record<S: DocumentStore>(
    store: &S,
    account: &Account,
) -> Result<u64, BalanceError> {
    if let Some(points) = read_balance(store, &account.uid).await? {
        return Ok(points);
    }

    let fields = vec![
        ("email".to_string(), FieldValue::from(json!(account.email))),
        (POINTS_FIELD.to_string(), FieldValue::from(json!(0))),
        ("createdAt".to_string(), FieldValue::ServerTimestamp),
    ];
    let existing = store
        .create_document(POINTS_COLLECTION, &account.uid, fields)
        .await
        .map_err(BalanceError::Init)?;

    match existing {
        Some(doc) => {
            let record = PointsRecord::from_document(doc)
                .map_err(|e| BalanceError::Read(e.into()))?;
            Ok(record.points)
        }
        None => {
            tracing::info!("Balance record created for {}", account.uid);
            Ok(0)
        }
    }
}

/// Apply `delta` to `current` and persist the clamped result
///
/// The write only lands if the stored balance still equals `current`; a
/// balance changed by another session is reported as an update failure.
pub async fn adjust_balance<S: DocumentStore>(
    store: &S,
    uid: &str,
    current: u64,
    delta: i64,
) -> Result<u64, BalanceError> {
    let new_balance = apply_adjustment(current, delta);

    store
        .compare_and_set_field(
            POINTS_COLLECTION,
            uid,
            POINTS_FIELD,
            json!(current),
            json!(new_balance),
        )
        .await
        .map_err(BalanceError::Update)?;

    tracing::info!(
        "Balance for {} adjusted by {}: {} -> {}",
        uid,
        delta,
        current,
        new_balance
    );
    Ok(new_balance)
}
