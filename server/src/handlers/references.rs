//! Service center and service provider handlers.

use crate::db::Repository;
use crate::error::{AppError, Result};
use repairdesk_engine::{ReferenceDetails, ReferenceKind, RemoteReference};
use serde::Serialize;

/// Response for a created reference entity.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

pub async fn list_references(repo: &dyn Repository, kind: ReferenceKind) -> Result<Vec<RemoteReference>> {
    repo.list_references(kind).await
}

/// Store a new entity under a fresh server-assigned id.
pub async fn create_reference(
    repo: &dyn Repository,
    kind: ReferenceKind,
    details: ReferenceDetails,
) -> Result<CreatedResponse> {
    details.validate()?;

    let reference = RemoteReference {
        id: uuid::Uuid::new_v4().simple().to_string(),
        details,
    };
    repo.insert_reference(kind, &reference).await?;

    tracing::debug!(kind = %kind, id = %reference.id, "reference created");
    Ok(CreatedResponse { id: reference.id })
}

pub async fn update_reference(
    repo: &dyn Repository,
    kind: ReferenceKind,
    id: &str,
    details: ReferenceDetails,
) -> Result<RemoteReference> {
    details.validate()?;

    let reference = RemoteReference {
        id: id.to_string(),
        details,
    };
    if !repo.update_reference(kind, &reference).await? {
        return Err(AppError::NotFound(id.to_string()));
    }
    Ok(reference)
}
