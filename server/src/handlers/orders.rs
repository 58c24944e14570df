//! Order document handlers.
//!
//! Documents are keyed by the id the client assigned, never by a server key,
//! so every device addresses the same logical order.

use crate::db::Repository;
use crate::error::{AppError, Result};
use repairdesk_engine::OrderRecord;

/// Store a new order. Fails with 409 when the id exists.
pub async fn create_order(repo: &dyn Repository, order: OrderRecord) -> Result<OrderRecord> {
    order.validate()?;

    if !repo.insert_order(&order).await? {
        return Err(AppError::Conflict(order.id));
    }

    tracing::debug!(id = %order.id, "order created");
    Ok(order)
}

pub async fn get_order(repo: &dyn Repository, id: &str) -> Result<OrderRecord> {
    repo.get_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound(id.to_string()))
}

/// Replace an existing order. The body's id must match the path.
pub async fn replace_order(repo: &dyn Repository, id: &str, order: OrderRecord) -> Result<OrderRecord> {
    if order.id != id {
        return Err(AppError::BadRequest(format!(
            "body id {} does not match path id {}",
            order.id, id
        )));
    }
    order.validate()?;

    if !repo.replace_order(&order).await? {
        return Err(AppError::NotFound(order.id));
    }

    tracing::debug!(id = %order.id, "order replaced");
    Ok(order)
}

pub async fn delete_order(repo: &dyn Repository, id: &str) -> Result<()> {
    if !repo.delete_order(id).await? {
        return Err(AppError::NotFound(id.to_string()));
    }
    tracing::debug!(id = %id, "order deleted");
    Ok(())
}

pub async fn list_orders(repo: &dyn Repository) -> Result<Vec<OrderRecord>> {
    repo.list_orders().await
}
