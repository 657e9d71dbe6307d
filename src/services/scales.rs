//! Assessment scales and their items.

use serde::Deserialize;
use sqlx::SqliteConnection;
use validator::Validate;

use crate::{
    auth::policy::{authorize, Operation},
    db::Db,
    errors::AppResult,
    middleware::auth_guard::AuthUser,
    models::{Scale, ScaleItem, ScaleWithItems},
    services::require_text,
};

pub const DEFAULT_FIELD_TYPE: &str = "single_choice";

fn default_field_type() -> String {
    DEFAULT_FIELD_TYPE.to_string()
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewScaleItem {
    #[validate(length(min = 1, message = "prompt is required"))]
    pub prompt:     String,
    #[serde(default = "default_field_type")]
    #[validate(length(min = 1, max = 64))]
    pub field_type: String,
    pub options:    Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewScale {
    #[validate(length(min = 1, max = 255, message = "name is required"))]
    pub name:        String,
    pub description: Option<String>,
    /// Opaque to this service; stored and returned as-is.
    pub logic:       Option<String>,
    #[validate(nested)]
    pub items:       Vec<NewScaleItem>,
}

/// Create a scale with all of its items, or nothing.
pub async fn create_scale(pool: &Db, caller: &AuthUser, input: &NewScale) -> AppResult<ScaleWithItems> {
    authorize(caller, Operation::CreateScale)?;
    require_text("name", &input.name)?;
    for item in &input.items {
        require_text("prompt", &item.prompt)?;
    }

    let mut tx = pool.begin().await?;

    let scale = sqlx::query_as::<_, Scale>(
        "INSERT INTO scales (name, description, logic)
         VALUES (?, ?, ?)
         RETURNING id, name, description, logic",
    )
    .bind(&input.name)
    .bind(&input.description)
    .bind(&input.logic)
    .fetch_one(&mut *tx)
    .await?;

    let mut items = Vec::with_capacity(input.items.len());
    for item in &input.items {
        let row = sqlx::query_as::<_, ScaleItem>(
            "INSERT INTO scale_items (scale_id, prompt, field_type, options)
             VALUES (?, ?, ?, ?)
             RETURNING id, scale_id, prompt, field_type, options",
        )
        .bind(scale.id)
        .bind(&item.prompt)
        .bind(&item.field_type)
        .bind(&item.options)
        .fetch_one(&mut *tx)
        .await?;
        items.push(row);
    }

    tx.commit().await?;
    tracing::info!(scale_id = scale.id, items = items.len(), "Created scale");
    Ok(ScaleWithItems { scale, items })
}

/// Load a scale with its items in creation order.
pub(crate) async fn load_scale(conn: &mut SqliteConnection, scale_id: i64) -> AppResult<Option<ScaleWithItems>> {
    let Some(scale) = sqlx::query_as::<_, Scale>(
        "SELECT id, name, description, logic FROM scales WHERE id = ?",
    )
    .bind(scale_id)
    .fetch_optional(&mut *conn)
    .await?
    else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, ScaleItem>(
        "SELECT id, scale_id, prompt, field_type, options
         FROM scale_items
         WHERE scale_id = ?
         ORDER BY id",
    )
    .bind(scale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(ScaleWithItems { scale, items }))
}
