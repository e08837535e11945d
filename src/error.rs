//! Domain errors for catalog operations and their HTTP mapping.

use std::fmt;

use serde::Serialize;
use serde_json::json;
use shelf_http::error::AppError;
use thiserror::Error;
use uuid::Uuid;

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

/// Catalog entity kinds, used in error payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Book,
    Genre,
    Contributor,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Book => "book",
            EntityKind::Genre => "genre",
            EntityKind::Contributor => "contributor",
        })
    }
}

/// A referenced id with no matching row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MissingReference {
    pub entity: EntityKind,
    pub id: Uuid,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid input ({} issue(s))", .0.len())]
    Validation(Vec<FieldIssue>),

    #[error("malformed identifier '{0}'")]
    InvalidId(String),

    #[error("{entity} with {field} '{value}' already exists")]
    Duplicate {
        entity: EntityKind,
        field: &'static str,
        value: String,
    },

    #[error("{} referenced entities not found", .0.len())]
    ReferenceNotFound(Vec<MissingReference>),

    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: Uuid },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        CatalogError::Validation(vec![FieldIssue {
            field: field.into(),
            message: message.into(),
        }])
    }

    pub fn not_found(entity: EntityKind, id: Uuid) -> Self {
        CatalogError::NotFound { entity, id }
    }
}

/// Map a store unique violation to a domain error, pass anything else through.
pub(crate) fn on_unique_violation(
    err: sqlx::Error,
    duplicate: impl FnOnce() -> CatalogError,
) -> CatalogError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return duplicate();
        }
    }
    CatalogError::Database(err)
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(issues) => AppError::validation(
                issues.iter().map(|issue| json!(issue)).collect(),
                "request validation failed",
            ),
            CatalogError::InvalidId(raw) => AppError::validation(
                vec![json!({ "field": "id", "message": "malformed identifier", "value": raw })],
                "malformed identifier",
            ),
            CatalogError::Duplicate {
                entity,
                field,
                value,
            } => AppError::duplicate(
                vec![json!({ "entity": entity, "field": field, "value": value })],
                format!("{} with this {} already exists", entity, field),
            ),
            CatalogError::ReferenceNotFound(missing) => AppError::reference_not_found(
                missing.iter().map(|reference| json!(reference)).collect(),
                "one or more referenced entities not found",
            ),
            CatalogError::NotFound { entity, .. } => {
                let mut message = entity.to_string();
                message[..1].make_ascii_uppercase();
                AppError::not_found(format!("{} not found", message))
            }
            CatalogError::Database(e) => AppError::Internal(anyhow::Error::new(e)),
            CatalogError::Internal(e) => AppError::Internal(e),
        }
    }
}
