use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::utils::validation::{Validator, GENRE_NAME_MAX_CHARS};
use crate::utils::{decode_id, timestamp};

#[derive(Debug, FromRow)]
pub(crate) struct GenreRow {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A genre as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Genre {
    pub id: Uuid,
    pub name: String,
    #[serde(serialize_with = "timestamp::serialize")]
    pub created_at: OffsetDateTime,
    #[serde(serialize_with = "timestamp::serialize")]
    pub updated_at: OffsetDateTime,
}

impl TryFrom<GenreRow> for Genre {
    type Error = CatalogError;

    fn try_from(row: GenreRow) -> CatalogResult<Self> {
        Ok(Self {
            id: decode_id(&row.id)?,
            name: row.name,
            created_at: timestamp::from_micros(row.created_at)?,
            updated_at: timestamp::from_micros(row.updated_at)?,
        })
    }
}

/// Request body for `POST /genres`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGenre {
    pub name: String,
}

impl CreateGenre {
    /// Returns the trimmed name.
    pub fn validate(&self) -> CatalogResult<String> {
        let mut v = Validator::new();
        let name = v.required_text("name", &self.name, GENRE_NAME_MAX_CHARS);
        v.finish()?;
        Ok(name)
    }
}

/// Query string for `GET /genres`.
#[derive(Debug, Default, Deserialize)]
pub struct GenreListParams {
    pub q: Option<String>,
}
