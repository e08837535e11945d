use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::utils::validation::{Validator, FULL_NAME_MAX_CHARS};
use crate::utils::{decode_id, timestamp};

#[derive(Debug, FromRow)]
pub(crate) struct ContributorRow {
    pub id: String,
    pub full_name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A person credited on books. The role lives on each book link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contributor {
    pub id: Uuid,
    pub full_name: String,
    #[serde(serialize_with = "timestamp::serialize")]
    pub created_at: OffsetDateTime,
    #[serde(serialize_with = "timestamp::serialize")]
    pub updated_at: OffsetDateTime,
}

impl TryFrom<ContributorRow> for Contributor {
    type Error = CatalogError;

    fn try_from(row: ContributorRow) -> CatalogResult<Self> {
        Ok(Self {
            id: decode_id(&row.id)?,
            full_name: row.full_name,
            created_at: timestamp::from_micros(row.created_at)?,
            updated_at: timestamp::from_micros(row.updated_at)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateContributor {
    pub full_name: String,
}

impl CreateContributor {
    pub fn validate(&self) -> CatalogResult<String> {
        let mut v = Validator::new();
        let full_name = v.required_text("full_name", &self.full_name, FULL_NAME_MAX_CHARS);
        v.finish()?;
        Ok(full_name)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ContributorListParams {
    pub q: Option<String>,
}
