use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::utils::validation::{round_rating, Validator, TITLE_MAX_CHARS};
use crate::utils::{decode_id, double_option, timestamp};

/// How a contributor is credited on a specific book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Author,
    Editor,
    Illustrator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Author => "author",
            Role::Editor => "editor",
            Role::Illustrator => "illustrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "author" => Ok(Role::Author),
            "editor" => Ok(Role::Editor),
            "illustrator" => Ok(Role::Illustrator),
            other => Err(anyhow!("unknown contributor role '{}'", other)),
        }
    }
}

/// One requested (contributor, role) association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContributorLink {
    pub contributor_id: Uuid,
    pub role: Role,
}

#[derive(Debug, FromRow)]
pub(crate) struct BookRow {
    pub id: String,
    pub title: String,
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub published_year: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Book scalars without relations.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub published_year: Option<i32>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<BookRow> for Book {
    type Error = CatalogError;

    fn try_from(row: BookRow) -> CatalogResult<Self> {
        let published_year = row
            .published_year
            .map(i32::try_from)
            .transpose()
            .map_err(|e| CatalogError::Internal(anyhow!("stored published_year out of range: {}", e)))?;

        Ok(Self {
            id: decode_id(&row.id)?,
            title: row.title,
            rating: row.rating,
            description: row.description,
            published_year,
            created_at: timestamp::from_micros(row.created_at)?,
            updated_at: timestamp::from_micros(row.updated_at)?,
        })
    }
}

/// Request body for `POST /books`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBook {
    pub title: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub published_year: Option<i32>,
    #[serde(default)]
    pub genre_ids: Option<Vec<Uuid>>,
    #[serde(default)]
    pub contributors: Option<Vec<ContributorLink>>,
}

impl CreateBook {
    /// Check bounds and normalize: title trimmed, rating at one decimal.
    pub fn validate(mut self) -> CatalogResult<Self> {
        let mut v = Validator::new();
        self.title = v.required_text("title", &self.title, TITLE_MAX_CHARS);
        if let Some(rating) = self.rating {
            v.rating("rating", rating);
        }
        if let Some(year) = self.published_year {
            v.published_year("published_year", year);
        }
        v.finish()?;

        self.rating = self.rating.map(round_rating);
        Ok(self)
    }
}

/// Request body for `PUT /books/{id}`.
///
/// Outer `None` leaves a field untouched; `Some(None)` clears it. Relation
/// lists given as `null` count as absent, an empty list clears the relation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBook {
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub rating: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub published_year: Option<Option<i32>>,
    #[serde(default)]
    pub genre_ids: Option<Vec<Uuid>>,
    #[serde(default)]
    pub contributors: Option<Vec<ContributorLink>>,
}

impl UpdateBook {
    pub fn validate(mut self) -> CatalogResult<Self> {
        let mut v = Validator::new();
        match &self.title {
            Some(Some(title)) => {
                let trimmed = v.required_text("title", title, TITLE_MAX_CHARS);
                self.title = Some(Some(trimmed));
            }
            Some(None) => v.issue("title", "must not be null"),
            None => {}
        }
        if let Some(Some(rating)) = self.rating {
            v.rating("rating", rating);
        }
        if let Some(Some(year)) = self.published_year {
            v.published_year("published_year", year);
        }
        v.finish()?;

        self.rating = self.rating.map(|rating| rating.map(round_rating));
        Ok(self)
    }

    /// New title, when the request sets one.
    pub fn new_title(&self) -> Option<&str> {
        self.title.as_ref().and_then(|title| title.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreSummary {
    pub id: Uuid,
    pub name: String,
}

/// A contributor as credited on one book; repeated once per role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributorCredit {
    pub id: Uuid,
    pub full_name: String,
    pub role: Role,
}

/// A book with its genres and credited contributors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub published_year: Option<i32>,
    pub genres: Vec<GenreSummary>,
    pub contributors: Vec<ContributorCredit>,
    #[serde(serialize_with = "timestamp::serialize")]
    pub created_at: OffsetDateTime,
    #[serde(serialize_with = "timestamp::serialize")]
    pub updated_at: OffsetDateTime,
}

impl BookResponse {
    pub fn new(book: Book, genres: Vec<GenreSummary>, contributors: Vec<ContributorCredit>) -> Self {
        Self {
            id: book.id,
            title: book.title,
            rating: book.rating,
            description: book.description,
            published_year: book.published_year,
            genres,
            contributors,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

/// One page of search results.
#[derive(Debug, Clone, Serialize)]
pub struct BookPage {
    pub items: Vec<BookResponse>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub pages: u64,
}
