use shelf_db::{begin_write, Database};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::models::{CreateGenre, Genre, GenreRow};
use crate::error::{on_unique_violation, CatalogError, CatalogResult, EntityKind};
use crate::utils::timestamp::{self, to_micros};
use crate::utils::{contains_pattern, new_id, normalize_key};

const GENRE_COLUMNS: &str = "id, name, created_at, updated_at";

/// Genre persistence and lookups.
#[derive(Debug, Clone)]
pub struct GenreCatalog {
    pool: SqlitePool,
}

impl GenreCatalog {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    pub async fn create(&self, input: CreateGenre) -> CatalogResult<Genre> {
        let name = input.validate()?;
        let key = normalize_key(&name);

        let mut tx = begin_write(&self.pool).await?;

        let taken: Option<String> = sqlx::query_scalar("SELECT id FROM genre WHERE name_key = ?")
            .bind(&key)
            .fetch_optional(&mut *tx)
            .await?;
        if taken.is_some() {
            return Err(duplicate_name(&name));
        }

        let now = timestamp::now();
        let genre = Genre {
            id: new_id(),
            name,
            created_at: now,
            updated_at: now,
        };
        insert_genre(&mut tx, &genre).await?;
        tx.commit().await?;

        tracing::info!(genre_id = %genre.id, name = %genre.name, "genre created");
        Ok(genre)
    }

    /// All genres ordered by name, optionally narrowed to names containing `q`.
    pub async fn list(&self, q: Option<&str>) -> CatalogResult<Vec<Genre>> {
        let needle = q.map(normalize_key).filter(|needle| !needle.is_empty());

        let rows: Vec<GenreRow> = match needle {
            Some(needle) => {
                let sql = format!(
                    r"SELECT {} FROM genre WHERE name_key LIKE ? ESCAPE '\' ORDER BY name_key, id",
                    GENRE_COLUMNS
                );
                sqlx::query_as(&sql)
                    .bind(contains_pattern(&needle))
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("SELECT {} FROM genre ORDER BY name_key, id", GENRE_COLUMNS);
                sqlx::query_as(&sql).fetch_all(&self.pool).await?
            }
        };

        rows.into_iter().map(Genre::try_from).collect()
    }

    pub async fn get(&self, id: Uuid) -> CatalogResult<Genre> {
        let mut conn = self.pool.acquire().await?;
        fetch_genre(&mut conn, id)
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityKind::Genre, id))
    }
}

pub(crate) async fn fetch_genre(conn: &mut SqliteConnection, id: Uuid) -> CatalogResult<Option<Genre>> {
    let sql = format!("SELECT {} FROM genre WHERE id = ?", GENRE_COLUMNS);
    let row: Option<GenreRow> = sqlx::query_as(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    row.map(Genre::try_from).transpose()
}

pub(crate) async fn insert_genre(conn: &mut SqliteConnection, genre: &Genre) -> CatalogResult<()> {
    sqlx::query(
        "INSERT INTO genre (id, name, name_key, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(genre.id.to_string())
    .bind(&genre.name)
    .bind(normalize_key(&genre.name))
    .bind(to_micros(genre.created_at))
    .bind(to_micros(genre.updated_at))
    .execute(&mut *conn)
    .await
    .map_err(|e| on_unique_violation(e, || duplicate_name(&genre.name)))?;
    Ok(())
}

fn duplicate_name(name: &str) -> CatalogError {
    CatalogError::Duplicate {
        entity: EntityKind::Genre,
        field: "name",
        value: name.to_string(),
    }
}
