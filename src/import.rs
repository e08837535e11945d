//! Bulk genre upsert from CSV or JSON files.
//!
//! Records are matched on id first, then on case-insensitive name; anything
//! unmatched is inserted. Batches commit as one transaction and fall back to
//! one transaction per record when a batch fails.

use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;
use shelf_db::{begin_write, Database};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::{on_unique_violation, CatalogError, CatalogResult, EntityKind};
use crate::utils::timestamp::{self, to_micros};
use crate::utils::validation::{Validator, GENRE_NAME_MAX_CHARS};
use crate::utils::normalize_key;

/// One raw input record; either field may be missing.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct GenreRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct ValidGenre {
    id: Uuid,
    name: String,
}

impl GenreRecord {
    fn validate(&self) -> Result<ValidGenre, String> {
        let raw_id = self
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or("missing id")?;
        let id = Uuid::parse_str(raw_id).map_err(|_| format!("invalid uuid '{}'", raw_id))?;

        let raw_name = self.name.as_deref().ok_or("missing name")?;
        let mut v = Validator::new();
        let name = v.required_text("name", raw_name, GENRE_NAME_MAX_CHARS);
        if !v.is_empty() {
            return Err(format!("invalid name '{}'", raw_name));
        }

        Ok(ValidGenre { id, name })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Upsert {
    Created,
    Updated,
    Rekeyed,
}

/// Counters reported after an import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub read: usize,
    pub valid: usize,
    pub skipped: usize,
    pub created: usize,
    pub updated: usize,
    pub rekeyed: usize,
    pub failed: usize,
}

impl ImportStats {
    fn record(&mut self, outcome: Upsert) {
        match outcome {
            Upsert::Created => self.created += 1,
            Upsert::Updated => self.updated += 1,
            Upsert::Rekeyed => self.rekeyed += 1,
        }
    }
}

/// Read genre records from a `.csv` (header `id,name`) or `.json` (array) file.
pub fn read_records(path: &Path) -> anyhow::Result<Vec<GenreRecord>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let records = match extension.as_deref() {
        Some("csv") => {
            let mut reader = csv::Reader::from_path(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            reader
                .deserialize()
                .collect::<Result<Vec<GenreRecord>, _>>()
                .with_context(|| format!("failed to parse CSV file {}", path.display()))?
        }
        Some("json") => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let values: Vec<serde_json::Value> = serde_json::from_str(&text)
                .with_context(|| format!("{} should contain a JSON array of genres", path.display()))?;
            values
                .into_iter()
                .map(|value| {
                    serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                        tracing::warn!(error = %e, record = %value, "unreadable genre record");
                        GenreRecord::default()
                    })
                })
                .collect()
        }
        _ => bail!(
            "unsupported file format for {}; use .csv or .json",
            path.display()
        ),
    };

    tracing::info!(count = records.len(), file = %path.display(), "genre records read");
    Ok(records)
}

pub struct GenreImporter {
    pool: SqlitePool,
    batch_size: usize,
}

impl GenreImporter {
    pub fn new(db: &Database, batch_size: usize) -> Self {
        Self {
            pool: db.pool().clone(),
            batch_size: batch_size.max(1),
        }
    }

    pub async fn import_file(&self, path: &Path) -> anyhow::Result<ImportStats> {
        let records = read_records(path)?;
        Ok(self.import_records(&records).await)
    }

    /// Upsert every valid record. Per-record failures are logged and counted,
    /// never returned.
    pub async fn import_records(&self, records: &[GenreRecord]) -> ImportStats {
        let mut stats = ImportStats {
            read: records.len(),
            ..Default::default()
        };

        let mut valid = Vec::with_capacity(records.len());
        for record in records {
            match record.validate() {
                Ok(genre) => valid.push(genre),
                Err(reason) => {
                    tracing::warn!(?record, %reason, "skipping invalid genre record");
                    stats.skipped += 1;
                }
            }
        }
        stats.valid = valid.len();
        tracing::info!(valid = stats.valid, read = stats.read, "genre records validated");

        for (index, batch) in valid.chunks(self.batch_size).enumerate() {
            let first = index * self.batch_size + 1;
            let last = first + batch.len() - 1;

            match self.import_batch(batch).await {
                Ok(outcomes) => {
                    for outcome in outcomes {
                        stats.record(outcome);
                    }
                    tracing::info!(first, last, "genre batch committed");
                }
                Err(e) => {
                    tracing::warn!(first, last, error = %e, "genre batch failed, retrying records one by one");
                    let mut succeeded = 0;
                    for genre in batch {
                        match self.import_one(genre).await {
                            Ok(outcome) => {
                                stats.record(outcome);
                                succeeded += 1;
                            }
                            Err(e) => {
                                tracing::error!(genre_id = %genre.id, name = %genre.name, error = %e, "failed to import genre");
                                stats.failed += 1;
                            }
                        }
                    }
                    tracing::info!(first, last, succeeded, "genre batch processed record by record");
                }
            }
        }

        tracing::info!(?stats, "genre import finished");
        stats
    }

    async fn import_batch(&self, batch: &[ValidGenre]) -> CatalogResult<Vec<Upsert>> {
        let mut tx = begin_write(&self.pool).await?;
        let mut outcomes = Vec::with_capacity(batch.len());
        for genre in batch {
            outcomes.push(upsert_genre(&mut tx, genre).await?);
        }
        tx.commit().await?;
        Ok(outcomes)
    }

    async fn import_one(&self, genre: &ValidGenre) -> CatalogResult<Upsert> {
        let mut tx = begin_write(&self.pool).await?;
        let outcome = upsert_genre(&mut tx, genre).await?;
        tx.commit().await?;
        Ok(outcome)
    }
}

async fn upsert_genre(conn: &mut SqliteConnection, genre: &ValidGenre) -> CatalogResult<Upsert> {
    let id = genre.id.to_string();
    let key = normalize_key(&genre.name);
    let now = to_micros(timestamp::now());
    let duplicate = || CatalogError::Duplicate {
        entity: EntityKind::Genre,
        field: "name",
        value: genre.name.clone(),
    };

    let renamed = sqlx::query("UPDATE genre SET name = ?, name_key = ?, updated_at = ? WHERE id = ?")
        .bind(&genre.name)
        .bind(&key)
        .bind(now)
        .bind(&id)
        .execute(&mut *conn)
        .await
        .map_err(|e| on_unique_violation(e, duplicate))?;
    if renamed.rows_affected() > 0 {
        tracing::debug!(genre_id = %id, "genre renamed by id");
        return Ok(Upsert::Updated);
    }

    let rekeyed = sqlx::query("UPDATE genre SET id = ?, updated_at = ? WHERE name_key = ?")
        .bind(&id)
        .bind(now)
        .bind(&key)
        .execute(&mut *conn)
        .await?;
    if rekeyed.rows_affected() > 0 {
        tracing::debug!(genre_id = %id, name = %genre.name, "genre re-keyed by name");
        return Ok(Upsert::Rekeyed);
    }

    sqlx::query(
        "INSERT INTO genre (id, name, name_key, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&genre.name)
    .bind(&key)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| on_unique_violation(e, duplicate))?;

    tracing::debug!(genre_id = %id, "genre created");
    Ok(Upsert::Created)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::modules::books::{BookCatalog, CreateBook};
    use crate::modules::genres::{CreateGenre, GenreCatalog};
    use crate::testing::{add_genre, catalog_db};

    fn record(id: &str, name: &str) -> GenreRecord {
        GenreRecord {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
        }
    }

    #[tokio::test]
    async fn matches_by_id_then_name_then_inserts() {
        let db = catalog_db().await;
        let horror = add_genre(&db, "Horror").await;
        let thriller = add_genre(&db, "Thriller").await;
        let new_thriller_id = Uuid::now_v7();
        let poetry_id = Uuid::now_v7();

        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "id,name").unwrap();
        writeln!(file, "{},Horror Classics", horror).unwrap();
        writeln!(file, "{},thriller", new_thriller_id).unwrap();
        writeln!(file, "{},Poetry", poetry_id).unwrap();
        writeln!(file, "not-a-uuid,Broken").unwrap();
        file.flush().unwrap();

        let stats = GenreImporter::new(&db, 100)
            .import_file(file.path())
            .await
            .unwrap();

        assert_eq!(
            stats,
            ImportStats {
                read: 4,
                valid: 3,
                skipped: 1,
                created: 1,
                updated: 1,
                rekeyed: 1,
                failed: 0,
            }
        );

        let genres = GenreCatalog::new(&db);
        assert_eq!(genres.get(horror).await.unwrap().name, "Horror Classics");
        assert_eq!(genres.get(new_thriller_id).await.unwrap().name, "Thriller");
        assert!(genres.get(thriller).await.is_err());
        assert_eq!(genres.get(poetry_id).await.unwrap().name, "Poetry");
    }

    #[tokio::test]
    async fn rekey_carries_book_links() {
        let db = catalog_db().await;
        let old_id = add_genre(&db, "Horror").await;
        let books = BookCatalog::new(&db);
        let book = books
            .create(CreateBook {
                title: "It".into(),
                genre_ids: Some(vec![old_id]),
                ..Default::default()
            })
            .await
            .unwrap();

        let new_id = Uuid::now_v7();
        let stats = GenreImporter::new(&db, 10)
            .import_records(&[record(&new_id.to_string(), "HORROR")])
            .await;
        assert_eq!(stats.rekeyed, 1);

        let fetched = books.get(book.id).await.unwrap();
        assert_eq!(fetched.genres[0].id, new_id);
    }

    #[tokio::test]
    async fn failing_record_does_not_void_its_batch() {
        let db = catalog_db().await;
        let horror = add_genre(&db, "Horror").await;
        add_genre(&db, "Drama").await;
        let fresh = Uuid::now_v7();

        // Renaming Horror to Drama collides with the existing Drama.
        let stats = GenreImporter::new(&db, 10)
            .import_records(&[
                record(&fresh.to_string(), "Satire"),
                record(&horror.to_string(), "drama"),
            ])
            .await;

        assert_eq!(stats.created, 1);
        assert_eq!(stats.failed, 1);
        let genres = GenreCatalog::new(&db);
        assert_eq!(genres.get(fresh).await.unwrap().name, "Satire");
        assert_eq!(genres.get(horror).await.unwrap().name, "Horror");
    }

    #[tokio::test]
    async fn reads_json_arrays_and_skips_incomplete_records() {
        let db = catalog_db().await;
        let id = Uuid::now_v7();

        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"id": "{}", "name": "Mystery"}}, {{"name": "No Id"}}, {{"id": "{}"}}, 42]"#,
            id,
            Uuid::now_v7()
        )
        .unwrap();
        file.flush().unwrap();

        let stats = GenreImporter::new(&db, 1)
            .import_file(file.path())
            .await
            .unwrap();

        assert_eq!((stats.read, stats.valid, stats.skipped, stats.created), (4, 1, 3, 1));
        let genres = GenreCatalog::new(&db);
        assert_eq!(genres.get(id).await.unwrap().name, "Mystery");
        assert!(genres
            .create(CreateGenre {
                name: "mystery".into()
            })
            .await
            .is_err());
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
        assert!(read_records(file.path()).is_err());
    }
}
