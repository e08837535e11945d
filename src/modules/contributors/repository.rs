use shelf_db::Database;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::models::{Contributor, ContributorRow, CreateContributor};
use crate::error::{CatalogError, CatalogResult, EntityKind};
use crate::utils::timestamp::{self, to_micros};
use crate::utils::{contains_pattern, new_id, normalize_key};

const CONTRIBUTOR_COLUMNS: &str = "id, full_name, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct ContributorCatalog {
    pool: SqlitePool,
}

impl ContributorCatalog {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Full names are not unique; two people may share one.
    pub async fn create(&self, input: CreateContributor) -> CatalogResult<Contributor> {
        let full_name = input.validate()?;
        let now = timestamp::now();
        let contributor = Contributor {
            id: new_id(),
            full_name,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.pool.acquire().await?;
        insert_contributor(&mut conn, &contributor).await?;

        tracing::info!(contributor_id = %contributor.id, "contributor created");
        Ok(contributor)
    }

    pub async fn list(&self, q: Option<&str>) -> CatalogResult<Vec<Contributor>> {
        let needle = q.map(normalize_key).filter(|needle| !needle.is_empty());

        let rows: Vec<ContributorRow> = match needle {
            Some(needle) => {
                let sql = format!(
                    r"SELECT {} FROM contributor WHERE full_name LIKE ? ESCAPE '\' ORDER BY full_name, id",
                    CONTRIBUTOR_COLUMNS
                );
                sqlx::query_as(&sql)
                    .bind(contains_pattern(&needle))
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM contributor ORDER BY full_name, id",
                    CONTRIBUTOR_COLUMNS
                );
                sqlx::query_as(&sql).fetch_all(&self.pool).await?
            }
        };

        rows.into_iter().map(Contributor::try_from).collect()
    }

    pub async fn get(&self, id: Uuid) -> CatalogResult<Contributor> {
        let sql = format!("SELECT {} FROM contributor WHERE id = ?", CONTRIBUTOR_COLUMNS);
        let row: Option<ContributorRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Contributor::try_from)
            .transpose()?
            .ok_or_else(|| CatalogError::not_found(EntityKind::Contributor, id))
    }
}

pub(crate) async fn insert_contributor(
    conn: &mut SqliteConnection,
    contributor: &Contributor,
) -> CatalogResult<()> {
    sqlx::query(
        "INSERT INTO contributor (id, full_name, created_at, updated_at) VALUES (?, ?, ?, ?)",
    )
    .bind(contributor.id.to_string())
    .bind(&contributor.full_name)
    .bind(to_micros(contributor.created_at))
    .bind(to_micros(contributor.updated_at))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::catalog_db;

    fn person(name: &str) -> CreateContributor {
        CreateContributor {
            full_name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn same_name_may_be_created_twice() {
        let db = catalog_db().await;
        let contributors = ContributorCatalog::new(&db);

        let first = contributors.create(person("Stephen King")).await.unwrap();
        let second = contributors.create(person("Stephen King")).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(contributors.list(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn list_is_ordered_and_filterable() {
        let db = catalog_db().await;
        let contributors = ContributorCatalog::new(&db);
        for name in ["Dan Brown", "Blake Crouch", "Stephen King"] {
            contributors.create(person(name)).await.unwrap();
        }

        let names: Vec<_> = contributors
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.full_name)
            .collect();
        assert_eq!(names, ["Blake Crouch", "Dan Brown", "Stephen King"]);

        let matched = contributors.list(Some("crouch")).await.unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].full_name, "Blake Crouch");
    }

    #[tokio::test]
    async fn get_and_validation() {
        let db = catalog_db().await;
        let contributors = ContributorCatalog::new(&db);

        assert!(matches!(
            contributors.create(person("")).await.unwrap_err(),
            CatalogError::Validation(_)
        ));
        assert!(matches!(
            contributors.get(new_id()).await.unwrap_err(),
            CatalogError::NotFound {
                entity: EntityKind::Contributor,
                ..
            }
        ));

        let created = contributors.create(person(" Dan Brown ")).await.unwrap();
        assert_eq!(created.full_name, "Dan Brown");
        assert_eq!(contributors.get(created.id).await.unwrap(), created);
    }
}
