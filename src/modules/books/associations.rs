//! Replace-all reconciliation of a book's genre and contributor links.
//!
//! Every referenced id is checked before any link row is touched; a
//! `Reconciliation` only exists once that check passed.

use std::collections::HashSet;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use uuid::Uuid;

use super::models::ContributorLink;
use crate::error::{CatalogError, CatalogResult, EntityKind, MissingReference};
use crate::utils::dedupe;

/// Desired final state of one relation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DesiredLinks {
    Genres(Vec<Uuid>),
    Contributors(Vec<ContributorLink>),
}

impl DesiredLinks {
    pub fn genres(ids: &[Uuid]) -> Self {
        DesiredLinks::Genres(dedupe(ids))
    }

    pub fn contributors(links: &[ContributorLink]) -> Self {
        DesiredLinks::Contributors(dedupe(links))
    }

    fn referenced(&self) -> (EntityKind, Vec<Uuid>) {
        match self {
            DesiredLinks::Genres(ids) => (EntityKind::Genre, ids.clone()),
            DesiredLinks::Contributors(links) => {
                let ids: Vec<Uuid> = links.iter().map(|link| link.contributor_id).collect();
                (EntityKind::Contributor, dedupe(&ids))
            }
        }
    }
}

/// Validated link sets, ready to be written for a book.
#[derive(Debug)]
pub(crate) struct Reconciliation {
    relations: Vec<DesiredLinks>,
}

impl Reconciliation {
    /// Check every referenced genre and contributor, reporting all misses at once.
    pub async fn prepare(
        conn: &mut SqliteConnection,
        relations: Vec<DesiredLinks>,
    ) -> CatalogResult<Self> {
        let mut missing = Vec::new();
        for relation in &relations {
            let (entity, ids) = relation.referenced();
            missing.extend(missing_references(conn, entity, &ids).await?);
        }

        if !missing.is_empty() {
            tracing::warn!(count = missing.len(), "rejecting links to unknown entities");
            return Err(CatalogError::ReferenceNotFound(missing));
        }
        Ok(Self { relations })
    }

    /// Replace the stored link set of each prepared relation.
    pub async fn apply(&self, conn: &mut SqliteConnection, book_id: Uuid) -> CatalogResult<()> {
        for relation in &self.relations {
            replace_links(conn, book_id, relation).await?;
        }
        Ok(())
    }
}

async fn missing_references(
    conn: &mut SqliteConnection,
    entity: EntityKind,
    ids: &[Uuid],
) -> CatalogResult<Vec<MissingReference>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let table = match entity {
        EntityKind::Book => "book",
        EntityKind::Genre => "genre",
        EntityKind::Contributor => "contributor",
    };
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT id FROM {} WHERE id IN (", table));
    let mut list = qb.separated(", ");
    for id in ids {
        list.push_bind(id.to_string());
    }
    list.push_unseparated(")");

    let found: HashSet<String> = qb
        .build_query_scalar::<String>()
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .collect();

    Ok(ids
        .iter()
        .filter(|id| !found.contains(&id.to_string()))
        .map(|&id| MissingReference { entity, id })
        .collect())
}

async fn replace_links(
    conn: &mut SqliteConnection,
    book_id: Uuid,
    desired: &DesiredLinks,
) -> CatalogResult<()> {
    let book = book_id.to_string();

    match desired {
        DesiredLinks::Genres(ids) => {
            sqlx::query("DELETE FROM book_genre WHERE book_id = ?")
                .bind(&book)
                .execute(&mut *conn)
                .await?;
            if ids.is_empty() {
                return Ok(());
            }

            let mut qb = QueryBuilder::<Sqlite>::new("INSERT INTO book_genre (book_id, genre_id) ");
            qb.push_values(ids, |mut row, id| {
                row.push_bind(book.clone()).push_bind(id.to_string());
            });
            qb.build().execute(&mut *conn).await?;
        }
        DesiredLinks::Contributors(links) => {
            sqlx::query("DELETE FROM book_contributor WHERE book_id = ?")
                .bind(&book)
                .execute(&mut *conn)
                .await?;
            if links.is_empty() {
                return Ok(());
            }

            let mut qb = QueryBuilder::<Sqlite>::new(
                "INSERT INTO book_contributor (book_id, contributor_id, role) ",
            );
            qb.push_values(links, |mut row, link| {
                row.push_bind(book.clone())
                    .push_bind(link.contributor_id.to_string())
                    .push_bind(link.role.as_str());
            });
            qb.build().execute(&mut *conn).await?;
        }
    }

    tracing::debug!(book_id = %book_id, "book links replaced");
    Ok(())
}

/// Remove every link of a book.
pub(crate) async fn clear_links(conn: &mut SqliteConnection, book_id: Uuid) -> CatalogResult<()> {
    let book = book_id.to_string();
    sqlx::query("DELETE FROM book_genre WHERE book_id = ?")
        .bind(&book)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM book_contributor WHERE book_id = ?")
        .bind(&book)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
