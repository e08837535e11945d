//! Row-level book statements. Callers own the transaction.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use time::OffsetDateTime;
use uuid::Uuid;

use super::models::{Book, BookRow, UpdateBook};
use crate::error::{on_unique_violation, CatalogError, CatalogResult, EntityKind};
use crate::utils::{fold_case, normalize_key};
use crate::utils::timestamp::to_micros;

/// Book columns aliased for `BookRow`, selecting from `book b`.
pub(crate) const BOOK_COLUMNS: &str = "b.id AS id, b.title AS title, b.rating AS rating, \
     b.description AS description, b.published_year AS published_year, \
     b.created_at AS created_at, b.updated_at AS updated_at";

pub(crate) fn duplicate_title(title: &str) -> CatalogError {
    CatalogError::Duplicate {
        entity: EntityKind::Book,
        field: "title",
        value: title.to_string(),
    }
}

pub(crate) async fn fetch_book(conn: &mut SqliteConnection, id: Uuid) -> CatalogResult<Option<Book>> {
    let sql = format!("SELECT {} FROM book b WHERE b.id = ?", BOOK_COLUMNS);
    let row: Option<BookRow> = sqlx::query_as(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    row.map(Book::try_from).transpose()
}

pub(crate) async fn book_exists(conn: &mut SqliteConnection, id: Uuid) -> CatalogResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM book WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// Whether another book already holds this normalized title.
pub(crate) async fn title_taken(
    conn: &mut SqliteConnection,
    title_key: &str,
    exclude: Option<Uuid>,
) -> CatalogResult<bool> {
    let holder: Option<String> = sqlx::query_scalar("SELECT id FROM book WHERE title_key = ?")
        .bind(title_key)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(match (holder, exclude) {
        (None, _) => false,
        (Some(holder), Some(own)) => holder != own.to_string(),
        (Some(_), None) => true,
    })
}

pub(crate) async fn insert_book(conn: &mut SqliteConnection, book: &Book) -> CatalogResult<()> {
    sqlx::query(
        "INSERT INTO book (id, title, title_key, rating, description, description_key, published_year, \
         created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(book.id.to_string())
    .bind(&book.title)
    .bind(normalize_key(&book.title))
    .bind(book.rating)
    .bind(book.description.as_deref())
    .bind(book.description.as_deref().map(fold_case))
    .bind(book.published_year)
    .bind(to_micros(book.created_at))
    .bind(to_micros(book.updated_at))
    .execute(&mut *conn)
    .await
    .map_err(|e| on_unique_violation(e, || duplicate_title(&book.title)))?;
    Ok(())
}

/// Write the supplied scalar fields and bump `updated_at`.
pub(crate) async fn update_book(
    conn: &mut SqliteConnection,
    id: Uuid,
    changes: &UpdateBook,
    updated_at: OffsetDateTime,
) -> CatalogResult<()> {
    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE book SET updated_at = ");
    qb.push_bind(to_micros(updated_at));

    if let Some(title) = changes.new_title() {
        qb.push(", title = ").push_bind(title.to_string());
        qb.push(", title_key = ").push_bind(normalize_key(title));
    }
    if let Some(rating) = changes.rating {
        qb.push(", rating = ").push_bind(rating);
    }
    if let Some(description) = &changes.description {
        qb.push(", description = ").push_bind(description.clone());
        qb.push(", description_key = ")
            .push_bind(description.as_deref().map(fold_case));
    }
    if let Some(published_year) = changes.published_year {
        qb.push(", published_year = ").push_bind(published_year);
    }
    qb.push(" WHERE id = ").push_bind(id.to_string());

    qb.build()
        .execute(&mut *conn)
        .await
        .map_err(|e| on_unique_violation(e, || duplicate_title(changes.new_title().unwrap_or_default())))?;
    Ok(())
}

pub(crate) async fn delete_book(conn: &mut SqliteConnection, id: Uuid) -> CatalogResult<()> {
    sqlx::query("DELETE FROM book WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}
