//! Hydrate books with their genres and role-qualified contributors.

use std::collections::HashMap;

use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

use super::models::{Book, BookResponse, ContributorCredit, GenreSummary, Role};
use crate::error::CatalogResult;
use crate::utils::decode_id;

#[derive(Debug, FromRow)]
struct GenreLinkRow {
    book_id: String,
    id: String,
    name: String,
}

#[derive(Debug, FromRow)]
struct CreditRow {
    book_id: String,
    id: String,
    full_name: String,
    role: String,
}

/// Attach relations to every book, keeping the input order.
///
/// Issues one query per relation for the whole batch.
pub(crate) async fn assemble(
    conn: &mut SqliteConnection,
    books: Vec<Book>,
) -> CatalogResult<Vec<BookResponse>> {
    if books.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<String> = books.iter().map(|book| book.id.to_string()).collect();

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT bg.book_id AS book_id, g.id AS id, g.name AS name \
         FROM book_genre bg JOIN genre g ON g.id = bg.genre_id WHERE bg.book_id IN (",
    );
    push_id_list(&mut qb, &ids);
    qb.push(") ORDER BY g.name_key, g.id");
    let genre_rows: Vec<GenreLinkRow> = qb.build_query_as().fetch_all(&mut *conn).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT bc.book_id AS book_id, c.id AS id, c.full_name AS full_name, bc.role AS role \
         FROM book_contributor bc JOIN contributor c ON c.id = bc.contributor_id WHERE bc.book_id IN (",
    );
    push_id_list(&mut qb, &ids);
    qb.push(") ORDER BY c.full_name, c.id, bc.role");
    let credit_rows: Vec<CreditRow> = qb.build_query_as().fetch_all(&mut *conn).await?;

    let mut genres: HashMap<String, Vec<GenreSummary>> = HashMap::new();
    for row in genre_rows {
        genres.entry(row.book_id).or_default().push(GenreSummary {
            id: decode_id(&row.id)?,
            name: row.name,
        });
    }

    let mut credits: HashMap<String, Vec<ContributorCredit>> = HashMap::new();
    for row in credit_rows {
        credits.entry(row.book_id).or_default().push(ContributorCredit {
            id: decode_id(&row.id)?,
            full_name: row.full_name,
            role: row.role.parse::<Role>()?,
        });
    }

    Ok(books
        .into_iter()
        .zip(ids)
        .map(|(book, id)| {
            let book_genres = genres.remove(&id).unwrap_or_default();
            let book_credits = credits.remove(&id).unwrap_or_default();
            BookResponse::new(book, book_genres, book_credits)
        })
        .collect())
}

pub(crate) async fn assemble_one(conn: &mut SqliteConnection, book: Book) -> CatalogResult<BookResponse> {
    let mut hydrated = assemble(conn, vec![book]).await?;
    hydrated
        .pop()
        .ok_or_else(|| anyhow::anyhow!("assembled book went missing").into())
}

fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[String]) {
    let mut list = qb.separated(", ");
    for id in ids {
        list.push_bind(id.clone());
    }
}
