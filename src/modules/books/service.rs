use shelf_db::{begin_write, Database};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::assemble::{assemble, assemble_one};
use super::associations::{clear_links, DesiredLinks, Reconciliation};
use super::models::{Book, BookPage, BookResponse, ContributorLink, CreateBook, UpdateBook};
use super::query::{search_rows, BookSearch};
use super::repository::{
    book_exists, delete_book, duplicate_title, fetch_book, insert_book, title_taken, update_book,
};
use crate::error::{CatalogError, CatalogResult, EntityKind};
use crate::utils::{new_id, normalize_key, timestamp};

/// Book operations. Each call runs in a single transaction.
#[derive(Debug, Clone)]
pub struct BookCatalog {
    pool: SqlitePool,
}

impl BookCatalog {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    pub async fn create(&self, input: CreateBook) -> CatalogResult<BookResponse> {
        let input = input.validate()?;
        let relations = desired_links(input.genre_ids.as_deref(), input.contributors.as_deref());

        let mut tx = begin_write(&self.pool).await?;

        if title_taken(&mut tx, &normalize_key(&input.title), None).await? {
            return Err(duplicate_title(&input.title));
        }
        let links = Reconciliation::prepare(&mut tx, relations).await?;

        let now = timestamp::now();
        let book = Book {
            id: new_id(),
            title: input.title,
            rating: input.rating,
            description: input.description,
            published_year: input.published_year,
            created_at: now,
            updated_at: now,
        };
        insert_book(&mut tx, &book).await?;
        links.apply(&mut tx, book.id).await?;

        let created = assemble_one(&mut tx, book).await?;
        tx.commit().await?;

        tracing::info!(book_id = %created.id, title = %created.title, "book created");
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> CatalogResult<BookResponse> {
        let mut tx = self.pool.begin().await?;
        let book = fetch_book(&mut tx, id)
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityKind::Book, id))?;
        let hydrated = assemble_one(&mut tx, book).await?;
        tx.commit().await?;
        Ok(hydrated)
    }

    /// Apply only the supplied fields; supplied relations are replaced whole.
    pub async fn update(&self, id: Uuid, changes: UpdateBook) -> CatalogResult<BookResponse> {
        let changes = changes.validate()?;
        let relations = desired_links(changes.genre_ids.as_deref(), changes.contributors.as_deref());

        let mut tx = begin_write(&self.pool).await?;

        if !book_exists(&mut tx, id).await? {
            return Err(CatalogError::not_found(EntityKind::Book, id));
        }
        if let Some(title) = changes.new_title() {
            if title_taken(&mut tx, &normalize_key(title), Some(id)).await? {
                return Err(duplicate_title(title));
            }
        }
        let links = Reconciliation::prepare(&mut tx, relations).await?;

        update_book(&mut tx, id, &changes, timestamp::now()).await?;
        links.apply(&mut tx, id).await?;

        let book = fetch_book(&mut tx, id)
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityKind::Book, id))?;
        let updated = assemble_one(&mut tx, book).await?;
        tx.commit().await?;

        tracing::info!(book_id = %id, "book updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> CatalogResult<()> {
        let mut tx = begin_write(&self.pool).await?;

        if !book_exists(&mut tx, id).await? {
            return Err(CatalogError::not_found(EntityKind::Book, id));
        }
        clear_links(&mut tx, id).await?;
        delete_book(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(book_id = %id, "book deleted");
        Ok(())
    }

    pub async fn search(&self, search: &BookSearch) -> CatalogResult<BookPage> {
        let mut tx = self.pool.begin().await?;
        let (books, total) = search_rows(&mut tx, search).await?;
        let items = assemble(&mut tx, books).await?;
        tx.commit().await?;

        tracing::debug!(
            total,
            page = search.page.page(),
            returned = items.len(),
            "book search"
        );

        Ok(BookPage {
            items,
            total,
            page: search.page.page(),
            page_size: search.page.page_size(),
            pages: search.page.pages(total),
        })
    }
}

fn desired_links(
    genre_ids: Option<&[Uuid]>,
    contributors: Option<&[ContributorLink]>,
) -> Vec<DesiredLinks> {
    genre_ids
        .map(DesiredLinks::genres)
        .into_iter()
        .chain(contributors.map(DesiredLinks::contributors))
        .collect()
}
