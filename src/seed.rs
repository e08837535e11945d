//! Demo rows for an empty catalog.

use shelf_db::Database;

use crate::modules::books::{insert_book, Book, ContributorLink, DesiredLinks, Reconciliation, Role};
use crate::modules::contributors::{insert_contributor, Contributor};
use crate::modules::genres::{insert_genre, Genre};
use crate::utils::{new_id, timestamp};

const GENRES: [&str; 4] = ["Horror", "Adventure", "Thriller", "Historical Fiction"];

const CONTRIBUTORS: [&str; 3] = ["Stephen King", "Blake Crouch", "Dan Brown"];

struct DemoBook {
    title: &'static str,
    rating: f64,
    description: &'static str,
    published_year: i32,
    genre: usize,
    author: usize,
}

const BOOKS: [DemoBook; 4] = [
    DemoBook {
        title: "The Shining",
        rating: 8.7,
        description: "Horror story about a haunted hotel",
        published_year: 1977,
        genre: 0,
        author: 0,
    },
    DemoBook {
        title: "Recursion",
        rating: 8.9,
        description: "Mind-bending thriller about memory and reality",
        published_year: 2019,
        genre: 2,
        author: 1,
    },
    DemoBook {
        title: "The Da Vinci Code",
        rating: 7.9,
        description: "Fast-paced adventure involving secret societies",
        published_year: 2003,
        genre: 1,
        author: 2,
    },
    DemoBook {
        title: "The Terror",
        rating: 8.1,
        description: "Historical fiction about a doomed Arctic expedition",
        published_year: 2007,
        genre: 3,
        author: 1,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The catalog already held data.
    Skipped,
    Seeded {
        genres: usize,
        contributors: usize,
        books: usize,
    },
}

/// Insert the demo catalog in one transaction, only if every table is empty.
pub async fn seed_demo_data(db: &Database) -> anyhow::Result<SeedOutcome> {
    let mut tx = db.begin_write().await?;

    let existing: i64 = sqlx::query_scalar(
        "SELECT (SELECT COUNT(*) FROM book) + (SELECT COUNT(*) FROM genre) + (SELECT COUNT(*) FROM contributor)",
    )
    .fetch_one(&mut *tx)
    .await?;
    if existing > 0 {
        tracing::info!(existing, "catalog already contains data, skipping seed");
        return Ok(SeedOutcome::Skipped);
    }

    let now = timestamp::now();

    let mut genre_ids = Vec::with_capacity(GENRES.len());
    for name in GENRES {
        let genre = Genre {
            id: new_id(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        insert_genre(&mut tx, &genre).await?;
        genre_ids.push(genre.id);
    }

    let mut contributor_ids = Vec::with_capacity(CONTRIBUTORS.len());
    for full_name in CONTRIBUTORS {
        let contributor = Contributor {
            id: new_id(),
            full_name: full_name.to_string(),
            created_at: now,
            updated_at: now,
        };
        insert_contributor(&mut tx, &contributor).await?;
        contributor_ids.push(contributor.id);
    }

    for demo in &BOOKS {
        let book = Book {
            id: new_id(),
            title: demo.title.to_string(),
            rating: Some(demo.rating),
            description: Some(demo.description.to_string()),
            published_year: Some(demo.published_year),
            created_at: now,
            updated_at: now,
        };
        insert_book(&mut tx, &book).await?;

        let links = vec![
            DesiredLinks::genres(&[genre_ids[demo.genre]]),
            DesiredLinks::contributors(&[ContributorLink {
                contributor_id: contributor_ids[demo.author],
                role: Role::Author,
            }]),
        ];
        Reconciliation::prepare(&mut tx, links)
            .await?
            .apply(&mut tx, book.id)
            .await?;
    }

    tx.commit().await?;

    let outcome = SeedOutcome::Seeded {
        genres: GENRES.len(),
        contributors: CONTRIBUTORS.len(),
        books: BOOKS.len(),
    };
    tracing::info!(?outcome, "demo catalog seeded");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::{BookCatalog, BookSearch};
    use crate::testing::{add_genre, catalog_db};

    #[tokio::test]
    async fn seeds_once() {
        let db = catalog_db().await;

        assert_eq!(
            seed_demo_data(&db).await.unwrap(),
            SeedOutcome::Seeded {
                genres: 4,
                contributors: 3,
                books: 4
            }
        );
        assert_eq!(seed_demo_data(&db).await.unwrap(), SeedOutcome::Skipped);

        let page = BookCatalog::new(&db).search(&BookSearch::default()).await.unwrap();
        assert_eq!(page.total, 4);
        let recursion = page.items.iter().find(|b| b.title == "Recursion").unwrap();
        assert_eq!(recursion.genres[0].name, "Thriller");
        assert_eq!(recursion.contributors[0].full_name, "Blake Crouch");
        assert_eq!(recursion.contributors[0].role, Role::Author);
    }

    #[tokio::test]
    async fn any_existing_row_blocks_seeding() {
        let db = catalog_db().await;
        add_genre(&db, "Poetry").await;

        assert_eq!(seed_demo_data(&db).await.unwrap(), SeedOutcome::Skipped);
    }
}
