//! Books: the catalog's main entity, linked to genres and to contributors
//! under a role.

mod assemble;
mod associations;
pub mod models;
pub mod query;
mod repository;
mod routes;
mod service;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use shelf_db::Database;
use shelf_kernel::{InitCtx, Migration, Module};

pub use models::{
    Book, BookPage, BookResponse, ContributorCredit, ContributorLink, CreateBook, GenreSummary,
    Role, UpdateBook,
};
pub use query::{BookFilters, BookSearch, BookSort, Pagination, SortField, SortOrder};
pub use service::BookCatalog;
pub(crate) use associations::{DesiredLinks, Reconciliation};
pub(crate) use repository::insert_book;

/// Books module wiring the catalog service into the HTTP surface
pub struct BooksModule {
    catalog: BookCatalog,
}

impl BooksModule {
    pub fn new(db: &Database) -> Self {
        Self {
            catalog: BookCatalog::new(db),
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.catalog.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = json!({
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
        });
        let id_param = json!({
            "name": "id", "in": "path", "required": true, "schema": { "type": "string", "format": "uuid" }
        });
        let query_param = |name: &str, schema: serde_json::Value| {
            json!({ "name": name, "in": "query", "required": false, "schema": schema })
        };
        let with_description = |description: &str| {
            let mut response = error.clone();
            response["description"] = json!(description);
            response
        };

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "Search books",
                        "tags": ["Books"],
                        "parameters": [
                            query_param("q", json!({ "type": "string" })),
                            query_param("genre_id", json!({ "type": "string", "format": "uuid" })),
                            query_param("genre_ids", json!({ "type": "array", "items": { "type": "string", "format": "uuid" } })),
                            query_param("contributor_id", json!({ "type": "string", "format": "uuid" })),
                            query_param("published_year", json!({ "type": "integer" })),
                            query_param("published_year_min", json!({ "type": "integer" })),
                            query_param("published_year_max", json!({ "type": "integer" })),
                            query_param("rating_min", json!({ "type": "number" })),
                            query_param("rating_max", json!({ "type": "number" })),
                            query_param("sort", json!({ "type": "string", "enum": ["title", "rating", "published_year", "created_at"] })),
                            query_param("order", json!({ "type": "string", "enum": ["asc", "desc"] })),
                            query_param("page", json!({ "type": "integer", "minimum": 1 })),
                            query_param("page_size", json!({ "type": "integer", "minimum": 1, "maximum": 100 }))
                        ],
                        "responses": {
                            "200": {
                                "description": "Page of books",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/BookPage" } } }
                            },
                            "400": with_description("Invalid query parameters")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/CreateBook" } } }
                        },
                        "responses": {
                            "201": {
                                "description": "Created book",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Book" } } }
                            },
                            "400": with_description("Invalid input, duplicate title or unknown reference")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Books health check",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "responses": {
                            "200": {
                                "description": "Book",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Book" } } }
                            },
                            "400": with_description("Malformed id"),
                            "404": with_description("Book not found")
                        }
                    },
                    "put": {
                        "summary": "Update a book",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "requestBody": {
                            "required": true,
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/UpdateBook" } } }
                        },
                        "responses": {
                            "200": {
                                "description": "Updated book",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Book" } } }
                            },
                            "400": with_description("Invalid input, duplicate title or unknown reference"),
                            "404": with_description("Book not found")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "responses": {
                            "204": { "description": "Deleted" },
                            "400": with_description("Malformed id"),
                            "404": with_description("Book not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Role": { "type": "string", "enum": ["author", "editor", "illustrator"] },
                    "ContributorLink": {
                        "type": "object",
                        "properties": {
                            "contributor_id": { "type": "string", "format": "uuid" },
                            "role": { "$ref": "#/components/schemas/Role" }
                        },
                        "required": ["contributor_id", "role"]
                    },
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "title": { "type": "string" },
                            "rating": { "type": ["number", "null"], "minimum": 0, "maximum": 10 },
                            "description": { "type": ["string", "null"] },
                            "published_year": { "type": ["integer", "null"], "minimum": 1450, "maximum": 2100 },
                            "genres": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "id": { "type": "string", "format": "uuid" },
                                        "name": { "type": "string" }
                                    }
                                }
                            },
                            "contributors": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "id": { "type": "string", "format": "uuid" },
                                        "full_name": { "type": "string" },
                                        "role": { "$ref": "#/components/schemas/Role" }
                                    }
                                }
                            },
                            "created_at": { "type": "string", "format": "date-time" },
                            "updated_at": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "title", "genres", "contributors", "created_at", "updated_at"]
                    },
                    "CreateBook": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string", "maxLength": 255 },
                            "rating": { "type": "number", "minimum": 0, "maximum": 10 },
                            "description": { "type": "string" },
                            "published_year": { "type": "integer", "minimum": 1450, "maximum": 2100 },
                            "genre_ids": { "type": "array", "items": { "type": "string", "format": "uuid" } },
                            "contributors": { "type": "array", "items": { "$ref": "#/components/schemas/ContributorLink" } }
                        },
                        "required": ["title"]
                    },
                    "UpdateBook": {
                        "type": "object",
                        "description": "Absent fields are left untouched; null clears optional fields",
                        "properties": {
                            "title": { "type": "string", "maxLength": 255 },
                            "rating": { "type": ["number", "null"], "minimum": 0, "maximum": 10 },
                            "description": { "type": ["string", "null"] },
                            "published_year": { "type": ["integer", "null"], "minimum": 1450, "maximum": 2100 },
                            "genre_ids": { "type": ["array", "null"], "items": { "type": "string", "format": "uuid" } },
                            "contributors": { "type": ["array", "null"], "items": { "$ref": "#/components/schemas/ContributorLink" } }
                        }
                    },
                    "BookPage": {
                        "type": "object",
                        "properties": {
                            "items": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } },
                            "total": { "type": "integer" },
                            "page": { "type": "integer" },
                            "page_size": { "type": "integer" },
                            "pages": { "type": "integer" }
                        },
                        "required": ["items", "total", "page", "page_size", "pages"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE IF NOT EXISTS book (
                    id             TEXT PRIMARY KEY NOT NULL,
                    title          TEXT NOT NULL CHECK (length(trim(title)) > 0),
                    title_key      TEXT NOT NULL UNIQUE,
                    rating         REAL CHECK (rating IS NULL OR (rating >= 0.0 AND rating <= 10.0)),
                    description    TEXT,
                    description_key TEXT,
                    published_year INTEGER CHECK (published_year IS NULL OR (published_year BETWEEN 1450 AND 2100)),
                    created_at     INTEGER NOT NULL,
                    updated_at     INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS book_genre (
                    book_id  TEXT NOT NULL REFERENCES book (id) ON DELETE CASCADE,
                    genre_id TEXT NOT NULL REFERENCES genre (id) ON DELETE CASCADE ON UPDATE CASCADE,
                    PRIMARY KEY (book_id, genre_id)
                );
                CREATE INDEX IF NOT EXISTS book_genre_genre_idx ON book_genre (genre_id);

                CREATE TABLE IF NOT EXISTS book_contributor (
                    book_id        TEXT NOT NULL REFERENCES book (id) ON DELETE CASCADE,
                    contributor_id TEXT NOT NULL REFERENCES contributor (id) ON DELETE CASCADE,
                    role           TEXT NOT NULL CHECK (role IN ('author', 'editor', 'illustrator')),
                    PRIMARY KEY (book_id, contributor_id, role)
                );
                CREATE INDEX IF NOT EXISTS book_contributor_contributor_idx ON book_contributor (contributor_id);

                CREATE INDEX IF NOT EXISTS book_published_year_idx ON book (published_year);
                CREATE INDEX IF NOT EXISTS book_rating_idx ON book (rating);
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(db: &Database) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(db))
}
