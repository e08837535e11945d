//! Genres: a flat, case-insensitively unique vocabulary books are tagged with.

pub mod models;
mod repository;
mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use shelf_db::Database;
use shelf_kernel::{InitCtx, Migration, Module};

pub use models::{CreateGenre, Genre};
pub use repository::GenreCatalog;
pub(crate) use repository::insert_genre;

use crate::modules::books::BookCatalog;
use routes::GenresState;

pub struct GenresModule {
    state: GenresState,
}

impl GenresModule {
    pub fn new(db: &Database) -> Self {
        Self {
            state: GenresState {
                genres: GenreCatalog::new(db),
                books: BookCatalog::new(db),
            },
        }
    }
}

#[async_trait]
impl Module for GenresModule {
    fn name(&self) -> &'static str {
        "genres"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "genres module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List genres",
                        "tags": ["Genres"],
                        "parameters": [
                            { "name": "q", "in": "query", "required": false, "schema": { "type": "string" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "Genres ordered by name",
                                "content": { "application/json": { "schema": {
                                    "type": "array",
                                    "items": { "$ref": "#/components/schemas/Genre" }
                                } } }
                            }
                        }
                    },
                    "post": {
                        "summary": "Create a genre",
                        "tags": ["Genres"],
                        "requestBody": {
                            "required": true,
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/CreateGenre" } } }
                        },
                        "responses": {
                            "201": {
                                "description": "Created genre",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Genre" } } }
                            },
                            "400": {
                                "description": "Invalid or duplicate name",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
                            }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a genre",
                        "tags": ["Genres"],
                        "parameters": [
                            { "name": "id", "in": "path", "required": true, "schema": { "type": "string", "format": "uuid" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "Genre",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Genre" } } }
                            },
                            "404": {
                                "description": "Genre not found",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
                            }
                        }
                    }
                },
                "/{id}/books": {
                    "get": {
                        "summary": "Books tagged with a genre",
                        "tags": ["Genres"],
                        "parameters": [
                            { "name": "id", "in": "path", "required": true, "schema": { "type": "string", "format": "uuid" } },
                            { "name": "sort", "in": "query", "required": false, "schema": { "type": "string" } },
                            { "name": "order", "in": "query", "required": false, "schema": { "type": "string" } },
                            { "name": "page", "in": "query", "required": false, "schema": { "type": "integer" } },
                            { "name": "page_size", "in": "query", "required": false, "schema": { "type": "integer" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "Page of books",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/BookPage" } } }
                            },
                            "404": {
                                "description": "Genre not found",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Genre": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "name": { "type": "string" },
                            "created_at": { "type": "string", "format": "date-time" },
                            "updated_at": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "name", "created_at", "updated_at"]
                    },
                    "CreateGenre": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string", "maxLength": 100 }
                        },
                        "required": ["name"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE IF NOT EXISTS genre (
                    id         TEXT PRIMARY KEY NOT NULL,
                    name       TEXT NOT NULL CHECK (length(trim(name)) > 0),
                    name_key   TEXT NOT NULL UNIQUE,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                "#,
        }]
    }
}

pub fn create_module(db: &Database) -> Arc<dyn Module> {
    Arc::new(GenresModule::new(db))
}
