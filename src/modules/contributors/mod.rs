//! Contributors: people who author, edit or illustrate books.

pub mod models;
mod repository;
mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use shelf_db::Database;
use shelf_kernel::{InitCtx, Migration, Module};

pub use models::{Contributor, CreateContributor};
pub use repository::ContributorCatalog;
pub(crate) use repository::insert_contributor;

pub struct ContributorsModule {
    catalog: ContributorCatalog,
}

impl ContributorsModule {
    pub fn new(db: &Database) -> Self {
        Self {
            catalog: ContributorCatalog::new(db),
        }
    }
}

#[async_trait]
impl Module for ContributorsModule {
    fn name(&self) -> &'static str {
        "contributors"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "contributors module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.catalog.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List contributors",
                        "tags": ["Contributors"],
                        "parameters": [
                            { "name": "q", "in": "query", "required": false, "schema": { "type": "string" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "Contributors ordered by full name",
                                "content": { "application/json": { "schema": {
                                    "type": "array",
                                    "items": { "$ref": "#/components/schemas/Contributor" }
                                } } }
                            }
                        }
                    },
                    "post": {
                        "summary": "Create a contributor",
                        "tags": ["Contributors"],
                        "requestBody": {
                            "required": true,
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/CreateContributor" } } }
                        },
                        "responses": {
                            "201": {
                                "description": "Created contributor",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Contributor" } } }
                            },
                            "400": {
                                "description": "Invalid input",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
                            }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a contributor",
                        "tags": ["Contributors"],
                        "parameters": [
                            { "name": "id", "in": "path", "required": true, "schema": { "type": "string", "format": "uuid" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "Contributor",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Contributor" } } }
                            },
                            "404": {
                                "description": "Contributor not found",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Contributor": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "full_name": { "type": "string" },
                            "created_at": { "type": "string", "format": "date-time" },
                            "updated_at": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "full_name", "created_at", "updated_at"]
                    },
                    "CreateContributor": {
                        "type": "object",
                        "properties": {
                            "full_name": { "type": "string", "maxLength": 255 }
                        },
                        "required": ["full_name"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE IF NOT EXISTS contributor (
                    id         TEXT PRIMARY KEY NOT NULL,
                    full_name  TEXT NOT NULL CHECK (length(trim(full_name)) > 0),
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS contributor_full_name_idx ON contributor (full_name);
                "#,
        }]
    }
}

pub fn create_module(db: &Database) -> Arc<dyn Module> {
    Arc::new(ContributorsModule::new(db))
}
