//! Bootstrap wiring shared by the server binary and the CLI.

use anyhow::Context;
use shelf_db::Database;
use shelf_kernel::settings::Settings;
use shelf_kernel::{InitCtx, ModuleRegistry};

use crate::modules;

pub fn build_registry(db: &Database) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, db);
    registry
}

/// Create any missing tables. Returns how many migrations were applied.
pub async fn init_schema(db: &Database, registry: &ModuleRegistry) -> anyhow::Result<usize> {
    let migrations = registry.collect_migrations();
    let applied = db
        .apply_migrations(&migrations)
        .await
        .context("failed to initialize catalog schema")?;

    tracing::info!(applied, known = migrations.len(), "catalog schema ready");
    Ok(applied)
}

/// Migrate, then init and start every module.
pub async fn prepare(db: &Database, settings: &Settings) -> anyhow::Result<ModuleRegistry> {
    let registry = build_registry(db);
    init_schema(db, &registry).await?;

    let ctx = InitCtx { settings };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;
    Ok(registry)
}

/// Run the HTTP API until a shutdown signal arrives.
pub async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let db = Database::connect(&settings.database).await?;
    let registry = prepare(&db, settings).await?;

    tracing::info!(
        modules = registry.module_count(),
        env = ?settings.environment,
        "shelf-app bootstrap complete"
    );

    let served = shelf_http::start_server(&registry, settings).await;

    registry.stop_modules().await?;
    db.close().await;
    served
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_init_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        let registry = build_registry(&db);

        assert_eq!(init_schema(&db, &registry).await.unwrap(), 3);
        assert_eq!(init_schema(&db, &registry).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn modules_register_in_dependency_order() {
        let db = Database::in_memory().await.unwrap();
        let registry = prepare(&db, &Settings::default()).await.unwrap();

        let names: Vec<_> = registry.modules().map(|m| m.name()).collect();
        assert_eq!(names, ["genres", "contributors", "books"]);
        assert!(registry.get_module("books").is_some());
    }
}
