pub mod books;
pub mod contributors;
pub mod genres;

use shelf_db::Database;
use shelf_kernel::ModuleRegistry;

/// Register all catalog modules with the registry.
///
/// Genres and contributors come first so their tables exist before the book
/// link tables that reference them.
pub fn register_all(registry: &mut ModuleRegistry, db: &Database) {
    registry.register(genres::create_module(db));
    registry.register(contributors::create_module(db));
    registry.register(books::create_module(db));
}
