//! Low-level read-only access to `MBTiles` tilesets.
//!
//! [`Tileset`] opens an `MBTiles` container (a `SQLite` file with `tiles` and
//! `metadata` tables, optionally `grids`/`grid_data` views), sniffs the tile
//! format from a sample row, and then serves raw tiles, reconstructed UTFGrid
//! blobs, and a typed view of the metadata table. Writing, schema migration
//! and HTTP serving are out of scope; this crate is the storage-access layer
//! a tile server builds on.

mod errors;
mod grid;
mod metadata;
mod queries;
mod tileset;

pub use errors::{TilesetError, TilesetResult};
pub use mbtileset_utils::{Encoding, TileFormat};
pub use metadata::{Metadata, MetadataValue};
pub use tileset::Tileset;

// Re-exported so downstream users can match on the store's error type
// without pinning their own sqlx version.
pub use sqlx;
