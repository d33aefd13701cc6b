//! UTFGrid lookup and reconstruction.
//!
//! Interactivity key data is stored normalized (one `grid_data` row per key)
//! so large JSON values are not duplicated across tiles sharing key codes,
//! but clients expect one self-contained compressed JSON document per tile.
//! [`Tileset::get_grid`] performs that denormalization on read, keeping the
//! container's compression envelope so callers can serve the result with the
//! original `Content-Encoding`.

use futures::TryStreamExt as _;
use mbtileset_utils::Encoding;
use serde_json::{Map, Value as JSONValue};
use sqlx::{Row as _, SqliteConnection, query};
use tracing::trace;

use crate::Tileset;
use crate::errors::{TilesetError, TilesetResult};

/// Grid capability detected at open time.
#[derive(Clone, Copy, Debug)]
pub(crate) struct GridInfo {
    pub(crate) encoding: Encoding,
    pub(crate) has_grid_data: bool,
}

impl Tileset {
    /// Fetches the UTFGrid at a coordinate, splicing in its interactivity key
    /// data when the container stores any.
    ///
    /// A coordinate with no grid is `Ok(None)`; a container without grid
    /// support is an error for every coordinate. When the container has no
    /// `grid_data` view, or no key rows exist for this tile, the blob is
    /// returned exactly as stored.
    pub async fn get_grid(&self, z: u8, x: u32, y: u32) -> TilesetResult<Option<Vec<u8>>> {
        let Some(grid) = self.grid else {
            return Err(TilesetError::GridsNotSupported(self.id.clone()));
        };

        let mut conn = self.pool.acquire().await?;
        let row = query(
            "SELECT grid FROM grids WHERE zoom_level = ? AND tile_column = ? AND tile_row = ?",
        )
        .bind(z)
        .bind(x)
        .bind(y)
        .fetch_optional(&mut *conn)
        .await?;
        let Some(row) = row else {
            trace!("No grid at {z}/{x}/{y} in {}", self.id);
            return Ok(None);
        };
        let Some(blob) = row.try_get::<Option<Vec<u8>>, _>("grid")? else {
            return Ok(None);
        };

        if !grid.has_grid_data {
            return Ok(Some(blob));
        }
        let key_data = fetch_grid_key_data(&mut conn, z, x, y).await?;
        if key_data.is_empty() {
            // No interactivity rows for this tile despite the view existing
            return Ok(Some(blob));
        }

        let mut utfgrid: JSONValue = serde_json::from_slice(&grid.encoding.decode(&blob)?)?;
        let Some(object) = utfgrid.as_object_mut() else {
            return Err(TilesetError::InvalidGridBlob(self.id.clone(), z, x, y));
        };
        object.insert("data".to_string(), JSONValue::Object(key_data));

        // Recompress with the same envelope the blob arrived in
        let merged = grid.encoding.encode(&serde_json::to_vec(&utfgrid)?)?;
        Ok(Some(merged))
    }
}

/// Accumulates the coordinate's `grid_data` rows into a `key name → decoded
/// JSON value` mapping. Each `key_json` cell is a JSON-encoded string; a
/// malformed cell fails the read.
async fn fetch_grid_key_data(
    conn: &mut SqliteConnection,
    z: u8,
    x: u32,
    y: u32,
) -> TilesetResult<Map<String, JSONValue>> {
    let mut key_data = Map::new();
    let mut rows = query(
        "SELECT key_name, key_json FROM grid_data WHERE zoom_level = ? AND tile_column = ? AND tile_row = ?",
    )
    .bind(z)
    .bind(x)
    .bind(y)
    .fetch(&mut *conn);
    while let Some(row) = rows.try_next().await? {
        let name: String = row.try_get("key_name")?;
        let value: Vec<u8> = row.try_get("key_json")?;
        key_data.insert(name, serde_json::from_slice(&value)?);
    }
    Ok(key_data)
}
