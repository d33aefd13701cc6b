//! Probe and sample queries used during tileset construction and the
//! zoom-bounds fallback.

use sqlx::{Row as _, SqliteExecutor, query};

use crate::errors::TilesetResult;

/// Fetches one arbitrary tile blob to sniff the container's tile format.
///
/// `None` means the tiles table has no usable rows.
pub async fn sample_tile_data<T>(conn: &mut T) -> TilesetResult<Option<Vec<u8>>>
where
    for<'e> &'e mut T: SqliteExecutor<'e>,
{
    let row = query("SELECT tile_data FROM tiles LIMIT 1")
        .fetch_optional(&mut *conn)
        .await?;
    Ok(match row {
        Some(row) => row.try_get("tile_data")?,
        None => None,
    })
}

/// Fetches one non-null grid blob to sniff the grid compression envelope.
pub async fn sample_grid<T>(conn: &mut T) -> TilesetResult<Option<Vec<u8>>>
where
    for<'e> &'e mut T: SqliteExecutor<'e>,
{
    let row = query("SELECT grid FROM grids WHERE grid IS NOT NULL LIMIT 1")
        .fetch_optional(&mut *conn)
        .await?;
    Ok(match row {
        Some(row) => Some(row.try_get("grid")?),
        None => None,
    })
}

pub async fn has_grids_view<T>(conn: &mut T) -> TilesetResult<bool>
where
    for<'e> &'e mut T: SqliteExecutor<'e>,
{
    has_view(conn, "grids").await
}

pub async fn has_grid_data_view<T>(conn: &mut T) -> TilesetResult<bool>
where
    for<'e> &'e mut T: SqliteExecutor<'e>,
{
    has_view(conn, "grid_data").await
}

async fn has_view<T>(conn: &mut T, name: &str) -> TilesetResult<bool>
where
    for<'e> &'e mut T: SqliteExecutor<'e>,
{
    let row = query("SELECT 1 AS found FROM sqlite_master WHERE type = 'view' AND name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

/// Min and max zoom level actually present in the tile index.
///
/// `None` when the tiles table is empty (the aggregates come back NULL).
pub async fn zoom_bounds<T>(conn: &mut T) -> TilesetResult<Option<(i64, i64)>>
where
    for<'e> &'e mut T: SqliteExecutor<'e>,
{
    let row = query("SELECT min(zoom_level) AS min_zoom, max(zoom_level) AS max_zoom FROM tiles")
        .fetch_one(&mut *conn)
        .await?;
    let min_zoom: Option<i64> = row.try_get("min_zoom")?;
    let max_zoom: Option<i64> = row.try_get("max_zoom")?;
    Ok(min_zoom.zip(max_zoom))
}
