use std::ffi::OsStr;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use mbtileset_utils::{Encoding, TileFormat};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Pool, Row as _, Sqlite, SqliteConnection, SqlitePool, query};
use tracing::{debug, trace};

use crate::errors::{TilesetError, TilesetResult};
use crate::grid::GridInfo;
use crate::queries;

/// One open `MBTiles` container.
///
/// The tile format, grid capability and modification timestamp are detected
/// once at [`Tileset::open`] and never change afterwards, so a `Tileset` can
/// be read from multiple concurrent tasks without synchronization. Clones
/// share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct Tileset {
    pub(crate) id: String,
    pub(crate) filepath: String,
    pub(crate) pool: Pool<Sqlite>,
    pub(crate) timestamp: SystemTime,
    pub(crate) tile_format: TileFormat,
    pub(crate) grid: Option<GridInfo>,
}

impl Display for Tileset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.filepath)
    }
}

impl Tileset {
    /// Opens the container read-only and probes it for tile format and
    /// UTFGrid support.
    ///
    /// The tile format is sniffed from one sample row; a container with no
    /// tiles or an undetectable format is unusable and fails here. Formats
    /// are assumed homogeneous across the container and are not re-checked
    /// per tile.
    pub async fn open<P: AsRef<Path>>(filepath: P) -> TilesetResult<Self> {
        let path = filepath.as_ref();
        let filepath = path
            .to_str()
            .ok_or_else(|| TilesetError::UnsupportedCharsInFilepath(path.to_path_buf()))?
            .to_string();
        let id = path
            .file_stem()
            .unwrap_or_else(|| OsStr::new("unknown"))
            .to_string_lossy()
            .to_string();
        debug!("Opening {filepath} as readonly");

        // Consumers only use the timestamp for Last-Modified headers, where
        // sub-second precision is meaningless.
        let timestamp = std::fs::metadata(path)
            .and_then(|stat| stat.modified())
            .map(round_to_second)
            .map_err(|_| TilesetError::FileStatUnavailable(path.to_path_buf()))?;

        let opt = SqliteConnectOptions::new().filename(path).read_only(true);
        let pool = SqlitePool::connect_with(opt).await?;
        let mut conn = pool.acquire().await?;

        let sample = queries::sample_tile_data(&mut *conn)
            .await?
            .ok_or_else(|| TilesetError::NoTilesFound(id.clone()))?;
        let tile_format = match TileFormat::detect(&sample) {
            // Gzip masks vector tiles, the only tile type stored gzip-wrapped
            Some(TileFormat::Gzip) => TileFormat::Mvt,
            Some(format) => format,
            None => return Err(TilesetError::UndetectableTileFormat(id)),
        };

        let grid = detect_grids(&mut conn, &id).await?;
        drop(conn);

        debug!(
            "Opened {id}: tile format {tile_format:?}, grids {}",
            if grid.is_some() { "present" } else { "absent" }
        );
        Ok(Self {
            id,
            filepath,
            pool,
            timestamp,
            tile_format,
            grid,
        })
    }

    /// Fetches one tile's raw bytes, exactly as stored.
    ///
    /// A coordinate with no tile is `Ok(None)`, never an error. Vector tiles
    /// come back still compressed; raster tiles are the native image bytes.
    pub async fn get_tile(&self, z: u8, x: u32, y: u32) -> TilesetResult<Option<Vec<u8>>> {
        let mut conn = self.pool.acquire().await?;
        let row = query(
            "SELECT tile_data FROM tiles WHERE zoom_level = ? AND tile_column = ? AND tile_row = ?",
        )
        .bind(z)
        .bind(x)
        .bind(y)
        .fetch_optional(&mut *conn)
        .await?;
        match row {
            Some(row) => Ok(row.try_get("tile_data")?),
            None => {
                trace!("No tile at {z}/{x}/{y} in {}", self.id);
                Ok(None)
            }
        }
    }

    /// Identifier derived from the file name, extension stripped.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn filepath(&self) -> &str {
        &self.filepath
    }

    #[must_use]
    pub fn tile_format(&self) -> TileFormat {
        self.tile_format
    }

    /// HTTP content type of the tiles; empty when the detected format has no
    /// meaningful one.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        self.tile_format.content_type()
    }

    /// HTTP `Content-Encoding` a caller must declare when serving tiles
    /// unmodified.
    #[must_use]
    pub fn content_encoding(&self) -> Option<&'static str> {
        self.tile_format.content_encoding()
    }

    /// File modification time, rounded to whole seconds for cache-validation
    /// headers. Formatting is the caller's concern.
    #[must_use]
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Whether the container has a `grids` view with at least one grid.
    #[must_use]
    pub fn has_grids(&self) -> bool {
        self.grid.is_some()
    }

    /// Whether per-key interactivity data exists alongside the grids.
    #[must_use]
    pub fn has_grid_data(&self) -> bool {
        self.grid.is_some_and(|grid| grid.has_grid_data)
    }

    /// Compression envelope of the stored grids, when grids exist.
    #[must_use]
    pub fn grid_encoding(&self) -> Option<Encoding> {
        self.grid.map(|grid| grid.encoding)
    }

    /// Closes the underlying connection pool. Clones of this handle share the
    /// pool and will fail on use after this call.
    pub async fn close(self) {
        debug!("Closing {self}");
        self.pool.close().await;
    }
}

/// Grid probes, run once at open.
///
/// The `grids` view existing is not enough: a view with no non-null rows
/// means the container has no grid support, which is a feature flag rather
/// than an error. An actual sample that fails detection, or one compressed
/// with anything but zlib/gzip, is fatal.
async fn detect_grids(conn: &mut SqliteConnection, id: &str) -> TilesetResult<Option<GridInfo>> {
    if !queries::has_grids_view(&mut *conn).await? {
        return Ok(None);
    }
    let Some(sample) = queries::sample_grid(&mut *conn).await? else {
        return Ok(None);
    };
    let format = TileFormat::detect(&sample)
        .ok_or_else(|| TilesetError::UndetectableGridFormat(id.to_string()))?;
    let encoding = format
        .encoding()
        .ok_or_else(|| TilesetError::UnsupportedGridCompression(format, id.to_string()))?;
    let has_grid_data = queries::has_grid_data_view(&mut *conn).await?;
    Ok(Some(GridInfo {
        encoding,
        has_grid_data,
    }))
}

fn round_to_second(time: SystemTime) -> SystemTime {
    let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    let mut secs = since_epoch.as_secs();
    if since_epoch.subsec_nanos() >= 500_000_000 {
        secs += 1;
    }
    UNIX_EPOCH + Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_the_nearest_second() {
        let base = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(round_to_second(base), base);
        assert_eq!(round_to_second(base + Duration::from_millis(499)), base);
        assert_eq!(
            round_to_second(base + Duration::from_millis(500)),
            base + Duration::from_secs(1)
        );
        assert_eq!(
            round_to_second(base + Duration::from_millis(999)),
            base + Duration::from_secs(1)
        );
    }
}
