use std::path::PathBuf;

use mbtileset_utils::TileFormat;

#[derive(thiserror::Error, Debug)]
pub enum TilesetError {
    #[error(transparent)]
    SqlxError(#[from] sqlx::Error),

    #[error(transparent)]
    JsonSerdeError(#[from] serde_json::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("Tileset filepath contains unsupported characters: {}", .0.display())]
    UnsupportedCharsInFilepath(PathBuf),

    #[error("Could not read file stats for tileset file: {}", .0.display())]
    FileStatUnavailable(PathBuf),

    #[error("No tiles found in {0}")]
    NoTilesFound(String),

    #[error("Could not detect tile format in {0}")]
    UndetectableTileFormat(String),

    #[error("Could not determine grid compression type in {0}")]
    UndetectableGridFormat(String),

    #[error("Grid sample in {1} has format {0:?}, expected a gzip or zlib envelope")]
    UnsupportedGridCompression(TileFormat, String),

    #[error("Tileset {0} does not contain UTF grids")]
    GridsNotSupported(String),

    #[error("Grid at {1}/{2}/{3} in {0} is not a JSON object")]
    InvalidGridBlob(String, u8, u32, u32),

    #[error("Invalid metadata {0} value `{1}`: expected an integer")]
    InvalidZoomValue(&'static str, String),

    #[error("Invalid metadata {0} value `{1}`: expected comma-separated numbers")]
    InvalidNumberListValue(&'static str, String),

    #[error("Invalid metadata json value: {0}")]
    InvalidJsonMetadata(String),
}

pub type TilesetResult<T> = Result<T, TilesetError>;
