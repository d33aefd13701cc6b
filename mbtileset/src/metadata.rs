//! Normalization of the loosely-typed `metadata` table into typed values.

use std::collections::BTreeMap;

use futures::TryStreamExt as _;
use serde::Serialize;
use serde_json::Value as JSONValue;
use sqlx::{Row as _, query};
use tracing::warn;

use crate::Tileset;
use crate::errors::{TilesetError, TilesetResult};
use crate::queries;

/// One typed metadata value.
///
/// Serializes untagged, so a [`Metadata`] mapping renders as the plain JSON
/// shape tileset consumers expect (`{"minzoom": 0, "bounds": [-180.0, ...]}`).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Integer(i64),
    Numbers(Vec<f64>),
    Text(String),
    Json(JSONValue),
}

/// Typed metadata mapping, built fresh on every [`Tileset::get_metadata`] call.
pub type Metadata = BTreeMap<String, MetadataValue>;

impl Tileset {
    /// Reads all non-empty metadata rows into a typed mapping.
    ///
    /// Known keys are converted: `minzoom`/`maxzoom` to integers,
    /// `bounds`/`center` to number sequences, and the `json` value (itself a
    /// JSON object) has its fields spliced into the top level rather than
    /// nested. Unknown keys pass through as text. A conversion failure fails
    /// the whole call, naming the offending key.
    ///
    /// When the table carries neither zoom bound, both are inferred from the
    /// tile index; if that fallback query fails too, the mapping is returned
    /// without them rather than failing the read.
    pub async fn get_metadata(&self) -> TilesetResult<Metadata> {
        let mut conn = self.pool.acquire().await?;
        let mut metadata = Metadata::new();

        let mut rows = query("SELECT name, value FROM metadata WHERE value IS NOT ''")
            .fetch(&mut *conn);
        while let Some(row) = rows.try_next().await? {
            let name: String = row.try_get("name")?;
            let value: String = row.try_get("value")?;
            match name.as_str() {
                "minzoom" => {
                    let zoom = parse_zoom("minzoom", &value)?;
                    metadata.insert(name, MetadataValue::Integer(zoom));
                }
                "maxzoom" => {
                    let zoom = parse_zoom("maxzoom", &value)?;
                    metadata.insert(name, MetadataValue::Integer(zoom));
                }
                "bounds" => {
                    let bounds = parse_numbers("bounds", &value)?;
                    metadata.insert(name, MetadataValue::Numbers(bounds));
                }
                "center" => {
                    let center = parse_numbers("center", &value)?;
                    metadata.insert(name, MetadataValue::Numbers(center));
                }
                "json" => {
                    let JSONValue::Object(object) = serde_json::from_str(&value)
                        .map_err(|err| TilesetError::InvalidJsonMetadata(err.to_string()))?
                    else {
                        return Err(TilesetError::InvalidJsonMetadata(
                            "expected a JSON object".to_string(),
                        ));
                    };
                    for (key, item) in object {
                        metadata.insert(key, MetadataValue::Json(item));
                    }
                }
                _ => {
                    metadata.insert(name, MetadataValue::Text(value));
                }
            }
        }
        // Drop the row stream to re-borrow the connection for the fallback
        drop(rows);

        if !(metadata.contains_key("minzoom") && metadata.contains_key("maxzoom")) {
            match queries::zoom_bounds(&mut *conn).await {
                Ok(Some((min_zoom, max_zoom))) => {
                    metadata.insert("minzoom".to_string(), MetadataValue::Integer(min_zoom));
                    metadata.insert("maxzoom".to_string(), MetadataValue::Integer(max_zoom));
                }
                Ok(None) => {}
                Err(err) => {
                    warn!("Could not infer zoom bounds for {}: {err}", self.id);
                }
            }
        }

        Ok(metadata)
    }

    /// Gets a single raw metadata value by key.
    pub async fn get_metadata_value(&self, key: &str) -> TilesetResult<Option<String>> {
        let mut conn = self.pool.acquire().await?;
        let row = query("SELECT value FROM metadata WHERE name = ?")
            .bind(key)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(match row {
            Some(row) => row.try_get("value")?,
            None => None,
        })
    }
}

fn parse_zoom(key: &'static str, value: &str) -> TilesetResult<i64> {
    value
        .parse()
        .map_err(|_| TilesetError::InvalidZoomValue(key, value.to_string()))
}

/// Comma-separated floats, as `bounds` and `center` values are stored.
fn parse_numbers(key: &'static str, value: &str) -> TilesetResult<Vec<f64>> {
    value
        .split(',')
        .map(|part| part.trim().parse())
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|_| TilesetError::InvalidNumberListValue(key, value.to_string()))
}
