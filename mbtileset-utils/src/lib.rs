//! Tile format sniffing and compression envelope helpers.
//!
//! MBTiles containers do not reliably declare what their blobs hold, so the
//! reader sniffs magic-byte prefixes instead of trusting metadata. This crate
//! keeps that detection logic, the derived HTTP content-type mapping, and the
//! zlib/gzip codec pair used to rebuild UTFGrid blobs.

mod decoders;

pub use decoders::{decode_gzip, decode_zlib, encode_gzip, encode_zlib};

use serde::Serialize;

/// Content format of a tile or grid blob, as sniffed from its first bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TileFormat {
    Gzip,
    Zlib,
    Png,
    Jpeg,
    Mvt,
    Webp,
}

impl TileFormat {
    /// Detects the format from the magic-byte prefix of a blob.
    ///
    /// Gzip masks gzip-wrapped vector tiles, which carry no inner signature of
    /// their own; callers sampling a `tiles` table should reinterpret `Gzip`
    /// as [`TileFormat::Mvt`]. Returns `None` when no pattern matches.
    #[must_use]
    pub fn detect(data: &[u8]) -> Option<Self> {
        Some(match data {
            v if v.starts_with(b"\x1f\x8b") => Self::Gzip,
            v if v.starts_with(b"\x78\x9c") => Self::Zlib,
            v if v.starts_with(b"\x89\x50\x4E\x47\x0D\x0A\x1A\x0A") => Self::Png,
            v if v.starts_with(b"\xFF\xD8\xFF") => Self::Jpeg,
            v if v.starts_with(b"\x52\x49\x46\x46\xc0\x00\x00\x00\x57\x45\x42\x50\x56\x50") => {
                Self::Webp
            }
            _ => None?,
        })
    }

    /// HTTP content type of blobs in this format.
    ///
    /// Raw compression envelopes have no meaningful content type and yield an
    /// empty string.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match *self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Mvt => "application/x-protobuf",
            Self::Gzip | Self::Zlib => "",
        }
    }

    /// HTTP `Content-Encoding` a server must declare when sending the blob
    /// unmodified. Vector tiles are stored gzip-wrapped.
    #[must_use]
    pub fn content_encoding(&self) -> Option<&'static str> {
        match *self {
            Self::Mvt | Self::Gzip => Some("gzip"),
            Self::Zlib => Some("deflate"),
            Self::Png | Self::Jpeg | Self::Webp => None,
        }
    }

    /// Short format name as used in tile URLs and the `format` metadata key.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Mvt => "pbf",
            Self::Webp => "webp",
            Self::Gzip | Self::Zlib => "",
        }
    }

    /// The compression envelope this format represents, if it is one.
    #[must_use]
    pub fn encoding(&self) -> Option<Encoding> {
        match *self {
            Self::Gzip => Some(Encoding::Gzip),
            Self::Zlib => Some(Encoding::Zlib),
            Self::Png | Self::Jpeg | Self::Mvt | Self::Webp => None,
        }
    }
}

/// Compression envelope of a UTFGrid blob.
///
/// Selected once per container when the tileset is opened, and carries the
/// matching decompressor/compressor pair so a reconstructed grid leaves with
/// the same envelope it arrived in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Gzip,
    Zlib,
}

impl Encoding {
    pub fn decode(self, data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
        match self {
            Self::Gzip => decode_gzip(data),
            Self::Zlib => decode_zlib(data),
        }
    }

    pub fn encode(self, data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
        match self {
            Self::Gzip => encode_gzip(data),
            Self::Zlib => encode_zlib(data),
        }
    }

    /// HTTP `Content-Encoding` token for blobs in this envelope.
    #[must_use]
    pub fn content_encoding(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Zlib => "deflate",
        }
    }
}
