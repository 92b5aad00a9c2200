//! Map tile sources for plotting backgrounds.
//!
//! A [`TileSource`] maps slippy-map tile indices `(x, y, z)` to image URLs.
//! Fetching, caching and rendering are the plotting stack's business; this
//! module only constructs URLs and converts geographic coordinates to tile
//! indices.
//!
//! # Example
//!
//! ```
//! use havkit::tiles::{tile_index, NorgeIBilder, TileSource};
//!
//! let nib = NorgeIBilder::new();
//! let (x, y) = tile_index(8.75, 63.75, 10);
//! let url = nib.image_url(x, y, 10);
//! assert!(url.starts_with("https://waapi.webatlas.no/"));
//! ```

/// A web tile service addressed by slippy-map tile indices.
pub trait TileSource {
    /// URL of the tile image at `(x, y)` on zoom level `z`.
    fn image_url(&self, x: u32, y: u32, z: u8) -> String;
}

/// Norge i bilder orthophoto tiles (webatlas WTS).
///
/// Norge i bilder contains licensed imagery from Geovekst, Omløpsfoto and
/// municipal mapping projects; commercial use requires permission from the
/// rights holders via Kartverket. URL format as published through JOSM.
#[derive(Debug, Clone)]
pub struct NorgeIBilder {
    api_key: String,
}

impl NorgeIBilder {
    /// The publicly distributed webatlas API key.
    pub const DEFAULT_API_KEY: &'static str = "b8e36d51-119a-423b-b156-d744d54123d5";

    /// Tile source with the default API key.
    pub fn new() -> Self {
        Self {
            api_key: Self::DEFAULT_API_KEY.to_string(),
        }
    }

    /// Tile source with a custom API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl Default for NorgeIBilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TileSource for NorgeIBilder {
    fn image_url(&self, x: u32, y: u32, z: u8) -> String {
        format!(
            "https://waapi.webatlas.no/maptiles/tiles/webatlas-orto-newup/wa_grid/{}/{}/{}.jpeg?api_key={}",
            z, x, y, self.api_key
        )
    }
}

/// Slippy-map tile index covering a geographic coordinate at a zoom level.
///
/// Standard Web Mercator tiling: `x` grows eastward from −180°, `y` grows
/// southward from the projection's northern edge (≈85.05°N). Coordinates
/// outside the projection's latitude range are clamped to the edge tiles.
pub fn tile_index(lon: f64, lat: f64, zoom: u8) -> (u32, u32) {
    let n = f64::from(1u32 << zoom);

    let x = (lon + 180.0) / 360.0 * n;
    let lat_rad = lat.to_radians();
    let y = (1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * n;

    let max = (1u32 << zoom) - 1;
    (
        (x.floor().max(0.0) as u32).min(max),
        (y.floor().max(0.0) as u32).min(max),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nib_url_format() {
        let nib = NorgeIBilder::new();
        assert_eq!(
            nib.image_url(541, 268, 10),
            "https://waapi.webatlas.no/maptiles/tiles/webatlas-orto-newup/wa_grid/10/541/268.jpeg?api_key=b8e36d51-119a-423b-b156-d744d54123d5"
        );
    }

    #[test]
    fn test_nib_custom_key() {
        let nib = NorgeIBilder::with_api_key("secret");
        assert!(nib.image_url(0, 0, 0).ends_with("?api_key=secret"));
    }

    #[test]
    fn test_tile_index_reference_points() {
        // Zoom 0: the whole world is one tile
        assert_eq!(tile_index(8.75, 63.75, 0), (0, 0));

        // Null island at zoom 1 falls on the southeast tile
        assert_eq!(tile_index(0.0, 0.0, 1), (1, 1));

        // Froya (8.75°E, 63.75°N) at zoom 10
        let (x, y) = tile_index(8.75, 63.75, 10);
        assert_eq!((x, y), (536, 274));
    }

    #[test]
    fn test_tile_index_clamps_to_projection_edge() {
        let max = (1u32 << 5) - 1;
        assert_eq!(tile_index(-200.0, 89.9, 5), (0, 0));
        assert_eq!(tile_index(200.0, -89.9, 5), (max, max));
    }
}
