use anyhow::{anyhow, Result};
use geo::{Coord, MapCoords, MultiLineString, Point, Rect};
use proj4rs::{proj::Proj as Proj4, transform::transform};

use crate::config::ProjectionConfig;

/// Geographic CRS of every lon/lat input (EPSG:4326).
const SOURCE_GEOG_PROJ4: &str = "+proj=longlat +datum=WGS84 +no_defs +type=crs";

/// Converts between the geographic input CRS and the metric CRS used for all
/// distance work.
pub struct Projector {
    kind: ProjectorKind,
}

enum ProjectorKind {
    /// Inputs are already in a metric CRS.
    Identity,
    Proj4 { geog: Proj4, metric: Proj4, definition: String },
}

impl std::fmt::Debug for Projector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Projector({})", self.definition())
    }
}

impl Projector {
    /// Pass coordinates through unchanged.
    pub fn identity() -> Self {
        Self { kind: ProjectorKind::Identity }
    }

    /// Project lon/lat into the metric CRS given by a PROJ.4 string.
    pub fn from_proj4(definition: &str) -> Result<Self> {
        let geog = Proj4::from_proj_string(SOURCE_GEOG_PROJ4)
            .map_err(|e| anyhow!("[geom::proj] failed to build source PROJ.4 {SOURCE_GEOG_PROJ4}: {e}"))?;
        let metric = Proj4::from_proj_string(definition)
            .map_err(|e| anyhow!("[geom::proj] failed to build target PROJ.4 {definition}: {e}"))?;
        Ok(Self { kind: ProjectorKind::Proj4 { geog, metric, definition: definition.to_string() } })
    }

    /// Build the projector a network run should use: the configured CRS, or the
    /// UTM zone containing the center of `bounds` (lon/lat).
    pub fn for_config(config: &ProjectionConfig, bounds: Option<Rect<f64>>) -> Result<Self> {
        if config.assume_projected { return Ok(Self::identity()) }
        match &config.proj4 {
            Some(definition) => Self::from_proj4(definition),
            None => Self::from_proj4(&utm_proj4(bounds)),
        }
    }

    /// Human-readable CRS definition.
    pub fn definition(&self) -> &str {
        match &self.kind {
            ProjectorKind::Identity => "identity",
            ProjectorKind::Proj4 { definition, .. } => definition,
        }
    }

    /// lon/lat degrees → projected meters.
    pub fn forward(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        match &self.kind {
            ProjectorKind::Identity => Ok(coord),
            ProjectorKind::Proj4 { geog, metric, .. } => {
                let mut point = (coord.x.to_radians(), coord.y.to_radians(), 0.0);
                transform(geog, metric, &mut point)
                    .map_err(|e| anyhow!("[geom::proj] CRS transform failed at ({}, {}): {e}", coord.x, coord.y))?;
                Ok(Coord { x: point.0, y: point.1 })
            }
        }
    }

    /// Projected meters → lon/lat degrees.
    pub fn inverse(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        match &self.kind {
            ProjectorKind::Identity => Ok(coord),
            ProjectorKind::Proj4 { geog, metric, .. } => {
                let mut point = (coord.x, coord.y, 0.0);
                transform(metric, geog, &mut point)
                    .map_err(|e| anyhow!("[geom::proj] inverse CRS transform failed at ({}, {}): {e}", coord.x, coord.y))?;
                Ok(Coord { x: point.0.to_degrees(), y: point.1.to_degrees() })
            }
        }
    }

    #[inline]
    pub fn forward_point(&self, point: Point<f64>) -> Result<Point<f64>> {
        self.forward(point.0).map(Point::from)
    }

    #[inline]
    pub fn inverse_point(&self, point: Point<f64>) -> Result<Point<f64>> {
        self.inverse(point.0).map(Point::from)
    }

    /// Reproject a polyline from lon/lat into meters.
    pub fn forward_lines(&self, lines: &MultiLineString<f64>) -> Result<MultiLineString<f64>> {
        lines.try_map_coords(|coord| self.forward(coord))
    }
}

/// PROJ.4 string for the UTM zone containing the center of `bounds`.
/// Southern-hemisphere centers get the `+south` variant.
fn utm_proj4(bounds: Option<Rect<f64>>) -> String {
    let center = bounds.map(|b| b.center())
        .unwrap_or(Coord { x: -122.18, y: 37.45 }); // Menlo Park, CA (fallback)

    let zone = (((center.x + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u32;
    let south = if center.y >= 0.0 { "" } else { " +south" };

    format!("+proj=utm +zone={zone}{south} +datum=WGS84 +units=m +no_defs +type=crs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utm_zone_from_bounds_center() {
        let bounds = Rect::new(Coord { x: -122.3, y: 37.4 }, Coord { x: -122.1, y: 37.5 });
        assert!(utm_proj4(Some(bounds)).contains("+zone=10 "));

        let sydney = Rect::new(Coord { x: 151.0, y: -34.0 }, Coord { x: 151.3, y: -33.8 });
        let proj = utm_proj4(Some(sydney));
        assert!(proj.contains("+zone=56"));
        assert!(proj.contains("+south"));
    }

    #[test]
    fn identity_passes_coordinates_through() {
        let projector = Projector::identity();
        let coord = Coord { x: 12.5, y: -3.0 };
        assert_eq!(projector.forward(coord).unwrap(), coord);
        assert_eq!(projector.inverse(coord).unwrap(), coord);
    }

    #[test]
    fn utm_round_trip_and_metric_scale() {
        let projector = Projector::from_proj4(&utm_proj4(None)).unwrap();
        let a = Coord { x: -122.18, y: 37.45 };
        let b = Coord { x: -122.18, y: 37.451 }; // ~111 m north

        let pa = projector.forward(a).unwrap();
        let pb = projector.forward(b).unwrap();
        let dist = ((pa.x - pb.x).powi(2) + (pa.y - pb.y).powi(2)).sqrt();
        assert!((dist - 111.0).abs() < 1.0, "distance was {dist}");

        let back = projector.inverse(pa).unwrap();
        assert!((back.x - a.x).abs() < 1e-7);
        assert!((back.y - a.y).abs() < 1e-7);
    }
}
