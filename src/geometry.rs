//! GeoJSON geometry normalization.
//!
//! Geocoders hand back outlines as GeoJSON geometries in `(longitude, latitude)`
//! order with a different nesting depth per geometry type. Everything here is
//! flattened into a list of rings of [`Coordinate`]s in `(latitude, longitude)`
//! order. Only outer rings are kept; polygon holes are dropped.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::place::Coordinate;

pub type Ring = Vec<Coordinate>;

/// GeoJSON positions may carry a third (altitude) ordinate, which is ignored.
type Position = Vec<f64>;

const GEOJSON: &str = "geojson";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    MultiPolygon,
}

impl FromStr for GeometryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Point" => Ok(GeometryKind::Point),
            "LineString" => Ok(GeometryKind::LineString),
            "Polygon" => Ok(GeometryKind::Polygon),
            "MultiPolygon" => Ok(GeometryKind::MultiPolygon),
            other => Err(Error::UnsupportedGeometryKind(other.to_owned())),
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPolygon => "MultiPolygon",
        };
        f.write_str(name)
    }
}

/// Normalizes raw GeoJSON `coordinates` of the given kind into rings.
///
/// * `Point` gives one ring holding one point.
/// * `LineString` gives one ring with the line's points.
/// * `Polygon` gives its outer ring only.
/// * `MultiPolygon` gives the outer ring of every polygon, in order.
pub fn normalize(kind: GeometryKind, coordinates: Value) -> Result<Vec<Ring>> {
    match kind {
        GeometryKind::Point => {
            let point: Position = decode(kind, coordinates)?;
            Ok(vec![vec![swap(&point)?]])
        }
        GeometryKind::LineString => {
            let line: Vec<Position> = decode(kind, coordinates)?;
            Ok(vec![swap_ring(&line)?])
        }
        GeometryKind::Polygon => {
            let polygon: Vec<Vec<Position>> = decode(kind, coordinates)?;
            Ok(vec![outer_ring(&polygon)?])
        }
        GeometryKind::MultiPolygon => {
            let polygons: Vec<Vec<Vec<Position>>> = decode(kind, coordinates)?;
            polygons.iter().map(|polygon| outer_ring(polygon)).collect()
        }
    }
}

/// Same as [`normalize`] but takes the GeoJSON `type` string as found on the wire.
pub fn normalize_raw(kind: &str, coordinates: Value) -> Result<(GeometryKind, Vec<Ring>)> {
    let kind = kind.parse::<GeometryKind>()?;
    let rings = normalize(kind, coordinates)?;
    Ok((kind, rings))
}

fn decode<T: DeserializeOwned>(kind: GeometryKind, coordinates: Value) -> Result<T> {
    serde_json::from_value(coordinates)
        .map_err(|e| Error::malformed(GEOJSON, format!("bad {kind} coordinates: {e}")))
}

fn outer_ring(polygon: &[Vec<Position>]) -> Result<Ring> {
    let outer = polygon
        .first()
        .ok_or_else(|| Error::malformed(GEOJSON, "polygon without an outer ring"))?;
    swap_ring(outer)
}

fn swap_ring(positions: &[Position]) -> Result<Ring> {
    positions.iter().map(|p| swap(p)).collect()
}

fn swap(position: &[f64]) -> Result<Coordinate> {
    match position {
        [lon, lat, ..] => Ok(Coordinate::new(*lat, *lon)),
        _ => Err(Error::malformed(
            GEOJSON,
            format!("position needs two ordinates, got {}", position.len()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn c(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon)
    }

    #[test]
    fn point_becomes_single_swapped_ring() {
        let rings = normalize(GeometryKind::Point, json!([6.12, 45.9])).unwrap();
        assert_eq!(rings, vec![vec![c(45.9, 6.12)]]);
    }

    #[test]
    fn line_string_keeps_point_order() {
        let rings = normalize(
            GeometryKind::LineString,
            json!([[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]]),
        )
        .unwrap();
        assert_eq!(rings, vec![vec![c(10.0, 1.0), c(20.0, 2.0), c(30.0, 3.0)]]);
    }

    #[test]
    fn polygon_drops_holes() {
        let rings = normalize(
            GeometryKind::Polygon,
            json!([
                [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 0.0]],
                [[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 1.0]],
                [[3.0, 3.0], [3.5, 3.0], [3.5, 3.5], [3.0, 3.0]]
            ]),
        )
        .unwrap();
        assert_eq!(rings.len(), 1);
        assert_eq!(
            rings[0],
            vec![c(0.0, 0.0), c(0.0, 4.0), c(4.0, 4.0), c(0.0, 0.0)]
        );
    }

    #[test]
    fn multi_polygon_keeps_one_outer_ring_per_polygon() {
        let rings = normalize(
            GeometryKind::MultiPolygon,
            json!([
                [
                    [[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]],
                    [[9.0, 9.0], [9.0, 9.0], [9.0, 9.0]]
                ],
                [[[10.0, 11.0], [12.0, 13.0], [14.0, 15.0], [16.0, 17.0]]]
            ]),
        )
        .unwrap();
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0], vec![c(1.0, 0.0), c(3.0, 2.0), c(5.0, 4.0)]);
        assert_eq!(rings[1].len(), 4);
        assert_eq!(rings[1][3], c(17.0, 16.0));
    }

    #[test]
    fn altitude_is_ignored() {
        let rings = normalize(GeometryKind::Point, json!([6.0, 45.0, 420.0])).unwrap();
        assert_eq!(rings[0][0], c(45.0, 6.0));
    }

    #[test]
    fn unknown_kind_is_unsupported() {
        for kind in ["GeometryCollection", "MultiLineString", "point", ""] {
            let err = normalize_raw(kind, json!([0.0, 0.0])).unwrap_err();
            assert!(
                matches!(err, Error::UnsupportedGeometryKind(ref k) if k == kind),
                "{kind}: {err}"
            );
        }
    }

    #[test]
    fn shape_mismatch_is_malformed() {
        let err = normalize(GeometryKind::Polygon, json!([1.0, 2.0])).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));

        let err = normalize(GeometryKind::Point, json!([1.0])).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));

        let err = normalize(GeometryKind::Polygon, json!([])).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[test]
    fn kind_round_trips_through_display() {
        for kind in [
            GeometryKind::Point,
            GeometryKind::LineString,
            GeometryKind::Polygon,
            GeometryKind::MultiPolygon,
        ] {
            assert_eq!(kind.to_string().parse::<GeometryKind>().unwrap(), kind);
        }
    }
}
