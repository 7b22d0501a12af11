use std::fmt;

use serde::Serialize;

use crate::geometry::{GeometryKind, Ring};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Coordinate { lat, lon }
    }

    /// Finite and inside the WGS84 latitude/longitude ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A named place with its primary point and, when requested, its outline.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaceRecord {
    pub name: String,
    pub coordinate: Coordinate,
    pub kind: Option<GeometryKind>,
    rings: Vec<Ring>,
}

impl PlaceRecord {
    pub fn new(name: impl Into<String>, coordinate: Coordinate) -> Self {
        PlaceRecord {
            name: name.into(),
            coordinate,
            kind: None,
            rings: Vec::new(),
        }
    }

    pub fn with_geometry(mut self, kind: GeometryKind, rings: Vec<Ring>) -> Self {
        self.kind = Some(kind);
        self.rings = rings;
        self
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }

    pub fn point_count(&self) -> usize {
        self.rings.iter().map(Vec::len).sum()
    }

    /// First comma separated segment of the name, e.g. `"Annecy"` for
    /// `"Annecy, Haute-Savoie, France"`.
    pub fn short_name(&self) -> &str {
        self.name.split(',').next().unwrap_or_default().trim()
    }
}

impl fmt::Display for PlaceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name: \"{}\" | Latitude: {} | Longitude: {}",
            self.name, self.coordinate.lat, self.coordinate.lon
        )?;
        if !self.rings.is_empty() {
            write!(
                f,
                " | Rings: {} | Points: {}",
                self.ring_count(),
                self.point_count()
            )?;
        }
        Ok(())
    }
}

/// Places returned by one geocoder lookup, best match first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocationResult {
    pub places: Vec<PlaceRecord>,
}

impl LocationResult {
    pub fn first(&self) -> Option<&PlaceRecord> {
        self.places.first()
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

impl fmt::Display for LocationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, place) in self.places.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{place}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_follow_rings() {
        let place = PlaceRecord::new("Somewhere", Coordinate::new(1.0, 2.0));
        assert_eq!(place.ring_count(), 0);
        assert_eq!(place.point_count(), 0);

        let rings = vec![
            vec![Coordinate::new(0.0, 0.0); 4],
            vec![Coordinate::new(1.0, 1.0); 3],
        ];
        let place = place.with_geometry(GeometryKind::MultiPolygon, rings);
        assert_eq!(place.ring_count(), 2);
        assert_eq!(place.point_count(), 7);
        assert_eq!(place.kind, Some(GeometryKind::MultiPolygon));
    }

    #[test]
    fn short_name_is_first_segment() {
        let place = PlaceRecord::new(
            "Polytech Annecy-Chambéry, Annecy, Haute-Savoie, France",
            Coordinate::new(45.9, 6.1),
        );
        assert_eq!(place.short_name(), "Polytech Annecy-Chambéry");
        assert_eq!(
            PlaceRecord::new("Paris", Coordinate::new(0.0, 0.0)).short_name(),
            "Paris"
        );
    }

    #[test]
    fn display_mentions_rings_only_when_present() {
        let place = PlaceRecord::new("A", Coordinate::new(1.5, -2.5));
        assert_eq!(
            place.to_string(),
            "Name: \"A\" | Latitude: 1.5 | Longitude: -2.5"
        );
        let place = place.with_geometry(
            GeometryKind::Point,
            vec![vec![Coordinate::new(1.5, -2.5)]],
        );
        assert!(place.to_string().ends_with("| Rings: 1 | Points: 1"));
    }

    #[test]
    fn coordinate_validity() {
        assert!(Coordinate::new(45.0, 6.0).is_valid());
        assert!(Coordinate::new(-90.0, 180.0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.5).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }
}
