//! Forward geocoding against a Nominatim compatible search endpoint.

use std::fs;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::geometry;
use crate::place::{Coordinate, LocationResult, PlaceRecord};

pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/search.php";
pub const DEFAULT_ZOOM: u8 = 18;

#[derive(Debug, Deserialize)]
struct SearchHit {
    display_name: String,
    lat: String,
    lon: String,
    geojson: Option<GeoJson>,
}

#[derive(Debug, Deserialize)]
struct GeoJson {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Value,
}

pub struct ForwardGeocodeClient {
    http: Client,
    endpoint: String,
    debug_dump: Option<PathBuf>,
}

impl ForwardGeocodeClient {
    pub fn new(http: Client, endpoint: impl Into<String>) -> Self {
        ForwardGeocodeClient {
            http,
            endpoint: endpoint.into(),
            debug_dump: None,
        }
    }

    /// Every raw response is pretty-printed to `path`, replacing the previous one.
    pub fn with_debug_dump(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_dump = Some(path.into());
        self
    }

    /// Looks up `query` and returns the matches in provider order.
    ///
    /// `zoom` selects how detailed the administrative boundary is (higher is
    /// more detailed). With `with_geometry` every match must carry a GeoJSON
    /// outline, which is normalized into the record's rings.
    ///
    /// Zero matches is not an error; callers check [`LocationResult::is_empty`].
    pub fn geocode(&self, query: &str, with_geometry: bool, zoom: u8) -> Result<LocationResult> {
        let polygon_geojson = if with_geometry { "1" } else { "0" };
        let zoom = zoom.to_string();
        log::debug!("geocoding {query:?} via {}", self.endpoint);

        let body = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("polygon_geojson", polygon_geojson),
                ("format", "json"),
                ("zoom", zoom.as_str()),
            ])
            .send()?
            .error_for_status()?
            .text()?;

        let raw: Value = serde_json::from_str(&body)
            .map_err(|e| Error::malformed(&self.endpoint, format!("invalid json: {e}")))?;

        if let Some(path) = &self.debug_dump {
            write_debug_dump(path, &raw);
        }

        parse_places(&self.endpoint, raw, with_geometry)
    }
}

fn write_debug_dump(path: &Path, raw: &Value) {
    let written = serde_json::to_string_pretty(raw)
        .map_err(std::io::Error::from)
        .and_then(|pretty| {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
            fs::write(path, pretty)
        });
    match written {
        Ok(()) => log::debug!("wrote geocoder response to {}", path.display()),
        Err(e) => log::warn!("could not write debug dump {}: {e}", path.display()),
    }
}

pub(crate) fn parse_places(endpoint: &str, raw: Value, with_geometry: bool) -> Result<LocationResult> {
    let hits: Vec<SearchHit> = serde_json::from_value(raw)
        .map_err(|e| Error::malformed(endpoint, e.to_string()))?;

    let places = hits
        .into_iter()
        .map(|hit| to_place(endpoint, hit, with_geometry))
        .collect::<Result<Vec<_>>>()?;

    Ok(LocationResult { places })
}

fn to_place(endpoint: &str, hit: SearchHit, with_geometry: bool) -> Result<PlaceRecord> {
    let lat = parse_ordinate(endpoint, "lat", &hit.lat)?;
    let lon = parse_ordinate(endpoint, "lon", &hit.lon)?;
    let place = PlaceRecord::new(hit.display_name, Coordinate::new(lat, lon));

    if !with_geometry {
        return Ok(place);
    }

    let geojson = hit.geojson.ok_or_else(|| {
        Error::malformed(
            endpoint,
            format!("no geojson for \"{}\" although it was requested", place.name),
        )
    })?;
    let (kind, rings) = geometry::normalize_raw(&geojson.kind, geojson.coordinates)?;
    Ok(place.with_geometry(kind, rings))
}

fn parse_ordinate(endpoint: &str, field: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::malformed(endpoint, format!("`{field}` is not a number: {value:?}")))
}
