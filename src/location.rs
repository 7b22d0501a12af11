use std::net::IpAddr;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::place::{Coordinate, PlaceRecord};

pub const DEFAULT_IP_LOCATOR_URL: &str = "https://geolocation-db.com/json/";

/// Sentinel the provider puts in `country_code` (and usually every other field)
/// for addresses it knows nothing about, e.g. private ranges.
const NOT_FOUND: &str = "Not found";

#[derive(Clone, Debug, PartialEq)]
pub enum IpLocation {
    Found(PlaceRecord),
    NotFound,
}

/// Resolves a hop address to a place. Implemented by [`ReverseIpLocateClient`].
pub trait IpLocator {
    fn locate(&self, ip: IpAddr) -> Result<IpLocation>;
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Ordinate {
    Number(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct GeoIpData {
    country_code: Option<String>,
    country_name: Option<String>,
    city: Option<String>,
    #[serde(alias = "lat")]
    latitude: Option<Ordinate>,
    #[serde(alias = "lon")]
    longitude: Option<Ordinate>,
}

pub struct ReverseIpLocateClient {
    http: Client,
    endpoint: String,
}

impl ReverseIpLocateClient {
    pub fn new(http: Client, endpoint: impl Into<String>) -> Self {
        ReverseIpLocateClient {
            http,
            endpoint: endpoint.into(),
        }
    }

    fn url_for(&self, ip: IpAddr) -> String {
        let mut url = self.endpoint.clone();
        if !url.ends_with('/') {
            url.push('/');
        }
        url.push_str(&ip.to_string());
        url
    }
}

impl IpLocator for ReverseIpLocateClient {
    fn locate(&self, ip: IpAddr) -> Result<IpLocation> {
        let url = self.url_for(ip);
        log::debug!("locating {ip} via {url}");

        let body = self.http.get(&url).send()?.error_for_status()?.text()?;
        let geo_ip_data: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| Error::malformed(&self.endpoint, format!("invalid json: {e}")))?;

        parse_location(&self.endpoint, geo_ip_data)
    }
}

pub(crate) fn parse_location(endpoint: &str, raw: serde_json::Value) -> Result<IpLocation> {
    let data: GeoIpData =
        serde_json::from_value(raw).map_err(|e| Error::malformed(endpoint, e.to_string()))?;

    let country_code = data
        .country_code
        .as_deref()
        .ok_or_else(|| Error::malformed(endpoint, "missing `country_code`"))?;
    if country_code == NOT_FOUND {
        return Ok(IpLocation::NotFound);
    }

    let name = match known(data.city) {
        Some(city) => city,
        None => known(data.country_name)
            .ok_or_else(|| Error::malformed(endpoint, "neither `city` nor `country_name`"))?,
    };

    let lat = ordinate(endpoint, "latitude", data.latitude)?;
    let lon = ordinate(endpoint, "longitude", data.longitude)?;

    Ok(IpLocation::Found(PlaceRecord::new(
        name,
        Coordinate::new(lat, lon),
    )))
}

fn known(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.trim().is_empty() && v != NOT_FOUND)
}

fn ordinate(endpoint: &str, field: &str, value: Option<Ordinate>) -> Result<f64> {
    match value {
        Some(Ordinate::Number(n)) => Ok(n),
        Some(Ordinate::Text(s)) => s
            .trim()
            .parse()
            .map_err(|_| Error::malformed(endpoint, format!("`{field}` is not a number: {s:?}"))),
        None => Err(Error::malformed(endpoint, format!("missing `{field}`"))),
    }
}
