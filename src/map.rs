//! Renders a [`RouteMap`] as a self-contained Leaflet page.
//!
//! The route is embedded as one JSON document and drawn client side. The
//! origin is blue and located hops are red. A hop that could not be located
//! is black and sits on the previous point. Lines run hop to hop and get
//! darker towards the target.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::error::Result;
use crate::route::RouteMap;

const LEAFLET_CSS_URL: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS_URL: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const ATTRIBUTION: &str = "&copy; OpenStreetMap contributors";

const LINE_COLOR: &str = "red";

const PAGE_STYLE: &str = "html, body, #map { height: 100%; margin: 0; }";

pub fn render_page(title: &str, route: &RouteMap) -> Result<Markup> {
    let data = script_safe(&serde_json::to_string(route).map_err(std::io::Error::from)?);
    Ok(html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (title) }
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                link rel="stylesheet" href=(LEAFLET_CSS_URL);
                script src=(LEAFLET_JS_URL) {}
                style { (PAGE_STYLE) }
            }
            body {
                div id="map" {}
                script { (PreEscaped(route_script(&data))) }
            }
        }
    })
}

/// Leaflet code drawing `data`, which must already be [`script_safe`].
fn route_script(data: &str) -> String {
    format!(
        r#"
const route = {data};
const map = L.map("map");
L.tileLayer("{TILE_URL}", {{ maxZoom: 19, attribution: "{ATTRIBUTION}" }}).addTo(map);

const ll = c => [c.lat, c.lon];
const bounds = L.latLngBounds([ll(route.origin.coordinate)]);

for (const outline of route.outlines) {{
  L.polygon(outline.rings.map(r => r.map(ll)), {{ color: "blue", weight: 1, fillOpacity: 0.1 }})
    .bindPopup(outline.name).addTo(map);
}}
for (const line of route.lines) {{
  L.polyline([ll(line.from), ll(line.to)], {{ color: "{LINE_COLOR}", opacity: line.opacity }}).addTo(map);
}}
for (const m of [route.origin, ...route.markers]) {{
  L.circleMarker(ll(m.coordinate), {{ radius: 7, color: m.color, fillColor: m.color, fillOpacity: 0.8 }})
    .bindPopup(m.popup).addTo(map);
  bounds.extend(ll(m.coordinate));
}}
map.fitBounds(bounds.pad(0.2), {{ maxZoom: 10 }});
"#
    )
}

pub fn write_map(path: &Path, title: &str, route: &RouteMap) -> Result<()> {
    let html = render_page(title, route)?.into_string();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, &html)?;
    log::debug!("wrote {} ({} bytes)", path.display(), html.len());
    Ok(())
}

/// Hands `path` to the desktop's default handler for HTML files.
pub fn open_in_browser(path: &Path) -> Result<()> {
    let path = fs::canonicalize(path)?;
    let mut command = opener();
    command
        .arg(&path)
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    let status = command.status()?;
    if !status.success() {
        log::warn!("browser opener exited with {status}; open {} manually", path.display());
    }
    Ok(())
}

#[cfg(target_os = "windows")]
fn opener() -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", ""]);
    command
}

#[cfg(target_os = "macos")]
fn opener() -> Command {
    Command::new("open")
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn opener() -> Command {
    Command::new("xdg-open")
}

/// JSON is valid JavaScript, but `</script>` inside a string would end the block.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::{Coordinate, PlaceRecord};
    use crate::route::{MarkerColor, Marker, Polyline};

    fn sample() -> RouteMap {
        let mut route = RouteMap::new(&PlaceRecord::new("Annecy", Coordinate::new(45.9, 6.1)));
        route.lines.push(Polyline {
            from: Coordinate::new(45.9, 6.1),
            to: Coordinate::new(48.8, 2.3),
            opacity: 0.35,
        });
        route.markers.push(Marker {
            coordinate: Coordinate::new(48.8, 2.3),
            popup: "0 : Paris".to_owned(),
            color: MarkerColor::Red,
        });
        route.markers.push(Marker {
            coordinate: Coordinate::new(48.8, 2.3),
            popup: "1 : </script><b>x</b>".to_owned(),
            color: MarkerColor::Black,
        });
        route
    }

    fn render(title: &str) -> String {
        render_page(title, &sample()).unwrap().into_string()
    }

    #[test]
    fn embeds_route_data() {
        let html = render("Route to example.com");
        assert!(html.contains(r#""opacity":0.35"#));
        assert!(html.contains(r#""color":"black""#));
        assert!(html.contains(r#""color":"blue""#));
        assert!(html.contains("<title>Route to example.com</title>"));
        assert!(html.contains(LEAFLET_JS_URL));
    }

    #[test]
    fn popups_cannot_close_the_script() {
        let html = render("t");
        assert_eq!(html.matches("</script>").count(), 2);
        assert!(html.contains(r"<\/script>"));
    }

    #[test]
    fn title_is_escaped() {
        let html = render("<a & b>");
        assert!(html.contains("<title>&lt;a &amp; b&gt;</title>"));
        assert!(!html.contains("<a & b>"));
    }

    #[test]
    fn script_sees_raw_route_json() {
        let html = render("t");
        assert!(html.contains(r#"const route = {"origin":"#));
        assert!(html.contains(r#""popup":"0 : Paris""#));
        assert!(!html.contains("&quot;"));
    }

    #[test]
    fn writes_into_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maps").join("route.html");
        write_map(&path, "t", &sample()).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<!DOCTYPE html>"));
    }
}
