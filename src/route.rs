//! Turns a list of hops into markers and lines, one hop at a time.
//!
//! The only state carried between hops is [`RouteState`]: the last place that
//! resolved and the opacity of the last line drawn. Hops that cannot be located
//! leave it untouched, so the next resolved hop connects back to the last known
//! point instead of to a placeholder.

use serde::Serialize;

use crate::error::Result;
use crate::geometry::Ring;
use crate::hops::Hop;
use crate::location::{IpLocation, IpLocator};
use crate::place::{Coordinate, PlaceRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    Red,
    Black,
    Blue,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Marker {
    pub coordinate: Coordinate,
    pub popup: String,
    pub color: MarkerColor,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Polyline {
    pub from: Coordinate,
    pub to: Coordinate,
    pub opacity: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Outline {
    pub name: String,
    pub rings: Vec<Ring>,
}

/// Everything drawn for one trace, in drawing order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RouteMap {
    pub origin: Marker,
    pub outlines: Vec<Outline>,
    pub markers: Vec<Marker>,
    pub lines: Vec<Polyline>,
}

impl RouteMap {
    pub fn new(origin: &PlaceRecord) -> Self {
        let outlines = if origin.ring_count() > 0 {
            vec![Outline {
                name: origin.short_name().to_owned(),
                rings: origin.rings().to_vec(),
            }]
        } else {
            Vec::new()
        };
        RouteMap {
            origin: Marker {
                coordinate: origin.coordinate,
                popup: format!("origin : {}", origin.short_name()),
                color: MarkerColor::Blue,
            },
            outlines,
            markers: Vec::new(),
            lines: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RouteStyle {
    pub base_opacity: f64,
    /// Added to the opacity for every line drawn.
    pub step: f64,
    pub clamp: bool,
}

impl RouteStyle {
    /// Lines darken by `1 / hop_count` per resolved hop, starting above `base_opacity`.
    pub fn new(base_opacity: f64, hop_count: usize, clamp: bool) -> Self {
        let step = if hop_count == 0 {
            0.0
        } else {
            1.0 / hop_count as f64
        };
        RouteStyle {
            base_opacity,
            step,
            clamp,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteState {
    pub previous: Coordinate,
    pub opacity: f64,
}

impl RouteState {
    pub fn start(origin: Coordinate, style: &RouteStyle) -> Self {
        RouteState {
            previous: origin,
            opacity: style.base_opacity,
        }
    }
}

/// Draws hop number `index` onto `map` and returns the state for the next hop.
pub fn advance(
    state: RouteState,
    index: usize,
    hop: &Hop,
    location: &IpLocation,
    style: &RouteStyle,
    map: &mut RouteMap,
) -> RouteState {
    match location {
        IpLocation::Found(place) if place.coordinate.is_valid() => {
            let opacity = state.opacity + style.step;
            map.lines.push(Polyline {
                from: state.previous,
                to: place.coordinate,
                opacity: if style.clamp { opacity.min(1.0) } else { opacity },
            });
            map.markers.push(Marker {
                coordinate: place.coordinate,
                popup: format!("{index} : {}", place.short_name()),
                color: MarkerColor::Red,
            });
            RouteState {
                previous: place.coordinate,
                opacity,
            }
        }
        IpLocation::Found(place) => {
            log::warn!(
                "{hop} located at an impossible coordinate {:?}, treating as unresolved",
                place.coordinate
            );
            unresolved(state, index, hop, map)
        }
        IpLocation::NotFound => unresolved(state, index, hop, map),
    }
}

fn unresolved(state: RouteState, index: usize, hop: &Hop, map: &mut RouteMap) -> RouteState {
    map.markers.push(Marker {
        coordinate: state.previous,
        popup: format!("{index} : {hop} was not found"),
        color: MarkerColor::Black,
    });
    state
}

/// Locates every hop in order and draws the route from `origin`.
///
/// `report` sees each hop's lookup outcome as it happens. Only transport or
/// decoding failures abort; unknown addresses are drawn as placeholders.
pub fn plot_route<L, F>(
    origin: &PlaceRecord,
    hops: &[Hop],
    locator: &L,
    base_opacity: f64,
    clamp: bool,
    mut report: F,
) -> Result<RouteMap>
where
    L: IpLocator + ?Sized,
    F: FnMut(usize, &Hop, &IpLocation),
{
    let style = RouteStyle::new(base_opacity, hops.len(), clamp);
    let mut map = RouteMap::new(origin);

    let mut state = RouteState::start(origin.coordinate, &style);
    for (index, hop) in hops.iter().enumerate() {
        let location = locator.locate(hop.ip)?;
        report(index, hop, &location);
        state = advance(state, index, hop, &location, &style, &mut map);
    }

    Ok(map)
}
