use std::path::PathBuf;

use reqwest::blocking::Client;

use crate::config::{Config, TracerKind};
use crate::dns::resolve_ipv4;
use crate::error::{Error, Result};
use crate::geocode::ForwardGeocodeClient;
use crate::hops::{CommandTracer, HopSource};
use crate::icmp::IcmpTracer;
use crate::location::{IpLocation, ReverseIpLocateClient};
use crate::map::write_map;
use crate::route::plot_route;

pub fn http_client(user_agent: &str) -> Result<Client> {
    Ok(Client::builder().user_agent(user_agent).build()?)
}

pub fn hop_source(config: &Config) -> Box<dyn HopSource> {
    match config.tracer {
        TracerKind::Command => Box::new(CommandTracer::default()),
        TracerKind::Icmp => Box::new(IcmpTracer::new(config.probe_config())),
    }
}

/// Traces `target`, locates every hop and writes the map. Returns the map's path.
pub fn trace_route(config: &Config, target: &str) -> Result<PathBuf> {
    trace_route_with(config, target, hop_source(config).as_ref())
}

/// [`trace_route`] with the hops collected by `source` instead of the
/// configured tracer.
pub fn trace_route_with(
    config: &Config,
    target: &str,
    source: &dyn HopSource,
) -> Result<PathBuf> {
    let destination = resolve_ipv4(target)?;
    println!("traceroute to {target} ({destination})");

    println!("------- Collecting hop addresses -------");
    let hops = source.collect_hops(target)?;
    if hops.is_empty() {
        return Err(Error::NoHops(target.to_owned()));
    }
    for (index, hop) in hops.iter().enumerate() {
        println!("{index:>3}.   {hop}");
    }

    let http = http_client(&config.user_agent)?;
    let geocoder = ForwardGeocodeClient::new(http.clone(), config.geocoder_url.as_str())
        .with_debug_dump(config.debug_dump.clone());
    let locator = ReverseIpLocateClient::new(http, config.ip_locator_url.as_str());

    let origins = geocoder.geocode(&config.origin, config.outline_origin, config.zoom)?;
    let origin = origins
        .first()
        .ok_or_else(|| Error::OriginNotFound(config.origin.clone()))?;
    log::info!("route starts at {origin}");

    println!("\n------- Locating hops -------");
    println!("{:>4}   {:<40} {:<30}", "Hop", "Host IP address", "Location");
    let route = plot_route(
        origin,
        &hops,
        &locator,
        config.base_opacity,
        config.clamp_opacity,
        |index, hop, location| match location {
            IpLocation::Found(place) => println!(
                "{index:>3}.   {:<40} {:<30}",
                hop.to_string(),
                place.short_name()
            ),
            IpLocation::NotFound => {
                println!("{index:>3}.   {:<40} {:<30}", hop.to_string(), "N.a.")
            }
        },
    )?;

    write_map(&config.output, &format!("Route to {target}"), &route)?;
    Ok(config.output.clone())
}
