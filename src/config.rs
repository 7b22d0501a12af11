use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::geocode::{DEFAULT_GEOCODER_URL, DEFAULT_ZOOM};
use crate::location::DEFAULT_IP_LOCATOR_URL;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TracerKind {
    /// Scrape the output of `tracert`/`traceroute`.
    Command,
    /// Send ICMP probes from a raw socket (needs privileges).
    Icmp,
}

/// Trace the route to a host and plot every hop on a map.
#[derive(Clone, Debug, Parser)]
#[command(name = "geotrace", version, about)]
pub struct Config {
    /// Domain or address to trace. Prompted for on stdin when omitted.
    pub target: Option<String>,

    /// Place name the route starts from.
    #[arg(long, env = "GEOTRACE_ORIGIN", default_value = "Polytech Annecy")]
    pub origin: String,

    /// Draw the origin's administrative outline.
    #[arg(long, env = "GEOTRACE_OUTLINE_ORIGIN")]
    pub outline_origin: bool,

    /// Boundary detail requested from the geocoder (higher is finer).
    #[arg(long, env = "GEOTRACE_ZOOM", default_value_t = DEFAULT_ZOOM)]
    pub zoom: u8,

    #[arg(long, env = "GEOTRACE_GEOCODER_URL", default_value = DEFAULT_GEOCODER_URL)]
    pub geocoder_url: String,

    #[arg(long, env = "GEOTRACE_IP_LOCATOR_URL", default_value = DEFAULT_IP_LOCATOR_URL)]
    pub ip_locator_url: String,

    #[arg(
        long,
        env = "GEOTRACE_USER_AGENT",
        default_value = concat!("geotrace/", env!("CARGO_PKG_VERSION"))
    )]
    pub user_agent: String,

    /// Where the last raw geocoder response is written.
    #[arg(long, env = "GEOTRACE_DEBUG_DUMP", default_value = "data/last_country.json")]
    pub debug_dump: PathBuf,

    /// Map document to write.
    #[arg(short, long, env = "GEOTRACE_OUTPUT", default_value = "traceroute_map.html")]
    pub output: PathBuf,

    /// Write the map without opening a browser.
    #[arg(long)]
    pub no_open: bool,

    #[arg(long, value_enum, env = "GEOTRACE_TRACER", default_value_t = TracerKind::Command)]
    pub tracer: TracerKind,

    /// ICMP tracer: highest TTL probed.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u8).range(1..))]
    pub max_hops: u8,

    /// ICMP tracer: probes sent per TTL.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..))]
    pub tries_per_hop: u8,

    /// ICMP tracer: seconds to wait for replies per TTL.
    #[arg(long, default_value_t = 1)]
    pub timeout_secs: u64,

    /// Opacity of the line leading to the first resolved hop, minus one step.
    #[arg(long, default_value_t = 0.1)]
    pub base_opacity: f64,

    /// Cap line opacity at 1.0 on long routes.
    #[arg(long)]
    pub clamp_opacity: bool,
}

/// Settings for the raw socket prober.
///
/// TTL and probe count are both bytes, so every probe's sequence number
/// (`(ttl - 1) * tries_per_hop + try`) fits in the 16-bit ICMP field.
#[derive(Clone, Copy, Debug)]
pub struct ProbeConfig {
    pub max_hops: u8,
    pub tries_per_hop: u8,
    pub timeout: Duration,
}

impl Config {
    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            max_hops: self.max_hops,
            tries_per_hop: self.tries_per_hop,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}
