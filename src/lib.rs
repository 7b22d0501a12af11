pub mod config;
pub mod dns;
pub mod error;
pub mod geocode;
pub mod geometry;
pub mod hops;
pub mod icmp;
pub mod location;
pub mod map;
pub mod place;
pub mod route;
pub mod traceroute;

pub use error::{Error, Result};
