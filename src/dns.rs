use std::net::{IpAddr, Ipv4Addr};

use dns_lookup::lookup_host;

use crate::error::{Error, Result};

/// Resolves `target` to the IPv4 address a numeric IPv4-only trace would use.
pub fn resolve_ipv4(target: &str) -> Result<Ipv4Addr> {
    if let Ok(ip) = target.parse::<Ipv4Addr>() {
        return Ok(ip);
    }

    let ips = lookup_host(target).map_err(|e| {
        log::debug!("lookup of {target} failed: {e}");
        Error::Resolve(target.to_owned())
    })?;

    ips.into_iter()
        .find_map(|ip| match ip {
            IpAddr::V4(ipv4) => Some(ipv4),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| Error::Resolve(target.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_short_circuits() {
        assert_eq!(
            resolve_ipv4("93.184.216.34").unwrap(),
            Ipv4Addr::new(93, 184, 216, 34)
        );
    }

    #[test]
    fn localhost_resolves() {
        assert!(resolve_ipv4("localhost").unwrap().is_loopback());
    }

    #[test]
    fn ipv6_literal_has_no_ipv4() {
        assert!(matches!(resolve_ipv4("::1"), Err(Error::Resolve(_))));
    }
}
