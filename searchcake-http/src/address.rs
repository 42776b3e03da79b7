use std::fmt::{Display, Formatter};
use std::net::Ipv6Addr;
use std::str::FromStr;

use http::Uri;

use crate::EsError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// The `host:port` address of a single cluster node.
///
/// The address is opaque beyond being non-empty and forming a valid URI.
/// An address may optionally carry a scheme (`https://host:port`), when it does
/// not `http://` is assumed. Bare IPv6 hosts (`::1:9200`) are bracketed.
pub struct Address(String);

impl Address {
    /// Creates a new address, rejecting blank strings and anything which
    /// cannot be turned into a request URI.
    pub fn new(addr: impl Into<String>) -> Result<Self, EsError> {
        let addr = addr.into();
        let trimmed = addr.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(EsError::InvalidAddress(addr));
        }

        let address = Self(bracket_ipv6_host(trimmed));
        if address.base_url().parse::<Uri>().is_err() {
            return Err(EsError::InvalidAddress(addr));
        }

        Ok(address)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The base URL requests to this node are made against.
    pub fn base_url(&self) -> String {
        if self.0.contains("://") {
            self.0.clone()
        } else {
            format!("http://{}", self.0)
        }
    }
}

/// Wraps an unbracketed IPv6 host in `[]` so the port can be told apart.
fn bracket_ipv6_host(addr: &str) -> String {
    let (scheme, authority) = match addr.split_once("://") {
        Some((scheme, authority)) => (Some(scheme), authority),
        None => (None, addr),
    };

    let authority = match authority.rsplit_once(':') {
        Some((host, port)) if host.parse::<Ipv6Addr>().is_ok() => {
            format!("[{host}]:{port}")
        },
        _ => authority.to_string(),
    };

    match scheme {
        Some(scheme) => format!("{scheme}://{authority}"),
        None => authority,
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = EsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_address_rejected() {
        assert!(matches!(Address::new(""), Err(EsError::InvalidAddress(_))));
        assert!(matches!(Address::new("   "), Err(EsError::InvalidAddress(_))));
        assert!(matches!(Address::new("/"), Err(EsError::InvalidAddress(_))));
        assert!(matches!(
            Address::new("not a host:9200"),
            Err(EsError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_ipv6_host_is_bracketed() {
        let addr = Address::new("0:0:0:0:0:0:0:1:9200").unwrap();
        assert_eq!(addr.as_str(), "[0:0:0:0:0:0:0:1]:9200");
        assert_eq!(addr.base_url(), "http://[0:0:0:0:0:0:0:1]:9200");
        assert!(addr.base_url().parse::<Uri>().is_ok());

        let addr = Address::new("https://fe80::1:9243").unwrap();
        assert_eq!(addr.base_url(), "https://[fe80::1]:9243");

        let addr = Address::new("[::1]:9200").unwrap();
        assert_eq!(addr.as_str(), "[::1]:9200");
    }

    #[test]
    fn test_base_url() {
        let addr = Address::new("10.0.0.5:9200").unwrap();
        assert_eq!(addr.base_url(), "http://10.0.0.5:9200");

        let addr = Address::new("https://search.local:9243/").unwrap();
        assert_eq!(addr.as_str(), "https://search.local:9243");
        assert_eq!(addr.base_url(), "https://search.local:9243");
    }
}
