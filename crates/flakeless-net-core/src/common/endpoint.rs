use crate::{DEFAULT_NAMESPACE, Error};
use core::{fmt, str::FromStr};

/// A parsed `host:port/namespace` address.
///
/// An optional `tcp://` or `http://` scheme is accepted and ignored. A
/// missing path selects the root namespace `/`.
///
/// ```
/// use flakeless_net_core::Endpoint;
///
/// let endpoint: Endpoint = "http://127.0.0.1:4000/a".parse().unwrap();
/// assert_eq!(endpoint.addr, "127.0.0.1:4000");
/// assert_eq!(endpoint.namespace, "/a");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub addr: String,
    pub namespace: String,
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let rest = ["tcp://", "http://"]
            .iter()
            .find_map(|scheme| trimmed.strip_prefix(scheme))
            .unwrap_or(trimmed);

        let (addr, namespace) = match rest.find('/') {
            Some(at) => (&rest[..at], normalize_namespace(&rest[at..])),
            None => (rest, DEFAULT_NAMESPACE.to_owned()),
        };
        if addr.is_empty() || !addr.contains(':') {
            return Err(Error::InvalidAddress {
                address: s.to_owned(),
            });
        }

        Ok(Self {
            addr: addr.to_owned(),
            namespace,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace == DEFAULT_NAMESPACE {
            f.write_str(&self.addr)
        } else {
            write!(f, "{}{}", self.addr, self.namespace)
        }
    }
}

/// Gives `name` exactly one leading `/` so `a`, `/a` and `//a` name the
/// same channel.
pub fn normalize_namespace(name: &str) -> String {
    format!("/{}", name.trim().trim_start_matches('/'))
}
