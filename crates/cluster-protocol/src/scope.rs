/// Multicast TTL scope conventions.
///
/// The IP "time to live" of a multicast packet limits how far routers forward
/// it. By convention:
///
/// | TTL | Scope        |
/// |-----|--------------|
/// | 0   | same host    |
/// | 1   | same subnet  |
/// | 32  | same site    |
/// | 64  | same region  |
/// | 128 | same continent |
/// | 255 | unrestricted |
///
/// Values in between fall into the next wider scope.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MulticastScope {
    Host,
    Subnet,
    Site,
    Region,
    Continent,
    Unrestricted,
}

impl MulticastScope {
    pub fn from_ttl(ttl: u8) -> Self {
        match ttl {
            0 => Self::Host,
            1 => Self::Subnet,
            2..=32 => Self::Site,
            33..=64 => Self::Region,
            65..=128 => Self::Continent,
            _ => Self::Unrestricted,
        }
    }

    /// Smallest TTL that reaches this scope.
    pub fn ttl(self) -> u8 {
        match self {
            Self::Host => 0,
            Self::Subnet => 1,
            Self::Site => 32,
            Self::Region => 64,
            Self::Continent => 128,
            Self::Unrestricted => 255,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Subnet => "subnet",
            Self::Site => "site",
            Self::Region => "region",
            Self::Continent => "continent",
            Self::Unrestricted => "unrestricted",
        }
    }
}

impl std::fmt::Display for MulticastScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conventional_values() {
        assert_eq!(MulticastScope::from_ttl(0), MulticastScope::Host);
        assert_eq!(MulticastScope::from_ttl(1), MulticastScope::Subnet);
        assert_eq!(MulticastScope::from_ttl(32), MulticastScope::Site);
        assert_eq!(MulticastScope::from_ttl(64), MulticastScope::Region);
        assert_eq!(MulticastScope::from_ttl(128), MulticastScope::Continent);
        assert_eq!(MulticastScope::from_ttl(255), MulticastScope::Unrestricted);
    }

    #[test]
    fn test_in_between_rounds_up() {
        assert_eq!(MulticastScope::from_ttl(2), MulticastScope::Site);
        assert_eq!(MulticastScope::from_ttl(33), MulticastScope::Region);
        assert_eq!(MulticastScope::from_ttl(200), MulticastScope::Unrestricted);
    }

    #[test]
    fn test_ttl_maps_back() {
        for scope in [
            MulticastScope::Host,
            MulticastScope::Subnet,
            MulticastScope::Site,
            MulticastScope::Region,
            MulticastScope::Continent,
            MulticastScope::Unrestricted,
        ] {
            assert_eq!(MulticastScope::from_ttl(scope.ttl()), scope);
        }
    }
}
