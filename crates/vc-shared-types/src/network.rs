use std::str::FromStr;

use mac_address::MacAddress;
use serde::{Deserialize, Serialize};

use crate::error::SharedTypeError;

/// MAC address of a virtual adapter.
///
/// vCenter reports MACs in lower case while CloudShell requests may carry
/// them in any case, so comparisons go through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr(pub MacAddress);

impl MacAddr {
    /// Compare a raw MAC string against this address, ignoring case and
    /// separator style. Unparseable strings never match.
    pub fn matches(&self, raw: &str) -> bool {
        raw.parse::<MacAddr>().map(|other| other == *self).unwrap_or(false)
    }
}

struct MacAddrVisitor;

impl<'de> serde::de::Visitor<'de> for MacAddrVisitor {
    type Value = MacAddr;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a MAC address string")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse::<MacAddr>()
            .map_err(|_| E::custom(format!("invalid MAC address: {}", v)))
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(MacAddrVisitor)
    }
}

impl Serialize for MacAddr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl FromStr for MacAddr {
    type Err = SharedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .replace('-', ":")
            .parse::<MacAddress>()
            .map(MacAddr)
            .map_err(|_| SharedTypeError::InvalidValue {
                field: "mac_address",
                value: s.to_string(),
            })
    }
}

impl std::fmt::Display for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mac() {
        let mac: MacAddr = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn mac_matching_ignores_case_and_separator() {
        let mac: MacAddr = "00:50:56:aa:01:02".parse().unwrap();
        assert!(mac.matches("00:50:56:AA:01:02"));
        assert!(mac.matches("00-50-56-aa-01-02"));
        assert!(!mac.matches("00:50:56:aa:01:03"));
        assert!(!mac.matches("not-a-mac"));
    }

    #[test]
    fn reject_garbage() {
        assert!("zz:bb:cc:dd:ee:ff".parse::<MacAddr>().is_err());
    }
}
