// ── MAC identity ──
//
// Device serial numbers and client station addresses are both MACs and are
// the join key across every table of a run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// MAC address, normalized to lowercase. Dash separators become colons;
/// bare hex serial numbers (`903cb3bb2521`) stay bare.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct MacAddress(String);

impl MacAddress {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized = raw.as_ref().trim().to_lowercase().replace('-', ":");
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<String> for MacAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for MacAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
