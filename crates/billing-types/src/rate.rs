use serde::{Deserialize, Serialize};

/// A pricing record matched against a destination by longest prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationRate {
    pub carrier_tag: String,
    pub pricelist_tag: String,
    pub prefix: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub connect_fee: i64,
    #[serde(default)]
    pub rate: i64,
    #[serde(default)]
    pub rate_increment: u32,
    #[serde(default)]
    pub interval_start: i64
}

impl DestinationRate {
    /// `rate_increment` of zero means "unset" on the wire; callers always see
    /// a normalized value of at least one.
    pub fn rate_increment(&self) -> u32 {
        self.rate_increment.max(1)
    }
}

/// One ranked entry of a least-cost-routing list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carrier {
    pub protocol: String,
    pub host: String,
    pub port: u16
}

impl Carrier {
    pub fn to_uri(&self) -> String {
        format!("{}:{}:{}", self.protocol, self.host, self.port)
    }
}
