use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical venue identity. Wire and storage encoding is the lowercase
/// slug (`"polymarket"` / `"kalshi"`), matching the original event
/// schema's `venue: str` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Polymarket,
    Kalshi,
}

impl Venue {
    #[must_use]
    pub fn as_slug(self) -> &'static str {
        match self {
            Venue::Polymarket => "polymarket",
            Venue::Kalshi => "kalshi",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_slug())
    }
}

impl FromStr for Venue {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "polymarket" => Ok(Venue::Polymarket),
            "kalshi" => Ok(Venue::Kalshi),
            other => Err(crate::Error::Config(format!("unknown venue: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_slug() {
        assert_eq!(Venue::Polymarket.as_slug(), "polymarket");
        assert_eq!("kalshi".parse::<Venue>().unwrap(), Venue::Kalshi);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("POLYMARKET".parse::<Venue>().unwrap(), Venue::Polymarket);
    }

    #[test]
    fn rejects_unknown_venue() {
        assert!("deribit".parse::<Venue>().is_err());
    }

    #[test]
    fn serializes_as_lowercase_slug() {
        let json = serde_json::to_string(&Venue::Kalshi).unwrap();
        assert_eq!(json, "\"kalshi\"");
    }
}
