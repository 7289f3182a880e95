//! Unit types used throughout the harness. Values are plain `u64` newtypes so
//! they can be compared, added, and serialized without unit mix-ups.

macro_rules! unit {
    ($name: ident) => {
        #[allow(missing_docs)]
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialOrd,
            Ord,
            PartialEq,
            Eq,
            Hash,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Sum,
            derive_more::FromStr,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub const ZERO: $name = Self::new(0);
            pub const ONE: $name = Self::new(1);
            pub const MAX: $name = Self::new(u64::MAX);

            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn into_u64(self) -> u64 {
                self.0
            }

            pub fn into_f64(self) -> f64 {
                self.0 as f64
            }
        }
    };
}

unit!(Bytes);

impl std::fmt::Display for Bytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}B", self.0)
    }
}

unit!(Nanosecs);

impl Nanosecs {
    /// The value in (fractional) seconds.
    pub fn into_secs_f64(self) -> f64 {
        self.0 as f64 / 1e9
    }
}

impl std::fmt::Display for Nanosecs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

unit!(Millisecs);

impl std::fmt::Display for Millisecs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

unit!(Secs);

impl std::fmt::Display for Secs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0)
    }
}

unit!(BitsPerSec);

impl std::fmt::Display for BitsPerSec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}bps", self.0)
    }
}

unit!(Mbps);

impl std::fmt::Display for Mbps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Mbps", self.0)
    }
}

impl From<Millisecs> for Nanosecs {
    fn from(value: Millisecs) -> Self {
        Nanosecs::new(value.into_u64() * 1_000_000)
    }
}

impl From<Secs> for Nanosecs {
    fn from(value: Secs) -> Self {
        Nanosecs::new(value.into_u64() * 1_000_000_000)
    }
}

impl From<Secs> for Millisecs {
    fn from(value: Secs) -> Self {
        Millisecs::new(value.into_u64() * 1_000)
    }
}

impl From<Mbps> for BitsPerSec {
    fn from(value: Mbps) -> Self {
        BitsPerSec::new(value.into_u64() * 1_000_000)
    }
}

impl BitsPerSec {
    /// Parses a rate with an optional `bps`/`Kbps`/`Mbps`/`Gbps` suffix, e.g.
    /// `"100Mbps"`. A bare number is taken to be in bits per second.
    pub fn parse_suffixed(s: &str) -> Result<Self, ParseRateError> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or_else(|| s.len());
        let (digits, suffix) = s.split_at(split);
        let value: u64 = digits
            .parse()
            .map_err(|_| ParseRateError(s.to_string()))?;
        let multiplier = match suffix.to_ascii_lowercase().as_str() {
            "" | "bps" => 1,
            "kbps" => 1_000,
            "mbps" => 1_000_000,
            "gbps" => 1_000_000_000,
            _ => return Err(ParseRateError(s.to_string())),
        };
        Ok(Self::new(value * multiplier))
    }
}

/// The error returned by [`BitsPerSec::parse_suffixed`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid data rate: {0}")]
pub struct ParseRateError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_conversions_correct() {
        assert_eq!(Nanosecs::from(Millisecs::ONE), Nanosecs::new(1_000_000));
        assert_eq!(Nanosecs::from(Secs::ONE), Nanosecs::new(1_000_000_000));
        assert_eq!(Millisecs::from(Secs::new(10)), Millisecs::new(10_000));
    }

    #[test]
    fn rate_conversions_correct() {
        assert_eq!(BitsPerSec::from(Mbps::new(20)), BitsPerSec::new(20_000_000));
    }

    #[test]
    fn parse_suffixed_rates() {
        assert_eq!(
            BitsPerSec::parse_suffixed("100Mbps").unwrap(),
            BitsPerSec::new(100_000_000)
        );
        assert_eq!(
            BitsPerSec::parse_suffixed("11mbps").unwrap(),
            BitsPerSec::new(11_000_000)
        );
        assert_eq!(
            BitsPerSec::parse_suffixed("1Gbps").unwrap(),
            BitsPerSec::new(1_000_000_000)
        );
        assert_eq!(
            BitsPerSec::parse_suffixed("512").unwrap(),
            BitsPerSec::new(512)
        );
        assert!(BitsPerSec::parse_suffixed("fast").is_err());
        assert!(BitsPerSec::parse_suffixed("10Tbps").is_err());
    }

    #[test]
    fn secs_display() {
        assert_eq!(Secs::new(50).to_string(), "50s");
        assert_eq!(BitsPerSec::new(20_000_000).to_string(), "20000000bps");
    }
}
