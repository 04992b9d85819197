//! Semantic version value type for release numbering.
//!
//! Releases are ordered by the `(major, minor, patch)` triple; the string
//! form is always the canonical `"major.minor.patch"` rendering.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A semantic version triple.
///
/// Ordering is lexicographic over `(major, minor, patch)`, which the derived
/// `Ord` provides given the field declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

/// Which component of a version to increment on deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpPart {
    Major,
    Minor,
    Patch,
}

impl Version {
    /// The version assigned to an entity's very first release.
    pub const INITIAL: Version = Version {
        major: 0,
        minor: 0,
        patch: 1,
    };

    /// Compute the next version after `latest`.
    ///
    /// With no prior release this is [`Version::INITIAL`]. Otherwise the
    /// named component is incremented and all lower components reset to
    /// zero, so bumping minor on `1.4.7` yields `1.5.0`.
    pub fn bump(latest: Option<Version>, part: BumpPart) -> Version {
        let Some(v) = latest else {
            return Version::INITIAL;
        };
        match part {
            BumpPart::Major => Version {
                major: v.major + 1,
                minor: 0,
                patch: 0,
            },
            BumpPart::Minor => Version {
                major: v.major,
                minor: v.minor + 1,
                patch: 0,
            },
            BumpPart::Patch => Version {
                major: v.major,
                minor: v.minor,
                patch: v.patch + 1,
            },
        }
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidVersion(s.to_string());

        // std's u32 parser tolerates a leading '+'; versions don't.
        let segment = |seg: &str| -> Result<u32> {
            if seg.is_empty() || !seg.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            seg.parse::<u32>().map_err(|_| invalid())
        };

        match s.split('.').collect::<Vec<_>>().as_slice() {
            [major, minor, patch] => Ok(Version {
                major: segment(major)?,
                minor: segment(minor)?,
                patch: segment(patch)?,
            }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for BumpPart {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "major" => Ok(BumpPart::Major),
            "minor" => Ok(BumpPart::Minor),
            "patch" => Ok(BumpPart::Patch),
            _ => Err(Error::BadRequest(format!(
                "Invalid bump part: {} (expected major, minor, or patch)",
                s
            ))),
        }
    }
}

impl fmt::Display for BumpPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BumpPart::Major => write!(f, "major"),
            BumpPart::Minor => write!(f, "minor"),
            BumpPart::Patch => write!(f, "patch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(major: u32, minor: u32, patch: u32) -> Version {
        Version {
            major,
            minor,
            patch,
        }
    }

    #[test]
    fn test_parse_valid() {
        assert_eq!("0.0.1".parse::<Version>().unwrap(), v(0, 0, 1));
        assert_eq!("1.2.3".parse::<Version>().unwrap(), v(1, 2, 3));
        assert_eq!("10.20.30".parse::<Version>().unwrap(), v(10, 20, 30));
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        for bad in [
            "", "1", "1.2", "1.2.3.4", "1.2.x", "a.b.c", "-1.0.0", "1.-2.0", "+1.0.0", "1..3",
            "v1.2.3", " 1.2.3", "1.2.3 ",
        ] {
            assert!(
                bad.parse::<Version>().is_err(),
                "expected parse failure for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_round_trip() {
        for s in ["0.0.1", "1.2.3", "0.10.0", "99.0.7"] {
            let parsed: Version = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
            assert_eq!(parsed.to_string().parse::<Version>().unwrap(), parsed);
        }
    }

    #[test]
    fn test_ordering_is_lexicographic_triple() {
        assert!(v(0, 0, 2) > v(0, 0, 1));
        assert!(v(0, 1, 0) > v(0, 0, 99));
        assert!(v(1, 0, 0) > v(0, 99, 99));
        assert!(v(2, 0, 0) > v(1, 99, 0));
    }

    #[test]
    fn test_bump_from_none_is_initial() {
        assert_eq!(Version::bump(None, BumpPart::Patch), Version::INITIAL);
        assert_eq!(Version::bump(None, BumpPart::Major), Version::INITIAL);
    }

    #[test]
    fn test_bump_increments_and_zeroes() {
        let base = v(1, 4, 7);
        assert_eq!(Version::bump(Some(base), BumpPart::Patch), v(1, 4, 8));
        assert_eq!(Version::bump(Some(base), BumpPart::Minor), v(1, 5, 0));
        assert_eq!(Version::bump(Some(base), BumpPart::Major), v(2, 0, 0));
    }

    #[test]
    fn test_bump_strictly_increases() {
        let base = v(3, 2, 1);
        for part in [BumpPart::Major, BumpPart::Minor, BumpPart::Patch] {
            assert!(Version::bump(Some(base), part) > base);
        }
    }

    #[test]
    fn test_serde_string_form() {
        let ver = v(1, 2, 3);
        assert_eq!(serde_json::to_string(&ver).unwrap(), "\"1.2.3\"");
        let back: Version = serde_json::from_str("\"1.2.3\"").unwrap();
        assert_eq!(back, ver);
        assert!(serde_json::from_str::<Version>("\"1.2\"").is_err());
    }
}
