//! Recognising NMEA output in a buffer of raw serial bytes.

use memchr::memmem;
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// `$`, two-letter talker id, three-letter sentence id, field separator.
static ANY_TALKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$[A-Z]{2}[A-Z]{3},").expect("talker pattern is valid"));

/// Decides whether bytes read from a port look like a GPS talking at the
/// right baud rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreambleMatcher {
    /// The literal `$GP` anywhere in the buffer.
    #[default]
    Gps,
    /// Any standard talker: `$GN`, `$GL`, `$GA`, `$BD`, ... followed by a
    /// sentence id. Picks up GLONASS, Galileo and multi-constellation
    /// receivers that never emit `$GP`.
    AnyTalker,
}

impl PreambleMatcher {
    pub fn matches(&self, buffer: &[u8]) -> bool {
        match self {
            PreambleMatcher::Gps => memmem::find(buffer, b"$GP").is_some(),
            PreambleMatcher::AnyTalker => ANY_TALKER.is_match(buffer),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PreambleMatcher::Gps => "gps",
            PreambleMatcher::AnyTalker => "any-talker",
        }
    }
}

impl FromStr for PreambleMatcher {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gps" => Ok(Self::Gps),
            "any-talker" | "any_talker" => Ok(Self::AnyTalker),
            other => Err(format!(
                "unknown preamble '{}', expected 'gps' or 'any-talker'",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gps_matches_anywhere() {
        let matcher = PreambleMatcher::Gps;
        assert!(matcher.matches(b"junk$GPGGA,123519,4807.038,N\r\n"));
        assert!(matcher.matches(b"$GP"));
        assert!(!matcher.matches(b"$GNGGA,123519,4807.038,N\r\n"));
        assert!(!matcher.matches(b"$G"));
        assert!(!matcher.matches(b""));
    }

    #[test]
    fn test_gps_ignores_binary_noise() {
        let noise: Vec<u8> = (0x80..=0xff).collect();
        assert!(!PreambleMatcher::Gps.matches(&noise));
    }

    #[test]
    fn test_any_talker() {
        let matcher = PreambleMatcher::AnyTalker;
        assert!(matcher.matches(b"\r\n$GNRMC,225446,A,4916.45,N\r\n"));
        assert!(matcher.matches(b"$GLGSV,3,1,11,"));
        assert!(matcher.matches(b"$GPGGA,"));
        assert!(!matcher.matches(b"$GP"));
        assert!(!matcher.matches(b"$gpgga,"));
        assert!(!matcher.matches(b"GPGGA,"));
    }

    #[test]
    fn test_parse() {
        assert_eq!("gps".parse::<PreambleMatcher>(), Ok(PreambleMatcher::Gps));
        assert_eq!(
            " Any-Talker ".parse::<PreambleMatcher>(),
            Ok(PreambleMatcher::AnyTalker)
        );
        assert!("nmea".parse::<PreambleMatcher>().is_err());
    }

    #[test]
    fn test_as_str_round_trips() {
        for matcher in [PreambleMatcher::Gps, PreambleMatcher::AnyTalker] {
            assert_eq!(matcher.as_str().parse::<PreambleMatcher>(), Ok(matcher));
        }
    }
}
