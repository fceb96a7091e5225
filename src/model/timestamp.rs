use once_cell::sync::Lazy;
use regex::Regex;

use crate::prelude::*;

static PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([01][0-9]|2[0-3]):([0-5][0-9]):([0-5][0-9])$")
        .expect("playback timestamp pattern is valid")
});

/// A playback position within a piece of content, written on the wire as `HH:MM:SS`.
///
/// Hours are bounded to `00..=23`, minutes and seconds to `00..=59`. Anything else is rejected at parse time,
/// so a value of this type is always safe to persist and echo back to a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlaybackTimestamp {
    hours: u8,
    minutes: u8,
    seconds: u8,
}

impl PlaybackTimestamp {
    /// The start of the content, used to seed a position on first contact.
    pub const ZERO: PlaybackTimestamp = PlaybackTimestamp {
        hours: 0,
        minutes: 0,
        seconds: 0,
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(display("`{text}` is not a playback timestamp, expected HH:MM:SS"))]
pub struct ParsePlaybackTimestamp {
    pub text: String,
}

impl std::str::FromStr for PlaybackTimestamp {
    type Err = ParsePlaybackTimestamp;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let captures = PATTERN
            .captures(input)
            .context(ParsePlaybackTimestampSnafu { text: input })?;

        // the pattern only admits two ascii digits per group
        let field = |i: usize| captures[i].parse::<u8>().unwrap_or_default();

        Ok(PlaybackTimestamp {
            hours: field(1),
            minutes: field(2),
            seconds: field(3),
        })
    }
}

impl std::fmt::Display for PlaybackTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}

impl Serialize for PlaybackTimestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PlaybackTimestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_timestamps() {
        let parsed: PlaybackTimestamp = "00:05:30".parse().unwrap();
        assert_eq!(
            (parsed.hours, parsed.minutes, parsed.seconds),
            (0, 5, 30)
        );

        let parsed: PlaybackTimestamp = "23:59:59".parse().unwrap();
        assert_eq!(parsed.to_string(), "23:59:59");

        let parsed: PlaybackTimestamp = "19:00:00".parse().unwrap();
        assert_eq!(parsed.hours, 19);
    }

    #[test]
    fn reject_out_of_range_fields() {
        for text in ["24:00:00", "99:00:00", "12:60:00", "12:00:60"] {
            assert_eq!(
                text.parse::<PlaybackTimestamp>(),
                Err(ParsePlaybackTimestamp {
                    text: text.to_string()
                }),
                "`{text}` should be out of range"
            );
        }
    }

    #[test]
    fn reject_malformed_text() {
        for text in ["1:2:3", "", "00:00", "00:00:00:00", "00:00:00\n", " 00:00:00", "aa:bb:cc"] {
            assert!(
                text.parse::<PlaybackTimestamp>().is_err(),
                "`{text:?}` should not parse"
            );
        }
    }

    #[test]
    fn reject_non_ascii_digits() {
        // arabic-indic digits are `\d` in unicode-aware engines
        assert!("٠٠:٠٠:٠٠".parse::<PlaybackTimestamp>().is_err());
    }

    #[test]
    fn zero_is_start_of_content() {
        assert_eq!(PlaybackTimestamp::ZERO.to_string(), "00:00:00");
        assert_eq!(PlaybackTimestamp::default(), PlaybackTimestamp::ZERO);
    }

    #[test]
    fn serde_uses_wire_format() {
        let timestamp: PlaybackTimestamp = serde_json::from_str("\"01:02:03\"").unwrap();
        assert_eq!(serde_json::to_string(&timestamp).unwrap(), "\"01:02:03\"");

        let error = serde_json::from_str::<PlaybackTimestamp>("\"1:2:3\"").unwrap_err();
        assert!(error.to_string().contains("expected HH:MM:SS"));
    }
}
