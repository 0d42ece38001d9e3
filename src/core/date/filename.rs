//! Date patterns embedded in file names.

use crate::error::ConfigError;
use chrono::{NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};

/// Default pattern, matched against the file stem.
///
/// Accepts `YYYYMMDD`, `YYYY-MM-DD`, optionally followed by a time such as
/// `_HHMMSS`, `-HH.MM.SS` or ` HH:MM`. Whatever surrounds the date is kept
/// as prefix and suffix.
pub const DEFAULT_FILENAME_PATTERN: &str = concat!(
    r"^(?P<prefix>.*?)",
    r"(?P<year>[1-3][0-9]{3})-?(?P<month>[0-9]{2})-?(?P<day>[0-9]{2})",
    r"(?:[-_ ]?(?P<hour>[0-9]{2})[-:.]?(?P<minute>[0-9]{2})(?:[-:.]?(?P<second>[0-9]{2}))?)?",
    r"(?P<suffix>.*?)$",
);

const REQUIRED_GROUPS: [&str; 3] = ["year", "month", "day"];

/// A date found in a file stem, with the text around it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameMatch {
    pub datetime: NaiveDateTime,
    pub prefix: String,
    pub suffix: String,
}

/// Ordered set of filename date patterns; the first valid match wins
#[derive(Debug, Clone)]
pub struct FilenameDatePatterns {
    patterns: Vec<Regex>,
}

impl FilenameDatePatterns {
    /// Custom patterns are tried first, then the default one.
    ///
    /// Each custom pattern must define `year`, `month` and `day` groups and
    /// may define `hour`, `minute`, `second`, `prefix` and `suffix`.
    pub fn new(custom: &[String]) -> Result<Self, ConfigError> {
        let mut patterns = Vec::with_capacity(custom.len() + 1);

        for source in custom.iter().map(String::as_str).chain([DEFAULT_FILENAME_PATTERN]) {
            let regex = Regex::new(source).map_err(|e| ConfigError::InvalidFilenamePattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            })?;

            let names: Vec<&str> = regex.capture_names().flatten().collect();
            if let Some(missing) = REQUIRED_GROUPS.iter().find(|g| !names.contains(*g)) {
                return Err(ConfigError::InvalidFilenamePattern {
                    pattern: source.to_string(),
                    reason: format!("missing named group `{}`", missing),
                });
            }

            patterns.push(regex);
        }

        Ok(Self { patterns })
    }

    /// Find a date in `stem`
    pub fn parse(&self, stem: &str) -> Option<FilenameMatch> {
        self.patterns.iter().find_map(|regex| {
            let caps = regex.captures(stem)?;
            let datetime = datetime_from(&caps)?;
            let whole = caps.get(0)?;

            let prefix = caps
                .name("prefix")
                .map_or(&stem[..whole.start()], |m| m.as_str());
            let suffix = caps
                .name("suffix")
                .map_or(&stem[whole.end()..], |m| m.as_str());

            Some(FilenameMatch {
                datetime,
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
            })
        })
    }
}

impl Default for FilenameDatePatterns {
    fn default() -> Self {
        Self::new(&[]).unwrap_or_else(|_| unreachable!("default filename pattern is valid"))
    }
}

fn datetime_from(caps: &Captures<'_>) -> Option<NaiveDateTime> {
    let number = |name: &str| -> Option<u32> {
        match caps.name(name) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };

    let year = caps.name("year")?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, number("month")?, number("day")?)?.and_hms_opt(
        number("hour")?,
        number("minute")?,
        number("second")?,
    )
}
