//! Naming patterns: templates that turn a date and a file name into a
//! destination path relative to the destination root.
//!
//! Placeholders:
//!
//! | Placeholder      | Expands to                                   |
//! |------------------|----------------------------------------------|
//! | `{date:<fmt>}`   | the resolved date, formatted with strftime   |
//! | `{prefix}`       | text before the date in the original stem    |
//! | `{suffix}`       | text after the date in the original stem     |
//! | `{stem}`         | the original stem                            |
//! | `{kind}`         | lowercase image format, e.g. `jpeg`          |
//!
//! `{{` and `}}` produce literal braces.

use crate::error::ConfigError;
use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt::Write;
use std::path::{Component, Path, PathBuf};

/// Year and month directories, then a timestamp name
pub const DEFAULT_PATTERN: &str = "{date:%Y}/{date:%m}/{date:%Y-%m-%d_%H-%M-%S}{suffix}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Date(String),
    Prefix,
    Suffix,
    Stem,
    Kind,
}

/// Everything a pattern can draw on for one file
#[derive(Debug, Clone)]
pub struct NamingContext<'a> {
    pub datetime: NaiveDateTime,
    /// Original file stem
    pub stem: &'a str,
    /// Original extension, as written (no leading dot)
    pub extension: Option<&'a str>,
    pub prefix: &'a str,
    pub suffix: &'a str,
    /// Whether the stem contained a recognizable date
    pub stem_has_date: bool,
    pub kind: &'a str,
}

/// A parsed, validated naming pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPattern {
    source: String,
    segments: Vec<Segment>,
}

impl NamingPattern {
    /// Parse and validate a template
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(invalid("unmatched `}`".to_string())),
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => name.push(c),
                            None => return Err(invalid("unclosed `{`".to_string())),
                        }
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(placeholder(&name).map_err(invalid)?);
                }
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        if segments.is_empty() {
            return Err(invalid("pattern is empty".to_string()));
        }

        let parsed = Self {
            source: pattern.to_string(),
            segments,
        };

        // Catch literal `..`, absolute roots and empty names up front
        for stem_has_date in [true, false] {
            parsed
                .render(&sample_context(stem_has_date))
                .map_err(|rendered| {
                    invalid(format!("renders to an unusable path `{}`", rendered))
                })?;
        }

        Ok(parsed)
    }

    /// The template text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn uses_stem(&self) -> bool {
        self.segments.contains(&Segment::Stem)
    }

    /// Render the destination path relative to the destination root.
    ///
    /// The rendered text is split at its last `/` into directories and a
    /// name. The original stem is appended to the name when it carried no
    /// date and the template does not include it already, then the original
    /// extension follows. On failure the offending rendered text is returned.
    pub fn render(&self, ctx: &NamingContext<'_>) -> Result<PathBuf, String> {
        let mut text = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => text.push_str(s),
                Segment::Date(fmt) => {
                    write!(text, "{}", ctx.datetime.format(fmt)).map_err(|_| text.clone())?
                }
                Segment::Prefix => text.push_str(ctx.prefix),
                Segment::Suffix => text.push_str(ctx.suffix),
                Segment::Stem => text.push_str(ctx.stem),
                Segment::Kind => text.push_str(ctx.kind),
            }
        }

        let (dirs, name) = match text.rfind('/') {
            Some(i) => (&text[..i], &text[i + 1..]),
            None => ("", text.as_str()),
        };

        let mut name = name.to_string();
        if !ctx.stem_has_date && !self.uses_stem() && !ctx.stem.is_empty() {
            name.push('_');
            name.push_str(ctx.stem);
        }
        if name.is_empty() {
            return Err(text);
        }
        if let Some(ext) = ctx.extension {
            name.push('.');
            name.push_str(ext);
        }

        let relative = Path::new(dirs).join(&name);
        if !is_plain_relative(&relative) {
            return Err(format!("{}/{}", dirs, name));
        }

        Ok(relative)
    }
}

impl Default for NamingPattern {
    fn default() -> Self {
        Self::parse(DEFAULT_PATTERN).unwrap_or_else(|_| unreachable!("default pattern is valid"))
    }
}

impl std::fmt::Display for NamingPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

fn placeholder(name: &str) -> Result<Segment, String> {
    if let Some(fmt) = name.strip_prefix("date:") {
        if fmt.is_empty() {
            return Err("empty date format".to_string());
        }
        if StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
            return Err(format!("invalid date format `{}`", fmt));
        }
        return Ok(Segment::Date(fmt.to_string()));
    }

    match name {
        "prefix" => Ok(Segment::Prefix),
        "suffix" => Ok(Segment::Suffix),
        "stem" => Ok(Segment::Stem),
        "kind" => Ok(Segment::Kind),
        other => Err(format!("unknown placeholder `{{{}}}`", other)),
    }
}

fn is_plain_relative(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && path.file_name().is_some()
}

fn sample_context(stem_has_date: bool) -> NamingContext<'static> {
    NamingContext {
        datetime: NaiveDate::from_ymd_opt(2000, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default(),
        stem: "sample",
        extension: Some("jpg"),
        prefix: "",
        suffix: "",
        stem_has_date,
        kind: "jpeg",
    }
}
