use std::fmt;

use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::NwpError;

pub const MIN_INDEX_FIELDS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Band {
    pub line_number: u32,
    pub byte_offset: u64,
    pub timestamp: String,
    pub variable: String,
    pub level: String,
    pub forecast_type: String,
}

impl Band {
    pub fn search_key(&self) -> String {
        format!(":{}:{}:{}:", self.variable, self.level, self.forecast_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    #[default]
    Lenient,
    Strict,
}

/// Byte interval `[start, stop)`; `stop == None` reads to the end of the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub stop: Option<u64>,
}

impl ByteRange {
    pub fn last(&self) -> Option<u64> {
        self.stop.map(|stop| stop.saturating_sub(1))
    }

    pub fn header_value(&self) -> String {
        match self.last() {
            Some(last) => format!("bytes={}-{last}", self.start),
            None => format!("bytes={}-", self.start),
        }
    }

    pub fn len(&self) -> Option<u64> {
        self.stop.map(|stop| stop.saturating_sub(self.start))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }
}

// Serialized with the inclusive `last`, the way ranges are shown to users.
impl Serialize for ByteRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ByteRange", 2)?;
        state.serialize_field("start", &self.start)?;
        state.serialize_field("last", &self.last())?;
        state.end()
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last() {
            Some(last) => write!(f, "[{},{last}]", self.start),
            None => write!(f, "[{},EOF]", self.start),
        }
    }
}

pub fn parse_index(text: &str, mode: ParseMode) -> Result<Vec<Band>, NwpError> {
    let mut bands = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let fields = raw.split(':').collect::<Vec<_>>();
        if fields.len() < MIN_INDEX_FIELDS {
            match mode {
                ParseMode::Lenient => continue,
                ParseMode::Strict => return Err(NwpError::ShortIndexLine { line }),
            }
        }
        let line_number = fields[0]
            .trim()
            .parse::<u32>()
            .map_err(|err| NwpError::MalformedIndexLine {
                line,
                reason: format!("line number {:?}: {err}", fields[0]),
            })?;
        let byte_offset = fields[1]
            .trim()
            .parse::<u64>()
            .map_err(|err| NwpError::MalformedIndexLine {
                line,
                reason: format!("byte offset {:?}: {err}", fields[1]),
            })?;
        bands.push(Band {
            line_number,
            byte_offset,
            timestamp: fields[2].to_string(),
            variable: fields[3].to_string(),
            level: fields[4].to_string(),
            forecast_type: fields[5].to_string(),
        });
    }
    Ok(bands)
}

/// Selections are matched to `reference` by line number only; caller order and duplicates are kept.
pub fn resolve_ranges(selected: &[Band], reference: &[Band]) -> Result<Vec<ByteRange>, NwpError> {
    if selected.is_empty() {
        return Err(NwpError::EmptySelection);
    }
    let mut ordered = reference.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|band| band.line_number);

    selected
        .iter()
        .map(|band| {
            let position = ordered
                .iter()
                .position(|candidate| candidate.line_number == band.line_number)
                .ok_or(NwpError::BandNotFound(band.line_number))?;
            let start = ordered[position].byte_offset;
            let stop = match ordered.get(position + 1) {
                Some(next) if next.byte_offset < start => {
                    return Err(NwpError::MalformedIndexLine {
                        line: next.line_number as usize,
                        reason: format!(
                            "byte offset {} precedes offset {start} of line {}",
                            next.byte_offset, band.line_number
                        ),
                    });
                }
                Some(next) => Some(next.byte_offset),
                None => None,
            };
            Ok(ByteRange { start, stop })
        })
        .collect()
}

pub fn select_lines(bands: &[Band], lines: &[u32]) -> Result<Vec<Band>, NwpError> {
    if lines.is_empty() {
        return Err(NwpError::EmptySelection);
    }
    lines
        .iter()
        .map(|line| {
            bands
                .iter()
                .find(|band| band.line_number == *line)
                .cloned()
                .ok_or(NwpError::BandNotFound(*line))
        })
        .collect()
}

pub fn search(bands: &[Band], pattern: &Regex) -> Vec<Band> {
    bands
        .iter()
        .filter(|band| pattern.is_match(&band.search_key()))
        .cloned()
        .collect()
}
