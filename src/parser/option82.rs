//! Relay agent information (option 82) parser.
//!
//! Never fails: bytes from an untrusted relay that do not decode are
//! reported as "present, not well-formed" instead.

use std::fmt;
use std::str::FromStr;

use crate::domain::{RelayInfoOption, SubOption, SubOptionCode};
use crate::error::ConfigError;

/// How marker tokens are searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Match anywhere in the raw payload, ignoring sub-option framing.
    ///
    /// Relays that frame sub-options badly still match. Can false-positive
    /// on a token spanning two adjacent sub-options.
    #[default]
    Substring,
    /// Match only inside individual decoded sub-option values.
    SubOption,
}

impl FromStr for MatchMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "suboption" | "sub-option" => Ok(Self::SubOption),
            "substring" | "raw" => Ok(Self::Substring),
            _ => Err(ConfigError::InvalidValue {
                key: "match_mode".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubOption => write!(f, "suboption"),
            Self::Substring => write!(f, "substring"),
        }
    }
}

/// Parser for option 82 payloads.
#[derive(Debug, Clone)]
pub struct Option82Parser {
    markers: Vec<String>,
    mode: MatchMode,
}

impl Option82Parser {
    /// Create a parser looking for `markers`, tried in order.
    pub fn new<I, S>(markers: I, mode: MatchMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(Into::into)
                .filter(|m: &String| !m.is_empty())
                .collect(),
            mode,
        }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Parse the option 82 payload (without the code/length header).
    pub fn parse(&self, raw: &[u8]) -> RelayInfoOption {
        let decoded = decode_sub_options(raw);
        let well_formed = decoded.is_some();
        let sub_options = decoded.unwrap_or_default();

        let matched_marker = match self.mode {
            MatchMode::Substring => self
                .markers
                .iter()
                .find(|marker| contains(raw, marker.as_bytes())),
            MatchMode::SubOption => self.markers.iter().find(|marker| {
                sub_options
                    .iter()
                    .any(|sub| contains(&sub.value, marker.as_bytes()))
            }),
        }
        .cloned();

        RelayInfoOption {
            raw: raw.to_vec(),
            sub_options,
            well_formed,
            contains_marker: matched_marker.is_some(),
            matched_marker,
        }
    }
}

/// Decode `code len value` triples. `None` if any triple overruns the buffer.
fn decode_sub_options(data: &[u8]) -> Option<Vec<SubOption>> {
    let mut sub_options = Vec::new();
    let mut offset = 0;

    while offset < data.len() {
        let code = data[offset];
        let len = *data.get(offset + 1)? as usize;
        let value = data.get(offset + 2..offset + 2 + len)?;

        sub_options.push(SubOption {
            code: SubOptionCode::from_u8(code),
            value: value.to_vec(),
        });
        offset += 2 + len;
    }

    Some(sub_options)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| window == needle)
}
