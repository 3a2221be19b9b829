//! Relay agent information (option 82) models.

use std::fmt;

/// Sub-option codes from RFC 3046 and later registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubOptionCode {
    CircuitId,
    RemoteId,
    LinkSelection,
    SubscriberId,
    ServerIdOverride,
    Other(u8),
}

impl SubOptionCode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::CircuitId,
            2 => Self::RemoteId,
            5 => Self::LinkSelection,
            6 => Self::SubscriberId,
            11 => Self::ServerIdOverride,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for SubOptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CircuitId => write!(f, "Circuit-ID"),
            Self::RemoteId => write!(f, "Remote-ID"),
            Self::LinkSelection => write!(f, "Link-Selection"),
            Self::SubscriberId => write!(f, "Subscriber-ID"),
            Self::ServerIdOverride => write!(f, "Server-ID-Override"),
            Self::Other(code) => write!(f, "Sub-option {code}"),
        }
    }
}

/// One decoded `code/len/value` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubOption {
    pub code: SubOptionCode,
    pub value: Vec<u8>,
}

impl SubOption {
    /// Value as text when it is printable ASCII, otherwise `None`.
    pub fn value_text(&self) -> Option<&str> {
        if self.value.is_empty() || !self.value.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            return None;
        }
        std::str::from_utf8(&self.value).ok()
    }
}

/// Parsed relay agent information for one packet.
///
/// Built by [`Option82Parser`](crate::parser::Option82Parser); never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayInfoOption {
    pub raw: Vec<u8>,
    /// Decoded sub-options. Empty when `well_formed` is false.
    pub sub_options: Vec<SubOption>,
    pub well_formed: bool,
    pub contains_marker: bool,
    pub matched_marker: Option<String>,
}

impl RelayInfoOption {
    /// Payload length in bytes, excluding the option header.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn sub_option(&self, code: SubOptionCode) -> Option<&SubOption> {
        self.sub_options.iter().find(|sub| sub.code == code)
    }

    pub fn circuit_id(&self) -> Option<&[u8]> {
        self.sub_option(SubOptionCode::CircuitId)
            .map(|sub| sub.value.as_slice())
    }

    pub fn remote_id(&self) -> Option<&[u8]> {
        self.sub_option(SubOptionCode::RemoteId)
            .map(|sub| sub.value.as_slice())
    }
}
