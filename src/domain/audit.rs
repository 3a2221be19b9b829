//! Audit records written once per pipeline stage per packet.

use std::fmt;
use std::net::Ipv4Addr;

use chrono::{DateTime, SecondsFormat, Utc};

use super::host::PacketView;
use super::relay::RelayInfoOption;
use super::DhcpMessageType;
use crate::utils::{format_hw_addr, hex_string};

/// Printed before every record so transaction groups stand out in the file.
pub const RECORD_SEPARATOR: &str = "------------------------------------------------";

/// Pipeline stage a record was taken at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    LeaseSelected,
    Sent,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::LeaseSelected => write!(f, "lease-selected"),
            Self::Sent => write!(f, "sent"),
        }
    }
}

/// What the record says about option 82.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelaySummary {
    Absent,
    Present {
        length: usize,
        hex: String,
        /// Rendered sub-options, `(label, value)`.
        sub_options: Vec<(String, String)>,
        /// False when the payload did not decode as sub-option triples.
        well_formed: bool,
        matched_marker: Option<String>,
    },
}

impl RelaySummary {
    pub fn from_option(option: Option<&RelayInfoOption>) -> Self {
        let Some(option) = option else {
            return Self::Absent;
        };

        let sub_options = option
            .sub_options
            .iter()
            .map(|sub| {
                let value = match sub.value_text() {
                    Some(text) => text.to_string(),
                    None => hex_string(&sub.value),
                };
                (sub.code.to_string(), value)
            })
            .collect();

        Self::Present {
            length: option.len(),
            hex: hex_string(&option.raw),
            sub_options,
            well_formed: option.well_formed,
            matched_marker: option.matched_marker.clone(),
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }
}

/// Lease-select outcome: the address the host proposed and, if the policy
/// fired, what it was overwritten with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseOutcome {
    pub proposed: Ipv4Addr,
    pub replacement: Option<Ipv4Addr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub stage: Stage,
    pub transaction_id: u32,
    pub message_type: Option<DhcpMessageType>,
    pub ciaddr: Ipv4Addr,
    pub yiaddr: Ipv4Addr,
    pub siaddr: Ipv4Addr,
    pub giaddr: Ipv4Addr,
    /// Colon-hex, empty when the packet has no hardware address.
    pub hardware_address: String,
    pub relay: RelaySummary,
    pub lease: Option<LeaseOutcome>,
}

impl AuditRecord {
    /// Snapshot the identifying fields of `packet` at `stage`.
    pub fn capture(stage: Stage, packet: &dyn PacketView, relay: Option<&RelayInfoOption>) -> Self {
        Self {
            timestamp: Utc::now(),
            stage,
            transaction_id: packet.transaction_id(),
            message_type: packet.message_type(),
            ciaddr: packet.ciaddr(),
            yiaddr: packet.yiaddr(),
            siaddr: packet.siaddr(),
            giaddr: packet.giaddr(),
            hardware_address: packet
                .hardware_address()
                .map(format_hw_addr)
                .unwrap_or_default(),
            relay: RelaySummary::from_option(relay),
            lease: None,
        }
    }

    pub fn with_lease(mut self, lease: LeaseOutcome) -> Self {
        self.lease = Some(lease);
        self
    }

    fn heading(&self) -> &'static str {
        match self.stage {
            Stage::Received => "Packet Received at",
            Stage::LeaseSelected => "Lease Selected at",
            Stage::Sent => "Packet Sent at",
        }
    }

    fn write_relay(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.relay {
            RelaySummary::Absent => writeln!(f, "No Option 82 present."),
            RelaySummary::Present {
                length,
                hex,
                sub_options,
                well_formed,
                ..
            } => {
                writeln!(f, "Option 82 Found!")?;
                writeln!(f, "  Length: {}", length)?;
                writeln!(f, "  Data (hex): {}", hex)?;
                if !well_formed {
                    writeln!(f, "  Malformed sub-options")?;
                }
                for (label, value) in sub_options {
                    writeln!(f, "  {}: {}", label, value)?;
                }
                self.write_marker(f)
            }
        }
    }

    fn write_marker(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.relay {
            RelaySummary::Present {
                matched_marker: Some(marker),
                ..
            } => writeln!(f, "  Marker: {}", marker),
            RelaySummary::Present { .. } => writeln!(f, "  Marker: none"),
            RelaySummary::Absent => Ok(()),
        }
    }

    fn write_lease(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(lease) = self.lease else {
            return Ok(());
        };

        writeln!(f, "Proposed Address: {}", lease.proposed)?;
        match (lease.replacement, &self.relay) {
            (
                Some(replacement),
                RelaySummary::Present {
                    matched_marker: Some(marker),
                    ..
                },
            ) => writeln!(
                f,
                "  MATCH (lease select): {} detected. Overwriting IP {} -> {}",
                marker, lease.proposed, replacement
            ),
            (Some(replacement), _) => writeln!(
                f,
                "  MATCH (lease select): overwriting IP {} -> {}",
                lease.proposed, replacement
            ),
            (None, _) => writeln!(f, "  No override; keeping {}", lease.proposed),
        }
    }
}

impl fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RECORD_SEPARATOR)?;
        writeln!(
            f,
            "{}: {}",
            self.heading(),
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, false)
        )?;
        writeln!(f, "Transaction ID: 0x{:x}", self.transaction_id)?;
        match self.message_type {
            Some(msg_type) => writeln!(f, "Packet Type: {}", msg_type)?,
            None => writeln!(f, "Packet Type: UNKNOWN")?,
        }
        writeln!(f, "CIADDR: {}", self.ciaddr)?;
        match self.stage {
            Stage::Sent => writeln!(f, "YIADDR (Assigned IP): {}", self.yiaddr)?,
            _ => writeln!(f, "YIADDR: {}", self.yiaddr)?,
        }
        writeln!(f, "SIADDR: {}", self.siaddr)?;
        writeln!(f, "GIADDR: {}", self.giaddr)?;
        writeln!(f, "CHADDR: {}", self.hardware_address)?;

        match self.stage {
            Stage::Received => self.write_relay(f),
            Stage::LeaseSelected => {
                self.write_relay(f)?;
                self.write_lease(f)
            }
            Stage::Sent => {
                if self.relay.is_present() {
                    writeln!(f, "Option 82 included in response.")?;
                }
                self.write_marker(f)
            }
        }
    }
}
