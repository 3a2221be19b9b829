//! Domain models for the relay hook.
//!
//! This module contains the core types shared by the parser, policy, sink
//! and pipeline, independent of any infrastructure concerns.

mod audit;
mod dhcp;
mod host;
mod relay;

pub use audit::{AuditRecord, LeaseOutcome, RelaySummary, Stage, RECORD_SEPARATOR};
pub use dhcp::{option_codes, DhcpMessageType, DhcpOption, DhcpPacket};
pub use host::{PacketView, ProposedAddress};
pub use relay::{RelayInfoOption, SubOption, SubOptionCode};
