//! Parsing module.
//!
//! [`Option82Parser`] turns relay agent information into a
//! [`RelayInfoOption`](crate::domain::RelayInfoOption); [`DhcpParser`] decodes
//! whole datagrams for the passive `watch` mode.

mod dhcp_parser;
mod option82;

pub use dhcp_parser::{DhcpParser, DHCP_MAGIC_COOKIE};
pub use option82::{MatchMode, Option82Parser};
