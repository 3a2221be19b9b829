//! The surface the host DHCP server exposes to the hook.
//!
//! The host owns the packets and the lease under evaluation; the hook only
//! ever sees them through these borrowed views.

use std::fmt;
use std::net::Ipv4Addr;

use super::DhcpMessageType;

/// Read-only view over a packet the host has already decoded.
pub trait PacketView {
    fn transaction_id(&self) -> u32;

    /// Option 53, if present and recognized.
    fn message_type(&self) -> Option<DhcpMessageType>;

    fn ciaddr(&self) -> Ipv4Addr;

    fn yiaddr(&self) -> Ipv4Addr;

    fn siaddr(&self) -> Ipv4Addr;

    fn giaddr(&self) -> Ipv4Addr;

    /// Client hardware address bytes, `None` when the host has none.
    fn hardware_address(&self) -> Option<&[u8]>;

    /// Raw payload of option `code`, without the code/length header.
    fn option(&self, code: u8) -> Option<&[u8]>;
}

/// Write access to exactly one lease field: the proposed address.
///
/// Hosts build this from a mutable borrow of their lease's address field for
/// the duration of the lease-select callout.
pub struct ProposedAddress<'a> {
    addr: &'a mut Ipv4Addr,
}

impl<'a> ProposedAddress<'a> {
    pub fn new(addr: &'a mut Ipv4Addr) -> Self {
        Self { addr }
    }

    pub fn get(&self) -> Ipv4Addr {
        *self.addr
    }

    pub fn set(&mut self, addr: Ipv4Addr) {
        *self.addr = addr;
    }
}

impl fmt::Debug for ProposedAddress<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProposedAddress").field(&self.get()).finish()
    }
}
