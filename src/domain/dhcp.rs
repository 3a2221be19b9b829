//! DHCP packet domain models.
//!
//! These types represent the logical structure of DHCP packets,
//! independent of wire format parsing.

use std::net::Ipv4Addr;

use macaddr::MacAddr6;

use super::host::PacketView;

/// Well-known option codes the hook looks at.
pub mod option_codes {
    pub const PAD: u8 = 0;
    pub const MESSAGE_TYPE: u8 = 53;
    pub const RELAY_AGENT_INFO: u8 = 82;
    pub const END: u8 = 255;
}

/// DHCP message types as defined in RFC 2131.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhcpMessageType {
    Discover,
    Offer,
    Request,
    Decline,
    Ack,
    Nak,
    Release,
    Inform,
}

impl DhcpMessageType {
    /// Parse from the DHCP option 53 value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Discover),
            2 => Some(Self::Offer),
            3 => Some(Self::Request),
            4 => Some(Self::Decline),
            5 => Some(Self::Ack),
            6 => Some(Self::Nak),
            7 => Some(Self::Release),
            8 => Some(Self::Inform),
            _ => None,
        }
    }
}

impl std::fmt::Display for DhcpMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discover => write!(f, "DISCOVER"),
            Self::Offer => write!(f, "OFFER"),
            Self::Request => write!(f, "REQUEST"),
            Self::Decline => write!(f, "DECLINE"),
            Self::Ack => write!(f, "ACK"),
            Self::Nak => write!(f, "NAK"),
            Self::Release => write!(f, "RELEASE"),
            Self::Inform => write!(f, "INFORM"),
        }
    }
}

/// A single option as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpOption {
    pub code: u8,
    pub data: Vec<u8>,
}

impl DhcpOption {
    pub fn new(code: u8, data: &[u8]) -> Self {
        Self {
            code,
            data: data.to_vec(),
        }
    }
}

/// A decoded DHCP packet.
#[derive(Debug, Clone)]
pub struct DhcpPacket {
    /// Operation: 1 = BOOTREQUEST, 2 = BOOTREPLY
    pub op: u8,
    /// Hardware type (1 = Ethernet)
    pub htype: u8,
    /// Hardware address length
    pub hlen: u8,
    /// Transaction ID
    pub xid: u32,
    /// Client IP address (if already known)
    pub ciaddr: Ipv4Addr,
    /// 'Your' IP address (assigned by server)
    pub yiaddr: Ipv4Addr,
    /// Server IP address
    pub siaddr: Ipv4Addr,
    /// Gateway (relay) IP address
    pub giaddr: Ipv4Addr,
    /// Client hardware address, when the packet carries an Ethernet one
    pub chaddr: Option<MacAddr6>,
    /// Options in wire order
    pub options: Vec<DhcpOption>,
}

impl DhcpPacket {
    /// Returns true if this is a client request (BOOTREQUEST).
    pub fn is_request(&self) -> bool {
        self.op == 1
    }

    /// Returns true if this is a server reply (BOOTREPLY).
    pub fn is_reply(&self) -> bool {
        self.op == 2
    }

    /// Raw payload of the first option with `code`.
    pub fn option(&self, code: u8) -> Option<&[u8]> {
        self.options
            .iter()
            .find(|opt| opt.code == code)
            .map(|opt| opt.data.as_slice())
    }

    /// Get the DHCP message type from option 53.
    pub fn message_type(&self) -> Option<DhcpMessageType> {
        self.option(option_codes::MESSAGE_TYPE)
            .and_then(|data| data.first().copied())
            .and_then(DhcpMessageType::from_u8)
    }
}

impl PacketView for DhcpPacket {
    fn transaction_id(&self) -> u32 {
        self.xid
    }

    fn message_type(&self) -> Option<DhcpMessageType> {
        DhcpPacket::message_type(self)
    }

    fn ciaddr(&self) -> Ipv4Addr {
        self.ciaddr
    }

    fn yiaddr(&self) -> Ipv4Addr {
        self.yiaddr
    }

    fn siaddr(&self) -> Ipv4Addr {
        self.siaddr
    }

    fn giaddr(&self) -> Ipv4Addr {
        self.giaddr
    }

    fn hardware_address(&self) -> Option<&[u8]> {
        self.chaddr.as_ref().map(|mac| mac.as_bytes())
    }

    fn option(&self, code: u8) -> Option<&[u8]> {
        DhcpPacket::option(self, code)
    }
}
