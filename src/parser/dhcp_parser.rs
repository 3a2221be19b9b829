//! DHCP datagram parser.
//!
//! Decodes the BOOTP header and option framing of a UDP payload per
//! RFC 2131. Option payloads are kept as raw bytes.

use std::net::Ipv4Addr;

use macaddr::MacAddr6;

use crate::domain::{option_codes, DhcpOption, DhcpPacket};
use crate::error::ParseError;

/// DHCP magic cookie: 0x63825363
pub const DHCP_MAGIC_COOKIE: [u8; 4] = [0x63, 0x82, 0x53, 0x63];

/// Fixed BOOTP header size
const BOOTP_HEADER_SIZE: usize = 236;

/// Header plus magic cookie
const MIN_DHCP_SIZE: usize = BOOTP_HEADER_SIZE + 4;

const HTYPE_ETHERNET: u8 = 1;

/// Parser for DHCP datagrams.
pub struct DhcpParser;

impl DhcpParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a DHCP packet from raw bytes.
    ///
    /// The input should be the UDP payload (not including IP/UDP headers).
    pub fn parse(&self, data: &[u8]) -> Result<DhcpPacket, ParseError> {
        if data.len() < MIN_DHCP_SIZE {
            return Err(ParseError::PacketTooShort {
                expected: MIN_DHCP_SIZE,
                actual: data.len(),
            });
        }

        let op = data[0];
        let htype = data[1];
        let hlen = data[2];
        // hops at [3]
        let xid = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);

        let ciaddr = Ipv4Addr::new(data[12], data[13], data[14], data[15]);
        let yiaddr = Ipv4Addr::new(data[16], data[17], data[18], data[19]);
        let siaddr = Ipv4Addr::new(data[20], data[21], data[22], data[23]);
        let giaddr = Ipv4Addr::new(data[24], data[25], data[26], data[27]);

        // chaddr is 16 bytes at offset 28; only Ethernet addresses are kept
        let chaddr = (htype == HTYPE_ETHERNET && hlen == 6).then(|| {
            MacAddr6::new(data[28], data[29], data[30], data[31], data[32], data[33])
        });

        if data[BOOTP_HEADER_SIZE..MIN_DHCP_SIZE] != DHCP_MAGIC_COOKIE {
            return Err(ParseError::InvalidMagicCookie);
        }

        let options = self.parse_options(&data[MIN_DHCP_SIZE..])?;

        Ok(DhcpPacket {
            op,
            htype,
            hlen,
            xid,
            ciaddr,
            yiaddr,
            siaddr,
            giaddr,
            chaddr,
            options,
        })
    }

    /// Parse the option area into `(code, payload)` pairs.
    fn parse_options(&self, data: &[u8]) -> Result<Vec<DhcpOption>, ParseError> {
        let mut options = Vec::new();
        let mut offset = 0;

        while offset < data.len() {
            let code = data[offset];

            if code == option_codes::PAD {
                offset += 1;
                continue;
            }

            if code == option_codes::END {
                break;
            }

            if offset + 1 >= data.len() {
                return Err(ParseError::InvalidOption {
                    offset,
                    message: "option length missing".to_string(),
                });
            }

            let len = data[offset + 1] as usize;

            if offset + 2 + len > data.len() {
                return Err(ParseError::InvalidOption {
                    offset,
                    message: format!(
                        "option data truncated: expected {} bytes, have {}",
                        len,
                        data.len() - offset - 2
                    ),
                });
            }

            options.push(DhcpOption::new(code, &data[offset + 2..offset + 2 + len]));
            offset += 2 + len;
        }

        Ok(options)
    }
}

impl Default for DhcpParser {
    fn default() -> Self {
        Self::new()
    }
}
