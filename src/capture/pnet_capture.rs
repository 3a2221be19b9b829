//! Datalink capture through pnet.

use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pnet::datalink::{self, Channel, DataLinkReceiver, NetworkInterface};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::udp::UdpPacket;
use pnet::packet::Packet;

use super::PacketCapture;
use crate::error::CaptureError;

const DHCP_PORTS: [u16; 2] = [67, 68];

/// How long a read blocks before the running flag is checked again.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Captures DHCP traffic on one interface.
pub struct PnetCapture {
    interface: NetworkInterface,
}

impl PnetCapture {
    /// Capture on `name`, or on the first interface that is up, not loopback
    /// and addressed when `name` is `None`.
    pub fn open(name: Option<&str>) -> Result<Self, CaptureError> {
        let mut interfaces = datalink::interfaces().into_iter();
        let interface = match name {
            Some(name) => interfaces
                .find(|iface| iface.name == name)
                .ok_or_else(|| CaptureError::InterfaceNotFound(name.to_string()))?,
            None => interfaces
                .find(|iface| iface.is_up() && !iface.is_loopback() && !iface.ips.is_empty())
                .ok_or_else(|| {
                    CaptureError::InterfaceNotFound("no active non-loopback interface".to_string())
                })?,
        };
        Ok(Self { interface })
    }
}

impl PacketCapture for PnetCapture {
    fn dhcp_datagrams(
        &mut self,
        running: Arc<AtomicBool>,
    ) -> Result<Box<dyn Iterator<Item = Vec<u8>> + '_>, CaptureError> {
        let config = datalink::Config {
            read_timeout: Some(POLL_INTERVAL),
            ..datalink::Config::default()
        };

        let rx = match datalink::channel(&self.interface, config) {
            Ok(Channel::Ethernet(_tx, rx)) => rx,
            Ok(_) => {
                return Err(CaptureError::ChannelCreation(
                    "not an Ethernet channel".to_string(),
                ))
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(CaptureError::InsufficientPermissions)
            }
            Err(e) => return Err(CaptureError::ChannelCreation(e.to_string())),
        };

        Ok(Box::new(Datagrams { rx, running }))
    }

    fn interface_name(&self) -> &str {
        &self.interface.name
    }
}

struct Datagrams {
    rx: Box<dyn DataLinkReceiver>,
    running: Arc<AtomicBool>,
}

impl Iterator for Datagrams {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        while self.running.load(Ordering::SeqCst) {
            match self.rx.next() {
                Ok(frame) => {
                    if let Some(payload) = dhcp_payload(frame) {
                        return Some(payload);
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => {}
                Err(e) => tracing::debug!("Capture read failed: {}", e),
            }
        }
        None
    }
}

/// UDP payload of an Ethernet/IPv4 frame to or from a DHCP port.
fn dhcp_payload(frame: &[u8]) -> Option<Vec<u8>> {
    let ethernet = EthernetPacket::new(frame)?;
    if ethernet.get_ethertype() != EtherTypes::Ipv4 {
        return None;
    }
    let ipv4 = Ipv4Packet::new(ethernet.payload())?;
    if ipv4.get_next_level_protocol() != IpNextHeaderProtocols::Udp {
        return None;
    }
    let udp = UdpPacket::new(ipv4.payload())?;
    let on_dhcp_port =
        DHCP_PORTS.contains(&udp.get_source()) || DHCP_PORTS.contains(&udp.get_destination());
    on_dhcp_port.then(|| udp.payload().to_vec())
}
