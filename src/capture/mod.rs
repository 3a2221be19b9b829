//! Passive capture of DHCP datagrams.
//!
//! Used by the `watch` mode to observe traffic the hook is not embedded in
//! and feed it through the receive and send stages.

mod pnet_capture;

pub use pnet_capture::PnetCapture;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::error::CaptureError;

/// A source of DHCP UDP payloads (server or client port 67/68).
pub trait PacketCapture: Send {
    /// Yield UDP payloads until `running` is cleared.
    fn dhcp_datagrams(
        &mut self,
        running: Arc<AtomicBool>,
    ) -> Result<Box<dyn Iterator<Item = Vec<u8>> + '_>, CaptureError>;

    fn interface_name(&self) -> &str;
}
