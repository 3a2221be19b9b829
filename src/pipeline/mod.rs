//! Pipeline module.
//!
//! The host DHCP server calls into the hook at three fixed points of request
//! processing. [`Callouts`] is that interface; [`PipelineController`] is the
//! implementation, and [`hooks`] handles load/unload and registration.

mod controller;
pub mod hooks;

pub use controller::PipelineController;
pub use hooks::{load, CalloutRegistry, Engine};

use crate::domain::{PacketView, ProposedAddress};

/// Result of a callout, as reported back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalloutStatus {
    /// Let the host continue processing normally.
    Continue,
}

impl CalloutStatus {
    /// Numeric status for hosts with a C-style callout ABI (0 = continue).
    pub fn code(self) -> i32 {
        match self {
            Self::Continue => 0,
        }
    }
}

/// The three stage callbacks a host invokes, in this order, per transaction.
///
/// Arguments are `Option` because hosts may invoke callouts with partially
/// populated arguments; a missing argument makes the stage a no-op.
pub trait Callouts: Send + Sync {
    /// Inbound client request.
    fn on_receive(&self, query: Option<&dyn PacketView>) -> CalloutStatus;

    /// The host is about to commit a lease for `query`.
    fn on_lease_select(
        &self,
        query: Option<&dyn PacketView>,
        lease: Option<ProposedAddress<'_>>,
    ) -> CalloutStatus;

    /// The host is about to transmit `response`.
    fn on_send(&self, response: Option<&dyn PacketView>) -> CalloutStatus;
}
