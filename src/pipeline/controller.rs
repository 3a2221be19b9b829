//! Stage callouts: receive, lease-select, send.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{CalloutStatus, Callouts};
use crate::config::Config;
use crate::domain::{
    option_codes, AuditRecord, LeaseOutcome, PacketView, ProposedAddress, RelayInfoOption, Stage,
};
use crate::parser::Option82Parser;
use crate::policy::OverridePolicy;
use crate::sink::AuditSink;

/// Glues the parser, policy and sink to the host's three callouts.
///
/// Holds no per-transaction state: each stage re-reads option 82 from the
/// packet it is given, and the host guarantees stage order.
pub struct PipelineController<S> {
    parser: Option82Parser,
    policy: OverridePolicy,
    sink: Arc<S>,
}

impl<S: AuditSink> PipelineController<S> {
    pub fn new(parser: Option82Parser, policy: OverridePolicy, sink: Arc<S>) -> Self {
        Self {
            parser,
            policy,
            sink,
        }
    }

    /// Build the parser and policy from `config`'s rules.
    pub fn from_config(config: &Config, sink: Arc<S>) -> Self {
        let policy = OverridePolicy::new(config.rules.clone());
        let parser = Option82Parser::new(policy.markers(), config.match_mode);
        Self::new(parser, policy, sink)
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    pub fn policy(&self) -> &OverridePolicy {
        &self.policy
    }

    fn relay_info(&self, packet: &dyn PacketView) -> Option<RelayInfoOption> {
        packet
            .option(option_codes::RELAY_AGENT_INFO)
            .map(|raw| self.parser.parse(raw))
    }

    /// Append, absorbing failures: a lost audit line must never fail the
    /// host's transaction.
    fn record(&self, record: AuditRecord) {
        if let Err(e) = self.sink.append(&record) {
            warn!(
                "Failed to append {} audit record for xid {:#010x}: {}",
                record.stage, record.transaction_id, e
            );
        }
    }
}

impl<S: AuditSink> Callouts for PipelineController<S> {
    fn on_receive(&self, query: Option<&dyn PacketView>) -> CalloutStatus {
        let Some(query) = query else {
            debug!("on_receive: no query packet, skipping");
            return CalloutStatus::Continue;
        };
        debug!("on_receive: xid {:#010x}", query.transaction_id());

        let relay = self.relay_info(query);
        self.record(AuditRecord::capture(Stage::Received, query, relay.as_ref()));

        CalloutStatus::Continue
    }

    fn on_lease_select(
        &self,
        query: Option<&dyn PacketView>,
        lease: Option<ProposedAddress<'_>>,
    ) -> CalloutStatus {
        let (Some(query), Some(mut lease)) = (query, lease) else {
            debug!("on_lease_select: missing query or lease, skipping");
            return CalloutStatus::Continue;
        };
        let xid = query.transaction_id();

        let relay = self.relay_info(query);
        let proposed = lease.get();
        let replacement = relay.as_ref().and_then(|option| self.policy.evaluate(option));

        if let Some(addr) = replacement {
            lease.set(addr);
            info!(
                "xid {:#010x}: marker {:?} matched, overriding lease {} -> {}",
                xid,
                relay.as_ref().and_then(|r| r.matched_marker.as_deref()),
                proposed,
                addr
            );
        }

        let record = AuditRecord::capture(Stage::LeaseSelected, query, relay.as_ref())
            .with_lease(LeaseOutcome {
                proposed,
                replacement,
            });
        self.record(record);

        CalloutStatus::Continue
    }

    fn on_send(&self, response: Option<&dyn PacketView>) -> CalloutStatus {
        let Some(response) = response else {
            debug!("on_send: no response packet, skipping");
            return CalloutStatus::Continue;
        };
        debug!(
            "on_send: xid {:#010x}, assigned {}",
            response.transaction_id(),
            response.yiaddr()
        );

        let relay = self.relay_info(response);
        self.record(AuditRecord::capture(Stage::Sent, response, relay.as_ref()));

        CalloutStatus::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DhcpOption, DhcpPacket, RelaySummary};
    use crate::parser::MatchMode;
    use crate::policy::OverrideRule;
    use crate::sink::MemorySink;
    use macaddr::MacAddr6;
    use std::net::Ipv4Addr;

    const REPLACEMENT: Ipv4Addr = Ipv4Addr::new(192, 168, 50, 100);
    const POOL_ADDR: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 50);

    fn controller() -> PipelineController<MemorySink> {
        let policy = OverridePolicy::new(vec![OverrideRule::new("OLT_TEST", REPLACEMENT)]);
        let parser = Option82Parser::new(policy.markers(), MatchMode::SubOption);
        PipelineController::new(parser, policy, Arc::new(MemorySink::new()))
    }

    fn request(circuit_id: Option<&[u8]>) -> DhcpPacket {
        let mut options = vec![DhcpOption::new(option_codes::MESSAGE_TYPE, &[1])];
        if let Some(id) = circuit_id {
            let mut payload = vec![1, id.len() as u8];
            payload.extend_from_slice(id);
            options.push(DhcpOption::new(option_codes::RELAY_AGENT_INFO, &payload));
        }
        DhcpPacket {
            op: 1,
            htype: 1,
            hlen: 6,
            xid: 0x1234,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::new(10, 0, 0, 1),
            chaddr: Some(MacAddr6::new(0x02, 0, 0, 0, 0, 0x01)),
            options,
        }
    }

    #[test]
    fn test_receive_logs_option82() {
        let controller = controller();
        let query = request(Some(b"OLT_TEST"));

        assert_eq!(controller.on_receive(Some(&query)), CalloutStatus::Continue);

        let records = controller.sink().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].stage, Stage::Received);
        assert!(records[0].relay.is_present());
    }

    #[test]
    fn test_lease_select_overrides_on_marker() {
        let controller = controller();
        let query = request(Some(b"OLT_TEST"));
        let mut addr = POOL_ADDR;

        controller.on_lease_select(Some(&query), Some(ProposedAddress::new(&mut addr)));

        assert_eq!(addr, REPLACEMENT);
        let records = controller.sink().records();
        assert_eq!(
            records[0].lease,
            Some(LeaseOutcome {
                proposed: POOL_ADDR,
                replacement: Some(REPLACEMENT),
            })
        );
        assert!(controller.sink().rendered().contains("MATCH"));
    }

    #[test]
    fn test_lease_select_keeps_address_without_marker() {
        let controller = controller();
        let query = request(Some(b"AGENT_CIRCUIT_1"));
        let mut addr = POOL_ADDR;

        controller.on_lease_select(Some(&query), Some(ProposedAddress::new(&mut addr)));

        assert_eq!(addr, POOL_ADDR);
        assert!(!controller.sink().rendered().contains("MATCH"));
    }

    #[test]
    fn test_lease_select_without_option82() {
        let controller = controller();
        let query = request(None);
        let mut addr = POOL_ADDR;

        controller.on_lease_select(Some(&query), Some(ProposedAddress::new(&mut addr)));

        assert_eq!(addr, POOL_ADDR);
        assert_eq!(controller.sink().records()[0].relay, RelaySummary::Absent);
    }

    #[test]
    fn test_missing_arguments_are_no_ops() {
        let controller = controller();
        let query = request(Some(b"OLT_TEST"));
        let mut addr = POOL_ADDR;

        assert_eq!(controller.on_receive(None), CalloutStatus::Continue);
        assert_eq!(controller.on_send(None), CalloutStatus::Continue);
        assert_eq!(
            controller.on_lease_select(Some(&query), None),
            CalloutStatus::Continue
        );
        assert_eq!(
            controller.on_lease_select(None, Some(ProposedAddress::new(&mut addr))),
            CalloutStatus::Continue
        );

        assert_eq!(addr, POOL_ADDR);
        assert!(controller.sink().records().is_empty());
    }

    #[test]
    fn test_append_failure_is_absorbed() {
        let controller = controller();
        let query = request(Some(b"OLT_TEST"));
        let mut addr = POOL_ADDR;

        controller.sink().fail_next(1);
        assert_eq!(controller.on_receive(Some(&query)), CalloutStatus::Continue);
        assert_eq!(
            controller.on_lease_select(Some(&query), Some(ProposedAddress::new(&mut addr))),
            CalloutStatus::Continue
        );

        assert_eq!(addr, REPLACEMENT);
        let records = controller.sink().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].stage, Stage::LeaseSelected);
    }

    #[test]
    fn test_send_reflects_assigned_address() {
        let controller = controller();
        let mut response = request(Some(b"OLT_TEST"));
        response.op = 2;
        response.yiaddr = REPLACEMENT;
        response.options[0] = DhcpOption::new(option_codes::MESSAGE_TYPE, &[2]);

        controller.on_send(Some(&response));

        let text = controller.sink().rendered();
        assert!(text.contains("Packet Type: OFFER\n"));
        assert!(text.contains("YIADDR (Assigned IP): 192.168.50.100\n"));
        assert!(text.contains("Option 82 included in response.\n"));
    }
}
