use std::net::Ipv4Addr;
use std::sync::Arc;

use macaddr::MacAddr6;
use tempfile::TempDir;

use relayhook::domain::{option_codes, DhcpOption, DhcpPacket, ProposedAddress};
use relayhook::parser::{DhcpParser, Option82Parser};
use relayhook::policy::OverridePolicy;
use relayhook::pipeline::{hooks, Callouts};
use relayhook::Config;

const POOL_ADDR: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 50);
const REPLACEMENT: Ipv4Addr = Ipv4Addr::new(192, 168, 50, 100);

fn packet(op: u8, message_type: u8, yiaddr: Ipv4Addr, relay: Option<&[u8]>) -> DhcpPacket {
    let mut options = vec![DhcpOption::new(option_codes::MESSAGE_TYPE, &[message_type])];
    if let Some(payload) = relay {
        options.push(DhcpOption::new(option_codes::RELAY_AGENT_INFO, payload));
    }
    DhcpPacket {
        op,
        htype: 1,
        hlen: 6,
        xid: 0xdead_beef,
        ciaddr: Ipv4Addr::UNSPECIFIED,
        yiaddr,
        siaddr: Ipv4Addr::UNSPECIFIED,
        giaddr: Ipv4Addr::new(10, 0, 0, 1),
        chaddr: Some(MacAddr6::new(0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee)),
        options,
    }
}

fn circuit_id(id: &[u8]) -> Vec<u8> {
    let mut payload = vec![1, id.len() as u8];
    payload.extend_from_slice(id);
    payload
}

fn load(temp: &TempDir) -> (Config, hooks::Engine, Arc<dyn Callouts>) {
    let config = Config {
        audit_path: temp.path().join("dhcp_hook_log.txt"),
        ..Config::default()
    };
    let mut registry: Vec<Arc<dyn Callouts>> = Vec::new();
    let engine = hooks::load(&config, &mut registry).unwrap();
    assert_eq!(registry.len(), 1);
    let callouts = registry.remove(0);
    (config, engine, callouts)
}

/// Drive one full transaction and return the lease the host would commit.
fn transaction(callouts: &dyn Callouts, relay: Option<&[u8]>) -> Ipv4Addr {
    let query = packet(1, 1, Ipv4Addr::UNSPECIFIED, relay);
    callouts.on_receive(Some(&query));

    let mut lease = POOL_ADDR;
    callouts.on_lease_select(Some(&query), Some(ProposedAddress::new(&mut lease)));

    let offer = packet(2, 2, lease, relay);
    callouts.on_send(Some(&offer));
    lease
}

#[test]
fn matched_transaction_is_overridden_and_audited_in_order() {
    let temp = TempDir::new().unwrap();
    let (config, engine, callouts) = load(&temp);

    let payload = circuit_id(b"OLT_TEST");
    let lease = transaction(callouts.as_ref(), Some(&payload));
    engine.unload();

    assert_eq!(lease, REPLACEMENT);

    let log = std::fs::read_to_string(&config.audit_path).unwrap();
    let received = log.find("Packet Received at").unwrap();
    let selected = log.find("Lease Selected at").unwrap();
    let sent = log.find("Packet Sent at").unwrap();
    assert!(received < selected && selected < sent);

    assert!(log.starts_with("Relay hook loaded"));
    assert!(log.ends_with("Relay hook unloaded\n"));
    assert!(log.contains("Transaction ID: 0xdeadbeef"));
    assert!(log.contains("Packet Type: DISCOVER"));
    assert!(log.contains("Packet Type: OFFER"));
    assert!(log.contains("CHADDR: 02:aa:bb:cc:dd:ee"));
    assert!(log.contains("Option 82 Found!"));
    assert!(log.contains("MATCH (lease select): OLT_TEST detected. Overwriting IP 10.0.0.50 -> 192.168.50.100"));
    assert!(log.contains("YIADDR (Assigned IP): 192.168.50.100"));
    assert!(log.contains("Option 82 included in response."));
}

#[test]
fn unrelated_relay_keeps_pool_address() {
    let temp = TempDir::new().unwrap();
    let (config, engine, callouts) = load(&temp);

    let payload = circuit_id(b"eth0/1/7");
    let lease = transaction(callouts.as_ref(), Some(&payload));
    engine.unload();

    assert_eq!(lease, POOL_ADDR);
    let log = std::fs::read_to_string(&config.audit_path).unwrap();
    assert!(log.contains("No override; keeping 10.0.0.50"));
    assert!(!log.contains("MATCH"));
}

#[test]
fn transaction_without_option82_is_still_audited() {
    let temp = TempDir::new().unwrap();
    let (config, engine, callouts) = load(&temp);

    let lease = transaction(callouts.as_ref(), None);
    engine.unload();

    assert_eq!(lease, POOL_ADDR);
    let log = std::fs::read_to_string(&config.audit_path).unwrap();
    assert_eq!(log.matches("No Option 82 present.").count(), 3);
    assert!(!log.contains("Option 82 included in response."));
}

#[test]
fn unopenable_audit_file_registers_nothing() {
    let temp = TempDir::new().unwrap();
    let config = Config {
        audit_path: temp.path().join("no-such-dir").join("audit.log"),
        ..Config::default()
    };
    let mut registry: Vec<Arc<dyn Callouts>> = Vec::new();

    let result = hooks::load(&config, &mut registry);

    assert_eq!(hooks::load_status(&result), 1);
    assert!(registry.is_empty());
}

#[test]
fn wire_packet_flows_through_receive() {
    let temp = TempDir::new().unwrap();
    let (config, engine, callouts) = load(&temp);

    let mut data = vec![0u8; 236];
    data[0] = 1;
    data[1] = 1;
    data[2] = 6;
    data[4..8].copy_from_slice(&0x0102_0304u32.to_be_bytes());
    data[28..34].copy_from_slice(&[0x02, 0, 0, 0, 0, 0x09]);
    data.extend_from_slice(&[99, 130, 83, 99]);
    data.extend_from_slice(&[53, 1, 3]);
    data.extend_from_slice(&[82, 10, 1, 8]);
    data.extend_from_slice(b"OLT_TEST");
    data.push(255);

    let packet = DhcpParser::new().parse(&data).unwrap();
    callouts.on_receive(Some(&packet));
    engine.unload();

    let log = std::fs::read_to_string(&config.audit_path).unwrap();
    assert!(log.contains("Transaction ID: 0x1020304"));
    assert!(log.contains("Packet Type: REQUEST"));
    assert!(log.contains("  Length: 10"));
}

#[test]
fn default_config_overrides_badly_framed_relay_data() {
    let temp = TempDir::new().unwrap();
    let (_config, engine, callouts) = load(&temp);

    let payloads: [&[u8]; 3] = [
        b"OLT_TEST",
        b"\x01\x08OLT_TEST_X",
        b"\x01\x0cpre-OLT_TEST\x02\x03abcdef",
    ];
    for payload in payloads {
        assert_eq!(transaction(callouts.as_ref(), Some(payload)), REPLACEMENT);
    }
    engine.unload();
}

#[test]
fn default_config_matches_iff_marker_bytes_present() {
    let config = Config::default();
    let policy = OverridePolicy::new(config.rules.clone());
    let parser = Option82Parser::new(policy.markers(), config.match_mode);

    // Deterministic byte soup, half of it seeded with the marker.
    let mut state: u32 = 0x2545_f491;
    for round in 0..200u32 {
        let len = (round % 40) as usize;
        let mut payload: Vec<u8> = (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state & 0xff) as u8
            })
            .collect();
        if round % 2 == 0 {
            let tail = payload.split_off(len / 2);
            payload.extend_from_slice(b"OLT_TEST");
            payload.extend(tail);
        }

        let expected = payload.windows(8).any(|w| w == b"OLT_TEST");
        let option = parser.parse(&payload);
        assert_eq!(option.contains_marker, expected, "{:02x?}", payload);
        assert_eq!(policy.evaluate(&option).is_some(), expected);
    }
}

#[test]
fn callouts_after_unload_leave_the_file_untouched() {
    let temp = TempDir::new().unwrap();
    let (config, engine, callouts) = load(&temp);
    engine.unload();

    let mut query = packet(1, 1, Ipv4Addr::UNSPECIFIED, None);
    query.xid = 0x77;
    assert_eq!(callouts.on_receive(Some(&query)).code(), 0);

    let log = std::fs::read_to_string(&config.audit_path).unwrap();
    assert!(log.ends_with("Relay hook unloaded\n"));
    assert!(!log.contains("Transaction ID: 0x77"));
}
