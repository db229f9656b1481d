// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end: out-of-order TCP segments -> reassembly -> frame demux ->
//! container decode -> aggregator, covering spec.md's S1/S2 worked examples
//! composed into one pipeline run.

use std::net::Ipv4Addr;

use bytes::Bytes;
use modscope::{
    aggregator::ModuleAggregator,
    decode::decode_inventory,
    framing::{DrainOutcome, GAME_SERVICE_UUID, SYNC_CONTAINER_METHOD_ID, drain_outer_packets},
    model::FlowKey,
    reassembly::ReassemblyState,
};

fn flow() -> FlowKey {
    FlowKey {
        src_ip: Ipv4Addr::new(10, 0, 0, 5),
        src_port: 7777,
        dst_ip: Ipv4Addr::new(10, 0, 0, 1),
        dst_port: 443,
    }
}

fn s1_payload() -> Vec<u8> {
    serde_json::json!({
        "itemPackages": {
            "pkg0": {
                "items": {
                    "item0": {
                        "configId": 5_500_103,
                        "uuid": 42,
                        "quality": 5,
                        "modNewAttr": { "modParts": [1110, 1113] }
                    }
                }
            }
        },
        "modContainer": {
            "modInfos": {
                "item0": { "initLinkNums": [8, 4] }
            }
        }
    })
    .to_string()
    .into_bytes()
}

fn notify_outer_packet(payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&GAME_SERVICE_UUID.to_be_bytes());
    body.extend_from_slice(&0u32.to_be_bytes()); // stubId
    body.extend_from_slice(&SYNC_CONTAINER_METHOD_ID.to_be_bytes());
    body.extend_from_slice(payload);

    let mut out = Vec::new();
    let size = 4 + 2 + body.len() as u32;
    out.extend_from_slice(&size.to_be_bytes());
    out.extend_from_slice(&2u16.to_be_bytes()); // KIND_NOTIFY, uncompressed
    out.extend_from_slice(&body);
    out
}

#[test]
fn s1_happy_path_reassembles_and_decodes_through_aggregator() {
    let packet = notify_outer_packet(&s1_payload());

    let mut state = ReassemblyState::new(1000, 10 * 1024 * 1024);
    state.select_flow(flow(), 1000, 0);

    // Deliver the second half before the first (S2-style out-of-order arrival).
    let split = packet.len() / 2;
    let first = Bytes::copy_from_slice(&packet[..split]);
    let second = Bytes::copy_from_slice(&packet[split..]);

    state.ingest(1000 + split as u32, second);
    assert_eq!(state.queue_len(), 0, "second segment alone must not drain");

    state.ingest(1000, first);
    assert_eq!(state.queue_len(), packet.len());

    let mut containers = Vec::new();
    let outcome = drain_outer_packets(state.queue_mut(), &mut |b| containers.push(b));
    assert_eq!(outcome, DrainOutcome::Ok);
    assert_eq!(containers.len(), 1);

    let mut heuristic_uuid_counter = 1u64;
    let modules = decode_inventory(&containers[0], &mut heuristic_uuid_counter);
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].uuid, 42);
    assert_eq!(modules[0].name, "Legendary Attack");
    assert_eq!(modules[0].parts.len(), 2);
    assert_eq!(modules[0].parts[0].value, 8);
    assert_eq!(modules[0].parts[1].value, 4);

    let aggregator = ModuleAggregator::new();
    assert!(aggregator.ingest(modules.clone()), "first sighting of uuid 42 must be new");
    assert_eq!(aggregator.len(), 1);
    assert!(!aggregator.ingest(modules), "re-ingesting the same uuid must not be new");
    assert_eq!(aggregator.len(), 1);
}
