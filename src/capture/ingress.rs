// SPDX-License-Identifier: AGPL-3.0-or-later

//! Packet ingress (C2, spec §4.2): open a BPF-filtered capture handle and
//! deliver per-packet TCP payloads with their flow tuple and sequence number.

use anyhow::{Context, Result};
use bytes::Bytes;
use pnet_packet::{
    Packet,
    ethernet::{EtherTypes, EthernetPacket},
    ip::IpNextHeaderProtocols,
    ipv4::Ipv4Packet,
    tcp::TcpPacket,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{cfg::config::CaptureConfig, model::FlowKey};

/// One TCP segment handed from C2 to C3/C4.
#[derive(Debug, Clone)]
pub struct CapturedSegment {
    pub flow: FlowKey,
    pub seq: u32,
    pub payload: Bytes,
}

/// Opens `interface_name` with the configured filter/snaplen/ring buffer and
/// spawns a dedicated OS thread that decodes frames and forwards TCP
/// payloads until `cancel` fires. Parse errors per frame are swallowed
/// (counted via `tracing`, never fatal), per §4.2's concurrency contract.
pub fn spawn_capture(
    interface_name: &str,
    cfg: &CaptureConfig,
    cancel: CancellationToken,
) -> Result<(std::thread::JoinHandle<()>, mpsc::UnboundedReceiver<CapturedSegment>)> {
    let device = pcap::Device::list()
        .context("failed to list capture devices")?
        .into_iter()
        .find(|d| d.name == interface_name)
        .with_context(|| format!("unknown interface: {interface_name}"))?;

    let mut capture = pcap::Capture::from_device(device)
        .context("failed to open capture handle")?
        .promisc(true)
        .snaplen(cfg.snaplen)
        .buffer_size(cfg.ring_buffer_bytes.try_into().unwrap_or(i32::MAX))
        .open()
        .context("failed to activate capture handle")?;
    capture
        .filter(&cfg.bpf_filter, true)
        .context("failed to apply BPF filter")?;

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = std::thread::Builder::new()
        .name("capture-ingress".to_string())
        .spawn(move || capture_loop(capture, tx, cancel))
        .context("failed to spawn capture thread")?;

    Ok((handle, rx))
}

fn capture_loop(
    mut capture: pcap::Capture<pcap::Active>,
    tx: mpsc::UnboundedSender<CapturedSegment>,
    cancel: CancellationToken,
) {
    while !cancel.is_cancelled() {
        match capture.next_packet() {
            Ok(packet) => {
                if let Some(segment) = decode_frame(packet.data)
                    && !segment.payload.is_empty()
                    && tx.send(segment).is_err()
                {
                    break;
                }
            },
            Err(pcap::Error::TimeoutExpired) => continue,
            Err(err) => {
                warn!(error = %err, "capture read failed, stopping ingress thread");
                break;
            },
        }
    }
}

/// Decodes Ethernet → IPv4 → TCP and extracts `(FlowKey, seq, payload)`.
/// Returns `None` on any malformed or non-TCP/IPv4 frame (counted, never
/// fatal).
fn decode_frame(data: &[u8]) -> Option<CapturedSegment> {
    let eth = EthernetPacket::new(data)?;
    if eth.get_ethertype() != EtherTypes::Ipv4 {
        return None;
    }
    let ip = Ipv4Packet::new(eth.payload())?;
    if ip.get_next_level_protocol() != IpNextHeaderProtocols::Tcp {
        return None;
    }
    let tcp = TcpPacket::new(ip.payload())?;

    let flow = FlowKey {
        src_ip: ip.get_source(),
        src_port: tcp.get_source(),
        dst_ip: ip.get_destination(),
        dst_port: tcp.get_destination(),
    };
    let seq = tcp.get_sequence();
    let payload = Bytes::copy_from_slice(tcp.payload());
    debug!(?flow, seq, len = payload.len(), "decoded tcp segment");

    Some(CapturedSegment { flow, seq, payload })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_frame_rejects_truncated_ethernet() {
        assert!(decode_frame(&[0u8; 4]).is_none());
    }
}
