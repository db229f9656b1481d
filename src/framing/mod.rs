// SPDX-License-Identifier: AGPL-3.0-or-later

//! Frame demultiplexer (C5, spec §4.5): peels size-prefixed outer packets,
//! classifies inner messages as *Notify* or *FrameDown*, and recurses into
//! decompressed *FrameDown* payloads.

pub mod compression;

use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use self::compression::decompress;

/// Fixed server-identity constant carried by every *Notify* (§6).
pub const GAME_SERVICE_UUID: u64 = 0x0000_0000_6333_5342;
/// The single method id that identifies an inventory container payload (§6).
pub const SYNC_CONTAINER_METHOD_ID: u32 = 21;

const MIN_OUTER_SIZE: u32 = 6;
const MAX_OUTER_SIZE: u32 = 0x0F_FFFF;

const KIND_NOTIFY: u16 = 2;
const KIND_FRAME_DOWN: u16 = 6;
const COMPRESSED_FLAG: u16 = 0x8000;
const KIND_MASK: u16 = 0x7FFF;

/// Result of draining as much of the queue as currently available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Parsed everything possible; the remaining bytes (if any) are a
    /// partial trailing packet left in the queue.
    Ok,
    /// A malformed outer packet size was seen; caller must reset the flow.
    ProtocolError,
}

/// Drains complete outer packets from `queue`, calling `on_container` with
/// every *Notify(methodId=21)* payload found (already decompressed if
/// flagged). Leaves any trailing partial packet in `queue`.
pub fn drain_outer_packets(
    queue: &mut BytesMut,
    on_container: &mut dyn FnMut(Bytes),
) -> DrainOutcome {
    loop {
        if queue.len() < 4 {
            return DrainOutcome::Ok;
        }
        let size = u32::from_be_bytes([queue[0], queue[1], queue[2], queue[3]]);
        if size < MIN_OUTER_SIZE || size > MAX_OUTER_SIZE {
            warn!(size, "malformed outer packet size, resetting flow");
            return DrainOutcome::ProtocolError;
        }
        if queue.len() < size as usize {
            return DrainOutcome::Ok;
        }

        let packet = queue.split_to(size as usize).freeze();
        let type_tag = u16::from_be_bytes([packet[4], packet[5]]);
        let compressed = type_tag & COMPRESSED_FLAG != 0;
        let kind = type_tag & KIND_MASK;
        let inner_body = packet.slice(6..);

        match kind {
            KIND_NOTIFY => handle_notify(inner_body, compressed, on_container),
            KIND_FRAME_DOWN => handle_frame_down(inner_body, compressed, on_container),
            other => debug!(kind = other, "skipping unknown inner message kind"),
        }
    }
}

fn handle_notify(body: Bytes, compressed: bool, on_container: &mut dyn FnMut(Bytes)) {
    if body.len() < 16 {
        return;
    }
    let service_uuid = u64::from_be_bytes(body[0..8].try_into().unwrap_or_default());
    if service_uuid != GAME_SERVICE_UUID {
        return;
    }
    let method_id = u32::from_be_bytes(body[12..16].try_into().unwrap_or_default());
    let payload = body.slice(16..);

    let payload = match decode_payload(payload, compressed) {
        Some(p) => p,
        None => return,
    };

    if method_id == SYNC_CONTAINER_METHOD_ID {
        on_container(payload);
    }
}

fn handle_frame_down(body: Bytes, compressed: bool, on_container: &mut dyn FnMut(Bytes)) {
    if body.len() < 4 {
        return;
    }
    let nested = body.slice(4..);
    let nested = match decode_payload(nested, compressed) {
        Some(n) => n,
        None => return,
    };

    let mut nested_buf = BytesMut::from(&nested[..]);
    // Trailing partial bytes in a recursive FrameDown have no further
    // segment to complete them; they are intentionally discarded.
    let _ = drain_outer_packets(&mut nested_buf, on_container);
}

fn decode_payload(payload: Bytes, compressed: bool) -> Option<Bytes> {
    if !compressed {
        return Some(payload);
    }
    match decompress(&payload) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            warn!(error = %err, "decompression failed, dropping message");
            None
        },
    }
}
