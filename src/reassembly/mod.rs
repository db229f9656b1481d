// SPDX-License-Identifier: AGPL-3.0-or-later

//! TCP reassembler (C4, spec §4.4): buffers out-of-order segments on the
//! selected flow, drains them into a contiguous byte queue, and evicts
//! stale state under a janitor cadence.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use bytes::{Bytes, BytesMut};
use tracing::warn;

use crate::model::FlowKey;

/// Maximum valid outer-packet size (§3 `OuterPacket`); anything larger is a
/// desync signal.
const MAX_OUTER_SIZE: u32 = 0x0F_FFFF;

/// One out-of-order segment held pending drain, keyed by its starting
/// sequence number (§3 `SegmentCacheEntry`).
#[derive(Debug)]
struct SegmentCacheEntry {
    payload: Bytes,
    last_access: Instant,
}

/// Per-flow reassembly state (§3 `ReassemblyState`). Owned solely by the
/// capture+janitor execution contexts (§5).
pub struct ReassemblyState {
    selected_flow: Option<FlowKey>,
    expected_next_seq: Option<u32>,
    queue: BytesMut,
    cache: HashMap<u32, SegmentCacheEntry>,
    last_activity: Instant,
    cache_max: usize,
    queue_cap_bytes: usize,
}

impl ReassemblyState {
    pub fn new(cache_max: usize, queue_cap_bytes: usize) -> Self {
        Self {
            selected_flow: None,
            expected_next_seq: None,
            queue: BytesMut::new(),
            cache: HashMap::new(),
            last_activity: Instant::now(),
            cache_max,
            queue_cap_bytes,
        }
    }

    pub fn selected_flow(&self) -> Option<FlowKey> {
        self.selected_flow
    }

    pub fn is_selected(&self, flow: FlowKey) -> bool {
        self.selected_flow == Some(flow)
    }

    /// Adopts `flow` as the selected flow (C3's lock-on), clears prior
    /// state, and seeds `expected_next_seq` from the adopting segment.
    pub fn select_flow(&mut self, flow: FlowKey, seq: u32, payload_len: usize) {
        self.reset_state();
        self.selected_flow = Some(flow);
        self.expected_next_seq = Some(seq.wrapping_add(payload_len as u32));
        self.last_activity = Instant::now();
    }

    /// Clears the selected flow and all buffered state (flow reset, §4.4/§7).
    pub fn reset(&mut self) {
        self.selected_flow = None;
        self.reset_state();
    }

    fn reset_state(&mut self) {
        self.expected_next_seq = None;
        self.queue.clear();
        self.cache.clear();
    }

    /// Ingests one segment on the selected flow (§4.4 steps 1-4). Caller must
    /// ensure the segment belongs to `selected_flow`.
    pub fn ingest(&mut self, seq: u32, payload: Bytes) {
        if payload.is_empty() {
            return;
        }

        let expected = match self.expected_next_seq {
            Some(e) => e,
            None => {
                if looks_like_outer_size(&payload) {
                    self.expected_next_seq = Some(seq);
                    seq
                } else {
                    return;
                }
            },
        };

        if !buffer_allowed(expected, seq) {
            return;
        }

        let now = Instant::now();
        self.cache.insert(seq, SegmentCacheEntry { payload, last_access: now });
        self.evict_over_capacity();

        let mut expected = expected;
        while let Some(entry) = self.cache.remove(&expected) {
            if self.queue.len() + entry.payload.len() > self.queue_cap_bytes {
                warn!("reassembly queue cap exceeded, dropping queue and cache (desync)");
                self.queue.clear();
                self.cache.clear();
                self.expected_next_seq = Some(expected);
                return;
            }
            self.queue.extend_from_slice(&entry.payload);
            expected = expected.wrapping_add(entry.payload.len() as u32);
        }
        self.expected_next_seq = Some(expected);
        self.last_activity = now;
    }

    pub fn expected_next_seq(&self) -> Option<u32> {
        self.expected_next_seq
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Gives the frame demultiplexer mutable access to the drained byte
    /// queue; it consumes bytes from the front and leaves the trailing
    /// partial packet in place.
    pub fn queue_mut(&mut self) -> &mut BytesMut {
        &mut self.queue
    }

    fn evict_over_capacity(&mut self) {
        while self.cache.len() > self.cache_max {
            if let Some((&oldest_key, _)) =
                self.cache.iter().min_by_key(|(_, e)| e.last_access)
            {
                self.cache.remove(&oldest_key);
            } else {
                break;
            }
        }
    }

    /// Janitor pass (§4.4 step 5, §5): evicts cache entries past
    /// `segment_timeout`; resets the flow if idle past `idle_timeout`.
    /// Returns `true` if the flow was reset.
    pub fn janitor_tick(&mut self, segment_timeout: Duration, idle_timeout: Duration) -> bool {
        let now = Instant::now();
        self.cache.retain(|_, e| now.duration_since(e.last_access) <= segment_timeout);

        if self.selected_flow.is_some() && now.duration_since(self.last_activity) > idle_timeout {
            warn!("reassembly idle past timeout, resetting flow");
            self.reset();
            return true;
        }
        false
    }
}

/// Literal rule from §4.4 step 2: buffer iff `seq` is not-less-than
/// `expected` in unsigned order, or a wrap just occurred.
fn buffer_allowed(expected: u32, seq: u32) -> bool {
    seq >= expected || (expected > 0x8000_0000 && seq < 0x8000_0000)
}

fn looks_like_outer_size(payload: &[u8]) -> bool {
    payload.len() >= 4
        && u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) < MAX_OUTER_SIZE
}
