//! Live packet capture: interface enumeration (C1), packet ingress (C2),
//! and game-server identification (C3).

// SPDX-License-Identifier: AGPL-3.0-or-later

pub mod ingress;
pub mod interfaces;
pub mod server_id;

pub use ingress::{CapturedSegment, spawn_capture};
pub use interfaces::{CaptureBackendStatus, list_interfaces, refresh_interfaces};
