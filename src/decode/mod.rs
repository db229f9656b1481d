// SPDX-License-Identifier: AGPL-3.0-or-later

//! Container decoder (C6): schema types, the fixed lookup tables, and the
//! four-tier decode strategy.

pub mod container;
pub mod schema;
pub mod tables;

pub use container::decode_inventory;
