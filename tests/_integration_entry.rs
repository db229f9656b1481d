// SPDX-License-Identifier: AGPL-3.0-or-later

#![allow(clippy::all)]

mod integration_tests {
    pub mod capture_to_aggregator;
    pub mod optimizer_pipeline;
}
