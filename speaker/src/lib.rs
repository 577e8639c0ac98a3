// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod config;
pub mod connection;
pub mod connection_unix;
pub mod dispatcher;
pub mod error;
pub mod log;
pub mod messages;
pub mod neighbor;
pub mod policy;
pub mod router;

#[cfg(test)]
mod test;

#[cfg(test)]
pub mod connection_channel;

pub const COMPONENT_SPEAKER: &str = "speaker";
pub const MOD_ROUTER: &str = "router";
pub const MOD_DISPATCHER: &str = "dispatcher";

/// How long the event loop waits when no channel had a message ready.
pub const POLL_INTERVAL: std::time::Duration =
    std::time::Duration::from_millis(100);
