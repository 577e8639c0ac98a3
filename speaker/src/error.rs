// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::net::Ipv4Addr;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("message decode: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("rib error: {0}")]
    Rib(#[from] rib::error::Error),

    #[error("message from unknown neighbor: {0}")]
    UnknownNeighbor(Ipv4Addr),

    #[error("neighbor already registered: {0}")]
    NeighborExists(Ipv4Addr),

    #[error("channel send: {0}")]
    ChannelSend(String),

    #[error("invalid neighbor spec: {0}")]
    InvalidNeighborSpec(String),
}
