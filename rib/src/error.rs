// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::net::Ipv4Addr;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("non-contiguous netmask {0}")]
    InvalidNetmask(Ipv4Addr),

    #[error("serialization error {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal invariant violation: {0}")]
    Internal(String),
}
