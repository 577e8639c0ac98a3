// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;
use crate::messages::Envelope;

/// The result of polling a channel for one inbound message.
#[derive(Debug)]
pub enum Poll {
    /// A decoded message is ready.
    Message(Envelope),
    /// Nothing ready right now.
    Empty,
    /// The channel reported closure or an unrecoverable error; the neighbor
    /// is down.
    Closed,
}

/// A message channel to one neighbor. Implementations carry the transport
/// details; the router and dispatcher only ever speak envelopes. Channels
/// never block: sends are fire-and-forget toward the transport and receives
/// poll readiness.
pub trait Channel {
    /// Send one message to the neighbor.
    fn send(&self, env: &Envelope) -> Result<(), Error>;

    /// Poll for one inbound message without blocking. A decode failure is
    /// returned as an error without consuming the channel; the caller
    /// decides whether to answer the sender.
    fn try_recv(&self) -> Result<Poll, Error>;
}
