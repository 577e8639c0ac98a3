// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// This file contains code for testing purposes only. Note that it's only
/// included in `lib.rs` with a `#[cfg(test)]` guard. It implements the
/// `Channel` trait over in-process mpsc channel pairs so that multiple
/// speakers (or a speaker and a scripted test peer) can exchange messages
/// inside one test without any transport underneath.
use crate::connection::{Channel, Poll};
use crate::error::Error;
use crate::messages::Envelope;
use std::sync::mpsc::{
    channel as mpsc_channel, Receiver, Sender, TryRecvError,
};

/// A combined (duplex) mpsc sender/receiver.
pub struct Endpoint<T> {
    pub rx: Receiver<T>,
    pub tx: Sender<T>,
}

impl<T> Endpoint<T> {
    fn new(rx: Receiver<T>, tx: Sender<T>) -> Self {
        Self { rx, tx }
    }
}

/// Creates a bidirectional channel pair with both sender and receiver.
pub fn channel<T>() -> (Endpoint<T>, Endpoint<T>) {
    let (tx_a, rx_b) = mpsc_channel();
    let (tx_b, rx_a) = mpsc_channel();
    (Endpoint::new(rx_a, tx_a), Endpoint::new(rx_b, tx_b))
}

/// A `Channel` over one side of a duplex mpsc pair.
pub struct ChannelConn {
    ep: Endpoint<Envelope>,
}

impl ChannelConn {
    pub fn new(ep: Endpoint<Envelope>) -> Self {
        Self { ep }
    }
}

impl Channel for ChannelConn {
    fn send(&self, env: &Envelope) -> Result<(), Error> {
        self.ep
            .tx
            .send(env.clone())
            .map_err(|e| Error::ChannelSend(e.to_string()))
    }

    fn try_recv(&self) -> Result<Poll, Error> {
        match self.ep.rx.try_recv() {
            Ok(env) => Ok(Poll::Message(env)),
            Err(TryRecvError::Empty) => Ok(Poll::Empty),
            Err(TryRecvError::Disconnected) => Ok(Poll::Closed),
        }
    }
}
