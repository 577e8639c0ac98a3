// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The production channel implementation: a nonblocking Unix datagram
//! socket connected to the neighbor's endpoint path. Datagram framing means
//! one send is one JSON message, no stream re-assembly required.

use crate::connection::{Channel, Poll};
use crate::error::Error;
use crate::messages::{Envelope, MAX_MESSAGE_SIZE};
use std::io::ErrorKind;
use std::os::unix::net::UnixDatagram;
use std::path::Path;

pub struct UnixChannel {
    sock: UnixDatagram,
}

impl UnixChannel {
    /// Connect to the neighbor endpoint at `path`. Failure here is a fatal
    /// startup error for the caller; an absent endpoint means the neighbor
    /// process is not running.
    pub fn connect(path: &Path) -> Result<Self, Error> {
        let sock = UnixDatagram::unbound()?;
        sock.connect(path)?;
        sock.set_nonblocking(true)?;
        Ok(Self { sock })
    }
}

impl Channel for UnixChannel {
    fn send(&self, env: &Envelope) -> Result<(), Error> {
        let buf = env.to_wire()?;
        self.sock
            .send(&buf)
            .map_err(|e| Error::ChannelSend(e.to_string()))?;
        Ok(())
    }

    fn try_recv(&self) -> Result<Poll, Error> {
        let mut buf = [0u8; MAX_MESSAGE_SIZE];
        match self.sock.recv(&mut buf) {
            // An empty datagram is the peer's way of hanging up
            Ok(0) => Ok(Poll::Closed),
            Ok(n) => Ok(Poll::Message(Envelope::from_wire(&buf[..n])?)),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(Poll::Empty),
            Err(_) => Ok(Poll::Closed),
        }
    }
}
