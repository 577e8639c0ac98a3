// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The event loop. Single-threaded and cooperative: each iteration visits
//! every neighbor channel in registration order, handling at most one
//! ready message per channel, and sleeps for one poll interval when
//! nothing was ready. All database and registry mutation happens here, on
//! this one thread, so the router needs no locking.

use crate::connection::{Channel, Poll};
use crate::error::Error;
use crate::log::dispatcher_log;
use crate::messages::{Envelope, Message};
use crate::router::Router;
use crate::POLL_INTERVAL;
use slog::Logger;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct Dispatcher<Cnx: Channel> {
    pub router: Router<Cnx>,
    shutdown: Arc<AtomicBool>,
    log: Logger,
}

impl<Cnx: Channel> Dispatcher<Cnx> {
    pub fn new(router: Router<Cnx>, log: Logger) -> Self {
        Self {
            router,
            shutdown: Arc::new(AtomicBool::new(false)),
            log,
        }
    }

    /// A handle that stops the loop at the top of its next iteration.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Run the event loop until shut down or until no neighbors remain.
    pub fn run(&mut self) {
        loop {
            if self.shutdown.load(Ordering::Acquire) {
                dispatcher_log!(self, info, "shutdown requested, exiting");
                break;
            }
            if self.router.registry.is_empty() {
                dispatcher_log!(self, info, "no neighbors remain, exiting");
                break;
            }

            let mut busy = false;
            let mut down = Vec::new();
            for addr in self.router.registry.polling_order() {
                let poll = match self.router.registry.get(addr) {
                    Some(neighbor) => neighbor.conn.try_recv(),
                    None => continue,
                };
                match poll {
                    Ok(Poll::Message(env)) => {
                        busy = true;
                        dispatcher_log!(
                            self,
                            debug,
                            "recv {env} on channel {addr}";
                            "message" => env.message.title()
                        );
                        if let Err(e) =
                            self.router.handle_message(addr, &env)
                        {
                            dispatcher_log!(
                                self,
                                warn,
                                "rejecting {} from {addr}: {e}",
                                env.message.title();
                                "error" => format!("{e}")
                            );
                            self.reply_error(addr, &env);
                        }
                    }
                    Ok(Poll::Empty) => {}
                    Ok(Poll::Closed) => {
                        busy = true;
                        down.push(addr);
                    }
                    Err(e) => {
                        // Undecodable message. The return channel is known
                        // even though the sender's envelope is not, so
                        // answer with an error and keep going.
                        busy = true;
                        dispatcher_log!(
                            self,
                            warn,
                            "undecodable message on channel {addr}: {e}";
                            "error" => format!("{e}")
                        );
                        self.reply_undecodable(addr, e);
                    }
                }
            }

            for addr in down {
                self.router.neighbor_down(addr);
            }

            if !busy {
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    }

    fn reply_error(&self, addr: Ipv4Addr, env: &Envelope) {
        if let Some(neighbor) = self.router.registry.get(addr) {
            if let Err(e) = neighbor.conn.send(&env.no_route()) {
                dispatcher_log!(self, error, "error reply to {addr}: {e}");
            }
        }
    }

    fn reply_undecodable(&self, addr: Ipv4Addr, _cause: Error) {
        let reply = Envelope {
            src: Ipv4Addr::UNSPECIFIED,
            dst: Ipv4Addr::UNSPECIFIED,
            message: Message::NoRoute(serde_json::Value::Object(
                Default::default(),
            )),
        };
        if let Some(neighbor) = self.router.registry.get(addr) {
            if let Err(e) = neighbor.conn.send(&reply) {
                dispatcher_log!(self, error, "error reply to {addr}: {e}");
            }
        }
    }
}
