// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use rib::Db;
use slog::info;
use speaker::config::{NeighborSpec, RouterConfig};
use speaker::connection_unix::UnixChannel;
use speaker::dispatcher::Dispatcher;
use speaker::log::init_logger;
use speaker::neighbor::Registry;
use speaker::router::Router;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "path vector routing speaker", long_about = None)]
struct Cli {
    /// The autonomous system number this speaker runs as.
    asn: u32,

    /// Neighbors to exchange routes with, as `<addr>-<relationship>` where
    /// relationship is cust, peer or prov.
    #[arg(required = true)]
    neighbors: Vec<String>,

    /// Directory holding one unix datagram socket per neighbor, named by
    /// the neighbor's address.
    #[arg(long, default_value = ".")]
    socket_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log = init_logger();

    let mut registry = Registry::default();
    for arg in &cli.neighbors {
        let spec: NeighborSpec = arg
            .parse()
            .map_err(|e| anyhow!("neighbor {arg}: {e}"))?;
        let path = cli.socket_dir.join(spec.addr.to_string());
        let conn = UnixChannel::connect(&path)
            .with_context(|| format!("connect to {}", path.display()))?;
        registry
            .add(spec.addr, spec.relationship, conn)
            .map_err(|e| anyhow!("register neighbor {}: {e}", spec.addr))?;
        info!(log, "neighbor {} ({})", spec.addr, spec.relationship);
    }

    let router = Router::new(
        RouterConfig { asn: cli.asn },
        log.clone(),
        Db::new(log.clone()),
        registry,
    );
    let mut dispatcher = Dispatcher::new(router, log.clone());

    info!(log, "speaker starting"; "asn" => cli.asn);
    dispatcher.run();
    info!(log, "speaker exiting");
    Ok(())
}
