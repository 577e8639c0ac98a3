// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod db;
pub mod types;

pub use db::Db;
pub use types::*;
pub mod bestpath;
pub mod coalesce;
pub mod error;
pub mod log;

pub const COMPONENT_RIB: &str = "rib";
pub const MOD_DB: &str = "database";
