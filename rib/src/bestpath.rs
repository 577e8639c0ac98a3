// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::{db::RibIn, types::Route, Prefix4};
use itertools::Itertools;

/// The bestpath algorithm chooses the single best path for a particular
/// prefix from the set of active candidates. The algorithm performs path
/// filtering in the following ordered sequence of operations, each step
/// keeping every candidate tied for best and dropping only the strictly
/// worse.
///
/// - filter the selection group to the set of paths with the largest
///   local preference
/// - filter the selection group to self-originated paths, if any exist
/// - filter the selection group to the set of paths with the smallest
///   AS path length
/// - filter the selection group to the set of paths with the best origin
///   rank (IGP over EGP over UNK)
///
/// Upon completion of these filtering operations the remaining paths are
/// totally ordered by (neighbor address, announcement sequence) and the
/// smallest is returned: lowest dotted-quad neighbor address first, and if
/// two candidates somehow share an address, the earliest announced wins.
/// No step can empty a non-empty input, so a non-empty candidate set always
/// produces exactly one route.
pub fn bestpath(prefix: Prefix4, rib: &RibIn) -> Option<Route> {
    let candidates = rib.get(&prefix)?;
    if candidates.is_empty() {
        return None;
    }

    // Short-circuit: if there's only 1 candidate, then it is the best
    if candidates.len() == 1 {
        return candidates.values().next().cloned();
    }

    // Filter down to paths with the highest local preference
    let candidates = candidates
        .values()
        .max_set_by_key(|route| route.attrs.local_pref);

    // Filter down to self-originated paths. The `min_set_by_key` method
    // assigns self-originated paths to the `0` set and the rest to the `1`
    // set, then returns the `0` set, keeping all candidates when none are
    // self-originated.
    let candidates = candidates
        .into_iter()
        .min_set_by_key(|route| if route.attrs.self_origin { 0 } else { 1 });

    // Filter down to paths with the shortest AS-Path length
    let candidates = candidates
        .into_iter()
        .min_set_by_key(|route| route.attrs.as_path.len());

    // Filter down to paths with the best origin rank
    let candidates = candidates
        .into_iter()
        .max_set_by_key(|route| route.attrs.origin.rank());

    // Final deterministic tie break: lowest neighbor address, then first
    // announced.
    candidates
        .into_iter()
        .min_by_key(|route| (route.neighbor, route.seq))
        .cloned()
}
