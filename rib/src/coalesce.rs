// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::db::RibLoc;
use crate::types::Route;

/// Coalesce the selected route table in place, repeatedly replacing buddy
/// prefix pairs with their common supernet until no further merge is
/// possible.
///
/// Two entries merge when their prefixes are buddies (their union is the
/// exact block one bit shorter), they were learned from the same neighbor
/// and all forwarding attributes are identical. A merge is skipped when the
/// supernet slot is already occupied by another entry.
///
/// This function only ever runs over a table freshly rebuilt from the
/// candidate sets, so merging is always reversible: the constituents remain
/// in the candidate index and reappear on the next rebuild if a mutation
/// breaks the merge.
pub fn coalesce(rib: &mut RibLoc) {
    loop {
        let mut merge = None;
        for (prefix, route) in rib.iter() {
            // Visit each buddy pair once, from its lower half
            if !prefix.is_lower_half() {
                continue;
            }
            let Some(buddy) = prefix.buddy() else {
                continue;
            };
            let Some(supernet) = prefix.supernet() else {
                continue;
            };
            if rib.contains_key(&supernet) {
                continue;
            }
            if let Some(other) = rib.get(&buddy) {
                if other.neighbor == route.neighbor
                    && other.attrs == route.attrs
                {
                    merge = Some((*prefix, buddy, supernet));
                    break;
                }
            }
        }
        let Some((low, high, supernet)) = merge else {
            break;
        };
        let (Some(a), Some(_b)) = (rib.remove(&low), rib.remove(&high))
        else {
            break;
        };
        rib.insert(supernet, a);
    }
}
