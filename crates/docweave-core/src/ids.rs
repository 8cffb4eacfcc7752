/*
 * ids.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Content control id uniqueness.
//!
//! Cloning copies `w:sdtPr/w:id` verbatim, so a generated document is full
//! of duplicates. This pass runs once, after every part has been walked.

use docweave_xml::XmlTree;
use rand::Rng;
use std::collections::HashSet;
use tracing::debug;

/// Give every content control across `trees` a distinct `w:id`.
///
/// Trees are scanned in the order given (headers, footers, then body).
/// The first occurrence of an id keeps it; later duplicates and unparseable
/// ids get a fresh random id, redrawn until unused. Returns the number of
/// ids reassigned.
pub fn ensure_unique_ids(trees: &mut [&mut XmlTree]) -> usize {
    let mut rng = rand::thread_rng();
    let mut seen: HashSet<i64> = HashSet::new();
    let mut reassigned = 0;

    for tree in trees.iter_mut() {
        let ids = tree.descendants_matching(tree.root(), |t, n| {
            t.is(n, "w:id") && t.parent(n).is_some_and(|p| t.is(p, "w:sdtPr"))
        });
        for id in ids {
            let current = tree.attribute(id, "w:val").and_then(|v| v.trim().parse::<i64>().ok());
            if let Some(value) = current {
                if seen.insert(value) {
                    continue;
                }
            }
            let fresh = loop {
                let candidate = i64::from(rng.gen_range(1..i32::MAX));
                if seen.insert(candidate) {
                    break candidate;
                }
            };
            tree.set_attribute(id, "w:val", fresh.to_string());
            reassigned += 1;
        }
    }

    debug!(reassigned, unique = seen.len(), "content control ids made unique");
    reassigned
}
