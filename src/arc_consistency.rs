//! This module implements the consistency half of the solver. A grid is node-consistent when every
//! word left in a slot's domain has the slot's length, and arc-consistent when, for every pair of
//! crossing slots, every word left for one slot agrees with at least one word left for the other
//! at the shared cell. We get to arc consistency with AC-3: revise each arc, and whenever a
//! revision shrinks a domain, re-queue the arcs pointing at that slot.

use std::collections::HashSet;

use log::{debug, trace};

use crate::domains::DomainStore;
use crate::grid_config::GridConfig;
use crate::{SlotId, WordId};

/// An ordered pair `(x, y)` of crossing slots; revising it prunes `x` against `y`.
pub type Arc = (SlotId, SlotId);

/// Result from a successful call to `ac3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArcConsistencySuccess {
    /// How many times `revise` was called.
    pub revisions: usize,

    /// How many words were removed across all domains.
    pub eliminations: usize,
}

/// Result from a call to `ac3` that wiped out a domain, meaning the grid has no fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArcConsistencyFailure {
    pub emptied_slot_id: SlotId,
}

/// Result from a call to `ac3`.
pub type ArcConsistencyResult = Result<ArcConsistencySuccess, ArcConsistencyFailure>;

/// Remove every word whose length doesn't match its slot's length. Returns the number of words
/// removed.
pub fn enforce_node_consistency(config: &GridConfig, domains: &mut DomainStore) -> usize {
    let mut removed = 0;

    for slot_config in &config.slot_configs {
        let inconsistent: Vec<WordId> = domains
            .get_domain(slot_config.id)
            .filter(|&word_id| config.word_list.get(word_id).len() != slot_config.length)
            .collect();

        for word_id in inconsistent {
            domains.remove(slot_config.id, word_id);
            removed += 1;
        }
    }

    debug!("Node consistency removed {} words", removed);

    removed
}

/// Make slot `x` arc-consistent with slot `y` by removing every word from `x`'s domain that has
/// no partner in `y`'s domain agreeing at the shared cell. Returns whether `x`'s domain changed.
/// Revising a pair of slots that don't cross is a no-op.
pub fn revise(config: &GridConfig, domains: &mut DomainStore, x: SlotId, y: SlotId) -> bool {
    let Some((x_cell, y_cell)) = config.overlap(x, y) else {
        return false;
    };

    // Every glyph that some word in `y`'s domain places at the shared cell.
    let supported_glyphs: HashSet<char> = domains
        .get_domain(y)
        .filter_map(|word_id| config.word_list.get(word_id).glyphs.get(y_cell).copied())
        .collect();

    let unsupported: Vec<WordId> = domains
        .get_domain(x)
        .filter(|&word_id| {
            config
                .word_list
                .get(word_id)
                .glyphs
                .get(x_cell)
                .map_or(true, |glyph| !supported_glyphs.contains(glyph))
        })
        .collect();

    for &word_id in &unsupported {
        domains.remove(x, word_id);
    }

    if !unsupported.is_empty() {
        trace!("Revised slot {} against slot {}: removed {} words", x, y, unsupported.len());
    }

    !unsupported.is_empty()
}

/// Every arc in the grid: for each slot, in id order, one arc per crossing, in cell order.
pub fn all_arcs(config: &GridConfig) -> Vec<Arc> {
    config
        .slot_configs
        .iter()
        .flat_map(|slot_config| {
            slot_config.neighbors().map(move |neighbor_id| (slot_config.id, neighbor_id))
        })
        .collect()
}

/// Run AC-3, starting from the given arcs or from every arc in the grid if `arcs` is `None`. The
/// worklist is a stack, so the most recently queued arc is revised first.
///
/// If any domain is emptied along the way we stop immediately and report the slot, since no fill
/// can exist. A successful result only guarantees arc consistency, not that a fill exists.
pub fn ac3(
    config: &GridConfig,
    domains: &mut DomainStore,
    arcs: Option<Vec<Arc>>,
) -> ArcConsistencyResult {
    let mut worklist: Vec<Arc> = arcs.unwrap_or_else(|| all_arcs(config));
    let mut revisions = 0;
    let mut eliminations = 0;

    while let Some((x, y)) = worklist.pop() {
        let size_before = domains.domain_size(x);
        revisions += 1;

        if !revise(config, domains, x, y) {
            continue;
        }

        let size_after = domains.domain_size(x);
        eliminations += size_before - size_after;

        if size_after == 0 {
            debug!(
                "AC-3 emptied slot {} after {} revisions ({} eliminations)",
                x, revisions, eliminations
            );
            return Err(ArcConsistencyFailure { emptied_slot_id: x });
        }

        // Anything crossing `x` may have lost its support in `x`, except `y`, which `x` was just
        // revised against.
        worklist.extend(config.neighbors(x).filter(|&z| z != y).map(|z| (z, x)));
    }

    debug!(
        "AC-3 finished after {} revisions ({} eliminations)",
        revisions, eliminations
    );

    Ok(ArcConsistencySuccess { revisions, eliminations })
}

#[cfg(test)]
mod tests {
    use crate::arc_consistency::{
        ac3, all_arcs, enforce_node_consistency, revise, ArcConsistencyFailure,
    };
    use crate::domains::DomainStore;
    use crate::grid_config::{
        generate_grid_config, Direction::{Across, Down}, GridConfig, GridEntry,
    };
    use crate::word_list::WordList;

    /// A: across at (0, 0), B: down at (0, 0), sharing their first cell.
    fn corner_grid(words: &[&str]) -> GridConfig {
        generate_grid_config(
            WordList::new(words.iter()),
            &[
                GridEntry { loc: (0, 0), len: 3, dir: Across },
                GridEntry { loc: (0, 0), len: 3, dir: Down },
            ],
        )
        .unwrap()
    }

    fn domain_strings(config: &GridConfig, domains: &DomainStore, slot_id: usize) -> Vec<String> {
        domains
            .get_domain(slot_id)
            .map(|word_id| config.word_list.get(word_id).string.clone())
            .collect()
    }

    #[test]
    fn test_node_consistency_filters_by_length() {
        let grid_config = corner_grid(&["CAT", "TACO", "DOG", "AT"]);
        let mut domains = DomainStore::new(&grid_config);

        assert_eq!(enforce_node_consistency(&grid_config, &mut domains), 4);
        assert_eq!(domain_strings(&grid_config, &domains, 0), vec!["CAT", "DOG"]);
        assert_eq!(domain_strings(&grid_config, &domains, 1), vec!["CAT", "DOG"]);

        assert_eq!(enforce_node_consistency(&grid_config, &mut domains), 0);
    }

    #[test]
    fn test_node_consistency_keeps_all_same_length_words() {
        let grid_config = corner_grid(&["CAT", "DOG", "CAR", "ACE"]);
        let mut domains = DomainStore::new(&grid_config);

        enforce_node_consistency(&grid_config, &mut domains);

        assert_eq!(domains.domain_size(0), 4);
        assert_eq!(domains.domain_size(1), 4);
    }

    #[test]
    fn test_revise_removes_unsupported_words() {
        let grid_config = corner_grid(&["CAT", "DOG", "CAR", "ACE"]);
        let mut domains = DomainStore::new(&grid_config);
        enforce_node_consistency(&grid_config, &mut domains);

        // Leave B with only words starting with C.
        domains.remove(1, grid_config.word_list.id_of("DOG").unwrap());
        domains.remove(1, grid_config.word_list.id_of("ACE").unwrap());

        assert!(revise(&grid_config, &mut domains, 0, 1));
        assert_eq!(domain_strings(&grid_config, &domains, 0), vec!["CAT", "CAR"]);

        assert!(!revise(&grid_config, &mut domains, 0, 1));
    }

    #[test]
    fn test_revise_without_overlap_is_a_noop() {
        let grid_config = generate_grid_config(
            WordList::new(["CAT", "DOG"]),
            &[
                GridEntry { loc: (0, 0), len: 3, dir: Across },
                GridEntry { loc: (2, 0), len: 3, dir: Across },
            ],
        )
        .unwrap();
        let mut domains = DomainStore::new(&grid_config);
        domains.remove(1, 0);
        domains.remove(1, 1);

        assert!(!revise(&grid_config, &mut domains, 0, 1));
        assert_eq!(domains.domain_size(0), 2);
    }

    #[test]
    fn test_all_arcs_covers_both_directions() {
        let grid_config = corner_grid(&["CAT"]);

        assert_eq!(all_arcs(&grid_config), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_ac3_keeps_consistent_corner() {
        let grid_config = corner_grid(&["CAT", "DOG", "CAR", "ACE"]);
        let mut domains = DomainStore::new(&grid_config);
        enforce_node_consistency(&grid_config, &mut domains);

        let result = ac3(&grid_config, &mut domains, None).expect("AC-3 failed");

        assert_eq!(result.revisions, 2);
        assert_eq!(result.eliminations, 0);
        assert_eq!(domains.domain_size(0), 4);
        assert_eq!(domains.domain_size(1), 4);
    }

    #[test]
    fn test_ac3_propagates_through_chain() {
        // A across at (0, 0), B down from A's last cell, C across from B's last cell.
        let grid_config = generate_grid_config(
            WordList::new(["ABC", "CDE", "EFG", "XYZ"]),
            &[
                GridEntry { loc: (0, 0), len: 3, dir: Across },
                GridEntry { loc: (0, 2), len: 3, dir: Down },
                GridEntry { loc: (2, 2), len: 3, dir: Across },
            ],
        )
        .unwrap();
        let mut domains = DomainStore::new(&grid_config);
        enforce_node_consistency(&grid_config, &mut domains);

        // Only allow C to be EFG, which should force B to CDE and A to ABC.
        domains.remove(2, grid_config.word_list.id_of("ABC").unwrap());
        domains.remove(2, grid_config.word_list.id_of("CDE").unwrap());
        domains.remove(2, grid_config.word_list.id_of("XYZ").unwrap());

        ac3(&grid_config, &mut domains, Some(vec![(1, 2)])).expect("AC-3 failed");

        assert_eq!(domain_strings(&grid_config, &domains, 0), vec!["ABC"]);
        assert_eq!(domain_strings(&grid_config, &domains, 1), vec!["CDE"]);
        assert_eq!(domain_strings(&grid_config, &domains, 2), vec!["EFG"]);
    }

    #[test]
    fn test_ac3_reports_emptied_domain() {
        // A's last cell is B's first cell, and no word ends with a letter another word starts
        // with.
        let grid_config = generate_grid_config(
            WordList::new(["ABC", "ABD"]),
            &[
                GridEntry { loc: (0, 0), len: 3, dir: Across },
                GridEntry { loc: (0, 2), len: 3, dir: Down },
            ],
        )
        .unwrap();
        let mut domains = DomainStore::new(&grid_config);
        enforce_node_consistency(&grid_config, &mut domains);

        let result = ac3(&grid_config, &mut domains, None);

        assert!(matches!(result, Err(ArcConsistencyFailure { .. })));
        assert!((0..2).any(|slot_id| domains.domain_size(slot_id) == 0));
    }

    #[test]
    fn test_ac3_is_idempotent() {
        let grid_config = corner_grid(&["CAT", "DOG", "CAR", "ACE", "TOP", "OAK"]);
        let mut domains = DomainStore::new(&grid_config);
        enforce_node_consistency(&grid_config, &mut domains);
        domains.remove(1, grid_config.word_list.id_of("CAT").unwrap());
        domains.remove(1, grid_config.word_list.id_of("CAR").unwrap());

        ac3(&grid_config, &mut domains, None).expect("AC-3 failed");
        let after_first_pass = domains.clone();

        let second = ac3(&grid_config, &mut domains, None).expect("AC-3 failed");

        assert_eq!(second.eliminations, 0);
        assert_eq!(domains, after_first_pass);
    }
}
