use std::fmt::{Debug, Formatter};

use bit_set::BitSet;

use crate::grid_config::GridConfig;
use crate::{SlotId, WordId};

/// The live candidate words for each slot, stored as a bit set of `WordId`s. Domains start out
/// holding the entire word list and only ever shrink.
#[derive(Clone, PartialEq, Eq)]
pub struct DomainStore {
    domains: Vec<BitSet>,
}

impl Debug for DomainStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainStore")
            .field(
                "domain_sizes",
                &self.domains.iter().map(|domain| domain.len()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl DomainStore {
    /// Give every slot in the grid a domain containing every word in the word list.
    pub fn new(config: &GridConfig) -> DomainStore {
        let word_count = config.word_list.len();

        DomainStore {
            domains: (0..config.slot_count())
                .map(|_| (0..word_count).collect::<BitSet>())
                .collect(),
        }
    }

    /// Iterate over the slot's remaining words in ascending `WordId` order.
    pub fn get_domain(&self, slot_id: SlotId) -> impl Iterator<Item = WordId> + '_ {
        self.domains[slot_id].iter()
    }

    pub fn contains(&self, slot_id: SlotId, word_id: WordId) -> bool {
        self.domains[slot_id].contains(word_id)
    }

    /// Remove a word from a slot's domain, returning whether it was present.
    pub fn remove(&mut self, slot_id: SlotId, word_id: WordId) -> bool {
        self.domains[slot_id].remove(word_id)
    }

    pub fn domain_size(&self, slot_id: SlotId) -> usize {
        self.domains[slot_id].len()
    }

    pub fn slot_count(&self) -> usize {
        self.domains.len()
    }
}
