//! This module implements grid-filling using plain chronological backtracking over the domains
//! left behind by `arc_consistency`. Slots are chosen with the minimum-remaining-values heuristic
//! (ties broken by degree), and words are tried in least-constraining-value order. Domains are not
//! re-pruned during the search; each tentative choice is validated against the whole assignment.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::Receiver;

use instant::{Duration, Instant};
use log::{debug, info, trace};
use thiserror::Error;

use crate::arc_consistency::{ac3, enforce_node_consistency, ArcConsistencyFailure};
use crate::domains::DomainStore;
use crate::grid_config::GridConfig;
use crate::{SlotId, WordId};

/// How many states should we visit between checks of the deadline and the abort channel? The
/// first state is always checked.
pub const INTERRUPT_FREQUENCY: u64 = 64;

/// A struct recording a slot assignment made during the filling process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    pub slot_id: SlotId,
    pub word_id: WordId,
}

/// A partial mapping from slots to words, indexed by `SlotId`. This is kept separate from the
/// domains: assigning a word never removes anything from a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    word_ids: Vec<Option<WordId>>,
    assigned_count: usize,
}

impl Assignment {
    /// An empty assignment for a grid with `slot_count` slots.
    pub fn new(slot_count: usize) -> Assignment {
        Assignment { word_ids: vec![None; slot_count], assigned_count: 0 }
    }

    /// Assign a word to a slot, returning the word it replaced, if any.
    pub fn assign(&mut self, slot_id: SlotId, word_id: WordId) -> Option<WordId> {
        let previous = self.word_ids[slot_id].replace(word_id);
        if previous.is_none() {
            self.assigned_count += 1;
        }
        previous
    }

    /// Clear a slot, returning the word it held, if any.
    pub fn unassign(&mut self, slot_id: SlotId) -> Option<WordId> {
        let previous = self.word_ids[slot_id].take();
        if previous.is_some() {
            self.assigned_count -= 1;
        }
        previous
    }

    pub fn get(&self, slot_id: SlotId) -> Option<WordId> {
        self.word_ids.get(slot_id).copied().flatten()
    }

    pub fn contains(&self, slot_id: SlotId) -> bool {
        self.get(slot_id).is_some()
    }

    /// The number of slots holding a word.
    pub fn len(&self) -> usize {
        self.assigned_count
    }

    pub fn is_empty(&self) -> bool {
        self.assigned_count == 0
    }

    pub fn slot_count(&self) -> usize {
        self.word_ids.len()
    }

    /// The assigned slots and their words, in slot order.
    pub fn choices(&self) -> impl Iterator<Item = Choice> + '_ {
        self.word_ids.iter().enumerate().filter_map(|(slot_id, word_id)| {
            word_id.map(|word_id| Choice { slot_id, word_id })
        })
    }
}

/// A struct tracking stats about the filling process.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub states: u64,
    pub backtracks: u64,
    pub node_consistency_eliminations: usize,
    pub arc_consistency_revisions: usize,
    pub arc_consistency_eliminations: usize,
    pub initial_consistency_time: Duration,
    pub search_time: Duration,
    pub total_time: Duration,
}

/// Knobs for `find_fill`.
///
/// ```
/// use std::time::Duration;
/// use crossword_csp::FillOptions;
///
/// let options = FillOptions::default().with_timeout(Duration::from_secs(5));
/// assert!(options.enforce_arc_consistency);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FillOptions<'a> {
    /// Give up with `FillFailure::Timeout` once this much time has passed.
    pub timeout: Option<Duration>,

    /// Give up with `FillFailure::Abort` once a message arrives on this channel.
    pub abort_rx: Option<&'a Receiver<()>>,

    /// Run AC-3 before searching. Turning this off never changes whether a fill is found, only how
    /// long it takes.
    pub enforce_arc_consistency: bool,
}

impl Default for FillOptions<'_> {
    fn default() -> Self {
        FillOptions { timeout: None, abort_rx: None, enforce_arc_consistency: true }
    }
}

impl<'a> FillOptions<'a> {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_abort_rx(mut self, abort_rx: &'a Receiver<()>) -> Self {
        self.abort_rx = Some(abort_rx);
        self
    }

    pub fn without_arc_consistency(mut self) -> Self {
        self.enforce_arc_consistency = false;
        self
    }
}

/// A struct representing the results of a fill operation.
#[derive(Debug)]
pub struct FillSuccess {
    pub statistics: Statistics,
    pub assignment: Assignment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FillFailure {
    /// No assignment satisfies every constraint.
    #[error("No solution.")]
    HardFailure,

    #[error("timed out before finding a fill")]
    Timeout,

    #[error("fill was aborted")]
    Abort,
}

/// Does the assignment give a word to every slot? An empty assignment never counts as complete,
/// even for a grid without slots.
pub fn is_complete(config: &GridConfig, assignment: &Assignment) -> bool {
    !assignment.is_empty()
        && config.slot_configs.iter().all(|slot_config| assignment.contains(slot_config.id))
}

/// Check the whole assignment from scratch: every word must fit its slot's length, no word may be
/// used twice, and every pair of assigned crossing slots must agree on the shared cell.
pub fn is_consistent(config: &GridConfig, assignment: &Assignment) -> bool {
    let mut used_word_ids: HashSet<WordId> = HashSet::with_capacity(assignment.len());

    for Choice { slot_id, word_id } in assignment.choices() {
        let Some(slot_config) = config.slot_configs.get(slot_id) else {
            return false;
        };
        let word = config.word_list.get(word_id);

        if word.len() != slot_config.length || !used_word_ids.insert(word_id) {
            return false;
        }

        for (cell_idx, crossing) in slot_config.crossings.iter().enumerate() {
            let Some(crossing) = crossing else {
                continue;
            };
            let Some(other_word_id) = assignment.get(crossing.other_slot_id) else {
                continue;
            };

            let other_word = config.word_list.get(other_word_id);
            if word.glyphs.get(cell_idx) != other_word.glyphs.get(crossing.other_slot_cell) {
                return false;
            }
        }
    }

    true
}

/// Choose the unassigned slot with the fewest remaining words, preferring the slot with the most
/// crossings on ties and the lowest slot id after that. Returns `None` once every slot is assigned.
pub fn select_unassigned_variable(
    config: &GridConfig,
    domains: &DomainStore,
    assignment: &Assignment,
) -> Option<SlotId> {
    config
        .slot_configs
        .iter()
        .filter(|slot_config| !assignment.contains(slot_config.id))
        .min_by_key(|slot_config| {
            (domains.domain_size(slot_config.id), Reverse(slot_config.neighbor_count()))
        })
        .map(|slot_config| slot_config.id)
}

/// Return the slot's words ordered by how many words each would rule out of the domains of the
/// slot's unassigned crossings, fewest first. Ties keep ascending `WordId` order.
pub fn order_domain_values(
    config: &GridConfig,
    domains: &DomainStore,
    slot_id: SlotId,
    assignment: &Assignment,
) -> Vec<WordId> {
    let slot_config = &config.slot_configs[slot_id];

    // For each unassigned crossing: (our cell index, their domain size, how many of their words
    // place each glyph in the shared cell).
    let crossing_glyph_counts: Vec<(usize, usize, HashMap<char, usize>)> = slot_config
        .crossings
        .iter()
        .enumerate()
        .filter_map(|(cell_idx, crossing)| {
            let crossing = crossing.as_ref()?;
            if assignment.contains(crossing.other_slot_id) {
                return None;
            }

            let mut glyph_counts: HashMap<char, usize> = HashMap::new();
            for word_id in domains.get_domain(crossing.other_slot_id) {
                let other_word = config.word_list.get(word_id);
                if let Some(&glyph) = other_word.glyphs.get(crossing.other_slot_cell) {
                    *glyph_counts.entry(glyph).or_insert(0) += 1;
                }
            }

            Some((cell_idx, domains.domain_size(crossing.other_slot_id), glyph_counts))
        })
        .collect();

    let mut options: Vec<WordId> = domains.get_domain(slot_id).collect();

    options.sort_by_cached_key(|&word_id| {
        let word = config.word_list.get(word_id);

        crossing_glyph_counts
            .iter()
            .map(|(cell_idx, domain_size, glyph_counts)| {
                let compatible = word
                    .glyphs
                    .get(*cell_idx)
                    .and_then(|glyph| glyph_counts.get(glyph))
                    .copied()
                    .unwrap_or(0);
                domain_size - compatible
            })
            .sum::<usize>()
    });

    options
}

/// The live state of one search.
struct Search<'a> {
    config: &'a GridConfig,
    domains: &'a DomainStore,
    deadline: Option<Instant>,
    abort_rx: Option<&'a Receiver<()>>,
    statistics: Statistics,
}

impl<'a> Search<'a> {
    fn check_interrupts(&self) -> Result<(), FillFailure> {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(FillFailure::Timeout);
            }
        }
        if let Some(abort_rx) = self.abort_rx {
            if abort_rx.try_recv().is_ok() {
                return Err(FillFailure::Abort);
            }
        }
        Ok(())
    }

    /// Extend `assignment` to a complete, consistent one if possible. On `Ok(true)` the assignment
    /// holds the fill; otherwise it is left as it was passed in.
    fn backtrack(&mut self, assignment: &mut Assignment) -> Result<bool, FillFailure> {
        if is_complete(self.config, assignment) {
            return Ok(true);
        }

        if self.statistics.states % INTERRUPT_FREQUENCY == 0 {
            self.check_interrupts()?;
        }
        self.statistics.states += 1;

        let Some(slot_id) = select_unassigned_variable(self.config, self.domains, assignment)
        else {
            return Ok(false);
        };

        for word_id in order_domain_values(self.config, self.domains, slot_id, assignment) {
            assignment.assign(slot_id, word_id);

            let result = if is_consistent(self.config, assignment) {
                self.backtrack(assignment)
            } else {
                Ok(false)
            };

            match result {
                Ok(true) => return Ok(true),
                Ok(false) => {
                    assignment.unassign(slot_id);
                }
                Err(failure) => {
                    assignment.unassign(slot_id);
                    return Err(failure);
                }
            }
        }

        self.statistics.backtracks += 1;
        trace!("Exhausted slot {} with {} slots assigned", slot_id, assignment.len());

        Ok(false)
    }
}

/// Search for a complete, consistent extension of `assignment` using the given domains. Returns
/// `None` if there isn't one, or if the assignment or domains weren't sized for this grid.
pub fn backtrack(
    config: &GridConfig,
    domains: &DomainStore,
    mut assignment: Assignment,
) -> Option<Assignment> {
    if assignment.slot_count() != config.slot_count() || domains.slot_count() != config.slot_count()
    {
        debug!(
            "Assignment for {} slots or domains for {} slots don't fit a grid with {} slots",
            assignment.slot_count(),
            domains.slot_count(),
            config.slot_count()
        );
        return None;
    }

    let mut search = Search {
        config,
        domains,
        deadline: None,
        abort_rx: None,
        statistics: Statistics::default(),
    };

    match search.backtrack(&mut assignment) {
        Ok(true) => Some(assignment),
        _ => None,
    }
}

/// Search for a valid fill for the given grid: enforce node consistency, then (unless disabled)
/// arc consistency, then backtrack.
pub fn find_fill(config: &GridConfig, options: &FillOptions) -> Result<FillSuccess, FillFailure> {
    let start = Instant::now();
    let deadline = options.timeout.map(|timeout| start + timeout);
    let mut statistics = Statistics::default();

    let mut domains = DomainStore::new(config);
    statistics.node_consistency_eliminations = enforce_node_consistency(config, &mut domains);

    if options.enforce_arc_consistency {
        match ac3(config, &mut domains, None) {
            Ok(success) => {
                statistics.arc_consistency_revisions = success.revisions;
                statistics.arc_consistency_eliminations = success.eliminations;
            }
            Err(ArcConsistencyFailure { emptied_slot_id }) => {
                info!("No fill: slot {} has no consistent options", emptied_slot_id);
                return Err(FillFailure::HardFailure);
            }
        }
    }
    statistics.initial_consistency_time = start.elapsed();
    debug!("Domains after initial consistency: {:?}", domains);

    let search_start = Instant::now();
    let mut search = Search {
        config,
        domains: &domains,
        deadline,
        abort_rx: options.abort_rx,
        statistics,
    };
    let mut assignment = Assignment::new(config.slot_count());
    let result = search.backtrack(&mut assignment);

    let mut statistics = search.statistics;
    statistics.search_time = search_start.elapsed();
    statistics.total_time = start.elapsed();

    match result {
        Ok(true) => {
            info!(
                "Found fill after {} states and {} backtracks in {:?}",
                statistics.states, statistics.backtracks, statistics.total_time
            );
            Ok(FillSuccess { statistics, assignment })
        }
        Ok(false) => {
            info!("No fill exists; searched {} states", statistics.states);
            Err(FillFailure::HardFailure)
        }
        Err(failure) => {
            info!("Fill stopped after {} states: {}", statistics.states, failure);
            Err(failure)
        }
    }
}
