//! Crossword generation as a constraint satisfaction problem. A grid's slots are the variables,
//! the word list is every slot's initial domain, and the constraints are slot length, agreement on
//! crossing cells, and never using a word twice. Filling a grid runs node consistency, then AC-3,
//! then backtracking search; see `find_fill`.

pub mod arc_consistency;
pub mod backtracking_search;
pub mod domains;
pub mod grid_config;
pub mod word_list;

pub use backtracking_search::{
    find_fill, Assignment, Choice, FillFailure, FillOptions, FillSuccess, Statistics,
};
pub use domains::DomainStore;
pub use grid_config::{
    generate_grid_config, generate_grid_config_from_template_string, letter_at, letter_grid,
    render_grid, Direction, GridConfig, GridEntry, PuzzleError,
};
pub use word_list::WordList;

/// The expected maximum length for a single slot.
pub const MAX_SLOT_LENGTH: usize = 21;

/// An identifier for a given slot, based on its index in the Grid's `slot_configs` field.
pub type SlotId = usize;

/// An identifier for a given word, based on its index in the `WordList`.
pub type WordId = usize;
