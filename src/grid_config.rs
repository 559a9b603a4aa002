use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;

use smallvec::SmallVec;
use thiserror::Error;

use crate::backtracking_search::Assignment;
use crate::word_list::WordList;
use crate::{SlotId, MAX_SLOT_LENGTH};

/// Zero-indexed (row, column) coords for a cell in the grid, where row 0 is the top row.
pub type GridCoord = (usize, usize);

/// Direction that a slot is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Across,
    Down,
}

/// Problems with the puzzle input itself. An input that parses fine but can't be filled is not an
/// error here; the solver reports that as `FillFailure::HardFailure`.
#[derive(Debug, Error)]
pub enum PuzzleError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("structure template has no cells")]
    EmptyTemplate,

    #[error("unexpected character {glyph:?} at row {row}, column {col}")]
    InvalidCell { row: usize, col: usize, glyph: char },

    #[error("entry at {loc:?} has zero length")]
    EmptyEntry { loc: GridCoord },

    #[error("duplicate entry at {loc:?}")]
    DuplicateEntry { loc: GridCoord },

    #[error("more than two entries cross at {loc:?}")]
    TooManyCrossings { loc: GridCoord },

    #[error("entries {first} and {second} share more than one cell")]
    MultipleOverlaps { first: SlotId, second: SlotId },
}

/// A struct representing a crossing between one slot and another, referencing the other slot's id
/// and the location of the intersection within the other slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub other_slot_id: SlotId,
    pub other_slot_cell: usize,
}

/// A struct representing the aspects of a slot in the grid that are static during filling. A
/// slot's identity is its geometry: two slots are equal iff they start at the same cell, face the
/// same direction, and have the same length.
pub struct SlotConfig {
    pub id: SlotId,
    pub start_cell: GridCoord,
    pub direction: Direction,
    pub length: usize,
    pub crossings: SmallVec<[Option<Crossing>; MAX_SLOT_LENGTH]>,
}

impl Debug for SlotConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotConfig")
            .field("id", &self.id)
            .field("start_cell", &self.start_cell)
            .field("direction", &self.direction)
            .field("length", &self.length)
            .field("crossings", &self.crossings)
            .finish()
    }
}

impl PartialEq for SlotConfig {
    fn eq(&self, other: &Self) -> bool {
        self.start_cell == other.start_cell
            && self.direction == other.direction
            && self.length == other.length
    }
}

impl Eq for SlotConfig {}

impl Hash for SlotConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.start_cell.hash(state);
        self.direction.hash(state);
        self.length.hash(state);
    }
}

impl SlotConfig {
    /// The coords of the `cell_idx`th cell of this slot.
    pub fn cell_coord(&self, cell_idx: usize) -> GridCoord {
        match self.direction {
            Direction::Across => (self.start_cell.0, self.start_cell.1 + cell_idx),
            Direction::Down => (self.start_cell.0 + cell_idx, self.start_cell.1),
        }
    }

    pub fn cell_coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.length).map(|cell_idx| self.cell_coord(cell_idx))
    }

    /// If this slot covers the given cell, return the cell's index within the slot.
    pub fn cell_index(&self, loc: GridCoord) -> Option<usize> {
        let (fixed, start, offset) = match self.direction {
            Direction::Across => (loc.0 == self.start_cell.0, self.start_cell.1, loc.1),
            Direction::Down => (loc.1 == self.start_cell.1, self.start_cell.0, loc.0),
        };

        if fixed && offset >= start && offset - start < self.length {
            Some(offset - start)
        } else {
            None
        }
    }

    /// Ids of the slots crossing this one, in cell order.
    pub fn neighbors(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.crossings.iter().flatten().map(|crossing| crossing.other_slot_id)
    }

    pub fn neighbor_count(&self) -> usize {
        self.crossings.iter().flatten().count()
    }
}

/// An across or down entry in the input to `generate_grid_config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridEntry {
    pub loc: GridCoord,
    pub len: usize,
    pub dir: Direction,
}

impl GridEntry {
    /// Generate the coords for each cell of this entry.
    fn cell_coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.len).map(move |cell_idx| match self.dir {
            Direction::Across => (self.loc.0, self.loc.1 + cell_idx),
            Direction::Down => (self.loc.0 + cell_idx, self.loc.1),
        })
    }
}

/// A struct representing the aspects of a grid that are static during filling.
pub struct GridConfig {
    pub width: usize,
    pub height: usize,

    /// Indexed by row and then column; `true` for open cells.
    pub structure: Vec<Vec<bool>>,

    pub slot_configs: Vec<SlotConfig>,

    /// The overlap relation, keyed by ordered slot pair. Both orientations of every crossing are
    /// stored, so `(x, y) -> (i, j)` is present iff `(y, x) -> (j, i)` is.
    pub overlaps: HashMap<(SlotId, SlotId), (usize, usize)>,

    pub word_list: WordList,
}

impl Debug for GridConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridConfig")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("slot_configs", &self.slot_configs)
            .field("word_list", &self.word_list)
            .finish()
    }
}

impl GridConfig {
    pub fn slot_count(&self) -> usize {
        self.slot_configs.len()
    }

    /// If slots `x` and `y` cross, return `(i, j)` such that cell `i` of `x` is cell `j` of `y`.
    pub fn overlap(&self, x: SlotId, y: SlotId) -> Option<(usize, usize)> {
        self.overlaps.get(&(x, y)).copied()
    }

    pub fn neighbors(&self, slot_id: SlotId) -> impl Iterator<Item = SlotId> + '_ {
        self.slot_configs[slot_id].neighbors()
    }

    pub fn is_open(&self, loc: GridCoord) -> bool {
        self.structure
            .get(loc.0)
            .and_then(|row| row.get(loc.1))
            .copied()
            .unwrap_or(false)
    }

    /// Load a structure template and a dictionary from disk.
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(
        structure_path: P,
        words_path: Q,
    ) -> Result<GridConfig, PuzzleError> {
        let structure_path = structure_path.as_ref();
        let template = fs::read_to_string(structure_path).map_err(|source| PuzzleError::Io {
            path: structure_path.display().to_string(),
            source,
        })?;
        let word_list = WordList::from_dict_file(words_path)?;

        generate_grid_config_from_template_string(word_list, &template)
    }
}

/// Build the slots, crossings, and overlap relation for a set of entries laid over the given
/// structure.
fn build_grid_config(
    word_list: WordList,
    entries: &[GridEntry],
    structure: Vec<Vec<bool>>,
) -> Result<GridConfig, PuzzleError> {
    // (entry index, cell index within entry) for every entry touching each cell.
    let mut entries_by_loc: HashMap<GridCoord, SmallVec<[(usize, usize); 2]>> = HashMap::new();

    for (entry_idx, entry) in entries.iter().enumerate() {
        if entry.len == 0 {
            return Err(PuzzleError::EmptyEntry { loc: entry.loc });
        }
        if entries[..entry_idx].contains(entry) {
            return Err(PuzzleError::DuplicateEntry { loc: entry.loc });
        }

        for (cell_idx, loc) in entry.cell_coords().enumerate() {
            let cell_entries = entries_by_loc.entry(loc).or_default();
            if cell_entries.len() == 2 {
                return Err(PuzzleError::TooManyCrossings { loc });
            }
            cell_entries.push((entry_idx, cell_idx));
        }
    }

    let mut overlaps: HashMap<(SlotId, SlotId), (usize, usize)> = HashMap::new();
    let mut slot_configs: Vec<SlotConfig> = Vec::with_capacity(entries.len());

    for (entry_idx, entry) in entries.iter().enumerate() {
        let crossings: SmallVec<[Option<Crossing>; MAX_SLOT_LENGTH]> = entry
            .cell_coords()
            .map(|loc| {
                entries_by_loc[&loc]
                    .iter()
                    .find(|&&(other_entry_idx, _)| other_entry_idx != entry_idx)
                    .map(|&(other_slot_id, other_slot_cell)| Crossing {
                        other_slot_id,
                        other_slot_cell,
                    })
            })
            .collect();

        for (cell_idx, crossing) in crossings.iter().enumerate() {
            if let Some(crossing) = crossing {
                let previous = overlaps.insert(
                    (entry_idx, crossing.other_slot_id),
                    (cell_idx, crossing.other_slot_cell),
                );
                if previous.is_some() {
                    return Err(PuzzleError::MultipleOverlaps {
                        first: entry_idx,
                        second: crossing.other_slot_id,
                    });
                }
            }
        }

        slot_configs.push(SlotConfig {
            id: entry_idx,
            start_cell: entry.loc,
            direction: entry.dir,
            length: entry.len,
            crossings,
        });
    }

    Ok(GridConfig {
        width: structure.iter().map(|row| row.len()).max().unwrap_or(0),
        height: structure.len(),
        structure,
        slot_configs,
        overlaps,
        word_list,
    })
}

/// Generate a GridConfig representing a grid with specified entries. The grid's open cells are
/// exactly the cells covered by some entry.
pub fn generate_grid_config(
    word_list: WordList,
    entries: &[GridEntry],
) -> Result<GridConfig, PuzzleError> {
    let cells: Vec<GridCoord> = entries.iter().flat_map(|entry| entry.cell_coords()).collect();
    let height = cells.iter().map(|&(row, _)| row + 1).max().unwrap_or(0);
    let width = cells.iter().map(|&(_, col)| col + 1).max().unwrap_or(0);

    let mut structure = vec![vec![false; width]; height];
    for (row, col) in cells {
        structure[row][col] = true;
    }

    build_grid_config(word_list, entries, structure)
}

/// Find every maximal run of at least two open cells: across runs row by row, then down runs
/// column by column.
fn find_entries(structure: &[Vec<bool>]) -> Vec<GridEntry> {
    let height = structure.len();
    let width = structure.iter().map(|row| row.len()).max().unwrap_or(0);
    let is_open = |row: usize, col: usize| {
        structure.get(row).and_then(|cells| cells.get(col)).copied().unwrap_or(false)
    };

    let mut entries: Vec<GridEntry> = vec![];

    for (dir, line_count, line_length) in
        [(Direction::Across, height, width), (Direction::Down, width, height)]
    {
        for line in 0..line_count {
            let mut run_start: Option<usize> = None;

            for offset in 0..=line_length {
                let loc_at = |offset: usize| match dir {
                    Direction::Across => (line, offset),
                    Direction::Down => (offset, line),
                };
                let (row, col) = loc_at(offset);
                let open = offset < line_length && is_open(row, col);

                match (open, run_start) {
                    (true, None) => run_start = Some(offset),
                    (false, Some(start)) => {
                        if offset - start > 1 {
                            entries.push(GridEntry { loc: loc_at(start), len: offset - start, dir });
                        }
                        run_start = None;
                    }
                    _ => {}
                }
            }
        }
    }

    entries
}

/// Generate a grid config from a string template, with `#` representing blocks and `_` or `.`
/// representing open cells. Rows shorter than the longest one are padded with blocks.
pub fn generate_grid_config_from_template_string(
    word_list: WordList,
    template: &str,
) -> Result<GridConfig, PuzzleError> {
    let lines: Vec<&str> = template.lines().map(str::trim).collect();

    // Blank lines around the grid are ignored; blank lines inside it are rows of blocks.
    let (Some(first), Some(last)) = (
        lines.iter().position(|line| !line.is_empty()),
        lines.iter().rposition(|line| !line.is_empty()),
    ) else {
        return Err(PuzzleError::EmptyTemplate);
    };
    let template: Vec<Vec<char>> =
        lines[first..=last].iter().map(|line| line.chars().collect()).collect();

    let width = template.iter().map(|line| line.len()).max().unwrap_or(0);
    let mut structure = vec![vec![false; width]; template.len()];

    for (row, line) in template.iter().enumerate() {
        for (col, &glyph) in line.iter().enumerate() {
            structure[row][col] = match glyph {
                '#' => false,
                '_' | '.' => true,
                _ => return Err(PuzzleError::InvalidCell { row, col, glyph }),
            };
        }
    }

    let entries = find_entries(&structure);
    build_grid_config(word_list, &entries, structure)
}

/// The letter occupying the given cell under an assignment, if any assigned slot covers it.
pub fn letter_at(config: &GridConfig, assignment: &Assignment, loc: GridCoord) -> Option<char> {
    config.slot_configs.iter().find_map(|slot_config| {
        let cell_idx = slot_config.cell_index(loc)?;
        let word_id = assignment.get(slot_config.id)?;
        config.word_list.get(word_id).glyphs.get(cell_idx).copied()
    })
}

/// Return a 2D array, indexed by row and then column, of the letters placed by an assignment.
pub fn letter_grid(config: &GridConfig, assignment: &Assignment) -> Vec<Vec<Option<char>>> {
    (0..config.height)
        .map(|row| {
            (0..config.width)
                .map(|col| letter_at(config, assignment, (row, col)))
                .collect()
        })
        .collect()
}

/// Turn the given grid config and assignment into a rendered string, drawing blocks as `█` and
/// unfilled open cells as spaces.
pub fn render_grid(config: &GridConfig, assignment: &Assignment) -> String {
    let letters = letter_grid(config, assignment);

    letters
        .iter()
        .enumerate()
        .map(|(row, row_letters)| {
            row_letters
                .iter()
                .enumerate()
                .map(|(col, letter)| {
                    if config.is_open((row, col)) {
                        letter.unwrap_or(' ')
                    } else {
                        '█'
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use crate::backtracking_search::Assignment;
    use crate::grid_config::{
        generate_grid_config, generate_grid_config_from_template_string, letter_at, render_grid,
        Crossing, Direction::{Across, Down}, GridEntry, PuzzleError,
    };
    use crate::word_list::WordList;

    fn word_list() -> WordList {
        WordList::new(["CAT", "DOG", "CAR", "ACE", "TACO"])
    }

    /// #___#
    /// #_##_
    /// #_##_
    /// #_##_
    /// #____
    #[test]
    fn test_template_slots_and_crossings() {
        let grid_config = generate_grid_config_from_template_string(
            word_list(),
            "
            #___#
            #_##_
            #_##_
            #_##_
            #____
            ",
        )
        .unwrap();

        assert_eq!((grid_config.width, grid_config.height), (5, 5));

        let slots: Vec<_> = grid_config
            .slot_configs
            .iter()
            .map(|slot| (slot.start_cell, slot.direction, slot.length))
            .collect();
        assert_eq!(
            slots,
            vec![
                ((0, 1), Across, 3),
                ((4, 1), Across, 4),
                ((0, 1), Down, 5),
                ((1, 4), Down, 4),
            ]
        );

        assert_eq!(grid_config.overlap(0, 2), Some((0, 0)));
        assert_eq!(grid_config.overlap(1, 2), Some((0, 4)));
        assert_eq!(grid_config.overlap(1, 3), Some((3, 3)));
        assert_eq!(grid_config.overlap(0, 1), None);
        assert_eq!(grid_config.overlap(0, 3), None);
        assert_eq!(
            grid_config.slot_configs[3].crossings[3],
            Some(Crossing { other_slot_id: 1, other_slot_cell: 3 })
        );
        assert_eq!(grid_config.neighbors(2).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_overlap_relation_is_symmetric() {
        let grid_config = generate_grid_config_from_template_string(
            word_list(),
            "
            ....
            .#..
            ....
            ",
        )
        .unwrap();

        assert!(!grid_config.overlaps.is_empty());
        for (&(x, y), &(i, j)) in &grid_config.overlaps {
            assert_eq!(grid_config.overlap(y, x), Some((j, i)));
        }
    }

    #[test]
    fn test_short_rows_are_padded_with_blocks() {
        let grid_config = generate_grid_config_from_template_string(
            word_list(),
            "
            ___
            _
            _
            ",
        )
        .unwrap();

        assert_eq!((grid_config.width, grid_config.height), (3, 3));
        assert!(!grid_config.is_open((1, 2)));
        assert_eq!(grid_config.slot_count(), 2);
    }

    #[test]
    fn test_blank_inner_rows_are_blocks() {
        let grid_config = generate_grid_config_from_template_string(
            word_list(),
            "

            ___

            ___

            ",
        )
        .unwrap();

        assert_eq!((grid_config.width, grid_config.height), (3, 3));
        assert!(!grid_config.is_open((1, 0)));
        assert!(grid_config.is_open((2, 0)));

        let slots: Vec<_> = grid_config
            .slot_configs
            .iter()
            .map(|slot| (slot.start_cell, slot.direction, slot.length))
            .collect();
        assert_eq!(slots, vec![((0, 0), Across, 3), ((2, 0), Across, 3)]);
    }

    #[test]
    fn test_grid_config_stays_small() {
        // Configs are moved by value; slot storage has to live on the heap.
        assert!(std::mem::size_of::<crate::grid_config::GridConfig>() < 1024);
    }

    #[test]
    fn test_invalid_template_character() {
        let result = generate_grid_config_from_template_string(word_list(), "_x_");

        assert!(matches!(
            result,
            Err(PuzzleError::InvalidCell { row: 0, col: 1, glyph: 'x' })
        ));
    }

    #[test]
    fn test_empty_template() {
        let result = generate_grid_config_from_template_string(word_list(), "\n   \n");

        assert!(matches!(result, Err(PuzzleError::EmptyTemplate)));
    }

    #[test]
    fn test_conflicting_entries_are_rejected() {
        let triple = generate_grid_config(
            word_list(),
            &[
                GridEntry { loc: (0, 0), len: 3, dir: Across },
                GridEntry { loc: (0, 0), len: 3, dir: Down },
                GridEntry { loc: (0, 0), len: 2, dir: Across },
            ],
        );
        assert!(matches!(triple, Err(PuzzleError::TooManyCrossings { loc: (0, 0) })));

        let parallel = generate_grid_config(
            word_list(),
            &[
                GridEntry { loc: (0, 0), len: 3, dir: Across },
                GridEntry { loc: (0, 1), len: 3, dir: Across },
            ],
        );
        assert!(matches!(parallel, Err(PuzzleError::MultipleOverlaps { first: 0, second: 1 })));

        let duplicate = generate_grid_config(
            word_list(),
            &[
                GridEntry { loc: (0, 0), len: 3, dir: Across },
                GridEntry { loc: (0, 0), len: 3, dir: Across },
            ],
        );
        assert!(matches!(duplicate, Err(PuzzleError::DuplicateEntry { loc: (0, 0) })));
    }

    #[test]
    fn test_letter_at_and_render() {
        let grid_config = generate_grid_config(
            word_list(),
            &[
                GridEntry { loc: (0, 0), len: 3, dir: Across },
                GridEntry { loc: (0, 0), len: 3, dir: Down },
            ],
        )
        .unwrap();

        let mut assignment = Assignment::new(grid_config.slot_count());
        assignment.assign(0, grid_config.word_list.id_of("cat").unwrap());
        assignment.assign(1, grid_config.word_list.id_of("car").unwrap());

        assert_eq!(letter_at(&grid_config, &assignment, (0, 2)), Some('T'));
        assert_eq!(letter_at(&grid_config, &assignment, (2, 0)), Some('R'));
        assert_eq!(letter_at(&grid_config, &assignment, (1, 1)), None);
        assert_eq!(render_grid(&grid_config, &assignment), "CAT\nA██\nR██");

        assignment.unassign(1);
        assert_eq!(render_grid(&grid_config, &assignment), "CAT\n ██\n ██");
    }
}
