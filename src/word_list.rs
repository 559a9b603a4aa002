use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::fs;
use std::path::Path;

use smallvec::SmallVec;

use crate::grid_config::PuzzleError;
use crate::{WordId, MAX_SLOT_LENGTH};

/// A struct representing a word that can be chosen for a given slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub string: String,
    pub glyphs: SmallVec<[char; MAX_SLOT_LENGTH]>,
}

impl Word {
    fn new(string: String) -> Word {
        let glyphs = string.chars().collect();
        Word { string, glyphs }
    }

    /// The length of the word in glyphs, which is what slot lengths are measured in.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

/// The candidate words for a puzzle. Entries are trimmed, upper-cased, and deduplicated; a word's
/// `WordId` is its position in the list, so iterating ids in ascending order reproduces the order
/// the words were first seen in.
#[derive(Clone, Default)]
pub struct WordList {
    pub words: Vec<Word>,
    ids_by_string: HashMap<String, WordId>,
}

impl Debug for WordList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordList")
            .field("words", &format!("({} entries)", self.words.len()))
            .finish()
    }
}

impl WordList {
    pub fn new<I, S>(words: I) -> WordList
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut word_list = WordList::default();

        for raw_word in words {
            let normalized = raw_word.as_ref().trim().to_uppercase();
            if normalized.is_empty() || word_list.ids_by_string.contains_key(&normalized) {
                continue;
            }

            word_list.ids_by_string.insert(normalized.clone(), word_list.words.len());
            word_list.words.push(Word::new(normalized));
        }

        word_list
    }

    /// Parse a dictionary with one word per line.
    pub fn from_dict_str(contents: &str) -> WordList {
        WordList::new(contents.lines())
    }

    pub fn from_dict_file<P: AsRef<Path>>(path: P) -> Result<WordList, PuzzleError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| PuzzleError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Ok(WordList::from_dict_str(&contents))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, word_id: WordId) -> &Word {
        &self.words[word_id]
    }

    /// Look up the id of a word, applying the same normalization as the constructor.
    pub fn id_of(&self, word: &str) -> Option<WordId> {
        self.ids_by_string.get(&word.trim().to_uppercase()).copied()
    }
}
