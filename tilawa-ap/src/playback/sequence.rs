//! Sequential advance rules

use crate::chapters::FINAL_CHAPTER;
use tilawa_common::events::PlaybackPosition;

/// What follows a verse that played to its end in sequential mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Load this verse next
    Next(PlaybackPosition),
    /// The final verse of the final chapter finished
    EndOfCorpus,
}

/// Next verse after `current`, given the verse count of its chapter
///
/// Moves to verse 1 of the following chapter after the last verse. Never
/// wraps from the final chapter back to the first.
pub fn next_position(current: PlaybackPosition, chapter_verses: u16) -> Advance {
    if current.verse < chapter_verses {
        return Advance::Next(PlaybackPosition::new(current.chapter, current.verse + 1));
    }
    if current.chapter < FINAL_CHAPTER {
        return Advance::Next(PlaybackPosition::new(current.chapter + 1, 1));
    }
    Advance::EndOfCorpus
}
