//! Detail view identifiers and sequential navigation bounds

use crate::catalogue::CreatureDetail;
use serde::Serialize;

/// Catalogue size assumed when the reference cache could not be built
pub const DEFAULT_CATALOGUE_SIZE: u32 = 151;

/// Parse a detail identifier; non-numeric or zero ids are rejected
pub fn parse_detail_id(input: &str) -> Option<u32> {
    input.trim().parse::<u32>().ok().filter(|id| *id > 0)
}

/// Position of the detail view inside the inclusive id range `[1, max_id]`
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct DetailNav {
    pub current: u32,
    pub max_id: u32,
}

impl DetailNav {
    pub fn new(current: u32, max_id: u32) -> Self {
        Self { current, max_id }
    }

    pub fn contains(&self, id: u32) -> bool {
        id >= 1 && id <= self.max_id
    }

    /// Target of `previous`, or `None` when it would leave the range
    pub fn previous(&self) -> Option<u32> {
        self.current
            .checked_sub(1)
            .filter(|id| self.contains(*id))
    }

    /// Target of `next`, or `None` when it would leave the range
    pub fn next(&self) -> Option<u32> {
        self.current
            .checked_add(1)
            .filter(|id| self.contains(*id))
    }
}

/// Presentation state of the detail view
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DetailState {
    Loaded {
        detail: CreatureDetail,
        nav: DetailNav,
    },
    NotFound {
        requested: String,
    },
}
