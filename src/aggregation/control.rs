//! Control identification.

use serde::{Deserialize, Serialize};

use crate::combination::Combination;
use crate::ids::ComboId;

/// Outcome of looking for the zero-uplift baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ControlIdentification {
    /// Exactly one combination has zero uplift.
    Found {
        /// Position in the input slice.
        index: usize,
        /// Its id.
        combo_id: ComboId,
    },
    /// No combination has zero uplift.
    Missing,
    /// Several combinations have zero uplift; none is trusted as the baseline.
    Ambiguous {
        /// Ids of the candidates.
        candidates: Vec<ComboId>,
    },
}

impl ControlIdentification {
    /// The control's id when one was found.
    #[must_use]
    pub const fn combo_id(&self) -> Option<&ComboId> {
        match self {
            Self::Found { combo_id, .. } => Some(combo_id),
            Self::Missing | Self::Ambiguous { .. } => None,
        }
    }

    /// The control combination itself, resolved against `combinations`.
    #[must_use]
    pub fn resolve<'a>(&self, combinations: &'a [Combination]) -> Option<&'a Combination> {
        match self {
            Self::Found { index, combo_id } => combinations
                .get(*index)
                .filter(|c| &c.combo_id == combo_id),
            Self::Missing | Self::Ambiguous { .. } => None,
        }
    }
}

/// Finds the combination whose uplift is exactly zero.
#[must_use]
pub fn identify_control(combinations: &[Combination]) -> ControlIdentification {
    let mut candidates = combinations
        .iter()
        .enumerate()
        .filter(|(_, c)| c.metrics.is_control());

    let Some((index, first)) = candidates.next() else {
        return ControlIdentification::Missing;
    };

    let rest: Vec<ComboId> = candidates.map(|(_, c)| c.combo_id.clone()).collect();
    if rest.is_empty() {
        return ControlIdentification::Found {
            index,
            combo_id: first.combo_id.clone(),
        };
    }

    let mut all = Vec::with_capacity(rest.len() + 1);
    all.push(first.combo_id.clone());
    all.extend(rest);
    ControlIdentification::Ambiguous { candidates: all }
}
