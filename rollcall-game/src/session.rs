//! Explicit session state and the command handlers a front end calls.
//!
//! All mutable state lives here, passed explicitly; there are no ambient
//! globals and nothing in this module knows about rendering.

use rand::Rng;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::data::Roster;
use crate::draw::{DrawConfig, DrawError, DrawSet, draw_signature, draw_with_rng};

/// Ownership counts for the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSummary {
    pub total: usize,
    pub owned: usize,
    pub unowned: usize,
}

/// The two independently persisted values: the ownership id list and the
/// previous draw's sorted id list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub owned_ids: Vec<String>,
    #[serde(default)]
    pub last_draw: Option<Vec<String>>,
}

/// In-memory state for one interactive session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    roster: Roster,
    owned: BTreeSet<String>,
    last_draw: Option<Vec<String>>,
}

impl Session {
    #[must_use]
    pub const fn new(roster: Roster) -> Self {
        Self {
            roster,
            owned: BTreeSet::new(),
            last_draw: None,
        }
    }

    /// Rebuild a session from persisted state. Stored ids unknown to the
    /// roster are dropped rather than kept around as phantoms.
    #[must_use]
    pub fn restore(roster: Roster, snapshot: SessionSnapshot) -> Self {
        let owned = snapshot
            .owned_ids
            .into_iter()
            .filter(|id| roster.contains_id(id))
            .collect();
        Self {
            roster,
            owned,
            last_draw: snapshot.last_draw,
        }
    }

    #[must_use]
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub fn is_owned(&self, id: &str) -> bool {
        self.owned.contains(id)
    }

    #[must_use]
    pub fn last_draw(&self) -> Option<&[String]> {
        self.last_draw.as_deref()
    }

    /// Flip ownership for one character. Returns the new ownership status,
    /// or `None` for an id the roster does not know.
    pub fn toggle_owned(&mut self, id: &str) -> Option<bool> {
        if !self.roster.contains_id(id) {
            return None;
        }
        if self.owned.remove(id) {
            Some(false)
        } else {
            self.owned.insert(id.to_string());
            Some(true)
        }
    }

    /// Mark the whole roster as owned.
    pub fn select_all(&mut self) {
        self.owned = self.roster.iter().map(|c| c.id.clone()).collect();
    }

    /// Clear the ownership selection.
    pub fn clear_owned(&mut self) {
        self.owned.clear();
    }

    /// Forget both the selection and the previous draw.
    pub fn clear_history(&mut self) {
        self.owned.clear();
        self.last_draw = None;
    }

    #[must_use]
    pub fn summary(&self) -> RosterSummary {
        let total = self.roster.len();
        let owned = self.owned.len();
        RosterSummary {
            total,
            owned,
            unowned: total - owned,
        }
    }

    /// Run a draw against the current state. The previous-draw record is
    /// only updated once the draw fully succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`DrawError::InsufficientPool`] when a sub-pool cannot cover
    /// its requested count; state is untouched in that case.
    pub fn draw_with_rng(
        &mut self,
        config: &DrawConfig,
        rng: &mut impl Rng,
    ) -> Result<DrawSet, DrawError> {
        let picks = draw_with_rng(
            &self.roster,
            &self.owned,
            config,
            self.last_draw.as_deref(),
            rng,
        )?;
        self.last_draw = Some(draw_signature(&picks));
        Ok(picks)
    }

    /// [`Session::draw_with_rng`] on the operating-system entropy source.
    ///
    /// # Errors
    ///
    /// Returns [`DrawError::InsufficientPool`] when a sub-pool cannot cover
    /// its requested count.
    pub fn draw(&mut self, config: &DrawConfig) -> Result<DrawSet, DrawError> {
        self.draw_with_rng(config, &mut OsRng)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            owned_ids: self.owned.iter().cloned().collect(),
            last_draw: self.last_draw.clone(),
        }
    }
}
