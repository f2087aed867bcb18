//! Rollcall Draw Engine
//!
//! Platform-agnostic core for the roster gacha simulator. This crate owns
//! the data model, the rarity/element inference, the weighted draw engine,
//! and the session command handlers, without UI or platform-specific
//! dependencies.

pub mod constants;
pub mod data;
pub mod draw;
pub mod session;

// Re-export commonly used types
pub use data::{Character, CharacterKind, Element, Rarity, Roster, RosterError};
pub use draw::{
    DrawConfig, DrawError, DrawMode, DrawSet, RarityFilter, draw, draw_signature, draw_with_rng,
    eligible_pool, sample_k, seeded_rng,
};
pub use session::{RosterSummary, Session, SessionSnapshot};

/// Trait for abstracting roster loading operations.
/// Platform-specific implementations should provide this.
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the character roster from the platform-specific source.
    ///
    /// # Errors
    ///
    /// Returns an error if the roster cannot be loaded or parsed.
    fn load_roster(&self) -> Result<Roster, Self::Error>;
}

/// Trait for abstracting the two persisted key-value entries.
/// Platform-specific implementations should provide this.
///
/// Corrupt stored payloads must degrade to `Ok(None)` rather than fail, so
/// a damaged store never blocks startup.
pub trait StateStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist the ownership id list.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be written.
    fn save_owned(&self, ids: &[String]) -> Result<(), Self::Error>;

    /// Read the ownership id list, `None` when absent or undecodable.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be reached.
    fn load_owned(&self) -> Result<Option<Vec<String>>, Self::Error>;

    /// Persist the previous draw's sorted id list.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be written.
    fn save_last_draw(&self, ids: &[String]) -> Result<(), Self::Error>;

    /// Read the previous draw's id list, `None` when absent or undecodable.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be reached.
    fn load_last_draw(&self) -> Result<Option<Vec<String>>, Self::Error>;

    /// Remove both persisted entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the entries cannot be removed.
    fn clear(&self) -> Result<(), Self::Error>;
}

/// Facade wiring a loader and a storage backend to the session layer.
pub struct GachaEngine<L, S>
where
    L: DataLoader,
    S: StateStorage,
{
    loader: L,
    storage: S,
}

impl<L, S> GachaEngine<L, S>
where
    L: DataLoader,
    S: StateStorage,
{
    pub const fn new(loader: L, storage: S) -> Self {
        Self { loader, storage }
    }

    /// Load the roster and hydrate persisted state into a fresh session.
    /// The roster load gates everything; storage misses fall back to an
    /// empty selection and no draw history.
    ///
    /// # Errors
    ///
    /// Returns an error if the roster cannot be loaded or the store cannot
    /// be reached.
    pub fn start_session(&self) -> Result<Session, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        let roster = self.loader.load_roster().map_err(Into::into)?;
        let owned_ids = self
            .storage
            .load_owned()
            .map_err(Into::into)?
            .unwrap_or_default();
        let last_draw = self.storage.load_last_draw().map_err(Into::into)?;
        Ok(Session::restore(
            roster,
            SessionSnapshot {
                owned_ids,
                last_draw,
            },
        ))
    }

    /// Write both persisted entries from the session's current state.
    ///
    /// # Errors
    ///
    /// Returns an error if either entry cannot be written.
    pub fn persist_session(&self, session: &Session) -> Result<(), S::Error> {
        let snapshot = session.snapshot();
        self.storage.save_owned(&snapshot.owned_ids)?;
        if let Some(last_draw) = &snapshot.last_draw {
            self.storage.save_last_draw(last_draw)?;
        }
        Ok(())
    }

    /// Run a draw and persist the new previous-draw record only after the
    /// draw fully succeeded.
    ///
    /// # Errors
    ///
    /// Returns the draw failure, or a storage failure after a successful
    /// draw.
    pub fn draw(
        &self,
        session: &mut Session,
        config: &DrawConfig,
    ) -> Result<DrawSet, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let picks = session.draw(config)?;
        if let Some(last_draw) = session.last_draw() {
            self.storage.save_last_draw(last_draw).map_err(Into::into)?;
        }
        Ok(picks)
    }

    /// Remove both persisted entries and reset the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the entries cannot be removed.
    pub fn clear_history(&self, session: &mut Session) -> Result<(), S::Error> {
        session.clear_history();
        self.storage.clear()
    }
}
