//! Centralized tuning constants for the draw engine.
//!
//! Keeping them together ensures that draw behavior can only be adjusted
//! via code changes reviewed in version control, rather than through
//! external JSON assets.

// Draw tuning ---------------------------------------------------------------
pub const DRAW_SIZE: usize = 4;
pub const BOOST_PROBABILITY: f64 = 0.65;
pub const ANTI_REPEAT_MAX_ATTEMPTS: u32 = 50;

// Boosted character matching ------------------------------------------------
pub const BOOSTED_CHARACTER_ID: &str = "klee";
pub const BOOSTED_NAME_FRAGMENT: &str = "クレー";

// Id namespaces for pseudo-characters ---------------------------------------
pub(crate) const TRAVELER_ID_PREFIX: &str = "traveler-";
pub(crate) const DOLL_ID_PREFIX: &str = "doll-";
