//! Draw engine: pool construction, boosted sampling, anti-repeat retry.

use rand::rngs::OsRng;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::constants::{
    ANTI_REPEAT_MAX_ATTEMPTS, BOOST_PROBABILITY, BOOSTED_CHARACTER_ID, BOOSTED_NAME_FRAGMENT,
    DRAW_SIZE,
};
use crate::data::{Character, Rarity, Roster};

/// A completed draw result. Always exactly [`DRAW_SIZE`] characters, held
/// inline without additional allocations.
pub type DrawSet = SmallVec<[Character; DRAW_SIZE]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawMode {
    /// A configurable count of owned characters topped up with unowned ones.
    Mixed { owned_count: usize },
    /// All four picks from the owned sub-pool.
    OwnedOnly,
    /// All four picks from the unowned sub-pool.
    UnownedOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RarityFilter {
    #[default]
    All,
    Four,
    Five,
}

impl RarityFilter {
    const fn accepts(self, rarity: Option<Rarity>) -> bool {
        match self {
            Self::All => true,
            Self::Four => matches!(rarity, Some(Rarity::Four)),
            Self::Five => matches!(rarity, Some(Rarity::Five)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawConfig {
    pub mode: DrawMode,
    #[serde(default)]
    pub boost_enabled: bool,
    #[serde(default)]
    pub rarity_filter: RarityFilter,
}

impl DrawConfig {
    #[must_use]
    pub const fn new(mode: DrawMode) -> Self {
        Self {
            mode,
            boost_enabled: false,
            rarity_filter: RarityFilter::All,
        }
    }

    #[must_use]
    pub const fn with_boost(mut self) -> Self {
        self.boost_enabled = true;
        self
    }

    #[must_use]
    pub const fn with_rarity_filter(mut self, filter: RarityFilter) -> Self {
        self.rarity_filter = filter;
        self
    }
}

/// Errors raised while sampling a draw. No session state is mutated when
/// any of these surface.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DrawError {
    #[error("pool holds {available} candidates, cannot draw {requested}")]
    InsufficientPool { available: usize, requested: usize },
}

/// Uniform Fisher–Yates shuffle, last index down to 1.
fn shuffle<T>(items: &mut [T], rng: &mut impl Rng) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// `k` distinct uniform picks via a partial shuffle of the whole pool.
fn pick_distinct<'a>(pool: &[&'a Character], k: usize, rng: &mut impl Rng) -> Vec<&'a Character> {
    let mut shuffled = pool.to_vec();
    shuffle(&mut shuffled, rng);
    shuffled.truncate(k);
    shuffled
}

fn is_boosted(character: &Character) -> bool {
    character.id == BOOSTED_CHARACTER_ID || character.name.contains(BOOSTED_NAME_FRAGMENT)
}

/// Sample `k` distinct characters uniformly without replacement.
///
/// When boosting applies (flag set, boosted character in the pool, more than
/// one candidate), a uniform fraction below [`BOOST_PROBABILITY`] forces the
/// boosted character as the first pick, with the remainder drawn from the
/// rest of the pool.
///
/// # Errors
///
/// Returns [`DrawError::InsufficientPool`] when the pool holds fewer than
/// `k` candidates.
pub fn sample_k<'a>(
    pool: &[&'a Character],
    k: usize,
    boost_enabled: bool,
    rng: &mut impl Rng,
) -> Result<Vec<&'a Character>, DrawError> {
    if k == 0 {
        return Ok(Vec::new());
    }
    if pool.len() < k {
        return Err(DrawError::InsufficientPool {
            available: pool.len(),
            requested: k,
        });
    }

    if boost_enabled
        && pool.len() > 1
        && let Some(boosted) = pool.iter().copied().find(|c| is_boosted(c))
        && rng.gen_range(0.0..1.0) < BOOST_PROBABILITY
    {
        let rest: Vec<&Character> = pool
            .iter()
            .copied()
            .filter(|c| c.id != boosted.id)
            .collect();
        let mut picks = Vec::with_capacity(k);
        picks.push(boosted);
        picks.extend(pick_distinct(&rest, k - 1, rng));
        return Ok(picks);
    }

    Ok(pick_distinct(pool, k, rng))
}

/// The roster after rarity filtering. The filter only applies when the
/// dataset carries rarity data at all; otherwise it degrades to `All`.
#[must_use]
pub fn eligible_pool(roster: &Roster, filter: RarityFilter) -> Vec<&Character> {
    let filter = if roster.has_rarity() {
        filter
    } else {
        RarityFilter::All
    };
    roster.iter().filter(|c| filter.accepts(c.rarity())).collect()
}

fn draw_once<'a>(
    owned: &[&'a Character],
    unowned: &[&'a Character],
    config: &DrawConfig,
    rng: &mut impl Rng,
) -> Result<Vec<&'a Character>, DrawError> {
    match config.mode {
        DrawMode::OwnedOnly => sample_k(owned, DRAW_SIZE, config.boost_enabled, rng),
        DrawMode::UnownedOnly => sample_k(unowned, DRAW_SIZE, config.boost_enabled, rng),
        DrawMode::Mixed { owned_count } => {
            let owned_count = owned_count.min(DRAW_SIZE);
            let mut picks = sample_k(owned, owned_count, config.boost_enabled, rng)?;
            picks.extend(sample_k(
                unowned,
                DRAW_SIZE - owned_count,
                config.boost_enabled,
                rng,
            )?);
            // Reshuffle so owned/unowned picks are not positionally grouped.
            shuffle(&mut picks, rng);
            Ok(picks)
        }
    }
}

fn signature_of<'a>(picks: &[&'a Character]) -> Vec<&'a str> {
    let mut ids: Vec<&str> = picks.iter().map(|c| c.id.as_str()).collect();
    ids.sort_unstable();
    ids
}

/// Sorted id sequence of a result, the form stored as the previous draw.
#[must_use]
pub fn draw_signature(picks: &[Character]) -> Vec<String> {
    let mut ids: Vec<String> = picks.iter().map(|c| c.id.clone()).collect();
    ids.sort_unstable();
    ids
}

/// Perform a full draw: rarity filtering, owned/unowned partition, mode
/// dispatch, and the anti-repeat retry against the previous result.
///
/// When the eligible pool exceeds [`DRAW_SIZE`], a candidate matching the
/// previous result is redrawn up to [`ANTI_REPEAT_MAX_ATTEMPTS`] times; the
/// final attempt is accepted even when it still matches.
///
/// # Errors
///
/// Returns [`DrawError::InsufficientPool`] when a sub-pool cannot cover its
/// requested count.
pub fn draw_with_rng(
    roster: &Roster,
    owned_ids: &BTreeSet<String>,
    config: &DrawConfig,
    previous: Option<&[String]>,
    rng: &mut impl Rng,
) -> Result<DrawSet, DrawError> {
    let eligible = eligible_pool(roster, config.rarity_filter);
    let (owned, unowned): (Vec<&Character>, Vec<&Character>) = eligible
        .iter()
        .copied()
        .partition(|c| owned_ids.contains(c.id.as_str()));

    let mut picks = draw_once(&owned, &unowned, config, rng)?;

    if let Some(previous) = previous
        && eligible.len() > DRAW_SIZE
    {
        let mut previous: Vec<&str> = previous.iter().map(String::as_str).collect();
        previous.sort_unstable();

        let mut attempts = 1;
        while attempts < ANTI_REPEAT_MAX_ATTEMPTS && signature_of(&picks) == previous {
            picks = draw_once(&owned, &unowned, config, rng)?;
            attempts += 1;
        }
    }

    Ok(picks.into_iter().cloned().collect())
}

/// [`draw_with_rng`] on the operating-system entropy source. Every random
/// choice in a draw is cryptographically sourced.
///
/// # Errors
///
/// Returns [`DrawError::InsufficientPool`] when a sub-pool cannot cover its
/// requested count.
pub fn draw(
    roster: &Roster,
    owned_ids: &BTreeSet<String>,
    config: &DrawConfig,
    previous: Option<&[String]>,
) -> Result<DrawSet, DrawError> {
    draw_with_rng(roster, owned_ids, config, previous, &mut OsRng)
}

/// Deterministic ChaCha20 stream for tests and scripted QA runs.
#[must_use]
pub fn seeded_rng(seed: u64) -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Character;

    fn make_roster(n: usize) -> Roster {
        Roster::from_characters(
            (0..n)
                .map(|i| Character::new(format!("char-{i:02}"), format!("キャラ{i:02}")))
                .collect(),
        )
    }

    fn own(roster: &Roster, count: usize) -> BTreeSet<String> {
        roster.iter().take(count).map(|c| c.id.clone()).collect()
    }

    fn refs(roster: &Roster) -> Vec<&Character> {
        roster.iter().collect()
    }

    fn assert_distinct(picks: &[Character]) {
        let ids: BTreeSet<&str> = picks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), picks.len(), "duplicate id in draw result");
    }

    #[test]
    fn sample_k_returns_k_distinct_members_of_pool() {
        let roster = make_roster(12);
        let pool = refs(&roster);
        let mut rng = seeded_rng(11);

        for k in 1..=pool.len() {
            let picks = sample_k(&pool, k, false, &mut rng).unwrap();
            assert_eq!(picks.len(), k);
            let ids: BTreeSet<&str> = picks.iter().map(|c| c.id.as_str()).collect();
            assert_eq!(ids.len(), k);
            assert!(picks.iter().all(|p| roster.contains_id(&p.id)));
        }
    }

    #[test]
    fn sample_k_zero_is_empty() {
        let roster = make_roster(3);
        let pool = refs(&roster);
        let mut rng = seeded_rng(0);
        assert!(sample_k(&pool, 0, true, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn insufficient_pool_reports_both_counts() {
        let roster = make_roster(3);
        let pool = refs(&roster);
        let mut rng = seeded_rng(0);

        let err = sample_k(&pool, 4, false, &mut rng).unwrap_err();
        assert_eq!(
            err,
            DrawError::InsufficientPool {
                available: 3,
                requested: 4
            }
        );
        let message = err.to_string();
        assert!(message.contains('3') && message.contains('4'), "{message}");
    }

    #[test]
    fn boost_forces_boosted_first_at_expected_rate() {
        let mut characters: Vec<Character> = (0..9)
            .map(|i| Character::new(format!("char-{i:02}"), format!("キャラ{i:02}")))
            .collect();
        characters.push(Character::new("klee", "クレー"));
        let roster = Roster::from_characters(characters);
        let pool = refs(&roster);

        let mut rng = seeded_rng(0xB005);
        let trials = 4000;
        let mut boosted_first = 0;
        for _ in 0..trials {
            let picks = sample_k(&pool, 4, true, &mut rng).unwrap();
            if picks[0].id == "klee" {
                boosted_first += 1;
            }
        }
        // The uniform path lands klee first 1/10 of the time on top of the forced 0.65.
        let observed = f64::from(boosted_first) / f64::from(trials);
        let expected = BOOST_PROBABILITY + (1.0 - BOOST_PROBABILITY) * 0.1;
        assert!(
            (observed - expected).abs() < 0.03,
            "observed {observed}, expected {expected}"
        );
    }

    #[test]
    fn boost_skipped_for_singleton_pool() {
        let roster = Roster::from_characters(vec![Character::new("klee", "クレー")]);
        let pool = refs(&roster);
        let mut rng = seeded_rng(1);
        let picks = sample_k(&pool, 1, true, &mut rng).unwrap();
        assert_eq!(picks.len(), 1);
    }

    #[test]
    fn boost_matches_by_name_fragment() {
        let roster = Roster::from_characters(vec![
            Character::new("alt-klee", "クレー（夏）"),
            Character::new("amber", "アンバー"),
        ]);
        let pool = refs(&roster);
        let mut rng = seeded_rng(2);

        let mut seen_first = 0;
        for _ in 0..1000 {
            let picks = sample_k(&pool, 1, true, &mut rng).unwrap();
            if picks[0].id == "alt-klee" {
                seen_first += 1;
            }
        }
        // Forced 0.65 plus half of the remaining uniform mass.
        let observed = f64::from(seen_first) / 1000.0;
        assert!(observed > 0.75, "observed {observed}");
    }

    #[test]
    fn mixed_mode_composition_is_exact() {
        let roster = make_roster(10);
        let owned_ids = own(&roster, 5);
        let mut rng = seeded_rng(42);

        for owned_count in 0..=4_usize {
            let config = DrawConfig::new(DrawMode::Mixed { owned_count });
            let picks = draw_with_rng(&roster, &owned_ids, &config, None, &mut rng).unwrap();
            assert_eq!(picks.len(), 4);
            assert_distinct(&picks);
            let owned_picked = picks.iter().filter(|c| owned_ids.contains(&c.id)).count();
            assert_eq!(owned_picked, owned_count);
        }
    }

    #[test]
    fn owned_only_and_unowned_only_respect_partition() {
        let roster = make_roster(10);
        let owned_ids = own(&roster, 5);
        let mut rng = seeded_rng(7);

        let picks = draw_with_rng(
            &roster,
            &owned_ids,
            &DrawConfig::new(DrawMode::OwnedOnly),
            None,
            &mut rng,
        )
        .unwrap();
        assert!(picks.iter().all(|c| owned_ids.contains(&c.id)));

        let picks = draw_with_rng(
            &roster,
            &owned_ids,
            &DrawConfig::new(DrawMode::UnownedOnly),
            None,
            &mut rng,
        )
        .unwrap();
        assert!(picks.iter().all(|c| !owned_ids.contains(&c.id)));
    }

    #[test]
    fn owned_only_fails_when_owned_pool_short() {
        let roster = make_roster(10);
        let owned_ids = own(&roster, 2);
        let mut rng = seeded_rng(3);

        let err = draw_with_rng(
            &roster,
            &owned_ids,
            &DrawConfig::new(DrawMode::OwnedOnly),
            None,
            &mut rng,
        )
        .unwrap_err();
        assert_eq!(
            err,
            DrawError::InsufficientPool {
                available: 2,
                requested: 4
            }
        );
    }

    #[test]
    fn anti_repeat_redraws_when_pool_allows() {
        let roster = make_roster(6);
        let owned_ids = BTreeSet::new();
        let config = DrawConfig::new(DrawMode::UnownedOnly);
        let mut rng = seeded_rng(99);

        let first = draw_with_rng(&roster, &owned_ids, &config, None, &mut rng).unwrap();
        let previous = draw_signature(&first);
        for _ in 0..50 {
            let next =
                draw_with_rng(&roster, &owned_ids, &config, Some(&previous), &mut rng).unwrap();
            assert_ne!(draw_signature(&next), previous);
        }
    }

    #[test]
    fn anti_repeat_accepts_duplicate_when_pool_is_exactly_four() {
        let roster = make_roster(4);
        let owned_ids = BTreeSet::new();
        let config = DrawConfig::new(DrawMode::UnownedOnly);
        let mut rng = seeded_rng(5);

        let first = draw_with_rng(&roster, &owned_ids, &config, None, &mut rng).unwrap();
        let previous = draw_signature(&first);
        // Only one 4-subset exists; the duplicate must be tolerated.
        let next = draw_with_rng(&roster, &owned_ids, &config, Some(&previous), &mut rng).unwrap();
        assert_eq!(draw_signature(&next), previous);
    }

    #[test]
    fn rarity_filter_narrows_eligible_pool() {
        let roster = Roster::from_characters(vec![
            Character::new("a", "A").with_stars(5),
            Character::new("b", "B").with_stars(4),
            Character::new("c", "C").with_stars(4),
            Character::new("d", "D"),
        ]);

        let five = eligible_pool(&roster, RarityFilter::Five);
        assert_eq!(five.len(), 1);
        let four = eligible_pool(&roster, RarityFilter::Four);
        assert_eq!(four.len(), 2);
        let all = eligible_pool(&roster, RarityFilter::All);
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn rarity_filter_ignored_without_rarity_data() {
        let roster = make_roster(6);
        assert!(!roster.has_rarity());
        let pool = eligible_pool(&roster, RarityFilter::Five);
        assert_eq!(pool.len(), 6);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut items: Vec<u32> = (0..16).collect();
        let mut rng = seeded_rng(8);
        shuffle(&mut items, &mut rng);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..16).collect::<Vec<_>>());
    }
}
