use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

use crate::constants::{DOLL_ID_PREFIX, TRAVELER_ID_PREFIX};

/// The seven-entry element vocabulary. Nothing outside this list is ever
/// rendered as an element badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Anemo,
    Geo,
    Electro,
    Dendro,
    Hydro,
    Pyro,
    Cryo,
}

impl Element {
    pub const ALL: [Self; 7] = [
        Self::Anemo,
        Self::Geo,
        Self::Electro,
        Self::Dendro,
        Self::Hydro,
        Self::Pyro,
        Self::Cryo,
    ];

    /// Parse one of the seven recognized tokens. Anything else is `None`,
    /// never a guessed default.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "anemo" => Some(Self::Anemo),
            "geo" => Some(Self::Geo),
            "electro" => Some(Self::Electro),
            "dendro" => Some(Self::Dendro),
            "hydro" => Some(Self::Hydro),
            "pyro" => Some(Self::Pyro),
            "cryo" => Some(Self::Cryo),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anemo => "anemo",
            Self::Geo => "geo",
            Self::Electro => "electro",
            Self::Dendro => "dendro",
            Self::Hydro => "hydro",
            Self::Pyro => "pyro",
            Self::Cryo => "cryo",
        }
    }

    /// Japanese single-glyph badge label.
    #[must_use]
    pub const fn badge(self) -> &'static str {
        match self {
            Self::Anemo => "風",
            Self::Geo => "岩",
            Self::Electro => "雷",
            Self::Dendro => "草",
            Self::Hydro => "水",
            Self::Pyro => "炎",
            Self::Cryo => "氷",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognized rarity tiers. Records carrying any other value render no badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rarity {
    Four,
    Five,
}

impl Rarity {
    #[must_use]
    pub const fn from_stars(stars: i64) -> Option<Self> {
        match stars {
            4 => Some(Self::Four),
            5 => Some(Self::Five),
            _ => None,
        }
    }

    #[must_use]
    pub const fn stars(self) -> u8 {
        match self {
            Self::Four => 4,
            Self::Five => 5,
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "★{}", self.stars())
    }
}

/// Id-namespace classification, computed once at roster load instead of
/// re-parsing the id at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterKind {
    #[default]
    Standard,
    Traveler {
        element: Option<Element>,
    },
    Doll {
        element: Option<Element>,
    },
}

impl CharacterKind {
    fn from_id(id: &str) -> Self {
        if let Some(rest) = id.strip_prefix(TRAVELER_ID_PREFIX) {
            return Self::Traveler {
                element: Element::from_token(first_segment(rest)),
            };
        }
        if let Some(rest) = id.strip_prefix(DOLL_ID_PREFIX) {
            return Self::Doll {
                element: Element::from_token(first_segment(rest)),
            };
        }
        Self::Standard
    }

    /// True for traveler/doll pseudo-characters, which are hard-coded ★5.
    #[must_use]
    pub const fn is_pseudo(self) -> bool {
        !matches!(self, Self::Standard)
    }
}

fn first_segment(rest: &str) -> &str {
    rest.split('-').next().unwrap_or("")
}

/// A single roster record, immutable once loaded.
///
/// Rarity arrives under several synonymous field names in the wild
/// (`rarity`, `stars`, `star`, `rank`), sometimes as a numeric string;
/// the raw values stay private and [`Character::rarity`] resolves them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub en: Option<String>,
    #[serde(default)]
    pub element: Option<String>,
    #[serde(default, deserialize_with = "de_stars")]
    rarity: Option<i64>,
    #[serde(default, deserialize_with = "de_stars")]
    stars: Option<i64>,
    #[serde(default, deserialize_with = "de_stars")]
    star: Option<i64>,
    #[serde(default, deserialize_with = "de_stars")]
    rank: Option<i64>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(skip)]
    kind: CharacterKind,
}

/// Accept a rarity value as a JSON integer or a numeric string. Anything
/// else resolves to `None` rather than failing the whole roster.
fn de_stars<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
        Other(serde_json::Value),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Int(value)) => Some(value),
        #[allow(clippy::cast_possible_truncation)]
        Some(Raw::Float(value)) if value.fract() == 0.0 => Some(value as i64),
        Some(Raw::Text(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

impl Character {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut character = Self {
            id: id.into(),
            name: name.into(),
            en: None,
            element: None,
            rarity: None,
            stars: None,
            star: None,
            rank: None,
            sort: None,
            kind: CharacterKind::Standard,
        };
        character.finalize();
        character
    }

    #[must_use]
    pub fn with_en(mut self, en: impl Into<String>) -> Self {
        self.en = Some(en.into());
        self
    }

    #[must_use]
    pub fn with_element(mut self, token: impl Into<String>) -> Self {
        self.element = Some(token.into());
        self
    }

    #[must_use]
    pub const fn with_stars(mut self, stars: i64) -> Self {
        self.rarity = Some(stars);
        self
    }

    #[must_use]
    pub fn with_sort(mut self, key: impl Into<String>) -> Self {
        self.sort = Some(key.into());
        self
    }

    /// Recompute the id-namespace tag. Called once per record at load.
    pub(crate) fn finalize(&mut self) {
        self.kind = CharacterKind::from_id(&self.id);
    }

    #[must_use]
    pub const fn kind(&self) -> CharacterKind {
        self.kind
    }

    /// Resolved rarity: pseudo-characters are hard-coded ★5; everyone else
    /// takes the first defined synonym field, accepted only at exactly 4 or 5.
    #[must_use]
    pub fn rarity(&self) -> Option<Rarity> {
        if self.kind.is_pseudo() {
            return Some(Rarity::Five);
        }
        let raw = self.rarity.or(self.stars).or(self.star).or(self.rank)?;
        Rarity::from_stars(raw)
    }

    /// Resolved element: pseudo-characters carry it in the id; standard
    /// characters only via an explicit, recognized `element` field.
    #[must_use]
    pub fn element_badge(&self) -> Option<Element> {
        match self.kind {
            CharacterKind::Traveler { element } | CharacterKind::Doll { element } => element,
            CharacterKind::Standard => self.element.as_deref().and_then(Element::from_token),
        }
    }

    /// Case-insensitive substring match over name, English name, and id.
    /// An empty query matches everything.
    #[must_use]
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&query)
            || self
                .en
                .as_deref()
                .is_some_and(|en| en.to_lowercase().contains(&query))
            || self.id.to_lowercase().contains(&query)
    }

    fn collation_key(&self) -> &str {
        self.sort.as_deref().unwrap_or(&self.id)
    }
}

/// Errors raised while loading roster data.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("roster payload is not a JSON array")]
    NotAnArray,
    #[error("roster JSON malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ordered character list, loaded once per session and sorted by the
/// dataset's collation key (the data ships kana keys, so byte order of the
/// key reproduces the Japanese collation of the source).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Roster(Vec<Character>);

impl Roster {
    #[must_use]
    pub const fn empty() -> Self {
        Self(vec![])
    }

    /// Load a roster from a JSON array payload.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NotAnArray`] for well-formed JSON that is not
    /// an array, and [`RosterError::Json`] for anything undecodable.
    pub fn from_json(json: &str) -> Result<Self, RosterError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.is_array() {
            return Err(RosterError::NotAnArray);
        }
        let characters: Vec<Character> = serde_json::from_value(value)?;
        Ok(Self::from_characters(characters))
    }

    /// Build a roster from pre-parsed records, tagging and sorting them.
    #[must_use]
    pub fn from_characters(mut characters: Vec<Character>) -> Self {
        for character in &mut characters {
            character.finalize();
        }
        // Records without a key collate by id instead.
        characters.sort_by(|a, b| a.collation_key().cmp(b.collation_key()));
        Self(characters)
    }

    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<&Character> {
        self.0.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn contains_id(&self, id: &str) -> bool {
        self.get_by_id(id).is_some()
    }

    /// Whether any record resolves to a recognized rarity. When this is
    /// false, rarity filtering is a no-op.
    #[must_use]
    pub fn has_rarity(&self) -> bool {
        self.0.iter().any(|c| c.rarity().is_some())
    }

    /// Records matching a search query, in roster order.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Character> {
        self.0.iter().filter(|c| c.matches_query(query)).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Character> {
        self.0.iter()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Roster {
    type Item = &'a Character;
    type IntoIter = std::slice::Iter<'a, Character>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_parses_records_and_sorts_by_collation_key() {
        let json = r#"[
            {"id": "zhongli", "name": "鍾離", "en": "Zhongli", "sort": "しょうり"},
            {"id": "amber", "name": "アンバー", "en": "Amber", "sort": "あんばー"},
            {"id": "klee", "name": "クレー", "en": "Klee", "sort": "くれー"}
        ]"#;

        let roster = Roster::from_json(json).unwrap();
        assert_eq!(roster.len(), 3);
        let ids: Vec<_> = roster.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["amber", "klee", "zhongli"]);
    }

    #[test]
    fn non_array_payload_is_rejected() {
        let err = Roster::from_json(r#"{"characters": []}"#).unwrap_err();
        assert!(matches!(err, RosterError::NotAnArray));
        assert!(Roster::from_json("not json at all").is_err());
    }

    #[test]
    fn traveler_id_fixes_rarity_and_element() {
        let json = r#"[{"id": "traveler-anemo", "name": "旅人", "rarity": 3, "element": "pyro"}]"#;
        let roster = Roster::from_json(json).unwrap();
        let traveler = roster.get_by_id("traveler-anemo").unwrap();

        assert_eq!(traveler.rarity(), Some(Rarity::Five));
        assert_eq!(traveler.element_badge(), Some(Element::Anemo));
        assert_eq!(traveler.element_badge().unwrap().badge(), "風");
        assert!(matches!(
            traveler.kind(),
            CharacterKind::Traveler {
                element: Some(Element::Anemo)
            }
        ));
    }

    #[test]
    fn doll_id_is_pseudo_with_embedded_element() {
        let doll = Character::new("doll-pyro", "ドール");
        assert_eq!(doll.rarity(), Some(Rarity::Five));
        assert_eq!(doll.element_badge(), Some(Element::Pyro));
        assert!(doll.kind().is_pseudo());
    }

    #[test]
    fn pseudo_with_unknown_token_renders_no_badge() {
        let c = Character::new("traveler-void", "旅人");
        assert_eq!(c.rarity(), Some(Rarity::Five));
        assert_eq!(c.element_badge(), None);
    }

    #[test]
    fn rarity_synonyms_resolve_in_priority_order() {
        let json = r#"[
            {"id": "a", "name": "A", "stars": 4},
            {"id": "b", "name": "B", "star": "5"},
            {"id": "c", "name": "C", "rank": 5},
            {"id": "d", "name": "D", "rarity": 3},
            {"id": "e", "name": "E"},
            {"id": "f", "name": "F", "rarity": 4, "stars": 5}
        ]"#;
        let roster = Roster::from_json(json).unwrap();

        assert_eq!(roster.get_by_id("a").unwrap().rarity(), Some(Rarity::Four));
        assert_eq!(roster.get_by_id("b").unwrap().rarity(), Some(Rarity::Five));
        assert_eq!(roster.get_by_id("c").unwrap().rarity(), Some(Rarity::Five));
        assert_eq!(roster.get_by_id("d").unwrap().rarity(), None);
        assert_eq!(roster.get_by_id("e").unwrap().rarity(), None);
        // First defined synonym wins even when a later one disagrees.
        assert_eq!(roster.get_by_id("f").unwrap().rarity(), Some(Rarity::Four));
    }

    #[test]
    fn standard_element_requires_recognized_token() {
        let hydro = Character::new("kokomi", "心海").with_element("hydro");
        assert_eq!(hydro.element_badge(), Some(Element::Hydro));
        assert_eq!(hydro.element_badge().unwrap().badge(), "水");

        let bogus = Character::new("someone", "誰か").with_element("plasma");
        assert_eq!(bogus.element_badge(), None);

        let missing = Character::new("nobody", "無");
        assert_eq!(missing.element_badge(), None);
    }

    #[test]
    fn has_rarity_reflects_dataset() {
        let plain = Roster::from_characters(vec![
            Character::new("a", "A"),
            Character::new("b", "B"),
        ]);
        assert!(!plain.has_rarity());

        let starred = Roster::from_characters(vec![
            Character::new("a", "A"),
            Character::new("b", "B").with_stars(5),
        ]);
        assert!(starred.has_rarity());

        // A traveler record alone makes the dataset rarity-aware.
        let traveler = Roster::from_characters(vec![Character::new("traveler-geo", "旅人")]);
        assert!(traveler.has_rarity());
    }

    #[test]
    fn search_matches_name_en_and_id() {
        let roster = Roster::from_characters(vec![
            Character::new("klee", "クレー").with_en("Klee"),
            Character::new("amber", "アンバー").with_en("Amber"),
        ]);

        assert_eq!(roster.search("KLE").len(), 1);
        assert_eq!(roster.search("クレー").len(), 1);
        assert_eq!(roster.search("amb").len(), 1);
        assert_eq!(roster.search("  ").len(), 2);
        assert_eq!(roster.search("nobody").len(), 0);
    }

    #[test]
    fn rarity_display_renders_star_badge() {
        assert_eq!(Rarity::Four.to_string(), "★4");
        assert_eq!(Rarity::Five.to_string(), "★5");
    }
}
