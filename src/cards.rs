//! Region card data model and the consumable deck.
//!
//! Cards are immutable templates: pure data, serializable end to end.
//! On-play effects are tagged variants interpreted by the world's action
//! dispatcher rather than embedded callbacks, so a catalog can live in a
//! JSON file and round-trip losslessly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::Color;
use crate::rng::Rng;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Region,
}

/// Adjacency placement hint: when this card is played, its neighbors are
/// enqueued with these angle/offset suggestions relative to the placed
/// position.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NeighborHint {
    pub id: String,
    pub angle: f64,
    pub offset_x: i32,
    pub offset_y: i32,
}

/// Effect descriptor enqueued when a card is played.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardAction {
    SetPosition { selector: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegionCard {
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_kind")]
    pub kind: CardKind,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Draw weight: larger is more common. 1-1000 in the builtin table.
    #[serde(default = "default_rarity")]
    pub rarity: u64,
    #[serde(default = "default_color")]
    pub color: Color,
    /// Nominal pixel footprint of the rendered region.
    #[serde(default = "default_size")]
    pub size: u32,
    /// Source bitmap reference; an empty or missing path falls back to a
    /// synthesized silhouette.
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub neighbors: Vec<NeighborHint>,
    #[serde(default)]
    pub on_play: Vec<CardAction>,
}

fn default_kind() -> CardKind {
    CardKind::Region
}

fn default_title() -> String {
    "Untitled".to_string()
}

fn default_rarity() -> u64 {
    1000
}

fn default_color() -> Color {
    Color::new(0xff, 0x00, 0xff)
}

fn default_size() -> u32 {
    100
}

impl RegionCard {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Filter over the undrawn pool. All predicates that are present must
/// match.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CardSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<CardKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl CardSelector {
    pub fn id(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Self::default()
        }
    }

    pub fn tag(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            ..Self::default()
        }
    }

    fn matches(&self, card: &RegionCard) -> bool {
        if let Some(id) = &self.id {
            if &card.id != id {
                return false;
            }
        }
        if let Some(kind) = &self.kind {
            if &card.kind != kind {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !card.has_tag(tag) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Error)]
pub enum DeckError {
    /// The caller asked for a selector no remaining card satisfies.
    #[error("no undrawn cards match selector {0:?}")]
    NoCandidates(CardSelector),
}

/// The pool of undrawn cards. Drawing is destructive: a drawn card is
/// removed and never returned to the pool.
#[derive(Debug, Default)]
pub struct Deck {
    cards: Vec<RegionCard>,
}

impl Deck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, cards: impl IntoIterator<Item = RegionCard>) {
        self.cards.extend(cards);
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cards.iter().any(|c| c.id == id)
    }

    pub fn cards(&self) -> &[RegionCard] {
        &self.cards
    }

    /// Weighted draw without replacement from the filtered pool.
    pub fn draw(
        &mut self,
        rng: &mut Rng,
        selector: &CardSelector,
    ) -> Result<RegionCard, DeckError> {
        let candidates: Vec<usize> = self
            .cards
            .iter()
            .enumerate()
            .filter(|(_, card)| selector.matches(card))
            .map(|(i, _)| i)
            .collect();

        if candidates.is_empty() {
            return Err(DeckError::NoCandidates(selector.clone()));
        }

        let weighted: Vec<(u64, usize)> = candidates
            .into_iter()
            .map(|i| (self.cards[i].rarity, i))
            .collect();
        let chosen = *rng.select_weighted(&weighted);
        Ok(self.cards.remove(chosen))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: &str, rarity: u64, tags: &[&str]) -> RegionCard {
        RegionCard {
            id: id.to_string(),
            kind: CardKind::Region,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            title: id.to_string(),
            description: String::new(),
            rarity,
            color: Color::new(0x20, 0x40, 0x60),
            size: 64,
            image: String::new(),
            neighbors: Vec::new(),
            on_play: Vec::new(),
        }
    }

    #[test]
    fn test_draw_consumes_card() {
        let mut deck = Deck::new();
        deck.add([card("haven", 1000, &["start_card"]), card("redrock", 500, &[])]);
        let mut rng = Rng::new(1);

        let drawn = deck.draw(&mut rng, &CardSelector::id("haven")).unwrap();
        assert_eq!(drawn.id, "haven");
        assert_eq!(deck.len(), 1);

        // A consumed card can never be drawn again.
        let err = deck.draw(&mut rng, &CardSelector::id("haven"));
        assert!(matches!(err, Err(DeckError::NoCandidates(_))));
    }

    #[test]
    fn test_draw_empty_filtered_pool_fails() {
        let mut deck = Deck::new();
        deck.add([card("haven", 1000, &[])]);
        let mut rng = Rng::new(1);
        let err = deck.draw(&mut rng, &CardSelector::tag("start_card"));
        assert!(matches!(err, Err(DeckError::NoCandidates(_))));
    }

    #[test]
    fn test_selector_predicates_all_must_match() {
        let mut deck = Deck::new();
        deck.add([
            card("haven", 1000, &["start_card"]),
            card("redrock", 500, &["start_card"]),
        ]);
        let mut rng = Rng::new(9);

        let selector = CardSelector {
            id: Some("redrock".to_string()),
            kind: Some(CardKind::Region),
            tag: Some("start_card".to_string()),
        };
        let drawn = deck.draw(&mut rng, &selector).unwrap();
        assert_eq!(drawn.id, "redrock");
    }

    #[test]
    fn test_draw_respects_weights() {
        // Heavily weighted card should win most draws from a fresh deck.
        let mut wins = 0;
        for seed in 0..200 {
            let mut deck = Deck::new();
            deck.add([card("common", 900, &[]), card("rare", 100, &[])]);
            let mut rng = Rng::new(seed);
            if deck.draw(&mut rng, &CardSelector::default()).unwrap().id == "common" {
                wins += 1;
            }
        }
        assert!(wins > 150, "expected mostly common draws, got {wins}/200");
    }

    #[test]
    fn test_card_action_round_trips_as_data() {
        let action = CardAction::SetPosition {
            selector: "haven".to_string(),
        };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"type":"set_position","selector":"haven"}"#);
        let back: CardAction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, action);
    }
}
