//! Region card catalog: the builtin Galthea table plus external loading.
//!
//! The builtin table ships as embedded JSON so the same schema serves
//! both the compiled-in default and user-supplied catalog files. Every
//! load runs a normalization pass: ids default to a slug of the title,
//! descriptions are trimmed, and duplicate ids are rejected.

use std::collections::HashSet;
use std::fs;

use serde::Deserialize;
use thiserror::Error;

use crate::cards::{Deck, RegionCard};

pub const BUILTIN_CATALOG: &str = include_str!("data/region_cards.json");

#[derive(Debug, Deserialize)]
struct CatalogData {
    cards: Vec<RegionCard>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("card at position {0} has neither an id nor a title")]
    MissingId(usize),
    #[error("duplicate card id `{0}`")]
    DuplicateId(String),
}

/// Build a deck from the compiled-in region table.
pub fn builtin_deck() -> Result<Deck, CatalogError> {
    parse_catalog(BUILTIN_CATALOG)
}

/// Build a deck from an external catalog file with the builtin schema.
pub fn load_catalog(path: &str) -> Result<Deck, CatalogError> {
    let text = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_string(),
        source,
    })?;
    parse_catalog(&text)
}

pub fn parse_catalog(json: &str) -> Result<Deck, CatalogError> {
    let data: CatalogData = serde_json::from_str(json)?;

    let mut seen = HashSet::new();
    let mut cards = Vec::with_capacity(data.cards.len());
    for (position, card) in data.cards.into_iter().enumerate() {
        let card = normalize(card, position)?;
        if !seen.insert(card.id.clone()) {
            return Err(CatalogError::DuplicateId(card.id));
        }
        cards.push(card);
    }

    let mut deck = Deck::new();
    deck.add(cards);
    Ok(deck)
}

/// Explicit id-assignment pass: no hidden global counters. A card with
/// no id takes a slug of its title; a card with neither is an error.
fn normalize(mut card: RegionCard, position: usize) -> Result<RegionCard, CatalogError> {
    if card.id.is_empty() {
        if card.title.is_empty() || card.title == "Untitled" {
            return Err(CatalogError::MissingId(position));
        }
        card.id = slug(&card.title);
    }
    card.description = card.description.trim().to_string();
    Ok(card)
}

fn slug(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}
