//! World orchestration: the action queue that unfolds the map.
//!
//! A world owns the RNG, the consumable deck, the raster map, and the
//! journal. Mutation happens through a FIFO action queue: playing a card
//! draws, generates, and places it, then enqueues its declared neighbors,
//! which is how the map grows outward from a start card. The drain loop
//! takes `&mut self`, so a second in-flight drain is unrepresentable and
//! side effects land in strict FIFO order.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assets;
use crate::cards::{CardAction, CardSelector, Deck};
use crate::catalog::{self, CatalogError};
use crate::generator::generate_instance;
use crate::journal::{Journal, JournalEntry};
use crate::rng::Rng;
use crate::worldmap::WorldMap;

/// Placement overrides carried by a `play_card` action. Absent fields
/// fall back to seeded randomness (angle) or the map origin (offsets).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlayParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_y: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
}

/// A unit of deferred world mutation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    PlayCard {
        selector: CardSelector,
        #[serde(default)]
        params: PlayParams,
    },
    SetPosition {
        selector: String,
    },
}

impl From<&CardAction> for Action {
    fn from(action: &CardAction) -> Self {
        match action {
            CardAction::SetPosition { selector } => Action::SetPosition {
                selector: selector.clone(),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum WorldError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub struct World {
    rng: Rng,
    deck: Deck,
    pub map: WorldMap,
    pub journal: Journal,
    actions: VecDeque<Action>,
    player_pos: Option<(i32, i32)>,
}

impl World {
    /// Build a world over the builtin card catalog.
    pub fn new(seed: u64) -> Result<Self, CatalogError> {
        Ok(Self::with_deck(seed, catalog::builtin_deck()?))
    }

    pub fn with_deck(seed: u64, deck: Deck) -> Self {
        Self::with_map(seed, deck, WorldMap::new(1024, 1024))
    }

    pub fn with_map(seed: u64, deck: Deck, map: WorldMap) -> Self {
        let mut journal = Journal::new();
        journal.push(JournalEntry::Markdown {
            content: "**Welcome to the world of Galthea!**\n\n\
                This is an enormous world plagued by the mysterious force known as\n\
                the Maelstrom that has been ripping apart the fabric of reality.\n\n\
                The first step is to play a start card."
                .to_string(),
        });

        Self {
            rng: Rng::new(seed),
            deck,
            map,
            journal,
            actions: VecDeque::new(),
            player_pos: None,
        }
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn player_pos(&self) -> Option<(i32, i32)> {
        self.player_pos
    }

    /// Split an RNG off the world's stream, e.g. for minimap rendering.
    pub fn fork_rng(&mut self) -> Rng {
        self.rng.fork()
    }

    /// Append an action to the queue. Safe to call at any time,
    /// including from inside a running drain via card effects.
    pub fn enqueue(&mut self, action: Action) {
        self.actions.push_back(action);
    }

    /// Drain the queue in FIFO order until it is empty. Actions may
    /// enqueue further actions; those run after everything already
    /// queued. A selector that matches nothing is logged and dropped,
    /// and the drain continues.
    pub fn run_actions(&mut self) -> Result<(), WorldError> {
        while let Some(action) = self.actions.pop_front() {
            match action {
                Action::PlayCard { selector, params } => self.play_card(&selector, &params)?,
                Action::SetPosition { selector } => self.set_position(&selector),
            }
        }
        Ok(())
    }

    fn play_card(&mut self, selector: &CardSelector, params: &PlayParams) -> Result<(), WorldError> {
        let card = match self.deck.draw(&mut self.rng, selector) {
            Ok(card) => card,
            Err(err) => {
                // Caller contract violation; surface it and keep the
                // queue draining.
                log::error!("play_card: {err}");
                return Ok(());
            }
        };

        let seed = self.rng.seed8();
        let source = assets::load_card_bitmap(&card)?;
        let instance = generate_instance(seed, &card, source);

        let angle = params.angle.unwrap_or_else(|| self.rng.range(0.0, 360.0))
            + self.rng.range(-20.0, 20.0);
        let cx = params.offset_x.unwrap_or(0);
        let cy = params.offset_y.unwrap_or(0);

        let placed = self.map.place(&instance, cx, cy, angle);
        log::info!(
            "placed `{}` (seed {seed}) at ({}, {})",
            card.id,
            placed.0,
            placed.1
        );

        let minimap_png = {
            let mut rng = self.rng.fork();
            self.map.minimap_png(&mut rng)?
        };
        self.journal.push(JournalEntry::DrawRegion {
            card: card.clone(),
            instance,
            minimap_png,
        });

        for effect in &card.on_play {
            self.enqueue(Action::from(effect));
        }

        for hint in &card.neighbors {
            if !self.deck.contains(&hint.id) {
                continue;
            }
            self.enqueue(Action::PlayCard {
                selector: CardSelector::id(&hint.id),
                params: PlayParams {
                    offset_x: Some(placed.0 + hint.offset_x),
                    offset_y: Some(placed.1 - hint.offset_y),
                    angle: Some(hint.angle),
                },
            });
        }

        Ok(())
    }

    fn set_position(&mut self, selector: &str) {
        let cells = self.map.region_cells(selector);
        if cells.is_empty() {
            log::warn!("set_position: no placed region matches `{selector}`");
            return;
        }

        let &(x, y) = self.rng.select(&cells);
        let pos = (
            x as i32 - self.map.width as i32 / 2,
            y as i32 - self.map.height as i32 / 2,
        );
        self.player_pos = Some(pos);

        let title = self
            .map
            .instance(selector)
            .map(|r| r.title.clone())
            .unwrap_or_else(|| selector.to_string());
        self.journal.push(JournalEntry::Markdown {
            content: format!("You make camp in **{title}** at ({}, {}).", pos.0, pos.1),
        });
    }
}
