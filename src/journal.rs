//! Append-only world journal.
//!
//! The journal is the player-visible history: narrative markdown entries
//! and region-draw snapshots (the card, its generated instance, and a
//! minimap rendered at that moment). Entries are never edited or
//! removed; the presentation layer only ever reads forward.

use std::fs::File;
use std::io::{self, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Local;
use serde::Serialize;

use crate::cards::RegionCard;
use crate::color::Color;
use crate::generator::RegionInstance;
use crate::worldmap::encode_png;

#[derive(Clone, Debug)]
pub enum JournalEntry {
    Markdown {
        content: String,
    },
    DrawRegion {
        card: RegionCard,
        instance: RegionInstance,
        /// PNG-encoded minimap snapshot taken right after placement.
        minimap_png: Vec<u8>,
    },
}

impl JournalEntry {
    /// The minimap snapshot as a `data:` URL, for embedding consumers.
    pub fn minimap_data_url(&self) -> Option<String> {
        match self {
            JournalEntry::DrawRegion { minimap_png, .. } => Some(data_url(minimap_png)),
            JournalEntry::Markdown { .. } => None,
        }
    }
}

fn data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(png))
}

/// Ordered, append-only sequence of journal entries.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }
}

/// Export the journal as narrative markdown.
pub fn export_markdown(journal: &Journal, path: &str) -> io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "# World Journal")?;
    writeln!(file)?;
    writeln!(file, "_Exported {}_", Local::now().format("%Y-%m-%d %H:%M"))?;

    for entry in journal.iter() {
        writeln!(file)?;
        match entry {
            JournalEntry::Markdown { content } => {
                writeln!(file, "{content}")?;
            }
            JournalEntry::DrawRegion { card, instance, .. } => {
                writeln!(file, "## {}", instance.title)?;
                writeln!(file)?;
                if !card.description.is_empty() {
                    writeln!(file, "{}", card.description)?;
                    writeln!(file)?;
                }
                writeln!(
                    file,
                    "_Region `{}` drawn with seed {} ({})._",
                    card.id, instance.seed, instance.color
                )?;
            }
        }
    }
    Ok(())
}

// JSON-friendly mirror types: instance bitmaps and minimap snapshots go
// out as data URLs rather than raw pixel buffers.

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum JsonEntry<'a> {
    Markdown {
        content: &'a str,
    },
    DrawRegion {
        card: &'a RegionCard,
        instance: JsonInstance<'a>,
        minimap: String,
    },
}

#[derive(Serialize)]
struct JsonInstance<'a> {
    id: &'a str,
    title: &'a str,
    seed: u64,
    color: Color,
    bitmap: String,
}

/// Export the journal as JSON.
pub fn export_json(journal: &Journal, path: &str) -> io::Result<()> {
    let mut entries = Vec::with_capacity(journal.len());
    for entry in journal.iter() {
        entries.push(match entry {
            JournalEntry::Markdown { content } => JsonEntry::Markdown { content },
            JournalEntry::DrawRegion {
                card,
                instance,
                minimap_png,
            } => {
                let bitmap = encode_png(&instance.bitmap)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
                JsonEntry::DrawRegion {
                    card,
                    instance: JsonInstance {
                        id: &instance.id,
                        title: &instance.title,
                        seed: instance.seed,
                        color: instance.color,
                        bitmap: data_url(&bitmap),
                    },
                    minimap: data_url(minimap_png),
                }
            }
        });
    }

    let text = serde_json::to_string_pretty(&entries)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    std::fs::write(path, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn sample_draw_entry() -> JournalEntry {
        let card: RegionCard = serde_json::from_str(
            r##"{ "id": "haven", "title": "Haven", "description": "The starting point.", "color": "#25b585" }"##,
        )
        .unwrap();
        let bitmap = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        let minimap_png = encode_png(&bitmap).unwrap();
        JournalEntry::DrawRegion {
            instance: RegionInstance {
                id: card.id.clone(),
                title: card.title.clone(),
                seed: 42,
                color: card.color,
                bitmap,
            },
            card,
            minimap_png,
        }
    }

    #[test]
    fn test_entries_keep_order() {
        let mut journal = Journal::new();
        journal.push(JournalEntry::Markdown {
            content: "first".to_string(),
        });
        journal.push(sample_draw_entry());
        journal.push(JournalEntry::Markdown {
            content: "last".to_string(),
        });

        assert_eq!(journal.len(), 3);
        let kinds: Vec<bool> = journal
            .iter()
            .map(|e| matches!(e, JournalEntry::Markdown { .. }))
            .collect();
        assert_eq!(kinds, vec![true, false, true]);
    }

    #[test]
    fn test_minimap_data_url() {
        let entry = sample_draw_entry();
        let url = entry.minimap_data_url().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        assert!(url.len() > 30);

        let markdown = JournalEntry::Markdown {
            content: "x".to_string(),
        };
        assert!(markdown.minimap_data_url().is_none());
    }

    #[test]
    fn test_export_markdown() {
        let mut journal = Journal::new();
        journal.push(JournalEntry::Markdown {
            content: "**Welcome!**".to_string(),
        });
        journal.push(sample_draw_entry());

        let path = std::env::temp_dir().join(format!("deckmap-journal-{}.md", std::process::id()));
        export_markdown(&journal, path.to_str().unwrap()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("# World Journal"));
        assert!(text.contains("**Welcome!**"));
        assert!(text.contains("## Haven"));
        assert!(text.contains("seed 42"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_export_json_shape() {
        let mut journal = Journal::new();
        journal.push(sample_draw_entry());

        let path =
            std::env::temp_dir().join(format!("deckmap-journal-{}.json", std::process::id()));
        export_json(&journal, path.to_str().unwrap()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let entry = &value.as_array().unwrap()[0];
        assert_eq!(entry["type"], "draw_region");
        assert_eq!(entry["card"]["id"], "haven");
        assert_eq!(entry["instance"]["seed"], 42);
        assert!(entry["minimap"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
        std::fs::remove_file(path).ok();
    }
}
