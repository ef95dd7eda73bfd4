use clap::Parser;

mod assets;
mod cards;
mod catalog;
mod color;
mod generator;
mod journal;
mod mutator;
mod rng;
mod world;
mod worldmap;

use cards::CardSelector;
use world::{Action, PlayParams, World};
use worldmap::{PlacementParams, WorldMap};

#[derive(Parser, Debug)]
#[command(name = "deckmap")]
#[command(about = "Grow a fantasy world map by playing a weighted deck of region cards")]
struct Args {
    /// Random seed (uses a random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Width of the world map grid
    #[arg(short = 'W', long, default_value = "1024")]
    width: usize,

    /// Height of the world map grid
    #[arg(short = 'H', long, default_value = "1024")]
    height: usize,

    /// Load the card catalog from a JSON file instead of the builtin table
    #[arg(long)]
    catalog: Option<String>,

    /// Tag of the card that starts the cascade
    #[arg(long, default_value = "start_card")]
    start_tag: String,

    /// Additional random draws after the start cascade settles
    #[arg(short, long, default_value = "0")]
    draws: usize,

    /// Output path for the world minimap PNG
    #[arg(short, long, default_value = "world_map.png")]
    out: String,

    /// Export the journal as markdown
    #[arg(long)]
    journal_md: Option<String>,

    /// Export the journal as JSON (cards, instances, minimap snapshots)
    #[arg(long)]
    journal_json: Option<String>,

    /// Collision fraction above which a placement offset is rejected
    #[arg(long, default_value = "0.2")]
    collision_threshold: f64,

    /// Placement search attempt budget
    #[arg(long, default_value = "1000")]
    max_attempts: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let seed = args.seed.unwrap_or_else(rand::random);
    println!("Building world with seed: {}", seed);
    println!("Map size: {}x{}", args.width, args.height);

    let deck = match &args.catalog {
        Some(path) => catalog::load_catalog(path)?,
        None => catalog::builtin_deck()?,
    };
    println!("Deck ready: {} cards", deck.len());

    let params = PlacementParams {
        collision_threshold: args.collision_threshold,
        max_attempts: args.max_attempts,
        ..PlacementParams::default()
    };
    let map = WorldMap::with_params(args.width, args.height, params);
    let mut world = World::with_map(seed, deck, map);

    println!("Playing start card (tag `{}`)...", args.start_tag);
    world.enqueue(Action::PlayCard {
        selector: CardSelector::tag(&args.start_tag),
        params: PlayParams::default(),
    });
    world.run_actions()?;
    println!(
        "Start cascade settled: {} regions placed, {} cards left in deck",
        world.map.placements(),
        world.deck().len()
    );

    for _ in 0..args.draws {
        if world.deck().is_empty() {
            break;
        }
        world.enqueue(Action::PlayCard {
            selector: CardSelector::default(),
            params: PlayParams::default(),
        });
        world.run_actions()?;
    }

    println!(
        "World complete: {} regions placed, {} journal entries",
        world.map.placements(),
        world.journal.len()
    );
    if let Some((x, y)) = world.player_pos() {
        println!("Player position: ({}, {})", x, y);
    }

    let mut rng = world.fork_rng();
    world.map.save_minimap(&mut rng, &args.out)?;
    println!("Minimap written to {}", args.out);

    if let Some(path) = &args.journal_md {
        journal::export_markdown(&world.journal, path)?;
        println!("Journal (markdown) written to {}", path);
    }
    if let Some(path) = &args.journal_json {
        journal::export_json(&world.journal, path)?;
        println!("Journal (JSON) written to {}", path);
    }

    Ok(())
}
