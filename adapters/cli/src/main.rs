#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that hosts a Maze Party game stored in a save file.
//!
//! Every invocation loads the game, performs one host request and writes the
//! game back, so a chat bot or a shell script can drive a whole session.

mod store;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use maze_party_core::{AgentId, MinigameEngine, PrizeTier, Variant, WELCOME_BANNER};
use maze_party_system_lifecycle::MazeGame;

#[derive(Debug, Parser)]
#[command(name = "maze-party", version)]
#[command(about = "Host a turn-based Maze Party game from the command line")]
struct Args {
    /// Save file holding the game
    #[arg(long, short, default_value = "maze-party.json")]
    state: PathBuf,

    #[command(subcommand)]
    command: Request,
}

#[derive(Debug, Subcommand)]
enum Request {
    /// Generate a fresh maze, replacing any existing save
    New {
        /// Seed for map generation and every later random decision
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// TOML file overriding the default rules
        #[arg(long)]
        tuning: Option<PathBuf>,
        /// Maze flavour, overriding the rules file
        #[arg(long, value_enum)]
        variant: Option<VariantArg>,
    },
    /// Add a player
    Join {
        /// Display name of the player
        name: String,
    },
    /// Remove a player
    Leave {
        /// Display name of the player
        name: String,
    },
    /// Credit points to a player
    Award {
        /// Display name of the player
        name: String,
        /// Points to credit
        amount: f64,
    },
    /// Queue a player's decisions, for example `up up unlock trap:C4`
    Submit {
        /// Display name of the player
        name: String,
        /// Decision tokens
        #[arg(required = true, num_args = 1..)]
        decisions: Vec<String>,
    },
    /// Claim one of the items a major prize offered
    Claim {
        /// Display name of the player
        name: String,
        /// Item to take
        item: String,
    },
    /// Hand a prize to a player
    Prize {
        /// Display name of the player
        name: String,
        /// Size of the prize
        #[arg(value_enum)]
        tier: TierArg,
        /// Sentence printed before the announcement
        #[arg(long, default_value = "")]
        intro: String,
    },
    /// Resolve a whole turn and print its narration
    Turn {
        /// Print every tick instead of the condensed summary
        #[arg(long)]
        verbose: bool,
    },
    /// Print the board
    Show,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VariantArg {
    /// Plain maze
    Maze,
    /// Maze with doorways, chests, keys and seals
    Dungeon,
}

impl From<VariantArg> for Variant {
    fn from(value: VariantArg) -> Self {
        match value {
            VariantArg::Maze => Variant::Maze,
            VariantArg::Dungeon => Variant::Dungeon,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TierArg {
    /// The player chooses one item from an offer
    Major,
    /// The player receives a random item
    Minor,
}

impl From<TierArg> for PrizeTier {
    fn from(value: TierArg) -> Self {
        match value {
            TierArg::Major => PrizeTier::Major,
            TierArg::Minor => PrizeTier::Minor,
        }
    }
}

/// Entry point for the Maze Party command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    if let Request::New {
        seed,
        tuning,
        variant,
    } = &args.command
    {
        let mut rules = store::load_tuning(tuning.as_deref())?;
        if let Some(variant) = variant {
            rules.variant = (*variant).into();
        }
        let game = MazeGame::new(rules, *seed).context("failed to generate a maze")?;
        store::save(&args.state, &game)?;
        println!("{WELCOME_BANNER}");
        print!("{}", game.board());
        return Ok(());
    }

    let mut game = store::load(&args.state)?;
    let output = serve(&mut game, args.command)?;
    store::save(&args.state, &game)?;
    println!("{output}");
    Ok(())
}

fn serve(game: &mut MazeGame, request: Request) -> Result<String> {
    let output = match request {
        Request::New { .. } => return Err(anyhow!("new games are created before loading")),
        Request::Join { name } => {
            let agent = game.add_player(&name)?;
            format!("{name} joined the maze as {agent}.")
        }
        Request::Leave { name } => {
            let agent = player(game, &name)?;
            game.remove_player(agent)?;
            format!("{name} left the maze.")
        }
        Request::Award { name, amount } => {
            let agent = player(game, &name)?;
            let applied = game.award_points(agent, amount)?;
            format!("{name} received {applied} points.")
        }
        Request::Submit { name, decisions } => {
            let agent = player(game, &name)?;
            game.submit(agent, &decisions.join(" "))?
        }
        Request::Claim { name, item } => {
            let agent = player(game, &name)?;
            game.handle_message(agent, &format!("claim {item}"))?
        }
        Request::Prize { name, tier, intro } => {
            let agent = player(game, &name)?;
            game.award_prize(agent, tier.into(), &intro)?
        }
        Request::Turn { verbose } => play_turn(game, verbose),
        Request::Show => game.board(),
    };
    Ok(output)
}

fn play_turn(game: &mut MazeGame, verbose: bool) -> String {
    let mut lines = game.begin_turn();
    loop {
        let report = game.process_tick();
        if verbose {
            lines.extend(report.statements);
        }
        if !report.continue_processing {
            break;
        }
    }
    let summary = game.end_turn();
    if !verbose {
        lines = summary.statements;
    }
    lines.push(summary.board);
    lines.join("\n")
}

fn player(game: &MazeGame, name: &str) -> Result<AgentId> {
    game.agent_named(name)
        .ok_or_else(|| anyhow!("nobody called {name} is playing"))
}
