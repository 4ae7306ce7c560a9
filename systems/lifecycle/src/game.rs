use std::collections::BTreeMap;

use maze_party_core::{
    AgentId, Command, Event, Location, MinigameEngine, PrizeTier, TickReport, TileMap, Tuning,
    TurnSummary,
};
use maze_party_rendering::{BoardRenderer, BoardScene, TextRenderer};
use maze_party_system_generation::MapGenerator;
use maze_party_system_interpreter::Interpreter;
use maze_party_system_resolution::Resolution;
use maze_party_world::{self as world, query, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::{persistence, GameError, Lifecycle, PersistenceError};

/// A complete Maze Party game: rules, randomness and world state.
///
/// The game owns its random number generator, so replaying the same calls
/// against a game created from the same seed reproduces every outcome.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MazeGame {
    tuning: Tuning,
    rng: ChaCha8Rng,
    world: World,
}

impl MazeGame {
    /// Creates a game on a freshly generated map.
    pub fn new(tuning: Tuning, seed: u64) -> Result<Self, GameError> {
        let generated = MapGenerator::new(tuning.clone()).generate(seed)?;
        Ok(Self::with_map(
            tuning,
            seed,
            generated.map,
            generated.goal,
            generated.doorway_costs,
        ))
    }

    /// Creates a game on a prepared map.
    #[must_use]
    pub fn with_map(
        tuning: Tuning,
        seed: u64,
        map: TileMap,
        goal: Location,
        doorway_costs: BTreeMap<Location, u32>,
    ) -> Self {
        let mut world = World::new();
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::ConfigureMap {
                map,
                goal,
                doorway_costs,
            },
            &mut events,
        );
        Self {
            tuning,
            rng: ChaCha8Rng::seed_from_u64(seed),
            world,
        }
    }

    /// Read-only view of the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Rules the game runs with.
    #[must_use]
    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Looks up a player by name, ignoring case.
    #[must_use]
    pub fn agent_named(&self, name: &str) -> Option<AgentId> {
        query::agent_named(&self.world, name).map(|agent| agent.id())
    }

    /// Plain-text rendering of the board.
    #[must_use]
    pub fn board(&self) -> String {
        TextRenderer
            .render(&BoardScene::capture(&self.world))
            .unwrap_or_else(|error| {
                log::warn!("failed to render the board: {error:#}");
                String::new()
            })
    }

    /// Opens a turn, resolves it completely and closes it.
    pub fn run_turn(&mut self) -> TurnSummary {
        let _ = self.begin_turn();
        while self.process_tick().continue_processing {}
        self.end_turn()
    }

    /// Serialises the game into a JSON save document.
    pub fn save(&self) -> Result<String, PersistenceError> {
        persistence::encode(self)
    }

    /// Restores a game from a JSON save document.
    pub fn load(text: &str) -> Result<Self, PersistenceError> {
        let mut game = persistence::decode(text)?;
        game.world.refresh_ranks();
        Ok(game)
    }

    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::new(self.tuning.clone())
    }

    fn narrate(&self, events: &[Event]) -> Vec<String> {
        let names = |id| query::name_of(&self.world, id);
        events
            .iter()
            .filter(|event| !event.is_quiet())
            .map(|event| event.describe(&names))
            .collect()
    }
}

impl MinigameEngine for MazeGame {
    type Rejection = GameError;

    fn add_player(&mut self, name: &str) -> Result<AgentId, GameError> {
        let mut events = Vec::new();
        self.lifecycle()
            .add_player(&mut self.world, name, &mut self.rng, &mut events)
    }

    fn remove_player(&mut self, agent: AgentId) -> Result<(), GameError> {
        let mut events = Vec::new();
        self.lifecycle()
            .remove_player(&mut self.world, agent, &mut events)
    }

    fn award_points(&mut self, agent: AgentId, amount: f64) -> Result<f64, GameError> {
        if self.world.agent(agent).is_none() {
            return Err(GameError::UnknownAgent { agent });
        }
        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::AwardPoints { agent, amount },
            &mut events,
        );
        self.world.refresh_ranks();
        Ok(events
            .iter()
            .find_map(|event| match event {
                Event::PointsAwarded { amount, .. } => Some(*amount),
                _ => None,
            })
            .unwrap_or(0.0))
    }

    fn submit(&mut self, agent: AgentId, text: &str) -> Result<String, GameError> {
        let mut commands = Vec::new();
        let submission = Interpreter::new(self.tuning.clone()).handle(
            &self.world,
            agent,
            text,
            &mut commands,
        )?;
        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }
        Ok(submission.confirmation())
    }

    fn begin_turn(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        self.lifecycle()
            .begin_turn(&mut self.world, &mut self.rng, &mut events);
        self.narrate(&events)
    }

    fn process_tick(&mut self) -> TickReport {
        let mut events = Vec::new();
        let outcome = Resolution::new(self.tuning.clone()).process_tick(
            &mut self.world,
            &mut self.rng,
            &mut events,
        );
        TickReport {
            statements: self.narrate(&events),
            events,
            continue_processing: outcome.continue_processing,
            continue_immediately: outcome.continue_immediately,
        }
    }

    fn end_turn(&mut self) -> TurnSummary {
        let mut events = Vec::new();
        let statements = self.lifecycle().end_turn(&mut self.world, &mut events);
        TurnSummary {
            turn: self.world.turn(),
            statements,
            board: self.board(),
        }
    }

    fn award_prize(
        &mut self,
        agent: AgentId,
        tier: PrizeTier,
        intro: &str,
    ) -> Result<String, GameError> {
        let mut events = Vec::new();
        self.lifecycle().award_prize(
            &mut self.world,
            agent,
            tier,
            intro,
            &mut self.rng,
            &mut events,
        )
    }

    fn handle_message(&mut self, agent: AgentId, text: &str) -> Result<String, GameError> {
        let is_claim = text
            .split_whitespace()
            .next()
            .is_some_and(|word| word.eq_ignore_ascii_case("claim"));
        if is_claim {
            let mut events = Vec::new();
            self.lifecycle()
                .claim(&mut self.world, agent, text, &mut events)
        } else {
            self.submit(agent, text)
        }
    }
}
