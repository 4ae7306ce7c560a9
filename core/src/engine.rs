use serde::{Deserialize, Serialize};

use crate::{AgentId, Event};

/// Size of a prize handed out by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrizeTier {
    /// The winner chooses one item from an offer.
    Major,
    /// The winner receives a random item straight away.
    Minor,
}

/// Result of processing one tick of a turn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Raw events produced during the tick.
    pub events: Vec<Event>,
    /// Narrated statements for the players.
    pub statements: Vec<String>,
    /// Whether another tick is needed to finish the turn.
    pub continue_processing: bool,
    /// Whether the next tick may follow without a pacing delay.
    pub continue_immediately: bool,
}

/// Result of closing a turn.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnSummary {
    /// Turn that just closed.
    pub turn: u32,
    /// Condensed narration of the whole turn.
    pub statements: Vec<String>,
    /// Text rendering of the board after the turn.
    pub board: String,
}

/// Contract every party minigame exposes to its host.
pub trait MinigameEngine {
    /// Error returned when a request is refused.
    type Rejection: std::error::Error;

    /// Registers a player and returns their identifier.
    fn add_player(&mut self, name: &str) -> Result<AgentId, Self::Rejection>;

    /// Removes a player and everything they own.
    fn remove_player(&mut self, agent: AgentId) -> Result<(), Self::Rejection>;

    /// Credits points and returns the amount actually applied.
    fn award_points(&mut self, agent: AgentId, amount: f64) -> Result<f64, Self::Rejection>;

    /// Validates and stores a decision string, returning a confirmation.
    fn submit(&mut self, agent: AgentId, text: &str) -> Result<String, Self::Rejection>;

    /// Opens a turn and returns the narration of its setup.
    fn begin_turn(&mut self) -> Vec<String>;

    /// Advances the current turn by one tick.
    fn process_tick(&mut self) -> TickReport;

    /// Closes the current turn.
    fn end_turn(&mut self) -> TurnSummary;

    /// Hands a prize to a player and returns the announcement.
    fn award_prize(
        &mut self,
        agent: AgentId,
        tier: PrizeTier,
        intro: &str,
    ) -> Result<String, Self::Rejection>;

    /// Handles a free-form message (decisions or claims) from a player.
    fn handle_message(&mut self, agent: AgentId, text: &str) -> Result<String, Self::Rejection>;
}
