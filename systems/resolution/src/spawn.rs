//! Spawn-point selection shared by joins, warps and turn-level spawns.

use maze_party_core::{AgentId, Location};
use maze_party_world::World;
use rand::{seq::SliceRandom, Rng};

/// Random vacant cell around another agent.
pub fn near_agent<R>(world: &World, anchor: AgentId, rng: &mut R) -> Option<Location>
where
    R: Rng + ?Sized,
{
    let location = world.agent(anchor)?.location();
    world.vacant_near(location).choose(rng).copied()
}

/// Random vacant cell on the outer ring of the walkable area.
pub fn on_edge<R>(world: &World, rng: &mut R) -> Option<Location>
where
    R: Rng + ?Sized,
{
    world.spawn_edge().choose(rng).copied()
}

/// Random vacant cell anywhere in the maze.
pub fn anywhere<R>(world: &World, rng: &mut R) -> Option<Location>
where
    R: Rng + ?Sized,
{
    let cells: Vec<Location> = world
        .map()
        .locations()
        .filter(|cell| world.is_vacant(*cell))
        .collect();
    cells.choose(rng).copied()
}

/// Spawn point for a newcomer: next to one of the worst-ranked unfinished
/// agents, falling back to the spawn edge and then to any vacant cell.
pub fn for_newcomer<R>(world: &World, rng: &mut R) -> Option<Location>
where
    R: Rng + ?Sized,
{
    let worst = world
        .agents()
        .filter(|agent| !agent.is_finished())
        .map(|agent| agent.rank())
        .max();
    if let Some(worst) = worst {
        let mut laggards: Vec<AgentId> = world
            .agents()
            .filter(|agent| !agent.is_finished() && agent.rank() == worst)
            .map(|agent| agent.id())
            .collect();
        laggards.shuffle(rng);
        for anchor in laggards {
            if let Some(cell) = near_agent(world, anchor, rng) {
                return Some(cell);
            }
        }
    }
    on_edge(world, rng).or_else(|| anywhere(world, rng))
}

/// Warp destination: next to a random other unfinished agent, falling back
/// to the spawn edge.
pub fn for_warp<R>(world: &World, warper: AgentId, rng: &mut R) -> Option<Location>
where
    R: Rng + ?Sized,
{
    let mut others: Vec<AgentId> = world
        .agents()
        .filter(|agent| agent.id() != warper && !agent.is_finished())
        .map(|agent| agent.id())
        .collect();
    others.shuffle(rng);
    for anchor in others {
        if let Some(cell) = near_agent(world, anchor, rng) {
            return Some(cell);
        }
    }
    on_edge(world, rng)
}
