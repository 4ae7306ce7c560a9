use std::collections::BTreeMap;

use maze_party_core::{Action, AgentId, Command, Direction, Event, Item, Location, TileMap, Tuning};
use maze_party_system_interpreter::{ActionError, Interpreter};
use maze_party_world::{self as world, World};

fn build_world(lines: &[&str], goal: Location, doorway_costs: &[(Location, u32)]) -> World {
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::ConfigureMap {
            map: TileMap::from_ascii(lines).expect("valid layout"),
            goal,
            doorway_costs: doorway_costs.iter().copied().collect::<BTreeMap<_, _>>(),
        },
        &mut events,
    );
    world
}

fn join(world: &mut World, name: &str, location: Location, points: f64) -> AgentId {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::AddAgent {
            name: name.to_owned(),
            location,
        },
        &mut events,
    );
    let agent = match events.as_slice() {
        [Event::AgentJoined { agent, .. }] => *agent,
        other => panic!("unexpected events {other:?}"),
    };
    world::apply(
        world,
        Command::AwardPoints {
            agent,
            amount: points,
        },
        &mut events,
    );
    agent
}

fn grant(world: &mut World, agent: AgentId, item: Item) {
    let mut events = Vec::new();
    world::apply(world, Command::GrantItem { agent, item }, &mut events);
}

fn open_field() -> World {
    build_world(&[".........."; 10], Location::new(5, 9), &[])
}

fn river() -> World {
    build_world(
        &["...#...", "...#...", ".......", "...#...", "...#..."],
        Location::new(2, 6),
        &[],
    )
}

#[test]
fn moves_project_the_final_location_and_cost() {
    let mut world = open_field();
    let agent = join(&mut world, "Ada", Location::new(5, 5), 3.0);
    let interpreter = Interpreter::new(Tuning::default());

    let submission = interpreter
        .validate(&world, agent, "right right right")
        .expect("submission is valid");

    assert_eq!(submission.projected, Location::new(5, 8));
    assert_eq!(submission.cost, 3.0);
    assert_eq!(submission.actions, vec![Action::Move(Direction::Right); 3]);
    assert!(submission.warnings.is_empty());
}

#[test]
fn submissions_costing_more_than_held_points_are_refused() {
    let mut world = open_field();
    let agent = join(&mut world, "Ada", Location::new(5, 5), 2.0);
    let interpreter = Interpreter::new(Tuning::default());

    let error = interpreter
        .validate(&world, agent, "right right right")
        .expect_err("three steps cost three points");
    assert_eq!(
        error,
        ActionError::Unaffordable {
            cost: 3.0,
            points: 2.0
        }
    );
}

#[test]
fn obstacle_on_the_only_bridge_is_a_softlock() {
    let mut world = river();
    let stranded = join(&mut world, "Stranded", Location::new(0, 0), 5.0);
    let builder = join(&mut world, "Builder", Location::new(4, 6), 5.0);
    grant(&mut world, builder, Item::Obstacle);
    let before = world.clone();
    let interpreter = Interpreter::new(Tuning::default());

    let error = interpreter
        .validate(&world, builder, "obstacle:C4")
        .expect_err("the bridge is the only route");

    assert!(matches!(error, ActionError::Softlock { .. }), "got {error:?}");
    assert_eq!(world, before, "validation must not mutate the world");
    assert!(world.agent(stranded).is_some());
}

#[test]
fn obstacles_off_the_critical_path_are_accepted() {
    let mut world = river();
    let _ = join(&mut world, "Walker", Location::new(0, 0), 5.0);
    let builder = join(&mut world, "Builder", Location::new(4, 6), 5.0);
    grant(&mut world, builder, Item::Obstacle);
    let interpreter = Interpreter::new(Tuning::default());

    let error = interpreter
        .validate(&world, builder, "obstacle:A1B")
        .expect_err("malformed label");
    assert!(matches!(error, ActionError::Parse(_)));

    assert!(interpreter
        .validate(&world, builder, "obstacle:E1")
        .is_ok());
}

#[test]
fn stunned_and_indebted_agents_cannot_act() {
    let mut world = open_field();
    let stunned = join(&mut world, "Dizzy", Location::new(0, 0), 5.0);
    let broke = join(&mut world, "Broke", Location::new(1, 0), -1.0);
    if let Some(agent) = world.agent_mut(stunned) {
        agent.stun(1);
    }
    let interpreter = Interpreter::new(Tuning::default());

    assert_eq!(
        interpreter.validate(&world, stunned, "right"),
        Err(ActionError::Stunned)
    );
    assert_eq!(
        interpreter.validate(&world, broke, "pause"),
        Err(ActionError::NegativePoints)
    );
}

#[test]
fn pauses_and_warps_are_rationed() {
    let mut world = open_field();
    let agent = join(&mut world, "Ada", Location::new(0, 0), 12.0);
    let interpreter = Interpreter::new(Tuning::default());

    assert_eq!(
        interpreter.validate(&world, agent, "pause pause pause pause"),
        Err(ActionError::TooManyPauses { max: 3 })
    );
    assert_eq!(
        interpreter.validate(&world, agent, "warp right"),
        Err(ActionError::MixedWarp)
    );
    assert_eq!(
        interpreter.validate(&world, agent, "warp warp warp warp"),
        Err(ActionError::TooManyWarps { max: 3 })
    );
    assert!(interpreter.validate(&world, agent, "warp warp").is_ok());

    let poor = join(&mut world, "Poor", Location::new(9, 0), 11.0);
    assert_eq!(
        interpreter.validate(&world, poor, "warp"),
        Err(ActionError::WarpUnaffordable { needed: 12.0 })
    );
}

#[test]
fn finished_agents_may_only_place_items() {
    let mut world = open_field();
    let agent = join(&mut world, "Ada", Location::new(5, 9), 5.0);
    let _ = world.finish(agent);
    grant(&mut world, agent, Item::Trap);
    let interpreter = Interpreter::new(Tuning::default());

    assert_eq!(
        interpreter.validate(&world, agent, "left"),
        Err(ActionError::FinishedAgent {
            action: Action::Move(Direction::Left)
        })
    );
    assert!(interpreter.validate(&world, agent, "trap:B2").is_ok());
}

#[test]
fn item_tokens_require_held_items() {
    let mut world = open_field();
    let agent = join(&mut world, "Ada", Location::new(0, 0), 5.0);
    grant(&mut world, agent, Item::Trap);
    let interpreter = Interpreter::new(Tuning::default());

    assert_eq!(
        interpreter.validate(&world, agent, "trap:C3 trap:C4"),
        Err(ActionError::MissingItem {
            item: Item::Trap,
            needed: 2,
            held: 1
        })
    );
    assert!(interpreter.validate(&world, agent, "trap:C3").is_ok());
}

#[test]
fn walls_are_hard_rejections_but_locked_doorways_only_warn() {
    let mut world = build_world(
        &["..#", "..+", "..."],
        Location::new(2, 2),
        &[(Location::new(1, 2), 4)],
    );
    let agent = join(&mut world, "Ada", Location::new(0, 1), 5.0);
    let interpreter = Interpreter::new(Tuning::default());

    assert!(matches!(
        interpreter.validate(&world, agent, "right"),
        Err(ActionError::Blocked { .. })
    ));
    assert!(matches!(
        interpreter.validate(&world, agent, "up"),
        Err(ActionError::OffGrid { .. })
    ));

    let submission = interpreter
        .validate(&world, agent, "down right")
        .expect("locked doorways may be entered");
    assert_eq!(submission.projected, Location::new(1, 2));
    assert_eq!(submission.warnings.len(), 1);
}

#[test]
fn unlocking_costs_the_current_doorway_cost() {
    let mut world = build_world(&[".+."], Location::new(0, 2), &[(Location::new(0, 1), 4)]);
    let agent = join(&mut world, "Ada", Location::new(0, 0), 6.0);
    let interpreter = Interpreter::new(Tuning::default());

    let submission = interpreter
        .validate(&world, agent, "unlock right right")
        .expect("affordable unlock");
    assert_eq!(submission.cost, 6.0);
    assert!(submission.warnings.is_empty());

    assert!(matches!(
        interpreter.validate(&world, agent, "right unlock"),
        Err(ActionError::NoDoorway { .. })
    ));
    assert!(matches!(
        interpreter.validate(&world, agent, "unlock:A3"),
        Err(ActionError::NotAdjacent { .. })
    ));
}

#[test]
fn charges_must_follow_a_clear_line() {
    let mut world = build_world(&["....", ".#..", "...."], Location::new(2, 3), &[]);
    let agent = join(&mut world, "Ada", Location::new(1, 0), 5.0);
    grant(&mut world, agent, Item::Charge);
    let interpreter = Interpreter::new(Tuning::default());

    assert!(matches!(
        interpreter.validate(&world, agent, "charge:C2"),
        Err(ActionError::NotAligned { .. })
    ));
    assert!(matches!(
        interpreter.validate(&world, agent, "charge:B4"),
        Err(ActionError::ChargeBlocked { .. })
    ));
    let submission = interpreter
        .validate(&world, agent, "charge:C1")
        .expect("clear column");
    assert_eq!(submission.projected, Location::new(2, 0));
}

#[test]
fn placements_avoid_the_goal_and_occupied_cells() {
    let mut world = open_field();
    let agent = join(&mut world, "Ada", Location::new(0, 0), 5.0);
    let _ = join(&mut world, "Bo", Location::new(0, 1), 5.0);
    grant(&mut world, agent, Item::Obstacle);
    grant(&mut world, agent, Item::Collectible);
    let interpreter = Interpreter::new(Tuning::default());

    assert!(matches!(
        interpreter.validate(&world, agent, "collectible:F10"),
        Err(ActionError::CannotPlace { .. })
    ));
    assert!(matches!(
        interpreter.validate(&world, agent, "obstacle:A2"),
        Err(ActionError::Occupied { .. })
    ));
}

#[test]
fn validation_is_idempotent_and_handle_queues_the_actions() {
    let mut world = open_field();
    let agent = join(&mut world, "Ada", Location::new(5, 5), 3.0);
    let interpreter = Interpreter::new(Tuning::default());
    let before = world.clone();

    let first = interpreter.validate(&world, agent, "right pause up");
    let second = interpreter.validate(&world, agent, "right pause up");
    assert_eq!(first, second);
    assert_eq!(world, before);

    let mut commands = Vec::new();
    let submission = interpreter
        .handle(&world, agent, "right pause up", &mut commands)
        .expect("valid submission");
    assert_eq!(
        commands,
        vec![Command::QueueDecisions {
            agent,
            actions: submission.actions.clone()
        }]
    );
    assert!(submission.confirmation().contains("E7"));
}
