use std::collections::BTreeMap;

use maze_party_core::{Action, AgentId, Command, Direction, Event, Item, Location, Tile, TileMap, Tuning};
use maze_party_system_resolution::{spawn, Resolution, TickOutcome};
use maze_party_world::{self as world, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

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

fn begin_turn(world: &mut World) {
    let mut events = Vec::new();
    world::apply(world, Command::BeginTurn, &mut events);
}

fn queue(world: &mut World, agent: AgentId, actions: Vec<Action>) {
    let mut events = Vec::new();
    world::apply(world, Command::QueueDecisions { agent, actions }, &mut events);
}

fn open_field() -> World {
    build_world(&[".........."; 10], Location::new(5, 9), &[])
}

fn engine() -> Resolution {
    Resolution::new(Tuning::default().without_spawns())
}

fn tick(world: &mut World, rng: &mut ChaCha8Rng) -> (TickOutcome, Vec<Event>) {
    let mut events = Vec::new();
    let outcome = engine().process_tick(world, rng, &mut events);
    (outcome, events)
}

fn resolve(world: &mut World, rng: &mut ChaCha8Rng) -> Vec<Event> {
    resolve_with(&engine(), world, rng)
}

fn resolve_with(resolution: &Resolution, world: &mut World, rng: &mut ChaCha8Rng) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..100 {
        if !resolution.process_tick(world, rng, &mut events).continue_processing {
            return events;
        }
    }
    panic!("turn did not settle: {events:?}");
}

fn location_of(world: &World, agent: AgentId) -> Location {
    world.agent(agent).expect("agent exists").location()
}

#[test]
fn steps_spend_points_until_the_queue_runs_dry() {
    let mut world = open_field();
    let agent = join(&mut world, "Ada", Location::new(5, 5), 3.0);
    begin_turn(&mut world);
    queue(&mut world, agent, vec![Action::Move(Direction::Right); 3]);
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    let (first, events) = tick(&mut world, &mut rng);
    assert!(first.continue_processing);
    assert!(first.continue_immediately);
    assert_eq!(first.actors, 1);
    assert_eq!(
        events,
        vec![Event::Stepped {
            agent,
            from: Location::new(5, 5),
            to: Location::new(5, 6)
        }]
    );

    let _ = resolve(&mut world, &mut rng);
    let state = world.agent(agent).expect("agent exists");
    assert_eq!(state.location(), Location::new(5, 8));
    assert_eq!(state.points(), 0.0);
    assert!(!state.is_finished());
    assert!(!world::query::any_pending(&world));
    assert_eq!(world.render_lines().len(), 3);
}

#[test]
fn stunned_agents_regain_consciousness_and_close_their_entry_in_one_tick() {
    let mut world = open_field();
    let agent = join(&mut world, "Dizzy", Location::new(0, 0), 2.0);
    begin_turn(&mut world);
    if let Some(state) = world.agent_mut(agent) {
        state.stun(1);
    }
    queue(&mut world, agent, Vec::new());
    let mut rng = ChaCha8Rng::seed_from_u64(2);

    let (outcome, events) = tick(&mut world, &mut rng);
    assert_eq!(events, vec![Event::RegainedConsciousness { agent }]);
    assert!(!outcome.continue_processing);
    assert!(!outcome.continue_immediately);
    assert!(!world.agent(agent).expect("agent exists").is_stunned());
    assert!(world.decisions(agent).is_none());
    assert!(world.decision_holders().is_empty());
}

#[test]
fn stunned_agents_with_plans_keep_the_turn_going() {
    let mut world = open_field();
    let agent = join(&mut world, "Dizzy", Location::new(0, 0), 2.0);
    begin_turn(&mut world);
    if let Some(state) = world.agent_mut(agent) {
        state.stun(1);
    }
    queue(&mut world, agent, vec![Action::Move(Direction::Right)]);
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    let (outcome, events) = tick(&mut world, &mut rng);
    assert_eq!(events, vec![Event::RegainedConsciousness { agent }]);
    assert!(outcome.continue_processing);

    let (outcome, _) = tick(&mut world, &mut rng);
    assert!(!outcome.continue_processing);
    assert_eq!(location_of(&world, agent), Location::new(0, 1));
}

#[test]
fn invincible_movers_trample_whoever_is_in_the_way() {
    let mut world = open_field();
    let runner = join(&mut world, "Runner", Location::new(0, 0), 5.0);
    let victim = join(&mut world, "Victim", Location::new(0, 1), 5.0);
    grant(&mut world, runner, Item::Star);
    begin_turn(&mut world);
    queue(
        &mut world,
        runner,
        vec![
            Action::Star,
            Action::Move(Direction::Right),
            Action::Move(Direction::Right),
        ],
    );
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    let events = resolve(&mut world, &mut rng);

    assert!(events.contains(&Event::StarActivated { agent: runner }));
    assert!(events.contains(&Event::Trampled {
        agent: runner,
        victim,
        location: Location::new(0, 1)
    }));
    assert!(world.agent(victim).expect("victim exists").is_stunned());
    assert_eq!(location_of(&world, victim), Location::new(0, 1));
    assert_eq!(location_of(&world, runner), Location::new(0, 2));
    assert_eq!(world.agent(runner).expect("runner exists").item_count(Item::Star), 0);
}

#[test]
fn unlocking_halves_the_doorway_cost_each_time() {
    let doorway = Location::new(0, 1);
    let mut world = build_world(&[".+."], Location::new(0, 2), &[(doorway, 10)]);
    let agent = join(&mut world, "Ada", Location::new(0, 0), 20.0);
    begin_turn(&mut world);
    queue(
        &mut world,
        agent,
        vec![
            Action::Unlock(None),
            Action::Unlock(Some(doorway)),
            Action::Move(Direction::Right),
            Action::Move(Direction::Right),
        ],
    );
    let mut rng = ChaCha8Rng::seed_from_u64(4);

    let (_, events) = tick(&mut world, &mut rng);
    assert_eq!(
        events,
        vec![Event::DoorwayUnlocked {
            agent,
            location: doorway,
            remaining_cost: 5,
            with_key: false
        }]
    );
    assert_eq!(world.agent(agent).expect("agent exists").points(), 10.0);
    assert_eq!(world.map().tile(doorway), Some(Tile::Doorway { locked: false }));

    let (_, events) = tick(&mut world, &mut rng);
    assert!(events.contains(&Event::DoorwayUnlocked {
        agent,
        location: doorway,
        remaining_cost: 3,
        with_key: false
    }));
    assert_eq!(world.agent(agent).expect("agent exists").points(), 5.0);

    let events = resolve(&mut world, &mut rng);
    assert!(events.contains(&Event::Finished { agent, place: 1 }));
    let state = world.agent(agent).expect("agent exists");
    assert!(state.is_finished());
    assert_eq!(state.rank(), 1);
    assert_eq!(state.points(), 3.0);
}

#[test]
fn locked_doorways_end_the_turn_of_anyone_walking_into_them() {
    let mut world = build_world(&[".+."], Location::new(0, 2), &[(Location::new(0, 1), 4)]);
    let agent = join(&mut world, "Ada", Location::new(0, 0), 5.0);
    begin_turn(&mut world);
    queue(
        &mut world,
        agent,
        vec![Action::Move(Direction::Right), Action::Move(Direction::Right)],
    );
    let mut rng = ChaCha8Rng::seed_from_u64(5);

    let events = resolve(&mut world, &mut rng);

    assert_eq!(
        events,
        vec![Event::DoorwayBlocked {
            agent,
            location: Location::new(0, 1)
        }]
    );
    assert_eq!(location_of(&world, agent), Location::new(0, 0));
    assert_eq!(world.agent(agent).expect("agent exists").points(), 5.0);
}

#[test]
fn movers_wait_for_occupants_that_still_have_plans() {
    let mut world = open_field();
    let follower = join(&mut world, "Follower", Location::new(0, 0), 5.0);
    let leader = join(&mut world, "Leader", Location::new(0, 1), 5.0);
    begin_turn(&mut world);
    queue(&mut world, follower, vec![Action::Move(Direction::Right)]);
    queue(
        &mut world,
        leader,
        vec![Action::Pause, Action::Move(Direction::Right)],
    );
    let mut rng = ChaCha8Rng::seed_from_u64(6);

    let (_, events) = tick(&mut world, &mut rng);
    assert_eq!(
        events,
        vec![
            Event::Paused { agent: leader },
            Event::Waiting {
                agent: follower,
                blocker: leader
            },
        ]
    );

    let _ = resolve(&mut world, &mut rng);
    assert_eq!(location_of(&world, leader), Location::new(0, 2));
    assert_eq!(location_of(&world, follower), Location::new(0, 1));
}

#[test]
fn idle_occupants_are_shoved_forward() {
    let mut world = open_field();
    let mover = join(&mut world, "Mover", Location::new(0, 0), 5.0);
    let idle = join(&mut world, "Idle", Location::new(0, 1), 5.0);
    begin_turn(&mut world);
    queue(&mut world, mover, vec![Action::Move(Direction::Right)]);
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let events = resolve(&mut world, &mut rng);

    assert_eq!(
        events,
        vec![Event::Shoved {
            agent: mover,
            victim: idle,
            to: Location::new(0, 2)
        }]
    );
    assert_eq!(location_of(&world, mover), Location::new(0, 1));
    assert_eq!(location_of(&world, idle), Location::new(0, 2));
}

#[test]
fn idle_occupants_shoved_onto_revealed_hazards_are_sent_back() {
    let mut world = build_world(&["....^....."], Location::new(0, 9), &[]);
    let mover = join(&mut world, "Mover", Location::new(0, 2), 5.0);
    let idle = join(&mut world, "Idle", Location::new(0, 3), 5.0);
    let owner = join(&mut world, "Owner", Location::new(0, 8), 0.0);
    world.set_hazard_owner(Location::new(0, 4), Some(owner));
    begin_turn(&mut world);
    queue(&mut world, mover, vec![Action::Move(Direction::Right)]);
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let events = resolve(&mut world, &mut rng);

    assert!(events.contains(&Event::Shoved {
        agent: mover,
        victim: idle,
        to: Location::new(0, 4)
    }));
    assert!(events.contains(&Event::HazardTriggered {
        agent: idle,
        location: Location::new(0, 4),
        returned_to: Location::new(0, 3),
        owner: Some(owner),
        reward: 0.5
    }));
    assert!(events.contains(&Event::Separated {
        agent: idle,
        from: Location::new(0, 3),
        to: Location::new(0, 2)
    }));
    assert_eq!(location_of(&world, mover), Location::new(0, 3));
    assert_eq!(location_of(&world, idle), Location::new(0, 2));
    assert!(world.agent(idle).expect("idle exists").is_stunned());
    assert_eq!(world.agent(owner).expect("owner exists").points(), 0.5);
}

#[test]
fn idle_occupants_shoved_onto_hidden_hazards_reveal_them() {
    let mut world = build_world(&["....h....."], Location::new(0, 9), &[]);
    let mover = join(&mut world, "Mover", Location::new(0, 2), 5.0);
    let idle = join(&mut world, "Idle", Location::new(0, 3), 5.0);
    begin_turn(&mut world);
    queue(&mut world, mover, vec![Action::Move(Direction::Right)]);
    let mut rng = ChaCha8Rng::seed_from_u64(8);

    let events = resolve(&mut world, &mut rng);

    assert_eq!(
        events,
        vec![
            Event::Shoved {
                agent: mover,
                victim: idle,
                to: Location::new(0, 4)
            },
            Event::HazardRevealed {
                agent: idle,
                location: Location::new(0, 4)
            },
        ]
    );
    assert_eq!(world.map().tile(Location::new(0, 4)), Some(Tile::RevealedHazard));
    assert_eq!(location_of(&world, idle), Location::new(0, 4));
    assert!(!world.agent(idle).expect("idle exists").is_stunned());
}

#[test]
fn cornered_occupants_are_punched_by_rich_movers_and_block_poor_ones() {
    let layout = ["..."];
    let goal = Location::new(0, 2);

    let mut poor_world = build_world(&layout, goal, &[]);
    let poor = join(&mut poor_world, "Poor", Location::new(0, 0), 2.0);
    let blocker = join(&mut poor_world, "Blocker", Location::new(0, 1), 1.0);
    begin_turn(&mut poor_world);
    queue(&mut poor_world, poor, vec![Action::Move(Direction::Right); 2]);
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let events = resolve(&mut poor_world, &mut rng);
    assert_eq!(events, vec![Event::GaveUp { agent: poor, blocker }]);
    assert_eq!(location_of(&poor_world, poor), Location::new(0, 0));
    assert!(!poor_world.has_pending(poor));

    let mut rich_world = build_world(&layout, goal, &[]);
    let rich = join(&mut rich_world, "Rich", Location::new(0, 0), 10.0);
    let blocker = join(&mut rich_world, "Blocker", Location::new(0, 1), 1.0);
    begin_turn(&mut rich_world);
    queue(&mut rich_world, rich, vec![Action::Move(Direction::Right)]);
    let (outcome, events) = tick(&mut rich_world, &mut rng);
    assert_eq!(
        events,
        vec![Event::AutoPunched {
            agent: rich,
            victim: blocker
        }]
    );
    assert!(outcome.continue_processing);
    assert!(rich_world.agent(blocker).expect("blocker exists").is_stunned());
    assert_eq!(rich_world.agent(rich).expect("rich exists").points(), 8.0);
}

#[test]
fn head_on_collisions_resolve_without_sharing_cells() {
    for seed in 0..8 {
        let mut world = open_field();
        let left = join(&mut world, "Left", Location::new(0, 0), 5.0);
        let right = join(&mut world, "Right", Location::new(0, 1), 5.0);
        begin_turn(&mut world);
        queue(&mut world, left, vec![Action::Move(Direction::Right)]);
        queue(&mut world, right, vec![Action::Move(Direction::Left)]);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let events = resolve(&mut world, &mut rng);

        assert!(
            events
                .iter()
                .any(|event| matches!(event, Event::PassedBy { .. })),
            "seed {seed}: {events:?}"
        );
        assert_ne!(location_of(&world, left), location_of(&world, right));
    }
}

#[test]
fn revealed_hazards_send_agents_back_and_pay_their_owner() {
    let mut world = build_world(&["..^..."], Location::new(0, 5), &[]);
    let walker = join(&mut world, "Walker", Location::new(0, 0), 5.0);
    let owner = join(&mut world, "Owner", Location::new(0, 4), 0.0);
    world.set_hazard_owner(Location::new(0, 2), Some(owner));
    begin_turn(&mut world);
    queue(&mut world, walker, vec![Action::Move(Direction::Right); 2]);
    let mut rng = ChaCha8Rng::seed_from_u64(9);

    let events = resolve(&mut world, &mut rng);

    assert!(events.contains(&Event::HazardTriggered {
        agent: walker,
        location: Location::new(0, 2),
        returned_to: Location::new(0, 0),
        owner: Some(owner),
        reward: 1.0
    }));
    assert_eq!(location_of(&world, walker), Location::new(0, 0));
    assert!(world.agent(walker).expect("walker exists").is_stunned());
    assert_eq!(world.agent(owner).expect("owner exists").points(), 1.0);
}

#[test]
fn hidden_hazards_are_revealed_by_whoever_stops_on_them() {
    let mut world = build_world(&[".h.."], Location::new(0, 3), &[]);
    let agent = join(&mut world, "Ada", Location::new(0, 0), 5.0);
    begin_turn(&mut world);
    queue(&mut world, agent, vec![Action::Move(Direction::Right)]);
    let mut rng = ChaCha8Rng::seed_from_u64(10);

    let events = resolve(&mut world, &mut rng);

    assert!(events.contains(&Event::HazardRevealed {
        agent,
        location: Location::new(0, 1)
    }));
    assert_eq!(world.map().tile(Location::new(0, 1)), Some(Tile::RevealedHazard));
    assert!(!world.agent(agent).expect("agent exists").is_stunned());
}

#[test]
fn seals_that_would_strand_someone_are_refused() {
    let mut world = build_world(&[".+."], Location::new(0, 2), &[(Location::new(0, 1), 4)]);
    let agent = join(&mut world, "Ada", Location::new(0, 0), 5.0);
    grant(&mut world, agent, Item::Seal);
    begin_turn(&mut world);
    queue(&mut world, agent, vec![Action::Seal(None)]);
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    let events = resolve(&mut world, &mut rng);

    assert_eq!(
        events,
        vec![Event::SealRefused {
            agent,
            location: Location::new(0, 1)
        }]
    );
    assert_eq!(world.agent(agent).expect("agent exists").item_count(Item::Seal), 1);
    assert!(world.map().tile(Location::new(0, 1)).is_some_and(Tile::is_doorway));
}

#[test]
fn traps_become_owned_hidden_hazards() {
    let mut world = open_field();
    let agent = join(&mut world, "Ada", Location::new(0, 0), 5.0);
    grant(&mut world, agent, Item::Trap);
    begin_turn(&mut world);
    let target = Location::new(3, 3);
    queue(&mut world, agent, vec![Action::Trap(target)]);
    let mut rng = ChaCha8Rng::seed_from_u64(12);

    let events = resolve(&mut world, &mut rng);

    assert_eq!(events, vec![Event::TrapSet { agent, location: target }]);
    assert_eq!(world.map().tile(target), Some(Tile::HiddenHazard));
    assert_eq!(world.hazard_owner(target), Some(agent));
    assert_eq!(world.agent(agent).expect("agent exists").item_count(Item::Trap), 0);
}

#[test]
fn landed_punches_stun_and_spill_collectibles() {
    let mut world = build_world(&["....."; 3], Location::new(2, 4), &[]);
    let puncher = join(&mut world, "Puncher", Location::new(1, 1), 10.0);
    let victim = join(&mut world, "Victim", Location::new(1, 2), 3.0);
    begin_turn(&mut world);
    queue(&mut world, puncher, vec![Action::Punch]);
    let tuning = Tuning {
        punch_success_chance: 1.0,
        ..Tuning::default().without_spawns()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(13);
    let mut events = Vec::new();

    let _ = Resolution::new(tuning).process_tick(&mut world, &mut rng, &mut events);

    let spilled = match events.as_slice() {
        [Event::PunchLanded {
            agent,
            victim: hit,
            spilled,
        }] if *agent == puncher && *hit == victim => *spilled,
        other => panic!("unexpected events {other:?}"),
    };
    assert!((1..=3).contains(&spilled));
    let state = world.agent(victim).expect("victim exists");
    assert!(state.is_stunned());
    assert_eq!(state.points() + f64::from(spilled), 3.0);
    assert_eq!(
        world.map().count(|tile| tile == Tile::Collectible),
        spilled as usize
    );
    assert_eq!(world.agent(puncher).expect("puncher exists").points(), 8.0);
}

#[test]
fn warping_lands_next_to_another_agent_and_causes_sickness() {
    let mut world = open_field();
    let warper = join(&mut world, "Warper", Location::new(0, 0), 20.0);
    let anchor = join(&mut world, "Anchor", Location::new(7, 7), 5.0);
    begin_turn(&mut world);
    queue(&mut world, warper, vec![Action::Warp]);
    let mut rng = ChaCha8Rng::seed_from_u64(14);

    let events = resolve(&mut world, &mut rng);

    let destination = location_of(&world, warper);
    assert!(events.contains(&Event::Warped {
        agent: warper,
        from: Location::new(0, 0),
        to: destination
    }));
    assert!(events.contains(&Event::WarpSickness { agent: warper }));
    let anchor_at = location_of(&world, anchor);
    assert!(destination.row().abs_diff(anchor_at.row()) <= 1);
    assert!(destination.column().abs_diff(anchor_at.column()) <= 1);
    let state = world.agent(warper).expect("warper exists");
    assert!(state.is_stunned());
    assert_eq!(state.points(), 17.0);
}

#[test]
fn repeat_warps_fizzle_for_free_unless_they_shorten_the_way() {
    let mut world = open_field();
    let warper = join(&mut world, "Warper", Location::new(5, 8), 20.0);
    let _anchor = join(&mut world, "Anchor", Location::new(0, 0), 5.0);
    begin_turn(&mut world);
    if let Some(state) = world.agent_mut(warper) {
        state.mark_warped();
    }
    queue(&mut world, warper, vec![Action::Warp]);
    let mut rng = ChaCha8Rng::seed_from_u64(15);

    let events = resolve(&mut world, &mut rng);

    assert!(events.contains(&Event::WarpFizzled { agent: warper }));
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::Warped { .. } | Event::OutOfPoints { .. })));
    assert_eq!(location_of(&world, warper), Location::new(5, 8));
    assert_eq!(world.agent(warper).expect("warper exists").points(), 20.0);
}

#[test]
fn charges_trample_everyone_along_the_lane() {
    let mut world = open_field();
    let charger = join(&mut world, "Charger", Location::new(0, 0), 5.0);
    let victim = join(&mut world, "Victim", Location::new(0, 3), 5.0);
    grant(&mut world, charger, Item::Charge);
    begin_turn(&mut world);
    queue(&mut world, charger, vec![Action::Charge(Location::new(0, 5))]);
    let mut rng = ChaCha8Rng::seed_from_u64(16);

    let events = resolve(&mut world, &mut rng);

    assert_eq!(
        events,
        vec![Event::Charged {
            agent: charger,
            from: Location::new(0, 0),
            to: Location::new(0, 5),
            trampled: vec![victim]
        }]
    );
    assert_eq!(location_of(&world, charger), Location::new(0, 5));
    assert!(world.agent(victim).expect("victim exists").is_stunned());
    let state = world.agent(charger).expect("charger exists");
    assert_eq!(state.item_count(Item::Charge), 0);
    assert!(!state.is_stunned());
}

#[test]
fn blocked_charges_abort_and_stun_the_charger() {
    let mut world = build_world(&["..#.."], Location::new(0, 4), &[]);
    let charger = join(&mut world, "Charger", Location::new(0, 0), 5.0);
    grant(&mut world, charger, Item::Charge);
    begin_turn(&mut world);
    queue(
        &mut world,
        charger,
        vec![Action::Charge(Location::new(0, 3)), Action::Move(Direction::Right)],
    );
    let mut rng = ChaCha8Rng::seed_from_u64(17);

    let events = resolve(&mut world, &mut rng);

    assert_eq!(
        events,
        vec![Event::ChargeAborted {
            agent: charger,
            location: Location::new(0, 3)
        }]
    );
    let state = world.agent(charger).expect("charger exists");
    assert_eq!(state.location(), Location::new(0, 0));
    assert_eq!(state.item_count(Item::Charge), 0);
    assert!(state.is_stunned());
    assert!(!world::query::any_pending(&world));
}

#[test]
fn keys_unlock_adjacent_doorways_without_spending_points() {
    let doorway = Location::new(0, 1);
    let mut world = build_world(&[".+.."], Location::new(0, 3), &[(doorway, 4)]);
    let agent = join(&mut world, "Ada", Location::new(0, 0), 5.0);
    grant(&mut world, agent, Item::Key);
    begin_turn(&mut world);
    queue(&mut world, agent, vec![Action::Key]);
    let mut rng = ChaCha8Rng::seed_from_u64(18);

    let events = resolve(&mut world, &mut rng);

    assert_eq!(
        events,
        vec![Event::DoorwayUnlocked {
            agent,
            location: doorway,
            remaining_cost: 2,
            with_key: true
        }]
    );
    assert_eq!(world.map().tile(doorway), Some(Tile::Doorway { locked: false }));
    let state = world.agent(agent).expect("agent exists");
    assert_eq!(state.points(), 5.0);
    assert_eq!(state.item_count(Item::Key), 0);
}

#[test]
fn keys_are_kept_when_nothing_opens() {
    let mut world = open_field();
    let agent = join(&mut world, "Ada", Location::new(0, 0), 5.0);
    grant(&mut world, agent, Item::Key);
    begin_turn(&mut world);
    queue(&mut world, agent, vec![Action::Key]);
    let mut rng = ChaCha8Rng::seed_from_u64(19);

    let events = resolve(&mut world, &mut rng);

    assert_eq!(
        events,
        vec![Event::Fumbled {
            agent,
            action: Action::Key
        }]
    );
    assert_eq!(world.agent(agent).expect("agent exists").item_count(Item::Key), 1);
}

#[test]
fn collectibles_pay_out_when_stepped_on() {
    let mut world = build_world(&[".*.."], Location::new(0, 3), &[]);
    let agent = join(&mut world, "Ada", Location::new(0, 0), 3.0);
    begin_turn(&mut world);
    queue(&mut world, agent, vec![Action::Move(Direction::Right)]);
    let resolution = Resolution::new(Tuning {
        collectible_reward_min: 2,
        collectible_reward_max: 2,
        ..Tuning::default().without_spawns()
    });
    let mut rng = ChaCha8Rng::seed_from_u64(20);

    let events = resolve_with(&resolution, &mut world, &mut rng);

    assert!(events.contains(&Event::CollectiblePicked {
        agent,
        location: Location::new(0, 1),
        reward: 2.0
    }));
    assert_eq!(world.map().tile(Location::new(0, 1)), Some(Tile::Empty));
    assert_eq!(world.agent(agent).expect("agent exists").points(), 4.0);
}

#[test]
fn chests_hand_out_an_item_from_the_pool() {
    let mut world = build_world(&[".$.."], Location::new(0, 3), &[]);
    let agent = join(&mut world, "Ada", Location::new(0, 0), 3.0);
    begin_turn(&mut world);
    queue(&mut world, agent, vec![Action::Move(Direction::Right)]);
    let mut rng = ChaCha8Rng::seed_from_u64(21);

    let events = resolve(&mut world, &mut rng);

    let found = events
        .iter()
        .find_map(|event| match event {
            Event::ChestOpened {
                agent: opener,
                location,
                item,
            } if *opener == agent && *location == Location::new(0, 1) => Some(*item),
            _ => None,
        })
        .expect("the chest opens");
    assert!(Tuning::default().variant.item_pool().contains(&found));
    assert_eq!(world.map().tile(Location::new(0, 1)), Some(Tile::Empty));
    assert_eq!(world.agent(agent).expect("agent exists").item_count(found), 1);
}

#[test]
fn newcomers_spawn_next_to_the_last_placed_agent() {
    let mut world = open_field();
    let _leader = join(&mut world, "Leader", Location::new(5, 8), 5.0);
    let laggard = join(&mut world, "Laggard", Location::new(0, 0), 5.0);
    world.refresh_ranks();
    assert_eq!(world.agent(laggard).expect("laggard exists").rank(), 2);

    for seed in 0..8 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let spot = spawn::for_newcomer(&world, &mut rng).expect("a free cell exists");
        assert!(spot.row() <= 1 && spot.column() <= 1, "seed {seed}: {spot:?}");
        assert_ne!(spot, Location::new(0, 0));
    }
}

#[test]
fn the_same_seed_replays_the_same_turn() {
    fn play(seed: u64) -> (World, Vec<Event>) {
        let mut world = open_field();
        let ids = [
            join(&mut world, "Ada", Location::new(5, 6), 6.0),
            join(&mut world, "Bo", Location::new(5, 7), 6.0),
            join(&mut world, "Cy", Location::new(4, 7), 6.0),
            join(&mut world, "Di", Location::new(6, 6), 6.0),
        ];
        begin_turn(&mut world);
        queue(&mut world, ids[0], vec![Action::Move(Direction::Right); 3]);
        queue(&mut world, ids[1], vec![Action::Move(Direction::Left); 2]);
        queue(&mut world, ids[2], vec![Action::Move(Direction::Down); 2]);
        queue(
            &mut world,
            ids[3],
            vec![Action::Move(Direction::Up), Action::Move(Direction::Right)],
        );
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let events = resolve(&mut world, &mut rng);
        (world, events)
    }

    let (first_world, first_events) = play(99);
    let (second_world, second_events) = play(99);
    assert_eq!(first_events, second_events);
    assert_eq!(first_world, second_world);

    let occupied: std::collections::BTreeSet<Location> = first_world
        .agents()
        .filter(|agent| !agent.is_finished())
        .map(|agent| agent.location())
        .collect();
    let unfinished = first_world
        .agents()
        .filter(|agent| !agent.is_finished())
        .count();
    assert_eq!(occupied.len(), unfinished);
}
