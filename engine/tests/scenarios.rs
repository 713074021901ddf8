use outbreak_core::{CellCoord, Command, EntityId, EntityKind, Event, Spawn};
use outbreak_engine::{EngineConfig, TickEngine};
use outbreak_world::{self as world, query, World};

struct Setup {
    world: World,
}

impl Setup {
    fn grid(width: u32, height: u32) -> Self {
        Self {
            world: World::with_dimensions(width, height).expect("non-empty grid"),
        }
    }

    fn spawn(&mut self, spawn: Spawn, column: u32, row: u32) -> EntityId {
        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::SpawnEntity {
                spawn,
                cell: CellCoord::new(column, row),
            },
            &mut events,
        )
        .expect("spawn applies");
        match events.as_slice() {
            [Event::EntitySpawned { entity, .. }] => *entity,
            other => panic!("spawn rejected: {other:?}"),
        }
    }

    fn weapon(&mut self, column: u32, row: u32) {
        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::PlaceWeapon {
                cell: CellCoord::new(column, row),
            },
            &mut events,
        )
        .expect("weapon placement applies");
    }

    fn engine(self, seed: u64) -> TickEngine {
        TickEngine::new(
            self.world,
            EngineConfig {
                rng_seed: seed,
                ..EngineConfig::default()
            },
        )
    }
}

fn cell_of(engine: &TickEngine, id: EntityId) -> Option<CellCoord> {
    query::entity(engine.world(), id).map(|snapshot| snapshot.cell)
}

#[test]
fn lone_zombie_eventually_infects_wandering_human() {
    let mut setup = Setup::grid(10, 10);
    let zombie = setup.spawn(Spawn::Zombie, 0, 0);
    let human = setup.spawn(Spawn::Human { armed: false }, 5, 5);
    let mut engine = setup.engine(21);

    let mut infected_at = None;
    for _ in 0..2_000 {
        let report = engine.try_tick().expect("tick succeeds");
        if report.events.iter().any(|event| {
            matches!(event, Event::HumanInfected { entity, .. } if *entity == human)
        }) {
            infected_at = Some(report.tick);
            break;
        }
    }

    assert!(infected_at.is_some(), "zombie never caught the human");
    let turned = query::entity(engine.world(), human).expect("identifier survives infection");
    assert_eq!(turned.kind, EntityKind::Zombie);
    assert!(query::entity(engine.world(), zombie).is_some());
    assert_eq!(engine.census().zombies, 2);
    assert_eq!(engine.census().humans, 0);
}

#[test]
fn zombie_pursuit_wraps_across_the_edge() {
    let mut setup = Setup::grid(10, 10);
    let zombie = setup.spawn(Spawn::Zombie, 9, 5);
    let _ = setup.spawn(Spawn::Human { armed: false }, 2, 5);
    let mut engine = setup.engine(3);

    let report = engine.try_tick().expect("tick succeeds");

    assert!(report.events.contains(&Event::EntityMoved {
        entity: zombie,
        from: CellCoord::new(9, 5),
        to: CellCoord::new(0, 5),
    }));
    assert_eq!(cell_of(&engine, zombie), Some(CellCoord::new(0, 5)));
}

#[test]
fn wandering_human_arms_itself_on_the_weapon_cell() {
    let mut setup = Setup::grid(5, 5);
    let human = setup.spawn(Spawn::Human { armed: false }, 2, 2);
    setup.weapon(3, 2);
    let mut engine = setup.engine(8);

    let mut pickup = None;
    for _ in 0..2_000 {
        let report = engine.try_tick().expect("tick succeeds");
        pickup = report.events.into_iter().find_map(|event| match event {
            Event::WeaponPickedUp { human: who, cell, .. } if who == human => Some(cell),
            _ => None,
        });
        if pickup.is_some() {
            break;
        }
    }

    assert_eq!(pickup, Some(CellCoord::new(3, 2)));
    assert!(query::entity(engine.world(), human).is_some_and(|snapshot| snapshot.is_armed_human()));
    assert!(query::weapon_view(engine.world()).is_empty());
}

#[test]
fn armed_human_kills_adjacent_zombie_without_moving() {
    let mut setup = Setup::grid(10, 10);
    let human = setup.spawn(Spawn::Human { armed: true }, 4, 4);
    let zombie = setup.spawn(Spawn::Zombie, 4, 5);
    let mut engine = setup.engine(5);

    let report = engine.try_tick().expect("tick succeeds");

    assert!(report.events.contains(&Event::ZombieDefeated {
        attacker: human,
        zombie,
        cell: CellCoord::new(4, 5),
    }));
    assert!(query::entity(engine.world(), zombie).is_none());
    let snapshot = query::entity(engine.world(), human).expect("human survives");
    let state = snapshot.human.expect("still human");
    assert_eq!(state.weapon_cooldown, 5);
    assert!(state.attacked_this_tick);
    assert_eq!(snapshot.cell, CellCoord::new(4, 4));
    assert!(snapshot.pending_action.is_none());
}

#[test]
fn weapon_cooldown_counts_down_one_per_tick() {
    let mut setup = Setup::grid(10, 10);
    let human = setup.spawn(Spawn::Human { armed: true }, 4, 4);
    let _ = setup.spawn(Spawn::Zombie, 5, 4);
    let mut engine = setup.engine(13);

    let mut cooldowns = Vec::new();
    for _ in 0..7 {
        let _ = engine.try_tick().expect("tick succeeds");
        let state = query::entity(engine.world(), human)
            .and_then(|snapshot| snapshot.human)
            .expect("human survives");
        cooldowns.push(state.weapon_cooldown);
    }

    assert_eq!(cooldowns, vec![5, 4, 3, 2, 1, 0, 0]);
}

#[test]
fn zombies_contending_for_one_cell_both_stay() {
    let mut setup = Setup::grid(10, 10);
    let left = setup.spawn(Spawn::Zombie, 0, 0);
    let right = setup.spawn(Spawn::Zombie, 2, 0);
    let _ = setup.spawn(Spawn::Human { armed: false }, 1, 2);
    let mut engine = setup.engine(1);

    let report = engine.try_tick().expect("tick succeeds");

    assert!(report.events.contains(&Event::IntentDeclared {
        entity: left,
        target: CellCoord::new(1, 1),
    }));
    assert!(report.events.contains(&Event::IntentDeclared {
        entity: right,
        target: CellCoord::new(1, 1),
    }));
    assert_eq!(cell_of(&engine, left), Some(CellCoord::new(0, 0)));
    assert_eq!(cell_of(&engine, right), Some(CellCoord::new(2, 0)));
}

#[test]
fn nobody_ever_enters_an_obstacle_cell() {
    let mut setup = Setup::grid(5, 5);
    let wall = setup.spawn(Spawn::Obstacle, 4, 4);
    let human = setup.spawn(Spawn::Human { armed: false }, 3, 4);
    let mut engine = setup.engine(34);

    for _ in 0..300 {
        let _ = engine.try_tick().expect("tick succeeds");
        assert_ne!(cell_of(&engine, human), Some(CellCoord::new(4, 4)));
        assert_eq!(cell_of(&engine, wall), Some(CellCoord::new(4, 4)));
    }
}

#[test]
fn tick_reports_follow_phase_order() {
    let mut setup = Setup::grid(10, 10);
    let _ = setup.spawn(Spawn::Human { armed: true }, 4, 4);
    let _ = setup.spawn(Spawn::Zombie, 4, 5);
    let _ = setup.spawn(Spawn::Zombie, 8, 8);
    let mut engine = setup.engine(2);

    let report = engine.tick();

    assert!(!report.aborted);
    let position = |predicate: fn(&Event) -> bool| report.events.iter().position(predicate);
    let started = position(|event| matches!(event, Event::TickStarted { .. }));
    let defeated = position(|event| matches!(event, Event::ZombieDefeated { .. }));
    let declared = position(|event| matches!(event, Event::IntentDeclared { .. }));
    let moved = position(|event| matches!(event, Event::EntityMoved { .. }));

    assert_eq!(started, Some(0));
    assert!(defeated > started);
    assert!(declared > defeated);
    assert!(moved > declared);
}
