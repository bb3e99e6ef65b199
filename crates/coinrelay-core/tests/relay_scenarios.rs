//! End-to-end relay scenarios on a single game.
//!
//! Games are driven through the lifecycle functions in `coinrelay_core::game`
//! with a seeded RNG and an explicit timestamp, so every run is
//! reproducible.

#![allow(clippy::unwrap_used, clippy::panic, clippy::arithmetic_side_effects)]

use std::sync::Arc;

use coinrelay_core::relay::sub_group_closed;
use coinrelay_core::{GameRegistry, ManualClock, RelayError, game};
use coinrelay_types::{
    Game, GameStatus, ParticipantId, ParticipantStatus, RelayEffect, ROUND_COUNT, UNITS_PER_ROUND,
    UnitId,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn new_game(names: &[&str]) -> (Game, Vec<ParticipantId>) {
    let mut game = game::create_game(0);
    let ids = names
        .iter()
        .map(|name| game::add_participant(&mut game, name).unwrap())
        .collect();
    (game, ids)
}

fn started_game(names: &[&str], rng: &mut SmallRng) -> (Game, Vec<ParticipantId>) {
    let (mut game, ids) = new_game(names);
    game::start_game(&mut game, 0, rng).unwrap();
    (game, ids)
}

fn current_units(game: &Game, participant: ParticipantId) -> Vec<UnitId> {
    game.participant(participant)
        .map(|p| p.current_units.clone())
        .unwrap_or_default()
}

/// Current units of `participant` belonging to `(round, sub_group)`.
fn current_in(game: &Game, participant: ParticipantId, round: u32, sub_group: u32) -> Vec<UnitId> {
    current_units(game, participant)
        .into_iter()
        .filter(|id| game.unit(*id).is_some_and(|u| u.belongs_to(round, sub_group)))
        .collect()
}

fn complete_all(
    game: &mut Game,
    participant: ParticipantId,
    units: &[UnitId],
    rng: &mut SmallRng,
) -> Vec<RelayEffect> {
    let mut effects = Vec::new();
    for unit in units {
        effects.extend(game::complete_unit(game, participant, *unit, 0, rng).unwrap());
    }
    effects
}

/// Complete units for the lowest-positioned participant with work until
/// `stop` says so or nobody has anything left.
fn drive_until(game: &mut Game, rng: &mut SmallRng, stop: impl Fn(&Game) -> bool) {
    while !stop(game) {
        let next = game
            .participants
            .iter()
            .find_map(|p| p.current_units.first().map(|unit| (p.id, *unit)));
        let Some((participant, unit)) = next else {
            return;
        };
        game::complete_unit(game, participant, unit, 0, rng).unwrap();
    }
}

fn owned_in_round(game: &Game, participant: ParticipantId, round: u32) -> usize {
    game.units_owned_by(participant)
        .filter(|u| u.round == round)
        .count()
}

#[test]
fn round_one_flows_through_three_participants() {
    let mut rng = SmallRng::seed_from_u64(1);
    let (mut game, ids) = started_game(&["Ada", "Bo", "Cy"], &mut rng);
    let [p0, p1, p2] = ids.as_slice() else {
        panic!("expected three participants");
    };

    let round_one = current_units(&game, *p0);
    assert_eq!(round_one.len(), 20);
    let effects = complete_all(&mut game, *p0, &round_one, &mut rng);

    assert!(effects.iter().any(|e| matches!(
        e,
        RelayEffect::SubGroupForwarded { round: 1, sub_group: 0, unit_count: 20, .. }
    )));
    assert_eq!(current_units(&game, *p1).len(), 20);
    assert_eq!(
        game.participant(*p1).map(|p| p.status),
        Some(ParticipantStatus::Active)
    );
    assert_eq!(
        game.participant(*p0).map(|p| p.status),
        Some(ParticipantStatus::Waiting)
    );
    assert_eq!(game.units.len(), 40);

    let units = current_units(&game, *p1);
    complete_all(&mut game, *p1, &units, &mut rng);
    assert_eq!(current_units(&game, *p2).len(), 20);

    let units = current_units(&game, *p2);
    let effects = complete_all(&mut game, *p2, &units, &mut rng);
    assert!(effects.contains(&RelayEffect::RoundAdvanced { round: 2 }));
    assert_eq!(game.current_round, 2);

    // Round 2 lands on the first participant with one shared side.
    let round_two = current_units(&game, *p0);
    assert_eq!(round_two.len(), 20);
    let sides: Vec<_> = round_two
        .iter()
        .filter_map(|id| game.unit(*id).map(|u| u.side))
        .collect();
    assert!(sides.windows(2).all(|w| w.first() == w.last()));
    assert_eq!(
        game.participant(*p0).map(|p| p.current_round),
        Some(2)
    );
}

#[test]
fn second_sub_group_is_queued_while_downstream_is_busy() {
    let mut rng = SmallRng::seed_from_u64(2);
    let (mut game, ids) = started_game(&["Ada", "Bo"], &mut rng);
    let [p0, p1] = ids.as_slice() else {
        panic!("expected two participants");
    };

    drive_until(&mut game, &mut rng, |g| {
        g.current_round == 3 && !current_units(g, *p0).is_empty()
    });
    assert_eq!(game.current_round, 3);

    // Out of order: sub-group 2 first, then sub-group 0.
    let group_two = current_in(&game, *p0, 3, 2);
    assert_eq!(group_two.len(), 5);
    complete_all(&mut game, *p0, &group_two, &mut rng);
    let held = current_units(&game, *p1);
    assert_eq!(held.len(), 5);
    assert!(held
        .iter()
        .all(|id| game.unit(*id).is_some_and(|u| u.sub_group == 2)));

    let group_zero = current_in(&game, *p0, 3, 0);
    let effects = complete_all(&mut game, *p0, &group_zero, &mut rng);
    assert!(effects.iter().any(|e| matches!(
        e,
        RelayEffect::SubGroupQueued { round: 3, sub_group: 0, .. }
    )));
    let downstream = game.participant(*p1).unwrap();
    assert_eq!(downstream.current_units.len(), 5);
    assert_eq!(downstream.queue.get(&3).map(Vec::len), Some(5));

    // Finishing sub-group 2 pulls the queued sub-group 0 forward.
    complete_all(&mut game, *p1, &held, &mut rng);
    let after = current_units(&game, *p1);
    assert_eq!(after.len(), 5);
    assert!(after
        .iter()
        .all(|id| game.unit(*id).is_some_and(|u| u.sub_group == 0)));
    assert!(game.participant(*p1).unwrap().queue.is_empty());
}

#[test]
fn downstream_waits_when_it_runs_dry() {
    let mut rng = SmallRng::seed_from_u64(3);
    let (mut game, ids) = started_game(&["Ada", "Bo"], &mut rng);
    let [p0, p1] = ids.as_slice() else {
        panic!("expected two participants");
    };
    drive_until(&mut game, &mut rng, |g| g.current_round == 2);

    let first_half = current_in(&game, *p0, 2, 0);
    complete_all(&mut game, *p0, &first_half, &mut rng);
    let forwarded = current_units(&game, *p1);
    assert_eq!(forwarded.len(), 10);

    let effects = complete_all(&mut game, *p1, &forwarded, &mut rng);
    assert!(effects.iter().any(|e| matches!(
        e,
        RelayEffect::ParticipantStarved { round: 2, .. }
    )));
    let downstream = game.participant(*p1).unwrap();
    assert_eq!(downstream.status, ParticipantStatus::Waiting);
    // Ten of twenty units done is not a finished round.
    assert!(!downstream.round_durations.contains_key(&2));
    assert_eq!(game.current_round, 2);
}

#[test]
fn full_game_completes_for_two_and_three_participants() {
    for names in [&["Ada", "Bo"][..], &["Ada", "Bo", "Cy"][..]] {
        let mut rng = SmallRng::seed_from_u64(4);
        let (mut game, ids) = started_game(names, &mut rng);
        drive_until(&mut game, &mut rng, |g| g.status == GameStatus::Completed);

        assert_eq!(game.status, GameStatus::Completed);
        assert!(game.finished_at_ms.is_some());
        let expected_units = 20 * 4 * names.len();
        assert_eq!(game.units.len(), expected_units);
        assert!(game.units.iter().all(|u| u.is_completed()));

        for participant in &game.participants {
            assert_eq!(participant.status, ParticipantStatus::Idle);
            assert!(participant.current_units.is_empty());
            assert!(participant.queue.is_empty());
            assert_eq!(participant.round_durations.len(), 4);
            for round in 1..=ROUND_COUNT {
                let owned = owned_in_round(&game, participant.id, round);
                assert_eq!(u32::try_from(owned).ok(), Some(UNITS_PER_ROUND));
            }
        }

        let last = ids.last().copied().unwrap();
        let any_unit = game.units.first().map(|u| u.id).unwrap();
        let result = game::complete_unit(&mut game, last, any_unit, 0, &mut rng);
        assert!(matches!(result, Err(RelayError::InvalidState { .. })));
    }
}

#[test]
fn join_after_start_is_rejected() {
    let mut rng = SmallRng::seed_from_u64(5);
    let (mut game, _) = started_game(&["Ada", "Bo"], &mut rng);
    let result = game::add_participant(&mut game, "Late");
    assert!(matches!(result, Err(RelayError::InvalidState { .. })));
    assert_eq!(game.participants.len(), 2);
}

#[test]
fn completing_the_same_unit_twice_is_rejected() {
    let mut rng = SmallRng::seed_from_u64(6);
    let (mut game, ids) = started_game(&["Ada", "Bo"], &mut rng);
    let p0 = *ids.first().unwrap();
    let unit = *current_units(&game, p0).first().unwrap();

    game::complete_unit(&mut game, p0, unit, 0, &mut rng).unwrap();
    let again = game::complete_unit(&mut game, p0, unit, 0, &mut rng);
    assert!(matches!(again, Err(RelayError::NotOwned { .. })));
}

#[test]
fn random_play_never_breaks_the_gate() {
    for seed in 0..20 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let (mut game, _) = started_game(&["Ada", "Bo", "Cy", "Di"], &mut rng);

        while game.status == GameStatus::InProgress {
            let busy: Vec<(ParticipantId, Vec<UnitId>)> = game
                .participants
                .iter()
                .filter(|p| !p.current_units.is_empty())
                .map(|p| (p.id, p.current_units.clone()))
                .collect();
            assert!(!busy.is_empty(), "seed {seed}: game stalled");

            let (participant, units) = busy
                .get(rng.random_range(0..busy.len()))
                .cloned()
                .unwrap();
            let unit = *units.get(rng.random_range(0..units.len())).unwrap();
            game::complete_unit(&mut game, participant, unit, 0, &mut rng).unwrap();

            // Every actionable unit downstream must come from a sub-group
            // the predecessor has already finished.
            for pair in game.participants.windows(2) {
                let (Some(prev), Some(next)) = (pair.first(), pair.last()) else {
                    continue;
                };
                for id in &next.current_units {
                    let unit = game.unit(*id).unwrap();
                    assert!(
                        sub_group_closed(&game, prev.id, unit.round, unit.sub_group),
                        "seed {seed}: gate violated"
                    );
                }
            }

            // No participant ever holds more than one copy of a round.
            for participant in &game.participants {
                for round in 1..=ROUND_COUNT {
                    assert!(owned_in_round(&game, participant.id, round) <= 20);
                }
            }
        }
        assert_eq!(game.status, GameStatus::Completed, "seed {seed}");
    }
}

#[test]
fn registry_records_round_durations_from_clock() {
    let clock = Arc::new(ManualClock::new(1_000));
    let registry = GameRegistry::with_clock(Arc::clone(&clock) as Arc<dyn coinrelay_core::Clock>);
    let game_id = registry.create_game();
    let p0 = registry.add_participant(game_id, "Ada").unwrap();
    let p1 = registry.add_participant(game_id, "Bo").unwrap();
    registry.start_game(game_id).unwrap();

    clock.advance(4_000);
    let units = current_units(&registry.get_state(game_id).unwrap(), p0);
    for unit in &units {
        registry.complete_unit(game_id, p0, *unit).unwrap();
    }

    let state = registry.get_state(game_id).unwrap();
    let first = state.participant(p0).unwrap();
    assert_eq!(first.round_durations.get(&1).copied(), Some(4_000));
    let second = state.participant(p1).unwrap();
    assert_eq!(second.round_started_at.get(&1).copied(), Some(5_000));
}

#[test]
fn registry_evicts_completed_games_after_retention() {
    let clock = Arc::new(ManualClock::new(0));
    let registry = GameRegistry::with_clock(Arc::clone(&clock) as Arc<dyn coinrelay_core::Clock>);
    let finished = registry.create_game();
    let open = registry.create_game();
    registry.add_participant(finished, "Ada").unwrap();
    registry.add_participant(finished, "Bo").unwrap();
    registry.start_game(finished).unwrap();

    loop {
        let state = registry.get_state(finished).unwrap();
        if state.status == GameStatus::Completed {
            break;
        }
        let (participant, unit) = state
            .participants
            .iter()
            .find_map(|p| p.current_units.first().map(|u| (p.id, *u)))
            .unwrap();
        registry.complete_unit(finished, participant, unit).unwrap();
    }

    assert!(registry.evict_completed(60_000).is_empty());
    clock.advance(60_000);
    assert_eq!(registry.evict_completed(60_000), vec![finished]);
    assert!(!registry.game_exists(finished));
    assert!(registry.game_exists(open));
}

#[test]
fn concurrent_completions_on_one_game_stay_consistent() {
    let registry = GameRegistry::new();
    let game_id = registry.create_game();
    let p0 = registry.add_participant(game_id, "Ada").unwrap();
    registry.add_participant(game_id, "Bo").unwrap();
    registry.start_game(game_id).unwrap();
    let units = current_units(&registry.get_state(game_id).unwrap(), p0);

    std::thread::scope(|scope| {
        for chunk in units.chunks(5) {
            let registry = &registry;
            scope.spawn(move || {
                for unit in chunk {
                    registry.complete_unit(game_id, p0, *unit).unwrap();
                }
            });
        }
    });

    let state = registry.get_state(game_id).unwrap();
    assert_eq!(state.units.len(), 40);
    let forwards = state
        .participants
        .get(1)
        .map(|p| p.current_units.len())
        .unwrap();
    assert_eq!(forwards, 20);
}
