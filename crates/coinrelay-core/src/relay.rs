//! Relay engine: gating, activation, unit completion, and forwarding.
//!
//! Work moves downstream one sub-group at a time. When a participant has
//! flipped every unit of a sub-group, the sub-group is cloned for the next
//! participant in pipeline order and either activated straight away or
//! parked in their queue until the gating rule lets them start it.
//! Forwarding at sub-group granularity is what lets a downstream
//! participant begin while the upstream one is still on later sub-groups
//! of the same round.
//!
//! All functions operate on a `&mut Game` that the caller has exclusive
//! access to, and append what they did to an effects log.

use coinrelay_types::{Game, Participant, ParticipantId, RelayEffect, Unit, UnitId, UnitStatus};
use rand::Rng;
use tracing::debug;

use crate::error::RelayError;
use crate::round;
use crate::schedule;
use crate::transition::{ParticipantEvent, participant_transition};

/// Participant at pipeline position `index`.
pub(crate) fn participant_at(game: &Game, index: usize) -> Result<&Participant, RelayError> {
    game.participants.get(index).ok_or_else(|| {
        RelayError::invalid_state(format!("no participant at pipeline position {index}"))
    })
}

/// Mutable participant at pipeline position `index`.
pub(crate) fn participant_at_mut(
    game: &mut Game,
    index: usize,
) -> Result<&mut Participant, RelayError> {
    game.participants.get_mut(index).ok_or_else(|| {
        RelayError::invalid_state(format!("no participant at pipeline position {index}"))
    })
}

/// Whether `owner` holds at least one unit of `(round, sub_group)` and has
/// completed all of them.
pub fn sub_group_closed(game: &Game, owner: ParticipantId, round: u32, sub_group: u32) -> bool {
    let mut members = game
        .units_owned_by(owner)
        .filter(|u| u.belongs_to(round, sub_group))
        .peekable();
    members.peek().is_some() && members.all(Unit::is_completed)
}

/// Whether `owner` has received and completed every unit of `round`.
///
/// Holding only some of the round (the rest still upstream) does not
/// count, even if all held units are completed.
pub fn round_closed(game: &Game, owner: ParticipantId, round: u32) -> bool {
    let Some(total) = schedule::round_total(round) else {
        return false;
    };

    let mut held = 0_u32;
    for unit in game.units_owned_by(owner).filter(|u| u.round == round) {
        if !unit.is_completed() {
            return false;
        }
        held = held.saturating_add(1);
    }
    held == total
}

/// Gating rule: may the participant at `index` start its queued work for
/// `round` now?
///
/// 1. Not while it still holds actionable units.
/// 2. Not without queued units for `round`.
/// 3. Always for the first participant.
/// 4. Otherwise only once the preceding participant holds and has
///    completed the sub-group the queued units belong to.
pub fn can_activate(game: &Game, index: usize, round: u32) -> bool {
    let Some(participant) = game.participants.get(index) else {
        return false;
    };
    if participant.has_current_units() {
        return false;
    }
    let Some(queued) = participant.queue.get(&round).filter(|q| !q.is_empty()) else {
        return false;
    };
    if participant.order == 0 {
        return true;
    }

    let Some(sub_group) = queued
        .first()
        .and_then(|id| game.unit(*id))
        .map(|u| u.sub_group)
    else {
        return false;
    };
    let Some(previous) = index
        .checked_sub(1)
        .and_then(|i| game.participants.get(i))
    else {
        return false;
    };

    sub_group_closed(game, previous.id, round, sub_group)
}

/// Move the participant's queued units for `round` into its actionable set.
///
/// The round's start time is stamped only on the first activation within
/// that round. A missing queue entry is a no-op.
///
/// # Errors
///
/// Returns [`RelayError::InvalidState`] if `index` is out of range or the
/// participant is idle.
pub fn activate(
    game: &mut Game,
    index: usize,
    round: u32,
    now_ms: i64,
    effects: &mut Vec<RelayEffect>,
) -> Result<(), RelayError> {
    let participant = participant_at_mut(game, index)?;
    let status = participant_transition(participant.status, ParticipantEvent::Activated)?;
    let Some(queued) = participant.queue.remove(&round) else {
        return Ok(());
    };

    let unit_count = queued.len();
    participant.current_units.extend(queued);
    participant.current_round = round;
    participant.status = status;
    participant.round_started_at.entry(round).or_insert(now_ms);

    debug!(participant = %participant.id, round, unit_count, "Participant activated");
    effects.push(RelayEffect::ParticipantActivated {
        participant: participant.id,
        round,
        unit_count,
    });
    Ok(())
}

/// Activate the lowest queued round that passes the gating rule.
///
/// Returns whether anything was activated.
///
/// # Errors
///
/// Propagates errors from [`activate`].
pub fn activate_ready(
    game: &mut Game,
    index: usize,
    now_ms: i64,
    effects: &mut Vec<RelayEffect>,
) -> Result<bool, RelayError> {
    let rounds = participant_at(game, index)?.queued_rounds();
    for round in rounds {
        if can_activate(game, index, round) {
            activate(game, index, round, now_ms, effects)?;
            return Ok(true);
        }
    }
    Ok(false)
}

/// Clone a completed sub-group for the next participant in pipeline order.
///
/// Does nothing for the last participant or for a sub-group that is not
/// fully completed. A sub-group is forwarded at most once: if the next
/// participant already holds any unit of `(round, sub_group)` the call is
/// skipped. Returns whether clones were created.
///
/// # Errors
///
/// Returns [`RelayError::InvalidState`] if `from_index` is out of range or
/// activation of the downstream participant fails.
pub fn forward(
    game: &mut Game,
    from_index: usize,
    round: u32,
    sub_group: u32,
    now_ms: i64,
    effects: &mut Vec<RelayEffect>,
) -> Result<bool, RelayError> {
    let from = participant_at(game, from_index)?.id;
    let Some(next_index) = from_index
        .checked_add(1)
        .filter(|i| *i < game.participants.len())
    else {
        return Ok(false);
    };
    let to = participant_at(game, next_index)?.id;

    if game.owns_sub_group(to, round, sub_group) {
        debug!(%from, %to, round, sub_group, "Sub-group already forwarded, skipping");
        effects.push(RelayEffect::ForwardSkipped {
            from,
            to,
            round,
            sub_group,
        });
        return Ok(false);
    }
    if !sub_group_closed(game, from, round, sub_group) {
        return Ok(false);
    }

    let clones: Vec<Unit> = game
        .units_owned_by(from)
        .filter(|u| u.belongs_to(round, sub_group))
        .map(|u| u.derive_for_participant(to))
        .collect();
    let clone_ids: Vec<UnitId> = clones.iter().map(|u| u.id).collect();
    let unit_count = clones.len();
    game.units.extend(clones);
    participant_at_mut(game, next_index)?
        .queue
        .entry(round)
        .or_default()
        .extend(clone_ids);

    debug!(%from, %to, round, sub_group, unit_count, "Sub-group forwarded");
    effects.push(RelayEffect::SubGroupForwarded {
        from,
        to,
        round,
        sub_group,
        unit_count,
    });

    if can_activate(game, next_index, round) {
        activate(game, next_index, round, now_ms, effects)?;
    } else {
        effects.push(RelayEffect::SubGroupQueued {
            participant: to,
            round,
            sub_group,
        });
    }
    Ok(true)
}

/// Complete one unit and run whatever cascade it triggers.
///
/// Closing a sub-group forwards it downstream. Closing the whole round
/// hands over to the round controller. A participant left with nothing
/// actionable picks up gated queue entries, or waits for upstream work.
///
/// # Errors
///
/// - [`RelayError::ParticipantNotFound`] if the participant is not in the game.
/// - [`RelayError::UnitNotFound`] if the unit does not exist.
/// - [`RelayError::NotOwned`] if the unit is not in the participant's
///   actionable set.
pub fn complete_unit(
    game: &mut Game,
    participant_id: ParticipantId,
    unit_id: UnitId,
    now_ms: i64,
    rng: &mut impl Rng,
    effects: &mut Vec<RelayEffect>,
) -> Result<(), RelayError> {
    let index = game
        .participant_index(participant_id)
        .ok_or(RelayError::ParticipantNotFound(participant_id))?;
    let unit = game.unit(unit_id).ok_or(RelayError::UnitNotFound(unit_id))?;
    let actionable =
        unit.is_owned_by(participant_id) && participant_at(game, index)?.holds_current(unit_id);
    if !actionable {
        return Err(RelayError::NotOwned {
            unit: unit_id,
            participant: participant_id,
        });
    }
    let (round, sub_group) = (unit.round, unit.sub_group);

    if let Some(unit) = game.unit_mut(unit_id) {
        unit.status = UnitStatus::Completed;
    }
    let participant = participant_at_mut(game, index)?;
    participant.current_units.retain(|id| *id != unit_id);
    participant.completed_units.push(unit_id);
    effects.push(RelayEffect::UnitCompleted {
        participant: participant_id,
        unit: unit_id,
        round,
        sub_group,
    });

    if sub_group_closed(game, participant_id, round, sub_group) {
        debug!(participant = %participant_id, round, sub_group, "Sub-group closed");
        forward(game, index, round, sub_group, now_ms, effects)?;
    }

    if round_closed(game, participant_id, round) {
        round::on_round_complete(game, index, round, now_ms, rng, effects)?;
    } else if !participant_at(game, index)?.has_current_units()
        && !activate_ready(game, index, now_ms, effects)?
    {
        let participant = participant_at_mut(game, index)?;
        participant.status = participant_transition(participant.status, ParticipantEvent::Starved)?;
        debug!(participant = %participant_id, round, "Waiting for upstream work");
        effects.push(RelayEffect::ParticipantStarved {
            participant: participant_id,
            round,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use coinrelay_types::{ParticipantStatus, TargetSide};

    use super::*;

    /// Two participants, round 3 seeded to the first participant.
    fn round_three_pair() -> Game {
        let mut game = Game::new(0);
        game.participants.push(Participant::new(String::from("Ada"), 0));
        game.participants.push(Participant::new(String::from("Bo"), 1));

        let first = game.participants.first().map(|p| p.id).unwrap_or_default();
        let mut units = schedule::build_round(3, TargetSide::Heads).unwrap_or_default();
        for unit in &mut units {
            unit.owner = Some(first);
        }
        let ids: Vec<UnitId> = units.iter().map(|u| u.id).collect();
        game.units.extend(units);
        if let Some(p) = game.participants.first_mut() {
            p.current_units = ids;
            p.current_round = 3;
            p.status = ParticipantStatus::Active;
        }
        game
    }

    fn ids_in(game: &Game, owner: ParticipantId, round: u32, sub_group: u32) -> Vec<UnitId> {
        game.units_owned_by(owner)
            .filter(|u| u.belongs_to(round, sub_group))
            .map(|u| u.id)
            .collect()
    }

    fn mark_completed(game: &mut Game, ids: &[UnitId]) {
        for unit in &mut game.units {
            if ids.contains(&unit.id) {
                unit.status = UnitStatus::Completed;
            }
        }
    }

    #[test]
    fn sub_group_closed_requires_members() {
        let game = round_three_pair();
        let second = game.participants.get(1).map(|p| p.id).unwrap_or_default();
        assert!(!sub_group_closed(&game, second, 3, 0));
    }

    #[test]
    fn forward_skips_open_sub_group() {
        let mut game = round_three_pair();
        let mut effects = Vec::new();
        let forwarded = forward(&mut game, 0, 3, 1, 0, &mut effects);
        assert_eq!(forwarded.ok(), Some(false));
        assert!(effects.is_empty());
    }

    #[test]
    fn forward_is_idempotent() {
        let mut game = round_three_pair();
        let first = game.participants.first().map(|p| p.id).unwrap_or_default();
        let ids = ids_in(&game, first, 3, 1);
        mark_completed(&mut game, &ids);

        let mut effects = Vec::new();
        assert_eq!(forward(&mut game, 0, 3, 1, 10, &mut effects).ok(), Some(true));
        let after_first = game.units.len();
        assert_eq!(forward(&mut game, 0, 3, 1, 20, &mut effects).ok(), Some(false));
        assert_eq!(game.units.len(), after_first);
        assert!(matches!(
            effects.last(),
            Some(RelayEffect::ForwardSkipped { sub_group: 1, .. })
        ));
    }

    #[test]
    fn forward_from_last_participant_is_noop() {
        let mut game = round_three_pair();
        let mut effects = Vec::new();
        assert_eq!(forward(&mut game, 1, 3, 0, 0, &mut effects).ok(), Some(false));
        assert!(effects.is_empty());
    }

    #[test]
    fn forwarded_idle_participant_is_activated() {
        let mut game = round_three_pair();
        let first = game.participants.first().map(|p| p.id).unwrap_or_default();
        let ids = ids_in(&game, first, 3, 2);
        mark_completed(&mut game, &ids);

        let mut effects = Vec::new();
        let _ = forward(&mut game, 0, 3, 2, 500, &mut effects);

        let second = game.participants.get(1);
        assert!(second.is_some());
        if let Some(second) = second {
            assert_eq!(second.status, ParticipantStatus::Active);
            assert_eq!(second.current_units.len(), 5);
            assert_eq!(second.current_round, 3);
            assert_eq!(second.round_started_at.get(&3).copied(), Some(500));
            assert!(second.queue.is_empty());
        }
    }

    #[test]
    fn busy_participant_gets_queued_work() {
        let mut game = round_three_pair();
        let first = game.participants.first().map(|p| p.id).unwrap_or_default();
        for sub_group in [0, 1] {
            let ids = ids_in(&game, first, 3, sub_group);
            mark_completed(&mut game, &ids);
        }

        let mut effects = Vec::new();
        let _ = forward(&mut game, 0, 3, 0, 100, &mut effects);
        let _ = forward(&mut game, 0, 3, 1, 200, &mut effects);

        let second = game.participants.get(1);
        assert!(second.is_some());
        if let Some(second) = second {
            assert_eq!(second.current_units.len(), 5);
            assert_eq!(second.queue.get(&3).map(Vec::len), Some(5));
            // First activation stamps the round; later ones never move it.
            assert_eq!(second.round_started_at.get(&3).copied(), Some(100));
        }
        assert!(matches!(
            effects.last(),
            Some(RelayEffect::SubGroupQueued { sub_group: 1, .. })
        ));
    }

    #[test]
    fn gate_holds_until_predecessor_finishes() {
        let mut game = round_three_pair();
        let first = game.participants.first().map(|p| p.id).unwrap_or_default();
        // Park a clone of sub-group 0 in the second participant's queue
        // without the upstream having finished it.
        let clones: Vec<Unit> = game
            .units_owned_by(first)
            .filter(|u| u.belongs_to(3, 0))
            .map(|u| {
                u.derive_for_participant(
                    game.participants.get(1).map(|p| p.id).unwrap_or_default(),
                )
            })
            .collect();
        let clone_ids: Vec<UnitId> = clones.iter().map(|u| u.id).collect();
        game.units.extend(clones);
        if let Some(p) = game.participants.get_mut(1) {
            p.queue.insert(3, clone_ids);
        }

        assert!(!can_activate(&game, 1, 3));
        let ids = ids_in(&game, first, 3, 0);
        mark_completed(&mut game, &ids);
        assert!(can_activate(&game, 1, 3));
    }

    #[test]
    fn first_participant_is_never_gated() {
        let mut game = round_three_pair();
        if let Some(p) = game.participants.first_mut() {
            let queued = core::mem::take(&mut p.current_units);
            p.queue.insert(3, queued);
        }
        assert!(can_activate(&game, 0, 3));
        assert!(!can_activate(&game, 0, 2));
    }

    #[test]
    fn completing_foreign_unit_is_not_owned() {
        let mut game = round_three_pair();
        let second = game.participants.get(1).map(|p| p.id).unwrap_or_default();
        let unit = game.units.first().map(|u| u.id).unwrap_or_default();
        let mut effects = Vec::new();
        let mut rng = rand::rng();

        let result = complete_unit(&mut game, second, unit, 0, &mut rng, &mut effects);
        assert!(matches!(result, Err(RelayError::NotOwned { .. })));
        assert!(effects.is_empty());
    }

    #[test]
    fn completing_unknown_unit_is_not_found() {
        let mut game = round_three_pair();
        let first = game.participants.first().map(|p| p.id).unwrap_or_default();
        let mut effects = Vec::new();
        let mut rng = rand::rng();

        let result = complete_unit(&mut game, first, UnitId::new(), 0, &mut rng, &mut effects);
        assert!(matches!(result, Err(RelayError::UnitNotFound(_))));
    }

    #[test]
    fn round_closed_needs_the_whole_round() {
        let mut game = round_three_pair();
        let first = game.participants.first().map(|p| p.id).unwrap_or_default();
        let ids = ids_in(&game, first, 3, 2);
        mark_completed(&mut game, &ids);
        let _ = forward(&mut game, 0, 3, 2, 0, &mut Vec::new());

        let second = game.participants.get(1).map(|p| p.id).unwrap_or_default();
        let held = ids_in(&game, second, 3, 2);
        mark_completed(&mut game, &held);

        assert!(sub_group_closed(&game, second, 3, 2));
        assert!(!round_closed(&game, second, 3));
    }
}
