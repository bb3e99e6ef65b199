//! Round controller: what happens when a participant closes a round.

use coinrelay_types::{Game, Participant, RelayEffect, UnitId};
use rand::Rng;
use tracing::{debug, info};

use crate::error::RelayError;
use crate::relay::{self, participant_at, participant_at_mut};
use crate::schedule;
use crate::transition::{GameEvent, ParticipantEvent, game_transition, participant_transition};

/// Handle the participant at `index` having completed every unit of `round`.
///
/// - Last participant on the final round: the game completes.
/// - Not the last participant: every sub-group of the round that the next
///   participant does not hold yet is forwarded, and the next participant
///   picks up queued work if it is free.
/// - Last participant on an earlier round: the game advances and, if the
///   first participant has closed the round too, the next round is seeded.
///
/// The participant then goes back to waiting.
///
/// # Errors
///
/// Returns [`RelayError::InvalidState`] when a status transition is illegal
/// or the next round cannot be generated.
pub fn on_round_complete(
    game: &mut Game,
    index: usize,
    round: u32,
    now_ms: i64,
    rng: &mut impl Rng,
    effects: &mut Vec<RelayEffect>,
) -> Result<(), RelayError> {
    let participant = participant_at_mut(game, index)?;
    let participant_id = participant.id;
    let elapsed_ms = record_duration(participant, round, now_ms);

    info!(participant = %participant_id, round, elapsed_ms, "Round completed");
    effects.push(RelayEffect::RoundCompleted {
        participant: participant_id,
        round,
        elapsed_ms,
    });

    let is_last = game.is_last(index);
    if is_last && round >= game.round_count {
        return finish_game(game, now_ms, effects);
    }

    if is_last {
        advance_round(game, round, now_ms, rng, effects)?;
    } else {
        forward_remaining(game, index, round, now_ms, effects)?;
    }

    let participant = participant_at_mut(game, index)?;
    participant.status = participant_transition(participant.status, ParticipantEvent::RoundFinished)?;
    participant.current_units.clear();
    Ok(())
}

/// Seed `round` to the first participant and make those units actionable.
///
/// All units of the round share one freshly drawn target side.
pub(crate) fn seed_round(
    game: &mut Game,
    round: u32,
    now_ms: i64,
    rng: &mut impl Rng,
    effects: &mut Vec<RelayEffect>,
) -> Result<(), RelayError> {
    let first = participant_at(game, 0)?;
    let first_id = first.id;
    let status = participant_transition(first.status, ParticipantEvent::Activated)?;

    let side = schedule::pick_side(rng);
    let mut units = schedule::build_round(round, side)?;
    for unit in &mut units {
        unit.owner = Some(first_id);
    }
    let ids: Vec<UnitId> = units.iter().map(|u| u.id).collect();
    let unit_count = ids.len();
    game.units.extend(units);

    let first = participant_at_mut(game, 0)?;
    first.current_units.extend(ids);
    first.current_round = round;
    first.status = status;
    first.round_started_at.insert(round, now_ms);

    info!(participant = %first_id, round, %side, unit_count, "Round seeded");
    effects.push(RelayEffect::RoundSeeded {
        participant: first_id,
        round,
        side,
        unit_count,
    });
    Ok(())
}

/// Store the round duration once and return it.
///
/// A repeated call keeps the first recording. No start time means no
/// duration.
fn record_duration(participant: &mut Participant, round: u32, now_ms: i64) -> Option<u64> {
    if let Some(existing) = participant.round_durations.get(&round) {
        return Some(*existing);
    }
    let started = participant.round_started_at.get(&round).copied()?;
    let elapsed = u64::try_from(now_ms.saturating_sub(started)).unwrap_or(0);
    participant.round_durations.insert(round, elapsed);
    Some(elapsed)
}

/// Round-level forward: push every sub-group the next participant lacks.
fn forward_remaining(
    game: &mut Game,
    index: usize,
    round: u32,
    now_ms: i64,
    effects: &mut Vec<RelayEffect>,
) -> Result<(), RelayError> {
    let Some(count) = schedule::sub_group_count(round) else {
        return Ok(());
    };
    let next_index = index.saturating_add(1);
    let next_id = participant_at(game, next_index)?.id;

    for sub_group in 0..count {
        if !game.owns_sub_group(next_id, round, sub_group) {
            relay::forward(game, index, round, sub_group, now_ms, effects)?;
        }
    }

    if !participant_at(game, next_index)?.has_current_units() {
        relay::activate_ready(game, next_index, now_ms, effects)?;
    }
    Ok(())
}

/// Move the game to the round after `completed_round`.
///
/// The next round is only seeded once the first participant has closed
/// `completed_round`; otherwise the game just records the new round number.
fn advance_round(
    game: &mut Game,
    completed_round: u32,
    now_ms: i64,
    rng: &mut impl Rng,
    effects: &mut Vec<RelayEffect>,
) -> Result<(), RelayError> {
    let next_round = completed_round.saturating_add(1);
    game.current_round = next_round;
    info!(game_id = %game.id, round = next_round, "Game advanced");
    effects.push(RelayEffect::RoundAdvanced { round: next_round });

    let first_id = participant_at(game, 0)?.id;
    if relay::round_closed(game, first_id, completed_round) {
        seed_round(game, next_round, now_ms, rng, effects)
    } else {
        debug!(round = next_round, "First participant still busy, holding next round");
        Ok(())
    }
}

fn finish_game(
    game: &mut Game,
    now_ms: i64,
    effects: &mut Vec<RelayEffect>,
) -> Result<(), RelayError> {
    game.status = game_transition(game.status, GameEvent::Finished)?;
    game.finished_at_ms = Some(now_ms);
    for participant in &mut game.participants {
        participant.status = participant_transition(participant.status, ParticipantEvent::GameFinished)?;
        participant.current_units.clear();
    }

    info!(game_id = %game.id, "Game completed");
    effects.push(RelayEffect::GameCompleted { game_id: game.id });
    Ok(())
}
