//! Round and sub-group schedule.
//!
//! Every round totals [`UNITS_PER_ROUND`] units. Later rounds split them
//! into more, smaller sub-groups, which is what lets work overlap between
//! participants:
//!
//! | round | sub-groups x units |
//! |-------|--------------------|
//! | 1 | 1 x 20 |
//! | 2 | 2 x 10 |
//! | 3 | 4 x 5 |
//! | 4 | 10 x 2 |
//!
//! [`UNITS_PER_ROUND`]: coinrelay_types::UNITS_PER_ROUND

use coinrelay_types::{TargetSide, Unit};
use rand::Rng;

use crate::error::RelayError;

/// Sub-group sizes per round, indexed by `round - 1`.
const SCHEDULE: [&[u32]; 4] = [&[20], &[10, 10], &[5, 5, 5, 5], &[2; 10]];

/// Sizes of each sub-group of `round`, in index order.
///
/// Returns `None` for rounds outside the schedule.
pub fn sub_group_sizes(round: u32) -> Option<&'static [u32]> {
    let index = usize::try_from(round.checked_sub(1)?).ok()?;
    SCHEDULE.get(index).copied()
}

/// Number of sub-groups in `round`.
pub fn sub_group_count(round: u32) -> Option<u32> {
    sub_group_sizes(round).and_then(|sizes| u32::try_from(sizes.len()).ok())
}

/// Total units in `round`.
pub fn round_total(round: u32) -> Option<u32> {
    sub_group_sizes(round).map(|sizes| sizes.iter().fold(0_u32, |acc, n| acc.saturating_add(*n)))
}

/// Draw the target side for one generation event.
pub fn pick_side(rng: &mut impl Rng) -> TargetSide {
    if rng.random_bool(0.5) {
        TargetSide::Heads
    } else {
        TargetSide::Tails
    }
}

/// Build the unassigned units of `round`, all labelled with `side`.
///
/// Units come out ordered by sub-group index.
///
/// # Errors
///
/// Returns [`RelayError::InvalidState`] if `round` is not in the schedule.
pub fn build_round(round: u32, side: TargetSide) -> Result<Vec<Unit>, RelayError> {
    let sizes = sub_group_sizes(round)
        .ok_or_else(|| RelayError::invalid_state(format!("round {round} is not scheduled")))?;

    let mut units = Vec::new();
    for (sub_group, size) in (0_u32..).zip(sizes.iter()) {
        for _ in 0..*size {
            units.push(Unit::new(side, round, sub_group));
        }
    }
    Ok(units)
}

/// Generate the units of `round` with a freshly drawn target side.
///
/// Randomness only affects the side, never the partition shape.
///
/// # Errors
///
/// Returns [`RelayError::InvalidState`] if `round` is not in the schedule.
pub fn generate_round(round: u32, rng: &mut impl Rng) -> Result<Vec<Unit>, RelayError> {
    build_round(round, pick_side(rng))
}

#[cfg(test)]
mod tests {
    use coinrelay_types::{ROUND_COUNT, UNITS_PER_ROUND, UnitStatus};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn every_round_totals_twenty() {
        for round in 1..=ROUND_COUNT {
            assert_eq!(round_total(round), Some(UNITS_PER_ROUND), "round {round}");
        }
    }

    #[test]
    fn sub_group_counts_fan_out() {
        assert_eq!(sub_group_count(1), Some(1));
        assert_eq!(sub_group_count(2), Some(2));
        assert_eq!(sub_group_count(3), Some(4));
        assert_eq!(sub_group_count(4), Some(10));
    }

    #[test]
    fn unscheduled_rounds_are_rejected() {
        assert!(sub_group_sizes(0).is_none());
        assert!(sub_group_sizes(5).is_none());
        assert!(build_round(0, TargetSide::Heads).is_err());
        assert!(build_round(ROUND_COUNT.saturating_add(1), TargetSide::Heads).is_err());
    }

    #[test]
    fn round_three_has_four_groups_of_five() {
        let units = build_round(3, TargetSide::Tails).unwrap_or_default();
        assert_eq!(units.len(), 20);
        for sub_group in 0..4 {
            let members = units.iter().filter(|u| u.sub_group == sub_group).count();
            assert_eq!(members, 5, "sub-group {sub_group}");
        }
        assert!(units.iter().all(|u| u.round == 3));
        assert!(units.iter().all(|u| u.status == UnitStatus::Pending));
        assert!(units.iter().all(|u| u.owner.is_none()));
    }

    #[test]
    fn generated_round_shares_one_side() {
        let mut rng = SmallRng::seed_from_u64(7);
        for round in 1..=ROUND_COUNT {
            let units = generate_round(round, &mut rng).unwrap_or_default();
            assert_eq!(units.len(), 20);
            let first = units.first().map(|u| u.side);
            assert!(units.iter().all(|u| Some(u.side) == first));
        }
    }

    #[test]
    fn generated_ids_are_unique() {
        let units = build_round(4, TargetSide::Heads).unwrap_or_default();
        let mut ids: Vec<_> = units.iter().map(|u| u.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), units.len());
    }

    #[test]
    fn pick_side_produces_both_sides() {
        let mut rng = SmallRng::seed_from_u64(11);
        let sides: Vec<_> = (0..64).map(|_| pick_side(&mut rng)).collect();
        assert!(sides.contains(&TargetSide::Heads));
        assert!(sides.contains(&TargetSide::Tails));
    }
}
