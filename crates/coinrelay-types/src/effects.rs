//! Relay effects: the ordered side effects of one game operation.
//!
//! Every mutating engine call returns the effects it produced so callers
//! can log or display the cascade (unit completed, sub-group forwarded,
//! round completed, ...) without diffing snapshots.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::TargetSide;
use crate::ids::{GameId, ParticipantId, UnitId};

/// A single side effect of a game operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum RelayEffect {
    /// The game moved to in-progress.
    GameStarted {
        /// The started game.
        game_id: GameId,
        /// Number of participants at start.
        participant_count: usize,
    },
    /// A fresh round was generated and handed to the first participant.
    RoundSeeded {
        /// Recipient (always the first participant).
        participant: ParticipantId,
        /// Round that was generated.
        round: u32,
        /// Side chosen for every unit of the round.
        side: TargetSide,
        /// Number of units generated.
        unit_count: usize,
    },
    /// A participant flipped one unit.
    UnitCompleted {
        /// Who flipped it.
        participant: ParticipantId,
        /// The flipped unit.
        unit: UnitId,
        /// Its round.
        round: u32,
        /// Its sub-group.
        sub_group: u32,
    },
    /// A completed sub-group was cloned for the next participant.
    SubGroupForwarded {
        /// Upstream participant.
        from: ParticipantId,
        /// Downstream participant receiving the clones.
        to: ParticipantId,
        /// Round of the sub-group.
        round: u32,
        /// Sub-group index.
        sub_group: u32,
        /// Number of clones created.
        unit_count: usize,
    },
    /// Forwarding was skipped because the downstream participant already
    /// holds the sub-group.
    ForwardSkipped {
        /// Upstream participant.
        from: ParticipantId,
        /// Downstream participant.
        to: ParticipantId,
        /// Round of the sub-group.
        round: u32,
        /// Sub-group index.
        sub_group: u32,
    },
    /// Forwarded units were parked in the participant's queue.
    SubGroupQueued {
        /// Participant holding the queue.
        participant: ParticipantId,
        /// Round the units were queued under.
        round: u32,
        /// Sub-group index.
        sub_group: u32,
    },
    /// Queued units became actionable.
    ParticipantActivated {
        /// The activated participant.
        participant: ParticipantId,
        /// Round being worked on.
        round: u32,
        /// Number of units moved into the actionable set.
        unit_count: usize,
    },
    /// A participant ran out of actionable units mid-round and now waits
    /// for upstream work.
    ParticipantStarved {
        /// The waiting participant.
        participant: ParticipantId,
        /// Round still in progress for them.
        round: u32,
    },
    /// A participant finished every unit of a round.
    RoundCompleted {
        /// The participant.
        participant: ParticipantId,
        /// The finished round.
        round: u32,
        /// Elapsed milliseconds, when a start time had been recorded.
        elapsed_ms: Option<u64>,
    },
    /// The global round pointer moved forward.
    RoundAdvanced {
        /// New global round.
        round: u32,
    },
    /// The last participant finished the final round.
    GameCompleted {
        /// The finished game.
        game_id: GameId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effects_are_tagged_by_kind() {
        let effect = RelayEffect::RoundAdvanced { round: 3 };
        let json = serde_json::to_value(&effect).ok();
        assert!(json.is_some());
        if let Some(value) = json {
            assert_eq!(value["kind"], "round_advanced");
            assert_eq!(value["round"], 3);
        }
    }
}
