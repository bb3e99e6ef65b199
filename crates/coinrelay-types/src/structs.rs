//! Core entity structs for the Coin Relay game.
//!
//! Covers [`Unit`], [`Participant`], [`Game`], and the lightweight
//! [`GameSummary`] listing record. These types carry state and simple
//! lookups only; every rule about how they change lives in
//! `coinrelay-core`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{GameStatus, ParticipantStatus, TargetSide, UnitStatus};
use crate::ids::{GameId, ParticipantId, UnitId};

/// Number of rounds in every game.
pub const ROUND_COUNT: u32 = 4;

/// Number of units generated for every round, whatever its sub-group shape.
pub const UNITS_PER_ROUND: u32 = 20;

/// Minimum number of participants required to start a game.
pub const MIN_PARTICIPANTS: usize = 2;

// ---------------------------------------------------------------------------
// Unit
// ---------------------------------------------------------------------------

/// One atomic action: flip a coin to the target side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Unit {
    /// Unique unit identifier. Clones never share it with their source.
    pub id: UnitId,
    /// Side the coin has to land on.
    pub side: TargetSide,
    /// Human-readable instruction shown to the player.
    pub description: String,
    /// Round this unit belongs to (1-based).
    pub round: u32,
    /// Sub-group index within the round (0-based).
    pub sub_group: u32,
    /// Pending until the owner flips it.
    pub status: UnitStatus,
    /// Participant the unit is assigned to, if any.
    pub owner: Option<ParticipantId>,
}

impl Unit {
    /// Create an unassigned pending unit for `(round, sub_group)`.
    pub fn new(side: TargetSide, round: u32, sub_group: u32) -> Self {
        let display_group = sub_group.saturating_add(1);
        Self {
            id: UnitId::new(),
            side,
            description: format!(
                "Flip coin to {side} (Round {round}, Sub-group {display_group})"
            ),
            round,
            sub_group,
            status: UnitStatus::Pending,
            owner: None,
        }
    }

    /// Derive the downstream copy of this unit for `owner`.
    ///
    /// The copy keeps side, description, round, and sub-group, gets a fresh
    /// id, and starts over as [`UnitStatus::Pending`].
    pub fn derive_for_participant(&self, owner: ParticipantId) -> Self {
        Self {
            id: UnitId::new(),
            side: self.side,
            description: self.description.clone(),
            round: self.round,
            sub_group: self.sub_group,
            status: UnitStatus::Pending,
            owner: Some(owner),
        }
    }

    /// Whether the unit has been flipped.
    pub fn is_completed(&self) -> bool {
        self.status == UnitStatus::Completed
    }

    /// Whether the unit sits at `(round, sub_group)`.
    pub const fn belongs_to(&self, round: u32, sub_group: u32) -> bool {
        self.round == round && self.sub_group == sub_group
    }

    /// Whether the unit is assigned to `participant`.
    pub fn is_owned_by(&self, participant: ParticipantId) -> bool {
        self.owner == Some(participant)
    }
}

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// One player in the relay, ordered by join time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Participant {
    /// Unique participant identifier.
    pub id: ParticipantId,
    /// Display name.
    pub name: String,
    /// 0-based join index. Defines the pipeline order and never changes.
    pub order: u32,
    /// Current relay status.
    pub status: ParticipantStatus,
    /// Round the participant is currently working on.
    pub current_round: u32,
    /// Units the participant may flip right now.
    pub current_units: Vec<UnitId>,
    /// Units the participant has flipped, in completion order.
    pub completed_units: Vec<UnitId>,
    /// Units relayed to the participant but not yet activated, by round.
    pub queue: BTreeMap<u32, Vec<UnitId>>,
    /// Epoch milliseconds at which each round was first activated.
    pub round_started_at: BTreeMap<u32, i64>,
    /// Milliseconds the participant spent on each finished round.
    pub round_durations: BTreeMap<u32, u64>,
}

impl Participant {
    /// Create a waiting participant at join index `order`.
    pub fn new(name: String, order: u32) -> Self {
        Self {
            id: ParticipantId::new(),
            name,
            order,
            status: ParticipantStatus::Waiting,
            current_round: 1,
            current_units: Vec::new(),
            completed_units: Vec::new(),
            queue: BTreeMap::new(),
            round_started_at: BTreeMap::new(),
            round_durations: BTreeMap::new(),
        }
    }

    /// Whether the participant holds any actionable units.
    pub fn has_current_units(&self) -> bool {
        !self.current_units.is_empty()
    }

    /// Whether `unit` is in the participant's actionable set.
    pub fn holds_current(&self, unit: UnitId) -> bool {
        self.current_units.contains(&unit)
    }

    /// Rounds with at least one queued unit, in ascending order.
    pub fn queued_rounds(&self) -> Vec<u32> {
        self.queue
            .iter()
            .filter(|(_, units)| !units.is_empty())
            .map(|(round, _)| *round)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// One match: participants in pipeline order plus every unit ever created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Game {
    /// Unique game identifier.
    pub id: GameId,
    /// Participants in join order.
    pub participants: Vec<Participant>,
    /// Global game status.
    pub status: GameStatus,
    /// Global round pointer, advanced when the last participant finishes a round.
    pub current_round: u32,
    /// Fixed number of rounds.
    pub round_count: u32,
    /// Fixed number of units per round.
    pub units_per_round: u32,
    /// Originals and clones, in creation order. Nothing is ever removed.
    pub units: Vec<Unit>,
    /// Epoch milliseconds at creation.
    pub created_at_ms: i64,
    /// Epoch milliseconds at completion, once the game is over.
    pub finished_at_ms: Option<i64>,
}

impl Game {
    /// Create an empty game waiting for participants.
    pub fn new(created_at_ms: i64) -> Self {
        Self {
            id: GameId::new(),
            participants: Vec::new(),
            status: GameStatus::Waiting,
            current_round: 1,
            round_count: ROUND_COUNT,
            units_per_round: UNITS_PER_ROUND,
            units: Vec::new(),
            created_at_ms,
            finished_at_ms: None,
        }
    }

    /// Position of a participant in pipeline order.
    pub fn participant_index(&self, id: ParticipantId) -> Option<usize> {
        self.participants.iter().position(|p| p.id == id)
    }

    /// Look up a participant by id.
    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    /// Look up a unit by id.
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Mutable unit lookup.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    /// All units assigned to `owner`, in creation order.
    pub fn units_owned_by(&self, owner: ParticipantId) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(move |u| u.is_owned_by(owner))
    }

    /// Whether `owner` holds any unit at `(round, sub_group)`.
    pub fn owns_sub_group(&self, owner: ParticipantId, round: u32, sub_group: u32) -> bool {
        self.units_owned_by(owner)
            .any(|u| u.belongs_to(round, sub_group))
    }

    /// Whether the participant at `index` is the last one in pipeline order.
    pub fn is_last(&self, index: usize) -> bool {
        index.checked_add(1) == Some(self.participants.len())
    }

    /// Condensed listing record for this game.
    pub fn summary(&self) -> GameSummary {
        GameSummary {
            id: self.id,
            status: self.status,
            participant_count: self.participants.len(),
            current_round: self.current_round,
            created_at_ms: self.created_at_ms,
        }
    }
}

/// Condensed view of a game for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GameSummary {
    /// Game identifier.
    pub id: GameId,
    /// Global status.
    pub status: GameStatus,
    /// Number of joined participants.
    pub participant_count: usize,
    /// Global round pointer.
    pub current_round: u32,
    /// Epoch milliseconds at creation.
    pub created_at_ms: i64,
}
