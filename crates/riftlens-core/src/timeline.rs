//! Match telemetry types.
//!
//! The JSON shape follows the match-v5 timeline and match endpoints:
//!
//! ```text
//! { "metadata": { "matchId": "EUW1_1" },
//!   "info": { "frameInterval": 60000,
//!             "frames": [ { "timestamp": 0,
//!                           "participantFrames": { "1": { "totalGold": 500, ... } },
//!                           "events": [ { "type": "CHAMPION_KILL", ... } ] } ] } }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Participant id within a match (1-based, up to 16 for team variants).
pub type ParticipantId = u8;

/// Ordered per-interval snapshots plus discrete events. Immutable once fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchTimeline {
    #[serde(default)]
    pub metadata: TimelineMetadata,
    #[serde(default)]
    pub info: TimelineInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineMetadata {
    #[serde(default)]
    pub match_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineInfo {
    #[serde(default)]
    pub frame_interval: u64,
    #[serde(default)]
    pub frames: Vec<Frame>,
}

/// One interval snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Milliseconds since game start.
    pub timestamp: u64,
    #[serde(default)]
    pub participant_frames: BTreeMap<ParticipantId, ParticipantFrame>,
    #[serde(default)]
    pub events: Vec<GameEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantFrame {
    #[serde(default)]
    pub total_gold: u32,
    #[serde(default)]
    pub xp: u32,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub minions_killed: u32,
    #[serde(default)]
    pub jungle_minions_killed: u32,
    #[serde(default)]
    pub position: Option<Position>,
    /// Cumulative seconds enemies spent under this participant's control effects.
    #[serde(default)]
    pub time_enemy_spent_controlled: u32,
    #[serde(default)]
    pub damage_stats: DamageStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn distance(&self, other: &Position) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        (dx * dx + dy * dy).sqrt()
    }
}

/// Cumulative damage counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageStats {
    #[serde(default)]
    pub total_damage_done_to_champions: u32,
    #[serde(default)]
    pub physical_damage_done_to_champions: u32,
    #[serde(default)]
    pub magic_damage_done_to_champions: u32,
    #[serde(default)]
    pub true_damage_done_to_champions: u32,
    #[serde(default)]
    pub total_damage_taken: u32,
}

/// Discrete game event. Unknown types deserialize to [`GameEvent::Other`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameEvent {
    #[serde(rename_all = "camelCase")]
    ChampionKill {
        #[serde(default)]
        timestamp: u64,
        #[serde(default)]
        killer_id: ParticipantId,
        #[serde(default)]
        victim_id: ParticipantId,
        #[serde(default)]
        assisting_participant_ids: Vec<ParticipantId>,
    },
    #[serde(rename_all = "camelCase")]
    EliteMonsterKill {
        #[serde(default)]
        timestamp: u64,
        #[serde(default)]
        killer_id: ParticipantId,
        #[serde(default)]
        monster_type: String,
        #[serde(default)]
        assisting_participant_ids: Vec<ParticipantId>,
    },
    #[serde(rename_all = "camelCase")]
    BuildingKill {
        #[serde(default)]
        timestamp: u64,
        #[serde(default)]
        killer_id: ParticipantId,
        /// Team that owned the destroyed building.
        #[serde(default)]
        team_id: u16,
        #[serde(default)]
        building_type: String,
        #[serde(default)]
        assisting_participant_ids: Vec<ParticipantId>,
    },
    #[serde(rename_all = "camelCase")]
    ItemPurchased {
        #[serde(default)]
        timestamp: u64,
        #[serde(default)]
        participant_id: ParticipantId,
        #[serde(default)]
        item_id: u32,
    },
    #[serde(rename_all = "camelCase")]
    WardPlaced {
        #[serde(default)]
        timestamp: u64,
        #[serde(default)]
        creator_id: ParticipantId,
        #[serde(default)]
        ward_type: String,
    },
    #[serde(rename_all = "camelCase")]
    WardKill {
        #[serde(default)]
        timestamp: u64,
        #[serde(default)]
        killer_id: ParticipantId,
        #[serde(default)]
        ward_type: String,
    },
    #[serde(rename_all = "camelCase")]
    LevelUp {
        #[serde(default)]
        timestamp: u64,
        #[serde(default)]
        participant_id: ParticipantId,
        #[serde(default)]
        level: u32,
    },
    #[serde(other)]
    Other,
}

impl MatchTimeline {
    pub fn match_id(&self) -> &str {
        &self.metadata.match_id
    }

    pub fn frames(&self) -> &[Frame] {
        &self.info.frames
    }

    pub fn is_empty(&self) -> bool {
        self.info.frames.is_empty()
    }

    pub fn events(&self) -> impl Iterator<Item = &GameEvent> {
        self.info.frames.iter().flat_map(|f| f.events.iter())
    }

    /// Game length in minutes, derived from the last frame timestamp.
    pub fn duration_minutes(&self) -> f64 {
        self.info
            .frames
            .last()
            .map(|f| f.timestamp as f64 / 60_000.0)
            .unwrap_or(0.0)
    }

    /// Most recent snapshot of a participant.
    pub fn last_frame_of(&self, participant: ParticipantId) -> Option<&ParticipantFrame> {
        self.info
            .frames
            .iter()
            .rev()
            .find_map(|f| f.participant_frames.get(&participant))
    }

    pub fn participant_ids(&self) -> BTreeSet<ParticipantId> {
        self.info
            .frames
            .iter()
            .flat_map(|f| f.participant_frames.keys().copied())
            .collect()
    }
}

/// Authoritative end-of-match data (match endpoint).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDetails {
    #[serde(default)]
    pub match_id: String,
    /// Game length in seconds.
    #[serde(default)]
    pub game_duration: u64,
    #[serde(default)]
    pub participants: Vec<ParticipantStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantStats {
    pub participant_id: ParticipantId,
    #[serde(default)]
    pub team_id: u16,
    #[serde(default)]
    pub champion_name: String,
    #[serde(default)]
    pub riot_id_game_name: Option<String>,
    #[serde(default)]
    pub kills: u32,
    #[serde(default)]
    pub deaths: u32,
    #[serde(default)]
    pub assists: u32,
    #[serde(default)]
    pub total_minions_killed: u32,
    #[serde(default)]
    pub neutral_minions_killed: u32,
    #[serde(default)]
    pub gold_earned: u32,
    #[serde(default)]
    pub total_damage_dealt_to_champions: u32,
    #[serde(default)]
    pub total_damage_taken: u32,
    #[serde(default)]
    pub damage_self_mitigated: u32,
    #[serde(default)]
    pub vision_score: u32,
    #[serde(default)]
    pub wards_placed: u32,
    #[serde(default)]
    pub wards_killed: u32,
    /// Seconds of crowd control applied to enemies.
    #[serde(default)]
    pub time_c_cing_others: u32,
    #[serde(default)]
    pub win: bool,
}

impl MatchDetails {
    pub fn participant(&self, id: ParticipantId) -> Option<&ParticipantStats> {
        self.participants.iter().find(|p| p.participant_id == id)
    }

    pub fn duration_minutes(&self) -> f64 {
        self.game_duration as f64 / 60.0
    }
}

/// Team assignment for a match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamLayout {
    teams: BTreeMap<ParticipantId, u16>,
}

impl TeamLayout {
    /// Teams from authoritative data when present, otherwise the lower half
    /// of participant ids is team 100 and the upper half team 200.
    pub fn resolve(timeline: &MatchTimeline, details: Option<&MatchDetails>) -> Self {
        let mut teams = BTreeMap::new();
        if let Some(details) = details {
            for p in &details.participants {
                if p.team_id != 0 {
                    teams.insert(p.participant_id, p.team_id);
                }
            }
        }

        let mut ids = timeline.participant_ids();
        if let Some(details) = details {
            ids.extend(details.participants.iter().map(|p| p.participant_id));
        }
        let highest = ids.iter().next_back().copied().unwrap_or(0);
        let half = highest.div_ceil(2);
        for id in ids {
            teams
                .entry(id)
                .or_insert(if id <= half { 100 } else { 200 });
        }
        Self { teams }
    }

    pub fn team_of(&self, participant: ParticipantId) -> Option<u16> {
        self.teams.get(&participant).copied()
    }

    pub fn teammates(&self, participant: ParticipantId) -> Vec<ParticipantId> {
        match self.team_of(participant) {
            Some(team) => self
                .teams
                .iter()
                .filter(|(id, t)| **t == team && **id != participant)
                .map(|(id, _)| *id)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn members(&self, team: u16) -> Vec<ParticipantId> {
        self.teams
            .iter()
            .filter(|(_, t)| **t == team)
            .map(|(id, _)| *id)
            .collect()
    }
}
