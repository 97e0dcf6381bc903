//! Per-participant facts extracted from one timeline (and optional details).

use std::collections::BTreeMap;

use crate::timeline::{
    GameEvent, MatchDetails, MatchTimeline, ParticipantFrame, ParticipantId, TeamLayout,
};

use super::reconcile::{reconcile, ReconciledKda};
use super::round2;

/// Teammates within this many map units share a frame.
const PROXIMITY_RADIUS: f64 = 2_500.0;

#[derive(Debug, Clone)]
pub(crate) struct ParticipantContext {
    pub(crate) has_frame: bool,
    pub(crate) kda: ReconciledKda,
    pub(crate) duration_min: f64,
    pub(crate) team_size: usize,

    pub(crate) gold: f64,
    pub(crate) cs: f64,
    pub(crate) xp: f64,
    pub(crate) level: f64,
    pub(crate) damage_to_champions: f64,
    pub(crate) physical_damage: f64,
    pub(crate) magic_damage: f64,
    pub(crate) true_damage: f64,
    pub(crate) damage_taken: f64,
    pub(crate) cc_seconds: f64,

    pub(crate) wards_placed: f64,
    pub(crate) wards_killed: f64,
    pub(crate) epic_involved: f64,
    pub(crate) towers_involved: f64,

    pub(crate) team_kills: f64,
    pub(crate) team_gold: f64,
    pub(crate) team_damage: f64,
    pub(crate) team_damage_taken: f64,
    pub(crate) team_epic: f64,
    pub(crate) team_towers: f64,
    pub(crate) lobby_mean_xp: f64,

    /// Share of frames with a teammate nearby; `None` without positions.
    pub(crate) proximity: Option<f64>,

    pub(crate) vision_score: Option<f64>,
    pub(crate) self_mitigated: Option<f64>,
    pub(crate) cc_dealt: Option<f64>,
}

impl ParticipantContext {
    pub(crate) fn build(
        timeline: &MatchTimeline,
        participant: ParticipantId,
        details: Option<&MatchDetails>,
        layout: &TeamLayout,
    ) -> Self {
        let stats = details.and_then(|d| d.participant(participant));
        let kda = reconcile(timeline, participant, stats);
        let last = timeline.last_frame_of(participant);
        let team = layout.team_of(participant);
        let members = team.map(|t| layout.members(t)).unwrap_or_default();

        let duration_min = details
            .map(MatchDetails::duration_minutes)
            .filter(|d| *d > 0.0)
            .unwrap_or_else(|| timeline.duration_minutes());

        let frame_value = |id: ParticipantId, f: fn(&ParticipantFrame) -> u32| -> f64 {
            timeline
                .last_frame_of(id)
                .map(|pf| f64::from(f(pf)))
                .unwrap_or(0.0)
        };

        let team_gold = members.iter().map(|id| frame_value(*id, |pf| pf.total_gold)).sum();
        let team_damage = members
            .iter()
            .map(|id| {
                frame_value(*id, |pf| pf.damage_stats.total_damage_done_to_champions)
            })
            .sum();
        let team_damage_taken = members
            .iter()
            .map(|id| frame_value(*id, |pf| pf.damage_stats.total_damage_taken))
            .sum();

        let all_ids = timeline.participant_ids();
        let lobby_mean_xp = if all_ids.is_empty() {
            0.0
        } else {
            all_ids
                .iter()
                .map(|id| frame_value(*id, |pf| pf.xp))
                .sum::<f64>()
                / all_ids.len() as f64
        };

        let team_kills = match details {
            Some(d) if !members.is_empty() && members.iter().all(|m| d.participant(*m).is_some()) => {
                members
                    .iter()
                    .filter_map(|m| d.participant(*m))
                    .map(|s| f64::from(s.kills))
                    .sum()
            }
            _ => count_team_kills(timeline, layout, team),
        };

        let objectives = count_objectives(timeline, layout, participant, team);

        let mut wards_placed = 0.0;
        let mut wards_killed = 0.0;
        for event in timeline.events() {
            match event {
                GameEvent::WardPlaced {
                    creator_id,
                    ward_type,
                    ..
                } if *creator_id == participant && ward_type != "UNDEFINED" => {
                    wards_placed += 1.0;
                }
                GameEvent::WardKill { killer_id, .. } if *killer_id == participant => {
                    wards_killed += 1.0;
                }
                _ => {}
            }
        }

        Self {
            has_frame: last.is_some(),
            kda,
            duration_min,
            team_size: members.len().max(1),
            gold: last.map(|f| f64::from(f.total_gold)).unwrap_or(0.0),
            cs: last
                .map(|f| f64::from(f.minions_killed) + f64::from(f.jungle_minions_killed))
                .unwrap_or(0.0),
            xp: last.map(|f| f64::from(f.xp)).unwrap_or(0.0),
            level: last.map(|f| f64::from(f.level)).unwrap_or(0.0),
            damage_to_champions: last
                .map(|f| f64::from(f.damage_stats.total_damage_done_to_champions))
                .unwrap_or(0.0),
            physical_damage: last
                .map(|f| f64::from(f.damage_stats.physical_damage_done_to_champions))
                .unwrap_or(0.0),
            magic_damage: last
                .map(|f| f64::from(f.damage_stats.magic_damage_done_to_champions))
                .unwrap_or(0.0),
            true_damage: last
                .map(|f| f64::from(f.damage_stats.true_damage_done_to_champions))
                .unwrap_or(0.0),
            damage_taken: last
                .map(|f| f64::from(f.damage_stats.total_damage_taken))
                .unwrap_or(0.0),
            cc_seconds: last
                .map(|f| f64::from(f.time_enemy_spent_controlled))
                .unwrap_or(0.0),
            wards_placed,
            wards_killed,
            epic_involved: objectives.epic_involved,
            towers_involved: objectives.towers_involved,
            team_kills,
            team_gold,
            team_damage,
            team_damage_taken,
            team_epic: objectives.team_epic,
            team_towers: objectives.team_towers,
            lobby_mean_xp,
            proximity: proximity_share(timeline, participant, &layout.teammates(participant)),
            vision_score: stats.map(|s| f64::from(s.vision_score)),
            self_mitigated: stats.map(|s| f64::from(s.damage_self_mitigated)),
            cc_dealt: stats.map(|s| f64::from(s.time_c_cing_others)),
        }
    }

    pub(crate) fn kills(&self) -> f64 {
        f64::from(self.kda.value.kills)
    }

    pub(crate) fn deaths(&self) -> f64 {
        f64::from(self.kda.value.deaths)
    }

    pub(crate) fn assists(&self) -> f64 {
        f64::from(self.kda.value.assists)
    }

    pub(crate) fn per_minute(&self, value: f64) -> Option<f64> {
        if self.duration_min > 0.0 {
            Some(value / self.duration_min)
        } else {
            None
        }
    }

    pub(crate) fn kill_participation(&self) -> Option<f64> {
        if self.team_kills > 0.0 {
            Some(((self.kills() + self.assists()) / self.team_kills).clamp(0.0, 1.0))
        } else {
            None
        }
    }

    /// Derived numeric facts, also the basis of the guardrail's fact ledger.
    pub(crate) fn raw_stats(&self) -> BTreeMap<String, f64> {
        let mut stats = BTreeMap::new();
        let mut put = |key: &str, value: f64| {
            stats.insert(key.to_string(), value);
        };
        put("kills", self.kills());
        put("deaths", self.deaths());
        put("assists", self.assists());
        put("kda", round2(self.kda.value.ratio()));
        put("cs", self.cs);
        put("gold", self.gold);
        put("xp", self.xp);
        put("level", self.level);
        put("damage_to_champions", self.damage_to_champions);
        put("damage_taken", self.damage_taken);
        put("wards_placed", self.wards_placed);
        put("wards_killed", self.wards_killed);
        put("epic_monsters", self.epic_involved);
        put("towers", self.towers_involved);
        put("cc_seconds", self.cc_seconds);
        put("duration_min", (self.duration_min * 10.0).round() / 10.0);
        if let Some(cs_min) = self.per_minute(self.cs) {
            put("cs_per_min", (cs_min * 10.0).round() / 10.0);
        }
        if let Some(gpm) = self.per_minute(self.gold) {
            put("gold_per_min", gpm.round());
        }
        if let Some(kp) = self.kill_participation() {
            put("kill_participation_pct", (kp * 100.0).round());
        }
        if let Some(vision) = self.vision_score {
            put("vision_score", vision);
        }
        stats
    }
}

fn count_team_kills(timeline: &MatchTimeline, layout: &TeamLayout, team: Option<u16>) -> f64 {
    let Some(team) = team else {
        return 0.0;
    };
    timeline
        .events()
        .filter(|e| match e {
            GameEvent::ChampionKill { killer_id, .. } => {
                *killer_id != 0 && layout.team_of(*killer_id) == Some(team)
            }
            _ => false,
        })
        .count() as f64
}

#[derive(Debug, Default)]
struct ObjectiveCounts {
    epic_involved: f64,
    towers_involved: f64,
    team_epic: f64,
    team_towers: f64,
}

fn count_objectives(
    timeline: &MatchTimeline,
    layout: &TeamLayout,
    participant: ParticipantId,
    team: Option<u16>,
) -> ObjectiveCounts {
    let mut counts = ObjectiveCounts::default();
    let Some(team) = team else {
        return counts;
    };

    for event in timeline.events() {
        match event {
            GameEvent::EliteMonsterKill {
                killer_id,
                assisting_participant_ids,
                ..
            } => {
                if *killer_id == 0 || layout.team_of(*killer_id) != Some(team) {
                    continue;
                }
                counts.team_epic += 1.0;
                if *killer_id == participant || assisting_participant_ids.contains(&participant) {
                    counts.epic_involved += 1.0;
                }
            }
            GameEvent::BuildingKill {
                killer_id,
                team_id,
                assisting_participant_ids,
                ..
            } => {
                let attacker_team = if *killer_id != 0 {
                    layout.team_of(*killer_id)
                } else {
                    Some(if *team_id == 100 { 200 } else { 100 })
                };
                if attacker_team != Some(team) {
                    continue;
                }
                counts.team_towers += 1.0;
                if *killer_id == participant || assisting_participant_ids.contains(&participant) {
                    counts.towers_involved += 1.0;
                }
            }
            _ => {}
        }
    }
    counts
}

fn proximity_share(
    timeline: &MatchTimeline,
    participant: ParticipantId,
    teammates: &[ParticipantId],
) -> Option<f64> {
    let mut sampled = 0u32;
    let mut grouped = 0u32;
    for frame in timeline.frames() {
        // Everyone starts in the fountain.
        if frame.timestamp == 0 {
            continue;
        }
        let Some(own) = frame
            .participant_frames
            .get(&participant)
            .and_then(|pf| pf.position)
        else {
            continue;
        };
        let others: Vec<_> = teammates
            .iter()
            .filter_map(|id| frame.participant_frames.get(id).and_then(|pf| pf.position))
            .collect();
        if others.is_empty() {
            continue;
        }
        sampled += 1;
        if others.iter().any(|p| p.distance(&own) <= PROXIMITY_RADIUS) {
            grouped += 1;
        }
    }
    if sampled == 0 {
        None
    } else {
        Some(f64::from(grouped) / f64::from(sampled))
    }
}
