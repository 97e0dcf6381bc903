//! Multi-dimensional participant scoring.
//!
//! [`ScoringEngine::score`] is a pure function of its inputs: no I/O, no
//! clock, no randomness. Every dimension is the mean of a few normalised
//! components scaled to [0,100]; a component whose inputs are missing counts
//! as the neutral midpoint (0.5). The overall score is a fixed-weight sum of
//! the ten dimensions with integer weights summing to 100.

mod context;
mod dimensions;
mod reconcile;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::timeline::{MatchDetails, MatchTimeline, ParticipantId, TeamLayout};

pub use reconcile::{Kda, KdaDiscrepancy, KdaSource};

/// Score assigned when a dimension has no usable input.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Scoring dimensions in their fixed evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Combat,
    Economy,
    Objective,
    Vision,
    Teamplay,
    Growth,
    Tankiness,
    DamageComposition,
    Survivability,
    CrowdControl,
}

impl Dimension {
    pub const ALL: [Dimension; 10] = [
        Dimension::Combat,
        Dimension::Economy,
        Dimension::Objective,
        Dimension::Vision,
        Dimension::Teamplay,
        Dimension::Growth,
        Dimension::Tankiness,
        Dimension::DamageComposition,
        Dimension::Survivability,
        Dimension::CrowdControl,
    ];

    /// Weight in percent. The ten weights sum to exactly 100.
    pub const fn weight_percent(self) -> u32 {
        match self {
            Dimension::Combat | Dimension::Economy | Dimension::Objective => 15,
            Dimension::Vision | Dimension::Teamplay | Dimension::Growth | Dimension::Tankiness => {
                10
            }
            Dimension::DamageComposition | Dimension::Survivability | Dimension::CrowdControl => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Combat => "combat",
            Dimension::Economy => "economy",
            Dimension::Objective => "objective",
            Dimension::Vision => "vision",
            Dimension::Teamplay => "teamplay",
            Dimension::Growth => "growth",
            Dimension::Tankiness => "tankiness",
            Dimension::DamageComposition => "damage_composition",
            Dimension::Survivability => "survivability",
            Dimension::CrowdControl => "crowd_control",
        }
    }

    /// Human-readable name used in narratives.
    pub fn display_name(self) -> &'static str {
        match self {
            Dimension::Combat => "combat",
            Dimension::Economy => "economy",
            Dimension::Objective => "objective control",
            Dimension::Vision => "vision",
            Dimension::Teamplay => "teamplay",
            Dimension::Growth => "growth",
            Dimension::Tankiness => "frontline presence",
            Dimension::DamageComposition => "damage profile",
            Dimension::Survivability => "survivability",
            Dimension::CrowdControl => "utility",
        }
    }
}

/// Sum of all dimension weights.
pub fn total_weight_percent() -> u32 {
    Dimension::ALL.iter().map(|d| d.weight_percent()).sum()
}

/// The ten dimension scores, each in [0,100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub combat: f64,
    pub economy: f64,
    pub objective: f64,
    pub vision: f64,
    pub teamplay: f64,
    pub growth: f64,
    pub tankiness: f64,
    pub damage_composition: f64,
    pub survivability: f64,
    pub crowd_control: f64,
}

impl DimensionScores {
    pub fn neutral() -> Self {
        Self::from_fn(|_| NEUTRAL_SCORE)
    }

    pub fn from_fn(mut f: impl FnMut(Dimension) -> f64) -> Self {
        Self {
            combat: f(Dimension::Combat),
            economy: f(Dimension::Economy),
            objective: f(Dimension::Objective),
            vision: f(Dimension::Vision),
            teamplay: f(Dimension::Teamplay),
            growth: f(Dimension::Growth),
            tankiness: f(Dimension::Tankiness),
            damage_composition: f(Dimension::DamageComposition),
            survivability: f(Dimension::Survivability),
            crowd_control: f(Dimension::CrowdControl),
        }
    }

    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Combat => self.combat,
            Dimension::Economy => self.economy,
            Dimension::Objective => self.objective,
            Dimension::Vision => self.vision,
            Dimension::Teamplay => self.teamplay,
            Dimension::Growth => self.growth,
            Dimension::Tankiness => self.tankiness,
            Dimension::DamageComposition => self.damage_composition,
            Dimension::Survivability => self.survivability,
            Dimension::CrowdControl => self.crowd_control,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        Dimension::ALL.iter().map(move |d| (*d, self.get(*d)))
    }

    /// Fixed-weight sum, rounded to two decimals.
    pub fn weighted_overall(&self) -> f64 {
        let sum: f64 = self
            .iter()
            .map(|(d, score)| score * f64::from(d.weight_percent()))
            .sum();
        round2((sum / 100.0).clamp(0.0, 100.0))
    }
}

/// Scores for one participant. Never mutated in place; rescoring produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantScore {
    pub participant_id: ParticipantId,
    #[serde(default)]
    pub team_id: Option<u16>,
    /// Champion name when known.
    #[serde(default)]
    pub subject_name: Option<String>,
    #[serde(default)]
    pub riot_id: Option<String>,
    pub dimensions: DimensionScores,
    pub overall_score: f64,
    /// Derived numeric facts (kills, cs, gold, damage, ...).
    #[serde(default)]
    pub raw_stats: BTreeMap<String, f64>,
    pub kda_source: KdaSource,
    #[serde(default)]
    pub discrepancy: Option<KdaDiscrepancy>,
    #[serde(default)]
    pub win: Option<bool>,
}

impl ParticipantScore {
    /// Highest dimension; ties resolve to the earlier dimension.
    pub fn strongest(&self) -> (Dimension, f64) {
        self.dimensions
            .iter()
            .fold((Dimension::Combat, f64::MIN), |best, (d, s)| {
                if s > best.1 {
                    (d, s)
                } else {
                    best
                }
            })
    }

    /// Lowest dimension; ties resolve to the earlier dimension.
    pub fn weakest(&self) -> (Dimension, f64) {
        self.dimensions
            .iter()
            .fold((Dimension::Combat, f64::MAX), |worst, (d, s)| {
                if s < worst.1 {
                    (d, s)
                } else {
                    worst
                }
            })
    }

    pub fn stat(&self, key: &str) -> Option<f64> {
        self.raw_stats.get(key).copied()
    }

    /// Display name for narration: champion, then riot id, then a generic label.
    pub fn display_subject(&self) -> String {
        self.subject_name
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.riot_id.clone().filter(|s| !s.trim().is_empty()))
            .unwrap_or_else(|| format!("Player {}", self.participant_id))
    }
}

/// Deterministic scoring engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    /// Score one participant. Never fails: missing data yields neutral defaults.
    pub fn score(
        &self,
        timeline: &MatchTimeline,
        participant: ParticipantId,
        details: Option<&MatchDetails>,
    ) -> ParticipantScore {
        let layout = TeamLayout::resolve(timeline, details);
        self.score_with_layout(timeline, participant, details, &layout)
    }

    /// Score every participant seen in the timeline or the details.
    pub fn score_all(
        &self,
        timeline: &MatchTimeline,
        details: Option<&MatchDetails>,
    ) -> BTreeMap<ParticipantId, ParticipantScore> {
        let layout = TeamLayout::resolve(timeline, details);
        let mut ids = timeline.participant_ids();
        if let Some(details) = details {
            ids.extend(details.participants.iter().map(|p| p.participant_id));
        }
        ids.into_iter()
            .map(|id| (id, self.score_with_layout(timeline, id, details, &layout)))
            .collect()
    }

    fn score_with_layout(
        &self,
        timeline: &MatchTimeline,
        participant: ParticipantId,
        details: Option<&MatchDetails>,
        layout: &TeamLayout,
    ) -> ParticipantScore {
        let ctx = context::ParticipantContext::build(timeline, participant, details, layout);

        let dimensions = if ctx.has_frame {
            DimensionScores::from_fn(|d| dimensions::score_dimension(d, &ctx))
        } else {
            DimensionScores::neutral()
        };

        let stats = details.and_then(|d| d.participant(participant));
        ParticipantScore {
            participant_id: participant,
            team_id: layout.team_of(participant),
            subject_name: stats
                .map(|s| s.champion_name.clone())
                .filter(|s| !s.is_empty()),
            riot_id: stats.and_then(|s| s.riot_id_game_name.clone()),
            overall_score: dimensions.weighted_overall(),
            dimensions,
            raw_stats: ctx.raw_stats(),
            kda_source: ctx.kda.source,
            discrepancy: ctx.kda.discrepancy.clone(),
            win: stats.map(|s| s.win),
        }
    }
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
