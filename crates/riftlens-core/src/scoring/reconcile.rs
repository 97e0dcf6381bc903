//! Kill/death/assist reconciliation between timeline events and the
//! authoritative end-of-match record.

use serde::{Deserialize, Serialize};

use crate::timeline::{GameEvent, MatchTimeline, ParticipantId, ParticipantStats};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kda {
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
}

impl Kda {
    pub fn is_zero(&self) -> bool {
        self.kills == 0 && self.deaths == 0 && self.assists == 0
    }

    /// (kills + assists) / deaths with deaths floored at 1.
    pub fn ratio(&self) -> f64 {
        (f64::from(self.kills) + f64::from(self.assists)) / f64::from(self.deaths.max(1))
    }

    fn from_stats(stats: &ParticipantStats) -> Self {
        Self {
            kills: stats.kills,
            deaths: stats.deaths,
            assists: stats.assists,
        }
    }
}

/// Where the reported K/D/A came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KdaSource {
    /// Only timeline events were available.
    Timeline,
    /// Authoritative record used (alone, or both sources agreed).
    Authoritative,
    /// Sources disagreed; the authoritative record won.
    Reconciled,
}

/// Recorded when the two sources disagree. Metadata only, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdaDiscrepancy {
    pub timeline: Kda,
    pub authoritative: Kda,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReconciledKda {
    pub(crate) value: Kda,
    pub(crate) source: KdaSource,
    pub(crate) discrepancy: Option<KdaDiscrepancy>,
}

pub(crate) fn timeline_kda(timeline: &MatchTimeline, participant: ParticipantId) -> Kda {
    let mut kda = Kda::default();
    for event in timeline.events() {
        if let GameEvent::ChampionKill {
            killer_id,
            victim_id,
            assisting_participant_ids,
            ..
        } = event
        {
            if *killer_id == participant {
                kda.kills = kda.kills.saturating_add(1);
            }
            if *victim_id == participant {
                kda.deaths = kda.deaths.saturating_add(1);
            }
            if assisting_participant_ids.contains(&participant) {
                kda.assists = kda.assists.saturating_add(1);
            }
        }
    }
    kda
}

/// Authoritative wins on disagreement. A single source is taken as-is even
/// when it looks internally inconsistent.
pub(crate) fn reconcile(
    timeline: &MatchTimeline,
    participant: ParticipantId,
    authoritative: Option<&ParticipantStats>,
) -> ReconciledKda {
    let from_timeline = timeline_kda(timeline, participant);
    match authoritative {
        None => ReconciledKda {
            value: from_timeline,
            source: KdaSource::Timeline,
            discrepancy: None,
        },
        Some(stats) => {
            let official = Kda::from_stats(stats);
            let timeline_has_data = timeline.events().next().is_some();
            if !timeline_has_data || official == from_timeline {
                ReconciledKda {
                    value: official,
                    source: KdaSource::Authoritative,
                    discrepancy: None,
                }
            } else {
                tracing::debug!(
                    participant,
                    timeline = ?from_timeline,
                    authoritative = ?official,
                    "kda sources disagree; using authoritative record"
                );
                ReconciledKda {
                    value: official,
                    source: KdaSource::Reconciled,
                    discrepancy: Some(KdaDiscrepancy {
                        timeline: from_timeline,
                        authoritative: official,
                    }),
                }
            }
        }
    }
}
