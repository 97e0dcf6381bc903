use super::*;
use crate::timeline::{
    DamageStats, Frame, GameEvent, MatchTimeline, ParticipantFrame, ParticipantStats, Position,
    TimelineInfo,
};

fn pframe(id: u8, minute: u32) -> ParticipantFrame {
    let scale = minute + u32::from(id);
    ParticipantFrame {
        total_gold: 500 + 380 * minute + 10 * u32::from(id),
        xp: 420 * minute,
        level: (1 + minute / 2).min(18),
        minions_killed: 6 * minute,
        jungle_minions_killed: u32::from(id % 2) * minute,
        position: Some(Position {
            x: 1_000 * i32::from(id),
            y: 500 * i32::from(id),
        }),
        time_enemy_spent_controlled: minute * u32::from(id % 3),
        damage_stats: DamageStats {
            total_damage_done_to_champions: 450 * scale,
            physical_damage_done_to_champions: 300 * scale,
            magic_damage_done_to_champions: 120 * scale,
            true_damage_done_to_champions: 30 * scale,
            total_damage_taken: 520 * scale,
        },
    }
}

fn kill(killer: u8, victim: u8, assists: Vec<u8>) -> GameEvent {
    GameEvent::ChampionKill {
        timestamp: 0,
        killer_id: killer,
        victim_id: victim,
        assisting_participant_ids: assists,
    }
}

/// Ten participants over `minutes` frames; participant 7 never appears in an event.
fn sample_timeline(minutes: u32) -> MatchTimeline {
    let mut frames = Vec::new();
    for minute in 0..=minutes {
        let mut frame = Frame {
            timestamp: u64::from(minute) * 60_000,
            ..Default::default()
        };
        for id in 1..=10 {
            frame.participant_frames.insert(id, pframe(id, minute));
        }
        if minute == 5 {
            frame.events = vec![
                kill(1, 6, vec![2, 3]),
                kill(6, 2, vec![8]),
                GameEvent::WardPlaced {
                    timestamp: 0,
                    creator_id: 4,
                    ward_type: "CONTROL_WARD".into(),
                },
                GameEvent::WardPlaced {
                    timestamp: 0,
                    creator_id: 4,
                    ward_type: "UNDEFINED".into(),
                },
            ];
        }
        if minute == 10 {
            frame.events = vec![
                GameEvent::EliteMonsterKill {
                    timestamp: 0,
                    killer_id: 2,
                    monster_type: "DRAGON".into(),
                    assisting_participant_ids: vec![1],
                },
                GameEvent::BuildingKill {
                    timestamp: 0,
                    killer_id: 0,
                    team_id: 200,
                    building_type: "TOWER_BUILDING".into(),
                    assisting_participant_ids: vec![1, 3],
                },
                kill(1, 9, vec![]),
            ];
        }
        frames.push(frame);
    }
    MatchTimeline {
        info: TimelineInfo {
            frame_interval: 60_000,
            frames,
        },
        ..Default::default()
    }
}

fn details_for(timeline: &MatchTimeline) -> MatchDetails {
    let participants = (1..=10u8)
        .map(|id| {
            let kda = super::reconcile::timeline_kda(timeline, id);
            ParticipantStats {
                participant_id: id,
                team_id: if id <= 5 { 100 } else { 200 },
                champion_name: format!("Champ{id}"),
                kills: kda.kills,
                deaths: kda.deaths,
                assists: kda.assists,
                vision_score: 20,
                damage_self_mitigated: 9_000,
                time_c_cing_others: 15,
                win: id <= 5,
                ..Default::default()
            }
        })
        .collect();
    MatchDetails {
        match_id: "EUW1_1".into(),
        game_duration: 20 * 60,
        participants,
    }
}

fn assert_in_bounds(score: &ParticipantScore) {
    for (d, value) in score.dimensions.iter() {
        assert!(
            (0.0..=100.0).contains(&value),
            "{} out of bounds: {value}",
            d.label()
        );
    }
    assert!((0.0..=100.0).contains(&score.overall_score));
}

#[test]
fn weights_sum_to_one_hundred() {
    assert_eq!(total_weight_percent(), 100);
}

#[test]
fn all_scores_stay_within_bounds() {
    let timeline = sample_timeline(20);
    let details = details_for(&timeline);
    let engine = ScoringEngine::new();
    for with_details in [None, Some(&details)] {
        let scores = engine.score_all(&timeline, with_details);
        assert_eq!(scores.len(), 10);
        for score in scores.values() {
            assert_in_bounds(score);
        }
    }
}

#[test]
fn scoring_is_deterministic() {
    let timeline = sample_timeline(20);
    let details = details_for(&timeline);
    let engine = ScoringEngine::new();
    let a = engine.score(&timeline, 1, Some(&details));
    let b = engine.score(&timeline, 1, Some(&details));
    assert_eq!(a, b);
    assert_eq!(a.overall_score.to_bits(), b.overall_score.to_bits());
}

#[test]
fn participant_without_events_has_neutral_combat() {
    let timeline = sample_timeline(20);
    let score = ScoringEngine::new().score(&timeline, 7, None);
    assert_eq!(score.dimensions.combat, 50.0);
    assert_in_bounds(&score);
}

#[test]
fn empty_timeline_scores_neutral() {
    let score = ScoringEngine::new().score(&MatchTimeline::default(), 3, None);
    assert_eq!(score.dimensions, DimensionScores::neutral());
    assert_eq!(score.overall_score, 50.0);
    assert_eq!(score.kda_source, KdaSource::Timeline);
}

#[test]
fn missing_participant_frame_scores_neutral() {
    let timeline = sample_timeline(10);
    let score = ScoringEngine::new().score(&timeline, 14, None);
    assert_eq!(score.dimensions, DimensionScores::neutral());
}

#[test]
fn authoritative_kda_wins_and_records_discrepancy() {
    let timeline = sample_timeline(20);
    let mut details = details_for(&timeline);
    details.participants[0].kills = 5;

    let score = ScoringEngine::new().score(&timeline, 1, Some(&details));
    assert_eq!(score.kda_source, KdaSource::Reconciled);
    assert_eq!(score.stat("kills"), Some(5.0));
    let discrepancy = score.discrepancy.expect("discrepancy recorded");
    assert_eq!(discrepancy.timeline.kills, 2);
    assert_eq!(discrepancy.authoritative.kills, 5);
}

#[test]
fn agreeing_sources_are_authoritative() {
    let timeline = sample_timeline(20);
    let details = details_for(&timeline);
    let score = ScoringEngine::new().score(&timeline, 1, Some(&details));
    assert_eq!(score.kda_source, KdaSource::Authoritative);
    assert!(score.discrepancy.is_none());
    assert_eq!(score.subject_name.as_deref(), Some("Champ1"));
    assert_eq!(score.win, Some(true));
}

#[test]
fn zero_deaths_floor_at_one() {
    let timeline = sample_timeline(20);
    let score = ScoringEngine::new().score(&timeline, 1, None);
    // Participant 1: two kills, no deaths.
    assert_eq!(score.stat("deaths"), Some(0.0));
    assert_eq!(score.stat("kda"), Some(2.0));
    assert_eq!(score.dimensions.survivability, score.dimensions.survivability.clamp(50.0, 100.0));
    assert_in_bounds(&score);
}

#[test]
fn saturated_authoritative_counters_stay_bounded() {
    let timeline = sample_timeline(20);
    let mut details = details_for(&timeline);
    details.participants[0].kills = u32::MAX;
    details.participants[0].assists = 1;

    let mut last = timeline.info.frames.last().cloned().unwrap();
    let pf = last.participant_frames.get_mut(&1).unwrap();
    pf.minions_killed = u32::MAX;
    pf.jungle_minions_killed = u32::MAX;
    let mut timeline = timeline;
    *timeline.info.frames.last_mut().unwrap() = last;

    let score = ScoringEngine::new().score(&timeline, 1, Some(&details));
    assert_eq!(score.kda_source, KdaSource::Reconciled);
    assert_eq!(score.stat("kills"), Some(f64::from(u32::MAX)));
    assert_eq!(score.stat("cs"), Some(2.0 * f64::from(u32::MAX)));
    assert_eq!(score.stat("kda"), Some(f64::from(u32::MAX) + 1.0));
    assert_in_bounds(&score);
}

#[test]
fn objective_credit_follows_involvement() {
    let timeline = sample_timeline(20);
    let engine = ScoringEngine::new();
    let involved = engine.score(&timeline, 1, None);
    let bystander = engine.score(&timeline, 5, None);
    assert_eq!(involved.stat("epic_monsters"), Some(1.0));
    assert_eq!(involved.stat("towers"), Some(1.0));
    assert!(involved.dimensions.objective > bystander.dimensions.objective);
    assert_eq!(bystander.dimensions.objective, 0.0);
}

#[test]
fn undefined_wards_are_not_counted() {
    let timeline = sample_timeline(20);
    let score = ScoringEngine::new().score(&timeline, 4, None);
    assert_eq!(score.stat("wards_placed"), Some(1.0));
}

#[test]
fn overall_matches_weighted_dimensions() {
    let timeline = sample_timeline(20);
    let score = ScoringEngine::new().score(&timeline, 2, None);
    let expected: f64 = score
        .dimensions
        .iter()
        .map(|(d, s)| s * f64::from(d.weight_percent()) / 100.0)
        .sum();
    assert!((score.overall_score - expected).abs() < 0.01);
}

#[test]
fn strongest_and_weakest_pick_extremes() {
    let timeline = sample_timeline(20);
    let score = ScoringEngine::new().score(&timeline, 1, None);
    let (_, top) = score.strongest();
    let (_, bottom) = score.weakest();
    for (_, value) in score.dimensions.iter() {
        assert!(value <= top && value >= bottom);
    }
}

#[test]
fn display_subject_falls_back() {
    let timeline = sample_timeline(2);
    let score = ScoringEngine::new().score(&timeline, 3, None);
    assert_eq!(score.display_subject(), "Player 3");
}
