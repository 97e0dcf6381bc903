use super::context::ParticipantContext;
use super::{round2, Dimension, NEUTRAL_SCORE};

/// Component value when its inputs are unavailable.
const MISSING: f64 = 0.5;

/// Maps `x >= 0` onto [0,1) with `x == midpoint` landing on 0.5.
pub(crate) fn saturate(x: f64, midpoint: f64) -> f64 {
    if !x.is_finite() || x <= 0.0 || midpoint <= 0.0 {
        return 0.0;
    }
    x / (x + midpoint)
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator > 0.0 && numerator.is_finite() {
        Some(numerator / denominator)
    } else {
        None
    }
}

/// Mean of the components scaled to [0,100].
fn combine(components: &[Option<f64>]) -> f64 {
    if components.is_empty() {
        return NEUTRAL_SCORE;
    }
    let sum: f64 = components
        .iter()
        .map(|c| c.filter(|v| v.is_finite()).unwrap_or(MISSING).clamp(0.0, 1.0))
        .sum();
    round2((sum / components.len() as f64 * 100.0).clamp(0.0, 100.0))
}

pub(crate) fn score_dimension(dimension: Dimension, ctx: &ParticipantContext) -> f64 {
    match dimension {
        Dimension::Combat => combat(ctx),
        Dimension::Economy => economy(ctx),
        Dimension::Objective => objective(ctx),
        Dimension::Vision => vision(ctx),
        Dimension::Teamplay => teamplay(ctx),
        Dimension::Growth => growth(ctx),
        Dimension::Tankiness => tankiness(ctx),
        Dimension::DamageComposition => damage_composition(ctx),
        Dimension::Survivability => survivability(ctx),
        Dimension::CrowdControl => crowd_control(ctx),
    }
}

fn combat(ctx: &ParticipantContext) -> f64 {
    // No takedowns or deaths at all: nothing to judge.
    if ctx.kda.value.is_zero() {
        return NEUTRAL_SCORE;
    }
    let damage_per_gold = if ctx.gold > 0.0 && ctx.damage_to_champions > 0.0 {
        Some(saturate(ctx.damage_to_champions / ctx.gold, 1.5))
    } else {
        None
    };
    combine(&[
        Some(saturate(ctx.kda.value.ratio(), 3.0)),
        ctx.kill_participation(),
        damage_per_gold,
    ])
}

fn economy(ctx: &ParticipantContext) -> f64 {
    let fair_share = 1.0 / ctx.team_size as f64;
    combine(&[
        ctx.per_minute(ctx.gold).map(|gpm| saturate(gpm, 400.0)),
        ctx.per_minute(ctx.cs).map(|cs| saturate(cs, 6.0)),
        ratio(ctx.gold, ctx.team_gold).map(|share| saturate(share, fair_share)),
    ])
}

fn objective(ctx: &ParticipantContext) -> f64 {
    combine(&[
        ratio(ctx.epic_involved, ctx.team_epic).map(|s| s.clamp(0.0, 1.0)),
        ratio(ctx.towers_involved, ctx.team_towers).map(|s| s.clamp(0.0, 1.0)),
    ])
}

fn vision(ctx: &ParticipantContext) -> f64 {
    combine(&[
        ctx.per_minute(ctx.wards_placed).map(|w| saturate(w, 0.6)),
        ctx.per_minute(ctx.wards_killed).map(|w| saturate(w, 0.15)),
        ctx.vision_score
            .and_then(|v| ctx.per_minute(v))
            .map(|v| saturate(v, 1.0)),
    ])
}

fn teamplay(ctx: &ParticipantContext) -> f64 {
    let takedowns = ctx.kills() + ctx.assists();
    combine(&[
        ctx.kill_participation(),
        ratio(ctx.assists(), takedowns),
        ctx.proximity,
    ])
}

fn growth(ctx: &ParticipantContext) -> f64 {
    let level = if ctx.level > 0.0 {
        Some((ctx.level / 18.0).clamp(0.0, 1.0))
    } else {
        None
    };
    combine(&[
        ctx.per_minute(ctx.xp).map(|x| saturate(x, 450.0)),
        level,
        ratio(ctx.xp, ctx.lobby_mean_xp).map(|r| saturate(r, 1.0)),
    ])
}

fn tankiness(ctx: &ParticipantContext) -> f64 {
    let fair_share = 1.0 / ctx.team_size as f64;
    combine(&[
        ctx.per_minute(ctx.damage_taken).map(|d| saturate(d, 700.0)),
        ratio(ctx.damage_taken, ctx.team_damage_taken).map(|s| saturate(s, fair_share)),
        ctx.self_mitigated
            .and_then(|m| ctx.per_minute(m))
            .map(|m| saturate(m, 600.0)),
    ])
}

fn damage_composition(ctx: &ParticipantContext) -> f64 {
    let fair_share = 1.0 / ctx.team_size as f64;
    let typed = [ctx.physical_damage, ctx.magic_damage, ctx.true_damage];
    let typed_total: f64 = typed.iter().sum();
    let diversity = if typed_total > 0.0 {
        let entropy: f64 = typed
            .iter()
            .filter(|v| **v > 0.0)
            .map(|v| {
                let p = v / typed_total;
                -p * p.ln()
            })
            .sum();
        Some(entropy / 3f64.ln())
    } else {
        None
    };
    combine(&[
        ratio(ctx.damage_to_champions, ctx.team_damage).map(|s| saturate(s, fair_share)),
        diversity,
    ])
}

fn survivability(ctx: &ParticipantContext) -> f64 {
    let deaths_per_ten = ctx.per_minute(ctx.deaths()).map(|d| d * 10.0);
    let taken_per_death = if ctx.damage_taken > 0.0 {
        Some(saturate(ctx.damage_taken / ctx.deaths().max(1.0), 6_000.0))
    } else {
        None
    };
    combine(&[
        deaths_per_ten.map(|d| 1.0 - saturate(d, 1.5)),
        taken_per_death,
    ])
}

fn crowd_control(ctx: &ParticipantContext) -> f64 {
    combine(&[
        ctx.per_minute(ctx.cc_seconds).map(|c| saturate(c, 1.0)),
        ctx.cc_dealt
            .and_then(|c| ctx.per_minute(c))
            .map(|c| saturate(c, 0.8)),
    ])
}
