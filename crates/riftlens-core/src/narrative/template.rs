use crate::scoring::ParticipantScore;

fn band(score: f64) -> &'static str {
    match score {
        s if s >= 75.0 => "an outstanding",
        s if s >= 55.0 => "a solid",
        s if s >= 40.0 => "a steady",
        _ => "a tough",
    }
}

/// Deterministic recap from the score alone. No network, no clock.
pub fn template_narrative(score: &ParticipantScore) -> String {
    let subject = score.display_subject();
    let (strong, strong_score) = score.strongest();
    let (weak, weak_score) = score.weakest();

    let mut sentences = Vec::with_capacity(4);
    let outcome = match score.win {
        Some(true) => " in a victory",
        Some(false) => " in a defeat",
        None => "",
    };
    sentences.push(format!(
        "{subject} put together {} game{outcome}, finishing with an overall rating of {:.0}.",
        band(score.overall_score),
        score.overall_score
    ));

    if let (Some(k), Some(d), Some(a)) = (
        score.stat("kills"),
        score.stat("deaths"),
        score.stat("assists"),
    ) {
        sentences.push(format!(
            "They went {k:.0} kills, {d:.0} deaths and {a:.0} assists."
        ));
    }

    sentences.push(format!(
        "The standout area was {} at {strong_score:.0}.",
        strong.display_name()
    ));
    if weak != strong {
        sentences.push(format!(
            "The most room to grow is in {} at {weak_score:.0}.",
            weak.display_name()
        ));
    }
    sentences.join(" ")
}
