use std::collections::BTreeSet;

use crate::scoring::ParticipantScore;

use super::text::NUMERIC_TOKEN;

/// Facts a narration may state about one participant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactLedger {
    subject: String,
    aliases: Vec<String>,
    competitors: Vec<String>,
    numbers: BTreeSet<String>,
    template: Option<TemplateFacts>,
}

/// Inputs for the deterministic fallback sentence set.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateFacts {
    pub subject: String,
    pub overall: f64,
    pub strongest: (String, f64),
    pub weakest: (String, f64),
    pub win: Option<bool>,
}

impl FactLedger {
    /// Ledger with only a subject name: no numbers allowed, no template.
    pub fn new(subject: impl Into<String>) -> Self {
        let mut ledger = Self {
            subject: subject.into(),
            ..Self::default()
        };
        ledger.allow_numbers_in_names();
        ledger
    }

    /// Whitelist every raw stat and rounded score of `score`. `competitors`
    /// are other names that may appear in generated text and must be
    /// rewritten to the subject.
    pub fn from_score(score: &ParticipantScore, competitors: &[String]) -> Self {
        let subject = score.display_subject();
        let mut aliases = Vec::new();
        for alias in [score.subject_name.as_ref(), score.riot_id.as_ref()]
            .into_iter()
            .flatten()
        {
            if !alias.trim().is_empty() && alias != &subject && !aliases.contains(alias) {
                aliases.push(alias.clone());
            }
        }

        let mut ledger = Self {
            subject: subject.clone(),
            aliases,
            competitors: Vec::new(),
            numbers: BTreeSet::new(),
            template: None,
        };
        for competitor in competitors {
            ledger = ledger.with_competitor(competitor.clone());
        }

        for value in score.raw_stats.values() {
            ledger.allow_value(*value);
        }
        for (_, value) in score.dimensions.iter() {
            ledger.allow_value(value);
        }
        ledger.allow_value(score.overall_score);
        ledger.allow_numbers_in_names();

        let (strong, strong_score) = score.strongest();
        let (weak, weak_score) = score.weakest();
        ledger.template = Some(TemplateFacts {
            subject,
            overall: score.overall_score,
            strongest: (strong.display_name().to_string(), strong_score),
            weakest: (weak.display_name().to_string(), weak_score),
            win: score.win,
        });
        ledger
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        if !alias.trim().is_empty() && alias != self.subject && !self.aliases.contains(&alias) {
            self.aliases.push(alias);
            self.allow_numbers_in_names();
        }
        self
    }

    /// Names contained in the subject are skipped so replacement stays idempotent.
    pub fn with_competitor(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty()
            || self.subject.to_lowercase().contains(&trimmed.to_lowercase())
            || self.competitors.iter().any(|c| c == trimmed)
        {
            return self;
        }
        self.competitors.push(trimmed.to_string());
        self
    }

    pub fn with_number(mut self, token: &str) -> Self {
        self.numbers.insert(normalize_number(token));
        self
    }

    pub fn with_template(mut self, template: TemplateFacts) -> Self {
        self.template = Some(template);
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn competitors(&self) -> &[String] {
        &self.competitors
    }

    pub fn template(&self) -> Option<&TemplateFacts> {
        self.template.as_ref()
    }

    pub fn allows(&self, token: &str) -> bool {
        self.numbers.contains(&normalize_number(token))
    }

    /// Names to rewrite, longest first, excluding anything the subject contains.
    pub(crate) fn names_to_replace(&self) -> Vec<&str> {
        let subject = self.subject.to_lowercase();
        let mut names: Vec<&str> = self
            .aliases
            .iter()
            .chain(self.competitors.iter())
            .map(String::as_str)
            .filter(|n| !subject.contains(&n.to_lowercase()))
            .collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        names.dedup();
        names
    }

    fn allow_value(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        if value.fract() == 0.0 {
            self.numbers.insert(format!("{}", value as i64));
        }
        self.numbers.insert(format!("{:.0}", value));
        self.numbers.insert(trim_decimal(&format!("{:.1}", value)));
        self.numbers.insert(trim_decimal(&format!("{:.2}", value)));
    }

    fn allow_numbers_in_names(&mut self) {
        let names: Vec<String> = std::iter::once(self.subject.clone())
            .chain(self.aliases.iter().cloned())
            .collect();
        for name in names {
            for m in NUMERIC_TOKEN.find_iter(&name) {
                self.numbers.insert(normalize_number(m.as_str()));
            }
        }
    }
}

/// Canonical spelling of a numeric token: no percent sign, no digit
/// grouping, `.` as decimal point, no trailing zeros after it.
pub(crate) fn normalize_number(token: &str) -> String {
    let bare = token.trim().trim_end_matches('%');
    let grouped = bare.contains(',')
        && bare
            .split(',')
            .skip(1)
            .all(|group| group.len() == 3 && group.chars().all(|c| c.is_ascii_digit()));
    let plain = if grouped {
        bare.replace(',', "")
    } else {
        bare.replace(',', ".")
    };
    trim_decimal(&plain)
}

fn trim_decimal(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}
