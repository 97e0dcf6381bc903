//! Text guardrail run before speech synthesis.
//!
//! [`TtsGuardrail::guard`] turns generated narration into text that is safe
//! to speak: markup removed, banned claims removed, names attributed to the
//! right subject, ungrounded numbers removed and length bounded. It never
//! fails; the only outcomes are a validated string or `None`.
//!
//! Every returned string is a fixed point: guarding it again yields it
//! unchanged.

mod ledger;
mod text;

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::config::GuardrailConfig;
use crate::error::{RiftError, RiftResult};

pub use ledger::{FactLedger, TemplateFacts};

use text::{
    capitalize_first, char_len, collapse_whitespace, join_sentences, split_sentences,
    strip_markup, trim_to_words, Sentence, NUMERIC_TOKEN,
};

/// Rounds of clean-up before giving up on reaching a stable text.
const MAX_PASSES: usize = 4;

/// What the guardrail changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GuardReport {
    pub text: Option<String>,
    pub removed_numbers: Vec<String>,
    pub removed_phrases: Vec<String>,
    pub replaced_names: Vec<String>,
    pub used_template: bool,
}

#[derive(Debug, Clone)]
pub struct TtsGuardrail {
    min_chars: usize,
    max_chars: usize,
    max_sentences: usize,
    banned: Option<Regex>,
}

impl TtsGuardrail {
    pub fn new(config: &GuardrailConfig) -> RiftResult<Self> {
        let mut phrases: Vec<&str> = config
            .banned_phrases
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();
        phrases.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        phrases.dedup();

        let banned = if phrases.is_empty() {
            None
        } else {
            let alternation = phrases
                .iter()
                .map(|p| regex::escape(p))
                .collect::<Vec<_>>()
                .join("|");
            let re = RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
                .case_insensitive(true)
                .build()
                .map_err(|e| RiftError::config(format!("invalid banned phrase list: {e}")))?;
            Some(re)
        };

        Ok(Self {
            min_chars: config.min_chars,
            max_chars: config.max_chars,
            max_sentences: config.max_sentences.max(1),
            banned,
        })
    }

    pub fn guard(&self, text: &str, ledger: &FactLedger) -> Option<String> {
        self.guard_with_report(text, ledger).text
    }

    pub fn guard_with_report(&self, text: &str, ledger: &FactLedger) -> GuardReport {
        let mut report = GuardReport::default();
        let mut current = match self.pipeline(text, ledger, &mut report) {
            Some(out) => out,
            None => return report,
        };

        // Only hand out text that survives another pass unchanged.
        for _ in 0..MAX_PASSES {
            let mut scratch = GuardReport::default();
            match self.pipeline(&current, ledger, &mut scratch) {
                Some(next) if next == current => {
                    report.text = Some(current);
                    return report;
                }
                Some(next) => {
                    merge(&mut report, scratch);
                    current = next;
                }
                None => break,
            }
        }
        tracing::debug!("guardrail output did not stabilise; dropping narration");
        report.text = None;
        report
    }

    /// Fails with `HallucinationDetected` if `text` still carries an
    /// ungrounded number or a banned phrase.
    pub fn verify(&self, text: &str, ledger: &FactLedger) -> RiftResult<()> {
        if let Some(m) = NUMERIC_TOKEN.find_iter(text).find(|m| !ledger.allows(m.as_str())) {
            return Err(RiftError::HallucinationDetected {
                detail: format!("ungrounded number '{}'", m.as_str()),
            });
        }
        if let Some(m) = self.banned.as_ref().and_then(|re| re.find(text)) {
            return Err(RiftError::HallucinationDetected {
                detail: format!("banned phrase '{}'", m.as_str()),
            });
        }
        Ok(())
    }

    fn pipeline(&self, text: &str, ledger: &FactLedger, report: &mut GuardReport) -> Option<String> {
        let cleaned = self.clean(text, ledger, report);
        if let Some(bounded) = self.bound_length(&cleaned) {
            return Some(bounded);
        }

        let facts = ledger.template()?;
        report.used_template = true;
        let templated = self.clean(&render_template(facts), ledger, report);
        self.bound_length(&templated)
    }

    /// Steps one to four, repeated until the text stops changing.
    fn clean(&self, text: &str, ledger: &FactLedger, report: &mut GuardReport) -> String {
        let mut current = text.to_string();
        for _ in 0..MAX_PASSES {
            let stripped = strip_markup(&current);
            let without_claims = self.remove_banned(&stripped, report);
            let renamed = replace_names(&without_claims, ledger, report);
            let grounded = remove_ungrounded_numbers(&renamed, ledger, report);
            if grounded == current {
                break;
            }
            current = grounded;
        }
        current
    }

    fn remove_banned(&self, text: &str, report: &mut GuardReport) -> String {
        let Some(banned) = &self.banned else {
            return text.to_string();
        };
        remove_clauses(text, |clause| match banned.find(clause) {
            Some(m) => {
                report.removed_phrases.push(m.as_str().to_lowercase());
                true
            }
            None => false,
        })
    }

    /// Step five. `None` if the text cannot meet the minimum length.
    fn bound_length(&self, text: &str) -> Option<String> {
        let mut sentences: Vec<Sentence> = split_sentences(text)
            .into_iter()
            .map(Sentence::terminated)
            .take(self.max_sentences)
            .collect();

        while sentences.len() > 1 && char_len(&join_sentences(&sentences)) > self.max_chars {
            sentences.pop();
        }
        let mut joined = join_sentences(&sentences);
        if char_len(&joined) > self.max_chars {
            joined = trim_to_words(&joined, self.max_chars);
        }

        let len = char_len(&joined);
        if len < self.min_chars || len > self.max_chars {
            return None;
        }
        Some(joined)
    }
}

fn merge(into: &mut GuardReport, from: GuardReport) {
    into.removed_numbers.extend(from.removed_numbers);
    into.removed_phrases.extend(from.removed_phrases);
    into.replaced_names.extend(from.replaced_names);
    into.used_template |= from.used_template;
}

/// Drop every clause matching `reject`. A sentence left without clauses is
/// dropped entirely.
fn remove_clauses(text: &str, mut reject: impl FnMut(&str) -> bool) -> String {
    let mut kept = Vec::new();
    for sentence in split_sentences(text) {
        let clauses = sentence.clauses();
        let surviving: Vec<String> = clauses.iter().filter(|c| !reject(c.as_str())).cloned().collect();
        if surviving.is_empty() {
            continue;
        }
        if surviving.len() == clauses.len() {
            kept.push(sentence);
        } else {
            kept.push(Sentence::from_clauses(&surviving, &sentence.terminal));
        }
    }
    join_sentences(&kept)
}

fn replace_names(text: &str, ledger: &FactLedger, report: &mut GuardReport) -> String {
    let mut out = text.to_string();
    for name in ledger.names_to_replace() {
        let pattern = format!(r"\b{}\b", regex::escape(name));
        let Ok(re) = RegexBuilder::new(&pattern).case_insensitive(true).build() else {
            continue;
        };
        if re.is_match(&out) {
            report.replaced_names.push(name.to_string());
            out = re.replace_all(&out, regex::NoExpand(ledger.subject())).into_owned();
        }
    }
    out
}

fn remove_ungrounded_numbers(text: &str, ledger: &FactLedger, report: &mut GuardReport) -> String {
    remove_clauses(text, |clause| {
        let bad: Vec<String> = NUMERIC_TOKEN
            .find_iter(clause)
            .map(|m| m.as_str().to_string())
            .filter(|token| !ledger.allows(token))
            .collect();
        if bad.is_empty() {
            false
        } else {
            report.removed_numbers.extend(bad);
            true
        }
    })
}

/// Deterministic narration built only from score facts.
fn render_template(facts: &TemplateFacts) -> String {
    let outcome = match facts.win {
        Some(true) => " in a win",
        Some(false) => " in a loss",
        None => "",
    };
    let text = format!(
        "{subject} finished with an overall rating of {overall:.0}{outcome}. \
         The standout area was {strong} at {strong_score:.0}. \
         The most room to grow is in {weak} at {weak_score:.0}.",
        subject = facts.subject,
        overall = facts.overall,
        strong = facts.strongest.0,
        strong_score = facts.strongest.1,
        weak = facts.weakest.0,
        weak_score = facts.weakest.1,
    );
    capitalize_first(&collapse_whitespace(&text))
}
