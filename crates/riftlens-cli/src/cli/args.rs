use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "riftlens",
    version,
    about = "Post-match performance scoring and narrated match analysis"
)]
pub struct Cli {
    /// Log output format (logs are written to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Score a match timeline and print the scores as JSON
    Score(ScoreArgs),
    /// Run the full analysis pipeline against a fixture directory
    Analyze(AnalyzeArgs),
    /// Run the speech guardrail over a piece of text
    Guard(GuardArgs),
}

#[derive(clap::Args, Clone)]
pub struct ScoreArgs {
    /// Timeline JSON (match-v5 timeline shape)
    #[arg(long)]
    pub timeline: PathBuf,

    /// Match details JSON with authoritative participant stats
    #[arg(long)]
    pub details: Option<PathBuf>,

    /// Print only this participant's score
    #[arg(long)]
    pub participant: Option<u8>,
}

#[derive(clap::Args, Clone)]
pub struct AnalyzeArgs {
    #[arg(long)]
    pub match_id: String,

    /// Narrative focus
    #[arg(long)]
    pub participant: u8,

    /// Directory holding `{match_id}.timeline.json` and `{match_id}.details.json`
    #[arg(long)]
    pub fixtures: PathBuf,

    /// SQLite result store (in-memory when omitted)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Pipeline config YAML; RIFTLENS_* variables still apply on top
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Persist narrative cache entries in this directory
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// OpenAI-compatible base URL; the template narrative is used when omitted
    #[arg(long)]
    pub llm_url: Option<String>,

    #[arg(long, env = "RIFTLENS_LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Chat platform API base URL for delivery
    #[arg(long)]
    pub discord_url: Option<String>,

    #[arg(long, requires = "discord_url")]
    pub application_id: Option<String>,

    #[arg(long, requires = "discord_url")]
    pub interaction_token: Option<String>,

    #[arg(long, requires = "discord_url")]
    pub channel_id: Option<String>,

    /// When the interaction token was issued (RFC 3339, defaults to now)
    #[arg(long)]
    pub token_issued_at: Option<DateTime<Utc>>,

    #[arg(long, env = "RIFTLENS_BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,
}

#[derive(clap::Args, Clone)]
pub struct GuardArgs {
    /// Text to guard
    #[arg(long)]
    pub text: String,

    /// Output of `riftlens score` (a single score or the whole match)
    #[arg(long)]
    pub score: PathBuf,

    /// Participant to use when the score file holds a whole match
    #[arg(long)]
    pub participant: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn delivery_flags_need_a_base_url() {
        let parsed = Cli::try_parse_from([
            "riftlens",
            "analyze",
            "--match-id",
            "EUW1_1",
            "--participant",
            "1",
            "--fixtures",
            "fx",
            "--channel-id",
            "c1",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn log_format_is_global() {
        let cli = Cli::try_parse_from([
            "riftlens",
            "score",
            "--timeline",
            "t.json",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
