//! CLI argument parsing

use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

use crate::registry::Event;

/// Event sequence run when none is given on the command line
pub const DEMO_SEQUENCE: [Event; 5] = [Event::A, Event::A, Event::B, Event::B, Event::A];

/// sm - drive a serialized state machine through a sequence of events
#[derive(Parser, Debug)]
#[command(name = "sm")]
#[command(author, version, about = "Serialized finite-state machine demo", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Write the effective config (file plus defaults) to this path before running
    #[arg(long = "save-config", value_name = "PATH")]
    pub save_config: Option<PathBuf>,

    /// Output format for the final summary
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Events to submit, in order (defaults to: A A B B A)
    #[arg(value_name = "EVENT")]
    pub events: Vec<Event>,
}

impl Cli {
    /// Events to run, falling back to the demo sequence
    pub fn sequence(&self) -> Vec<Event> {
        if self.events.is_empty() {
            debug!("Cli::sequence: no events given, using demo sequence");
            DEMO_SEQUENCE.to_vec()
        } else {
            self.events.clone()
        }
    }
}

/// Output format for the final summary
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_demo_sequence() {
        let cli = Cli::parse_from(["sm"]);
        assert_eq!(cli.sequence(), DEMO_SEQUENCE.to_vec());
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parses_events() {
        let cli = Cli::parse_from(["sm", "b", "A", "b"]);
        assert_eq!(cli.sequence(), vec![Event::B, Event::A, Event::B]);
    }

    #[test]
    fn test_rejects_unknown_event() {
        assert!(Cli::try_parse_from(["sm", "C"]).is_err());
    }

    #[test]
    fn test_parses_flags() {
        let cli = Cli::parse_from(["sm", "-l", "debug", "--format", "json", "-c", "sm.yml"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("sm.yml")));
        assert!(cli.save_config.is_none());
    }

    #[test]
    fn test_parses_save_config() {
        let cli = Cli::parse_from(["sm", "--save-config", "out.yml", "a"]);
        assert_eq!(cli.save_config, Some(PathBuf::from("out.yml")));
        assert_eq!(cli.sequence(), vec![Event::A]);
    }
}
