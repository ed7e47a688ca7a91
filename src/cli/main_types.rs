use crate::template::MissingPolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "unicore")]
#[command(about = "Utility belt for JSON values: chained helpers, safe templates and audit logging")]
#[command(version)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, env = "UNICORE_CONFIG_DIR")]
    pub config_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a template file against a JSON context
    Render {
        /// Template file, or '-' for stdin
        template: String,
        /// Context as an inline JSON object
        #[arg(long, conflicts_with = "context_file")]
        context: Option<String>,
        /// Context read from a JSON file
        #[arg(long)]
        context_file: Option<PathBuf>,
        /// Disable HTML escaping of '<%= %>' output
        #[arg(long)]
        raw: bool,
        /// Behavior on missing names and keys: error or empty
        #[arg(long)]
        missing: Option<MissingPolicy>,
    },
    /// Run-length encode text
    Compress {
        text: String,
    },
    /// Decode run-length encoded text
    Decompress {
        text: String,
    },
    /// Thread a JSON value through registered operations
    Chain {
        /// Starting value as JSON
        value: String,
        /// Operations as 'name' or 'name:[json, args]'
        #[arg(required = true)]
        ops: Vec<String>,
    },
    /// List every operation the chain command can call
    Functions,
    /// Append an entry to the audit log
    Audit {
        /// Event type, stored upper-cased
        event: String,
        /// Free-form message
        message: String,
        /// Log file, overriding the configured one
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the current configuration
    Show,
    /// Set configuration value
    Set {
        /// Configuration key, e.g. rate_limit.max_calls
        key: String,
        /// Configuration value
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chain_command() {
        let cli = Cli::try_parse_from(["unicore", "chain", "[1,2]", "first", "size"]).unwrap();
        match cli.command {
            Commands::Chain { value, ops } => {
                assert_eq!(value, "[1,2]");
                assert_eq!(ops, vec!["first", "size"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_render_flags() {
        let cli = Cli::try_parse_from([
            "unicore", "--verbose", "render", "t.tpl", "--context", "{}", "--raw", "--missing", "empty",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Render { raw, missing, .. } => {
                assert!(raw);
                assert_eq!(missing, Some(MissingPolicy::Empty));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_render_context_sources_conflict() {
        assert!(
            Cli::try_parse_from([
                "unicore", "render", "t.tpl", "--context", "{}", "--context-file", "c.json"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_chain_requires_operations() {
        assert!(Cli::try_parse_from(["unicore", "chain", "[]"]).is_err());
    }
}
