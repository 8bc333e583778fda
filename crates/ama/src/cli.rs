//! CLI argument parsing using clap derive macros.

use std::path::PathBuf;

use atmyapp_api_rs::collections::Format;
use atmyapp_local_rs::ClientMode;
use clap::{Args, Parser, Subcommand};

/// ama - query AtMyApp collections from the command line
#[derive(Parser, Debug)]
#[command(name = "ama")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override API key (default: from config/env)
    #[arg(long, global = true, env = "AMA_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Override the API base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Client mode: online, local or with-fallback
    #[arg(long, global = true)]
    pub mode: Option<ClientMode>,

    /// Local snapshot directory (default: .ama/local)
    #[arg(long, global = true)]
    pub local_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List entries of a collection
    #[command(alias = "ls")]
    List {
        /// Collection name
        collection: String,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Show the entry with the given id
    Get {
        /// Collection name
        collection: String,

        /// Entry id
        id: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show the first entry matching the query
    First {
        /// Collection name
        collection: String,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Show several entries by id, in the order given
    Many {
        /// Collection name
        collection: String,

        /// Entry ids
        #[arg(required = true)]
        ids: Vec<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List the collections in the local snapshot
    Collections,

    /// View configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

/// Query options shared by list-style commands.
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Condition `field.op=value` (repeatable, all must hold)
    #[arg(short = 'w', long = "where", value_name = "COND", action = clap::ArgAction::Append)]
    pub where_: Vec<String>,

    /// Condition `field.op=value` (repeatable, at least one must hold)
    #[arg(long, value_name = "COND", action = clap::ArgAction::Append)]
    pub any: Vec<String>,

    /// Columns to select (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub select: Vec<String>,

    /// Ordering: id, created or updated, with optional .asc/.desc
    #[arg(short, long)]
    pub order: Option<String>,

    /// Maximum number of entries
    #[arg(short, long, allow_negative_numbers = true)]
    pub limit: Option<i64>,

    /// Number of entries to skip
    #[arg(long, allow_negative_numbers = true)]
    pub offset: Option<i64>,

    /// Inclusive range START:END (exclusive with --limit/--offset)
    #[arg(long, value_name = "START:END")]
    pub range: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Output and request options shared by every read command.
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Output format: raw, data, dictionary or dataWithMeta
    #[arg(short, long)]
    pub format: Option<Format>,

    /// Preview key for draft content
    #[arg(long)]
    pub preview_key: Option<String>,

    /// Plugins to request (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub plugins: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Print config file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_with_conditions() {
        let cli = Cli::try_parse_from([
            "ama",
            "list",
            "orders",
            "--where",
            "status.eq=done",
            "-w",
            "total.gte=100",
            "--any",
            "tag.eq=a",
            "--order",
            "created.desc",
            "--limit",
            "5",
        ])
        .unwrap();

        let Commands::List { collection, query } = cli.command else {
            panic!("Expected list command");
        };
        assert_eq!(collection, "orders");
        assert_eq!(query.where_, vec!["status.eq=done", "total.gte=100"]);
        assert_eq!(query.any, vec!["tag.eq=a"]);
        assert_eq!(query.order.as_deref(), Some("created.desc"));
        assert_eq!(query.limit, Some(5));
    }

    #[test]
    fn test_parse_global_mode_and_format() {
        let cli = Cli::try_parse_from([
            "ama",
            "get",
            "orders",
            "o-1",
            "--mode",
            "with-fallback",
            "--format",
            "dataWithMeta",
        ])
        .unwrap();
        assert_eq!(cli.mode, Some(ClientMode::WithFallback));

        let Commands::Get { id, output, .. } = cli.command else {
            panic!("Expected get command");
        };
        assert_eq!(id, "o-1");
        assert_eq!(output.format, Some(Format::DataWithMeta));
    }

    #[test]
    fn test_parse_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["ama", "--mode", "offline", "collections"]).is_err());
    }

    #[test]
    fn test_many_requires_ids() {
        assert!(Cli::try_parse_from(["ama", "many", "orders"]).is_err());

        let cli = Cli::try_parse_from(["ama", "many", "orders", "b", "a", "--plugins", "x,y"])
            .unwrap();
        let Commands::Many { ids, output, .. } = cli.command else {
            panic!("Expected many command");
        };
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(output.plugins, vec!["x", "y"]);
    }

    #[test]
    fn test_negative_offset_is_accepted() {
        let cli = Cli::try_parse_from(["ama", "list", "orders", "--offset", "-3"]).unwrap();
        let Commands::List { query, .. } = cli.command else {
            panic!("Expected list command");
        };
        assert_eq!(query.offset, Some(-3));
    }
}
