use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::auth::{Authorizer, Ticket};
use crate::config::Config;
use crate::executor::{evaluate, run, Context, Registry, UnknownEventPolicy};
use crate::parser::{parse_lambda, render_children, render_node, snapshot};
use crate::tree::{NodeId, Tree};

#[derive(Parser)]
#[command(name = "lambda")]
#[command(about = "Lambda - execute node tree scripts", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// What to do with nodes no handler is registered for: error, ignore
    #[arg(long, global = true)]
    pub unknown_events: Option<UnknownEventPolicy>,

    /// Maximum nesting depth of executions
    #[arg(long, global = true)]
    pub max_depth: Option<usize>,

    /// Folder lambda file paths are resolved against
    #[arg(long, global = true)]
    pub io_root: Option<PathBuf>,

    /// Role of the caller
    #[arg(long, global = true, default_value = "guest")]
    pub role: String,

    /// Name of the caller
    #[arg(long, global = true, default_value = "guest")]
    pub username: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a lambda file and print the resulting tree
    Run {
        /// Lambda file to execute
        file: PathBuf,

        /// Execute on a copy and print only what the program returned
        #[arg(long)]
        copy: bool,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a lambda file and print it back
    Parse {
        /// Lambda file to parse
        file: PathBuf,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether the caller may access a path
    Access {
        /// Lambda path, folders end with '/'
        path: String,

        /// Check for write access instead of read access
        #[arg(long)]
        write: bool,
    },

    /// List the registered keywords
    Keywords,
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with provided arguments
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

fn run_cli_with_args(cli: Cli) -> Result<()> {
    let config = Config::builder()
        .config_path(cli.config.clone())
        .unknown_events(cli.unknown_events)
        .max_depth(cli.max_depth)
        .io_root(cli.io_root.clone())
        .build()?;
    init_logging(&config);

    let ticket = Ticket::new(&cli.username, &cli.role);

    match cli.command {
        Commands::Run { file, copy, json } => {
            let mut tree = Tree::new();
            let root = read_program(&mut tree, &file)?;

            let registry = Arc::new(Registry::with_stdlib(config.engine.unknown_events));
            let mut ctx = Context::builder(registry)
                .config(&config)
                .ticket(ticket)
                .build();

            info!(file = %file.display(), copy, "executing");
            if copy {
                run(&mut ctx, &mut tree, root, true)?;
            } else {
                evaluate(&mut ctx, &mut tree, root)?;
            }
            print_tree(&tree, root, json)?;
        }

        Commands::Parse { file, json } => {
            let mut tree = Tree::new();
            let root = read_program(&mut tree, &file)?;
            print_tree(&tree, root, json)?;
        }

        Commands::Access { path, write } => {
            let authorizer = config.auth.authorizer();
            let result = if write {
                authorizer.authorize_modify(&ticket, &path)
            } else {
                authorizer.authorize_read(&ticket, &path)
            };
            match result {
                Ok(()) => println!("✓ {} may {} {}", ticket.role, access_verb(write), path),
                Err(denied) => {
                    eprintln!("✗ {}", denied);
                    std::process::exit(1);
                }
            }
        }

        Commands::Keywords => {
            let registry = Registry::with_stdlib(config.engine.unknown_events);
            for name in registry.names() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over the configured filter
fn init_logging(config: &Config) {
    let configured = config.log.filter.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_program(tree: &mut Tree, file: &Path) -> Result<NodeId> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read lambda file: {:?}", file))?;
    parse_lambda(tree, &source).with_context(|| format!("Failed to parse lambda file: {:?}", file))
}

fn print_tree(tree: &Tree, root: NodeId, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot(tree, root))?);
    } else if tree.value(root).is_some() {
        println!("{}", render_node(tree, root));
    } else {
        println!("{}", render_children(tree, root));
    }
    Ok(())
}

fn access_verb(write: bool) -> &'static str {
    if write {
        "modify"
    } else {
        "read"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::parse_from([
            "lambda",
            "--unknown-events",
            "ignore",
            "run",
            "program.hl",
            "--copy",
        ]);

        assert_eq!(cli.unknown_events, Some(UnknownEventPolicy::Ignore));
        assert_eq!(cli.role, "guest");
        let Commands::Run { file, copy, json } = cli.command else {
            panic!("Expected run command");
        };
        assert_eq!(file, PathBuf::from("program.hl"));
        assert!(copy);
        assert!(!json);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["lambda", "access", "/common/x.hl", "--write", "--role", "root"]);

        assert_eq!(cli.role, "root");
        let Commands::Access { path, write } = cli.command else {
            panic!("Expected access command");
        };
        assert_eq!(path, "/common/x.hl");
        assert!(write);
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let result = Cli::try_parse_from(["lambda", "--unknown-events", "maybe", "keywords"]);
        assert!(result.is_err());
    }
}
