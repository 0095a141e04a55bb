mod client;
mod commands;
mod config;
mod domain;
mod logging;
mod panel;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::commands::context::NodeSelector;
use crate::commands::show::ShowArgs;
use crate::commands::target::NodeAction;
use crate::domain::environment::EnvironmentScope;

#[derive(Parser)]
#[command(name = "nodepanel", version, about = "Live status panel for build-server nodes")]
struct Cli {
    /// Path to config file (default: ~/.config/nodepanel/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (overrides config)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct NodeArgs {
    /// Environment id (from config)
    #[arg(long)]
    env: String,

    /// Environment scope (workspace or global)
    #[arg(long, default_value = "workspace")]
    scope: EnvironmentScope,

    /// Node name as listed by `nodes`
    #[arg(long, conflicts_with = "node_url")]
    node: Option<String>,

    /// Node URL, e.g. https://ci.example.com/computer/agent-1/
    node_url: Option<String>,
}

impl From<NodeArgs> for NodeSelector {
    fn from(args: NodeArgs) -> Self {
        Self {
            env: args.env,
            scope: args.scope,
            name: args.node,
            node_url: args.node_url,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List configured environments
    Environments {
        /// Only list one scope
        #[arg(long)]
        scope: Option<EnvironmentScope>,
    },

    /// List the nodes of an environment
    Nodes {
        /// Environment id (from config)
        #[arg(long)]
        env: String,

        /// Environment scope (workspace or global)
        #[arg(long, default_value = "workspace")]
        scope: EnvironmentScope,
    },

    /// Show live details for a node
    Show {
        #[command(flatten)]
        node: NodeArgs,

        /// Also load advanced diagnostics
        #[arg(long)]
        advanced: bool,

        /// Keep refreshing until Ctrl+C
        #[arg(long)]
        watch: bool,

        /// Copy the raw node JSON
        #[arg(long)]
        copy_json: bool,

        /// Open the node page externally
        #[arg(long)]
        open: bool,

        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,

        /// Persist panel state here so it can be restored later
        #[arg(long)]
        state_file: Option<PathBuf>,
    },

    /// Restore a panel from a persisted state file
    Restore {
        /// Panel state file written by `show --state-file`
        #[arg(long)]
        state: PathBuf,

        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Take a node offline
    Offline {
        #[command(flatten)]
        node: NodeArgs,

        /// Reason shown on the build server
        #[arg(long)]
        reason: Option<String>,
    },

    /// Bring a temporarily offline node back online
    Online {
        #[command(flatten)]
        node: NodeArgs,
    },

    /// Launch the agent of a disconnected node
    Launch {
        #[command(flatten)]
        node: NodeArgs,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        cfg.log_level = level;
    }
    logging::init(&cfg.log_level, cfg.log_json);

    match cli.command {
        Commands::Environments { scope } => commands::environments::run(cfg, scope),
        Commands::Nodes { env, scope } => commands::nodes::run(cfg, &env, scope),
        Commands::Show {
            node,
            advanced,
            watch,
            copy_json,
            open,
            format,
            state_file,
        } => commands::show::run(
            cfg,
            ShowArgs {
                node: node.into(),
                advanced,
                watch,
                copy_json,
                open,
                format,
                state_file,
            },
        ),
        Commands::Restore { state, format } => commands::restore::run(cfg, state, &format),
        Commands::Offline { node, reason } => {
            commands::action::run(cfg, NodeAction::TakeOffline { reason }, node.into())
        }
        Commands::Online { node } => commands::action::run(cfg, NodeAction::BringOnline, node.into()),
        Commands::Launch { node } => commands::action::run(cfg, NodeAction::LaunchAgent, node.into()),
    }
}
