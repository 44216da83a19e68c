use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Multi-provider LLM client tooling
#[derive(Debug, Parser)]
#[command(name = "multillm", about = "Inspect and invoke tools on configured MCP servers")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "multillm.toml", env = "MULTILLM_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// MCP tool operations
    #[command(subcommand)]
    Tools(ToolsCommand),
}

#[derive(Debug, Subcommand)]
pub enum ToolsCommand {
    /// List the tools a server advertises
    List {
        /// Server name from `[mcp.servers]`
        #[arg(long)]
        server: String,
    },
    /// Call one tool and print its result
    Call {
        /// Server name from `[mcp.servers]`
        #[arg(long)]
        server: String,
        #[arg(long)]
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        arguments: String,
    },
}
