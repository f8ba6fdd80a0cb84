//! Command line front end over the controllers

pub mod admin;
pub mod ask;
pub mod speakers;

use crate::error::AppError;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sttcast-client")]
#[command(version, about = "Ask questions about the podcast archive and curate saved answers")]
pub struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ask a question
    Ask {
        question: String,
        /// Answer language (defaults to the configured one)
        #[arg(long)]
        lang: Option<String>,
        /// Also write the answer panel as HTML
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Show a saved answer
    Saved {
        uuid: String,
        #[arg(long)]
        lang: Option<String>,
    },
    /// Speaker statistics for a date range
    Speakers {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Speakers to analyse; without any, the period's speakers are listed
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Write the charts as SVG and the report as HTML into this directory
        #[arg(long)]
        svg_dir: Option<PathBuf>,
    },
    /// Admin console (needs a session cookie)
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand)]
pub enum AdminCommand {
    /// List saved queries
    Queries {
        #[arg(long, default_value = "")]
        search: String,
        /// Only featured queries
        #[arg(long)]
        featured: bool,
    },
    /// Flip the featured flag of a query
    ToggleFeatured { uuid: String },
    /// Show the category tree
    Categories,
    CreateCategory(CategoryArgs),
    UpdateCategory {
        id: i64,
        #[command(flatten)]
        fields: CategoryArgs,
    },
    DeleteCategory {
        id: i64,
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Assign a category to a query
    Assign { query_id: i64, category_id: i64 },
    /// Remove a category from a query
    Unassign {
        query_id: i64,
        category_id: i64,
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Ask the LLM for a categorisation proposal and optionally apply it
    Suggest {
        #[arg(long)]
        model: Option<String>,
        /// Uncheck an item before applying (cat:0, cat:0.1, assign:2, reparent:0)
        #[arg(long)]
        exclude: Vec<String>,
        #[arg(long)]
        apply: bool,
        /// Apply without asking for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(clap::Args, Default)]
pub struct CategoryArgs {
    #[arg(long)]
    pub name: Option<String>,
    /// Derived from the name when omitted on creation
    #[arg(long)]
    pub slug: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub parent: Option<i64>,
    /// Move the category to the root
    #[arg(long, conflicts_with = "parent")]
    pub root: bool,
    #[arg(long)]
    pub primary: Option<bool>,
    #[arg(long)]
    pub order: Option<i32>,
}

/// Print `question` and read one trimmed line from stdin
pub(crate) fn prompt(question: &str) -> Result<String, AppError> {
    print!("{}", question);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// y/N question on the terminal
pub(crate) fn confirm_on_terminal(message: &str) -> bool {
    match prompt(&format!("{} [y/N] ", message)) {
        Ok(answer) => matches!(answer.to_lowercase().as_str(), "y" | "yes" | "s" | "si" | "sí"),
        Err(e) => {
            log::warn!("Could not read confirmation: {}", e);
            false
        }
    }
}
