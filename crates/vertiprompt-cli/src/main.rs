//! `vertiprompt`: turn a product description into ordered feature-slice
//! prompts.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `generate` | Run the generation pipeline and save the session |
//! | `models` | List selectable models from the gateway |
//! | `export` | Write the saved session as a versioned JSON export |
//! | `markdown` | Write the saved session's slices as markdown |
//! | `import` | Load an export file into the session store |
//! | `show` | Print the saved session |

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use vertiprompt_core::observability::init_observability;

#[derive(Parser, Debug)]
#[command(name = "vertiprompt")]
#[command(about = "Generate vertical feature-slice prompts from a product description", long_about = None)]
struct Cli {
    /// Session file holding the last run
    #[arg(
        long,
        global = true,
        env = "VERTIPROMPT_SESSION_PATH",
        default_value = ".vertiprompt/last-run.json"
    )]
    session: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate slices for a product description
    Generate(commands::GenerateArgs),
    /// List selectable models and their prices
    Models,
    /// Export the saved session as JSON (schemaVersion 1.0)
    Export {
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
    },
    /// Write the saved session's slices as markdown
    Markdown {
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
    },
    /// Import a JSON export into the session store
    Import {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
    /// Print the saved session
    Show {
        /// Use the copy-all layout (plain fences, rule separators)
        #[arg(long)]
        copy_format: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_observability("warn");

    let store = vertiprompt_core::store::SessionStore::new(cli.session);
    match cli.command {
        Commands::Generate(args) => commands::generate(args, &store).await,
        Commands::Models => commands::models().await,
        Commands::Export { out } => commands::export(&store, &out),
        Commands::Markdown { out } => commands::markdown(&store, &out),
        Commands::Import { path } => commands::import(&store, &path),
        Commands::Show { copy_format } => commands::show(&store, copy_format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_flags() {
        let cli = Cli::try_parse_from([
            "vertiprompt",
            "--session",
            "/tmp/s.json",
            "generate",
            "--description",
            "text",
            "--iterations",
            "3",
            "--legacy",
        ])
        .expect("parse");
        assert_eq!(cli.session, PathBuf::from("/tmp/s.json"));
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.iterations, 3);
        assert!(args.legacy);
        assert_eq!(args.description.as_deref(), Some("text"));
    }

    #[test]
    fn description_sources_are_exclusive() {
        let parsed = Cli::try_parse_from([
            "vertiprompt",
            "generate",
            "--description",
            "a",
            "--description-file",
            "b.txt",
        ]);
        assert!(parsed.is_err());
    }
}
