//! studytrack CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "studytrack",
    version,
    about = "Grade coding exercises and track lesson progress"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a solution against a lesson's exercise
    Grade {
        /// Lesson whose exercise to run
        #[arg(long)]
        lesson: String,

        /// File containing the candidate function
        #[arg(long)]
        source: PathBuf,

        /// Curriculum file (.json or .toml)
        #[arg(long)]
        curriculum: Option<PathBuf>,

        /// Print the grade report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mark a lesson or a logged problem complete
    #[command(group(ArgGroup::new("subject").required(true).args(["lesson", "problem"])))]
    Complete {
        /// Lesson id
        #[arg(long)]
        lesson: Option<String>,

        /// Problem id
        #[arg(long)]
        problem: Option<String>,

        /// Curriculum file (.json or .toml)
        #[arg(long)]
        curriculum: Option<PathBuf>,
    },

    /// Show the activity heatmap and streaks
    Activity {
        /// Curriculum file (.json or .toml)
        #[arg(long)]
        curriculum: Option<PathBuf>,

        /// Print the progress report as JSON
        #[arg(long)]
        json: bool,

        /// Save the progress report to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List lessons with their completion status
    Lessons {
        /// Curriculum file (.json or .toml)
        #[arg(long)]
        curriculum: Option<PathBuf>,
    },

    /// Validate a curriculum file
    Validate {
        /// Curriculum file (.json or .toml)
        #[arg(long)]
        curriculum: PathBuf,
    },

    /// Create starter config and sample curriculum
    Init,
}

#[tokio::main]
async fn main() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "studytrack=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Grade {
            lesson,
            source,
            curriculum,
            json,
        } => commands::grade::execute(config, curriculum, lesson, source, json).await,
        Commands::Complete {
            lesson,
            problem,
            curriculum,
        } => commands::complete::execute(config, curriculum, lesson, problem).await,
        Commands::Activity {
            curriculum,
            json,
            output,
        } => commands::activity::execute(config, curriculum, json, output).await,
        Commands::Lessons { curriculum } => commands::lessons::execute(config, curriculum).await,
        Commands::Validate { curriculum } => commands::validate::execute(curriculum),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
