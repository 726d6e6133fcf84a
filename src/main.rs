use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::time::Instant;

use querygpt_rs::querygpt::config::PipelineConfig;
use querygpt_rs::querygpt::graph_from_config;
use querygpt_rs::querygpt::seed;
use querygpt_rs::querygpt::server::{self, AppState};
use querygpt_rs::querygpt::workflow::state::QueryState;
use querygpt_rs::querygpt::workflow::step_summary;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    paths: PathArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct PathArgs {
    /// YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Knowledge base JSON file
    #[arg(long, global = true)]
    knowledge_base: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer one question
    Ask {
        /// The question to answer
        #[arg(short, long)]
        question: String,

        /// Model used for query generation
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Create the demo database and knowledge base
    Seed,
    /// Start the HTTP API
    Serve {
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    let mut config = PipelineConfig::resolve(cli.paths.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(database) = cli.paths.database {
        config.database_path = database;
    }
    if let Some(knowledge_base) = cli.paths.knowledge_base {
        config.knowledge_base_path = knowledge_base;
    }

    match cli.command {
        Commands::Ask { question, model } => {
            if let Some(model) = model {
                config.main_model = model;
            }
            let graph = graph_from_config(&config)?;

            println!("Question: {}\n", question);
            let started = Instant::now();
            let mut run = graph.stream(QueryState::new(question));
            while let Some(step) = run.next_step().await {
                let step = step?;
                println!("[{}] {}", step.node, step_summary(&step));
            }
            let state = run.into_state();

            println!("\nFinal Answer:\n{}\n", state.final_answer);
            println!("Generated SQL:\n{}\n", state.sql_query);
            println!("Database Result:\n{}\n", state.db_result);
            println!("Completed in {:.2}s", started.elapsed().as_secs_f64());
        }
        Commands::Seed => {
            seed::seed(&config.database_path, &config.knowledge_base_path)?;
            println!(
                "Seeded {} and {}",
                config.database_path.display(),
                config.knowledge_base_path.display()
            );
        }
        Commands::Serve { port } => {
            let graph = graph_from_config(&config)?;
            server::serve(port, AppState::new(graph)).await?;
        }
    }

    Ok(())
}
