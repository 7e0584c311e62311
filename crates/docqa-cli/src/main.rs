mod ask;
mod ingest;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "docqa", about = "Document-grounded Q&A with citations and selective memory")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index .txt documents into the vector store
    Ingest {
        /// Directory containing .txt documents
        #[arg(short, long)]
        docs: String,

        /// Clear the index and rebuild from scratch
        #[arg(short, long)]
        force: bool,
    },
    /// Ask a question grounded in the indexed documents
    Ask {
        /// The question to answer
        question: String,

        /// Number of candidates to retrieve (overrides config)
        #[arg(short)]
        k: Option<usize>,

        /// Skip memory extraction for this turn
        #[arg(long)]
        no_memory: bool,
    },
    /// Check configuration, index, and memory store health
    Health,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { docs, force } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(ingest::run_ingest(docs, force))?;
        }
        Commands::Ask {
            question,
            k,
            no_memory,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(ask::run_ask(question, k, no_memory))?;
        }
        Commands::Health => {
            health()?;
        }
    }

    Ok(())
}

fn health() -> anyhow::Result<()> {
    let config = docqa_config::load_config().unwrap_or_default();
    println!("docqa is healthy");
    println!("  data dir: {}", config.data_dir()?.display());
    println!("  embedding model: {}", config.embedding.model);
    println!("  generation model: {}", config.generation.model);
    println!("  top_k: {}", config.retrieval.top_k);

    let index_path = config.index_path()?;
    match docqa_index::store::IndexStore::open_existing(&index_path) {
        Ok(store) => println!("  indexed chunks: {}", store.chunk_count()?),
        Err(_) => println!("  index: not yet created"),
    }

    let journals = docqa_memory::MemoryJournals::new(
        config.user_memory_path()?,
        config.org_memory_path()?,
    );
    for target in [
        docqa_types::MemoryTarget::User,
        docqa_types::MemoryTarget::Org,
    ] {
        let count = journals.journal(target).records()?.len();
        println!("  {target:?} memory records: {count}");
    }

    Ok(())
}
