//! Attaché CLI entry point.
//!
//! Loads the YAML configuration, parses the command line, and dispatches to
//! the library. The `ATTACHE_CONFIG` environment variable overrides the
//! default per-platform config file location, which keeps tests and ad-hoc
//! setups away from the real one.

use clap::Parser;
use once_cell::sync::OnceCell;
use std::{env, error::Error, fs, path::{Path, PathBuf}};
use tracing::debug;

use attache::assistant::Assistant;
use attache::auth::SessionAuth;
use attache::cache::AnswerCache;
use attache::client::{EmbeddingClient, LanguageModel};
use attache::commands::{Cli, Commands};
use attache::config::{AssistantConfig, load_config};
use attache::conversation::ConversationManager;
use attache::error::AssistantError;
use attache::index::{DocumentIndex, DocumentRetriever};
use attache::orchestrator::Orchestrator;
use attache::session_state::SessionState;
use attache::store::Store;
use attache::config_dir;

static TRACING: OnceCell<()> = OnceCell::new();

fn main() -> Result<(), Box<dyn Error>> {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt::init();
    });
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run())
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        return init();
    }

    let config_path = match env::var("ATTACHE_CONFIG") {
        Ok(path) => PathBuf::from(path),
        Err(_) => config_dir()?.join("config.yaml"),
    };
    debug!("Loading config from: {}", config_path.display());
    let config = load_config(config_path.to_str().ok_or("bad config path")?)?;

    match cli.command {
        Commands::Init => unreachable!(),
        Commands::Register {
            username,
            password,
            email,
        } => {
            let mut store = Store::open(&config.db_url)?;
            let auth = SessionAuth::new(config.session_timeout_secs);
            let user = auth.register(&mut store, &username, &password, email.as_deref())?;
            println!("registered {} ({})", user.username, user.id);
        }
        Commands::Login { username, password } => {
            let mut store = Store::open(&config.db_url)?;
            let auth = SessionAuth::new(config.session_timeout_secs);
            match auth.login(&mut store, &username, &password)? {
                Some(session) => println!("token: {}", session.token),
                None => return Err(Box::new(AssistantError::InvalidCredentials)),
            }
        }
        Commands::Threads => {
            let mut manager = open_manager(&config)?;
            for thread in manager.list_threads()? {
                println!(
                    "{}  {:>3} msgs  {}  {}",
                    thread.id, thread.message_count, thread.created_at, thread.title
                );
            }
        }
        Commands::Ingest { file, source } => {
            let source = source.unwrap_or_else(|| {
                file.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "Document".to_string())
            });
            let text = fs::read_to_string(&file)?;
            let chunks: Vec<String> = text
                .split("\n\n")
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();

            let mut index = DocumentIndex::open(Path::new(&config.cache_dir))?;
            let embedder = EmbeddingClient::new(&config);
            index.add_document(&embedder, &source, &chunks, None).await?;
            println!("indexed {} chunks from {source}", chunks.len());
        }
        Commands::Status => {
            let index = DocumentIndex::open(Path::new(&config.cache_dir))?;
            let status = index.status();
            println!(
                "index initialized: {}, documents: {}",
                status.initialized, status.document_count
            );
        }
        Commands::Ask {
            question,
            client,
            thread,
            regenerate,
        } => {
            let manager = open_manager(&config)?;
            let index = DocumentIndex::open(Path::new(&config.cache_dir))?;
            let retriever =
                DocumentRetriever::new(index, EmbeddingClient::new(&config), config.top_k);
            let orchestrator = Orchestrator::new(retriever, LanguageModel::new(&config));
            let mut assistant = Assistant::new(
                manager,
                orchestrator,
                config.cache_similarity_threshold,
                config.num_suggestions,
            );

            let mut state = SessionState::new();
            state.initialize();
            state.current_thread = thread;
            if regenerate {
                state.request_regenerate();
            }

            let reply = assistant.ask(&mut state, &question, client.as_deref()).await?;

            println!("thread: {}", reply.conversation_id);
            if reply.cached {
                println!("(cached, similarity {:.2})", reply.similarity.unwrap_or(1.0));
            }
            if reply.fallback {
                println!("(single-answer fallback)");
            }
            for (i, suggestion) in reply.suggestions.iter().enumerate() {
                println!("\n--- suggestion {} ---\n{suggestion}", i + 1);
            }
            if !reply.sources.is_empty() {
                println!("\nsources:");
                for source in &reply.sources {
                    match source.metadata.pages {
                        Some(pages) => println!("  {} ({pages} pages)", source.source),
                        None => println!("  {}", source.source),
                    }
                }
            }

            // Single-user mode keeps the first suggestion as the reply.
            state.select_suggestion(0);
            let thread_id = reply.conversation_id.clone();
            assistant.record_selection(&mut state, &thread_id, &reply)?;
        }
    }

    Ok(())
}

fn open_manager(config: &AssistantConfig) -> Result<ConversationManager, Box<dyn Error>> {
    let store = Store::open(&config.db_url)?;
    let cache = AnswerCache::open(Path::new(&config.cache_dir))?;
    Ok(ConversationManager::new(store, cache, None))
}

/// Write a starter configuration file.
fn init() -> Result<(), Box<dyn Error>> {
    let config_dir = config_dir()?;
    fs::create_dir_all(&config_dir)?;

    let config_path = config_dir.join("config.yaml");
    let config = AssistantConfig {
        api_base: "http://localhost:11434/v1".to_string(),
        api_key: "CHANGEME".to_string(),
        generation_model: "deepseek-r1:8b".to_string(),
        embedding_model: "nomic-embed-text".to_string(),
        db_url: config_dir.join("attache.db").to_string_lossy().into_owned(),
        cache_dir: config_dir.join("cache").to_string_lossy().into_owned(),
        top_k: 2,
        temperature: 0.6,
        max_tokens: 400,
        cache_similarity_threshold: 0.8,
        session_timeout_secs: 3600,
        num_suggestions: 2,
    };
    fs::write(&config_path, serde_yaml::to_string(&config)?)?;
    println!("wrote {}", config_path.display());
    Ok(())
}
