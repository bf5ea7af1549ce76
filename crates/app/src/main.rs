mod api;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use regportal_core::{
    FileStorage, HashingEmbedder, HttpEmbedder, HttpEmbedderConfig, HttpSummarizer,
    HttpSummarizerConfig, IngestionPipeline, LopdfExtractor, MemoryStore, RemoteStore,
    RemoteStoreConfig, SmartSearch, DEFAULT_EMBEDDING_DIMENSIONS,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "regportal-api", version)]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Directory for uploaded document files.
    #[arg(long, default_value = "./uploads")]
    upload_dir: String,

    /// Embeddings endpoint (OpenAI-style). Without it, the local
    /// deterministic embedder is used.
    #[arg(long, env = "REGPORTAL_EMBEDDING_URL")]
    embedding_url: Option<String>,

    #[arg(long, env = "REGPORTAL_EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    #[arg(long, default_value = "text-embedding-3-small")]
    embedding_model: String,

    /// Vector dimensionality of the embedding model. Must stay constant for
    /// the lifetime of the index.
    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    embedding_dimensions: usize,

    /// Chat-completions endpoint for document summaries. Without it,
    /// documents get a placeholder summary.
    #[arg(long, env = "REGPORTAL_SUMMARIZER_URL")]
    summarizer_url: Option<String>,

    #[arg(long, env = "REGPORTAL_SUMMARIZER_API_KEY", hide_env_values = true)]
    summarizer_api_key: Option<String>,

    #[arg(long, default_value = "gpt-4o-mini")]
    summarizer_model: String,

    /// Base URL of the shared document/chunk store service. Without it, an
    /// in-process store is used (single node, data lost on restart).
    #[arg(long, env = "REGPORTAL_STORE_URL")]
    store_url: Option<String>,

    #[arg(long, env = "REGPORTAL_STORE_API_KEY", hide_env_values = true)]
    store_api_key: Option<String>,

    /// Per-call timeout for embedding, summarizer, and store requests.
    #[arg(long, default_value = "30")]
    collaborator_timeout_secs: u64,

    /// User id seeded as an uploader in the in-process store.
    #[arg(long, default_value = "1")]
    seed_uploader: i64,

    /// Regulator the seeded uploader belongs to.
    #[arg(long, default_value = "1")]
    seed_regulator: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.collaborator_timeout_secs);

    let embedder = Arc::new(match &cli.embedding_url {
        Some(endpoint) => api::ApiEmbedder::Http(
            HttpEmbedder::new(HttpEmbedderConfig {
                endpoint: endpoint.clone(),
                api_key: cli.embedding_api_key.clone(),
                model: cli.embedding_model.clone(),
                dimensions: cli.embedding_dimensions,
                timeout,
            })
            .context("building embedding client")?,
        ),
        None => api::ApiEmbedder::Local(HashingEmbedder::new(cli.embedding_dimensions)),
    });

    let store = Arc::new(match &cli.store_url {
        Some(endpoint) => api::ApiStore::Remote(
            RemoteStore::new(RemoteStoreConfig {
                endpoint: endpoint.clone(),
                api_key: cli.store_api_key.clone(),
                timeout,
            })
            .context("building store client")?,
        ),
        None => {
            let memory = MemoryStore::new();
            memory.seed_uploader(cli.seed_uploader, Some(cli.seed_regulator));
            info!(
                uploader = cli.seed_uploader,
                regulator = cli.seed_regulator,
                "using in-process store"
            );
            api::ApiStore::Memory(memory)
        }
    });

    let mut pipeline = IngestionPipeline::new(
        Arc::clone(&store),
        Arc::clone(&embedder),
        LopdfExtractor,
        FileStorage::new(&cli.upload_dir),
    );
    if let Some(endpoint) = &cli.summarizer_url {
        let summarizer = HttpSummarizer::new(HttpSummarizerConfig {
            endpoint: endpoint.clone(),
            api_key: cli.summarizer_api_key.clone(),
            model: cli.summarizer_model.clone(),
            timeout,
        })
        .context("building summarizer client")?;
        pipeline = pipeline.with_summarizer(Box::new(summarizer));
    }

    let search = SmartSearch::new(Arc::clone(&store), Arc::clone(&embedder));
    let state = Arc::new(api::AppState { pipeline, search });

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "regportal-api boot"
    );

    let listener = tokio::net::TcpListener::bind(&cli.bind)
        .await
        .with_context(|| format!("binding {}", cli.bind))?;
    info!(addr = %cli.bind, "listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
