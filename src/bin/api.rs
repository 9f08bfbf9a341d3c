use persona_banking_assistant::{
    agent::{AssistantProfile, ChatOrchestrator},
    api::start_server,
    config::{AssistantConfig, EnvProviderConfig},
    faq::{load_corpus, FaqRetriever},
    persona::build_store,
    provider::BackendRegistry,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AssistantConfig::from_env()?;

    info!("🚀 Banking Persona Assistant - API Server");
    info!("📍 Port: {}", config.port);

    // Create components
    let corpus = load_corpus(&config.faq_source).await;
    let profile = AssistantProfile::for_kind(config.profile);
    let faq = Arc::new(FaqRetriever::new(corpus).with_refusal(profile.refusal_message.clone()));
    if faq.is_empty() {
        warn!("⚠️  FAQ corpus is empty; offline turns will use the fallback message");
    } else {
        info!("📚 FAQ entries: {}", faq.len());
    }
    let personas = build_store(config.database_url.as_deref());
    let backends = BackendRegistry::http()?;

    let orchestrator = Arc::new(
        ChatOrchestrator::new(
            Arc::new(EnvProviderConfig::default()),
            backends,
            personas,
            faq,
        )
        .with_profile(profile)
        .with_offline_mode(config.offline_mode),
    );

    let status = orchestrator.provider_status();
    match (status.provider, status.model) {
        (Some(provider), Some(model)) => info!("🤖 Provider: {} ({})", provider, model),
        _ => info!("📚 No completion backend configured (offline mode: {:?})", config.offline_mode),
    }

    info!("✅ Orchestrator initialized");
    info!("📡 Starting API server...");

    start_server(orchestrator, config.port).await?;

    Ok(())
}
