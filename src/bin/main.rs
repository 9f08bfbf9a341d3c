use persona_banking_assistant::{
    agent::{AssistantProfile, ChatOrchestrator, TurnRequest},
    config::{AssistantConfig, EnvProviderConfig},
    conversation::Conversation,
    faq::{load_corpus, FaqRetriever},
    models::Utterance,
    persona::build_store,
    provider::BackendRegistry,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Logs go to stderr so they don't interleave with the chat
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AssistantConfig::from_env()?;

    let corpus = load_corpus(&config.faq_source).await;
    let profile = AssistantProfile::for_kind(config.profile);
    let faq = Arc::new(FaqRetriever::new(corpus).with_refusal(profile.refusal_message.clone()));
    if faq.is_empty() {
        warn!(source = %config.faq_source, "FAQ corpus is empty");
    }
    let faq_entries = faq.len();
    let personas = build_store(config.database_url.as_deref());
    let session_id = personas.get_or_create_session_id().await?;

    let orchestrator = ChatOrchestrator::new(
        Arc::new(EnvProviderConfig::default()),
        BackendRegistry::http()?,
        personas,
        faq,
    )
    .with_profile(profile)
    .with_offline_mode(config.offline_mode);

    info!(session_id = %session_id, faq_entries = faq_entries, "Terminal chat starting");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut conversation = Conversation::new();

    stdout
        .write_all(b"Banking assistant ready. Type /quit to exit.\n")
        .await?;

    loop {
        stdout.write_all(b"\nyou> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }

        conversation.push(Utterance::user(line));

        let request = TurnRequest {
            conversation: conversation.clone(),
            persona: None,
            financial_summary: None,
            session_id: Some(session_id.clone()),
        };

        // Ctrl-C abandons the in-flight turn, not the session
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let watcher = tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                trigger.cancel();
            }
        });

        let outcome = orchestrator.handle_turn_cancellable(request, &cancel).await;
        watcher.abort();

        match outcome {
            Ok(reply) => {
                stdout
                    .write_all(format!("\nassistant [{} · {}]> {}\n", reply.provider, reply.model, reply.text).as_bytes())
                    .await?;
                if let Some(risk) = &reply.risk_info {
                    stdout
                        .write_all(format!("  ⚠️  {}\n", risk.message).as_bytes())
                        .await?;
                }
                conversation.push(Utterance::assistant(reply.text));
            }
            Err(e) => {
                let body = orchestrator.error_response(&e);
                stdout
                    .write_all(format!("\n[{}] {}\n", body.code.as_str(), body.error).as_bytes())
                    .await?;
            }
        }
    }

    Ok(())
}
