use clap::Parser;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{fmt, EnvFilter};

use chorusbot_ai::{OpenAiProvider, PersonaRuntime, ProviderConfig};
use chorusbot_common::models::{
    ModerationConfig, OrchestratorConfig, PersonaConfig, QueueConfig, Role,
};
use chorusbot_core::eventbus::{BotEvent, EventBus};
use chorusbot_core::platforms::twitch::TwitchHelixClient;
use chorusbot_core::platforms::{ChatTransport, ModerationApi};
use chorusbot_core::services::chat_service::{ChatService, InboundMessage};
use chorusbot_core::services::moderation::ModerationEvaluator;
use chorusbot_core::services::orchestrator::ResponseOrchestrator;
use chorusbot_core::services::response_queue::ResponseQueue;
use chorusbot_core::tasks::spawn_moderation_flush_task;

mod console;
use console::{ConsoleTransport, DryRunModerationApi};

#[derive(Parser, Debug, Clone)]
#[command(name = "chorusbot")]
#[command(author, version, about = "ChorusBot - AI chat persona fleet with a moderator persona")]
struct Args {
    /// Channel to join
    #[arg(long, default_value = "#chorus")]
    channel: String,

    /// Platform channel id (broadcaster id) used for moderation calls
    #[arg(long, default_value = "0")]
    channel_id: String,

    /// Seed the orchestrator RNG for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Log moderation actions instead of calling the platform API
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("chorusbot=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)
        .expect("Failed to set global subscriber");
}

/// Built-in demo roster; the last persona carries moderation authority.
fn default_roster() -> Vec<PersonaConfig> {
    let mut luna = PersonaConfig::new(
        "Luna",
        "gpt-4o-mini",
        "You are Luna, an upbeat co-streamer. Keep replies to one short chat line.",
    );
    luna.intro_message = Some("Luna online, hi chat!".to_string());

    let mut rook = PersonaConfig::new(
        "Rook",
        "gpt-4o-mini",
        "You are Rook, a dry-witted gamer. Keep replies to one short chat line.",
    );
    rook.intro_message = Some("rook here. don't feed the trolls".to_string());

    let mut warden = PersonaConfig::new(
        "Warden",
        "gpt-4o-mini",
        "You are Warden, the channel moderator. Be brief and fair.",
    );
    warden.is_moderator = true;
    warden.intro_message = Some("Warden watching. Keep it friendly.".to_string());

    vec![luna, rook, warden]
}

/// Lines arrive as `username: text`; an optional `@moderator` /
/// `@broadcaster` suffix on the name sets the role.
fn parse_line(channel: &str, line: &str) -> Option<InboundMessage> {
    let (author, text) = line.split_once(':')?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let (username, role) = match author.trim().split_once('@') {
        Some((name, role_str)) => (name.trim(), role_str.trim().parse().unwrap_or(Role::User)),
        None => (author.trim(), Role::User),
    };
    Some(InboundMessage {
        channel: channel.to_string(),
        username: username.to_string(),
        text: text.to_string(),
        role,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();

    let event_bus = Arc::new(EventBus::new());

    // Logging tap: everything the services publish shows up in the logs.
    let mut bus_events = event_bus.subscribe(None).await;
    tokio::spawn(async move {
        while let Some(event) = bus_events.recv().await {
            match &event {
                BotEvent::PersonaReply { channel, persona_name, .. } => {
                    debug!("bus: '{}' replied in {}", persona_name, channel);
                }
                other => trace!("bus event: {}", other.event_type()),
            }
        }
    });

    let provider = OpenAiProvider::new(ProviderConfig {
        api_base: env::var("OPENAI_API_BASE").ok(),
        api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
    });
    let runtime = Arc::new(PersonaRuntime::new(Arc::new(provider)));

    let roster = default_roster();
    let orch_config = OrchestratorConfig::default();
    let moderation_config = ModerationConfig::default();
    let conversation_timeout_ms = orch_config.conversation_timeout_ms;
    let flush_interval = Duration::from_secs(moderation_config.flush_interval_secs);

    let rng: Box<dyn rand::RngCore + Send> = match args.seed {
        Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
        None => Box::new(StdRng::from_os_rng()),
    };
    let orchestrator = ResponseOrchestrator::new(roster.clone(), orch_config, rng);

    let moderation_api: Arc<dyn ModerationApi> = if args.dry_run {
        Arc::new(DryRunModerationApi)
    } else {
        match (
            env::var("TWITCH_TOKEN"),
            env::var("TWITCH_CLIENT_ID"),
            env::var("TWITCH_MODERATOR_ID"),
        ) {
            (Ok(token), Ok(client_id), Ok(moderator_id)) => {
                Arc::new(TwitchHelixClient::new(&token, &client_id, &moderator_id))
            }
            _ => {
                warn!("Helix credentials missing; moderation runs in dry-run mode");
                Arc::new(DryRunModerationApi)
            }
        }
    };

    let transport: Arc<dyn ChatTransport> = Arc::new(ConsoleTransport);
    let response_queue = Arc::new(ResponseQueue::new(QueueConfig::default()));

    let Some(moderator) = roster.iter().find(|p| p.is_moderator).cloned() else {
        anyhow::bail!("roster must include a moderator persona");
    };
    let evaluator = Arc::new(ModerationEvaluator::new(
        moderator,
        &roster,
        runtime.clone(),
        moderation_api,
        &args.channel_id,
        moderation_config,
    ));
    let flush_handle = spawn_moderation_flush_task(
        evaluator.clone(),
        flush_interval,
        event_bus.shutdown_rx.clone(),
    );

    let chat_service = Arc::new(ChatService::new(
        orchestrator,
        conversation_timeout_ms,
        runtime,
        transport.clone(),
        response_queue.clone(),
        evaluator,
        event_bus.clone(),
    ));

    transport.connect().await?;
    transport.join_channel(&args.channel).await?;
    chat_service.send_intros(&args.channel).await?;

    let (tx, rx) = mpsc::channel::<InboundMessage>(1024);
    let dispatch_handle = {
        let service = chat_service.clone();
        tokio::spawn(async move { service.run_dispatch_loop(rx).await })
    };

    info!("reading chat from stdin as `username: text` (ctrl-c to stop)");
    let stdin_channel = args.channel.clone();
    let stdin_task = async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(inbound) = parse_line(&stdin_channel, &line) {
                if tx.send(inbound).await.is_err() {
                    break;
                }
            }
        }
        // tx drops here; the dispatch loop drains and exits.
    };

    tokio::select! {
        _ = stdin_task => {}
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received; shutting down");
        }
    }

    event_bus.shutdown();

    // Graceful drain, unless a second ctrl-c forces it.
    tokio::select! {
        _ = response_queue.drain() => {
            info!("response queue drained");
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("second ctrl-c; clearing pending responses");
            response_queue.clear();
        }
    }

    if let Err(e) = flush_handle.await {
        error!("moderation flush task join error: {e}");
    }
    dispatch_handle.abort();
    transport.disconnect().await?;
    Ok(())
}
