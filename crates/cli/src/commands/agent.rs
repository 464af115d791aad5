//! Default command: one-shot or interactive chat with the todo agent.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use taskpilot_agent::{AgentLoop, ModelGateway, PromptBuilder, StopReason};
use taskpilot_config::AppConfig;
use taskpilot_core::error::ProviderError;
use taskpilot_core::event::EventBus;
use taskpilot_core::store::TaskStore;
use taskpilot_core::Error;
use taskpilot_store::{InMemoryTaskStore, SqliteTaskStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::repl;

pub struct AgentOptions {
    pub config_path: Option<PathBuf>,
    pub in_memory: bool,
}

pub async fn run(
    message: Option<String>,
    options: AgentOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &options.config_path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    }
    .map_err(|e| Error::Config {
        message: format!("Failed to load config: {e}"),
    })?;

    // Check for API key early: give a clear error
    if !config.has_api_key() && config.default_provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    export OPENROUTER_API_KEY=sk-or-v1-...   (recommended)");
        eprintln!("    export OPENAI_API_KEY=sk-...             (for OpenAI direct)");
        eprintln!("    export TASKPILOT_API_KEY=sk-...          (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file (create one with `taskpilot init`):");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let store = build_store(&config, options.in_memory).await?;
    let mut agent = build_agent(&config, store)?;

    match message {
        Some(msg) => {
            let result = run_cancellable(&mut agent, &msg).await;
            println!("{}", result.reply);
        }
        None => interactive(&mut agent).await?,
    }

    Ok(())
}

async fn build_store(config: &AppConfig, in_memory: bool) -> taskpilot_core::Result<Arc<dyn TaskStore>> {
    if in_memory || config.store.backend == "memory" {
        info!("Using in-memory task store; todos will not be saved");
        return Ok(Arc::new(InMemoryTaskStore::new()));
    }
    let path = config.store.resolved_path();
    let store = SqliteTaskStore::new(&path.to_string_lossy()).await?;
    Ok(Arc::new(store))
}

fn build_agent(config: &AppConfig, store: Arc<dyn TaskStore>) -> taskpilot_core::Result<AgentLoop> {
    let router = taskpilot_providers::build_from_config(config);
    let provider = router
        .default()
        .ok_or_else(|| ProviderError::NotConfigured(config.default_provider.clone()))?;

    let model = config
        .providers
        .get(&config.default_provider)
        .and_then(|p| p.default_model.clone())
        .unwrap_or_else(|| config.default_model.clone());

    let registry = taskpilot_tools::default_registry(store);
    let prompt =
        PromptBuilder::with_extra_instructions(&registry, config.agent.extra_instructions.as_deref());
    let gateway = ModelGateway::new(provider, model)
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens);

    Ok(AgentLoop::new(gateway, Arc::new(registry), prompt, Arc::new(EventBus::default()))
        .with_max_iterations(config.agent.max_iterations))
}

/// Run one turn; Ctrl-C cancels the turn, not the process.
async fn run_cancellable(agent: &mut AgentLoop, text: &str) -> taskpilot_agent::TurnResult {
    let token = CancellationToken::new();
    let watcher = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        })
    };

    let result = agent.run_turn(text, &token).await;
    watcher.abort();
    debug!(stop = %result.stop, iterations = result.iterations, actions = result.actions, "Turn finished");
    result
}

async fn interactive(agent: &mut AgentLoop) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("  taskpilot: interactive mode");
    println!();
    println!("  Provider:  {}", agent.gateway().provider_name());
    println!("  Model:     {}", agent.gateway().model());
    println!();
    println!("  Tell me what to do with your todos.");
    println!("  Type 'exit' or press Ctrl+D to quit. Ctrl+C cancels a running request.");
    println!();

    let mut input = repl::stdin_reader();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = input.recv() => line,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        if line == "/reset" {
            agent.reset();
            println!("  (history cleared)");
            continue;
        }

        let result = run_cancellable(agent, &line).await;
        println!();
        if result.stop == StopReason::Cancelled {
            println!("  {}", result.reply);
        } else {
            for line in result.reply.lines() {
                println!("  taskpilot > {line}");
            }
        }
        println!();
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}
