mod commands;
mod helper;
mod terminal;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::Editor;
use strum::IntoEnumIterator;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use equilibria_application::{
    AppShell, ChatPanel, JournalAnalyzer, MountedShell, SendOutcome, SendRejection, SpeechAction,
    SpeechController,
};
use equilibria_core::chat::TextGenerator;
use equilibria_core::secret::SecretService;
use equilibria_core::session::{CredentialForm, FederatedProvider, GateState, Route, SessionGate};
use equilibria_infrastructure::{
    CommandSpeechSynthesizer, ConfigService, EquilibriaPaths, RestIdentityProvider,
    SecretServiceImpl,
};
use equilibria_interaction::GeminiApiAgent;

use commands::Command;
use helper::CliHelper;
use terminal::{PromptedTokenSource, TerminalRenderer};

#[derive(Parser)]
#[command(name = "equilibria")]
#[command(about = "Equilibria - journal, goals and a chat assistant in the terminal", long_about = None)]
struct Cli {
    /// Directory holding config.toml and secret.json
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,
}

/// Everything the REPL commands act on.
struct App {
    shell: MountedShell,
    identity: Arc<RestIdentityProvider>,
    generator: Option<Arc<dyn TextGenerator>>,
    speech: SpeechController,
    chat: Option<ChatPanel>,
}

fn init_logging(paths: &EquilibriaPaths, level: &str) -> Result<WorkerGuard> {
    let log_dir = paths.log_dir()?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&log_dir, "equilibria.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))?;
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ===== Bootstrap =====
    let paths = EquilibriaPaths::new(cli.config_dir.as_deref());
    let config_service = ConfigService::from_paths(&paths)?;
    config_service.ensure_config_file()?;
    let config = config_service.get_config()?;

    let level = cli.log_level.as_deref().unwrap_or(&config.debug.log_level);
    let _log_guard = init_logging(&paths, level)?;
    tracing::info!(config = %config_service.path().display(), "[Bootstrap] configuration loaded");

    let secrets = SecretServiceImpl::from_paths(&paths)?.load_secrets().await?;
    let identity_key = secrets
        .identity
        .as_ref()
        .map(|identity| identity.api_key.clone())
        .context("Identity API key not configured: set EQUILIBRIA_IDENTITY_API_KEY or add it to secret.json")?;

    let identity = Arc::new(
        RestIdentityProvider::new(identity_key, &config.identity)?
            .with_federated_source(Arc::new(PromptedTokenSource)),
    );

    let generator: Option<Arc<dyn TextGenerator>> =
        match GeminiApiAgent::from_secrets(&secrets, &config.chat) {
            Ok(agent) => {
                tracing::info!(model = agent.model(), "[Bootstrap] chat assistant ready");
                Some(Arc::new(agent))
            }
            Err(err) => {
                tracing::warn!(error = %err, "[Bootstrap] chat assistant disabled");
                None
            }
        };

    let store = equilibria_application::SessionStore::new(
        identity.clone(),
        config.auth.sign_in_policy,
    );
    let listener = tokio::spawn(store.listener().run());

    println!("{}", "=== Equilibria ===".bright_magenta().bold());
    println!("{}", "Type /help for commands, or just type to chat.".bright_black());
    println!();

    let shell = AppShell::new(store, SessionGate::default(), Arc::new(TerminalRenderer))
        .mount(Route::landing())?;
    identity.resolve_initial_session().await?;
    let refresher = tokio::spawn({
        let identity = identity.clone();
        async move { identity.keep_session_fresh().await }
    });

    let mut app = App {
        shell,
        identity,
        generator,
        speech: SpeechController::new(Arc::new(CommandSpeechSynthesizer::new(
            config.speech.program.clone(),
        ))),
        chat: None,
    };

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    // ===== Main REPL Loop =====
    loop {
        let readline = rl.readline(">> ");

        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                let command = match commands::parse(trimmed) {
                    Ok(command) => command,
                    Err(message) => {
                        println!("{}", message.yellow());
                        continue;
                    }
                };
                if !command.is_sensitive() {
                    let _ = rl.add_history_entry(&line);
                }
                if command == Command::Quit {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }

                app.handle(command).await;
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    if let Some(panel) = app.chat.take() {
        panel.close();
    }
    app.shell.unmount();
    refresher.abort();
    listener.abort();
    tracing::info!("[Shutdown] bye");

    Ok(())
}

impl App {
    async fn handle(&mut self, command: Command) {
        match command {
            Command::Go(route) => {
                self.shell.navigate(route);
            }
            Command::Pages => {
                for route in Route::NAVIGATION {
                    println!("  {:<10} {}", route.path().bright_cyan(), route.label());
                }
            }
            Command::Login { email, password } => {
                let form = CredentialForm::new(email, password);
                match self.shell.store().sign_in_with_credential(&form).await {
                    Ok(_) => self.after_sign_in(),
                    Err(err) => println!("{}", err.to_string().red()),
                }
            }
            Command::Register {
                email,
                password,
                display_name,
            } => {
                let form = CredentialForm::new(email, password);
                match self
                    .shell
                    .store()
                    .register_with_credential(&form, display_name.as_deref())
                    .await
                {
                    Ok(_) => self.after_sign_in(),
                    Err(err) => println!("{}", err.to_string().red()),
                }
            }
            Command::Federated(provider) => {
                match self
                    .shell
                    .store()
                    .sign_in_with_federated_provider(provider)
                    .await
                {
                    Ok(_) => self.after_sign_in(),
                    Err(err) => println!("{}", err.to_string().red()),
                }
            }
            Command::Logout => {
                if let Some(panel) = self.chat.take() {
                    panel.close();
                }
                if let Err(err) = self.shell.store().sign_out().await {
                    println!("{}", format!("Sign-out failed: {err}").red());
                }
            }
            Command::Refresh => match self.identity.refresh_session().await {
                Ok(()) => println!("{}", "Session is current.".bright_black()),
                Err(err) => println!("{}", err.to_string().red()),
            },
            Command::Speak => {
                let transcript = self
                    .chat
                    .as_ref()
                    .map(ChatPanel::transcript)
                    .unwrap_or_default();
                match self.speech.toggle_last_reply(&transcript) {
                    Ok(SpeechAction::Started { voice }) => println!(
                        "{}",
                        format!("Speaking ({})", voice.as_deref().unwrap_or("default voice"))
                            .bright_black()
                    ),
                    Ok(SpeechAction::Stopped) => println!("{}", "Stopped.".bright_black()),
                    Ok(SpeechAction::NothingToSay) => {
                        println!("{}", "No reply to read yet.".bright_black())
                    }
                    Err(err) => println!("{}", err.to_string().red()),
                }
            }
            Command::Close => match self.chat.take() {
                Some(panel) => {
                    panel.close();
                    println!("{}", "Chat closed.".bright_black());
                }
                None => println!("{}", "No chat open.".bright_black()),
            },
            Command::Analyze(entry) => {
                let Some(generator) = self.signed_in_generator() else {
                    return;
                };
                match JournalAnalyzer::new(generator).analyze(&entry).await {
                    Ok(analysis) => {
                        for line in analysis.text.lines() {
                            println!("{}", line.bright_blue());
                        }
                    }
                    Err(err) => println!("{}", err.to_string().red()),
                }
            }
            Command::WhoAmI => {
                let snapshot = self.shell.store().snapshot();
                println!(
                    "{:?} {}",
                    snapshot.state,
                    snapshot
                        .session
                        .display_name
                        .as_deref()
                        .unwrap_or("(anonymous)")
                );
            }
            Command::Help => print_help(),
            Command::Chat(text) => self.chat(&text).await,
            Command::Quit => {}
        }
    }

    async fn chat(&mut self, text: &str) {
        let Some(generator) = self.signed_in_generator() else {
            return;
        };
        let panel = self
            .chat
            .get_or_insert_with(|| ChatPanel::open(generator))
            .clone();

        match panel.send(text).await {
            SendOutcome::Replied | SendOutcome::Failed => {
                if let Some(reply) = panel.transcript().last_assistant() {
                    for line in reply.text.lines() {
                        println!("{}", line.bright_blue());
                    }
                }
            }
            SendOutcome::Ignored(SendRejection::InFlight) => {
                println!("{}", "Still waiting for the previous reply.".yellow())
            }
            SendOutcome::Ignored(_) | SendOutcome::Discarded => {}
        }
    }

    fn signed_in_generator(&self) -> Option<Arc<dyn TextGenerator>> {
        if self.shell.store().snapshot().state != GateState::SignedIn {
            println!("{}", "Sign in first.".yellow());
            return None;
        }
        if self.generator.is_none() {
            println!(
                "{}",
                "Chat is disabled: set GEMINI_API_KEY or add it to secret.json.".yellow()
            );
        }
        self.generator.clone()
    }

    fn after_sign_in(&self) {
        // The shell re-renders from the identity notification.
        tracing::debug!(location = %self.shell.location(), "sign-in acknowledged");
    }
}

fn print_help() {
    let lines = [
        ("/go <path>", "open a page (see /pages)"),
        ("/pages", "list pages"),
        ("/login <email> <password>", "sign in"),
        ("/register <email> <password> [name]", "create an account"),
        ("/federated <provider>", "sign in with a provider"),
        ("/logout", "sign out"),
        ("/refresh", "refresh the session token"),
        ("/speak", "read the last reply aloud, or stop"),
        ("/close", "close the chat and discard it"),
        ("/analyze <text>", "summarise a journal entry with a mood rating"),
        ("/whoami", "show the session"),
        ("quit", "exit"),
    ];
    for (usage, description) in lines {
        println!("  {:<38} {}", usage.bright_cyan(), description.bright_black());
    }
    let providers: Vec<String> = FederatedProvider::iter().map(|p| p.to_string()).collect();
    println!("  {}", format!("providers: {}", providers.join(", ")).bright_black());
}
