use std::{collections::HashSet, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use session_core::{
    ActivationOutcome, DispatchOutcome, DomainState, EntryId, HttpEngineClient, Origin,
    SessionController, SessionError, SessionEvent,
};
use shared::{
    domain::DomainCatalog,
    protocol::{FileCommand, SystemCommand},
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
    task::JoinHandle,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the evaluation engine; overrides file and environment settings.
    #[arg(long)]
    engine_url: Option<String>,
    /// Domain to activate before reading input.
    #[arg(long)]
    domain: Option<String>,
    #[arg(long, default_value = "console.toml")]
    config: PathBuf,
}

#[derive(Debug, PartialEq, Eq)]
enum ConsoleInput {
    Quit,
    Help,
    ListDomains,
    Activate(String),
    System(SystemCommand),
    File(FileCommand, String),
    Reset,
    ToggleExpanded,
    Unknown(String),
    Command(String),
}

fn parse_input(line: &str) -> ConsoleInput {
    let trimmed = line.trim();
    let Some(meta) = trimmed.strip_prefix(':') else {
        return ConsoleInput::Command(line.to_string());
    };
    let (name, arg) = match meta.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (meta, ""),
    };
    match name {
        "q" | "quit" => ConsoleInput::Quit,
        "help" => ConsoleInput::Help,
        "domains" => ConsoleInput::ListDomains,
        "domain" if !arg.is_empty() => ConsoleInput::Activate(arg.to_string()),
        "sys" => SystemCommand::from_query(arg)
            .map(ConsoleInput::System)
            .unwrap_or_else(|| ConsoleInput::Unknown(trimmed.to_string())),
        "consult" => ConsoleInput::File(FileCommand::Consult, arg.to_string()),
        "reconsult" => ConsoleInput::File(FileCommand::Reconsult, arg.to_string()),
        "reset" => ConsoleInput::Reset,
        "expand" => ConsoleInput::ToggleExpanded,
        _ => ConsoleInput::Unknown(trimmed.to_string()),
    }
}

const CONSOLE_HELP: &str = "\
:domains              list knowledge domains
:domain <id>          activate a domain
:sys <command>        run a system command (help, load_all, list_files, ...)
:consult <file>       consult a Prolog file
:reconsult <file>     reconsult a Prolog file
:reset                clear transcript and deselect the domain
:expand               toggle the expanded transcript view
:quit                 leave
Anything else is sent to the engine; `clear.` and `examples.` are handled locally.";

fn spawn_renderer(controller: &Arc<SessionController>) -> JoinHandle<()> {
    let mut events = controller.subscribe();
    let controller = Arc::clone(controller);
    tokio::spawn(async move {
        let mut printed: HashSet<EntryId> = HashSet::new();
        loop {
            match events.recv().await {
                Ok(SessionEvent::TranscriptChanged) | Err(RecvError::Lagged(_)) => {
                    let transcript = controller.transcript().await;
                    printed.retain(|id| transcript.iter().any(|entry| &entry.id == id));
                    for entry in &transcript {
                        if entry.is_pending() {
                            eprint!("\r\x1b[2K{}", entry.text);
                            continue;
                        }
                        if !printed.insert(entry.id.clone()) {
                            continue;
                        }
                        eprint!("\r\x1b[2K");
                        match entry.origin {
                            Origin::User => println!("?- {}", entry.text),
                            Origin::System => println!("{}", entry.text),
                        }
                    }
                }
                Ok(SessionEvent::DomainChanged(DomainState::Active(domain))) => {
                    info!(%domain, "domain ready");
                }
                Ok(_) => {}
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn report_refusal(err: &SessionError) {
    let hint = match err {
        SessionError::NoActiveDomain => "select a domain first with :domain <id>",
        SessionError::RequestPending => "wait for the current command to finish",
        SessionError::EmptyCommand => "nothing to send",
        SessionError::InvalidDomain(_) => "see :domains for the available ids",
        SessionError::ShutDown => "session has ended",
    };
    eprintln!("{err} ({hint})");
}

async fn activate(controller: &SessionController, domain: &str) {
    match controller.activate_domain(domain).await {
        Ok(ActivationOutcome::Failed { domain, .. }) => {
            eprintln!("domain {domain} is not active; try :domain again");
        }
        Ok(_) => {}
        Err(err) => report_refusal(&err),
    }
}

fn handle_dispatch(result: Result<DispatchOutcome, SessionError>) {
    match result {
        Ok(DispatchOutcome::Cleared) => println!("\x1b[2J\x1b[H"),
        Ok(_) => {}
        Err(err) => report_refusal(&err),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config);
    if let Some(engine_url) = args.engine_url {
        settings.engine_url = engine_url;
    }

    let engine = HttpEngineClient::new(&settings.engine_url)
        .with_context(|| format!("invalid engine url: {}", settings.engine_url))?;
    let catalog = DomainCatalog::builtin();
    println!(
        "Prolog assistant ({})\n\nAvailable domains:\n{}\n\nType :help for console commands.",
        engine.base_url(),
        catalog.overview()
    );
    let controller =
        SessionController::with_config(Arc::new(engine), catalog, settings.session_config());
    info!(session = %controller.session_id(), "session started");
    let renderer = spawn_renderer(&controller);

    if let Some(domain) = args.domain.as_deref() {
        activate(&controller, domain).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("failed to read from stdin")?
    {
        match parse_input(&line) {
            ConsoleInput::Quit => break,
            ConsoleInput::Help => println!("{CONSOLE_HELP}"),
            ConsoleInput::ListDomains => println!("{}", controller.catalog().overview()),
            ConsoleInput::Activate(domain) => activate(&controller, &domain).await,
            ConsoleInput::System(cmd) => {
                handle_dispatch(controller.dispatch_system(cmd).await)
            }
            ConsoleInput::File(cmd, file_name) => {
                handle_dispatch(controller.dispatch_file(cmd, &file_name).await)
            }
            ConsoleInput::Reset => controller.clear().await,
            ConsoleInput::ToggleExpanded => {
                let expanded = controller.toggle_expanded().await;
                println!("expanded view: {}", if expanded { "on" } else { "off" });
            }
            ConsoleInput::Unknown(input) => eprintln!("unknown console command: {input}"),
            ConsoleInput::Command(command) => {
                handle_dispatch(controller.dispatch(&command).await)
            }
        }
    }

    controller.shutdown().await;
    renderer.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_engine_commands() {
        assert_eq!(
            parse_input("parent(tom, bob)."),
            ConsoleInput::Command("parent(tom, bob).".into())
        );
        assert_eq!(parse_input("clear."), ConsoleInput::Command("clear.".into()));
    }

    #[test]
    fn meta_commands_are_parsed() {
        assert_eq!(parse_input(":q"), ConsoleInput::Quit);
        assert_eq!(
            parse_input(":domain  animals "),
            ConsoleInput::Activate("animals".into())
        );
        assert_eq!(
            parse_input(":sys list_files"),
            ConsoleInput::System(SystemCommand::ListFiles)
        );
        assert_eq!(
            parse_input(":consult family.pl"),
            ConsoleInput::File(FileCommand::Consult, "family.pl".into())
        );
        assert_eq!(parse_input(":reset"), ConsoleInput::Reset);
    }

    #[test]
    fn malformed_meta_commands_are_unknown() {
        assert_eq!(parse_input(":domain"), ConsoleInput::Unknown(":domain".into()));
        assert_eq!(
            parse_input(":sys reboot"),
            ConsoleInput::Unknown(":sys reboot".into())
        );
        assert_eq!(parse_input(":nope"), ConsoleInput::Unknown(":nope".into()));
    }
}
