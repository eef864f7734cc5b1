//! `signlearn-cli`: terminal client for the SignLearn API.
//!
//! SYSTEM CONTEXT
//! ==============
//! Drives the same session core as the browser UI over a native transport
//! with an in-memory cookie jar. A credentialed run logs in first and always
//! logs out before exiting; an anonymous run only bootstraps.


use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use signlearn::config::{API_BASE_ENV, CONNECT_TIMEOUT_ENV, ConfigError, REQUEST_TIMEOUT_ENV};
use signlearn::net::reqwest_transport::ReqwestTransport;
use signlearn::routes::{self, GuardDecision};
use signlearn::{Api, ApiError, AuthError, ClientConfig, HttpClient, SessionStore, TransportError};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SIGNLEARN_LOG";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("transport setup failed: {0}")]
    Transport(#[from] TransportError),
    #[error("login failed: {}", .0.user_message())]
    Auth(#[from] AuthError),
    #[error("{}", describe_api_error(.0))]
    Api(#[from] ApiError),
    #[error("--email and --password must be given together")]
    IncompleteCredentials,
    #[error("output encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "signlearn-cli", about = "SignLearn API client")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[arg(long, env = "SIGNLEARN_EMAIL")]
    email: Option<String>,

    #[arg(long, env = "SIGNLEARN_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Overrides on top of `ClientConfig::from_env`; unset flags keep its values.
#[derive(Args, Debug, Default)]
struct ConnectionArgs {
    #[arg(long, env = API_BASE_ENV)]
    api_base: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, env = REQUEST_TIMEOUT_ENV)]
    timeout_secs: Option<u64>,

    /// Connection timeout in seconds.
    #[arg(long, env = CONNECT_TIMEOUT_ENV)]
    connect_timeout_secs: Option<u64>,
}

impl ConnectionArgs {
    fn apply(&self, mut config: ClientConfig) -> Result<ClientConfig, ConfigError> {
        if let Some(base) = &self.api_base {
            config = config.with_api_base(base)?;
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_request_timeout(Duration::from_secs(secs.max(1)));
        }
        if let Some(secs) = self.connect_timeout_secs {
            config = config.with_connect_timeout(Duration::from_secs(secs.max(1)));
        }
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current session and landing route.
    Whoami,
    /// Print the guard decision for an application path.
    Guard { path: String },
    Dictionary(LanguageCommand),
    Modules(LanguageCommand),
    /// List the tasks of a lesson.
    Tasks {
        #[arg(long)]
        lesson: i64,
    },
    Admin(AdminCommand),
}

#[derive(Args, Debug)]
struct LanguageCommand {
    #[command(subcommand)]
    command: LanguageSubcommand,
}

#[derive(Subcommand, Debug)]
enum LanguageSubcommand {
    Languages,
    List {
        #[arg(long)]
        language: String,
    },
}

#[derive(Args, Debug)]
struct AdminCommand {
    #[command(subcommand)]
    command: AdminSubcommand,
}

#[derive(Subcommand, Debug)]
enum AdminSubcommand {
    Modules {
        #[arg(long)]
        language: Option<String>,
    },
    /// List the lessons of a module.
    Lessons {
        #[arg(long)]
        module: i64,
    },
    /// Search sign videos by gloss.
    Videos {
        #[arg(long)]
        query: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    // An explicit --api-base wins over a malformed SIGNLEARN_API_BASE.
    let seed = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(_) if cli.connection.api_base.is_some() => ClientConfig::default(),
        Err(e) => return Err(e.into()),
    };
    let config = cli.connection.apply(seed)?;
    let transport = ReqwestTransport::shared(&config)?;
    let store = SessionStore::new(Api::new(HttpClient::new(config.api_base.clone(), transport)));

    let credentials = credentials(cli.email, cli.password)?;
    if let Some((email, password)) = &credentials {
        store.login(email, password).await?;
    } else {
        store.bootstrap().await;
    }

    let result = execute(&store, cli.command).await;
    if credentials.is_some() {
        store.logout().await;
    }

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}

fn credentials(email: Option<String>, password: Option<String>) -> Result<Option<(String, String)>, CliError> {
    match (email, password) {
        (Some(email), Some(password)) => Ok(Some((email, password))),
        (None, None) => Ok(None),
        _ => Err(CliError::IncompleteCredentials),
    }
}

async fn execute(store: &SessionStore, command: Command) -> Result<Value, CliError> {
    let api = store.api();
    let output = match command {
        Command::Whoami => {
            let session = store.current();
            json!({
                "ready": session.ready,
                "authenticated": session.authenticated,
                "is_admin": session.is_admin,
                "landing_route": session.authenticated.then(|| routes::landing_route(session.is_admin)),
            })
        }
        Command::Guard { path } => guard_report(&path, routes::decide(store.current(), routes::route_kind(&path))),
        Command::Dictionary(dictionary) => match dictionary.command {
            LanguageSubcommand::Languages => json!(api.dictionary_languages().await?),
            LanguageSubcommand::List { language } => json!(api.dictionary(&language).await?),
        },
        Command::Modules(modules) => match modules.command {
            LanguageSubcommand::Languages => json!(api.languages().await?),
            LanguageSubcommand::List { language } => json!(api.modules(&language).await?),
        },
        Command::Tasks { lesson } => json!(api.lesson_tasks(lesson).await?),
        Command::Admin(admin) => match admin.command {
            AdminSubcommand::Modules { language } => json!(api.admin_modules(language.as_deref()).await?),
            AdminSubcommand::Lessons { module } => json!(api.admin_lessons(module).await?),
            AdminSubcommand::Videos { query } => json!(api.admin_videos(&query).await?),
        },
    };
    Ok(output)
}

fn guard_report(path: &str, decision: GuardDecision) -> Value {
    json!({
        "path": path,
        "kind": format!("{:?}", routes::route_kind(path)),
        "loading": decision == GuardDecision::Loading,
        "render": decision.render(),
        "redirect_to": decision.redirect_to(),
    })
}

fn describe_api_error(err: &ApiError) -> String {
    match err.status() {
        Some(status) => format!("HTTP {status}: {}", err.user_message()),
        None => err.user_message(),
    }
}
