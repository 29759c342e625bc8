use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use api::{AppState, ServerConfig, build_app_router};
use course_core::model::Catalog;
use services::{AppServices, Clock};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidBind { raw: String },
    InvalidDbUrl { raw: String },
    InvalidTimeout { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidBind { raw } => write!(f, "invalid --bind value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidTimeout { raw } => write!(f, "invalid --timeout-secs value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- serve [--db <sqlite_url>] [--bind <addr>] [--catalog <path>] [--timeout-secs <n>]");
    eprintln!("  cargo run -p app -- check [--db <sqlite_url>] [--catalog <path>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:dev.sqlite3");
    eprintln!("  --bind 127.0.0.1:3000");
    eprintln!("  --catalog data/catalog.json");
    eprintln!("  --timeout-secs 30");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  COURSE_DB_URL, COURSE_BIND, COURSE_CATALOG, COURSE_REQUEST_TIMEOUT_SECS,");
    eprintln!("  COURSE_CORS_ORIGINS (comma separated), RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Serve,
    Check,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "serve" => Some(Self::Serve),
            "check" => Some(Self::Check),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    catalog: PathBuf,
    server: ServerConfig,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut server = ServerConfig::default();
        let mut db_url = std::env::var("COURSE_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url);
        let mut catalog = std::env::var("COURSE_CATALOG")
            .map_or_else(|_| PathBuf::from("data/catalog.json"), PathBuf::from);
        if let Ok(raw) = std::env::var("COURSE_BIND") {
            server.bind = parse_bind(raw)?;
        }
        if let Ok(raw) = std::env::var("COURSE_REQUEST_TIMEOUT_SECS") {
            server.request_timeout_secs = parse_timeout(raw)?;
        }
        if let Ok(raw) = std::env::var("COURSE_CORS_ORIGINS") {
            server.cors_origins = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--bind" => server.bind = parse_bind(require_value(args, "--bind")?)?,
                "--catalog" => catalog = PathBuf::from(require_value(args, "--catalog")?),
                "--timeout-secs" => {
                    server.request_timeout_secs =
                        parse_timeout(require_value(args, "--timeout-secs")?)?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            catalog,
            server,
        })
    }
}

fn parse_bind(raw: String) -> Result<SocketAddr, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidBind { raw })
}

fn parse_timeout(raw: String) -> Result<u64, ArgsError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ArgsError::InvalidTimeout { raw }),
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn load_catalog(path: &std::path::Path) -> Result<Catalog, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read catalog {}: {e}", path.display()))?;
    let catalog = Catalog::from_json(&raw)?;
    tracing::info!(path = %path.display(), courses = catalog.len(), "catalog loaded");
    Ok(catalog)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: serve when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Serve,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Serve,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let catalog = Arc::new(load_catalog(&parsed.catalog)?);

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::new_sqlite(&parsed.db_url, Clock::default(), catalog).await?;

    match cmd {
        Command::Check => {
            eprintln!(
                "ok: catalog {} is valid and {} is migrated.",
                parsed.catalog.display(),
                parsed.db_url
            );
            Ok(())
        }
        Command::Serve => {
            let addr = parsed.server.bind;
            let app = build_app_router(AppState::new(services, parsed.server));

            let listener = tokio::net::TcpListener::bind(addr).await?;
            tracing::info!(%addr, "Starting server");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            tracing::info!("Server stopped");
            Ok(())
        }
    }
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app=info,api=info,services=info,storage=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(&mut iter)
    }

    #[test]
    fn flags_override_defaults() {
        let args = parse(&[
            "--db",
            "sqlite:///tmp/course.sqlite3",
            "--bind",
            "0.0.0.0:8080",
            "--catalog",
            "courses.json",
            "--timeout-secs",
            "5",
        ])
        .unwrap();
        assert_eq!(args.db_url, "sqlite:///tmp/course.sqlite3");
        assert_eq!(args.server.bind, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(args.catalog, PathBuf::from("courses.json"));
        assert_eq!(args.server.request_timeout_secs, 5);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            parse(&["--bind", "nowhere"]),
            Err(ArgsError::InvalidBind { .. })
        ));
        assert!(matches!(
            parse(&["--timeout-secs", "0"]),
            Err(ArgsError::InvalidTimeout { .. })
        ));
        assert!(matches!(
            parse(&["--db"]),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
        assert!(matches!(
            parse(&["--verbose"]),
            Err(ArgsError::UnknownArg(_))
        ));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:dev.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("dev.sqlite3"));
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
    }
}
