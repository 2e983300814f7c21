use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "plant",
    about = "Plant catalog backend - REST API over MongoDB with Cloudinary image uploads",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<commands::Commands>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Load environment variables from this file instead of ./.env
    #[arg(long, global = true, value_name = "PATH")]
    env_file: Option<PathBuf>,
}

fn init_tracing(verbose: u8, json: bool) {
    let default = match verbose {
        0 => "info,tower_http=info",
        1 => "debug,mongodb=info",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load `.env` (or the given file) before anything reads the environment.
fn load_env_file(path: Option<&PathBuf>) -> Result<Option<PathBuf>, dotenvy::Error> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|_| path.clone()),
        None => dotenvy::dotenv(),
    };
    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let env_file = load_env_file(cli.env_file.as_ref());
    init_tracing(cli.verbose, cli.log_json);

    match env_file {
        Ok(Some(path)) => tracing::debug!(path = %path.display(), "Loaded environment file"),
        Ok(None) => tracing::debug!("No .env file found"),
        Err(e) => tracing::warn!(error = %e, "Failed to load environment file"),
    }

    match cli.command.unwrap_or_default() {
        commands::Commands::Serve(args) => commands::serve::execute(args).await,
        commands::Commands::CheckEnv(args) => commands::check_env::execute(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["plant"]).unwrap();
        assert!(matches!(
            cli.command.unwrap_or_default(),
            commands::Commands::Serve(commands::serve::ServeArgs { port: None })
        ));
    }

    #[test]
    fn serve_accepts_port_override() {
        let cli = Cli::try_parse_from(["plant", "-v", "serve", "--port", "8080"]).unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Some(commands::Commands::Serve(args)) => assert_eq!(args.port, Some(8080)),
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn check_env_parses_with_global_flags() {
        let cli = Cli::try_parse_from(["plant", "check-env", "--show-defaults", "--log-json"]).unwrap();
        assert!(cli.log_json);
        assert!(matches!(
            cli.command,
            Some(commands::Commands::CheckEnv(ref args)) if args.show_defaults
        ));
    }

    #[test]
    fn missing_env_file_is_not_an_error() {
        let path = PathBuf::from("/nonexistent/plant/.env");
        assert!(matches!(load_env_file(Some(&path)), Ok(None)));
    }
}
