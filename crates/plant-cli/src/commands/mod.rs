use clap::Subcommand;

pub mod check_env;
pub mod serve;

#[derive(Subcommand)]
pub enum Commands {
    /// Connect to MongoDB and serve the HTTP API (default)
    Serve(serve::ServeArgs),
    /// Check that every required environment variable is set
    CheckEnv(check_env::CheckEnvArgs),
}

impl Default for Commands {
    fn default() -> Self {
        Self::Serve(serve::ServeArgs::default())
    }
}
