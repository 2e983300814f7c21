use clap::Args;

use plant_core::config::{missing_env_vars, REQUIRED_ENV_VARS};

use super::serve::load_config;

#[derive(Args)]
pub struct CheckEnvArgs {
    /// Also print resolved optional settings
    #[arg(long)]
    pub show_defaults: bool,
}

pub async fn execute(args: CheckEnvArgs) -> anyhow::Result<()> {
    println!("Checking environment...");

    let lookup = |key: &str| std::env::var(key).ok();
    let missing = missing_env_vars(&lookup);

    for key in REQUIRED_ENV_VARS {
        let status = if missing.iter().any(|m| m == key) {
            "NOT SET"
        } else {
            "set"
        };
        println!("  {key}: {status}");
    }

    let config = load_config()?;

    if args.show_defaults {
        println!();
        println!("  PORT: {}", config.port);
        println!("  FRONTEND_URL: {}", config.frontend_url);
        println!("  APP_ENV: {}", config.environment);
        println!("  DB_PROFILE: {}", config.db_profile);
        println!("  UPLOAD_TMP_DIR: {}", config.upload.temp_dir.display());
        println!("  Max upload size: {} bytes", config.upload.max_file_size);
    }

    println!();
    println!("Environment OK");
    Ok(())
}
