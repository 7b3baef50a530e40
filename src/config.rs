use anyhow::{Context, Result};
use clap::Parser;
use std::{env, fmt, path::PathBuf};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub work_dir: PathBuf,
    pub password: String,
    pub jwt_secret: String,
    pub max_upload_mb: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Image collection store with ZIP bulk upload")]
pub struct Args {
    /// Host to bind to (overrides STOREBOOK_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides STOREBOOK_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory holding the database and collection files (overrides STOREBOOK_WORK_DIR)
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Sign-in password (overrides STOREBOOK_PASSWORD)
    #[arg(long)]
    pub password: Option<String>,

    /// HMAC secret for issued tokens (overrides STOREBOOK_JWT_SECRET)
    #[arg(long)]
    pub jwt_secret: Option<String>,

    /// Maximum upload request size in MiB (overrides STOREBOOK_MAX_UPLOAD_MB)
    #[arg(long)]
    pub max_upload_mb: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

/// Read an optional env var, failing only on non-unicode values.
fn env_opt(name: &str) -> Result<Option<String>> {
    match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

fn env_parsed<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_opt(name)? {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        None => Ok(default),
    }
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();
        let migrate = args.migrate;
        Ok((Self::merge(args)?, migrate))
    }

    fn merge(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env_opt("STOREBOOK_HOST")?.unwrap_or_else(|| "0.0.0.0".into());
        let env_port = env_parsed("STOREBOOK_PORT", 3000u16)?;
        let env_work_dir = env_opt("STOREBOOK_WORK_DIR")?.unwrap_or_else(|| "./work".into());
        let env_max_upload = env_parsed("STOREBOOK_MAX_UPLOAD_MB", 512usize)?;

        let password = match args.password {
            Some(value) => value,
            None => env_opt("STOREBOOK_PASSWORD")?
                .context("a password is required (--password or STOREBOOK_PASSWORD)")?,
        };
        let jwt_secret = match args.jwt_secret {
            Some(value) => value,
            None => env_opt("STOREBOOK_JWT_SECRET")?
                .context("a JWT secret is required (--jwt-secret or STOREBOOK_JWT_SECRET)")?,
        };

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            work_dir: args.work_dir.unwrap_or_else(|| PathBuf::from(env_work_dir)),
            password,
            jwt_secret,
            max_upload_mb: args.max_upload_mb.unwrap_or(env_max_upload),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("work_dir", &self.work_dir)
            .field("password", &"<redacted>")
            .field("jwt_secret", &"<redacted>")
            .field("max_upload_mb", &self.max_upload_mb)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_values_win() {
        let args = Args::parse_from([
            "storebook",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--work-dir",
            "/tmp/sb",
            "--password",
            "pw",
            "--jwt-secret",
            "s",
            "--max-upload-mb",
            "3",
        ]);
        let cfg = AppConfig::merge(args).expect("all values supplied");

        assert_eq!(cfg.addr(), "127.0.0.1:8080");
        assert_eq!(cfg.work_dir, PathBuf::from("/tmp/sb"));
        assert_eq!(cfg.max_upload_bytes(), 3 * 1024 * 1024);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let args = Args::parse_from(["storebook", "--password", "pw-123", "--jwt-secret", "s-456"]);
        let cfg = AppConfig::merge(args).unwrap();

        let printed = format!("{:?}", cfg);
        assert!(!printed.contains("pw-123"));
        assert!(!printed.contains("s-456"));
    }
}
