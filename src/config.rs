use anyhow::{Context, Result, ensure};
use clap::Parser;
use std::env;

/// Longest lifetime an upload grant may be configured with (seven days).
pub const MAX_GRANT_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Centralized server configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    /// Externally reachable base URL used to build upload and video URLs.
    pub public_base_url: String,
    pub signing_secret: String,
    pub grant_ttl_secs: u64,
    pub categories: Vec<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Video upload grant, object and metadata service")]
pub struct Args {
    /// Host to bind to (overrides VIDEO_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides VIDEO_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploaded binaries are stored (overrides VIDEO_STORE_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides VIDEO_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Public base URL (overrides VIDEO_STORE_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Lifetime of upload grants in seconds (overrides VIDEO_STORE_GRANT_TTL_SECS)
    #[arg(long)]
    pub grant_ttl_secs: Option<u64>,

    /// Comma separated category tags (overrides VIDEO_STORE_CATEGORIES)
    #[arg(long)]
    pub categories: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        Ok((Self::from_args(args)?, migrate))
    }

    /// Merge already-parsed arguments over the environment.
    ///
    /// The signing secret is only ever read from `VIDEO_STORE_SIGNING_SECRET`
    /// so it never shows up in process listings.
    pub fn from_args(args: Args) -> Result<Self> {
        let env_host = env::var("VIDEO_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env("VIDEO_STORE_PORT", 3000u16)?;
        let env_storage =
            env::var("VIDEO_STORE_STORAGE_DIR").unwrap_or_else(|_| "./data/objects".into());
        let env_db = env::var("VIDEO_STORE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/video_store.db".into());
        let env_ttl = parse_env("VIDEO_STORE_GRANT_TTL_SECS", 3600u64)?;
        let env_categories = env::var("VIDEO_STORE_CATEGORIES")
            .unwrap_or_else(|_| "category1,category2,category3".into());

        let grant_ttl_secs = args.grant_ttl_secs.unwrap_or(env_ttl);
        ensure!(
            (1..=MAX_GRANT_TTL_SECS).contains(&grant_ttl_secs),
            "grant TTL must be between 1 and {} seconds, got {}",
            MAX_GRANT_TTL_SECS,
            grant_ttl_secs
        );

        let host = args.host.unwrap_or(env_host);
        let port = args.port.unwrap_or(env_port);
        let public_base_url = args
            .public_url
            .or_else(|| env::var("VIDEO_STORE_PUBLIC_URL").ok())
            .unwrap_or_else(|| format!("http://{}:{}", loopback_if_wildcard(&host), port));

        Ok(Self {
            host,
            port,
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            signing_secret: env::var("VIDEO_STORE_SIGNING_SECRET").unwrap_or_default(),
            grant_ttl_secs,
            categories: split_categories(&args.categories.unwrap_or(env_categories)),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

fn loopback_if_wildcard(host: &str) -> &str {
    match host {
        "0.0.0.0" | "::" => "127.0.0.1",
        other => other,
    }
}

/// Split a comma separated category list, dropping blanks and duplicates.
pub fn split_categories(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !out.iter().any(|existing| existing == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_are_trimmed_and_deduplicated() {
        assert_eq!(
            split_categories(" category1, ,category2,category1 "),
            vec!["category1".to_string(), "category2".to_string()]
        );
    }

    #[test]
    fn wildcard_hosts_map_to_loopback_for_public_urls() {
        assert_eq!(loopback_if_wildcard("0.0.0.0"), "127.0.0.1");
        assert_eq!(loopback_if_wildcard("videos.local"), "videos.local");
    }

    #[test]
    fn grant_ttl_outside_bounds_is_refused() {
        for ttl in [0, MAX_GRANT_TTL_SECS + 1, u64::MAX] {
            let args = Args {
                grant_ttl_secs: Some(ttl),
                ..Args::default()
            };
            assert!(AppConfig::from_args(args).is_err(), "{ttl} should be refused");
        }
        let args = Args {
            grant_ttl_secs: Some(MAX_GRANT_TTL_SECS),
            ..Args::default()
        };
        assert_eq!(
            AppConfig::from_args(args).unwrap().grant_ttl_secs,
            MAX_GRANT_TTL_SECS
        );
    }

    #[test]
    fn cli_arguments_win_over_defaults() {
        let args = Args {
            host: Some("127.0.0.1".into()),
            port: Some(4100),
            public_url: Some("https://cdn.example.com/".into()),
            grant_ttl_secs: Some(60),
            categories: Some("music,sports".into()),
            ..Args::default()
        };
        let cfg = AppConfig::from_args(args).unwrap();
        assert_eq!(cfg.addr(), "127.0.0.1:4100");
        assert_eq!(cfg.public_base_url, "https://cdn.example.com");
        assert_eq!(cfg.grant_ttl_secs, 60);
        assert_eq!(cfg.categories, vec!["music", "sports"]);
    }
}
