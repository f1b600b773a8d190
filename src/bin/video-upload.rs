//! Command-line front end for the upload pipeline.
//!
//! `upload` runs one attempt, `commit` retries only the metadata step of a
//! failed attempt, `list` prints committed videos and `categories` the tags
//! the server accepts.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::{env, path::PathBuf, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use video_store::{
    client::{
        AuthToken, CoordinatorSettings, HttpApi, PendingCommit, StaticTokenProvider,
        UploadCoordinator, UploadError, UploadFile, UploadForm,
        remote::MetadataClient,
        sort::{SortOption, sort_records},
    },
    models::video::VideoQuery,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Upload videos to a video-store server")]
struct Cli {
    /// API base URL (overrides VIDEO_UPLOAD_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Deadline in seconds for grant and commit calls (overrides VIDEO_UPLOAD_TIMEOUT_SECS)
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate, request a grant, transfer the file and commit its metadata
    Upload {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        category: String,
        /// MIME type; guessed from the extension when omitted
        #[arg(long)]
        content_type: Option<String>,
        file: PathBuf,
    },
    /// Retry the metadata commit for an already uploaded binary
    Commit {
        #[arg(long)]
        video_id: String,
        #[arg(long)]
        video_url: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        category: String,
    },
    /// List committed videos
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// A-Z, Z-A or "Last Updated"
        #[arg(long, default_value = "A-Z")]
        sort: SortOption,
    },
    /// Print the categories the server accepts
    Categories,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let api_url = cli
        .api_url
        .or_else(|| env::var("VIDEO_UPLOAD_API_URL").ok())
        .unwrap_or_else(|| "http://127.0.0.1:3000".into());
    let timeout_secs = match cli.timeout_secs {
        Some(secs) => secs,
        None => match env::var("VIDEO_UPLOAD_TIMEOUT_SECS") {
            Ok(value) => value
                .parse()
                .with_context(|| format!("parsing VIDEO_UPLOAD_TIMEOUT_SECS value `{}`", value))?,
            Err(_) => 30,
        },
    };

    let token = env::var("VIDEO_UPLOAD_TOKEN").ok().map(AuthToken::new);
    let identity = Arc::new(StaticTokenProvider::new(token));
    let api = Arc::new(HttpApi::new(&api_url, identity)?);
    let settings = CoordinatorSettings {
        request_timeout: Duration::from_secs(timeout_secs),
        ..CoordinatorSettings::default()
    };
    let mut coordinator =
        UploadCoordinator::new(api.clone(), api.clone(), api.clone(), settings);

    match cli.command {
        Command::Upload {
            title,
            description,
            category,
            content_type,
            file,
        } => {
            coordinator
                .load_categories()
                .await
                .context("loading categories from the server")?;
            let file = UploadFile::open(&file, content_type)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let form = UploadForm {
                title,
                description,
                category,
                file: Some(file),
            };

            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_ctrl_c.cancel();
                }
            });

            match coordinator.submit(form, &cancel).await {
                Ok(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                Err(err) => return Err(report(err)),
            }
        }
        Command::Commit {
            video_id,
            video_url,
            title,
            description,
            category,
        } => {
            let pending = PendingCommit {
                video_id,
                video_url,
                title,
                description,
                category,
            };
            match coordinator.retry_commit(pending).await {
                Ok(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                Err(err) => return Err(report(err)),
            }
        }
        Command::List {
            search,
            category,
            sort,
        } => {
            let query = VideoQuery {
                search_query: search,
                category,
            };
            let mut records = api.list_records(&query).await?;
            sort_records(&mut records, sort);
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Categories => {
            for category in api.list_categories().await? {
                println!("{}", category);
            }
        }
    }

    Ok(())
}

/// Turn a failed attempt into an error that tells the user what to do next.
fn report(err: UploadError) -> anyhow::Error {
    if let Some(pending) = err.pending_commit() {
        eprintln!(
            "retry with: video-upload commit --video-id {} --video-url {} --title {:?} --description {:?} --category {:?}",
            pending.video_id, pending.video_url, pending.title, pending.description, pending.category
        );
    }
    if let UploadError::Validation(errors) = &err {
        for field in &errors.errors {
            eprintln!("  {}: {}", field.field, field.message);
        }
        anyhow!("upload form is invalid")
    } else {
        anyhow::Error::new(err)
    }
}
