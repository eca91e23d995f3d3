use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use crate::cli::Args;
use crate::config::{HTTP_TIMEOUT, USER_AGENT};

#[derive(Debug, Error)]
pub(crate) enum SourceError {
    /// Clap-логика должна гарантировать источник, но на всякий случай
    #[error("subscription source is missing: provide either --url or --file")]
    MissingSource,

    #[error("can't read file: {path:?}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't read from url: {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} from url: {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

pub(crate) type Result<T> = std::result::Result<T, SourceError>;

/// Загружает сырой текст подписки из источника, выбранного в CLI:
/// - `--file` -> чтение файла
/// - `--url`  -> HTTP GET
pub(crate) fn load_subscription(args: &Args) -> Result<String> {
    if let Some(path) = &args.file {
        load_from_file(path)
    } else if let Some(url) = &args.url {
        load_from_url(url)
    } else {
        Err(SourceError::MissingSource)
    }
}

fn load_from_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();

    let content = std::fs::read_to_string(path).map_err(|source| SourceError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("read {} bytes from {:?}", content.len(), path);
    Ok(content)
}

fn load_from_url(url: &str) -> Result<String> {
    let fetch_err = |source| SourceError::Fetch {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(fetch_err)?;

    info!("fetching subscription from {url}");
    let resp = client.get(url).send().map_err(fetch_err)?;

    let status = resp.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            url: url.to_string(),
            status,
        });
    }

    let body = resp.text().map_err(fetch_err)?;
    debug!("fetched {} bytes from {url}", body.len());
    Ok(body)
}
