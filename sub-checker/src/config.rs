use std::time::Duration;

/// Таймаут TCP подключения по умолчанию (формат `--timeout`)
pub(crate) const DEFAULT_TIMEOUT: &str = "2s";

pub(crate) const DEFAULT_CONCURRENCY: usize = 1;
pub(crate) const DEFAULT_ATTEMPTS: usize = 1;

/// Как часто простаивающий воркер проверяет флаг остановки
pub(crate) const WORKER_TICK: Duration = Duration::from_millis(50);

pub(crate) const USER_AGENT: &str = "subchecker/1.0";
pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Фильтр логов, если RUST_LOG не задан
pub(crate) const DEFAULT_LOG_FILTER: &str = "info";
