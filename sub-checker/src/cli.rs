use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Parser};
use sub_core::RecordEncodingPolicy;

use crate::config;
use crate::pool::PoolConfig;

/// Sub Checker - проверяет TCP доступность серверов из подписки.
///
/// Подписку берём из файла или по URL, сортируем по классу и адресу,
/// печатаем по строке на сервер: OK или ERR.
#[derive(Parser, Debug, Clone)]
#[command(name = "sub-checker", version, about)]
#[command(
    group(
        ArgGroup::new("source")
            .required(true)
            .multiple(false)
            .args(["url", "file"])
    )
)]
pub(crate) struct Args {
    /// URL подписки
    #[arg(short = 'u', long, conflicts_with = "file")]
    pub(crate) url: Option<String>,

    /// Файл подписки
    #[arg(short = 'f', long, conflicts_with = "url")]
    pub(crate) file: Option<PathBuf>,

    /// Дополнительно записать отчёт в файл
    #[arg(short = 'o', long)]
    pub(crate) output: Option<PathBuf>,

    /// Подробный режим: печатать описание сервера целиком
    #[arg(short = 'v', long)]
    pub(crate) verbose: bool,

    /// Сколько серверов проверять параллельно
    #[arg(short = 'c', long, default_value_t = config::DEFAULT_CONCURRENCY, value_parser = parse_positive)]
    pub(crate) concurrency: usize,

    /// Таймаут TCP подключения, например 500ms, 2s, 1m30s (число без суффикса - секунды)
    #[arg(short = 't', long, default_value = config::DEFAULT_TIMEOUT, value_parser = parse_duration)]
    pub(crate) timeout: Duration,

    /// Попыток на сервер; доступен, если успешно больше половины
    #[arg(short = 'n', long, default_value_t = config::DEFAULT_ATTEMPTS, value_parser = parse_positive)]
    pub(crate) attempts: usize,

    /// Пропускать записи с битым base64 вместо остановки
    #[arg(long)]
    pub(crate) skip_bad_records: bool,
}

impl Args {
    /// Валидация аргументов (файл существует, URL похож на http(s) и т.д.)
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(path) = &self.file {
            let md = std::fs::metadata(path)
                .with_context(|| format!("subscription file not found: {:?}", path))?;
            if !md.is_file() {
                bail!("--file must point to a file: {:?}", path);
            }
        }

        if let Some(url) = &self.url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("--url must start with http:// or https:// (got: {url})");
            }
        }

        Ok(())
    }

    pub(crate) fn record_policy(&self) -> RecordEncodingPolicy {
        if self.skip_bad_records {
            RecordEncodingPolicy::Skip
        } else {
            RecordEncodingPolicy::Abort
        }
    }

    pub(crate) fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            concurrency: self.concurrency,
            timeout: self.timeout,
            attempts: self.attempts,
        }
    }
}

fn parse_positive(raw: &str) -> std::result::Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("not a positive integer: {raw:?}")),
    }
}

/// Наносекунд в единице длительности
const DURATION_UNITS: [(&str, f64); 7] = [
    ("ns", 1.0),
    ("us", 1e3),
    ("µs", 1e3),
    ("ms", 1e6),
    ("s", 1e9),
    ("m", 60e9),
    ("h", 3600e9),
];

/// Парсит длительность: `250ms`, `1.5s`, `1m30s`, `1h2m3s` или просто `3` (секунды).
pub(crate) fn parse_duration(raw: &str) -> std::result::Result<Duration, String> {
    let invalid = || format!("invalid duration: {raw:?}");
    let s = raw.trim();

    // число без единицы - секунды
    if let Ok(secs) = s.parse::<f64>() {
        return positive(Duration::try_from_secs_f64(secs).map_err(|_| invalid())?, raw);
    }

    let mut nanos = 0.0_f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let (num, tail) = rest.split_at(num_end);
        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);

        let value: f64 = num.parse().map_err(|_| invalid())?;
        let (_, scale) = DURATION_UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .ok_or_else(invalid)?;

        nanos += value * scale;
        rest = tail;
    }

    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        return Err(invalid());
    }
    positive(Duration::from_nanos(nanos.round() as u64), raw)
}

fn positive(d: Duration, raw: &str) -> std::result::Result<Duration, String> {
    if d.is_zero() {
        return Err(format!("duration must be positive: {raw:?}"));
    }
    Ok(d)
}
