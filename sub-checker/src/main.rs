//! Точка входа `sub-checker`.
//!
//! Жизненный цикл:
//! - парсинг CLI и загрузка подписки из файла или по URL
//! - разбор записей и сортировка по классу и адресу
//! - проверка TCP доступности пулом воркеров
//! - отчёт в stdout и, опционально, в файл
//! - корректная остановка по `Ctrl+C`: непроверенные сервера не попадают в отчёт

mod cli;
mod config;
mod pool;
mod probe;
mod report;
mod source;

use std::fs::File;
use std::io::{self, BufWriter};
use std::sync::{Arc, atomic::AtomicBool, atomic::Ordering};

use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use sub_core::Decoder;

fn main() -> anyhow::Result<()> {
    // Логи через RUST_LOG=debug/trace, по умолчанию info
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config::DEFAULT_LOG_FILTER),
    )
    .init();

    let shutdown = Arc::new(AtomicBool::new(false));

    // Ctrl+C => ставим shutdown=true
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::Relaxed);
            info!("shutting down...");
        })?;
    }

    let args = cli::Args::parse();
    args.validate()?;

    let raw = source::load_subscription(&args)?;

    let decoded = Decoder::new(args.record_policy())
        .decode(&raw)
        .context("can't decode subscription")?;
    if decoded.skipped > 0 {
        warn!("skipped {} malformed records", decoded.skipped);
    }

    let servers = sub_core::rank(decoded.servers);

    // файл открываем до проверок, чтобы не ждать таймаутов зря
    let file = match &args.output {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("can't open file: {:?}", path))?,
        )),
        None => None,
    };

    let cfg = args.pool_config();
    info!(
        "Starting sub-checker: servers={}, concurrency={}, timeout={:?}, attempts={}",
        servers.len(),
        cfg.concurrency,
        cfg.timeout,
        cfg.attempts
    );

    let outcomes = pool::run_probes(&servers, &probe::TcpProber::default(), &cfg, &shutdown);

    let mut reporter = report::Reporter::new(io::stdout().lock(), file, args.verbose);
    let summary = reporter
        .emit_all(&servers, &outcomes)
        .context("can't write report")?;
    reporter.finish().context("can't write report")?;

    if summary.unprobed > 0 {
        warn!("{} servers were not probed (interrupted)", summary.unprobed);
    }
    info!("done: {summary}");

    Ok(())
}
