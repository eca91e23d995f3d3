use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info};
use sub_core::ServerDescriptor;

use crate::config::WORKER_TICK;
use crate::probe::Prober;

#[derive(Debug, Clone)]
pub(crate) struct PoolConfig {
    /// Количество воркеров
    pub(crate) concurrency: usize,
    /// Таймаут одной попытки подключения
    pub(crate) timeout: Duration,
    /// Попыток на сервер (голосование большинством)
    pub(crate) attempts: usize,
}

type Job<'a> = (usize, &'a ServerDescriptor);

/// Проверяет все сервера пулом из `concurrency` потоков.
///
/// Результат `i` относится к `servers[i]` независимо от того, какой воркер
/// и когда его посчитал. `None` - сервер не проверялся, потому что
/// выставлен `shutdown`.
pub(crate) fn run_probes<P: Prober>(
    servers: &[ServerDescriptor],
    prober: &P,
    cfg: &PoolConfig,
    shutdown: &AtomicBool,
) -> Vec<Option<bool>> {
    let mut outcomes = vec![None; servers.len()];
    if servers.is_empty() {
        return outcomes;
    }

    let workers = cfg.concurrency.clamp(1, servers.len());

    let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job<'_>>();
    let (res_tx, res_rx) = crossbeam_channel::unbounded::<(usize, bool)>();

    // очередь заполняется целиком заранее, воркеры разбирают её сами
    for job in servers.iter().enumerate() {
        if job_tx.send(job).is_err() {
            break;
        }
    }
    drop(job_tx);

    thread::scope(|s| {
        for wid in 0..workers {
            let job_rx = job_rx.clone();
            let res_tx = res_tx.clone();
            s.spawn(move || run_worker(wid, job_rx, res_tx, prober, cfg, shutdown));
        }
        drop(res_tx);

        for (idx, ok) in res_rx.iter() {
            outcomes[idx] = Some(ok);
        }
    });

    let done = outcomes.iter().filter(|o| o.is_some()).count();
    info!("probed {done}/{} servers with {workers} workers", servers.len());
    outcomes
}

fn run_worker<P: Prober>(
    wid: usize,
    jobs: Receiver<Job<'_>>,
    results: Sender<(usize, bool)>,
    prober: &P,
    cfg: &PoolConfig,
    shutdown: &AtomicBool,
) {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("worker {wid}: shutdown requested");
            break;
        }

        match jobs.recv_timeout(WORKER_TICK) {
            Ok((idx, server)) => {
                let ok = probe_majority(prober, server, cfg);
                if results.send((idx, ok)).is_err() {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                // тик: проверим shutdown и продолжим
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Доступен, если успешных попыток строго больше половины.
/// Останавливается, как только исход голосования известен.
fn probe_majority<P: Prober>(prober: &P, server: &ServerDescriptor, cfg: &PoolConfig) -> bool {
    let attempts = cfg.attempts.max(1);
    let mut ok = 0;

    for done in 1..=attempts {
        if prober.probe(server, cfg.timeout) {
            ok += 1;
        }
        if ok * 2 > attempts {
            return true;
        }
        // ничья тоже проигрыш
        if (done - ok) * 2 >= attempts {
            return false;
        }
    }

    false
}
