use std::io;
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use log::debug;
use sub_core::ServerDescriptor;
use thiserror::Error;

/// Проверка доступности одного сервера.
///
/// Реализация не должна паниковать и не возвращает ошибок:
/// любая проблема сети означает `false`.
pub(crate) trait Prober: Sync {
    fn probe(&self, server: &ServerDescriptor, timeout: Duration) -> bool;
}

/// Причины недоступности, только для логов
#[derive(Debug, Error)]
enum ProbeError {
    #[error("empty address")]
    EmptyAddress,

    #[error("invalid port: {0}")]
    InvalidPort(i64),

    #[error("resolve failed: {0}")]
    Resolve(#[source] io::Error),

    #[error("address resolved to nothing")]
    NoAddresses,

    #[error("timed out")]
    TimedOut,

    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),
}

/// Резолвинг имени в адреса (блокирующий)
type ResolveFn = fn(&str, u16) -> io::Result<Vec<SocketAddr>>;

fn system_resolve(host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
    Ok((host, port).to_socket_addrs()?.collect())
}

/// TCP connect без обмена данными: соединение сразу закрывается.
///
/// Таймаут общий на резолвинг и подключение ко всем адресам хоста.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TcpProber {
    resolve: ResolveFn,
}

impl Default for TcpProber {
    fn default() -> Self {
        Self {
            resolve: system_resolve,
        }
    }
}

impl Prober for TcpProber {
    fn probe(&self, server: &ServerDescriptor, timeout: Duration) -> bool {
        match self.try_connect(server, timeout) {
            Ok(peer) => {
                debug!("{} reachable via {peer}", server.target());
                true
            }
            Err(e) => {
                debug!("{} unreachable: {e}", server.target());
                false
            }
        }
    }
}

impl TcpProber {
    #[cfg(test)]
    fn with_resolver(resolve: ResolveFn) -> Self {
        Self { resolve }
    }

    fn try_connect(
        &self,
        server: &ServerDescriptor,
        timeout: Duration,
    ) -> Result<SocketAddr, ProbeError> {
        // IPv6 иногда пишут в скобках
        let host = server.address.trim().trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(ProbeError::EmptyAddress);
        }
        let port = server
            .socket_port()
            .ok_or(ProbeError::InvalidPort(server.port))?;

        let deadline = Instant::now() + timeout;
        let addrs = self.resolve_within(host, port, timeout)?;

        let mut last_err = ProbeError::NoAddresses;
        for addr in addrs {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Err(ProbeError::TimedOut);
            }
            match TcpStream::connect_timeout(&addr, left) {
                Ok(stream) => {
                    stream.shutdown(Shutdown::Both).ok();
                    return Ok(addr);
                }
                Err(e) => last_err = ProbeError::Connect(e),
            }
        }

        Err(last_err)
    }

    /// getaddrinfo не умеет таймаут: резолвим в отдельном потоке и ждём не дольше `left`.
    /// Зависший поток доработает сам, результат уйдёт в закрытый канал.
    fn resolve_within(
        &self,
        host: &str,
        port: u16,
        left: Duration,
    ) -> Result<Vec<SocketAddr>, ProbeError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![SocketAddr::new(ip, port)]);
        }

        let (tx, rx) = crossbeam_channel::bounded(1);
        let resolve = self.resolve;
        let name = host.to_string();
        thread::Builder::new()
            .name("resolve".into())
            .spawn(move || {
                let _ = tx.send(resolve(&name, port));
            })
            .map_err(ProbeError::Resolve)?;

        match rx.recv_timeout(left) {
            Ok(res) => res.map_err(ProbeError::Resolve),
            Err(RecvTimeoutError::Timeout) => Err(ProbeError::TimedOut),
            Err(RecvTimeoutError::Disconnected) => Err(ProbeError::NoAddresses),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn local(port: i64) -> ServerDescriptor {
        ServerDescriptor {
            address: "127.0.0.1".into(),
            port,
            ..Default::default()
        }
    }

    fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
        // listener дропается -> порт закрыт
    }

    #[test]
    fn listening_port_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        assert!(TcpProber::default().probe(&local(port as i64), Duration::from_secs(2)));
    }

    #[test]
    fn closed_port_is_unreachable_within_timeout() {
        let timeout = Duration::from_millis(500);
        let started = Instant::now();

        assert!(!TcpProber::default().probe(&local(closed_port() as i64), timeout));
        assert!(started.elapsed() < timeout + Duration::from_millis(500));
    }

    #[test]
    fn empty_address_is_unreachable() {
        let mut d = local(80);
        d.address.clear();
        assert!(!TcpProber::default().probe(&d, Duration::from_millis(100)));

        d.address = "   ".into();
        assert!(!TcpProber::default().probe(&d, Duration::from_millis(100)));
    }

    #[test]
    fn invalid_port_is_unreachable() {
        for port in [0, -5, 70000] {
            assert!(!TcpProber::default().probe(&local(port), Duration::from_millis(100)));
        }
    }

    #[test]
    fn unresolvable_host_is_unreachable() {
        let d = ServerDescriptor {
            address: "no such host.invalid".into(),
            port: 443,
            ..Default::default()
        };
        assert!(!TcpProber::default().probe(&d, Duration::from_millis(200)));
    }

    fn slow_loopback(_host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        std::thread::sleep(Duration::from_millis(1500));
        Ok(vec![SocketAddr::from(([127, 0, 0, 1], port))])
    }

    fn fast_loopback(_host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        Ok(vec![SocketAddr::from(([127, 0, 0, 1], port))])
    }

    fn named(port: u16) -> ServerDescriptor {
        ServerDescriptor {
            address: "node.example.test".into(),
            port: port as i64,
            ..Default::default()
        }
    }

    #[test]
    fn slow_resolver_counts_against_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let timeout = Duration::from_millis(200);
        let started = Instant::now();

        let prober = TcpProber::with_resolver(slow_loopback);
        assert!(!prober.probe(&named(port), timeout));
        assert!(
            started.elapsed() < timeout + Duration::from_millis(500),
            "took {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn resolved_name_is_connected() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let prober = TcpProber::with_resolver(fast_loopback);
        assert!(prober.probe(&named(port), Duration::from_secs(2)));
    }

    #[test]
    fn ip_literal_skips_resolver() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let prober = TcpProber::with_resolver(slow_loopback);
        let started = Instant::now();
        assert!(prober.probe(&local(port as i64), Duration::from_millis(500)));
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn bracketed_ipv6_is_accepted() {
        let Ok(listener) = TcpListener::bind("[::1]:0") else {
            // нет IPv6 в окружении
            return;
        };
        let port = listener.local_addr().unwrap().port();

        let d = ServerDescriptor {
            address: "[::1]".into(),
            port: port as i64,
            ..Default::default()
        };
        assert!(TcpProber::default().probe(&d, Duration::from_secs(2)));
    }
}
