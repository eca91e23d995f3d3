use std::fmt;
use std::io::{self, Write};

use sub_core::ServerDescriptor;

/// Итоги прогона
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Summary {
    pub(crate) reachable: usize,
    pub(crate) unreachable: usize,
    pub(crate) unprobed: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ok={} err={} unprobed={}",
            self.reachable, self.unreachable, self.unprobed
        )
    }
}

/// Строка отчёта для одного сервера
pub(crate) fn format_line(server: &ServerDescriptor, reachable: bool, verbose: bool) -> String {
    let status = if reachable { "OK " } else { "ERR" };
    if verbose {
        format!("{status} - {server}")
    } else {
        format!(
            "{status} - {}:{} @ {}",
            server.address, server.port, server.remark
        )
    }
}

/// Пишет отчёт в основной поток и, если задан, дублирует в файл
pub(crate) struct Reporter<O: Write, F: Write> {
    out: O,
    file: Option<F>,
    verbose: bool,
}

impl<O: Write, F: Write> Reporter<O, F> {
    pub(crate) fn new(out: O, file: Option<F>, verbose: bool) -> Self {
        Self { out, file, verbose }
    }

    pub(crate) fn emit(&mut self, server: &ServerDescriptor, reachable: bool) -> io::Result<()> {
        let line = format_line(server, reachable, self.verbose);
        writeln!(self.out, "{line}")?;
        if let Some(f) = self.file.as_mut() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }

    /// Печатает все проверенные сервера в порядке `servers`.
    /// Сервера без результата пропускаются и только считаются.
    pub(crate) fn emit_all(
        &mut self,
        servers: &[ServerDescriptor],
        outcomes: &[Option<bool>],
    ) -> io::Result<Summary> {
        let mut summary = Summary::default();

        for (server, outcome) in servers.iter().zip(outcomes) {
            let Some(reachable) = *outcome else {
                summary.unprobed += 1;
                continue;
            };
            if reachable {
                summary.reachable += 1;
            } else {
                summary.unreachable += 1;
            }
            self.emit(server, reachable)?;
        }

        Ok(summary)
    }

    pub(crate) fn finish(mut self) -> io::Result<()> {
        self.out.flush()?;
        if let Some(f) = self.file.as_mut() {
            f.flush()?;
        }
        Ok(())
    }
}
