use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use log::{debug, warn};

use crate::constants::{PREVIEW_LEN, RECORD_PREFIX};
use crate::descriptor::ServerDescriptor;
use crate::error::{DecodeError, RecordError};

/// Стандартный алфавит, `=` в конце необязателен
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Что делать, если base64 внутри отдельной записи не декодируется
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordEncodingPolicy {
    /// Прервать весь прогон
    #[default]
    Abort,
    /// Записать предупреждение и пропустить запись
    Skip,
}

/// Результат декодирования подписки
#[derive(Debug, Default)]
pub struct Decoded {
    /// Сервера в порядке следования в подписке
    pub servers: Vec<ServerDescriptor>,
    /// Сколько записей пропущено
    pub skipped: usize,
}

/// Декодер подписки
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    record_encoding: RecordEncodingPolicy,
}

impl Decoder {
    /// Декодер с заданной политикой для битого base64 записи
    pub fn new(record_encoding: RecordEncodingPolicy) -> Self {
        Self { record_encoding }
    }

    /// Разбирает подписку целиком.
    ///
    /// Битая JSON-структура записи не фатальна: запись пропускается.
    /// Битый base64 записи обрабатывается согласно [`RecordEncodingPolicy`].
    pub fn decode(&self, raw: &str) -> Result<Decoded, DecodeError> {
        let text = unwrap_outer(raw)?;
        let mut out = Decoded::default();

        for (idx, line) in text.lines().enumerate() {
            let record = line.trim();
            if record.is_empty() {
                continue;
            }
            let line_no = idx + 1;

            match parse_record(record) {
                Ok(server) => out.servers.push(server),
                Err(RecordError::Encoding(e)) => match self.record_encoding {
                    RecordEncodingPolicy::Abort => {
                        return Err(DecodeError::MalformedRecordEncoding {
                            line: line_no,
                            record: record.to_string(),
                        });
                    }
                    RecordEncodingPolicy::Skip => {
                        warn!("skipping record on line {line_no}: {e}");
                        out.skipped += 1;
                    }
                },
                Err(e @ RecordError::Structure { .. }) => {
                    warn!("skipping record on line {line_no}: {e}");
                    out.skipped += 1;
                }
            }
        }

        debug!(
            "decoded {} servers, skipped {} records",
            out.servers.len(),
            out.skipped
        );
        Ok(out)
    }
}

/// Декодирует подписку с политикой по умолчанию
pub fn decode(raw: &str) -> Result<Vec<ServerDescriptor>, DecodeError> {
    Decoder::default().decode(raw).map(|d| d.servers)
}

/// Внешний слой: либо уже текст с записями, либо base64 от него
fn unwrap_outer(raw: &str) -> Result<String, DecodeError> {
    let raw = raw.trim();
    if raw.starts_with(RECORD_PREFIX) {
        return Ok(raw.to_string());
    }

    // base64 бывает переносят по строкам
    let compact: String = raw.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();

    LENIENT
        .decode(compact.as_bytes())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| DecodeError::InvalidEncoding {
            preview: preview(raw),
        })
}

fn parse_record(record: &str) -> Result<ServerDescriptor, RecordError> {
    let payload = record.strip_prefix(RECORD_PREFIX).unwrap_or(record);
    let bytes = LENIENT.decode(payload)?;

    ServerDescriptor::from_json(&bytes).map_err(|source| RecordError::Structure {
        preview: preview(&String::from_utf8_lossy(&bytes)),
        source,
    })
}

fn preview(s: &str) -> String {
    s.chars().take(PREVIEW_LEN).collect()
}
