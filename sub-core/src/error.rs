use thiserror::Error;

/// Фатальные ошибки декодирования подписки: прогон дальше не идёт
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Вход не начинается с префикса записи и не является base64
    #[error("data is not a valid base64 string: {preview:?}")]
    InvalidEncoding {
        /// Начало входа
        preview: String,
    },

    /// base64 внутри отдельной записи битый
    #[error("record on line {line} is not a valid base64 string: {record:?}")]
    MalformedRecordEncoding {
        /// Номер строки, с 1
        line: usize,
        /// Запись целиком
        record: String,
    },
}

/// Ошибки одной записи. Наружу не выходят: решение принимает декодер
#[derive(Debug, Error)]
pub(crate) enum RecordError {
    #[error("base64 decode error: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("failed to unmarshal {preview:?}: {source}")]
    Structure {
        preview: String,
        #[source]
        source: serde_json::Error,
    },
}
