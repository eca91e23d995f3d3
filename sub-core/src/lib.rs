//! # sub-core
//!
//! Модель и разбор подписки для `sub-checker`.
//!
//! Этот крейт содержит:
//!
//! - [`descriptor`] - описание одного сервера из подписки
//! - [`decode`] - разбор подписки: внешний base64, строки, base64 + JSON записи
//! - [`rank`] - порядок серверов в отчёте
//! - [`error`] - типы ошибок декодирования
//!
//! ## Пример: подписка из одной записи
//!
//! ```rust
//! use sub_core::{ServerDescriptor, decode, rank};
//!
//! let server = ServerDescriptor {
//!     address: "10.0.0.1".to_string(),
//!     port: 443,
//!     class: 1,
//!     ..Default::default()
//! };
//! let line = server.to_record().unwrap();
//!
//! let servers = rank(decode(&line).unwrap());
//! assert_eq!(servers, vec![server]);
//! ```
//!
//! ## Дизайн
//!
//! Здесь только чистые типы и разбор, без сети и потоков.
//! Проверка доступности и пул воркеров живут в `sub-checker`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Описание сервера.
pub mod descriptor;

/// Разбор подписки.
pub mod decode;

/// Сортировка для отчёта.
pub mod rank;

/// Ошибки `sub-core`.
pub mod error;

/// Общие константы
mod constants;
pub use constants::{PREVIEW_LEN, RECORD_PREFIX};

// --- Re-exports (публичный фасад API) ---

pub use crate::decode::{Decoded, Decoder, RecordEncodingPolicy, decode};
pub use crate::descriptor::ServerDescriptor;
pub use crate::error::DecodeError;
pub use crate::rank::rank;
