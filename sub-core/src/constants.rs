/// Префикс одной записи подписки
pub const RECORD_PREFIX: &str = "vmess://";

/// Сколько символов входа показывать в сообщениях об ошибках
pub const PREVIEW_LEN: usize = 10;
