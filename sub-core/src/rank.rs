use std::cmp::Ordering;

use crate::descriptor::ServerDescriptor;

/// Порядок отчёта: класс по убыванию, затем адрес по возрастанию (побайтово)
pub fn compare(a: &ServerDescriptor, b: &ServerDescriptor) -> Ordering {
    b.class
        .cmp(&a.class)
        .then_with(|| a.address.as_bytes().cmp(b.address.as_bytes()))
}

/// Сортирует сервера для отчёта. Сортировка стабильная:
/// при полном равенстве ключей исходный порядок сохраняется.
pub fn rank(mut servers: Vec<ServerDescriptor>) -> Vec<ServerDescriptor> {
    servers.sort_by(compare);
    servers
}
