use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::constants::RECORD_PREFIX;

/// Один сервер из подписки.
///
/// Все поля необязательны: отсутствующий ключ или `null` даёт пустую строку, `0` или `false`,
/// неизвестные ключи игнорируются.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerDescriptor {
    /// Заголовок Host для транспорта
    #[serde(deserialize_with = "null_as_default")]
    pub host: String,
    /// Путь транспорта
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,
    /// Транспортная безопасность: `"tls"` или пусто
    #[serde(deserialize_with = "null_as_default")]
    pub tls: String,
    /// Проверять ли сертификат
    #[serde(deserialize_with = "null_as_default")]
    pub verify_cert: bool,
    /// Адрес для проверки: имя хоста или IP
    #[serde(rename = "add")]
    #[serde(deserialize_with = "null_as_default")]
    pub address: String,
    /// TCP порт как он записан в подписке (может быть вне 1..=65535)
    #[serde(deserialize_with = "null_as_default")]
    pub port: i64,
    /// Непрозрачный идентификатор протокола
    #[serde(rename = "aid")]
    #[serde(deserialize_with = "null_as_default")]
    pub alter_id: i64,
    /// Тип сети
    #[serde(rename = "net")]
    #[serde(deserialize_with = "null_as_default")]
    pub network: String,
    /// Тип заголовка
    #[serde(rename = "headerType")]
    #[serde(deserialize_with = "null_as_default")]
    pub header_type: String,
    /// Версия формата записи
    #[serde(rename = "v")]
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
    /// Непрозрачный тип
    #[serde(rename = "type")]
    #[serde(deserialize_with = "null_as_default")]
    pub kind: String,
    /// Отображаемое имя
    #[serde(rename = "ps")]
    #[serde(deserialize_with = "null_as_default")]
    pub display_name: String,
    /// Примечание
    #[serde(deserialize_with = "null_as_default")]
    pub remark: String,
    /// Стабильный идентификатор
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    /// Класс приоритета: больше - выше в отчёте
    #[serde(deserialize_with = "null_as_default")]
    pub class: i64,
}

/// Имена ключей записи в том виде, в каком их пишет сериализация
pub const RECORD_KEYS: [&str; 15] = [
    "host",
    "path",
    "tls",
    "verify_cert",
    "add",
    "port",
    "aid",
    "net",
    "headerType",
    "v",
    "type",
    "ps",
    "remark",
    "id",
    "class",
];

/// `null` в записи трактуем как отсутствующее поле
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Option::unwrap_or_default)
}

/// Ключи сравниваются без учёта регистра, точное совпадение важнее
fn canonicalize_keys(obj: &mut Map<String, Value>) {
    let renames: Vec<(String, &str)> = obj
        .keys()
        .filter(|k| !RECORD_KEYS.contains(&k.as_str()))
        .filter_map(|k| {
            RECORD_KEYS
                .iter()
                .find(|known| known.eq_ignore_ascii_case(k))
                .map(|known| (k.clone(), *known))
        })
        .collect();

    for (from, to) in renames {
        if let Some(v) = obj.remove(&from) {
            obj.entry(to).or_insert(v);
        }
    }
}

impl ServerDescriptor {
    /// Разбирает JSON одной записи
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let mut value: Value = serde_json::from_slice(bytes)?;
        if let Some(obj) = value.as_object_mut() {
            canonicalize_keys(obj);
        }
        serde_json::from_value(value)
    }

    /// Порт, пригодный для подключения, или `None`
    pub fn socket_port(&self) -> Option<u16> {
        u16::try_from(self.port).ok().filter(|p| *p != 0)
    }

    /// `address:port`
    pub fn target(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Обратное кодирование в строку подписки: `vmess://<base64(json)>`
    pub fn to_record(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(format!("{RECORD_PREFIX}{}", STANDARD.encode(json)))
    }
}

impl fmt::Display for ServerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{Add:{} Port:{} Ps:{} Path:{} Class:{}}}",
            self.address, self.port, self.display_name, self.path, self.class
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_zero_values_and_unknown_are_ignored() {
        let json = r#"{"add":"1.2.3.4","port":443,"bogus":{"nested":[1,2]}}"#;
        let d: ServerDescriptor = serde_json::from_str(json).unwrap();

        assert_eq!(d.address, "1.2.3.4");
        assert_eq!(d.port, 443);
        assert_eq!(d.class, 0);
        assert_eq!(d.remark, "");
        assert!(!d.verify_cert);
    }

    #[test]
    fn json_keys_map_to_fields() {
        let json = r#"{
            "host":"h.example","path":"/ws","tls":"tls","verify_cert":true,
            "add":"a.example","port":8443,"aid":64,"net":"ws","headerType":"none",
            "v":"2","type":"none","ps":"Tokyo","remark":"jp-1","id":"uuid-1","class":3
        }"#;
        let d: ServerDescriptor = serde_json::from_str(json).unwrap();

        assert_eq!(d.host, "h.example");
        assert_eq!(d.path, "/ws");
        assert_eq!(d.tls, "tls");
        assert!(d.verify_cert);
        assert_eq!(d.address, "a.example");
        assert_eq!(d.port, 8443);
        assert_eq!(d.alter_id, 64);
        assert_eq!(d.network, "ws");
        assert_eq!(d.header_type, "none");
        assert_eq!(d.version, "2");
        assert_eq!(d.kind, "none");
        assert_eq!(d.display_name, "Tokyo");
        assert_eq!(d.remark, "jp-1");
        assert_eq!(d.id, "uuid-1");
        assert_eq!(d.class, 3);
    }

    #[test]
    fn null_values_take_zero_values() {
        let json = r#"{"add":"1.2.3.4","port":443,"remark":null,"tls":null,"verify_cert":null,"aid":null,"class":1}"#;
        let d: ServerDescriptor = serde_json::from_str(json).unwrap();

        assert_eq!(d.address, "1.2.3.4");
        assert_eq!(d.port, 443);
        assert_eq!(d.remark, "");
        assert_eq!(d.tls, "");
        assert!(!d.verify_cert);
        assert_eq!(d.alter_id, 0);
        assert_eq!(d.class, 1);
    }

    #[test]
    fn from_json_matches_keys_ignoring_case() {
        let json = br#"{"Add":"1.2.3.4","PORT":443,"HeaderType":"http","Class":2}"#;
        let d = ServerDescriptor::from_json(json).unwrap();

        assert_eq!(d.address, "1.2.3.4");
        assert_eq!(d.port, 443);
        assert_eq!(d.header_type, "http");
        assert_eq!(d.class, 2);
    }

    #[test]
    fn from_json_prefers_exact_key() {
        let json = br#"{"ADD":"upper","add":"exact"}"#;
        let d = ServerDescriptor::from_json(json).unwrap();
        assert_eq!(d.address, "exact");
    }

    #[test]
    fn from_json_rejects_non_objects() {
        assert!(ServerDescriptor::from_json(b"[1,2,3]").is_err());
        assert!(ServerDescriptor::from_json(b"42").is_err());
        assert!(ServerDescriptor::from_json(b"not json").is_err());
    }

    #[test]
    fn serialized_keys_match_record_keys() {
        let value = serde_json::to_value(ServerDescriptor::default()).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        let mut expected: Vec<_> = RECORD_KEYS.iter().map(|k| k.to_string()).collect();
        keys.sort();
        expected.sort();
        assert_eq!(keys, expected);
    }

    #[test]
    fn wrong_value_type_is_an_error() {
        let json = r#"{"add":"1.2.3.4","port":"443"}"#;
        assert!(serde_json::from_str::<ServerDescriptor>(json).is_err());
    }

    #[test]
    fn socket_port_rejects_out_of_range() {
        let mut d = ServerDescriptor::default();

        for bad in [0, -1, 65536, i64::MAX] {
            d.port = bad;
            assert_eq!(d.socket_port(), None, "port {bad}");
        }

        d.port = 1;
        assert_eq!(d.socket_port(), Some(1));
        d.port = 65535;
        assert_eq!(d.socket_port(), Some(65535));
    }

    #[test]
    fn display_matches_verbose_report_format() {
        let d = ServerDescriptor {
            address: "10.0.0.1".into(),
            port: 443,
            display_name: "edge".into(),
            path: "/ray".into(),
            class: 2,
            ..Default::default()
        };

        assert_eq!(
            d.to_string(),
            "{Add:10.0.0.1 Port:443 Ps:edge Path:/ray Class:2}"
        );
        assert_eq!(d.target(), "10.0.0.1:443");
    }

    #[test]
    fn to_record_has_prefix() {
        let d = ServerDescriptor {
            address: "x".into(),
            ..Default::default()
        };
        let rec = d.to_record().unwrap();
        assert!(rec.starts_with(RECORD_PREFIX));
        assert!(rec.len() > RECORD_PREFIX.len());
    }
}
