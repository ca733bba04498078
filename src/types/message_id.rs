//! Platform-tagged message identifiers

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::serialization::{split_discriminant, Source, Tagged};
use crate::types::Adapter;

/// A platform's own message id shape
///
/// Implementors are plain serde structs; the platform tag is carried by the
/// associated constant, not by the payload.
pub trait PlatformMessageId: Serialize + DeserializeOwned {
    const ADAPTER: Adapter;
}

/// Identifier of a sent or received message, tagged with the platform that
/// minted it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageId {
    pub adapter_name: Adapter,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl MessageId {
    pub fn new(adapter: Adapter, data: Map<String, Value>) -> Self {
        MessageId {
            adapter_name: adapter,
            data,
        }
    }

    /// Wrap a platform's typed id
    pub fn from_typed<T: PlatformMessageId>(id: &T) -> Result<Self> {
        match serde_json::to_value(id)? {
            Value::Object(mut data) => {
                data.remove(Self::INDEX_KEY);
                Ok(MessageId::new(T::ADAPTER, data))
            }
            other => Err(Error::invalid_argument(format!(
                "message id must encode to a JSON object, got {other}"
            ))),
        }
    }

    /// Fail unless this id was minted by `adapter`
    ///
    /// Payload shapes coincide across platforms (many are a single
    /// `message_id` field), so only the tag is trusted.
    pub fn expect(&self, adapter: Adapter) -> Result<&Self> {
        if self.adapter_name != adapter {
            return Err(Error::UnexpectedMessageIdType {
                expected: adapter,
                found: self.adapter_name,
            });
        }
        Ok(self)
    }

    /// Recover the typed id, checking the platform tag first
    pub fn to_typed<T: PlatformMessageId>(&self) -> Result<T> {
        self.expect(T::ADAPTER)?;
        Ok(serde_json::from_value(Value::Object(self.data.clone()))?)
    }

    /// Convenience accessor for string-ish fields
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.data.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn decode(source: impl Into<Source>) -> Result<Self> {
        let (key, map) = split_discriminant(source, Self::INDEX_KEY)?;
        if serde_json::from_value::<Adapter>(Value::String(key.clone())).is_err() {
            return Err(Error::UnknownDiscriminant {
                index_key: Self::INDEX_KEY,
                value: key,
            });
        }
        Ok(serde_json::from_value(Value::Object(map))?)
    }
}

impl Tagged for MessageId {
    const INDEX_KEY: &'static str = "adapter_name";

    fn discriminant(&self) -> &'static str {
        self.adapter_name.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct OB11MessageId {
        message_id: i64,
    }

    impl PlatformMessageId for OB11MessageId {
        const ADAPTER: Adapter = Adapter::OneBotV11;
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct OB12MessageId {
        message_id: i64,
    }

    impl PlatformMessageId for OB12MessageId {
        const ADAPTER: Adapter = Adapter::OneBotV12;
    }

    #[test]
    fn test_typed_roundtrip() {
        let id = MessageId::from_typed(&OB11MessageId { message_id: 1919810 }).unwrap();
        assert_eq!(id.adapter_name, Adapter::OneBotV11);
        assert_eq!(
            id.to_typed::<OB11MessageId>().unwrap(),
            OB11MessageId { message_id: 1919810 }
        );
    }

    #[test]
    fn test_same_shape_other_platform_rejected() {
        let id = MessageId::from_typed(&OB11MessageId { message_id: 1 }).unwrap();
        let err = id.to_typed::<OB12MessageId>().unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedMessageIdType {
                expected: Adapter::OneBotV12,
                found: Adapter::OneBotV11
            }
        ));
    }

    #[test]
    fn test_encode_decode() {
        let id = MessageId::from_typed(&OB11MessageId { message_id: 42 }).unwrap();
        let value = id.to_value().unwrap();
        assert_eq!(value, json!({"adapter_name": "OneBot V11", "message_id": 42}));
        let decoded = MessageId::decode(value).unwrap();
        assert_eq!(decoded, id);
        assert_eq!(decoded.get_str("message_id").as_deref(), Some("42"));
    }

    #[test]
    fn test_decode_unknown_adapter() {
        let err = MessageId::decode(json!({"adapter_name": "Fax"})).unwrap_err();
        assert!(matches!(err, Error::UnknownDiscriminant { .. }));
    }
}
