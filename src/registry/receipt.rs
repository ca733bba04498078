//! Send receipts and their decoder table

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::platforms::ClientHandle;
use crate::serialization::{split_discriminant, Source};
use crate::types::{Adapter, MessageId};

/// Discriminant field of encoded receipts
pub const RECEIPT_INDEX_KEY: &str = "adapter_name";

/// Record of a successful send
///
/// Platforms implement this for their own receipt payloads. Receipts are
/// immutable; follow-up operations reach the platform through the client
/// that sent the message, looked up again from the [`Context`].
#[async_trait]
pub trait Receipt: fmt::Debug + Send + Sync + 'static {
    /// Platform that produced this receipt
    fn adapter(&self) -> Adapter;

    /// Account id of the client that sent the message
    fn client_id(&self) -> &str;

    /// Platform message id of the sent message, as minted by the platform
    fn raw_message_id(&self) -> Result<MessageId>;

    /// Flat encoding including the `adapter_name` discriminant
    fn to_value(&self) -> Result<Value>;

    fn as_any(&self) -> &dyn Any;

    /// Delete the sent message
    async fn revoke(&self, _ctx: &Context) -> Result<()> {
        Err(Error::unsupported(format!(
            "revoke is not supported by adapter \"{}\"",
            self.adapter()
        )))
    }

    /// Message id of the sent message, checked against this receipt's platform
    fn extract_message_id(&self) -> Result<MessageId> {
        let id = self.raw_message_id()?;
        id.expect(self.adapter())?;
        Ok(id)
    }

    /// The live client that sent the message
    async fn client(&self, ctx: &Context) -> Result<ClientHandle> {
        ctx.client(self.adapter(), self.client_id())
            .await
            .ok_or_else(|| {
                Error::invalid_state(format!(
                    "client {}:{} is not connected",
                    self.adapter(),
                    self.client_id()
                ))
            })
    }

    fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_value()?)?)
    }
}

/// Encode a receipt payload with its discriminant
pub fn tagged_value<T: Serialize + ?Sized>(adapter: Adapter, payload: &T) -> Result<Value> {
    match serde_json::to_value(payload)? {
        Value::Object(mut map) => {
            map.insert(RECEIPT_INDEX_KEY.to_string(), serde_json::to_value(adapter)?);
            Ok(Value::Object(map))
        }
        other => Err(Error::invalid_argument(format!(
            "receipt must encode to a JSON object, got {other}"
        ))),
    }
}

type Decoder = Arc<dyn Fn(Map<String, Value>) -> Result<Box<dyn Receipt>> + Send + Sync>;

/// Platform → receipt decoder
#[derive(Default)]
pub struct ReceiptRegistry {
    decoders: HashMap<Adapter, Decoder>,
}

impl ReceiptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `R` as the receipt type of `adapter`
    pub fn register<R>(&mut self, adapter: Adapter)
    where
        R: Receipt + DeserializeOwned,
    {
        debug!(%adapter, receipt = std::any::type_name::<R>(), "register receipt decoder");
        self.decoders.insert(
            adapter,
            Arc::new(|map: Map<String, Value>| -> Result<Box<dyn Receipt>> {
                let receipt: R = serde_json::from_value(Value::Object(map))?;
                Ok(Box::new(receipt) as Box<dyn Receipt>)
            }),
        );
    }

    /// Decode any registered receipt from its flat encoding
    pub fn decode(&self, source: impl Into<Source>) -> Result<Box<dyn Receipt>> {
        let (key, map) = split_discriminant(source, RECEIPT_INDEX_KEY)?;
        let unknown = || Error::UnknownDiscriminant {
            index_key: RECEIPT_INDEX_KEY,
            value: key.clone(),
        };
        let adapter: Adapter =
            serde_json::from_value(Value::String(key.clone())).map_err(|_| unknown())?;
        let decoder = self.decoders.get(&adapter).ok_or_else(unknown)?;
        decoder(map)
    }

    pub fn clear(&mut self) {
        self.decoders.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mock_context, MockReceipt};
    use serde_json::json;

    fn receipt() -> MockReceipt {
        MockReceipt {
            adapter: Adapter::OneBotV11,
            client_id: "10000".into(),
            message_id: 42,
        }
    }

    #[test]
    fn test_encode_is_flat_and_roundtrips() {
        let ctx = mock_context();
        let original = receipt();
        let value = original.to_value().unwrap();
        assert_eq!(value["adapter_name"], json!("OneBot V11"));
        assert_eq!(value["message_id"], json!(42));

        let decoded = ctx.registries().receipts.decode(value.clone()).unwrap();
        assert_eq!(decoded.to_value().unwrap(), value);
        let decoded = decoded.as_any().downcast_ref::<MockReceipt>().unwrap();
        assert_eq!(decoded, &original);

        let from_string = ctx
            .registries()
            .receipts
            .decode(original.encode().unwrap())
            .unwrap();
        assert_eq!(from_string.client_id(), "10000");
    }

    #[test]
    fn test_decode_unknown_platform() {
        let ctx = mock_context();
        let err = ctx
            .registries()
            .receipts
            .decode(json!({"adapter_name": "Discord", "message_id": 1}))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownDiscriminant { .. }));
    }

    #[test]
    fn test_extract_message_id_checks_tag() {
        let id = receipt().extract_message_id().unwrap();
        assert_eq!(id.adapter_name, Adapter::OneBotV11);

        let mismatched = MockReceipt {
            adapter: Adapter::OneBotV12,
            ..receipt()
        };
        // the mock mints OneBot V11 ids whatever its own platform is
        let err = mismatched.extract_message_id().unwrap_err();
        assert!(matches!(err, Error::UnexpectedMessageIdType { .. }));
    }

    #[tokio::test]
    async fn test_revoke_defaults_to_unsupported() {
        let ctx = mock_context();
        let err = receipt().revoke(&ctx).await.unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }
}
