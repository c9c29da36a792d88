//! Registry wiring for the codecs.

use std::sync::Arc;

use beacon_core::config::CodecKind;
use beacon_core::errors::BeaconResult;
use beacon_core::event::EventRecord;
use beacon_core::registry::{Handler, Module, Registry};
use beacon_core::requests::{
    BodyEncodeRequest, DecodeRequest, EncodeRequest, EncodedPayload, WireRequest,
};

use crate::{BodyEncoder, Codec, JsonCodec, ProtobufCodec};

/// Exposes a [`Codec`] through the registry's encode/decode pairs.
pub struct CodecPlugin<C> {
    codec: C,
}

impl<C: Codec> CodecPlugin<C> {
    pub fn new(codec: C) -> Self {
        Self { codec }
    }
}

impl<C: Codec> Handler<EncodeRequest, EncodedPayload> for CodecPlugin<C> {
    fn handle(&self, request: EncodeRequest) -> BeaconResult<EncodedPayload> {
        let (bytes, records) = match request {
            EncodeRequest::One(record) => (self.codec.encode_one(&record)?, 1),
            EncodeRequest::Batch(rows) => {
                let batch = self.codec.encode_batch(&rows)?;
                (batch.bytes, batch.records)
            }
        };
        Ok(EncodedPayload {
            bytes,
            media_type: self.codec.media_type().to_string(),
            records,
        })
    }
}

impl<C: Codec> Handler<DecodeRequest, EventRecord> for CodecPlugin<C> {
    fn handle(&self, request: DecodeRequest) -> BeaconResult<EventRecord> {
        Ok(self.codec.decode_one(&request.0)?)
    }
}

/// Registers the configured codec and, optionally, the body encoder.
pub struct CodecModule {
    kind: CodecKind,
    encrypt_body: bool,
}

impl CodecModule {
    pub fn new(kind: CodecKind, encrypt_body: bool) -> Self {
        Self { kind, encrypt_body }
    }

    fn install<C: Codec + 'static>(registry: &mut Registry, codec: C) {
        let plugin = Arc::new(CodecPlugin::new(codec));
        registry.register_handler::<EncodeRequest, EncodedPayload>(plugin.clone());
        registry.register_handler::<DecodeRequest, EventRecord>(plugin);
    }
}

impl Module for CodecModule {
    fn name(&self) -> &'static str {
        "codec"
    }

    fn register_components(&self, registry: &mut Registry) {
        match self.kind {
            CodecKind::Json => Self::install(registry, JsonCodec::new()),
            CodecKind::Protobuf => Self::install(registry, ProtobufCodec::new()),
        }
        if self.encrypt_body {
            registry.register_handler::<BodyEncodeRequest, WireRequest>(Arc::new(BodyEncoder::new()));
        }
    }
}
