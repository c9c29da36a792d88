//! Request body compression and obfuscation.

use beacon_core::errors::{BeaconResult, CodecError};
use beacon_core::registry::Handler;
use beacon_core::requests::{BodyEncodeRequest, WireRequest};

pub const HEADER_COMPRESS_CODEC: &str = "X-Compress-Codec";
pub const HEADER_CRYPT_CODEC: &str = "X-Crypt-Codec";
pub const COMPRESS_CODEC_ZSTD: &str = "zstd";
pub const CRYPT_CODEC_XOR: &str = "xor-stm";

const ZSTD_LEVEL: i32 = 3;

/// Compresses the body with zstd, then XORs every byte with the low byte
/// of the request's send time. The collector reverses both using the
/// `stm` query parameter.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyEncoder;

impl BodyEncoder {
    pub fn new() -> Self {
        Self
    }

    pub fn encode(&self, mut request: WireRequest) -> Result<WireRequest, CodecError> {
        let compressed = zstd::bulk::compress(&request.body, ZSTD_LEVEL)
            .map_err(|e| CodecError::BodyEncodingFailed(e.to_string()))?;
        request.body = xor_with_time(compressed, request.send_time);
        request.set_header(HEADER_COMPRESS_CODEC, COMPRESS_CODEC_ZSTD);
        request.set_header(HEADER_CRYPT_CODEC, CRYPT_CODEC_XOR);
        Ok(request)
    }
}

/// Reverse [`BodyEncoder::encode`] for a body sent at `send_time`.
pub fn decode_body(body: &[u8], send_time: i64) -> Result<Vec<u8>, CodecError> {
    let plain = xor_with_time(body.to_vec(), send_time);
    zstd::stream::decode_all(plain.as_slice())
        .map_err(|e| CodecError::BodyEncodingFailed(e.to_string()))
}

fn xor_with_time(mut bytes: Vec<u8>, send_time: i64) -> Vec<u8> {
    let key = (send_time & 0xFF) as u8;
    for b in &mut bytes {
        *b ^= key;
    }
    bytes
}

impl Handler<BodyEncodeRequest, WireRequest> for BodyEncoder {
    fn handle(&self, request: BodyEncodeRequest) -> BeaconResult<WireRequest> {
        Ok(self.encode(request.0)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(body: &[u8], send_time: i64) -> WireRequest {
        WireRequest {
            url: "http://collector/v3/projects/p/collect".into(),
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: body.to_vec(),
            send_time,
        }
    }

    #[test]
    fn encode_then_decode_restores_body() {
        let body = br#"[{"eventType":"CUSTOM"},{"eventType":"PAGE"}]"#.repeat(20);
        let encoded = BodyEncoder::new().encode(request(&body, 1_700_000_000_123)).unwrap();

        assert_ne!(encoded.body, body);
        assert_eq!(encoded.header(HEADER_COMPRESS_CODEC), Some(COMPRESS_CODEC_ZSTD));
        assert_eq!(encoded.header(HEADER_CRYPT_CODEC), Some(CRYPT_CODEC_XOR));
        assert_eq!(encoded.header("content-type"), Some("application/json"));
        assert_eq!(decode_body(&encoded.body, encoded.send_time).unwrap(), body);
    }

    #[test]
    fn xor_key_is_low_byte_of_send_time() {
        assert_eq!(xor_with_time(vec![0x00, 0xFF], 0x1_02AB), vec![0xAB, 0x54]);
    }
}
