use crate::common::http::HttpClient;
use crate::common::types::HeaderMap;
use crate::error::Result;

use super::crypto::{decrypt_segment, derive_iv};
use super::keycache::KeyCache;
use super::types::{Encryption, Segment};

/// Downloads `segment` and decrypts it if it carries an AES-128 context.
/// Returns the plaintext payload ready for the output writer.
pub async fn fetch_segment(
    client: &HttpClient,
    keycache: &KeyCache,
    segment: &Segment,
    headers: &HeaderMap,
) -> Result<Vec<u8>> {
    let byte_range = segment.byte_range.map(|r| (r.length, r.offset));
    let body = client.get_bytes(&segment.uri, headers, byte_range).await?;

    match &segment.encryption {
        Encryption::None => Ok(body),
        Encryption::Aes128 { key_uri, iv } => {
            let key = keycache.get(key_uri, headers).await?;
            let iv = iv.unwrap_or_else(|| derive_iv(segment.absolute_index));
            decrypt_segment(&body, &key, &iv, segment.index)
        }
    }
}
