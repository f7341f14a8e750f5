use byteorder::{BigEndian, ByteOrder};
use cbc::cipher::{BlockDecryptMut, KeyIvInit, block_padding::Pkcs7};

use crate::error::{Error, Result};

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Derives the implicit IV for a segment that has none: the 16-byte
/// big-endian encoding of its absolute index, left-padded with zeros.
pub fn derive_iv(absolute_index: u64) -> [u8; 16] {
    let mut iv = [0u8; 16];
    BigEndian::write_u64(&mut iv[8..], absolute_index);
    iv
}

/// Decrypts one AES-128-CBC segment with `key`/`iv`, stripping PKCS#7
/// padding. Padding is stripped from *every* segment uniformly: each
/// segment is an independent CBC message, so this is safe and deterministic
/// regardless of whether the upstream encoder pads every segment the same
/// way.
pub fn decrypt_segment(ciphertext: &[u8], key: &[u8; 16], iv: &[u8; 16], index: usize) -> Result<Vec<u8>> {
    let cipher = Aes128CbcDec::new(key.into(), iv.into());
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|e| Error::Decrypt { index, message: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbc::cipher::{BlockEncryptMut, KeyIvInit};

    type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

    fn encrypt(plaintext: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> Vec<u8> {
        Aes128CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    #[test]
    fn derives_iv_from_absolute_index() {
        let iv = derive_iv(42);
        let mut expected = [0u8; 16];
        expected[15] = 42;
        assert_eq!(iv, expected);
    }

    #[test]
    fn round_trips_through_encrypt_decrypt() {
        let key = *b"0123456789abcdef";
        let iv = derive_iv(7);
        let plaintext = b"some mpeg-ts segment payload, not block aligned!".to_vec();
        let ciphertext = encrypt(&plaintext, &key, &iv);
        let decrypted = decrypt_segment(&ciphertext, &key, &iv, 7).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn concatenated_segments_decrypt_to_concatenated_plaintexts() {
        let key = *b"0123456789abcdef";
        let plaintexts: Vec<&[u8]> = vec![b"segment-zero-bytes", b"segment-one-bytes!!"];
        let mut concatenated_plaintext = Vec::new();
        let mut decrypted_concat = Vec::new();

        for (index, pt) in plaintexts.iter().enumerate() {
            let iv = derive_iv(index as u64);
            let ciphertext = encrypt(pt, &key, &iv);
            let decrypted = decrypt_segment(&ciphertext, &key, &iv, index).unwrap();
            decrypted_concat.extend_from_slice(&decrypted);
            concatenated_plaintext.extend_from_slice(pt);
        }

        assert_eq!(decrypted_concat, concatenated_plaintext);
    }

    #[test]
    fn invalid_ciphertext_length_errors() {
        let key = [0u8; 16];
        let iv = [0u8; 16];
        let err = decrypt_segment(b"not a multiple of 16", &key, &iv, 0).unwrap_err();
        assert!(matches!(err, Error::Decrypt { .. }));
    }
}
