use solana_sdk::pubkey::Pubkey;

use crate::indexer::error::IndexerError;

pub trait Base58Conversions {
    fn to_base58(&self) -> String;
    fn from_base58(s: &str) -> Result<Self, IndexerError>
    where
        Self: Sized;
}

impl Base58Conversions for [u8; 32] {
    fn to_base58(&self) -> String {
        bs58::encode(self).into_string()
    }

    fn from_base58(s: &str) -> Result<Self, IndexerError> {
        decode_base58_to_fixed_array(s)
    }
}

pub fn decode_base58_to_fixed_array<const N: usize>(input: &str) -> Result<[u8; N], IndexerError> {
    let mut buffer = [0u8; N];
    let decoded_len = bs58::decode(input)
        .onto(&mut buffer)
        .map_err(|e| IndexerError::base58_decode(input, e))?;

    if decoded_len != N {
        return Err(IndexerError::base58_decode(
            input,
            format!("expected {} bytes, got {}", N, decoded_len),
        ));
    }

    Ok(buffer)
}

/// Decodes a 32 byte hash, naming `field` in the error.
pub fn decode_hash(field: &str, value: &str) -> Result<[u8; 32], IndexerError> {
    decode_base58_to_fixed_array(value).map_err(|e| match e {
        IndexerError::Base58Decode { message, .. } => IndexerError::base58_decode(field, message),
        other => other,
    })
}

pub fn decode_pubkey(field: &str, value: &str) -> Result<Pubkey, IndexerError> {
    decode_hash(field, value).map(Pubkey::new_from_array)
}

pub fn decode_base58_option_to_pubkey(
    field: &str,
    value: &Option<String>,
) -> Result<Option<Pubkey>, IndexerError> {
    value
        .as_deref()
        .map(|v| decode_pubkey(field, v))
        .transpose()
}
