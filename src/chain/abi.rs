//! Minimal ABI plumbing for the three contract entry points we touch.
//!
//! Selectors are computed at startup from the canonical signatures rather
//! than hardcoded, so a signature typo fails tests instead of silently
//! calling the wrong function.

use alloy::primitives::{Address, B256, U256};

/// `getFreeMarketInfo(uint256)` → `(uint256,uint256,uint256,uint256,uint256,bool)`
pub const SIG_GET_FREE_MARKET_INFO: &str = "getFreeMarketInfo(uint256)";

/// `hasUserClaimedFreeTokens(uint256,address)` → `(bool,uint256)`
pub const SIG_HAS_USER_CLAIMED: &str = "hasUserClaimedFreeTokens(uint256,address)";

/// `claimFreeTokens(uint256)`
pub const SIG_CLAIM_FREE_TOKENS: &str = "claimFreeTokens(uint256)";

/// Compute keccak256 of a byte slice.
pub fn keccak256(data: &[u8]) -> B256 {
    use tiny_keccak::{Hasher, Keccak};
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    B256::from(output)
}

/// 4-byte function selector for a canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// One 32-byte ABI word.
pub type Word = [u8; 32];

pub fn word_from_uint(value: U256) -> Word {
    value.to_be_bytes::<32>()
}

pub fn word_from_address(addr: Address) -> Word {
    addr.into_word().0
}

/// Build calldata: selector followed by 32-byte words.
pub fn encode_call(signature: &str, args: &[Word]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32 * args.len());
    data.extend_from_slice(&selector(signature));
    for word in args {
        data.extend_from_slice(word);
    }
    data
}

/// Split a return blob into 32-byte words; `None` if the length is off.
pub fn decode_words(data: &[u8], expected: usize) -> Option<Vec<Word>> {
    if data.len() != expected * 32 {
        return None;
    }
    Some(
        data.chunks_exact(32)
            .map(|chunk| {
                let mut word = [0u8; 32];
                word.copy_from_slice(chunk);
                word
            })
            .collect(),
    )
}

pub fn uint_from_word(word: &Word) -> U256 {
    U256::from_be_bytes(*word)
}

pub fn bool_from_word(word: &Word) -> bool {
    word.iter().any(|b| *b != 0)
}
