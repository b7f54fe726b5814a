// Minimal Solidity ABI codec for the certification contract: call data for the handful of
// argument types the contract takes, and a word reader for its return values and logs.

use anyhow::{anyhow, Context};
use primitive_types::{H160, H256, U256};

use crate::crypto::hashing::selector;

const WORD: usize = 32;

/// A single ABI-encoded argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Uint(U256),
    Address(H160),
    Bool(bool),
    FixedBytes32(H256),
    String(String),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        matches!(self, Token::String(_))
    }
}

fn uint_word(value: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

fn static_word(token: &Token) -> [u8; WORD] {
    match token {
        Token::Uint(v) => uint_word(*v),
        Token::Address(a) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(a.as_bytes());
            word
        }
        Token::Bool(b) => uint_word(U256::from(*b as u8)),
        Token::FixedBytes32(h) => h.to_fixed_bytes(),
        Token::String(_) => unreachable!("dynamic tokens have no static word"),
    }
}

/// Encodes `tokens` as a flat argument tuple (heads, then tails of dynamic values).
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
            if let Token::String(s) = token {
                let bytes = s.as_bytes();
                tail.extend_from_slice(&uint_word(U256::from(bytes.len())));
                tail.extend_from_slice(bytes);
                let padding = (WORD - bytes.len() % WORD) % WORD;
                tail.extend(std::iter::repeat(0u8).take(padding));
            }
        } else {
            head.extend_from_slice(&static_word(token));
        }
    }

    head.extend(tail);
    head
}

/// Call data: 4-byte selector of `signature` followed by the encoded arguments.
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut data = selector(signature).to_vec();
    data.extend(encode(tokens));
    data
}

/// Reads ABI-encoded values word by word, relative to the start of a tuple.
///
/// Offsets of dynamic members are resolved against `base`, matching how Solidity encodes
/// nested tuples and arrays.
#[derive(Clone, Copy)]
pub struct AbiReader<'a> {
    data: &'a [u8],
    base: usize,
}

impl<'a> AbiReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, base: 0 }
    }

    fn word_at(&self, position: usize) -> anyhow::Result<&'a [u8]> {
        let end = position
            .checked_add(WORD)
            .ok_or_else(|| anyhow!("ABI offset overflow"))?;
        self.data
            .get(position..end)
            .ok_or_else(|| anyhow!("ABI data too short: need {} bytes, have {}", end, self.data.len()))
    }

    fn word(&self, index: usize) -> anyhow::Result<&'a [u8]> {
        self.word_at(self.base + index * WORD)
    }

    pub fn uint(&self, index: usize) -> anyhow::Result<U256> {
        Ok(U256::from_big_endian(self.word(index)?))
    }

    fn usize_at(&self, position: usize) -> anyhow::Result<usize> {
        let value = U256::from_big_endian(self.word_at(position)?);
        if value > U256::from(self.data.len()) {
            return Err(anyhow!("ABI offset/length {} out of bounds", value));
        }
        Ok(value.as_usize())
    }

    pub fn uint8(&self, index: usize) -> anyhow::Result<u8> {
        let value = self.uint(index)?;
        if value > U256::from(u8::MAX) {
            return Err(anyhow!("value {} does not fit in uint8", value));
        }
        Ok(value.low_u32() as u8)
    }

    /// `Some` for 0 and 1, `None` for any other word.
    pub fn bool_lenient(&self, index: usize) -> anyhow::Result<Option<bool>> {
        let value = self.uint(index)?;
        Ok(if value.is_zero() {
            Some(false)
        } else if value == U256::one() {
            Some(true)
        } else {
            None
        })
    }

    pub fn bool(&self, index: usize) -> anyhow::Result<bool> {
        self.bool_lenient(index)?
            .ok_or_else(|| anyhow!("malformed bool at word {}", index))
    }

    pub fn address(&self, index: usize) -> anyhow::Result<H160> {
        let word = self.word(index)?;
        if word[..12].iter().any(|b| *b != 0) {
            return Err(anyhow!("malformed address at word {}", index));
        }
        Ok(H160::from_slice(&word[12..]))
    }

    pub fn bytes32(&self, index: usize) -> anyhow::Result<H256> {
        Ok(H256::from_slice(self.word(index)?))
    }

    pub fn string(&self, index: usize) -> anyhow::Result<String> {
        let start = self.base + self.usize_at(self.base + index * WORD)?;
        let len = self.usize_at(start)?;
        let from = start + WORD;
        let bytes = self
            .data
            .get(from..from + len)
            .ok_or_else(|| anyhow!("ABI string of {} bytes runs past the data", len))?;
        String::from_utf8(bytes.to_vec()).context("ABI string is not valid UTF-8")
    }

    /// Reader positioned on the dynamic tuple whose offset is stored at `index`.
    pub fn tuple(&self, index: usize) -> anyhow::Result<AbiReader<'a>> {
        let offset = self.usize_at(self.base + index * WORD)?;
        Ok(AbiReader {
            data: self.data,
            base: self.base + offset,
        })
    }

    /// Dynamic array stored at `index`: its length and a reader over its elements.
    pub fn array(&self, index: usize) -> anyhow::Result<(usize, AbiReader<'a>)> {
        let start = self.base + self.usize_at(self.base + index * WORD)?;
        let len = self.usize_at(start)?;
        Ok((
            len,
            AbiReader {
                data: self.data,
                base: start + WORD,
            },
        ))
    }

    pub fn uint_array(&self, index: usize) -> anyhow::Result<Vec<U256>> {
        let (len, items) = self.array(index)?;
        (0..len).map(|i| items.uint(i)).collect()
    }

    /// Decodes an array of dynamic tuples with `decode` applied to each element.
    pub fn tuple_array<T>(
        &self,
        index: usize,
        decode: impl Fn(AbiReader<'a>) -> anyhow::Result<T>,
    ) -> anyhow::Result<Vec<T>> {
        let (len, items) = self.array(index)?;
        (0..len).map(|i| decode(items.tuple(i)?)).collect()
    }
}
