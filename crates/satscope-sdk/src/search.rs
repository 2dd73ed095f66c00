use std::fmt;

use satscope_core::is_hex_id;
use satscope_core::models::{AddressInfo, Block, Transaction};
use serde::Serialize;

use crate::errors::{ApiError, Result};

// Shortest legacy address to longest bech32m address, with some slack.
const MIN_ADDRESS_LEN: usize = 14;
const MAX_ADDRESS_LEN: usize = 100;

/// Free-text search input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// 64 hex characters: a txid or a block hash. Lowercased.
    HexId(String),
    Height(u64),
    Address(String),
}

impl SearchQuery {
    pub fn parse(input: &str) -> Result<Self> {
        let query = input.trim();
        if query.is_empty() {
            return Err(ApiError::InvalidQuery("empty query".to_string()));
        }
        if is_hex_id(query) {
            return Ok(SearchQuery::HexId(query.to_ascii_lowercase()));
        }
        if query.bytes().all(|b| b.is_ascii_digit()) {
            return query
                .parse()
                .map(SearchQuery::Height)
                .map_err(|_| ApiError::InvalidQuery(format!("block height out of range: {query}")));
        }
        validate_address(query)?;
        Ok(SearchQuery::Address(query.to_string()))
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchQuery::HexId(id) => write!(f, "id {id}"),
            SearchQuery::Height(h) => write!(f, "height {h}"),
            SearchQuery::Address(a) => write!(f, "address {a}"),
        }
    }
}

pub(crate) fn validate_address(address: &str) -> Result<()> {
    let len_ok = (MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&address.len());
    if !len_ok || !address.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(ApiError::InvalidQuery(format!("not an address: {address}")));
    }
    Ok(())
}

pub(crate) fn validate_hex_id(id: &str) -> Result<String> {
    let id = id.trim();
    if !is_hex_id(id) {
        return Err(ApiError::InvalidQuery(format!(
            "expected 64 hex characters, got {id:?}"
        )));
    }
    Ok(id.to_ascii_lowercase())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum SearchResult {
    Transaction(Box<Transaction>),
    Block(Box<Block>),
    Address(Box<AddressInfo>),
}
