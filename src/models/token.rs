use alloy::primitives::Address;

/// ERC-20 metadata needed for display pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInfo {
    pub address: Address,
    pub decimals: u8,
}

impl TokenInfo {
    pub fn new(address: Address, decimals: u8) -> Self {
        Self { address, decimals }
    }
}
