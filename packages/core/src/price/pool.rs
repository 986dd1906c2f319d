//! Uniswap V3 pool access: event and call encodings plus the
//! `sqrtPriceX96` to fiat conversion.

use std::str::FromStr;

use alloy_primitives::{address, b256, Address, Bytes, B256, U256};

use crate::error::AppError;

/// `keccak256("Swap(address,address,int256,int256,uint160,uint128,int24)")`
pub const SWAP_EVENT_TOPIC: B256 =
    b256!("c42079f94a6350d7e6235f29174924f928cc2ac818eb64fed8004e115fbcca67");

/// `slot0()`
pub const SLOT0_SELECTOR: [u8; 4] = [0x38, 0x50, 0xc7, 0xbd];

/// Mainnet USDC/WETH 0.05% pool.
pub const MAINNET_USDC_WETH_POOL: Address = address!("88e6A0c2dDD26FEEb64F039a2c41296FcB3f5640");

const WORD: usize = 32;
/// `sqrtPriceX96` is the third non-indexed word of a Swap log.
const SWAP_SQRT_PRICE_WORD: usize = 2;
const SWAP_DATA_WORDS: usize = 5;

/// Which side of the pool holds the stablecoin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolOrientation {
    /// token0 = stablecoin, token1 = WETH. The raw ratio is ETH per
    /// stablecoin and has to be inverted.
    StablecoinIsToken0,
    /// token0 = WETH, token1 = stablecoin. The raw ratio is already fiat per ETH.
    StablecoinIsToken1,
}

/// Parses `token0` / `token1`: the stablecoin's position in the pool.
impl FromStr for PoolOrientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "token0" | "0" => Ok(PoolOrientation::StablecoinIsToken0),
            "token1" | "1" => Ok(PoolOrientation::StablecoinIsToken1),
            other => Err(format!("expected token0 or token1, got {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub address: Address,
    pub orientation: PoolOrientation,
    /// `|decimals(WETH) - decimals(stablecoin)|`
    pub decimals_delta: i32,
}

impl PoolConfig {
    pub fn mainnet_usdc_weth() -> Self {
        Self {
            address: MAINNET_USDC_WETH_POOL,
            orientation: PoolOrientation::StablecoinIsToken0,
            decimals_delta: 12,
        }
    }

    /// `price = (sqrtPriceX96 / 2^96)^2`, scaled by the decimal delta and
    /// inverted when the stablecoin is token0. Returns 0 for a zero ratio.
    pub fn fiat_per_eth(&self, sqrt_price_x96: U256) -> f64 {
        let ratio = f64::from(sqrt_price_x96) / 2f64.powi(96);
        let raw = ratio * ratio;
        let scale = 10f64.powi(self.decimals_delta);

        match self.orientation {
            PoolOrientation::StablecoinIsToken0 if raw > 0.0 => scale / raw,
            PoolOrientation::StablecoinIsToken0 => 0.0,
            PoolOrientation::StablecoinIsToken1 => raw * scale,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::mainnet_usdc_weth()
    }
}

/// Reads a `uint160` from an ABI word, rejecting dirty high bytes.
fn uint160_word(data: &[u8], index: usize) -> Result<U256, AppError> {
    let start = index * WORD;
    let word = data
        .get(start..start + WORD)
        .ok_or_else(|| AppError::Parse(format!("ABI data too short for word {index}")))?;

    if word[..12].iter().any(|byte| *byte != 0) {
        return Err(AppError::Parse("sqrtPriceX96 exceeds 160 bits".into()));
    }
    Ok(U256::from_be_slice(word))
}

pub fn decode_swap_sqrt_price(data: &[u8]) -> Result<U256, AppError> {
    if data.len() < SWAP_DATA_WORDS * WORD {
        return Err(AppError::Parse(format!(
            "Swap log data is {} bytes, expected {}",
            data.len(),
            SWAP_DATA_WORDS * WORD
        )));
    }
    uint160_word(data, SWAP_SQRT_PRICE_WORD)
}

pub fn slot0_calldata() -> Bytes {
    Bytes::copy_from_slice(&SLOT0_SELECTOR)
}

pub fn decode_slot0_sqrt_price(output: &[u8]) -> Result<U256, AppError> {
    uint160_word(output, 0)
}
