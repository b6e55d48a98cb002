//! Well-known token contracts per chain.

use normalize::{normalize_address, ChainFamily};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPreset {
    pub id: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
    pub address: &'static str,
}

const fn preset(
    id: &'static str,
    symbol: &'static str,
    name: &'static str,
    address: &'static str,
) -> TokenPreset {
    TokenPreset {
        id,
        symbol,
        name,
        address,
    }
}

const ETH: &[TokenPreset] = &[
    preset("usdt", "USDT", "Tether USD", "0xdAC17F958D2ee523a2206206994597C13D831ec7"),
    preset("usdc", "USDC", "USD Coin", "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
];

const BSC: &[TokenPreset] = &[
    preset("usdt", "USDT", "Tether USD", "0x55d398326f99059fF775485246999027B3197955"),
    preset("usdc", "USDC", "USD Coin", "0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d"),
];

const POLYGON: &[TokenPreset] = &[
    preset("usdt", "USDT", "Tether USD", "0xc2132D05D31c914a87C6611C10748AEb04B58e8F"),
    preset("usdc", "USDC", "USDC (Native)", "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359"),
    preset("usdc.e", "USDC.e", "USDC.e (Bridged)", "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174"),
];

const ARBITRUM: &[TokenPreset] = &[
    preset("usdt", "USDT", "Tether USD", "0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9"),
    preset("usdc", "USDC", "USDC (Native)", "0xaf88d065e77c8cC2239327C5EDb3A432268e5831"),
    preset("usdc.e", "USDC.e", "USDC.e (Bridged)", "0xFF970A61A04b1cA14834A43f5dE4533eBDDB5CC8"),
];

const OPTIMISM: &[TokenPreset] = &[
    preset("usdt", "USDT", "Tether USD", "0x94b008aA00579c1307B0EF2c499aD98a8ce58e58"),
    preset("usdc", "USDC", "USDC (Native)", "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85"),
    preset("usdc.e", "USDC.e", "USDC.e (Bridged)", "0x7F5c764cBc14f9669B88837ca1490cCa17c31607"),
];

const BASE: &[TokenPreset] = &[
    preset("usdc", "USDC", "USDC (Native)", "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
    preset("usdbc", "USDbC", "USDbC (Bridged USDC)", "0xd9aAEc86B65D86f6A7B5B1b0c42FFA531710b6CA"),
    preset("usdt", "USDT", "USDT (Bridged)", "0xfde4C96c8593536E31F229EA8f37b2ADa2699bb2"),
];

const AVAX: &[TokenPreset] = &[
    preset("usdc", "USDC", "USD Coin", "0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E"),
    preset("usdt", "USDT", "Tether USD", "0x9702230A8Ea53601f5cD2dc00fDBc13d4dF4A8c7"),
];

const TRON: &[TokenPreset] = &[
    preset("usdt", "USDT", "USDT (TRC20)", "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t"),
    preset("usdc", "USDC", "USDC (TRC20)", "TEkxiTehnzSmSe2XqrBj4w32RUN966rdz8"),
    preset("usdc-tron-peg", "USDC", "USDC (Tron-Peg)", "TLZSucJRjnqBKwvQz6n5hd29gbS4P7u7w8"),
];

/// Presets for a chain key; empty for unknown chains.
pub fn presets_for(chain_key: &str) -> &'static [TokenPreset] {
    match chain_key {
        "ETH" => ETH,
        "BSC" => BSC,
        "POLYGON" => POLYGON,
        "ARBITRUM" => ARBITRUM,
        "OPTIMISM" => OPTIMISM,
        "BASE" => BASE,
        "AVAX" => AVAX,
        "TRON" => TRON,
        _ => &[],
    }
}

/// Find the preset whose contract matches `token` on the given chain.
pub fn find_preset(
    chain_key: &str,
    family: ChainFamily,
    token: &str,
) -> Option<&'static TokenPreset> {
    let token = normalize_address(family, token);
    presets_for(chain_key).iter().find(|p| match family {
        ChainFamily::Evm => p.address.eq_ignore_ascii_case(&token),
        ChainFamily::AddressModel => normalize_address(family, p.address) == token,
    })
}
