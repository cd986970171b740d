//! Chain lookups keyed by the CAIP-10 `eip155` chain id.

use contract_tag_eval::ContractAddress;

/// Returns the numeric chain id of an `eip155:<id>:<address>` string.
pub fn chain_id(address: &str) -> Option<u64> {
    let parsed = ContractAddress::parse(address).ok()?;
    let id = parsed.chain_id();
    if parsed.namespace() != "eip155" || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    id.parse().ok()
}

pub fn chain_name(address: &str) -> &'static str {
    match chain_id(address) {
        Some(1) => "Ethereum",
        Some(10) => "Optimism",
        Some(56) => "BNB Smart Chain",
        Some(137) => "Polygon",
        Some(42161) => "Arbitrum",
        Some(43114) => "Avalanche",
        _ => "Unknown",
    }
}

/// Search-domain exclusions for the chain's own block explorer, so the model
/// cannot simply read the existing label off the explorer page.
pub fn explorer_blocklist(address: &str) -> Vec<String> {
    let domain = match chain_id(address) {
        Some(1) => "-etherscan.io",
        Some(10) => "-optimistic.etherscan.io",
        Some(56) => "-bscscan.com",
        Some(100) => "-gnosisscan.io",
        Some(137) => "-polygonscan.com",
        Some(8453) => "-basescan.org",
        Some(42161) => "-arbiscan.io",
        Some(43114) => "-snowscan.xyz",
        Some(250) => "-ftmscan.com",
        Some(324) => "-era.zksync.network",
        Some(1285) => "-moonriver.moonscan.io",
        _ => return Vec::new(),
    };
    vec![domain.to_string()]
}
