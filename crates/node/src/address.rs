use bitcoin::{Address, Network, address::NetworkUnchecked};

/// Network codes this bridge accepts, with the chain each one maps to.
pub const NETCODES: [(&str, Network); 2] = [("BTC", Network::Bitcoin), ("XTN", Network::Testnet)];

/// The code of the first supported network the address decodes under.
pub fn netcode_of(address: &str) -> Option<&'static str> {
    let parsed: Address<NetworkUnchecked> = address.parse().ok()?;
    NETCODES
        .iter()
        .find(|(_, network)| parsed.is_valid_for_network(*network))
        .map(|(code, _)| *code)
}

/// Check that `address` is well formed on a supported network and, when
/// `network` is given, that it belongs to that network code.
///
/// Malformed input is reported as invalid rather than as an error.
pub fn validate_address(address: &str, network: Option<&str>) -> bool {
    match (netcode_of(address), network) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(code), Some(requested)) => code == requested,
    }
}
