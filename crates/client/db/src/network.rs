use starknet_types_core::felt::Felt;
use std::{fmt, str::FromStr};

/// The network a database belongs to. Migrations that recompute hashes need its chain id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Sepolia,
    SepoliaIntegration,
    Custom { name: String, chain_id: Felt },
}

impl Network {
    /// The chain id is the short string of the network name, read as a big-endian felt.
    pub fn chain_id(&self) -> Felt {
        match self {
            Self::Mainnet => Felt::from_bytes_be_slice(b"SN_MAIN"),
            Self::Sepolia => Felt::from_bytes_be_slice(b"SN_SEPOLIA"),
            Self::SepoliaIntegration => Felt::from_bytes_be_slice(b"SN_INTEGRATION_SEPOLIA"),
            Self::Custom { chain_id, .. } => *chain_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Sepolia => "sepolia",
            Self::SepoliaIntegration => "sepolia-integration",
            Self::Custom { name, .. } => name,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Unknown network `{0}`, expected one of mainnet, sepolia, sepolia-integration")]
pub struct UnknownNetwork(String);

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Ok(Self::Mainnet),
            "sepolia" => Ok(Self::Sepolia),
            "sepolia-integration" | "integration-sepolia" => Ok(Self::SepoliaIntegration),
            _ => Err(UnknownNetwork(s.to_owned())),
        }
    }
}
