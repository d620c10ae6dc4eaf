use std::fmt;
use std::str::FromStr;

use chain_sol::Address;
use serde::{Deserialize, Serialize};

use crate::error::LendingError;

pub const PRODUCTION_PROGRAM_ID: Address =
    Address::from_base58_const("So1endDq2YkqhipRh3WViPa8hdiSpxWy6z3Z6tMCpAo");

pub const DEVNET_PROGRAM_ID: Address =
    Address::from_base58_const("ALend7Ketfx5bxh6ghsCDXAoDrhvEmsXT3cynB6aPLgx");

pub const BETA_PROGRAM_ID: Address =
    Address::from_base58_const("BLendhFh4HGnycEDDFhbeFEUYLP4fXB5tTHMoTX8Dch5");

/// Lending protocol deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Devnet,
    Beta,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Devnet => "devnet",
            Environment::Beta => "beta",
        }
    }

    pub fn program_id(&self) -> Address {
        match self {
            Environment::Production => PRODUCTION_PROGRAM_ID,
            Environment::Devnet => DEVNET_PROGRAM_ID,
            Environment::Beta => BETA_PROGRAM_ID,
        }
    }
}

impl FromStr for Environment {
    type Err = LendingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "mainnet" => Ok(Environment::Production),
            "devnet" => Ok(Environment::Devnet),
            "beta" => Ok(Environment::Beta),
            _ => Err(LendingError::UnknownEnvironment(s.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
