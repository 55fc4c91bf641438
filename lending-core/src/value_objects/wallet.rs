use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange account/wallet a balance lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Wallet {
    /// Spot trading wallet
    Exchange,
    /// Margin trading wallet
    Margin,
    /// Funding wallet that loan offers are placed from
    Lending,
}

impl fmt::Display for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wallet::Exchange => write!(f, "exchange"),
            Wallet::Margin => write!(f, "margin"),
            Wallet::Lending => write!(f, "lending"),
        }
    }
}
