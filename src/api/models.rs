//! Account endpoints: model listing and balance.

use serde::{Deserialize, Serialize};

pub const DEEPSEEK_CHAT: &str = "deepseek-chat";
pub const DEEPSEEK_CODER: &str = "deepseek-coder";
pub const DEEPSEEK_REASONER: &str = "deepseek-reasoner";
/// DeepSeek R1 as deployed on Azure AI inference
pub const AZURE_DEEPSEEK_R1: &str = "DeepSeek-R1";

/// A model served by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,

    #[serde(default)]
    pub object: String,

    #[serde(default)]
    pub owned_by: String,
}

/// Response of `GET models`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub object: String,

    pub data: Vec<Model>,
}

impl ModelList {
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.data.iter().map(|m| m.id.as_str())
    }
}

/// Balance in one currency. Amounts are decimal strings as sent by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceInfo {
    pub currency: String,
    pub total_balance: String,
    pub granted_balance: String,
    pub topped_up_balance: String,
}

/// Response of `GET user/balance`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    /// Whether the balance is sufficient for API calls
    pub is_available: bool,

    #[serde(default)]
    pub balance_infos: Vec<BalanceInfo>,
}
