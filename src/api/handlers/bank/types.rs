use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct ExchangeRequest {
    #[serde(default)]
    pub public_token: String,
}

/// The item now associated with the signed-in account.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LinkedItem {
    pub item_id: String,
}
