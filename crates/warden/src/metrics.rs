//! Metrics events handed to the host for emission.

use serde::Serialize;
use serde_json::{Value, json};

/// Category recorded on events raised by the inpage provider surface.
pub const METRICS_CATEGORY_INPAGE_PROVIDER: &str = "inpage_provider";

/// Event recorded when a dapp connects accounts.
pub const METRICS_EVENT_DAPP_VIEWED: &str = "Dapp Viewed";

/// A metrics event. The engine only constructs these; whether and where they
/// are emitted is the host's decision.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricsEvent {
    pub event: String,
    pub category: String,
    pub referrer: MetricsReferrer,
    pub properties: Value,
}

/// The origin the event is attributed to.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricsReferrer {
    pub url: String,
}

impl MetricsEvent {
    /// Builds the `Dapp Viewed` event raised after a successful connection.
    ///
    /// `wallet_accounts` is the total number of accounts in the wallet,
    /// `connected_accounts` the number now exposed to the origin.
    pub fn dapp_viewed(origin: &str, wallet_accounts: usize, connected_accounts: usize) -> Self {
        Self {
            event: METRICS_EVENT_DAPP_VIEWED.to_string(),
            category: METRICS_CATEGORY_INPAGE_PROVIDER.to_string(),
            referrer: MetricsReferrer { url: origin.to_string() },
            properties: json!({
                "number_of_accounts": wallet_accounts,
                "number_of_accounts_connected": connected_accounts,
            }),
        }
    }
}
