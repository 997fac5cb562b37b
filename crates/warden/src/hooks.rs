//! Host hook interfaces.
//!
//! The engine owns no state of its own: permissions, network configurations,
//! approvals, accounts, and the unlock state all live in the host wallet, and
//! every read or mutation goes through these traits. Hook failures propagate
//! to the caller untouched; the engine never retries a hook.

use crate::{error::WalletError, metrics::MetricsEvent};
use alloy_primitives::{Address, ChainId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;
use warden_core::{
    caveat::Caip25CaveatValue,
    request::{AddChainRequest, PermissionsRequest},
};

/// Identifies one RPC endpoint within the host's network controller.
pub type NetworkClientId = String;

/// A caveat attached to a granted permission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Caveat {
    #[serde(rename = "type")]
    pub caveat_type: String,
    pub value: Value,
}

/// A permission granted to an origin, as recorded by the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub parent_capability: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<u64>,
    pub caveats: Vec<Caveat>,
}

impl Permission {
    /// First caveat of the given type, if present.
    pub fn caveat(&self, caveat_type: &str) -> Option<&Caveat> {
        self.caveats.iter().find(|caveat| caveat.caveat_type == caveat_type)
    }
}

/// One RPC endpoint of a configured network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcEndpoint {
    pub url: Url,
    pub network_client_id: NetworkClientId,
}

/// A network known to the host's network controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkConfiguration {
    pub chain_id: ChainId,
    pub name: String,
    pub ticker: String,
    pub rpc_endpoints: Vec<RpcEndpoint>,
    pub default_rpc_endpoint_index: usize,
    pub block_explorer_url: Option<Url>,
}

impl NetworkConfiguration {
    /// Client id of the default endpoint.
    pub fn default_client_id(&self) -> Option<&NetworkClientId> {
        self.rpc_endpoints
            .get(self.default_rpc_endpoint_index)
            .map(|endpoint| &endpoint.network_client_id)
    }

    /// Whether any configured endpoint serves `url`.
    pub fn has_endpoint(&self, url: &Url) -> bool {
        self.rpc_endpoints.iter().any(|endpoint| endpoint.url == *url)
    }
}

/// Handle of an in-progress, possibly multi-step approval sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApprovalFlow {
    pub id: String,
}

/// A connection approval prompt: the accounts and chains the dapp asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermissionApprovalRequest {
    pub origin: String,
    pub requested_accounts: Vec<Address>,
    pub requested_chain_ids: Vec<ChainId>,
}

/// Outcome of a connection approval prompt.
///
/// Both fields are the full approved sets, not deltas: the host seeds its
/// prompt with anything the origin already holds, and the user may edit the
/// selection freely before confirming.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermissionApproval {
    pub approved_accounts: Vec<Address>,
    pub approved_chain_ids: Vec<ChainId>,
}

/// Reads and writes the host's permission store.
#[async_trait]
pub trait PermissionHooks: Send + Sync {
    /// The origin's CAIP-25 caveat value, or `None` if the permission is not
    /// granted.
    async fn caip25_caveat(&self, origin: &str) -> Result<Option<Caip25CaveatValue>, WalletError>;

    /// Replaces the origin's CAIP-25 caveat value.
    async fn update_caip25_caveat(
        &self,
        origin: &str,
        value: Caip25CaveatValue,
    ) -> Result<(), WalletError>;

    /// Grants the CAIP-25 permission with the given caveat value, replacing
    /// any existing grant.
    async fn grant_caip25_permission(
        &self,
        origin: &str,
        value: Caip25CaveatValue,
    ) -> Result<Permission, WalletError>;

    /// Revokes the named permissions for the origin.
    async fn revoke_permissions_for_origin(
        &self,
        origin: &str,
        permissions: &[String],
    ) -> Result<(), WalletError>;

    /// Every permission currently granted to the origin.
    async fn permissions_for_origin(&self, origin: &str) -> Result<Vec<Permission>, WalletError>;

    /// Forwards a permissions request to the host's permission controller,
    /// which prompts the user and grants on approval. Returns the granted
    /// permissions.
    async fn request_permissions(
        &self,
        origin: &str,
        requested: PermissionsRequest,
    ) -> Result<Vec<Permission>, WalletError>;
}

/// Reads and writes the host's network controller.
#[async_trait]
pub trait NetworkHooks: Send + Sync {
    /// Network configuration for a chain id, if the wallet has one.
    async fn network_configuration_by_chain_id(
        &self,
        chain_id: ChainId,
    ) -> Result<Option<NetworkConfiguration>, WalletError>;

    /// Creates the network, or adds the request's endpoint to an existing
    /// configuration for the same chain. Returns the client id serving the
    /// new endpoint.
    async fn upsert_network_configuration(
        &self,
        request: &AddChainRequest,
        referrer: &str,
    ) -> Result<NetworkClientId, WalletError>;

    /// Makes the network client active for the origin.
    async fn set_active_network(
        &self,
        origin: &str,
        network_client_id: &NetworkClientId,
    ) -> Result<(), WalletError>;

    /// The chain the origin currently sees.
    async fn current_chain_id_for_origin(&self, origin: &str) -> Result<ChainId, WalletError>;
}

/// Drives the host's approval UI.
#[async_trait]
pub trait ApprovalHooks: Send + Sync {
    /// Opens an approval flow and returns its handle.
    async fn start_approval_flow(&self) -> ApprovalFlow;

    /// Closes an approval flow. Infallible so that cleanup paths cannot
    /// themselves fail.
    async fn end_approval_flow(&self, id: &str);

    /// Prompts the user to approve adding the described network.
    async fn request_add_chain_approval(
        &self,
        origin: &str,
        request: &AddChainRequest,
    ) -> Result<(), WalletError>;

    /// Prompts the user to approve a connection. The returned sets are what
    /// the user actually confirmed, which may differ from the request.
    async fn request_permission_approval(
        &self,
        request: PermissionApprovalRequest,
    ) -> Result<PermissionApproval, WalletError>;
}

/// Everything else the engine needs from the wallet proper.
#[async_trait]
pub trait WalletHooks: Send + Sync {
    /// Accounts currently exposed to the origin, most recently selected
    /// first. This ordering is authoritative; CAIP-25 scope accounts carry
    /// no ordering guarantee.
    fn accounts(&self, origin: &str) -> Vec<Address>;

    /// Every account in the wallet.
    fn list_accounts(&self) -> Vec<Address>;

    /// Resolves once the wallet is unlocked. `show_unlock_request` asks the
    /// host to surface its unlock UI.
    async fn unlock(&self, show_unlock_request: bool) -> Result<(), WalletError>;

    /// Hands a metrics event to the host.
    fn send_metrics(&self, event: MetricsEvent);
}
