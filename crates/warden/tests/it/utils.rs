//! Shared mock-host harness for the integration tests.

use alloy_primitives::{Address, ChainId};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::{collections::VecDeque, sync::Arc};
use url::Url;
use warden::{
    WalletApi, WalletError,
    hooks::{
        ApprovalFlow, ApprovalHooks, Caveat, NetworkConfiguration, NetworkHooks, Permission,
        PermissionApproval, PermissionApprovalRequest, PermissionHooks, RpcEndpoint, WalletHooks,
    },
    metrics::MetricsEvent,
};
use warden_core::{
    adapters,
    caveat::{CAIP25_CAVEAT_TYPE, CAIP25_PERMISSION_NAME, Caip25CaveatValue},
    request::{AddChainRequest, PermissionsRequest},
};

pub const ORIGIN: &str = "https://dapp.example";

/// One mock standing in for the host wallet behind every hook trait.
///
/// Everything observable is recorded; approval outcomes can be scripted per
/// call, defaulting to approving exactly what was requested.
#[derive(Default)]
pub struct MockHost {
    state: Mutex<HostState>,
    /// When set, connection approval prompts park until notified. Used to
    /// hold a request in flight across a concurrent call.
    pub hold_permission_approval: Mutex<Option<Arc<tokio::sync::Notify>>>,
}

#[derive(Default)]
struct HostState {
    caveats: Vec<(String, Caip25CaveatValue)>,
    foreign_permissions: Vec<Permission>,
    networks: Vec<NetworkConfiguration>,
    current_chain: Vec<(String, ChainId)>,
    wallet_accounts: Vec<Address>,

    next_id: u64,
    started_flows: Vec<String>,
    ended_flows: Vec<String>,
    add_chain_prompts: Vec<AddChainRequest>,
    permission_prompts: Vec<PermissionApprovalRequest>,
    permission_approvals: VecDeque<Result<PermissionApproval, WalletError>>,
    add_chain_approvals: VecDeque<Result<(), WalletError>>,
    upserts: Vec<AddChainRequest>,
    set_active_calls: Vec<(String, String)>,
    forwarded_permission_requests: Vec<PermissionsRequest>,
    revocations: Vec<Vec<String>>,
    unlock_calls: Vec<bool>,
    metrics: Vec<MetricsEvent>,
}

impl MockHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a network with a single endpoint and a `client-0x<id>`
    /// client id.
    pub fn add_network(&self, chain_id: ChainId, ticker: &str, rpc_url: &str) {
        let mut state = self.state.lock();
        state.networks.push(NetworkConfiguration {
            chain_id,
            name: format!("chain 0x{chain_id:x}"),
            ticker: ticker.to_string(),
            rpc_endpoints: vec![RpcEndpoint {
                url: Url::parse(rpc_url).unwrap(),
                network_client_id: format!("client-0x{chain_id:x}"),
            }],
            default_rpc_endpoint_index: 0,
            block_explorer_url: None,
        });
    }

    pub fn set_wallet_accounts(&self, accounts: &[Address]) {
        self.state.lock().wallet_accounts = accounts.to_vec();
    }

    pub fn set_current_chain(&self, origin: &str, chain_id: ChainId) {
        let mut state = self.state.lock();
        state.current_chain.retain(|(o, _)| o != origin);
        state.current_chain.push((origin.to_string(), chain_id));
    }

    pub fn set_caveat(&self, origin: &str, value: Caip25CaveatValue) {
        let mut state = self.state.lock();
        state.caveats.retain(|(o, _)| o != origin);
        state.caveats.push((origin.to_string(), value));
    }

    pub fn caveat(&self, origin: &str) -> Option<Caip25CaveatValue> {
        self.state
            .lock()
            .caveats
            .iter()
            .find(|(o, _)| o == origin)
            .map(|(_, value)| value.clone())
    }

    pub fn queue_permission_approval(&self, outcome: Result<PermissionApproval, WalletError>) {
        self.state.lock().permission_approvals.push_back(outcome);
    }

    pub fn queue_add_chain_approval(&self, outcome: Result<(), WalletError>) {
        self.state.lock().add_chain_approvals.push_back(outcome);
    }

    pub fn permission_prompts(&self) -> Vec<PermissionApprovalRequest> {
        self.state.lock().permission_prompts.clone()
    }

    pub fn add_chain_prompts(&self) -> Vec<AddChainRequest> {
        self.state.lock().add_chain_prompts.clone()
    }

    pub fn started_flows(&self) -> Vec<String> {
        self.state.lock().started_flows.clone()
    }

    pub fn ended_flows(&self) -> Vec<String> {
        self.state.lock().ended_flows.clone()
    }

    pub fn upserts(&self) -> Vec<AddChainRequest> {
        self.state.lock().upserts.clone()
    }

    pub fn set_active_calls(&self) -> Vec<(String, String)> {
        self.state.lock().set_active_calls.clone()
    }

    pub fn forwarded_permission_requests(&self) -> Vec<PermissionsRequest> {
        self.state.lock().forwarded_permission_requests.clone()
    }

    pub fn revocations(&self) -> Vec<Vec<String>> {
        self.state.lock().revocations.clone()
    }

    pub fn unlock_calls(&self) -> Vec<bool> {
        self.state.lock().unlock_calls.clone()
    }

    pub fn metrics(&self) -> Vec<MetricsEvent> {
        self.state.lock().metrics.clone()
    }

    fn caip25_permission(&self, origin: &str, value: &Caip25CaveatValue, id: u64) -> Permission {
        Permission {
            id: Some(format!("perm-{id}")),
            parent_capability: CAIP25_PERMISSION_NAME.to_string(),
            invoker: Some(origin.to_string()),
            date: None,
            caveats: vec![Caveat {
                caveat_type: CAIP25_CAVEAT_TYPE.to_string(),
                value: json!(value),
            }],
        }
    }
}

#[async_trait]
impl PermissionHooks for MockHost {
    async fn caip25_caveat(&self, origin: &str) -> Result<Option<Caip25CaveatValue>, WalletError> {
        Ok(self.caveat(origin))
    }

    async fn update_caip25_caveat(
        &self,
        origin: &str,
        value: Caip25CaveatValue,
    ) -> Result<(), WalletError> {
        self.set_caveat(origin, value);
        Ok(())
    }

    async fn grant_caip25_permission(
        &self,
        origin: &str,
        value: Caip25CaveatValue,
    ) -> Result<Permission, WalletError> {
        self.set_caveat(origin, value.clone());
        let id = {
            let mut state = self.state.lock();
            state.next_id += 1;
            state.next_id
        };
        Ok(self.caip25_permission(origin, &value, id))
    }

    async fn revoke_permissions_for_origin(
        &self,
        origin: &str,
        permissions: &[String],
    ) -> Result<(), WalletError> {
        let mut state = self.state.lock();
        state.revocations.push(permissions.to_vec());
        if permissions.iter().any(|name| name == CAIP25_PERMISSION_NAME) {
            state.caveats.retain(|(o, _)| o != origin);
        }
        Ok(())
    }

    async fn permissions_for_origin(&self, origin: &str) -> Result<Vec<Permission>, WalletError> {
        let mut out = Vec::new();
        if let Some(value) = self.caveat(origin) {
            out.push(self.caip25_permission(origin, &value, 0));
        }
        out.extend(self.state.lock().foreign_permissions.clone());
        Ok(out)
    }

    async fn request_permissions(
        &self,
        _origin: &str,
        requested: PermissionsRequest,
    ) -> Result<Vec<Permission>, WalletError> {
        let granted = requested
            .keys()
            .map(|name| Permission {
                id: None,
                parent_capability: name.clone(),
                invoker: None,
                date: None,
                caveats: Vec::new(),
            })
            .collect();
        self.state.lock().forwarded_permission_requests.push(requested);
        Ok(granted)
    }
}

#[async_trait]
impl NetworkHooks for MockHost {
    async fn network_configuration_by_chain_id(
        &self,
        chain_id: ChainId,
    ) -> Result<Option<NetworkConfiguration>, WalletError> {
        Ok(self.state.lock().networks.iter().find(|n| n.chain_id == chain_id).cloned())
    }

    async fn upsert_network_configuration(
        &self,
        request: &AddChainRequest,
        _referrer: &str,
    ) -> Result<String, WalletError> {
        let mut state = self.state.lock();
        state.upserts.push(request.clone());
        let client_id = format!("client-0x{:x}", request.chain_id);
        let endpoint =
            RpcEndpoint { url: request.rpc_url.clone(), network_client_id: client_id.clone() };
        match state.networks.iter_mut().find(|n| n.chain_id == request.chain_id) {
            Some(network) => network.rpc_endpoints.push(endpoint),
            None => state.networks.push(NetworkConfiguration {
                chain_id: request.chain_id,
                name: request.chain_name.clone(),
                ticker: request.ticker.clone(),
                rpc_endpoints: vec![endpoint],
                default_rpc_endpoint_index: 0,
                block_explorer_url: request.block_explorer_url.clone(),
            }),
        }
        Ok(client_id)
    }

    async fn set_active_network(
        &self,
        origin: &str,
        network_client_id: &String,
    ) -> Result<(), WalletError> {
        let mut state = self.state.lock();
        state.set_active_calls.push((origin.to_string(), network_client_id.clone()));
        let chain_id = state
            .networks
            .iter()
            .find(|n| n.rpc_endpoints.iter().any(|e| e.network_client_id == *network_client_id))
            .map(|n| n.chain_id);
        if let Some(chain_id) = chain_id {
            state.current_chain.retain(|(o, _)| o != origin);
            state.current_chain.push((origin.to_string(), chain_id));
        }
        Ok(())
    }

    async fn current_chain_id_for_origin(&self, origin: &str) -> Result<ChainId, WalletError> {
        Ok(self
            .state
            .lock()
            .current_chain
            .iter()
            .find(|(o, _)| o == origin)
            .map(|(_, id)| *id)
            .unwrap_or(1))
    }
}

#[async_trait]
impl ApprovalHooks for MockHost {
    async fn start_approval_flow(&self) -> ApprovalFlow {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = format!("flow-{}", state.next_id);
        state.started_flows.push(id.clone());
        ApprovalFlow { id }
    }

    async fn end_approval_flow(&self, id: &str) {
        self.state.lock().ended_flows.push(id.to_string());
    }

    async fn request_add_chain_approval(
        &self,
        _origin: &str,
        request: &AddChainRequest,
    ) -> Result<(), WalletError> {
        let mut state = self.state.lock();
        state.add_chain_prompts.push(request.clone());
        state.add_chain_approvals.pop_front().unwrap_or(Ok(()))
    }

    async fn request_permission_approval(
        &self,
        request: PermissionApprovalRequest,
    ) -> Result<PermissionApproval, WalletError> {
        self.state.lock().permission_prompts.push(request.clone());
        let hold = self.hold_permission_approval.lock().clone();
        if let Some(notify) = hold {
            notify.notified().await;
        }
        let mut state = self.state.lock();
        state.permission_approvals.pop_front().unwrap_or(Ok(PermissionApproval {
            approved_accounts: request.requested_accounts,
            approved_chain_ids: request.requested_chain_ids,
        }))
    }
}

#[async_trait]
impl WalletHooks for MockHost {
    fn accounts(&self, origin: &str) -> Vec<Address> {
        let permitted = match self.caveat(origin) {
            Some(value) => adapters::get_eth_accounts(&value),
            None => return Vec::new(),
        };
        // wallet (lastSelected) order, filtered down to the permitted set
        self.state
            .lock()
            .wallet_accounts
            .iter()
            .filter(|account| permitted.contains(account))
            .copied()
            .collect()
    }

    fn list_accounts(&self) -> Vec<Address> {
        self.state.lock().wallet_accounts.clone()
    }

    async fn unlock(&self, show_unlock_request: bool) -> Result<(), WalletError> {
        self.state.lock().unlock_calls.push(show_unlock_request);
        Ok(())
    }

    fn send_metrics(&self, event: MetricsEvent) {
        self.state.lock().metrics.push(event);
    }
}

/// Builds a [`WalletApi`] over one shared mock host.
pub fn api(host: &Arc<MockHost>) -> WalletApi {
    WalletApi::new(host.clone(), host.clone(), host.clone(), host.clone())
}

/// Parses a method call into a [`WalletRequest`].
pub fn request(method: &str, params: serde_json::Value) -> warden_core::request::WalletRequest {
    serde_json::from_value(json!({ "method": method, "params": params })).unwrap()
}

/// A caveat as the legacy flows grant it: the given chains and accounts in
/// the optional scopes, `isMultichainOrigin: false`.
pub fn legacy_caveat(chain_ids: &[ChainId], accounts: &[Address]) -> Caip25CaveatValue {
    let value = adapters::set_permitted_eth_chain_ids(&Caip25CaveatValue::default(), chain_ids);
    adapters::set_eth_accounts(&value, accounts)
}

/// A caveat as `wallet_createSession` grants it.
pub fn multichain_caveat(chain_ids: &[ChainId], accounts: &[Address]) -> Caip25CaveatValue {
    Caip25CaveatValue { is_multichain_origin: true, ..legacy_caveat(chain_ids, accounts) }
}
