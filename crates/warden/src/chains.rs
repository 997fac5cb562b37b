//! Chain switching: the `wallet_addEthereumChain` and
//! `wallet_switchEthereumChain` front-ends and the switch orchestrator they
//! share.

use crate::{
    api::WalletApi,
    error::{Result, WalletError},
    hooks::{ApprovalFlow, NetworkClientId, PermissionApprovalRequest},
};
use alloy_primitives::ChainId;
use serde_json::Value;
use tracing::debug;
use warden_core::{
    adapters,
    caveat::Caip25CaveatValue,
    request::{
        AddChainRequest, AddEthereumChainParameter, SwitchEthereumChainParameter,
        validate_add_ethereum_chain, validate_switch_ethereum_chain,
    },
};
use warden_rpc::error::ErrorCode;

/// How a switch request entered the engine.
#[derive(Clone, Debug, Default)]
pub(crate) struct SwitchChainOptions {
    /// Flow opened by a preceding add-chain step. Ended here exactly once,
    /// on every exit path.
    pub(crate) approval_flow: Option<ApprovalFlow>,
    /// The switch is chained after an approved add, so the incremental
    /// permission prompt is skipped.
    pub(crate) is_add_flow: bool,
    /// Grant without prompting, for callers that carry their own approval.
    pub(crate) auto_approve: bool,
}

impl WalletApi {
    /// `wallet_addEthereumChain`
    pub(crate) async fn add_ethereum_chain(
        &self,
        origin: &str,
        params: &AddEthereumChainParameter,
    ) -> Result<Value> {
        let request = validate_add_ethereum_chain(params)?;
        let current_chain_id = self.network.current_chain_id_for_origin(origin).await?;

        let existing = self.network.network_configuration_by_chain_id(request.chain_id).await?;
        if let Some(existing) = &existing
            && existing.ticker != request.ticker
        {
            return Err(WalletError::TickerMismatch(request.ticker));
        }

        // An existing configuration already serving the requested endpoint
        // is reused; anything else needs the add-network approval.
        let matching_client_id = existing.as_ref().and_then(|config| {
            config
                .rpc_endpoints
                .iter()
                .find(|endpoint| endpoint.url == request.rpc_url)
                .map(|endpoint| endpoint.network_client_id.clone())
        });

        let mut approval_flow = None;
        let network_client_id = match matching_client_id {
            Some(client_id) => client_id,
            None => {
                let flow = self.approvals.start_approval_flow().await;
                match self.add_network(origin, &request).await {
                    Ok(client_id) => {
                        approval_flow = Some(flow);
                        client_id
                    }
                    Err(err) => {
                        self.approvals.end_approval_flow(&flow.id).await;
                        return Err(err);
                    }
                }
            }
        };

        if current_chain_id == request.chain_id {
            // Nothing to switch, but a flow opened for the add must still be
            // closed.
            if let Some(flow) = approval_flow {
                self.approvals.end_approval_flow(&flow.id).await;
            }
            return Ok(Value::Null);
        }

        self.switch_chain(
            origin,
            request.chain_id,
            &network_client_id,
            SwitchChainOptions { approval_flow, is_add_flow: true, auto_approve: false },
        )
        .await?;
        Ok(Value::Null)
    }

    /// `wallet_switchEthereumChain`
    pub(crate) async fn switch_ethereum_chain(
        &self,
        origin: &str,
        params: &SwitchEthereumChainParameter,
    ) -> Result<Value> {
        let chain_id = validate_switch_ethereum_chain(params)?;

        if self.network.current_chain_id_for_origin(origin).await? == chain_id {
            return Ok(Value::Null);
        }

        let network_client_id = self.default_client_id(chain_id).await?;
        self.switch_chain(origin, chain_id, &network_client_id, SwitchChainOptions::default())
            .await?;
        Ok(Value::Null)
    }

    /// Switches the origin to a known chain without the confirmation
    /// prompt, for host surfaces that collect their own approval before
    /// calling in.
    ///
    /// The permission is still granted or extended, and a grant made over
    /// the multichain flow still refuses the extension.
    pub async fn switch_chain_preapproved(&self, origin: &str, chain_id: ChainId) -> Result<()> {
        if self.network.current_chain_id_for_origin(origin).await? == chain_id {
            return Ok(());
        }

        let network_client_id = self.default_client_id(chain_id).await?;
        self.switch_chain(
            origin,
            chain_id,
            &network_client_id,
            SwitchChainOptions { auto_approve: true, ..Default::default() },
        )
        .await
    }

    /// Default endpoint client id for a configured chain.
    async fn default_client_id(&self, chain_id: ChainId) -> Result<NetworkClientId> {
        self.network
            .network_configuration_by_chain_id(chain_id)
            .await?
            .as_ref()
            .and_then(|config| config.default_client_id().cloned())
            .ok_or(WalletError::UnrecognizedChain(chain_id))
    }

    /// Prompts for and records a new network endpoint. The caller owns the
    /// surrounding approval flow.
    async fn add_network(
        &self,
        origin: &str,
        request: &AddChainRequest,
    ) -> Result<NetworkClientId> {
        self.approvals.request_add_chain_approval(origin, request).await?;
        self.network.upsert_network_configuration(request, origin).await
    }

    /// Switches the origin's active network, granting or extending the
    /// permission to do so where necessary.
    pub(crate) async fn switch_chain(
        &self,
        origin: &str,
        chain_id: ChainId,
        network_client_id: &NetworkClientId,
        options: SwitchChainOptions,
    ) -> Result<()> {
        let result = self.switch_chain_inner(origin, chain_id, network_client_id, &options).await;
        let result = match result {
            // Inside an add flow, declining the switch still leaves the
            // chain added. That is success from the dapp's point of view.
            Err(err) if options.approval_flow.is_some() && is_user_rejection(&err) => {
                debug!(target: "warden::chains", %origin, chain_id, "switch declined inside add flow");
                Ok(())
            }
            other => other,
        };
        if let Some(flow) = &options.approval_flow {
            self.approvals.end_approval_flow(&flow.id).await;
        }
        result
    }

    async fn switch_chain_inner(
        &self,
        origin: &str,
        chain_id: ChainId,
        network_client_id: &NetworkClientId,
        options: &SwitchChainOptions,
    ) -> Result<()> {
        // Serializes the caveat read-modify-write per origin.
        let mutex = self.origin_mutexes.for_origin(origin);
        let _serialized = mutex.lock().await;

        match self.permissions.caip25_caveat(origin).await? {
            Some(caveat) => {
                let permitted = adapters::get_permitted_eth_chain_ids(&caveat);
                if permitted.contains(&chain_id) {
                    // Already permitted, switch silently.
                } else if caveat.is_multichain_origin {
                    // Session-granted permissions are never extended through
                    // the legacy single-chain UX.
                    return Err(WalletError::MultichainOriginLockout(chain_id));
                } else {
                    if !options.is_add_flow && !options.auto_approve {
                        self.request_chain_approval(origin, chain_id).await?;
                    }
                    let updated = adapters::add_permitted_eth_chain_id(&caveat, chain_id);
                    self.permissions.update_caip25_caveat(origin, updated).await?;
                }
            }
            None => {
                if !options.auto_approve {
                    self.request_chain_approval(origin, chain_id).await?;
                }
                let value =
                    adapters::set_permitted_eth_chain_ids(&Caip25CaveatValue::default(), &[chain_id]);
                self.permissions.grant_caip25_permission(origin, value).await?;
            }
        }

        self.network.set_active_network(origin, network_client_id).await
    }

    /// Binary confirm prompt for switching to one chain. The grant content
    /// is fixed to the target chain regardless of the approval's account or
    /// chain edits.
    async fn request_chain_approval(&self, origin: &str, chain_id: ChainId) -> Result<()> {
        self.approvals
            .request_permission_approval(PermissionApprovalRequest {
                origin: origin.to_string(),
                requested_accounts: Vec::new(),
                requested_chain_ids: vec![chain_id],
            })
            .await?;
        Ok(())
    }
}

pub(crate) fn is_user_rejection(err: &WalletError) -> bool {
    match err {
        WalletError::UserRejected => true,
        WalletError::Rpc(err) => err.code == ErrorCode::UserRejectedRequest,
        _ => false,
    }
}
