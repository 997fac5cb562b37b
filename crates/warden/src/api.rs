//! The wallet RPC surface.
//!
//! [`WalletApi`] owns the hook handles and the per-origin concurrency
//! guards, dispatches parsed [`WalletRequest`]s onto typed handlers, and
//! shapes every outcome into a JSON-RPC [`ResponseResult`]. The chain
//! add/switch handlers live in the `chains` module; everything else is
//! here.

use crate::{
    error::{Result, ToRpcResponseResult, WalletError},
    hooks::{
        ApprovalHooks, Caveat, NetworkHooks, Permission, PermissionApproval,
        PermissionApprovalRequest, PermissionHooks, WalletHooks,
    },
    locks::{OriginLocks, OriginMutexes},
    metrics::MetricsEvent,
    session::{SessionResponse, bucket_scopes, session_approval_request},
};
use alloy_primitives::{Address, ChainId};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, trace};
use warden_core::{
    adapters,
    caveat::{
        CAIP25_CAVEAT_TYPE, CAIP25_PERMISSION_NAME, Caip25CaveatValue, ETH_ACCOUNTS_PERMISSION,
        PERMITTED_CHAINS_PERMISSION, RESTRICT_ACCOUNTS_CAVEAT, RESTRICT_CHAINS_CAVEAT,
        validate_caveat_value,
    },
    request::{AuthorizationRequest, PermissionsRequest, WalletRequest, validate_chain_id},
    scope::{normalize_scopes, validate_scopes},
};
use warden_rpc::response::ResponseResult;

/// The engine behind the wallet's dapp-facing JSON-RPC methods.
///
/// Clones share the hook handles and the concurrency guards, so one
/// instance (or its clones) must serve all requests of a host.
#[derive(Clone)]
pub struct WalletApi {
    pub(crate) permissions: Arc<dyn PermissionHooks>,
    pub(crate) network: Arc<dyn NetworkHooks>,
    pub(crate) approvals: Arc<dyn ApprovalHooks>,
    pub(crate) wallet: Arc<dyn WalletHooks>,
    /// Origins with an in-flight `eth_requestAccounts`.
    origin_locks: OriginLocks,
    /// Serializes caveat read-modify-write sequences per origin.
    pub(crate) origin_mutexes: OriginMutexes,
}

impl WalletApi {
    /// Creates the engine over the host's hook implementations.
    pub fn new(
        permissions: Arc<dyn PermissionHooks>,
        network: Arc<dyn NetworkHooks>,
        approvals: Arc<dyn ApprovalHooks>,
        wallet: Arc<dyn WalletHooks>,
    ) -> Self {
        Self {
            permissions,
            network,
            approvals,
            wallet,
            origin_locks: OriginLocks::default(),
            origin_mutexes: OriginMutexes::default(),
        }
    }

    /// Executes the [`WalletRequest`] for `origin` and returns an RPC
    /// [`ResponseResult`].
    pub async fn execute(&self, origin: &str, request: WalletRequest) -> ResponseResult {
        trace!(target: "rpc::api", %origin, "executing wallet request");
        match request {
            WalletRequest::AddEthereumChain(params) => {
                self.add_ethereum_chain(origin, &params).await.to_rpc_result()
            }
            WalletRequest::SwitchEthereumChain(params) => {
                self.switch_ethereum_chain(origin, &params).await.to_rpc_result()
            }
            WalletRequest::RequestAccounts(()) => {
                self.request_accounts(origin).await.to_rpc_result()
            }
            WalletRequest::Accounts(()) => self.accounts(origin).to_rpc_result(),
            WalletRequest::RequestPermissions(requested) => {
                self.request_permissions(origin, requested).await.to_rpc_result()
            }
            WalletRequest::RevokePermissions(requested) => {
                self.revoke_permissions(origin, requested).await.to_rpc_result()
            }
            WalletRequest::GetPermissions(()) => {
                self.get_permissions(origin).await.to_rpc_result()
            }
            WalletRequest::CreateSession(auth) => {
                self.create_session(origin, auth).await.to_rpc_result()
            }
            WalletRequest::GetSession(()) => self.get_session(origin).await.to_rpc_result(),
            WalletRequest::RevokeSession(()) => {
                self.revoke_session(origin).await.to_rpc_result()
            }
        }
    }

    /// `eth_accounts`
    ///
    /// The hook's ordering is authoritative: most recently selected first.
    fn accounts(&self, origin: &str) -> Result<Vec<String>> {
        Ok(checksummed(&self.wallet.accounts(origin)))
    }

    /// `eth_requestAccounts`
    pub(crate) async fn request_accounts(&self, origin: &str) -> Result<Vec<String>> {
        // Held for the whole handler; a concurrent call for the same origin
        // fails fast instead of stacking a second prompt.
        let _guard =
            self.origin_locks.try_acquire(origin).ok_or(WalletError::RequestAlreadyPending)?;

        let connected = self.wallet.accounts(origin);
        if !connected.is_empty() {
            self.wallet.unlock(true).await?;
            return Ok(checksummed(&connected));
        }

        let approval = self
            .approvals
            .request_permission_approval(PermissionApprovalRequest {
                origin: origin.to_string(),
                requested_accounts: Vec::new(),
                requested_chain_ids: Vec::new(),
            })
            .await?;
        self.grant_legacy_permission(origin, &approval).await?;

        let connected = self.wallet.accounts(origin);
        self.wallet.send_metrics(MetricsEvent::dapp_viewed(
            origin,
            self.wallet.list_accounts().len(),
            connected.len(),
        ));
        Ok(checksummed(&connected))
    }

    /// `wallet_requestPermissions`
    pub(crate) async fn request_permissions(
        &self,
        origin: &str,
        requested: PermissionsRequest,
    ) -> Result<Vec<Permission>> {
        let (legacy_seed, leftover) = split_permissions_request(requested);

        let mut granted = Vec::new();
        if let Some(seed) = legacy_seed {
            let approval = self
                .approvals
                .request_permission_approval(PermissionApprovalRequest {
                    origin: origin.to_string(),
                    requested_accounts: seed.accounts,
                    requested_chain_ids: seed.chain_ids,
                })
                .await?;
            granted.push(self.grant_legacy_permission(origin, &approval).await?);
            self.wallet.send_metrics(MetricsEvent::dapp_viewed(
                origin,
                self.wallet.list_accounts().len(),
                self.wallet.accounts(origin).len(),
            ));

            if !leftover.is_empty() {
                granted.extend(self.permissions.request_permissions(origin, leftover).await?);
            }
        } else {
            // Nothing routed to the CAIP-25 path; the host's permission
            // flow sees the request untouched.
            granted.extend(self.permissions.request_permissions(origin, leftover).await?);
        }

        self.synthesize_legacy_permissions(origin, granted)
    }

    /// `wallet_getPermissions`
    pub(crate) async fn get_permissions(&self, origin: &str) -> Result<Vec<Permission>> {
        let permissions = self.permissions.permissions_for_origin(origin).await?;
        self.synthesize_legacy_permissions(origin, permissions)
    }

    /// `wallet_revokePermissions`
    pub(crate) async fn revoke_permissions(
        &self,
        origin: &str,
        requested: PermissionsRequest,
    ) -> Result<Value> {
        if requested.is_empty() {
            return Err(WalletError::InvalidParamsWithRequest(json!({
                "method": "wallet_revokePermissions",
                "params": [requested],
            })));
        }

        let mut names: Vec<String> = Vec::new();
        for name in requested.keys() {
            // The legacy permission names alias the CAIP-25 endowment.
            let name = match name.as_str() {
                ETH_ACCOUNTS_PERMISSION | PERMITTED_CHAINS_PERMISSION => CAIP25_PERMISSION_NAME,
                other => other,
            };
            if !names.iter().any(|existing| existing == name) {
                names.push(name.to_string());
            }
        }
        self.permissions.revoke_permissions_for_origin(origin, &names).await?;
        Ok(Value::Null)
    }

    /// `wallet_createSession`
    pub(crate) async fn create_session(
        &self,
        origin: &str,
        auth: AuthorizationRequest,
    ) -> Result<SessionResponse> {
        if !auth.extra.is_empty() {
            return Err(WalletError::SessionPropertiesPlacement);
        }
        if auth.session_properties.as_ref().is_some_and(|props| props.is_empty()) {
            return Err(WalletError::InvalidSessionProperties);
        }

        let required = normalize_scopes(validate_scopes(&auth.required_scopes));
        let optional = normalize_scopes(validate_scopes(&auth.optional_scopes));

        let required = bucket_scopes(&*self.network, required).await?;
        if !required.unsupported.is_empty() {
            return Err(WalletError::UnsupportedRequiredScopes);
        }
        let optional = bucket_scopes(&*self.network, optional).await?;
        if !optional.unsupported.is_empty() {
            debug!(
                target: "rpc::api",
                %origin,
                dropped = optional.unsupported.len(),
                "dropping unsupported optional scopes"
            );
        }

        let approval = self
            .approvals
            .request_permission_approval(session_approval_request(
                origin,
                &required.supported,
                &optional.supported,
                &self.wallet.list_accounts(),
            ))
            .await?;

        let value = Caip25CaveatValue {
            required_scopes: required.supported,
            optional_scopes: optional.supported,
            is_multichain_origin: true,
        };
        let value = adapters::set_permitted_eth_chain_ids(&value, &approval.approved_chain_ids);
        let value = adapters::set_eth_accounts(&value, &approval.approved_accounts);

        let granted = {
            let mutex = self.origin_mutexes.for_origin(origin);
            let _serialized = mutex.lock().await;
            self.permissions.grant_caip25_permission(origin, value).await?
        };

        self.wallet.send_metrics(MetricsEvent::dapp_viewed(
            origin,
            self.wallet.list_accounts().len(),
            approval.approved_accounts.len(),
        ));

        let value = granted
            .caveat(CAIP25_CAVEAT_TYPE)
            .map(|caveat| validate_caveat_value(&caveat.value))
            .transpose()?
            .unwrap_or_default();
        Ok(SessionResponse {
            session_scopes: value.session_scopes(),
            session_properties: auth.session_properties,
        })
    }

    /// `wallet_getSession`
    pub(crate) async fn get_session(&self, origin: &str) -> Result<SessionResponse> {
        let scopes = self
            .permissions
            .caip25_caveat(origin)
            .await?
            .map(|value| value.session_scopes())
            .unwrap_or_default();
        Ok(SessionResponse { session_scopes: scopes, session_properties: None })
    }

    /// `wallet_revokeSession`
    ///
    /// Revoking a session that does not exist is success: the hook treats a
    /// missing permission as already revoked.
    pub(crate) async fn revoke_session(&self, origin: &str) -> Result<bool> {
        self.permissions
            .revoke_permissions_for_origin(origin, &[CAIP25_PERMISSION_NAME.to_string()])
            .await?;
        Ok(true)
    }

    /// Applies an approved legacy connection to the origin's CAIP-25
    /// permission, granting or extending it.
    ///
    /// A grant that originated from the multichain flow is never rewritten
    /// through this path.
    pub(crate) async fn grant_legacy_permission(
        &self,
        origin: &str,
        approval: &PermissionApproval,
    ) -> Result<Permission> {
        let mutex = self.origin_mutexes.for_origin(origin);
        let _serialized = mutex.lock().await;

        let base = match self.permissions.caip25_caveat(origin).await? {
            Some(existing) if existing.is_multichain_origin => {
                return Err(WalletError::PermissionConflict);
            }
            Some(existing) => existing,
            None => Caip25CaveatValue::default(),
        };
        let value = adapters::set_permitted_eth_chain_ids(&base, &approval.approved_chain_ids);
        let value = adapters::set_eth_accounts(&value, &approval.approved_accounts);
        self.permissions.grant_caip25_permission(origin, value).await
    }

    /// Replaces every CAIP-25 endowment in `permissions` with the legacy
    /// `eth_accounts` and `endowment:permitted-chains` entries derived from
    /// it. The endowment itself is never exposed to dapps.
    fn synthesize_legacy_permissions(
        &self,
        origin: &str,
        permissions: Vec<Permission>,
    ) -> Result<Vec<Permission>> {
        let accounts = self.wallet.accounts(origin);
        let mut out = Vec::new();
        for permission in permissions {
            if permission.parent_capability != CAIP25_PERMISSION_NAME {
                out.push(permission);
                continue;
            }
            let Some(caveat) = permission.caveat(CAIP25_CAVEAT_TYPE) else {
                continue;
            };
            let value = validate_caveat_value(&caveat.value)?;

            if !accounts.is_empty() {
                out.push(Permission {
                    parent_capability: ETH_ACCOUNTS_PERMISSION.to_string(),
                    caveats: vec![Caveat {
                        caveat_type: RESTRICT_ACCOUNTS_CAVEAT.to_string(),
                        value: json!(checksummed(&accounts)),
                    }],
                    ..permission.clone()
                });
            }
            let chain_ids = adapters::get_permitted_eth_chain_ids(&value);
            if !chain_ids.is_empty() {
                out.push(Permission {
                    parent_capability: PERMITTED_CHAINS_PERMISSION.to_string(),
                    caveats: vec![Caveat {
                        caveat_type: RESTRICT_CHAINS_CAVEAT.to_string(),
                        value: json!(hex_chain_ids(&chain_ids)),
                    }],
                    ..permission
                });
            }
        }
        Ok(out)
    }
}

/// EIP-55 checksummed renderings, in the given order.
fn checksummed(accounts: &[Address]) -> Vec<String> {
    accounts.iter().map(|address| address.to_checksum(None)).collect()
}

/// `0x`-hex renderings of chain ids, as the legacy caveat shape expects.
fn hex_chain_ids(chain_ids: &[ChainId]) -> Vec<String> {
    chain_ids.iter().map(|id| format!("0x{id:x}")).collect()
}

/// Accounts and chains a `wallet_requestPermissions` call asked for through
/// the legacy permission shapes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct LegacySeed {
    accounts: Vec<Address>,
    chain_ids: Vec<ChainId>,
}

/// Splits a permissions request into the legacy keys the CAIP-25 flow
/// absorbs and the remainder the host's own permission flow handles.
///
/// Returns `None` for the seed when neither legacy key is present. The seed
/// values only prime the approval prompt, so unparsable caveat entries are
/// skipped rather than rejected.
fn split_permissions_request(
    requested: PermissionsRequest,
) -> (Option<LegacySeed>, PermissionsRequest) {
    let mut seed = None;
    let mut leftover = PermissionsRequest::new();
    for (name, descriptor) in requested {
        match name.as_str() {
            ETH_ACCOUNTS_PERMISSION => {
                let seed = seed.get_or_insert_with(LegacySeed::default);
                seed.accounts = caveat_values(&descriptor, RESTRICT_ACCOUNTS_CAVEAT)
                    .filter_map(|value| value.as_str()?.parse().ok())
                    .collect();
            }
            PERMITTED_CHAINS_PERMISSION => {
                let seed = seed.get_or_insert_with(LegacySeed::default);
                seed.chain_ids = caveat_values(&descriptor, RESTRICT_CHAINS_CAVEAT)
                    .filter_map(|value| validate_chain_id(value).ok())
                    .collect();
            }
            _ => {
                leftover.insert(name, descriptor);
            }
        }
    }
    (seed, leftover)
}

/// Iterates the `value` array of the first caveat of the given type inside
/// a permission descriptor.
fn caveat_values<'a>(
    descriptor: &'a Value,
    caveat_type: &str,
) -> impl Iterator<Item = &'a Value> {
    descriptor
        .get("caveats")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(move |caveat| caveat.get("type").and_then(Value::as_str) == Some(caveat_type))
        .filter_map(|caveat| caveat.get("value")?.as_array())
        .flatten()
}
