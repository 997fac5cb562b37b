//! `wallet_switchEthereumChain` / `wallet_addEthereumChain` behavior: the
//! switch orchestrator rules and the add-chain flow chaining.

use crate::utils::{MockHost, ORIGIN, api, legacy_caveat, multichain_caveat, request};
use serde_json::{Value, json};
use warden::WalletError;

fn switch(chain_id: &str) -> warden_core::request::WalletRequest {
    request("wallet_switchEthereumChain", json!([{ "chainId": chain_id }]))
}

fn polygon_params() -> Value {
    json!([{
        "chainId": "0x89",
        "chainName": "Polygon",
        "nativeCurrency": { "symbol": "MATIC", "decimals": 18 },
        "rpcUrls": ["https://polygon-rpc.com"],
        "blockExplorerUrls": ["https://polygonscan.com"],
    }])
}

#[tokio::test]
async fn switching_to_the_current_chain_is_a_noop() {
    let host = MockHost::new();
    host.add_network(1, "ETH", "https://eth.example");
    host.set_current_chain(ORIGIN, 1);

    let result = api(&host).execute(ORIGIN, switch("0x1")).await;
    assert_eq!(result.success_value(), Some(&Value::Null));

    assert!(host.set_active_calls().is_empty());
    assert!(host.permission_prompts().is_empty());
    assert!(host.started_flows().is_empty());
}

#[tokio::test]
async fn switching_to_an_unknown_chain_is_4902() {
    let host = MockHost::new();
    host.set_current_chain(ORIGIN, 1);

    let result = api(&host).execute(ORIGIN, switch("0x64")).await;
    let err = result.error_value().unwrap();
    assert_eq!(err.code.code(), 4902);
    assert_eq!(
        err.message,
        "Unrecognized chain ID \"0x64\". Try adding the chain using wallet_addEthereumChain first."
    );
    assert!(host.set_active_calls().is_empty());
}

#[tokio::test]
async fn fresh_origin_is_prompted_and_granted() {
    let host = MockHost::new();
    host.add_network(137, "MATIC", "https://polygon-rpc.com");
    host.set_current_chain(ORIGIN, 1);

    let result = api(&host).execute(ORIGIN, switch("0x89")).await;
    assert_eq!(result.success_value(), Some(&Value::Null));

    let prompts = host.permission_prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].requested_chain_ids, [137]);

    let caveat = host.caveat(ORIGIN).unwrap();
    assert!(!caveat.is_multichain_origin);
    assert!(caveat.required_scopes.is_empty());
    assert_eq!(warden_core::adapters::get_permitted_eth_chain_ids(&caveat), [137]);
    assert!(warden_core::adapters::get_eth_accounts(&caveat).is_empty());

    assert_eq!(
        host.set_active_calls(),
        [(ORIGIN.to_string(), "client-0x89".to_string())]
    );
}

#[tokio::test]
async fn permitted_chain_switches_without_a_prompt() {
    let host = MockHost::new();
    host.add_network(137, "MATIC", "https://polygon-rpc.com");
    host.set_current_chain(ORIGIN, 1);
    host.set_caveat(ORIGIN, legacy_caveat(&[1, 137], &[]));

    let result = api(&host).execute(ORIGIN, switch("0x89")).await;
    assert_eq!(result.success_value(), Some(&Value::Null));
    assert!(host.permission_prompts().is_empty());
    assert_eq!(host.set_active_calls().len(), 1);
}

#[tokio::test]
async fn multichain_grants_lock_out_legacy_switching() {
    let host = MockHost::new();
    host.add_network(1, "ETH", "https://eth.example");
    host.set_current_chain(ORIGIN, 137);
    host.set_caveat(ORIGIN, multichain_caveat(&[137], &[]));

    let result = api(&host).execute(ORIGIN, switch("0x1")).await;
    let err = result.error_value().unwrap();
    assert_eq!(err.code.code(), 4100);
    assert_eq!(
        err.message,
        "Cannot switch to or add permissions for chainId '0x1' because permissions were granted over the Multichain API."
    );
    assert!(host.set_active_calls().is_empty());
    assert!(host.permission_prompts().is_empty());
    // the grant is untouched
    assert_eq!(host.caveat(ORIGIN).unwrap(), multichain_caveat(&[137], &[]));
}

#[tokio::test]
async fn legacy_grant_is_extended_after_an_incremental_prompt() {
    let host = MockHost::new();
    host.add_network(137, "MATIC", "https://polygon-rpc.com");
    host.set_current_chain(ORIGIN, 1);
    host.set_caveat(ORIGIN, legacy_caveat(&[1], &[]));

    let result = api(&host).execute(ORIGIN, switch("0x89")).await;
    assert_eq!(result.success_value(), Some(&Value::Null));

    assert_eq!(host.permission_prompts().len(), 1);
    let caveat = host.caveat(ORIGIN).unwrap();
    assert_eq!(warden_core::adapters::get_permitted_eth_chain_ids(&caveat), [1, 137]);
    assert_eq!(host.set_active_calls().len(), 1);
}

#[tokio::test]
async fn bare_switch_rejection_propagates() {
    let host = MockHost::new();
    host.add_network(137, "MATIC", "https://polygon-rpc.com");
    host.set_current_chain(ORIGIN, 1);
    host.queue_permission_approval(Err(WalletError::UserRejected));

    let result = api(&host).execute(ORIGIN, switch("0x89")).await;
    let err = result.error_value().unwrap();
    assert_eq!(err.code.code(), 4001);
    assert!(host.set_active_calls().is_empty());
    assert!(host.caveat(ORIGIN).is_none());
}

#[tokio::test]
async fn add_chain_runs_the_full_two_prompt_flow() {
    let host = MockHost::new();
    host.set_current_chain(ORIGIN, 1);

    let result =
        api(&host).execute(ORIGIN, request("wallet_addEthereumChain", polygon_params())).await;
    assert_eq!(result.success_value(), Some(&Value::Null));

    // add approval, then network upsert
    let add_prompts = host.add_chain_prompts();
    assert_eq!(add_prompts.len(), 1);
    assert_eq!(add_prompts[0].chain_name, "Polygon");
    let upserts = host.upserts();
    assert_eq!(upserts.len(), 1);
    assert_eq!(upserts[0].ticker, "MATIC");
    assert_eq!(upserts[0].rpc_url.as_str(), "https://polygon-rpc.com/");

    // then the switch prompt for 0x89 and the network change
    let prompts = host.permission_prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].requested_chain_ids, [137]);
    assert_eq!(
        host.set_active_calls(),
        [(ORIGIN.to_string(), "client-0x89".to_string())]
    );

    // one flow, ended exactly once
    assert_eq!(host.started_flows().len(), 1);
    assert_eq!(host.ended_flows(), host.started_flows());
}

#[tokio::test]
async fn declining_the_chained_switch_is_still_success() {
    let host = MockHost::new();
    host.set_current_chain(ORIGIN, 1);
    host.queue_permission_approval(Err(WalletError::UserRejected));

    let result =
        api(&host).execute(ORIGIN, request("wallet_addEthereumChain", polygon_params())).await;
    // the chain was added; not switching is the user's choice, not an error
    assert_eq!(result.success_value(), Some(&Value::Null));

    assert_eq!(host.upserts().len(), 1);
    assert!(host.set_active_calls().is_empty());
    assert!(host.caveat(ORIGIN).is_none());
    assert_eq!(host.ended_flows(), host.started_flows());
    assert_eq!(host.started_flows().len(), 1);
}

#[tokio::test]
async fn add_flow_extends_a_legacy_grant_without_a_second_prompt() {
    let host = MockHost::new();
    host.set_current_chain(ORIGIN, 1);
    host.set_caveat(ORIGIN, legacy_caveat(&[1], &[]));

    let result =
        api(&host).execute(ORIGIN, request("wallet_addEthereumChain", polygon_params())).await;
    assert_eq!(result.success_value(), Some(&Value::Null));

    // the add approval covered consent; no incremental permission prompt
    assert_eq!(host.add_chain_prompts().len(), 1);
    assert!(host.permission_prompts().is_empty());

    let caveat = host.caveat(ORIGIN).unwrap();
    assert_eq!(warden_core::adapters::get_permitted_eth_chain_ids(&caveat), [1, 137]);
    assert_eq!(host.set_active_calls().len(), 1);
    assert_eq!(host.ended_flows(), host.started_flows());
}

#[tokio::test]
async fn adding_a_known_endpoint_skips_the_add_prompt() {
    let host = MockHost::new();
    host.add_network(137, "MATIC", "https://polygon-rpc.com");
    host.set_current_chain(ORIGIN, 1);
    host.set_caveat(ORIGIN, legacy_caveat(&[137], &[]));

    let result =
        api(&host).execute(ORIGIN, request("wallet_addEthereumChain", polygon_params())).await;
    assert_eq!(result.success_value(), Some(&Value::Null));

    assert!(host.add_chain_prompts().is_empty());
    assert!(host.upserts().is_empty());
    assert!(host.started_flows().is_empty());
    assert_eq!(host.set_active_calls().len(), 1);
}

#[tokio::test]
async fn adding_the_current_chain_only_records_the_network() {
    let host = MockHost::new();
    host.set_current_chain(ORIGIN, 137);

    let result =
        api(&host).execute(ORIGIN, request("wallet_addEthereumChain", polygon_params())).await;
    assert_eq!(result.success_value(), Some(&Value::Null));

    assert_eq!(host.upserts().len(), 1);
    assert!(host.permission_prompts().is_empty());
    assert!(host.set_active_calls().is_empty());
    // the flow opened for the add is still closed
    assert_eq!(host.started_flows().len(), 1);
    assert_eq!(host.ended_flows(), host.started_flows());
}

#[tokio::test]
async fn ticker_mismatch_against_an_existing_network_is_rejected() {
    let host = MockHost::new();
    host.add_network(137, "MATIC", "https://polygon-rpc.com");
    host.set_current_chain(ORIGIN, 1);

    let mut params = polygon_params();
    params[0]["nativeCurrency"]["symbol"] = json!("WRONG");
    let result = api(&host).execute(ORIGIN, request("wallet_addEthereumChain", params)).await;

    let err = result.error_value().unwrap();
    assert_eq!(err.code.code(), -32602);
    assert_eq!(
        err.message,
        "nativeCurrency.symbol does not match currency symbol for a network the user already has added with the same chainId. Received:\nWRONG"
    );
    assert!(host.started_flows().is_empty());
    assert!(host.upserts().is_empty());
}

#[tokio::test]
async fn preapproved_switch_grants_without_a_prompt() {
    let host = MockHost::new();
    host.add_network(137, "MATIC", "https://polygon-rpc.com");
    host.set_current_chain(ORIGIN, 1);

    api(&host).switch_chain_preapproved(ORIGIN, 137).await.unwrap();

    assert!(host.permission_prompts().is_empty());
    let caveat = host.caveat(ORIGIN).unwrap();
    assert!(!caveat.is_multichain_origin);
    assert_eq!(warden_core::adapters::get_permitted_eth_chain_ids(&caveat), [137]);
    assert_eq!(
        host.set_active_calls(),
        [(ORIGIN.to_string(), "client-0x89".to_string())]
    );
}

#[tokio::test]
async fn preapproved_switch_extends_a_legacy_grant_silently() {
    let host = MockHost::new();
    host.add_network(137, "MATIC", "https://polygon-rpc.com");
    host.set_current_chain(ORIGIN, 1);
    host.set_caveat(ORIGIN, legacy_caveat(&[1], &[]));

    api(&host).switch_chain_preapproved(ORIGIN, 137).await.unwrap();

    assert!(host.permission_prompts().is_empty());
    let caveat = host.caveat(ORIGIN).unwrap();
    assert_eq!(warden_core::adapters::get_permitted_eth_chain_ids(&caveat), [1, 137]);
    assert_eq!(host.set_active_calls().len(), 1);
}

#[tokio::test]
async fn preapproved_switch_still_respects_the_multichain_lockout() {
    let host = MockHost::new();
    host.add_network(1, "ETH", "https://eth.example");
    host.set_current_chain(ORIGIN, 137);
    host.set_caveat(ORIGIN, multichain_caveat(&[137], &[]));

    let err = api(&host).switch_chain_preapproved(ORIGIN, 1).await.unwrap_err();
    assert!(matches!(err, WalletError::MultichainOriginLockout(1)));
    assert!(host.set_active_calls().is_empty());
    assert_eq!(host.caveat(ORIGIN).unwrap(), multichain_caveat(&[137], &[]));
}

#[tokio::test]
async fn rejecting_the_add_prompt_closes_the_flow() {
    let host = MockHost::new();
    host.set_current_chain(ORIGIN, 1);
    host.queue_add_chain_approval(Err(WalletError::UserRejected));

    let result =
        api(&host).execute(ORIGIN, request("wallet_addEthereumChain", polygon_params())).await;
    // no approval flow id was attached yet, so the rejection surfaces
    assert_eq!(result.error_value().unwrap().code.code(), 4001);

    assert!(host.upserts().is_empty());
    assert!(host.set_active_calls().is_empty());
    assert_eq!(host.started_flows().len(), 1);
    assert_eq!(host.ended_flows(), host.started_flows());
}
