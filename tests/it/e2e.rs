//! Wire-level scenarios: serialized request in, serialized response out.

use crate::{init_tracing, mock::MockChain};
use bellows::chain::ChainEvent;
use bellows::filter::WsConn;
use bellows::{eth, net, web3, Dispatcher, Eth, FilterManager, Net, Web3};
use bellows_core::eth::{Header, HexU64};
use bellows_rpc::error::ErrorObject;
use ethers_core::types::{TransactionReceipt, H256};
use serde_json::{json, Value};
use std::{io, sync::Arc, time::Duration};
use tokio::sync::mpsc;

fn hash(n: u64) -> H256 {
    H256::from_low_u64_be(n)
}

fn header(number: u64) -> Header {
    Header { hash: hash(number + 100), number: HexU64(number), ..Default::default() }
}

fn rpc(chain: Arc<MockChain>) -> (Dispatcher, Arc<FilterManager>) {
    let filters = Arc::new(FilterManager::new(chain.clone(), Duration::from_secs(60)));
    let eth_api = Arc::new(Eth::new(chain.clone(), Arc::clone(&filters)));
    let net_api = Arc::new(Net::new(chain.clone()));
    let web3_api = Arc::new(Web3::new(chain));

    let mut dispatcher = Dispatcher::default().with_filter_manager(Arc::clone(&filters));
    dispatcher.register("eth", eth::namespace(eth_api));
    dispatcher.register("net", net::namespace(net_api));
    dispatcher.register("web3", web3::namespace(web3_api));
    (dispatcher, filters)
}

fn call(dispatcher: &Dispatcher, method: &str, params: Value) -> Result<Value, ErrorObject> {
    let body = serde_json::to_vec(&json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    }))
    .unwrap();
    let response = dispatcher.handle(&body).map_err(|fail| fail.error)?;
    let response: Value = serde_json::from_slice(&response).unwrap();
    assert_eq!(response["jsonrpc"], "2.0");
    assert_eq!(response["id"], 1);
    Ok(response["result"].clone())
}

#[test]
fn web3_sha3() {
    let (dispatcher, _) = rpc(MockChain::new());
    let result = call(&dispatcher, "web3_sha3", json!(["0x0102"])).unwrap();
    assert_eq!(
        result,
        json!("0x22ae6da6b482f9b1b19b0b897c3fd43884180a1c5ee361e1107a1bc635649dda"),
    );
}

#[test]
fn web3_client_version() {
    let (dispatcher, _) = rpc(MockChain::new());
    let result = call(&dispatcher, "web3_clientVersion", json!([])).unwrap();
    assert_eq!(result, json!("bellows/test"));
}

#[test]
fn net_methods() {
    let (dispatcher, _) = rpc(MockChain::new());
    assert_eq!(call(&dispatcher, "net_version", json!([])).unwrap(), json!("0x1"));
    assert_eq!(call(&dispatcher, "net_listening", json!([])).unwrap(), json!(true));
    assert_eq!(call(&dispatcher, "net_peerCount", json!([])).unwrap(), json!("0xa"));
}

#[test]
fn eth_block_number_renders_hex() {
    let chain = MockChain::new();
    chain.push_header(header(10));
    let (dispatcher, _) = rpc(chain);

    let result = call(&dispatcher, "eth_blockNumber", json!([])).unwrap();
    assert_eq!(result, json!("0xa"));
}

#[test]
fn eth_chain_id() {
    let (dispatcher, _) = rpc(MockChain::new());
    assert_eq!(call(&dispatcher, "eth_chainId", json!([])).unwrap(), json!("0x1"));
}

#[test]
fn earliest_header_is_internal_error() {
    let chain = MockChain::new();
    chain.push_header(header(10));
    let (dispatcher, _) = rpc(chain);

    let err = call(&dispatcher, "eth_getBlockByNumber", json!(["earliest", false])).unwrap_err();
    assert_eq!(err.code, -32603);
    // handler error text never reaches the client
    assert_eq!(err.message, "internal error");
}

#[test]
fn inverted_log_range_is_internal_error() {
    let chain = MockChain::new();
    chain.push_header(header(20));
    let (dispatcher, _) = rpc(chain);

    let err = call(
        &dispatcher,
        "eth_getLogs",
        json!([{"fromBlock": "0xa", "toBlock": "0x5"}]),
    )
    .unwrap_err();
    assert_eq!(err.code, -32603);
    assert_eq!(err.message, "internal error");
}

#[test]
fn unknown_namespace_and_method() {
    let (dispatcher, _) = rpc(MockChain::new());

    let err = call(&dispatcher, "eth2_blockNumber", json!([])).unwrap_err();
    assert_eq!(err.code, -32601);

    let err = call(&dispatcher, "eth_nope", json!([])).unwrap_err();
    assert_eq!(err.code, -32601);
    assert!(err.message.contains("eth_nope"));

    let err = call(&dispatcher, "blockNumber", json!([])).unwrap_err();
    assert_eq!(err.code, -32601);
}

#[test]
fn error_responses_echo_the_request_id() {
    let (dispatcher, _) = rpc(MockChain::new());

    let body = serde_json::to_vec(&json!({
        "jsonrpc": "2.0",
        "id": 42,
        "method": "eth_nope",
        "params": [],
    }))
    .unwrap();
    let fail = dispatcher.handle(&body).unwrap_err();
    assert_eq!(fail.error.code, -32601);

    let response = serde_json::to_value(fail.into_response()).unwrap();
    assert_eq!(response["jsonrpc"], "2.0");
    assert_eq!(response["id"], 42);
    assert_eq!(response["error"]["code"], -32601);

    // only an unparseable envelope loses its id
    let fail = dispatcher.handle(b"{not json").unwrap_err();
    let response = serde_json::to_value(fail.into_response()).unwrap();
    assert_eq!(response["id"], json!(null));
    assert_eq!(response["error"]["code"], -32600);
}

#[test]
fn bad_params_name_the_method() {
    let (dispatcher, _) = rpc(MockChain::new());
    let err = call(&dispatcher, "eth_getBlockByNumber", json!(["latest"])).unwrap_err();
    assert_eq!(err.code, -32602);
    assert_eq!(err.message, "invalid arguments to eth_getBlockByNumber");
}

#[tokio::test]
async fn filter_install_event_poll() {
    init_tracing();

    let chain = MockChain::new();
    let (dispatcher, filters) = rpc(chain.clone());
    tokio::spawn(Arc::clone(&filters).run());

    let id = call(
        &dispatcher,
        "eth_newFilter",
        json!([{"topics": [[hash(1)]]}]),
    )
    .unwrap();
    let id = id.as_str().unwrap().to_string();

    chain.add_receipts(
        hash(101),
        vec![TransactionReceipt {
            logs: vec![ethers_core::types::Log { topics: vec![hash(1)], ..Default::default() }],
            ..Default::default()
        }],
    );
    chain.emit_event(ChainEvent { new_chain: vec![header(1)], ..Default::default() });

    tokio::time::sleep(Duration::from_millis(500)).await;

    let changes = call(&dispatcher, "eth_getFilterChanges", json!([&id])).unwrap();
    let logs = changes.as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["removed"], json!(false));

    // a second poll with no intervening events is empty
    let changes = call(&dispatcher, "eth_getFilterChanges", json!([&id])).unwrap();
    assert_eq!(changes, json!([]));

    // uninstalling twice reports the second attempt as a no-op
    assert_eq!(call(&dispatcher, "eth_uninstallFilter", json!([&id])).unwrap(), json!(true));
    assert_eq!(call(&dispatcher, "eth_uninstallFilter", json!([&id])).unwrap(), json!(false));
}

#[test]
fn expired_filter_is_gone_from_the_wire() {
    let chain = MockChain::new();
    let filters = Arc::new(FilterManager::new(chain.clone(), Duration::from_millis(0)));
    let eth_api = Arc::new(Eth::new(chain, Arc::clone(&filters)));
    let mut dispatcher = Dispatcher::default();
    dispatcher.register("eth", eth::namespace(eth_api));

    let id = call(&dispatcher, "eth_newBlockFilter", json!([])).unwrap();
    std::thread::sleep(Duration::from_millis(50));

    let err = call(&dispatcher, "eth_getFilterChanges", json!([id])).unwrap_err();
    assert_eq!(err.code, -32603);
}

struct RecordingWsConn {
    msgs: mpsc::UnboundedSender<String>,
}

impl WsConn for RecordingWsConn {
    fn write_message(&self, msg: &str) -> io::Result<()> {
        self.msgs
            .send(msg.to_string())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }
}

fn call_ws(
    dispatcher: &Dispatcher,
    conn: &Arc<dyn WsConn>,
    method: &str,
    params: Value,
) -> Result<Value, ErrorObject> {
    let body = serde_json::to_vec(&json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    }))
    .unwrap();
    let response = dispatcher.handle_ws(&body, conn).map_err(|fail| fail.error)?;
    let response: Value = serde_json::from_slice(&response).unwrap();
    Ok(response["result"].clone())
}

#[tokio::test]
async fn websocket_subscribe_new_heads() {
    init_tracing();

    let chain = MockChain::new();
    let (dispatcher, filters) = rpc(chain.clone());
    tokio::spawn(Arc::clone(&filters).run());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn: Arc<dyn WsConn> = Arc::new(RecordingWsConn { msgs: tx });

    let id = call_ws(&dispatcher, &conn, "eth_subscribe", json!(["newHeads"])).unwrap();
    let id = id.as_str().unwrap().to_string();

    // a websocket subscription is not pollable
    let err = call(&dispatcher, "eth_getFilterChanges", json!([&id])).unwrap_err();
    assert_eq!(err.code, -32603);

    chain.emit_event(ChainEvent { new_chain: vec![header(1)], ..Default::default() });

    let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("notification within deadline")
        .expect("writer alive");
    let notification: Value = serde_json::from_str(&msg).unwrap();
    assert_eq!(notification["method"], "eth_subscription");
    assert_eq!(notification["params"]["subscription"], json!(&id));
    assert_eq!(notification["params"]["result"], serde_json::to_value(hash(101)).unwrap());

    assert_eq!(
        call_ws(&dispatcher, &conn, "eth_unsubscribe", json!([&id])).unwrap(),
        json!(true),
    );
}

#[tokio::test]
async fn websocket_subscribe_logs() {
    init_tracing();

    let chain = MockChain::new();
    let (dispatcher, filters) = rpc(chain.clone());
    tokio::spawn(Arc::clone(&filters).run());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn: Arc<dyn WsConn> = Arc::new(RecordingWsConn { msgs: tx });

    call_ws(
        &dispatcher,
        &conn,
        "eth_subscribe",
        json!(["logs", {"topics": [[hash(1)]]}]),
    )
    .unwrap();

    chain.add_receipts(
        hash(101),
        vec![TransactionReceipt {
            logs: vec![ethers_core::types::Log { topics: vec![hash(1)], ..Default::default() }],
            ..Default::default()
        }],
    );
    chain.emit_event(ChainEvent { new_chain: vec![header(1)], ..Default::default() });

    let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("notification within deadline")
        .expect("writer alive");
    let notification: Value = serde_json::from_str(&msg).unwrap();
    assert_eq!(notification["params"]["result"]["topics"], json!([hash(1)]));
    assert_eq!(notification["params"]["result"]["removed"], json!(false));
}
