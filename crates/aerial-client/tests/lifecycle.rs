//! Transaction lifecycle tests against a scriptable in-memory node

use aerial_client::tx_builder::tx_hash;
use aerial_client::{
    AccountInfo, BroadcastResult, ClientError, Delegation, LedgerClient, NetworkConfig, NodeApi,
    Result, Reward, StakingPositions, TxBuilder, TxResponse, Validator,
};
use aerial_math::{Coin, Coins, Int};
use aerial_types::tx::sign_doc_bytes;
use aerial_types::{Address, MsgSend, TxEnvelope};
use aerial_wallet::LocalWallet;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory node whose behavior each test scripts through `State`
#[derive(Default)]
struct StubNode {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    account: Option<AccountInfo>,
    balances: Vec<Coin>,
    positions: StakingPositions,

    /// polls answered "not yet included" before the tx is visible
    include_after: u32,
    /// execution code recorded for included transactions
    include_code: u32,
    /// reject every broadcast with this code and log
    broadcast_reject: Option<(u32, String)>,
    /// enforce per-account sequence numbers on broadcast
    check_sequence: bool,
    expected_sequence: u64,
    /// fail every tx query at the transport level
    transport_error: bool,

    polls: u32,
    broadcasts: Vec<Vec<u8>>,
    included: HashMap<String, TxResponse>,
}

impl StubNode {
    fn new(configure: impl FnOnce(&mut State)) -> Arc<Self> {
        let stub = StubNode::default();
        configure(&mut stub.state.lock().unwrap());
        Arc::new(stub)
    }

    fn polls(&self) -> u32 {
        self.state.lock().unwrap().polls
    }

    fn broadcasts(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().broadcasts.clone()
    }
}

#[async_trait]
impl NodeApi for StubNode {
    async fn get_account(&self, address: &Address) -> Result<AccountInfo> {
        let state = self.state.lock().unwrap();
        state
            .account
            .clone()
            .ok_or_else(|| ClientError::NotFound(format!("account {address}")))
    }

    async fn get_balance(&self, _address: &Address, denom: &str) -> Result<Int> {
        let state = self.state.lock().unwrap();
        Ok(state
            .balances
            .iter()
            .filter(|c| c.denom == denom)
            .map(|c| c.amount.clone())
            .sum())
    }

    async fn get_all_balances(&self, _address: &Address) -> Result<Coins> {
        let state = self.state.lock().unwrap();
        Ok(Coins::new(state.balances.clone()))
    }

    async fn get_validators(&self) -> Result<Vec<Validator>> {
        Ok(Vec::new())
    }

    async fn get_staking_positions(&self, _address: &Address) -> Result<StakingPositions> {
        Ok(self.state.lock().unwrap().positions.clone())
    }

    async fn broadcast_tx(&self, tx_bytes: &[u8]) -> Result<BroadcastResult> {
        let mut state = self.state.lock().unwrap();
        state.broadcasts.push(tx_bytes.to_vec());

        if let Some((code, log)) = &state.broadcast_reject {
            return Ok(BroadcastResult {
                tx_hash: String::new(),
                code: *code,
                raw_log: log.clone(),
            });
        }

        let envelope = TxEnvelope::from_bytes(tx_bytes)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        let sequence = envelope.auth_info.signer_infos[0].sequence;
        let hash = tx_hash(tx_bytes);

        if state.check_sequence {
            if sequence != state.expected_sequence {
                return Ok(BroadcastResult {
                    tx_hash: hash,
                    code: 32,
                    raw_log: "account sequence mismatch".to_string(),
                });
            }
            state.expected_sequence += 1;
        }

        let code = state.include_code;
        state.included.insert(
            hash.clone(),
            TxResponse {
                tx_hash: hash.clone(),
                height: 42,
                code,
                raw_log: if code == 0 {
                    String::new()
                } else {
                    "out of gas".to_string()
                },
                gas_wanted: 200_000,
                gas_used: 87_654,
                timestamp: Some("2026-01-01T00:00:00Z".to_string()),
            },
        );

        Ok(BroadcastResult {
            tx_hash: hash,
            code: 0,
            raw_log: String::new(),
        })
    }

    async fn get_tx_by_hash(&self, hash: &str) -> Result<Option<TxResponse>> {
        let mut state = self.state.lock().unwrap();
        state.polls += 1;

        if state.transport_error {
            return Err(ClientError::Node {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }
        if state.polls <= state.include_after {
            return Ok(None);
        }
        Ok(state.included.get(hash).cloned())
    }
}

fn test_wallet() -> LocalWallet {
    LocalWallet::from_bytes(&[7u8; 32], "kii").unwrap()
}

fn other_address() -> Address {
    Address::from_pubkey(&[9u8; 33], "kii").unwrap()
}

fn client_over(stub: Arc<StubNode>) -> LedgerClient {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    LedgerClient::with_node(NetworkConfig::localnet(), stub).unwrap()
}

fn signed_send(wallet: &LocalWallet, sequence: u64, amount: u64) -> aerial_client::SignedTx {
    let msg = MsgSend::new(
        wallet.address().clone(),
        other_address(),
        Coins::one("ukii", Int::from_u64(amount)).unwrap(),
    );
    TxBuilder::new("localnet")
        .add_message(&msg)
        .unwrap()
        .account_number(1)
        .sequence(sequence)
        .fee_amount(Coins::one("ukii", Int::from_u64(5_000)).unwrap())
        .sign(wallet.private_key())
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn never_included_tx_times_out_within_budget() {
    let stub = StubNode::new(|state| {
        state.include_after = u32::MAX;
    });
    let client = client_over(stub.clone());

    let handle = client
        .broadcast_tx(&signed_send(&test_wallet(), 0, 10))
        .await
        .unwrap();

    let start = tokio::time::Instant::now();
    let result = handle
        .wait_to_complete_with(Duration::from_secs(2), 5)
        .await;

    match result {
        Err(ClientError::ConfirmationTimeout { attempts, .. }) => assert_eq!(attempts, 5),
        other => panic!("expected ConfirmationTimeout, got {other:?}"),
    }
    assert_eq!(stub.polls(), 5);

    // five polls with a sleep between each: bounded by attempts * interval
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(8), "elapsed {elapsed:?}");
    assert!(elapsed <= Duration::from_secs(10), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn tx_resolves_after_pending_polls() {
    let stub = StubNode::new(|state| {
        state.include_after = 2;
    });
    let client = client_over(stub.clone());

    let handle = client
        .broadcast_tx(&signed_send(&test_wallet(), 0, 10))
        .await
        .unwrap();
    let response = handle
        .wait_to_complete_with(Duration::from_secs(2), 10)
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.height, 42);
    assert_eq!(response.gas_used, 87_654);
    assert_eq!(stub.polls(), 3);
}

#[tokio::test(start_paused = true)]
async fn execution_failure_is_terminal() {
    let stub = StubNode::new(|state| {
        state.include_code = 11;
    });
    let client = client_over(stub.clone());

    let handle = client
        .broadcast_tx(&signed_send(&test_wallet(), 0, 10))
        .await
        .unwrap();
    let result = handle.wait_to_complete().await;

    match result {
        Err(ClientError::ExecutionFailure { code, log, .. }) => {
            assert_eq!(code, 11);
            assert_eq!(log, "out of gas");
        }
        other => panic!("expected ExecutionFailure, got {other:?}"),
    }
    // a failed execution is not polled again
    assert_eq!(stub.polls(), 1);
}

#[tokio::test]
async fn synchronous_rejection_yields_no_handle() {
    let stub = StubNode::new(|state| {
        state.broadcast_reject = Some((13, "insufficient fee".to_string()));
    });
    let client = client_over(stub.clone());

    let result = client.broadcast_tx(&signed_send(&test_wallet(), 0, 10)).await;
    match result {
        Err(ClientError::Broadcast { code, log }) => {
            assert_eq!(code, 13);
            assert_eq!(log, "insufficient fee");
        }
        other => panic!("expected Broadcast error, got {other:?}"),
    }
    assert_eq!(stub.polls(), 0);
}

#[tokio::test(start_paused = true)]
async fn transport_errors_consume_attempts() {
    let stub = StubNode::new(|state| {
        state.transport_error = true;
    });
    let client = client_over(stub.clone());

    let handle = client
        .broadcast_tx(&signed_send(&test_wallet(), 0, 10))
        .await
        .unwrap();

    let start = tokio::time::Instant::now();
    let result = handle
        .wait_to_complete_with(Duration::from_secs(1), 4)
        .await;

    // an unreachable node still resolves inside the attempt budget
    match result {
        Err(ClientError::ConfirmationTimeout { attempts, .. }) => assert_eq!(attempts, 4),
        other => panic!("expected ConfirmationTimeout, got {other:?}"),
    }
    assert_eq!(stub.polls(), 4);
    assert!(start.elapsed() <= Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn colliding_sequences_settle_at_most_once() {
    let stub = StubNode::new(|state| {
        state.check_sequence = true;
        state.expected_sequence = 0;
    });
    let client = client_over(stub.clone());
    let wallet = test_wallet();

    // both transactions were signed against sequence 0
    let tx_a = signed_send(&wallet, 0, 10);
    let tx_b = signed_send(&wallet, 0, 20);
    assert_ne!(tx_a.tx_hash, tx_b.tx_hash);

    let first = client.broadcast_tx(&tx_b).await.unwrap();
    let response = first.wait_to_complete().await.unwrap();
    assert!(response.is_success());

    // the second submission loses the sequence slot
    match client.broadcast_tx(&tx_a).await {
        Err(ClientError::Broadcast { code, log }) => {
            assert_eq!(code, 32);
            assert!(log.contains("sequence mismatch"));
        }
        other => panic!("expected Broadcast error, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn send_tokens_builds_signs_and_settles() {
    let stub = StubNode::new(|state| {
        state.account = Some(AccountInfo {
            address: String::new(),
            account_number: 9,
            sequence: 3,
        });
    });
    let client = client_over(stub.clone());
    let wallet = test_wallet();
    let destination = other_address();

    let handle = client
        .send_tokens(&destination, Int::from_u64(25), "ukii", &wallet)
        .await
        .unwrap();
    let response = handle.wait_to_complete().await.unwrap();
    assert!(response.is_success());

    // inspect what actually went over the wire
    let broadcasts = stub.broadcasts();
    assert_eq!(broadcasts.len(), 1);
    let envelope = TxEnvelope::from_bytes(&broadcasts[0]).unwrap();

    let signer = &envelope.auth_info.signer_infos[0];
    assert_eq!(signer.sequence, 3);
    assert_eq!(envelope.auth_info.fee.gas_limit, 200_000);
    assert_eq!(envelope.auth_info.fee.amount[0].amount, "5000");
    assert_eq!(envelope.auth_info.fee.amount[0].denom, "ukii");

    let msg = MsgSend::decode(&envelope.body.messages[0].value).unwrap();
    assert_eq!(msg.to_address, destination);
    assert_eq!(msg.amount.amount_of("ukii"), Int::from_u64(25));

    // the signature covers the canonical sign doc for this chain and account
    let sign_bytes = sign_doc_bytes(
        envelope.body.to_proto_bytes(),
        envelope.auth_info.to_proto_bytes(),
        "localnet",
        9,
    );
    wallet
        .public_key()
        .verify(&sign_bytes, &envelope.signatures[0])
        .unwrap();
}

#[tokio::test]
async fn sign_and_broadcast_requires_known_account() {
    let stub = StubNode::new(|_| {});
    let client = client_over(stub);
    let wallet = test_wallet();

    let msg = MsgSend::new(
        wallet.address().clone(),
        other_address(),
        Coins::one("ukii", Int::from_u64(1)).unwrap(),
    );
    let builder = client.tx_builder().add_message(&msg).unwrap();

    match client.sign_and_broadcast(builder, &wallet).await {
        Err(ClientError::NotFound(_)) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn absent_state_reads_as_empty() {
    let stub = StubNode::new(|_| {});
    let client = client_over(stub);
    let address = other_address();

    assert_eq!(
        client.query_bank_balance(&address, None).await.unwrap(),
        Int::zero()
    );
    assert!(client
        .query_bank_all_balances(&address)
        .await
        .unwrap()
        .is_empty());
    assert!(client.query_tx("DEADBEEF").await.unwrap().is_none());
}

#[tokio::test]
async fn balances_and_staking_summary_via_client() {
    let validator_a = Address::from_bytes(&[1u8; 20], "kiivaloper").unwrap();
    let validator_b = Address::from_bytes(&[2u8; 20], "kiivaloper").unwrap();

    let stub = StubNode::new(|state| {
        state.balances = vec![
            Coin::new("ukii", Int::from_u64(1_000_000)).unwrap(),
            Coin::new("foobar", Int::from_u64(7)).unwrap(),
        ];
        state.positions = StakingPositions {
            delegations: vec![
                Delegation {
                    validator: validator_a.clone(),
                    amount: Int::from_u64(10),
                },
                Delegation {
                    validator: validator_a.clone(),
                    amount: Int::from_u64(5),
                },
                Delegation {
                    validator: validator_b.clone(),
                    amount: Int::from_u64(30),
                },
            ],
            unbonding: vec![],
            rewards: vec![Reward {
                validator: validator_a.clone(),
                amount: Int::from_u64(2),
            }],
        };
    });
    let client = client_over(stub);
    let address = test_wallet().address().clone();

    assert_eq!(
        client.query_bank_balance(&address, None).await.unwrap(),
        Int::from_u64(1_000_000)
    );
    assert_eq!(
        client
            .query_bank_balance(&address, Some("foobar"))
            .await
            .unwrap(),
        Int::from_u64(7)
    );

    let summary = client.query_staking_summary(&address).await.unwrap();
    assert_eq!(summary.total_staked, Int::from_u64(45));
    assert_eq!(summary.total_rewards, Int::from_u64(2));

    let position_a = summary
        .current_positions
        .iter()
        .find(|p| p.validator == validator_a)
        .unwrap();
    assert_eq!(position_a.amount, Int::from_u64(15));
    assert_eq!(position_a.reward, Int::from_u64(2));
}
