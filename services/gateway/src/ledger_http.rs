//! HTTP implementation of the ledger client, talking JSON to a registry
//! node. Confirmation is poll-based with a bounded overall wait.

use std::time::Duration;

use async_trait::async_trait;
use chainsync::{
    LedgerClient, LedgerDatasetRecord, LedgerError, LedgerEvent, LedgerResult, PendingTx, Receipt,
    RegisterDataset, RejectReason,
};
use royalty::Address;
use serde::Deserialize;
use serde_json::json;

pub struct HttpLedgerClient {
    base_url: String,
    client: reqwest::Client,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

#[derive(Deserialize)]
struct NonceResponse {
    nonce: u64,
}

#[derive(Deserialize)]
struct SubmitResponse {
    tx_hash: String,
}

#[derive(Deserialize)]
struct RejectBody {
    reason: String,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Deserialize)]
struct TxStatusResponse {
    status: String, // "pending" | "confirmed" | "reverted"
    #[serde(default)]
    block: u64,
    #[serde(default)]
    events: Vec<LedgerEvent>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpLedgerClient {
    pub fn new(base_url: String, confirm_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            confirm_timeout,
            poll_interval,
        }
    }

    pub async fn ping(&self) -> LedgerResult<()> {
        let url = format!("{}/health", self.base_url);
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?
            .error_for_status()
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;
        Ok(())
    }

    /// POST a transaction. A 409 is the node refusing to broadcast (no nonce
    /// consumed); anything else non-2xx is an RPC failure.
    async fn submit(&self, path: &str, body: serde_json::Value, nonce: u64) -> LedgerResult<PendingTx> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::CONFLICT {
            let reject: RejectBody = resp
                .json()
                .await
                .map_err(|e| LedgerError::Rpc(e.to_string()))?;
            let reason = match reject.reason.as_str() {
                "contributor_exists" => RejectReason::ContributorExists,
                "percentage_overflow" => RejectReason::PercentageOverflow,
                other => RejectReason::Other(
                    reject.detail.unwrap_or_else(|| other.to_string()),
                ),
            };
            return Err(LedgerError::Rejected(reason));
        }
        if !resp.status().is_success() {
            return Err(LedgerError::Rpc(format!("HTTP {}", resp.status())));
        }

        let out: SubmitResponse = resp
            .json()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;
        Ok(PendingTx {
            hash: out.tx_hash,
            nonce,
        })
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn transaction_count(&self, signer: &Address) -> LedgerResult<u64> {
        let url = format!("{}/accounts/{}/nonce", self.base_url, signer);
        let resp: NonceResponse = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?
            .error_for_status()
            .map_err(|e| LedgerError::Rpc(e.to_string()))?
            .json()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;
        Ok(resp.nonce)
    }

    async fn dataset_record(&self, ledger_id: u64) -> LedgerResult<Option<LedgerDatasetRecord>> {
        let url = format!("{}/datasets/{ledger_id}", self.base_url);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(LedgerError::Rpc(format!("HTTP {}", resp.status())));
        }
        let record: LedgerDatasetRecord = resp
            .json()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;
        Ok(Some(record))
    }

    async fn submit_register_dataset(
        &self,
        req: &RegisterDataset,
        nonce: u64,
    ) -> LedgerResult<PendingTx> {
        let body = json!({
            "name": req.name,
            "owner": req.owner,
            "nonce": nonce,
        });
        self.submit("/transactions/register-dataset", body, nonce).await
    }

    async fn submit_add_contributor(
        &self,
        ledger_id: u64,
        contributor: &Address,
        percentage: u8,
        nonce: u64,
    ) -> LedgerResult<PendingTx> {
        let body = json!({
            "ledger_id": ledger_id,
            "address": contributor,
            "percentage": percentage,
            "nonce": nonce,
        });
        self.submit("/transactions/add-contributor", body, nonce).await
    }

    async fn submit_distribute(
        &self,
        ledger_id: u64,
        amount: u64,
        nonce: u64,
    ) -> LedgerResult<PendingTx> {
        let body = json!({
            "ledger_id": ledger_id,
            "amount": amount,
            "nonce": nonce,
        });
        self.submit("/transactions/distribute", body, nonce).await
    }

    async fn await_confirmation(&self, tx: &PendingTx) -> LedgerResult<Receipt> {
        let url = format!("{}/transactions/{}", self.base_url, tx.hash);
        let deadline = tokio::time::Instant::now() + self.confirm_timeout;

        loop {
            let status: TxStatusResponse = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| LedgerError::Rpc(e.to_string()))?
                .error_for_status()
                .map_err(|e| LedgerError::Rpc(e.to_string()))?
                .json()
                .await
                .map_err(|e| LedgerError::Rpc(e.to_string()))?;

            match status.status.as_str() {
                "confirmed" => {
                    return Ok(Receipt {
                        tx_hash: tx.hash.clone(),
                        block: status.block,
                        events: status.events,
                    });
                }
                "reverted" => {
                    return Err(LedgerError::Reverted(
                        status.error.unwrap_or_else(|| "reverted".to_string()),
                    ));
                }
                _ => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(LedgerError::ConfirmationTimeout);
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}
