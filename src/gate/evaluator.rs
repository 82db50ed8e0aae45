//! Risk evaluation client.
//!
//! Sends the normalized transaction descriptor to the external policy service
//! and turns its answer into a [`Verdict`]. Evaluation never returns an error:
//! any failure to obtain an answer becomes a fail-closed soft-failure verdict.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::blockchain::DecodedTransaction;
use crate::config::RiskConfig;
use crate::gate::types::{SoftFailure, Verdict, VerdictSource, APPROVED};

const DEFAULT_MESSAGE: &str = "Transaction evaluated successfully.";

/// Body posted to the risk service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskRequest {
    #[serde(rename = "chainId")]
    pub chain_id: u64,
    /// EIP-55 checksummed sender.
    pub from_address: String,
    /// EIP-55 checksummed recipient, null for contract creation.
    pub to_address: Option<String>,
    /// Call data as `0x`-prefixed hex, `0x` when empty.
    pub data: String,
    /// Decimal string, avoids precision loss in JSON consumers.
    pub value: String,
    /// Correlated intent, empty when none.
    pub reason: String,
}

impl RiskRequest {
    pub fn from_decoded(tx: &DecodedTransaction, chain_id: u64, intent: &str) -> Self {
        Self {
            chain_id,
            from_address: tx.sender.to_checksum(None),
            to_address: tx.to.map(|to| to.to_checksum(None)),
            data: tx.input.to_string(),
            value: tx.value.to_string(),
            reason: intent.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RiskResponse {
    #[serde(default)]
    validations: Validations,
}

#[derive(Debug, Default, Deserialize)]
struct Validations {
    #[serde(default)]
    agent: AgentValidation,
}

#[derive(Debug, Default, Deserialize)]
struct AgentValidation {
    status: Option<String>,
    message: Option<String>,
    risks_detected: Option<Vec<Value>>,
}

impl From<RiskResponse> for Verdict {
    fn from(response: RiskResponse) -> Self {
        let agent = response.validations.agent;
        Verdict {
            status: agent.status.unwrap_or_else(|| APPROVED.to_string()),
            message: agent.message.unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
            risks_detected: agent.risks_detected.unwrap_or_default(),
            source: VerdictSource::Policy,
        }
    }
}

/// Client for the external risk-evaluation service.
#[derive(Debug, Clone)]
pub struct RiskEvaluator {
    http: reqwest::Client,
    api_url: String,
    timeout_secs: u64,
}

impl RiskEvaluator {
    pub fn new(config: &RiskConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// Evaluate a transaction. Never fails; see module docs.
    pub async fn evaluate(&self, request: &RiskRequest) -> Verdict {
        let response = match self.http.post(&self.api_url).json(request).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return self.soft_fail(SoftFailure::Timeout {
                    after_secs: self.timeout_secs,
                })
            }
            Err(e) => {
                return self.soft_fail(SoftFailure::Transport {
                    detail: e.to_string(),
                })
            }
        };

        let status = response.status();
        if status.as_u16() > 299 {
            let body = response.text().await.unwrap_or_default();
            tracing::info!(status = status.as_u16(), body = %body, "Error response from risk service");
            return self.soft_fail(SoftFailure::HttpStatus {
                status: status.as_u16(),
            });
        }

        match response.json::<RiskResponse>().await {
            Ok(parsed) => {
                let verdict = Verdict::from(parsed);
                tracing::info!(
                    status = %verdict.status,
                    message = %verdict.message,
                    risks = verdict.risks_detected.len(),
                    "Risk service verdict"
                );
                verdict
            }
            Err(e) if e.is_timeout() => self.soft_fail(SoftFailure::Timeout {
                after_secs: self.timeout_secs,
            }),
            Err(e) => self.soft_fail(SoftFailure::MalformedBody {
                detail: e.to_string(),
            }),
        }
    }

    fn soft_fail(&self, failure: SoftFailure) -> Verdict {
        tracing::warn!(
            soft_failure = failure.label(),
            detail = ?failure,
            api_url = %self.api_url,
            "Risk evaluation failed, failing closed"
        );
        Verdict::soft_failure(failure)
    }
}
