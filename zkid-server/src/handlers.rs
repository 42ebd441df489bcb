//! axum handlers for the HTTP surface. Each handler decodes its
//! body, forwards to `Verifier`, and re-serializes — no gate logic lives
//! here, these are thin wrappers around `AppState`/domain calls.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use zkid_core::{BundleEntry, VerifyOutcome};
use zkid_types::{AggregatedResult, FieldElement, ProofEnvelope, ProofResponse};

use crate::state::AppState;

const PROTOCOL_HEADER: &str = "x-zkid-protocol-version";

fn protocol_version_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(PROTOCOL_HEADER).and_then(|v| v.to_str().ok())
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(flatten)]
    pub response: ProofResponse,
    pub client_id: Option<String>,
    pub issuer: Option<String>,
}

pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<VerifyRequest>,
) -> (StatusCode, HeaderMap, Json<VerifyOutcome>) {
    let protocol_version = protocol_version_header(&headers).map(|s| s.to_string());
    let outcome = match &request.issuer {
        Some(issuer) => {
            state
                .verifier
                .verify_signed_proof(
                    &request.response,
                    issuer,
                    request.client_id.as_deref(),
                    protocol_version.as_deref(),
                )
                .await
        }
        None => {
            state
                .verifier
                .verify_proof(&request.response, request.client_id.as_deref(), protocol_version.as_deref())
                .await
        }
    };

    let mut response_headers = HeaderMap::new();
    response_headers.insert(PROTOCOL_HEADER, zkid_core::PROTOCOL_VERSION.parse().unwrap());

    let status = if outcome.verified { StatusCode::OK } else { StatusCode::UNAUTHORIZED };
    (status, response_headers, Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct ScenarioClaimEntry {
    pub label: String,
    pub proof: ProofEnvelope,
}

#[derive(Debug, Deserialize)]
pub struct ScenarioVerifyRequest {
    pub scenario_id: String,
    pub proofs: Vec<ScenarioClaimEntry>,
    pub nonce: String,
    pub request_timestamp_ms: i64,
    pub client_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScenarioVerifyResponse {
    #[serde(flatten)]
    pub result: AggregatedResult,
    pub error: Option<String>,
}

pub async fn verify_scenario(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ScenarioVerifyRequest>,
) -> (StatusCode, Json<ScenarioVerifyResponse>) {
    let protocol_version = protocol_version_header(&headers).map(|s| s.to_string());

    let Some(scenario) = state.scenarios.get(&request.scenario_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(ScenarioVerifyResponse {
                result: AggregatedResult {
                    all_verified: false,
                    verified_count: 0,
                    total_count: 0,
                    results: Vec::new(),
                },
                error: Some("UNKNOWN_SCENARIO".to_string()),
            }),
        );
    };

    let mut entries = Vec::with_capacity(request.proofs.len());
    for submitted in request.proofs {
        let Some(claim) = scenario.claims.iter().find(|c| c.label == submitted.label) else {
            return (
                StatusCode::BAD_REQUEST,
                Json(ScenarioVerifyResponse {
                    result: AggregatedResult {
                        all_verified: false,
                        verified_count: 0,
                        total_count: 0,
                        results: Vec::new(),
                    },
                    error: Some("UNKNOWN_CLAIM_LABEL".to_string()),
                }),
            );
        };
        entries.push(BundleEntry {
            label: submitted.label,
            envelope: submitted.proof,
            expected_min_age: claim.min_age.map(|a| a as u16),
            expected_nationality: claim.target_nationality,
        });
    }

    match state
        .verifier
        .verify_scenario_bundle(
            &entries,
            &request.nonce,
            request.request_timestamp_ms,
            request.client_id.as_deref(),
            protocol_version.as_deref(),
        )
        .await
    {
        Ok(result) => {
            let status = if result.all_verified { StatusCode::OK } else { StatusCode::UNAUTHORIZED };
            (status, Json(ScenarioVerifyResponse { result, error: None }))
        }
        Err(err) => (
            StatusCode::BAD_REQUEST,
            Json(ScenarioVerifyResponse {
                result: AggregatedResult {
                    all_verified: false,
                    verified_count: 0,
                    total_count: 0,
                    results: Vec::new(),
                },
                error: Some(err.public_message()),
            }),
        ),
    }
}

#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub nonce: String,
    pub request_timestamp: i64,
}

pub async fn create_challenge(State(state): State<AppState>) -> Json<ChallengeResponse> {
    let challenge = state.verifier.create_challenge().await;
    Json(ChallengeResponse {
        nonce: challenge.nonce,
        request_timestamp: challenge.request_timestamp_ms,
    })
}

pub async fn revocation_root(State(state): State<AppState>) -> Result<Json<zkid_types::RevocationRootInfo>, StatusCode> {
    let Some(backend) = &state.revocation_backend else {
        return Err(StatusCode::NOT_FOUND);
    };
    backend
        .get_root_info()
        .await
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[derive(Debug, Deserialize)]
pub struct WitnessQuery {
    pub commitment: String,
}

pub async fn revocation_witness(
    State(state): State<AppState>,
    Query(query): Query<WitnessQuery>,
) -> Result<Json<zkid_types::RevocationWitness>, StatusCode> {
    let Some(backend) = &state.revocation_backend else {
        return Err(StatusCode::NOT_FOUND);
    };
    let commitment = FieldElement::from_decimal(&query.commitment).map_err(|_| StatusCode::BAD_REQUEST)?;
    match backend.get_witness(&commitment).await {
        Ok(Some(witness)) => Ok(Json(witness)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub status: String,
}

pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        status: "ok".to_string(),
    })
}

pub async fn metrics(State(state): State<AppState>) -> String {
    format!(
        "# HELP zkid_verified_total Successful verifications.\n\
         # TYPE zkid_verified_total counter\n\
         zkid_verified_total {}\n\
         # HELP zkid_rejected_total Rejected verifications.\n\
         # TYPE zkid_rejected_total counter\n\
         zkid_rejected_total {}\n\
         # HELP zkid_verification_latency_ms_avg Mean verification latency in milliseconds.\n\
         # TYPE zkid_verification_latency_ms_avg gauge\n\
         zkid_verification_latency_ms_avg {}\n",
        state.counters.verified_total(),
        state.counters.rejected_total(),
        state.counters.mean_latency_ms(),
    )
}
