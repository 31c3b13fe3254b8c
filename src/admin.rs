//! Admin HTTP surface (spec §6): a small read/control API over the shared
//! [`Store`], served with `axum` on a configurable bind address.
//!
//! - `GET /getAMBs?chainId=<c>&txHash=<h>` — AMBMessage records for a tx.
//! - `POST /prioritiseAMBMessage` — flips a message's priority flag so it
//!   skips the pending queue's delay.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::model::{AMBMessage, BridgeKind, ChainId, MessageIdentifier};
use crate::store::Store;

pub fn router(store: Store) -> Router {
    Router::new()
        .route("/getAMBs", get(get_ambs))
        .route("/prioritiseAMBMessage", post(prioritise_amb_message))
        .with_state(store)
}

#[derive(Debug, Deserialize)]
struct GetAmbsQuery {
    #[serde(rename = "chainId")]
    chain_id: Option<u64>,
    #[serde(rename = "txHash")]
    tx_hash: Option<alloy_primitives::TxHash>,
}

/// `400` on missing parameters, matching spec §6 exactly: both `chainId` and
/// `txHash` are required.
#[instrument(skip(store))]
async fn get_ambs(State(store): State<Store>, Query(query): Query<GetAmbsQuery>) -> Response {
    let (Some(chain_id), Some(tx_hash)) = (query.chain_id, query.tx_hash) else {
        return (StatusCode::BAD_REQUEST, "chainId and txHash are required").into_response();
    };

    let messages: Vec<AMBMessage> = store
        .messages_for_tx_hash(&tx_hash)
        .into_iter()
        .filter(|m| m.identifier.source_chain == ChainId(chain_id))
        .collect();

    Json(messages).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrioritiseRequest {
    message_identifier: alloy_primitives::FixedBytes<32>,
    #[serde(default)]
    amb: Option<BridgeKind>,
    source_chain_id: u64,
    destination_chain_id: u64,
}

#[derive(Debug, Serialize)]
struct PrioritiseResponse {
    ok: bool,
}

#[instrument(skip(store), fields(bridge = ?request.amb))]
async fn prioritise_amb_message(
    State(store): State<Store>,
    Json(request): Json<PrioritiseRequest>,
) -> Response {
    let identifier = MessageIdentifier {
        source_chain: ChainId(request.source_chain_id),
        destination_chain: ChainId(request.destination_chain_id),
        message_id: request.message_identifier,
    };
    store.set_priority(identifier, true);
    Json(PrioritiseResponse { ok: true }).into_response()
}
