use axum::{
    extract::{ConnectInfo, Request, State},
    http::{Method, StatusCode},
};
use chrono::Utc;
use std::net::SocketAddr;

use crate::ingest;
use crate::models::UnderstandingRecord;
use crate::state::AppState;

/// Collects one understanding beacon.
///
/// The reply is `200 OK` with body `OK` on every path through here, including
/// wrong methods, unparseable bodies and failed inserts. Problems only show up
/// in the server log.
pub async fn understand(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request,
) -> (StatusCode, &'static str) {
    collect(&state, remote, request).await;
    (StatusCode::OK, "OK")
}

async fn collect(state: &AppState, remote: SocketAddr, request: Request) {
    let (parts, body) = request.into_parts();
    if parts.method != Method::POST {
        tracing::warn!(method = %parts.method, "invalid method");
        return;
    }

    let ip_address = ingest::client_ip(&parts.headers, remote);

    let payload = match ingest::read_payload(body).await {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(error = %err, ip = %ip_address, "error parsing JSON");
            return;
        }
    };

    let timestamp =
        ingest::normalize_timestamp(payload.timestamp.as_deref(), Utc::now().fixed_offset());
    let record = UnderstandingRecord::from_payload(ip_address, payload, timestamp);

    let store = state.store.clone();
    let inserted = {
        let record = record.clone();
        tokio::task::spawn_blocking(move || store.insert(&record)).await
    };

    match inserted {
        Ok(Ok(())) => {
            tracing::info!(ip = %record.ip_address, url = %record.url, "stored understanding data");
        }
        Ok(Err(err)) => {
            tracing::error!(error = %err, ip = %record.ip_address, url = %record.url, "error inserting data");
        }
        Err(err) => {
            tracing::error!(error = %err, ip = %record.ip_address, url = %record.url, "insert task failed");
        }
    }
}
