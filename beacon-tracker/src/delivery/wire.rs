//! Collector request construction.

use beacon_core::constants::{
    COLLECT_API_VERSION, COLLECT_PATH_COLLECT, COLLECT_PATH_PROJECTS, SDK_VERSION, SEND_TIME_PARAM,
};
use beacon_core::requests::{EncodedPayload, WireRequest};

pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_USER_AGENT: &str = "User-Agent";

/// `{host}/v3/projects/{project_id}/collect?stm={send_time}`
pub fn collect_url(host: &str, project_id: &str, send_time: i64) -> String {
    format!(
        "{}/{COLLECT_API_VERSION}/{COLLECT_PATH_PROJECTS}/{project_id}/{COLLECT_PATH_COLLECT}?{SEND_TIME_PARAM}={send_time}",
        host.trim_end_matches('/'),
    )
}

pub fn build_request(
    host: &str,
    project_id: &str,
    payload: EncodedPayload,
    send_time: i64,
) -> WireRequest {
    WireRequest {
        url: collect_url(host, project_id, send_time),
        headers: vec![
            (HEADER_CONTENT_TYPE.to_string(), payload.media_type),
            (HEADER_USER_AGENT.to_string(), format!("beacon-rs/{SDK_VERSION}")),
        ],
        body: payload.bytes,
        send_time,
    }
}
