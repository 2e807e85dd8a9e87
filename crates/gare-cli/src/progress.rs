//! Line protocol for `gare session`.
//!
//! Every stdout line is a prefix followed by one JSON document, so a front
//! end can split on the first `:` and parse the rest:
//!
//! - `GARE_FRAME:{"nodes":[...],"edges":[...]}`
//! - `GARE_RESULT:{"type":"infer_all","data":{...}}`
//! - `GARE_ERROR:{"message":"..."}`

use std::io::Write;

use gare_graph::RenderFrame;
use serde::Serialize;

pub const FRAME_PREFIX: &str = "GARE_FRAME:";
pub const RESULT_PREFIX: &str = "GARE_RESULT:";
pub const ERROR_PREFIX: &str = "GARE_ERROR:";

pub fn frame_line(frame: &RenderFrame) -> serde_json::Result<String> {
    Ok(format!("{}{}", FRAME_PREFIX, serde_json::to_string(frame)?))
}

pub fn result_line<T: Serialize>(result_type: &str, data: &T) -> serde_json::Result<String> {
    let payload = serde_json::json!({
        "type": result_type,
        "data": data,
    });
    Ok(format!("{}{}", RESULT_PREFIX, serde_json::to_string(&payload)?))
}

pub fn error_line(message: &str) -> String {
    let payload = serde_json::json!({ "message": message });
    format!("{}{}", ERROR_PREFIX, payload)
}

/// Write one protocol line to stdout and flush.
pub fn emit(line: &str) {
    let mut out = std::io::stdout().lock();
    let _ = writeln!(out, "{}", line);
    let _ = out.flush();
}
