//! RPC Transport Handler
//!
//! HTTP 请求 → 过程调用：
//! - `GET  {endpoint}/<path>?input=<json>`  查询
//! - `POST {endpoint}/<path>` + JSON body    变更
//! - `?batch=1` 时 `<path>` 为逗号分隔的多个过程，输入为 `{ "0": .., "1": .. }`
//!
//! 每个请求只构造一次上下文，先于路由与认证检查。

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::future::join_all;
use serde::Deserialize;
use serde_json::Value;

use crate::application::rpc::{decode, ProcedureKind, RpcError, RpcErrorCode, RpcValue};
use crate::infrastructure::http::dto::{rpc_error, rpc_success};
use crate::infrastructure::http::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TrpcParams {
    #[serde(default)]
    pub batch: Option<String>,
    #[serde(default)]
    pub input: Option<String>,
}

impl TrpcParams {
    fn is_batch(&self) -> bool {
        matches!(self.batch.as_deref(), Some("1") | Some("true"))
    }
}

pub async fn trpc_handler(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    query: Result<Query<TrpcParams>, QueryRejection>,
    method: Method,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    // 查询串无法解析时不知道是否批量，按单个调用处理整个路径
    let (params, query_error) = match query {
        Ok(Query(params)) => (params, None),
        Err(e) => (
            TrpcParams::default(),
            Some(RpcError::parse_error(format!(
                "Invalid query string: {}",
                e.body_text()
            ))),
        ),
    };

    let is_batch = params.is_batch();
    let paths: Vec<String> = if is_batch {
        path.split(',').map(str::to_string).collect()
    } else {
        vec![path]
    };

    let ctx = Arc::new(state.contexts.from_request(&headers).await);

    let prepared = match query_error {
        Some(e) => Err(e),
        None => prepare(&method, &params, body, paths.len(), is_batch),
    };

    let results: Vec<Result<RpcValue, RpcError>> = match prepared {
        Ok((kind, inputs)) => {
            let calls = paths
                .iter()
                .zip(inputs)
                .map(|(path, input)| state.router.call(path, kind, ctx.clone(), input));
            join_all(calls).await
        }
        // 请求级错误：批量中每个调用返回同一错误
        Err(e) => paths.iter().map(|_| Err(e.clone())).collect(),
    };

    let mut statuses = Vec::with_capacity(results.len());
    let mut envelopes = Vec::with_capacity(results.len());
    for (path, result) in paths.iter().zip(&results) {
        match result {
            Ok(value) => {
                statuses.push(StatusCode::OK);
                envelopes.push(rpc_success(value));
            }
            Err(e) => {
                tracing::error!(
                    path = %path,
                    code = e.code.as_str(),
                    error = %e.message,
                    "RPC call failed"
                );
                statuses.push(
                    StatusCode::from_u16(e.code.http_status())
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                );
                envelopes.push(rpc_error(e, Some(path)));
            }
        }
    }

    let status = batch_status(&statuses);
    let body = if is_batch {
        Value::Array(envelopes)
    } else {
        envelopes.pop().unwrap_or(Value::Null)
    };

    let mut response = (status, Json(body)).into_response();
    response.headers_mut().extend(ctx.response_headers.take());
    response
}

/// 请求级检查：HTTP 方法 → 过程类型，然后读取输入
fn prepare(
    method: &Method,
    params: &TrpcParams,
    body: Result<Bytes, BytesRejection>,
    count: usize,
    is_batch: bool,
) -> Result<(ProcedureKind, Vec<RpcValue>), RpcError> {
    let kind = match *method {
        Method::GET => ProcedureKind::Query,
        Method::POST => ProcedureKind::Mutation,
        ref other => {
            return Err(RpcError::method_not_supported(format!(
                "Unsupported {} request, use GET for queries and POST for mutations",
                other
            )))
        }
    };

    let inputs = match kind {
        ProcedureKind::Query => {
            parse_inputs(params.input.as_deref().map(str::as_bytes), count, is_batch)?
        }
        ProcedureKind::Mutation => {
            let body = body.map_err(body_error)?;
            let raw = (!body.is_empty()).then_some(body.as_ref());
            parse_inputs(raw, count, is_batch)?
        }
    };

    Ok((kind, inputs))
}

fn body_error(rejection: BytesRejection) -> RpcError {
    let code = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        RpcErrorCode::PayloadTooLarge
    } else {
        RpcErrorCode::BadRequest
    };
    RpcError::new(code, rejection.body_text())
}

/// 解析原始输入
///
/// 非法 JSON（含非 UTF-8 字节）为 PARSE_ERROR；transformer 解码失败为 BAD_REQUEST
fn parse_inputs(
    raw: Option<&[u8]>,
    count: usize,
    is_batch: bool,
) -> Result<Vec<RpcValue>, RpcError> {
    let Some(raw) = raw else {
        return Ok(vec![RpcValue::Undefined; count]);
    };

    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| RpcError::parse_error(format!("Unable to parse input: {}", e)))?;

    if !is_batch {
        return Ok(vec![decode_input(value)?]);
    }

    let Value::Object(mut by_index) = value else {
        return Err(RpcError::bad_request(
            "Batch input must be an object keyed by call index",
        ));
    };

    (0..count)
        .map(|i| match by_index.remove(&i.to_string()) {
            Some(v) => decode_input(v),
            None => Ok(RpcValue::Undefined),
        })
        .collect()
}

fn decode_input(value: Value) -> Result<RpcValue, RpcError> {
    decode(value).map_err(|e| RpcError::bad_request(format!("Invalid input: {}", e)))
}

/// 批量调用状态码：全部一致时取该值，否则 207
fn batch_status(statuses: &[StatusCode]) -> StatusCode {
    match statuses.split_first() {
        None => StatusCode::OK,
        Some((first, rest)) if rest.iter().all(|s| s == first) => *first,
        Some(_) => StatusCode::MULTI_STATUS,
    }
}
