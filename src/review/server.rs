//! HTTP server for the human review UI.
//!
//! Serves a single-page UI plus a small JSON API over a shared
//! [`ReviewStore`]. Verdicts are persisted by the store on every submit.

use super::store::{ReviewStats, ReviewStore};
use crate::error::{BenchError, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

type SharedStore = Arc<Mutex<ReviewStore>>;

/// What the UI needs to render the current sample.
#[derive(Debug, Serialize)]
struct StateResponse {
    cursor: usize,
    total: usize,
    sample: serde_json::Value,
    stats: ReviewStats,
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    correctness: bool,
    completeness: bool,
    faithfulness: bool,
    #[serde(default)]
    notes: String,
}

#[derive(Debug, Deserialize)]
struct NavRequest {
    /// "prev", "next", or "seek".
    action: String,
    #[serde(default)]
    index: usize,
}

fn state_response(store: &ReviewStore) -> Result<StateResponse> {
    let sample = serde_json::to_value(store.current())?;
    Ok(StateResponse {
        cursor: store.cursor(),
        total: store.len(),
        sample,
        stats: store.stats(),
    })
}

async fn get_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn get_state(
    State(store): State<SharedStore>,
) -> std::result::Result<Json<StateResponse>, StatusCode> {
    let store = store.lock().await;
    state_response(&store)
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn post_submit(
    State(store): State<SharedStore>,
    Json(request): Json<SubmitRequest>,
) -> std::result::Result<Json<StateResponse>, StatusCode> {
    let mut store = store.lock().await;
    store
        .submit(
            request.correctness,
            request.completeness,
            request.faithfulness,
            request.notes,
        )
        .map_err(|e| {
            tracing::error!(error = %e, "failed to persist manual judgment");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    state_response(&store)
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn post_accept(
    State(store): State<SharedStore>,
) -> std::result::Result<Json<StateResponse>, StatusCode> {
    let mut store = store.lock().await;
    store.accept().map_err(|e| {
        tracing::error!(error = %e, "failed to persist accepted judgment");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    state_response(&store)
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn post_nav(
    State(store): State<SharedStore>,
    Json(request): Json<NavRequest>,
) -> std::result::Result<Json<StateResponse>, StatusCode> {
    let mut store = store.lock().await;
    match request.action.as_str() {
        "prev" => store.prev(),
        "next" => store.next(),
        "seek" => store.seek(request.index),
        _ => return Err(StatusCode::BAD_REQUEST),
    }
    state_response(&store)
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Build the review router.
pub fn app(store: ReviewStore) -> Router {
    let shared: SharedStore = Arc::new(Mutex::new(store));
    Router::new()
        .route("/", get(get_index))
        .route("/api/state", get(get_state))
        .route("/api/submit", post(post_submit))
        .route("/api/accept", post(post_accept))
        .route("/api/nav", post(post_nav))
        .layer(CorsLayer::permissive())
        .with_state(shared)
}

/// Serve the review UI until interrupted.
pub async fn serve(store: ReviewStore, host: &str, port: u16) -> Result<()> {
    let router = app(store);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| BenchError::Http(format!("failed to bind {}: {}", addr, e)))?;

    println!("人工复核界面: http://{}", addr);
    tracing::info!(addr = %addr, "review server listening");

    axum::serve(listener, router)
        .await
        .map_err(|e| BenchError::Http(e.to_string()))?;
    Ok(())
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="zh">
<head>
<meta charset="utf-8">
<title>人工复核</title>
<style>
  body { font-family: sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; color: #222; }
  h1 { font-size: 1.4rem; }
  .card { border: 1px solid #ddd; border-radius: 8px; padding: 1rem; margin-bottom: 1rem; }
  .label { font-weight: bold; margin-top: 0.6rem; }
  .doc { background: #f7f7f7; padding: 0.5rem; margin: 0.4rem 0; border-radius: 4px; white-space: pre-wrap; }
  .controls label { margin-right: 1.2rem; }
  button { margin-right: 0.5rem; padding: 0.4rem 1rem; }
  #progress { color: #666; }
  textarea { width: 100%; min-height: 3rem; }
</style>
</head>
<body>
<h1>人工复核</h1>
<div id="progress"></div>
<div class="card">
  <div class="label">问题</div><div id="query"></div>
  <div class="label">AI回答</div><div id="answer"></div>
  <div class="label">标准答案</div><div id="golden"></div>
  <div class="label">自动评估</div><div id="auto"></div>
  <div class="label">检索文档</div><div id="docs"></div>
</div>
<div class="card controls">
  <div><span class="label">正确性</span>
    <label><input type="radio" name="correctness" value="true">是</label>
    <label><input type="radio" name="correctness" value="false">否</label></div>
  <div><span class="label">完整性</span>
    <label><input type="radio" name="completeness" value="true">是</label>
    <label><input type="radio" name="completeness" value="false">否</label></div>
  <div><span class="label">忠诚度</span>
    <label><input type="radio" name="faithfulness" value="true">是</label>
    <label><input type="radio" name="faithfulness" value="false">否</label></div>
  <div class="label">备注</div>
  <textarea id="notes"></textarea>
  <div style="margin-top: 0.8rem">
    <button onclick="nav('prev')">上一个</button>
    <button onclick="nav('next')">下一个</button>
    <button onclick="accept()">确认自动评估</button>
    <button onclick="submitJudgment()">提交</button>
  </div>
</div>
<div class="card"><div class="label">统计</div><pre id="stats"></pre></div>
<script>
function yn(v) { return v === true ? '是' : v === false ? '否' : '-'; }
function pick(name) {
  const el = document.querySelector('input[name="' + name + '"]:checked');
  return el ? el.value === 'true' : null;
}
function setRadio(name, value) {
  document.querySelectorAll('input[name="' + name + '"]').forEach(el => {
    el.checked = value !== null && el.value === String(value);
  });
}
function render(state) {
  const s = state.sample;
  document.getElementById('progress').textContent =
    '样本 ' + (state.cursor + 1) + ' / ' + state.total +
    '，已复核 ' + state.stats.reviewed_samples + ' / ' + state.stats.total_samples;
  document.getElementById('query').textContent = s.query;
  document.getElementById('answer').textContent = s.answer;
  document.getElementById('golden').textContent = s.golden_answer;
  const j = s.judgment || {};
  document.getElementById('auto').textContent =
    '正确性: ' + yn(j.correctness) + '  完整性: ' + yn(j.completeness) +
    '  忠诚度: ' + yn(j.faithfulness) + (s.crag_label ? '  CRAG: ' + s.crag_label : '');
  const docs = document.getElementById('docs');
  docs.innerHTML = '';
  (s.retrieved_documents || []).forEach(d => {
    const div = document.createElement('div');
    div.className = 'doc';
    div.textContent = d.source_file + ' 第' + d.page_no + '页 (score ' +
      d.score.toFixed(3) + ')\n' + d.content;
    docs.appendChild(div);
  });
  const m = s.manual_judgment || {};
  const reviewed = m.judge_time != null;
  setRadio('correctness', reviewed ? m.correctness : (j.correctness ?? null));
  setRadio('completeness', reviewed ? m.completeness : (j.completeness ?? null));
  setRadio('faithfulness', reviewed ? m.faithfulness : (j.faithfulness ?? null));
  document.getElementById('notes').value = m.notes || '';
  document.getElementById('stats').textContent = JSON.stringify(state.stats, null, 2);
}
async function call(path, body) {
  const response = await fetch(path, body ? {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify(body),
  } : undefined);
  if (response.ok) render(await response.json());
}
function nav(action) { call('/api/nav', { action }); }
function accept() { call('/api/accept', {}); }
function submitJudgment() {
  const c = pick('correctness'), p = pick('completeness'), f = pick('faithfulness');
  if (c === null || p === null || f === null) { alert('请完成三项判断'); return; }
  call('/api/submit', {
    correctness: c, completeness: p, faithfulness: f,
    notes: document.getElementById('notes').value,
  });
}
call('/api/state');
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_html_has_api_hooks() {
        assert!(INDEX_HTML.contains("/api/state"));
        assert!(INDEX_HTML.contains("/api/submit"));
        assert!(INDEX_HTML.contains("/api/accept"));
        assert!(INDEX_HTML.contains("/api/nav"));
    }
}
