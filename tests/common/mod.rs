#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use paperscan::infrastructure::{CancelSignal, SqliteStore, SyllabusStore};
use paperscan::services::{ExtractionClient, GenerationError, RetryPolicy, TextGenerator};
use paperscan::{AggregationEngine, Module, SyllabusDocument};

/// 根据 prompt 中出现的标记返回对应响应，并记录调用顺序
pub struct MarkerGenerator {
    responses: Vec<(&'static str, Result<String, GenerationError>)>,
    seen: Mutex<Vec<&'static str>>,
    on_call: Option<CancelSignal>,
}

impl MarkerGenerator {
    pub fn new(responses: Vec<(&'static str, Result<String, GenerationError>)>) -> Self {
        Self {
            responses,
            seen: Mutex::new(Vec::new()),
            on_call: None,
        }
    }

    /// 第一次被调用时触发取消
    pub fn cancelling(mut self, cancel: CancelSignal) -> Self {
        self.on_call = Some(cancel);
        self
    }

    pub fn seen(&self) -> Vec<&'static str> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for MarkerGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        if let Some(cancel) = &self.on_call {
            cancel.cancel();
        }
        for (marker, response) in &self.responses {
            if prompt.contains(marker) {
                self.seen.lock().unwrap().push(marker);
                return response.clone();
            }
        }
        Err(GenerationError::failed("no scripted response"))
    }
}

pub fn topics(items: &[(&str, i64)]) -> Result<String, GenerationError> {
    let list: Vec<serde_json::Value> = items
        .iter()
        .map(|(topic, count)| serde_json::json!({"topic": topic, "count": count}))
        .collect();
    Ok(serde_json::json!({ "matched_topics": list }).to_string())
}

pub async fn store_with_syllabus() -> Arc<SqliteStore> {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    store
        .replace(&SyllabusDocument::new(
            "BITE301L",
            vec![
                Module::new("1", vec!["Recursion - Backtracking"]),
                Module::new("2", vec!["Linked Lists - Stacks", "Queues"]),
                Module::new("3", vec!["Trees – Graphs"]),
            ],
        ))
        .await
        .unwrap();
    store
}

pub fn extraction(
    generator: Arc<MarkerGenerator>,
    store: Arc<SqliteStore>,
    cancel: CancelSignal,
) -> Arc<ExtractionClient> {
    Arc::new(ExtractionClient::new(
        generator,
        store,
        RetryPolicy::default(),
        cancel,
    ))
}

pub fn engine(
    generator: Arc<MarkerGenerator>,
    store: Arc<SqliteStore>,
    cancel: CancelSignal,
) -> AggregationEngine {
    AggregationEngine::new(extraction(generator, store.clone(), cancel), store)
}
