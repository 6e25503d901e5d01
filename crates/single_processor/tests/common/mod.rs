#![allow(dead_code)]

use async_trait::async_trait;
use db_services::{ExampleRetriever, RetrievalError, RetrievalExample};
use llm_requester::{ChatCompletion, LlmError, LlmPool, RetryPolicy};
use rust_checker::{CodeChecker, CompilationResult};
use single_processor::{RepairConfig, RepairEngine};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const MODEL: &str = "test-model";

#[derive(Clone)]
pub enum Reply {
    Text(String),
    Fail(fn() -> LlmError),
}

/// Replies from a queue; the last reply repeats once the queue is drained.
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Reply>>,
    pub prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedClient {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Self::delayed(replies, Duration::ZERO)
    }

    /// Every reply arrives after `delay`.
    pub fn delayed(replies: Vec<Reply>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn replying<S: AsRef<str>>(replies: &[S]) -> Arc<Self> {
        Self::new(
            replies
                .iter()
                .map(|r| Reply::Text(r.as_ref().to_string()))
                .collect(),
        )
    }

    pub fn failing(err: fn() -> LlmError) -> Arc<Self> {
        Self::new(vec![Reply::Fail(err)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompt(&self, index: usize) -> String {
        self.prompts.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl ChatCompletion for ScriptedClient {
    async fn complete(&self, prompt: &str, _model: &str, _t: f32) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.replies.lock().unwrap().pop_front();
        let reply = match next {
            Some(reply) => {
                *self.last.lock().unwrap() = Some(reply.clone());
                reply
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or(Reply::Fail(|| LlmError::EmptyResponse)),
        };
        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Fail(make) => Err(make()),
        }
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

/// Compiles whatever `accept` approves; rejected code gets `stderr` as its
/// diagnostics.
pub struct ScriptedChecker {
    accept: Box<dyn Fn(&str) -> bool + Send + Sync>,
    stderr: Box<dyn Fn(&str) -> String + Send + Sync>,
    pub checked: Mutex<Vec<String>>,
}

impl ScriptedChecker {
    pub fn new(
        accept: impl Fn(&str) -> bool + Send + Sync + 'static,
        stderr: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            accept: Box::new(accept),
            stderr: Box::new(stderr),
            checked: Mutex::new(Vec::new()),
        })
    }

    pub fn always_ok() -> Arc<Self> {
        Self::new(|_| true, |_| String::new())
    }

    pub fn never_ok() -> Arc<Self> {
        Self::new(
            |_| false,
            |_| "error[E0425]: cannot find value `x` in this scope\n".to_string(),
        )
    }

    pub fn checks(&self) -> usize {
        self.checked.lock().unwrap().len()
    }
}

#[async_trait]
impl CodeChecker for ScriptedChecker {
    async fn check(&self, code: &str) -> CompilationResult {
        self.checked.lock().unwrap().push(code.to_string());
        if (self.accept)(code) {
            CompilationResult {
                success: true,
                stdout: String::new(),
                stderr: String::new(),
            }
        } else {
            CompilationResult::failure((self.stderr)(code))
        }
    }
}

pub struct FixedRetriever(pub Vec<RetrievalExample>);

#[async_trait]
impl ExampleRetriever for FixedRetriever {
    async fn retrieve(
        &self,
        _query_code: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalExample>, RetrievalError> {
        Ok(self.0.iter().take(top_k).cloned().collect())
    }
}

pub struct BrokenRetriever;

#[async_trait]
impl ExampleRetriever for BrokenRetriever {
    async fn retrieve(
        &self,
        _query_code: &str,
        _top_k: usize,
    ) -> Result<Vec<RetrievalExample>, RetrievalError> {
        Err(RetrievalError::Index("connection refused".into()))
    }
}

pub fn pool(client: Arc<ScriptedClient>) -> Arc<LlmPool> {
    pool_of(vec![client])
}

/// One credential per client.
pub fn pool_of(clients: Vec<Arc<ScriptedClient>>) -> Arc<LlmPool> {
    Arc::new(
        LlmPool::new(
            clients
                .into_iter()
                .map(|c| c as Arc<dyn ChatCompletion>)
                .collect(),
            None,
            vec![MODEL.to_string()],
            RetryPolicy::without_delay(1),
        )
        .unwrap(),
    )
}

pub fn engine(client: Arc<ScriptedClient>, checker: Arc<ScriptedChecker>) -> RepairEngine {
    RepairEngine::new(pool(client), checker, &RepairConfig::default())
}

pub fn fenced(code: &str) -> String {
    format!("Here is the translation:\n```rust\n{}\n```\n", code)
}
