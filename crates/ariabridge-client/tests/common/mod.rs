//! Shared fixtures for client integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ariabridge_core::{ClientError, ClientResult, CommandChannel, RpcMethod};
use async_trait::async_trait;
use serde_json::Value;

type Reply = Box<dyn Fn(&[Value]) -> ClientResult<Value> + Send + Sync>;
type Hook = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// A fake command channel that answers from canned replies and records
/// every call.
#[derive(Default)]
pub struct FakeChannel {
    replies: Mutex<HashMap<RpcMethod, Reply>>,
    calls: Mutex<Vec<(RpcMethod, Vec<Value>)>>,
    hooks: Mutex<HashMap<RpcMethod, Hook>>,
}

impl FakeChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer `method` with a function of its params.
    pub fn on<F>(&self, method: RpcMethod, reply: F)
    where
        F: Fn(&[Value]) -> ClientResult<Value> + Send + Sync + 'static,
    {
        self.replies.lock().unwrap().insert(method, Box::new(reply));
    }

    /// Answer `method` with a fixed value.
    pub fn reply(&self, method: RpcMethod, value: Value) {
        self.on(method, move |_| Ok(value.clone()));
    }

    /// Run `hook` to completion before answering `method`.
    pub fn before<F, Fut>(&self, method: RpcMethod, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let hook: Hook = Arc::new(move || Box::pin(hook()));
        self.hooks.lock().unwrap().insert(method, hook);
    }

    /// Every call so far.
    pub fn calls(&self) -> Vec<(RpcMethod, Vec<Value>)> {
        self.calls.lock().unwrap().clone()
    }

    /// Params of every call to `method`.
    pub fn calls_of(&self, method: RpcMethod) -> Vec<Vec<Value>> {
        self.calls()
            .into_iter()
            .filter(|(m, _)| *m == method)
            .map(|(_, params)| params)
            .collect()
    }
}

#[async_trait]
impl CommandChannel for FakeChannel {
    async fn call(&self, method: RpcMethod, params: Vec<Value>) -> ClientResult<Value> {
        self.calls.lock().unwrap().push((method, params.clone()));
        let hook = self.hooks.lock().unwrap().get(&method).cloned();
        if let Some(hook) = hook {
            hook().await;
        }
        let replies = self.replies.lock().unwrap();
        match replies.get(&method) {
            Some(reply) => reply(&params),
            None => Err(ClientError::engine(-1, format!("no canned reply for {method}"))),
        }
    }
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
