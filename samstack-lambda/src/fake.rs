//! In-memory container runtime for tests

use crate::container::ContainerSpec;
use crate::runtime::{ContainerRuntime, PullProgress, PullStream, RuntimeError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ImageExists(String),
    Pull(String),
    Ping,
    Create(String),
    Start(String, Option<Bytes>),
    Logs(String),
    Delete(String),
}

#[derive(Default)]
struct State {
    images: HashSet<String>,
    calls: Vec<Call>,
    next_id: usize,
}

/// Records every call. Failures are switched on per operation.
#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<State>,
    pull_updates: usize,
    pull_error: Option<String>,
    logs: String,
    lookup_error: bool,
    ping_error: bool,
    delete_error: bool,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            pull_updates: 3,
            ..Default::default()
        }
    }

    pub fn with_image(self, image: &str) -> Self {
        self.state.lock().images.insert(image.to_string());
        self
    }

    pub fn with_pull_updates(mut self, updates: usize) -> Self {
        self.pull_updates = updates;
        self
    }

    pub fn with_pull_error(mut self, message: &str) -> Self {
        self.pull_error = Some(message.to_string());
        self
    }

    pub fn with_logs(mut self, logs: &str) -> Self {
        self.logs = logs.to_string();
        self
    }

    pub fn with_lookup_error(mut self) -> Self {
        self.lookup_error = true;
        self
    }

    pub fn with_ping_error(mut self) -> Self {
        self.ping_error = true;
        self
    }

    pub fn with_delete_error(mut self) -> Self {
        self.delete_error = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn pulled(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Pull(image) => Some(image),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.state.lock().calls.push(call);
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        self.record(Call::ImageExists(image.to_string()));
        if self.lookup_error {
            return Err(RuntimeError::Api("lookup failed".to_string()));
        }
        Ok(self.state.lock().images.contains(image))
    }

    fn pull_image<'a>(&'a self, image: &'a str) -> PullStream<'a> {
        self.record(Call::Pull(image.to_string()));

        let mut updates: Vec<Result<PullProgress, RuntimeError>> = (0..self.pull_updates)
            .map(|i| {
                Ok(PullProgress {
                    status: Some("Downloading".to_string()),
                    layer: Some(format!("layer{i}")),
                })
            })
            .collect();

        match &self.pull_error {
            Some(message) => updates.push(Err(RuntimeError::Api(message.clone()))),
            None => {
                self.state.lock().images.insert(image.to_string());
            }
        }

        stream::iter(updates).boxed()
    }

    async fn ping(&self) -> Result<(), RuntimeError> {
        self.record(Call::Ping);
        if self.ping_error {
            return Err(RuntimeError::Api("connection refused".to_string()));
        }
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        self.record(Call::Create(spec.image.clone()));
        let mut state = self.state.lock();
        state.next_id += 1;
        Ok(format!("container-{}", state.next_id))
    }

    async fn start_container(&self, id: &str, input: Option<Bytes>) -> Result<(), RuntimeError> {
        self.record(Call::Start(id.to_string(), input));
        Ok(())
    }

    async fn container_logs(&self, id: &str) -> Result<String, RuntimeError> {
        self.record(Call::Logs(id.to_string()));
        Ok(self.logs.clone())
    }

    async fn delete_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.record(Call::Delete(id.to_string()));
        if self.delete_error {
            return Err(RuntimeError::Api(format!("No such container: {id}")));
        }
        Ok(())
    }
}
