// Container runtime boundary consumed by the engine

use crate::models::{ContainerId, ContainerRecord, LifecycleEvent, RawSample};
use futures_util::stream::BoxStream;
use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("container {0} not found")]
    NotFound(ContainerId),
    #[error("docker api: {0}")]
    Docker(#[from] bollard::errors::Error),
    #[error("runtime unavailable: {0}")]
    Unavailable(String),
}

/// Operations the engine needs from a container runtime. Implemented by
/// [`crate::docker_repo::DockerRepo`]; tests supply an in-memory fake.
pub trait ContainerRuntime: Send + Sync + 'static {
    /// Start/die notifications, in the order the runtime emits them.
    fn lifecycle_events(&self) -> BoxStream<'_, Result<LifecycleEvent, RuntimeError>>;

    /// Ids of containers already running, for startup reconciliation.
    fn list_running(&self) -> impl Future<Output = Result<Vec<ContainerId>, RuntimeError>> + Send;

    fn inspect(
        &self,
        id: &ContainerId,
    ) -> impl Future<Output = Result<ContainerRecord, RuntimeError>> + Send;

    /// Streaming stats for one container. An open failure is reported as the first item.
    fn stream_stats<'a>(
        &'a self,
        id: &'a ContainerId,
    ) -> BoxStream<'a, Result<RawSample, RuntimeError>>;
}
