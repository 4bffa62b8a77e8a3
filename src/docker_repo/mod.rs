// Docker runtime via bollard

mod inspect;
mod stats;

use crate::config::DockerConfig;
use crate::models::{ContainerId, ContainerRecord, LifecycleEvent, RawSample};
use crate::runtime::{ContainerRuntime, RuntimeError};
use anyhow::Context;
use bollard::Docker;
use bollard::query_parameters::{
    EventsOptions, InspectContainerOptions, ListContainersOptions, StatsOptions,
};
use chrono::Utc;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, future};
use std::collections::HashMap;
use tracing::debug;

pub struct DockerRepo {
    docker: Docker,
}

impl DockerRepo {
    /// Connects and pings the daemon; an unreachable daemon is an error here rather than later.
    pub async fn connect(config: &DockerConfig) -> anyhow::Result<Self> {
        let docker = match config.socket.as_deref() {
            #[cfg(unix)]
            Some(path) => {
                Docker::connect_with_unix(path, config.timeout_secs, bollard::API_DEFAULT_VERSION)
                    .with_context(|| format!("connect to docker socket {path}"))?
            }
            #[cfg(not(unix))]
            Some(_) => anyhow::bail!("docker.socket is only supported on unix hosts"),
            None => Docker::connect_with_local_defaults().context("connect to docker")?,
        };
        docker
            .ping()
            .await
            .context("docker daemon did not answer ping")?;
        debug!("connected to docker");
        Ok(Self { docker })
    }
}

impl ContainerRuntime for DockerRepo {
    /// The request is only sent once the stream is polled, so `since` pins the start to
    /// this call; events in between are replayed by the daemon.
    fn lifecycle_events(&self) -> BoxStream<'_, Result<LifecycleEvent, RuntimeError>> {
        let mut filters = HashMap::new();
        filters.insert("type".to_string(), vec!["container".to_string()]);
        filters.insert(
            "event".to_string(),
            vec!["start".to_string(), "die".to_string()],
        );
        let options = EventsOptions {
            since: Some(Utc::now().timestamp().to_string()),
            filters: Some(filters),
            ..Default::default()
        };

        self.docker
            .events(Some(options))
            .filter_map(|result| {
                future::ready(match result {
                    Ok(msg) => inspect::lifecycle_event(&msg).map(Ok),
                    Err(e) => Some(Err(RuntimeError::from(e))),
                })
            })
            .boxed()
    }

    async fn list_running(&self) -> Result<Vec<ContainerId>, RuntimeError> {
        let mut filters = HashMap::new();
        filters.insert("status".to_string(), vec!["running".to_string()]);

        let filter = ListContainersOptions {
            all: false,
            filters: Some(filters),
            ..Default::default()
        };

        let containers = self.docker.list_containers(Some(filter)).await?;
        Ok(containers
            .into_iter()
            .filter_map(|c| c.id)
            .map(ContainerId::from)
            .collect())
    }

    async fn inspect(&self, id: &ContainerId) -> Result<ContainerRecord, RuntimeError> {
        let response = self
            .docker
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(|e| runtime_error(id, e))?;
        Ok(inspect::container_record(id, &response))
    }

    fn stream_stats<'a>(
        &'a self,
        id: &'a ContainerId,
    ) -> BoxStream<'a, Result<RawSample, RuntimeError>> {
        let options = StatsOptions {
            stream: true,
            ..Default::default()
        };
        self.docker
            .stats(id.as_str(), Some(options))
            .map(move |result| {
                result
                    .map(|s| stats::raw_sample(&s))
                    .map_err(|e| runtime_error(id, e))
            })
            .boxed()
    }
}

fn runtime_error(id: &ContainerId, e: bollard::errors::Error) -> RuntimeError {
    match e {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        } => RuntimeError::NotFound(id.clone()),
        other => RuntimeError::Docker(other),
    }
}
