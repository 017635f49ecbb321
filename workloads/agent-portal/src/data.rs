//! Data models and the in-memory store behind the portal's loaders.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Agent lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Running,
    Idle,
    Offline,
}

impl AgentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AgentStatus::Running => "Running",
            AgentStatus::Idle => "Idle",
            AgentStatus::Offline => "Offline",
        }
    }
}

/// Row in the agent list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
    pub status: AgentStatus,
}

/// Full agent record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub model: String,
    pub status: AgentStatus,
    pub jobs: Vec<JobSummary>,
}

/// Job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn label(&self) -> &'static str {
        match self {
            JobState::Queued => "Queued",
            JobState::Running => "Running",
            JobState::Succeeded => "Succeeded",
            JobState::Failed => "Failed",
        }
    }
}

/// Job row on an agent page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    pub title: String,
    pub state: JobState,
}

/// Full job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub agent_id: String,
    pub title: String,
    pub state: JobState,
    /// Log lines; `None` once logs have expired.
    #[serde(default)]
    pub logs: Option<Vec<String>>,
}

/// In-memory backing store.
///
/// Counts every load so tests can assert how often the pipeline reached
/// for data.
#[derive(Debug, Default)]
pub struct PortalStore {
    agents: BTreeMap<String, Agent>,
    jobs: BTreeMap<String, Job>,
    latency: Option<Duration>,
    loads: AtomicUsize,
}

impl PortalStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with a few agents and jobs.
    pub fn sample() -> Self {
        let mut store = Self::new();
        store.add_agent("7", "Atlas", "planner-large", AgentStatus::Running);
        store.add_agent("12", "Beacon", "triage-small", AgentStatus::Idle);
        store.add_job(
            "101",
            "7",
            "Index quarterly reports",
            JobState::Succeeded,
            Some(vec!["fetched 48 documents".into(), "index written".into()]),
        );
        store.add_job("102", "7", "Summarize incidents", JobState::Failed, None);
        store.add_job("201", "12", "Route inbound tickets", JobState::Queued, Some(Vec::new()));
        store
    }

    /// Delay every load, to make concurrent prefetch observable.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add an agent.
    pub fn add_agent(&mut self, id: &str, name: &str, model: &str, status: AgentStatus) {
        self.agents.insert(
            id.to_string(),
            Agent {
                id: id.to_string(),
                name: name.to_string(),
                model: model.to_string(),
                status,
                jobs: Vec::new(),
            },
        );
    }

    /// Add a job. The owning agent must already exist.
    pub fn add_job(
        &mut self,
        id: &str,
        agent_id: &str,
        title: &str,
        state: JobState,
        logs: Option<Vec<String>>,
    ) {
        if let Some(agent) = self.agents.get_mut(agent_id) {
            agent.jobs.push(JobSummary {
                id: id.to_string(),
                title: title.to_string(),
                state,
            });
        }
        self.jobs.insert(
            id.to_string(),
            Job {
                id: id.to_string(),
                agent_id: agent_id.to_string(),
                title: title.to_string(),
                state,
                logs,
            },
        );
    }

    /// Number of loads served.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    async fn begin_load(&self, what: &str, id: &str) {
        self.loads.fetch_add(1, Ordering::SeqCst);
        debug!(what, id, "Store load");
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// All agents, ordered by id.
    pub async fn list_agents(&self) -> Result<Vec<AgentSummary>> {
        self.begin_load("agents", "*").await;
        Ok(self
            .agents
            .values()
            .map(|a| AgentSummary {
                id: a.id.clone(),
                name: a.name.clone(),
                status: a.status,
            })
            .collect())
    }

    /// One agent.
    pub async fn agent(&self, id: &str) -> Result<Agent> {
        self.begin_load("agent", id).await;
        self.agents
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("agent {} not found", id))
    }

    /// One job.
    pub async fn job(&self, id: &str) -> Result<Job> {
        self.begin_load("job", id).await;
        self.jobs
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("job {} not found", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sample_store() {
        let store = PortalStore::sample();

        let agents = store.list_agents().await.unwrap();
        assert_eq!(agents.len(), 2);

        let atlas = store.agent("7").await.unwrap();
        assert_eq!(atlas.jobs.len(), 2);
        assert_eq!(atlas.jobs[1].state, JobState::Failed);

        assert!(store.job("999").await.is_err());
        assert_eq!(store.loads(), 3);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&AgentStatus::Running).unwrap();
        assert_eq!(json, r#""running""#);
    }
}
