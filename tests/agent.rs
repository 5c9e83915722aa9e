use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nodevisor::{
    Agent, Call, CallType, Config, ContainerId, ContainerState, GetMetrics, KillNestedContainer,
    LaunchNestedContainer, ManualBackend, Metric, MetricsSource, RawCall, Response,
    SetLoggingLevel, Task, TaskPartition, TaskStore, WaitNestedContainer,
};

fn setup() -> (Arc<Agent>, Arc<ManualBackend>) {
    let backend = Arc::new(ManualBackend::new());
    let agent = Agent::builder(Config::default())
        .with_backend(backend.clone())
        .build();
    (agent, backend)
}

fn launch(id: &ContainerId) -> Call {
    Call::LaunchNestedContainer(LaunchNestedContainer {
        container_id: id.clone(),
        command: None,
        container: None,
        resources: Vec::new(),
    })
}

fn wait(id: &ContainerId) -> Call {
    Call::WaitNestedContainer(WaitNestedContainer {
        container_id: id.clone(),
    })
}

fn kill(id: &ContainerId) -> Call {
    Call::KillNestedContainer(KillNestedContainer {
        container_id: id.clone(),
    })
}

async fn wait_for_waiters(agent: &Agent, id: &ContainerId, n: usize) {
    while agent.containers().waiters(id).await.unwrap() < n {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn wait_on_nested_container_returns_exit_status() -> anyhow::Result<()> {
    let (agent, backend) = setup();
    let parent = ContainerId::new("executor-1");
    let child = ContainerId::nested("c1", parent.clone());
    agent.dispatch(launch(&parent)).await?;
    agent.dispatch(launch(&child)).await?;

    let waiter = tokio::spawn({
        let agent = agent.clone();
        let child = child.clone();
        async move { agent.dispatch(wait(&child)).await }
    });
    wait_for_waiters(&agent, &child, 1).await;
    assert!(!waiter.is_finished());

    backend.exit(&child, Some(0));
    assert_eq!(
        waiter.await??,
        Response::WaitNestedContainer { exit_status: Some(0) }
    );
    Ok(())
}

#[tokio::test]
async fn launching_a_used_id_fails_even_after_termination() -> anyhow::Result<()> {
    let (agent, backend) = setup();
    let id = ContainerId::new("c1");
    agent.dispatch(launch(&id)).await?;

    let err = agent.dispatch(launch(&id)).await.unwrap_err();
    assert_eq!(err.as_label(), "already_exists");

    backend.exit(&id, Some(1));
    agent.dispatch(wait(&id)).await?;
    let err = agent.dispatch(launch(&id)).await.unwrap_err();
    assert_eq!(err.as_label(), "already_exists");
    Ok(())
}

#[tokio::test]
async fn waiters_before_and_after_exit_see_the_same_status() -> anyhow::Result<()> {
    let (agent, backend) = setup();
    let id = ContainerId::new("c1");
    agent.dispatch(launch(&id)).await?;

    let early: Vec<_> = (0..3)
        .map(|_| {
            let agent = agent.clone();
            let id = id.clone();
            tokio::spawn(async move { agent.dispatch(wait(&id)).await })
        })
        .collect();
    wait_for_waiters(&agent, &id, 3).await;

    backend.exit(&id, Some(137));
    let expected = Response::WaitNestedContainer {
        exit_status: Some(137),
    };
    for w in early {
        assert_eq!(w.await??, expected);
    }
    assert_eq!(agent.dispatch(wait(&id)).await?, expected);
    Ok(())
}

#[tokio::test]
async fn abandoned_wait_does_not_disturb_other_waiters() -> anyhow::Result<()> {
    let (agent, backend) = setup();
    let id = ContainerId::new("c1");
    agent.dispatch(launch(&id)).await?;

    let patient = tokio::spawn({
        let agent = agent.clone();
        let id = id.clone();
        async move { agent.dispatch(wait(&id)).await }
    });
    wait_for_waiters(&agent, &id, 1).await;

    // Transport-level timeout drops the call.
    let abandoned = tokio::time::timeout(Duration::from_millis(10), agent.dispatch(wait(&id))).await;
    assert!(abandoned.is_err());
    assert_eq!(agent.containers().waiters(&id).await?, 1);

    backend.exit(&id, Some(0));
    assert_eq!(
        patient.await??,
        Response::WaitNestedContainer { exit_status: Some(0) }
    );
    Ok(())
}

#[tokio::test]
async fn kill_is_idempotent_and_unknown_ids_are_not_found() -> anyhow::Result<()> {
    let (agent, _backend) = setup();
    let id = ContainerId::new("c1");
    agent.dispatch(launch(&id)).await?;

    assert_eq!(agent.dispatch(kill(&id)).await?, Response::KillNestedContainer);
    assert_eq!(
        agent.dispatch(wait(&id)).await?,
        Response::WaitNestedContainer { exit_status: None }
    );
    assert_eq!(agent.dispatch(kill(&id)).await?, Response::KillNestedContainer);

    let ghost = ContainerId::new("unknown-id");
    assert_eq!(agent.dispatch(kill(&ghost)).await.unwrap_err().as_label(), "not_found");
    assert_eq!(agent.dispatch(wait(&ghost)).await.unwrap_err().as_label(), "not_found");
    Ok(())
}

#[tokio::test]
async fn backend_dispatch_failures_are_internal() -> anyhow::Result<()> {
    let (agent, backend) = setup();
    backend.fail_launches(true);
    let id = ContainerId::new("c1");
    assert_eq!(agent.dispatch(launch(&id)).await.unwrap_err().as_label(), "internal");

    backend.fail_launches(false);
    let other = ContainerId::new("c2");
    agent.dispatch(launch(&other)).await?;
    backend.fail_kills(true);
    assert_eq!(agent.dispatch(kill(&other)).await.unwrap_err().as_label(), "internal");
    Ok(())
}

#[tokio::test]
async fn get_containers_lists_every_record() -> anyhow::Result<()> {
    let (agent, backend) = setup();
    let a = ContainerId::new("a");
    let b = ContainerId::new("b");
    agent.dispatch(launch(&b)).await?;
    agent.dispatch(launch(&a)).await?;
    backend.exit(&b, Some(2));
    agent.dispatch(wait(&b)).await?;

    match agent.dispatch(Call::GetContainers).await? {
        Response::GetContainers { containers } => {
            assert_eq!(containers.len(), 2);
            assert_eq!(containers[0].container_id, a);
            assert_eq!(containers[0].state, ContainerState::Running);
            assert!(containers[0].statistics.is_some());
            assert_eq!(containers[1].state, ContainerState::Terminated(Some(2)));
            assert_eq!(containers[1].exit_status, Some(2));
            assert!(containers[1].statistics.is_none());
        }
        other => panic!("unexpected response {other:?}"),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn logging_override_reverts_to_baseline() -> anyhow::Result<()> {
    let (agent, _backend) = setup();
    agent
        .dispatch(Call::SetLoggingLevel(SetLoggingLevel {
            level: 2,
            duration: Duration::from_secs(10),
        }))
        .await?;
    assert_eq!(
        agent.dispatch(Call::GetLoggingLevel).await?,
        Response::GetLoggingLevel { level: 2 }
    );

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(
        agent.dispatch(Call::GetLoggingLevel).await?,
        Response::GetLoggingLevel { level: 0 }
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn chained_logging_overrides_revert_past_the_first() -> anyhow::Result<()> {
    let (agent, _backend) = setup();
    let set = |level, secs| {
        Call::SetLoggingLevel(SetLoggingLevel {
            level,
            duration: Duration::from_secs(secs),
        })
    };
    agent.dispatch(set(1, 10)).await?;
    tokio::time::sleep(Duration::from_secs(2)).await;
    agent.dispatch(set(3, 20)).await?;

    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(agent.logging().get().await, 3);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(agent.logging().get().await, 0);

    let err = agent.dispatch(set(9, 1)).await.unwrap_err();
    assert_eq!(err.as_label(), "invalid_argument");
    Ok(())
}

struct Slow {
    name: &'static str,
}

#[async_trait]
impl MetricsSource for Slow {
    fn name(&self) -> &str {
        self.name
    }

    async fn collect(&self) -> Vec<Metric> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        vec![Metric::new(format!("{}/value", self.name), 1.0)]
    }
}

#[tokio::test(start_paused = true)]
async fn metrics_deadline_omits_slow_sources() -> anyhow::Result<()> {
    let agent = Agent::builder(Config::default())
        .with_metrics_source(Arc::new(Slow { name: "slow-a" }))
        .with_metrics_source(Arc::new(Slow { name: "slow-b" }))
        .with_metrics_source(Arc::new(Slow { name: "slow-c" }))
        .build();

    let started = tokio::time::Instant::now();
    let resp = agent
        .dispatch(Call::GetMetrics(GetMetrics {
            timeout: Some(Duration::from_millis(1)),
        }))
        .await?;
    assert!(started.elapsed() < Duration::from_millis(50));

    let Response::GetMetrics { metrics } = resp else {
        panic!("unexpected response");
    };
    assert!(metrics.iter().all(|m| !m.name.starts_with("slow-")));
    let mut names: Vec<&str> = metrics.iter().map(|m| m.name.as_str()).collect();
    let total = names.len();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), total);

    let snap = agent.metrics(Some(Duration::from_millis(1))).await;
    assert_eq!(snap.timed_out, vec!["slow-a", "slow-b", "slow-c"]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn task_snapshots_never_show_a_task_twice() -> anyhow::Result<()> {
    let store = Arc::new(TaskStore::new());
    let agent = Agent::builder(Config::default())
        .with_task_store(store.clone())
        .build();

    for i in 0..50 {
        store
            .add_task(Task::new(format!("t{i}"), "task", "fw-1"), TaskPartition::Pending)
            .await?;
    }

    let writer = tokio::spawn({
        let store = store.clone();
        async move {
            for to in [
                TaskPartition::Queued,
                TaskPartition::Launched,
                TaskPartition::Terminated,
                TaskPartition::Completed,
            ] {
                for i in 0..50 {
                    store.move_task(&format!("t{i}"), to).await?;
                }
            }
            anyhow::Ok(())
        }
    });

    while !writer.is_finished() {
        let Response::GetTasks(snap) = agent.dispatch(Call::GetTasks).await? else {
            panic!("unexpected response");
        };
        assert_eq!(snap.len(), 50);
    }
    writer.await??;

    let Response::GetTasks(snap) = agent.dispatch(Call::GetTasks).await? else {
        panic!("unexpected response");
    };
    assert_eq!(snap.completed.len(), 50);
    Ok(())
}

#[tokio::test]
async fn raw_calls_are_validated_before_dispatch() -> anyhow::Result<()> {
    let (agent, _backend) = setup();

    let raw: RawCall = serde_json::from_str(r#"{"type": "GET_HEALTH"}"#)?;
    assert_eq!(
        agent.dispatch_raw(raw).await?,
        Response::GetHealth { healthy: true }
    );

    let raw: RawCall = serde_json::from_str(
        r#"{"type": "GET_HEALTH", "kill_nested_container": {"container_id": {"value": "c1"}}}"#,
    )?;
    assert_eq!(agent.dispatch_raw(raw).await.unwrap_err().as_label(), "invalid_argument");

    let raw: RawCall = serde_json::from_str(r#"{"type": "REBOOT_NODE"}"#)?;
    assert_eq!(raw.call_type, Some(CallType::Unknown));
    assert_eq!(agent.dispatch_raw(raw).await.unwrap_err().as_label(), "invalid_argument");

    let raw = RawCall::of(CallType::WaitNestedContainer);
    assert_eq!(agent.dispatch_raw(raw).await.unwrap_err().as_label(), "invalid_argument");
    Ok(())
}
