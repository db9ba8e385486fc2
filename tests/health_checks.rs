//! Health checking against real TCP backends.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use reverse_proxy_core::config::{ConfigHooks, HealthCheckConfig};
use reverse_proxy_core::health::{
    HealthCheckEngine, HealthState, HyperProbeTransport, RequestOutcome,
};
use reverse_proxy_core::lifecycle::Shutdown;
use reverse_proxy_core::{ConfigCoordinator, RequestAttributes, ResolveError, Resolver};

mod common;

fn health(threshold: u32) -> HealthCheckConfig {
    HealthCheckConfig {
        enabled: true,
        interval_ms: 60_000,
        timeout_ms: 1_000,
        path: "/health".into(),
        healthy_threshold: threshold,
        unhealthy_threshold: threshold,
        passive_failure_threshold: 3,
    }
}

fn health_of(coordinator: &ConfigCoordinator, cluster: &str, endpoint: &str) -> HealthState {
    coordinator
        .snapshot()
        .pool(cluster)
        .unwrap()
        .member(endpoint)
        .unwrap()
        .state
        .health()
}

fn pick_ids(resolver: &Resolver, n: usize) -> Vec<String> {
    (0..n)
        .map(|_| {
            let ctx = resolver.resolve(&RequestAttributes::get("example.com", "/")).unwrap();
            let guard = ctx.pick().unwrap();
            guard.endpoint_id.clone()
        })
        .collect()
}

#[tokio::test]
async fn test_failed_endpoint_removed_from_rotation() {
    let (addr_a, a_up) = common::start_switchable_backend().await;
    let (addr_b, _b_up) = common::start_switchable_backend().await;

    let coordinator = Arc::new(ConfigCoordinator::default());
    coordinator
        .apply(common::config(
            vec![common::route("all", "/*", "backend1")],
            vec![common::with_health(
                common::cluster(
                    "backend1",
                    &[("A", format!("http://{addr_a}")), ("B", format!("http://{addr_b}"))],
                ),
                health(2),
            )],
        ))
        .unwrap();

    let engine = HealthCheckEngine::new(&coordinator, Arc::new(HyperProbeTransport::new()));
    let resolver = Resolver::new(coordinator.clone());

    a_up.store(false, Ordering::SeqCst);

    engine.check_cluster_now("backend1").await;
    assert_eq!(health_of(&coordinator, "backend1", "A"), HealthState::Unknown);

    engine.check_cluster_now("backend1").await;
    assert_eq!(health_of(&coordinator, "backend1", "A"), HealthState::Unhealthy);
    assert_eq!(health_of(&coordinator, "backend1", "B"), HealthState::Healthy);

    assert!(pick_ids(&resolver, 6).iter().all(|id| id == "B"));

    // Recovery needs two consecutive successes.
    a_up.store(true, Ordering::SeqCst);
    engine.check_cluster_now("backend1").await;
    assert!(pick_ids(&resolver, 4).iter().all(|id| id == "B"));
    engine.check_cluster_now("backend1").await;

    let picks = pick_ids(&resolver, 4);
    assert!(picks.contains(&"A".to_string()) && picks.contains(&"B".to_string()));
}

#[tokio::test]
async fn test_unreachable_endpoint_marked_unhealthy() {
    // Grab a free port, then close it.
    let closed = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let (addr_b, _) = common::start_switchable_backend().await;

    let coordinator = Arc::new(ConfigCoordinator::default());
    coordinator
        .apply(common::config(
            vec![common::route("all", "/*", "backend1")],
            vec![common::with_health(
                common::cluster(
                    "backend1",
                    &[("A", format!("http://{closed}")), ("B", format!("http://{addr_b}"))],
                ),
                health(1),
            )],
        ))
        .unwrap();

    let engine = HealthCheckEngine::new(&coordinator, Arc::new(HyperProbeTransport::new()));
    engine.check_cluster_now("backend1").await;

    assert_eq!(health_of(&coordinator, "backend1", "A"), HealthState::Unhealthy);
    assert_eq!(health_of(&coordinator, "backend1", "B"), HealthState::Healthy);
}

#[tokio::test]
async fn test_all_endpoints_down_is_no_available_endpoint() {
    let (addr_a, a_up) = common::start_switchable_backend().await;
    a_up.store(false, Ordering::SeqCst);

    let coordinator = Arc::new(ConfigCoordinator::default());
    coordinator
        .apply(common::config(
            vec![common::route("all", "/*", "backend1")],
            vec![common::with_health(
                common::cluster("backend1", &[("A", format!("http://{addr_a}"))]),
                health(1),
            )],
        ))
        .unwrap();

    HealthCheckEngine::new(&coordinator, Arc::new(HyperProbeTransport::new()))
        .check_cluster_now("backend1")
        .await;

    let err = Resolver::new(coordinator)
        .resolve(&RequestAttributes::get("example.com", "/"))
        .unwrap_err();
    assert_eq!(
        err,
        ResolveError::NoAvailableEndpoint {
            cluster_id: "backend1".into()
        }
    );
    assert_eq!(err.status_code().as_u16(), 503);
}

#[tokio::test]
async fn test_custom_health_metadata_enables_probing() {
    let (addr_a, _) = common::start_switchable_backend().await;

    let coordinator = Arc::new(ConfigCoordinator::default());
    coordinator
        .apply(common::config(
            vec![common::route("all", "/*", "meta")],
            vec![common::with_metadata(
                common::cluster("meta", &[("A", format!("http://{addr_a}"))]),
                &[("CustomHealth", "TRUE")],
            )],
        ))
        .unwrap();

    let cluster = coordinator.snapshot().cluster("meta").unwrap();
    assert!(cluster.health_check.enabled);

    let engine = HealthCheckEngine::new(&coordinator, Arc::new(HyperProbeTransport::new()));
    assert_eq!(engine.check_cluster_now("meta").await, 1);
}

#[tokio::test]
async fn test_explicit_override_beats_custom_health_metadata() {
    let hooks = ConfigHooks::new().configure_cluster("meta", |mut c| {
        if let Some(hc) = c.health_check.as_mut() {
            hc.enabled = false;
        }
        c
    });
    let coordinator = ConfigCoordinator::new(hooks);
    coordinator
        .apply(common::config(
            vec![],
            vec![common::with_metadata(
                common::cluster("meta", &[("A", "http://127.0.0.1:1".to_string())]),
                &[("CustomHealth", "true")],
            )],
        ))
        .unwrap();

    assert!(!coordinator.snapshot().cluster("meta").unwrap().health_check.enabled);
}

#[tokio::test]
async fn test_passive_failures_then_active_recovery() {
    let (addr_a, _) = common::start_switchable_backend().await;
    let (addr_b, _) = common::start_switchable_backend().await;

    let coordinator = Arc::new(ConfigCoordinator::default());
    coordinator
        .apply(common::config(
            vec![common::route("all", "/*", "backend1")],
            vec![common::with_health(
                common::cluster(
                    "backend1",
                    &[("A", format!("http://{addr_a}")), ("B", format!("http://{addr_b}"))],
                ),
                health(1),
            )],
        ))
        .unwrap();
    let resolver = Resolver::new(coordinator.clone());

    for _ in 0..3 {
        let mut ctx = resolver.resolve(&RequestAttributes::get("example.com", "/")).unwrap();
        ctx.retain_endpoints(|e| e.endpoint_id == "A");
        let guard = ctx.pick().unwrap();
        guard.report(RequestOutcome::UpstreamServerError);
    }
    assert_eq!(health_of(&coordinator, "backend1", "A"), HealthState::Unhealthy);
    assert!(pick_ids(&resolver, 4).iter().all(|id| id == "B"));

    // A real probe finds A answering again.
    HealthCheckEngine::new(&coordinator, Arc::new(HyperProbeTransport::new()))
        .check_cluster_now("backend1")
        .await;
    assert_eq!(health_of(&coordinator, "backend1", "A"), HealthState::Healthy);
}

#[tokio::test]
async fn test_engine_follows_reload_and_stops_on_shutdown() {
    let (addr_a, a_up) = common::start_switchable_backend().await;
    a_up.store(false, Ordering::SeqCst);

    let mut fast = health(1);
    fast.interval_ms = 20;

    let coordinator = Arc::new(ConfigCoordinator::default());
    coordinator
        .apply(common::config(
            vec![common::route("all", "/*", "backend1")],
            vec![common::cluster("backend1", &[("A", format!("http://{addr_a}"))])],
        ))
        .unwrap();

    let shutdown = Shutdown::new();
    let engine = HealthCheckEngine::new(&coordinator, Arc::new(HyperProbeTransport::new()));
    let handle = tokio::spawn(engine.run(shutdown.subscribe()));

    // Health checks disabled: nothing probes A.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(health_of(&coordinator, "backend1", "A"), HealthState::Unknown);

    coordinator
        .apply(common::config(
            vec![common::route("all", "/*", "backend1")],
            vec![common::with_health(
                common::cluster("backend1", &[("A", format!("http://{addr_a}"))]),
                fast,
            )],
        ))
        .unwrap();

    let mut marked = false;
    for _ in 0..50 {
        if health_of(&coordinator, "backend1", "A") == HealthState::Unhealthy {
            marked = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(marked, "engine did not pick up the reloaded cluster");

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("engine did not exit on shutdown")
        .unwrap();
}
