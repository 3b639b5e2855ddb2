//! Integration tests for the scheduled refresh of a running sync service.

mod support;

use std::sync::Arc;
use std::time::Duration;

use support::{accounts, service, StaticPortal};
use washslot_domain::WashSlotError;
use washslot_infra::scheduling::{RefreshJob, RefreshScheduler, RefreshSchedulerConfig};

#[tokio::test(flavor = "multi_thread")]
async fn test_service_refresh_job_succeeds_with_partial_failures() {
    let portal = Arc::new(StaticPortal::default());
    portal.reject_login("4712");
    let sync = service(accounts(&["4711", "4712"]), portal.clone());

    sync.run().await.expect("one account refreshed");
    assert_eq!(portal.fetch_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_service_refresh_job_fails_when_every_account_fails() {
    let portal = Arc::new(StaticPortal::default());
    portal.reject_login("4711");
    let sync = service(accounts(&["4711"]), portal);

    let err = sync.run().await.expect_err("no account refreshed");
    assert!(matches!(err.0, WashSlotError::Auth(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scheduler_drives_service_refresh() {
    let portal = Arc::new(StaticPortal::default());
    let sync = Arc::new(service(accounts(&["4711"]), portal.clone()));
    let mut updates = sync.subscribe();

    let config = RefreshSchedulerConfig {
        cron_expression: "*/1 * * * * *".into(),
        job_timeout: Duration::from_secs(2),
        ..RefreshSchedulerConfig::default()
    };
    let mut scheduler = RefreshScheduler::with_config(config, sync.clone())
        .await
        .expect("scheduler created");

    scheduler.start().await.expect("start succeeds");
    let update = tokio::time::timeout(Duration::from_secs(5), updates.recv())
        .await
        .expect("refresh within deadline")
        .expect("update delivered");
    scheduler.stop().await.expect("stop succeeds");

    assert_eq!(update.stamped.account.as_str(), "4711");
    assert_eq!(update.result.pushes, 1);
    washslot_common::assert_eventually_async!(Duration::from_secs(1), async {
        scheduler.stats().runs() >= 1
    });
    sync.shutdown().await;
}
