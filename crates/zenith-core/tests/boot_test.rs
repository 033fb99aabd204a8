use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use zenith_core::mock::{LifecycleEvent, LifecycleLog, MockSystem};
use zenith_core::{
    orb_value, Config, Injected, StopOrder, SystemState, Zenith, ZenithError, ZENITH_CONFIG_ORB,
};

/// An application root with `config/test.toml` and room for manifests.
struct AppDir {
    dir: TempDir,
}

impl AppDir {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("app/config")).unwrap();
        fs::write(
            dir.path().join("app/config/test.toml"),
            "[greeting]\ntext = \"hello\"\n",
        )
        .unwrap();
        Self { dir }
    }

    fn app(&self) -> PathBuf {
        self.dir.path().join("app")
    }

    fn system_root(&self, name: &str) -> PathBuf {
        let root = self.dir.path().join("systems").join(name);
        fs::create_dir_all(&root).unwrap();
        root
    }

    fn manifest(&self, dir: &Path, file: &str, content: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(file), content).unwrap();
    }

    fn zenith(&self) -> Zenith {
        Zenith::new(self.app())
            .with_environment("test")
            .with_signal_handlers(false)
            .with_factory("test::unit", |_| Ok(orb_value(())))
    }
}

fn mock(app: &AppDir, name: &str, log: &LifecycleLog) -> MockSystem {
    MockSystem::new(name, app.system_root(name), log.clone())
}

#[tokio::test]
async fn systems_start_sequentially_in_registration_order() {
    let app = AppDir::new();
    let log = LifecycleLog::new();
    let s1 = mock(&app, "S1", &log).with_start_delay(Duration::from_millis(30));
    let s2 = mock(&app, "S2", &log);

    let mut zenith = app.zenith().with(move |_| s1).with(move |_| s2);
    let report = zenith.boot().await.unwrap();

    assert_eq!(report.systems, vec!["S1", "S2"]);
    assert_eq!(
        log.events(),
        vec![
            LifecycleEvent::StartBegan("S1".into()),
            LifecycleEvent::Started("S1".into()),
            LifecycleEvent::StartBegan("S2".into()),
            LifecycleEvent::Started("S2".into()),
        ]
    );

    let shutdown = zenith.shutdown().await;
    assert!(shutdown.is_clean());
    assert_eq!(shutdown.stopped, vec!["S1", "S2"]);
    assert_eq!(log.stopped(), vec!["S1", "S2"]);
    assert!(zenith
        .system_states()
        .iter()
        .all(|(_, state)| *state == SystemState::Stopped));
}

#[tokio::test]
async fn boots_without_any_system() {
    let app = AppDir::new();
    let mut zenith = app.zenith();
    let report = zenith.boot().await.unwrap();

    assert_eq!(report.environment, "test");
    assert!(report.systems.is_empty());
    // Container and config are the only orbs.
    assert_eq!(report.orbs, 2);
    let config = zenith.container().get::<Config>(ZENITH_CONFIG_ORB).unwrap();
    assert_eq!(config.get::<String>("greeting.text").unwrap(), "hello");

    assert!(zenith.shutdown().await.stopped.is_empty());
}

#[tokio::test]
async fn reverse_stop_order_is_available() {
    let app = AppDir::new();
    let log = LifecycleLog::new();
    let (a, b, c) = (mock(&app, "A", &log), mock(&app, "B", &log), mock(&app, "C", &log));

    let mut zenith = app
        .zenith()
        .with_stop_order(StopOrder::Reverse)
        .with(move |_| a)
        .with(move |_| b)
        .with(move |_| c);
    zenith.boot().await.unwrap();
    zenith.shutdown().await;

    assert_eq!(log.started(), vec!["A", "B", "C"]);
    assert_eq!(log.stopped(), vec!["C", "B", "A"]);
}

#[tokio::test]
async fn stop_failure_does_not_prevent_other_systems_from_stopping() {
    let app = AppDir::new();
    let log = LifecycleLog::new();
    let s1 = mock(&app, "S1", &log).failing_stop("disk unplugged");
    let s2 = mock(&app, "S2", &log);

    let mut zenith = app.zenith().with(move |_| s1).with(move |_| s2);
    zenith.boot().await.unwrap();
    let report = zenith.shutdown().await;

    assert_eq!(report.stopped, vec!["S2"]);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        &report.failures[0],
        ZenithError::SystemStopFailure { system, .. } if system == "S1"
    ));
    assert!(log.events().contains(&LifecycleEvent::StopBegan("S1".into())));
}

#[tokio::test]
async fn start_failure_aborts_boot_before_later_systems() {
    let app = AppDir::new();
    let log = LifecycleLog::new();
    let s1 = mock(&app, "S1", &log).failing_start("port in use");
    let s2 = mock(&app, "S2", &log);

    let mut zenith = app.zenith().with(move |_| s1).with(move |_| s2);
    let err = zenith.boot().await.unwrap_err();

    assert!(matches!(err, ZenithError::SystemStartFailure { ref system, .. } if system == "S1"));
    assert!(!log
        .events()
        .contains(&LifecycleEvent::StartBegan("S2".into())));
}

#[tokio::test]
async fn system_whose_start_failed_is_never_stopped() {
    let app = AppDir::new();
    let log = LifecycleLog::new();
    let s1 = mock(&app, "S1", &log).failing_start("boom");

    let mut zenith = app.zenith().with(move |_| s1);
    zenith.boot().await.unwrap_err();
    assert_eq!(
        zenith.system_states(),
        vec![("S1".to_string(), SystemState::Prepared)]
    );

    let report = zenith.shutdown().await;
    assert!(report.is_clean());
    assert!(report.stopped.is_empty());
    assert!(!log.events().contains(&LifecycleEvent::StopBegan("S1".into())));
}

#[tokio::test]
async fn shutdown_after_partial_boot_stops_only_started_systems() {
    let app = AppDir::new();
    let log = LifecycleLog::new();
    let s1 = mock(&app, "S1", &log);
    let s2 = mock(&app, "S2", &log).failing_start("port in use");

    let mut zenith = app.zenith().with(move |_| s1).with(move |_| s2);
    zenith.boot().await.unwrap_err();

    let report = zenith.shutdown().await;
    assert_eq!(report.stopped, vec!["S1"]);
    assert_eq!(log.stopped(), vec!["S1"]);
    assert!(!log.events().contains(&LifecycleEvent::StopBegan("S2".into())));
}

#[tokio::test]
async fn system_modules_are_merged_and_visible_at_start() {
    let app = AppDir::new();
    let log = LifecycleLog::new();
    let root = app.system_root("clock");
    app.manifest(
        &root,
        "clock.orb.toml",
        "[[orb]]\nname = \"clock\"\ntype = \"service\"\nfactory = \"test::clock\"\n",
    );
    app.manifest(
        &app.app().join("modules"),
        "report.orb.toml",
        r#"
[[orb]]
name = "report"
factory = "test::report"
dependencies = ["service", "zenith:config"]
"#,
    );

    let mut zenith = app
        .zenith()
        .with_factory("test::clock", |_| Ok(orb_value(1_700_000_000_u64)))
        .with_factory("test::report", |deps: &Injected| {
            let now = deps.one::<u64>("service")?;
            let config = deps.one::<Config>(ZENITH_CONFIG_ORB)?;
            Ok(orb_value(format!("{} at {now}", config.get::<String>("greeting.text")?)))
        })
        .with(move |container| {
            MockSystem::new("Clock", root, log)
                .with_container(container)
                .requiring("clock")
                .requiring("report")
        });

    zenith.boot().await.unwrap();
    let report = zenith.container().get::<String>("report").unwrap();
    assert_eq!(*report, "hello at 1700000000");
}

#[tokio::test]
async fn duplicate_name_across_trees_is_fatal_before_start() {
    let app = AppDir::new();
    let log = LifecycleLog::new();
    let root = app.system_root("S1");
    let manifest = "[[orb]]\nname = \"shared\"\nfactory = \"test::unit\"\n";
    app.manifest(&root, "a.orb.toml", manifest);
    app.manifest(&app.app(), "b.orb.toml", manifest);

    let s1 = MockSystem::new("S1", root, log.clone());
    let mut zenith = app.zenith().with(move |_| s1);
    let err = zenith.boot().await.unwrap_err();

    assert!(matches!(err, ZenithError::RegistrationConflict { ref name } if name == "shared"));
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn module_cannot_claim_a_reserved_name() {
    let app = AppDir::new();
    app.manifest(
        &app.app(),
        "bad.orb.toml",
        "[[orb]]\nname = \"zenith:config\"\nfactory = \"test::unit\"\n",
    );

    let err = app.zenith().boot().await.unwrap_err();
    assert!(matches!(err, ZenithError::RegistrationConflict { .. }));
}

#[tokio::test]
async fn cyclic_modules_fail_boot_without_constructing_anything() {
    let app = AppDir::new();
    let built = Arc::new(AtomicUsize::new(0));
    app.manifest(
        &app.app(),
        "cycle.orb.toml",
        r#"
[[orb]]
name = "P"
factory = "test::counted"
dependencies = ["Q"]

[[orb]]
name = "Q"
factory = "test::counted"
dependencies = ["P"]
"#,
    );

    let counter = Arc::clone(&built);
    let err = app
        .zenith()
        .with_factory("test::counted", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(orb_value(()))
        })
        .boot()
        .await
        .unwrap_err();

    assert!(matches!(err, ZenithError::CyclicDependency { ref cycle } if cycle == &["P", "Q", "P"]));
    assert_eq!(built.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_environment_config_is_fatal() {
    let app = AppDir::new();
    let err = app
        .zenith()
        .with_environment("staging")
        .boot()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ZenithError::ConfigurationFailure { ref environment, .. } if environment == "staging"
    ));
}

#[tokio::test]
async fn missing_system_root_is_a_discovery_failure() {
    let app = AppDir::new();
    let log = LifecycleLog::new();
    let gone = app.dir.path().join("nowhere");
    let err = app
        .zenith()
        .with(move |_| MockSystem::new("Ghost", gone, log))
        .boot()
        .await
        .unwrap_err();
    assert!(matches!(err, ZenithError::DiscoveryFailure { .. }));
}

#[tokio::test]
async fn config_orbs_are_reported() {
    let app = AppDir::new();
    app.manifest(
        &app.app().join("modules"),
        "web.orb.toml",
        "[[orb]]\nname = \"WebConfig\"\ntype = \"config\"\nfactory = \"test::unit\"\n",
    );

    let report = app.zenith().boot().await.unwrap();
    assert_eq!(report.config_orbs, vec!["WebConfig"]);
}

#[tokio::test]
async fn run_stops_systems_once_the_shutdown_channel_fires() {
    let app = AppDir::new();
    let log = LifecycleLog::new();
    let s1 = mock(&app, "S1", &log);
    let s2 = mock(&app, "S2", &log);

    let zenith = app.zenith().with(move |_| s1).with(move |_| s2);
    let token = zenith.shutdown_token();

    let (report, _) = tokio::join!(zenith.run(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let report = report.unwrap();
    assert!(report.is_clean());
    assert_eq!(log.started(), vec!["S1", "S2"]);
    assert_eq!(log.stopped(), vec!["S1", "S2"]);
}
