use std::fs;
use std::time::Duration;

use zenith_core::mock::{LifecycleLog, MockSystem};
use zenith_core::{SystemState, Zenith, ZenithError};
use zenith_sample::heartbeat::HEARTBEAT_ORB;
use zenith_sample::{
    app_root, register_factories, run, Greeter, HeartbeatService, HeartbeatSettings,
    HeartbeatSystem,
};

fn sample() -> Zenith {
    register_factories(Zenith::new(app_root()))
        .with_environment("test")
        .with_signal_handlers(false)
        .with(HeartbeatSystem::new)
}

#[tokio::test]
async fn shipped_app_boots_and_beats() {
    let mut zenith = sample();
    let report = zenith.boot().await.unwrap();

    assert_eq!(report.systems, vec!["HeartbeatSystem"]);
    assert_eq!(report.config_orbs, vec!["HeartbeatSettings"]);

    // test.toml overrides the interval and message, default.toml supplies the greeting.
    let settings = zenith
        .container()
        .get::<HeartbeatSettings>("HeartbeatSettings")
        .unwrap();
    assert_eq!(settings.interval_ms, 10);
    assert_eq!(settings.message, "tick");
    let greeter = zenith.container().get::<Greeter>("greeter").unwrap();
    assert_eq!(greeter.greeting(), "Hello, tests!");

    tokio::time::sleep(Duration::from_millis(60)).await;
    let service = zenith.container().get::<HeartbeatService>(HEARTBEAT_ORB).unwrap();
    assert!(service.beats() >= 2, "only {} beats", service.beats());

    let shutdown = zenith.shutdown().await;
    assert!(shutdown.is_clean());
    assert_eq!(
        zenith.system_states(),
        vec![("HeartbeatSystem".to_string(), SystemState::Stopped)]
    );

    // The ticking task is gone after stop.
    let after_stop = service.beats();
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(service.beats(), after_stop);
}

#[tokio::test]
async fn run_returns_once_the_shutdown_token_fires() {
    let zenith = sample();
    let token = zenith.shutdown_token();

    let (report, _) = tokio::join!(zenith.run(), async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel();
    });

    assert!(report.unwrap().is_clean());
}

#[tokio::test]
async fn heartbeat_without_greeter_module_is_unresolved() {
    // An app root with config but without app/modules/greeter.orb.toml.
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("config")).unwrap();
    fs::write(dir.path().join("config/test.toml"), "[greeting]\ntext = \"Hi\"\n").unwrap();

    let err = register_factories(Zenith::new(dir.path()))
        .with_environment("test")
        .with_signal_handlers(false)
        .with(HeartbeatSystem::new)
        .boot()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ZenithError::UnresolvedDependency { ref dependency, ref dependent }
            if dependency == "greeter" && dependent == "heartbeat"
    ));
}

#[tokio::test]
async fn system_root_can_be_relocated() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("settings.orb.toml"),
        "[[orb]]\nname = \"HeartbeatSettings\"\ntype = \"config\"\nfactory = \"sample::heartbeat_settings\"\ndependencies = [\"zenith:config\"]\n",
    )
    .unwrap();
    let root = dir.path().to_path_buf();

    // Without the service orb the System cannot start.
    let err = register_factories(Zenith::new(app_root()))
        .with_environment("test")
        .with_signal_handlers(false)
        .with(move |container| HeartbeatSystem::new(container).with_root(root))
        .boot()
        .await
        .unwrap_err();

    assert!(matches!(err, ZenithError::SystemStartFailure { ref system, .. } if system == "HeartbeatSystem"));
}

#[tokio::test]
async fn stop_failures_do_not_fail_the_process() {
    let log = LifecycleLog::new();
    let empty_root = tempfile::tempdir().unwrap();
    let flaky = MockSystem::new("Flaky", empty_root.path(), log.clone())
        .failing_stop("socket already closed");
    let zenith = sample().with(move |_| flaky);
    let token = zenith.shutdown_token();

    let (outcome, _) = tokio::join!(run(zenith), async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel();
    });

    assert!(outcome.is_ok());
    assert_eq!(log.started(), vec!["Flaky"]);
    assert!(log.stopped().is_empty());
}
