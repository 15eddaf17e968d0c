use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::sleep;
use wakeguard_core::config::PowerSaveConfig;
use wakeguard_core::error::PowerSaveError;
use wakeguard_core::platform::xdg_desktop_portal::{InhibitFlags, PortalBus};
use wakeguard_core::platform::{DisplaySession, IdleInhibit, WindowHandle};
use wakeguard_core::power::{
    Backends, Outcome, PowerSaveBlockType, PowerSaveBlocker, ResetLoop, ScreenSaver, SkipReason,
};

use PowerSaveBlockType::{PreventAppSuspension, PreventDisplaySleep};

#[derive(Debug, Clone, PartialEq)]
enum BusCall {
    Inhibit {
        parent_window: String,
        flags: InhibitFlags,
        handle_token: String,
        reason: String,
    },
    Close(String),
}

#[derive(Default)]
struct BusLog {
    calls: Mutex<Vec<BusCall>>,
    unreachable: AtomicBool,
}

impl BusLog {
    fn calls(&self) -> Vec<BusCall> {
        self.calls.lock().unwrap().clone()
    }
}

struct FakeBus(Arc<BusLog>);

impl PortalBus for FakeBus {
    fn unique_name(&mut self) -> Result<String, PowerSaveError> {
        if self.0.unreachable.load(Ordering::SeqCst) {
            return Err(PowerSaveError::Bus("session bus unreachable".to_string()));
        }
        Ok(":1.23".to_string())
    }

    fn inhibit(
        &mut self,
        parent_window: &str,
        flags: InhibitFlags,
        handle_token: &str,
        reason: &str,
    ) -> Result<(), PowerSaveError> {
        self.0.calls.lock().unwrap().push(BusCall::Inhibit {
            parent_window: parent_window.to_string(),
            flags,
            handle_token: handle_token.to_string(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    fn close(&mut self, request_path: &str) -> Result<(), PowerSaveError> {
        self.0
            .calls
            .lock()
            .unwrap()
            .push(BusCall::Close(request_path.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct CountingScreenSaver {
    resets: AtomicUsize,
}

impl ScreenSaver for CountingScreenSaver {
    fn reset(&self) -> Result<(), PowerSaveError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Finds no display on every other tick.
#[derive(Default)]
struct FlakyScreenSaver {
    attempts: AtomicUsize,
    resets: AtomicUsize,
}

impl ScreenSaver for FlakyScreenSaver {
    fn reset(&self) -> Result<(), PowerSaveError> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
            return Err(PowerSaveError::X11("Cannot open display".to_string()));
        }
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct FakeIdleInhibit {
    calls: AtomicUsize,
    active: AtomicBool,
}

impl IdleInhibit for FakeIdleInhibit {
    fn prevent_display_sleep(&self, prevent: bool, _window: &WindowHandle) -> Result<bool, PowerSaveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.active.swap(prevent, Ordering::SeqCst) != prevent)
    }

    fn has_inhibitors(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct FakeSession {
    x11: AtomicBool,
    idle_inhibit: Mutex<Option<Arc<dyn IdleInhibit>>>,
}

impl FakeSession {
    fn x11() -> Self {
        let session = Self::default();
        session.x11.store(true, Ordering::SeqCst);
        session
    }

    fn set_idle_inhibit(&self, integration: Option<Arc<dyn IdleInhibit>>) {
        *self.idle_inhibit.lock().unwrap() = integration;
    }
}

impl DisplaySession for FakeSession {
    fn idle_inhibit(&self) -> Option<Arc<dyn IdleInhibit>> {
        self.idle_inhibit.lock().unwrap().clone()
    }

    fn is_x11(&self) -> bool {
        self.x11.load(Ordering::SeqCst)
    }
}

struct Harness {
    blocker: PowerSaveBlocker,
    bus: Arc<BusLog>,
    screen_saver: Arc<CountingScreenSaver>,
    session: Arc<FakeSession>,
}

impl Harness {
    fn new(session: FakeSession) -> Self {
        Self::with_config(session, PowerSaveConfig::default())
    }

    fn with_config(session: FakeSession, mut config: PowerSaveConfig) -> Self {
        config.reset_interval = Duration::from_secs(10);
        config.handle_token_prefix = "desktop_app".to_string();

        let bus = Arc::new(BusLog::default());
        let screen_saver = Arc::new(CountingScreenSaver::default());
        let session = Arc::new(session);
        let backends = Backends {
            portal: Some(Box::new(FakeBus(bus.clone()))),
            screen_saver: Some(screen_saver.clone()),
            session: session.clone(),
        };

        Self {
            blocker: PowerSaveBlocker::with_backends(config, backends),
            bus,
            screen_saver,
            session,
        }
    }

    fn resets(&self) -> usize {
        self.screen_saver.resets.load(Ordering::SeqCst)
    }
}

fn expected_path(call: &BusCall) -> String {
    match call {
        BusCall::Inhibit { handle_token, .. } => {
            format!("/org/freedesktop/portal/desktop/request/1_23/{handle_token}")
        },
        BusCall::Close(path) => panic!("expected an Inhibit call, got Close({path})"),
    }
}

#[tokio::test]
async fn test_app_suspension_issues_inhibit_call() {
    let mut h = Harness::new(FakeSession::default());
    let window = WindowHandle::x11(0x1c00007);

    let outcome = h
        .blocker
        .block_power_save(PreventAppSuspension, "Playing video", &window);
    assert_eq!(outcome, Outcome::Applied);
    assert!(h.blocker.is_blocked(PreventAppSuspension));

    let calls = h.bus.calls();
    assert_eq!(calls.len(), 1);
    match &calls[0] {
        BusCall::Inhibit {
            parent_window,
            flags,
            handle_token,
            reason,
        } => {
            assert_eq!(parent_window, "x11:1c00007");
            assert_eq!(flags.bits(), 4);
            assert!(handle_token.starts_with("desktop_app"));
            assert_eq!(reason, "Playing video");
        },
        other => panic!("unexpected call {other:?}"),
    }
}

#[tokio::test]
async fn test_app_suspension_prevent_twice_is_one_session() {
    let mut h = Harness::new(FakeSession::default());
    let window = WindowHandle::default();

    assert!(h.blocker.block_power_save(PreventAppSuspension, "call", &window).is_applied());
    assert_eq!(
        h.blocker.block_power_save(PreventAppSuspension, "call", &window),
        Outcome::Skipped(SkipReason::AlreadyActive)
    );
    assert_eq!(h.bus.calls().len(), 1);
}

#[tokio::test]
async fn test_app_suspension_release_without_prevent() {
    let mut h = Harness::new(FakeSession::default());

    assert_eq!(
        h.blocker.unblock_power_save(PreventAppSuspension, &WindowHandle::default()),
        Outcome::Skipped(SkipReason::NotActive)
    );
    assert!(h.bus.calls().is_empty());
}

#[tokio::test]
async fn test_app_suspension_round_trip_closes_request() {
    let mut h = Harness::new(FakeSession::default());
    let window = WindowHandle::default();

    h.blocker.block_power_save(PreventAppSuspension, "call", &window);
    let path = expected_path(&h.bus.calls()[0]);

    assert_eq!(h.blocker.unblock_power_save(PreventAppSuspension, &window), Outcome::Applied);
    assert!(!h.blocker.is_blocked(PreventAppSuspension));
    assert_eq!(h.bus.calls()[1], BusCall::Close(path));

    // Back to the initial state: another release does nothing
    assert_eq!(
        h.blocker.unblock_power_save(PreventAppSuspension, &window),
        Outcome::Skipped(SkipReason::NotActive)
    );
    assert_eq!(h.bus.calls().len(), 2);
}

#[tokio::test]
async fn test_app_suspension_bus_failure_is_contained() {
    let mut h = Harness::new(FakeSession::default());
    let window = WindowHandle::default();
    h.bus.unreachable.store(true, Ordering::SeqCst);

    let outcome = h.blocker.block_power_save(PreventAppSuspension, "call", &window);
    assert!(matches!(outcome, Outcome::Skipped(SkipReason::Failed(PowerSaveError::Bus(_)))));
    assert!(!h.blocker.is_blocked(PreventAppSuspension));
    assert!(h.bus.calls().is_empty());

    h.bus.unreachable.store(false, Ordering::SeqCst);
    assert_eq!(
        h.blocker.block_power_save(PreventAppSuspension, "call", &window),
        Outcome::Applied
    );
    assert!(h.blocker.is_blocked(PreventAppSuspension));
}

#[tokio::test]
async fn test_app_suspension_release_right_after_prevent() {
    // The portal has not answered yet; the optimistic path is closed anyway.
    let mut h = Harness::new(FakeSession::default());
    let window = WindowHandle::default();

    h.blocker.block_power_save(PreventAppSuspension, "call", &window);
    h.blocker.unblock_power_save(PreventAppSuspension, &window);

    let calls = h.bus.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1], BusCall::Close(expected_path(&calls[0])));
}

#[tokio::test]
async fn test_each_prevent_uses_a_fresh_token() {
    let mut h = Harness::new(FakeSession::default());
    let window = WindowHandle::default();

    for _ in 0..2 {
        h.blocker.block_power_save(PreventAppSuspension, "call", &window);
        h.blocker.unblock_power_save(PreventAppSuspension, &window);
    }

    let calls = h.bus.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[1], BusCall::Close(expected_path(&calls[0])));
    assert_eq!(calls[3], BusCall::Close(expected_path(&calls[2])));
}

#[tokio::test]
async fn test_drop_releases_app_suspension() {
    let h = Harness::new(FakeSession::default());
    let Harness { mut blocker, bus, .. } = h;

    blocker.block_power_save(PreventAppSuspension, "call", &WindowHandle::default());
    let path = expected_path(&bus.calls()[0]);
    drop(blocker);

    assert_eq!(bus.calls().last(), Some(&BusCall::Close(path)));
}

#[tokio::test(start_paused = true)]
async fn test_display_sleep_reset_cadence() {
    let mut h = Harness::new(FakeSession::x11());
    let window = WindowHandle::default();

    assert_eq!(h.blocker.block_power_save(PreventDisplaySleep, "video", &window), Outcome::Applied);
    assert!(h.blocker.is_blocked(PreventDisplaySleep));

    sleep(Duration::from_millis(9_500)).await;
    assert_eq!(h.resets(), 0);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(h.resets(), 1);

    sleep(Duration::from_secs(20)).await;
    assert_eq!(h.resets(), 3);

    assert_eq!(h.blocker.unblock_power_save(PreventDisplaySleep, &window), Outcome::Applied);
    assert!(!h.blocker.is_blocked(PreventDisplaySleep));

    sleep(Duration::from_secs(60)).await;
    assert_eq!(h.resets(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_display_sleep_prevent_twice_is_one_loop() {
    let mut h = Harness::new(FakeSession::x11());
    let window = WindowHandle::default();

    h.blocker.block_power_save(PreventDisplaySleep, "video", &window);
    assert_eq!(
        h.blocker.block_power_save(PreventDisplaySleep, "video", &window),
        Outcome::Skipped(SkipReason::AlreadyActive)
    );

    sleep(Duration::from_millis(10_500)).await;
    assert_eq!(h.resets(), 1);
}

#[tokio::test]
async fn test_display_sleep_release_without_prevent() {
    let mut h = Harness::new(FakeSession::x11());

    assert_eq!(
        h.blocker.unblock_power_save(PreventDisplaySleep, &WindowHandle::default()),
        Outcome::Skipped(SkipReason::NotActive)
    );
}

#[tokio::test(start_paused = true)]
async fn test_display_sleep_prefers_idle_inhibit() {
    let session = FakeSession::x11();
    let integration = Arc::new(FakeIdleInhibit::default());
    session.set_idle_inhibit(Some(integration.clone()));
    let mut h = Harness::new(session);
    let window = WindowHandle::default();

    assert_eq!(h.blocker.block_power_save(PreventDisplaySleep, "video", &window), Outcome::Applied);
    assert_eq!(
        h.blocker.block_power_save(PreventDisplaySleep, "video", &window),
        Outcome::Skipped(SkipReason::AlreadyActive)
    );
    assert!(h.blocker.is_blocked(PreventDisplaySleep));

    sleep(Duration::from_secs(60)).await;
    assert_eq!(h.resets(), 0);

    assert_eq!(h.blocker.unblock_power_save(PreventDisplaySleep, &window), Outcome::Applied);
    assert!(!h.blocker.is_blocked(PreventDisplaySleep));
    assert_eq!(integration.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_display_sleep_capability_is_rechecked() {
    let integration = Arc::new(FakeIdleInhibit::default());
    let mut h = Harness::new(FakeSession::x11());
    let window = WindowHandle::default();

    // Without the extension the reset loop is used and the extension is untouched
    h.blocker.block_power_save(PreventDisplaySleep, "video", &window);
    h.blocker.unblock_power_save(PreventDisplaySleep, &window);
    assert_eq!(integration.calls.load(Ordering::SeqCst), 0);

    h.session.set_idle_inhibit(Some(integration.clone()));
    h.blocker.block_power_save(PreventDisplaySleep, "video", &window);
    assert_eq!(integration.calls.load(Ordering::SeqCst), 1);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.resets(), 0);
}

#[tokio::test]
async fn test_display_sleep_unsupported_session() {
    let mut h = Harness::new(FakeSession::default());

    assert_eq!(
        h.blocker
            .block_power_save(PreventDisplaySleep, "video", &WindowHandle::default()),
        Outcome::Skipped(SkipReason::Unsupported)
    );
    assert!(!h.blocker.is_blocked(PreventDisplaySleep));
}

#[tokio::test(start_paused = true)]
async fn test_block_types_are_independent() {
    let mut h = Harness::new(FakeSession::x11());
    let window = WindowHandle::default();

    h.blocker.block_power_save(PreventAppSuspension, "call", &window);
    h.blocker.block_power_save(PreventDisplaySleep, "call", &window);
    h.blocker.unblock_power_save(PreventDisplaySleep, &window);

    assert!(h.blocker.is_blocked(PreventAppSuspension));
    assert!(!h.blocker.is_blocked(PreventDisplaySleep));
    assert_eq!(h.bus.calls().len(), 1);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.resets(), 0);
}

#[tokio::test]
async fn test_disabled_backends_are_skipped() {
    let config = PowerSaveConfig {
        portal: false,
        x11_reset: false,
        ..PowerSaveConfig::default()
    };
    let mut h = Harness::with_config(FakeSession::x11(), config);
    let window = WindowHandle::default();

    assert_eq!(
        h.blocker.block_power_save(PreventAppSuspension, "call", &window),
        Outcome::Skipped(SkipReason::Disabled)
    );
    assert_eq!(
        h.blocker.block_power_save(PreventDisplaySleep, "call", &window),
        Outcome::Skipped(SkipReason::Disabled)
    );
    assert!(h.bus.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_display_sleep_survives_ticks_without_display() {
    let screen_saver = Arc::new(FlakyScreenSaver::default());
    let backends = Backends {
        portal: None,
        screen_saver: Some(screen_saver.clone()),
        session: Arc::new(FakeSession::x11()),
    };
    let config = PowerSaveConfig {
        reset_interval: Duration::from_secs(10),
        ..PowerSaveConfig::default()
    };
    let mut blocker = PowerSaveBlocker::with_backends(config, backends);
    let window = WindowHandle::default();

    assert_eq!(blocker.block_power_save(PreventDisplaySleep, "video", &window), Outcome::Applied);

    sleep(Duration::from_millis(40_500)).await;
    assert_eq!(screen_saver.attempts.load(Ordering::SeqCst), 4);
    assert_eq!(screen_saver.resets.load(Ordering::SeqCst), 2);
    assert!(blocker.is_blocked(PreventDisplaySleep));

    assert_eq!(blocker.unblock_power_save(PreventDisplaySleep, &window), Outcome::Applied);
    sleep(Duration::from_secs(60)).await;
    assert_eq!(screen_saver.attempts.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_idle_inhibit_falls_back_to_reset_loop() {
    let session = FakeSession::x11();
    let integration = Arc::new(FakeIdleInhibit::default());
    session.set_idle_inhibit(Some(integration.clone()));
    let config = PowerSaveConfig {
        idle_inhibit: false,
        ..PowerSaveConfig::default()
    };
    let mut h = Harness::with_config(session, config);
    let window = WindowHandle::default();

    assert_eq!(h.blocker.block_power_save(PreventDisplaySleep, "video", &window), Outcome::Applied);
    sleep(Duration::from_millis(10_500)).await;
    assert_eq!(h.resets(), 1);

    assert_eq!(h.blocker.unblock_power_save(PreventDisplaySleep, &window), Outcome::Applied);
    assert_eq!(integration.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_reset_loop_rejects_unschedulable_interval() {
    let screen_saver = Arc::new(CountingScreenSaver::default());
    let mut reset_loop = ResetLoop::new(screen_saver, Duration::from_secs(u64::MAX));

    let outcome = reset_loop.prevent();
    assert!(matches!(
        outcome,
        Outcome::Skipped(SkipReason::Failed(PowerSaveError::InvalidPeriod(_)))
    ));
    assert!(!reset_loop.is_running());
    assert_eq!(reset_loop.release(), Outcome::Skipped(SkipReason::NotActive));
}

#[test]
fn test_reset_loop_without_runtime_is_contained() {
    let mut h = Harness::new(FakeSession::x11());

    let outcome = h
        .blocker
        .block_power_save(PreventDisplaySleep, "video", &WindowHandle::default());
    assert_eq!(outcome, Outcome::Skipped(SkipReason::Failed(PowerSaveError::NoRuntime)));
    assert!(!h.blocker.is_blocked(PreventDisplaySleep));
}
