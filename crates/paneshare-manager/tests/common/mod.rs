//! In-memory backends for driving the manager without a terminal.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use paneshare_core::{BackendError, DirectBackend, DirectPane, PersistentBackend};
use paneshare_manager::{ManagerConfig, SessionManager};

// ─── Direct ───────────────────────────────────────────────────────

/// Direct backend whose panes are vectors of screen lines. Typed text shows
/// up on the pane's screen.
#[derive(Default)]
pub struct FakeDirect {
    pub connected: AtomicBool,
    pub refuse_connect: AtomicBool,
    pub fail_sends: AtomicBool,
    pub fail_splits: AtomicBool,
    /// Accept typed text without showing it on screen.
    pub swallow_input: AtomicBool,
    pub create_delay: Mutex<Option<Duration>>,
    pub split_delay: Mutex<Option<Duration>>,
    next_pane: AtomicUsize,
    calls: Mutex<Vec<String>>,
    screens: Mutex<HashMap<String, Vec<String>>>,
}

impl FakeDirect {
    pub fn connected() -> Arc<Self> {
        let fake = Self::default();
        fake.connected.store(true, Ordering::SeqCst);
        Arc::new(fake)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn screen(&self, handle: &str) -> Vec<String> {
        self.screens.lock().unwrap().get(handle).cloned().unwrap_or_default()
    }

    pub fn set_screen(&self, handle: &str, lines: &[&str]) {
        self.screens
            .lock()
            .unwrap()
            .insert(handle.to_string(), lines.iter().map(|l| l.to_string()).collect());
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn open_pane(&self) -> String {
        let n = self.next_pane.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = format!("%{n}");
        self.screens.lock().unwrap().insert(handle.clone(), Vec::new());
        handle
    }

    fn check(&self) -> Result<(), BackendError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::NotConnected)
        }
    }
}

#[async_trait]
impl DirectBackend for FakeDirect {
    async fn connect(&self) -> bool {
        let ok = !self.refuse_connect.load(Ordering::SeqCst);
        self.connected.store(ok, Ordering::SeqCst);
        ok
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn create_session(
        &self,
        command: Option<&str>,
        profile: Option<&str>,
    ) -> Result<DirectPane, BackendError> {
        self.check()?;
        let delay = *self.create_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let handle = self.open_pane();
        self.record(format!(
            "create {} {}",
            command.unwrap_or("-"),
            profile.unwrap_or("-")
        ));
        Ok(DirectPane::new(handle).in_window("@1"))
    }

    async fn send_text(&self, handle: &str, text: &str) -> Result<(), BackendError> {
        self.check()?;
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(BackendError::CallFailed("pane is gone".into()));
        }
        self.record(format!("send {handle} {text:?}"));
        if self.swallow_input.load(Ordering::SeqCst) {
            return Ok(());
        }
        let mut screens = self.screens.lock().unwrap();
        let screen = screens.entry(handle.to_string()).or_default();
        screen.extend(text.lines().filter(|l| !l.trim().is_empty()).map(String::from));
        Ok(())
    }

    async fn split_pane(
        &self,
        handle: &str,
        vertical: bool,
        command: Option<&str>,
    ) -> Result<DirectPane, BackendError> {
        self.check()?;
        if self.fail_splits.load(Ordering::SeqCst) {
            return Err(BackendError::CallFailed("no space for new pane".into()));
        }
        let delay = *self.split_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let child = self.open_pane();
        self.record(format!(
            "split {handle} {} {}",
            if vertical { "v" } else { "h" },
            command.unwrap_or("-")
        ));
        Ok(DirectPane::new(child))
    }

    async fn close_session(&self, handle: &str) -> Result<(), BackendError> {
        self.check()?;
        self.record(format!("close {handle}"));
        self.screens.lock().unwrap().remove(handle);
        Ok(())
    }

    async fn activate_session(&self, handle: &str) -> Result<(), BackendError> {
        self.check()?;
        self.record(format!("activate {handle}"));
        Ok(())
    }

    async fn screen_contents(&self, handle: &str) -> Result<Vec<String>, BackendError> {
        self.check()?;
        Ok(self.screen(handle))
    }

    async fn get_variable(&self, handle: &str, name: &str) -> Result<Option<String>, BackendError> {
        self.check()?;
        Ok((name == "path").then(|| format!("/work/{}", handle.trim_start_matches('%'))))
    }
}

// ─── Persistent ───────────────────────────────────────────────────

/// Persistent backend keeping one line buffer per named session.
#[derive(Default)]
pub struct FakePersistent {
    pub missing: bool,
    pub fail_sends: AtomicBool,
    pub fail_captures: AtomicBool,
    pub fail_kills: AtomicBool,
    probes: AtomicUsize,
    calls: Mutex<Vec<String>>,
    sessions: Mutex<HashMap<String, Vec<String>>>,
}

impl FakePersistent {
    pub fn installed() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn not_installed() -> Arc<Self> {
        Arc::new(Self {
            missing: true,
            ..Default::default()
        })
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Simulate program output appearing in the session.
    pub fn emit(&self, name: &str, lines: &[&str]) {
        self.sessions
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .extend(lines.iter().map(|l| l.to_string()));
    }

    pub fn set_buffer(&self, name: &str, lines: Vec<String>) {
        self.sessions.lock().unwrap().insert(name.to_string(), lines);
    }

    pub fn has_session(&self, name: &str) -> bool {
        self.sessions.lock().unwrap().contains_key(name)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PersistentBackend for FakePersistent {
    async fn probe(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        !self.missing
    }

    fn attach_command(&self, name: &str, command: Option<&str>) -> String {
        match command {
            Some(command) => format!("tmux new-session -A -s {name} '{command}'"),
            None => format!("tmux new-session -A -s {name}"),
        }
    }

    fn human_attach_command(&self, name: &str) -> String {
        format!("tmux attach -t {name}")
    }

    async fn new_session(&self, name: &str, command: Option<&str>) -> Result<(), BackendError> {
        self.record(format!("new {name} {}", command.unwrap_or("-")));
        self.sessions.lock().unwrap().entry(name.to_string()).or_default();
        Ok(())
    }

    async fn send_keys(&self, name: &str, text: &str) -> Result<(), BackendError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(BackendError::CallFailed(format!("can't find session: {name}")));
        }
        self.record(format!("keys {name} {text:?}"));
        self.emit(name, &[text.trim_end()]);
        Ok(())
    }

    async fn capture(&self, name: &str) -> Result<Vec<String>, BackendError> {
        if self.fail_captures.load(Ordering::SeqCst) {
            return Err(BackendError::CallFailed(format!("can't find session: {name}")));
        }
        Ok(self.sessions.lock().unwrap().get(name).cloned().unwrap_or_default())
    }

    async fn kill_session(&self, name: &str) -> Result<(), BackendError> {
        self.record(format!("kill {name}"));
        if self.fail_kills.load(Ordering::SeqCst) {
            return Err(BackendError::CallFailed("server exited".into()));
        }
        self.sessions.lock().unwrap().remove(name);
        Ok(())
    }
}

// ─── Harness ──────────────────────────────────────────────────────

pub struct Harness {
    pub manager: SessionManager,
    pub direct: Arc<FakeDirect>,
    pub persistent: Arc<FakePersistent>,
}

pub fn harness() -> Harness {
    harness_with(FakeDirect::connected(), FakePersistent::installed())
}

pub fn harness_with(direct: Arc<FakeDirect>, persistent: Arc<FakePersistent>) -> Harness {
    let config = ManagerConfig {
        submit_settle: Duration::from_millis(1),
        ..ManagerConfig::default()
    };
    let manager = SessionManager::new(
        Arc::clone(&direct) as Arc<dyn DirectBackend>,
        Arc::clone(&persistent) as Arc<dyn PersistentBackend>,
        config,
    );
    Harness {
        manager,
        direct,
        persistent,
    }
}

pub fn numbered(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("line {i}")).collect()
}
