//! Test doubles shared by the application-layer tests.

use std::cell::RefCell;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use nix::unistd::{Uid, User};

use crate::domain::{AppConfig, AppError, Result, RuntimeState, ServiceDescriptor};
use crate::infrastructure::ServiceManager;

/// In-memory service manager that mirrors systemd's caching: a unit only
/// becomes known after `daemon_reload` sees its file on disk.
pub struct FakeServiceManager {
    unit_path: PathBuf,
    state: RefCell<FakeState>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct FakeState {
    pub loaded: bool,
    pub enabled: bool,
    pub active: bool,
    pub failed: bool,
    pub refuse_start: bool,
    pub crash_after_start: bool,
    pub calls: Vec<String>,
}

impl FakeServiceManager {
    pub fn new(descriptor: &ServiceDescriptor) -> Self {
        Self {
            unit_path: descriptor.unit_path.clone(),
            state: RefCell::new(FakeState::default()),
        }
    }

    pub fn refuse_start(self) -> Self {
        self.state.borrow_mut().refuse_start = true;
        self
    }

    pub fn crash_after_start(self) -> Self {
        self.state.borrow_mut().crash_after_start = true;
        self
    }

    pub fn snapshot(&self) -> FakeState {
        self.state.borrow().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    fn record(&self, call: &str) {
        self.state.borrow_mut().calls.push(call.to_string());
    }

    fn require_loaded(&self, verb: &str, unit: &str) -> Result<()> {
        if self.state.borrow().loaded {
            Ok(())
        } else {
            Err(AppError::service_manager(format!(
                "{verb} {unit}: Unit {unit} not found."
            )))
        }
    }
}

impl ServiceManager for FakeServiceManager {
    fn daemon_reload(&self) -> Result<()> {
        self.record("daemon-reload");
        self.state.borrow_mut().loaded = self.unit_path.exists();
        Ok(())
    }

    fn runtime_state(&self, _unit: &str) -> Result<RuntimeState> {
        let s = self.state.borrow();
        Ok(if s.active {
            RuntimeState::Active
        } else if s.failed {
            RuntimeState::Failed
        } else if s.loaded {
            RuntimeState::Inactive
        } else {
            RuntimeState::NotInstalled
        })
    }

    fn is_enabled(&self, _unit: &str) -> Result<bool> {
        Ok(self.state.borrow().enabled)
    }

    fn start(&self, unit: &str) -> Result<()> {
        self.record("start");
        self.require_loaded("start", unit)?;
        let mut s = self.state.borrow_mut();
        if s.refuse_start {
            s.failed = true;
            return Err(AppError::service_manager("Job for unit failed"));
        }
        s.active = !s.crash_after_start;
        s.failed = s.crash_after_start;
        Ok(())
    }

    fn stop(&self, _unit: &str) -> Result<()> {
        self.record("stop");
        self.state.borrow_mut().active = false;
        Ok(())
    }

    fn enable(&self, unit: &str) -> Result<()> {
        self.record("enable");
        self.require_loaded("enable", unit)?;
        self.state.borrow_mut().enabled = true;
        Ok(())
    }

    fn disable(&self, _unit: &str) -> Result<()> {
        self.record("disable");
        self.state.borrow_mut().enabled = false;
        Ok(())
    }

    fn reset_failed(&self, unit: &str) -> Result<()> {
        self.record("reset-failed");
        self.require_loaded("reset-failed", unit)?;
        self.state.borrow_mut().failed = false;
        Ok(())
    }

    fn status_text(&self, unit: &str) -> Result<String> {
        let state = self.runtime_state(unit)?;
        Ok(format!("● {unit}\n   Active: {state}\n"))
    }

    fn journal(&self, unit: &str, lines: usize) -> Result<String> {
        Ok(format!("{unit}: last {lines} lines\n"))
    }
}

/// Scratch deployment: config rooted in a temp dir with a staged-ready
/// source executable and reference copy.
pub struct Sandbox {
    pub dir: tempfile::TempDir,
    pub config: AppConfig,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        let unit_dir = dir.path().join("units");
        fs::create_dir_all(&work).unwrap();
        fs::create_dir_all(&unit_dir).unwrap();

        let source = work.join("sysmon-agent");
        write_script(&source, "#!/bin/sh\nexit 0\n");

        let reference = work.join("agent.py");
        fs::write(&reference, "SERVER_HOST = '127.0.0.1'\nSERVER_PORT = 1\n").unwrap();

        let mut config = AppConfig::default();
        config.service.install_base = dir.path().join("opt");
        config.service.unit_dir = unit_dir;
        config.service.user = current_user();
        config.install.source_executable = Some(source);
        config.install.reference_source = reference;
        config.install.settle_secs = 0;
        config.install.smoke_timeout_secs = 1;
        config.verify.probe_timeout_ms = 200;

        Self { dir, config }
    }

    pub fn descriptor(&self) -> ServiceDescriptor {
        ServiceDescriptor::from_config(&self.config.service)
    }

    pub fn manager(&self) -> FakeServiceManager {
        FakeServiceManager::new(&self.descriptor())
    }
}

pub fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

pub fn current_user() -> String {
    User::from_uid(Uid::current()).unwrap().unwrap().name
}

/// Relative path and content of every file under `root`, sorted.
pub fn tree_snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<(PathBuf, Vec<u8>)>) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let rel = path.strip_prefix(base).unwrap().to_path_buf();
            if path.is_dir() {
                out.push((rel, Vec::new()));
                walk(base, &path, out);
            } else {
                out.push((rel, fs::read(&path).unwrap()));
            }
        }
    }

    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}
