//! In-memory ETABS stand-in for orchestration tests.

#![allow(dead_code)]

use etab_cli::{
    file_operations, AutomationBackend, CaseStatus, ConnectionConfig, EtabsApplication,
    EtabsError, FileOperations,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use tempfile::TempDir;

/// Observable state of the fake application.
#[derive(Debug, Default)]
pub struct FakeState {
    pub installed: bool,
    pub running: bool,
    pub can_start: bool,
    pub version: Option<String>,
    pub current: Option<PathBuf>,
    /// Non-zero status returned when opening a given path.
    pub open_failures: HashMap<PathBuf, i32>,
    /// `None` makes the case status query fail.
    pub cases: Option<Vec<CaseStatus>>,
    pub export_status: i32,
    /// Make the model path query panic, as a misbehaving interop layer would.
    pub crash_on_model_path: bool,

    pub attach_calls: usize,
    pub create_calls: usize,
    pub open_calls: Vec<PathBuf>,
    pub export_calls: Vec<PathBuf>,
}

#[derive(Clone)]
pub struct FakeEtabs {
    pub state: Rc<RefCell<FakeState>>,
}

impl FakeEtabs {
    /// Installed and running, nothing loaded, one finished case.
    pub fn running() -> Self {
        Self::with(FakeState {
            installed: true,
            running: true,
            version: Some("22.1.0".to_string()),
            cases: Some(vec![CaseStatus::new("Dead", 4)]),
            ..Default::default()
        })
    }

    /// Installed but no instance running.
    pub fn stopped() -> Self {
        let fake = Self::running();
        fake.state.borrow_mut().running = false;
        fake
    }

    pub fn not_installed() -> Self {
        Self::with(FakeState::default())
    }

    pub fn with(state: FakeState) -> Self {
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub fn open(self, path: &Path) -> Self {
        self.state.borrow_mut().current = Some(path.to_path_buf());
        self
    }

    pub fn files(&self) -> FileOperations {
        let config = ConnectionConfig {
            startup_delay: Duration::ZERO,
            ..Default::default()
        };
        file_operations(Box::new(FakeBackend(self.state.clone())), &config)
    }

    pub fn connection_attempts(&self) -> usize {
        let state = self.state.borrow();
        state.attach_calls + state.create_calls
    }

    pub fn current(&self) -> Option<PathBuf> {
        self.state.borrow().current.clone()
    }

    pub fn open_calls(&self) -> Vec<PathBuf> {
        self.state.borrow().open_calls.clone()
    }

    pub fn export_calls(&self) -> Vec<PathBuf> {
        self.state.borrow().export_calls.clone()
    }
}

struct FakeBackend(Rc<RefCell<FakeState>>);

impl AutomationBackend for FakeBackend {
    fn is_installed(&self) -> bool {
        self.0.borrow().installed
    }

    fn is_running(&self) -> etab_cli::Result<bool> {
        Ok(self.0.borrow().running)
    }

    fn create(&self) -> etab_cli::Result<Box<dyn EtabsApplication>> {
        let mut state = self.0.borrow_mut();
        state.create_calls += 1;
        if !state.can_start {
            return Err(EtabsError::com("CoCreateInstance", "class not registered"));
        }
        state.running = true;
        Ok(Box::new(FakeApp(self.0.clone())))
    }

    fn attach(&self) -> etab_cli::Result<Box<dyn EtabsApplication>> {
        let mut state = self.0.borrow_mut();
        state.attach_calls += 1;
        if !state.running {
            return Err(EtabsError::com("GetActiveObject", "operation unavailable"));
        }
        Ok(Box::new(FakeApp(self.0.clone())))
    }
}

struct FakeApp(Rc<RefCell<FakeState>>);

impl EtabsApplication for FakeApp {
    fn version(&self) -> etab_cli::Result<String> {
        self.0
            .borrow()
            .version
            .clone()
            .ok_or_else(|| EtabsError::com("GetVersion", "not available"))
    }

    fn model_path(&self) -> etab_cli::Result<String> {
        if self.0.borrow().crash_on_model_path {
            panic!("interop layer crashed");
        }
        Ok(self
            .0
            .borrow()
            .current
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default())
    }

    fn open_file(&mut self, path: &Path) -> etab_cli::Result<i32> {
        let mut state = self.0.borrow_mut();
        state.open_calls.push(path.to_path_buf());
        if let Some(code) = state.open_failures.get(path).copied() {
            return Ok(code);
        }
        state.current = Some(path.to_path_buf());
        Ok(0)
    }

    fn case_statuses(&self) -> etab_cli::Result<Vec<CaseStatus>> {
        self.0
            .borrow()
            .cases
            .clone()
            .ok_or_else(|| EtabsError::com("GetCaseStatus", "model is locked"))
    }

    fn export_file(&mut self, path: &Path, _format_code: i32) -> etab_cli::Result<i32> {
        let mut state = self.0.borrow_mut();
        state.export_calls.push(path.to_path_buf());
        if state.export_status != 0 {
            return Ok(state.export_status);
        }
        std::fs::write(path, "$ File exported from ETABS\n\n$ PROGRAM INFORMATION\n")?;
        Ok(0)
    }
}

/// Temporary directory with helpers for creating model files.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Create `name` with placeholder content and return its path.
    pub fn file(&self, name: &str) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, b"model").expect("write fixture");
        path
    }
}
