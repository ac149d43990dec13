//! In-memory host used to exercise the lifecycle without touching the OS.
//!
//! The model keeps the behaviors the lifecycle depends on: the hotplug
//! subsystem and the service manager only see file changes after a reload,
//! starting a unit whose executable is missing fails, and a running unit
//! stays loaded after its descriptor is deleted.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::artifact::{InstallDirs, Layout, Sources};
use crate::error::{Error, Result};
use crate::rule::HotplugRule;
use crate::state::ServiceState;
use crate::system::SystemIntegration;
use crate::unit::{ServiceUnit, exec_start_path};

/// Operations recorded by [`FakeSystem`], in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeCall {
    CheckPrivilege,
    InstallRule,
    RemoveRule,
    ReloadHotplug,
    PlaceBinary,
    RemoveBinary,
    RegisterService,
    UnregisterService,
    ReloadServices,
    StartService,
    StopService,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FakeFile {
    contents: String,
    executable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FakeUnit {
    contents: String,
    enabled: bool,
    running: bool,
}

/// Observable state for before/after comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    files: BTreeMap<PathBuf, FakeFile>,
    units: BTreeMap<String, FakeUnit>,
    hotplug_rules: BTreeSet<PathBuf>,
}

/// In-memory filesystem, hotplug subsystem and user service manager.
#[derive(Debug, Clone)]
pub struct FakeSystem {
    home: PathBuf,
    dirs: InstallDirs,
    privileged: bool,
    files: BTreeMap<PathBuf, FakeFile>,
    units: BTreeMap<String, FakeUnit>,
    hotplug_rules: BTreeSet<PathBuf>,
    calls: Vec<FakeCall>,
    failing: Option<FakeCall>,
}

impl FakeSystem {
    /// Empty system with privilege escalation available.
    pub fn new(home: impl Into<PathBuf>, dirs: InstallDirs) -> Self {
        Self {
            home: home.into(),
            dirs,
            privileged: true,
            files: BTreeMap::new(),
            units: BTreeMap::new(),
            hotplug_rules: BTreeSet::new(),
            calls: Vec::new(),
            failing: None,
        }
    }

    /// A typical desktop: standard directories under `/home/user` and the
    /// bundled artifacts present under `/usr/share/novamix`.
    #[must_use]
    pub fn desktop() -> (Self, Layout) {
        let home = PathBuf::from("/home/user");
        let dirs = InstallDirs {
            rules_dir: PathBuf::from("/etc/udev/rules.d"),
            bin_dir: home.join(".local/bin"),
            unit_dir: home.join(".config/systemd/user"),
        };
        let share = Path::new("/usr/share/novamix");
        let sources = Sources {
            rule: share.join("50-nova-pro-wireless.rules"),
            descriptor: share.join("nova-chatmix.service"),
            helper: share.join("nova-chatmix.py"),
        };
        let layout = Layout::new(&sources, &dirs);

        let mut system = Self::new(home, dirs);
        system.write_file(&sources.rule, &HotplugRule::default().render(), false);
        system.write_file(&sources.descriptor, &ServiceUnit::default().render(), false);
        system.write_file(&sources.helper, "#!/usr/bin/python3\n", false);

        (system, layout)
    }

    pub fn write_file(&mut self, path: &Path, contents: &str, executable: bool) {
        self.files.insert(
            path.to_path_buf(),
            FakeFile { contents: contents.to_string(), executable },
        );
    }

    pub fn remove_file(&mut self, path: &Path) {
        self.files.remove(path);
    }

    #[must_use]
    pub fn contents(&self, path: &Path) -> Option<&str> {
        self.files.get(path).map(|f| f.contents.as_str())
    }

    #[must_use]
    pub fn is_executable(&self, path: &Path) -> bool {
        self.files.get(path).is_some_and(|f| f.executable)
    }

    pub fn set_privileged(&mut self, privileged: bool) {
        self.privileged = privileged;
    }

    /// Make every subsequent `call` fail until [`Self::clear_failure`].
    pub fn fail_on(&mut self, call: FakeCall) {
        self.failing = Some(call);
    }

    pub fn clear_failure(&mut self) {
        self.failing = None;
    }

    #[must_use]
    pub fn calls(&self) -> &[FakeCall] {
        &self.calls
    }

    /// Rule files the hotplug subsystem has loaded.
    #[must_use]
    pub fn hotplug_rules(&self) -> &BTreeSet<PathBuf> {
        &self.hotplug_rules
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            files: self.files.clone(),
            units: self.units.clone(),
            hotplug_rules: self.hotplug_rules.clone(),
        }
    }

    fn record(&mut self, call: FakeCall) -> Result<()> {
        self.calls.push(call);
        if self.failing == Some(call) {
            return Err(Error::CommandFailed {
                program: "fake".to_string(),
                status: "exit status: 1".to_string(),
                stderr: format!("injected {call:?} failure"),
            });
        }
        Ok(())
    }

    fn require_privilege(&self) -> Result<()> {
        if self.privileged {
            Ok(())
        } else {
            Err(Error::PrivilegeUnavailable("no escalation method".to_string()))
        }
    }

    fn copy(&mut self, source: &Path, target: &Path, executable: bool) -> Result<()> {
        let contents = self
            .files
            .get(source)
            .map(|f| f.contents.clone())
            .ok_or_else(|| Error::MissingArtifact(source.to_path_buf()))?;
        self.write_file(target, &contents, executable);
        Ok(())
    }

    fn descriptors_on_disk(&self) -> BTreeMap<String, String> {
        self.files
            .iter()
            .filter(|(path, _)| path.parent() == Some(self.dirs.unit_dir.as_path()))
            .filter_map(|(path, file)| {
                let name = path.file_name()?.to_string_lossy().into_owned();
                Some((name, file.contents.clone()))
            })
            .collect()
    }
}

impl SystemIntegration for FakeSystem {
    fn check_privilege(&mut self) -> Result<()> {
        self.record(FakeCall::CheckPrivilege)?;
        self.require_privilege()
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn install_rule(&mut self, source: &Path, target: &Path) -> Result<()> {
        self.record(FakeCall::InstallRule)?;
        self.require_privilege()?;
        self.copy(source, target, false)
    }

    fn remove_rule(&mut self, target: &Path) -> Result<()> {
        self.record(FakeCall::RemoveRule)?;
        self.require_privilege()?;
        self.files.remove(target);
        Ok(())
    }

    fn reload_hotplug(&mut self) -> Result<()> {
        self.record(FakeCall::ReloadHotplug)?;
        self.require_privilege()?;
        self.hotplug_rules = self
            .files
            .keys()
            .filter(|path| path.parent() == Some(self.dirs.rules_dir.as_path()))
            .cloned()
            .collect();
        Ok(())
    }

    fn place_binary(&mut self, source: &Path, target: &Path) -> Result<()> {
        self.record(FakeCall::PlaceBinary)?;
        self.copy(source, target, true)
    }

    fn remove_binary(&mut self, target: &Path) -> Result<()> {
        self.record(FakeCall::RemoveBinary)?;
        self.files.remove(target);
        Ok(())
    }

    fn register_service(&mut self, source: &Path, target: &Path) -> Result<()> {
        self.record(FakeCall::RegisterService)?;
        self.copy(source, target, false)
    }

    fn unregister_service(&mut self, target: &Path) -> Result<()> {
        self.record(FakeCall::UnregisterService)?;
        self.files.remove(target);
        Ok(())
    }

    fn reload_services(&mut self) -> Result<()> {
        self.record(FakeCall::ReloadServices)?;
        let on_disk = self.descriptors_on_disk();

        self.units.retain(|name, unit| unit.running || on_disk.contains_key(name));
        for (name, contents) in on_disk {
            self.units
                .entry(name)
                .and_modify(|unit| unit.contents.clone_from(&contents))
                .or_insert(FakeUnit { contents, enabled: false, running: false });
        }
        Ok(())
    }

    fn start_service(&mut self, unit: &str) -> Result<()> {
        self.record(FakeCall::StartService)?;
        let contents = self
            .units
            .get(unit)
            .map(|u| u.contents.clone())
            .ok_or_else(|| Error::UnitNotFound(unit.to_string()))?;

        let exec = exec_start_path(&contents, &self.home).ok_or_else(|| Error::CommandFailed {
            program: "systemctl".to_string(),
            status: "exit status: 1".to_string(),
            stderr: format!("{unit} has no ExecStart= setting"),
        })?;
        if !self.is_executable(&exec) {
            return Err(Error::ExecutableNotFound(exec));
        }

        if let Some(state) = self.units.get_mut(unit) {
            state.enabled = true;
            state.running = true;
        }
        Ok(())
    }

    fn stop_service(&mut self, unit: &str) -> Result<()> {
        self.record(FakeCall::StopService)?;
        let state = self.units.get_mut(unit).ok_or_else(|| Error::UnitNotFound(unit.to_string()))?;
        state.enabled = false;
        state.running = false;
        Ok(())
    }

    fn service_state(&self, unit: &str) -> Result<ServiceState> {
        Ok(match self.units.get(unit) {
            None => ServiceState::Absent,
            Some(u) if u.running => ServiceState::RegisteredRunning,
            Some(_) => ServiceState::RegisteredStopped,
        })
    }
}
