//! Executes a [`Plan`] against a [`SystemIntegration`].
//!
//! Steps run strictly in order. The first failing step stops the run and is
//! reported as [`Error::StepFailed`]; steps that already completed are not
//! rolled back; re-running the operation is the recovery path.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::artifact::Layout;
use crate::error::{Error, Result};
use crate::plan::{Operation, Plan, Step};
use crate::policy::{Confirm, OverwritePolicy};
use crate::state::{ServiceState, Transition};
use crate::system::SystemIntegration;

/// Why a step did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The existing helper was kept
    OverwriteDeclined,
    /// The file to remove was already gone
    AlreadyAbsent,
    /// The service manager does not know the unit
    ServiceAbsent,
}

/// Result of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum StepOutcome {
    Applied,
    Skipped(SkipReason),
}

/// A completed step and its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: Step,
    pub outcome: StepOutcome,
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub operation: Operation,
    pub records: Vec<StepRecord>,
    pub final_state: ServiceState,
}

impl Report {
    /// Outcome of `step`, if it ran.
    #[must_use]
    pub fn outcome(&self, step: Step) -> Option<StepOutcome> {
        self.records.iter().find(|r| r.step == step).map(|r| r.outcome)
    }

    /// Number of steps that changed something.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.records.iter().filter(|r| r.outcome == StepOutcome::Applied).count()
    }
}

/// Runs lifecycle plans for one layout.
pub struct Runner<'a> {
    system: &'a mut dyn SystemIntegration,
    layout: &'a Layout,
    policy: OverwritePolicy,
    confirm: &'a mut dyn Confirm,
    state: Option<ServiceState>,
}

impl<'a> Runner<'a> {
    /// Create a runner.
    #[must_use]
    pub fn new(
        system: &'a mut dyn SystemIntegration,
        layout: &'a Layout,
        policy: OverwritePolicy,
        confirm: &'a mut dyn Confirm,
    ) -> Self {
        Self { system, layout, policy, confirm, state: None }
    }

    /// Run every step of `plan` in order.
    ///
    /// # Errors
    /// Returns [`Error::StepFailed`] wrapping the first step error.
    pub fn run(&mut self, plan: &Plan) -> Result<Report> {
        info!(operation = %plan.operation(), steps = plan.len(), "Starting");

        let mut records = Vec::with_capacity(plan.len());
        for &step in plan.steps() {
            match self.run_step(step) {
                Ok(outcome) => {
                    match outcome {
                        StepOutcome::Applied => info!(%step, "Done"),
                        StepOutcome::Skipped(reason) => info!(%step, ?reason, "Skipped"),
                    }
                    records.push(StepRecord { step, outcome });
                }
                Err(e) => {
                    error!(%step, error = %e, completed = records.len(), "Step failed, stopping");
                    return Err(Error::StepFailed {
                        step,
                        completed: records.len(),
                        source: Box::new(e),
                    });
                }
            }
        }

        let final_state = self.current_state()?;
        if !final_state.is_terminal() {
            warn!(state = %final_state, "Service left in an intermediate state");
        }
        info!(operation = %plan.operation(), state = %final_state, "Finished");
        Ok(Report { operation: plan.operation(), records, final_state })
    }

    /// Run a single step.
    ///
    /// # Errors
    /// Returns the step's own error, unwrapped.
    pub fn run_step(&mut self, step: Step) -> Result<StepOutcome> {
        debug!(%step, privileged = step.is_privileged(), "Running step");
        let layout = self.layout;

        match step {
            Step::CheckPrivilege => self.system.check_privilege()?,
            Step::InstallRule => {
                self.require_source(&layout.rule.source)?;
                self.system.install_rule(&layout.rule.source, &layout.rule.target)?;
            }
            Step::RemoveRule => {
                if !self.system.file_exists(&layout.rule.target) {
                    return Ok(StepOutcome::Skipped(SkipReason::AlreadyAbsent));
                }
                self.system.remove_rule(&layout.rule.target)?;
            }
            Step::ReloadHotplug => self.system.reload_hotplug()?,
            Step::PlaceBinary => {
                self.require_source(&layout.binary.source)?;
                let target = &layout.binary.target;
                if self.system.file_exists(target)
                    && !self.policy.allows_overwrite(target, &mut *self.confirm)?
                {
                    warn!(?target, "Keeping existing helper binary");
                    return Ok(StepOutcome::Skipped(SkipReason::OverwriteDeclined));
                }
                self.system.place_binary(&layout.binary.source, target)?;
            }
            Step::RemoveBinary => {
                if !self.system.file_exists(&layout.binary.target) {
                    return Ok(StepOutcome::Skipped(SkipReason::AlreadyAbsent));
                }
                self.system.remove_binary(&layout.binary.target)?;
            }
            Step::RegisterService => {
                self.require_source(&layout.descriptor.source)?;
                self.system.register_service(&layout.descriptor.source, &layout.descriptor.target)?;
            }
            Step::UnregisterService => {
                let next = self.current_state()?.apply(Transition::Remove)?;
                if self.system.file_exists(&layout.descriptor.target) {
                    self.system.unregister_service(&layout.descriptor.target)?;
                } else {
                    self.state = Some(next);
                    return Ok(StepOutcome::Skipped(SkipReason::AlreadyAbsent));
                }
                self.state = Some(next);
            }
            Step::ReloadServices => self.system.reload_services()?,
            Step::EnableAndStart => {
                if !self.system.file_exists(&layout.binary.target) {
                    return Err(Error::BinaryMissing(layout.binary.target.clone()));
                }
                let current = self.refresh_state()?;
                let next = current.apply(Transition::Install)?;
                self.system.start_service(&layout.unit_name)?;
                self.state = Some(next);
            }
            Step::DisableAndStop => {
                let current = self.refresh_state()?;
                if current == ServiceState::Absent {
                    return Ok(StepOutcome::Skipped(SkipReason::ServiceAbsent));
                }
                let next = current.apply(Transition::DisableAndStop)?;
                self.system.stop_service(&layout.unit_name)?;
                self.state = Some(next);
            }
        }

        Ok(StepOutcome::Applied)
    }

    fn require_source(&self, source: &Path) -> Result<()> {
        if self.system.file_exists(source) {
            Ok(())
        } else {
            Err(Error::MissingArtifact(source.to_path_buf()))
        }
    }

    /// Ask the manager for the unit's state and remember it.
    fn refresh_state(&mut self) -> Result<ServiceState> {
        let state = self.system.service_state(&self.layout.unit_name)?;
        self.state = Some(state);
        Ok(state)
    }

    fn current_state(&mut self) -> Result<ServiceState> {
        match self.state {
            Some(state) => Ok(state),
            None => self.refresh_state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeCall, FakeSystem};
    use crate::policy::MockConfirm;
    use crate::system::MockSystemIntegration;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn no_prompt() -> MockConfirm {
        let mut confirm = MockConfirm::new();
        confirm.expect_confirm().never();
        confirm
    }

    fn run(
        system: &mut FakeSystem,
        layout: &Layout,
        operation: Operation,
        policy: OverwritePolicy,
    ) -> Result<Report> {
        let mut confirm = no_prompt();
        Runner::new(system, layout, policy, &mut confirm).run(&Plan::for_operation(operation))
    }

    #[test]
    fn test_fresh_install() {
        let (mut system, layout) = FakeSystem::desktop();

        let report = run(&mut system, &layout, Operation::Install, OverwritePolicy::PromptCaller)
            .expect("install failed");

        assert_eq!(report.final_state, ServiceState::RegisteredRunning);
        assert_eq!(report.applied(), 7);
        assert!(system.file_exists(&layout.rule.target));
        assert!(system.is_executable(&layout.binary.target));
        assert!(system.hotplug_rules().contains(&layout.rule.target));
        assert_eq!(system.service_state(&layout.unit_name).unwrap(), ServiceState::RegisteredRunning);
    }

    #[test]
    fn test_install_call_order() {
        let (mut system, layout) = FakeSystem::desktop();
        run(&mut system, &layout, Operation::Install, OverwritePolicy::AlwaysOverwrite).unwrap();

        assert_eq!(
            system.calls(),
            &[
                FakeCall::CheckPrivilege,
                FakeCall::InstallRule,
                FakeCall::ReloadHotplug,
                FakeCall::PlaceBinary,
                FakeCall::RegisterService,
                FakeCall::ReloadServices,
                FakeCall::StartService,
            ]
        );
    }

    #[test]
    fn test_install_is_idempotent() {
        let (mut system, layout) = FakeSystem::desktop();
        run(&mut system, &layout, Operation::Install, OverwritePolicy::AlwaysOverwrite).unwrap();
        let once = system.snapshot();

        let report =
            run(&mut system, &layout, Operation::Install, OverwritePolicy::AlwaysOverwrite).unwrap();

        assert_eq!(report.final_state, ServiceState::RegisteredRunning);
        assert_eq!(system.snapshot(), once);
    }

    #[test]
    fn test_install_uninstall_round_trip() {
        let (mut system, layout) = FakeSystem::desktop();
        let before = system.snapshot();

        run(&mut system, &layout, Operation::Install, OverwritePolicy::PromptCaller).unwrap();
        let report =
            run(&mut system, &layout, Operation::Uninstall, OverwritePolicy::PromptCaller).unwrap();

        assert_eq!(report.final_state, ServiceState::Absent);
        assert_eq!(system.snapshot(), before);
    }

    #[test]
    fn test_uninstall_reports_absent_not_stopped() {
        let (mut system, layout) = FakeSystem::desktop();
        run(&mut system, &layout, Operation::Install, OverwritePolicy::PromptCaller).unwrap();
        run(&mut system, &layout, Operation::Uninstall, OverwritePolicy::PromptCaller).unwrap();

        assert_eq!(system.service_state(&layout.unit_name).unwrap(), ServiceState::Absent);
        assert!(!system.file_exists(&layout.rule.target));
        assert!(!system.file_exists(&layout.binary.target));
        assert!(!system.file_exists(&layout.descriptor.target));
        assert!(system.hotplug_rules().is_empty());
    }

    #[test]
    fn test_uninstall_on_clean_machine_skips() {
        let (mut system, layout) = FakeSystem::desktop();

        let report =
            run(&mut system, &layout, Operation::Uninstall, OverwritePolicy::PromptCaller).unwrap();

        assert_eq!(
            report.outcome(Step::DisableAndStop),
            Some(StepOutcome::Skipped(SkipReason::ServiceAbsent))
        );
        assert_eq!(
            report.outcome(Step::RemoveBinary),
            Some(StepOutcome::Skipped(SkipReason::AlreadyAbsent))
        );
        assert_eq!(report.final_state, ServiceState::Absent);
        assert!(!system.calls().contains(&FakeCall::StopService));
    }

    #[test]
    fn test_reinstall_declined_keeps_old_binary() {
        let (mut system, layout) = FakeSystem::desktop();
        run(&mut system, &layout, Operation::Install, OverwritePolicy::PromptCaller).unwrap();
        let old = system.contents(&layout.binary.target).unwrap().to_string();
        system.write_file(&layout.binary.source, "#!/usr/bin/python3\n# v2\n", false);

        let mut confirm = MockConfirm::new();
        confirm.expect_confirm().times(1).returning(|_| Ok(false));
        let report = Runner::new(&mut system, &layout, OverwritePolicy::PromptCaller, &mut confirm)
            .run(&Plan::for_operation(Operation::Install))
            .unwrap();

        assert_eq!(
            report.outcome(Step::PlaceBinary),
            Some(StepOutcome::Skipped(SkipReason::OverwriteDeclined))
        );
        assert_eq!(report.final_state, ServiceState::RegisteredRunning);
        assert_eq!(system.contents(&layout.binary.target), Some(old.as_str()));
    }

    #[test]
    fn test_reinstall_accepted_replaces_binary() {
        let (mut system, layout) = FakeSystem::desktop();
        run(&mut system, &layout, Operation::Install, OverwritePolicy::PromptCaller).unwrap();
        system.write_file(&layout.binary.source, "#!/usr/bin/python3\n# v2\n", false);

        let mut confirm = MockConfirm::new();
        confirm.expect_confirm().times(1).returning(|_| Ok(true));
        Runner::new(&mut system, &layout, OverwritePolicy::PromptCaller, &mut confirm)
            .run(&Plan::for_operation(Operation::Install))
            .unwrap();

        assert_eq!(system.contents(&layout.binary.target), Some("#!/usr/bin/python3\n# v2\n"));
        assert!(system.is_executable(&layout.binary.target));
    }

    #[test]
    fn test_missing_privilege_changes_nothing() {
        let (mut system, layout) = FakeSystem::desktop();
        system.set_privileged(false);
        let before = system.snapshot();

        let err = run(&mut system, &layout, Operation::Install, OverwritePolicy::AlwaysOverwrite)
            .unwrap_err();

        assert_matches!(
            err,
            Error::StepFailed { step: Step::CheckPrivilege, completed: 0, .. }
        );
        assert_matches!(err.root(), Error::PrivilegeUnavailable(_));
        assert_eq!(system.snapshot(), before);
    }

    #[test]
    fn test_missing_rule_source() {
        let (mut system, layout) = FakeSystem::desktop();
        system.remove_file(&layout.rule.source);

        let err = run(&mut system, &layout, Operation::Install, OverwritePolicy::AlwaysOverwrite)
            .unwrap_err();

        assert_matches!(err, Error::StepFailed { step: Step::InstallRule, completed: 1, .. });
        assert_matches!(err.root(), Error::MissingArtifact(path) if *path == layout.rule.source);
    }

    #[test]
    fn test_missing_helper_source() {
        let (mut system, layout) = FakeSystem::desktop();
        system.remove_file(&layout.binary.source);

        let err = run(&mut system, &layout, Operation::Install, OverwritePolicy::AlwaysOverwrite)
            .unwrap_err();

        assert_matches!(err, Error::StepFailed { step: Step::PlaceBinary, completed: 3, .. });
        assert_matches!(err.root(), Error::MissingArtifact(path) if *path == layout.binary.source);
        assert!(system.file_exists(&layout.rule.target));
        assert!(!system.file_exists(&layout.binary.target));
        assert!(!system.file_exists(&layout.descriptor.target));
        assert_eq!(system.service_state(&layout.unit_name).unwrap(), ServiceState::Absent);
    }

    #[test]
    fn test_missing_descriptor_source() {
        let (mut system, layout) = FakeSystem::desktop();
        system.remove_file(&layout.descriptor.source);

        let err = run(&mut system, &layout, Operation::Install, OverwritePolicy::AlwaysOverwrite)
            .unwrap_err();

        assert_matches!(err, Error::StepFailed { step: Step::RegisterService, completed: 4, .. });
        assert_matches!(
            err.root(),
            Error::MissingArtifact(path) if *path == layout.descriptor.source
        );
        assert!(system.is_executable(&layout.binary.target));
        assert!(!system.file_exists(&layout.descriptor.target));
        assert!(!system.calls().contains(&FakeCall::StartService));
    }

    #[test]
    fn test_prompt_failure_halts_at_place_binary() {
        let (mut system, layout) = FakeSystem::desktop();
        run(&mut system, &layout, Operation::Install, OverwritePolicy::PromptCaller).unwrap();
        let old = system.contents(&layout.binary.target).unwrap().to_string();
        system.write_file(&layout.binary.source, "#!/usr/bin/python3\n# v2\n", false);

        let mut confirm = MockConfirm::new();
        confirm
            .expect_confirm()
            .times(1)
            .returning(|_| Err(Error::Prompt("stdin closed".to_string())));
        let err = Runner::new(&mut system, &layout, OverwritePolicy::PromptCaller, &mut confirm)
            .run(&Plan::for_operation(Operation::Install))
            .unwrap_err();

        assert_matches!(err, Error::StepFailed { step: Step::PlaceBinary, completed: 3, .. });
        assert_matches!(err.root(), Error::Prompt(_));
        assert_eq!(system.contents(&layout.binary.target), Some(old.as_str()));
        assert_eq!(system.service_state(&layout.unit_name).unwrap(), ServiceState::RegisteredRunning);
    }

    #[test]
    fn test_stop_failure_leaves_files() {
        let (mut system, layout) = FakeSystem::desktop();
        run(&mut system, &layout, Operation::Install, OverwritePolicy::PromptCaller).unwrap();
        system.fail_on(FakeCall::StopService);

        let err = run(&mut system, &layout, Operation::Uninstall, OverwritePolicy::PromptCaller)
            .unwrap_err();

        assert_matches!(err, Error::StepFailed { step: Step::DisableAndStop, .. });
        assert!(system.file_exists(&layout.descriptor.target));
        assert!(system.file_exists(&layout.binary.target));
        assert!(system.file_exists(&layout.rule.target));
        assert_eq!(system.service_state(&layout.unit_name).unwrap(), ServiceState::RegisteredRunning);
    }

    #[test]
    fn test_rerun_after_partial_install_recovers() {
        let (mut system, layout) = FakeSystem::desktop();
        system.fail_on(FakeCall::ReloadServices);
        assert!(run(&mut system, &layout, Operation::Install, OverwritePolicy::AlwaysOverwrite).is_err());
        assert!(system.file_exists(&layout.binary.target));
        assert_eq!(system.service_state(&layout.unit_name).unwrap(), ServiceState::Absent);

        system.clear_failure();
        let report =
            run(&mut system, &layout, Operation::Install, OverwritePolicy::AlwaysOverwrite).unwrap();
        assert_eq!(report.final_state, ServiceState::RegisteredRunning);
    }

    #[test]
    fn test_enable_refuses_without_binary() {
        let (mut system, layout) = FakeSystem::desktop();
        let mut confirm = no_prompt();
        let mut runner =
            Runner::new(&mut system, &layout, OverwritePolicy::NeverOverwrite, &mut confirm);
        runner.run_step(Step::RegisterService).unwrap();
        runner.run_step(Step::ReloadServices).unwrap();

        assert_matches!(
            runner.run_step(Step::EnableAndStart),
            Err(Error::BinaryMissing(path)) if path == layout.binary.target
        );
    }

    #[test]
    fn test_placement_failure_never_starts_service() {
        let (_, layout) = FakeSystem::desktop();
        let binary_target = layout.binary.target.clone();

        let mut system = MockSystemIntegration::new();
        system.expect_check_privilege().returning(|| Ok(()));
        system.expect_file_exists().returning(move |path| path != binary_target.as_path());
        system.expect_install_rule().returning(|_, _| Ok(()));
        system.expect_reload_hotplug().returning(|| Ok(()));
        // Reports success without producing the file.
        system.expect_place_binary().times(1).returning(|_, _| Ok(()));
        system.expect_register_service().returning(|_, _| Ok(()));
        system.expect_reload_services().returning(|| Ok(()));
        system.expect_service_state().never();
        system.expect_start_service().never();

        let mut confirm = no_prompt();
        let err = Runner::new(&mut system, &layout, OverwritePolicy::PromptCaller, &mut confirm)
            .run(&Plan::for_operation(Operation::Install))
            .unwrap_err();

        assert_matches!(err, Error::StepFailed { step: Step::EnableAndStart, completed: 6, .. });
        assert_matches!(err.root(), Error::BinaryMissing(_));
    }

    #[test]
    fn test_rejected_start_surfaces() {
        let (_, layout) = FakeSystem::desktop();

        let mut system = MockSystemIntegration::new();
        system.expect_check_privilege().returning(|| Ok(()));
        system.expect_file_exists().returning(|_| true);
        system.expect_install_rule().returning(|_, _| Ok(()));
        system.expect_reload_hotplug().returning(|| Ok(()));
        system.expect_place_binary().returning(|_, _| Ok(()));
        system.expect_register_service().returning(|_, _| Ok(()));
        system.expect_reload_services().returning(|| Ok(()));
        system.expect_service_state().returning(|_| Ok(ServiceState::RegisteredStopped));
        system
            .expect_start_service()
            .times(1)
            .returning(|unit| Err(Error::UnitNotFound(unit.to_string())));

        let mut confirm = MockConfirm::new();
        confirm.expect_confirm().returning(|_| Ok(true));
        let err = Runner::new(&mut system, &layout, OverwritePolicy::PromptCaller, &mut confirm)
            .run(&Plan::for_operation(Operation::Install))
            .unwrap_err();

        assert_matches!(err.root(), Error::UnitNotFound(unit) if unit == "nova-chatmix.service");
    }

    #[test]
    fn test_stop_rejection_halts_uninstall() {
        let (_, layout) = FakeSystem::desktop();

        let mut system = MockSystemIntegration::new();
        system.expect_check_privilege().returning(|| Ok(()));
        system.expect_service_state().returning(|_| Ok(ServiceState::RegisteredRunning));
        system.expect_stop_service().times(1).returning(|_| {
            Err(Error::CommandFailed {
                program: "systemctl".into(),
                status: "exit status: 1".into(),
                stderr: "Failed to disable unit".into(),
            })
        });
        system.expect_file_exists().returning(|_| true);
        system.expect_unregister_service().never();
        system.expect_remove_binary().never();
        system.expect_remove_rule().never();
        system.expect_reload_hotplug().never();

        let mut confirm = no_prompt();
        let err = Runner::new(&mut system, &layout, OverwritePolicy::PromptCaller, &mut confirm)
            .run(&Plan::for_operation(Operation::Uninstall))
            .unwrap_err();

        assert_matches!(err, Error::StepFailed { step: Step::DisableAndStop, completed: 1, .. });
    }

    fn operation_strategy() -> impl Strategy<Value = Operation> {
        prop_oneof![Just(Operation::Install), Just(Operation::Uninstall)]
    }

    fn policy_strategy() -> impl Strategy<Value = OverwritePolicy> {
        prop_oneof![Just(OverwritePolicy::AlwaysOverwrite), Just(OverwritePolicy::NeverOverwrite)]
    }

    proptest! {
        #[test]
        fn prop_last_operation_decides_state(
            ops in proptest::collection::vec((operation_strategy(), policy_strategy()), 1..8)
        ) {
            let (mut system, layout) = FakeSystem::desktop();
            let pristine = system.snapshot();

            for (operation, policy) in &ops {
                run(&mut system, &layout, *operation, *policy).unwrap();
            }

            match ops.last().map(|(op, _)| *op) {
                Some(Operation::Install) => {
                    prop_assert_eq!(
                        system.service_state(&layout.unit_name).unwrap(),
                        ServiceState::RegisteredRunning
                    );
                    prop_assert!(system.is_executable(&layout.binary.target));
                    prop_assert!(system.hotplug_rules().contains(&layout.rule.target));
                }
                _ => {
                    prop_assert_eq!(system.snapshot(), pristine);
                }
            }
        }
    }
}
