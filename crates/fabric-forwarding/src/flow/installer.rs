//! Writes flow rules to switches.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error};

use super::types::FlowRuleDescriptor;
use crate::error::SwitchIoError;
use crate::services::SwitchHandle;
use crate::topology::dpid::switch_label;

/// Snapshot of installer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallerStats {
    pub installed: u64,
    pub failed: u64,
}

/// Submits one flow-modification message per rule.
///
/// A failed write is logged and reported to the caller; it is never retried
/// here.
#[derive(Debug, Default)]
pub struct FlowRuleInstaller {
    installed: AtomicU64,
    failed: AtomicU64,
}

impl FlowRuleInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(
        &self,
        switch: &dyn SwitchHandle,
        rule: &FlowRuleDescriptor,
    ) -> Result<(), SwitchIoError> {
        match switch.send_flow_mod(rule) {
            Ok(()) => {
                self.installed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    switch = %switch_label(switch.dpid()),
                    flow_match = %rule.flow_match,
                    actions = ?rule.actions,
                    idle = rule.idle_timeout,
                    hard = rule.hard_timeout,
                    buffer_id = rule.buffer_id.as_u32(),
                    "flow-mod written"
                );
                Ok(())
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    switch = %switch_label(switch.dpid()),
                    flow_match = %rule.flow_match,
                    error = %e,
                    "failed to write flow-mod"
                );
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> InstallerStats {
        InstallerStats {
            installed: self.installed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{AppCookie, FORWARDING_APP_ID};
    use crate::stats::StatsRequest;
    use crate::services::Xid;
    use fabric_types::{Dpid, FlowMatch, PortNo, Wildcards};
    use std::sync::Mutex;

    struct RecordingSwitch {
        dpid: Dpid,
        fail: bool,
        written: Mutex<Vec<FlowRuleDescriptor>>,
    }

    impl RecordingSwitch {
        fn new(fail: bool) -> Self {
            Self {
                dpid: Dpid::new(7),
                fail,
                written: Mutex::new(Vec::new()),
            }
        }
    }

    impl SwitchHandle for RecordingSwitch {
        fn dpid(&self) -> Dpid {
            self.dpid
        }

        fn next_transaction_id(&self) -> Xid {
            1
        }

        fn send_flow_mod(&self, rule: &FlowRuleDescriptor) -> Result<(), SwitchIoError> {
            if self.fail {
                return Err(SwitchIoError::Disconnected(self.dpid));
            }
            self.written.lock().unwrap().push(rule.clone());
            Ok(())
        }

        fn send_stats_request(&self, _xid: Xid, _request: &StatsRequest) -> Result<(), SwitchIoError> {
            Ok(())
        }

        fn fast_wildcards(&self) -> Wildcards {
            Wildcards::ALL
        }

        fn enabled_ports(&self) -> Vec<PortNo> {
            Vec::new()
        }
    }

    fn rule() -> FlowRuleDescriptor {
        FlowRuleDescriptor::new(FlowMatch::match_all(), AppCookie::new(FORWARDING_APP_ID, 0))
            .with_output(PortNo::new(3))
            .with_timeouts(5, 0)
    }

    #[test]
    fn test_install_writes_one_message() {
        let installer = FlowRuleInstaller::new();
        let switch = RecordingSwitch::new(false);

        installer.install(&switch, &rule()).unwrap();

        let written = switch.written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0], rule());
        assert_eq!(
            installer.stats(),
            InstallerStats {
                installed: 1,
                failed: 0
            }
        );
    }

    #[test]
    fn test_install_failure_is_reported_not_retried() {
        let installer = FlowRuleInstaller::new();
        let switch = RecordingSwitch::new(true);

        let err = installer.install(&switch, &rule()).unwrap_err();

        assert_eq!(err, SwitchIoError::Disconnected(Dpid::new(7)));
        assert!(switch.written.lock().unwrap().is_empty());
        assert_eq!(installer.stats().failed, 1);
        assert_eq!(installer.stats().installed, 0);
    }
}
