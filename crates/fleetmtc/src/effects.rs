//! Executes the [`fleetmtc_fsm::Effect`] vocabulary a `step` call emits.
//!
//! Grounded on design note §9's decide/do split: nothing in
//! `fleetmtc-fsm` ever touches a socket, a thread, or `tracing` directly.
//! This module is the "do" half — one function per effect kind, called
//! from [`crate::engine::MaintenanceController::apply_effects`].

use tracing::{debug, warn};

use fleetmtc_bmc::BmcRequest;
use fleetmtc_clients::{Downstream, DownstreamCommand, ServiceNodeAction, VimHostState};
use fleetmtc_fsm::{DownstreamDaemon, DownstreamOp, Effect, Event, TimerSlot, WorkingCounter};
use fleetmtc_inventory::Host;
use fleetmtc_types::HostName;

use crate::engine::MaintenanceController;

fn timer_id(host: &Host, slot: TimerSlot) -> fleetmtc_types::TimerId {
    match slot {
        TimerSlot::General => host.timers.general,
        TimerSlot::MtcAlive => host.timers.mtcalive,
        TimerSlot::Offline => host.timers.offline,
        TimerSlot::Swact => host.timers.swact,
        TimerSlot::Config => host.timers.config,
        TimerSlot::Command => host.timers.command,
        TimerSlot::Bmc => host.timers.bmc,
        TimerSlot::BmcAccess => host.timers.bmc_access,
        TimerSlot::HostServices => host.timers.host_services,
        TimerSlot::Http => host.timers.http,
        TimerSlot::Thread => host.timers.thread,
        TimerSlot::InServiceTest => host.timers.in_service_test,
        TimerSlot::OutOfServiceTest => host.timers.out_of_service_test,
        TimerSlot::Recovery => host.timers.recovery,
    }
}

fn downstream_daemon(daemon: DownstreamDaemon) -> Downstream {
    match daemon {
        DownstreamDaemon::Heartbeat => Downstream::Heartbeat,
        DownstreamDaemon::Hwmon => Downstream::Hwmon,
        DownstreamDaemon::Guest => Downstream::Guest,
        DownstreamDaemon::LogShipper => Downstream::LogShipper,
    }
}

fn downstream_op(op: DownstreamOp) -> DownstreamCommand {
    match op {
        DownstreamOp::AddHost => DownstreamCommand::AddHost,
        DownstreamOp::DelHost => DownstreamCommand::DelHost,
        DownstreamOp::StartHost => DownstreamCommand::StartHost,
        DownstreamOp::StopHost => DownstreamCommand::StopHost,
        DownstreamOp::ActiveCtrl => DownstreamCommand::ActiveCtrl,
    }
}

impl MaintenanceController {
    /// Applies one host's effects in emission order. Effects that need a
    /// reply (HA manager query, goenabled/host-services UDP round trips)
    /// stash a follow-up [`Event`] on the host's pending queue instead of
    /// blocking this call — the next tick's dispatch pass delivers it.
    pub(crate) fn apply_effects(&mut self, name: &HostName, effects: Vec<Effect>) {
        for effect in effects {
            self.apply_one(name, effect);
        }
    }

    fn apply_one(&mut self, name: &HostName, effect: Effect) {
        match effect {
            Effect::ArmTimer { timer, seconds } => {
                if let Some(host) = self.inventory.get(name) {
                    let id = timer_id(host, timer);
                    if let Err(e) = self.timers.start(id, seconds) {
                        warn!(host = %name, error = %e, "failed to arm timer");
                    }
                }
            }
            Effect::ArmTimerMs { timer, millis } => {
                if let Some(host) = self.inventory.get(name) {
                    let id = timer_id(host, timer);
                    if let Err(e) = self.timers.start_ms(id, millis) {
                        warn!(host = %name, error = %e, "failed to arm timer");
                    }
                }
            }
            Effect::StopTimer { timer } => {
                if let Some(host) = self.inventory.get(name) {
                    let id = timer_id(host, timer);
                    let _ = self.timers.stop(id);
                }
            }

            Effect::EnqueueWork { command, payload } => {
                if let Some(host) = self.inventory.get_mut(name) {
                    if let Err(e) = host.work_queue.enqueue(command, payload) {
                        warn!(host = %name, error = %e, "work queue enqueue failed");
                    }
                }
            }
            Effect::EnqueueNodeCommand { command, payload } => {
                if let Some(host) = self.inventory.get_mut(name) {
                    if let Err(e) = host.node_command_queue.enqueue(command, payload) {
                        warn!(host = %name, error = %e, "node command queue enqueue failed");
                    }
                }
            }
            Effect::PurgeQueues => {
                if let Some(host) = self.inventory.get_mut(name) {
                    host.work_queue.purge();
                    host.node_command_queue.purge();
                }
            }

            Effect::PublishStateChange { admin, oper, avail } => {
                if let Some(host) = self.inventory.get_mut(name) {
                    host.all_state_change(admin, oper, avail);
                }
                let mut req = self.clients.inventory.state_update(name, admin.as_str(), oper.as_str(), avail.as_str());
                self.http.execute(&mut req);
                let mut vim = self.clients.vim.host_state_change(name, vim_state(oper, avail));
                self.http.execute(&mut vim);
            }
            Effect::PublishSubfStateChange { oper, avail } => {
                if let Some(host) = self.inventory.get_mut(name) {
                    host.subf_state_change(oper, avail);
                }
                let mut req = self.clients.inventory.subf_state_update(name, oper.as_str(), avail.as_str());
                self.http.execute(&mut req);
            }
            Effect::PublishAvailStatus(avail) => {
                let triplet = self.inventory.get_mut(name).and_then(|host| host.avail_status_change(avail).then_some(host.state));
                if let Some(state) = triplet {
                    let mut req = self.clients.inventory.state_update(name, state.admin.as_str(), state.oper.as_str(), state.avail.as_str());
                    self.http.execute(&mut req);
                }
            }
            Effect::PublishAdminAction(action) => {
                if let Some(host) = self.inventory.get_mut(name) {
                    host.admin_action_change(action);
                }
            }

            Effect::RaiseAlarm { id, severity } => {
                let changed = self.inventory.get_mut(name).map(|h| h.set_alarm(id, severity)).unwrap_or(false);
                if changed {
                    let mut req = self.clients.alarms.publish(name, id, severity);
                    self.http.execute(&mut req);
                }
            }
            Effect::ClearAlarm { id } => {
                let changed = self.inventory.get_mut(name).map(|h| h.clear_alarm(id)).unwrap_or(false);
                if changed {
                    let mut req = self.clients.alarms.publish(name, id, fleetmtc_types::Severity::Clear);
                    self.http.execute(&mut req);
                }
            }
            Effect::ClearAllAlarms => {
                if let Some(host) = self.inventory.get_mut(name) {
                    let ids: Vec<_> = host.alarms.keys().copied().collect();
                    for id in ids {
                        host.clear_alarm(id);
                        let mut req = self.clients.alarms.publish(name, id, fleetmtc_types::Severity::Clear);
                        self.http.execute(&mut req);
                    }
                }
            }

            Effect::SendBmcCommand(command) => {
                if let Some(worker) = self.bmc_workers.get_mut(name) {
                    let request = BmcRequest { host: name.clone(), command };
                    if let Err(e) = worker.command_send(request) {
                        warn!(host = %name, error = %e, "BMC command send failed");
                    }
                } else {
                    warn!(host = %name, "no BMC worker provisioned, dropping command");
                }
            }
            Effect::KillBmcWorker => {
                if let Some(mut worker) = self.bmc_workers.remove(name) {
                    worker.kill();
                }
            }
            Effect::UnprovisionBmc => {
                if let Some(mut worker) = self.bmc_workers.remove(name) {
                    worker.kill();
                }
            }

            Effect::RequestSwact => {
                if self.clients.ha_manager.simplex() {
                    warn!(host = %name, "swact requested on a simplex system, ignoring");
                    return;
                }
                if self.coordination.swact.request(name.clone()) {
                    debug!(host = %name, "swact requested");
                }
                let mut req = self.clients.ha_manager.servicenode_request(name, ServiceNodeAction::Swact, "unlocked", "enabled", "available");
                self.http.execute(&mut req);
                self.push_pending(name, Event::HaManagerResult { success: req.is_success(), active_services: req.is_success() });
            }
            Effect::RequestMtcAlive => {
                self.send_host_command(name, fleetmtc_io::cmd::REQ_MTC_ALIVE);
            }
            Effect::SendGoenabledTest => {
                self.send_host_command(name, fleetmtc_io::cmd::GOENABLED);
            }
            Effect::SendSubfGoenabledTest => {
                self.send_host_command(name, fleetmtc_io::cmd::SUBF_GOENABLED);
            }
            Effect::StartHostServices => {
                self.send_host_command(name, fleetmtc_io::cmd::HOST_SERVICES);
            }
            Effect::StartSubfHostServices => {
                self.send_host_command(name, fleetmtc_io::cmd::SUBF_HOST_SERVICES);
            }
            Effect::StartHeartbeat => {
                self.send_downstream(name, Downstream::Heartbeat, DownstreamCommand::StartHost);
            }
            Effect::StopHeartbeat => {
                self.send_downstream(name, Downstream::Heartbeat, DownstreamCommand::StopHost);
            }
            Effect::RebootSelf => {
                if let Some(worker) = self.bmc_workers.get_mut(name) {
                    let _ = worker.command_send(BmcRequest { host: name.clone(), command: fleetmtc_bmc::BmcCommand::Reset });
                }
            }

            Effect::SetTask(task) => {
                let mut req = self.clients.inventory.task_update(name, &task);
                self.http.execute(&mut req);
            }
            Effect::ClearTask => {
                let mut req = self.clients.inventory.task_update(name, "");
                self.http.execute(&mut req);
            }

            Effect::RecordAutoRecoveryFailure(cause) => {
                if let Some(host) = self.inventory.get_mut(name) {
                    host.counters.record_auto_recovery_failure(cause);
                }
            }
            Effect::ResetAutoRecovery(cause) => {
                if let Some(host) = self.inventory.get_mut(name) {
                    host.counters.reset_auto_recovery(cause);
                }
            }
            Effect::ClearArDisabled => {
                if let Some(host) = self.inventory.get_mut(name) {
                    host.counters.ar_disabled = false;
                }
            }
            Effect::DisableAutoRecovery => {
                if let Some(host) = self.inventory.get_mut(name) {
                    host.counters.ar_disabled = true;
                }
            }

            Effect::SetDegradeCause { cause, active } => {
                if let Some(host) = self.inventory.get_mut(name) {
                    if active {
                        host.degrade_mask.insert(cause.mask());
                    } else {
                        host.degrade_mask.remove(cause.mask());
                    }
                }
            }
            Effect::ForceReenable => {
                self.push_pending(name, Event::AdminActionRequested(fleetmtc_types::AdminAction::Unlock));
            }

            Effect::RequestRootCredentialSignature => {
                let local_shadow = read_root_shadow_entry(SHADOW_PATH).unwrap_or_default();
                let mut req = self.clients.inventory.root_credential_signature(name);
                self.http.execute(&mut req);
                let inventory_signature = req
                    .response
                    .as_deref()
                    .and_then(|body| serde_json::from_slice::<serde_json::Value>(body).ok())
                    .and_then(|v| v.get("signature").and_then(|s| s.as_str().map(str::to_owned)))
                    .unwrap_or_default();
                self.push_pending(name, Event::ConfigAuditData { local_shadow, inventory_signature });
            }
            Effect::ModifyRootCredentialSignature(signature) => {
                let mut req = self.clients.inventory.modify_root_credential(name, &signature);
                self.http.execute(&mut req);
            }

            Effect::CloseMtcAliveGate => {
                self.mtcalive_gate.insert(name.clone(), false);
            }
            Effect::OpenMtcAliveGate => {
                self.mtcalive_gate.insert(name.clone(), true);
            }

            Effect::RefreshInventoryUptime(uptime_secs) => {
                let mut req = self.clients.inventory.uptime_update(name, uptime_secs);
                self.http.execute(&mut req);
            }
            Effect::RefreshLockedFile => {
                self.send_host_command(name, fleetmtc_io::cmd::REFRESH_LOCKED_FILE);
            }
            Effect::RememberUptime(uptime_secs) => {
                if let Some(host) = self.inventory.get_mut(name) {
                    host.counters.remembered_uptime_secs = uptime_secs;
                }
            }

            Effect::SetCounter { counter, value } => set_counter(self.inventory.get_mut(name), counter, value),
            Effect::IncrementCounter { counter } => {
                if let Some(host) = self.inventory.get_mut(name) {
                    let current = read_counter(host, counter);
                    set_counter(Some(host), counter, current.saturating_add(1));
                }
            }

            Effect::PushDownstream { daemon, command } => {
                self.send_downstream(name, downstream_daemon(daemon), downstream_op(command));
            }
        }
    }

    fn send_host_command(&mut self, name: &HostName, cmd: u32) {
        let Some(io) = self.io.as_mut() else { return };
        let Some(host) = self.inventory.get(name) else { return };
        let addr = std::net::SocketAddr::new(host.topology.management_ip, self.config.client.mtc_rx_mgmnt_port);
        let mut hdr = name.as_str().as_bytes().to_vec();
        hdr.resize(32, 0);
        let message = fleetmtc_io::Message::new(cmd, hdr, Vec::new());
        io.mgmnt_udp.send_best_effort(addr, &message);
    }

    fn send_downstream(&mut self, name: &HostName, daemon: Downstream, command: DownstreamCommand) {
        let Some(io) = self.io.as_mut() else { return };
        let (addr, message) = self.clients.downstream.command(daemon, command, name);
        io.mgmnt_udp.send_best_effort(addr, &message);
    }

    fn push_pending(&mut self, name: &HostName, event: Event) {
        self.pending_events.entry(name.clone()).or_default().push(event);
    }
}

fn vim_state(oper: fleetmtc_types::OperState, avail: fleetmtc_types::AvailStatus) -> VimHostState {
    use fleetmtc_types::{AvailStatus, OperState};
    match (oper, avail) {
        (OperState::Enabled, AvailStatus::Available | AvailStatus::Degraded) => VimHostState::Enabled,
        (_, AvailStatus::Offline | AvailStatus::PoweredOff) => VimHostState::Offline,
        (_, AvailStatus::Failed) => VimHostState::Failed,
        _ => VimHostState::Disabled,
    }
}

fn read_counter(host: &Host, counter: WorkingCounter) -> u32 {
    match counter {
        WorkingCounter::MtcAlivePurgeTicksRemaining => host.counters.mtcalive_purge_ticks_remaining,
        WorkingCounter::ResetProgressionRetries => host.counters.reset_progression_retries,
        WorkingCounter::BmcActionRetries => host.counters.bmc_action_retries,
        WorkingCounter::BmcActionAttempts => host.counters.bmc_action_attempts,
        WorkingCounter::FastEnableAttempts => host.counters.fast_enable_attempts,
        WorkingCounter::SwactQueryRetries => host.counters.swact_query_retries,
        WorkingCounter::OfflineProbeMisses => host.counters.offline_probe_misses,
        WorkingCounter::OnlineHits => host.counters.online_hits,
        WorkingCounter::BmcAlarmGraceElapsedSecs => host.counters.bmc_alarm_grace_elapsed_secs,
        WorkingCounter::StartServicesRetries => host.counters.start_services_retries,
    }
}

fn set_counter(host: Option<&mut Host>, counter: WorkingCounter, value: u32) {
    let Some(host) = host else { return };
    match counter {
        WorkingCounter::MtcAlivePurgeTicksRemaining => host.counters.mtcalive_purge_ticks_remaining = value,
        WorkingCounter::ResetProgressionRetries => host.counters.reset_progression_retries = value,
        WorkingCounter::BmcActionRetries => host.counters.bmc_action_retries = value,
        WorkingCounter::BmcActionAttempts => host.counters.bmc_action_attempts = value,
        WorkingCounter::FastEnableAttempts => host.counters.fast_enable_attempts = value,
        WorkingCounter::SwactQueryRetries => host.counters.swact_query_retries = value,
        WorkingCounter::OfflineProbeMisses => host.counters.offline_probe_misses = value,
        WorkingCounter::OnlineHits => host.counters.online_hits = value,
        WorkingCounter::BmcAlarmGraceElapsedSecs => host.counters.bmc_alarm_grace_elapsed_secs = value,
        WorkingCounter::StartServicesRetries => host.counters.start_services_retries = value,
    }
}

const SHADOW_PATH: &str = "/etc/shadow";

/// Reads the `root` entry out of a `/etc/shadow`-formatted file and
/// returns the exact bytes `password ":" aging_field` design note §9
/// says the digest must be taken over: `password` is the shadow record's
/// second colon-separated field, `aging_field` is every field after it
/// rejoined with `:`, preserving the original separators rather than
/// reinterpreting the individual aging columns.
fn read_root_shadow_entry(path: &str) -> Option<Vec<u8>> {
    let contents = std::fs::read_to_string(path).ok()?;
    for line in contents.lines() {
        let mut fields = line.split(':');
        let name = fields.next()?;
        if name != "root" {
            continue;
        }
        let password = fields.next()?;
        let aging: Vec<&str> = fields.collect();
        return Some(format!("{password}:{}", aging.join(":")).into_bytes());
    }
    None
}

#[cfg(test)]
mod shadow_tests {
    use super::read_root_shadow_entry;
    use std::io::Write;

    #[test]
    fn extracts_password_and_aging_fields_for_root() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "daemon:*:19000:0:99999:7:::").unwrap();
        writeln!(file, "root:$6$abc$def:19300:0:99999:7:::").unwrap();
        file.flush().unwrap();

        let entry = read_root_shadow_entry(file.path().to_str().unwrap()).unwrap();
        assert_eq!(entry, b"$6$abc$def:19300:0:99999:7:::");
    }

    #[test]
    fn missing_root_entry_yields_none() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "daemon:*:19000:0:99999:7:::").unwrap();
        file.flush().unwrap();

        assert!(read_root_shadow_entry(file.path().to_str().unwrap()).is_none());
    }
}
