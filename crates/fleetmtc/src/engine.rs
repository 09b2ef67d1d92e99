//! The maintenance controller's owned state and one-tick main loop.
//!
//! Grounded on design note §9's "Model as a `Controller` value" and the
//! data-flow spec.md §4.8 describes: drain timers and I/O into events,
//! run the FSM dispatch pass per host, execute the effects it emits,
//! advance the fleet coordinator. No step function in `fleetmtc-fsm` is
//! called from anywhere but here.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use fleetmtc_bmc::BmcWorker;
use fleetmtc_clients::{AlarmClient, DownstreamClient, HaManagerClient, InventoryClient, VimClient};
use fleetmtc_config::FleetmtcConfig;
use fleetmtc_coordinator::{ControllerTracker, DorWindow, MnfaTracker, SwactOrchestrator};
use fleetmtc_fsm::{Event, FsmContext};
use fleetmtc_inventory::{Host, Inventory};
use fleetmtc_io::{cmd, tick_duration, IoSources};
use fleetmtc_queue::QueueResult;
use fleetmtc_timer::TimerRegistry;
use fleetmtc_types::{HostFlags, HostName};

use crate::error::Result;
use crate::http_client::HttpClient;
use crate::metrics::Metrics;

/// Base URLs for the outgoing API surfaces (spec.md §4.6), resolved once
/// at startup from configuration/service discovery and handed to the
/// client builders.
#[derive(Debug, Clone)]
pub struct BaseUrls {
    pub sysinv: String,
    pub ha_manager: String,
    pub vim: String,
    pub fm: String,
}

pub(crate) struct ClientSet {
    pub inventory: InventoryClient,
    pub ha_manager: HaManagerClient,
    pub vim: VimClient,
    pub alarms: AlarmClient,
    pub downstream: DownstreamClient,
}

/// Fleet-level tracking the coordinator owns across ticks (spec.md
/// §4.4.10): which controller is active, an in-flight Swact request,
/// MNFA, and the startup DOR window.
pub(crate) struct Coordination {
    pub controller: ControllerTracker,
    pub swact: SwactOrchestrator,
    pub mnfa: MnfaTracker,
    pub dor: DorWindow,
}

/// The maintenance controller: owns the node inventory, the shared timer
/// registry, one BMC worker thread per provisioned host, the outgoing API
/// clients, and (outside of tests) the non-blocking I/O sources.
pub struct MaintenanceController {
    pub(crate) config: FleetmtcConfig,
    self_host: HostName,
    pub(crate) inventory: Inventory,
    pub(crate) timers: TimerRegistry,
    pub(crate) bmc_workers: HashMap<HostName, BmcWorker>,
    pub(crate) http: HttpClient,
    pub(crate) clients: ClientSet,
    pub(crate) coordination: Coordination,
    pub(crate) io: Option<IoSources>,
    /// `mtcAlive_gate` (spec.md §3 invariant 5): while closed for a host,
    /// incoming mtcAlive datagrams are received but never translated into
    /// [`Event::MtcAliveReceived`] — set by the Reset/Reboot/Power action
    /// FSMs for the duration of a deliberate action.
    pub(crate) mtcalive_gate: HashMap<HostName, bool>,
    /// Events an effect produced that only make sense on a later tick
    /// (an HA-manager reply, a forced re-enable) — drained before
    /// `Event::Tick` on the next pass for that host.
    pub(crate) pending_events: HashMap<HostName, Vec<Event>>,
    /// In-process metrics registry (SPEC_FULL.md §0); refreshed once per
    /// tick, never scraped by anything in this crate.
    pub(crate) metrics: Metrics,
}

impl MaintenanceController {
    pub fn new(config: FleetmtcConfig, self_host: HostName, base_urls: BaseUrls, simplex: bool, io: Option<IoSources>) -> Result<Self> {
        let clients = ClientSet {
            inventory: InventoryClient::new(
                base_urls.sysinv,
                config.timeouts.sysinv_timeout as u64,
                config.timeouts.sysinv_noncrit_timeout as u64,
                config.agent.api_retries,
            ),
            ha_manager: HaManagerClient::new(base_urls.ha_manager, config.timeouts.swact_timeout as u64, self_host.as_str(), simplex),
            vim: VimClient::new(base_urls.vim),
            alarms: AlarmClient::new(base_urls.fm),
            downstream: DownstreamClient::new(
                loopback_port(config.agent.mtc_to_hbs_cmd_port),
                loopback_port(config.client.hwmon_cmd_port),
                loopback_port(config.agent.mtc_to_guest_cmd_port),
                loopback_port(config.client.daemon_log_port),
            ),
        };

        Ok(Self {
            config,
            self_host: self_host.clone(),
            inventory: Inventory::new(),
            timers: TimerRegistry::new(256),
            bmc_workers: HashMap::new(),
            http: HttpClient::new(),
            clients,
            coordination: Coordination {
                controller: ControllerTracker::new(self_host, simplex),
                swact: SwactOrchestrator::default(),
                mnfa: MnfaTracker::new(config.agent.mnfa_threshold, 300),
                dor: DorWindow::default(),
            },
            io,
            mtcalive_gate: HashMap::new(),
            pending_events: HashMap::new(),
            metrics: Metrics::new()?,
        })
    }

    pub fn self_host(&self) -> &HostName {
        &self.self_host
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Activates (or skips) the startup Dead-Office-Recovery window
    /// (spec.md §4.4.10). Call once after the inventory has been
    /// populated from the load at startup.
    pub fn evaluate_dor_window(&mut self, controller_uptime_secs: u64) {
        let enabled_hosts = self.inventory.iter().filter(|h| h.state.oper == fleetmtc_types::OperState::Enabled).count() as u32;
        self.coordination.dor = DorWindow::evaluate_at_startup(controller_uptime_secs, enabled_hosts, self.config.timeouts.dor_mode_timeout);
    }

    /// Add FSM entry point (spec.md §3 lifecycle): loads a host record
    /// and provisions its timer handles and BMC worker thread.
    pub fn add_host<F>(&mut self, host: Host, bmc_perform: F) -> Result<()>
    where
        F: Fn(&fleetmtc_bmc::BmcRequest) -> (fleetmtc_bmc::BmcStatus, String) + Send + 'static,
    {
        let name = host.name.clone();
        self.inventory.add(host)?;
        self.provision_timers(&name);
        self.bmc_workers.insert(name.clone(), BmcWorker::spawn(16, bmc_perform));
        self.mtcalive_gate.insert(name, true);
        Ok(())
    }

    fn provision_timers(&mut self, name: &HostName) {
        use fleetmtc_timer::TimerCategory;
        let Some(host) = self.inventory.get_mut(name) else { return };
        let owner = name.clone();
        host.timers.general = self.timers.init(owner.clone(), TimerCategory::Host);
        host.timers.mtcalive = self.timers.init(owner.clone(), TimerCategory::Host);
        host.timers.offline = self.timers.init(owner.clone(), TimerCategory::Host);
        host.timers.swact = self.timers.init(owner.clone(), TimerCategory::Host);
        host.timers.config = self.timers.init(owner.clone(), TimerCategory::Host);
        host.timers.command = self.timers.init(owner.clone(), TimerCategory::Host);
        host.timers.bmc = self.timers.init(owner.clone(), TimerCategory::Recovery);
        host.timers.bmc_access = self.timers.init(owner.clone(), TimerCategory::Recovery);
        host.timers.host_services = self.timers.init(owner.clone(), TimerCategory::Host);
        host.timers.http = self.timers.init(owner.clone(), TimerCategory::Host);
        host.timers.thread = self.timers.init(owner.clone(), TimerCategory::Thread);
        host.timers.in_service_test = self.timers.init(owner.clone(), TimerCategory::Host);
        host.timers.out_of_service_test = self.timers.init(owner.clone(), TimerCategory::Host);
        host.timers.recovery = self.timers.init(owner, TimerCategory::Recovery);

        let ids = [
            host.timers.general,
            host.timers.mtcalive,
            host.timers.offline,
            host.timers.swact,
            host.timers.config,
            host.timers.command,
            host.timers.bmc,
            host.timers.bmc_access,
            host.timers.host_services,
            host.timers.http,
            host.timers.thread,
            host.timers.in_service_test,
            host.timers.out_of_service_test,
            host.timers.recovery,
        ];
        for id in ids {
            self.inventory.index_timer(id, name.clone());
        }
    }

    /// Delete FSM entry point: kills the host's BMC worker before removing
    /// its inventory record (spec.md §3 lifecycle: "kill any in-flight BMC
    /// worker").
    pub fn delete_host(&mut self, name: &HostName) -> Result<()> {
        if let Some(mut worker) = self.bmc_workers.remove(name) {
            worker.kill();
        }
        self.mtcalive_gate.remove(name);
        self.pending_events.remove(name);
        self.inventory.delete(name)?;
        Ok(())
    }

    /// Requests an admin action against `name` (Unlock, Lock, Reset,
    /// Reboot, Reinstall, Swact, Power on/off). Delivered as the next
    /// `Event::AdminActionRequested` the host's dispatch pass processes.
    pub fn request_admin_action(&mut self, name: &HostName, action: fleetmtc_types::AdminAction) {
        self.pending_events.entry(name.clone()).or_default().push(Event::AdminActionRequested(action));
    }

    /// Runs one pass of the main loop: drains the timer wheel and any
    /// ready I/O, dispatches the FSM engine for every host, then advances
    /// the fleet coordinator's clocks.
    pub fn tick(&mut self) -> Result<()> {
        let tick = tick_duration(self.coordination.controller.simplex());
        self.timers.drain();
        self.poll_io(tick)?;

        let names: Vec<HostName> = self.inventory.names().cloned().collect();
        for name in names {
            self.dispatch_host(&name);
        }

        let delta_secs = tick.as_secs().max(1) as u32;
        if self.coordination.mnfa.tick(delta_secs) {
            debug!("MNFA window closed");
        }
        self.coordination.dor.tick(delta_secs);

        self.metrics.observe(&self.inventory, self.coordination.mnfa.active_member_count());

        Ok(())
    }

    /// In-process metrics registry (SPEC_FULL.md §0). No HTTP exporter is
    /// wired up by this crate; a caller that wants to scrape it registers
    /// its own listener against [`Metrics::registry`].
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn poll_io(&mut self, tick: Duration) -> Result<()> {
        let Some(io) = self.io.as_mut() else { return Ok(()) };
        let mut events = mio::Events::with_capacity(128);
        io.wait(tick, &mut events)?;

        let datagrams = io.mgmnt_udp.recv_batch();
        for (_from, message) in datagrams {
            self.handle_inbound_message(message);
        }
        if let Some(cluster) = io.cluster_udp.as_mut() {
            for (_from, message) in cluster.recv_batch() {
                self.handle_inbound_message(message);
            }
        }

        if io.credential_watch.poll() {
            debug!("credential file changed, forcing an out-of-schedule config audit");
            let names: Vec<HostName> = self.inventory.names().cloned().collect();
            for name in names {
                self.pending_events.entry(name).or_default().push(Event::TimerExpired(fleetmtc_fsm::TimerSlot::Config));
            }
        }
        Ok(())
    }

    fn handle_inbound_message(&mut self, message: fleetmtc_io::Message) {
        let Some(owner) = host_name_from_hdr(&message.hdr) else { return };
        if self.inventory.get(&owner).is_none() {
            warn!(host = %owner, "message from unknown host, dropping");
            return;
        }

        let event = match message.cmd {
            c if c == cmd::MTC_ALIVE => {
                if !*self.mtcalive_gate.get(&owner).unwrap_or(&true) {
                    debug!(host = %owner, "mtcAlive gate closed, dropping");
                    return;
                }
                let uptime_secs = u64::from_be_bytes(message.buf.get(0..8).map(|b| b.try_into().unwrap()).unwrap_or([0; 8]));
                let bits = u32::from_be_bytes(message.buf.get(8..12).map(|b| b.try_into().unwrap()).unwrap_or([0; 4]));
                Event::MtcAliveReceived { uptime_secs, flags: HostFlags::from_bits_truncate(bits) }
            }
            c if c == cmd::GOENABLED => Event::GoenabledResult { pass: message.buf.first() == Some(&0) },
            c if c == cmd::SUBF_GOENABLED => Event::SubfGoenabledResult { pass: message.buf.first() == Some(&0) },
            c if c == cmd::HOST_SERVICES => Event::HostServicesResult(decode_queue_result(message.buf.first().copied())),
            c if c == cmd::SUBF_HOST_SERVICES => Event::SubfHostServicesResult(decode_queue_result(message.buf.first().copied())),
            c if c == cmd::COMMAND_RESPONSE => Event::WorkqueueResult(decode_queue_result(message.buf.first().copied())),
            other => {
                debug!(host = %owner, cmd = other, "unrecognized inbound command, dropping");
                return;
            }
        };
        self.pending_events.entry(owner).or_default().push(event);
    }

    fn dispatch_host(&mut self, name: &HostName) {
        let ctx = self.context_for(name);

        let mut events: Vec<Event> = self.pending_events.remove(name).unwrap_or_default();
        events.extend(self.drain_host_timers(name));
        if let Some(event) = self.drain_bmc_result(name) {
            events.push(event);
        }
        if events.is_empty() {
            events.push(Event::Tick);
        }

        // Invariant 6: a controller reporting SM-unhealthy skips its own
        // FSM pass entirely rather than racing the service-manager's own
        // recovery of that condition.
        if ctx.is_active_controller {
            if let Some(host) = self.inventory.get(name) {
                if host.flags.contains(HostFlags::SM_UNHEALTHY) {
                    return;
                }
            }
        }

        for event in events {
            let Some(host) = self.inventory.get(name) else { return };
            let result = fleetmtc_fsm::step(host, &ctx, event);
            if let Some(host) = self.inventory.get_mut(name) {
                host.stages = result.stages;
                host.audit_stages = result.audit_stages;
            }
            self.apply_effects(name, result.effects);
        }
    }

    fn context_for(&self, name: &HostName) -> FsmContext {
        FsmContext {
            simplex: self.coordination.controller.simplex(),
            is_active_controller: self.coordination.controller.is_active_controller(name),
            peer_unlocked_enabled_main_insv: self.coordination.controller.peer_unlocked_enabled_main_insv(&self.inventory),
            peer_enabled: self.coordination.controller.peer_enabled(&self.inventory),
            mnfa_active: self.coordination.mnfa.applies_to(name),
            dor_active: self.coordination.dor.is_active(),
            timeouts: self.config.timeouts.clone(),
            agent: self.config.agent.clone(),
        }
    }

    fn drain_host_timers(&mut self, name: &HostName) -> Vec<Event> {
        use fleetmtc_fsm::TimerSlot;
        let Some(host) = self.inventory.get(name) else { return Vec::new() };
        let slots = [
            (host.timers.general, TimerSlot::General),
            (host.timers.mtcalive, TimerSlot::MtcAlive),
            (host.timers.offline, TimerSlot::Offline),
            (host.timers.swact, TimerSlot::Swact),
            (host.timers.config, TimerSlot::Config),
            (host.timers.command, TimerSlot::Command),
            (host.timers.bmc, TimerSlot::Bmc),
            (host.timers.bmc_access, TimerSlot::BmcAccess),
            (host.timers.host_services, TimerSlot::HostServices),
            (host.timers.http, TimerSlot::Http),
            (host.timers.thread, TimerSlot::Thread),
            (host.timers.in_service_test, TimerSlot::InServiceTest),
            (host.timers.out_of_service_test, TimerSlot::OutOfServiceTest),
            (host.timers.recovery, TimerSlot::Recovery),
        ];
        let mut out = Vec::new();
        for (id, slot) in slots {
            if self.timers.expired(id) {
                out.push(Event::TimerExpired(slot));
            }
        }
        out
    }

    fn drain_bmc_result(&mut self, name: &HostName) -> Option<Event> {
        let worker = self.bmc_workers.get_mut(name)?;
        worker.command_recv().map(|response| Event::BmcResult(response.status))
    }
}

fn decode_queue_result(byte: Option<u8>) -> QueueResult {
    match byte {
        Some(0) => QueueResult::Pass,
        Some(1) => QueueResult::Retry,
        Some(3) => QueueResult::FailWorkqTimeout,
        _ => QueueResult::Fail,
    }
}

fn host_name_from_hdr(hdr: &[u8]) -> Option<HostName> {
    let end = hdr.iter().position(|b| *b == 0).unwrap_or(hdr.len());
    let name = std::str::from_utf8(&hdr[..end]).ok()?.trim();
    (!name.is_empty()).then(|| HostName::from(name))
}

fn loopback_port(port: u16) -> std::net::SocketAddr {
    std::net::SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST), port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn base_urls() -> BaseUrls {
        BaseUrls {
            sysinv: "http://sysinv:6385".into(),
            ha_manager: "http://sm-api".into(),
            vim: "http://vim-api".into(),
            fm: "http://fm-api".into(),
        }
    }

    fn controller() -> MaintenanceController {
        MaintenanceController::new(FleetmtcConfig::default(), HostName::from("controller-0"), base_urls(), true, None).unwrap()
    }

    #[test]
    fn add_then_delete_round_trips_through_the_inventory() {
        let mut mtc = controller();
        let host = Host::new(HostName::from("compute-0"), fleetmtc_types::HostUuid::generate(), IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)), fleetmtc_types::NodeType::WORKER);
        mtc.add_host(host, |_req| (fleetmtc_bmc::BmcStatus::Pass, String::new())).unwrap();
        assert!(mtc.inventory.get(&HostName::from("compute-0")).is_some());
        assert!(mtc.bmc_workers.contains_key(&HostName::from("compute-0")));

        mtc.delete_host(&HostName::from("compute-0")).unwrap();
        assert!(mtc.inventory.get(&HostName::from("compute-0")).is_none());
        assert!(!mtc.bmc_workers.contains_key(&HostName::from("compute-0")));
    }

    #[test]
    fn unlock_request_drives_the_host_into_the_enable_fsm() {
        let mut mtc = controller();
        let host = Host::new(HostName::from("compute-0"), fleetmtc_types::HostUuid::generate(), IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)), fleetmtc_types::NodeType::WORKER);
        mtc.add_host(host, |_req| (fleetmtc_bmc::BmcStatus::Pass, String::new())).unwrap();
        mtc.request_admin_action(&HostName::from("compute-0"), fleetmtc_types::AdminAction::Unlock);
        mtc.dispatch_host(&HostName::from("compute-0"));

        let host = mtc.inventory.get(&HostName::from("compute-0")).unwrap();
        assert_ne!(host.stages.enable, fleetmtc_inventory::EnableStage::Start);
    }

    #[test]
    fn mtcalive_gate_suppresses_the_event_while_closed() {
        let mut mtc = controller();
        let name = HostName::from("compute-0");
        let host = Host::new(name.clone(), fleetmtc_types::HostUuid::generate(), IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)), fleetmtc_types::NodeType::WORKER);
        mtc.add_host(host, |_req| (fleetmtc_bmc::BmcStatus::Pass, String::new())).unwrap();
        mtc.mtcalive_gate.insert(name.clone(), false);

        let mut hdr = name.as_str().as_bytes().to_vec();
        hdr.resize(32, 0);
        mtc.handle_inbound_message(fleetmtc_io::Message::new(cmd::MTC_ALIVE, hdr, vec![0; 12]));
        assert!(mtc.pending_events.get(&name).is_none());
    }
}
