use std::thread;
use std::time::{Duration, Instant};

use sysinfo::{Pid, PidExt, ProcessExt, ProcessStatus, Signal, System, SystemExt};
use tracing::{debug, info, warn};

use crate::error::{Result, UtilifiError};

const EXIT_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRow {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f32,
    pub memory_percent: f32,
}

#[derive(Debug, Clone)]
pub struct ProcessSnapshot {
    pub rows: Vec<ProcessRow>,
}

impl ProcessSnapshot {
    pub fn new(mut rows: Vec<ProcessRow>) -> Self {
        sort_by_cpu(&mut rows);
        Self { rows }
    }

    /// Rows whose name contains `query` (case-insensitive) or whose PID equals it.
    pub fn filter(&self, query: &str) -> Vec<&ProcessRow> {
        let query = query.trim();
        if query.is_empty() {
            return self.rows.iter().collect();
        }
        let needle = query.to_lowercase();
        let pid = query.parse::<u32>().ok();
        self.rows
            .iter()
            .filter(|row| Some(row.pid) == pid || row.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn get(&self, pid: u32) -> Option<&ProcessRow> {
        self.rows.iter().find(|row| row.pid == pid)
    }
}

/// Highest CPU first. Equal CPU falls back to PID so rows don't jump between refreshes.
pub fn sort_by_cpu(rows: &mut [ProcessRow]) {
    rows.sort_by(|a, b| {
        b.cpu_percent
            .total_cmp(&a.cpu_percent)
            .then(a.pid.cmp(&b.pid))
    });
}

fn memory_percent(used: u64, total: u64) -> f32 {
    if total == 0 {
        0.0
    } else {
        (used as f64 / total as f64 * 100.0) as f32
    }
}

/// Live process list backed by sysinfo. CPU usage is measured between two
/// refreshes, so the first snapshot reports zero for every process.
pub struct ProcessTable {
    sys: System,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_processes();
        ProcessTable { sys }
    }

    pub fn snapshot(&mut self) -> ProcessSnapshot {
        self.sys.refresh_memory();
        self.sys.refresh_processes();
        let total = self.sys.total_memory();

        let rows = self
            .sys
            .processes()
            .iter()
            .map(|(pid, process)| ProcessRow {
                pid: pid.as_u32(),
                name: process.name().to_string(),
                cpu_percent: process.cpu_usage(),
                memory_percent: memory_percent(process.memory(), total),
            })
            .collect::<Vec<_>>();
        debug!(count = rows.len(), "process snapshot taken");
        ProcessSnapshot::new(rows)
    }
}

/// The three things terminate escalation needs from the OS.
pub trait ProcessControl {
    /// Name of a live process, `None` if it doesn't exist.
    fn name(&mut self, pid: u32) -> Option<String>;
    fn is_alive(&mut self, pid: u32) -> bool;
    /// Returns whether the signal was delivered.
    fn send(&mut self, pid: u32, signal: Signal) -> bool;
}

pub struct SysinfoControl {
    sys: System,
}

impl Default for SysinfoControl {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoControl {
    pub fn new() -> Self {
        SysinfoControl { sys: System::new() }
    }

    fn refreshed(&mut self, pid: u32) -> Option<&sysinfo::Process> {
        let pid = Pid::from_u32(pid);
        if !self.sys.refresh_process(pid) {
            return None;
        }
        self.sys
            .process(pid)
            .filter(|p| !matches!(p.status(), ProcessStatus::Zombie | ProcessStatus::Dead))
    }
}

impl ProcessControl for SysinfoControl {
    fn name(&mut self, pid: u32) -> Option<String> {
        self.refreshed(pid).map(|p| p.name().to_string())
    }

    fn is_alive(&mut self, pid: u32) -> bool {
        self.refreshed(pid).is_some()
    }

    fn send(&mut self, pid: u32, signal: Signal) -> bool {
        let Some(process) = self.refreshed(pid) else {
            return false;
        };
        match process.kill_with(signal) {
            Some(delivered) => delivered,
            None => {
                // Platforms without SIGTERM only offer a hard kill.
                debug!(pid, ?signal, "signal unsupported, using kill");
                process.kill()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TerminateOutcome {
    pub pid: u32,
    pub name: String,
    pub forced: bool,
}

/// Ask `pid` to exit, wait up to `grace`, then force-kill it if it is still around.
pub fn terminate<C: ProcessControl>(control: &mut C, pid: u32, grace: Duration) -> Result<TerminateOutcome> {
    let name = control.name(pid).ok_or(UtilifiError::NoSuchProcess(pid))?;
    info!(pid, %name, "sending terminate request");

    if !control.send(pid, Signal::Term) {
        return Err(undelivered(control, pid));
    }

    if wait_for_exit(control, pid, grace) {
        info!(pid, %name, "process exited");
        return Ok(TerminateOutcome { pid, name, forced: false });
    }

    warn!(pid, %name, ?grace, "process still alive, forcing kill");
    if !control.send(pid, Signal::Kill) {
        if control.is_alive(pid) {
            return Err(UtilifiError::AccessDenied(pid));
        }
        return Ok(TerminateOutcome { pid, name, forced: false });
    }
    Ok(TerminateOutcome { pid, name, forced: true })
}

fn undelivered<C: ProcessControl>(control: &mut C, pid: u32) -> UtilifiError {
    if control.is_alive(pid) {
        warn!(pid, "terminate request refused");
        UtilifiError::AccessDenied(pid)
    } else {
        UtilifiError::NoSuchProcess(pid)
    }
}

fn wait_for_exit<C: ProcessControl>(control: &mut C, pid: u32, grace: Duration) -> bool {
    let deadline = Instant::now() + grace;
    loop {
        if !control.is_alive(pid) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep(EXIT_POLL.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn row(pid: u32, name: &str, cpu: f32) -> ProcessRow {
        ProcessRow { pid, name: name.to_string(), cpu_percent: cpu, memory_percent: 1.0 }
    }

    #[test]
    fn snapshot_sorts_by_cpu_then_pid() {
        let snapshot = ProcessSnapshot::new(vec![
            row(30, "idle", 0.0),
            row(20, "busy", 50.0),
            row(10, "also-idle", 0.0),
            row(40, "warm", 5.5),
        ]);
        let pids: Vec<u32> = snapshot.rows.iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![20, 40, 10, 30]);
    }

    #[test]
    fn nan_cpu_keeps_a_total_order() {
        let mut rows = vec![row(1, "a", 0.0), row(2, "b", f32::NAN), row(3, "c", 3.0), row(4, "d", f32::NAN)];
        sort_by_cpu(&mut rows);
        let pids: Vec<u32> = rows.iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![2, 4, 3, 1]);
    }

    #[test]
    fn filter_matches_name_or_pid() {
        let snapshot = ProcessSnapshot::new(vec![
            row(1, "systemd", 0.1),
            row(412, "Firefox", 12.0),
            row(4120, "bash", 0.0),
        ]);

        assert_eq!(snapshot.filter("").len(), 3);
        assert_eq!(snapshot.filter("  fire ")[0].pid, 412);

        let by_pid: Vec<u32> = snapshot.filter("412").iter().map(|r| r.pid).collect();
        assert_eq!(by_pid, vec![412]);

        assert!(snapshot.filter("nothing").is_empty());
    }

    #[test]
    fn memory_percent_handles_zero_total() {
        assert_eq!(memory_percent(10, 0), 0.0);
        assert!((memory_percent(25, 100) - 25.0).abs() < f32::EPSILON);
    }

    #[test]
    fn live_snapshot_contains_this_process() {
        let mut table = ProcessTable::new();
        let snapshot = table.snapshot();
        assert!(snapshot.get(std::process::id()).is_some());
    }

    #[derive(Default)]
    struct FakeProcess {
        name: String,
        alive: bool,
        exits_on_term: bool,
        refuses_signals: bool,
        refuses_kill: bool,
        exits_when_kill_refused: bool,
    }

    #[derive(Default)]
    struct FakeControl {
        procs: HashMap<u32, FakeProcess>,
        sent: Vec<(u32, Signal)>,
    }

    impl FakeControl {
        fn with(pid: u32, proc: FakeProcess) -> Self {
            let mut control = FakeControl::default();
            control.procs.insert(pid, proc);
            control
        }
    }

    impl ProcessControl for FakeControl {
        fn name(&mut self, pid: u32) -> Option<String> {
            self.procs.get(&pid).filter(|p| p.alive).map(|p| p.name.clone())
        }

        fn is_alive(&mut self, pid: u32) -> bool {
            self.procs.get(&pid).is_some_and(|p| p.alive)
        }

        fn send(&mut self, pid: u32, signal: Signal) -> bool {
            self.sent.push((pid, signal));
            let Some(p) = self.procs.get_mut(&pid) else {
                return false;
            };
            if p.refuses_signals || !p.alive {
                return false;
            }
            if signal == Signal::Kill && p.refuses_kill {
                if p.exits_when_kill_refused {
                    p.alive = false;
                }
                return false;
            }
            if signal == Signal::Kill || p.exits_on_term {
                p.alive = false;
            }
            true
        }
    }

    #[test]
    fn graceful_exit_skips_kill() {
        let mut control = FakeControl::with(
            7,
            FakeProcess { name: "editor".into(), alive: true, exits_on_term: true, ..Default::default() },
        );
        let outcome = terminate(&mut control, 7, Duration::from_millis(300)).unwrap();
        assert_eq!(outcome, TerminateOutcome { pid: 7, name: "editor".into(), forced: false });
        assert_eq!(control.sent, vec![(7, Signal::Term)]);
    }

    #[test]
    fn stubborn_process_is_force_killed_after_grace() {
        let mut control = FakeControl::with(
            8,
            FakeProcess { name: "stuck".into(), alive: true, ..Default::default() },
        );
        let started = Instant::now();
        let outcome = terminate(&mut control, 8, Duration::from_millis(250)).unwrap();

        assert!(outcome.forced);
        assert!(started.elapsed() >= Duration::from_millis(250));
        assert_eq!(control.sent, vec![(8, Signal::Term), (8, Signal::Kill)]);
        assert!(!control.is_alive(8));
    }

    #[test]
    fn missing_process_is_reported() {
        let mut control = FakeControl::default();
        let err = terminate(&mut control, 99, Duration::ZERO).unwrap_err();
        assert!(matches!(err, UtilifiError::NoSuchProcess(99)));
        assert!(control.sent.is_empty());
    }

    #[test]
    fn refused_signal_is_access_denied() {
        let mut control = FakeControl::with(
            1,
            FakeProcess { name: "init".into(), alive: true, refuses_signals: true, ..Default::default() },
        );
        let err = terminate(&mut control, 1, Duration::ZERO).unwrap_err();
        assert!(matches!(err, UtilifiError::AccessDenied(1)));
    }

    #[test]
    fn refused_kill_while_alive_is_access_denied() {
        let mut control = FakeControl::with(
            9,
            FakeProcess { name: "daemon".into(), alive: true, refuses_kill: true, ..Default::default() },
        );
        let err = terminate(&mut control, 9, Duration::from_millis(150)).unwrap_err();
        assert!(matches!(err, UtilifiError::AccessDenied(9)));
        assert_eq!(control.sent, vec![(9, Signal::Term), (9, Signal::Kill)]);
        assert!(control.is_alive(9));
    }

    #[test]
    fn refused_kill_after_exit_is_not_forced() {
        let mut control = FakeControl::with(
            11,
            FakeProcess {
                name: "late".into(),
                alive: true,
                refuses_kill: true,
                exits_when_kill_refused: true,
                ..Default::default()
            },
        );
        let outcome = terminate(&mut control, 11, Duration::from_millis(150)).unwrap();
        assert_eq!(outcome, TerminateOutcome { pid: 11, name: "late".into(), forced: false });
        assert_eq!(control.sent, vec![(11, Signal::Term), (11, Signal::Kill)]);
    }

    #[cfg(unix)]
    #[test]
    fn terminates_a_real_child() {
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let mut control = SysinfoControl::new();

        let outcome = terminate(&mut control, child.id(), Duration::from_secs(3)).unwrap();
        assert_eq!(outcome.pid, child.id());
        assert!(!outcome.forced);

        let status = child.wait().unwrap();
        assert!(!status.success());
    }
}
