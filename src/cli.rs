use std::io::{self, BufRead, Write};

use colored::*;
use sysinfo::{System, SystemExt};

use crate::config::Config;
use crate::error::{Result, UtilifiError};
use crate::network;
use crate::ping::{PingOutcome, PingRequest};
use crate::process::{self, ProcessRow, ProcessTable, SysinfoControl, TerminateOutcome};

pub fn print_processes(filter: Option<&str>, limit: usize) {
    let mut table = ProcessTable::new();
    // cpu usage needs two samples
    std::thread::sleep(System::MINIMUM_CPU_UPDATE_INTERVAL);
    let snapshot = table.snapshot();
    let rows = snapshot.filter(filter.unwrap_or(""));

    if rows.is_empty() {
        println!("🔍 No matching processes found for '{}'", filter.unwrap_or(""));
        return;
    }
    println!("{}", format!("{:>8}  {:<32} {:>7} {:>7}", "PID", "NAME", "CPU %", "MEM %").bold().underline());
    for row in rows.into_iter().take(limit) {
        println!("{}", format_row(row));
    }
}

fn format_row(row: &ProcessRow) -> String {
    let cpu = format!("{:>7.1}", row.cpu_percent);
    let cpu = if row.cpu_percent >= 50.0 {
        cpu.red()
    } else if row.cpu_percent >= 10.0 {
        cpu.yellow()
    } else {
        cpu.normal()
    };
    format!(
        "{:>8}  {:<32} {} {:>7.1}",
        row.pid.to_string().cyan(),
        truncate(&row.name, 32).bold(),
        cpu,
        row.memory_percent
    )
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_string()
    } else {
        let mut short: String = name.chars().take(width - 1).collect();
        short.push('…');
        short
    }
}

pub fn kill(pid: u32, assume_yes: bool, config: &Config) -> Result<()> {
    if !assume_yes && !confirm(&format!("Are you sure you want to terminate PID {}? (y/n): ", pid))? {
        println!("Termination canceled.");
        return Ok(());
    }

    println!("Requesting termination of PID {}...", pid);
    let mut control = SysinfoControl::new();
    match process::terminate(&mut control, pid, config.terminate_grace()) {
        Ok(outcome) => {
            println!("{}", outcome_line(&outcome));
            Ok(())
        }
        Err(e) => {
            println!("❌ {}", e.to_string().red());
            Err(e)
        }
    }
}

fn outcome_line(outcome: &TerminateOutcome) -> String {
    if outcome.forced {
        format!(
            "⚠️  Process \"{}\" ({}) did not exit in time and was force-killed.",
            outcome.name.bold(),
            outcome.pid.to_string().cyan()
        )
    } else {
        format!(
            "✅ Process \"{}\" ({}) terminated successfully.",
            outcome.name.bold(),
            outcome.pid.to_string().cyan()
        )
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

pub fn ping(host: &str, config: &Config) -> Result<PingOutcome> {
    let request = match PingRequest::new(host, config.ping_timeout()) {
        Ok(request) => request,
        Err(UtilifiError::EmptyHost) => {
            println!("{}", "Enter a host".yellow());
            return Err(UtilifiError::EmptyHost);
        }
        Err(e) => return Err(e),
    };
    let outcome = request.run();
    let line = format!("📡 {}: {}", request.host, outcome);
    match &outcome {
        PingOutcome::Reachable { .. } => println!("{}", line.green()),
        PingOutcome::Failed(reason) => println!("{} {}", line.red(), format!("({})", reason).dimmed()),
        _ => println!("{}", line.red()),
    }
    Ok(outcome)
}

pub fn print_ip(config: &Config) -> Result<()> {
    let ip = network::local_ip(config.ip_probe_addr()?);
    println!("🌍 IP: {}", network::describe(ip).green());
    Ok(())
}
