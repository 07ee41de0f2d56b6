use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use eframe::egui::{self, Align, Align2, Color32, Layout, RichText, Sense};
use tracing::{error, info, warn};

use crate::browser::Navigator;
use crate::config::{APP_NAME, Config, SUPPORT_URL};
use crate::error::{Result, UtilifiError};
use crate::network;
use crate::ping::{PingOutcome, PingRequest};
use crate::process::{self, ProcessSnapshot, ProcessTable, SysinfoControl, TerminateOutcome};
use crate::theme;
use crate::timer::{Interval, Job, JobState};
use crate::tray::{Tray, TrayCommand};

const TITLE_BAR_HEIGHT: f32 = 40.0;
const JOB_REPAINT: Duration = Duration::from_millis(100);

enum PingStatus {
    Idle,
    NeedsHost,
    Pending(Job<PingOutcome>),
    Done(PingOutcome),
}

enum Dialog {
    ConfirmKill { pid: u32, name: String },
    Message { title: &'static str, text: String, is_error: bool },
    ConfirmClose,
}

/// One dialog on screen at a time. Results that finish while the user is
/// looking at something else wait their turn.
#[derive(Default)]
struct Dialogs {
    current: Option<Dialog>,
    queued: VecDeque<Dialog>,
}

impl Dialogs {
    /// Shows `dialog` now; whatever was open comes back once it is closed.
    fn open(&mut self, dialog: Dialog) {
        if matches!((&self.current, &dialog), (Some(Dialog::ConfirmClose), Dialog::ConfirmClose)) {
            return;
        }
        if let Some(previous) = self.current.replace(dialog) {
            self.queued.push_front(previous);
        }
    }

    /// Shows `dialog` after everything already open or waiting.
    fn notify(&mut self, dialog: Dialog) {
        if self.current.is_none() {
            self.current = Some(dialog);
        } else {
            self.queued.push_back(dialog);
        }
    }

    fn close(&mut self) {
        self.current = self.queued.pop_front();
    }

    fn current(&self) -> Option<&Dialog> {
        self.current.as_ref()
    }
}

enum DialogAction {
    Kill(u32),
    HideToTray,
    Exit,
    Dismiss,
}

pub struct UtilifiApp {
    config: Config,
    ip_probe: SocketAddr,
    table: ProcessTable,
    snapshot: ProcessSnapshot,
    selected: Option<u32>,
    proc_search: String,
    refresh_timer: Interval,
    ip_timer: Interval,
    local_ip: Option<IpAddr>,
    navigator: Navigator,
    url_input: String,
    ping_host: String,
    ping_status: PingStatus,
    kill_job: Option<(u32, Job<Result<TerminateOutcome>>)>,
    dialogs: Dialogs,
    tray: Option<Tray>,
    allow_close: bool,
}

impl UtilifiApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: Config, ip_probe: SocketAddr) -> Self {
        theme::apply(&cc.egui_ctx);

        let mut table = ProcessTable::new();
        let snapshot = table.snapshot();
        let mut refresh_timer = Interval::new(config.refresh_interval());
        refresh_timer.reset(Instant::now());

        let tray = match Tray::start(&cc.egui_ctx) {
            Ok(tray) => Some(tray),
            Err(e) => {
                warn!(error = %e, "running without a tray icon");
                None
            }
        };

        UtilifiApp {
            ip_probe,
            table,
            snapshot,
            selected: None,
            proc_search: String::new(),
            refresh_timer,
            ip_timer: Interval::new(config.ip_interval()),
            local_ip: None,
            navigator: Navigator::new(),
            url_input: config.home_url.clone(),
            ping_host: config.default_ping_host.clone(),
            ping_status: PingStatus::Idle,
            kill_job: None,
            dialogs: Dialogs::default(),
            tray,
            allow_close: false,
            config,
        }
    }

    fn refresh_processes(&mut self) {
        self.snapshot = self.table.snapshot();
        self.refresh_timer.reset(Instant::now());
        if let Some(pid) = self.selected {
            if self.snapshot.get(pid).is_none() {
                self.selected = None;
            }
        }
    }

    fn poll_timers(&mut self) {
        let now = Instant::now();
        if self.refresh_timer.tick(now) {
            self.refresh_processes();
        }
        if self.ip_timer.tick(now) {
            self.local_ip = network::local_ip(self.ip_probe);
        }
    }

    fn poll_jobs(&mut self) {
        if let PingStatus::Pending(job) = &self.ping_status {
            match job.poll() {
                JobState::Running => {}
                JobState::Done(outcome) => self.ping_status = PingStatus::Done(outcome),
                JobState::Lost => {
                    self.ping_status = PingStatus::Done(PingOutcome::Failed("ping worker stopped".to_string()))
                }
            }
        }

        let finished = match &self.kill_job {
            Some((pid, job)) => match job.poll() {
                JobState::Running => return,
                JobState::Done(result) => result,
                JobState::Lost => Err(UtilifiError::TerminateFailed {
                    pid: *pid,
                    reason: "worker stopped".to_string(),
                }),
            },
            None => return,
        };
        self.kill_job = None;
        self.dialogs.notify(kill_result_dialog(finished));
        self.refresh_processes();
    }

    fn request_kill(&mut self) {
        let Some(pid) = self.selected else {
            self.dialogs.open(Dialog::Message {
                title: "Information",
                text: "Please select a process from the list".to_string(),
                is_error: false,
            });
            return;
        };
        let name = self
            .snapshot
            .get(pid)
            .map(|row| row.name.clone())
            .unwrap_or_default();
        self.dialogs.open(Dialog::ConfirmKill { pid, name });
    }

    fn start_kill(&mut self, pid: u32) {
        info!(pid, "terminate requested from UI");
        let grace = self.config.terminate_grace();
        let job = Job::spawn(move || {
            let mut control = SysinfoControl::new();
            process::terminate(&mut control, pid, grace)
        });
        self.kill_job = Some((pid, job));
    }

    fn start_ping(&mut self) {
        if matches!(self.ping_status, PingStatus::Pending(_)) {
            return;
        }
        match PingRequest::new(&self.ping_host, self.config.ping_timeout()) {
            Ok(request) => {
                info!(host = %request.host, "ping requested");
                self.ping_status = PingStatus::Pending(Job::spawn(move || request.run()));
            }
            Err(_) => self.ping_status = PingStatus::NeedsHost,
        }
    }

    fn navigate(&mut self, ctx: &egui::Context, url: Option<String>) {
        let Some(url) = url else {
            return;
        };
        self.url_input = url.clone();
        open_url(ctx, &url);
    }

    fn title_bar(&mut self, ui: &mut egui::Ui, frame: &mut eframe::Frame) {
        let rect = ui.max_rect();
        let drag = ui.interact(rect, egui::Id::new("title_bar"), Sense::click_and_drag());
        if drag.is_pointer_button_down_on() {
            frame.drag_window();
        }

        ui.horizontal_centered(|ui| {
            ui.add_space(8.0);
            ui.label(RichText::new(format!("⚡ {}", APP_NAME)).color(theme::ACCENT_PRIMARY).strong().size(16.0));

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.add_space(8.0);
                if ui.add(egui::Button::new("✕").fill(Color32::TRANSPARENT)).on_hover_text("Close").clicked() {
                    self.dialogs.open(Dialog::ConfirmClose);
                }
                if ui.add(egui::Button::new("—").fill(Color32::TRANSPARENT)).on_hover_text("Minimise").clicked() {
                    frame.set_minimized(true);
                }
                if ui.button("💙 Support").clicked() {
                    open_url(ui.ctx(), SUPPORT_URL);
                }
            });
        });
    }

    fn process_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading(RichText::new("🖥 Process manager").color(theme::ACCENT_PRIMARY));
        ui.add_space(6.0);

        let mut kill = false;
        let mut refresh = false;
        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut self.proc_search)
                    .desired_width(ui.available_width() * 0.45)
                    .hint_text("Process name or PID"),
            );
            let busy = self.kill_job.is_some();
            kill = ui.add_enabled(!busy, theme::danger_button("🗑 Kill process")).clicked();
            refresh = ui.button("🔄 Refresh").clicked();
            if busy {
                ui.spinner();
            }
        });
        ui.add(egui::Separator::default().spacing(10.0));

        let mut clicked = None;
        let rows = self.snapshot.filter(&self.proc_search);
        egui::ScrollArea::vertical().auto_shrink([false; 2]).show(ui, |ui| {
            egui::Grid::new("process_grid")
                .striped(true)
                .num_columns(4)
                .spacing([15.0, 6.0])
                .show(ui, |ui| {
                    for header in ["PID", "Process name", "CPU %", "Memory %"] {
                        ui.label(RichText::new(header).color(theme::TEXT_SECONDARY).strong());
                    }
                    ui.end_row();

                    if rows.is_empty() {
                        ui.label("No processes found");
                        ui.end_row();
                    }
                    for row in &rows {
                        let selected = self.selected == Some(row.pid);
                        if ui.selectable_label(selected, row.pid.to_string()).clicked()
                            | ui.selectable_label(selected, row.name.as_str()).clicked()
                        {
                            clicked = Some(row.pid);
                        }
                        ui.label(format!("{:.1}", row.cpu_percent));
                        ui.label(format!("{:.1}", row.memory_percent));
                        ui.end_row();
                    }
                });
        });

        if clicked.is_some() {
            self.selected = clicked;
        }
        if refresh {
            self.refresh_processes();
        }
        if kill {
            self.request_kill();
        }
    }

    fn browser_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading(RichText::new("🌐 Utilifi browser").color(theme::ACCENT_PRIMARY));
        ui.add_space(6.0);

        let mut target = None;
        ui.horizontal(|ui| {
            if ui.add_enabled(self.navigator.can_go_back(), egui::Button::new("◀")).clicked() {
                target = self.navigator.back();
            }
            if ui.add_enabled(self.navigator.can_go_forward(), egui::Button::new("▶")).clicked() {
                target = self.navigator.forward();
            }
            let go_width = 70.0;
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.url_input)
                    .desired_width(ui.available_width() - go_width)
                    .hint_text("Address"),
            );
            let entered = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.add(theme::primary_button("Go")).clicked() || entered {
                target = self.navigator.go(&self.url_input);
            }
        });
        ui.add(egui::Separator::default().spacing(10.0));

        ui.label(
            RichText::new("Pages open in the system web browser.")
                .color(theme::TEXT_SECONDARY)
                .italics(),
        );
        if let Some(current) = self.navigator.current() {
            ui.label(format!("Current page: {}", current));
        }

        ui.add_space(8.0);
        ui.label(RichText::new("History").color(theme::TEXT_SECONDARY).strong());
        egui::ScrollArea::vertical().auto_shrink([false; 2]).show(ui, |ui| {
            for url in self.navigator.history().iter().rev() {
                let current = self.navigator.current() == Some(url.as_str());
                if ui.selectable_label(current, url.as_str()).clicked() {
                    target = Some(url.clone());
                }
            }
        });

        if let Some(url) = target {
            if self.navigator.current() != Some(url.as_str()) {
                self.navigator.go(&url);
            }
            self.navigate(ui.ctx(), Some(url));
        }
    }

    fn network_panel(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_centered(|ui| {
            ui.add_space(12.0);
            ui.label(
                RichText::new(format!("🌍 IP: {}", network::describe(self.local_ip)))
                    .color(theme::ACCENT_SECONDARY)
                    .monospace(),
            );

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.add_space(12.0);
                let (text, color) = match &self.ping_status {
                    PingStatus::Idle => ("—".to_string(), theme::TEXT_SECONDARY),
                    PingStatus::NeedsHost => ("Enter a host".to_string(), theme::TEXT_SECONDARY),
                    PingStatus::Pending(_) => ("⏳".to_string(), theme::TEXT_SECONDARY),
                    PingStatus::Done(outcome) if outcome.is_success() => (outcome.to_string(), theme::SUCCESS),
                    PingStatus::Done(outcome) => (outcome.to_string(), theme::DANGER),
                };
                ui.add_sized([90.0, 20.0], egui::Label::new(RichText::new(text).color(color).strong()));

                let pending = matches!(self.ping_status, PingStatus::Pending(_));
                let check = ui.add_enabled(!pending, egui::Button::new("Check")).clicked();
                let response = ui.add(egui::TextEdit::singleline(&mut self.ping_host).desired_width(150.0));
                let entered = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                ui.label("📡 Ping:");

                if check || entered {
                    self.start_ping();
                }
            });
        });
    }

    fn show_dialog(&self, ctx: &egui::Context) -> Option<DialogAction> {
        let dialog = self.dialogs.current()?;
        let mut action = None;

        let title = match dialog {
            Dialog::ConfirmKill { .. } | Dialog::ConfirmClose => "Confirm",
            Dialog::Message { title, .. } => *title,
        };
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| match dialog {
                Dialog::ConfirmKill { pid, name } => {
                    ui.label(format!("Are you sure you want to terminate process {} ({})?", pid, name));
                    ui.horizontal(|ui| {
                        if ui.add(theme::danger_button("Yes")).clicked() {
                            action = Some(DialogAction::Kill(*pid));
                        }
                        if ui.button("No").clicked() {
                            action = Some(DialogAction::Dismiss);
                        }
                    });
                }
                Dialog::Message { text, is_error, .. } => {
                    let color = if *is_error { theme::DANGER } else { theme::TEXT_PRIMARY };
                    ui.label(RichText::new(text).color(color));
                    if ui.button("OK").clicked() {
                        action = Some(DialogAction::Dismiss);
                    }
                }
                Dialog::ConfirmClose => {
                    let hide = if self.tray.is_some() { "Hide to tray" } else { "Minimise" };
                    ui.label(format!("{} or exit the application?", hide));
                    ui.horizontal(|ui| {
                        if ui.button(hide).clicked() {
                            action = Some(DialogAction::HideToTray);
                        }
                        if ui.add(theme::danger_button("Exit")).clicked() {
                            action = Some(DialogAction::Exit);
                        }
                        if ui.button("Cancel").clicked() {
                            action = Some(DialogAction::Dismiss);
                        }
                    });
                }
            });
        action
    }

    fn handle_dialog(&mut self, action: DialogAction, frame: &mut eframe::Frame) {
        self.dialogs.close();
        match action {
            DialogAction::Kill(pid) => self.start_kill(pid),
            DialogAction::HideToTray if self.tray.is_some() => {
                info!("hiding to tray");
                frame.set_visible(false);
            }
            DialogAction::HideToTray => frame.set_minimized(true),
            DialogAction::Exit => self.exit(frame),
            DialogAction::Dismiss => {}
        }
    }

    fn poll_tray(&mut self, frame: &mut eframe::Frame) {
        let Some(tray) = &self.tray else {
            return;
        };
        let commands: Vec<TrayCommand> = std::iter::from_fn(|| tray.poll()).collect();
        for command in commands {
            match command {
                TrayCommand::Show => {
                    frame.set_visible(true);
                    frame.set_minimized(false);
                }
                TrayCommand::Quit => self.exit(frame),
            }
        }
    }

    fn exit(&mut self, frame: &mut eframe::Frame) {
        info!("exiting");
        self.allow_close = true;
        frame.close();
    }

    fn next_repaint(&self, now: Instant) -> Duration {
        let mut wait = self.refresh_timer.remaining(now).min(self.ip_timer.remaining(now));
        if self.kill_job.is_some() || matches!(self.ping_status, PingStatus::Pending(_)) {
            wait = wait.min(JOB_REPAINT);
        }
        wait
    }
}

impl eframe::App for UtilifiApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        self.poll_tray(frame);
        self.poll_timers();
        self.poll_jobs();

        egui::TopBottomPanel::top("title_bar")
            .exact_height(TITLE_BAR_HEIGHT)
            .frame(egui::Frame::none().fill(theme::BG_DARK))
            .show(ctx, |ui| self.title_bar(ui, frame));

        egui::TopBottomPanel::bottom("network_panel")
            .exact_height(48.0)
            .frame(egui::Frame::none().fill(theme::BG_LIGHT))
            .show(ctx, |ui| self.network_panel(ui));

        let width = ctx.screen_rect().width();
        egui::SidePanel::left("process_panel")
            .resizable(true)
            .default_width(width / 3.0)
            .min_width(320.0)
            .show(ctx, |ui| self.process_panel(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.browser_panel(ui));

        if let Some(action) = self.show_dialog(ctx) {
            self.handle_dialog(action, frame);
        }

        ctx.request_repaint_after(self.next_repaint(Instant::now()));
    }

    fn on_close_event(&mut self) -> bool {
        if self.allow_close {
            return true;
        }
        self.dialogs.open(Dialog::ConfirmClose);
        false
    }
}

fn open_url(ctx: &egui::Context, url: &str) {
    info!(%url, "opening in system browser");
    ctx.output_mut(|o| o.open_url = Some(egui::output::OpenUrl::new_tab(url)));
}

fn kill_result_dialog(result: Result<TerminateOutcome>) -> Dialog {
    match result {
        Ok(outcome) => Dialog::Message {
            title: "Success",
            text: format!("Process \"{}\" (PID: {}) terminated", outcome.name, outcome.pid),
            is_error: false,
        },
        Err(e) => {
            let text = match &e {
                UtilifiError::NoSuchProcess(_) => "The process no longer exists".to_string(),
                UtilifiError::AccessDenied(_) => "Insufficient permissions to terminate the process".to_string(),
                other => format!("Could not terminate the process: {}", other),
            };
            if matches!(e, UtilifiError::NoSuchProcess(_)) {
                warn!(error = %e, "terminate failed");
            } else {
                error!(error = %e, "terminate failed");
            }
            Dialog::Message { title: "Error", text, is_error: true }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_text(dialog: Option<&Dialog>) -> Option<&str> {
        match dialog {
            Some(Dialog::Message { text, .. }) => Some(text.as_str()),
            _ => None,
        }
    }

    #[test]
    fn kill_errors_become_readable_messages() {
        let gone = kill_result_dialog(Err(UtilifiError::NoSuchProcess(5)));
        assert!(matches!(&gone, Dialog::Message { title: "Error", is_error: true, .. }));
        assert!(message_text(Some(&gone)).unwrap().contains("no longer exists"));

        let denied = kill_result_dialog(Err(UtilifiError::AccessDenied(1)));
        assert!(message_text(Some(&denied)).unwrap().contains("Insufficient permissions"));

        let lost = kill_result_dialog(Err(UtilifiError::TerminateFailed { pid: 3, reason: "worker stopped".into() }));
        assert!(message_text(Some(&lost)).unwrap().contains("worker stopped"));
    }

    #[test]
    fn kill_success_names_the_process() {
        let done = kill_result_dialog(Ok(TerminateOutcome { pid: 42, name: "nginx".into(), forced: true }));
        assert!(matches!(&done, Dialog::Message { title: "Success", is_error: false, .. }));
        assert_eq!(message_text(Some(&done)), Some("Process \"nginx\" (PID: 42) terminated"));
    }

    #[test]
    fn kill_result_waits_behind_close_prompt() {
        let mut dialogs = Dialogs::default();
        dialogs.open(Dialog::ConfirmClose);
        dialogs.notify(kill_result_dialog(Err(UtilifiError::AccessDenied(1))));

        assert!(matches!(dialogs.current(), Some(Dialog::ConfirmClose)));
        dialogs.close();
        assert!(message_text(dialogs.current()).unwrap().contains("Insufficient permissions"));
        dialogs.close();
        assert!(dialogs.current().is_none());
    }

    #[test]
    fn opened_dialog_returns_to_the_one_it_covered() {
        let mut dialogs = Dialogs::default();
        dialogs.notify(kill_result_dialog(Err(UtilifiError::NoSuchProcess(9))));
        dialogs.open(Dialog::ConfirmClose);
        dialogs.open(Dialog::ConfirmClose);

        assert!(matches!(dialogs.current(), Some(Dialog::ConfirmClose)));
        dialogs.close();
        assert!(message_text(dialogs.current()).unwrap().contains("no longer exists"));
        dialogs.close();
        assert!(dialogs.current().is_none());
    }
}
