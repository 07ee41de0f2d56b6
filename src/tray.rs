use std::sync::mpsc::{self, Receiver};

use eframe::egui::{self, Color32};
use tracing::{debug, info};
use tray_icon::menu::{Menu, MenuEvent, MenuItem, PredefinedMenuItem};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

use crate::config::APP_NAME;
use crate::error::{Result, UtilifiError};
use crate::theme;

const SHOW_ID: &str = "utilifi_show";
const QUIT_ID: &str = "utilifi_quit";
const ICON_SIZE: u32 = 32;
const ICON_BORDER: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrayCommand {
    Show,
    Quit,
}

pub fn menu_command(id: &str) -> Option<TrayCommand> {
    match id {
        SHOW_ID => Some(TrayCommand::Show),
        QUIT_ID => Some(TrayCommand::Quit),
        _ => None,
    }
}

/// Square accent-coloured badge with a dark frame, `size * size` RGBA pixels.
pub fn icon_rgba(size: u32) -> Vec<u8> {
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let edge = x < ICON_BORDER || y < ICON_BORDER || x >= size - ICON_BORDER || y >= size - ICON_BORDER;
            let color: Color32 = if edge { theme::BG_DARK } else { theme::ACCENT_PRIMARY };
            rgba.extend_from_slice(&[color.r(), color.g(), color.b(), 255]);
        }
    }
    rgba
}

fn build_icon() -> Result<TrayIcon> {
    let show = MenuItem::with_id(SHOW_ID, "Show", true, None);
    let quit = MenuItem::with_id(QUIT_ID, "Exit", true, None);
    let menu = Menu::new();
    menu.append_items(&[&show, &PredefinedMenuItem::separator(), &quit])
        .map_err(|e| UtilifiError::Tray(e.to_string()))?;

    let icon = Icon::from_rgba(icon_rgba(ICON_SIZE), ICON_SIZE, ICON_SIZE)
        .map_err(|e| UtilifiError::Tray(e.to_string()))?;

    TrayIconBuilder::new()
        .with_menu(Box::new(menu))
        .with_tooltip(APP_NAME)
        .with_icon(icon)
        .build()
        .map_err(|e| UtilifiError::Tray(e.to_string()))
}

/// Tray icon plus the menu clicks it has produced.
pub struct Tray {
    commands: Receiver<TrayCommand>,
    // gtk owns the icon on its own thread on Linux
    #[cfg(not(target_os = "linux"))]
    _icon: TrayIcon,
}

impl Tray {
    /// Installs the tray icon. Menu clicks wake `ctx` so they are handled even
    /// while the window is hidden.
    pub fn start(ctx: &egui::Context) -> Result<Self> {
        let (tx, commands) = mpsc::channel();
        let repaint = ctx.clone();
        MenuEvent::set_event_handler(Some(move |event: MenuEvent| {
            let Some(command) = menu_command(event.id.0.as_str()) else {
                debug!(id = %event.id.0, "unknown tray menu item");
                return;
            };
            if tx.send(command).is_ok() {
                repaint.request_repaint();
            }
        }));

        #[cfg(target_os = "linux")]
        {
            linux::spawn()?;
            info!("tray icon installed");
            Ok(Tray { commands })
        }

        #[cfg(not(target_os = "linux"))]
        {
            let icon = build_icon()?;
            info!("tray icon installed");
            Ok(Tray { commands, _icon: icon })
        }
    }

    pub fn poll(&self) -> Option<TrayCommand> {
        self.commands.try_recv().ok()
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::build_icon;
    use crate::error::{Result, UtilifiError};

    const START_TIMEOUT: Duration = Duration::from_secs(5);

    /// The appindicator icon needs a running gtk main loop, which gets its own thread.
    pub fn spawn() -> Result<()> {
        let (ready_tx, ready_rx) = mpsc::sync_channel::<std::result::Result<(), String>>(1);
        thread::Builder::new().name("tray".to_string()).spawn(move || {
            if let Err(e) = gtk::init() {
                let _ = ready_tx.send(Err(e.to_string()));
                return;
            }
            match build_icon() {
                Ok(_icon) => {
                    let _ = ready_tx.send(Ok(()));
                    gtk::main();
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                }
            }
        })?;

        ready_rx
            .recv_timeout(START_TIMEOUT)
            .map_err(|_| UtilifiError::Tray("tray thread did not start".to_string()))?
            .map_err(UtilifiError::Tray)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_ids_map_to_commands() {
        assert_eq!(menu_command(SHOW_ID), Some(TrayCommand::Show));
        assert_eq!(menu_command(QUIT_ID), Some(TrayCommand::Quit));
        assert_eq!(menu_command("about"), None);
    }

    #[test]
    fn icon_is_framed_accent_square() {
        let rgba = icon_rgba(ICON_SIZE);
        assert_eq!(rgba.len(), (ICON_SIZE * ICON_SIZE * 4) as usize);

        let pixel = |x: u32, y: u32| {
            let i = ((y * ICON_SIZE + x) * 4) as usize;
            Color32::from_rgba_unmultiplied(rgba[i], rgba[i + 1], rgba[i + 2], rgba[i + 3])
        };
        assert_eq!(pixel(0, 0), theme::BG_DARK);
        assert_eq!(pixel(ICON_SIZE - 1, ICON_SIZE - 1), theme::BG_DARK);
        assert_eq!(pixel(ICON_SIZE / 2, ICON_SIZE / 2), theme::ACCENT_PRIMARY);
    }
}
