use thiserror::Error;

#[derive(Error, Debug)]
pub enum UtilifiError {
    #[error("process {0} no longer exists")]
    NoSuchProcess(u32),

    #[error("insufficient permissions to terminate process {0}")]
    AccessDenied(u32),

    #[error("failed to terminate process {pid}: {reason}")]
    TerminateFailed { pid: u32, reason: String },

    #[error("no host given")]
    EmptyHost,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("system tray unavailable: {0}")]
    Tray(String),
}

pub type Result<T> = std::result::Result<T, UtilifiError>;
