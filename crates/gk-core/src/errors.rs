/// Core error type for the bot.
///
/// Adapter crates map their platform-specific errors into `External` so the
/// poll loop can treat every fetch failure the same way (transient, retried).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("external error: {0}")]
    External(String),

    #[error("giving up after {attempts} consecutive fetch failures: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

pub type Result<T> = std::result::Result<T, Error>;
