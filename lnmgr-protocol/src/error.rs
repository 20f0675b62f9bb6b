use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty command line")]
    Empty,

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("wrong number of arguments for '{0}'")]
    BadArguments(&'static str),

    #[error("signal value must be 0 or 1, got '{0}'")]
    BadSignalValue(String),
}
