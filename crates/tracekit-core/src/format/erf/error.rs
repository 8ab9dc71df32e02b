use thiserror::Error;

#[derive(Debug, Error)]
pub enum ErfFormatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("truncated record: need {needed} bytes, {available} left")]
    Truncated { needed: usize, available: usize },
    #[error("record length {rlen} is shorter than its {framing}-byte header")]
    ShortRecord { rlen: usize, framing: usize },
}
