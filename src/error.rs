use crate::{EmitError, EventError, ParseError, ScanError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
    /// A write to the emitter's sink failed.
    #[error("write error: {0}")]
    Write(#[source] std::io::Error),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Emit(#[from] EmitError),
    #[error(transparent)]
    Event(#[from] EventError),
}

/// Coarse classification of an [`Error`], one constant per processing stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    #[default]
    None,
    Memory,
    Reader,
    Scanner,
    Parser,
    Composer,
    Writer,
    Emitter,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::Utf8(_) => ErrorKind::Reader,
            Error::Write(_) => ErrorKind::Writer,
            Error::Scan(_) => ErrorKind::Scanner,
            Error::Parse(_) => ErrorKind::Parser,
            Error::Emit(_) => ErrorKind::Emitter,
            Error::Event(_) => ErrorKind::Composer,
        }
    }
}

impl PartialEq<ScanError> for Error {
    fn eq(&self, other: &ScanError) -> bool {
        matches!(self, Error::Scan(err) if err == other)
    }
}

impl PartialEq<ParseError> for Error {
    fn eq(&self, other: &ParseError) -> bool {
        matches!(self, Error::Parse(err) if err == other)
    }
}

impl PartialEq<EmitError> for Error {
    fn eq(&self, other: &EmitError) -> bool {
        matches!(self, Error::Emit(err) if err == other)
    }
}

impl PartialEq<EventError> for Error {
    fn eq(&self, other: &EventError) -> bool {
        matches!(self, Error::Event(err) if err == other)
    }
}
