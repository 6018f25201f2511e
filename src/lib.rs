//! Streaming YAML event parsing and emission.
//!
//! [`Parser`] pulls a stream of [`Event`]s out of any [`std::io::BufRead`]
//! source; [`Emitter`] pushes events into any [`std::io::Write`] sink.
//! There is no document-tree layer: sequences and mappings appear as
//! start/end event pairs, and aliases are reported without resolution.
//!
//! ```no_run
//! # fn main() -> Result<(), yamlet::Error> {
//! let mut parser = yamlet::Parser::new("answer: 42\n".as_bytes());
//! let mut slot = yamlet::EventSlot::new();
//! loop {
//!     parser.parse(&mut slot)?;
//!     let event = slot.take().ok_or(yamlet::ParseError::EndOfStream)?;
//!     println!("{} at {}", event.kind(), event.start_mark());
//!     if event.kind() == yamlet::EventKind::StreamEnd {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod char;
mod emitter;
mod error;
mod event;
mod input_buffer;
mod location;
mod parser;
mod scanner;
mod style;
mod token;
mod value;

pub(crate) use self::char::CharExt;

pub use self::emitter::{EmitError, Emitter};
pub use self::error::{Error, ErrorKind};
pub use self::event::{
    CollectionParams, Event, EventError, EventKind, EventSlot, ScalarParams, VersionDirective,
};
pub use self::location::{Mark, Span};
pub use self::parser::{Mode, ParseError, Parser};
pub use self::scanner::{ScanError, Scanner};
pub use self::style::{Break, CollectionStyle, Encoding, NodeKind, ScalarStyle};
pub use self::token::{Token, TokenType};
pub use self::value::ScalarValue;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Open a file for parsing. The file is closed when the parser is dropped.
pub fn open_reader(path: impl AsRef<Path>) -> Result<Parser<BufReader<File>>, Error> {
    let file = File::open(path)?;
    Ok(Parser::new(BufReader::new(file)))
}

/// Open a file for emission, truncating it unless `append` is set. The
/// file is flushed and closed when the emitter is dropped; use
/// [`Emitter::finish`] to observe flush errors.
pub fn open_writer(
    path: impl AsRef<Path>,
    append: bool,
) -> Result<Emitter<BufWriter<File>>, Error> {
    let file = File::options()
        .write(true)
        .create(true)
        .append(append)
        .truncate(!append)
        .open(path)?;
    Ok(Emitter::new(BufWriter::new(file)))
}
