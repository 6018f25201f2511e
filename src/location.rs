use std::fmt::{Debug, Display};
use std::ops::Range;

/// A position in the input or output stream.
///
/// `index` is the offset in bytes from the beginning of the stream. `line`
/// and `column` are zero-based; `column` counts characters, not bytes.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Mark {
    pub index: usize,
    pub line: usize,
    pub column: usize,
}

impl Mark {
    #[inline]
    pub fn advance(&mut self, ch: char) {
        self.index += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }

    #[inline]
    pub fn until(self, end: Mark) -> Span {
        Span { start: self, end }
    }
}

impl Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

impl Debug for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// The region of the stream that produced a token or event.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: Mark,
    pub end: Mark,
}

impl Span {
    /// An empty span anchored at `mark`.
    #[inline]
    pub fn empty(mark: Mark) -> Self {
        Span {
            start: mark,
            end: mark,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start.index == self.end.index
    }
}

impl From<Range<Mark>> for Span {
    #[inline]
    fn from(range: Range<Mark>) -> Self {
        Span {
            start: range.start,
            end: range.end,
        }
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_tracks_bytes_and_lines() {
        let mut mark = Mark::default();
        mark.advance('a');
        assert_eq!((mark.index, mark.line, mark.column), (1, 0, 1));
        mark.advance('æ');
        assert_eq!((mark.index, mark.line, mark.column), (3, 0, 2));
        mark.advance('\n');
        assert_eq!((mark.index, mark.line, mark.column), (4, 1, 0));
    }

    #[test]
    fn display_is_one_based() {
        let mark = Mark {
            index: 10,
            line: 2,
            column: 4,
        };
        assert_eq!(mark.to_string(), "3:5");
    }
}
