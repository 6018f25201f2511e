use std::collections::VecDeque;

use crate::Mark;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Input<T> {
    Value(T),
    Eof,
}

/// Decoded characters waiting for the scanner, with the mark of the next
/// character to be consumed.
#[derive(Debug, Default)]
pub(crate) struct InputBuffer {
    buffer: VecDeque<char>,
    mark: Mark,
    eof: bool,
}

impl InputBuffer {
    /// Number of buffered characters, counting the end-of-input marker as
    /// one once it has been pushed.
    pub fn len(&self) -> usize {
        self.buffer.len() + usize::from(self.eof)
    }

    pub fn push_str(&mut self, s: &str) {
        debug_assert!(!self.eof);
        self.buffer.extend(s.chars());
    }

    pub fn push_eof(&mut self) {
        self.eof = true;
    }

    #[inline]
    pub fn mark(&self) -> Mark {
        self.mark
    }

    #[inline]
    pub fn peek(&self) -> Input<char> {
        self.peek_nth(0)
    }

    /// Look `n` characters ahead. The scanner guarantees the buffer has
    /// been filled far enough; past the end of a finished stream this
    /// reports end of input.
    pub fn peek_nth(&self, n: usize) -> Input<char> {
        match self.buffer.get(n) {
            Some(ch) => Input::Value(*ch),
            None => {
                debug_assert!(self.eof, "lookahead past the filled buffer");
                Input::Eof
            }
        }
    }

    pub fn pop(&mut self) -> Input<char> {
        match self.buffer.pop_front() {
            Some(ch) => {
                // A lone '\r' ends a line; the '\r' of a "\r\n" pair
                // does not, so the pair counts as a single break.
                if ch == '\r' && self.buffer.front() != Some(&'\n') {
                    self.mark.index += 1;
                    self.mark.line += 1;
                    self.mark.column = 0;
                } else {
                    self.mark.advance(ch);
                }
                Input::Value(ch)
            }
            None => {
                debug_assert!(self.eof, "pop past the filled buffer");
                Input::Eof
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_advance_on_pop() {
        let mut buffer = InputBuffer::default();
        buffer.push_str("a\nb");
        buffer.push_eof();
        assert_eq!(buffer.len(), 4);

        assert_eq!(buffer.pop(), Input::Value('a'));
        assert_eq!(buffer.mark().index, 1);
        assert_eq!(buffer.pop(), Input::Value('\n'));
        assert_eq!((buffer.mark().line, buffer.mark().column), (1, 0));
        assert_eq!(buffer.peek(), Input::Value('b'));
        assert_eq!(buffer.pop(), Input::Value('b'));
        assert_eq!(buffer.pop(), Input::Eof);
        assert_eq!(buffer.pop(), Input::Eof);
    }

    #[test]
    fn carriage_returns_count_as_breaks() {
        let mut buffer = InputBuffer::default();
        buffer.push_str("a\rb\r\nc");
        buffer.push_eof();

        assert_eq!(buffer.pop(), Input::Value('a'));
        assert_eq!(buffer.pop(), Input::Value('\r'));
        assert_eq!((buffer.mark().line, buffer.mark().column), (1, 0));
        assert_eq!(buffer.pop(), Input::Value('b'));
        assert_eq!(buffer.pop(), Input::Value('\r'));
        assert_eq!((buffer.mark().line, buffer.mark().column), (1, 2));
        assert_eq!(buffer.pop(), Input::Value('\n'));
        assert_eq!((buffer.mark().line, buffer.mark().column), (2, 0));
        assert_eq!(buffer.pop(), Input::Value('c'));
        assert_eq!(buffer.mark().index, 6);
    }
}
