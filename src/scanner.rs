use std::collections::VecDeque;
use std::io::BufRead;

use crate::char::CharExt;
use crate::input_buffer::{Input, InputBuffer};
use crate::{Encoding, Error, Mark, ScalarStyle, Span, Token};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("unexpected character {ch:?} at {mark}")]
    UnexpectedChar { ch: char, mark: Mark },
    #[error("unknown directive at {0}")]
    UnknownDirective(Mark),
    #[error("tag directives are not supported ({0})")]
    TagDirective(Mark),
    #[error("malformed %YAML directive at {0}")]
    BadVersionDirective(Mark),
    #[error("unterminated quoted scalar starting at {0}")]
    UnterminatedScalar(Mark),
    #[error("invalid escape sequence at {0}")]
    BadEscape(Mark),
    #[error("invalid anchor at {0}")]
    BadAnchor(Mark),
    #[error("invalid tag at {0}")]
    BadTag(Mark),
    #[error("malformed block scalar header at {0}")]
    BadBlockScalarHeader(Mark),
    #[error("could not find expected ':' for the key at {0}")]
    MissingColon(Mark),
    #[error("block sequence entries are not allowed here ({0})")]
    BlockEntryNotAllowed(Mark),
    #[error("mapping keys are not allowed here ({0})")]
    KeyNotAllowed(Mark),
    #[error("mapping values are not allowed here ({0})")]
    ValueNotAllowed(Mark),
}

/// A potential simple key: a node that may retroactively become a mapping
/// key if a ':' shows up on the same line.
#[derive(Clone, Copy, Debug, Default)]
struct SimpleKey {
    possible: bool,
    required: bool,
    /// Sequence number of the token the key would precede.
    token_number: usize,
    mark: Mark,
}

/// The tokenizer. Produces the token stream the parser composes events
/// from; block structure tokens are synthesized from indentation.
pub struct Scanner<R> {
    reader: R,
    buffer: InputBuffer,
    pending: Vec<u8>,
    reader_eof: bool,
    tokens: VecDeque<(Token, Span)>,
    /// Number of tokens already handed out; token numbers in simple keys
    /// are relative to this.
    tokens_taken: usize,
    stream_start_produced: bool,
    stream_end_produced: bool,
    indent: isize,
    indents: Vec<isize>,
    simple_key_allowed: bool,
    simple_keys: Vec<SimpleKey>,
    flow_level: usize,
}

fn is_blankz(input: Input<char>) -> bool {
    match input {
        Input::Value(ch) => ch.is_blank_or_break(),
        Input::Eof => true,
    }
}

fn starts_plain(ch: char) -> bool {
    !matches!(
        ch,
        '#' | ',' | '[' | ']' | '{' | '}' | '&' | '*' | '!' | '|' | '>' | '\'' | '"' | '%' | '@'
            | '`'
    )
}

impl<R: BufRead> Scanner<R> {
    pub fn new(reader: R) -> Self {
        Scanner {
            reader,
            buffer: InputBuffer::default(),
            pending: Vec::new(),
            reader_eof: false,
            tokens: VecDeque::new(),
            tokens_taken: 0,
            stream_start_produced: false,
            stream_end_produced: false,
            indent: -1,
            indents: Vec::new(),
            simple_key_allowed: true,
            simple_keys: Vec::new(),
            flow_level: 0,
        }
    }

    /// The next token of the stream, or `None` once STREAM-END has been
    /// returned.
    pub fn next_token(&mut self) -> Result<Option<(Token, Span)>, Error> {
        while self.need_more_tokens() {
            self.fetch_next_token()?;
        }
        match self.tokens.pop_front() {
            Some(token) => {
                self.tokens_taken += 1;
                Ok(Some(token))
            }
            None => Ok(None),
        }
    }

    fn need_more_tokens(&self) -> bool {
        if self.stream_end_produced {
            return false;
        }
        if self.tokens.is_empty() {
            return true;
        }
        // The head of the queue may still become a Key token.
        self.simple_keys
            .iter()
            .any(|key| key.possible && key.token_number == self.tokens_taken)
    }

    #[inline]
    fn mark(&self) -> Mark {
        self.buffer.mark()
    }

    /// Decode input until at least `n` characters (or end of input) are
    /// buffered.
    fn lookahead(&mut self, n: usize) -> Result<(), Error> {
        while self.buffer.len() < n && !self.reader_eof {
            let bytes = self.reader.fill_buf()?;
            if bytes.is_empty() {
                if !self.pending.is_empty() {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "incomplete UTF-8 sequence at end of stream",
                    )
                    .into());
                }
                self.buffer.push_eof();
                self.reader_eof = true;
                break;
            }
            let len = bytes.len();
            self.pending.extend_from_slice(bytes);
            self.reader.consume(len);
            match std::str::from_utf8(&self.pending) {
                Ok(decoded) => {
                    self.buffer.push_str(decoded);
                    self.pending.clear();
                }
                Err(err) if err.error_len().is_some() => return Err(err.into()),
                Err(err) => {
                    // A character is split across reads; keep its prefix.
                    let valid = err.valid_up_to();
                    self.buffer
                        .push_str(std::str::from_utf8(&self.pending[..valid]).unwrap());
                    self.pending.drain(..valid);
                }
            }
        }
        Ok(())
    }

    /// Consume one line break, normalizing `\r\n` and `\r` to `\n`.
    /// Callers must have two characters of lookahead.
    fn skip_break(&mut self) {
        if self.buffer.peek() == Input::Value('\r') && self.buffer.peek_nth(1) == Input::Value('\n')
        {
            self.buffer.pop();
        }
        self.buffer.pop();
    }

    fn read_break(&mut self, out: &mut String) {
        self.skip_break();
        out.push('\n');
    }

    fn at_document_marker(&self, marker: &str) -> bool {
        for (i, ch) in marker.chars().enumerate() {
            if self.buffer.peek_nth(i) != Input::Value(ch) {
                return false;
            }
        }
        is_blankz(self.buffer.peek_nth(3))
    }

    fn top_simple_key(&mut self) -> &mut SimpleKey {
        match self.simple_keys.last_mut() {
            Some(key) => key,
            None => panic!("inconsistent scanner state"),
        }
    }

    /// Invalidate simple keys whose line has passed (a simple key must not
    /// span a line break or grow past 1024 characters).
    fn stale_simple_keys(&mut self) -> Result<(), Error> {
        let mark = self.mark();
        for key in &mut self.simple_keys {
            if key.possible && (key.mark.line < mark.line || key.mark.index + 1024 < mark.index) {
                if key.required {
                    return Err(ScanError::MissingColon(key.mark).into());
                }
                key.possible = false;
            }
        }
        Ok(())
    }

    fn save_simple_key(&mut self) -> Result<(), Error> {
        let mark = self.mark();
        let required = self.flow_level == 0 && self.indent == mark.column as isize;
        if self.simple_key_allowed {
            let key = SimpleKey {
                possible: true,
                required,
                token_number: self.tokens_taken + self.tokens.len(),
                mark,
            };
            self.remove_simple_key()?;
            *self.top_simple_key() = key;
        }
        Ok(())
    }

    fn remove_simple_key(&mut self) -> Result<(), Error> {
        let key = self.top_simple_key();
        if key.possible && key.required {
            return Err(ScanError::MissingColon(key.mark).into());
        }
        key.possible = false;
        Ok(())
    }

    /// Push a block collection start token when the indentation increases.
    /// `number` positions the token before a detected simple key.
    fn roll_indent(&mut self, column: isize, number: Option<usize>, token: Token, mark: Mark) {
        if self.flow_level > 0 {
            return;
        }
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            let entry = (token, Span::empty(mark));
            match number {
                Some(n) => self.tokens.insert(n - self.tokens_taken, entry),
                None => self.tokens.push_back(entry),
            }
        }
    }

    fn unroll_indent(&mut self, column: isize) {
        if self.flow_level > 0 {
            return;
        }
        while self.indent > column {
            let mark = self.mark();
            self.tokens.push_back((Token::BlockEnd, Span::empty(mark)));
            self.indent = self.indents.pop().unwrap_or(-1);
        }
    }

    fn fetch_next_token(&mut self) -> Result<(), Error> {
        if !self.stream_start_produced {
            self.fetch_stream_start();
            return Ok(());
        }
        self.scan_to_next_token()?;
        self.stale_simple_keys()?;
        let column = self.mark().column as isize;
        self.unroll_indent(column);
        self.lookahead(4)?;
        let Input::Value(ch) = self.buffer.peek() else {
            return self.fetch_stream_end();
        };
        let at_col0 = self.mark().column == 0;
        match ch {
            '%' if at_col0 => self.fetch_directive(),
            '-' if at_col0 && self.at_document_marker("---") => {
                self.fetch_document_indicator(Token::DocumentStart)
            }
            '.' if at_col0 && self.at_document_marker("...") => {
                self.fetch_document_indicator(Token::DocumentEnd)
            }
            '[' => self.fetch_flow_collection_start(Token::FlowSequenceStart),
            '{' => self.fetch_flow_collection_start(Token::FlowMappingStart),
            ']' => self.fetch_flow_collection_end(Token::FlowSequenceEnd),
            '}' => self.fetch_flow_collection_end(Token::FlowMappingEnd),
            ',' => self.fetch_flow_entry(),
            '-' if is_blankz(self.buffer.peek_nth(1)) => self.fetch_block_entry(),
            '?' if self.flow_level > 0 || is_blankz(self.buffer.peek_nth(1)) => self.fetch_key(),
            ':' if self.flow_level > 0 || is_blankz(self.buffer.peek_nth(1)) => self.fetch_value(),
            '*' => self.fetch_anchor(true),
            '&' => self.fetch_anchor(false),
            '!' => self.fetch_tag(),
            '|' if self.flow_level == 0 => self.fetch_block_scalar(true),
            '>' if self.flow_level == 0 => self.fetch_block_scalar(false),
            '\'' => self.fetch_flow_scalar(ScalarStyle::SingleQuoted),
            '"' => self.fetch_flow_scalar(ScalarStyle::DoubleQuoted),
            _ if starts_plain(ch) => self.fetch_plain_scalar(),
            _ => Err(ScanError::UnexpectedChar {
                ch,
                mark: self.mark(),
            }
            .into()),
        }
    }

    fn fetch_stream_start(&mut self) {
        let mark = self.mark();
        self.simple_keys.push(SimpleKey::default());
        self.simple_key_allowed = true;
        self.stream_start_produced = true;
        self.tokens
            .push_back((Token::StreamStart(Encoding::Utf8), Span::empty(mark)));
    }

    fn fetch_stream_end(&mut self) -> Result<(), Error> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let mark = self.mark();
        self.tokens.push_back((Token::StreamEnd, Span::empty(mark)));
        self.stream_end_produced = true;
        Ok(())
    }

    /// Skip whitespace, comments, and line breaks before the next token.
    fn scan_to_next_token(&mut self) -> Result<(), Error> {
        loop {
            self.lookahead(1)?;
            match self.buffer.peek() {
                Input::Value('\u{feff}') if self.mark().index == 0 => {
                    self.buffer.pop();
                }
                Input::Value(' ') | Input::Value('\t') => {
                    self.buffer.pop();
                }
                Input::Value('#') => self.skip_comment()?,
                Input::Value(ch) if ch.is_yaml_break() => {
                    self.lookahead(2)?;
                    self.skip_break();
                    if self.flow_level == 0 {
                        self.simple_key_allowed = true;
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_comment(&mut self) -> Result<(), Error> {
        loop {
            self.lookahead(1)?;
            match self.buffer.peek() {
                Input::Value(ch) if !ch.is_yaml_break() => {
                    self.buffer.pop();
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_blanks(&mut self) -> Result<(), Error> {
        loop {
            self.lookahead(1)?;
            match self.buffer.peek() {
                Input::Value(ch) if ch.is_yaml_blank() => {
                    self.buffer.pop();
                }
                _ => return Ok(()),
            }
        }
    }

    fn fetch_directive(&mut self) -> Result<(), Error> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let start = self.mark();
        self.buffer.pop(); // '%'
        let mut name = String::new();
        loop {
            self.lookahead(1)?;
            match self.buffer.peek() {
                Input::Value(ch) if ch.is_ascii_alphabetic() => {
                    name.push(ch);
                    self.buffer.pop();
                }
                _ => break,
            }
        }
        match name.as_str() {
            "YAML" => {
                self.skip_blanks()?;
                let major = self.scan_directive_number(start)?;
                self.lookahead(1)?;
                if self.buffer.peek() != Input::Value('.') {
                    return Err(ScanError::BadVersionDirective(start).into());
                }
                self.buffer.pop();
                let minor = self.scan_directive_number(start)?;
                self.lookahead(1)?;
                if !is_blankz(self.buffer.peek()) {
                    return Err(ScanError::BadVersionDirective(start).into());
                }
                let end = self.mark();
                self.tokens
                    .push_back((Token::VersionDirective(major, minor), start.until(end)));
                Ok(())
            }
            "TAG" => Err(ScanError::TagDirective(start).into()),
            _ => Err(ScanError::UnknownDirective(start).into()),
        }
    }

    fn scan_directive_number(&mut self, start: Mark) -> Result<u32, Error> {
        let mut value: u32 = 0;
        let mut digits = 0;
        loop {
            self.lookahead(1)?;
            match self.buffer.peek() {
                Input::Value(ch) if ch.is_ascii_digit() => {
                    digits += 1;
                    if digits > 9 {
                        return Err(ScanError::BadVersionDirective(start).into());
                    }
                    value = value * 10 + (ch as u32 - '0' as u32);
                    self.buffer.pop();
                }
                _ => break,
            }
        }
        if digits == 0 {
            return Err(ScanError::BadVersionDirective(start).into());
        }
        Ok(value)
    }

    fn fetch_document_indicator(&mut self, token: Token) -> Result<(), Error> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let start = self.mark();
        self.buffer.pop();
        self.buffer.pop();
        self.buffer.pop();
        self.tokens.push_back((token, start.until(self.mark())));
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, token: Token) -> Result<(), Error> {
        self.save_simple_key()?;
        self.simple_keys.push(SimpleKey::default());
        self.flow_level += 1;
        self.simple_key_allowed = true;
        let start = self.mark();
        self.buffer.pop();
        self.tokens.push_back((token, start.until(self.mark())));
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, token: Token) -> Result<(), Error> {
        self.remove_simple_key()?;
        if self.flow_level > 0 {
            self.flow_level -= 1;
            self.simple_keys.pop();
        }
        self.simple_key_allowed = false;
        let start = self.mark();
        self.buffer.pop();
        self.tokens.push_back((token, start.until(self.mark())));
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<(), Error> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start = self.mark();
        self.buffer.pop();
        self.tokens
            .push_back((Token::FlowEntry, start.until(self.mark())));
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> Result<(), Error> {
        let mark = self.mark();
        if self.flow_level > 0 || !self.simple_key_allowed {
            return Err(ScanError::BlockEntryNotAllowed(mark).into());
        }
        self.roll_indent(mark.column as isize, None, Token::BlockSequenceStart, mark);
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        self.buffer.pop();
        self.tokens
            .push_back((Token::BlockEntry, mark.until(self.mark())));
        Ok(())
    }

    fn fetch_key(&mut self) -> Result<(), Error> {
        let mark = self.mark();
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return Err(ScanError::KeyNotAllowed(mark).into());
            }
            self.roll_indent(mark.column as isize, None, Token::BlockMappingStart, mark);
        }
        self.remove_simple_key()?;
        self.simple_key_allowed = self.flow_level == 0;
        self.buffer.pop();
        self.tokens.push_back((Token::Key, mark.until(self.mark())));
        Ok(())
    }

    fn fetch_value(&mut self) -> Result<(), Error> {
        let mark = self.mark();
        let key = self.top_simple_key();
        if key.possible {
            key.possible = false;
            let number = key.token_number;
            let key_mark = key.mark;
            self.tokens
                .insert(number - self.tokens_taken, (Token::Key, Span::empty(key_mark)));
            self.roll_indent(
                key_mark.column as isize,
                Some(number),
                Token::BlockMappingStart,
                key_mark,
            );
            self.simple_key_allowed = false;
        } else {
            if self.flow_level == 0 {
                if !self.simple_key_allowed {
                    return Err(ScanError::ValueNotAllowed(mark).into());
                }
                self.roll_indent(mark.column as isize, None, Token::BlockMappingStart, mark);
            }
            self.simple_key_allowed = self.flow_level == 0;
        }
        self.buffer.pop();
        self.tokens
            .push_back((Token::Value, mark.until(self.mark())));
        Ok(())
    }

    fn fetch_anchor(&mut self, alias: bool) -> Result<(), Error> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let start = self.mark();
        self.buffer.pop(); // '&' or '*'
        let mut name = String::new();
        loop {
            self.lookahead(1)?;
            match self.buffer.peek() {
                Input::Value(ch) if ch.is_anchor_char() => {
                    name.push(ch);
                    self.buffer.pop();
                }
                _ => break,
            }
        }
        if name.is_empty() {
            return Err(ScanError::BadAnchor(start).into());
        }
        let token = if alias {
            Token::Alias(name)
        } else {
            Token::Anchor(name)
        };
        self.tokens.push_back((token, start.until(self.mark())));
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<(), Error> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let start = self.mark();
        self.buffer.pop(); // '!'
        let mut text = String::new();
        self.lookahead(1)?;
        if self.buffer.peek() == Input::Value('<') {
            // verbatim form: !<tag:example.org,2002:foo>
            self.buffer.pop();
            loop {
                self.lookahead(1)?;
                match self.buffer.peek() {
                    Input::Value('>') => {
                        self.buffer.pop();
                        break;
                    }
                    Input::Value(ch) if !ch.is_blank_or_break() => {
                        text.push(ch);
                        self.buffer.pop();
                    }
                    _ => return Err(ScanError::BadTag(start).into()),
                }
            }
            if text.is_empty() {
                return Err(ScanError::BadTag(start).into());
            }
        } else {
            text.push('!');
            loop {
                self.lookahead(1)?;
                match self.buffer.peek() {
                    Input::Value(ch) if !ch.is_blank_or_break() && !ch.is_flow_indicator() => {
                        text.push(ch);
                        self.buffer.pop();
                    }
                    _ => break,
                }
            }
        }
        self.tokens
            .push_back((Token::Tag(text), start.until(self.mark())));
        Ok(())
    }

    fn fetch_block_scalar(&mut self, literal: bool) -> Result<(), Error> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        self.scan_block_scalar(literal)
    }

    fn scan_block_scalar(&mut self, literal: bool) -> Result<(), Error> {
        let start = self.mark();
        self.buffer.pop(); // '|' or '>'

        // Header: chomping and indentation indicators in either order.
        let mut chomping: i8 = 0;
        let mut increment: usize = 0;
        self.lookahead(1)?;
        match self.buffer.peek() {
            Input::Value('+') => {
                chomping = 1;
                self.buffer.pop();
            }
            Input::Value('-') => {
                chomping = -1;
                self.buffer.pop();
            }
            _ => {}
        }
        self.lookahead(1)?;
        if let Input::Value(ch) = self.buffer.peek() {
            if ch.is_ascii_digit() {
                if ch == '0' {
                    return Err(ScanError::BadBlockScalarHeader(start).into());
                }
                increment = ch as usize - '0' as usize;
                self.buffer.pop();
                if chomping == 0 {
                    self.lookahead(1)?;
                    match self.buffer.peek() {
                        Input::Value('+') => {
                            chomping = 1;
                            self.buffer.pop();
                        }
                        Input::Value('-') => {
                            chomping = -1;
                            self.buffer.pop();
                        }
                        _ => {}
                    }
                }
            }
        }
        // The rest of the header line: blanks, optionally a comment.
        self.skip_blanks()?;
        self.lookahead(1)?;
        if self.buffer.peek() == Input::Value('#') {
            self.skip_comment()?;
        }
        self.lookahead(2)?;
        match self.buffer.peek() {
            Input::Value(ch) if ch.is_yaml_break() => self.skip_break(),
            Input::Eof => {}
            Input::Value(_) => return Err(ScanError::BadBlockScalarHeader(start).into()),
        }

        let mut indent: usize = if increment > 0 {
            self.indent.max(0) as usize + increment
        } else {
            0
        };
        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut leading_blank = false;

        self.block_scalar_breaks(&mut indent, &mut trailing_breaks)?;
        self.lookahead(1)?;
        while self.mark().column == indent && self.buffer.peek() != Input::Eof {
            let trailing_blank =
                matches!(self.buffer.peek(), Input::Value(ch) if ch.is_yaml_blank());
            if !literal && leading_break == "\n" && !leading_blank && !trailing_blank {
                // Fold a single break between content lines into a space.
                if trailing_breaks.is_empty() {
                    string.push(' ');
                }
            } else {
                string.push_str(&leading_break);
            }
            leading_break.clear();
            string.push_str(&trailing_breaks);
            trailing_breaks.clear();
            leading_blank = trailing_blank;
            loop {
                self.lookahead(1)?;
                match self.buffer.peek() {
                    Input::Value(ch) if !ch.is_yaml_break() => {
                        string.push(ch);
                        self.buffer.pop();
                    }
                    _ => break,
                }
            }
            if self.buffer.peek() == Input::Eof {
                break;
            }
            self.lookahead(2)?;
            self.read_break(&mut leading_break);
            self.block_scalar_breaks(&mut indent, &mut trailing_breaks)?;
            self.lookahead(1)?;
        }

        if chomping != -1 {
            string.push_str(&leading_break);
        }
        if chomping == 1 {
            string.push_str(&trailing_breaks);
        }

        let style = if literal {
            ScalarStyle::Literal
        } else {
            ScalarStyle::Folded
        };
        self.tokens
            .push_back((Token::Scalar(string, style), start.until(self.mark())));
        Ok(())
    }

    /// Consume breaks and indentation between block scalar lines. Detects
    /// the content indentation if it is not fixed yet.
    fn block_scalar_breaks(&mut self, indent: &mut usize, breaks: &mut String) -> Result<(), Error> {
        let mut max_indent = 0;
        loop {
            loop {
                self.lookahead(1)?;
                if (*indent == 0 || self.mark().column < *indent)
                    && self.buffer.peek() == Input::Value(' ')
                {
                    self.buffer.pop();
                } else {
                    break;
                }
            }
            if self.mark().column > max_indent {
                max_indent = self.mark().column;
            }
            match self.buffer.peek() {
                Input::Value(ch) if ch.is_yaml_break() => {
                    self.lookahead(2)?;
                    self.read_break(breaks);
                }
                _ => break,
            }
        }
        if *indent == 0 {
            *indent = max_indent.max((self.indent + 1).max(1) as usize);
        }
        Ok(())
    }

    fn fetch_flow_scalar(&mut self, style: ScalarStyle) -> Result<(), Error> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        self.scan_flow_scalar(style)
    }

    fn scan_flow_scalar(&mut self, style: ScalarStyle) -> Result<(), Error> {
        let single = style == ScalarStyle::SingleQuoted;
        let quote = if single { '\'' } else { '"' };
        let start = self.mark();
        self.buffer.pop(); // opening quote
        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        let mut leading_blanks = false;
        loop {
            self.lookahead(4)?;
            if self.mark().column == 0
                && (self.at_document_marker("---") || self.at_document_marker("..."))
            {
                return Err(ScanError::UnterminatedScalar(start).into());
            }
            if self.buffer.peek() == Input::Eof {
                return Err(ScanError::UnterminatedScalar(start).into());
            }
            // Consume non-blank characters.
            loop {
                self.lookahead(2)?;
                let Input::Value(ch) = self.buffer.peek() else {
                    break;
                };
                if ch.is_blank_or_break() {
                    break;
                }
                match ch {
                    '\'' if single && self.buffer.peek_nth(1) == Input::Value('\'') => {
                        string.push('\'');
                        self.buffer.pop();
                        self.buffer.pop();
                    }
                    ch if ch == quote => break,
                    '\\' if !single => match self.buffer.peek_nth(1) {
                        Input::Value(next) if next.is_yaml_break() => {
                            // An escaped break joins lines without a space.
                            self.buffer.pop();
                            self.lookahead(2)?;
                            self.skip_break();
                            leading_blanks = true;
                            whitespaces.clear();
                            break;
                        }
                        _ => self.scan_escape(&mut string)?,
                    },
                    ch => {
                        string.push(ch);
                        self.buffer.pop();
                    }
                }
            }
            self.lookahead(1)?;
            if self.buffer.peek() == Input::Value(quote) {
                break;
            }
            // Consume blanks and breaks.
            loop {
                self.lookahead(2)?;
                match self.buffer.peek() {
                    Input::Value(ch) if ch.is_yaml_blank() => {
                        if !leading_blanks {
                            whitespaces.push(ch);
                        }
                        self.buffer.pop();
                    }
                    Input::Value(ch) if ch.is_yaml_break() => {
                        if !leading_blanks {
                            // Blanks before a break are discarded.
                            whitespaces.clear();
                            leading_break.clear();
                            self.read_break(&mut leading_break);
                            leading_blanks = true;
                        } else {
                            self.read_break(&mut trailing_breaks);
                        }
                    }
                    _ => break,
                }
            }
            // Join whitespace or fold line breaks.
            if leading_blanks {
                if leading_break == "\n" {
                    if trailing_breaks.is_empty() {
                        string.push(' ');
                    } else {
                        string.push_str(&trailing_breaks);
                        trailing_breaks.clear();
                    }
                } else {
                    string.push_str(&leading_break);
                    string.push_str(&trailing_breaks);
                    trailing_breaks.clear();
                }
                leading_break.clear();
                leading_blanks = false;
            } else {
                string.push_str(&whitespaces);
                whitespaces.clear();
            }
        }
        self.buffer.pop(); // closing quote
        self.tokens
            .push_back((Token::Scalar(string, style), start.until(self.mark())));
        Ok(())
    }

    fn scan_escape(&mut self, out: &mut String) -> Result<(), Error> {
        let mark = self.mark();
        self.buffer.pop(); // '\\'
        self.lookahead(1)?;
        let Input::Value(code) = self.buffer.peek() else {
            return Err(ScanError::BadEscape(mark).into());
        };
        let simple = match code {
            '0' => Some('\0'),
            'a' => Some('\x07'),
            'b' => Some('\x08'),
            't' | '\t' => Some('\t'),
            'n' => Some('\n'),
            'v' => Some('\x0b'),
            'f' => Some('\x0c'),
            'r' => Some('\r'),
            'e' => Some('\x1b'),
            ' ' => Some(' '),
            '"' => Some('"'),
            '/' => Some('/'),
            '\\' => Some('\\'),
            'N' => Some('\u{85}'),
            '_' => Some('\u{a0}'),
            'L' => Some('\u{2028}'),
            'P' => Some('\u{2029}'),
            _ => None,
        };
        if let Some(ch) = simple {
            out.push(ch);
            self.buffer.pop();
            return Ok(());
        }
        let width = match code {
            'x' => 2,
            'u' => 4,
            'U' => 8,
            _ => return Err(ScanError::BadEscape(mark).into()),
        };
        self.buffer.pop();
        self.lookahead(width)?;
        let mut value: u32 = 0;
        for _ in 0..width {
            let digit = match self.buffer.peek() {
                Input::Value(ch) if ch.is_ascii_hexdigit() => ch.to_digit(16).unwrap_or(0),
                _ => return Err(ScanError::BadEscape(mark).into()),
            };
            value = value * 16 + digit;
            self.buffer.pop();
        }
        match char::from_u32(value) {
            Some(ch) => {
                out.push(ch);
                Ok(())
            }
            None => Err(ScanError::BadEscape(mark).into()),
        }
    }

    fn fetch_plain_scalar(&mut self) -> Result<(), Error> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        self.scan_plain_scalar()
    }

    fn scan_plain_scalar(&mut self) -> Result<(), Error> {
        let start = self.mark();
        let mut end = start;
        let indent = self.indent + 1;
        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        let mut leading_blanks = false;
        'outer: loop {
            self.lookahead(4)?;
            if self.mark().column == 0
                && (self.at_document_marker("---") || self.at_document_marker("..."))
            {
                break;
            }
            // A '#' after whitespace starts a comment.
            if self.buffer.peek() == Input::Value('#') {
                break;
            }
            // Consume non-blank characters.
            loop {
                self.lookahead(2)?;
                let Input::Value(ch) = self.buffer.peek() else {
                    break;
                };
                if ch.is_blank_or_break() {
                    break;
                }
                if ch == ':' {
                    let ends = match self.buffer.peek_nth(1) {
                        Input::Eof => true,
                        Input::Value(next) => {
                            next.is_blank_or_break()
                                || (self.flow_level > 0 && next.is_flow_indicator())
                        }
                    };
                    if ends {
                        break 'outer;
                    }
                }
                if self.flow_level > 0 && ch.is_flow_indicator() {
                    break 'outer;
                }
                // Commit pending folded whitespace.
                if leading_blanks || !whitespaces.is_empty() {
                    if leading_blanks {
                        if leading_break == "\n" {
                            if trailing_breaks.is_empty() {
                                string.push(' ');
                            } else {
                                string.push_str(&trailing_breaks);
                                trailing_breaks.clear();
                            }
                        } else {
                            string.push_str(&leading_break);
                            string.push_str(&trailing_breaks);
                            trailing_breaks.clear();
                        }
                        leading_break.clear();
                        leading_blanks = false;
                    } else {
                        string.push_str(&whitespaces);
                        whitespaces.clear();
                    }
                }
                string.push(ch);
                self.buffer.pop();
                end = self.mark();
            }
            // The scalar continues only across blanks and breaks.
            match self.buffer.peek() {
                Input::Value(ch) if ch.is_blank_or_break() => {}
                _ => break,
            }
            loop {
                self.lookahead(2)?;
                match self.buffer.peek() {
                    Input::Value(ch) if ch.is_yaml_blank() => {
                        if !leading_blanks {
                            whitespaces.push(ch);
                        }
                        self.buffer.pop();
                    }
                    Input::Value(ch) if ch.is_yaml_break() => {
                        if !leading_blanks {
                            whitespaces.clear();
                            leading_break.clear();
                            self.read_break(&mut leading_break);
                            leading_blanks = true;
                        } else {
                            self.read_break(&mut trailing_breaks);
                        }
                    }
                    _ => break,
                }
            }
            // Less-indented content ends the scalar in block context.
            if self.flow_level == 0 && (self.mark().column as isize) < indent {
                break;
            }
        }
        if leading_blanks {
            self.simple_key_allowed = true;
        }
        self.tokens
            .push_back((Token::Scalar(string, ScalarStyle::Plain), start.until(end)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        let mut scanner = Scanner::new(input.as_bytes());
        let mut out = Vec::new();
        while let Some((token, _)) = scanner.next_token().expect("scan error") {
            out.push(token);
        }
        out
    }

    #[track_caller]
    fn assert_tokens_eq(input: &str, expected: &[Token]) {
        assert_eq!(tokens(input), expected);
    }

    #[track_caller]
    fn assert_scan_err(input: &str, expected: ScanError) {
        let mut scanner = Scanner::new(input.as_bytes());
        loop {
            match scanner.next_token() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("expected a scan error"),
                Err(err) => {
                    assert_eq!(err, expected);
                    return;
                }
            }
        }
    }

    fn plain(text: &str) -> Token {
        Token::Scalar(text.to_owned(), ScalarStyle::Plain)
    }

    #[test]
    fn block_mapping() {
        assert_tokens_eq(
            "key: value\n",
            &[
                Token::StreamStart(Encoding::Utf8),
                Token::BlockMappingStart,
                Token::Key,
                plain("key"),
                Token::Value,
                plain("value"),
                Token::BlockEnd,
                Token::StreamEnd,
            ],
        );
    }

    #[test]
    fn carriage_return_breaks_scan_like_line_feeds() {
        let expected = tokens("a: 1\nb: 2\n");
        assert_eq!(tokens("a: 1\rb: 2\r"), expected);
        assert_eq!(tokens("a: 1\r\nb: 2\r\n"), expected);
    }

    #[test]
    fn block_sequence() {
        assert_tokens_eq(
            "- a\n- b\n",
            &[
                Token::StreamStart(Encoding::Utf8),
                Token::BlockSequenceStart,
                Token::BlockEntry,
                plain("a"),
                Token::BlockEntry,
                plain("b"),
                Token::BlockEnd,
                Token::StreamEnd,
            ],
        );
    }

    #[test]
    fn nested_block_mapping() {
        assert_tokens_eq(
            "outer:\n  inner: 1\n",
            &[
                Token::StreamStart(Encoding::Utf8),
                Token::BlockMappingStart,
                Token::Key,
                plain("outer"),
                Token::Value,
                Token::BlockMappingStart,
                Token::Key,
                plain("inner"),
                Token::Value,
                plain("1"),
                Token::BlockEnd,
                Token::BlockEnd,
                Token::StreamEnd,
            ],
        );
    }

    #[test]
    fn flow_collections() {
        assert_tokens_eq(
            "{a: 1, b: [x, y]}\n",
            &[
                Token::StreamStart(Encoding::Utf8),
                Token::FlowMappingStart,
                Token::Key,
                plain("a"),
                Token::Value,
                plain("1"),
                Token::FlowEntry,
                Token::Key,
                plain("b"),
                Token::Value,
                Token::FlowSequenceStart,
                plain("x"),
                Token::FlowEntry,
                plain("y"),
                Token::FlowSequenceEnd,
                Token::FlowMappingEnd,
                Token::StreamEnd,
            ],
        );
    }

    #[test]
    fn quoted_scalars() {
        assert_tokens_eq(
            "'it''s'\n",
            &[
                Token::StreamStart(Encoding::Utf8),
                Token::Scalar("it's".to_owned(), ScalarStyle::SingleQuoted),
                Token::StreamEnd,
            ],
        );
        assert_tokens_eq(
            "\"a\\nb \\x41\"\n",
            &[
                Token::StreamStart(Encoding::Utf8),
                Token::Scalar("a\nb A".to_owned(), ScalarStyle::DoubleQuoted),
                Token::StreamEnd,
            ],
        );
    }

    #[test]
    fn plain_scalar_folding() {
        assert_tokens_eq(
            "one\n two\n",
            &[
                Token::StreamStart(Encoding::Utf8),
                plain("one two"),
                Token::StreamEnd,
            ],
        );
    }

    #[test]
    fn literal_block_scalar() {
        assert_tokens_eq(
            "key: |\n  line1\n  line2\n",
            &[
                Token::StreamStart(Encoding::Utf8),
                Token::BlockMappingStart,
                Token::Key,
                plain("key"),
                Token::Value,
                Token::Scalar("line1\nline2\n".to_owned(), ScalarStyle::Literal),
                Token::BlockEnd,
                Token::StreamEnd,
            ],
        );
    }

    #[test]
    fn folded_block_scalar() {
        assert_tokens_eq(
            "key: >\n  one\n  two\n",
            &[
                Token::StreamStart(Encoding::Utf8),
                Token::BlockMappingStart,
                Token::Key,
                plain("key"),
                Token::Value,
                Token::Scalar("one two\n".to_owned(), ScalarStyle::Folded),
                Token::BlockEnd,
                Token::StreamEnd,
            ],
        );
    }

    #[test]
    fn block_scalar_chomping() {
        assert_tokens_eq(
            "|-\n  a\n",
            &[
                Token::StreamStart(Encoding::Utf8),
                Token::Scalar("a".to_owned(), ScalarStyle::Literal),
                Token::StreamEnd,
            ],
        );
        assert_tokens_eq(
            "|+\n  a\n\n",
            &[
                Token::StreamStart(Encoding::Utf8),
                Token::Scalar("a\n\n".to_owned(), ScalarStyle::Literal),
                Token::StreamEnd,
            ],
        );
    }

    #[test]
    fn anchors_and_aliases() {
        assert_tokens_eq(
            "a: &x 1\nb: *x\n",
            &[
                Token::StreamStart(Encoding::Utf8),
                Token::BlockMappingStart,
                Token::Key,
                plain("a"),
                Token::Value,
                Token::Anchor("x".to_owned()),
                plain("1"),
                Token::Key,
                plain("b"),
                Token::Value,
                Token::Alias("x".to_owned()),
                Token::BlockEnd,
                Token::StreamEnd,
            ],
        );
    }

    #[test]
    fn tags() {
        assert_tokens_eq(
            "!!str a\n",
            &[
                Token::StreamStart(Encoding::Utf8),
                Token::Tag("!!str".to_owned()),
                plain("a"),
                Token::StreamEnd,
            ],
        );
        assert_tokens_eq(
            "!<tag:example.org,2002:x> a\n",
            &[
                Token::StreamStart(Encoding::Utf8),
                Token::Tag("tag:example.org,2002:x".to_owned()),
                plain("a"),
                Token::StreamEnd,
            ],
        );
    }

    #[test]
    fn directives_and_markers() {
        assert_tokens_eq(
            "%YAML 1.1\n--- a\n...\n",
            &[
                Token::StreamStart(Encoding::Utf8),
                Token::VersionDirective(1, 1),
                Token::DocumentStart,
                plain("a"),
                Token::DocumentEnd,
                Token::StreamEnd,
            ],
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_tokens_eq(
            "# header\nkey: value # trailing\n",
            &[
                Token::StreamStart(Encoding::Utf8),
                Token::BlockMappingStart,
                Token::Key,
                plain("key"),
                Token::Value,
                plain("value"),
                Token::BlockEnd,
                Token::StreamEnd,
            ],
        );
    }

    #[test]
    fn tag_directive_is_rejected() {
        assert_scan_err(
            "%TAG ! tag:example.org,2002:\n",
            ScanError::TagDirective(Mark::default()),
        );
    }

    #[test]
    fn unknown_directive_is_rejected() {
        assert_scan_err("%FOO bar\n", ScanError::UnknownDirective(Mark::default()));
    }

    #[test]
    fn unterminated_quoted_scalar() {
        assert_scan_err("'abc", ScanError::UnterminatedScalar(Mark::default()));
    }

    #[test]
    fn bad_escape() {
        assert_scan_err(
            "\"\\q\"",
            ScanError::BadEscape(Mark {
                index: 1,
                line: 0,
                column: 1,
            }),
        );
    }

    #[test]
    fn bad_version_directive() {
        assert_scan_err("%YAML 1\n", ScanError::BadVersionDirective(Mark::default()));
    }
}
