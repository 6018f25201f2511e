use std::io::BufRead;

use crate::event::EventData;
use crate::{
    CollectionStyle, Error, Event, EventKind, EventSlot, Mark, ScalarStyle, Scanner, Span, Token,
    TokenType, VersionDirective,
};

/// Exclusive processing mode of a [`Parser`], fixed by the first call to
/// [`Parser::scan_token`], [`Parser::parse`] or [`Parser::load`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    #[default]
    Any,
    Scan,
    Parse,
    Load,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("not a token-based parser")]
    NotTokenBased,
    #[error("not an event-based parser")]
    NotEventBased,
    #[error("not a document-based parser")]
    NotDocumentBased,
    #[error("no more events after STREAM-END")]
    EndOfStream,
    #[error("expected {expected}, found {found} at {mark}")]
    Expected {
        expected: &'static str,
        found: TokenType,
        mark: Mark,
    },
    #[error("duplicate {0} property at {1}")]
    DuplicateProperty(&'static str, Mark),
    #[error("unexpected end of the token stream")]
    UnexpectedEndOfTokens,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    BlockNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
    End,
}

fn empty_scalar(mark: Mark) -> Event {
    Event::new(
        EventData::Scalar {
            anchor: None,
            tag: None,
            value: String::new(),
            plain_implicit: true,
            quoted_implicit: false,
            style: ScalarStyle::Plain,
        },
        Span::empty(mark),
    )
}

/// A streaming pull parser over a buffered reader.
pub struct Parser<R> {
    scanner: Scanner<R>,
    mode: Mode,
    state: State,
    states: Vec<State>,
    lookahead: Option<(Token, Span)>,
}

impl<R: BufRead> Parser<R> {
    pub fn new(reader: R) -> Self {
        Parser {
            scanner: Scanner::new(reader),
            mode: Mode::Any,
            state: State::StreamStart,
            states: Vec::new(),
            lookahead: None,
        }
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn fix_mode(&mut self, mode: Mode) -> Result<(), ParseError> {
        if self.mode == Mode::Any {
            self.mode = mode;
            return Ok(());
        }
        if self.mode == mode {
            return Ok(());
        }
        Err(match mode {
            Mode::Scan => ParseError::NotTokenBased,
            Mode::Parse => ParseError::NotEventBased,
            Mode::Load => ParseError::NotDocumentBased,
            Mode::Any => panic!("inconsistent parser state"),
        })
    }

    /// The next raw token of the stream. Fixes the parser in token mode.
    pub fn scan_token(&mut self) -> Result<Option<(Token, Span)>, Error> {
        self.fix_mode(Mode::Scan)?;
        self.scanner.next_token()
    }

    /// Produce the next event into `out`. Fixes the parser in event mode.
    ///
    /// The slot is cleared first and initialized only on success. Calling
    /// again after STREAM-END is [`ParseError::EndOfStream`].
    pub fn parse(&mut self, out: &mut EventSlot) -> Result<(), Error> {
        self.fix_mode(Mode::Parse)?;
        out.clear();
        let event = self.next_event()?;
        out.set(event);
        Ok(())
    }

    /// Collect the event run of the next document, or `None` once the
    /// stream is exhausted. Fixes the parser in document mode.
    pub fn load(&mut self) -> Result<Option<Vec<Event>>, Error> {
        self.fix_mode(Mode::Load)?;
        if self.state == State::End {
            return Ok(None);
        }
        let mut events = Vec::new();
        loop {
            let event = self.next_event()?;
            match event.kind() {
                EventKind::StreamStart => continue,
                EventKind::StreamEnd => return Ok(None),
                EventKind::DocumentEnd => {
                    events.push(event);
                    return Ok(Some(events));
                }
                _ => events.push(event),
            }
        }
    }

    fn peek(&mut self) -> Result<(&Token, Span), Error> {
        if self.lookahead.is_none() {
            self.lookahead = self.scanner.next_token()?;
        }
        match &self.lookahead {
            Some((token, span)) => Ok((token, *span)),
            None => Err(ParseError::UnexpectedEndOfTokens.into()),
        }
    }

    fn peek_type(&mut self) -> Result<TokenType, Error> {
        Ok(self.peek()?.0.ty())
    }

    fn next(&mut self) -> Result<(Token, Span), Error> {
        self.peek()?;
        match self.lookahead.take() {
            Some(entry) => Ok(entry),
            None => panic!("inconsistent parser state"),
        }
    }

    fn skip(&mut self) -> Result<Span, Error> {
        Ok(self.next()?.1)
    }

    fn pop_state(&mut self) -> State {
        match self.states.pop() {
            Some(state) => state,
            None => panic!("inconsistent parser state"),
        }
    }

    fn next_event(&mut self) -> Result<Event, Error> {
        match self.state {
            State::StreamStart => self.parse_stream_start(),
            State::ImplicitDocumentStart => self.parse_document_start(true),
            State::DocumentStart => self.parse_document_start(false),
            State::DocumentContent => self.parse_document_content(),
            State::DocumentEnd => self.parse_document_end(),
            State::BlockNode => self.parse_node(true, false),
            State::BlockSequenceFirstEntry => self.parse_block_sequence_entry(true),
            State::BlockSequenceEntry => self.parse_block_sequence_entry(false),
            State::IndentlessSequenceEntry => self.parse_indentless_sequence_entry(),
            State::BlockMappingFirstKey => self.parse_block_mapping_key(true),
            State::BlockMappingKey => self.parse_block_mapping_key(false),
            State::BlockMappingValue => self.parse_block_mapping_value(),
            State::FlowSequenceFirstEntry => self.parse_flow_sequence_entry(true),
            State::FlowSequenceEntry => self.parse_flow_sequence_entry(false),
            State::FlowSequenceEntryMappingKey => self.parse_flow_sequence_entry_mapping_key(),
            State::FlowSequenceEntryMappingValue => self.parse_flow_sequence_entry_mapping_value(),
            State::FlowSequenceEntryMappingEnd => self.parse_flow_sequence_entry_mapping_end(),
            State::FlowMappingFirstKey => self.parse_flow_mapping_key(true),
            State::FlowMappingKey => self.parse_flow_mapping_key(false),
            State::FlowMappingValue => self.parse_flow_mapping_value(false),
            State::FlowMappingEmptyValue => self.parse_flow_mapping_value(true),
            State::End => Err(ParseError::EndOfStream.into()),
        }
    }

    fn parse_stream_start(&mut self) -> Result<Event, Error> {
        let (token, span) = self.next()?;
        match token {
            Token::StreamStart(encoding) => {
                self.state = State::ImplicitDocumentStart;
                Ok(Event::new(EventData::StreamStart { encoding }, span))
            }
            other => Err(ParseError::Expected {
                expected: "<stream start>",
                found: other.ty(),
                mark: span.start,
            }
            .into()),
        }
    }

    fn parse_document_start(&mut self, implicit: bool) -> Result<Event, Error> {
        if !implicit {
            // Skip stray '...' markers between documents.
            while self.peek_type()? == TokenType::DocumentEnd {
                self.skip()?;
            }
        }
        match self.peek_type()? {
            TokenType::StreamEnd => {
                let (_, span) = self.next()?;
                self.state = State::End;
                Ok(Event::new(EventData::StreamEnd, span))
            }
            TokenType::VersionDirective | TokenType::DocumentStart => {
                let (token, span) = self.peek()?;
                let start = span.start;
                let version = if let Token::VersionDirective(major, minor) = token {
                    let version = VersionDirective {
                        major: *major,
                        minor: *minor,
                    };
                    self.skip()?;
                    Some(version)
                } else {
                    None
                };
                let (token, span) = self.peek()?;
                if token.ty() != TokenType::DocumentStart {
                    return Err(ParseError::Expected {
                        expected: "'---'",
                        found: token.ty(),
                        mark: span.start,
                    }
                    .into());
                }
                let end = self.skip()?.end;
                self.states.push(State::DocumentEnd);
                self.state = State::DocumentContent;
                Ok(Event::new(
                    EventData::DocumentStart {
                        version,
                        implicit: false,
                    },
                    Span { start, end },
                ))
            }
            _ => {
                let (token, span) = self.peek()?;
                if !implicit {
                    return Err(ParseError::Expected {
                        expected: "'---' or <stream end>",
                        found: token.ty(),
                        mark: span.start,
                    }
                    .into());
                }
                self.states.push(State::DocumentEnd);
                self.state = State::BlockNode;
                Ok(Event::new(
                    EventData::DocumentStart {
                        version: None,
                        implicit: true,
                    },
                    Span::empty(span.start),
                ))
            }
        }
    }

    fn parse_document_content(&mut self) -> Result<Event, Error> {
        match self.peek_type()? {
            TokenType::VersionDirective
            | TokenType::DocumentStart
            | TokenType::DocumentEnd
            | TokenType::StreamEnd => {
                let mark = self.peek()?.1.start;
                self.state = self.pop_state();
                Ok(empty_scalar(mark))
            }
            _ => self.parse_node(true, false),
        }
    }

    fn parse_document_end(&mut self) -> Result<Event, Error> {
        let (token, span) = self.peek()?;
        let mut implicit = true;
        let mut out = Span::empty(span.start);
        if token.ty() == TokenType::DocumentEnd {
            implicit = false;
            out = self.skip()?;
        }
        self.state = State::DocumentStart;
        Ok(Event::new(EventData::DocumentEnd { implicit }, out))
    }

    /// Parse a node with its properties. `indentless` permits the
    /// indentless block sequence that may follow a block mapping key.
    fn parse_node(&mut self, block: bool, indentless: bool) -> Result<Event, Error> {
        let (token, span) = self.peek()?;
        if token.ty() == TokenType::Alias {
            let (token, span) = self.next()?;
            let Token::Alias(anchor) = token else {
                panic!("inconsistent parser state");
            };
            self.state = self.pop_state();
            return Ok(Event::new(
                EventData::Alias {
                    anchor: Some(anchor),
                },
                span,
            ));
        }
        let start = span.start;
        let mut anchor = None;
        let mut tag = None;
        loop {
            let (token, span) = self.peek()?;
            match token.ty() {
                TokenType::Anchor => {
                    if anchor.is_some() {
                        return Err(ParseError::DuplicateProperty("anchor", span.start).into());
                    }
                    let (Token::Anchor(name), _) = self.next()? else {
                        panic!("inconsistent parser state");
                    };
                    anchor = Some(name);
                }
                TokenType::Tag => {
                    if tag.is_some() {
                        return Err(ParseError::DuplicateProperty("tag", span.start).into());
                    }
                    let (Token::Tag(text), _) = self.next()? else {
                        panic!("inconsistent parser state");
                    };
                    tag = Some(text);
                }
                _ => break,
            }
        }
        let implicit = tag.is_none();
        let (token, span) = self.peek()?;
        match token.ty() {
            TokenType::BlockEntry if indentless => {
                self.state = State::IndentlessSequenceEntry;
                Ok(Event::new(
                    EventData::SequenceStart {
                        anchor,
                        tag,
                        implicit,
                        style: CollectionStyle::Block,
                    },
                    start.until(span.end),
                ))
            }
            TokenType::Scalar => {
                let (Token::Scalar(value, style), span) = self.next()? else {
                    panic!("inconsistent parser state");
                };
                self.state = self.pop_state();
                let plain_implicit = style == ScalarStyle::Plain && implicit;
                let quoted_implicit = style != ScalarStyle::Plain && implicit;
                Ok(Event::new(
                    EventData::Scalar {
                        anchor,
                        tag,
                        value,
                        plain_implicit,
                        quoted_implicit,
                        style,
                    },
                    Span {
                        start,
                        end: span.end,
                    },
                ))
            }
            TokenType::FlowSequenceStart => {
                self.state = State::FlowSequenceFirstEntry;
                Ok(Event::new(
                    EventData::SequenceStart {
                        anchor,
                        tag,
                        implicit,
                        style: CollectionStyle::Flow,
                    },
                    start.until(span.end),
                ))
            }
            TokenType::FlowMappingStart => {
                self.state = State::FlowMappingFirstKey;
                Ok(Event::new(
                    EventData::MappingStart {
                        anchor,
                        tag,
                        implicit,
                        style: CollectionStyle::Flow,
                    },
                    start.until(span.end),
                ))
            }
            TokenType::BlockSequenceStart if block => {
                self.state = State::BlockSequenceFirstEntry;
                Ok(Event::new(
                    EventData::SequenceStart {
                        anchor,
                        tag,
                        implicit,
                        style: CollectionStyle::Block,
                    },
                    start.until(span.end),
                ))
            }
            TokenType::BlockMappingStart if block => {
                self.state = State::BlockMappingFirstKey;
                Ok(Event::new(
                    EventData::MappingStart {
                        anchor,
                        tag,
                        implicit,
                        style: CollectionStyle::Block,
                    },
                    start.until(span.end),
                ))
            }
            _ if anchor.is_some() || tag.is_some() => {
                // Properties with no node: an empty scalar.
                self.state = self.pop_state();
                Ok(Event::new(
                    EventData::Scalar {
                        anchor,
                        tag,
                        value: String::new(),
                        plain_implicit: implicit,
                        quoted_implicit: false,
                        style: ScalarStyle::Plain,
                    },
                    Span::empty(start),
                ))
            }
            _ => Err(ParseError::Expected {
                expected: "node content",
                found: token.ty(),
                mark: span.start,
            }
            .into()),
        }
    }

    fn parse_block_sequence_entry(&mut self, first: bool) -> Result<Event, Error> {
        if first {
            self.skip()?; // BlockSequenceStart
        }
        let (token, span) = self.peek()?;
        match token.ty() {
            TokenType::BlockEntry => {
                self.skip()?;
                let (token, span) = self.peek()?;
                match token.ty() {
                    TokenType::BlockEntry | TokenType::BlockEnd => {
                        self.state = State::BlockSequenceEntry;
                        Ok(empty_scalar(span.start))
                    }
                    _ => {
                        self.states.push(State::BlockSequenceEntry);
                        self.parse_node(true, false)
                    }
                }
            }
            TokenType::BlockEnd => {
                let span = self.skip()?;
                self.state = self.pop_state();
                Ok(Event::new(EventData::SequenceEnd, span))
            }
            _ => Err(ParseError::Expected {
                expected: "'-' or <block end>",
                found: token.ty(),
                mark: span.start,
            }
            .into()),
        }
    }

    fn parse_indentless_sequence_entry(&mut self) -> Result<Event, Error> {
        let (token, span) = self.peek()?;
        if token.ty() == TokenType::BlockEntry {
            self.skip()?;
            let (token, span) = self.peek()?;
            match token.ty() {
                TokenType::BlockEntry
                | TokenType::Key
                | TokenType::Value
                | TokenType::BlockEnd => {
                    self.state = State::IndentlessSequenceEntry;
                    Ok(empty_scalar(span.start))
                }
                _ => {
                    self.states.push(State::IndentlessSequenceEntry);
                    self.parse_node(true, false)
                }
            }
        } else {
            self.state = self.pop_state();
            Ok(Event::new(EventData::SequenceEnd, Span::empty(span.start)))
        }
    }

    fn parse_block_mapping_key(&mut self, first: bool) -> Result<Event, Error> {
        if first {
            self.skip()?; // BlockMappingStart
        }
        let (token, span) = self.peek()?;
        match token.ty() {
            TokenType::Key => {
                self.skip()?;
                let (token, span) = self.peek()?;
                match token.ty() {
                    TokenType::Key | TokenType::Value | TokenType::BlockEnd => {
                        self.state = State::BlockMappingValue;
                        Ok(empty_scalar(span.start))
                    }
                    _ => {
                        self.states.push(State::BlockMappingValue);
                        self.parse_node(true, true)
                    }
                }
            }
            TokenType::Value => {
                // A value with no key.
                self.state = State::BlockMappingValue;
                Ok(empty_scalar(span.start))
            }
            TokenType::BlockEnd => {
                let span = self.skip()?;
                self.state = self.pop_state();
                Ok(Event::new(EventData::MappingEnd, span))
            }
            _ => Err(ParseError::Expected {
                expected: "a key or <block end>",
                found: token.ty(),
                mark: span.start,
            }
            .into()),
        }
    }

    fn parse_block_mapping_value(&mut self) -> Result<Event, Error> {
        let (token, span) = self.peek()?;
        if token.ty() == TokenType::Value {
            self.skip()?;
            let (token, span) = self.peek()?;
            match token.ty() {
                TokenType::Key | TokenType::Value | TokenType::BlockEnd => {
                    self.state = State::BlockMappingKey;
                    Ok(empty_scalar(span.start))
                }
                _ => {
                    self.states.push(State::BlockMappingKey);
                    self.parse_node(true, true)
                }
            }
        } else {
            self.state = State::BlockMappingKey;
            Ok(empty_scalar(span.start))
        }
    }

    fn parse_flow_sequence_entry(&mut self, first: bool) -> Result<Event, Error> {
        if first {
            self.skip()?; // FlowSequenceStart
        }
        let (token, span) = self.peek()?;
        if token.ty() != TokenType::FlowSequenceEnd {
            if !first {
                if token.ty() == TokenType::FlowEntry {
                    self.skip()?;
                } else {
                    return Err(ParseError::Expected {
                        expected: "',' or ']'",
                        found: token.ty(),
                        mark: span.start,
                    }
                    .into());
                }
            }
            let (token, span) = self.peek()?;
            match token.ty() {
                TokenType::Key => {
                    // A single-pair mapping inside a flow sequence.
                    let span = self.skip()?;
                    self.state = State::FlowSequenceEntryMappingKey;
                    return Ok(Event::new(
                        EventData::MappingStart {
                            anchor: None,
                            tag: None,
                            implicit: true,
                            style: CollectionStyle::Flow,
                        },
                        span,
                    ));
                }
                TokenType::FlowSequenceEnd => {}
                _ => {
                    self.states.push(State::FlowSequenceEntry);
                    return self.parse_node(false, false);
                }
            }
        }
        let span = self.skip()?; // ']'
        self.state = self.pop_state();
        Ok(Event::new(EventData::SequenceEnd, span))
    }

    fn parse_flow_sequence_entry_mapping_key(&mut self) -> Result<Event, Error> {
        let (token, span) = self.peek()?;
        match token.ty() {
            TokenType::Value | TokenType::FlowEntry | TokenType::FlowSequenceEnd => {
                self.state = State::FlowSequenceEntryMappingValue;
                Ok(empty_scalar(span.start))
            }
            _ => {
                self.states.push(State::FlowSequenceEntryMappingValue);
                self.parse_node(false, false)
            }
        }
    }

    fn parse_flow_sequence_entry_mapping_value(&mut self) -> Result<Event, Error> {
        let (token, span) = self.peek()?;
        if token.ty() == TokenType::Value {
            self.skip()?;
            let (token, span) = self.peek()?;
            match token.ty() {
                TokenType::FlowEntry | TokenType::FlowSequenceEnd => {
                    self.state = State::FlowSequenceEntryMappingEnd;
                    Ok(empty_scalar(span.start))
                }
                _ => {
                    self.states.push(State::FlowSequenceEntryMappingEnd);
                    self.parse_node(false, false)
                }
            }
        } else {
            self.state = State::FlowSequenceEntryMappingEnd;
            Ok(empty_scalar(span.start))
        }
    }

    fn parse_flow_sequence_entry_mapping_end(&mut self) -> Result<Event, Error> {
        let mark = self.peek()?.1.start;
        self.state = State::FlowSequenceEntry;
        Ok(Event::new(EventData::MappingEnd, Span::empty(mark)))
    }

    fn parse_flow_mapping_key(&mut self, first: bool) -> Result<Event, Error> {
        if first {
            self.skip()?; // FlowMappingStart
        }
        let (token, span) = self.peek()?;
        if token.ty() != TokenType::FlowMappingEnd {
            if !first {
                if token.ty() == TokenType::FlowEntry {
                    self.skip()?;
                } else {
                    return Err(ParseError::Expected {
                        expected: "',' or '}'",
                        found: token.ty(),
                        mark: span.start,
                    }
                    .into());
                }
            }
            let (token, span) = self.peek()?;
            match token.ty() {
                TokenType::Key => {
                    self.skip()?;
                    let (token, span) = self.peek()?;
                    match token.ty() {
                        TokenType::Value | TokenType::FlowEntry | TokenType::FlowMappingEnd => {
                            self.state = State::FlowMappingValue;
                            return Ok(empty_scalar(span.start));
                        }
                        _ => {
                            self.states.push(State::FlowMappingValue);
                            return self.parse_node(false, false);
                        }
                    }
                }
                TokenType::FlowMappingEnd => {}
                _ => {
                    self.states.push(State::FlowMappingEmptyValue);
                    return self.parse_node(false, false);
                }
            }
        }
        let span = self.skip()?; // '}'
        self.state = self.pop_state();
        Ok(Event::new(EventData::MappingEnd, span))
    }

    fn parse_flow_mapping_value(&mut self, empty: bool) -> Result<Event, Error> {
        let (token, span) = self.peek()?;
        if empty {
            self.state = State::FlowMappingKey;
            return Ok(empty_scalar(span.start));
        }
        if token.ty() == TokenType::Value {
            self.skip()?;
            let (token, span) = self.peek()?;
            match token.ty() {
                TokenType::FlowEntry | TokenType::FlowMappingEnd => {
                    self.state = State::FlowMappingKey;
                    Ok(empty_scalar(span.start))
                }
                _ => {
                    self.states.push(State::FlowMappingKey);
                    self.parse_node(false, false)
                }
            }
        } else {
            self.state = State::FlowMappingKey;
            Ok(empty_scalar(span.start))
        }
    }
}
