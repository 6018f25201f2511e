use std::io::Write;

use crate::event::EventData;
use crate::{Break, CollectionStyle, Error, Event, EventKind, EventSlot, NodeKind, ScalarStyle};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    #[error("the event slot is not initialized")]
    UninitializedEvent,
    #[error("unexpected {0} event")]
    UnexpectedEvent(EventKind),
    #[error("SEQUENCE-END does not match the open container")]
    MismatchedSequenceEnd,
    #[error("MAPPING-END does not match the open container")]
    MismatchedMappingEnd,
    #[error("alias event without an anchor")]
    MissingAnchor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    StreamStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    End,
}

/// A container that has been started but not yet ended.
#[derive(Clone, Debug)]
struct OpenContainer {
    kind: NodeKind,
    flow: bool,
    /// Column where block entries of this container begin.
    indent: usize,
    items: usize,
    awaiting_value: bool,
    /// The container is a key of a block mapping; its close appends ':'.
    is_key: bool,
    /// The first entry continues the '- ' line instead of opening its own.
    inline_first: bool,
    /// Written before '{}' or '[]' when a block container closes empty.
    empty_sep: String,
}

bitflags::bitflags! {
    /// Which styles a scalar text admits.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct ScalarFlags: u8 {
        const PLAIN = 1;
        const SINGLE = 1 << 1;
        const DOUBLE = 1 << 2;
        const BLOCK = 1 << 3;
    }
}

fn analyze_scalar(value: &str, in_flow: bool) -> ScalarFlags {
    if value.is_empty() {
        return ScalarFlags::SINGLE | ScalarFlags::DOUBLE;
    }
    if value
        .chars()
        .any(|ch| ch != '\n' && (ch == '\t' || ch.is_control() || ch == '\u{7f}'))
    {
        return ScalarFlags::DOUBLE;
    }
    let mut flags = ScalarFlags::all();
    if value
        .chars()
        .next()
        .map_or(false, |ch| "-?:,[]{}#&*!|>'\"%@`".contains(ch))
    {
        flags.remove(ScalarFlags::PLAIN);
    }
    if value.starts_with(' ') || value.ends_with(' ') {
        flags.remove(ScalarFlags::PLAIN);
        flags.remove(ScalarFlags::BLOCK);
    }
    if value.starts_with("---") || value.starts_with("...") {
        flags.remove(ScalarFlags::PLAIN);
    }
    if value.contains(": ") || value.ends_with(':') || value.contains(" #") {
        flags.remove(ScalarFlags::PLAIN);
    }
    if in_flow
        && value.contains(|ch| matches!(ch, ',' | '[' | ']' | '{' | '}' | ':'))
    {
        flags.remove(ScalarFlags::PLAIN);
    }
    if value.contains('\n') {
        flags.remove(ScalarFlags::PLAIN);
        flags.remove(ScalarFlags::SINGLE);
        if value.contains("\n\n") {
            flags.remove(ScalarFlags::BLOCK);
        }
        let mut lines: Vec<&str> = value.split('\n').collect();
        if lines.last() == Some(&"") {
            lines.pop();
        }
        if lines.iter().any(|line| line.is_empty() || line.starts_with(' ')) {
            flags.remove(ScalarFlags::BLOCK);
        }
    }
    flags
}

/// Settle the `Any` style and degrade requests the text cannot satisfy.
fn resolve_scalar_style(requested: ScalarStyle, flags: ScalarFlags, block_ok: bool) -> ScalarStyle {
    let block_ok = block_ok && flags.contains(ScalarFlags::BLOCK);
    match requested {
        ScalarStyle::Literal if block_ok => ScalarStyle::Literal,
        ScalarStyle::Folded if block_ok => ScalarStyle::Folded,
        ScalarStyle::Literal | ScalarStyle::Folded => ScalarStyle::DoubleQuoted,
        ScalarStyle::Plain | ScalarStyle::Any if flags.contains(ScalarFlags::PLAIN) => {
            ScalarStyle::Plain
        }
        ScalarStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
        _ if flags.contains(ScalarFlags::SINGLE) => ScalarStyle::SingleQuoted,
        _ => ScalarStyle::DoubleQuoted,
    }
}

fn push_single_quoted(text: &mut String, value: &str) {
    text.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            text.push_str("''");
        } else {
            text.push(ch);
        }
    }
    text.push('\'');
}

fn push_double_quoted(text: &mut String, value: &str) {
    text.push('"');
    for ch in value.chars() {
        match ch {
            '"' => text.push_str("\\\""),
            '\\' => text.push_str("\\\\"),
            '\n' => text.push_str("\\n"),
            '\t' => text.push_str("\\t"),
            '\r' => text.push_str("\\r"),
            '\0' => text.push_str("\\0"),
            ch if (ch as u32) < 0x20 || ch == '\u{7f}' => {
                text.push_str(&format!("\\x{:02x}", ch as u32));
            }
            ch => text.push(ch),
        }
    }
    text.push('"');
}

/// Literal and folded scalars. The header carries '-' when the value has
/// no trailing line break; folded content lines are separated by a blank
/// line so folding reads them back unchanged.
fn push_block_scalar(text: &mut String, value: &str, literal: bool, indent: usize) {
    text.push(if literal { '|' } else { '>' });
    if !value.ends_with('\n') {
        text.push('-');
    }
    let mut lines: Vec<&str> = value.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    for (i, line) in lines.iter().enumerate() {
        text.push('\n');
        if !literal && i > 0 {
            text.push('\n');
        }
        text.push_str(&" ".repeat(indent));
        text.push_str(line);
    }
}

fn push_properties(text: &mut String, anchor: &Option<String>, tag: &Option<String>) -> bool {
    let mut wrote = false;
    if let Some(anchor) = anchor {
        text.push('&');
        text.push_str(anchor);
        wrote = true;
    }
    if let Some(tag) = tag {
        if wrote {
            text.push(' ');
        }
        if tag.starts_with('!') {
            text.push_str(tag);
        } else {
            text.push_str("!<");
            text.push_str(tag);
            text.push('>');
        }
        wrote = true;
    }
    wrote
}

/// State changes to apply once an event's text reached the sink.
#[derive(Debug, Default)]
struct Commit {
    state: Option<State>,
    document: bool,
    push: Option<OpenContainer>,
    pop: bool,
    complete: bool,
}

/// A streaming push emitter over a writer.
///
/// Each event is validated and formatted to a scratch buffer before any
/// byte reaches the sink or any state changes; a failed event leaves the
/// emitter exactly as after the last successful one.
pub struct Emitter<W: Write> {
    writer: W,
    line_break: Break,
    state: State,
    containers: Vec<OpenContainer>,
    documents: usize,
    line_dirty: bool,
}

impl<W: Write> Emitter<W> {
    pub fn new(writer: W) -> Self {
        Emitter {
            writer,
            line_break: Break::Any,
            state: State::StreamStart,
            containers: Vec::new(),
            documents: 0,
            line_dirty: false,
        }
    }

    /// Line break style used for every break in the output.
    pub fn with_break(mut self, line_break: Break) -> Self {
        self.line_break = line_break;
        self
    }

    /// Emit the event held by `slot`, leaving the slot uninitialized. The
    /// event is consumed even when emission fails.
    pub fn emit(&mut self, slot: &mut EventSlot) -> Result<(), Error> {
        let event = slot.take().ok_or(EmitError::UninitializedEvent)?;
        self.emit_event(event)
    }

    pub fn emit_all<'a, I>(&mut self, slots: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = &'a mut EventSlot>,
    {
        for slot in slots {
            self.emit(slot)?;
        }
        Ok(())
    }

    pub fn emit_event(&mut self, event: Event) -> Result<(), Error> {
        let mut text = String::new();
        let commit = self.prepare(&event, &mut text)?;
        self.write_text(&text)?;
        let flush = event.kind() == EventKind::StreamEnd;
        self.apply(commit);
        if flush {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.writer.flush().map_err(Error::Write)
    }

    pub fn finish(mut self) -> Result<(), Error> {
        self.flush()
    }

    fn write_text(&mut self, text: &str) -> Result<(), Error> {
        if text.is_empty() {
            return Ok(());
        }
        match self.line_break {
            Break::Any | Break::Lf => self.writer.write_all(text.as_bytes()),
            _ => {
                let translated = text.replace('\n', self.line_break.as_str());
                self.writer.write_all(translated.as_bytes())
            }
        }
        .map_err(Error::Write)?;
        self.line_dirty = !text.ends_with('\n');
        Ok(())
    }

    fn apply(&mut self, commit: Commit) {
        if let Some(state) = commit.state {
            self.state = state;
        }
        if commit.document {
            self.documents += 1;
        }
        if let Some(container) = commit.push {
            self.containers.push(container);
        }
        if commit.pop && self.containers.pop().is_none() {
            panic!("inconsistent emitter state");
        }
        if commit.complete {
            self.node_completed();
        }
    }

    /// A node finished at the innermost position: advance the parent
    /// container, or mark the document root as done.
    fn node_completed(&mut self) {
        match self.containers.last_mut() {
            Some(c) if c.kind == NodeKind::Mapping => {
                if c.awaiting_value {
                    c.awaiting_value = false;
                    c.items += 1;
                } else {
                    c.awaiting_value = true;
                }
            }
            Some(c) => c.items += 1,
            None => self.state = State::DocumentEnd,
        }
    }

    fn line_prefix(&self, indent: usize) -> String {
        let mut s = String::new();
        if self.line_dirty {
            s.push('\n');
        }
        s.push_str(&" ".repeat(indent));
        s
    }

    /// Separator owed before a node that continues the current line, per
    /// the innermost container.
    fn inline_prefix(&self) -> String {
        match self.containers.last() {
            None => {
                if self.line_dirty {
                    " ".to_owned()
                } else {
                    String::new()
                }
            }
            Some(c) if c.flow => {
                if c.kind == NodeKind::Mapping && c.awaiting_value {
                    ": ".to_owned()
                } else if c.items == 0 {
                    String::new()
                } else {
                    ", ".to_owned()
                }
            }
            Some(c) if c.kind == NodeKind::Mapping => {
                if c.awaiting_value {
                    " ".to_owned()
                } else if c.inline_first && c.items == 0 {
                    String::new()
                } else {
                    self.line_prefix(c.indent)
                }
            }
            Some(c) => {
                let mut s = if c.inline_first && c.items == 0 {
                    String::new()
                } else {
                    self.line_prefix(c.indent)
                };
                s.push_str("- ");
                s
            }
        }
    }

    fn check_node(&self, kind: EventKind) -> Result<(), EmitError> {
        if self.containers.is_empty() && self.state != State::DocumentContent {
            return Err(EmitError::UnexpectedEvent(kind));
        }
        Ok(())
    }

    fn in_flow(&self) -> bool {
        self.containers.last().map_or(false, |c| c.flow)
    }

    /// The next node lands in the key position of a block mapping.
    fn at_block_key(&self) -> bool {
        matches!(
            self.containers.last(),
            Some(c) if !c.flow && c.kind == NodeKind::Mapping && !c.awaiting_value
        )
    }

    fn prepare(&self, event: &Event, text: &mut String) -> Result<Commit, Error> {
        match &event.data {
            EventData::StreamStart { .. } => {
                if self.state != State::StreamStart {
                    return Err(EmitError::UnexpectedEvent(EventKind::StreamStart).into());
                }
                Ok(Commit {
                    state: Some(State::DocumentStart),
                    ..Default::default()
                })
            }
            EventData::StreamEnd => {
                if self.state != State::DocumentStart {
                    return Err(EmitError::UnexpectedEvent(EventKind::StreamEnd).into());
                }
                Ok(Commit {
                    state: Some(State::End),
                    ..Default::default()
                })
            }
            EventData::DocumentStart { version, implicit } => {
                if self.state != State::DocumentStart {
                    return Err(EmitError::UnexpectedEvent(EventKind::DocumentStart).into());
                }
                if let Some(version) = version {
                    text.push_str("%YAML ");
                    text.push_str(&version.to_string());
                    text.push('\n');
                }
                if !implicit || version.is_some() || self.documents > 0 {
                    text.push_str("---");
                }
                Ok(Commit {
                    state: Some(State::DocumentContent),
                    document: true,
                    ..Default::default()
                })
            }
            EventData::DocumentEnd { implicit } => {
                if self.state != State::DocumentEnd {
                    return Err(EmitError::UnexpectedEvent(EventKind::DocumentEnd).into());
                }
                if self.line_dirty {
                    text.push('\n');
                }
                if !implicit {
                    text.push_str("...\n");
                }
                Ok(Commit {
                    state: Some(State::DocumentStart),
                    ..Default::default()
                })
            }
            EventData::Alias { anchor } => {
                self.check_node(EventKind::Alias)?;
                let anchor = anchor.as_deref().ok_or(EmitError::MissingAnchor)?;
                text.push_str(&self.inline_prefix());
                text.push('*');
                text.push_str(anchor);
                if self.at_block_key() {
                    // The alias scan runs to the next blank, so the ':'
                    // needs a separating space.
                    text.push_str(" :");
                }
                Ok(Commit {
                    complete: true,
                    ..Default::default()
                })
            }
            EventData::Scalar {
                anchor,
                tag,
                value,
                style,
                ..
            } => self.prepare_scalar(anchor, tag, value, *style, text),
            EventData::SequenceStart {
                anchor,
                tag,
                style,
                ..
            } => self.prepare_collection_start(
                EventKind::SequenceStart,
                NodeKind::Sequence,
                anchor,
                tag,
                *style,
                text,
            ),
            EventData::SequenceEnd => self.prepare_collection_end(
                NodeKind::Sequence,
                EmitError::MismatchedSequenceEnd,
                text,
            ),
            EventData::MappingStart {
                anchor,
                tag,
                style,
                ..
            } => self.prepare_collection_start(
                EventKind::MappingStart,
                NodeKind::Mapping,
                anchor,
                tag,
                *style,
                text,
            ),
            EventData::MappingEnd => {
                self.prepare_collection_end(NodeKind::Mapping, EmitError::MismatchedMappingEnd, text)
            }
        }
    }

    fn prepare_scalar(
        &self,
        anchor: &Option<String>,
        tag: &Option<String>,
        value: &str,
        requested: ScalarStyle,
        text: &mut String,
    ) -> Result<Commit, Error> {
        self.check_node(EventKind::Scalar)?;
        let key = self.at_block_key();
        let in_flow = self.in_flow();
        let flags = analyze_scalar(value, in_flow || key);
        let style = resolve_scalar_style(requested, flags, !in_flow && !key);
        text.push_str(&self.inline_prefix());
        if push_properties(text, anchor, tag) {
            text.push(' ');
        }
        let indent = match self.containers.last() {
            Some(c) => c.indent + 2,
            None => 2,
        };
        match style {
            ScalarStyle::Plain => text.push_str(value),
            ScalarStyle::SingleQuoted => push_single_quoted(text, value),
            ScalarStyle::DoubleQuoted => push_double_quoted(text, value),
            ScalarStyle::Literal => push_block_scalar(text, value, true, indent),
            ScalarStyle::Folded => push_block_scalar(text, value, false, indent),
            ScalarStyle::Any => panic!("inconsistent emitter state"),
        }
        if key {
            text.push(':');
        }
        Ok(Commit {
            complete: true,
            ..Default::default()
        })
    }

    fn prepare_collection_start(
        &self,
        event_kind: EventKind,
        kind: NodeKind,
        anchor: &Option<String>,
        tag: &Option<String>,
        style: CollectionStyle,
        text: &mut String,
    ) -> Result<Commit, Error> {
        self.check_node(event_kind)?;
        let key = self.at_block_key();
        // Containers in a flow context or in a key position stay on one
        // line, whatever style was asked for.
        let flow = self.in_flow() || key || style == CollectionStyle::Flow;
        let parent = self.containers.last();
        let indent = match parent {
            Some(c) => c.indent + 2,
            None => 0,
        };
        let mut inline_first = false;
        let empty_sep;
        if flow {
            text.push_str(&self.inline_prefix());
            if push_properties(text, anchor, tag) {
                text.push(' ');
            }
            text.push(if kind == NodeKind::Sequence { '[' } else { '{' });
            empty_sep = String::new();
        } else {
            let in_block_sequence =
                matches!(parent, Some(c) if !c.flow && c.kind == NodeKind::Sequence);
            if in_block_sequence {
                text.push_str(&self.inline_prefix());
            }
            let had_props = if anchor.is_some() || tag.is_some() {
                if !in_block_sequence {
                    text.push_str(&self.inline_prefix());
                }
                push_properties(text, anchor, tag)
            } else {
                false
            };
            inline_first = in_block_sequence && !had_props;
            empty_sep = if text.ends_with(' ') {
                String::new()
            } else if !text.is_empty() || parent.is_some() {
                " ".to_owned()
            } else if self.line_dirty {
                " ".to_owned()
            } else {
                String::new()
            };
        }
        Ok(Commit {
            push: Some(OpenContainer {
                kind,
                flow,
                indent,
                items: 0,
                awaiting_value: false,
                is_key: key,
                inline_first,
                empty_sep,
            }),
            ..Default::default()
        })
    }

    fn prepare_collection_end(
        &self,
        kind: NodeKind,
        mismatch: EmitError,
        text: &mut String,
    ) -> Result<Commit, Error> {
        let Some(c) = self.containers.last() else {
            return Err(mismatch.into());
        };
        if c.kind != kind {
            return Err(mismatch.into());
        }
        if c.flow {
            text.push(if kind == NodeKind::Sequence { ']' } else { '}' });
        } else if c.items == 0 {
            text.push_str(&c.empty_sep);
            text.push_str(if kind == NodeKind::Sequence { "[]" } else { "{}" });
        }
        if c.is_key {
            text.push(':');
        }
        Ok(Commit {
            pop: true,
            complete: true,
            ..Default::default()
        })
    }
}

impl<W: Write> Drop for Emitter<W> {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CollectionParams, Encoding, ScalarParams};

    fn scalar(value: &str) -> Event {
        Event::scalar(ScalarParams {
            value: Some(value.into()),
            ..Default::default()
        })
        .unwrap()
    }

    fn styled(value: &str, style: ScalarStyle) -> Event {
        Event::scalar(ScalarParams {
            value: Some(value.into()),
            style,
            ..Default::default()
        })
        .unwrap()
    }

    fn collection(style: CollectionStyle) -> CollectionParams<'static> {
        CollectionParams {
            style,
            ..Default::default()
        }
    }

    /// Wraps `body` in an implicit document and emits the whole stream.
    #[track_caller]
    fn emit_document(body: Vec<Event>) -> String {
        let mut events = vec![
            Event::stream_start(Encoding::Utf8),
            Event::document_start(None, true).unwrap(),
        ];
        events.extend(body);
        events.push(Event::document_end(true));
        events.push(Event::stream_end());
        emit_stream(events)
    }

    #[track_caller]
    fn emit_stream(events: Vec<Event>) -> String {
        let mut out = Vec::new();
        {
            let mut emitter = Emitter::new(&mut out);
            for event in events {
                emitter.emit_event(event).expect("emit error");
            }
        }
        String::from_utf8(out).expect("emitted invalid utf-8")
    }

    #[test]
    fn block_mapping_output() {
        let text = emit_document(vec![
            Event::mapping_start(collection(CollectionStyle::Any)).unwrap(),
            scalar("a"),
            scalar("1"),
            scalar("b"),
            scalar("2"),
            Event::mapping_end(),
        ]);
        assert_eq!(text, "a: 1\nb: 2\n");
    }

    #[test]
    fn nested_block_sequence() {
        let text = emit_document(vec![
            Event::mapping_start(collection(CollectionStyle::Any)).unwrap(),
            scalar("a"),
            Event::sequence_start(collection(CollectionStyle::Any)).unwrap(),
            scalar("x"),
            scalar("y"),
            Event::sequence_end(),
            Event::mapping_end(),
        ]);
        assert_eq!(text, "a:\n  - x\n  - y\n");
    }

    #[test]
    fn compact_sequence_entries() {
        let text = emit_document(vec![
            Event::sequence_start(collection(CollectionStyle::Any)).unwrap(),
            Event::mapping_start(collection(CollectionStyle::Any)).unwrap(),
            scalar("k"),
            scalar("v"),
            Event::mapping_end(),
            Event::sequence_end(),
        ]);
        assert_eq!(text, "- k: v\n");
    }

    #[test]
    fn flow_sequence_output() {
        let text = emit_document(vec![
            Event::sequence_start(collection(CollectionStyle::Flow)).unwrap(),
            scalar("1"),
            scalar("2"),
            scalar("3"),
            Event::sequence_end(),
        ]);
        assert_eq!(text, "[1, 2, 3]\n");
    }

    #[test]
    fn flow_mapping_output() {
        let text = emit_document(vec![
            Event::mapping_start(collection(CollectionStyle::Flow)).unwrap(),
            scalar("a"),
            scalar("1"),
            scalar("b"),
            scalar("2"),
            Event::mapping_end(),
        ]);
        assert_eq!(text, "{a: 1, b: 2}\n");
    }

    #[test]
    fn explicit_document() {
        let text = emit_stream(vec![
            Event::stream_start(Encoding::Utf8),
            Event::document_start(Some("1.1"), false).unwrap(),
            scalar("hello"),
            Event::document_end(false),
            Event::stream_end(),
        ]);
        assert_eq!(text, "%YAML 1.1\n--- hello\n...\n");
    }

    #[test]
    fn later_documents_get_a_marker() {
        let text = emit_stream(vec![
            Event::stream_start(Encoding::Utf8),
            Event::document_start(None, true).unwrap(),
            Event::mapping_start(collection(CollectionStyle::Any)).unwrap(),
            scalar("a"),
            scalar("1"),
            Event::mapping_end(),
            Event::document_end(true),
            Event::document_start(None, true).unwrap(),
            Event::mapping_start(collection(CollectionStyle::Any)).unwrap(),
            scalar("b"),
            scalar("2"),
            Event::mapping_end(),
            Event::document_end(true),
            Event::stream_end(),
        ]);
        assert_eq!(text, "a: 1\n---\nb: 2\n");
    }

    #[test]
    fn values_that_need_quoting() {
        let text = emit_document(vec![
            Event::mapping_start(collection(CollectionStyle::Any)).unwrap(),
            scalar("k"),
            scalar("a: b"),
            scalar("lines"),
            scalar("l1\nl2"),
            Event::mapping_end(),
        ]);
        assert_eq!(text, "k: 'a: b'\nlines: \"l1\\nl2\"\n");
    }

    #[test]
    fn literal_block_scalar() {
        let text = emit_document(vec![
            Event::mapping_start(collection(CollectionStyle::Any)).unwrap(),
            scalar("a"),
            styled("line1\nline2\n", ScalarStyle::Literal),
            Event::mapping_end(),
        ]);
        assert_eq!(text, "a: |\n  line1\n  line2\n");
    }

    #[test]
    fn folded_block_scalar() {
        let text = emit_document(vec![
            Event::mapping_start(collection(CollectionStyle::Any)).unwrap(),
            scalar("a"),
            styled("one\ntwo", ScalarStyle::Folded),
            Event::mapping_end(),
        ]);
        assert_eq!(text, "a: >-\n  one\n\n  two\n");
    }

    #[test]
    fn empty_containers_close_inline() {
        let text = emit_document(vec![
            Event::mapping_start(collection(CollectionStyle::Any)).unwrap(),
            scalar("a"),
            Event::sequence_start(collection(CollectionStyle::Flow)).unwrap(),
            Event::sequence_end(),
            scalar("b"),
            Event::mapping_start(collection(CollectionStyle::Any)).unwrap(),
            Event::mapping_end(),
            Event::mapping_end(),
        ]);
        assert_eq!(text, "a: []\nb: {}\n");
    }

    #[test]
    fn anchors_and_tags() {
        let text = emit_document(vec![
            Event::mapping_start(collection(CollectionStyle::Any)).unwrap(),
            scalar("a"),
            Event::scalar(ScalarParams {
                anchor: Some("x"),
                tag: Some("!!int"),
                value: Some("1".into()),
                ..Default::default()
            })
            .unwrap(),
            scalar("b"),
            Event::alias(Some("x")).unwrap(),
            Event::mapping_end(),
        ]);
        assert_eq!(text, "a: &x !!int 1\nb: *x\n");
    }

    #[test]
    fn mismatched_end_keeps_the_stack() {
        let mut out = Vec::new();
        {
            let mut emitter = Emitter::new(&mut out);
            emitter.emit_event(Event::stream_start(Encoding::Utf8)).unwrap();
            emitter
                .emit_event(Event::document_start(None, true).unwrap())
                .unwrap();
            emitter
                .emit_event(Event::sequence_start(collection(CollectionStyle::Any)).unwrap())
                .unwrap();

            let err = emitter.emit_event(Event::mapping_end()).unwrap_err();
            assert_eq!(err, EmitError::MismatchedMappingEnd);

            // The open sequence is still there.
            emitter.emit_event(scalar("x")).unwrap();
            emitter.emit_event(Event::sequence_end()).unwrap();
            emitter.emit_event(Event::document_end(true)).unwrap();
            emitter.emit_event(Event::stream_end()).unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), "- x\n");
    }

    #[test]
    fn events_outside_a_document_are_rejected() {
        let mut emitter = Emitter::new(Vec::new());
        let err = emitter.emit_event(scalar("x")).unwrap_err();
        assert_eq!(err, EmitError::UnexpectedEvent(EventKind::Scalar));

        emitter.emit_event(Event::stream_start(Encoding::Utf8)).unwrap();
        let err = emitter
            .emit_event(Event::stream_start(Encoding::Utf8))
            .unwrap_err();
        assert_eq!(err, EmitError::UnexpectedEvent(EventKind::StreamStart));
    }

    #[test]
    fn uninitialized_slot_is_rejected() {
        let mut emitter = Emitter::new(Vec::new());
        let mut slot = EventSlot::new();
        let err = emitter.emit(&mut slot).unwrap_err();
        assert_eq!(err, EmitError::UninitializedEvent);
    }

    #[test]
    fn slot_is_consumed_even_on_failure() {
        let mut emitter = Emitter::new(Vec::new());
        let mut slot = EventSlot::new();
        slot.scalar(ScalarParams {
            value: Some("early".into()),
            ..Default::default()
        })
        .unwrap();

        // Scalar before STREAM-START: the event is taken regardless.
        let err = emitter.emit(&mut slot).unwrap_err();
        assert_eq!(err, EmitError::UnexpectedEvent(EventKind::Scalar));
        assert!(!slot.is_initialized());

        let err = emitter.emit(&mut slot).unwrap_err();
        assert_eq!(err, EmitError::UninitializedEvent);
    }

    #[test]
    fn empty_scalars_are_quoted() {
        let text = emit_document(vec![
            Event::mapping_start(collection(CollectionStyle::Any)).unwrap(),
            scalar("a"),
            scalar(""),
            Event::mapping_end(),
        ]);
        assert_eq!(text, "a: ''\n");
    }

    #[test]
    fn crlf_break_translation() {
        let mut out = Vec::new();
        {
            let mut emitter = Emitter::new(&mut out).with_break(Break::CrLf);
            emitter.emit_event(Event::stream_start(Encoding::Utf8)).unwrap();
            emitter
                .emit_event(Event::document_start(None, true).unwrap())
                .unwrap();
            emitter
                .emit_event(Event::mapping_start(collection(CollectionStyle::Any)).unwrap())
                .unwrap();
            emitter.emit_event(scalar("a")).unwrap();
            emitter.emit_event(scalar("1")).unwrap();
            emitter.emit_event(Event::mapping_end()).unwrap();
            emitter.emit_event(Event::document_end(true)).unwrap();
            emitter.emit_event(Event::stream_end()).unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), "a: 1\r\n");
    }
}
