use std::fmt::Display;
use std::str::FromStr;

use crate::{CharExt, CollectionStyle, Encoding, Mark, ScalarStyle, ScalarValue, Span};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// A field accessor was called on an event kind that does not define
    /// the field.
    #[error("{field} is not defined for {kind} events")]
    InvalidField {
        kind: EventKind,
        field: &'static str,
    },
    #[error("bad version string: {0:?}")]
    BadVersion(String),
    #[error("bad anchor: {0:?}")]
    BadAnchor(String),
    #[error("bad tag: {0:?}")]
    BadTag(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    StreamStart,
    StreamEnd,
    DocumentStart,
    DocumentEnd,
    Alias,
    Scalar,
    SequenceStart,
    SequenceEnd,
    MappingStart,
    MappingEnd,
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EventKind::StreamStart => "STREAM-START",
            EventKind::StreamEnd => "STREAM-END",
            EventKind::DocumentStart => "DOCUMENT-START",
            EventKind::DocumentEnd => "DOCUMENT-END",
            EventKind::Alias => "ALIAS",
            EventKind::Scalar => "SCALAR",
            EventKind::SequenceStart => "SEQUENCE-START",
            EventKind::SequenceEnd => "SEQUENCE-END",
            EventKind::MappingStart => "MAPPING-START",
            EventKind::MappingEnd => "MAPPING-END",
        })
    }
}

/// A `%YAML <major>.<minor>` directive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VersionDirective {
    pub major: u32,
    pub minor: u32,
}

impl FromStr for VersionDirective {
    type Err = EventError;

    /// Accepts exactly `<digits>.<digits>` and nothing else.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || EventError::BadVersion(s.to_owned());
        let (major, minor) = s.split_once('.').ok_or_else(bad)?;
        let parse = |part: &str| -> Result<u32, EventError> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(bad());
            }
            part.parse().map_err(|_| bad())
        };
        Ok(VersionDirective {
            major: parse(major)?,
            minor: parse(minor)?,
        })
    }
}

impl Display for VersionDirective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum EventData {
    StreamStart {
        encoding: Encoding,
    },
    StreamEnd,
    DocumentStart {
        version: Option<VersionDirective>,
        implicit: bool,
    },
    DocumentEnd {
        implicit: bool,
    },
    Alias {
        anchor: Option<String>,
    },
    Scalar {
        anchor: Option<String>,
        tag: Option<String>,
        value: String,
        plain_implicit: bool,
        quoted_implicit: bool,
        style: ScalarStyle,
    },
    SequenceStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        style: CollectionStyle,
    },
    SequenceEnd,
    MappingStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        style: CollectionStyle,
    },
    MappingEnd,
}

/// One parsing or emission event.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub(crate) data: EventData,
    pub(crate) span: Span,
}

/// Parameters for a SCALAR event. All fields default to the permissive
/// choice: no properties, empty value, implicit resolution, `Any` style.
#[derive(Debug)]
pub struct ScalarParams<'a> {
    pub anchor: Option<&'a str>,
    pub tag: Option<&'a str>,
    pub value: Option<ScalarValue<'a>>,
    pub plain_implicit: bool,
    pub quoted_implicit: bool,
    pub style: ScalarStyle,
}

impl Default for ScalarParams<'_> {
    fn default() -> Self {
        ScalarParams {
            anchor: None,
            tag: None,
            value: None,
            plain_implicit: true,
            quoted_implicit: true,
            style: ScalarStyle::Any,
        }
    }
}

/// Parameters for a SEQUENCE-START or MAPPING-START event.
#[derive(Debug)]
pub struct CollectionParams<'a> {
    pub anchor: Option<&'a str>,
    pub tag: Option<&'a str>,
    pub implicit: bool,
    pub style: CollectionStyle,
}

impl Default for CollectionParams<'_> {
    fn default() -> Self {
        CollectionParams {
            anchor: None,
            tag: None,
            implicit: true,
            style: CollectionStyle::Any,
        }
    }
}

fn validate_anchor(anchor: &str) -> Result<String, EventError> {
    if anchor.is_empty() || !anchor.chars().all(CharExt::is_anchor_char) {
        return Err(EventError::BadAnchor(anchor.to_owned()));
    }
    Ok(anchor.to_owned())
}

fn validate_tag(tag: &str) -> Result<String, EventError> {
    if tag.is_empty() {
        return Err(EventError::BadTag(tag.to_owned()));
    }
    Ok(tag.to_owned())
}

fn node_properties(
    anchor: Option<&str>,
    tag: Option<&str>,
) -> Result<(Option<String>, Option<String>), EventError> {
    let anchor = anchor.map(validate_anchor).transpose()?;
    let tag = tag.map(validate_tag).transpose()?;
    Ok((anchor, tag))
}

impl Event {
    pub(crate) fn new(data: EventData, span: Span) -> Self {
        Event { data, span }
    }

    pub fn stream_start(encoding: Encoding) -> Self {
        Event::new(EventData::StreamStart { encoding }, Span::default())
    }

    pub fn stream_end() -> Self {
        Event::new(EventData::StreamEnd, Span::default())
    }

    /// `version` is the raw directive text, e.g. `"1.1"`; it is validated
    /// here, not at emission time.
    pub fn document_start(version: Option<&str>, implicit: bool) -> Result<Self, EventError> {
        let version = version.map(VersionDirective::from_str).transpose()?;
        Ok(Event::new(
            EventData::DocumentStart { version, implicit },
            Span::default(),
        ))
    }

    pub fn document_end(implicit: bool) -> Self {
        Event::new(EventData::DocumentEnd { implicit }, Span::default())
    }

    /// The anchor may be omitted at construction; emitting an anchorless
    /// alias is an error.
    pub fn alias(anchor: Option<&str>) -> Result<Self, EventError> {
        let anchor = anchor.map(validate_anchor).transpose()?;
        Ok(Event::new(EventData::Alias { anchor }, Span::default()))
    }

    pub fn scalar(params: ScalarParams<'_>) -> Result<Self, EventError> {
        let (anchor, tag) = node_properties(params.anchor, params.tag)?;
        let value = params.value.map(ScalarValue::into_text).unwrap_or_default();
        Ok(Event::new(
            EventData::Scalar {
                anchor,
                tag,
                value,
                plain_implicit: params.plain_implicit,
                quoted_implicit: params.quoted_implicit,
                style: params.style,
            },
            Span::default(),
        ))
    }

    pub fn sequence_start(params: CollectionParams<'_>) -> Result<Self, EventError> {
        let (anchor, tag) = node_properties(params.anchor, params.tag)?;
        Ok(Event::new(
            EventData::SequenceStart {
                anchor,
                tag,
                implicit: params.implicit,
                style: params.style,
            },
            Span::default(),
        ))
    }

    pub fn sequence_end() -> Self {
        Event::new(EventData::SequenceEnd, Span::default())
    }

    pub fn mapping_start(params: CollectionParams<'_>) -> Result<Self, EventError> {
        let (anchor, tag) = node_properties(params.anchor, params.tag)?;
        Ok(Event::new(
            EventData::MappingStart {
                anchor,
                tag,
                implicit: params.implicit,
                style: params.style,
            },
            Span::default(),
        ))
    }

    pub fn mapping_end() -> Self {
        Event::new(EventData::MappingEnd, Span::default())
    }

    pub fn kind(&self) -> EventKind {
        match self.data {
            EventData::StreamStart { .. } => EventKind::StreamStart,
            EventData::StreamEnd => EventKind::StreamEnd,
            EventData::DocumentStart { .. } => EventKind::DocumentStart,
            EventData::DocumentEnd { .. } => EventKind::DocumentEnd,
            EventData::Alias { .. } => EventKind::Alias,
            EventData::Scalar { .. } => EventKind::Scalar,
            EventData::SequenceStart { .. } => EventKind::SequenceStart,
            EventData::SequenceEnd => EventKind::SequenceEnd,
            EventData::MappingStart { .. } => EventKind::MappingStart,
            EventData::MappingEnd => EventKind::MappingEnd,
        }
    }

    #[inline]
    pub fn span(&self) -> Span {
        self.span
    }

    #[inline]
    pub fn start_mark(&self) -> Mark {
        self.span.start
    }

    #[inline]
    pub fn end_mark(&self) -> Mark {
        self.span.end
    }

    fn invalid(&self, field: &'static str) -> EventError {
        EventError::InvalidField {
            kind: self.kind(),
            field,
        }
    }

    pub fn encoding(&self) -> Result<Encoding, EventError> {
        match self.data {
            EventData::StreamStart { encoding } => Ok(encoding),
            _ => Err(self.invalid("encoding")),
        }
    }

    pub fn version(&self) -> Result<Option<VersionDirective>, EventError> {
        match self.data {
            EventData::DocumentStart { version, .. } => Ok(version),
            _ => Err(self.invalid("version")),
        }
    }

    pub fn implicit(&self) -> Result<bool, EventError> {
        match self.data {
            EventData::DocumentStart { implicit, .. }
            | EventData::DocumentEnd { implicit }
            | EventData::SequenceStart { implicit, .. }
            | EventData::MappingStart { implicit, .. } => Ok(implicit),
            _ => Err(self.invalid("implicit")),
        }
    }

    pub fn anchor(&self) -> Result<Option<&str>, EventError> {
        match &self.data {
            EventData::Alias { anchor }
            | EventData::Scalar { anchor, .. }
            | EventData::SequenceStart { anchor, .. }
            | EventData::MappingStart { anchor, .. } => Ok(anchor.as_deref()),
            _ => Err(self.invalid("anchor")),
        }
    }

    pub fn tag(&self) -> Result<Option<&str>, EventError> {
        match &self.data {
            EventData::Scalar { tag, .. }
            | EventData::SequenceStart { tag, .. }
            | EventData::MappingStart { tag, .. } => Ok(tag.as_deref()),
            _ => Err(self.invalid("tag")),
        }
    }

    pub fn value(&self) -> Result<&str, EventError> {
        match &self.data {
            EventData::Scalar { value, .. } => Ok(value),
            _ => Err(self.invalid("value")),
        }
    }

    /// Byte length of the scalar text.
    pub fn length(&self) -> Result<usize, EventError> {
        self.value().map(str::len)
    }

    pub fn plain_implicit(&self) -> Result<bool, EventError> {
        match self.data {
            EventData::Scalar { plain_implicit, .. } => Ok(plain_implicit),
            _ => Err(self.invalid("plain_implicit")),
        }
    }

    pub fn quoted_implicit(&self) -> Result<bool, EventError> {
        match self.data {
            EventData::Scalar { quoted_implicit, .. } => Ok(quoted_implicit),
            _ => Err(self.invalid("quoted_implicit")),
        }
    }

    pub fn scalar_style(&self) -> Result<ScalarStyle, EventError> {
        match self.data {
            EventData::Scalar { style, .. } => Ok(style),
            _ => Err(self.invalid("scalar_style")),
        }
    }

    pub fn collection_style(&self) -> Result<CollectionStyle, EventError> {
        match self.data {
            EventData::SequenceStart { style, .. } | EventData::MappingStart { style, .. } => {
                Ok(style)
            }
            _ => Err(self.invalid("collection_style")),
        }
    }
}

/// A reusable event cell.
///
/// Constructors always reinitialize: the slot is cleared before the new
/// event is built, so a previously held event is dropped exactly once. On
/// constructor failure the slot is left uninitialized.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventSlot {
    event: Option<Event>,
}

impl EventSlot {
    pub fn new() -> Self {
        EventSlot::default()
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.event.is_some()
    }

    #[inline]
    pub fn get(&self) -> Option<&Event> {
        self.event.as_ref()
    }

    #[inline]
    pub fn set(&mut self, event: Event) {
        self.event = Some(event);
    }

    #[inline]
    pub fn take(&mut self) -> Option<Event> {
        self.event.take()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.event = None;
    }

    pub fn stream_start(&mut self, encoding: Encoding) {
        self.event = Some(Event::stream_start(encoding));
    }

    pub fn stream_end(&mut self) {
        self.event = Some(Event::stream_end());
    }

    pub fn document_start(
        &mut self,
        version: Option<&str>,
        implicit: bool,
    ) -> Result<(), EventError> {
        self.event = None;
        self.event = Some(Event::document_start(version, implicit)?);
        Ok(())
    }

    pub fn document_end(&mut self, implicit: bool) {
        self.event = Some(Event::document_end(implicit));
    }

    pub fn alias(&mut self, anchor: Option<&str>) -> Result<(), EventError> {
        self.event = None;
        self.event = Some(Event::alias(anchor)?);
        Ok(())
    }

    pub fn scalar(&mut self, params: ScalarParams<'_>) -> Result<(), EventError> {
        self.event = None;
        self.event = Some(Event::scalar(params)?);
        Ok(())
    }

    pub fn sequence_start(&mut self, params: CollectionParams<'_>) -> Result<(), EventError> {
        self.event = None;
        self.event = Some(Event::sequence_start(params)?);
        Ok(())
    }

    pub fn sequence_end(&mut self) {
        self.event = Some(Event::sequence_end());
    }

    pub fn mapping_start(&mut self, params: CollectionParams<'_>) -> Result<(), EventError> {
        self.event = None;
        self.event = Some(Event::mapping_start(params)?);
        Ok(())
    }

    pub fn mapping_end(&mut self) {
        self.event = Some(Event::mapping_end());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_text_validation() {
        assert_eq!(
            "1.1".parse::<VersionDirective>(),
            Ok(VersionDirective { major: 1, minor: 1 })
        );
        assert_eq!(
            "12.34".parse::<VersionDirective>(),
            Ok(VersionDirective {
                major: 12,
                minor: 34
            })
        );
        for bad in ["1", "1.1.2", "a.b", "", ".", "1.", ".1", " 1.1", "1.1 ", "-1.1", "+1.2"] {
            assert_eq!(
                bad.parse::<VersionDirective>(),
                Err(EventError::BadVersion(bad.to_owned())),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn numeric_scalar_values() {
        let event = Event::scalar(ScalarParams {
            value: Some(ScalarValue::Int(42)),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(event.value().unwrap(), "42");
        assert_eq!(event.length().unwrap(), 2);

        let event = Event::scalar(ScalarParams {
            value: Some(ScalarValue::Complex(3.0, -2.0)),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(event.value().unwrap(), "3 - 2im");
    }

    #[test]
    fn accessors_reject_undefined_fields() {
        let event = Event::stream_end();
        assert_eq!(
            event.value(),
            Err(EventError::InvalidField {
                kind: EventKind::StreamEnd,
                field: "value"
            })
        );
        assert_eq!(
            event.anchor(),
            Err(EventError::InvalidField {
                kind: EventKind::StreamEnd,
                field: "anchor"
            })
        );

        let event = Event::scalar(ScalarParams::default()).unwrap();
        assert_eq!(event.value(), Ok(""));
        assert_eq!(event.length(), Ok(0));
        assert!(event.encoding().is_err());
        assert!(event.implicit().is_err());
    }

    #[test]
    fn slot_reinitializes() {
        let mut slot = EventSlot::new();
        assert!(!slot.is_initialized());

        slot.scalar(ScalarParams {
            value: Some("first".into()),
            ..Default::default()
        })
        .unwrap();
        assert!(slot.is_initialized());

        // Building into an initialized slot replaces the old event.
        slot.scalar(ScalarParams {
            value: Some("second".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(slot.get().unwrap().value().unwrap(), "second");

        // A failed constructor leaves the slot uninitialized.
        let err = slot.scalar(ScalarParams {
            anchor: Some("bad anchor"),
            ..Default::default()
        });
        assert_eq!(err, Err(EventError::BadAnchor("bad anchor".to_owned())));
        assert!(!slot.is_initialized());
    }

    #[test]
    fn anchor_validation() {
        assert!(Event::alias(Some("ok-anchor_1")).is_ok());
        assert!(Event::alias(None).is_ok());
        for bad in ["", "has space", "flow,comma", "bracket]", "line\nbreak"] {
            assert_eq!(
                Event::alias(Some(bad)).unwrap_err(),
                EventError::BadAnchor(bad.to_owned())
            );
        }
    }
}
