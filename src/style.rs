use std::fmt::Display;

/// Character encoding of a stream, reported by STREAM-START.
///
/// The scanner reads UTF-8; the UTF-16 variants exist for API completeness
/// and are never produced by this crate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Encoding {
    #[default]
    Any,
    Utf8,
    Utf16Le,
    Utf16Be,
}

/// Line break convention used by the emitter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Break {
    #[default]
    Any,
    Cr,
    Lf,
    CrLf,
}

impl Break {
    #[inline]
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Break::Any | Break::Lf => "\n",
            Break::Cr => "\r",
            Break::CrLf => "\r\n",
        }
    }
}

/// Presentation style of a scalar node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScalarStyle {
    #[default]
    Any,
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

impl ScalarStyle {
    #[inline]
    pub fn is_block(self) -> bool {
        matches!(self, ScalarStyle::Literal | ScalarStyle::Folded)
    }

    #[inline]
    pub fn is_quoted(self) -> bool {
        matches!(self, ScalarStyle::SingleQuoted | ScalarStyle::DoubleQuoted)
    }
}

/// Presentation style of a sequence or mapping node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CollectionStyle {
    #[default]
    Any,
    Block,
    Flow,
}

/// The kind of a composed node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NodeKind {
    #[default]
    None,
    Scalar,
    Sequence,
    Mapping,
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            NodeKind::None => "none",
            NodeKind::Scalar => "scalar",
            NodeKind::Sequence => "sequence",
            NodeKind::Mapping => "mapping",
        })
    }
}
