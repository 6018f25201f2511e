use std::fmt::Display;

use crate::{Encoding, ScalarStyle};

/// One lexical token of the YAML grammar.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    StreamStart(Encoding),
    StreamEnd,
    /// `%YAML <major>.<minor>`
    VersionDirective(u32, u32),
    /// `---`
    DocumentStart,
    /// `...`
    DocumentEnd,
    BlockSequenceStart,
    BlockMappingStart,
    BlockEnd,
    FlowSequenceStart,
    FlowSequenceEnd,
    FlowMappingStart,
    FlowMappingEnd,
    /// `- `
    BlockEntry,
    /// `,`
    FlowEntry,
    /// `?` or a detected simple key
    Key,
    /// `:`
    Value,
    Alias(String),
    Anchor(String),
    Tag(String),
    Scalar(String, ScalarStyle),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenType {
    StreamStart,
    StreamEnd,
    VersionDirective,
    DocumentStart,
    DocumentEnd,
    BlockSequenceStart,
    BlockMappingStart,
    BlockEnd,
    FlowSequenceStart,
    FlowSequenceEnd,
    FlowMappingStart,
    FlowMappingEnd,
    BlockEntry,
    FlowEntry,
    Key,
    Value,
    Alias,
    Anchor,
    Tag,
    Scalar,
}

impl Token {
    pub fn ty(&self) -> TokenType {
        match self {
            Token::StreamStart(_) => TokenType::StreamStart,
            Token::StreamEnd => TokenType::StreamEnd,
            Token::VersionDirective(..) => TokenType::VersionDirective,
            Token::DocumentStart => TokenType::DocumentStart,
            Token::DocumentEnd => TokenType::DocumentEnd,
            Token::BlockSequenceStart => TokenType::BlockSequenceStart,
            Token::BlockMappingStart => TokenType::BlockMappingStart,
            Token::BlockEnd => TokenType::BlockEnd,
            Token::FlowSequenceStart => TokenType::FlowSequenceStart,
            Token::FlowSequenceEnd => TokenType::FlowSequenceEnd,
            Token::FlowMappingStart => TokenType::FlowMappingStart,
            Token::FlowMappingEnd => TokenType::FlowMappingEnd,
            Token::BlockEntry => TokenType::BlockEntry,
            Token::FlowEntry => TokenType::FlowEntry,
            Token::Key => TokenType::Key,
            Token::Value => TokenType::Value,
            Token::Alias(_) => TokenType::Alias,
            Token::Anchor(_) => TokenType::Anchor,
            Token::Tag(_) => TokenType::Tag,
            Token::Scalar(..) => TokenType::Scalar,
        }
    }
}

impl Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TokenType::StreamStart => "<stream start>",
            TokenType::StreamEnd => "<stream end>",
            TokenType::VersionDirective => "<version directive>",
            TokenType::DocumentStart => "'---'",
            TokenType::DocumentEnd => "'...'",
            TokenType::BlockSequenceStart => "<block sequence start>",
            TokenType::BlockMappingStart => "<block mapping start>",
            TokenType::BlockEnd => "<block end>",
            TokenType::FlowSequenceStart => "'['",
            TokenType::FlowSequenceEnd => "']'",
            TokenType::FlowMappingStart => "'{'",
            TokenType::FlowMappingEnd => "'}'",
            TokenType::BlockEntry => "'-'",
            TokenType::FlowEntry => "','",
            TokenType::Key => "'?'",
            TokenType::Value => "':'",
            TokenType::Alias => "<alias>",
            TokenType::Anchor => "<anchor>",
            TokenType::Tag => "<tag>",
            TokenType::Scalar => "<scalar>",
        })
    }
}
