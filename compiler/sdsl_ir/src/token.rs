//! Token types for the SDSL lexer.
//!
//! Tokens are produced from *preprocessed* text; their spans index into that
//! text and are mapped back to original files through the unit's text links.

use std::fmt;

use bitflags::bitflags;

use crate::{Name, Span};

/// A token with its span in the processed text.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[inline]
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, span }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {}", self.kind, self.span)
    }
}

/// Token kinds for SDSL.
///
/// Float literals store bits as u64 for Hash compatibility.
/// Builtin type names (`float4`, `Texture2D`, ...) are plain identifiers;
/// the parser and resolver recognize them.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TokenKind {
    /// Signed integer literal: `42`, `0x1F`
    Int(u64),
    /// Unsigned integer literal: `42u`
    UInt(u64),
    /// Float literal: `1.0`, `.5f`, `2e-3` (stored as bits)
    Float(u64),
    /// String literal (interned, without quotes)
    Str(Name),
    /// Identifier (interned)
    Ident(Name),

    // Declaration keywords
    Shader,
    Effect,
    Mixin,
    Compose,
    Macro,
    Struct,
    CBuffer,
    RGroup,

    // Modifiers
    Stage,
    Stream,
    Static,
    Const,
    Override,
    Abstract,
    Clone,
    In,
    Out,
    InOut,

    // Statements
    If,
    Else,
    For,
    While,
    Do,
    Return,
    Break,
    Continue,
    Discard,

    // Expression keywords
    True,
    False,
    Base,
    Streams,
    This,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Dot,
    Colon,
    Question,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    Eq,
    EqEq,
    BangEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Shl,
    Shr,
    AmpAmp,
    PipePipe,
    PlusPlus,
    MinusMinus,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    AmpEq,
    PipeEq,
    CaretEq,
    ShlEq,
    ShrEq,

    /// Lexer error placeholder; the diagnostic is already recorded.
    Error,
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Look up a keyword by its source spelling.
    pub fn keyword(text: &str) -> Option<TokenKind> {
        let kind = match text {
            "shader" => TokenKind::Shader,
            "effect" => TokenKind::Effect,
            "mixin" => TokenKind::Mixin,
            "compose" => TokenKind::Compose,
            "macro" => TokenKind::Macro,
            "struct" => TokenKind::Struct,
            "cbuffer" => TokenKind::CBuffer,
            "rgroup" => TokenKind::RGroup,
            "stage" => TokenKind::Stage,
            "stream" => TokenKind::Stream,
            "static" => TokenKind::Static,
            "const" => TokenKind::Const,
            "override" => TokenKind::Override,
            "abstract" => TokenKind::Abstract,
            "clone" => TokenKind::Clone,
            "in" => TokenKind::In,
            "out" => TokenKind::Out,
            "inout" => TokenKind::InOut,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "discard" => TokenKind::Discard,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "base" => TokenKind::Base,
            "streams" => TokenKind::Streams,
            "this" => TokenKind::This,
            _ => return None,
        };
        Some(kind)
    }

    /// Source spelling of a keyword token; `None` for anything else.
    pub fn keyword_text(self) -> Option<&'static str> {
        let text = self.display_name().strip_prefix('`')?.strip_suffix('`')?;
        (TokenKind::keyword(text) == Some(self)).then_some(text)
    }

    /// Whether this token is a member/variable modifier keyword.
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            TokenKind::Stage
                | TokenKind::Stream
                | TokenKind::Static
                | TokenKind::Const
                | TokenKind::Override
                | TokenKind::Abstract
                | TokenKind::Clone
                | TokenKind::In
                | TokenKind::Out
                | TokenKind::InOut
        )
    }

    /// Human-readable name used in "expected X, found Y" messages.
    pub fn display_name(self) -> &'static str {
        match self {
            TokenKind::Int(_) | TokenKind::UInt(_) => "integer literal",
            TokenKind::Float(_) => "float literal",
            TokenKind::Str(_) => "string literal",
            TokenKind::Ident(_) => "identifier",
            TokenKind::Shader => "`shader`",
            TokenKind::Effect => "`effect`",
            TokenKind::Mixin => "`mixin`",
            TokenKind::Compose => "`compose`",
            TokenKind::Macro => "`macro`",
            TokenKind::Struct => "`struct`",
            TokenKind::CBuffer => "`cbuffer`",
            TokenKind::RGroup => "`rgroup`",
            TokenKind::Stage => "`stage`",
            TokenKind::Stream => "`stream`",
            TokenKind::Static => "`static`",
            TokenKind::Const => "`const`",
            TokenKind::Override => "`override`",
            TokenKind::Abstract => "`abstract`",
            TokenKind::Clone => "`clone`",
            TokenKind::In => "`in`",
            TokenKind::Out => "`out`",
            TokenKind::InOut => "`inout`",
            TokenKind::If => "`if`",
            TokenKind::Else => "`else`",
            TokenKind::For => "`for`",
            TokenKind::While => "`while`",
            TokenKind::Do => "`do`",
            TokenKind::Return => "`return`",
            TokenKind::Break => "`break`",
            TokenKind::Continue => "`continue`",
            TokenKind::Discard => "`discard`",
            TokenKind::True => "`true`",
            TokenKind::False => "`false`",
            TokenKind::Base => "`base`",
            TokenKind::Streams => "`streams`",
            TokenKind::This => "`this`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::Semi => "`;`",
            TokenKind::Comma => "`,`",
            TokenKind::Dot => "`.`",
            TokenKind::Colon => "`:`",
            TokenKind::Question => "`?`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Percent => "`%`",
            TokenKind::Amp => "`&`",
            TokenKind::Pipe => "`|`",
            TokenKind::Caret => "`^`",
            TokenKind::Tilde => "`~`",
            TokenKind::Bang => "`!`",
            TokenKind::Eq => "`=`",
            TokenKind::EqEq => "`==`",
            TokenKind::BangEq => "`!=`",
            TokenKind::Lt => "`<`",
            TokenKind::Gt => "`>`",
            TokenKind::LtEq => "`<=`",
            TokenKind::GtEq => "`>=`",
            TokenKind::Shl => "`<<`",
            TokenKind::Shr => "`>>`",
            TokenKind::AmpAmp => "`&&`",
            TokenKind::PipePipe => "`||`",
            TokenKind::PlusPlus => "`++`",
            TokenKind::MinusMinus => "`--`",
            TokenKind::PlusEq => "`+=`",
            TokenKind::MinusEq => "`-=`",
            TokenKind::StarEq => "`*=`",
            TokenKind::SlashEq => "`/=`",
            TokenKind::PercentEq => "`%=`",
            TokenKind::AmpEq => "`&=`",
            TokenKind::PipeEq => "`|=`",
            TokenKind::CaretEq => "`^=`",
            TokenKind::ShlEq => "`<<=`",
            TokenKind::ShrEq => "`>>=`",
            TokenKind::Error => "invalid token",
            TokenKind::Eof => "end of file",
        }
    }
}

bitflags! {
    /// Per-token layout context.
    ///
    /// The parser never needs trivia tokens; these bits keep the little
    /// layout information that diagnostics and the preprocessor care about.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TokenFlags: u8 {
        /// Whitespace preceded this token.
        const SPACE_BEFORE = 1 << 0;
        /// Token is the first token on its line.
        const LINE_START = 1 << 1;
    }
}

/// Lexer output: tokens plus a parallel flag array.
///
/// The last token is always `Eof`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenList {
    tokens: Vec<Token>,
    flags: Vec<TokenFlags>,
}

impl TokenList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        TokenList {
            tokens: Vec::with_capacity(capacity),
            flags: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, token: Token, flags: TokenFlags) {
        self.tokens.push(token);
        self.flags.push(flags);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    #[inline]
    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    #[inline]
    pub fn flag(&self, index: usize) -> TokenFlags {
        self.flags.get(index).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }
}

impl fmt::Debug for TokenList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.tokens).finish()
    }
}

#[cfg(target_pointer_width = "64")]
mod size_asserts {
    use super::Token;
    crate::static_assert_size!(Token, 24);
}
