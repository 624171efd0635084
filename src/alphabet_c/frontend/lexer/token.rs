use logos::Logos;

use crate::alphabet_c::utils::Span;

/// A single lexed token. The lexeme borrows the source buffer, so tokens are
/// cheap to copy and live at most as long as the parse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    /// Slice of the source this token was scanned from. String tokens exclude
    /// the surrounding quotes.
    pub lexeme: &'src str,
    /// Decoded value for number tokens, 0.0 otherwise.
    pub literal: f64,
    /// 1-based source line.
    pub line: u32,
    pub span: Span,
}

impl<'src> Token<'src> {
    #[inline(always)]
    pub fn new(kind: TokenKind, lexeme: &'src str, literal: f64, line: u32, span: Span) -> Self {
        Self {
            kind,
            lexeme,
            literal,
            line,
            span,
        }
    }

    #[inline(always)]
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    #[inline(always)]
    pub fn start(&self) -> usize {
        self.span.start
    }

    #[inline(always)]
    pub fn end(&self) -> usize {
        self.span.end
    }
}

impl std::fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.lexeme.is_empty() {
            write!(f, "{:?}", self.kind)
        } else {
            write!(f, "'{}'", self.lexeme)
        }
    }
}

/// Raw lexing error. Anything the token grammar cannot match (a lone `&` or
/// `|`, stray punctuation) is dropped by the lexer rather than surfaced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RawLexError {
    #[default]
    UnknownCharacter,
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(error = RawLexError)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
pub enum TokenKind {
    /// Double-quoted, may span lines. The quotes are stripped when the token
    /// is built.
    #[regex(r#""[^"]*""#)]
    Str,
    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number,
    /// Starts with an ASCII letter, continues over letters and digits. A
    /// single reserved letter is folded to its keyword kind after matching.
    #[regex(r"[a-zA-Z][a-zA-Z0-9]*")]
    Identifier,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("@")]
    At,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    /// Superclass extension marker.
    #[token("^")]
    Caret,
    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NEq,
    #[token("!")]
    Bang,
    #[token("<")]
    LAngle,
    #[token("<=")]
    LAngleEq,
    #[token(">")]
    RAngle,
    #[token(">=")]
    RAngleEq,
    #[token("&&")]
    OpAnd,
    #[token("||")]
    OpOr,

    // Single-letter keywords. These carry no logos pattern: the lexer folds a
    // one-letter identifier into its keyword kind, so `if2` stays an
    // identifier while `i` alone is a keyword.
    KwIf,
    KwElse,
    KwLoop,
    KwBreak,
    KwContinue,
    KwReturn,
    KwClass,
    KwAbstract,
    KwInterface,
    KwNew,
    KwPublic,
    KwPrivate,
    KwStatic,
    KwMethod,
    KwTry,
    KwHandle,
    KwSystem,

    EoI,
}

impl TokenKind {
    /// Keyword kind for one of the 17 reserved letters.
    pub fn keyword(c: u8) -> Option<TokenKind> {
        Some(match c {
            b'i' => TokenKind::KwIf,
            b'e' => TokenKind::KwElse,
            b'l' => TokenKind::KwLoop,
            b'b' => TokenKind::KwBreak,
            b'k' => TokenKind::KwContinue,
            b'r' => TokenKind::KwReturn,
            b'c' => TokenKind::KwClass,
            b'a' => TokenKind::KwAbstract,
            b'j' => TokenKind::KwInterface,
            b'n' => TokenKind::KwNew,
            b'v' => TokenKind::KwPublic,
            b'p' => TokenKind::KwPrivate,
            b's' => TokenKind::KwStatic,
            b'm' => TokenKind::KwMethod,
            b't' => TokenKind::KwTry,
            b'h' => TokenKind::KwHandle,
            b'z' => TokenKind::KwSystem,
            _ => return None,
        })
    }
}

/// Display helper for "expected one of" parser messages.
#[derive(Debug)]
pub struct TokenKindVec(pub Vec<TokenKind>);

impl std::fmt::Display for TokenKindVec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, kind) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", kind)?;
        }
        Ok(())
    }
}
