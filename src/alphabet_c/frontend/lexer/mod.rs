pub mod token;

use logos::Logos;
use miette::Diagnostic;
use thiserror::Error;

use crate::alphabet_c::utils::Span;
use token::{Token, TokenKind};

/// Every Alphabet source file must open with `#alphabet<...>` on its first
/// line (or its second, when a `#!` shebang leads). Nothing is scanned when
/// the header is missing.
#[derive(Error, Diagnostic, Debug)]
#[diagnostic(
    code(lexer::missing_header),
    help("add '#alphabet<lang>' as the first line of your source file")
)]
#[error("missing magic header '#alphabet<...>'")]
pub struct MissingHeaderError {
    #[label = "expected the language header here"]
    pub span: miette::SourceSpan,
    #[source_code]
    pub src: String,
}

pub type LexResult<T> = Result<T, MissingHeaderError>;

const HEADER_PREFIX: &str = "#alphabet<";

/// Scanner for Alphabet source. Validates the magic header, then hands the
/// remainder of the buffer to the logos-generated token grammar. Lexemes are
/// zero-copy slices of the input.
#[derive(Debug)]
pub struct AlphabetLexer<'src> {
    path: String,
    source: &'src str,
}

impl<'src> AlphabetLexer<'src> {
    pub fn new(path: impl Into<String>, source: &'src str) -> Self {
        AlphabetLexer {
            path: path.into(),
            source,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Scans the whole buffer into a token vector terminated by `EoI`.
    ///
    /// Characters the token grammar cannot match (a lone `&` or `|`, stray
    /// punctuation) are dropped without a diagnostic, matching the language's
    /// forgiving scanner contract.
    pub fn tokenize(&self) -> LexResult<Vec<Token<'src>>> {
        let body_start = self.validate_header()?;
        let line_starts = line_starts(self.source);

        let mut tokens = Vec::new();
        for (result, range) in TokenKind::lexer(&self.source[body_start..]).spanned() {
            let Ok(mut kind) = result else {
                continue;
            };
            let start = body_start + range.start;
            let end = body_start + range.end;
            let mut lexeme = &self.source[start..end];
            let mut literal = 0.0;
            match kind {
                TokenKind::Identifier if lexeme.len() == 1 => {
                    if let Some(keyword) = TokenKind::keyword(lexeme.as_bytes()[0]) {
                        kind = keyword;
                    }
                }
                TokenKind::Number => {
                    literal = lexeme.parse::<f64>().unwrap_or_default();
                }
                TokenKind::Str => {
                    lexeme = &lexeme[1..lexeme.len() - 1];
                }
                _ => {}
            }
            let line = line_of(&line_starts, start);
            tokens.push(Token::new(kind, lexeme, literal, line, Span::new(start, end)));
        }

        let eof = self.source.len();
        tokens.push(Token::new(
            TokenKind::EoI,
            "",
            0.0,
            line_of(&line_starts, eof),
            Span::new(eof, eof),
        ));
        Ok(tokens)
    }

    /// Checks the magic header and returns the byte offset where token
    /// scanning starts (the first byte after the header line). A leading
    /// shebang line is consumed and discarded first.
    fn validate_header(&self) -> LexResult<usize> {
        let mut offset = 0;
        if self.source.starts_with("#!") {
            match self.source.find('\n') {
                Some(newline) => offset = newline + 1,
                None => return Err(self.missing_header(0)),
            }
        }

        let rest = &self.source[offset..];
        if !rest.starts_with(HEADER_PREFIX) {
            return Err(self.missing_header(offset));
        }
        let line_end = rest.find('\n').unwrap_or(rest.len());
        match rest[HEADER_PREFIX.len()..line_end].find('>') {
            Some(_) => {}
            None => return Err(self.missing_header(offset)),
        }
        if line_end == rest.len() {
            // Header line with no trailing newline: the file holds nothing
            // but the header.
            return Ok(self.source.len());
        }
        Ok(offset + line_end + 1)
    }

    fn missing_header(&self, offset: usize) -> MissingHeaderError {
        let line_len = self.source[offset..]
            .find('\n')
            .unwrap_or(self.source.len() - offset);
        MissingHeaderError {
            span: Span::new(offset, offset + line_len).into(),
            src: self.source.to_string(),
        }
    }
}

/// Byte offsets at which each line starts; index n holds the start of line
/// n + 1.
fn line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(
        source
            .bytes()
            .enumerate()
            .filter(|(_, b)| *b == b'\n')
            .map(|(i, _)| i + 1),
    );
    starts
}

fn line_of(line_starts: &[usize], offset: usize) -> u32 {
    line_starts.partition_point(|&start| start <= offset) as u32
}

#[cfg(test)]
mod tests {
    use super::token::TokenKind;
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        AlphabetLexer::new("<test>", source)
            .tokenize()
            .expect("source with header should scan")
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn missing_header_is_rejected() {
        let err = AlphabetLexer::new("<test>", "5 x = 10").tokenize();
        assert!(err.is_err());
    }

    #[test]
    fn header_without_closing_bracket_is_rejected() {
        assert!(AlphabetLexer::new("<test>", "#alphabet<en\n5 x = 10").tokenize().is_err());
    }

    #[test]
    fn shebang_is_skipped_before_header() {
        let tokens = AlphabetLexer::new("<test>", "#!/usr/bin/env alphabet\n#alphabet<en>\nz")
            .tokenize()
            .unwrap();
        assert_eq!(tokens[0].kind, TokenKind::KwSystem);
        assert_eq!(tokens[0].line, 3);
    }

    #[test]
    fn header_contents_are_ignored() {
        assert_eq!(
            kinds("#alphabet<anything at all goes here>\nz"),
            vec![TokenKind::KwSystem, TokenKind::EoI]
        );
    }

    #[test]
    fn single_letter_reserved_identifiers_are_keywords() {
        assert_eq!(
            kinds("#alphabet<x>\ni e l r c z"),
            vec![
                TokenKind::KwIf,
                TokenKind::KwElse,
                TokenKind::KwLoop,
                TokenKind::KwReturn,
                TokenKind::KwClass,
                TokenKind::KwSystem,
                TokenKind::EoI,
            ]
        );
    }

    #[test]
    fn multi_letter_identifiers_are_never_keywords() {
        let tokens = AlphabetLexer::new("<test>", "#alphabet<x>\nif item o x9")
            .tokenize()
            .unwrap();
        assert!(
            tokens[..4]
                .iter()
                .all(|t| t.kind == TokenKind::Identifier)
        );
    }

    #[test]
    fn numbers_decode_to_floats() {
        let tokens = AlphabetLexer::new("<test>", "#alphabet<x>\n42 3.25")
            .tokenize()
            .unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].literal, 42.0);
        assert_eq!(tokens[0].lexeme, "42");
        assert_eq!(tokens[1].literal, 3.25);
    }

    #[test]
    fn string_lexeme_excludes_quotes_and_spans_lines() {
        let tokens = AlphabetLexer::new("<test>", "#alphabet<x>\n\"hello\nworld\" 5")
            .tokenize()
            .unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].lexeme, "hello\nworld");
        assert_eq!(tokens[0].line, 2);
        // the newline inside the string advances the counter for what follows
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn lone_ampersand_and_pipe_are_dropped() {
        assert_eq!(
            kinds("#alphabet<x>\na & b | c && d || e"),
            vec![
                TokenKind::KwAbstract,
                TokenKind::KwBreak,
                TokenKind::KwClass,
                TokenKind::OpAnd,
                TokenKind::Identifier,
                TokenKind::OpOr,
                TokenKind::KwElse,
                TokenKind::EoI,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("#alphabet<x>\n// a comment\n5 // trailing\n6"),
            vec![TokenKind::Number, TokenKind::Number, TokenKind::EoI]
        );
    }

    #[test]
    fn two_character_operators_lex_greedily() {
        assert_eq!(
            kinds("#alphabet<x>\n== = != ! <= < >= >"),
            vec![
                TokenKind::EqEq,
                TokenKind::Eq,
                TokenKind::NEq,
                TokenKind::Bang,
                TokenKind::LAngleEq,
                TokenKind::LAngle,
                TokenKind::RAngleEq,
                TokenKind::RAngle,
                TokenKind::EoI,
            ]
        );
    }

    #[test]
    fn line_numbers_are_one_based_after_the_header() {
        let tokens = AlphabetLexer::new("<test>", "#alphabet<x>\n5\n\n6")
            .tokenize()
            .unwrap();
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].line, 4);
    }
}
