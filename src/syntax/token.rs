//! Token definition and lexing.
//!
//! The raw token stream keeps newlines and comments; a post-pass applies
//! the language's automatic semicolon insertion rule so the parser only
//! ever sees explicit terminators.

use logos::{Lexer as LogosLexer, Logos};

use crate::base::{TextRange, TextSize};

fn lex_block_comment(lex: &mut LogosLexer<'_, Tok>) -> bool {
    let rem = lex.remainder().as_bytes();
    match rem.windows(2).position(|w| w == b"*/") {
        Some(pos) => {
            lex.bump(pos + 2);
            true
        }
        None => {
            lex.bump(rem.len());
            false
        }
    }
}

/// Raw token kind produced by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r]+")]
pub enum Tok {
    // Keywords
    #[token("package")]
    Package,
    #[token("import")]
    Import,
    #[token("type")]
    Type,
    #[token("struct")]
    Struct,
    #[token("interface")]
    Interface,
    #[token("func")]
    Func,
    #[token("var")]
    Var,
    #[token("const")]
    Const,
    #[token("map")]
    Map,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("range")]
    Range,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("goto")]
    Goto,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[regex(r"[0-9]+\.[0-9]+")]
    Float,
    #[regex(r"[0-9]+|0[xX][0-9a-fA-F]+")]
    Int,
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,
    #[regex(r"`[^`]*`")]
    RawStr,
    #[regex(r"'([^'\\\n]|\\.)+'")]
    CharLit,

    #[regex(r"//[^\n]*")]
    LineComment,
    #[token("/*", lex_block_comment)]
    BlockComment,

    #[token("\n")]
    Newline,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token(":=")]
    ColonEq,
    #[token("=")]
    Eq,
    #[token("*")]
    Star,
    #[token("&")]
    Amp,
    #[token("!")]
    Bang,
    #[token("-")]
    Minus,
    #[token("+")]
    Plus,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("|")]
    Pipe,

    /// Unrecognized input, carried so the parser can report and recover.
    #[regex(r".", priority = 0)]
    Error,
}

impl Tok {
    /// Tokens that trigger semicolon insertion when a newline follows.
    fn ends_statement(self) -> bool {
        matches!(
            self,
            Tok::Ident
                | Tok::Int
                | Tok::Float
                | Tok::Str
                | Tok::RawStr
                | Tok::CharLit
                | Tok::Return
                | Tok::Break
                | Tok::Continue
                | Tok::RParen
                | Tok::RBracket
                | Tok::RBrace
        )
    }
}

/// A token with its source range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: Tok,
    pub range: TextRange,
}

impl Token {
    pub fn start(&self) -> TextSize {
        self.range.start()
    }
}

/// Lex `text` into a parser-ready token stream.
///
/// Comments stay in the stream (the parser harvests doc comments from
/// them); newlines are rewritten to [`Tok::Semi`] where the insertion rule
/// applies and dropped otherwise.
pub fn lex(text: &str) -> Vec<Token> {
    let mut raw = Vec::new();
    let mut lexer = Tok::lexer(text);
    while let Some(result) = lexer.next() {
        let kind = result.unwrap_or(Tok::Error);
        let span = lexer.span();
        raw.push(Token {
            kind,
            range: TextRange::new(
                TextSize::from(span.start as u32),
                TextSize::from(span.end as u32),
            ),
        });
    }

    // Automatic semicolon insertion: a newline after a statement-ending
    // token becomes an explicit terminator. Comments are transparent to
    // the rule.
    let mut out = Vec::with_capacity(raw.len());
    let mut last_real: Option<Tok> = None;
    for tok in raw {
        match tok.kind {
            Tok::Newline => {
                if last_real.is_some_and(Tok::ends_statement) {
                    out.push(Token {
                        kind: Tok::Semi,
                        range: tok.range,
                    });
                    last_real = Some(Tok::Semi);
                }
            }
            Tok::LineComment | Tok::BlockComment => out.push(tok),
            kind => {
                out.push(tok);
                last_real = Some(kind);
            }
        }
    }
    out
}
