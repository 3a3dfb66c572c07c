use crate::error::{ExprError, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifiers and keywords; the parser tells them apart
    Word(String),
    /// Quoted string literal (content without quotes, escapes resolved)
    Str(String),
    /// Numeric literal, kept as text to preserve the exact decimal
    Number(String),
    LParen,
    RParen,
    Comma,
    // Arithmetic operators
    Plus,
    Minus,
    Star,
    Slash,
    // Comparison operators
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    // Logical operators (symbolic forms; `and`/`or`/`not` arrive as words)
    AndAnd,
    OrOr,
    Bang,
    // End of input
    Eof,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

/// Tokenize one expression. Spans are byte offsets into `src`.
pub fn lex(src: &str) -> Result<Vec<Spanned>, ExprError> {
    let mut tokens = Vec::new();
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let byte_at = |i: usize| chars.get(i).map(|(b, _)| *b).unwrap_or(src.len());
    let mut pos = 0usize;

    while pos < chars.len() {
        let (start, c) = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        // String literal, single or double quoted
        if c == '"' || c == '\'' {
            let quote = c;
            pos += 1;
            let mut s = String::new();
            loop {
                if pos >= chars.len() {
                    return Err(ExprError::syntax(
                        "unterminated string literal",
                        Span::new(start, src.len()),
                    ));
                }
                let sc = chars[pos].1;
                if sc == quote {
                    pos += 1;
                    break;
                }
                if sc == '\\' {
                    pos += 1;
                    match chars.get(pos).map(|(_, ch)| *ch) {
                        Some('n') => s.push('\n'),
                        Some('t') => s.push('\t'),
                        Some(other) => s.push(other),
                        None => {
                            return Err(ExprError::syntax(
                                "unterminated escape in string",
                                Span::new(start, src.len()),
                            ));
                        }
                    }
                    pos += 1;
                    continue;
                }
                s.push(sc);
                pos += 1;
            }
            tokens.push(Spanned {
                token: Token::Str(s),
                span: Span::new(start, byte_at(pos)),
            });
            continue;
        }

        // Number: digits with an optional fractional part
        if c.is_ascii_digit() {
            let first = pos;
            while pos < chars.len() && chars[pos].1.is_ascii_digit() {
                pos += 1;
            }
            if pos + 1 < chars.len() && chars[pos].1 == '.' && chars[pos + 1].1.is_ascii_digit() {
                pos += 1; // consume '.'
                while pos < chars.len() && chars[pos].1.is_ascii_digit() {
                    pos += 1;
                }
            }
            let text: String = chars[first..pos].iter().map(|(_, ch)| ch).collect();
            tokens.push(Spanned {
                token: Token::Number(text),
                span: Span::new(start, byte_at(pos)),
            });
            continue;
        }

        // Operators and punctuation
        let next = chars.get(pos + 1).map(|(_, ch)| *ch);
        let (token, width) = match (c, next) {
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            (',', _) => (Token::Comma, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('=', Some('=')) => (Token::Eq, 2),
            ('=', _) => (Token::Eq, 1),
            ('!', Some('=')) => (Token::Neq, 2),
            ('!', _) => (Token::Bang, 1),
            ('<', Some('=')) => (Token::Lte, 2),
            ('<', Some('>')) => (Token::Neq, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', Some('=')) => (Token::Gte, 2),
            ('>', _) => (Token::Gt, 1),
            ('&', Some('&')) => (Token::AndAnd, 2),
            ('|', Some('|')) => (Token::OrOr, 2),
            _ => (Token::Eof, 0),
        };
        if width > 0 {
            pos += width;
            tokens.push(Spanned {
                token,
                span: Span::new(start, byte_at(pos)),
            });
            continue;
        }

        // Identifier / keyword
        if c.is_alphabetic() || c == '_' {
            let first = pos;
            while pos < chars.len() && (chars[pos].1.is_alphanumeric() || chars[pos].1 == '_') {
                pos += 1;
            }
            let word: String = chars[first..pos].iter().map(|(_, ch)| ch).collect();
            tokens.push(Spanned {
                token: Token::Word(word),
                span: Span::new(start, byte_at(pos)),
            });
            continue;
        }

        return Err(ExprError::syntax(
            format!("unexpected character '{}'", c),
            Span::new(start, start + c.len_utf8()),
        ));
    }

    tokens.push(Spanned {
        token: Token::Eof,
        span: Span::new(src.len(), src.len()),
    });
    Ok(tokens)
}
