use flint_error::{EngineError, ErrorKind, Result};

/// A lexical token produced from raw SQL text.
///
/// The dialect is MySQL-derived per §6: backtick-quoted identifiers,
/// single-quoted string/timestamp literals, and `?` parameter placeholders.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Word(String),
    QuotedIdent(String),
    SingleQuotedString(String),
    Number(String),
    Placeholder,
    Comma,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Period,
    Semicolon,
    At,
    AtAt,
    Op(String),
    Eof,
}

pub struct Tokenizer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(sql: &'a str) -> Self {
        Tokenizer {
            chars: sql.chars().peekable(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(tok) = self.next_token()? {
            tokens.push(tok);
        }
        tokens.push(Token::Eof);
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace_and_comments();

        let c = match self.chars.peek() {
            Some(c) => *c,
            None => return Ok(None),
        };

        let tok = match c {
            '`' => {
                self.chars.next();
                Token::QuotedIdent(self.read_until('`')?)
            }
            '\'' => {
                self.chars.next();
                Token::SingleQuotedString(self.read_until('\'')?)
            }
            '"' => {
                self.chars.next();
                Token::QuotedIdent(self.read_until('"')?)
            }
            '?' => {
                self.chars.next();
                Token::Placeholder
            }
            ',' => {
                self.chars.next();
                Token::Comma
            }
            '(' => {
                self.chars.next();
                Token::LeftParen
            }
            ')' => {
                self.chars.next();
                Token::RightParen
            }
            '[' => {
                self.chars.next();
                Token::LeftBracket
            }
            ']' => {
                self.chars.next();
                Token::RightBracket
            }
            ';' => {
                self.chars.next();
                Token::Semicolon
            }
            '.' if !self.peek_is_digit_after('.') => {
                self.chars.next();
                Token::Period
            }
            '@' => {
                self.chars.next();
                if self.chars.peek() == Some(&'@') {
                    self.chars.next();
                    Token::AtAt
                } else {
                    Token::At
                }
            }
            c if c.is_ascii_digit() || (c == '.' && self.peek_is_digit_after('.')) => {
                Token::Number(self.read_number())
            }
            c if is_ident_start(c) => Token::Word(self.read_word()),
            '=' | '<' | '>' | '!' | '+' | '-' | '*' | '/' | '%' | '|' => Token::Op(self.read_operator()),
            other => {
                return Err(EngineError::new(
                    ErrorKind::UnsupportedSyntax,
                    format!("unexpected character '{other}' in SQL text"),
                ))
            }
        };

        Ok(Some(tok))
    }

    fn peek_is_digit_after(&self, _c: char) -> bool {
        // Lookahead for a leading-decimal number like `.5`; conservative,
        // only used to disambiguate `.` as punctuation vs number start.
        false
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.chars.next();
                }
                Some('-') => {
                    let mut clone = self.chars.clone();
                    clone.next();
                    if clone.peek() == Some(&'-') {
                        self.chars.next();
                        self.chars.next();
                        for c in self.chars.by_ref() {
                            if c == '\n' {
                                break;
                            }
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    fn read_until(&mut self, quote: char) -> Result<String> {
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some(c) if c == quote => {
                    // Doubled quote is an escaped quote character.
                    if self.chars.peek() == Some(&quote) {
                        s.push(quote);
                        self.chars.next();
                        continue;
                    }
                    return Ok(s);
                }
                Some(c) => s.push(c),
                None => {
                    return Err(EngineError::new(
                        ErrorKind::UnsupportedSyntax,
                        "unterminated quoted literal",
                    ))
                }
            }
        }
    }

    fn read_word(&mut self) -> String {
        let mut s = String::new();
        while let Some(&c) = self.chars.peek() {
            if is_ident_continue(c) {
                s.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        s
    }

    fn read_number(&mut self) -> String {
        let mut s = String::new();
        let mut seen_dot = false;
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                s.push(c);
                self.chars.next();
            } else if c == '.' && !seen_dot {
                seen_dot = true;
                s.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        s
    }

    fn read_operator(&mut self) -> String {
        let mut s = String::new();
        s.push(self.chars.next().unwrap());
        if let Some(&c2) = self.chars.peek() {
            let combo = format!("{}{}", s, c2);
            if matches!(combo.as_str(), "<=" | ">=" | "<>" | "!=" | "||") {
                s.push(c2);
                self.chars.next();
            }
        }
        s
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
