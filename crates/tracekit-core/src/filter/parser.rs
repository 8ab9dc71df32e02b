//! Tokenizer and recursive-descent parser for filter expressions.
//!
//! ```text
//! expr    := and ( ("or" | "||") and )*
//! and     := unary ( ("and" | "&&")? unary )*
//! unary   := ("not" | "!") unary | "(" expr ")" | term
//! term    := "ip" | "ip6" | "tcp" | "udp" | "icmp" | "arp" | "vlan"
//!          | ["src" | "dst"] ("host" ADDR | "net" ADDR/LEN | "port" N | ADDR)
//!          | "ether" ["src" | "dst"] ["host"] MAC
//!          | "proto" N | "less" N | "greater" N
//! ```
//!
//! Juxtaposed terms are joined with `and`, so `tcp port 80` reads as
//! `tcp and port 80`.

use std::net::IpAddr;
use std::str::FromStr;

use thiserror::Error;

use super::expr::{Expr, Protocol, Side};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("empty expression")]
    Empty,
    #[error("expected {expected} at end of expression")]
    UnexpectedEnd { expected: &'static str },
    #[error("expected {expected}, found `{found}`")]
    Unexpected {
        expected: &'static str,
        found: String,
    },
    #[error("invalid {what} `{value}`")]
    BadValue { what: &'static str, value: String },
    #[error("stray `{0}`")]
    Stray(char),
    #[error("expression nested deeper than {limit} levels")]
    TooDeep { limit: usize },
    #[error("expression joins more than {limit} terms")]
    TooLong { limit: usize },
}

/// Parentheses and negations that may enclose a term.
const MAX_NESTING: usize = 256;
/// `and`, `or` and `not` nodes in one expression.
const MAX_OPERATORS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    Open,
    Close,
    Not,
    And,
    Or,
}

impl Token<'_> {
    fn text(&self) -> &str {
        match self {
            Token::Word(word) => word,
            Token::Open => "(",
            Token::Close => ")",
            Token::Not => "not",
            Token::And => "and",
            Token::Or => "or",
        }
    }
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '!' | '&' | '|')
}

fn tokenize(source: &str) -> Result<Vec<Token<'_>>, FilterError> {
    let mut tokens = Vec::new();
    let mut rest = source.trim_start();
    while let Some(c) = rest.chars().next() {
        let (token, len) = match c {
            '(' => (Token::Open, 1),
            ')' => (Token::Close, 1),
            '!' => (Token::Not, 1),
            '&' | '|' => {
                if !rest[1..].starts_with(c) {
                    return Err(FilterError::Stray(c));
                }
                (if c == '&' { Token::And } else { Token::Or }, 2)
            }
            _ => {
                let len = rest.find(is_delimiter).unwrap_or(rest.len());
                let word = &rest[..len];
                let token = match word {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Word(word),
                };
                (token, len)
            }
        };
        tokens.push(token);
        rest = rest[len..].trim_start();
    }
    Ok(tokens)
}

/// Parse a filter expression.
pub(crate) fn parse(source: &str) -> Result<Expr, FilterError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(FilterError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        nesting: 0,
        operators: 0,
    };
    let expr = parser.or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(FilterError::Unexpected {
            expected: "end of expression",
            found: token.text().to_string(),
        }),
    }
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    nesting: usize,
    operators: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self, expected: &'static str) -> Result<Token<'a>, FilterError> {
        let token = self.peek().ok_or(FilterError::UnexpectedEnd { expected })?;
        self.pos += 1;
        Ok(token)
    }

    fn word(&mut self, expected: &'static str) -> Result<&'a str, FilterError> {
        match self.next(expected)? {
            Token::Word(word) => Ok(word),
            token => Err(FilterError::Unexpected {
                expected,
                found: token.text().to_string(),
            }),
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.peek() == Some(Token::Word(word)) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn value<T: FromStr>(&mut self, what: &'static str) -> Result<T, FilterError> {
        let word = self.word(what)?;
        word.parse().map_err(|_| FilterError::BadValue {
            what,
            value: word.to_string(),
        })
    }

    /// Count one more operator node; matching and dropping recurse over the
    /// tree, so its size stays bounded.
    fn operator(&mut self) -> Result<(), FilterError> {
        if self.operators == MAX_OPERATORS {
            return Err(FilterError::TooLong {
                limit: MAX_OPERATORS,
            });
        }
        self.operators += 1;
        Ok(())
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Expr, FilterError>,
    ) -> Result<Expr, FilterError> {
        if self.nesting == MAX_NESTING {
            return Err(FilterError::TooDeep { limit: MAX_NESTING });
        }
        self.nesting += 1;
        let expr = parse(self)?;
        self.nesting -= 1;
        Ok(expr)
    }

    fn or(&mut self) -> Result<Expr, FilterError> {
        let mut expr = self.and()?;
        while self.peek() == Some(Token::Or) {
            self.pos += 1;
            self.operator()?;
            expr = Expr::Or(Box::new(expr), Box::new(self.and()?));
        }
        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr, FilterError> {
        let mut expr = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::And) => self.pos += 1,
                Some(Token::Word(_) | Token::Not | Token::Open) => {}
                _ => return Ok(expr),
            }
            self.operator()?;
            expr = Expr::And(Box::new(expr), Box::new(self.unary()?));
        }
    }

    fn unary(&mut self) -> Result<Expr, FilterError> {
        match self.next("a filter term")? {
            Token::Not => {
                self.operator()?;
                Ok(Expr::Not(Box::new(self.nested(Self::unary)?)))
            }
            Token::Open => {
                let expr = self.nested(Self::or)?;
                match self.next("`)`")? {
                    Token::Close => Ok(expr),
                    token => Err(FilterError::Unexpected {
                        expected: "`)`",
                        found: token.text().to_string(),
                    }),
                }
            }
            Token::Word(word) => self.term(word),
            token => Err(FilterError::Unexpected {
                expected: "a filter term",
                found: token.text().to_string(),
            }),
        }
    }

    fn term(&mut self, word: &'a str) -> Result<Expr, FilterError> {
        let protocol = match word {
            "ip" => Some(Protocol::Ip),
            "ip6" => Some(Protocol::Ip6),
            "tcp" => Some(Protocol::Tcp),
            "udp" => Some(Protocol::Udp),
            "icmp" => Some(Protocol::Icmp),
            "arp" => Some(Protocol::Arp),
            "vlan" => Some(Protocol::Vlan),
            _ => None,
        };
        if let Some(protocol) = protocol {
            return Ok(Expr::Protocol(protocol));
        }
        match word {
            "src" => self.qualified(Side::Source),
            "dst" => self.qualified(Side::Destination),
            "host" | "net" | "port" => self.primitive(word, Side::Either),
            "ether" => self.ether(),
            "proto" => Ok(Expr::IpProto(self.value("protocol number")?)),
            "less" => Ok(Expr::Less(self.value("length")?)),
            "greater" => Ok(Expr::Greater(self.value("length")?)),
            _ => Err(FilterError::Unexpected {
                expected: "a filter term",
                found: word.to_string(),
            }),
        }
    }

    /// After `src`/`dst`: an explicit primitive or a bare host address.
    fn qualified(&mut self, side: Side) -> Result<Expr, FilterError> {
        let word = self.word("`host`, `net`, `port` or an address")?;
        match word {
            "host" | "net" | "port" => self.primitive(word, side),
            _ => host(word, side),
        }
    }

    fn primitive(&mut self, keyword: &str, side: Side) -> Result<Expr, FilterError> {
        match keyword {
            "host" => host(self.word("an address")?, side),
            "net" => net(self.word("a network")?, side),
            _ => Ok(Expr::Port {
                side,
                port: self.value("port")?,
            }),
        }
    }

    fn ether(&mut self) -> Result<Expr, FilterError> {
        let side = if self.eat_word("src") {
            Side::Source
        } else if self.eat_word("dst") {
            Side::Destination
        } else {
            Side::Either
        };
        self.eat_word("host");
        Ok(Expr::EtherHost {
            side,
            mac: self.value("MAC address")?,
        })
    }
}

fn host(word: &str, side: Side) -> Result<Expr, FilterError> {
    let addr = word.parse::<IpAddr>().map_err(|_| FilterError::BadValue {
        what: "address",
        value: word.to_string(),
    })?;
    Ok(Expr::Host { side, addr })
}

/// `ADDR/LEN`, or a bare address meaning a host-length prefix.
fn net(word: &str, side: Side) -> Result<Expr, FilterError> {
    let bad = || FilterError::BadValue {
        what: "network",
        value: word.to_string(),
    };
    let (addr, prefix) = match word.split_once('/') {
        Some((addr, prefix)) => (addr, Some(prefix)),
        None => (word, None),
    };
    let addr = addr.parse::<IpAddr>().map_err(|_| bad())?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    let prefix = match prefix {
        Some(prefix) => prefix.parse::<u8>().map_err(|_| bad())?,
        None => max,
    };
    if prefix > max {
        return Err(bad());
    }
    Ok(Expr::Net { side, addr, prefix })
}
