//! Site-selection expressions
//!
//! A small set algebra over site names and attributes:
//!
//! ```text
//! expr    := operand (op operand)*        evaluated left to right
//! op      := '|' union | '&' intersection | '\' difference
//! operand := '(' expr ')' | '*' | key=value | name
//! ```
//!
//! A bare `name` matches the site with that name, or every site whose
//! attribute `name` is set to a true value.

use siteplace_common::{Error, Result, SiteId};
use std::collections::HashMap;

/// View of one site for expression evaluation
#[derive(Clone, Copy, Debug)]
pub struct SiteRef<'a> {
    pub id: SiteId,
    pub name: &'a str,
    pub attributes: &'a HashMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Union,
    Intersect,
    Difference,
    Open,
    Close,
    Word(String),
}

fn tokenize(expression: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut word = String::new();

    let flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if !word.is_empty() {
            tokens.push(Token::Word(std::mem::take(word)));
        }
    };

    for c in expression.chars() {
        let op = match c {
            '|' => Some(Token::Union),
            '&' => Some(Token::Intersect),
            '\\' => Some(Token::Difference),
            '(' => Some(Token::Open),
            ')' => Some(Token::Close),
            _ => None,
        };
        if let Some(op) = op {
            flush(&mut word, &mut tokens);
            tokens.push(op);
        } else if c.is_whitespace() {
            flush(&mut word, &mut tokens);
        } else if c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '=' | '*' | ':') {
            word.push(c);
        } else {
            return Err(Error::invalid_argument(format!(
                "invalid character {c:?} in site expression {expression:?}"
            )));
        }
    }
    flush(&mut word, &mut tokens);

    if tokens.is_empty() {
        return Err(Error::invalid_argument("empty site expression"));
    }
    Ok(tokens)
}

pub(crate) fn is_true(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

struct Parser<'t, 's> {
    tokens: &'t [Token],
    pos: usize,
    sites: &'t [SiteRef<'s>],
}

impl Parser<'_, '_> {
    fn expr(&mut self) -> Result<Vec<bool>> {
        let mut acc = self.operand()?;
        while let Some(token) = self.tokens.get(self.pos).cloned() {
            let combine: fn(bool, bool) -> bool = match token {
                Token::Union => |a, b| a || b,
                Token::Intersect => |a, b| a && b,
                Token::Difference => |a, b| a && !b,
                Token::Close => break,
                Token::Open | Token::Word(_) => {
                    return Err(Error::invalid_argument(format!(
                        "expected an operator at position {}",
                        self.pos
                    )));
                }
            };
            self.pos += 1;
            let rhs = self.operand()?;
            for (a, b) in acc.iter_mut().zip(rhs) {
                *a = combine(*a, b);
            }
        }
        Ok(acc)
    }

    fn operand(&mut self) -> Result<Vec<bool>> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| Error::invalid_argument("site expression ends with an operator"))?;
        self.pos += 1;

        match token {
            Token::Open => {
                let inner = self.expr()?;
                if self.tokens.get(self.pos) != Some(&Token::Close) {
                    return Err(Error::invalid_argument("unbalanced parentheses in site expression"));
                }
                self.pos += 1;
                Ok(inner)
            }
            Token::Word(word) => Ok(self.primary(&word)),
            _ => Err(Error::invalid_argument(format!(
                "expected a site or attribute at position {}",
                self.pos - 1
            ))),
        }
    }

    fn primary(&self, word: &str) -> Vec<bool> {
        if word == "*" {
            return vec![true; self.sites.len()];
        }
        if let Some((key, value)) = word.split_once('=') {
            return self
                .sites
                .iter()
                .map(|s| s.attributes.get(key).is_some_and(|v| v == value))
                .collect();
        }
        if self.sites.iter().any(|s| s.name == word) {
            return self.sites.iter().map(|s| s.name == word).collect();
        }
        self.sites
            .iter()
            .map(|s| s.attributes.get(word).is_some_and(|v| is_true(v)))
            .collect()
    }
}

/// Evaluate an expression, returning matching site IDs in input order
pub fn evaluate(expression: &str, sites: &[SiteRef<'_>]) -> Result<Vec<SiteId>> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        sites,
    };
    let mask = parser.expr()?;
    if parser.pos != tokens.len() {
        return Err(Error::invalid_argument("unbalanced parentheses in site expression"));
    }

    Ok(sites
        .iter()
        .zip(mask)
        .filter_map(|(site, hit)| hit.then_some(site.id))
        .collect())
}
