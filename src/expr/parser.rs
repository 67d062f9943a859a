// expr/parser.rs
// Recursive-descent parser resolving names to slot indices

use super::ast::{Expr, Func};
use super::lexer::{tokenize, Token};
use crate::error::ExprError;

/// Ordered symbol schema a formula is compiled against. Slot layout is
/// features first, then per-term parameters, then globals; the evaluator
/// packs its slot array in the same order.
pub struct SymbolTable<'a> {
    pub features: &'a [&'a str],
    pub term_params: &'a [String],
    pub globals: &'a [String],
}

impl<'a> SymbolTable<'a> {
    pub fn slot_count(&self) -> usize {
        self.features.len() + self.term_params.len() + self.globals.len()
    }

    fn resolve(&self, name: &str) -> Option<usize> {
        if let Some(i) = self.features.iter().position(|f| *f == name) {
            return Some(i);
        }
        if let Some(i) = self.term_params.iter().position(|p| p == name) {
            return Some(self.features.len() + i);
        }
        if let Some(i) = self.globals.iter().position(|g| g == name) {
            return Some(self.features.len() + self.term_params.len() + i);
        }
        None
    }
}

pub fn parse(text: &str, symbols: &SymbolTable) -> Result<Expr, ExprError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        symbols,
    };
    let expr = parser.expression()?;
    if let Some((token, offset)) = parser.peek_full() {
        return Err(ExprError::UnexpectedToken {
            token: token.describe(),
            offset,
        });
    }
    Ok(expr)
}

struct Parser<'a, 'b> {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    symbols: &'b SymbolTable<'a>,
}

impl Parser<'_, '_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_full(&self) -> Option<(Token, usize)> {
        self.tokens.get(self.pos).cloned()
    }

    fn advance(&mut self) -> Option<(Token, usize)> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    let rhs = self.term()?;
                    lhs = Expr::Add(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Minus) => {
                    self.advance();
                    let rhs = self.term()?;
                    lhs = Expr::Sub(Box::new(lhs), Box::new(rhs));
                }
                _ => return Ok(lhs),
            }
        }
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    let rhs = self.unary()?;
                    lhs = Expr::Mul(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Slash) => {
                    self.advance();
                    let rhs = self.unary()?;
                    lhs = Expr::Div(Box::new(lhs), Box::new(rhs));
                }
                _ => return Ok(lhs),
            }
        }
    }

    // unary := '-' unary | power
    // '^' binds tighter than unary minus, so -x^2 parses as -(x^2).
    fn unary(&mut self) -> Result<Expr, ExprError> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.advance();
            let inner = self.unary()?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.power()
    }

    // power := atom ('^' unary)?   (right-associative, exponent may be negated)
    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.atom()?;
        if matches!(self.peek(), Some(Token::Caret)) {
            self.advance();
            let exponent = self.unary()?;
            return Ok(Expr::Pow(Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    // atom := number | ident | ident '(' args ')' | '(' expression ')'
    fn atom(&mut self) -> Result<Expr, ExprError> {
        match self.advance() {
            Some((Token::Number(value), _)) => Ok(Expr::Const(value)),
            Some((Token::Ident(name), _)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    let func =
                        Func::from_name(&name).ok_or_else(|| ExprError::UnknownSymbol(name.clone()))?;
                    self.advance();
                    let args = self.arguments()?;
                    if args.len() != func.arity() {
                        return Err(ExprError::WrongArity {
                            name,
                            expected: func.arity(),
                            got: args.len(),
                        });
                    }
                    Ok(Expr::Call(func, args))
                } else {
                    let slot = self
                        .symbols
                        .resolve(&name)
                        .ok_or(ExprError::UnknownSymbol(name))?;
                    Ok(Expr::Var(slot))
                }
            }
            Some((Token::LParen, _)) => {
                let inner = self.expression()?;
                match self.advance() {
                    Some((Token::RParen, _)) => Ok(inner),
                    Some((token, offset)) => Err(ExprError::UnexpectedToken {
                        token: token.describe(),
                        offset,
                    }),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some((token, offset)) => Err(ExprError::UnexpectedToken {
                token: token.describe(),
                offset,
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        if matches!(self.peek(), Some(Token::RParen)) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            match self.advance() {
                Some((Token::Comma, _)) => continue,
                Some((Token::RParen, _)) => return Ok(args),
                Some((token, offset)) => {
                    return Err(ExprError::UnexpectedToken {
                        token: token.describe(),
                        offset,
                    })
                }
                None => return Err(ExprError::UnexpectedEnd),
            }
        }
    }
}
