//! Restricted boolean/comparison expression evaluator for `conditional`
//! steps. Variables resolve against the conversation's working variables;
//! there is no function call, indexing, or any other code-execution facility.
//!
//! `&&` and `||` short-circuit: once the left side decides the result, the
//! right side is never resolved, so an unset variable there does not fail
//! the expression. Syntax errors are still caught for the whole expression.
//!
//! Grammar:
//! ```text
//! expr    := or
//! or      := and ("||" and)*
//! and     := unary ("&&" unary)*
//! unary   := "!" unary | primary
//! primary := "(" expr ")" | operand (cmp operand)?
//! cmp     := "==" | "!=" | ">=" | "<=" | ">" | "<"
//! operand := identifier | number | 'string' | "string" | true | false
//! ```

use std::collections::HashMap;

use crate::state::VarValue;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    True,
    False,
    And,
    Or,
    Not,
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '\'' | '"' => {
                let quote = ch;
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => break,
                        Some(c) => s.push(c),
                        None => return Err("unterminated string literal".into()),
                    }
                }
                tokens.push(Token::Str(s));
            }
            '&' => {
                chars.next();
                if chars.next() != Some('&') {
                    return Err("expected `&&`".into());
                }
                tokens.push(Token::And);
            }
            '|' => {
                chars.next();
                if chars.next() != Some('|') {
                    return Err("expected `||`".into());
                }
                tokens.push(Token::Or);
            }
            '=' => {
                chars.next();
                if chars.next() != Some('=') {
                    return Err("expected `==`".into());
                }
                tokens.push(Token::Eq);
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ne);
                } else {
                    tokens.push(Token::Not);
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut num = String::new();
                num.push(c);
                chars.next();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let parsed: f64 = num.parse().map_err(|_| format!("bad number `{num}`"))?;
                tokens.push(Token::Number(parsed));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match ident.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    _ => Token::Ident(ident),
                });
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }

    Ok(tokens)
}

/// An unresolved leaf of the parsed expression. Identifiers are looked up
/// only when the leaf is actually evaluated.
#[derive(Debug, Clone, PartialEq)]
enum Atom {
    Number(f64),
    Str(String),
    Bool(bool),
    Ident(String),
}

impl Atom {
    fn resolve(&self, variables: &HashMap<String, VarValue>) -> Result<Operand, String> {
        match self {
            Atom::Number(n) => Ok(Operand::Number(*n)),
            Atom::Str(s) => Ok(Operand::Str(s.clone())),
            Atom::Bool(b) => Ok(Operand::Bool(*b)),
            Atom::Ident(name) => variables
                .get(name)
                .map(Operand::from_var)
                .ok_or_else(|| format!("unknown variable `{name}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

/// Parsed expression tree, evaluated lazily against the working variables.
#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Cmp(Atom, CmpOp, Atom),
    Test(Atom),
}

impl Expr {
    fn eval(&self, variables: &HashMap<String, VarValue>) -> Result<bool, String> {
        match self {
            Expr::Or(left, right) => {
                if left.eval(variables)? {
                    Ok(true)
                } else {
                    right.eval(variables)
                }
            }
            Expr::And(left, right) => {
                if left.eval(variables)? {
                    right.eval(variables)
                } else {
                    Ok(false)
                }
            }
            Expr::Not(inner) => Ok(!inner.eval(variables)?),
            Expr::Test(atom) => atom.resolve(variables)?.truthy(),
            Expr::Cmp(left, op, right) => {
                let left = left.resolve(variables)?;
                let right = right.resolve(variables)?;
                Ok(match op {
                    CmpOp::Eq => left == right,
                    CmpOp::Ne => left != right,
                    CmpOp::Gt => left.ordering(&right)?.is_gt(),
                    CmpOp::Ge => left.ordering(&right)?.is_ge(),
                    CmpOp::Lt => left.ordering(&right)?.is_lt(),
                    CmpOp::Le => left.ordering(&right)?.is_le(),
                })
            }
        }
    }
}

/// A resolved operand; comparison semantics live on this type.
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
}

impl Operand {
    fn from_var(value: &VarValue) -> Operand {
        match value {
            VarValue::Integer(i) => Operand::Number(*i as f64),
            VarValue::Number(n) => Operand::Number(*n),
            VarValue::String(s) => Operand::Str(s.clone()),
            VarValue::Boolean(b) => Operand::Bool(*b),
            VarValue::Null => Operand::Null,
        }
    }

    fn ordering(&self, other: &Operand) -> Result<std::cmp::Ordering, String> {
        match (self, other) {
            (Operand::Number(a), Operand::Number(b)) => a
                .partial_cmp(b)
                .ok_or_else(|| "numeric comparison with NaN".to_string()),
            (Operand::Str(a), Operand::Str(b)) => Ok(a.cmp(b)),
            (a, b) => Err(format!("cannot order {a:?} against {b:?}")),
        }
    }

    /// Truthiness of a bare operand (`{registered} && edad >= 18`).
    fn truthy(&self) -> Result<bool, String> {
        match self {
            Operand::Bool(b) => Ok(*b),
            other => Err(format!("expected a boolean, got {other:?}")),
        }
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expr(&mut self) -> Result<Expr, String> {
        let mut left = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.bump();
            let right = self.and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, String> {
        let mut left = self.unary()?;
        while self.peek() == Some(&Token::And) {
            self.bump();
            let right = self.unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.peek() == Some(&Token::Not) {
            self.bump();
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, String> {
        if self.peek() == Some(&Token::LParen) {
            self.bump();
            let inner = self.expr()?;
            if self.bump() != Some(Token::RParen) {
                return Err("missing `)`".into());
            }
            return Ok(inner);
        }

        let left = self.atom()?;
        let op = match self.peek() {
            Some(Token::Eq) => CmpOp::Eq,
            Some(Token::Ne) => CmpOp::Ne,
            Some(Token::Ge) => CmpOp::Ge,
            Some(Token::Le) => CmpOp::Le,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::Lt) => CmpOp::Lt,
            _ => return Ok(Expr::Test(left)),
        };
        self.bump();
        let right = self.atom()?;
        Ok(Expr::Cmp(left, op, right))
    }

    fn atom(&mut self) -> Result<Atom, String> {
        match self.bump() {
            Some(Token::Number(n)) => Ok(Atom::Number(n)),
            Some(Token::Str(s)) => Ok(Atom::Str(s)),
            Some(Token::True) => Ok(Atom::Bool(true)),
            Some(Token::False) => Ok(Atom::Bool(false)),
            Some(Token::Ident(name)) => Ok(Atom::Ident(name)),
            other => Err(format!("expected an operand, got {other:?}")),
        }
    }
}

/// Evaluates a condition expression against the working variables.
pub fn evaluate(expr: &str, variables: &HashMap<String, VarValue>) -> Result<bool, String> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err("empty condition".into());
    }
    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let parsed = parser.expr()?;
    if parser.pos != tokens.len() {
        return Err(format!("trailing tokens after position {}", parser.pos));
    }
    parsed.eval(variables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> HashMap<String, VarValue> {
        let mut v = HashMap::new();
        v.insert("edad".to_string(), VarValue::Integer(25));
        v.insert("nombre".to_string(), VarValue::String("Carlos".into()));
        v.insert("registrado".to_string(), VarValue::Boolean(true));
        v.insert("puntaje".to_string(), VarValue::Number(72.5));
        v
    }

    #[test]
    fn numeric_comparisons() {
        assert!(evaluate("edad >= 18", &vars()).unwrap());
        assert!(!evaluate("edad < 18", &vars()).unwrap());
        assert!(evaluate("puntaje > 70", &vars()).unwrap());
        assert!(evaluate("edad == 25", &vars()).unwrap());
    }

    #[test]
    fn string_equality() {
        assert!(evaluate("nombre == 'Carlos'", &vars()).unwrap());
        assert!(evaluate("nombre != \"Ana\"", &vars()).unwrap());
    }

    #[test]
    fn boolean_connectives_and_grouping() {
        assert!(evaluate("edad >= 18 && registrado", &vars()).unwrap());
        assert!(evaluate("edad < 18 || puntaje > 50", &vars()).unwrap());
        assert!(evaluate("!(edad < 18)", &vars()).unwrap());
        assert!(evaluate("(edad >= 18 && registrado) || puntaje < 0", &vars()).unwrap());
    }

    #[test]
    fn unknown_variable_is_an_error() {
        assert!(evaluate("desconocida == 1", &vars()).is_err());
    }

    #[test]
    fn connectives_short_circuit() {
        // Once the left side decides, the right side is never resolved, so
        // an unset variable there cannot fail the branch.
        assert!(evaluate("edad >= 18 || desconocida == 1", &vars()).unwrap());
        assert!(!evaluate("edad < 18 && desconocida == 1", &vars()).unwrap());

        // When the left side does not decide, the right side still resolves
        // and its faults surface.
        assert!(evaluate("edad < 18 || desconocida == 1", &vars()).is_err());
        assert!(evaluate("edad >= 18 && desconocida == 1", &vars()).is_err());
    }

    #[test]
    fn malformed_expressions_are_errors() {
        assert!(evaluate("", &vars()).is_err());
        assert!(evaluate("edad >=", &vars()).is_err());
        assert!(evaluate("edad = 25", &vars()).is_err());
        assert!(evaluate("(edad > 1", &vars()).is_err());
        assert!(evaluate("edad > 1 extra", &vars()).is_err());
        // Arbitrary code has no representation in the grammar.
        assert!(evaluate("__import__('os')", &vars()).is_err());
    }

    #[test]
    fn cross_type_equality_is_false_not_an_error() {
        assert!(!evaluate("nombre == 25", &vars()).unwrap());
        assert!(evaluate("nombre != 25", &vars()).unwrap());
    }

    #[test]
    fn ordering_across_types_is_an_error() {
        assert!(evaluate("nombre > 3", &vars()).is_err());
    }
}
