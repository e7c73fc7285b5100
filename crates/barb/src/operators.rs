//! The standard operator table.
//!
//! The reducer itself is operator-agnostic: `Prefix`/`Postfix`/`Infix` nodes
//! carry host-supplied functions and precedence levels. This module provides
//! the table a parser would emit from: arithmetic with int-to-float
//! promotion, comparison and equality over primitives, string concatenation,
//! boolean negation and unary minus.
//!
//! Precedence levels compare like C's: a lower level binds tighter, and on
//! equal levels the left operator reduces first (left-to-right
//! associativity).

use std::sync::Arc;

use crate::{
    expressions::{BinaryFn, ExprKind, ExprRep, InfixOp, PrefixOp, UnaryFn},
    host::HostResult,
    object::Object,
};

pub const PREC_MULTIPLICATIVE: i32 = 3;
pub const PREC_ADDITIVE: i32 = 4;
pub const PREC_COMPARISON: i32 = 6;
pub const PREC_EQUALITY: i32 = 7;

/// Numeric operand pair after int-to-float promotion.
enum NumericPair {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn numeric_pair(left: &Object, right: &Object) -> Option<NumericPair> {
    match (left, right) {
        (Object::Int(a), Object::Int(b)) => Some(NumericPair::Ints(*a, *b)),
        (Object::Float(a), Object::Float(b)) => Some(NumericPair::Floats(*a, *b)),
        (Object::Int(a), Object::Float(b)) => Some(NumericPair::Floats(*a as f64, *b)),
        (Object::Float(a), Object::Int(b)) => Some(NumericPair::Floats(*a, *b as f64)),
        _ => None,
    }
}

fn type_mismatch(op: &str, left: &Object, right: &Object) -> String {
    format!("operator '{op}' is not defined for {} and {}", left.type_name(), right.type_name())
}

fn add(left: &Object, right: &Object) -> HostResult {
    if let (Object::Str(a), Object::Str(b)) = (left, right) {
        return Ok(Object::Str(format!("{a}{b}")));
    }
    match numeric_pair(left, right) {
        Some(NumericPair::Ints(a, b)) => a
            .checked_add(b)
            .map(Object::Int)
            .ok_or_else(|| "integer overflow in '+'".to_owned()),
        Some(NumericPair::Floats(a, b)) => Ok(Object::Float(a + b)),
        None => Err(type_mismatch("+", left, right)),
    }
}

fn sub(left: &Object, right: &Object) -> HostResult {
    match numeric_pair(left, right) {
        Some(NumericPair::Ints(a, b)) => a
            .checked_sub(b)
            .map(Object::Int)
            .ok_or_else(|| "integer overflow in '-'".to_owned()),
        Some(NumericPair::Floats(a, b)) => Ok(Object::Float(a - b)),
        None => Err(type_mismatch("-", left, right)),
    }
}

fn mul(left: &Object, right: &Object) -> HostResult {
    match numeric_pair(left, right) {
        Some(NumericPair::Ints(a, b)) => a
            .checked_mul(b)
            .map(Object::Int)
            .ok_or_else(|| "integer overflow in '*'".to_owned()),
        Some(NumericPair::Floats(a, b)) => Ok(Object::Float(a * b)),
        None => Err(type_mismatch("*", left, right)),
    }
}

fn div(left: &Object, right: &Object) -> HostResult {
    match numeric_pair(left, right) {
        Some(NumericPair::Ints(_, 0)) => Err("division by zero".to_owned()),
        Some(NumericPair::Ints(a, b)) => Ok(Object::Int(a / b)),
        Some(NumericPair::Floats(a, b)) => Ok(Object::Float(a / b)),
        None => Err(type_mismatch("/", left, right)),
    }
}

fn rem(left: &Object, right: &Object) -> HostResult {
    match numeric_pair(left, right) {
        Some(NumericPair::Ints(_, 0)) => Err("modulo by zero".to_owned()),
        Some(NumericPair::Ints(a, b)) => Ok(Object::Int(a % b)),
        Some(NumericPair::Floats(a, b)) => Ok(Object::Float(a % b)),
        None => Err(type_mismatch("%", left, right)),
    }
}

fn compare(op: &str, left: &Object, right: &Object) -> Result<std::cmp::Ordering, String> {
    match numeric_pair(left, right) {
        Some(NumericPair::Ints(a, b)) => Ok(a.cmp(&b)),
        Some(NumericPair::Floats(a, b)) => a
            .partial_cmp(&b)
            .ok_or_else(|| format!("operator '{op}' is not ordered for NaN")),
        None => match (left, right) {
            (Object::Str(a), Object::Str(b)) => Ok(a.cmp(b)),
            _ => Err(type_mismatch(op, left, right)),
        },
    }
}

fn equal(left: &Object, right: &Object) -> bool {
    // Numeric equality crosses the int/float divide; everything else is
    // structural (host handles compare by identity).
    match numeric_pair(left, right) {
        Some(NumericPair::Ints(a, b)) => a == b,
        Some(NumericPair::Floats(a, b)) => a == b,
        None => left == right,
    }
}

fn negate(operand: &Object) -> HostResult {
    match operand {
        Object::Int(v) => v
            .checked_neg()
            .map(Object::Int)
            .ok_or_else(|| "integer overflow in unary '-'".to_owned()),
        Object::Float(v) => Ok(Object::Float(-v)),
        other => Err(format!("unary '-' is not defined for {}", other.type_name())),
    }
}

fn not(operand: &Object) -> HostResult {
    operand
        .as_bool()
        .map(|b| Object::Bool(!b))
        .ok_or_else(|| format!("'not' is not defined for {}", operand.type_name()))
}

/// The standard infix operator for `symbol`, or `None` if the table has no
/// such operator.
#[must_use]
pub fn infix_op(symbol: &str) -> Option<InfixOp> {
    let (precedence, func): (i32, BinaryFn) = match symbol {
        "*" => (PREC_MULTIPLICATIVE, Arc::new(mul)),
        "/" => (PREC_MULTIPLICATIVE, Arc::new(div)),
        "%" => (PREC_MULTIPLICATIVE, Arc::new(rem)),
        "+" => (PREC_ADDITIVE, Arc::new(add)),
        "-" => (PREC_ADDITIVE, Arc::new(sub)),
        "<" => (PREC_COMPARISON, Arc::new(|l: &Object, r: &Object| Ok(Object::Bool(compare("<", l, r)?.is_lt())))),
        "<=" => (PREC_COMPARISON, Arc::new(|l: &Object, r: &Object| Ok(Object::Bool(compare("<=", l, r)?.is_le())))),
        ">" => (PREC_COMPARISON, Arc::new(|l: &Object, r: &Object| Ok(Object::Bool(compare(">", l, r)?.is_gt())))),
        ">=" => (PREC_COMPARISON, Arc::new(|l: &Object, r: &Object| Ok(Object::Bool(compare(">=", l, r)?.is_ge())))),
        "==" => (PREC_EQUALITY, Arc::new(|l: &Object, r: &Object| Ok(Object::Bool(equal(l, r))))),
        "!=" | "<>" => (PREC_EQUALITY, Arc::new(|l: &Object, r: &Object| Ok(Object::Bool(!equal(l, r))))),
        _ => return None,
    };
    Some(InfixOp::new(symbol, precedence, func))
}

/// The standard prefix operator for `symbol`, or `None` if the table has no
/// such operator.
#[must_use]
pub fn prefix_op(symbol: &str) -> Option<PrefixOp> {
    let func: UnaryFn = match symbol {
        "-" => Arc::new(negate),
        "!" | "not" => Arc::new(not),
        _ => return None,
    };
    Some(PrefixOp::new(symbol, func))
}

/// A standard infix operator node at the given source location.
#[must_use]
pub fn infix(offset: u32, length: u32, symbol: &str) -> Option<ExprRep> {
    infix_op(symbol).map(|op| ExprRep::new(offset, length, ExprKind::Infix(op)))
}

/// A standard prefix operator node at the given source location.
#[must_use]
pub fn prefix(offset: u32, length: u32, symbol: &str) -> Option<ExprRep> {
    prefix_op(symbol).map(|op| ExprRep::new(offset, length, ExprKind::Prefix(op)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(symbol: &str, left: Object, right: Object) -> HostResult {
        let node = infix(0, 1, symbol).unwrap();
        let ExprKind::Infix(op) = node.kind else { panic!("expected infix") };
        op.apply(&left, &right)
    }

    #[test]
    fn int_arithmetic_stays_int() {
        assert_eq!(apply("+", Object::Int(2), Object::Int(3)).unwrap(), Object::Int(5));
        assert_eq!(apply("*", Object::Int(2), Object::Int(3)).unwrap(), Object::Int(6));
    }

    #[test]
    fn mixed_arithmetic_promotes_to_float() {
        assert_eq!(apply("+", Object::Int(2), Object::Float(0.5)).unwrap(), Object::Float(2.5));
    }

    #[test]
    fn string_concatenation() {
        let result = apply("+", Object::Str("ab".to_owned()), Object::Str("c".to_owned())).unwrap();
        assert_eq!(result, Object::Str("abc".to_owned()));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let err = apply("/", Object::Int(1), Object::Int(0)).unwrap_err();
        assert!(err.contains("division by zero"));
    }

    #[test]
    fn comparison_crosses_numeric_kinds() {
        assert_eq!(apply("<", Object::Int(1), Object::Float(1.5)).unwrap(), Object::Bool(true));
    }

    #[test]
    fn equality_crosses_numeric_kinds() {
        assert_eq!(apply("==", Object::Int(2), Object::Float(2.0)).unwrap(), Object::Bool(true));
    }

    #[test]
    fn type_mismatch_is_reported() {
        let err = apply("-", Object::Str("a".to_owned()), Object::Int(1)).unwrap_err();
        assert!(err.contains("not defined"));
    }

    #[test]
    fn multiplicative_binds_tighter_than_additive() {
        assert!(PREC_MULTIPLICATIVE < PREC_ADDITIVE);
    }

    #[test]
    fn unknown_symbol_yields_none() {
        assert!(infix(0, 1, "**").is_none());
        assert!(prefix(0, 1, "~").is_none());
    }

    #[test]
    fn prefix_negate_and_not() {
        let neg = prefix_op("-").unwrap();
        assert_eq!(neg.apply(&Object::Int(4)).unwrap(), Object::Int(-4));
        let not_op = prefix_op("not").unwrap();
        assert_eq!(not_op.apply(&Object::Bool(true)).unwrap(), Object::Bool(false));
    }
}
