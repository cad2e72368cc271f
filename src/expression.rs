// src/expression.rs
use crate::context::Context;
use crate::errors::{EvalError, Result};
use crate::functions::Registry;
use crate::parser::{parse_literal, Parser};
use crate::path;
use crate::statics::{self, TypeRegistry};
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;

/// `NAME(args)` spanning the whole expression; `args` runs to the last `)`.
static FUNCTION_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^(\w+)\((.*)\)$").expect("invalid function call pattern"));

/// Any call name inside argument text, nested or not.
static CALL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)\(").expect("invalid call name pattern"));

/// Evaluates single expressions against one context.
pub struct Evaluator<'a> {
    pub ctx: &'a Context,
    pub functions: &'a Registry,
    pub types: &'a TypeRegistry,
    pub max_depth: usize,
}

impl Evaluator<'_> {
    pub fn eval(&self, expr: &str) -> Result<Value> {
        self.eval_at(expr.trim(), 0)
    }

    // `depth` counts the function calls enclosing `expr`.
    fn eval_at(&self, expr: &str, depth: usize) -> Result<Value> {
        if let Some(caps) = FUNCTION_CALL.captures(expr) {
            let name = &caps[1];
            if self.functions.get(name).is_none() {
                return Err(EvalError::UnknownFunction(name.to_string()));
            }
            let level = depth + 1;
            if level > self.max_depth {
                // Unknown names below the limit still abort the render.
                if let Some(unknown) = self.first_unknown_call(&caps[2]) {
                    return Err(EvalError::UnknownFunction(unknown.to_string()));
                }
                return Err(EvalError::NestingTooDeep { limit: self.max_depth });
            }
            let args = self.eval_args(&caps[2], level)?;
            return self.functions.dispatch(name, &args);
        }
        if let Some(v) = special(expr) {
            return Ok(v);
        }
        if let Some(v) = parse_literal(expr) {
            return Ok(v);
        }
        Ok(path::resolve(expr, self.ctx, self.types))
    }

    fn first_unknown_call<'t>(&self, text: &'t str) -> Option<&'t str> {
        CALL_NAME
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .find(|name| self.functions.get(name).is_none())
    }

    // Every argument is evaluated so an unknown function anywhere is reported,
    // even when an earlier argument already failed.
    fn eval_args(&self, text: &str, level: usize) -> Result<Vec<Value>> {
        let mut values = Vec::new();
        let mut first_err = None;
        for arg in Parser::new(text).split_args() {
            match self.eval_at(arg, level) {
                Ok(v) => values.push(v),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(values),
        }
    }
}

fn special(expr: &str) -> Option<Value> {
    let dt = if expr.eq_ignore_ascii_case("DateTime.Now") {
        statics::now_local()
    } else if expr.eq_ignore_ascii_case("DateTime.Today") {
        statics::today_local()
    } else if expr.eq_ignore_ascii_case("DateTime.UtcNow") {
        statics::now_utc()
    } else {
        return None;
    };
    Some(Value::DateTime(dt))
}
