use std::rc::Rc;

use lazy_static::lazy_static;
use num_bigint::BigInt;
use pest::Parser;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;

use crate::parser::{
    BinaryOp, Expr, ExprKind, FormatSegment, Literal, LogicalOp, ParseError, Span, UnaryOp,
};

lazy_static! {
    // Note: precedence is defined lowest to highest.
    static ref PRATT_PARSER: PrattParser<Rule> = PrattParser::new()
        // (lowest precedence)
        .op(Op::prefix(Rule::lambda_op) | Op::prefix(Rule::if_op)) // `(x) =>`, `if .. then .. else`

        // `a f b` is `f(a, b)`.
        .op(Op::infix(Rule::dual_call, Assoc::Left))

        // Nil handling.
        .op(Op::infix(Rule::coalesce, Assoc::Right) | Op::infix(Rule::chain, Assoc::Right))

        // Logical operators.
        .op(Op::infix(Rule::or, Assoc::Left))
        .op(Op::infix(Rule::and, Assoc::Left))

        // Membership, then comparisons.
        .op(Op::infix(Rule::in_op, Assoc::Left))
        .op(
            Op::infix(Rule::eq, Assoc::Left) |
            Op::infix(Rule::not_eq, Assoc::Left) |
            Op::infix(Rule::lt, Assoc::Left) |
            Op::infix(Rule::le, Assoc::Left) |
            Op::infix(Rule::gt, Assoc::Left) |
            Op::infix(Rule::ge, Assoc::Left)
        )

        // Arithmetic operators.
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(
            Op::infix(Rule::mul, Assoc::Left) |
            Op::infix(Rule::div, Assoc::Left) |
            Op::infix(Rule::int_div, Assoc::Left) |
            Op::infix(Rule::modulo, Assoc::Left)
        )
        .op(Op::prefix(Rule::neg) | Op::prefix(Rule::not))
        .op(Op::infix(Rule::pow, Assoc::Right))

        // Postfix operators.
        .op(
            Op::postfix(Rule::call_op) |
            Op::postfix(Rule::index_op) |
            Op::postfix(Rule::member_op) |
            Op::postfix(Rule::safe_member_op)
        )
        // (highest precedence)
        ;
}

#[derive(Parser)]
#[grammar = "parser/expression.pest"]
pub struct ExpressionParser;

type PestError = pest::error::Error<Rule>;

fn custom_error(message: impl Into<String>, span: pest::Span<'_>) -> PestError {
    PestError::new_from_span(
        pest::error::ErrorVariant::CustomError {
            message: message.into(),
        },
        span,
    )
}

fn next_inner<'i>(
    pairs: &mut impl Iterator<Item = Pair<'i, Rule>>,
    what: &str,
    span: pest::Span<'_>,
) -> Result<Pair<'i, Rule>, PestError> {
    pairs
        .next()
        .ok_or_else(|| custom_error(format!("missing {}", what), span))
}

fn boxed(expr: Expr) -> Box<Expr> {
    Box::new(expr)
}

fn join_span(a: &Span, b: &Span) -> Span {
    Span::new(a.range.start..b.range.end.max(a.range.end), a.line, a.column)
}

pub fn parse_expr(pair: Pair<Rule>) -> Result<Expr, PestError> {
    let span = Span::from(pair.as_span());
    match pair.as_rule() {
        Rule::main => {
            let pair_span = pair.as_span();
            parse_expr(next_inner(
                &mut pair.into_inner(),
                "expression",
                pair_span,
            )?)
        }

        Rule::expression => parse_pratt(pair),

        Rule::nil_lit => Ok(Expr::new(ExprKind::Literal(Literal::Nil), span)),

        Rule::boolean => {
            let value = pair.as_str().eq_ignore_ascii_case("true");
            Ok(Expr::new(ExprKind::Literal(Literal::Bool(value)), span))
        }

        Rule::integer => {
            let text = pair.as_str().trim_end_matches(['l', 'L']);
            let literal = match text.parse::<i64>() {
                Ok(value) => Literal::Int(value),
                Err(_) => {
                    let value = text
                        .parse::<BigInt>()
                        .map_err(|_| custom_error("invalid integer literal", pair.as_span()))?;
                    Literal::BigInt(Rc::new(value))
                }
            };
            Ok(Expr::new(ExprKind::Literal(literal), span))
        }

        Rule::float => {
            let value = pair
                .as_str()
                .parse::<f64>()
                .map_err(|_| custom_error("invalid float literal", pair.as_span()))?;
            Ok(Expr::new(ExprKind::Literal(Literal::Float(value)), span))
        }

        Rule::string => {
            let pair_span = pair.as_span();
            let inner = next_inner(&mut pair.into_inner(), "string body", pair_span)?;
            let text = unescape(inner.as_str(), inner.as_span())?;
            Ok(Expr::new(ExprKind::Literal(Literal::Str(text)), span))
        }

        Rule::format_string => {
            let mut segments = Vec::new();
            for part in pair.into_inner() {
                match part.as_rule() {
                    Rule::fmt_text_dq | Rule::fmt_text_sq => {
                        segments.push(FormatSegment::Text(unescape(part.as_str(), part.as_span())?));
                    }
                    Rule::fmt_expr => {
                        let part_span = part.as_span();
                        let inner = next_inner(&mut part.into_inner(), "expression", part_span)?;
                        segments.push(FormatSegment::Expr(parse_expr(inner)?));
                    }
                    _ => return Err(custom_error("unexpected format segment", part.as_span())),
                }
            }
            Ok(Expr::new(ExprKind::FormatStr(segments), span))
        }

        Rule::list => {
            let items = pair
                .into_inner()
                .map(parse_expr)
                .collect::<Result<_, _>>()?;
            Ok(Expr::new(ExprKind::List(items), span))
        }

        Rule::kvc | Rule::naked_kvc => parse_kvc(pair),

        Rule::case_expr => {
            let mut arms = Vec::new();
            let mut default = None;
            for part in pair.into_inner() {
                match part.as_rule() {
                    Rule::kw_case => {}
                    Rule::case_arm => {
                        let part_span = part.as_span();
                        let mut inner = part.into_inner();
                        let cond = parse_expr(next_inner(&mut inner, "case condition", part_span)?)?;
                        let value = parse_expr(next_inner(&mut inner, "case value", part_span)?)?;
                        arms.push((cond, value));
                    }
                    Rule::case_default => {
                        let part_span = part.as_span();
                        let inner = next_inner(&mut part.into_inner(), "case default", part_span)?;
                        default = Some(boxed(parse_expr(inner)?));
                    }
                    _ => return Err(custom_error("unexpected case part", part.as_span())),
                }
            }
            Ok(Expr::new(ExprKind::Case { arms, default }, span))
        }

        Rule::grouped => {
            let pair_span = pair.as_span();
            parse_expr(next_inner(&mut pair.into_inner(), "expression", pair_span)?)
        }

        Rule::ident => Ok(Expr::new(ExprKind::Ident(pair.as_str().to_string()), span)),

        _ => Err(custom_error(
            format!("Unhandled rule: {:?}", pair.as_rule()),
            pair.as_span(),
        )),
    }
}

fn parse_pratt(pair: Pair<Rule>) -> Result<Expr, PestError> {
    PRATT_PARSER
        .map_primary(parse_expr)
        .map_prefix(|op, rhs| {
            let op_span = Span::from(op.as_span());
            let rhs = rhs?;
            let span = join_span(&op_span, &rhs.span);
            match op.as_rule() {
                Rule::neg => Ok(Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Neg,
                        expr: boxed(rhs),
                    },
                    span,
                )),
                Rule::not => Ok(Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Not,
                        expr: boxed(rhs),
                    },
                    span,
                )),
                Rule::if_op => {
                    let op_pest_span = op.as_span();
                    let mut branches = op.into_inner().filter(|p| p.as_rule() == Rule::expression);
                    let cond = parse_expr(next_inner(&mut branches, "condition", op_pest_span)?)?;
                    let then_branch =
                        parse_expr(next_inner(&mut branches, "then branch", op_pest_span)?)?;
                    Ok(Expr::new(
                        ExprKind::If {
                            cond: boxed(cond),
                            then_branch: boxed(then_branch),
                            else_branch: boxed(rhs),
                        },
                        span,
                    ))
                }
                Rule::lambda_op => {
                    let params: Vec<String> = op
                        .into_inner()
                        .filter(|p| p.as_rule() == Rule::lambda_params)
                        .flat_map(|p| p.into_inner())
                        .map(|p| p.as_str().to_string())
                        .collect();
                    Ok(Expr::new(
                        ExprKind::Lambda {
                            params: params.into(),
                            body: Rc::new(rhs),
                        },
                        span,
                    ))
                }
                _ => Err(custom_error(
                    format!("Unknown prefix operator: {:?}", op.as_rule()),
                    op.as_span(),
                )),
            }
        })
        .map_infix(|lhs, op, rhs| {
            let lhs = lhs?;
            let rhs = rhs?;
            let span = join_span(&lhs.span, &rhs.span);
            let logical = match op.as_rule() {
                Rule::and => Some(LogicalOp::And),
                Rule::or => Some(LogicalOp::Or),
                Rule::coalesce => Some(LogicalOp::Coalesce),
                Rule::chain => Some(LogicalOp::Chain),
                _ => None,
            };
            if let Some(logical) = logical {
                let kind = ExprKind::Logical {
                    op: logical,
                    left: boxed(lhs),
                    right: boxed(rhs),
                };
                return Ok(Expr::new(kind, span));
            }
            let kind = match op.as_rule() {
                Rule::dual_call => {
                    let op_span = op.as_span();
                    let name = next_inner(&mut op.into_inner(), "function name", op_span)?;
                    let callable = Expr::new(
                        ExprKind::Ident(name.as_str().to_string()),
                        Span::from(name.as_span()),
                    );
                    ExprKind::Call {
                        callable: boxed(callable),
                        args: vec![lhs, rhs],
                    }
                }
                rule => {
                    let op = match rule {
                        Rule::add => BinaryOp::Add,
                        Rule::sub => BinaryOp::Sub,
                        Rule::mul => BinaryOp::Mul,
                        Rule::div => BinaryOp::Div,
                        Rule::int_div => BinaryOp::IntDiv,
                        Rule::modulo => BinaryOp::Mod,
                        Rule::pow => BinaryOp::Pow,
                        Rule::eq => BinaryOp::Eq,
                        Rule::not_eq => BinaryOp::NotEq,
                        Rule::lt => BinaryOp::Lt,
                        Rule::le => BinaryOp::Le,
                        Rule::gt => BinaryOp::Gt,
                        Rule::ge => BinaryOp::Ge,
                        Rule::in_op => BinaryOp::In,
                        _ => {
                            return Err(custom_error(
                                format!("Unknown binary operator: {:?}", rule),
                                op.as_span(),
                            ));
                        }
                    };
                    ExprKind::Binary {
                        op,
                        left: boxed(lhs),
                        right: boxed(rhs),
                    }
                }
            };
            Ok(Expr::new(kind, span))
        })
        .map_postfix(|lhs, op| {
            let lhs = lhs?;
            let span = join_span(&lhs.span, &Span::from(op.as_span()));
            let op_span = op.as_span();
            let kind = match op.as_rule() {
                Rule::call_op => {
                    let args = op.into_inner().map(parse_expr).collect::<Result<_, _>>()?;
                    ExprKind::Call {
                        callable: boxed(lhs),
                        args,
                    }
                }
                Rule::index_op => {
                    let index = parse_expr(next_inner(&mut op.into_inner(), "index", op_span)?)?;
                    ExprKind::Index {
                        value: boxed(lhs),
                        index: boxed(index),
                    }
                }
                Rule::member_op | Rule::safe_member_op => {
                    let safe = op.as_rule() == Rule::safe_member_op;
                    let key = next_inner(&mut op.into_inner(), "member name", op_span)?;
                    ExprKind::Member {
                        value: boxed(lhs),
                        key: key.as_str().to_string(),
                        safe,
                    }
                }
                rule => {
                    return Err(custom_error(
                        format!("Unknown postfix operator: {:?}", rule),
                        op_span,
                    ));
                }
            };
            Ok(Expr::new(kind, span))
        })
        .parse(pair.into_inner())
}

fn parse_kvc(pair: Pair<Rule>) -> Result<Expr, PestError> {
    let span = Span::from(pair.as_span());
    let mut entries: Vec<(String, Rc<Expr>)> = Vec::new();
    let mut result = None;

    for item in pair.into_inner() {
        let item_span = item.as_span();
        match item.as_rule() {
            Rule::kvc_entry => {
                let mut inner = item.into_inner();
                let key_pair = next_inner(&mut inner, "key", item_span)?;
                let key = match key_pair.as_rule() {
                    Rule::string => {
                        let key_span = key_pair.as_span();
                        let body = next_inner(&mut key_pair.into_inner(), "key", key_span)?;
                        unescape(body.as_str(), body.as_span())?
                    }
                    _ => key_pair.as_str().to_string(),
                };
                let value = parse_expr(next_inner(&mut inner, "value", item_span)?)?;
                if entries.iter().any(|(k, _)| k.eq_ignore_ascii_case(&key)) {
                    return Err(custom_error(format!("duplicate key '{}'", key), item_span));
                }
                entries.push((key, Rc::new(value)));
            }
            Rule::kvc_result => {
                if result.is_some() {
                    return Err(custom_error("only one eval clause is allowed", item_span));
                }
                let expr = item
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::expression)
                    .ok_or_else(|| custom_error("missing eval expression", item_span))?;
                result = Some(boxed(parse_expr(expr)?));
            }
            rule => {
                return Err(custom_error(
                    format!("unexpected collection item: {:?}", rule),
                    item_span,
                ));
            }
        }
    }

    Ok(Expr::new(ExprKind::Kvc { entries, result }, span))
}

/// Resolve backslash escapes in a string literal body.
fn unescape(raw: &str, span: pest::Span<'_>) -> Result<String, PestError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let ch = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| custom_error("invalid unicode escape", span))?;
                out.push(ch);
            }
            Some(other) => out.push(other),
            None => return Err(custom_error("dangling escape", span)),
        }
    }
    Ok(out)
}

/// Parse a source text into an expression tree.
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let mut pairs = ExpressionParser::parse(Rule::main, source)
        .map_err(|e| crate::parser::error::convert_pest_error(e, source))?;
    let pair = pairs.next().ok_or_else(|| ParseError::empty(source))?;
    parse_expr(pair).map_err(|e| crate::parser::error::convert_pest_error(e, source))
}
