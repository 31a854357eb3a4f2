//! Integer constant expression evaluation for enumerator initializers.

use std::collections::HashMap;

use tree_sitter::Node;

pub struct ConstEvaluator<'a> {
    source: &'a str,
    known: &'a HashMap<String, i64>,
}

impl<'a> ConstEvaluator<'a> {
    pub fn new(source: &'a str, known: &'a HashMap<String, i64>) -> Self {
        Self { source, known }
    }

    fn text(&self, node: Node) -> &'a str {
        self.source.get(node.start_byte()..node.end_byte()).unwrap_or("")
    }

    pub fn evaluate(&self, node: Node) -> Option<i64> {
        match node.kind() {
            "number_literal" => parse_integer_literal(self.text(node)),
            "char_literal" => parse_char_literal(self.text(node)),
            "true" => Some(1),
            "false" => Some(0),
            "identifier" => self.known.get(self.text(node)).copied(),
            "parenthesized_expression" => {
                let mut cursor = node.walk();
                let inner = node.named_children(&mut cursor).next()?;
                self.evaluate(inner)
            }
            "cast_expression" => self.evaluate(node.child_by_field_name("value")?),
            "unary_expression" => {
                let operator = self.text(node.child_by_field_name("operator")?);
                let value = self.evaluate(node.child_by_field_name("argument")?)?;
                match operator {
                    "-" => value.checked_neg(),
                    "+" => Some(value),
                    "~" => Some(!value),
                    "!" => Some((value == 0) as i64),
                    _ => None,
                }
            }
            "binary_expression" => {
                let operator = self.text(node.child_by_field_name("operator")?);
                let left = self.evaluate(node.child_by_field_name("left")?)?;
                let right = self.evaluate(node.child_by_field_name("right")?)?;
                binary(operator, left, right)
            }
            "conditional_expression" => {
                let condition = self.evaluate(node.child_by_field_name("condition")?)?;
                if condition != 0 {
                    self.evaluate(node.child_by_field_name("consequence")?)
                } else {
                    self.evaluate(node.child_by_field_name("alternative")?)
                }
            }
            _ => None,
        }
    }
}

fn binary(operator: &str, left: i64, right: i64) -> Option<i64> {
    match operator {
        "+" => left.checked_add(right),
        "-" => left.checked_sub(right),
        "*" => left.checked_mul(right),
        "/" => left.checked_div(right),
        "%" => left.checked_rem(right),
        "<<" => u32::try_from(right).ok().and_then(|r| left.checked_shl(r)),
        ">>" => u32::try_from(right).ok().and_then(|r| left.checked_shr(r)),
        "&" => Some(left & right),
        "|" => Some(left | right),
        "^" => Some(left ^ right),
        "&&" => Some((left != 0 && right != 0) as i64),
        "||" => Some((left != 0 || right != 0) as i64),
        "==" => Some((left == right) as i64),
        "!=" => Some((left != right) as i64),
        "<" => Some((left < right) as i64),
        ">" => Some((left > right) as i64),
        "<=" => Some((left <= right) as i64),
        ">=" => Some((left >= right) as i64),
        _ => None,
    }
}

pub fn parse_integer_literal(text: &str) -> Option<i64> {
    let cleaned: String = text.chars().filter(|c| *c != '\'').collect();
    let lower = cleaned.to_ascii_lowercase();

    let (digits, radix) = if let Some(hex) = lower.strip_prefix("0x") {
        (hex.trim_end_matches(&['u', 'l', 'z'][..]), 16)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (bin.trim_end_matches(&['u', 'l', 'z'][..]), 2)
    } else {
        let trimmed = lower.trim_end_matches(&['u', 'l', 'z'][..]);
        if trimmed.len() > 1 && trimmed.starts_with('0') {
            (&trimmed[1..], 8)
        } else {
            (trimmed, 10)
        }
    };

    u64::from_str_radix(digits, radix).ok().map(|v| v as i64)
}

pub fn parse_char_literal(text: &str) -> Option<i64> {
    let start = text.find('\'')?;
    let inner = text.get(start + 1..text.len().checked_sub(1)?)?;
    let mut chars = inner.chars();
    let first = chars.next()?;
    if first != '\\' {
        return Some(first as i64);
    }

    let escaped = chars.next()?;
    let value = match escaped {
        'n' => 10,
        't' => 9,
        'r' => 13,
        '0'..='7' => {
            let octal: String = std::iter::once(escaped).chain(chars.take(2)).collect();
            return i64::from_str_radix(&octal, 8).ok();
        }
        'x' => {
            let hex: String = chars.collect();
            return i64::from_str_radix(&hex, 16).ok();
        }
        'a' => 7,
        'b' => 8,
        'f' => 12,
        'v' => 11,
        other => other as i64,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_literals() {
        assert_eq!(parse_integer_literal("1000"), Some(1000));
        assert_eq!(parse_integer_literal("0x1F"), Some(31));
        assert_eq!(parse_integer_literal("0XffUL"), Some(255));
        assert_eq!(parse_integer_literal("017"), Some(15));
        assert_eq!(parse_integer_literal("0b101"), Some(5));
        assert_eq!(parse_integer_literal("0"), Some(0));
        assert_eq!(parse_integer_literal("10u"), Some(10));
        assert_eq!(parse_integer_literal("1'000"), Some(1000));
        assert_eq!(parse_integer_literal("1.5"), None);
    }

    #[test]
    fn test_char_literals() {
        assert_eq!(parse_char_literal("'a'"), Some(97));
        assert_eq!(parse_char_literal("'\\n'"), Some(10));
        assert_eq!(parse_char_literal("'\\0'"), Some(0));
        assert_eq!(parse_char_literal("'\\x41'"), Some(65));
    }

    #[test]
    fn test_binary_operators() {
        assert_eq!(binary("<<", 1, 5), Some(32));
        assert_eq!(binary("|", 1, 2), Some(3));
        assert_eq!(binary("/", 1, 0), None);
    }
}
