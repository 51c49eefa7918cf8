use std::{fmt, fmt::Write};

use crate::SharedError;

/// A single argument to a [`Message`].
///
/// Values are rendered the way a generic "print anything" facility would: strings verbatim,
/// numbers in decimal, and lists as their elements separated by spaces inside `[...]`.
///
/// ```
/// # use may::Value;
/// let v = Value::from(vec![Value::from("a"), Value::from(1), Value::from(vec!["b", "c"])]);
/// assert_eq!(v.to_string(), "[a 1 [b c]]");
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Str(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    List(Vec<Value>),
    Error(SharedError),
}

impl Value {
    /// A short name for the kind of value, used in formatting diagnostics like
    /// `%!d(string=foo)`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Str(_) => "string",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Error(_) => "error",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("<nil>"),
            Value::Str(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{i}"),
            Value::Uint(u) => write!(f, "{u}"),
            Value::Float(x) => f.write_str(&shortest_float(*x)),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Error(e) => write!(f, "{e}"),
            Value::List(items) => fmt::Display::fmt(&ListRef(items), f),
        }
    }
}

macro_rules! value_from {
    ($variant:ident as $target:ty: $($source:ty),+) => {
        $(
            impl From<$source> for Value {
                fn from(v: $source) -> Self {
                    Value::$variant(v as $target)
                }
            }
        )+
    };
}

value_from!(Int as i64: i8, i16, i32, i64, isize);
value_from!(Uint as u64: u8, u16, u32, u64, usize);
value_from!(Float as f64: f32, f64);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(s.clone())
    }
}

impl From<SharedError> for Value {
    fn from(e: SharedError) -> Self {
        Value::Error(e)
    }
}

impl From<&SharedError> for Value {
    fn from(e: &SharedError) -> Self {
        Value::Error(e.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value> + Clone> From<&[T]> for Value {
    fn from(items: &[T]) -> Self {
        Value::List(items.iter().cloned().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(items: [T; N]) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// The contextual message attached to an error, built from a "message and arguments" list.
///
/// Use [`Message::from_args`], or more conveniently the [`msg!`](crate::msg) macro, to classify
/// an argument list:
///
/// ```
/// # use may::{msg, Message};
/// assert!(matches!(msg!(), Message::Empty));
/// assert!(matches!(msg!("plain"), Message::Plain(_)));
/// assert!(matches!(msg!("with %s", "args"), Message::Format(..)));
/// assert!(matches!(msg!(vec!["a", "b"]), Message::Value(_)));
/// assert!(matches!(msg!(vec!["a", "b"], "c"), Message::Values(_)));
/// ```
#[derive(Debug, Clone, Default)]
pub enum Message {
    /// No arguments.
    #[default]
    Empty,

    /// A single string, used verbatim without interpreting `%` sequences.
    Plain(String),

    /// A printf-style template followed by the values it consumes.
    Format(String, Vec<Value>),

    /// A single argument which is not a string, rendered generically.
    Value(Value),

    /// Several arguments whose first is not a string, rendered generically as one list.
    Values(Vec<Value>),
}

impl Message {
    pub fn from_args(mut args: Vec<Value>) -> Self {
        match args.len() {
            0 => Message::Empty,
            1 => match args.pop() {
                Some(Value::Str(s)) => Message::Plain(s),
                Some(other) => Message::Value(other),
                None => Message::Empty,
            },
            _ => match args.remove(0) {
                Value::Str(template) => Message::Format(template, args),
                first => {
                    args.insert(0, first);
                    Message::Values(args)
                }
            },
        }
    }

    /// The argument list this message was built from.
    pub fn args(&self) -> Vec<Value> {
        match self {
            Message::Empty => vec![],
            Message::Plain(s) => vec![Value::Str(s.clone())],
            Message::Format(template, values) => std::iter::once(Value::Str(template.clone()))
                .chain(values.iter().cloned())
                .collect(),
            Message::Value(v) => vec![v.clone()],
            Message::Values(values) => values.clone(),
        }
    }

    /// Renders the message to a string. An empty message renders as `""`.
    ///
    /// ```
    /// # use may::msg;
    /// assert_eq!(msg!().render(), "");
    /// assert_eq!(msg!("100%s sure").render(), "100%s sure");
    /// assert_eq!(msg!("error occurred: %s", "foo").render(), "error occurred: foo");
    /// assert_eq!(msg!(vec!["error occurred", "foo"], "bar").render(), "[[error occurred foo] bar]");
    /// ```
    pub fn render(&self) -> String {
        match self {
            Message::Empty => String::new(),
            Message::Plain(s) => s.clone(),
            Message::Format(template, values) => sprintf(template, values),
            Message::Value(v) => v.to_string(),
            // Rendered exactly like a list value
            Message::Values(values) => ListRef(values).to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Message::Empty)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<()> for Message {
    fn from(_: ()) -> Self {
        Message::Empty
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::Plain(s.to_owned())
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::Plain(s)
    }
}

impl From<Vec<Value>> for Message {
    fn from(args: Vec<Value>) -> Self {
        Message::from_args(args)
    }
}

struct ListRef<'a>(&'a [Value]);

impl fmt::Display for ListRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('[')?;
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char(' ')?;
            }
            write!(f, "{item}")?;
        }
        f.write_char(']')
    }
}

/// Builds a [`Message`] from a "message and arguments" list.
///
/// ```
/// # use may::msg;
/// let m = msg!("operation shouldn't fail with %s", "foo");
/// assert_eq!(m.render(), "operation shouldn't fail with foo");
/// ```
#[macro_export]
macro_rules! msg {
    () => {
        $crate::Message::Empty
    };
    ($($arg:expr),+ $(,)?) => {
        $crate::Message::from_args(vec![$($crate::Value::from($arg)),+])
    };
}

/// Renders values separated by spaces, followed by a newline.
///
/// This is the default joining a plain "print these values" function applies, and is a ready-made
/// print function for [`log_func_handler`](crate::log_func_handler).
///
/// ```
/// # use may::{sprintln, Value};
/// assert_eq!(sprintln(&[Value::from("a:"), Value::from(1)]), "a: 1\n");
/// ```
pub fn sprintln(values: &[Value]) -> String {
    let mut out = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{value}");
    }
    out.push('\n');
    out
}

/// Formats `values` into a printf-style `template`.
///
/// Supported verbs are `%v %s %d %f %t %q %x %X` and `%%`, with the flags `-+# 0`, a width and a
/// precision. Values are consumed left to right. A value of the wrong kind renders as
/// `%!d(string=foo)`, a missing value as `%!d(MISSING)`, and unused values are listed at the end
/// as `%!(EXTRA string=foo)`.
///
/// ```
/// # use may::{sprintf, Value};
/// assert_eq!(sprintf("%s=%06.1f", &["ratio".into(), 12.345.into()]), "ratio=0012.3");
/// assert_eq!(sprintf("%d", &["x".into()]), "%!d(string=x)");
/// assert_eq!(sprintf("%s %s", &["x".into()]), "x %!s(MISSING)");
/// ```
pub fn sprintf(template: &str, values: &[Value]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut values = values.iter();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut directive = Directive::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => directive.left = true,
                '0' => directive.zero = true,
                '+' => directive.plus = true,
                '#' => directive.sharp = true,
                ' ' => directive.space = true,
                _ => break,
            }
            chars.next();
        }
        match take_number(&mut chars) {
            Ok(width) => directive.width = width,
            Err(TooLarge) => out.push_str("%!(BADWIDTH)"),
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            match take_number(&mut chars) {
                Ok(precision) => directive.precision = Some(precision.unwrap_or(0)),
                Err(TooLarge) => out.push_str("%!(BADPREC)"),
            }
        }

        let Some(verb) = chars.next() else {
            out.push_str("%!(NOVERB)");
            break;
        };
        if verb == '%' {
            out.push('%');
            continue;
        }

        match values.next() {
            Some(value) => directive.write(&mut out, verb, value),
            None => {
                let _ = write!(out, "%!{verb}(MISSING)");
            }
        }
    }

    let extra: Vec<_> = values.collect();
    if !extra.is_empty() {
        out.push_str("%!(EXTRA ");
        for (i, value) in extra.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{}={value}", value.type_name());
        }
        out.push(')');
    }

    out
}

/// Widths and precisions above this are rejected rather than padded out.
const MAX_WIDTH: usize = 1_000_000;

struct TooLarge;

/// Reads a width or precision. All of its digits are consumed even when it is too large.
fn take_number(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Result<Option<usize>, TooLarge> {
    let mut number = Some(None);
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        number = number.and_then(|n: Option<usize>| {
            n.unwrap_or(0)
                .checked_mul(10)
                .and_then(|n| n.checked_add(digit as usize))
                .filter(|n| *n <= MAX_WIDTH)
                .map(Some)
        });
        chars.next();
    }
    number.ok_or(TooLarge)
}

/// Renders a float the way `%v` does: shortest digits, switching to exponent form for very
/// large or very small magnitudes.
fn shortest_float(x: f64) -> String {
    if x.is_nan() {
        return "NaN".to_owned();
    }
    if x.is_infinite() {
        return if x > 0.0 { "+Inf" } else { "-Inf" }.to_owned();
    }
    if x == 0.0 {
        return x.to_string();
    }

    let scientific = format!("{x:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return x.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return x.to_string();
    };
    if (-4..6).contains(&exponent) {
        x.to_string()
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
    }
}

#[derive(Debug, Default)]
struct Directive {
    left: bool,
    zero: bool,
    plus: bool,
    sharp: bool,
    space: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

impl Directive {
    fn write(&self, out: &mut String, verb: char, value: &Value) {
        let body = match (verb, value) {
            ('v', _) => Some(self.generic(value)),
            ('s', Value::Str(_) | Value::Error(_) | Value::List(_) | Value::Nil) => {
                Some(self.truncate(value.to_string()))
            }
            ('d', Value::Int(i)) => {
                Some(self.signed(self.min_digits(i.unsigned_abs().to_string()), *i < 0))
            }
            ('d', Value::Uint(u)) => Some(self.signed(self.min_digits(u.to_string()), false)),
            ('f', Value::Float(x)) => {
                let precision = self.precision.unwrap_or(6);
                Some(self.signed(format!("{:.*}", precision, x.abs()), x.is_sign_negative()))
            }
            ('t', Value::Bool(b)) => Some(b.to_string()),
            ('q', Value::Str(s)) => Some(format!("{s:?}")),
            ('x' | 'X', Value::Int(_) | Value::Uint(_) | Value::Str(_)) => {
                Some(self.hex(verb, value))
            }
            _ => None,
        };

        // A precision on an integer replaces zero padding
        let zero = self.zero && !(verb == 'd' && self.precision.is_some());
        match body {
            Some(body) => self.pad(out, body, zero),
            None => {
                let _ = write!(out, "%!{verb}({}={value})", value.type_name());
            }
        }
    }

    fn generic(&self, value: &Value) -> String {
        match value {
            Value::Int(i) => self.signed(i.to_string(), *i < 0),
            Value::Float(x) => match self.precision {
                Some(p) => self.signed(format!("{:.*}", p, x.abs()), x.is_sign_negative()),
                None => value.to_string(),
            },
            Value::Str(_) => self.truncate(value.to_string()),
            _ => value.to_string(),
        }
    }

    fn truncate(&self, s: String) -> String {
        match self.precision {
            Some(p) => s.chars().take(p).collect(),
            None => s,
        }
    }

    /// Applies the `+` and space flags to a number's digits, given without a sign.
    fn signed(&self, digits: String, negative: bool) -> String {
        let digits = digits.trim_start_matches('-');
        let sign = if negative {
            "-"
        } else if self.plus {
            "+"
        } else if self.space {
            " "
        } else {
            ""
        };
        format!("{sign}{digits}")
    }

    fn hex(&self, verb: char, value: &Value) -> String {
        let (negative, digits) = match value {
            Value::Int(i) => (*i < 0, format!("{:x}", i.unsigned_abs())),
            Value::Uint(u) => (false, format!("{u:x}")),
            Value::Str(s) => (false, s.bytes().map(|b| format!("{b:02x}")).collect()),
            _ => (false, String::new()),
        };
        let prefix = if self.sharp { "0x" } else { "" };
        let body = self.signed(format!("{prefix}{digits}"), negative);
        if verb == 'X' {
            body.to_uppercase()
        } else {
            body
        }
    }

    /// Left-pads integer digits with zeros up to the precision.
    fn min_digits(&self, digits: String) -> String {
        match self.precision {
            Some(p) if p > digits.len() => format!("{}{digits}", "0".repeat(p - digits.len())),
            _ => digits,
        }
    }

    fn pad(&self, out: &mut String, body: String, zero: bool) {
        let len = body.chars().count();
        let width = self.width.unwrap_or(0);
        if len >= width {
            out.push_str(&body);
            return;
        }

        let fill = width - len;
        if self.left {
            out.push_str(&body);
            out.extend(std::iter::repeat(' ').take(fill));
        } else if zero {
            // Zeros go after the sign
            let (sign, digits) = match body.chars().next() {
                Some(c @ ('-' | '+' | ' ')) => (Some(c), &body[1..]),
                _ => (None, body.as_str()),
            };
            out.extend(sign);
            out.extend(std::iter::repeat('0').take(fill));
            out.push_str(digits);
        } else {
            out.extend(std::iter::repeat(' ').take(fill));
            out.push_str(&body);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{msg, shared};

    #[test]
    fn empty_message_renders_empty() {
        assert_eq!(msg!().render(), "");
        assert_eq!(Message::from_args(vec![]).render(), "");
        assert!(Message::from(()).is_empty());
    }

    #[test]
    fn single_string_is_not_interpreted() {
        assert_eq!(msg!("error occurred").render(), "error occurred");
        assert_eq!(msg!("50%d off").render(), "50%d off");
    }

    #[test]
    fn format_consumes_values_in_order() {
        assert_eq!(msg!("error occurred: %s", "foo").render(), "error occurred: foo");
        assert_eq!(
            msg!("%s failed %d times (%t)", "sync", 3, true).render(),
            "sync failed 3 times (true)"
        );
        assert_eq!(msg!("%v and %v", vec![1, 2], 2.5).render(), "[1 2] and 2.5");
    }

    #[test]
    fn format_reports_mismatched_missing_and_extra_values() {
        assert_eq!(msg!("%d", "foo").render(), "%!d(string=foo)");
        assert_eq!(msg!("%s and %s", "foo").render(), "foo and %!s(MISSING)");
        assert_eq!(msg!("%s", "foo", 1, "bar").render(), "foo%!(EXTRA int=1, string=bar)");
        assert_eq!(msg!("%s", vec!["a", "b"]).render(), "[a b]");
        assert_eq!(msg!("trailing %", 1).render(), "trailing %!(NOVERB)%!(EXTRA int=1)");
    }

    #[test]
    fn format_flags_width_and_precision() {
        assert_eq!(sprintf("[%5d]", &[42.into()]), "[   42]");
        assert_eq!(sprintf("[%-5d]", &[42.into()]), "[42   ]");
        assert_eq!(sprintf("[%05d]", &[(-42).into()]), "[-0042]");
        assert_eq!(sprintf("%+d", &[7.into()]), "+7");
        assert_eq!(sprintf("%.2f", &[2.0f64.into()]), "2.00");
        assert_eq!(sprintf("%f", &[0.5f64.into()]), "0.500000");
        assert_eq!(sprintf("%.3s", &["abcdef".into()]), "abc");
        assert_eq!(sprintf("%x %#X", &[255.into(), 255u8.into()]), "ff 0XFF");
        assert_eq!(sprintf("%q", &["hi".into()]), "\"hi\"");
        assert_eq!(sprintf("100%%", &[]), "100%");
    }

    #[test]
    fn oversized_width_and_precision_are_rejected() {
        assert_eq!(msg!("%99999999999999999999d", 1).render(), "%!(BADWIDTH)1");
        assert_eq!(sprintf("[%2000000d]", &[7.into()]), "[%!(BADWIDTH)7]");
        assert_eq!(
            sprintf("%.99999999999999999999f", &[0.5f64.into()]),
            "%!(BADPREC)0.500000"
        );
        assert_eq!(sprintf("%5.3000000s|", &["abc".into()]), "%!(BADPREC)  abc|");
    }

    #[test]
    fn integer_precision_sets_minimum_digits() {
        assert_eq!(sprintf("%.3d", &[7.into()]), "007");
        assert_eq!(sprintf("%.3d", &[(-7).into()]), "-007");
        assert_eq!(sprintf("%06.3d", &[7.into()]), "   007");
        assert_eq!(sprintf("%.1d", &[1234.into()]), "1234");
    }

    #[test]
    fn generic_floats_switch_to_exponent_form() {
        assert_eq!(msg!("%v", 1e21).render(), "1e+21");
        assert_eq!(msg!("%v", 1e6).render(), "1e+06");
        assert_eq!(msg!("%v", 1234567.0).render(), "1.234567e+06");
        assert_eq!(msg!("%v", 123456.5).render(), "123456.5");
        assert_eq!(msg!("%v", 0.0001).render(), "0.0001");
        assert_eq!(msg!("%v", 0.000015).render(), "1.5e-05");
        assert_eq!(msg!("%v", -2.5e-300).render(), "-2.5e-300");
        assert_eq!(msg!("%v %v", f64::INFINITY, f64::NAN).render(), "+Inf NaN");
        assert_eq!(msg!("%d", 1e21).render(), "%!d(float=1e+21)");
    }

    #[test]
    fn generic_rendering_of_non_string_first_argument() {
        assert_eq!(msg!(vec!["error occurred", "foo"]).render(), "[error occurred foo]");
        assert_eq!(
            msg!(vec!["error occurred", "foo"], "bar").render(),
            "[[error occurred foo] bar]"
        );
        assert_eq!(msg!(1, "a", vec!["b"]).render(), "[1 a [b]]");
        assert_eq!(msg!(42).render(), "42");
    }

    #[test]
    fn generic_rendering_of_empty_and_nested_lists() {
        let empty: Vec<Value> = vec![];
        assert_eq!(msg!(empty.clone()).render(), "[]");
        assert_eq!(msg!(empty, Value::Nil).render(), "[[] <nil>]");
        assert_eq!(
            msg!(vec![vec![vec![1]]], Option::<i32>::None).render(),
            "[[[[1]]] <nil>]"
        );
    }

    #[test]
    fn errors_render_by_display() {
        let err = shared("boom");
        assert_eq!(msg!("failed: %v", err.clone()).render(), "failed: boom");
        assert_eq!(msg!(err).render(), "boom");
    }

    #[test]
    fn rendering_is_deterministic() {
        let m = msg!("%s-%d", "x", 1);
        assert_eq!(m.render(), m.render());
    }

    #[test]
    fn args_round_trip_through_classification() {
        let m = msg!("with %s", "foo");
        assert_eq!(Message::from_args(m.args()).render(), "with foo");
        assert_eq!(msg!(vec!["a"], "b").args().len(), 2);
    }

    #[test]
    fn sprintln_joins_with_spaces() {
        assert_eq!(sprintln(&[]), "\n");
        assert_eq!(sprintln(&["a:".into(), shared("b").into()]), "a: b\n");
    }
}
