/// A scalar payload, converted to its canonical text before storage in an
/// event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScalarValue<'a> {
    Str(&'a str),
    Int(i64),
    Float(f64),
    /// Real and imaginary parts. Rendered as `"3 - 2im"` style text.
    Complex(f64, f64),
}

impl<'a> From<&'a str> for ScalarValue<'a> {
    #[inline]
    fn from(value: &'a str) -> Self {
        ScalarValue::Str(value)
    }
}

impl From<i64> for ScalarValue<'_> {
    #[inline]
    fn from(value: i64) -> Self {
        ScalarValue::Int(value)
    }
}

impl From<f64> for ScalarValue<'_> {
    #[inline]
    fn from(value: f64) -> Self {
        ScalarValue::Float(value)
    }
}

impl From<(f64, f64)> for ScalarValue<'_> {
    #[inline]
    fn from((re, im): (f64, f64)) -> Self {
        ScalarValue::Complex(re, im)
    }
}

impl ScalarValue<'_> {
    pub fn into_text(self) -> String {
        match self {
            ScalarValue::Str(s) => s.to_owned(),
            ScalarValue::Int(value) => {
                let mut buffer = itoa::Buffer::new();
                buffer.format(value).to_owned()
            }
            ScalarValue::Float(value) => {
                let mut text = String::new();
                push_float(&mut text, value);
                text
            }
            ScalarValue::Complex(re, im) => {
                let mut text = String::new();
                push_float(&mut text, re);
                text.push_str(if im.is_sign_negative() { " - " } else { " + " });
                push_float(&mut text, im.abs());
                text.push_str("im");
                text
            }
        }
    }
}

// ryu renders whole floats with a trailing ".0"; trim it so they read like
// integers.
fn push_float(out: &mut String, value: f64) {
    let mut buffer = ryu::Buffer::new();
    let text = buffer.format(value);
    out.push_str(text.strip_suffix(".0").unwrap_or(text));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn assert_text(value: impl Into<ScalarValue<'static>>, expected: &str) {
        assert_eq!(value.into().into_text(), expected);
    }

    #[test]
    fn integers() {
        assert_text(42, "42");
        assert_text(0, "0");
        assert_text(-17, "-17");
        assert_text(i64::MIN, "-9223372036854775808");
    }

    #[test]
    fn floats() {
        assert_text(3.5, "3.5");
        assert_text(3.0, "3");
        assert_text(-0.25, "-0.25");
        assert_text(1e100, "1e100");
    }

    #[test]
    fn complex() {
        assert_text((3.0, -2.0), "3 - 2im");
        assert_text((1.5, 2.0), "1.5 + 2im");
        assert_text((0.0, 0.5), "0 + 0.5im");
        assert_text((-1.0, -1.0), "-1 - 1im");
    }

    #[test]
    fn strings() {
        assert_text("hello", "hello");
        assert_text("", "");
    }
}
