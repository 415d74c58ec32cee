use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Bytes left alone in a URI component: alphanumerics plus `-_.~!'()*`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'!')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*');

/// Percent-encodes `input` for use inside a URI component.
///
/// Alphanumerics and `-_.~!'()*` stay as they are; every other byte of the
/// UTF-8 encoding becomes `%XX`.
#[must_use]
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, COMPONENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::encode_component;

    #[test]
    fn keeps_unreserved() {
        assert_eq!(encode_component("Gate-3_(A).~"), "Gate-3_(A).~");
        assert_eq!(encode_component("it's*!"), "it's*!");
    }

    #[test]
    fn escapes_reserved_and_utf8() {
        assert_eq!(encode_component("a b&c"), "a%20b%26c");
        assert_eq!(encode_component("x=1/2?#%"), "x%3D1%2F2%3F%23%25");
        assert_eq!(encode_component("天安门"), "%E5%A4%A9%E5%AE%89%E9%97%A8");
    }
}
