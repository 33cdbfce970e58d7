/// Below this much remaining native stack, recursion grows the stack first.
const RED_ZONE: usize = 100 * 1024;

/// Size of each additional stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub fn is_alphabetic(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[inline]
pub fn is_numeric(c: char) -> bool {
    c.is_ascii_digit()
}

#[inline]
pub fn is_alphanumeric(c: char) -> bool {
    is_alphabetic(c) || is_numeric(c)
}

/// Runs `f`, growing the native stack beforehand if it is close to exhausted.
///
/// The parser and evaluator wrap their recursive entry points in this, so the
/// configured depth limits are always reached before the host stack is.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_characters() {
        assert!(is_alphabetic('a'));
        assert!(is_alphabetic('_'));
        assert!(!is_alphabetic('1'));
        assert!(is_alphanumeric('9'));
        assert!(!is_alphanumeric('$'));
        assert!(!is_numeric(')'));
    }

    #[test]
    fn deep_recursion_grows_stack() {
        fn depth(n: u64) -> u64 {
            ensure_sufficient_stack(|| if n == 0 { 0 } else { depth(n - 1) + 1 })
        }

        assert_eq!(depth(100_000), 100_000);
    }
}
