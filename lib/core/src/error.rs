//! Shared `Result` alias for resume-review.
//!
//! Crates keep their own error enums. Boundaries that stitch several layers
//! together (server bootstrap, journal setup) wrap those enums in a
//! rootcause [`Report`] so each layer can attach its own context.

use rootcause::Report;

/// Result over a rootcause [`Report`] whose context type defaults to `()`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    fn explode() -> Result<u8, Boom> {
        Err(Boom.into())
    }

    #[test]
    fn typed_context_converts_into_report() {
        let err = explode().expect_err("should fail");
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn ok_values_pass_through() {
        let ok: Result<&str> = Ok("fine");
        assert_eq!(ok.expect("should be ok"), "fine");
    }
}
