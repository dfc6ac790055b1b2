//! The `OK`/`ERR` + message envelope every RPC handler resolves to (spec
//! §7 "Propagation": "RPC methods return OK/ERR plus a message string; the
//! coordinator never throws across an RPC boundary").

/// The result of an RPC call: either a successful value, or an error
/// message string. Unlike a `Result<T, E>`, both variants are `Send +
/// 'static` plain data with no attached backtrace — this is what actually
/// crosses the wire, after `daemon` has converted any internal `Result`
/// into one of these two shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The call succeeded, producing `T`.
    Ok(T),
    /// The call failed; the string is the message surfaced to the caller.
    Err(String),
}

impl<T> Outcome<T> {
    /// Returns `true` if this is [`Outcome::Ok`].
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    /// Converts a `Result<T, E>` into an `Outcome<T>`, formatting the
    /// error with `Display`. This is the conversion point at the RPC
    /// boundary (spec §7): internal errors become status values here,
    /// never panics or unwinds.
    pub fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Ok(value),
            Err(err) => Outcome::Err(err.to_string()),
        }
    }

    /// Maps the success value, leaving an error message untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ok(value) => Outcome::Ok(f(value)),
            Outcome::Err(message) => Outcome::Err(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Outcome;

    #[test]
    fn from_result_preserves_ok_value() {
        let result: Result<u32, std::io::Error> = Ok(7);
        assert_eq!(Outcome::from_result(result), Outcome::Ok(7));
    }

    #[test]
    fn from_result_formats_error_with_display() {
        let result: Result<u32, &str> = Err("disk full");
        assert_eq!(
            Outcome::from_result(result),
            Outcome::Err("disk full".to_owned())
        );
    }

    #[test]
    fn map_transforms_ok_only() {
        assert_eq!(Outcome::Ok::<u32>(2).map(|v| v * 2), Outcome::Ok(4));
        assert_eq!(
            Outcome::Err::<u32>("x".to_owned()).map(|v| v * 2),
            Outcome::Err("x".to_owned())
        );
    }
}
