use crate::rq::Representation;
use thiserror::Error;

/// The Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum encapsulating all the possible errors from this library.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Indicates an invalid modulus.
    #[error("Invalid modulus: {0}")]
    InvalidModulus(u64),

    /// Indicates an invalid polynomial degree.
    #[error("Invalid degree: {0} is not a power of 2 larger than 8")]
    InvalidDegree(usize),

    /// Indicates that polynomials with different contexts were mixed.
    #[error("Invalid context")]
    InvalidContext,

    /// Indicates that a polynomial has an unexpected representation.
    #[error("Incorrect representation: found {0:?}, expected {1:?}")]
    IncorrectRepresentation(Representation, Representation),

    /// Indicates a default error.
    #[error("{0}")]
    Default(String),
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Default(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::Error;
    use crate::rq::Representation;

    #[test]
    fn error_strings() {
        assert_eq!(
            Error::InvalidModulus(0).to_string(),
            "Invalid modulus: 0"
        );
        assert_eq!(
            Error::InvalidDegree(10).to_string(),
            "Invalid degree: 10 is not a power of 2 larger than 8"
        );
        assert_eq!(Error::InvalidContext.to_string(), "Invalid context");
        assert_eq!(
            Error::IncorrectRepresentation(Representation::Ntt, Representation::PowerBasis)
                .to_string(),
            "Incorrect representation: found Ntt, expected PowerBasis"
        );
        assert_eq!(Error::Default("oops".to_string()).to_string(), "oops");
    }
}
