use thiserror::Error;

/// The Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum encapsulating all the possible errors from this library.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Indicates that an error from the underlying mathematical library was
    /// encountered.
    #[error("{0}")]
    MathError(#[from] spdz_math::Error),

    /// Indicates that an operand has an invalid degree.
    #[error("Invalid degree: found {found}, expected {expected}")]
    BadDegree {
        /// The degree of the operand.
        found: usize,
        /// The degree required by the operation.
        expected: usize,
    },

    /// Indicates that an operand violates the contract of an evaluator
    /// operation.
    #[error("{0}")]
    OperandError(String),

    /// Indicates that polynomials of incompatible levels were mixed.
    #[error("Level mismatch")]
    LevelMismatch,

    /// Indicates that a partial key disagrees with the local expansion of the
    /// common reference string.
    #[error("Common reference string divergence in {0}")]
    CrsDivergence(&'static str),

    /// Indicates that the rotation-key set has no key for the requested
    /// Galois element.
    #[error("No rotation key for Galois element {0}")]
    MissingRotationKey(usize),

    /// Indicates that the system PRNG refused to produce bytes.
    #[error("Rng failure: {0}")]
    RngFailure(String),

    /// Indicates a missing peer message in a protocol round.
    #[error("Protocol stall: {0}")]
    ProtocolStall(String),

    /// Indicates a parameter error.
    #[error("{0}")]
    ParametersError(ParametersError),
}

/// Separate enum to indicate parameters-related errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParametersError {
    /// Indicates that the degree is invalid.
    #[error("Invalid degree: {0} is not a power of 2 larger than 8")]
    InvalidDegree(usize),

    /// Indicates that the number of slots is invalid.
    #[error("Invalid slots: {0}")]
    InvalidSlots(String),

    /// Indicates that the plaintext base beta is invalid.
    #[error("Invalid plaintext base: {0}")]
    InvalidPlaintextBase(String),

    /// Indicates that the modulus chains are invalid.
    #[error("Invalid moduli: {0}")]
    InvalidModuli(String),

    /// Indicates that the noise distribution is invalid.
    #[error("Invalid noise parameters: {0}")]
    InvalidNoise(String),
}

impl From<ParametersError> for Error {
    fn from(e: ParametersError) -> Self {
        Error::ParametersError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ParametersError};

    #[test]
    fn error_strings() {
        assert_eq!(
            Error::BadDegree {
                found: 2,
                expected: 1
            }
            .to_string(),
            "Invalid degree: found 2, expected 1"
        );
        assert_eq!(Error::LevelMismatch.to_string(), "Level mismatch");
        assert_eq!(
            Error::CrsDivergence("relinearization key").to_string(),
            "Common reference string divergence in relinearization key"
        );
        assert_eq!(
            Error::MissingRotationKey(5).to_string(),
            "No rotation key for Galois element 5"
        );
        assert_eq!(
            Error::ParametersError(ParametersError::InvalidDegree(10)).to_string(),
            "Invalid degree: 10 is not a power of 2 larger than 8"
        );
    }
}
