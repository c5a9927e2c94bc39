use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Invalid association parameter: {0}")]
    InvalidAssociationParameter(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid julian date: {0}")]
    InvalidDate(f64),

    #[error("Invalid filter band identifier: {0}")]
    InvalidFilterBand(u8),

    #[error("Invalid discovery number for a provisional designation: {0}")]
    DesignationOverflow(u32),

    #[error("OrbFit process failed for {designation}: {reason}")]
    OrbFitProcess { designation: String, reason: String },

    #[error("Unexpected content in OrbFit output for {designation}: {reason}")]
    OrbFitParse { designation: String, reason: String },

    #[error("Report serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Column length mismatch in observation batch: expected {expected}, got {got}")]
    BatchLengthMismatch { expected: usize, got: usize },
}

impl PartialEq for LinkError {
    fn eq(&self, other: &Self) -> bool {
        use LinkError::*;
        match (self, other) {
            (InvalidAssociationParameter(a), InvalidAssociationParameter(b)) => a == b,

            // io::Error is not comparable, same variant is enough
            (IoError(_), IoError(_)) => true,
            (SerializationError(_), SerializationError(_)) => true,

            (InvalidDate(a), InvalidDate(b)) => a == b,
            (InvalidFilterBand(a), InvalidFilterBand(b)) => a == b,
            (DesignationOverflow(a), DesignationOverflow(b)) => a == b,
            (
                OrbFitProcess {
                    designation: d1,
                    reason: r1,
                },
                OrbFitProcess {
                    designation: d2,
                    reason: r2,
                },
            ) => d1 == d2 && r1 == r2,
            (
                OrbFitParse {
                    designation: d1,
                    reason: r1,
                },
                OrbFitParse {
                    designation: d2,
                    reason: r2,
                },
            ) => d1 == d2 && r1 == r2,
            (
                BatchLengthMismatch {
                    expected: e1,
                    got: g1,
                },
                BatchLengthMismatch {
                    expected: e2,
                    got: g2,
                },
            ) => e1 == e2 && g1 == g2,

            _ => false,
        }
    }
}
