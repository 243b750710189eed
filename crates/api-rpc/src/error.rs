//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use jsonrpsee::types::ErrorObjectOwned;
use shipscreen_core::domain::DomainError;
use shipscreen_core::error::AppError;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const THROTTLED: i32 = 4003;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
    pub const PROVIDER_ERROR: i32 = 5002;
}

fn object(code: i32, message: impl Into<String>) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(code, message.into(), None::<()>)
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    match err {
        AppError::Validation(msg) => object(code::VALIDATION_ERROR, msg),
        AppError::NotFound(msg) => object(code::NOT_FOUND, msg),
        AppError::Conflict(msg) => object(code::CONFLICT, msg),
        AppError::Database(msg) => object(code::DB_ERROR, msg),
        AppError::Provider(e) => object(code::PROVIDER_ERROR, e.to_string()),
        AppError::Domain(
            e @ (DomainError::InvalidStateTransition { .. } | DomainError::StaleRun { .. }),
        ) => object(code::CONFLICT, e.to_string()),
        AppError::Domain(e) => object(code::VALIDATION_ERROR, e.to_string()),
        // Request bodies are decoded by jsonrpsee; serde failures here are ours
        AppError::Serialization(e) => object(code::INTERNAL_ERROR, e.to_string()),
        AppError::Config(msg) | AppError::Internal(msg) => object(code::INTERNAL_ERROR, msg),
    }
}

pub fn throttled() -> ErrorObjectOwned {
    object(code::THROTTLED, "Rate limit exceeded. Please slow down.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipscreen_core::port::ProviderError;

    #[test]
    fn test_error_codes() {
        let cases = [
            (AppError::Validation("bad".into()), code::VALIDATION_ERROR),
            (AppError::NotFound("x".into()), code::NOT_FOUND),
            (AppError::Conflict("x".into()), code::CONFLICT),
            (AppError::Database("locked".into()), code::DB_ERROR),
            (
                AppError::Provider(ProviderError::RateLimited),
                code::PROVIDER_ERROR,
            ),
            (
                AppError::Domain(DomainError::InvalidImo("1".into())),
                code::VALIDATION_ERROR,
            ),
            (
                AppError::Domain(DomainError::InvalidStateTransition {
                    subject: "s".into(),
                    from: "DONE".into(),
                    to: "IN_PROGRESS".into(),
                }),
                code::CONFLICT,
            ),
            (AppError::Config("missing".into()), code::INTERNAL_ERROR),
            (AppError::Internal("boom".into()), code::INTERNAL_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(to_rpc_error(err).code(), expected);
        }
    }

    #[test]
    fn test_serialization_failure_is_internal() {
        let err = serde_json::from_str::<u8>("not json").unwrap_err();

        let rpc = to_rpc_error(AppError::Serialization(err));
        assert_eq!(rpc.code(), code::INTERNAL_ERROR);
    }

    #[test]
    fn test_stale_run_is_conflict() {
        let err = AppError::Domain(DomainError::StaleRun {
            screening: "s".into(),
            expected: 1,
        });
        assert_eq!(to_rpc_error(err).code(), code::CONFLICT);
    }
}
