use std::time::Duration;

use sandbox::{ExecutionRequest, ResourceLimits};

use crate::config::LimitPolicy;
use crate::error::ServerError;

/// Validate a raw request body against the host policy.
///
/// Pure: no side effects, no execution. Rejects with `InvalidInput` when the
/// body is not a JSON object, `code` is missing or not a string, the code is
/// oversized, or a requested limit exceeds the policy ceiling. Unknown
/// fields are ignored.
pub fn validate(body: &[u8], policy: &LimitPolicy) -> Result<ExecutionRequest, ServerError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ServerError::InvalidInput(format!("body is not valid JSON: {e}")))?;
    let Some(object) = value.as_object() else {
        return Err(ServerError::InvalidInput("body must be a JSON object".into()));
    };

    let code = match object.get("code") {
        None => return Err(ServerError::InvalidInput("missing field `code`".into())),
        Some(value) => value
            .as_str()
            .ok_or_else(|| ServerError::InvalidInput("`code` must be a string".into()))?,
    };
    if code.len() > policy.max_code_bytes {
        return Err(ServerError::InvalidInput(format!(
            "`code` exceeds maximum size ({} > {} bytes)",
            code.len(),
            policy.max_code_bytes
        )));
    }

    let timeout = match object.get("timeout_ms") {
        None => policy.timeout,
        Some(value) => {
            let ms = value.as_u64().ok_or_else(|| {
                ServerError::InvalidInput("`timeout_ms` must be a positive integer".into())
            })?;
            let requested = Duration::from_millis(ms);
            if ms == 0 || requested > policy.timeout {
                return Err(ServerError::InvalidInput(format!(
                    "`timeout_ms` must be between 1 and {}",
                    policy.timeout.as_millis()
                )));
            }
            requested
        }
    };

    let memory_mb = match object.get("memory_mb") {
        None => policy.memory_mb,
        Some(value) => {
            let mb = value
                .as_u64()
                .and_then(|mb| u32::try_from(mb).ok())
                .ok_or_else(|| {
                    ServerError::InvalidInput("`memory_mb` must be a positive integer".into())
                })?;
            if mb == 0 || mb > policy.memory_mb {
                return Err(ServerError::InvalidInput(format!(
                    "`memory_mb` must be between 1 and {}",
                    policy.memory_mb
                )));
            }
            mb
        }
    };

    Ok(ExecutionRequest {
        code: code.to_string(),
        limits: ResourceLimits {
            timeout,
            memory_mb,
            max_output_bytes: policy.max_output_bytes,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> LimitPolicy {
        LimitPolicy {
            max_code_bytes: 64 * 1024,
            timeout: Duration::from_secs(5),
            memory_mb: 256,
            max_output_bytes: 1024 * 1024,
        }
    }

    #[test]
    fn accepts_minimal_request_with_default_limits() {
        let request = validate(br#"{"code": "print('hi')"}"#, &policy()).unwrap();
        assert_eq!(request.code, "print('hi')");
        assert_eq!(request.limits.timeout, Duration::from_secs(5));
        assert_eq!(request.limits.memory_mb, 256);
        assert_eq!(request.limits.max_output_bytes, 1024 * 1024);
    }

    #[test]
    fn accepts_lowered_limits() {
        let request = validate(
            br#"{"code": "pass", "timeout_ms": 1000, "memory_mb": 64}"#,
            &policy(),
        )
        .unwrap();
        assert_eq!(request.limits.timeout, Duration::from_secs(1));
        assert_eq!(request.limits.memory_mb, 64);
    }

    #[test]
    fn rejects_invalid_json() {
        let err = validate(b"not json", &policy()).unwrap_err();
        assert!(matches!(err, ServerError::InvalidInput(_)));
    }

    #[test]
    fn rejects_non_object_body() {
        let err = validate(br#"["code"]"#, &policy()).unwrap_err();
        assert!(matches!(err, ServerError::InvalidInput(_)));
    }

    #[test]
    fn rejects_missing_code() {
        let err = validate(br#"{"lang": "python"}"#, &policy()).unwrap_err();
        assert!(err.to_string().contains("missing field `code`"));
    }

    #[test]
    fn rejects_non_string_code() {
        let err = validate(br#"{"code": 42}"#, &policy()).unwrap_err();
        assert!(err.to_string().contains("`code` must be a string"));
    }

    #[test]
    fn rejects_oversized_code() {
        let mut small = policy();
        small.max_code_bytes = 8;
        let err = validate(br#"{"code": "print('way too long')"}"#, &small).unwrap_err();
        assert!(err.to_string().contains("maximum size"));
    }

    #[test]
    fn code_at_exact_limit_is_accepted() {
        let mut small = policy();
        small.max_code_bytes = 4;
        let request = validate(br#"{"code": "pass"}"#, &small).unwrap();
        assert_eq!(request.code, "pass");
    }

    #[test]
    fn rejects_timeout_above_ceiling() {
        let err = validate(br#"{"code": "pass", "timeout_ms": 60000}"#, &policy()).unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = validate(br#"{"code": "pass", "timeout_ms": 0}"#, &policy()).unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));
    }

    #[test]
    fn rejects_non_numeric_timeout() {
        let err = validate(br#"{"code": "pass", "timeout_ms": "fast"}"#, &policy()).unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));
    }

    #[test]
    fn rejects_memory_above_ceiling() {
        let err = validate(br#"{"code": "pass", "memory_mb": 4096}"#, &policy()).unwrap_err();
        assert!(err.to_string().contains("memory_mb"));
    }

    #[test]
    fn ignores_unknown_fields() {
        let request = validate(br#"{"code": "pass", "mode": "debug"}"#, &policy()).unwrap();
        assert_eq!(request.code, "pass");
    }
}
