//! Environment variable backend

use std::env::VarError;

use crate::error::SecretError;

/// Read PEM material (or any other secret) from `var_name`.
///
/// A variable that is set but not valid Unicode is reported as a backend
/// error rather than as missing.
pub fn resolve(var_name: &str) -> Result<String, SecretError> {
    match std::env::var(var_name) {
        Ok(value) => Ok(value),
        Err(VarError::NotPresent) => Err(SecretError::EnvNotSet {
            var: var_name.to_string(),
        }),
        Err(VarError::NotUnicode(_)) => Err(SecretError::backend(
            "env",
            format!("{} is not valid Unicode", var_name),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_pem_from_env() {
        let pem = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----";
        std::env::set_var("PROBE_TEST_ENV_BACKEND_CERT", pem);
        assert_eq!(resolve("PROBE_TEST_ENV_BACKEND_CERT").unwrap(), pem);
        std::env::remove_var("PROBE_TEST_ENV_BACKEND_CERT");
    }

    #[test]
    fn test_unset_var_names_the_variable() {
        let err = resolve("PROBE_TEST_ENV_BACKEND_UNSET").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Environment variable 'PROBE_TEST_ENV_BACKEND_UNSET' not set"
        );
    }
}
