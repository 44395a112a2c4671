use std::time::Duration;

use crate::error::RemoteError;

/// Maximum attempts per remote call.
const MAX_ATTEMPTS: u32 = 3;

/// Run a remote call with up to three attempts. The n-th retry sleeps
/// `500·n` ms, or `1000·n` ms after a rate-limit response.
pub(crate) fn with_retries<T>(
    service: &'static str,
    call: impl Fn() -> Result<T, RemoteError>,
) -> Result<T, RemoteError> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match call() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                let base: u64 = if err.is_rate_limit() { 1000 } else { 500 };
                let delay = Duration::from_millis(base * u64::from(attempt));
                tracing::warn!(service, attempt, error = %err, "remote call failed, retrying");
                std::thread::sleep(delay);
            }
            Err(err) if attempt >= MAX_ATTEMPTS => {
                return Err(RemoteError::RetriesExhausted {
                    service,
                    attempts: attempt,
                    last_error: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }
}
