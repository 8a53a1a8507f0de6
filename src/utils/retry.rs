use std::fmt::Display;

use tokio::time::Duration;

/// Run `op` up to `attempts` times, sleeping `delay` between tries. Returns
/// the first success, or the last error once attempts are exhausted.
pub async fn with_retries<T, E, F>(attempts: u32, delay: Duration, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Result<T, E>,
{
    debug_assert!(attempts > 0);
    let mut last_err = None;

    for attempt in 1..=attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                log::debug!("attempt {attempt}/{attempts} failed: {err}");
                last_err = Some(err);
            }
        }
        if attempt < attempts {
            tokio::time::sleep(delay).await;
        }
    }

    Err(last_err.expect("at least one attempt"))
}
