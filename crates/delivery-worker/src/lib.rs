/*!
 * Delivery worker pool.
 *
 * Each worker dequeues delivery jobs via `BRPOP`, atomically claims the
 * referenced event (`RECEIVED -> DELIVERING`), and retries HTTP delivery to
 * the downstream receiver up to five times with fixed backoff before giving
 * up and marking the event `FAILED_PERMANENTLY`.
 */

pub mod config;
pub mod health;
pub mod metrics;
pub mod worker;
