use std::time::Duration;

/// Default receive chunk size in bytes.
pub const DEFAULT_PACKET_SIZE: usize = 1024;
/// Default listen backlog.
pub const DEFAULT_BACKLOG: u32 = 50;

/// Tunables for a [`Sock`](crate::Sock).
#[derive(Debug, Clone)]
pub struct SockConfig {
    /// Bytes requested per `recv` call; each call lands in a new accumulator chunk.
    pub packet_size: usize,
    /// How long transient receive errors are retried after the last successful receive.
    pub read_waiting_timeout: Duration,
    /// Sleep between retries of a transient receive error.
    pub packet_wait_interval: Duration,
    /// Pending connection queue length passed to `listen(2)`.
    pub backlog: u32,
    /// Upper bound for a non-blocking connect to complete.
    pub connect_timeout: Duration,
    /// Upper bound for an answer to start arriving on a client read.
    pub answer_timeout: Duration,
    /// Readiness wait per reactor tick; also bounds shutdown latency.
    pub listen_tick: Duration,
    /// Upper bound for draining a single write.
    pub write_timeout: Duration,
}

impl Default for SockConfig {
    fn default() -> Self {
        Self {
            packet_size: DEFAULT_PACKET_SIZE,
            read_waiting_timeout: Duration::from_millis(500),
            packet_wait_interval: Duration::from_millis(2),
            backlog: DEFAULT_BACKLOG,
            connect_timeout: Duration::from_secs(2),
            answer_timeout: Duration::from_secs(1),
            listen_tick: Duration::from_secs(1),
            write_timeout: Duration::from_secs(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_timings() {
        let cfg = SockConfig::default();
        assert_eq!(cfg.packet_size, 1024);
        assert_eq!(cfg.backlog, 50);
        assert_eq!(cfg.connect_timeout, Duration::from_secs(2));
        assert_eq!(cfg.listen_tick, Duration::from_secs(1));
        assert_eq!(cfg.read_waiting_timeout, Duration::from_millis(500));
    }
}
