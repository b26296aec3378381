//! Small helpers shared by the guide: pt-BR formatting, validation, relative
//! time, and tokio-based debounce/throttle.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static MOBILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Android|webOS|iPhone|iPad|iPod|BlackBerry|IEMobile|Opera Mini").unwrap()
});

/// Format with `.` thousands and `,` decimal separators: `1.234,50`
pub fn format_number(num: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, num.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let negative = num < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push(',');
        out.push_str(frac);
    }
    out
}

/// Brazilian real: `R$ 1.234,56`
pub fn format_currency(value: f64) -> String {
    if value < 0.0 {
        format!("-R$ {}", format_number(-value, 2))
    } else {
        format!("R$ {}", format_number(value, 2))
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Drop angle brackets so text can be dropped into HTML
pub fn sanitize_string(s: &str) -> String {
    s.chars().filter(|c| *c != '<' && *c != '>').collect()
}

/// Portuguese relative time between `then` and `now`
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    let plural = |n: i64| if n > 1 { "s" } else { "" };

    if days > 0 {
        format!("{} dia{} atrás", days, plural(days))
    } else if hours > 0 {
        format!("{} hora{} atrás", hours, plural(hours))
    } else if minutes > 0 {
        format!("{} minuto{} atrás", minutes, plural(minutes))
    } else {
        "agora mesmo".to_string()
    }
}

/// Rough user-agent sniffing
pub fn is_mobile(user_agent: &str) -> bool {
    MOBILE_RE.is_match(user_agent)
}

/// Run `f`, logging how long it took at debug level
pub fn measure_time<T>(label: &str, f: impl FnOnce() -> T) -> T {
    let start = std::time::Instant::now();
    let out = f();
    debug!("{}: {:.2?}", label, start.elapsed());
    out
}

pub async fn delay(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Collapses bursts of calls into one.
///
/// Trailing mode (default) runs the last call once `wait` has passed without
/// another call. Immediate mode runs the first call of a burst right away and
/// ignores the rest until the burst goes quiet.
#[derive(Debug, Clone)]
pub struct Debouncer {
    wait: Duration,
    immediate: bool,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Debouncer {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            immediate: false,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn immediate(wait: Duration) -> Self {
        Self {
            immediate: true,
            ..Self::new(wait)
        }
    }

    /// Must be called inside a tokio runtime
    pub fn call<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        let quiet = pending.as_ref().map_or(true, |h| h.is_finished());
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        let wait = self.wait;
        if self.immediate {
            if quiet {
                f();
            }
            *pending = Some(tokio::spawn(tokio::time::sleep(wait)));
        } else {
            *pending = Some(tokio::spawn(async move {
                tokio::time::sleep(wait).await;
                f();
            }));
        }
    }
}

/// Lets at most one call through per `limit`
#[derive(Debug)]
pub struct Throttle {
    limit: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            last: Mutex::new(None),
        }
    }

    /// Run `f` unless a call went through less than `limit` ago
    pub fn call<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
        let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        let now = Instant::now();
        if let Some(prev) = *last {
            if now.duration_since(prev) < self.limit {
                return None;
            }
        }
        *last = Some(now);
        Some(f())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn formats_numbers_pt_br() {
        assert_eq!(format_number(1234.5, 2), "1.234,50");
        assert_eq!(format_number(1234567.891, 1), "1.234.567,9");
        assert_eq!(format_number(12.0, 0), "12");
        assert_eq!(format_number(-0.001, 2), "0,00");
        assert_eq!(format_number(-1500.0, 2), "-1.500,00");
    }

    #[test]
    fn formats_currency() {
        assert_eq!(format_currency(2000.0), "R$ 2.000,00");
        assert_eq!(format_currency(1000.5), "R$ 1.000,50");
        assert_eq!(format_currency(-3.2), "-R$ 3,20");
    }

    #[test]
    fn validates_email() {
        assert!(is_valid_email("aluno@escola.com.br"));
        assert!(!is_valid_email("aluno@escola"));
        assert!(!is_valid_email("a luno@escola.com"));
    }

    #[test]
    fn sanitizes_angle_brackets() {
        assert_eq!(sanitize_string("<b>oi</b>"), "boi/b");
    }

    #[test]
    fn relative_time_in_portuguese() {
        let now = Utc::now();
        assert_eq!(time_ago(now - ChronoDuration::seconds(30), now), "agora mesmo");
        assert_eq!(time_ago(now - ChronoDuration::minutes(1), now), "1 minuto atrás");
        assert_eq!(time_ago(now - ChronoDuration::hours(5), now), "5 horas atrás");
        assert_eq!(time_ago(now - ChronoDuration::days(2), now), "2 dias atrás");
    }

    #[test]
    fn detects_mobile_agents() {
        assert!(is_mobile("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)"));
        assert!(!is_mobile("Mozilla/5.0 (X11; Linux x86_64)"));
    }

    #[test]
    fn measure_time_returns_value() {
        assert_eq!(measure_time("soma", || 2 + 2), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn trailing_debounce_runs_last_call_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let debouncer = Debouncer::new(Duration::from_millis(250));

        for _ in 0..5 {
            let hits = hits.clone();
            debouncer.call(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_debounce_runs_first_call() {
        let hits = Arc::new(AtomicUsize::new(0));
        let debouncer = Debouncer::immediate(Duration::from_millis(250));

        for _ in 0..3 {
            let hits = hits.clone();
            debouncer.call(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let again = hits.clone();
        debouncer.call(move || {
            again.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_limits_rate() {
        let throttle = Throttle::new(Duration::from_millis(100));

        assert_eq!(throttle.call(|| 1), Some(1));
        assert_eq!(throttle.call(|| 2), None);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(throttle.call(|| 3), Some(3));
    }
}
