//! Pending reload set with a single shared quiet-period timer.
//!
//! Pure: the caller passes the current instant, so timing is testable
//! without sleeping.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use notify::EventKind;
use notify::event::{AccessKind, AccessMode, ModifyKind};

/// Default quiet period after the most recent change.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// How long to sleep when nothing is pending.
const IDLE_SLEEP: Duration = Duration::from_secs(86400);

/// Whether a notify event means a file's content may have changed.
///
/// Data/name/any modifications, creation and close-after-write count;
/// plain access, metadata-only changes and removal do not.
pub fn is_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
        _ => false,
    }
}

/// Masters awaiting a debounced rebuild.
#[derive(Debug)]
pub struct Aggregator {
    /// Insertion-ordered, duplicate-free.
    pending: Vec<PathBuf>,
    last_event: Option<Instant>,
    delay: Duration,
}

impl Aggregator {
    pub fn new(delay: Duration) -> Self {
        Self {
            pending: Vec::new(),
            last_event: None,
            delay,
        }
    }

    /// Add affected masters and restart the timer.
    ///
    /// An event that affects no master does not touch the timer.
    pub fn add(&mut self, masters: impl IntoIterator<Item = PathBuf>, now: Instant) {
        let mut any = false;
        for master in masters {
            any = true;
            if !self.pending.contains(&master) {
                crate::debug!("watch"; "pending reload: {}", master.display());
                self.pending.push(master);
            }
        }
        if any {
            self.last_event = Some(now);
        }
    }

    /// Quiet period elapsed with something pending.
    pub fn is_ready(&self, now: Instant) -> bool {
        self.last_event
            .is_some_and(|last| now.saturating_duration_since(last) >= self.delay)
            && !self.pending.is_empty()
    }

    /// Drain the whole pending set once the quiet period has elapsed.
    pub fn take_if_ready(&mut self, now: Instant) -> Option<Vec<PathBuf>> {
        if !self.is_ready(now) {
            return None;
        }
        self.last_event = None;
        Some(std::mem::take(&mut self.pending))
    }

    /// Time until the pending set becomes ready.
    pub fn sleep_duration(&self, now: Instant) -> Duration {
        let Some(last) = self.last_event else {
            return IDLE_SLEEP;
        };
        self.delay
            .saturating_sub(now.saturating_duration_since(last))
            .max(Duration::from_millis(1))
    }

    pub fn pending(&self) -> &[PathBuf] {
        &self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};

    const DELAY: Duration = Duration::from_millis(100);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn master(name: &str) -> PathBuf {
        PathBuf::from(format!("/s/{name}"))
    }

    #[test]
    fn test_event_kinds() {
        assert!(is_change(&EventKind::Create(CreateKind::File)));
        assert!(is_change(&EventKind::Modify(ModifyKind::Data(DataChange::Content))));
        assert!(is_change(&EventKind::Modify(ModifyKind::Any)));
        assert!(is_change(&EventKind::Modify(ModifyKind::Name(
            notify::event::RenameMode::To
        ))));
        assert!(is_change(&EventKind::Access(AccessKind::Close(AccessMode::Write))));

        assert!(!is_change(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any))));
        assert!(!is_change(&EventKind::Access(AccessKind::Read)));
        assert!(!is_change(&EventKind::Remove(RemoveKind::File)));
    }

    #[test]
    fn test_idle() {
        let agg = Aggregator::new(DELAY);
        let now = Instant::now();
        assert!(!agg.is_ready(now));
        assert_eq!(agg.sleep_duration(now), IDLE_SLEEP);
    }

    #[test]
    fn test_burst_yields_one_reload() {
        let mut agg = Aggregator::new(DELAY);
        let start = Instant::now();

        for i in 0..10 {
            agg.add([master("main.rs")], start + ms(i * 5));
        }
        let last = start + ms(45);

        assert!(agg.take_if_ready(last + ms(99)).is_none());
        assert_eq!(agg.take_if_ready(last + ms(100)), Some(vec![master("main.rs")]));
        assert!(agg.take_if_ready(last + ms(500)).is_none());
    }

    #[test]
    fn test_events_within_window_coalesce() {
        let mut agg = Aggregator::new(DELAY);
        let start = Instant::now();

        agg.add([master("a.rs")], start);
        agg.add([master("b.rs")], start + ms(60));

        // The second event restarted the timer.
        assert!(agg.take_if_ready(start + ms(120)).is_none());
        assert_eq!(
            agg.take_if_ready(start + ms(160)),
            Some(vec![master("a.rs"), master("b.rs")])
        );
    }

    #[test]
    fn test_events_apart_reload_separately() {
        let mut agg = Aggregator::new(DELAY);
        let start = Instant::now();

        agg.add([master("a.rs")], start);
        assert_eq!(agg.take_if_ready(start + ms(100)), Some(vec![master("a.rs")]));

        agg.add([master("a.rs")], start + ms(250));
        assert_eq!(agg.take_if_ready(start + ms(350)), Some(vec![master("a.rs")]));
    }

    #[test]
    fn test_unrelated_event_does_not_rearm() {
        let mut agg = Aggregator::new(DELAY);
        let start = Instant::now();

        agg.add([master("a.rs")], start);
        agg.add(Vec::new(), start + ms(90));
        assert!(agg.is_ready(start + ms(100)));
    }

    #[test]
    fn test_sleep_duration_counts_down() {
        let mut agg = Aggregator::new(DELAY);
        let start = Instant::now();
        agg.add([master("a.rs")], start);

        assert_eq!(agg.sleep_duration(start + ms(30)), ms(70));
        assert_eq!(agg.sleep_duration(start + ms(200)), ms(1));
        assert_eq!(agg.pending(), &[master("a.rs")]);
    }
}
