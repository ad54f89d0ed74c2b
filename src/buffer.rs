/// The ordered buffer of accepted items a watch session aggregates before
/// dispatching. Owned exclusively by the running session loop.
///
/// The two watch modes drain it differently: a directory session takes the
/// entire buffer once the threshold is reached, a line session repeatedly
/// takes the first `threshold` items while enough are buffered. That
/// asymmetry is part of the contract and must not be collapsed.
#[derive(Debug)]
pub struct AggregationBuffer {
    items: Vec<String>,
    threshold: usize,
    dedupe: bool,
}

impl AggregationBuffer {
    /// `threshold` has been validated as >= 1 by the session config.
    pub fn new(threshold: usize, dedupe: bool) -> Self {
        Self {
            items: Vec::new(),
            threshold,
            dedupe,
        }
    }

    /// Append an item, unless deduplication is on and an equal item is
    /// already buffered. Returns false when the item was dropped.
    ///
    /// Duplicates are only compared against the live buffer, never against
    /// batches that have already been dispatched.
    pub fn push(&mut self, item: String) -> bool {
        if self.dedupe && self.items.contains(&item) {
            tracing::debug!(item = %item, "dropping duplicate buffer entry");
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ready(&self) -> bool {
        self.items.len() >= self.threshold
    }

    /// Drain the whole buffer (directory-mode dispatch).
    pub fn take_all(&mut self) -> Vec<String> {
        std::mem::take(&mut self.items)
    }

    /// Drain exactly the first `threshold` items (line-mode dispatch).
    pub fn take_batch(&mut self) -> Vec<String> {
        self.items.drain(..self.threshold).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_one_is_ready_per_item() {
        let mut buffer = AggregationBuffer::new(1, false);
        assert!(!buffer.ready());

        buffer.push("a".to_string());
        assert!(buffer.ready());
        assert_eq!(buffer.take_all(), vec!["a"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_take_all_empties_whole_buffer() {
        let mut buffer = AggregationBuffer::new(3, false);
        for item in ["a", "b", "c", "d"] {
            buffer.push(item.to_string());
        }

        assert!(buffer.ready());
        assert_eq!(buffer.take_all(), vec!["a", "b", "c", "d"]);
        assert!(buffer.is_empty());
        assert!(!buffer.ready());
    }

    #[test]
    fn test_take_batch_is_fifo_prefix() {
        let mut buffer = AggregationBuffer::new(2, false);
        for item in ["a", "b", "c", "d", "e"] {
            buffer.push(item.to_string());
        }

        assert_eq!(buffer.take_batch(), vec!["a", "b"]);
        assert_eq!(buffer.take_batch(), vec!["c", "d"]);
        assert!(!buffer.ready());
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_two_full_batches_never_merge() {
        let mut buffer = AggregationBuffer::new(3, false);
        for i in 0..6 {
            buffer.push(format!("line-{i}"));
        }

        let mut batches = Vec::new();
        while buffer.ready() {
            batches.push(buffer.take_batch());
        }

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], vec!["line-0", "line-1", "line-2"]);
        assert_eq!(batches[1], vec!["line-3", "line-4", "line-5"]);
    }

    #[test]
    fn test_dedupe_drops_live_duplicates() {
        let mut buffer = AggregationBuffer::new(10, true);

        assert!(buffer.push("/data/a".to_string()));
        assert!(!buffer.push("/data/a".to_string()));
        assert!(buffer.push("/data/b".to_string()));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_dedupe_off_keeps_duplicates() {
        let mut buffer = AggregationBuffer::new(10, false);

        assert!(buffer.push("/data/a".to_string()));
        assert!(buffer.push("/data/a".to_string()));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_dedupe_window_resets_after_dispatch() {
        let mut buffer = AggregationBuffer::new(1, true);

        buffer.push("/data/a".to_string());
        assert_eq!(buffer.take_all(), vec!["/data/a"]);

        // The same path arriving after a dispatch is a fresh entry.
        assert!(buffer.push("/data/a".to_string()));
        assert_eq!(buffer.len(), 1);
    }
}
