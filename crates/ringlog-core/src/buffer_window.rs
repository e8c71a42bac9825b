//! The coordinator: owns the Ring and Window, drives them from a Reader,
//! and implements all navigation and filter semantics behind one mutex.
//!
//! Every public method is a short critical section. None returns a
//! reference into internal state; callers get owned copies
//! ([`BufferWindow::snapshot`]) or plain values.

use std::sync::Mutex;

use crate::filter::{Filter, SubstringFilter};
use crate::line::Line;
use crate::reader::Reader;
use crate::ring::{Handle, Ring};
use crate::window::Window;

/// `follow`/`locked` plus the engine's owned data structures, serialized on
/// one mutex. Holding the mutex across filter evaluation is intentional:
/// see the concurrency notes on [`crate::filter::Filter`].
struct Inner<T: Line> {
    ring: Ring<T>,
    window: Window,
    filter: SubstringFilter,
    follow: bool,
    locked: bool,
}

/// The engine. Generic over the concrete line type so the Ring and Window
/// hold a statically-known slot type rather than a dynamically-typed one.
pub struct BufferWindow<T: Line> {
    reader: Box<dyn Reader>,
    parser: Box<dyn Fn(crate::line::SourceId, &str) -> T + Send + Sync>,
    inner: Mutex<Inner<T>>,
}

impl<T: Line> BufferWindow<T> {
    /// `ring_capacity` is the Ring's bound (`C`); `window_capacity` is the
    /// Window's bound (`W`).
    pub fn new(
        ring_capacity: usize,
        window_capacity: usize,
        reader: Box<dyn Reader>,
        parser: impl Fn(crate::line::SourceId, &str) -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            reader,
            parser: Box::new(parser),
            inner: Mutex::new(Inner {
                ring: Ring::new(ring_capacity.max(1)),
                window: Window::new(window_capacity),
                filter: SubstringFilter::new(""),
                follow: true,
                locked: false,
            }),
        }
    }

    /// Pull one line from the Reader, parse it, push it into the Ring, and
    /// reconcile the Window. Returns `Ok(true)` if the view changed and a
    /// redraw should be signaled, `Ok(false)` if the line was read but
    /// filtered out of view, `Err` on end-of-stream or a reader fault.
    pub async fn read_one(&self) -> crate::error::Result<bool> {
        let (raw, source) = self.reader.read_line().await?;

        let mut inner = self.inner.lock().unwrap();
        let value = (self.parser)(source, &raw);
        let h = inner.ring.push(value);

        let changed = if inner.window.is_empty() {
            if Self::filter_handle(&mut inner.ring, &inner.filter, h) {
                inner.window.push_front(h);
                true
            } else {
                false
            }
        } else if inner
            .window
            .tail_value()
            .is_some_and(|t| Ring::<T>::same_slot(t, h))
        {
            inner.window.slide_front();
            Self::walk(&mut inner, false, 1);
            true
        } else if (!inner.locked && inner.follow) || !inner.window.is_full() {
            Self::walk(&mut inner, false, 1);
            true
        } else {
            false
        };

        Ok(changed)
    }

    /// Move the view by `n` filter-accepted lines. Positive `n` moves
    /// toward older history; negative toward newer.
    pub fn move_by(&self, n: i64) {
        let mut inner = self.inner.lock().unwrap();
        Self::walk(&mut inner, n > 0, n.unsigned_abs());
    }

    /// Jump to the newest filter-accepted lines.
    pub fn move_to_newest(&self) {
        let mut inner = self.inner.lock().unwrap();
        let capacity = inner.ring.capacity() as u64;
        Self::walk(&mut inner, false, capacity);
    }

    /// Jump to the oldest filter-accepted lines.
    pub fn move_to_oldest(&self) {
        let mut inner = self.inner.lock().unwrap();
        let capacity = inner.ring.capacity() as u64;
        Self::walk(&mut inner, true, capacity);
    }

    /// `(capacity, length)` of the Window.
    pub fn window_size(&self) -> (usize, usize) {
        let inner = self.inner.lock().unwrap();
        inner.window.size()
    }

    /// Resize the Window. Rebuilds its contents around the current anchor
    /// if the capacity actually changed.
    pub fn resize(&self, n: usize) {
        let mut inner = self.inner.lock().unwrap();
        if inner.window.resize(n) {
            Self::refresh_locked(&mut inner);
        }
    }

    /// Set whether the view is pinned in place (user scrolled away from
    /// the tail and does not want new lines to pull it back).
    pub fn set_locked(&self, yes: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.locked = yes;
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.inner.lock().unwrap().locked
    }

    #[must_use]
    pub fn is_following(&self) -> bool {
        self.inner.lock().unwrap().follow
    }

    /// Replace the active filter's input text and rebuild the Window
    /// around the current anchor.
    pub fn set_filter(&self, input: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.filter = SubstringFilter::new(input);
        Self::refresh_locked(&mut inner);
    }

    #[must_use]
    pub fn filter_input(&self) -> String {
        self.inner.lock().unwrap().filter.input()
    }

    /// Rebuild the Window around its current anchor without changing the
    /// filter or capacity. Used after any external state the Filter
    /// predicate depends on has changed.
    pub fn refresh(&self) {
        let mut inner = self.inner.lock().unwrap();
        Self::refresh_locked(&mut inner);
    }

    /// Drop all history and reset the view to following the (now empty) tail.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.ring.clear();
        inner.window.reset();
        inner.follow = true;
        inner.locked = false;
    }

    /// The currently visible, filter-accepted lines, oldest first.
    pub fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        let inner = self.inner.lock().unwrap();
        let mut out = Vec::new();
        inner.window.iterate_old_to_new(|h| {
            if let Some(v) = inner.ring.get(h) {
                out.push(v.clone());
            }
        });
        out
    }

    /// Monotone count of lines ever pushed into the Ring.
    #[must_use]
    pub fn total_lines(&self) -> u64 {
        self.inner.lock().unwrap().ring.lines_total()
    }

    fn filter_handle(ring: &mut Ring<T>, filter: &SubstringFilter, h: Handle) -> bool {
        match ring.get_mut(h) {
            Some(line) => filter.apply(line),
            None => false,
        }
    }

    /// Core directional walk shared by `move_by`, `move_to_newest`,
    /// `move_to_oldest`, and the read-path's "ingest the new newest line"
    /// step. `toward_older = false` walks newer (push_front); `true` walks
    /// older (push_back). Stops after `count` filter-accepted pushes or at
    /// the Ring boundary.
    fn walk(inner: &mut Inner<T>, toward_older: bool, mut count: u64) {
        if count == 0 {
            return;
        }

        let mut cursor: Option<Handle> = if toward_older {
            match inner.window.tail_value() {
                Some(t) => inner.ring.prev(t),
                None => inner.ring.newest(),
            }
        } else {
            match inner.window.head_value() {
                Some(h) => inner.ring.next(h),
                None => inner.ring.newest(),
            }
        };

        while count > 0 {
            let Some(h) = cursor else { break };
            cursor = if toward_older {
                inner.ring.prev(h)
            } else {
                inner.ring.next(h)
            };
            if Self::filter_handle(&mut inner.ring, &inner.filter, h) {
                if toward_older {
                    inner.window.push_back(h);
                } else {
                    inner.window.push_front(h);
                }
                count -= 1;
            }
        }

        if toward_older {
            inner.follow = false;
        } else if let Some(newest) = inner.ring.newest() {
            if inner.window.head_value() == Some(newest) {
                inner.follow = true;
            }
        }
    }

    /// Reconstruct the Window around its current anchor (head, falling
    /// back to the Ring's newest entry). The older-direction walk includes
    /// the anchor itself; the newer-direction walk starts past it, so the
    /// anchor is not duplicated into both ends.
    fn refresh_locked(inner: &mut Inner<T>) {
        let anchor = inner.window.head_value().or_else(|| inner.ring.newest());
        inner.window.reset();
        inner.follow = false;

        let Some(anchor) = anchor else { return };

        let mut cursor = Some(anchor);
        while !inner.window.is_full() {
            let Some(h) = cursor else { break };
            cursor = inner.ring.prev(h);
            if Self::filter_handle(&mut inner.ring, &inner.filter, h) {
                inner.window.push_back(h);
            }
        }

        let mut cursor = inner.ring.next(anchor);
        while !inner.window.is_full() {
            let Some(h) = cursor else { break };
            let is_newest = inner.ring.newest() == Some(h);
            cursor = inner.ring.next(h);
            if Self::filter_handle(&mut inner.ring, &inner.filter, h) {
                inner.window.push_front(h);
                if is_newest {
                    inner.follow = true;
                }
            }
            if is_newest {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::{SourceId, TextLine};
    use crate::reader::test_support::VecReader;

    fn decimal_parser(_source: SourceId, raw: &str) -> TextLine {
        TextLine::new(SourceId(0), raw.to_string())
    }

    fn lines(n: u64) -> Vec<String> {
        (1..=n).map(|i| i.to_string()).collect()
    }

    async fn drive(bw: &BufferWindow<TextLine>, n: u64) {
        for _ in 0..n {
            bw.read_one().await.unwrap();
        }
    }

    fn texts(bw: &BufferWindow<TextLine>) -> Vec<String> {
        bw.snapshot().iter().map(|l| l.text().to_string()).collect()
    }

    #[tokio::test]
    async fn scenario_1_no_filter_shows_newest_window() {
        let reader = Box::new(VecReader::new(lines(100)));
        let bw = BufferWindow::new(100, 10, reader, decimal_parser);
        drive(&bw, 100).await;
        assert_eq!(texts(&bw), (91..=100).map(|i| i.to_string()).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn scenario_2_move_plus_one_shifts_older() {
        let reader = Box::new(VecReader::new(lines(100)));
        let bw = BufferWindow::new(100, 10, reader, decimal_parser);
        drive(&bw, 100).await;
        bw.move_by(1);
        assert_eq!(texts(&bw), (90..=99).map(|i| i.to_string()).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn scenario_3_move_clamps_at_oldest() {
        let reader = Box::new(VecReader::new(lines(100)));
        let bw = BufferWindow::new(100, 10, reader, decimal_parser);
        drive(&bw, 100).await;
        bw.move_by(1000);
        assert_eq!(texts(&bw), (1..=10).map(|i| i.to_string()).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn scenario_4_filter_single_match() {
        let reader = Box::new(VecReader::new(lines(100)));
        let bw = BufferWindow::new(100, 5, reader, decimal_parser);
        drive(&bw, 100).await;
        bw.set_filter("11");
        assert_eq!(texts(&bw), vec!["11".to_string()]);
    }

    // The filter narrows as the user keeps typing ("11" then "1"); each
    // refresh() re-anchors on the *previous* filtered view, not on the
    // unfiltered follow position, so "1" picks up from where "11" left off.
    #[tokio::test]
    async fn scenario_5_narrowing_filter_anchors_on_prior_view() {
        let reader = Box::new(VecReader::new(lines(100)));
        let bw = BufferWindow::new(100, 5, reader, decimal_parser);
        drive(&bw, 100).await;

        bw.set_filter("11");
        assert_eq!(texts(&bw), vec!["11".to_string()]);

        bw.set_filter("1");
        assert_eq!(
            texts(&bw),
            ["1", "10", "11", "12", "13"].map(String::from).to_vec()
        );

        // already at the oldest match; moving further older is a no-op
        bw.move_by(1);
        assert_eq!(
            texts(&bw),
            ["1", "10", "11", "12", "13"].map(String::from).to_vec()
        );

        bw.move_by(-5);
        assert_eq!(
            texts(&bw),
            ["14", "15", "16", "17", "18"].map(String::from).to_vec()
        );

        bw.move_by(-100);
        assert_eq!(
            texts(&bw),
            ["61", "71", "81", "91", "100"].map(String::from).to_vec()
        );

        bw.set_filter("foo");
        assert!(texts(&bw).is_empty());
    }

    #[tokio::test]
    async fn scenario_6_ring_wraps_keeps_last_capacity() {
        let reader = Box::new(VecReader::new(lines(100)));
        let bw = BufferWindow::new(10, 5, reader, decimal_parser);
        drive(&bw, 100).await;
        assert_eq!(texts(&bw), (96..=100).map(|i| i.to_string()).collect::<Vec<_>>());
    }

    // Filtering directly from an unfiltered follow position anchors on the
    // Ring's newest entry, so it surfaces the newest matches, not the
    // oldest ones (contrast with scenario 5's chained narrowing).
    #[tokio::test]
    async fn filtering_from_unfiltered_view_surfaces_newest_matches() {
        let reader = Box::new(VecReader::new(lines(100)));
        let bw = BufferWindow::new(1000, 5, reader, decimal_parser);
        drive(&bw, 100).await;
        bw.set_filter("1");
        assert_eq!(
            texts(&bw),
            ["61", "71", "81", "91", "100"].map(String::from).to_vec()
        );
    }

    #[tokio::test]
    async fn clear_resets_to_following_empty_view() {
        let reader = Box::new(VecReader::new(lines(10)));
        let bw = BufferWindow::new(10, 5, reader, decimal_parser);
        drive(&bw, 10).await;
        bw.clear();
        assert!(bw.snapshot().is_empty());
        assert_eq!(bw.total_lines(), 0);
        assert!(bw.is_following());
        assert!(!bw.is_locked());
    }

    #[tokio::test]
    async fn refresh_is_idempotent() {
        let reader = Box::new(VecReader::new(lines(100)));
        let bw = BufferWindow::new(100, 7, reader, decimal_parser);
        drive(&bw, 100).await;
        bw.set_filter("1");
        let first = texts(&bw);
        bw.refresh();
        assert_eq!(texts(&bw), first);
    }

    #[tokio::test]
    async fn resize_growing_preserves_contents() {
        let reader = Box::new(VecReader::new(lines(100)));
        let bw = BufferWindow::new(100, 5, reader, decimal_parser);
        drive(&bw, 100).await;
        let before = texts(&bw);
        bw.resize(20);
        // growing pulls in additional older entries but keeps the originals
        let after = texts(&bw);
        assert!(after.ends_with(&before[..]) || after == before);
    }

    #[tokio::test]
    async fn wrap_race_retires_overwritten_tail() {
        // window capacity equal to ring capacity: the window's tail is
        // always the ring's oldest slot, so every push forces a wrap-race
        // reconciliation once the ring is full.
        let reader = Box::new(VecReader::new(lines(20)));
        let bw = BufferWindow::new(5, 5, reader, decimal_parser);
        drive(&bw, 20).await;
        assert_eq!(texts(&bw), (16..=20).map(|i| i.to_string()).collect::<Vec<_>>());
        assert_eq!(bw.window_size(), (5, 5));
    }
}
