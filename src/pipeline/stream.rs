//! Push-based stream operators over tokio channels.
//!
//! A [`Stream`] is the receiving half of an unbounded channel. Every operator
//! consumes its input streams, spawns one task that owns them, and returns a
//! new stream fed by that task. A [`Signal`] is a `watch` receiver: it always
//! has a current value and only reports that it changed.
//!
//! ```text
//!  Stream<T> ──map/filter/then/scan/debounce──► Stream<U>
//!  Stream<T> ──hold(initial)──► Signal<T>
//!  Stream<A> × Signal<B> ──combine_latest──► Stream<(A, B)>
//!  Signal<A> × Signal<B> ──combine_signals──► Stream<(A, B)>
//! ```
//!
//! Every operator closes its output once its inputs are closed and everything
//! pending has been delivered. An operator also stops when nobody listens to
//! its output anymore.
//!
//! Must be called from within a tokio runtime.

use std::{future::Future, sync::Arc, time::Duration};
use tokio::sync::{mpsc, watch};

pub type Stream<T> = mpsc::UnboundedReceiver<T>;
pub type Signal<T> = watch::Receiver<T>;

// ============================================================================
// Sources
// ============================================================================

/// A stream that yields `items` and closes.
pub fn from_iter<T: Send + 'static>(items: impl IntoIterator<Item = T>) -> Stream<T> {
    let (tx, rx) = mpsc::unbounded_channel();
    for item in items {
        let _ = tx.send(item);
    }
    rx
}

// ============================================================================
// Per-item Operators
// ============================================================================

pub fn map<T, U, F>(mut input: Stream<T>, mut f: F) -> Stream<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> U + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(item) = input.recv().await {
            if tx.send(f(item)).is_err() {
                break;
            }
        }
    });
    rx
}

pub fn filter<T, F>(mut input: Stream<T>, mut predicate: F) -> Stream<T>
where
    T: Send + 'static,
    F: FnMut(&T) -> bool + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(item) = input.recv().await {
            if predicate(&item) && tx.send(item).is_err() {
                break;
            }
        }
    });
    rx
}

pub fn filter_map<T, U, F>(mut input: Stream<T>, mut f: F) -> Stream<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> Option<U> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(item) = input.recv().await {
            if let Some(out) = f(item)
                && tx.send(out).is_err()
            {
                break;
            }
        }
    });
    rx
}

/// Run `f` on every item without changing the stream.
pub fn inspect<T, F>(input: Stream<T>, mut f: F) -> Stream<T>
where
    T: Send + 'static,
    F: FnMut(&T) + Send + 'static,
{
    map(input, move |item| {
        f(&item);
        item
    })
}

/// Async map, one item at a time; output order is input order.
pub fn then<T, U, F, Fut>(mut input: Stream<T>, mut f: F) -> Stream<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> Fut + Send + 'static,
    Fut: Future<Output = U> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(item) = input.recv().await {
            if tx.send(f(item).await).is_err() {
                break;
            }
        }
    });
    rx
}

/// Map every item to any number of items, emitted in order.
pub fn flat_map_iter<T, U, I, F>(mut input: Stream<T>, mut f: F) -> Stream<U>
where
    T: Send + 'static,
    U: Send + 'static,
    I: IntoIterator<Item = U>,
    F: FnMut(T) -> I + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(item) = input.recv().await {
            let sent: Result<(), _> = f(item).into_iter().try_for_each(|out| tx.send(out));
            if sent.is_err() {
                break;
            }
        }
    });
    rx
}

// ============================================================================
// Stateful Operators
// ============================================================================

/// Fold every item into an accumulator owned by the operator task and emit a
/// snapshot after each fold.
///
/// The task is the accumulator's only writer; downstream only ever sees the
/// immutable snapshots.
pub fn scan<T, A, F>(mut input: Stream<T>, seed: A, mut fold: F) -> Stream<Arc<A>>
where
    T: Send + 'static,
    A: Clone + Send + Sync + 'static,
    F: FnMut(&mut A, T) + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut acc = seed;
        while let Some(item) = input.recv().await {
            fold(&mut acc, item);
            if tx.send(Arc::new(acc.clone())).is_err() {
                break;
            }
        }
    });
    rx
}

/// Emit the latest item once `period` passed without a newer one.
///
/// A pending item is flushed when the input closes.
pub fn debounce<T: Send + 'static>(mut input: Stream<T>, period: Duration) -> Stream<T> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut pending: Option<T> = None;
        loop {
            if pending.is_none() {
                match input.recv().await {
                    Some(item) => pending = Some(item),
                    None => break,
                }
                continue;
            }

            // Recreated every turn, so each new item restarts the quiet period.
            tokio::select! {
                item = input.recv() => match item {
                    Some(item) => pending = Some(item),
                    None => break,
                },
                () = tokio::time::sleep(period) => {
                    if let Some(item) = pending.take()
                        && tx.send(item).is_err()
                    {
                        return;
                    }
                }
            }
        }
        if let Some(item) = pending {
            let _ = tx.send(item);
        }
    });
    rx
}

// ============================================================================
// Fan-out / Fan-in
// ============================================================================

/// Duplicate a stream. Keeps going while either copy is consumed.
pub fn tee<T: Clone + Send + 'static>(mut input: Stream<T>) -> (Stream<T>, Stream<T>) {
    let (tx_a, rx_a) = mpsc::unbounded_channel();
    let (tx_b, rx_b) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(item) = input.recv().await {
            let a = tx_a.send(item.clone());
            let b = tx_b.send(item);
            if a.is_err() && b.is_err() {
                break;
            }
        }
    });
    (rx_a, rx_b)
}

/// Interleave several streams in arrival order. Closes when all inputs close.
pub fn merge<T: Send + 'static>(inputs: impl IntoIterator<Item = Stream<T>>) -> Stream<T> {
    let (tx, rx) = mpsc::unbounded_channel();
    for mut input in inputs {
        let tx = tx.clone();
        tokio::spawn(async move {
            while let Some(item) = input.recv().await {
                if tx.send(item).is_err() {
                    break;
                }
            }
        });
    }
    rx
}

// ============================================================================
// Signals
// ============================================================================

/// Keep the latest item of a stream, starting from `initial`.
///
/// The signal closes after the stream closes and its last item was stored.
pub fn hold<T: Send + Sync + 'static>(mut input: Stream<T>, initial: T) -> Signal<T> {
    let (tx, rx) = watch::channel(initial);
    tokio::spawn(async move {
        while let Some(item) = input.recv().await {
            if tx.send(item).is_err() {
                break;
            }
        }
    });
    rx
}

/// Pair every item of `items` with the current value of `signal`, and re-pair
/// the latest item whenever `signal` changes.
///
/// Items never wait for the signal: it always has a value.
pub fn combine_latest<A, B>(mut items: Stream<A>, mut signal: Signal<B>) -> Stream<(A, B)>
where
    A: Clone + Send + 'static,
    B: Clone + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut latest: Option<A> = None;
        let (mut items_open, mut signal_open) = (true, true);

        while items_open || (signal_open && latest.is_some()) {
            let pair = tokio::select! {
                item = items.recv(), if items_open => match item {
                    Some(item) => {
                        let value = signal.borrow_and_update().clone();
                        latest = Some(item.clone());
                        Some((item, value))
                    }
                    None => {
                        items_open = false;
                        None
                    }
                },
                changed = signal.changed(), if signal_open => match changed {
                    Ok(()) => {
                        let value = signal.borrow_and_update().clone();
                        latest.clone().map(|item| (item, value))
                    }
                    Err(_) => {
                        signal_open = false;
                        None
                    }
                },
            };

            if let Some(pair) = pair
                && tx.send(pair).is_err()
            {
                break;
            }
        }
    });
    rx
}

/// Emit both current values whenever either signal changes.
pub fn combine_signals<A, B>(mut a: Signal<A>, mut b: Signal<B>) -> Stream<(A, B)>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let (mut a_open, mut b_open) = (true, true);

        while a_open || b_open {
            let changed = tokio::select! {
                changed = a.changed(), if a_open => {
                    a_open = changed.is_ok();
                    a_open
                }
                changed = b.changed(), if b_open => {
                    b_open = changed.is_ok();
                    b_open
                }
            };
            if !changed {
                continue;
            }

            let pair = (a.borrow_and_update().clone(), b.borrow_and_update().clone());
            if tx.send(pair).is_err() {
                break;
            }
        }
    });
    rx
}

// ============================================================================
// Tests
// ============================================================================
