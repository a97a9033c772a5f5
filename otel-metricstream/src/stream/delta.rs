use std::sync::Arc;

use super::reader_set::ReaderSet;
use super::Metric;
use crate::aggregation::Aggregation;

/// One pending collection window and the readers that have not yet consumed it.
struct Delta<S> {
    metric: Metric<S>,
    readers: ReaderSet,
    prev: Option<usize>,
}

/// Reconciles one write-side stream against independently paced readers.
///
/// Windows are held newest-first in an index-linked arena. A reader's bit is
/// cleared from every window it consumes; windows nobody waits for anymore are
/// unlinked, and neighbors left with identical reader sets are coalesced into
/// one wider window. This bounds the chain to the number of distinct reader
/// groupings in flight rather than the number of collections ever made.
pub(crate) struct DeltaStorage<A: Aggregation> {
    aggregation: Arc<A>,
    nodes: Vec<Option<Delta<A::Summary>>>,
    free: Vec<usize>,
    head: Option<usize>,
}

impl<A: Aggregation> DeltaStorage<A> {
    pub(crate) fn new(aggregation: Arc<A>) -> Self {
        DeltaStorage {
            aggregation,
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
        }
    }

    /// Makes `metric` available to every reader in `readers`.
    ///
    /// A window no reader is pending on is discarded outright. Back-to-back
    /// windows serving the same reader set are folded into one.
    pub(crate) fn add(&mut self, metric: Metric<A::Summary>, readers: &ReaderSet) {
        if readers.is_empty() {
            return;
        }

        let aggregation = self.aggregation.clone();
        if let Some(head) = self.head {
            let node = self.nodes[head].as_mut().expect("head node is occupied");
            if node.readers == *readers {
                merge_from_newer(aggregation.as_ref(), &mut node.metric, metric);
                return;
            }
        }

        let delta = Delta {
            metric,
            readers: readers.clone(),
            prev: self.head,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(delta);
                index
            }
            None => {
                self.nodes.push(Some(delta));
                self.nodes.len() - 1
            }
        };
        self.head = Some(index);
    }

    /// Accumulates the windows pending for `reader` into one metric whose
    /// timestamp is the oldest consumed window's, or `None` when nothing is
    /// pending.
    ///
    /// With `retain` the reader's pending bits are left untouched, so the same
    /// accumulated history is returned again on the next call.
    pub(crate) fn collect(&mut self, reader: usize, retain: bool) -> Option<Metric<A::Summary>> {
        let aggregation = self.aggregation.clone();
        let mut result: Option<Metric<A::Summary>> = None;

        let mut cursor = self.head;
        while let Some(index) = cursor {
            let node = self.nodes[index].as_mut().expect("linked node is occupied");
            cursor = node.prev;

            if !node.readers.contains(reader) {
                continue;
            }
            match result.as_mut() {
                None => result = Some(node.metric.clone()),
                Some(accumulated) => {
                    merge_from_older(aggregation.as_ref(), accumulated, &node.metric)
                }
            }
            if !retain {
                node.readers.remove(reader);
            }
        }

        if !retain {
            self.prune();
        }
        result
    }

    /// Unlinks fully consumed windows and coalesces neighbors left with
    /// identical reader sets.
    fn prune(&mut self) {
        let aggregation = self.aggregation.clone();
        let mut kept: Vec<usize> = Vec::new();

        let mut cursor = self.head;
        while let Some(index) = cursor {
            let node = self.nodes[index].as_ref().expect("linked node is occupied");
            cursor = node.prev;

            if node.readers.is_empty() {
                self.release(index);
                continue;
            }

            if let Some(&newer) = kept.last() {
                let same_readers = {
                    let newer_node = self.nodes[newer].as_ref().expect("kept node is occupied");
                    let node = self.nodes[index].as_ref().expect("linked node is occupied");
                    newer_node.readers == node.readers
                };
                if same_readers {
                    // the newer window folds into the older one, which keeps
                    // its timestamp as the window start
                    let removed = self.nodes[newer].take().expect("kept node is occupied");
                    self.free.push(newer);
                    kept.pop();

                    let node = self.nodes[index].as_mut().expect("linked node is occupied");
                    merge_from_newer(aggregation.as_ref(), &mut node.metric, removed.metric);
                }
            }
            kept.push(index);
        }

        self.head = kept.first().copied();
        for pair in kept.windows(2) {
            self.nodes[pair[0]]
                .as_mut()
                .expect("kept node is occupied")
                .prev = Some(pair[1]);
        }
        if let Some(&last) = kept.last() {
            self.nodes[last].as_mut().expect("kept node is occupied").prev = None;
        }
    }

    fn release(&mut self, index: usize) {
        self.nodes[index] = None;
        self.free.push(index);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_some()).count()
    }
}

/// Folds `newer` into `into`, which holds the older window and keeps its
/// timestamp as the start of the combined window.
fn merge_from_newer<A: Aggregation>(
    aggregation: &A,
    into: &mut Metric<A::Summary>,
    newer: Metric<A::Summary>,
) {
    for (attributes, summary) in newer.summaries {
        match into.summaries.get_mut(&attributes) {
            Some(existing) => {
                let merged = aggregation.merge(existing, &summary);
                *existing = merged;
            }
            None => {
                into.summaries.insert(attributes, summary);
            }
        }
    }
}

/// Folds the older window `older` into the accumulated `into`, moving the
/// accumulated window's start back to the older one.
fn merge_from_older<A: Aggregation>(
    aggregation: &A,
    into: &mut Metric<A::Summary>,
    older: &Metric<A::Summary>,
) {
    for (attributes, summary) in &older.summaries {
        match into.summaries.get_mut(attributes) {
            Some(existing) => {
                let merged = aggregation.merge(summary, existing);
                *existing = merged;
            }
            None => {
                into.summaries.insert(attributes.clone(), summary.clone());
            }
        }
    }
    into.timestamp = older.timestamp;
}
