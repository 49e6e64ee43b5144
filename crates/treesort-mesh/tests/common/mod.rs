// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs, dead_code)]

use std::sync::Mutex;

use treesort_core::SequentialSorter;

/// A sorter that records the size of every range it was asked to sort
/// locally, so tests can observe where the recursion bottomed out.
#[derive(Debug, Default)]
pub struct RecordingSorter {
    sizes: Mutex<Vec<usize>>,
}

impl RecordingSorter {
    pub fn sizes(&self) -> Vec<usize> {
        let mut out = self.sizes.lock().unwrap().clone();
        out.sort_unstable();
        out
    }
}

impl SequentialSorter for RecordingSorter {
    fn sort(&self, data: &mut [i32]) {
        self.sizes.lock().unwrap().push(data.len());
        data.sort_unstable();
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
