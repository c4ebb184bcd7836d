// crates/ticker-core/src/chunk.rs
//
// Block-range chunking.
//
// Splits an inclusive range `[start, stop]` into consecutive windows of
// `size` blocks. The final window is shorter when the range length is not a
// multiple of `size`; callers decide what to do with it.

/// One window produced by [`chunks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockChunk {
    pub begin: u64,
    pub end: u64,
    /// 1-based position of this window in the sequence.
    pub run_index: u64,
}

impl BlockChunk {
    /// Number of blocks in the window, counting both ends.
    pub fn len(&self) -> u64 {
        self.end - self.begin + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Lazy iterator over the windows of a block range.
#[derive(Debug, Clone)]
pub struct Chunks {
    next_begin: Option<u64>,
    stop: u64,
    size: u64,
    run_index: u64,
}

/// Partition `[start, stop]` into windows of `size` blocks.
///
/// Yields nothing when `start > stop` or `size == 0`.
pub fn chunks(start: u64, stop: u64, size: u64) -> Chunks {
    let next_begin = if start <= stop && size > 0 {
        Some(start)
    } else {
        None
    };
    Chunks {
        next_begin,
        stop,
        size,
        run_index: 0,
    }
}

impl Iterator for Chunks {
    type Item = BlockChunk;

    fn next(&mut self) -> Option<Self::Item> {
        let begin = self.next_begin?;
        let end = begin.saturating_add(self.size - 1).min(self.stop);

        // `checked_add` keeps a range ending at u64::MAX from wrapping around.
        self.next_begin = end.checked_add(1).filter(|next| *next <= self.stop);
        self.run_index += 1;

        Some(BlockChunk {
            begin,
            end,
            run_index: self.run_index,
        })
    }
}
