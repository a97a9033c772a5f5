/// A growable set of reader ids backed by a bit vector.
///
/// Grows past the machine word transparently, so a stream supports more
/// concurrent readers than a native integer has bits. The backing storage is
/// kept canonical (no trailing zero words) so equal sets always compare equal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ReaderSet {
    words: Vec<u64>,
}

const WORD_BITS: usize = u64::BITS as usize;

impl ReaderSet {
    pub(crate) fn contains(&self, reader: usize) -> bool {
        self.words
            .get(reader / WORD_BITS)
            .is_some_and(|word| word >> (reader % WORD_BITS) & 1 != 0)
    }

    pub(crate) fn insert(&mut self, reader: usize) {
        let index = reader / WORD_BITS;
        if self.words.len() <= index {
            self.words.resize(index + 1, 0);
        }
        self.words[index] |= 1 << (reader % WORD_BITS);
    }

    pub(crate) fn remove(&mut self, reader: usize) {
        if let Some(word) = self.words.get_mut(reader / WORD_BITS) {
            *word &= !(1 << (reader % WORD_BITS));
        }
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The lowest id not present in the set.
    pub(crate) fn first_clear(&self) -> usize {
        for (index, word) in self.words.iter().enumerate() {
            if *word != u64::MAX {
                return index * WORD_BITS + word.trailing_ones() as usize;
            }
        }
        self.words.len() * WORD_BITS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove() {
        let mut set = ReaderSet::default();
        assert!(!set.contains(3));

        set.insert(3);
        assert!(set.contains(3));
        assert!(!set.is_empty());

        set.remove(3);
        assert!(!set.contains(3));
        assert!(set.is_empty());
    }

    #[test]
    fn first_clear_returns_lowest_free_id() {
        let mut set = ReaderSet::default();
        assert_eq!(set.first_clear(), 0);

        set.insert(0);
        set.insert(1);
        set.insert(3);
        assert_eq!(set.first_clear(), 2);

        set.insert(2);
        assert_eq!(set.first_clear(), 4);
    }

    #[test]
    fn grows_past_the_machine_word() {
        let mut set = ReaderSet::default();
        for reader in 0..64 {
            set.insert(reader);
        }
        assert_eq!(set.first_clear(), 64);

        set.insert(64);
        assert!(set.contains(64));
        assert!(set.contains(63));
        assert_eq!(set.first_clear(), 65);
    }

    #[test]
    fn equality_ignores_trailing_storage() {
        let mut a = ReaderSet::default();
        let mut b = ReaderSet::default();

        a.insert(1);
        b.insert(100);
        b.insert(1);
        b.remove(100);

        assert_eq!(a, b);
    }
}
