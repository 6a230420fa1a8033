//! Marble tallies and their durable mirror.
//!
//! Layout: four single-byte fields at fixed addresses. A field that was never
//! written reads as the store's erased value (0xFF) and is reported as 0.

use sorter_traits::ByteStore;

use crate::error::SorterError;
use crate::hw_error::map_store_error;
use crate::types::{ElapsedTime, MarbleCounts, MarbleType, PersistedSnapshot};

pub const MIN_ADDR: u16 = 0x00;
pub const SEC_ADDR: u16 = 0x01;
pub const BLACK_COUNT_ADDR: u16 = 0x02;
pub const WHITE_COUNT_ADDR: u16 = 0x03;

/// Erased-cell value meaning "never written".
pub const SENTINEL: u8 = 0xFF;

/// Largest value that can be persisted without colliding with the sentinel.
const MAX_PERSISTED: u8 = SENTINEL - 1;

fn to_byte(v: u32) -> u8 {
    u8::try_from(v).unwrap_or(MAX_PERSISTED).min(MAX_PERSISTED)
}

fn from_byte(b: u8) -> u8 {
    if b == SENTINEL { 0 } else { b }
}

pub struct CountStore<B: ByteStore> {
    counts: MarbleCounts,
    store: B,
}

impl<B: ByteStore> CountStore<B> {
    /// In-memory tallies start at zero; the durable copy is left as found.
    pub fn new(store: B) -> Self {
        Self {
            counts: MarbleCounts::default(),
            store,
        }
    }

    #[inline]
    pub fn counts(&self) -> MarbleCounts {
        self.counts
    }

    /// Count one classification in memory. Returns whether it was a marble.
    pub fn record(&mut self, marble: MarbleType) -> bool {
        self.counts.record(marble)
    }

    /// Mirror the current tallies and `elapsed` to the store.
    pub fn sync(&mut self, elapsed: ElapsedTime) -> Result<(), SorterError> {
        let fields = [
            (MIN_ADDR, to_byte(elapsed.minutes)),
            (SEC_ADDR, to_byte(elapsed.seconds)),
            (BLACK_COUNT_ADDR, to_byte(self.counts.black())),
            (WHITE_COUNT_ADDR, to_byte(self.counts.white())),
        ];
        for (addr, value) in fields {
            self.update_byte(addr, value)?;
        }
        Ok(())
    }

    /// Zero the tallies in memory, then every persisted field.
    pub fn reset(&mut self) -> Result<(), SorterError> {
        self.counts = MarbleCounts::default();
        for addr in [MIN_ADDR, SEC_ADDR, BLACK_COUNT_ADDR, WHITE_COUNT_ADDR] {
            self.update_byte(addr, 0)?;
        }
        Ok(())
    }

    /// Read the durable copy, normalising each never-written field to 0.
    pub fn load_snapshot(&mut self) -> Result<PersistedSnapshot, SorterError> {
        let minutes = self.read(MIN_ADDR)?;
        let seconds = self.read(SEC_ADDR)?;
        let black = self.read(BLACK_COUNT_ADDR)?;
        let white = self.read(WHITE_COUNT_ADDR)?;
        Ok(PersistedSnapshot {
            elapsed: ElapsedTime {
                minutes: u32::from(from_byte(minutes)),
                seconds: u32::from(from_byte(seconds)),
            },
            black: from_byte(black),
            white: from_byte(white),
        })
    }

    pub fn store(&self) -> &B {
        &self.store
    }

    fn read(&mut self, addr: u16) -> Result<u8, SorterError> {
        self.store
            .read_byte(addr)
            .map_err(|e| map_store_error(e.as_ref()))
    }

    /// Write only when the stored byte differs; a failed read falls back to writing.
    fn update_byte(&mut self, addr: u16, value: u8) -> Result<(), SorterError> {
        if matches!(self.store.read_byte(addr), Ok(current) if current == value) {
            return Ok(());
        }
        self.store
            .write_byte(addr, value)
            .map_err(|e| map_store_error(e.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MemoryStore;

    #[test]
    fn fresh_store_reads_all_zero() {
        let mut c = CountStore::new(MemoryStore::new());
        assert_eq!(c.load_snapshot().unwrap(), PersistedSnapshot::default());
    }

    #[test]
    fn each_sentinel_field_is_normalised_independently() {
        let mut mem = MemoryStore::new();
        mem.poke(BLACK_COUNT_ADDR, 7);
        mem.poke(SEC_ADDR, 12);
        let mut c = CountStore::new(mem);
        let snap = c.load_snapshot().unwrap();
        assert_eq!(snap.black, 7);
        assert_eq!(snap.white, 0);
        assert_eq!(snap.elapsed, ElapsedTime { minutes: 0, seconds: 12 });
    }

    #[test]
    fn sync_mirrors_counts_and_time() {
        let mut c = CountStore::new(MemoryStore::new());
        c.record(MarbleType::Black);
        c.record(MarbleType::White);
        c.record(MarbleType::White);
        assert!(!c.record(MarbleType::None));
        c.sync(ElapsedTime { minutes: 1, seconds: 5 }).unwrap();
        let snap = c.load_snapshot().unwrap();
        assert_eq!((snap.black, snap.white, snap.total()), (1, 2, 3));
        assert_eq!(snap.elapsed, ElapsedTime { minutes: 1, seconds: 5 });
    }

    #[test]
    fn unchanged_bytes_are_not_rewritten() {
        let mut c = CountStore::new(MemoryStore::new());
        c.record(MarbleType::Black);
        c.sync(ElapsedTime::default()).unwrap();
        let writes = c.store().writes();
        c.sync(ElapsedTime::default()).unwrap();
        assert_eq!(c.store().writes(), writes);
    }

    #[test]
    fn large_counts_saturate_below_sentinel() {
        let mut c = CountStore::new(MemoryStore::new());
        for _ in 0..300 {
            c.record(MarbleType::White);
        }
        c.sync(ElapsedTime::default()).unwrap();
        assert_eq!(c.counts().white(), 300);
        assert_eq!(c.load_snapshot().unwrap().white, 254);
    }

    #[test]
    fn reset_zeroes_memory_and_store() {
        let mut c = CountStore::new(MemoryStore::new());
        c.record(MarbleType::Black);
        c.sync(ElapsedTime { minutes: 2, seconds: 3 }).unwrap();
        c.reset().unwrap();
        assert_eq!(c.counts(), MarbleCounts::default());
        for addr in [MIN_ADDR, SEC_ADDR, BLACK_COUNT_ADDR, WHITE_COUNT_ADDR] {
            assert_eq!(c.store().peek(addr), 0, "addr {addr}");
        }
    }

    #[test]
    fn write_failure_surfaces_as_storage_error() {
        let mut c = CountStore::new(MemoryStore::failing_writes());
        c.record(MarbleType::Black);
        let err = c.sync(ElapsedTime::default()).unwrap_err();
        assert!(matches!(err, SorterError::Storage(_)));
        assert_eq!(c.counts().black(), 1);
    }
}
