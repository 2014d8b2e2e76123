//! Slot table under contention, through the same interrupt-safe spinlock
//! the mailbox uses.

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use common::HostHal;
use ns_mailbox::queue::SlotTable;
use ns_mailbox::sync::IrqSpinLock;
use ns_mailbox::{SlotIndex, SlotMask};

#[test]
fn racing_acquire_and_release_never_share_a_slot() {
    const N: usize = 4;
    let hal = HostHal::new();
    let table: IrqSpinLock<SlotTable<usize, N>> = IrqSpinLock::new(SlotTable::new());
    let in_use: [AtomicBool; N] = Default::default();
    let acquired = AtomicUsize::new(0);

    thread::scope(|s| {
        for worker in 0..8usize {
            let (hal, table, in_use, acquired) = (&hal, &table, &in_use, &acquired);
            s.spawn(move || {
                for _ in 0..2000 {
                    let slot = {
                        let mut t = table.lock(hal);
                        let slot = t.acquire_empty_slot();
                        if let Some(slot) = slot {
                            // A slot handed out again must come back clean.
                            assert!(t.owner(slot).is_none());
                            assert!(!t.is_woken(slot));
                            t.set_owner(slot, worker);
                        }
                        slot
                    };
                    let Some(slot) = slot else {
                        thread::yield_now();
                        continue;
                    };
                    assert!(!in_use[slot.get()].swap(true, Ordering::SeqCst));
                    acquired.fetch_add(1, Ordering::SeqCst);

                    {
                        let mut t = table.lock(hal);
                        assert_eq!(t.owner(slot), Some(&worker));
                        t.set_woken(slot);
                    }

                    in_use[slot.get()].store(false, Ordering::SeqCst);
                    table.lock(hal).release_slot(slot);
                }
            });
        }
    });

    assert!(acquired.load(Ordering::SeqCst) > 0);
    let t = table.lock(&hal);
    assert_eq!(t.empty_slots(), SlotMask::<N>::full());
    assert_eq!(t.used(), 0);
}

#[test]
fn full_table_reports_none_until_a_release() {
    let hal = HostHal::new();
    let table: IrqSpinLock<SlotTable<(), 2>> = IrqSpinLock::new(SlotTable::new());

    let a = table.lock(&hal).acquire_empty_slot().unwrap();
    let b = table.lock(&hal).acquire_empty_slot().unwrap();
    assert_ne!(a, b);
    assert_eq!(table.lock(&hal).acquire_empty_slot(), None);

    table.lock(&hal).release_slot(b);
    assert_eq!(table.lock(&hal).acquire_empty_slot(), Some(b));
    assert_eq!(SlotIndex::new::<2>(2), None);
}
