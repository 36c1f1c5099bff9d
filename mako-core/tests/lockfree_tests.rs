//! Cross-thread stress tests for the lock-free primitives.

use mako_core::core::Symbol;
use mako_core::sync::{map::LockFreeMap, mpsc, slab::SlabPool, spsc};
use std::sync::Arc;
use std::thread;

#[test]
fn spsc_total_value_conservation() {
    const ITEMS: u64 = 100_000;
    let (tx, rx) = spsc::ring::<u64, 1024>();

    let producer = thread::spawn(move || {
        let mut sum = 0u64;
        for i in 0..ITEMS {
            let mut v = i;
            loop {
                match tx.push(v) {
                    Ok(()) => break,
                    Err(back) => {
                        v = back;
                        std::hint::spin_loop();
                    }
                }
            }
            sum += i;
        }
        sum
    });

    let consumer = thread::spawn(move || {
        let mut sum = 0u64;
        let mut count = 0u64;
        while count < ITEMS {
            if let Some(v) = rx.pop() {
                sum += v;
                count += 1;
            } else {
                std::hint::spin_loop();
            }
        }
        // Nothing should remain.
        assert!(rx.pop().is_none());
        sum
    });

    assert_eq!(producer.join().unwrap(), consumer.join().unwrap());
}

#[test]
fn spsc_preserves_fifo_order() {
    const ITEMS: u64 = 50_000;
    let (tx, rx) = spsc::ring::<u64, 256>();

    let producer = thread::spawn(move || {
        for i in 0..ITEMS {
            let mut v = i;
            while let Err(back) = tx.push(v) {
                v = back;
            }
        }
    });

    let consumer = thread::spawn(move || {
        let mut expected = 0u64;
        while expected < ITEMS {
            if let Some(v) = rx.pop() {
                assert_eq!(v, expected);
                expected += 1;
            }
        }
    });

    producer.join().unwrap();
    consumer.join().unwrap();
}

#[test]
fn mpsc_multiset_equality_under_contention() {
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 10_000;

    let (tx, rx) = mpsc::ring::<(usize, usize), 512>();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let tx = tx.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let mut v = (p, i);
                    loop {
                        match tx.push(v) {
                            Ok(()) => break,
                            Err(back) => {
                                v = back;
                                std::hint::spin_loop();
                            }
                        }
                    }
                }
            })
        })
        .collect();
    drop(tx);

    let consumer = thread::spawn(move || {
        // Per-producer sequences must each arrive in order and complete.
        let mut next = [0usize; PRODUCERS];
        let mut total = 0usize;
        while total < PRODUCERS * PER_PRODUCER {
            if let Some((p, i)) = rx.pop() {
                assert_eq!(i, next[p], "producer {p} out of order");
                next[p] += 1;
                total += 1;
            } else {
                std::hint::spin_loop();
            }
        }
        next
    });

    for h in producers {
        h.join().unwrap();
    }
    let next = consumer.join().unwrap();
    assert!(next.iter().all(|&n| n == PER_PRODUCER));
}

#[test]
fn map_supports_concurrent_find_during_quiescent_phase() {
    let map: Arc<LockFreeMap<Symbol, u64>> = Arc::new(LockFreeMap::with_capacity(256));

    // Registration phase: single writer.
    let symbols: Vec<String> = (0..100).map(|i| format!("SYM{i:03}")).collect();
    for (i, s) in symbols.iter().enumerate() {
        assert!(map.insert(Symbol::new(s), i as u64 * 10));
    }

    // Running phase: many readers.
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let map = Arc::clone(&map);
            let symbols = symbols.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    for (i, s) in symbols.iter().enumerate() {
                        assert_eq!(map.find(&Symbol::new(s)), Some(&(i as u64 * 10)));
                    }
                    assert_eq!(map.find(&Symbol::new("MISSING")), None);
                }
            })
        })
        .collect();
    for h in readers {
        h.join().unwrap();
    }
}

#[test]
fn slab_books_remain_readable_while_others_churn() {
    use mako_core::orderbook::OrderBook;

    let mut pool: SlabPool<OrderBook> = SlabPool::with_capacity(16);
    let stable = pool.allocate(OrderBook::new(Symbol::new("KEEP"))).unwrap();

    for round in 0..100 {
        let tmp = pool
            .allocate(OrderBook::new(Symbol::new("TMP")))
            .expect("pool has room");
        pool.get(stable)
            .unwrap()
            .update_bid(0, 100.0 + round as f64, 1.0);
        pool.deallocate(tmp);
    }

    let book = pool.get(stable).unwrap();
    assert_eq!(book.symbol(), Symbol::new("KEEP"));
    assert_eq!(book.bid_sequence(), 100);
    assert_eq!(pool.available(), 15);
}
