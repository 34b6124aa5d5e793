//! Multi-threaded behavior: the one-shot claim under contention and
//! sustained subscribe/unsubscribe/publish churn.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use evbus::{EventBus, Priority};

struct Ping;

const PUBLISHERS: usize = 8;

#[test]
fn one_shot_fires_exactly_once_under_contention() {
    let bus = EventBus::new();
    let calls = Arc::new(AtomicU32::new(0));

    {
        let calls = Arc::clone(&calls);
        bus.subscribe_once(Priority::Normal, move |_: &Ping| {
            calls.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
        .unwrap();
    }

    let barrier = Barrier::new(PUBLISHERS);
    thread::scope(|s| {
        for _ in 0..PUBLISHERS {
            s.spawn(|| {
                barrier.wait();
                bus.publish(Ping).unwrap();
            });
        }
    });

    assert_eq!(calls.load(Ordering::Relaxed), 1);
    assert_eq!(bus.handler_count::<Ping>(), 0);
}

#[test]
fn every_concurrent_publish_reaches_a_permanent_handler() {
    let bus = EventBus::new();
    let calls = Arc::new(AtomicU32::new(0));

    {
        let calls = Arc::clone(&calls);
        bus.subscribe(Priority::Normal, move |_: &Ping| {
            calls.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
        .unwrap();
    }

    let barrier = Barrier::new(PUBLISHERS);
    thread::scope(|s| {
        for _ in 0..PUBLISHERS {
            s.spawn(|| {
                barrier.wait();
                bus.publish(Ping).unwrap();
            });
        }
    });

    assert_eq!(calls.load(Ordering::Relaxed), PUBLISHERS as u32);
}

#[test]
fn subscribe_unsubscribe_churn_under_a_live_publisher() {
    const WORKERS: usize = 4;
    const ROUNDS: usize = 2000;

    let bus = EventBus::new();
    let stop = AtomicBool::new(false);
    let calls = Arc::new(AtomicU32::new(0));
    let barrier = Barrier::new(WORKERS);

    thread::scope(|s| {
        let publisher = s.spawn(|| {
            while !stop.load(Ordering::Acquire) {
                bus.publish(Ping).unwrap();
            }
        });

        thread::scope(|workers| {
            for _ in 0..WORKERS {
                workers.spawn(|| {
                    barrier.wait();
                    for _ in 0..ROUNDS {
                        let calls = Arc::clone(&calls);
                        let id = bus
                            .subscribe(Priority::Normal, move |_: &Ping| {
                                calls.fetch_add(1, Ordering::Relaxed);
                                Ok(())
                            })
                            .unwrap();
                        bus.unsubscribe(id);
                    }
                });
            }
        });

        stop.store(true, Ordering::Release);
        publisher.join().unwrap();
    });

    // Every registration was matched by an unsubscribe.
    assert_eq!(bus.handler_count::<Ping>(), 0);
}
