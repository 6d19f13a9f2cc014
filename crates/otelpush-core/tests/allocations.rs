//! Recording into an existing series must not touch the heap.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use otelpush_core::{AttributeSet, KeyValue, MeterProvider};

struct CountingAlloc;

thread_local! {
    static ALLOCS: Cell<usize> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let _ = ALLOCS.try_with(|c| c.set(c.get() + 1));
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

fn allocations_during(f: impl FnOnce()) -> usize {
    let before = ALLOCS.with(Cell::get);
    f();
    ALLOCS.with(Cell::get) - before
}

#[test]
fn small_attribute_sets_are_inline() {
    let route = [KeyValue::new("http.route", "/")];
    assert_eq!(allocations_during(|| drop(AttributeSet::from_slice(&[]))), 0);
    assert_eq!(allocations_during(|| drop(AttributeSet::from_slice(&route))), 0);
}

#[test]
fn existing_series_add_does_not_allocate() {
    let p = MeterProvider::builder().build().unwrap();
    let meter = p.meter("demo");
    let requests = meter.create_counter("http.server.requests", "", "1").unwrap();
    let active = meter.create_up_down_counter("http.server.active_requests", "", "1").unwrap();
    let route = [KeyValue::new("http.route", "/")];

    // first observation creates the series
    requests.add(1, &route).unwrap();
    active.add(1, &route);
    requests.add(1, &[]).unwrap();

    let n = allocations_during(|| {
        for _ in 0..100 {
            requests.add(1, &route).unwrap();
            requests.add(1, &[]).unwrap();
            active.add(1, &route);
            active.add(-1, &route);
        }
    });
    assert_eq!(n, 0);
    assert_eq!(p.snapshot().value("http.server.requests", &route), Some(101));
}
