//! Tests for stack guard provisioning and corruption detection.

use smelt::core::options::STACK_GUARD_PAGE_SIZE;
use smelt::core::{verify_guard_page, GuardedStack};

#[test]
fn guarded_stack_lifecycle() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut stack = GuardedStack::new(64 * 1024);

    // Simulate a generated function using its whole stack allocation.
    for (i, byte) in stack.stack_mut().iter_mut().enumerate() {
        *byte = (i % 251) as u8;
    }

    // Heavy stack use without an overflow leaves the guard page clean.
    stack.verify().unwrap();
    stack.check();
}

#[test]
fn overflow_into_the_guard_page_is_detected() {
    // An overflow writes below the stack base, i.e. into the top of the
    // guard page. Model the region directly to reach those bytes.
    let mut region = vec![0u8; STACK_GUARD_PAGE_SIZE + 4096];
    region[STACK_GUARD_PAGE_SIZE - 1] = 0xde;
    region[STACK_GUARD_PAGE_SIZE - 2] = 0xad;

    let corruption = verify_guard_page(&region).unwrap_err();
    assert_eq!(corruption.offset, STACK_GUARD_PAGE_SIZE - 2);

    let report = corruption.render_report();
    assert!(report.contains("guard_page="));
    assert!(report.contains("stack="));
    // The dump must show the corrupted tail of the guard page.
    assert!(corruption.guard_page.ends_with("adde"));
}

#[test]
fn every_guard_byte_is_load_bearing() {
    // Sampled offsets across the page, including both ends.
    for offset in [0, 1, 511, 4000, STACK_GUARD_PAGE_SIZE / 2, STACK_GUARD_PAGE_SIZE - 1] {
        let mut region = vec![0u8; STACK_GUARD_PAGE_SIZE + 16];
        region[offset] = 1;
        assert!(
            verify_guard_page(&region).is_err(),
            "corruption at offset {offset} went undetected"
        );
    }
}
