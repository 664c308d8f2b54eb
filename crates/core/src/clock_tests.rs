// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new();
    let before_ms = clock.epoch_ms();
    let before = clock.now();

    clock.advance(Duration::from_secs(90));

    assert_eq!(clock.epoch_ms(), before_ms + 90_000);
    assert_eq!(clock.now().duration_since(before), Duration::from_secs(90));
}

#[test]
fn iso_now_is_rfc3339_utc() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_700_000_000_000);
    let ts = clock.iso_now();
    assert!(ts.ends_with('Z'), "expected UTC suffix: {ts}");
    assert!(ts.starts_with("2023-11-14T"), "unexpected date: {ts}");
}

#[test]
fn system_clock_epoch_is_sane() {
    let clock = SystemClock;
    // Later than 2023-01-01 in ms.
    assert!(clock.epoch_ms() > 1_672_000_000_000);
}
