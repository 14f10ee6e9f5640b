use relay_core::{DispatchLedger, DispatchLimits, Gate, RequestId, SENT_MARKER};

fn ledger(max_concurrent: usize, stop_after: Option<usize>) -> DispatchLedger {
    DispatchLedger::new(DispatchLimits {
        max_concurrent,
        stop_after,
    })
}

#[test]
fn waits_for_a_client() {
    let ledger = ledger(3, Some(20));
    assert_eq!(ledger.gate(0), Gate::NoClients);
    assert_eq!(ledger.gate(1), Gate::Ready);
}

#[test]
fn in_flight_prompts_block_until_complete() {
    let mut ledger = ledger(2, None);
    ledger.record_sent(RequestId::from("a"));
    ledger.record_sent(RequestId::from("b"));
    assert_eq!(ledger.gate(1), Gate::AtCapacity);

    assert!(ledger.record_status(RequestId::from("a"), "input_complete"));
    assert_eq!(ledger.gate(1), Gate::AtCapacity);

    assert!(ledger.record_status(RequestId::from("a"), "progress_complete"));
    assert_eq!(ledger.in_flight(), 1);
    assert_eq!(ledger.gate(1), Gate::Ready);
}

#[test]
fn stop_after_exhausts_even_without_clients() {
    let mut ledger = ledger(5, Some(2));
    ledger.record_sent(RequestId::from("a"));
    ledger.record_sent(RequestId::from("b"));

    assert_eq!(ledger.sent(), 2);
    assert_eq!(ledger.gate(0), Gate::Exhausted);
    assert_eq!(ledger.gate(3), Gate::Exhausted);
}

#[test]
fn repeated_status_is_not_a_change() {
    let mut ledger = ledger(3, None);
    let id = RequestId::from("a");
    ledger.record_sent(id.clone());
    assert_eq!(ledger.status_of(&id), Some(SENT_MARKER));

    assert!(ledger.record_status(id.clone(), "45% Complete"));
    assert!(!ledger.record_status(id.clone(), "45% Complete"));
    assert_eq!(ledger.status_of(&id), Some("45% Complete"));
}

#[test]
fn status_for_unknown_id_is_recorded() {
    let mut ledger = ledger(3, None);
    assert!(ledger.record_status(RequestId::from("stray"), "input_complete"));
    assert_eq!(ledger.in_flight(), 1);
    assert_eq!(ledger.sent(), 0);
}
