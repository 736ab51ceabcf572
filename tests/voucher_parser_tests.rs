//! Voucher parser tests over canned register responses.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_rs::client::ensure_status_ok;
use tally_rs::parsers::vouchers::{parse_vouchers, AmountResolution};

fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(path).expect("fixture must exist")
}

#[test]
fn sample_register_parses_three_vouchers_in_order() {
    let xml = fixture("voucher_register_sample.xml");
    ensure_status_ok(&xml).expect("status 1");

    let (vouchers, skipped) = parse_vouchers(&xml).unwrap();
    assert_eq!(skipped, 0);
    assert_eq!(vouchers.len(), 3);
    assert_eq!(vouchers[0].voucher_number, "S-101");
    assert_eq!(vouchers[1].voucher_number, "CN-12");
    assert_eq!(vouchers[2].voucher_number, "R-77");
}

#[test]
fn sales_invoice_recovers_tax_from_party_ledger_line() {
    let xml = fixture("voucher_register_sample.xml");
    let (vouchers, _) = parse_vouchers(&xml).unwrap();
    let sales = &vouchers[0];

    assert_eq!(sales.voucher_key, "guid-s-101");
    assert_eq!(sales.subtotal, dec!(100000.00));
    assert_eq!(sales.total, dec!(118000.00));
    assert_eq!(sales.tax, dec!(18000.00));
    assert_eq!(sales.resolution, AmountResolution::InventoryAndSettlement);

    // total = subtotal + tax + roundoff
    assert_eq!(sales.total, sales.subtotal + sales.tax + sales.roundoff);

    assert_eq!(sales.inventory.len(), 2);
    assert_eq!(sales.party_gstin.as_deref(), Some("27AABCU9603R1ZV"));
    assert_eq!(sales.party_pincode.as_deref(), Some("400001"));

    // The allocation belongs to the party ledger, not the GST head.
    assert_eq!(sales.bill_allocations.len(), 1);
    let alloc = &sales.bill_allocations[0];
    assert_eq!(alloc.ledger, "Acme Distributors");
    assert_eq!(alloc.ref_name, "BILL-1");
    assert_eq!(alloc.amount, dec!(-118000.00));
    assert_eq!(alloc.bill_type, "New Ref");
    assert_eq!(alloc.credit_period_days, Some(30));
}

#[test]
fn credit_note_lands_negative_with_negative_tax() {
    let xml = fixture("voucher_register_sample.xml");
    let (vouchers, _) = parse_vouchers(&xml).unwrap();
    let cn = &vouchers[1];

    assert_eq!(cn.voucher_type, "Credit Note");
    assert_eq!(cn.subtotal, dec!(-1000.00));
    assert_eq!(cn.total, dec!(-1180.00));
    assert_eq!(cn.tax, dec!(-180.00));
    assert!(cn.subtotal <= Decimal::ZERO && cn.total <= Decimal::ZERO);
    assert_eq!(cn.total, cn.subtotal + cn.tax);
}

#[test]
fn receipt_has_no_tax_and_carries_its_settlement_allocation() {
    let xml = fixture("voucher_register_sample.xml");
    let (vouchers, _) = parse_vouchers(&xml).unwrap();
    let receipt = &vouchers[2];

    assert!(receipt.is_receipt());
    assert_eq!(receipt.total, dec!(40000.00));
    assert_eq!(receipt.subtotal, receipt.total);
    assert_eq!(receipt.tax, Decimal::ZERO);
    assert!(receipt.total >= Decimal::ZERO);

    assert_eq!(receipt.bill_allocations.len(), 1);
    assert_eq!(receipt.bill_allocations[0].bill_type, "Agst Ref");
    assert_eq!(receipt.bill_allocations[0].amount, dec!(40000.00));
}

#[test]
fn empty_register_yields_no_vouchers() {
    let xml = fixture("voucher_register_empty.xml");
    ensure_status_ok(&xml).expect("empty responses are still successful");
    let (vouchers, skipped) = parse_vouchers(&xml).unwrap();
    assert!(vouchers.is_empty());
    assert_eq!(skipped, 0);
}

#[test]
fn status_error_response_is_rejected_with_detail() {
    let xml = fixture("status_error.xml");
    let err = ensure_status_ok(&xml).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("STATUS=0"), "got: {msg}");
    assert!(msg.contains("Wrong Company"), "got: {msg}");
}

#[test]
fn reparsing_yields_identical_records() {
    // Same input, same normalized output: the idempotence the writer
    // depends on starts here.
    let xml = fixture("voucher_register_sample.xml");
    let (first, _) = parse_vouchers(&xml).unwrap();
    let (second, _) = parse_vouchers(&xml).unwrap();

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.voucher_key, b.voucher_key);
        assert_eq!(a.subtotal, b.subtotal);
        assert_eq!(a.tax, b.tax);
        assert_eq!(a.total, b.total);
        assert_eq!(a.date, b.date);
        assert_eq!(a.inventory.len(), b.inventory.len());
        assert_eq!(a.bill_allocations.len(), b.bill_allocations.len());
    }
}

#[test]
fn line_sums_stay_within_tolerance_of_header_totals() {
    let xml = fixture("voucher_register_sample.xml");
    let (vouchers, _) = parse_vouchers(&xml).unwrap();

    for v in vouchers.iter().filter(|v| !v.inventory.is_empty()) {
        let line_sum: Decimal = v.inventory.iter().map(|l| l.amount).sum();
        let diff = (line_sum + v.tax - v.total).abs();
        assert!(
            diff <= dec!(1.00),
            "voucher {} line sum {line_sum} vs total {}",
            v.voucher_key,
            v.total
        );
    }
}
