//! Master parser tests over canned export files.

use rust_decimal_macros::dec;
use tally_rs::parsers::masters::{
    parse_ledger_masters, parse_stock_groups, parse_stock_items, parse_units,
};
use tally_rs::parsers::opening_bills::parse_opening_bills;

fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(path).expect("fixture must exist")
}

#[test]
fn units_parse_with_guid_and_gst_uom() {
    let xml = fixture("masters_sample.xml");
    let units = parse_units(&xml).unwrap();
    assert_eq!(units.len(), 2);
    assert_eq!(units[0].name, "no.");
    assert_eq!(units[0].guid.as_deref(), Some("unit-guid-1"));
    assert_eq!(units[0].gst_rep_uom.as_deref(), Some("PCS-PIECES"));
    // Space-separated ALTERID still parses.
    assert_eq!(units[1].alter_id, Some(1024));
}

#[test]
fn stock_group_hierarchy_has_one_root() {
    let xml = fixture("masters_sample.xml");
    let groups = parse_stock_groups(&xml).unwrap();
    assert_eq!(groups.len(), 2);

    let roots: Vec<_> = groups.iter().filter(|g| g.parent_name.is_none()).collect();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].name, "Electronics");
}

#[test]
fn items_prefer_latest_hsn_details_entry() {
    let xml = fixture("masters_sample.xml");
    let items = parse_stock_items(&xml).unwrap();
    assert_eq!(items.len(), 2);

    let radio = items.iter().find(|i| i.name == "FM Radio").unwrap();
    assert_eq!(radio.hsn_code.as_deref(), Some("85271300"));
    assert_eq!(radio.base_units.as_deref(), Some("no."));
    assert_eq!(radio.parent_name.as_deref(), Some("Radios"));

    let speaker = items.iter().find(|i| i.name == "Speaker").unwrap();
    assert_eq!(speaker.hsn_code.as_deref(), Some("85182900"));
}

#[test]
fn ledger_masters_carry_groups_and_parents() {
    let xml = fixture("ledgers_opening_bills.xml");
    let (groups, ledgers) = parse_ledger_masters(&xml).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "Sundry Debtors");
    assert_eq!(groups[0].parent_name.as_deref(), Some("Current Assets"));

    assert_eq!(ledgers.len(), 3);
    let acme = ledgers.iter().find(|l| l.name == "Acme Distributors").unwrap();
    assert_eq!(acme.parent_name.as_deref(), Some("Sundry Debtors"));
    let gst = ledgers.iter().find(|l| l.name == "Output GST").unwrap();
    assert_eq!(gst.parent_name.as_deref(), Some("Duties & Taxes"));
}

#[test]
fn opening_bills_parse_with_signs_and_flags() {
    let xml = fixture("ledgers_opening_bills.xml");
    let bills = parse_opening_bills(&xml).unwrap();
    assert_eq!(bills.len(), 2);

    let open = bills.iter().find(|b| b.ref_name == "OPEN-1").unwrap();
    assert_eq!(open.ledger, "Acme Distributors");
    assert_eq!(open.opening_balance, dec!(-50000.00));
    assert_eq!(open.credit_period_days, Some(30));
    assert!(!open.is_advance);

    let adv = bills.iter().find(|b| b.ref_name == "ADV-3").unwrap();
    assert_eq!(adv.ledger, "Khanna Radios");
    assert!(adv.is_advance);
    assert!(adv.bill_date.is_none());
}
