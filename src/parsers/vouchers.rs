//! Voucher stream parser.
//!
//! Turns a voucher-register response into normalized [`ParsedVoucher`]
//! records: stable key derivation, tolerant field extraction, and the
//! multi-source amount resolution that recovers tax from whichever of the
//! three amount carriers (inventory entries, party ledger entry, bill
//! allocation) the export variant actually filled in.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::warn;

use super::xml::{
    parse_amount, parse_credit_days, parse_date_or_today, sanitize_xml, Element, ParseError,
    SubtreeReader,
};

/// Voucher types that carry an itemised tax split (invoice-like). These are
/// also the types whose party ledger entry lives under the single-R
/// `LEDGERENTRIES.LIST` tag; everything else uses `ALLLEDGERENTRIES.LIST`.
const INVOICE_TYPES: &[&str] = &[
    "invoice",
    "sales",
    "credit note",
    "sales return",
    "purchase",
    "purchase return",
    "debit note",
];

/// Types stored as positive magnitudes.
const POSITIVE_TYPES: &[&str] = &["sales", "invoice", "purchase", "receipt", "payment"];

/// Types normalized to negative magnitudes.
const NEGATIVE_TYPES: &[&str] = &["credit note", "sales return", "debit note"];

/// Which of the amount-resolution cases produced the header totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountResolution {
    /// Inventory total plus a settlement-side amount (ledger or bill).
    InventoryAndSettlement,
    /// Party ledger entry only.
    LedgerOnly,
    /// Bill allocation only.
    BillAllocationOnly,
    /// Inventory total only (export variant with empty bill allocations).
    InventoryOnly,
    /// Header AMOUNT fallback; logged, since it loses the tax split.
    HeaderOnly,
}

#[derive(Debug, Clone)]
pub struct InventoryEntry {
    pub item_name: String,
    pub billed_qty: Option<String>,
    pub rate: Option<String>,
    pub amount: Decimal,
    pub discount: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct BillAllocation {
    pub ledger: String,
    pub ref_name: String,
    pub amount: Decimal,
    pub bill_type: String,
    pub credit_period_days: Option<i32>,
}

/// One normalized voucher.
#[derive(Debug, Clone)]
pub struct ParsedVoucher {
    pub voucher_key: String,
    pub voucher_type: String,
    pub voucher_number: String,
    /// GUID after REMOTEID promotion; may still be empty.
    pub guid: String,
    pub date: NaiveDate,
    pub party: String,
    pub party_gstin: Option<String>,
    pub party_pincode: Option<String>,
    pub party_city: Option<String>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub roundoff: Decimal,
    pub inventory: Vec<InventoryEntry>,
    pub bill_allocations: Vec<BillAllocation>,
    pub resolution: AmountResolution,
}

impl ParsedVoucher {
    pub fn is_receipt(&self) -> bool {
        self.voucher_type.eq_ignore_ascii_case("receipt")
    }
}

fn is_invoice_type(vchtype: &str) -> bool {
    let lower = vchtype.to_ascii_lowercase();
    INVOICE_TYPES.contains(&lower.as_str())
}

fn is_positive_type(vchtype: &str) -> bool {
    let lower = vchtype.to_ascii_lowercase();
    POSITIVE_TYPES.contains(&lower.as_str())
}

fn is_negative_type(vchtype: &str) -> bool {
    let lower = vchtype.to_ascii_lowercase();
    NEGATIVE_TYPES.contains(&lower.as_str())
}

/// Streaming reader over the `VOUCHER` elements of a response document.
///
/// Yields vouchers in document order as each subtree completes. Duplicate
/// vouchers (same derived key, which some exports repeat across nested
/// collections) are skipped, as are subtrees that cannot be extracted;
/// both are counted, not fatal.
pub struct VoucherReader<'a> {
    subtrees: SubtreeReader<'a>,
    seen: HashSet<String>,
    skipped: usize,
}

const VOUCHER_TARGETS: &[&str] = &["VOUCHER"];

impl<'a> VoucherReader<'a> {
    /// `xml` must already be sanitized with [`sanitize_xml`].
    pub fn new(xml: &'a str) -> Self {
        VoucherReader {
            subtrees: SubtreeReader::new(xml, VOUCHER_TARGETS),
            seen: HashSet::new(),
            skipped: 0,
        }
    }

    /// Vouchers skipped so far (bad subtree or in-document duplicate).
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn next_voucher(&mut self) -> Result<Option<ParsedVoucher>, ParseError> {
        loop {
            let Some(el) = self.subtrees.next_subtree()? else {
                return Ok(None);
            };
            match extract_voucher(&el) {
                Some(v) => {
                    if !self.seen.insert(v.voucher_key.clone()) {
                        self.skipped += 1;
                        continue;
                    }
                    return Ok(Some(v));
                }
                None => {
                    warn!("skipping unusable voucher element");
                    self.skipped += 1;
                }
            }
        }
    }
}

/// Parse a raw response into a vector of vouchers. Convenience for callers
/// that want the whole window at once (the driver keeps the vector as its
/// per-run cache anyway).
pub fn parse_vouchers(xml_text: &str) -> Result<(Vec<ParsedVoucher>, usize), ParseError> {
    let clean = sanitize_xml(xml_text);
    let mut reader = VoucherReader::new(&clean);
    let mut out = Vec::new();
    while let Some(v) = reader.next_voucher()? {
        out.push(v);
    }
    Ok((out, reader.skipped()))
}

fn attr_or_child<'e>(el: &'e Element, name: &str) -> Option<&'e str> {
    el.attr(name).or_else(|| el.child_text(name))
}

fn extract_voucher(el: &Element) -> Option<ParsedVoucher> {
    let voucher_type = attr_or_child(el, "VCHTYPE")
        .or_else(|| el.child_text("VOUCHERTYPENAME"))
        .unwrap_or("")
        .to_string();
    let voucher_number = attr_or_child(el, "VCHNUMBER")
        .or_else(|| el.child_text("VOUCHERNUMBER"))
        .unwrap_or("")
        .to_string();

    let mut guid = attr_or_child(el, "GUID").unwrap_or("").to_string();
    if guid.is_empty() {
        // REMOTEID stands in for the GUID on exports that omit it; without
        // this promotion distinct vouchers collapse onto one key.
        if let Some(remote) = attr_or_child(el, "REMOTEID") {
            guid = remote.to_string();
        }
    }

    let date = parse_date_or_today(el.child_text("DATE"));
    let party = el
        .child_text("PARTYLEDGERNAME")
        .or_else(|| el.child_text("PARTYNAME"))
        .unwrap_or("")
        .to_string();

    // A voucher with no type, no party and no amounts is structural noise.
    if voucher_type.is_empty() && party.is_empty() && guid.is_empty() {
        return None;
    }

    let party_gstin = el
        .child_text("PARTYGSTIN")
        .or_else(|| el.child_text("BASICBUYERPARTYGSTIN"))
        .map(str::to_string);
    let party_pincode = el
        .child_text("PARTYPINCODE")
        .or_else(|| el.child_text("BASICBUYERPINCODE"))
        .map(str::to_string);
    let party_city = el
        .child_text("PARTYCITY")
        .or_else(|| el.child_text("BASICBUYERSTATE"))
        .map(str::to_string);

    let inventory = extract_inventory(el);
    let bill_allocations = extract_bill_allocations(el, &party);

    let (subtotal, total, resolution) = resolve_amounts(el, &voucher_type, &party, &inventory);
    let (subtotal, total) = normalize_signs(&voucher_type, subtotal, total);

    let (subtotal, tax) = if is_invoice_type(&voucher_type) {
        (subtotal, total - subtotal)
    } else {
        // Non-invoice vouchers carry no tax split.
        (total, Decimal::ZERO)
    };

    if resolution == AmountResolution::HeaderOnly {
        warn!(
            voucher_type = %voucher_type,
            voucher_number = %voucher_number,
            %party,
            "amount resolution fell back to the header AMOUNT; tax split unavailable"
        );
    }

    let voucher_key = derive_voucher_key(&voucher_type, &voucher_number, &guid, date, &party, total);

    Some(ParsedVoucher {
        voucher_key,
        voucher_type,
        voucher_number,
        guid,
        date,
        party,
        party_gstin,
        party_pincode,
        party_city,
        subtotal,
        tax,
        total,
        roundoff: Decimal::ZERO,
        inventory,
        bill_allocations,
        resolution,
    })
}

fn extract_inventory(el: &Element) -> Vec<InventoryEntry> {
    let mut entries = Vec::new();
    let mut seen: HashSet<(String, String, String)> = HashSet::new();

    for tag in ["ALLINVENTORYENTRIES.LIST", "INVENTORYENTRIES.LIST"] {
        for inv in el.descendants(tag) {
            let Some(name) = inv.child_text("STOCKITEMNAME").or_else(|| inv.child_text("NAME"))
            else {
                continue;
            };
            let billed_qty = inv.child_text("BILLEDQTY").map(str::to_string);
            let amount = parse_amount(inv.child_text("AMOUNT"));
            let key = (
                name.to_string(),
                billed_qty.clone().unwrap_or_default(),
                amount.to_string(),
            );
            if !seen.insert(key) {
                continue;
            }
            entries.push(InventoryEntry {
                item_name: name.to_string(),
                billed_qty,
                rate: inv.child_text("RATE").map(str::to_string),
                amount,
                discount: inv
                    .child_text("DISCOUNT")
                    .map(|d| parse_amount(Some(d))),
            });
        }
    }

    entries
}

/// Collect bill allocations, attributing each to the nearest enclosing
/// ledger entry's LEDGERNAME, or to the voucher party when the allocation
/// sits outside any ledger entry.
fn extract_bill_allocations(el: &Element, party: &str) -> Vec<BillAllocation> {
    let mut out = Vec::new();
    let mut seen: HashSet<(String, String, String, String)> = HashSet::new();
    walk_bills(el, None, party, &mut out, &mut seen);
    out
}

fn walk_bills(
    el: &Element,
    ledger: Option<&str>,
    party: &str,
    out: &mut Vec<BillAllocation>,
    seen: &mut HashSet<(String, String, String, String)>,
) {
    for child in &el.children {
        if child.name == "BILLALLOCATIONS.LIST" {
            let Some(name) = child
                .child_text("NAME")
                .or_else(|| child.child_text("BILLNAME"))
            else {
                continue;
            };
            let owner = ledger.unwrap_or(party);
            if owner.is_empty() {
                continue;
            }
            let amount = parse_amount(child.child_text("AMOUNT"));
            let bill_type = child.child_text("BILLTYPE").unwrap_or("New Ref").to_string();
            let key = (
                owner.to_string(),
                name.to_string(),
                amount.to_string(),
                bill_type.clone(),
            );
            if !seen.insert(key) {
                continue;
            }
            out.push(BillAllocation {
                ledger: owner.to_string(),
                ref_name: name.to_string(),
                amount,
                bill_type,
                credit_period_days: parse_credit_days(child.child_text("BILLCREDITPERIOD")),
            });
            continue;
        }

        let next_ledger = if child.name == "LEDGERENTRIES.LIST"
            || child.name == "ALLLEDGERENTRIES.LIST"
        {
            child.child_text("LEDGERNAME").or(ledger)
        } else {
            ledger
        };
        walk_bills(child, next_ledger, party, out, seen);
    }
}

/// Match a ledger entry to the voucher party: case-insensitive equality,
/// with a 15-character prefix comparison as fallback for exports that
/// truncate names.
fn ledger_matches_party(ledger_name: &str, party: &str) -> bool {
    if ledger_name.eq_ignore_ascii_case(party) {
        return true;
    }
    let a: String = ledger_name.to_ascii_lowercase().chars().take(15).collect();
    let b: String = party.to_ascii_lowercase().chars().take(15).collect();
    !a.is_empty() && a == b
}

/// The five-case amount resolution. Returns (subtotal, total, case).
fn resolve_amounts(
    el: &Element,
    voucher_type: &str,
    party: &str,
    inventory: &[InventoryEntry],
) -> (Decimal, Decimal, AmountResolution) {
    let amt_inventory: Option<Decimal> = if inventory.is_empty() {
        None
    } else {
        Some(inventory.iter().map(|i| i.amount).sum())
    };

    // Invoice-like vouchers put the party line under LEDGERENTRIES.LIST;
    // receipts, payments and journals under ALLLEDGERENTRIES.LIST. Searching
    // the wrong tag finds nothing and the tax split is lost.
    let ledger_tag = if is_invoice_type(voucher_type) {
        "LEDGERENTRIES.LIST"
    } else {
        "ALLLEDGERENTRIES.LIST"
    };
    let amt_ledger: Option<Decimal> = (!party.is_empty())
        .then(|| {
            el.descendants(ledger_tag).into_iter().find_map(|entry| {
                let name = entry.child_text("LEDGERNAME")?;
                ledger_matches_party(name, party)
                    .then(|| parse_amount(entry.child_text("AMOUNT")))
            })
        })
        .flatten();

    let amt_bill_alloc: Option<Decimal> = el
        .descendants("BILLALLOCATIONS.LIST")
        .into_iter()
        .map(|bill| parse_amount(bill.child_text("AMOUNT")))
        .find(|amt| !amt.is_zero());

    match (amt_inventory, amt_ledger, amt_bill_alloc) {
        (Some(inv), Some(led), _) => (inv, led.abs(), AmountResolution::InventoryAndSettlement),
        (Some(inv), None, Some(bill)) => {
            (inv, bill.abs(), AmountResolution::InventoryAndSettlement)
        }
        (None, Some(led), _) => (led.abs(), led.abs(), AmountResolution::LedgerOnly),
        (None, None, Some(bill)) => (bill, bill, AmountResolution::BillAllocationOnly),
        (Some(inv), None, None) => (inv, inv, AmountResolution::InventoryOnly),
        (None, None, None) => {
            let header = parse_amount(el.child_text("AMOUNT"));
            (header, header, AmountResolution::HeaderOnly)
        }
    }
}

/// Apply the sign conventions: positive magnitudes for sales/purchase/cash
/// types, negative for credit notes and returns. Other types keep the
/// resolved sign.
fn normalize_signs(voucher_type: &str, subtotal: Decimal, total: Decimal) -> (Decimal, Decimal) {
    if is_positive_type(voucher_type) {
        (subtotal.abs(), total.abs())
    } else if is_negative_type(voucher_type) {
        (-subtotal.abs(), -total.abs())
    } else {
        (subtotal, total)
    }
}

/// Derive the stable warehouse key for a voucher.
///
/// Preference order: GUID (REMOTEID already promoted into it), then the
/// `vchtype/vchnumber/date/party` tuple when a voucher number exists, then a
/// hashed fallback so that number-less vouchers on the same day for the same
/// party still get distinct keys.
pub fn derive_voucher_key(
    voucher_type: &str,
    voucher_number: &str,
    guid: &str,
    date: NaiveDate,
    party: &str,
    amount: Decimal,
) -> String {
    if !guid.is_empty() {
        return guid.to_string();
    }
    if !voucher_number.is_empty() {
        return format!("{voucher_type}/{voucher_number}/{date}/{party}");
    }
    let digest = Sha256::digest(format!("{voucher_type}|{date}|{party}|{amount}").as_bytes());
    let mut hash = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        hash.push_str(&format!("{byte:02x}"));
    }
    format!("{voucher_type}/{date}/{party}#{hash}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn parse_one(xml: &str) -> ParsedVoucher {
        let (vouchers, skipped) = parse_vouchers(xml).expect("parse");
        assert_eq!(skipped, 0, "no vouchers should be skipped");
        assert_eq!(vouchers.len(), 1);
        vouchers.into_iter().next().unwrap()
    }

    #[test]
    fn sales_invoice_with_inventory_and_bill_allocation() {
        // Inventory carries the pre-tax total, the party ledger line the
        // gross; tax is the difference.
        let xml = r#"<ENVELOPE><BODY><DATA>
            <VOUCHER VCHTYPE="Sales" VCHNUMBER="S-101" GUID="abcd-1234">
                <DATE>20251011</DATE>
                <PARTYLEDGERNAME>Acme Distributors</PARTYLEDGERNAME>
                <ALLINVENTORYENTRIES.LIST>
                    <STOCKITEMNAME>Widget</STOCKITEMNAME>
                    <BILLEDQTY>2 Nos</BILLEDQTY>
                    <RATE>50000 / Nos</RATE>
                    <AMOUNT>100000.00</AMOUNT>
                </ALLINVENTORYENTRIES.LIST>
                <LEDGERENTRIES.LIST>
                    <LEDGERNAME>Acme Distributors</LEDGERNAME>
                    <AMOUNT>118000.00</AMOUNT>
                    <BILLALLOCATIONS.LIST>
                        <NAME>BILL-1</NAME>
                        <AMOUNT>-118000.00</AMOUNT>
                        <BILLTYPE>New Ref</BILLTYPE>
                    </BILLALLOCATIONS.LIST>
                </LEDGERENTRIES.LIST>
            </VOUCHER>
        </DATA></BODY></ENVELOPE>"#;

        let v = parse_one(xml);
        assert_eq!(v.voucher_key, "abcd-1234");
        assert_eq!(v.subtotal, dec!(100000.00));
        assert_eq!(v.total, dec!(118000.00));
        assert_eq!(v.tax, dec!(18000.00));
        assert_eq!(v.resolution, AmountResolution::InventoryAndSettlement);
        assert_eq!(v.bill_allocations.len(), 1);
        assert_eq!(v.bill_allocations[0].ledger, "Acme Distributors");
        assert_eq!(v.bill_allocations[0].amount, dec!(-118000.00));
    }

    #[test]
    fn credit_note_is_negated() {
        let xml = r#"<ENVELOPE><BODY><DATA>
            <VOUCHER VCHTYPE="Credit Note" VCHNUMBER="CN-7" GUID="cn-guid">
                <DATE>2025-10-11</DATE>
                <PARTYLEDGERNAME>Acme Distributors</PARTYLEDGERNAME>
                <ALLINVENTORYENTRIES.LIST>
                    <STOCKITEMNAME>Widget</STOCKITEMNAME>
                    <AMOUNT>1000.00</AMOUNT>
                </ALLINVENTORYENTRIES.LIST>
                <LEDGERENTRIES.LIST>
                    <LEDGERNAME>Acme Distributors</LEDGERNAME>
                    <AMOUNT>1180.00</AMOUNT>
                </LEDGERENTRIES.LIST>
            </VOUCHER>
        </DATA></BODY></ENVELOPE>"#;

        let v = parse_one(xml);
        assert_eq!(v.subtotal, dec!(-1000.00));
        assert_eq!(v.total, dec!(-1180.00));
        assert_eq!(v.tax, dec!(-180.00));
        assert!(v.tax <= Decimal::ZERO);
        assert_eq!(v.total, v.subtotal + v.tax);
    }

    #[test]
    fn invoice_without_bill_allocation_uses_party_ledger_line() {
        // Export variant with structurally empty bill allocations; the party
        // line carries a negative gross which must surface as positive total.
        let xml = r#"<ENVELOPE><BODY><DATA>
            <VOUCHER VCHTYPE="Invoice" VCHNUMBER="V-88" GUID="v88-guid">
                <DATE>11-Oct-2025</DATE>
                <PARTYLEDGERNAME>Vishwakarma Traders</PARTYLEDGERNAME>
                <ALLINVENTORYENTRIES.LIST>
                    <STOCKITEMNAME>Pipe</STOCKITEMNAME>
                    <AMOUNT>78559.29</AMOUNT>
                </ALLINVENTORYENTRIES.LIST>
                <LEDGERENTRIES.LIST>
                    <LEDGERNAME>Vishwakarma Traders</LEDGERNAME>
                    <AMOUNT>-92700.00</AMOUNT>
                </LEDGERENTRIES.LIST>
            </VOUCHER>
        </DATA></BODY></ENVELOPE>"#;

        let v = parse_one(xml);
        assert_eq!(v.subtotal, dec!(78559.29));
        assert_eq!(v.total, dec!(92700.00));
        assert_eq!(v.tax, dec!(14140.71));
    }

    #[test]
    fn remoteid_promotion_keeps_vouchers_distinct() {
        let xml = r#"<ENVELOPE><BODY><DATA>
            <VOUCHER VCHTYPE="Invoice" REMOTEID="r-001">
                <DATE>20251013</DATE>
                <PARTYLEDGERNAME>Khanna Radios</PARTYLEDGERNAME>
                <AMOUNT>10000.00</AMOUNT>
            </VOUCHER>
            <VOUCHER VCHTYPE="Invoice" REMOTEID="r-002">
                <DATE>20251013</DATE>
                <PARTYLEDGERNAME>Khanna Radios</PARTYLEDGERNAME>
                <AMOUNT>20000.00</AMOUNT>
            </VOUCHER>
        </DATA></BODY></ENVELOPE>"#;

        let (vouchers, _) = parse_vouchers(xml).unwrap();
        assert_eq!(vouchers.len(), 2);
        assert_eq!(vouchers[0].voucher_key, "r-001");
        assert_eq!(vouchers[1].voucher_key, "r-002");
    }

    #[test]
    fn keyless_vouchers_fall_back_to_hash_and_stay_distinct() {
        let d = NaiveDate::from_ymd_opt(2025, 10, 13).unwrap();
        let k1 = derive_voucher_key("Invoice", "", "", d, "Khanna Radios", dec!(10000.00));
        let k2 = derive_voucher_key("Invoice", "", "", d, "Khanna Radios", dec!(20000.00));
        assert_ne!(k1, k2);
        assert!(k1.contains('#'));
        assert!(k1.starts_with("Invoice/2025-10-13/Khanna Radios#"));
        // Stable across calls.
        assert_eq!(
            k1,
            derive_voucher_key("Invoice", "", "", d, "Khanna Radios", dec!(10000.00))
        );
    }

    #[test]
    fn voucher_number_key_shape() {
        let d = NaiveDate::from_ymd_opt(2025, 10, 13).unwrap();
        let key = derive_voucher_key("Sales", "S-101", "", d, "Test Customer", dec!(1000));
        assert_eq!(key, "Sales/S-101/2025-10-13/Test Customer");
    }

    #[test]
    fn receipt_uses_all_ledger_entries_and_carries_no_tax() {
        let xml = r#"<ENVELOPE><BODY><DATA>
            <VOUCHER VCHTYPE="Receipt" VCHNUMBER="R-5" GUID="rcpt-guid">
                <DATE>20251012</DATE>
                <PARTYLEDGERNAME>Acme Distributors</PARTYLEDGERNAME>
                <ALLLEDGERENTRIES.LIST>
                    <LEDGERNAME>Acme Distributors</LEDGERNAME>
                    <AMOUNT>40000.00</AMOUNT>
                    <BILLALLOCATIONS.LIST>
                        <NAME>BILL-1</NAME>
                        <AMOUNT>40000.00</AMOUNT>
                        <BILLTYPE>Agst Ref</BILLTYPE>
                    </BILLALLOCATIONS.LIST>
                </ALLLEDGERENTRIES.LIST>
            </VOUCHER>
        </DATA></BODY></ENVELOPE>"#;

        let v = parse_one(xml);
        assert!(v.is_receipt());
        assert_eq!(v.total, dec!(40000.00));
        assert_eq!(v.subtotal, v.total);
        assert_eq!(v.tax, Decimal::ZERO);
        assert_eq!(v.bill_allocations[0].bill_type, "Agst Ref");
    }

    #[test]
    fn header_only_fallback() {
        let xml = r#"<ENVELOPE><BODY><DATA>
            <VOUCHER VCHTYPE="Journal" VCHNUMBER="J-1" GUID="j-guid">
                <DATE>20251012</DATE>
                <PARTYLEDGERNAME>Sundry</PARTYLEDGERNAME>
                <AMOUNT>500.00</AMOUNT>
            </VOUCHER>
        </DATA></BODY></ENVELOPE>"#;

        let v = parse_one(xml);
        assert_eq!(v.resolution, AmountResolution::HeaderOnly);
        assert_eq!(v.total, dec!(500.00));
        assert_eq!(v.tax, Decimal::ZERO);
    }

    #[test]
    fn ledger_match_tolerates_truncated_names() {
        assert!(ledger_matches_party("ACME DISTRIBUTORS", "Acme Distributors"));
        assert!(ledger_matches_party(
            "Acme Distributo",
            "Acme Distributors Pvt Ltd"
        ));
        assert!(!ledger_matches_party("Other Party", "Acme Distributors"));
    }

    #[test]
    fn bad_date_falls_back_to_today() {
        let xml = r#"<ENVELOPE><BODY><DATA>
            <VOUCHER VCHTYPE="Sales" VCHNUMBER="S-9" GUID="g-9">
                <DATE>bogus</DATE>
                <PARTYLEDGERNAME>Acme</PARTYLEDGERNAME>
                <AMOUNT>10.00</AMOUNT>
            </VOUCHER>
        </DATA></BODY></ENVELOPE>"#;
        let v = parse_one(xml);
        assert_eq!(v.date, chrono::Local::now().date_naive());
    }
}
