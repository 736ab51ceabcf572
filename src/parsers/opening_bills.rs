//! Opening bill allocations from the ledgers export.
//!
//! With `EXPLODEFLAG=Yes` the accounts export nests each ledger's
//! `BILLALLOCATIONS.LIST` records carrying the bill-wise opening state:
//! reference name, bill date, opening balance and credit period. These seed
//! the receivables reconciliation alongside in-window voucher allocations.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::xml::{
    parse_amount, parse_bool, parse_credit_days, parse_date, sanitize_xml, ParseError,
    SubtreeReader,
};

#[derive(Debug, Clone, Serialize)]
pub struct OpeningBillRecord {
    pub ledger: String,
    pub ref_name: String,
    pub bill_date: Option<NaiveDate>,
    pub opening_balance: Decimal,
    pub credit_period_days: Option<i32>,
    pub is_advance: bool,
}

pub fn parse_opening_bills(xml_text: &str) -> Result<Vec<OpeningBillRecord>, ParseError> {
    let clean = sanitize_xml(xml_text);
    let targets = ["LEDGER"];
    let mut reader = SubtreeReader::new(&clean, &targets);
    let mut out = Vec::new();

    while let Some(ledger) = reader.next_subtree()? {
        let Some(ledger_name) = ledger
            .attr("NAME")
            .or_else(|| ledger.child_text("NAME"))
            .map(str::to_string)
        else {
            continue;
        };

        for bill in ledger.descendants("BILLALLOCATIONS.LIST") {
            let Some(ref_name) = bill.child_text("NAME") else {
                continue;
            };
            let opening_balance = parse_amount(bill.child_text("OPENINGBALANCE"))
                .round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
            out.push(OpeningBillRecord {
                ledger: ledger_name.clone(),
                ref_name: ref_name.to_string(),
                bill_date: parse_date(bill.child_text("BILLDATE")),
                opening_balance,
                credit_period_days: parse_credit_days(bill.child_text("BILLCREDITPERIOD")),
                is_advance: parse_bool(bill.child_text("ISADVANCE")),
            });
        }
    }

    Ok(out)
}
