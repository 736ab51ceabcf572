//! Request envelope rendering.
//!
//! The source accepts a fixed XML export envelope; only the report ID,
//! company and date range vary. Voucher fetches use the "Voucher Register"
//! report: unlike "DayBook" it honors SVFROMDATE/SVTODATE, which the
//! date-windowed driver depends on.

use chrono::NaiveDate;

/// Master export families the client knows how to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterKind {
    /// Units, stock groups and stock items in one export.
    AllMasters,
    Ledgers,
    StockItems,
    Units,
    /// Ledgers export with bill allocations exploded; carries the opening
    /// bill-wise balances.
    OpeningBills,
}

impl MasterKind {
    fn report_id(self) -> &'static str {
        match self {
            MasterKind::AllMasters => "All Masters",
            MasterKind::Ledgers
            | MasterKind::StockItems
            | MasterKind::Units
            | MasterKind::OpeningBills => "List of Accounts",
        }
    }
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_date(d: NaiveDate) -> String {
    d.format("%d-%b-%Y").to_string()
}

/// Envelope for the voucher register over a date window.
pub fn voucher_register(from: NaiveDate, to: NaiveDate, company: &str) -> String {
    format!(
        "<ENVELOPE>\
         <HEADER>\
         <VERSION>1</VERSION>\
         <TALLYREQUEST>Export</TALLYREQUEST>\
         <TYPE>Data</TYPE>\
         <ID>Voucher Register</ID>\
         </HEADER>\
         <BODY>\
         <DESC>\
         <STATICVARIABLES>\
         <SVEXPORTFORMAT>$$SysName:XML</SVEXPORTFORMAT>\
         <SVCURRENTCOMPANY>{company}</SVCURRENTCOMPANY>\
         <SVFROMDATE>{from}</SVFROMDATE>\
         <SVTODATE>{to}</SVTODATE>\
         <EXPLODEFLAG>Yes</EXPLODEFLAG>\
         </STATICVARIABLES>\
         </DESC>\
         </BODY>\
         </ENVELOPE>",
        company = xml_escape(company),
        from = format_date(from),
        to = format_date(to),
    )
}

/// Envelope for a master export.
pub fn master_export(kind: MasterKind, company: &str) -> String {
    format!(
        "<ENVELOPE>\
         <HEADER>\
         <VERSION>1</VERSION>\
         <TALLYREQUEST>Export</TALLYREQUEST>\
         <TYPE>Data</TYPE>\
         <ID>{id}</ID>\
         </HEADER>\
         <BODY>\
         <DESC>\
         <STATICVARIABLES>\
         <SVEXPORTFORMAT>$$SysName:XML</SVEXPORTFORMAT>\
         <SVCURRENTCOMPANY>{company}</SVCURRENTCOMPANY>\
         <EXPLODEFLAG>Yes</EXPLODEFLAG>\
         </STATICVARIABLES>\
         </DESC>\
         </BODY>\
         </ENVELOPE>",
        id = kind.report_id(),
        company = xml_escape(company),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voucher_register_renders_dates_and_company() {
        let from = NaiveDate::from_ymd_opt(2025, 10, 9).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 10, 11).unwrap();
        let xml = voucher_register(from, to, "Khanna & Sons");

        assert!(xml.contains("<ID>Voucher Register</ID>"));
        assert!(xml.contains("<SVFROMDATE>09-Oct-2025</SVFROMDATE>"));
        assert!(xml.contains("<SVTODATE>11-Oct-2025</SVTODATE>"));
        assert!(xml.contains("<SVCURRENTCOMPANY>Khanna &amp; Sons</SVCURRENTCOMPANY>"));
        assert!(xml.contains("<EXPLODEFLAG>Yes</EXPLODEFLAG>"));
        // DayBook ignores the date variables; it must never be requested.
        assert!(!xml.contains("DayBook"));
    }

    #[test]
    fn master_export_picks_report_by_kind() {
        let xml = master_export(MasterKind::AllMasters, "Co");
        assert!(xml.contains("<ID>All Masters</ID>"));
        let xml = master_export(MasterKind::OpeningBills, "Co");
        assert!(xml.contains("<ID>List of Accounts</ID>"));
    }
}
