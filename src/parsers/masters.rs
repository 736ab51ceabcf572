//! Parsers for master-data exports: units, stock groups, stock items,
//! ledger groups and ledgers.
//!
//! All of these share the same shape: NAME as an attribute, details as child
//! elements, empty tags meaning "not set". Hierarchies hang off `parent_name`,
//! with roots carrying no parent.

use serde::Serialize;

use super::xml::{parse_alter_id, parse_bool, sanitize_xml, Element, ParseError, SubtreeReader};

#[derive(Debug, Clone, Serialize)]
pub struct UnitRecord {
    pub name: String,
    pub guid: Option<String>,
    pub original_name: Option<String>,
    pub gst_rep_uom: Option<String>,
    pub is_simple: bool,
    pub alter_id: Option<i64>,
}

/// Shared shape of group-like masters (stock groups and ledger groups).
#[derive(Debug, Clone, Serialize)]
pub struct GroupRecord {
    pub name: String,
    pub guid: Option<String>,
    /// `None` marks a hierarchy root.
    pub parent_name: Option<String>,
    pub alter_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemRecord {
    pub name: String,
    pub guid: Option<String>,
    pub parent_name: Option<String>,
    pub base_units: Option<String>,
    pub hsn_code: Option<String>,
    pub alter_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerRecord {
    pub name: String,
    pub guid: Option<String>,
    /// Owning ledger group, e.g. "Sundry Debtors".
    pub parent_name: Option<String>,
    pub alter_id: Option<i64>,
}

fn collect(xml_text: &str, target: &str) -> Result<Vec<Element>, ParseError> {
    let clean = sanitize_xml(xml_text);
    let targets = [target];
    let mut reader = SubtreeReader::new(&clean, &targets);
    let mut out = Vec::new();
    while let Some(el) = reader.next_subtree()? {
        out.push(el);
    }
    Ok(out)
}

fn name_of(el: &Element) -> Option<String> {
    el.attr("NAME")
        .or_else(|| el.child_text("NAME"))
        .map(str::to_string)
}

pub fn parse_units(xml_text: &str) -> Result<Vec<UnitRecord>, ParseError> {
    let mut out = Vec::new();
    for el in collect(xml_text, "UNIT")? {
        let Some(name) = name_of(&el) else { continue };
        out.push(UnitRecord {
            name,
            guid: el.child_text("GUID").map(str::to_string),
            original_name: el.child_text("ORIGINALNAME").map(str::to_string),
            gst_rep_uom: el.child_text("GSTREPUOM").map(str::to_string),
            is_simple: parse_bool(el.child_text("ISSIMPLEUNIT")),
            alter_id: parse_alter_id(el.child_text("ALTERID")),
        });
    }
    Ok(out)
}

pub fn parse_stock_groups(xml_text: &str) -> Result<Vec<GroupRecord>, ParseError> {
    parse_groups(xml_text, "STOCKGROUP")
}

pub fn parse_ledger_groups(xml_text: &str) -> Result<Vec<GroupRecord>, ParseError> {
    parse_groups(xml_text, "GROUP")
}

fn parse_groups(xml_text: &str, tag: &str) -> Result<Vec<GroupRecord>, ParseError> {
    let mut out = Vec::new();
    for el in collect(xml_text, tag)? {
        let Some(name) = name_of(&el) else { continue };
        out.push(GroupRecord {
            name,
            guid: el.child_text("GUID").map(str::to_string),
            parent_name: el.child_text("PARENT").map(str::to_string),
            alter_id: parse_alter_id(el.child_text("ALTERID")),
        });
    }
    Ok(out)
}

pub fn parse_stock_items(xml_text: &str) -> Result<Vec<ItemRecord>, ParseError> {
    let mut out = Vec::new();
    for el in collect(xml_text, "STOCKITEM")? {
        let Some(name) = name_of(&el) else { continue };

        // HSN moved into HSNDETAILS.LIST in later source builds; take the
        // last list entry (the current one), fall back to the first
        // non-empty, then to a bare HSNCODE tag.
        let details = el.descendants("HSNDETAILS.LIST");
        let hsn_code = details
            .iter()
            .rev()
            .find_map(|d| d.child_text("HSNCODE"))
            .or_else(|| details.iter().find_map(|d| d.child_text("HSNCODE")))
            .or_else(|| el.child_text("HSNCODE"))
            .map(str::to_string);

        out.push(ItemRecord {
            name,
            guid: el.child_text("GUID").map(str::to_string),
            parent_name: el.child_text("PARENT").map(str::to_string),
            base_units: el.child_text("BASEUNITS").map(str::to_string),
            hsn_code,
            alter_id: parse_alter_id(el.child_text("ALTERID")),
        });
    }
    Ok(out)
}

pub fn parse_ledgers(xml_text: &str) -> Result<Vec<LedgerRecord>, ParseError> {
    let mut out = Vec::new();
    for el in collect(xml_text, "LEDGER")? {
        let Some(name) = name_of(&el) else { continue };
        out.push(LedgerRecord {
            name,
            guid: el.child_text("GUID").map(str::to_string),
            parent_name: el.child_text("PARENT").map(str::to_string),
            alter_id: parse_alter_id(el.child_text("ALTERID")),
        });
    }
    Ok(out)
}

/// Reconstruct ledger groups from ledger parent names when the export
/// contains no explicit GROUP elements. A parent that is itself a ledger
/// contributes its own parent as the group's parent.
pub fn groups_from_ledger_parents(ledgers: &[LedgerRecord]) -> Vec<GroupRecord> {
    let mut names: Vec<&str> = ledgers
        .iter()
        .filter_map(|l| l.parent_name.as_deref())
        .collect();
    names.sort_unstable();
    names.dedup();

    names
        .into_iter()
        .map(|group_name| {
            let parent_of_group = ledgers
                .iter()
                .find(|l| l.name == group_name)
                .and_then(|l| l.parent_name.clone());
            GroupRecord {
                name: group_name.to_string(),
                guid: None,
                parent_name: parent_of_group,
                alter_id: None,
            }
        })
        .collect()
}

/// Everything the ledgers export yields: explicit or reconstructed groups
/// plus the ledgers themselves.
pub fn parse_ledger_masters(
    xml_text: &str,
) -> Result<(Vec<GroupRecord>, Vec<LedgerRecord>), ParseError> {
    let ledgers = parse_ledgers(xml_text)?;
    let mut groups = parse_ledger_groups(xml_text)?;
    if groups.is_empty() && !ledgers.is_empty() {
        groups = groups_from_ledger_parents(&ledgers);
    }
    Ok((groups, ledgers))
}
