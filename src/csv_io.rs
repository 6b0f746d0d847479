//! Client CSV import and export.

use crate::models::Client;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::Serialize;

pub const CLIENT_HEADERS: [&str; 6] = [
    "companyName",
    "email",
    "phone",
    "address",
    "country",
    "trnNumber",
];

/// A data row that was left out of an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    /// 1-based line in the source, header included
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedClients {
    pub clients: Vec<Client>,
    pub skipped: Vec<SkippedRow>,
}

/// Serialize clients with a header row. Fields containing separators,
/// quotes or newlines are quoted.
pub fn export_clients<'a>(
    clients: impl IntoIterator<Item = &'a Client>,
) -> Result<String, csv::Error> {
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(CLIENT_HEADERS)?;
    for client in clients {
        wtr.write_record([
            client.company_name.as_str(),
            client.email.as_str(),
            client.phone.as_str(),
            client.address.as_str(),
            client.country.as_str(),
            client.trn_number.as_str(),
        ])?;
    }
    let bytes = wtr.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Header cell → column key: letters and digits only, lowercased, so
/// `Company Name`, `company_name` and `companyName` all match.
fn header_key(cell: &str) -> String {
    cell.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

struct ColumnMap {
    indexes: [Option<usize>; 6],
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Self {
        let mut indexes = [None; 6];
        for (slot, name) in indexes.iter_mut().zip(CLIENT_HEADERS) {
            let wanted = header_key(name);
            *slot = headers.iter().position(|h| header_key(h) == wanted);
        }
        Self { indexes }
    }

    fn cell<'r>(&self, record: &'r StringRecord, column: usize) -> &'r str {
        self.indexes[column]
            .and_then(|idx| record.get(idx))
            .map(|cell| cell.trim())
            .unwrap_or("")
    }
}

/// Parse CSV text into clients. Cells are trimmed and unquoted; rows
/// without a company name or an email are skipped.
pub fn parse_clients(input: &str) -> Result<ParsedClients, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input.as_bytes());

    let columns = ColumnMap::from_headers(rdr.headers()?);
    let mut parsed = ParsedClients::default();

    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let client = Client {
            company_name: columns.cell(&record, 0).to_string(),
            email: columns.cell(&record, 1).to_string(),
            phone: columns.cell(&record, 2).to_string(),
            address: columns.cell(&record, 3).to_string(),
            country: columns.cell(&record, 4).to_string(),
            trn_number: columns.cell(&record, 5).to_string(),
        };

        let missing: Vec<&str> = [
            ("companyName", &client.company_name),
            ("email", &client.email),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            parsed.clients.push(client);
        } else {
            tracing::debug!("Skipping CSV line {}: missing {}", line, missing.join(", "));
            parsed.skipped.push(SkippedRow {
                line,
                reason: format!("missing {}", missing.join(", ")),
            });
        }
    }

    Ok(parsed)
}
