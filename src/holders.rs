//! Holder records that drive the constellation.
//!
//! Converts raw token-holder lists (CSV exports or synthetic samples) into
//! the ordered record sequence the layout generator consumes. Loading is an
//! explicit step returning a value; nothing here is shared mutable state.

use crate::error::{Error, Result};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Holder-group tag. Partitions the point cloud for graph construction
/// and selects the base color.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Holders of the first token list.
    #[default]
    Primary,
    /// Holders of the second token list.
    Secondary,
    /// Wallets present in both lists.
    Shared,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Primary => write!(f, "primary"),
            Category::Secondary => write!(f, "secondary"),
            Category::Shared => write!(f, "shared"),
        }
    }
}

/// A single holder wallet. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Wallet address.
    pub address: String,
    /// Held quantity; non-negative.
    pub magnitude: f64,
    /// Which holder list the wallet came from.
    pub category: Category,
}

impl Record {
    /// Build a record, rejecting negative or non-finite magnitudes.
    pub fn new(address: impl Into<String>, magnitude: f64, category: Category) -> Result<Self> {
        if !magnitude.is_finite() || magnitude < 0.0 {
            return Err(Error::Domain(format!(
                "magnitude must be finite and non-negative, got {magnitude}"
            )));
        }
        Ok(Self {
            address: address.into(),
            magnitude,
            category,
        })
    }
}

/// Read holder records from a CSV export.
///
/// The header row must carry an `Account` column and a quantity column whose
/// name starts with `Quantity` (exports suffix it, e.g. `Quantity(GOAT)`).
/// Quantity cells may contain thousands separators or currency noise; rows
/// whose quantity still fails to parse are skipped with a warning.
pub fn read_holders(reader: impl Read, category: Category) -> Result<Vec<Record>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let account_col = headers
        .iter()
        .position(|h| h.trim() == "Account")
        .ok_or_else(|| Error::Domain("holder CSV has no Account column".into()))?;
    let quantity_col = headers
        .iter()
        .position(|h| h.trim().starts_with("Quantity"))
        .ok_or_else(|| Error::Domain("holder CSV has no Quantity column".into()))?;

    let mut records = Vec::new();
    for (line, row) in rdr.records().enumerate() {
        let row = row?;
        let address = match row.get(account_col) {
            Some(a) if !a.trim().is_empty() => a.trim().to_string(),
            _ => {
                tracing::warn!(line, "skipping holder row without an address");
                continue;
            }
        };
        let raw = row.get(quantity_col).unwrap_or("");
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();
        let magnitude = match cleaned.parse::<f64>() {
            Ok(m) => m,
            Err(_) => {
                tracing::warn!(line, %address, raw, "skipping holder row with unparseable quantity");
                continue;
            }
        };
        records.push(Record::new(address, magnitude, category)?);
    }

    tracing::debug!(count = records.len(), %category, "loaded holder records");
    Ok(records)
}

/// Read holder records from a CSV file on disk.
pub fn load_csv(path: &Path, category: Category) -> Result<Vec<Record>> {
    let file = File::open(path)?;
    read_holders(file, category)
}

/// Merge a primary and a secondary holder list into one ordered sequence.
///
/// Addresses present in both lists collapse into a single `Shared` record
/// whose magnitude is the sum of both holdings. Shared records come first
/// so they land in the innermost shells, then the remaining primary and
/// secondary holders in their original order.
pub fn merge_holders(primary: Vec<Record>, secondary: Vec<Record>) -> Vec<Record> {
    let secondary_by_address: HashMap<&str, f64> = secondary
        .iter()
        .map(|r| (r.address.as_str(), r.magnitude))
        .collect();

    let mut shared = Vec::new();
    let mut primary_only = Vec::new();
    for record in &primary {
        match secondary_by_address.get(record.address.as_str()) {
            Some(other) => shared.push(Record {
                address: record.address.clone(),
                magnitude: record.magnitude + other,
                category: Category::Shared,
            }),
            None => primary_only.push(record.clone()),
        }
    }

    let shared_addresses: HashSet<&str> = shared.iter().map(|r| r.address.as_str()).collect();
    let secondary_only: Vec<Record> = secondary
        .iter()
        .filter(|r| !shared_addresses.contains(r.address.as_str()))
        .cloned()
        .collect();

    tracing::info!(
        shared = shared.len(),
        primary = primary_only.len(),
        secondary = secondary_only.len(),
        "merged holder lists"
    );

    let mut merged = shared;
    merged.extend(primary_only);
    merged.extend(secondary_only);
    merged
}

/// Generate a synthetic holder set for testing/demo purposes.
///
/// Same seed always produces the same records. Magnitudes are log-uniform
/// over a realistic holding range; roughly a tenth of wallets are shared.
pub fn sample(seed: u64, count: usize) -> Vec<Record> {
    const ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    (0..count)
        .map(|_| {
            let address: String = (0..44)
                .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
                .collect();
            let category = match rng.gen_range(0..10) {
                0 => Category::Shared,
                1..=5 => Category::Primary,
                _ => Category::Secondary,
            };
            let magnitude = 10f64.powf(rng.gen_range(2.0..8.0));
            Record {
                address,
                magnitude,
                category,
            }
        })
        .collect()
}

/// Derive a deterministic layout seed from a dataset.
/// Same records always produce the same constellation.
pub fn dataset_seed(records: &[Record]) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update((records.len() as u64).to_le_bytes());
    for record in records {
        hasher.update(record.address.as_bytes());
        hasher.update(record.magnitude.to_le_bytes());
        hasher.update([record.category as u8]);
    }
    let hash = hasher.finalize();
    u64::from_le_bytes(hash[0..8].try_into().expect("digest is 32 bytes"))
}
