//! Delivery-item packaging and quantity reconciliation.
//!
//! A [`DeliveryItem`] is built from an invoice [`LineItem`] for one delivery
//! order and records how its pieces are shipped: as loose pieces or as
//! cartons of a fixed size. Every derived figure (`cartons`, pieces
//! delivered, undelivered shortfall) is computed from the current rows on
//! each read, so there is never a stale total.

use super::invoice::LineItem;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackagingType {
    Piece,
    Carton,
}

impl PackagingType {
    pub fn as_str(self) -> &'static str {
        match self {
            PackagingType::Piece => "piece",
            PackagingType::Carton => "carton",
        }
    }
}

impl FromStr for PackagingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "piece" | "pieces" => Ok(PackagingType::Piece),
            "carton" | "cartons" => Ok(PackagingType::Carton),
            other => Err(format!("unknown packaging type '{other}'")),
        }
    }
}

/// Declared carton size. `Standard` is the size given to rows added
/// through the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartonSize {
    Small,
    Medium,
    Large,
    ExtraLarge,
    Standard,
}

impl CartonSize {
    pub const ALL: [CartonSize; 5] = [
        CartonSize::Small,
        CartonSize::Medium,
        CartonSize::Large,
        CartonSize::ExtraLarge,
        CartonSize::Standard,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CartonSize::Small => "Small",
            CartonSize::Medium => "Medium",
            CartonSize::Large => "Large",
            CartonSize::ExtraLarge => "ExtraLarge",
            CartonSize::Standard => "Standard",
        }
    }
}

impl fmt::Display for CartonSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CartonSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "small" | "s" => Ok(CartonSize::Small),
            "medium" | "m" => Ok(CartonSize::Medium),
            "large" | "l" => Ok(CartonSize::Large),
            "extralarge" | "xl" => Ok(CartonSize::ExtraLarge),
            "standard" => Ok(CartonSize::Standard),
            _ => Err(format!("unknown carton size '{}'", s.trim())),
        }
    }
}

/// Parse a count the lenient way: leading whitespace is skipped, the
/// leading run of ASCII digits is read, anything else (empty, negative,
/// non-numeric) becomes 0. Values past `u32::MAX` saturate.
pub fn coerce_count(input: &str) -> u32 {
    let digits: &str = {
        let trimmed = input.trim_start();
        let end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        &trimmed[..end]
    };
    if digits.is_empty() {
        return 0;
    }
    digits.parse::<u32>().unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartonDetail {
    pub size: CartonSize,
    pub count: u32,
    pub pieces_per_carton: u32,
}

impl CartonDetail {
    pub fn new(size: CartonSize, count: u32, pieces_per_carton: u32) -> Self {
        Self {
            size,
            count,
            pieces_per_carton,
        }
    }

    pub fn pieces(&self) -> u64 {
        u64::from(self.count) * u64::from(self.pieces_per_carton)
    }
}

/// Editable field of a carton row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CartonField {
    Size,
    Count,
    PiecesPerCarton,
}

/// How an item is being shipped. Switching variants drops the other
/// variant's data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packaging {
    Piece { delivery_pieces: u32 },
    Carton { details: Vec<CartonDetail> },
}

impl Packaging {
    pub fn packaging_type(&self) -> PackagingType {
        match self {
            Packaging::Piece { .. } => PackagingType::Piece,
            Packaging::Carton { .. } => PackagingType::Carton,
        }
    }

    fn default_carton_rows() -> Vec<CartonDetail> {
        vec![CartonDetail::new(CartonSize::Small, 1, 1)]
    }
}

/// Per-item reconciliation figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub total_pieces_delivered: u64,
    pub undelivered_pieces: u64,
}

/// Aggregate across all items of a delivery order. Each item's shortfall is
/// clamped on its own, so surplus on one line never offsets another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSummary {
    pub total_quantity: u64,
    pub total_pieces_delivered: u64,
    pub total_undelivered_pieces: u64,
    pub total_cartons: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryItem {
    pub name: String,
    /// Units ordered on the source invoice line
    pub quantity: u64,
    pub price: BigDecimal,
    pub vat: BigDecimal,
    pub total: BigDecimal,
    packaging: Packaging,
}

impl DeliveryItem {
    /// Fresh item for a new delivery order: piece mode delivering the full quantity.
    pub fn from_line_item(line: &LineItem) -> Self {
        Self {
            name: line.name.clone(),
            quantity: line.quantity,
            price: line.price.clone(),
            vat: line.vat.clone(),
            total: line.total.clone(),
            packaging: Packaging::Piece {
                delivery_pieces: clamp_to_u32(line.quantity),
            },
        }
    }

    pub fn packaging(&self) -> &Packaging {
        &self.packaging
    }

    pub fn packaging_type(&self) -> PackagingType {
        self.packaging.packaging_type()
    }

    pub fn carton_details(&self) -> &[CartonDetail] {
        match &self.packaging {
            Packaging::Carton { details } => details,
            Packaging::Piece { .. } => &[],
        }
    }

    pub fn delivery_pieces(&self) -> u32 {
        match self.packaging {
            Packaging::Piece { delivery_pieces } => delivery_pieces,
            Packaging::Carton { .. } => 0,
        }
    }

    /// Switch packaging mode. The previous mode's configuration is discarded:
    /// piece mode restarts at the ordered quantity, carton mode at a single
    /// `Small` row of one carton holding one piece.
    pub fn set_packaging_type(&mut self, packaging_type: PackagingType) {
        self.packaging = match packaging_type {
            PackagingType::Piece => Packaging::Piece {
                delivery_pieces: clamp_to_u32(self.quantity),
            },
            PackagingType::Carton => Packaging::Carton {
                details: Packaging::default_carton_rows(),
            },
        };
    }

    /// Set the loose piece count from raw input. Ignored in carton mode.
    pub fn set_delivery_pieces(&mut self, input: &str) -> bool {
        match &mut self.packaging {
            Packaging::Piece { delivery_pieces } => {
                *delivery_pieces = coerce_count(input);
                true
            }
            Packaging::Carton { .. } => false,
        }
    }

    /// Append a `Standard` row of one carton holding one piece.
    pub fn add_carton_row(&mut self) -> bool {
        match &mut self.packaging {
            Packaging::Carton { details } => {
                details.push(CartonDetail::new(CartonSize::Standard, 1, 1));
                true
            }
            Packaging::Piece { .. } => false,
        }
    }

    /// Remove a row. At least one row always remains, so this is a no-op on
    /// the last row and on out-of-range indices.
    pub fn remove_carton_row(&mut self, index: usize) -> bool {
        match &mut self.packaging {
            Packaging::Carton { details } if details.len() > 1 && index < details.len() => {
                details.remove(index);
                true
            }
            _ => false,
        }
    }

    /// Edit one field of a row from raw input. Counts are coerced with
    /// [`coerce_count`]; an unrecognised size leaves the row untouched.
    pub fn update_carton_row(&mut self, index: usize, field: CartonField, value: &str) -> bool {
        let Packaging::Carton { details } = &mut self.packaging else {
            return false;
        };
        let Some(row) = details.get_mut(index) else {
            return false;
        };
        match field {
            CartonField::Size => match value.parse::<CartonSize>() {
                Ok(size) => row.size = size,
                Err(e) => {
                    tracing::warn!("Ignoring carton size edit: {}", e);
                    return false;
                }
            },
            CartonField::Count => row.count = coerce_count(value),
            CartonField::PiecesPerCarton => row.pieces_per_carton = coerce_count(value),
        }
        true
    }

    pub fn cartons(&self) -> u64 {
        self.carton_details()
            .iter()
            .fold(0u64, |acc, d| acc.saturating_add(u64::from(d.count)))
    }

    pub fn average_pieces_per_carton(&self) -> f64 {
        let cartons = self.cartons();
        if cartons == 0 {
            return 0.0;
        }
        let pieces = sum_pieces(self.carton_details());
        pieces as f64 / cartons as f64
    }

    pub fn total_pieces_delivered(&self) -> u64 {
        match &self.packaging {
            Packaging::Piece { delivery_pieces } => u64::from(*delivery_pieces),
            Packaging::Carton { details } => sum_pieces(details),
        }
    }

    pub fn undelivered_pieces(&self) -> u64 {
        self.quantity.saturating_sub(self.total_pieces_delivered())
    }

    pub fn summarize(&self) -> ItemSummary {
        ItemSummary {
            total_pieces_delivered: self.total_pieces_delivered(),
            undelivered_pieces: self.undelivered_pieces(),
        }
    }

    pub fn is_over_delivered(&self) -> bool {
        self.total_pieces_delivered() > self.quantity
    }

    /// Flatten into a plain record for persistence.
    pub fn to_record(&self) -> DeliveryItemRecord {
        DeliveryItemRecord {
            name: self.name.clone(),
            quantity: self.quantity,
            price: self.price.clone(),
            vat: self.vat.clone(),
            total: self.total.clone(),
            packaging_type: self.packaging_type(),
            delivery_pieces: self.delivery_pieces(),
            cartons: self.cartons(),
            carton_details: self.carton_details().to_vec(),
            average_pieces_per_carton: self.average_pieces_per_carton(),
            total_pieces_delivered: self.total_pieces_delivered(),
            undelivered_pieces: self.undelivered_pieces(),
        }
    }

    /// Rebuild an editable item from a stored record. Stored derived figures
    /// are ignored and recomputed.
    pub fn from_record(record: &DeliveryItemRecord) -> Self {
        let packaging = match record.packaging_type {
            PackagingType::Piece => Packaging::Piece {
                delivery_pieces: record.delivery_pieces,
            },
            PackagingType::Carton if record.carton_details.is_empty() => Packaging::Carton {
                details: Packaging::default_carton_rows(),
            },
            PackagingType::Carton => Packaging::Carton {
                details: record.carton_details.clone(),
            },
        };
        Self {
            name: record.name.clone(),
            quantity: record.quantity,
            price: record.price.clone(),
            vat: record.vat.clone(),
            total: record.total.clone(),
            packaging,
        }
    }
}

/// Sum quantities and deliveries independently per item. Totals saturate
/// at `u64::MAX` instead of wrapping.
pub fn summarize_all<'a>(items: impl IntoIterator<Item = &'a DeliveryItem>) -> AggregateSummary {
    items
        .into_iter()
        .fold(AggregateSummary::default(), |mut acc, item| {
            let summary = item.summarize();
            acc.total_quantity = acc.total_quantity.saturating_add(item.quantity);
            acc.total_pieces_delivered = acc
                .total_pieces_delivered
                .saturating_add(summary.total_pieces_delivered);
            acc.total_undelivered_pieces = acc
                .total_undelivered_pieces
                .saturating_add(summary.undelivered_pieces);
            acc.total_cartons = acc.total_cartons.saturating_add(item.cartons());
            acc
        })
}

fn sum_pieces(details: &[CartonDetail]) -> u64 {
    details
        .iter()
        .fold(0u64, |acc, d| acc.saturating_add(d.pieces()))
}

fn clamp_to_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Persisted, flattened form of a [`DeliveryItem`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryItemRecord {
    pub name: String,
    pub quantity: u64,
    pub price: BigDecimal,
    pub vat: BigDecimal,
    pub total: BigDecimal,
    pub packaging_type: PackagingType,
    #[serde(default)]
    pub delivery_pieces: u32,
    #[serde(default)]
    pub cartons: u64,
    #[serde(default)]
    pub carton_details: Vec<CartonDetail>,
    #[serde(default)]
    pub average_pieces_per_carton: f64,
    #[serde(default)]
    pub total_pieces_delivered: u64,
    #[serde(default)]
    pub undelivered_pieces: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: u64) -> LineItem {
        LineItem::new("Widget", quantity, BigDecimal::from(10), BigDecimal::from(5))
    }

    fn carton_item(quantity: u64) -> DeliveryItem {
        let mut item = DeliveryItem::from_line_item(&line(quantity));
        item.set_packaging_type(PackagingType::Carton);
        item
    }

    fn assert_totals_match_rows(item: &DeliveryItem) {
        let rows = item.carton_details();
        let count: u64 = rows.iter().map(|r| u64::from(r.count)).sum();
        let pieces: u64 = rows
            .iter()
            .map(|r| u64::from(r.count) * u64::from(r.pieces_per_carton))
            .sum();
        assert_eq!(item.cartons(), count);
        assert_eq!(item.total_pieces_delivered(), pieces);
    }

    #[test]
    fn new_item_delivers_full_quantity_as_pieces() {
        let item = DeliveryItem::from_line_item(&line(40));
        assert_eq!(item.packaging_type(), PackagingType::Piece);
        assert_eq!(item.delivery_pieces(), 40);
        assert_eq!(item.cartons(), 0);
        assert_eq!(item.summarize().undelivered_pieces, 0);
    }

    #[test]
    fn switching_to_carton_starts_with_one_small_row() {
        let item = carton_item(10);
        assert_eq!(item.carton_details(), [CartonDetail::new(CartonSize::Small, 1, 1)]);
        assert_eq!(item.delivery_pieces(), 0);
        assert_eq!(item.cartons(), 1);
        assert_eq!(item.total_pieces_delivered(), 1);
    }

    #[test]
    fn totals_follow_every_row_mutation() {
        let mut item = carton_item(500);
        assert_totals_match_rows(&item);

        assert!(item.add_carton_row());
        assert_eq!(item.carton_details()[1].size, CartonSize::Standard);
        assert_totals_match_rows(&item);

        assert!(item.update_carton_row(1, CartonField::Count, "7"));
        assert_totals_match_rows(&item);
        assert!(item.update_carton_row(1, CartonField::PiecesPerCarton, "12"));
        assert_totals_match_rows(&item);
        assert_eq!(item.total_pieces_delivered(), 1 + 84);

        assert!(item.remove_carton_row(0));
        assert_totals_match_rows(&item);
        assert_eq!(item.cartons(), 7);
        assert_eq!(item.average_pieces_per_carton(), 12.0);
    }

    #[test]
    fn undelivered_is_clamped_on_over_delivery() {
        let mut item = DeliveryItem::from_line_item(&line(10));
        item.set_delivery_pieces("25");
        assert_eq!(item.total_pieces_delivered(), 25);
        assert_eq!(item.undelivered_pieces(), 0);
        assert!(item.is_over_delivered());

        item.set_delivery_pieces("4");
        assert_eq!(item.undelivered_pieces(), 6);
        assert!(!item.is_over_delivered());
    }

    #[test]
    fn removing_the_last_row_is_a_no_op() {
        let mut item = carton_item(10);
        let before = item.clone();
        assert!(!item.remove_carton_row(0));
        assert_eq!(item, before);
        assert!(!item.remove_carton_row(5));
        assert_eq!(item, before);
    }

    #[test]
    fn mode_round_trip_resets_carton_rows() {
        let mut item = carton_item(100);
        item.add_carton_row();
        item.update_carton_row(0, CartonField::Count, "9");
        item.set_packaging_type(PackagingType::Piece);
        assert_eq!(item.delivery_pieces(), 100);
        assert!(item.carton_details().is_empty());

        item.set_packaging_type(PackagingType::Carton);
        assert_eq!(item.carton_details(), [CartonDetail::new(CartonSize::Small, 1, 1)]);
    }

    #[test]
    fn mixed_carton_sizes_reconcile_against_quantity() {
        let mut item = carton_item(100);
        item.update_carton_row(0, CartonField::Size, "Large");
        item.update_carton_row(0, CartonField::Count, "3");
        item.update_carton_row(0, CartonField::PiecesPerCarton, "24");
        item.add_carton_row();
        item.update_carton_row(1, CartonField::Size, "Medium");
        item.update_carton_row(1, CartonField::Count, "2");
        item.update_carton_row(1, CartonField::PiecesPerCarton, "12");

        assert_eq!(item.cartons(), 5);
        assert_eq!(item.total_pieces_delivered(), 96);
        assert_eq!(item.undelivered_pieces(), 4);
        assert_eq!(item.average_pieces_per_carton(), 96.0 / 5.0);
    }

    #[test]
    fn invalid_piece_input_coerces_to_zero() {
        let mut item = DeliveryItem::from_line_item(&line(50));
        assert!(item.set_delivery_pieces("abc"));
        assert_eq!(item.delivery_pieces(), 0);
        assert_eq!(
            item.summarize(),
            ItemSummary {
                total_pieces_delivered: 0,
                undelivered_pieces: 50
            }
        );
    }

    #[test]
    fn coerce_count_reads_leading_digits_only() {
        assert_eq!(coerce_count("42"), 42);
        assert_eq!(coerce_count("  7 "), 7);
        assert_eq!(coerce_count("12abc"), 12);
        assert_eq!(coerce_count("3.9"), 3);
        assert_eq!(coerce_count("-5"), 0);
        assert_eq!(coerce_count(""), 0);
        assert_eq!(coerce_count("99999999999"), u32::MAX);
    }

    #[test]
    fn edits_in_the_wrong_mode_are_ignored() {
        let mut item = DeliveryItem::from_line_item(&line(5));
        assert!(!item.add_carton_row());
        assert!(!item.update_carton_row(0, CartonField::Count, "3"));

        let mut item = carton_item(5);
        assert!(!item.set_delivery_pieces("3"));
        assert!(!item.update_carton_row(0, CartonField::Size, "Gigantic"));
        assert_eq!(item.carton_details()[0].size, CartonSize::Small);
        assert!(item.update_carton_row(0, CartonField::Size, "extra large"));
        assert_eq!(item.carton_details()[0].size, CartonSize::ExtraLarge);
    }

    #[test]
    fn aggregate_does_not_offset_shortfall_with_surplus() {
        let mut short = DeliveryItem::from_line_item(&line(10));
        short.set_delivery_pieces("4");
        let mut over = DeliveryItem::from_line_item(&line(10));
        over.set_delivery_pieces("16");

        let agg = summarize_all([&short, &over]);
        assert_eq!(agg.total_quantity, 20);
        assert_eq!(agg.total_pieces_delivered, 20);
        assert_eq!(agg.total_undelivered_pieces, 6);
    }

    #[test]
    fn record_flattens_derived_figures_and_rebuilds() {
        let mut item = carton_item(30);
        item.update_carton_row(0, CartonField::Count, "2");
        item.update_carton_row(0, CartonField::PiecesPerCarton, "10");

        let record = item.to_record();
        assert_eq!(record.packaging_type, PackagingType::Carton);
        assert_eq!(record.cartons, 2);
        assert_eq!(record.total_pieces_delivered, 20);
        assert_eq!(record.undelivered_pieces, 10);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["packagingType"], "carton");
        assert_eq!(json["cartonDetails"][0]["piecesPerCarton"], 10);

        assert_eq!(DeliveryItem::from_record(&record), item);
    }

    #[test]
    fn aggregate_saturates_on_huge_quantities() {
        let huge = DeliveryItem::from_line_item(&line(u64::MAX));
        let small = DeliveryItem::from_line_item(&line(2));

        let agg = summarize_all([&huge, &small]);
        assert_eq!(agg.total_quantity, u64::MAX);
        assert_eq!(agg.total_pieces_delivered, u64::from(u32::MAX) + 2);
    }

    #[test]
    fn oversized_carton_rows_saturate() {
        let mut item = carton_item(10);
        item.add_carton_row();
        for row in 0..2 {
            item.update_carton_row(row, CartonField::Count, "99999999999");
            item.update_carton_row(row, CartonField::PiecesPerCarton, "99999999999");
        }

        assert_eq!(item.cartons(), 2 * u64::from(u32::MAX));
        assert_eq!(item.total_pieces_delivered(), u64::MAX);
        assert_eq!(item.undelivered_pieces(), 0);
        let agg = summarize_all([&item, &item]);
        assert_eq!(agg.total_pieces_delivered, u64::MAX);
    }
}
