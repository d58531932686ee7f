use serde::{Deserialize, Serialize};

/// Number of fractional digits carried by every monetary column.
pub const MONEY_SCALE: i8 = 2;

/// Logical type of a column in a table contract.
///
/// Writers map these onto Arrow types; readers use them to check the shape of
/// tables they load back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ColumnType {
    Int32,
    Int64,
    Text,
    /// Calendar date without time zone.
    Date,
    /// Fixed-point decimal stored as an unscaled integer.
    Decimal { precision: u8, scale: i8 },
}

impl ColumnType {
    pub const fn money(precision: u8) -> Self {
        Self::Decimal {
            precision,
            scale: MONEY_SCALE,
        }
    }

    pub fn is_decimal(&self) -> bool {
        matches!(self, Self::Decimal { .. })
    }
}
