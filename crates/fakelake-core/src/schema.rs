use std::fmt;

use crate::types::ColumnType;

pub const ID_COLUMN: &str = "id";
pub const UNIT_PRICE_COLUMN: &str = "unit_price";

/// A named column in a table contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub column_type: ColumnType,
}

const fn col(name: &'static str, column_type: ColumnType) -> Column {
    Column { name, column_type }
}

/// Static description of one persisted table. Every column is non-nullable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl TableSpec {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|column| column.name)
    }
}

pub const CUSTOMERS: TableSpec = TableSpec {
    name: "dim_clientes",
    columns: &[
        col(ID_COLUMN, ColumnType::Int64),
        col("name", ColumnType::Text),
        col("national_id", ColumnType::Text),
        col("city", ColumnType::Text),
        col("state_code", ColumnType::Text),
        col("birth_date", ColumnType::Date),
        col("created_date", ColumnType::Date),
    ],
};

pub const PRODUCTS: TableSpec = TableSpec {
    name: "dim_produtos",
    columns: &[
        col(ID_COLUMN, ColumnType::Int64),
        col("name", ColumnType::Text),
        col("category", ColumnType::Text),
        col(UNIT_PRICE_COLUMN, ColumnType::money(10)),
        col("created_date", ColumnType::Date),
    ],
};

pub const STORES: TableSpec = TableSpec {
    name: "dim_lojas",
    columns: &[
        col(ID_COLUMN, ColumnType::Int64),
        col("name", ColumnType::Text),
        col("city", ColumnType::Text),
        col("state_code", ColumnType::Text),
        col("opened_date", ColumnType::Date),
    ],
};

/// Fact table contract, identical for every chunk.
pub const SALES: TableSpec = TableSpec {
    name: "fato_vendas",
    columns: &[
        col(ID_COLUMN, ColumnType::Int64),
        col("customer_id", ColumnType::Int64),
        col("product_id", ColumnType::Int64),
        col("store_id", ColumnType::Int64),
        col("sale_date", ColumnType::Date),
        col("quantity", ColumnType::Int32),
        col("unit_value", ColumnType::money(10)),
        col("total_value", ColumnType::money(14)),
        col("year", ColumnType::Int32),
        col("month", ColumnType::Int32),
    ],
};

/// The three reference tables the fact table points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dimension {
    Customers,
    Products,
    Stores,
}

impl Dimension {
    /// Generation order used by the orchestrator.
    pub const ALL: [Dimension; 3] = [Self::Customers, Self::Products, Self::Stores];

    pub fn spec(self) -> &'static TableSpec {
        match self {
            Self::Customers => &CUSTOMERS,
            Self::Products => &PRODUCTS,
            Self::Stores => &STORES,
        }
    }

    pub fn table_name(self) -> &'static str {
        self.spec().name
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}
