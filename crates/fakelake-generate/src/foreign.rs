//! Read-only key lookups the fact generator samples from.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use arrow::array::{Array, AsArray};
use arrow::datatypes::{Decimal128Type, Int64Type};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rand::Rng;
use tracing::debug;

use fakelake_core::schema::{ID_COLUMN, UNIT_PRICE_COLUMN};
use fakelake_core::types::MONEY_SCALE;
use fakelake_core::{Dimension, OutputLayout};

use crate::errors::GenerationError;

/// What the fact generator needs from the dimension tables.
pub trait ForeignContext {
    /// Every key of `dimension`, in table order.
    fn keys(&self, dimension: Dimension) -> &[i64];

    /// Unit price in cents of `product_id`.
    fn unit_price(&self, product_id: i64) -> Result<i64, GenerationError>;

    /// Draw one key uniformly, with replacement.
    fn pick_key<R: Rng + ?Sized>(&self, dimension: Dimension, rng: &mut R) -> i64
    where
        Self: Sized,
    {
        let keys = self.keys(dimension);
        keys[rng.random_range(0..keys.len())]
    }
}

/// Ordered ids of one dimension table. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionKeys {
    dimension: Dimension,
    ids: Vec<i64>,
}

impl DimensionKeys {
    pub fn new(dimension: Dimension, ids: Vec<i64>) -> Result<Self, GenerationError> {
        if ids.is_empty() {
            return Err(GenerationError::EmptyDimension {
                table: dimension.table_name().to_string(),
            });
        }
        Ok(Self { dimension, ids })
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Lookups rebuilt from the persisted dimension tables on every fact run.
#[derive(Debug, Clone)]
pub struct DimensionLookups {
    customers: DimensionKeys,
    products: DimensionKeys,
    stores: DimensionKeys,
    price_by_product: HashMap<i64, i64>,
}

impl DimensionLookups {
    /// Build lookups from in-memory parts. Every product id must be unique.
    pub fn from_parts(
        customers: Vec<i64>,
        products: Vec<(i64, i64)>,
        stores: Vec<i64>,
    ) -> Result<Self, GenerationError> {
        let mut price_by_product = HashMap::with_capacity(products.len());
        let mut product_ids = Vec::with_capacity(products.len());
        for (id, cents) in products {
            if price_by_product.insert(id, cents).is_some() {
                return Err(GenerationError::InvalidDimension {
                    table: Dimension::Products.table_name().to_string(),
                    reason: format!("duplicate product id {id}"),
                });
            }
            product_ids.push(id);
        }

        Ok(Self {
            customers: DimensionKeys::new(Dimension::Customers, customers)?,
            products: DimensionKeys::new(Dimension::Products, product_ids)?,
            stores: DimensionKeys::new(Dimension::Stores, stores)?,
            price_by_product,
        })
    }

    /// Read the minimal projection of each dimension table under `layout`.
    pub fn load(layout: &OutputLayout) -> Result<Self, GenerationError> {
        let customers = read_ids(&layout.dimension_path(Dimension::Customers), Dimension::Customers)?;
        let products = read_prices(&layout.dimension_path(Dimension::Products))?;
        let stores = read_ids(&layout.dimension_path(Dimension::Stores), Dimension::Stores)?;

        let lookups = Self::from_parts(customers, products, stores)?;
        debug!(
            customers = lookups.customers.len(),
            products = lookups.products.len(),
            stores = lookups.stores.len(),
            "dimension lookups loaded"
        );
        Ok(lookups)
    }

    pub fn dimension_keys(&self, dimension: Dimension) -> &DimensionKeys {
        match dimension {
            Dimension::Customers => &self.customers,
            Dimension::Products => &self.products,
            Dimension::Stores => &self.stores,
        }
    }
}

impl ForeignContext for DimensionLookups {
    fn keys(&self, dimension: Dimension) -> &[i64] {
        self.dimension_keys(dimension).ids()
    }

    fn unit_price(&self, product_id: i64) -> Result<i64, GenerationError> {
        self.price_by_product
            .get(&product_id)
            .copied()
            .ok_or(GenerationError::ReferentialIntegrity { product_id })
    }
}

fn read_ids(path: &Path, dimension: Dimension) -> Result<Vec<i64>, GenerationError> {
    let mut ids = Vec::new();
    for batch in read_projection(path, dimension, &[ID_COLUMN])? {
        ids.extend_from_slice(int64_column(&batch, dimension, ID_COLUMN)?);
    }
    Ok(ids)
}

fn read_prices(path: &Path) -> Result<Vec<(i64, i64)>, GenerationError> {
    let dimension = Dimension::Products;
    let mut products = Vec::new();
    for batch in read_projection(path, dimension, &[ID_COLUMN, UNIT_PRICE_COLUMN])? {
        let ids = int64_column(&batch, dimension, ID_COLUMN)?;
        let prices = batch
            .column_by_name(UNIT_PRICE_COLUMN)
            .and_then(|column| column.as_primitive_opt::<Decimal128Type>())
            .ok_or_else(|| invalid(dimension, "unit_price is not a decimal column"))?;
        if prices.scale() != MONEY_SCALE || prices.null_count() > 0 {
            return Err(invalid(dimension, "unit_price must be a non-null decimal with scale 2"));
        }
        for (id, cents) in ids.iter().zip(prices.values().iter()) {
            let cents = i64::try_from(*cents)
                .map_err(|_| invalid(dimension, "unit_price out of range"))?;
            products.push((*id, cents));
        }
    }
    Ok(products)
}

fn read_projection(
    path: &Path,
    dimension: Dimension,
    columns: &[&str],
) -> Result<Vec<RecordBatch>, GenerationError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(GenerationError::MissingDimension {
                table: dimension.table_name().to_string(),
                path: path.to_path_buf(),
            });
        }
        Err(err) => return Err(GenerationError::read(path, err)),
    };

    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).map_err(|err| GenerationError::read(path, err))?;
    let mut indices = Vec::with_capacity(columns.len());
    for name in columns {
        let index = builder
            .schema()
            .index_of(name)
            .map_err(|_| invalid(dimension, &format!("missing column '{name}'")))?;
        indices.push(index);
    }
    let mask = ProjectionMask::roots(builder.parquet_schema(), indices);
    let reader = builder
        .with_projection(mask)
        .build()
        .map_err(|err| GenerationError::read(path, err))?;

    reader
        .map(|batch| batch.map_err(|err| GenerationError::read(path, err)))
        .collect()
}

fn int64_column<'a>(
    batch: &'a RecordBatch,
    dimension: Dimension,
    name: &str,
) -> Result<&'a [i64], GenerationError> {
    let column = batch
        .column_by_name(name)
        .and_then(|column| column.as_primitive_opt::<Int64Type>())
        .ok_or_else(|| invalid(dimension, &format!("column '{name}' is not Int64")))?;
    if column.null_count() > 0 {
        return Err(invalid(dimension, &format!("column '{name}' has nulls")));
    }
    Ok(&column.values()[..])
}

fn invalid(dimension: Dimension, reason: &str) -> GenerationError {
    GenerationError::InvalidDimension {
        table: dimension.table_name().to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn prices_resolve_and_unknown_products_fail() {
        let lookups =
            DimensionLookups::from_parts(vec![1, 2], vec![(1, 1_050), (2, 99)], vec![1])
                .expect("lookups");
        assert_eq!(lookups.unit_price(1).expect("price"), 1_050);
        assert!(matches!(
            lookups.unit_price(7),
            Err(GenerationError::ReferentialIntegrity { product_id: 7 })
        ));
    }

    #[test]
    fn empty_dimension_is_rejected() {
        let result = DimensionLookups::from_parts(vec![1], vec![(1, 100)], Vec::new());
        assert!(matches!(
            result,
            Err(GenerationError::EmptyDimension { table }) if table == "dim_lojas"
        ));
    }

    #[test]
    fn duplicate_product_ids_are_rejected() {
        let result = DimensionLookups::from_parts(vec![1], vec![(1, 100), (1, 200)], vec![1]);
        assert!(matches!(result, Err(GenerationError::InvalidDimension { .. })));
    }

    #[test]
    fn picked_keys_come_from_the_lookup() {
        let lookups = DimensionLookups::from_parts(vec![3, 5, 9], vec![(1, 100)], vec![1])
            .expect("lookups");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            let key = lookups.pick_key(Dimension::Customers, &mut rng);
            assert!([3, 5, 9].contains(&key));
        }
    }

    #[test]
    fn missing_table_file_is_reported() {
        let dir = std::env::temp_dir().join(format!("fakelake_missing_{}", uuid::Uuid::new_v4()));
        let result = DimensionLookups::load(&OutputLayout::new(&dir));
        assert!(matches!(
            result,
            Err(GenerationError::MissingDimension { table, .. }) if table == "dim_clientes"
        ));
    }
}
