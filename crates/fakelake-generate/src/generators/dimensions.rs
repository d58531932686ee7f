use std::ops::Range;
use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, Decimal128Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use rand::RngCore;

use fakelake_core::Dimension;
use fakelake_core::schema::{CUSTOMERS, PRODUCTS, STORES};
use fakelake_core::types::MONEY_SCALE;

use super::semantic::{
    city, cpf, date_between, money_cents, person_name, pick, state_code, years_before,
};
use super::{DimensionContext, DimensionGenerator};
use crate::errors::GenerationError;
use crate::output::{arrow_schema, date_to_days};

pub const PRODUCT_CATEGORIES: &[&str] = &[
    "Eletrônicos",
    "Roupas",
    "Livros",
    "Mercado",
    "Brinquedos",
    "Esportes",
];

const MIN_PRICE: f64 = 10.0;
const MAX_PRICE: f64 = 2000.0;

pub fn generator_for(dimension: Dimension) -> Box<dyn DimensionGenerator> {
    match dimension {
        Dimension::Customers => Box::new(CustomerGenerator),
        Dimension::Products => Box::new(ProductGenerator),
        Dimension::Stores => Box::new(StoreGenerator),
    }
}

/// `dim_clientes`: people with a CPF, a home city and a birth date.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomerGenerator;

impl DimensionGenerator for CustomerGenerator {
    fn dimension(&self) -> Dimension {
        Dimension::Customers
    }

    fn generate_batch(
        &self,
        ids: Range<i64>,
        ctx: &DimensionContext,
        rng: &mut dyn RngCore,
    ) -> Result<RecordBatch, GenerationError> {
        let rows = ids.clone().count();
        let oldest = years_before(ctx.reference_date, 70);
        let youngest = years_before(ctx.reference_date, 18);
        let first_created = years_before(ctx.reference_date, 5);

        let mut names = Vec::with_capacity(rows);
        let mut national_ids = Vec::with_capacity(rows);
        let mut cities = Vec::with_capacity(rows);
        let mut states = Vec::with_capacity(rows);
        let mut birth_dates = Vec::with_capacity(rows);
        let mut created_dates = Vec::with_capacity(rows);

        for _ in 0..rows {
            names.push(person_name(rng));
            national_ids.push(cpf(rng));
            cities.push(city(rng));
            states.push(state_code(rng));
            birth_dates.push(date_to_days(date_between(oldest, youngest, rng)));
            created_dates.push(date_to_days(date_between(
                first_created,
                ctx.reference_date,
                rng,
            )));
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from_iter_values(ids)),
            Arc::new(StringArray::from(names)),
            Arc::new(StringArray::from(national_ids)),
            Arc::new(StringArray::from(cities)),
            Arc::new(StringArray::from(states)),
            Arc::new(Date32Array::from(birth_dates)),
            Arc::new(Date32Array::from(created_dates)),
        ];
        Ok(RecordBatch::try_new(arrow_schema(&CUSTOMERS), columns)?)
    }
}

/// `dim_produtos`: catalogue entries with a category and a unit price.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductGenerator;

impl DimensionGenerator for ProductGenerator {
    fn dimension(&self) -> Dimension {
        Dimension::Products
    }

    fn generate_batch(
        &self,
        ids: Range<i64>,
        ctx: &DimensionContext,
        rng: &mut dyn RngCore,
    ) -> Result<RecordBatch, GenerationError> {
        let rows = ids.clone().count();
        let first_created = years_before(ctx.reference_date, 5);

        let mut names = Vec::with_capacity(rows);
        let mut categories = Vec::with_capacity(rows);
        let mut prices = Vec::with_capacity(rows);
        let mut created_dates = Vec::with_capacity(rows);

        for id in ids.clone() {
            names.push(format!("Produto {id}"));
            categories.push(pick(PRODUCT_CATEGORIES, rng));
            prices.push(money_cents(MIN_PRICE, MAX_PRICE, rng) as i128);
            created_dates.push(date_to_days(date_between(
                first_created,
                ctx.reference_date,
                rng,
            )));
        }

        let prices = Decimal128Array::from_iter_values(prices)
            .with_precision_and_scale(10, MONEY_SCALE)?;
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from_iter_values(ids)),
            Arc::new(StringArray::from(names)),
            Arc::new(StringArray::from(categories)),
            Arc::new(prices),
            Arc::new(Date32Array::from(created_dates)),
        ];
        Ok(RecordBatch::try_new(arrow_schema(&PRODUCTS), columns)?)
    }
}

/// `dim_lojas`: physical stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreGenerator;

impl DimensionGenerator for StoreGenerator {
    fn dimension(&self) -> Dimension {
        Dimension::Stores
    }

    fn generate_batch(
        &self,
        ids: Range<i64>,
        ctx: &DimensionContext,
        rng: &mut dyn RngCore,
    ) -> Result<RecordBatch, GenerationError> {
        let rows = ids.clone().count();
        let first_opened = years_before(ctx.reference_date, 10);

        let mut names = Vec::with_capacity(rows);
        let mut cities = Vec::with_capacity(rows);
        let mut states = Vec::with_capacity(rows);
        let mut opened_dates = Vec::with_capacity(rows);

        for id in ids.clone() {
            names.push(format!("Loja {id}"));
            cities.push(city(rng));
            states.push(state_code(rng));
            opened_dates.push(date_to_days(date_between(
                first_opened,
                ctx.reference_date,
                rng,
            )));
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from_iter_values(ids)),
            Arc::new(StringArray::from(names)),
            Arc::new(StringArray::from(cities)),
            Arc::new(StringArray::from(states)),
            Arc::new(Date32Array::from(opened_dates)),
        ];
        Ok(RecordBatch::try_new(arrow_schema(&STORES), columns)?)
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::{Array, AsArray};
    use arrow::datatypes::{Decimal128Type, Int64Type};
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::output::days_to_date;

    fn ctx() -> DimensionContext {
        DimensionContext {
            reference_date: NaiveDate::from_ymd_opt(2025, 12, 31).expect("date"),
        }
    }

    #[test]
    fn batches_carry_requested_ids_in_order() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for dimension in Dimension::ALL {
            let batch = generator_for(dimension)
                .generate_batch(5..9, &ctx(), &mut rng)
                .expect("batch");
            assert_eq!(batch.num_rows(), 4);
            assert_eq!(batch.num_columns(), dimension.spec().columns.len());
            let ids = batch.column(0).as_primitive::<Int64Type>();
            assert_eq!(ids.values().to_vec(), vec![5, 6, 7, 8]);
        }
    }

    #[test]
    fn customer_dates_stay_in_their_windows() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let batch = CustomerGenerator
            .generate_batch(1..201, &ctx(), &mut rng)
            .expect("batch");
        let births = batch
            .column_by_name("birth_date")
            .expect("birth_date")
            .as_primitive::<arrow::datatypes::Date32Type>();
        let lower = NaiveDate::from_ymd_opt(1955, 12, 31).expect("date");
        let upper = NaiveDate::from_ymd_opt(2007, 12, 31).expect("date");
        for days in births.values().iter() {
            let date = days_to_date(*days).expect("date");
            assert!(date >= lower && date <= upper, "{date}");
        }
        let national_ids = batch
            .column_by_name("national_id")
            .expect("national_id")
            .as_string::<i32>();
        assert!(national_ids.iter().flatten().all(|value| value.len() == 11));
    }

    #[test]
    fn product_prices_are_positive_two_decimal_values() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let batch = ProductGenerator
            .generate_batch(1..101, &ctx(), &mut rng)
            .expect("batch");
        let prices = batch
            .column_by_name("unit_price")
            .expect("unit_price")
            .as_primitive::<Decimal128Type>();
        assert_eq!(prices.scale(), 2);
        assert_eq!(prices.null_count(), 0);
        assert!(prices.values().iter().all(|cents| (1_000..=200_000).contains(cents)));

        let names = batch.column_by_name("name").expect("name").as_string::<i32>();
        assert_eq!(names.value(0), "Produto 1");
        let categories = batch
            .column_by_name("category")
            .expect("category")
            .as_string::<i32>();
        assert!(categories.iter().flatten().all(|c| PRODUCT_CATEGORIES.contains(&c)));
    }

    #[test]
    fn same_seed_same_rows() {
        let first = StoreGenerator
            .generate_batch(1..20, &ctx(), &mut ChaCha8Rng::seed_from_u64(3))
            .expect("batch");
        let second = StoreGenerator
            .generate_batch(1..20, &ctx(), &mut ChaCha8Rng::seed_from_u64(3))
            .expect("batch");
        assert_eq!(first, second);
    }
}
