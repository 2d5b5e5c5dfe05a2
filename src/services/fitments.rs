//! Administration of the fitment table: which tyre sizes fit which cars.
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{
    self,
    models::{
        car::Car,
        fitment::{Fitment, FitmentInsert},
    },
};

#[derive(Deserialize, Debug, Clone)]
pub struct FitmentDetails {
    #[serde(alias = "carMake")]
    pub car_make: String,
    #[serde(alias = "carModel")]
    pub car_model: String,
    pub year: Option<i32>,
    #[serde(alias = "tyreBrand")]
    pub tyre_brand: Option<String>,
    #[serde(alias = "tyreSize")]
    pub tyre_size: String,
    #[serde(default)]
    pub price: i64,
}

/// Outcome of copying year-less fitments onto each model year.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExpansionReport {
    pub inserted: u64,
    pub skipped: u64,
}

pub async fn list_all(
    db_conn: &db::ConnectionPool,
) -> Result<Vec<Fitment>, db::errors::DatabaseError> {
    Fitment::select_all(db_conn).await
}

pub async fn create(
    details: FitmentDetails,
    db_conn: &db::ConnectionPool,
) -> Result<Fitment, errors::FitmentCreateError> {
    let car_make = details.car_make.trim();
    let car_model = details.car_model.trim();
    let tyre_size = details.tyre_size.trim();
    if car_make.is_empty() || car_model.is_empty() || tyre_size.is_empty() {
        return Err(errors::FitmentCreateError::MissingFields);
    }
    if details.price < 0 {
        return Err(errors::FitmentCreateError::NegativePrice);
    }
    Ok(FitmentInsert {
        car_make: car_make.to_owned(),
        car_model: car_model.to_owned(),
        year: details.year,
        tyre_brand: details
            .tyre_brand
            .map(|brand| brand.trim().to_owned())
            .filter(|brand| !brand.is_empty()),
        tyre_size: tyre_size.to_owned(),
        price: details.price,
    }
    .store(db_conn)
    .await?)
}

pub async fn delete(
    id: Uuid,
    db_conn: &db::ConnectionPool,
) -> Result<(), errors::FitmentDeleteError> {
    let fitment = Fitment::select_one(id, db_conn)
        .await?
        .ok_or(errors::FitmentDeleteError::NonExistent)?;
    fitment.delete(db_conn).await?;
    Ok(())
}

/// One year-pinned copy of `template` per distinct year.
fn expand(template: &FitmentInsert, years: &[i32]) -> Vec<FitmentInsert> {
    years
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|year| FitmentInsert {
            year: Some(year),
            ..template.clone()
        })
        .collect()
}

/// Copy every fitment without a year onto each year of its car. Rows that
/// already exist are skipped, so this is safe to rerun.
pub async fn expand_years(
    db_conn: &db::ConnectionPool,
) -> Result<ExpansionReport, db::errors::DatabaseError> {
    let mut report = ExpansionReport::default();
    for fitment in Fitment::select_without_year(db_conn).await? {
        let Some(car) =
            Car::select_by_make_model(&fitment.car_make, &fitment.car_model, db_conn).await?
        else {
            continue;
        };
        let template = FitmentInsert {
            car_make: fitment.car_make,
            car_model: fitment.car_model,
            year: None,
            tyre_brand: fitment.tyre_brand,
            tyre_size: fitment.tyre_size,
            price: fitment.price,
        };
        for insert in expand(&template, &car.years) {
            let Some(year) = insert.year else { continue };
            if Fitment::exists(
                &insert.car_make,
                &insert.car_model,
                year,
                &insert.tyre_size,
                db_conn,
            )
            .await?
            {
                report.skipped += 1;
            } else {
                insert.store(db_conn).await?;
                report.inserted += 1;
            }
        }
    }
    tracing::info!(inserted = report.inserted, skipped = report.skipped, "Expanded fitment years");
    Ok(report)
}

pub mod errors {
    use thiserror::Error;

    use crate::db::errors::DatabaseError;

    #[derive(Error, Debug)]
    pub enum FitmentCreateError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("Car make, car model and tyre size are required")]
        MissingFields,
        #[error("Price cannot be negative")]
        NegativePrice,
    }

    #[derive(Error, Debug)]
    pub enum FitmentDeleteError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("The fitment being deleted does not exist")]
        NonExistent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_accept_camel_case() {
        let details: FitmentDetails = serde_json::from_value(serde_json::json!({
            "carMake": "Hyundai",
            "carModel": "Creta",
            "tyreSize": "215/60R17"
        }))
        .expect("valid body");
        assert_eq!(details.car_model, "Creta");
        assert_eq!(details.year, None);
        assert_eq!(details.price, 0);
    }

    #[test]
    fn expansion_pins_each_distinct_year() {
        let template = FitmentInsert {
            car_make: String::from("Hyundai"),
            car_model: String::from("Creta"),
            year: None,
            tyre_brand: None,
            tyre_size: String::from("215/60R17"),
            price: 0,
        };
        let years: Vec<Option<i32>> = expand(&template, &[2021, 2020, 2021])
            .into_iter()
            .map(|insert| insert.year)
            .collect();
        assert_eq!(years, vec![Some(2020), Some(2021)]);
        assert!(expand(&template, &[]).is_empty());
    }
}
