//! Vehicle lookup from the locally curated car and fitment tables, plus car
//! management for administrators.
use std::collections::{BTreeSet, HashSet};

use serde::Deserialize;
use uuid::Uuid;

use crate::{
    constants::api::CATALOG_LIMIT,
    db::{
        self,
        models::{
            car::{Car, CarInsert},
            fitment::Fitment,
            tyre::Tyre,
        },
    },
    services::sizes,
};

/// Years offered for a known car that has none recorded.
const DEFAULT_YEARS: [i32; 3] = [2022, 2023, 2024];

pub async fn makes(db_conn: &db::ConnectionPool) -> Result<Vec<String>, db::errors::DatabaseError> {
    Car::select_distinct_makes(db_conn).await
}

pub async fn models(
    make: &str,
    db_conn: &db::ConnectionPool,
) -> Result<Vec<String>, db::errors::DatabaseError> {
    Car::select_distinct_models(make.trim(), db_conn).await
}

fn years_for(car: Option<&Car>) -> Vec<i32> {
    match car {
        None => Vec::new(),
        Some(car) if car.years.is_empty() => DEFAULT_YEARS.to_vec(),
        Some(car) => car
            .years
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    }
}

/// Model years for a car. Empty for an unknown car.
pub async fn years(
    make: &str,
    model: &str,
    db_conn: &db::ConnectionPool,
) -> Result<Vec<i32>, db::errors::DatabaseError> {
    let car = Car::select_by_make_model(make.trim(), model.trim(), db_conn).await?;
    Ok(years_for(car.as_ref()))
}

/// Distinct size keys, in first-seen order.
pub fn distinct_size_keys<'a>(tyre_sizes: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    tyre_sizes
        .into_iter()
        .map(sizes::size_key)
        .filter(|key| !key.is_empty() && seen.insert(key.clone()))
        .collect()
}

/// Priced tyres fitting a car in a given model year.
pub async fn tyres_for_car(
    make: &str,
    model: &str,
    year: i32,
    db_conn: &db::ConnectionPool,
) -> Result<Vec<Tyre>, db::errors::DatabaseError> {
    let fitments = Fitment::select_matching(make.trim(), model.trim(), Some(year), db_conn).await?;
    let keys = distinct_size_keys(fitments.iter().map(|fitment| fitment.tyre_size.as_str()));
    tracing::debug!(make, model, year, fitments = fitments.len(), sizes = ?keys, "Resolved fitment sizes");
    if keys.is_empty() {
        return Ok(Vec::new());
    }
    let tyres = Tyre::select_priced_by_size_keys(&keys, CATALOG_LIMIT, db_conn).await?;
    let mut seen = HashSet::new();
    Ok(tyres
        .into_iter()
        .filter(|tyre| seen.insert(tyre.sku.clone()))
        .collect())
}

/// A car as entered by an administrator.
#[derive(Deserialize, Debug, Clone)]
pub struct CarDetails {
    pub make: String,
    pub model: String,
    #[serde(default)]
    pub years: Vec<i32>,
    #[serde(rename = "type")]
    pub car_type: Option<String>,
    #[serde(alias = "fuelType")]
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    #[serde(alias = "tyreSize")]
    pub tyre_size: Option<String>,
}

impl CarDetails {
    fn validate(&self) -> Result<(), errors::CarValidationError> {
        if self.make.trim().is_empty() || self.model.trim().is_empty() {
            return Err(errors::CarValidationError::MissingMakeOrModel);
        }
        if self.years.iter().any(|year| !(1900..=2100).contains(year)) {
            return Err(errors::CarValidationError::InvalidYear);
        }
        Ok(())
    }
}

pub async fn list_all(db_conn: &db::ConnectionPool) -> Result<Vec<Car>, db::errors::DatabaseError> {
    Car::select_all(db_conn).await
}

pub async fn create(
    details: CarDetails,
    db_conn: &db::ConnectionPool,
) -> Result<Car, errors::CarCreateError> {
    details.validate()?;
    let car = CarInsert {
        make: details.make.trim().to_owned(),
        model: details.model.trim().to_owned(),
        years: details.years,
        car_type: details.car_type,
        fuel_type: details.fuel_type,
        transmission: details.transmission,
        tyre_size: details.tyre_size,
    }
    .store(db_conn)
    .await?;
    tracing::info!(car_id = %car.id(), make = %car.make, model = %car.model, "Created car");
    Ok(car)
}

pub async fn update(
    id: Uuid,
    details: CarDetails,
    db_conn: &db::ConnectionPool,
) -> Result<Car, errors::CarUpdateError> {
    details.validate()?;
    let mut car = Car::select_one(id, db_conn)
        .await?
        .ok_or(errors::CarUpdateError::NonExistent)?;
    car.make = details.make.trim().to_owned();
    car.model = details.model.trim().to_owned();
    car.years = details.years;
    car.car_type = details.car_type;
    car.fuel_type = details.fuel_type;
    car.transmission = details.transmission;
    car.tyre_size = details.tyre_size;
    car.update(db_conn).await?;
    Ok(car)
}

pub async fn delete(id: Uuid, db_conn: &db::ConnectionPool) -> Result<(), errors::CarDeleteError> {
    let car = Car::select_one(id, db_conn)
        .await?
        .ok_or(errors::CarDeleteError::NonExistent)?;
    car.delete(db_conn).await?;
    Ok(())
}

pub mod errors {
    use thiserror::Error;

    use crate::db::errors::DatabaseError;

    #[derive(Error, Debug, PartialEq, Eq)]
    pub enum CarValidationError {
        #[error("Make and model are required")]
        MissingMakeOrModel,
        #[error("Years must be between 1900 and 2100")]
        InvalidYear,
    }

    #[derive(Error, Debug)]
    pub enum CarCreateError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error(transparent)]
        Invalid(#[from] CarValidationError),
    }

    #[derive(Error, Debug)]
    pub enum CarUpdateError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error(transparent)]
        Invalid(#[from] CarValidationError),
        #[error("The car being updated does not exist")]
        NonExistent,
    }

    #[derive(Error, Debug)]
    pub enum CarDeleteError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("The car being deleted does not exist")]
        NonExistent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(years: Vec<i32>) -> CarDetails {
        serde_json::from_value(serde_json::json!({
            "make": "Maruti Suzuki",
            "model": "Swift",
            "years": years,
            "fuelType": "Petrol"
        }))
        .expect("valid body")
    }

    #[test]
    fn fitment_sizes_collapse_to_keys() {
        assert_eq!(
            distinct_size_keys(["185/65 R15", "185/65R15", "195/55r16", ""]),
            vec!["185/65R15", "195/55R16"]
        );
    }

    #[test]
    fn unknown_car_has_no_years() {
        assert!(years_for(None).is_empty());
    }

    #[test]
    fn car_details_accept_camel_case_aliases() {
        let car = details(vec![2021]);
        assert_eq!(car.fuel_type.as_deref(), Some("Petrol"));
        assert_eq!(car.validate(), Ok(()));
    }

    #[test]
    fn car_details_reject_bad_input() {
        assert_eq!(
            details(vec![20]).validate(),
            Err(errors::CarValidationError::InvalidYear)
        );
        let mut car = details(Vec::new());
        car.model = String::from(" ");
        assert_eq!(
            car.validate(),
            Err(errors::CarValidationError::MissingMakeOrModel)
        );
    }
}
