use anyhow::{Context, Result};
use diesel::prelude::*;
use uuid::Uuid;

use praxisnow::{
    config::AppConfig,
    db,
    models::{NewPractice, NewRecurringAvailability, NewResource, NewService},
    schema::{practices, recurring_availability, resources, services},
    time::DEFAULT_TIME_ZONE,
};

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;
    let pool = db::init_pool(&config.database_url)?;
    let mut conn = pool.get().context("failed to get database connection")?;
    db::run_migrations(&mut conn)?;

    let practice = NewPractice {
        id: Uuid::new_v4(),
        name: "Psychologische Praxis Demo".to_string(),
        city: "Berlin".to_string(),
        street: Some("Beispielstraße 12".to_string()),
        time_zone: DEFAULT_TIME_ZONE.to_string(),
    };
    diesel::insert_into(practices::table)
        .values(&practice)
        .execute(&mut conn)?;

    let service = NewService {
        id: Uuid::new_v4(),
        practice_id: practice.id,
        name: "Erstgespräch".to_string(),
        duration_min: 50,
        buffer_before_min: 0,
        buffer_after_min: 10,
        active: true,
    };
    diesel::insert_into(services::table)
        .values(&service)
        .execute(&mut conn)?;

    let resource = NewResource {
        id: Uuid::new_v4(),
        practice_id: practice.id,
        name: "Therapeut/in A".to_string(),
        active: true,
    };
    diesel::insert_into(resources::table)
        .values(&resource)
        .execute(&mut conn)?;

    // Open Monday through Friday, 09:00-17:00 local.
    for weekday in 0..5i16 {
        let rule = NewRecurringAvailability {
            id: Uuid::new_v4(),
            resource_id: resource.id,
            weekday,
            start_local: "09:00".to_string(),
            end_local: "17:00".to_string(),
            service_id: Some(service.id),
        };
        diesel::insert_into(recurring_availability::table)
            .values(&rule)
            .execute(&mut conn)?;
    }

    println!("Seeded.");
    println!("Practice ID: {}", practice.id);
    println!("Service ID:  {}", service.id);
    println!("Resource ID: {}", resource.id);
    println!("Use GET /public/practices to fetch details.");

    Ok(())
}
