use std::env;

use anyhow::{anyhow, ensure, Context, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde::Serialize;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

use praxisnow::auth::jwt::JwtService;
use praxisnow::auth::password;
use praxisnow::config::AppConfig;
use praxisnow::db::{self, PgPool};
use praxisnow::models::{
    NewPractice, NewRecurringAvailability, NewResource, NewService, NewUser,
};
use praxisnow::routes;
use praxisnow::state::AppState;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

#[allow(dead_code)]
pub struct SeededCalendar {
    pub practice_id: Uuid,
    pub resource_id: Uuid,
    pub service_id: Uuid,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url: database_url.clone(),
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 60,
            cors_allowed_origin: None,
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(pool.clone(), config, jwt);
        let router = routes::create_router(state.clone());

        Ok(Self { state, router })
    }

    pub async fn cleanup(&self) -> Result<()> {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get cleanup connection: {err}"))?;
            truncate_all(&mut conn)?;
            Ok(())
        })
        .await
        .context("cleanup task panicked")?
    }

    pub async fn insert_user(&self, email: &str, user_password: &str, name: &str) -> Result<Uuid> {
        let email = email.to_string();
        let user_password = user_password.to_string();
        let name = name.to_string();
        self.with_conn(move |conn| {
            let user = NewUser {
                id: Uuid::new_v4(),
                email,
                password_hash: password::hash_password(&user_password)?,
                name,
                phone: None,
                address: None,
            };
            diesel::insert_into(praxisnow::schema::users::table)
                .values(&user)
                .execute(conn)
                .context("failed to insert user")?;
            Ok(user.id)
        })
        .await
    }

    pub async fn login_token(&self, email: &str, password: &str) -> Result<String> {
        #[derive(Serialize)]
        struct LoginPayload<'a> {
            email: &'a str,
            password: &'a str,
        }

        let response = self
            .post_json("/auth/login", &LoginPayload { email, password }, None)
            .await?;

        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );

        let body = body_to_vec(response.into_body()).await?;
        #[derive(serde::Deserialize)]
        struct SessionResponse {
            access_token: String,
        }
        let parsed: SessionResponse = serde_json::from_slice(&body)?;
        Ok(parsed.access_token)
    }

    /// Seeds one Berlin practice with a resource open 09:00-17:00 every day
    /// of the week for a single 50-minute service.
    pub async fn seed_calendar(&self) -> Result<SeededCalendar> {
        self.with_conn(|conn| {
            let practice = NewPractice {
                id: Uuid::new_v4(),
                name: "Praxis Test".to_string(),
                city: "Berlin".to_string(),
                street: None,
                time_zone: "Europe/Berlin".to_string(),
            };
            diesel::insert_into(praxisnow::schema::practices::table)
                .values(&practice)
                .execute(conn)
                .context("failed to insert practice")?;

            let service = NewService {
                id: Uuid::new_v4(),
                practice_id: practice.id,
                name: "Erstgespräch".to_string(),
                duration_min: 50,
                buffer_before_min: 0,
                buffer_after_min: 10,
                active: true,
            };
            diesel::insert_into(praxisnow::schema::services::table)
                .values(&service)
                .execute(conn)
                .context("failed to insert service")?;

            let resource = NewResource {
                id: Uuid::new_v4(),
                practice_id: practice.id,
                name: "Therapeut/in A".to_string(),
                active: true,
            };
            diesel::insert_into(praxisnow::schema::resources::table)
                .values(&resource)
                .execute(conn)
                .context("failed to insert resource")?;

            for weekday in 0..=6i16 {
                let rule = NewRecurringAvailability {
                    id: Uuid::new_v4(),
                    resource_id: resource.id,
                    weekday,
                    start_local: "09:00".to_string(),
                    end_local: "17:00".to_string(),
                    service_id: Some(service.id),
                };
                diesel::insert_into(praxisnow::schema::recurring_availability::table)
                    .values(&rule)
                    .execute(conn)
                    .context("failed to insert recurring rule")?;
            }

            Ok(SeededCalendar {
                practice_id: practice.id,
                resource_id: resource.id,
                service_id: service.id,
            })
        })
        .await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(Method::PATCH)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE appointments, blackouts, recurring_availability, services, resources, practices, users RESTART IDENTITY CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}
