//! Seed script for development: populates a fresh database with a demo account.
//!
//! Usage: `cargo run --bin seed`
//!
//! Requires `DATABASE_URL` (reads .env). Creates a verified user with incomes
//! and expenses spread over the current and previous month plus a budget for
//! the current month, so the dashboard has previous-month advice to show.

use anyhow::Context;
use chrono::{Datelike, NaiveDate, Utc};
use fintrack::models::month::MonthWindow;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

const DEMO_USERNAME: &str = "demo";
const DEMO_EMAIL: &str = "demo@fintrack.local";
const DEMO_PASSWORD: &str = "Demo123!";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let db_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = fintrack::db::create_pool(&db_url, 5).await?;

    fintrack::db::run_migrations(&pool).await?;

    println!("=== fintrack Seed Script ===");

    let user_id = seed_demo_user(&pool).await?;
    let today = Utc::now().date_naive();
    let current = MonthWindow::containing(today);
    let previous = current.previous();

    seed_month(&pool, user_id, &previous, false).await?;
    seed_month(&pool, user_id, &current, true).await?;
    seed_budget(&pool, user_id, &current).await?;

    println!("\n=== Seed complete! ===");
    println!("Demo login: {DEMO_USERNAME} / {DEMO_PASSWORD}");

    Ok(())
}

async fn seed_demo_user(pool: &PgPool) -> anyhow::Result<Uuid> {
    let hash = fintrack::services::auth::hash_password(DEMO_PASSWORD)?;

    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (username, email, phone, password_hash, verified)
        VALUES ($1, $2, '555-0100', $3, true)
        ON CONFLICT (username) DO UPDATE SET password_hash = EXCLUDED.password_hash
        RETURNING id
        "#,
    )
    .bind(DEMO_USERNAME)
    .bind(DEMO_EMAIL)
    .bind(&hash)
    .fetch_one(pool)
    .await?;

    println!("[done] Demo user ready ({id})");
    Ok(id)
}

/// Insert a month of sample records unless that month already has some.
async fn seed_month(
    pool: &PgPool,
    user_id: Uuid,
    window: &MonthWindow,
    up_to_today: bool,
) -> anyhow::Result<()> {
    let existing: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM transactions WHERE user_id = $1 AND date BETWEEN $2 AND $3",
    )
    .bind(user_id)
    .bind(window.start)
    .bind(window.end)
    .fetch_one(pool)
    .await?;

    if existing > 0 {
        println!("[skip] {}-{:02} already has {existing} records", window.year, window.month);
        return Ok(());
    }

    let last_day = if up_to_today {
        Utc::now().date_naive().day().min(window.days())
    } else {
        window.days()
    };
    let day = |d: u32| NaiveDate::from_ymd_opt(window.year, window.month, d.min(last_day));

    let samples: [(&str, &str, i64, u32, &str); 8] = [
        ("Income", "Salary", 320000, 1, "Monthly salary"),
        ("Income", "Freelance", 45000, 12, "Logo design"),
        ("Expense", "Rent", 110000, 1, "Apartment"),
        ("Expense", "Groceries", 18250, 4, ""),
        ("Expense", "groceries", 9640, 18, "Weekend market"),
        ("Expense", "Transport", 6000, 7, "Monthly pass"),
        ("Expense", "Dining", 4275, 15, ""),
        ("Expense", "Utilities", 12980, 22, "Power and water"),
    ];

    for (kind, category, cents, d, description) in samples {
        let Some(date) = day(d) else { continue };
        sqlx::query(
            r#"
            INSERT INTO transactions (user_id, kind, category, amount, date, description)
            VALUES ($1, $2::transaction_kind, $3, $4, $5, $6)
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(category)
        .bind(Decimal::new(cents, 2))
        .bind(date)
        .bind(description)
        .execute(pool)
        .await?;
    }

    println!("[done] Seeded {}-{:02}", window.year, window.month);
    Ok(())
}

async fn seed_budget(pool: &PgPool, user_id: Uuid, window: &MonthWindow) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO budgets (user_id, month, year, amount)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, month, year) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(window.month as i32)
    .bind(window.year)
    .bind(Decimal::new(200000, 2))
    .execute(pool)
    .await?;

    println!("[done] Budget for {}-{:02}", window.year, window.month);
    Ok(())
}
