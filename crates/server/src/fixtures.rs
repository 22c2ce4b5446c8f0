//! Fixture data for manual testing: five users, three projects, each with a
//! five-step payment schedule and four change requests.

use chrono::{DateTime, TimeZone, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    db::models::{ChangeRequestStatus, ChangeRequestType, InstallmentStatus, Role},
    error::{AppError, Result},
    routes::auth::hash_password,
    services::{
        change_requests::{ChangeRequestLog, NewChangeRequest},
        projects::{NewProject, ProjectRegistry},
    },
};

pub struct FixtureUser {
    pub id: &'static str,
    pub email: &'static str,
    pub full_name: &'static str,
    pub role: Role,
}

pub const USERS: [FixtureUser; 5] = [
    FixtureUser {
        id: "admin-001",
        email: "admin@homebuilder.com",
        full_name: "Admin User",
        role: Role::Admin,
    },
    FixtureUser {
        id: "staff-001",
        email: "staff1@homebuilder.com",
        full_name: "Somchai Builder",
        role: Role::Staff,
    },
    FixtureUser {
        id: "staff-002",
        email: "staff2@homebuilder.com",
        full_name: "Nattaya Designer",
        role: Role::Staff,
    },
    FixtureUser {
        id: "client-001",
        email: "client1@example.com",
        full_name: "Anan Sukhum",
        role: Role::Client,
    },
    FixtureUser {
        id: "client-002",
        email: "client2@example.com",
        full_name: "Suda Bangkok",
        role: Role::Client,
    },
];

struct FixtureProject {
    name: &'static str,
    code: &'static str,
    location: &'static str,
    total_price: f64,
    owner_id: &'static str,
    staff: &'static [&'static str],
    created: (i32, u32, u32),
}

const PROJECTS: [FixtureProject; 3] = [
    FixtureProject {
        name: "Modern Loft House",
        code: "HBP-2024-001",
        location: "Sukhumvit 101, Bangkok",
        total_price: 8_500_000.0,
        owner_id: "client-001",
        staff: &["staff-001", "staff-002"],
        created: (2024, 1, 15),
    },
    FixtureProject {
        name: "Tropical Villa",
        code: "HBP-2024-002",
        location: "Phuket, Thailand",
        total_price: 12_000_000.0,
        owner_id: "client-002",
        staff: &["staff-001"],
        created: (2024, 2, 20),
    },
    FixtureProject {
        name: "Cozy Townhouse",
        code: "HBP-2024-003",
        location: "Chiang Mai, Thailand",
        total_price: 4_500_000.0,
        owner_id: "client-001",
        staff: &["staff-002"],
        created: (2024, 3, 10),
    },
];

struct FixtureInstallment {
    title: &'static str,
    share: f64,
    status: InstallmentStatus,
    due: (i32, u32, u32),
    paid: Option<(i32, u32, u32)>,
}

const SCHEDULE: [FixtureInstallment; 5] = [
    FixtureInstallment {
        title: "Down Payment (10%)",
        share: 0.10,
        status: InstallmentStatus::Paid,
        due: (2024, 1, 20),
        paid: Some((2024, 1, 18)),
    },
    FixtureInstallment {
        title: "Foundation Complete (20%)",
        share: 0.20,
        status: InstallmentStatus::Paid,
        due: (2024, 3, 1),
        paid: Some((2024, 2, 28)),
    },
    FixtureInstallment {
        title: "Structure Complete (30%)",
        share: 0.30,
        status: InstallmentStatus::ReadyToPay,
        due: (2024, 5, 15),
        paid: None,
    },
    FixtureInstallment {
        title: "Interior Work (25%)",
        share: 0.25,
        status: InstallmentStatus::Pending,
        due: (2024, 7, 1),
        paid: None,
    },
    FixtureInstallment {
        title: "Final Payment (15%)",
        share: 0.15,
        status: InstallmentStatus::Pending,
        due: (2024, 9, 1),
        paid: None,
    },
];

struct FixtureRequest {
    title: &'static str,
    detail: &'static str,
    kind: ChangeRequestType,
    price_impact: f64,
    status: ChangeRequestStatus,
    created: (i32, u32, u32),
}

const REQUESTS: [FixtureRequest; 4] = [
    FixtureRequest {
        title: "Change floor tiles to premium marble",
        detail: "Upgrade from standard ceramic tiles to Italian marble for the living room and kitchen.",
        kind: ChangeRequestType::AddOrder,
        price_impact: 250_000.0,
        status: ChangeRequestStatus::Approved,
        created: (2024, 3, 5),
    },
    FixtureRequest {
        title: "Remove guest bedroom balcony",
        detail: "Drop the balcony from the second bedroom to increase interior space.",
        kind: ChangeRequestType::DeductOrder,
        price_impact: 80_000.0,
        status: ChangeRequestStatus::Approved,
        created: (2024, 3, 12),
    },
    FixtureRequest {
        title: "Note: Parking space orientation",
        detail: "Make sure the parking area faces north to avoid direct afternoon sun.",
        kind: ChangeRequestType::Memo,
        price_impact: 0.0,
        status: ChangeRequestStatus::Draft,
        created: (2024, 4, 1),
    },
    FixtureRequest {
        title: "Add smart home system",
        detail: "Lighting, AC control and security cameras on one automation system.",
        kind: ChangeRequestType::AddOrder,
        price_impact: 450_000.0,
        status: ChangeRequestStatus::Draft,
        created: (2024, 4, 15),
    },
];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub projects: usize,
    pub installments: usize,
    pub change_requests: usize,
}

fn date((year, month, day): (i32, u32, u32)) -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .ok_or_else(|| AppError::Internal(format!("Invalid fixture date {year}-{month}-{day}")))
}

/// Writes the fixture set. Users are upserted; projects are added anew on
/// every run.
pub async fn seed(pool: &SqlitePool, password: &str) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();
    let password_hash = hash_password(password)?;

    tracing::info!("Adding users");
    for user in &USERS {
        sqlx::query(
            "INSERT INTO accounts (id, email, display_name, password_hash, created_at) VALUES (?, ?, ?, ?, ?) ON CONFLICT (id) DO NOTHING",
        )
        .bind(user.id)
        .bind(user.email)
        .bind(user.full_name)
        .bind(&password_hash)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, email, full_name, role, avatar_url, created_at)
            VALUES (?, ?, ?, ?, NULL, ?)
            ON CONFLICT (id) DO UPDATE SET
                email = excluded.email,
                full_name = excluded.full_name,
                role = excluded.role
            "#,
        )
        .bind(user.id)
        .bind(user.email)
        .bind(user.full_name)
        .bind(user.role)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        summary.users += 1;
        tracing::info!(user = user.full_name, role = user.role.as_str(), "Added user");
    }

    tracing::info!("Adding projects");
    for fixture in &PROJECTS {
        let project = ProjectRegistry::insert(
            pool,
            &NewProject {
                project_name: fixture.name.to_string(),
                project_code: fixture.code.to_string(),
                location: fixture.location.to_string(),
                total_price: fixture.total_price,
            },
            date(fixture.created)?,
        )
        .await?;

        sqlx::query("UPDATE projects SET owner_id = ? WHERE id = ?")
            .bind(fixture.owner_id)
            .bind(&project.id)
            .execute(pool)
            .await?;
        for staff_id in fixture.staff {
            ProjectRegistry::insert_staff(pool, &project.id, staff_id).await?;
        }
        summary.projects += 1;
        tracing::info!(project = fixture.name, code = fixture.code, "Added project");

        for (index, step) in SCHEDULE.iter().enumerate() {
            let paid_at = step.paid.map(date).transpose()?;
            let slip_url = paid_at.map(|_| {
                format!(
                    "https://via.placeholder.com/400x600?text=Payment+Slip+{}",
                    index + 1
                )
            });

            sqlx::query(
                "INSERT INTO installments (id, project_id, sequence, title, amount, status, due_date, slip_url, paid_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&project.id)
            .bind(index as i64 + 1)
            .bind(step.title)
            .bind(fixture.total_price * step.share)
            .bind(step.status)
            .bind(date(step.due)?)
            .bind(slip_url)
            .bind(paid_at)
            .execute(pool)
            .await?;
            summary.installments += 1;
        }
        tracing::info!(count = SCHEDULE.len(), "Added installments");

        for request in &REQUESTS {
            ChangeRequestLog::append(
                pool,
                &project.id,
                fixture.owner_id,
                &NewChangeRequest {
                    title: request.title.to_string(),
                    detail: request.detail.to_string(),
                    kind: request.kind,
                    price_impact: request.price_impact,
                },
                request.status,
                date(request.created)?,
            )
            .await?;
            summary.change_requests += 1;
        }
        tracing::info!(count = REQUESTS.len(), "Added change requests");
    }

    Ok(summary)
}
