//! Role-scoped project registry: listing, creation, detail and staff.

mod common;

use axum::http::StatusCode;
use common::{assign_staff, body_json, build_test_app, insert_project, session, set_owner};
use homebuild_server::{
    db::models::{ProjectStatus, Role},
    error::AppError,
    services::{
        profiles::{NewProfile, ProfileStore},
        projects::{NewProject, ProjectRegistry, MAX_ASSIGNED_STAFF},
    },
};
use serde_json::json;
use sqlx::SqlitePool;

fn names(json: &serde_json::Value) -> Vec<String> {
    json["projects"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["projectName"].as_str().unwrap().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn admin_lists_every_project_newest_first(pool: SqlitePool) {
    insert_project(&pool, "Loft", 15).await;
    insert_project(&pool, "Villa", 20).await;
    insert_project(&pool, "Townhouse", 10).await;
    let app = build_test_app(pool);
    let (_, token) = app.sign_up("admin", Some(Role::Admin)).await;

    let response = app.get("/api/projects", &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(names(&json), ["Villa", "Loft", "Townhouse"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn staff_list_only_assigned_projects(pool: SqlitePool) {
    let loft = insert_project(&pool, "Loft", 15).await;
    let villa = insert_project(&pool, "Villa", 20).await;
    let town = insert_project(&pool, "Townhouse", 10).await;
    let app = build_test_app(pool.clone());
    let (staff_id, token) = app.sign_up("somchai", Some(Role::Staff)).await;
    let (other_id, _) = app.sign_up("nattaya", Some(Role::Staff)).await;

    assign_staff(&pool, &loft.id, &staff_id).await;
    assign_staff(&pool, &town.id, &staff_id).await;
    assign_staff(&pool, &villa.id, &other_id).await;

    let json = body_json(app.get("/api/projects", &token).await).await;

    assert_eq!(names(&json), ["Loft", "Townhouse"]);
    for project in json["projects"].as_array().unwrap() {
        let staff = project["assignedStaffIds"].as_array().unwrap();
        assert!(staff.iter().any(|id| id == staff_id.as_str()));
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn clients_list_only_owned_projects(pool: SqlitePool) {
    let loft = insert_project(&pool, "Loft", 15).await;
    let villa = insert_project(&pool, "Villa", 20).await;
    insert_project(&pool, "Unowned", 25).await;
    let app = build_test_app(pool.clone());
    let (client_id, token) = app.sign_up("anan", Some(Role::Client)).await;

    set_owner(&pool, &loft.id, &client_id).await;
    set_owner(&pool, &villa.id, "someone-else").await;

    let json = body_json(app.get("/api/projects", &token).await).await;

    assert_eq!(names(&json), ["Loft"]);
    assert_eq!(json["projects"][0]["ownerId"], client_id);
}

#[sqlx::test(migrations = "./migrations")]
async fn users_without_profile_see_nothing(pool: SqlitePool) {
    insert_project(&pool, "Loft", 15).await;
    let app = build_test_app(pool);
    let (_, token) = app.sign_up("newcomer", None).await;

    let response = app.get("/api/projects", &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["projects"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn listing_requires_a_session(pool: SqlitePool) {
    let app = build_test_app(pool);

    let response = app.get("/api/projects", "not-a-token").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn created_project_is_active_unowned_and_listed(pool: SqlitePool) {
    let app = build_test_app(pool);
    let (_, token) = app.sign_up("admin", Some(Role::Admin)).await;

    let response = app
        .post_json(
            "/api/projects",
            Some(&token),
            json!({
                "projectName": "Modern Loft House",
                "projectCode": "HBP-2024-001",
                "location": "Sukhumvit 101, Bangkok",
                "totalPrice": 8500000
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();

    let json = body_json(app.get("/api/projects", &token).await).await;
    let listed = json["projects"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == id.as_str())
        .expect("new project is listed");

    assert_eq!(listed["status"], "active");
    assert_eq!(listed["ownerId"], "");
    assert_eq!(listed["assignedStaffIds"], json!([]));
    assert_eq!(listed["totalPrice"], 8500000.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn only_admins_create_projects(pool: SqlitePool) {
    let app = build_test_app(pool);
    let (_, token) = app.sign_up("somchai", Some(Role::Staff)).await;

    let response = app
        .post_json(
            "/api/projects",
            Some(&token),
            json!({
                "projectName": "Side Project",
                "projectCode": "X",
                "location": "Nowhere",
                "totalPrice": 1
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn project_name_is_required(pool: SqlitePool) {
    let admin = session("admin", Some(Role::Admin));
    let err = ProjectRegistry::create(
        &pool,
        &admin,
        &NewProject {
            project_name: "   ".to_string(),
            project_code: "HBP".to_string(),
            location: "Bangkok".to_string(),
            total_price: 10.0,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn registry_round_trip_through_services(pool: SqlitePool) {
    let admin = session("admin", Some(Role::Admin));
    let project = ProjectRegistry::create(
        &pool,
        &admin,
        &NewProject {
            project_name: "Cozy Townhouse".to_string(),
            project_code: "HBP-2024-003".to_string(),
            location: "Chiang Mai".to_string(),
            total_price: 4_500_000.0,
        },
    )
    .await
    .unwrap();

    let listed = ProjectRegistry::list(&pool, &admin).await.unwrap();

    let found = listed.iter().find(|p| p.id == project.id).unwrap();
    assert_eq!(found.status, ProjectStatus::Active);
    assert!(found.owner_id.is_empty());
    assert!(found.assigned_staff_ids.is_empty());
}

// ---------------------------------------------------------------------------
// Detail and staff management
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn detail_bundles_ledger_log_and_staff(pool: SqlitePool) {
    let project = insert_project(&pool, "Loft", 15).await;
    let app = build_test_app(pool.clone());
    let (staff_id, staff_token) = app.sign_up("somchai", Some(Role::Staff)).await;
    assign_staff(&pool, &project.id, &staff_id).await;

    let response = app
        .get(&format!("/api/projects/{}", project.id), &staff_token)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["project"]["id"], project.id.as_str());
    assert_eq!(json["installments"], json!([]));
    assert_eq!(json["changeRequests"], json!([]));
    assert_eq!(json["assignedStaff"][0]["id"], staff_id.as_str());
    assert_eq!(json["assignedStaff"][0]["role"], "staff");
}

#[sqlx::test(migrations = "./migrations")]
async fn detail_outside_scope_is_not_found(pool: SqlitePool) {
    let project = insert_project(&pool, "Loft", 15).await;
    let app = build_test_app(pool);
    let (_, token) = app.sign_up("anan", Some(Role::Client)).await;

    let response = app
        .get(&format!("/api/projects/{}", project.id), &token)
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn admin_adds_and_removes_staff_by_email(pool: SqlitePool) {
    let project = insert_project(&pool, "Loft", 15).await;
    let app = build_test_app(pool);
    let (_, admin_token) = app.sign_up("admin", Some(Role::Admin)).await;
    let (staff_id, _) = app.sign_up("somchai", Some(Role::Staff)).await;
    let uri = format!("/api/projects/{}/staff", project.id);

    let first = app
        .post_json(&uri, Some(&admin_token), json!({ "email": "somchai@homebuild.test" }))
        .await;
    assert_eq!(first.status(), StatusCode::OK);
    let again = app
        .post_json(&uri, Some(&admin_token), json!({ "email": "somchai@homebuild.test" }))
        .await;
    let json = body_json(again).await;
    assert_eq!(json["assignedStaffIds"], json!([staff_id.clone()]));

    let removed = app
        .delete(&format!("{uri}/{staff_id}"), &admin_token)
        .await;
    assert_eq!(removed.status(), StatusCode::OK);
    let json = body_json(removed).await;
    assert_eq!(json["assignedStaffIds"], json!([]));
}

#[sqlx::test(migrations = "./migrations")]
async fn adding_unknown_or_non_staff_email_fails(pool: SqlitePool) {
    let project = insert_project(&pool, "Loft", 15).await;
    let app = build_test_app(pool);
    let (_, admin_token) = app.sign_up("admin", Some(Role::Admin)).await;
    app.sign_up("anan", Some(Role::Client)).await;
    let uri = format!("/api/projects/{}/staff", project.id);

    let unknown = app
        .post_json(&uri, Some(&admin_token), json!({ "email": "ghost@homebuild.test" }))
        .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let client = app
        .post_json(&uri, Some(&admin_token), json!({ "email": "anan@homebuild.test" }))
        .await;
    assert_eq!(client.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn staff_cannot_manage_staff(pool: SqlitePool) {
    let project = insert_project(&pool, "Loft", 15).await;
    let app = build_test_app(pool.clone());
    let (staff_id, staff_token) = app.sign_up("somchai", Some(Role::Staff)).await;
    assign_staff(&pool, &project.id, &staff_id).await;

    let response = app
        .delete(
            &format!("/api/projects/{}/staff/{staff_id}", project.id),
            &staff_token,
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn staff_assignment_stops_at_the_cap(pool: SqlitePool) {
    let project = insert_project(&pool, "Loft", 15).await;
    for n in 0..=MAX_ASSIGNED_STAFF {
        ProfileStore::insert(
            &pool,
            &NewProfile {
                id: format!("staff-{n}"),
                email: format!("staff{n}@homebuild.test"),
                full_name: format!("Staff {n}"),
                role: Role::Staff,
                avatar_url: None,
            },
        )
        .await
        .unwrap();
    }
    for n in 0..MAX_ASSIGNED_STAFF {
        assign_staff(&pool, &project.id, &format!("staff-{n}")).await;
    }
    let app = build_test_app(pool);
    let (_, admin_token) = app.sign_up("admin", Some(Role::Admin)).await;
    let uri = format!("/api/projects/{}/staff", project.id);

    let over = app
        .post_json(
            &uri,
            Some(&admin_token),
            json!({ "email": format!("staff{MAX_ASSIGNED_STAFF}@homebuild.test") }),
        )
        .await;
    assert_eq!(over.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(over).await["code"], "VALIDATION_ERROR");

    // Re-adding someone already on the project is still accepted at the cap.
    let last = MAX_ASSIGNED_STAFF - 1;
    let again = app
        .post_json(
            &uri,
            Some(&admin_token),
            json!({ "email": format!("staff{last}@homebuild.test") }),
        )
        .await;
    assert_eq!(again.status(), StatusCode::OK);
    let json = body_json(again).await;
    assert_eq!(
        json["assignedStaffIds"].as_array().unwrap().len(),
        MAX_ASSIGNED_STAFF
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn project_status_is_constrained(pool: SqlitePool) {
    let project = insert_project(&pool, "Loft", 15).await;

    let result = sqlx::query("UPDATE projects SET status = 'archived' WHERE id = ?")
        .bind(&project.id)
        .execute(&pool)
        .await;
    assert!(result.is_err());

    sqlx::query("UPDATE projects SET status = 'on_hold' WHERE id = ?")
        .bind(&project.id)
        .execute(&pool)
        .await
        .unwrap();
    let stored = ProjectRegistry::find(&pool, &project.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ProjectStatus::OnHold);
}
