//! End-to-end tests through the router
//!
//! These need PostgreSQL (`DATABASE_URL`) and skip without it.

mod common;

use axum::http::{Method, StatusCode};
use common::{result_ids, unique_email, TestContext, TEST_PASSWORD};
use serde_json::json;

macro_rules! context {
    () => {
        match TestContext::try_new().await {
            Some(ctx) => ctx,
            None => return,
        }
    };
}

#[tokio::test]
async fn test_health_is_public() {
    let ctx = context!();

    let (status, body) = ctx.send(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = context!();

    for uri in [
        "/projects",
        "/tasks",
        "/comments",
        "/teams",
        "/notifications",
        "/notifications/unread_count",
        "/users/profile",
        "/users/dashboard_stats",
    ] {
        let (status, body) = ctx.send(Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} without token", uri);
        assert_eq!(body["error"], "unauthorized");
    }

    let (status, _) = ctx
        .send(Method::GET, "/projects", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_login_and_duplicate_email() {
    let ctx = context!();
    let email = unique_email("dana");

    let register = json!({ "email": email, "password": TEST_PASSWORD, "name": "Dana" });

    let (status, body) = ctx
        .send(Method::POST, "/auth/register", None, Some(register.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["token"].is_string());
    assert!(body["user"].get("password_hash").is_none());

    let (status, body) = ctx
        .send(Method::POST, "/auth/register", None, Some(register))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "email");

    let (status, body) = ctx
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": email, "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, profile) = ctx
        .send(Method::GET, "/users/profile", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], email.as_str());

    let (status, _) = ctx
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": email, "password": "Wrong-pass1!" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_unknown_email_matches_wrong_password() {
    let ctx = context!();
    let known = ctx.register("Known").await;

    let (wrong_status, wrong_body) = ctx
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": known.email, "password": "Wrong-pass1!" })),
        )
        .await;

    let (unknown_status, unknown_body) = ctx
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": unique_email("nobody"), "password": "Wrong-pass1!" })),
        )
        .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn test_refresh_issues_access_token() {
    let ctx = context!();
    let email = unique_email("rory");

    let (_, body) = ctx
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": email, "password": TEST_PASSWORD, "name": "Rory" })),
        )
        .await;
    let refresh_token = body["refresh_token"].as_str().unwrap().to_string();
    let access_token = body["token"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .send(
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh_token })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .send(Method::GET, "/projects", body["token"].as_str(), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    // An access token is not accepted as a refresh token
    let (status, _) = ctx
        .send(
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": access_token })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // And a refresh token is not accepted as a bearer token
    let (status, _) = ctx
        .send(Method::GET, "/projects", Some(&refresh_token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_projects_are_private_to_owner() {
    let ctx = context!();
    let owner = ctx.register("Owner").await;
    let other = ctx.register("Other").await;

    let project_id = ctx.create_project(&owner, "Launch").await;

    let (_, page) = ctx.get("/projects", &owner).await;
    assert_eq!(result_ids(&page), vec![project_id.clone()]);
    assert_eq!(page["count"], 1);

    let (_, page) = ctx.get("/projects", &other).await;
    assert!(result_ids(&page).is_empty());

    let uri = format!("/projects/{}", project_id);

    let (status, body) = ctx.get(&uri, &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], owner.id.to_string());

    let (status, _) = ctx.get(&uri, &other).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx.patch(&uri, &other, json!({ "title": "Mine" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.delete(&uri, &other).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.delete(&uri, &owner).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx.get(&uri, &owner).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_project_date_order_rejected() {
    let ctx = context!();
    let owner = ctx.register("Planner").await;

    let (status, body) = ctx
        .post(
            "/projects",
            &owner,
            json!({ "title": "Late", "start_date": "2025-05-01", "end_date": "2025-04-01" }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "end_date");
}

#[tokio::test]
async fn test_task_visible_to_owner_and_assignee_only() {
    let ctx = context!();
    let owner = ctx.register("Owner").await;
    let assignee = ctx.register("Assignee").await;
    let stranger = ctx.register("Stranger").await;

    let project_id = ctx.create_project(&owner, "Backend").await;
    let task = ctx
        .create_task(&owner, &project_id, json!({ "assigned_to": assignee.id }))
        .await;
    let uri = format!("/tasks/{}", task["id"].as_str().unwrap());

    assert_eq!(task["assigned_to"]["id"], assignee.id.to_string());
    assert_eq!(task["project"]["user"]["id"], owner.id.to_string());

    let (status, _) = ctx.get(&uri, &owner).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx.get(&uri, &assignee).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx.get(&uri, &stranger).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, page) = ctx.get("/tasks", &assignee).await;
    assert_eq!(page["count"], 1);

    let (_, page) = ctx.get("/tasks", &stranger).await;
    assert_eq!(page["count"], 0);

    // The assignee may update but not delete
    let (status, body) = ctx
        .patch(&uri, &assignee, json!({ "status": "in_progress" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "in_progress");

    let (status, _) = ctx.delete(&uri, &assignee).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.delete(&uri, &owner).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_task_defaults_to_requester_as_assignee() {
    let ctx = context!();
    let owner = ctx.register("Solo").await;
    let project_id = ctx.create_project(&owner, "Chores").await;

    let task = ctx.create_task(&owner, &project_id, json!({})).await;

    assert_eq!(task["assigned_to"]["id"], owner.id.to_string());
    assert_eq!(task["status"], "not_started");
    assert_eq!(task["priority"], "medium");
}

#[tokio::test]
async fn test_task_in_foreign_project_rejected() {
    let ctx = context!();
    let owner = ctx.register("Owner").await;
    let intruder = ctx.register("Intruder").await;
    let project_id = ctx.create_project(&owner, "Private").await;

    let (status, _) = ctx
        .post("/tasks", &intruder, json!({ "project_id": project_id, "title": "Sneaky" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_assignment_notifies_assignee() {
    let ctx = context!();
    let owner = ctx.register("Lead").await;
    let assignee = ctx.register("Dev").await;
    let project_id = ctx.create_project(&owner, "Sprint").await;

    ctx.create_task(
        &owner,
        &project_id,
        json!({ "title": "Fix login", "assigned_to": assignee.id }),
    )
    .await;

    let (_, body) = ctx.get("/notifications/unread_count", &assignee).await;
    assert_eq!(body["unread_count"], 1);

    let (_, page) = ctx.get("/notifications", &assignee).await;
    assert_eq!(
        page["results"][0]["message"],
        "You have been assigned to task \"Fix login\""
    );

    // Self-assignment is silent
    let (_, body) = ctx.get("/notifications/unread_count", &owner).await;
    assert_eq!(body["unread_count"], 0);
}

#[tokio::test]
async fn test_dashboard_counts_tasks_once() {
    let ctx = context!();
    let alice = ctx.register("Alice").await;
    let bob = ctx.register("Bob").await;

    let alice_project = ctx.create_project(&alice, "Alice's").await;
    let bob_project = ctx.create_project(&bob, "Bob's").await;

    // Owned and assigned to herself: counted once
    ctx.create_task(&alice, &alice_project, json!({})).await;
    // Owned, assigned to Bob
    ctx.create_task(&alice, &alice_project, json!({ "assigned_to": bob.id, "status": "completed" }))
        .await;
    // Bob's project, assigned to Alice
    ctx.create_task(&bob, &bob_project, json!({ "assigned_to": alice.id }))
        .await;
    // Bob's project, Bob's task: not Alice's business
    ctx.create_task(&bob, &bob_project, json!({})).await;

    let (status, stats) = ctx.get("/users/dashboard_stats", &alice).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_projects"], 1);
    assert_eq!(stats["total_tasks"], 3);
    assert_eq!(stats["pending_tasks"], 2);
    assert_eq!(stats["unread_notifications"], 1);
    assert_eq!(stats["recent_notifications"].as_array().unwrap().len(), 1);

    let (_, page) = ctx.get("/tasks", &alice).await;
    assert_eq!(page["count"], stats["total_tasks"]);

    let (_, stats) = ctx.get("/users/dashboard_stats", &bob).await;
    assert_eq!(stats["total_tasks"], 3);
}

#[tokio::test]
async fn test_dashboard_team_members_distinct() {
    let ctx = context!();
    let alice = ctx.register("Alice").await;
    let bob = ctx.register("Bob").await;

    for name in ["Core", "Web"] {
        let (_, team) = ctx.post("/teams", &alice, json!({ "name": name })).await;
        let uri = format!("/teams/{}/add_member", team["id"].as_str().unwrap());
        let (status, _) = ctx.post(&uri, &alice, json!({ "user_id": bob.id })).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, stats) = ctx.get("/users/dashboard_stats", &alice).await;
    assert_eq!(stats["total_team_members"], 2);
}

#[tokio::test]
async fn test_mark_as_read_is_idempotent() {
    let ctx = context!();
    let user = ctx.register("Reader").await;

    let (status, created) = ctx
        .post("/notifications", &user, json!({ "message": "Standup at 10" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["read"], false);
    assert_eq!(created["user"]["id"], user.id.to_string());

    let uri = format!(
        "/notifications/{}/mark_as_read",
        created["id"].as_str().unwrap()
    );

    for _ in 0..2 {
        let (status, body) = ctx.post(&uri, &user, json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["read"], true);
    }

    let (_, body) = ctx.get("/notifications/unread_count", &user).await;
    assert_eq!(body["unread_count"], 0);
}

#[tokio::test]
async fn test_notification_created_already_read() {
    let ctx = context!();
    let user = ctx.register("Archivist").await;

    let (status, created) = ctx
        .post(
            "/notifications",
            &user,
            json!({ "message": "Backfilled entry", "read": true }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["read"], true);

    let (_, body) = ctx.get("/notifications/unread_count", &user).await;
    assert_eq!(body["unread_count"], 0);
}

#[tokio::test]
async fn test_notifications_private_and_mark_all() {
    let ctx = context!();
    let user = ctx.register("Reader").await;
    let other = ctx.register("Snoop").await;

    let mut ids = Vec::new();
    for message in ["one", "two", "three"] {
        let (_, body) = ctx
            .post("/notifications", &user, json!({ "message": message }))
            .await;
        ids.push(body["id"].as_str().unwrap().to_string());
    }

    let (status, _) = ctx
        .get(&format!("/notifications/{}", ids[0]), &other)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .post(&format!("/notifications/{}/mark_as_read", ids[0]), &other, json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = ctx
        .post("/notifications/mark_all_as_read", &user, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 3);

    let (_, body) = ctx.get("/notifications/unread_count", &user).await;
    assert_eq!(body["unread_count"], 0);
}

#[tokio::test]
async fn test_add_unknown_member_leaves_team_unchanged() {
    let ctx = context!();
    let creator = ctx.register("Creator").await;

    let (status, team) = ctx
        .post("/teams", &creator, json!({ "name": "Platform" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(team["members"].as_array().unwrap().len(), 1);

    let team_uri = format!("/teams/{}", team["id"].as_str().unwrap());

    let (status, _) = ctx
        .post(
            &format!("{}/add_member", team_uri),
            &creator,
            json!({ "user_id": uuid::Uuid::new_v4() }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, team) = ctx.get(&team_uri, &creator).await;
    assert_eq!(team["members"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_team_membership_lifecycle() {
    let ctx = context!();
    let creator = ctx.register("Creator").await;
    let member = ctx.register("Member").await;
    let outsider = ctx.register("Outsider").await;

    let (_, team) = ctx.post("/teams", &creator, json!({ "name": "Mobile" })).await;
    let team_uri = format!("/teams/{}", team["id"].as_str().unwrap());
    let add_uri = format!("{}/add_member", team_uri);
    let remove_uri = format!("{}/remove_member", team_uri);

    let (status, _) = ctx.get(&team_uri, &outsider).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = ctx.post(&add_uri, &creator, json!({ "user_id": member.id })).await;
    assert_eq!(body["members"].as_array().unwrap().len(), 2);

    // Adding again is a no-op
    let (status, body) = ctx.post(&add_uri, &creator, json!({ "user_id": member.id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["members"].as_array().unwrap().len(), 2);

    let (_, body) = ctx.get("/notifications/unread_count", &member).await;
    assert_eq!(body["unread_count"], 1);

    // Members can read and edit but not delete or remove people
    let (status, _) = ctx.get(&team_uri, &member).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx
        .patch(&team_uri, &member, json!({ "description": "Apps" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "Apps");

    let (status, _) = ctx.post(&remove_uri, &member, json!({ "user_id": member.id })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.delete(&team_uri, &member).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.post(&remove_uri, &creator, json!({ "user_id": creator.id })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = ctx.post(&remove_uri, &creator, json!({ "user_id": member.id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["members"].as_array().unwrap().len(), 1);

    let (status, _) = ctx.get(&team_uri, &member).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx.delete(&team_uri, &creator).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_comment_permissions() {
    let ctx = context!();
    let owner = ctx.register("Owner").await;
    let assignee = ctx.register("Assignee").await;

    let project_id = ctx.create_project(&owner, "Docs").await;
    let task = ctx
        .create_task(&owner, &project_id, json!({ "assigned_to": assignee.id }))
        .await;
    let task_id = task["id"].as_str().unwrap();

    // Only the project owner may comment
    let (status, body) = ctx
        .post("/comments", &assignee, json!({ "task_id": task_id, "content": "Me too" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not allowed to create this comment");

    let (status, comment) = ctx
        .post(
            &format!("/tasks/{}/comments", task_id),
            &owner,
            json!({ "content": "Please add examples" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["task"], task_id);
    assert_eq!(comment["user"]["id"], owner.id.to_string());

    let comment_uri = format!("/comments/{}", comment["id"].as_str().unwrap());

    let (status, _) = ctx.get(&comment_uri, &assignee).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, page) = ctx
        .get(&format!("/comments?task_id={}", task_id), &owner)
        .await;
    assert_eq!(page["count"], 1);

    let (status, body) = ctx
        .patch(&comment_uri, &owner, json!({ "content": "Please add two examples" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Please add two examples");

    let (status, _) = ctx.delete(&comment_uri, &owner).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_profile_update_clears_with_null() {
    let ctx = context!();
    let user = ctx.register("Profiled").await;

    let (status, body) = ctx
        .patch(
            "/users/update_profile",
            &user,
            json!({ "bio": "Writes Rust", "location": "Porto" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], "Writes Rust");

    let (_, body) = ctx
        .patch("/users/update_profile", &user, json!({ "bio": null }))
        .await;
    assert!(body["bio"].is_null());
    assert_eq!(body["location"], "Porto");
}

#[tokio::test]
async fn test_pagination_envelope() {
    let ctx = context!();
    let owner = ctx.register("Prolific").await;

    for title in ["a", "b", "c"] {
        ctx.create_project(&owner, title).await;
    }

    let (_, page) = ctx.get("/projects?limit=2&offset=1", &owner).await;
    assert_eq!(page["count"], 3);
    assert_eq!(page["limit"], 2);
    assert_eq!(page["offset"], 1);
    assert_eq!(result_ids(&page).len(), 2);
}
