mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{hierarchy, member_body, wereda_body, TestApp};

#[tokio::test]
async fn wereda_admin_cannot_read_parishes_of_another_unit() -> Result<()> {
    let app = TestApp::new();
    let a = hierarchy(&app, "A").await?;
    let b = hierarchy(&app, "B").await?;
    let scoped = app.wereda_admin_token(&a.wereda).await?;

    let res = app.get(&format!("/parishes/{}", b.parish), &scoped).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.code(), "FORBIDDEN");

    let res = app.get(&format!("/parishes?under={}", b.wereda), &scoped).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.get(&format!("/parishes/by-wereda/{}", b.wereda), &scoped).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let own = app.get(&format!("/parishes/{}", a.parish), &scoped).await?;
    assert_eq!(own.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn parish_listing_is_forced_to_own_unit() -> Result<()> {
    let app = TestApp::new();
    let a = hierarchy(&app, "A").await?;
    let b = hierarchy(&app, "B").await?;
    app.create_parish(&a.admin, "Parish A2", &a.wereda).await?;
    let scoped = app.wereda_admin_token(&a.wereda).await?;

    let res = app.get("/parishes", &scoped).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["pagination"]["total"], 2);
    let names: Vec<_> = res.data()["parishes"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|p| p["name"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, vec!["Parish A", "Parish A2"]);

    let all = app.get("/parishes", &b.admin).await?;
    assert_eq!(all.data()["pagination"]["total"], 3);
    Ok(())
}

#[tokio::test]
async fn by_wereda_distinguishes_bad_forbidden_and_missing() -> Result<()> {
    let app = TestApp::new();
    let a = hierarchy(&app, "A").await?;

    let res = app.get("/parishes/by-wereda/not-an-id", &a.admin).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.get(&format!("/parishes/by-wereda/{}", uuid::Uuid::new_v4()), &a.admin).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.get(&format!("/parishes/by-wereda/{}", a.wereda), &a.admin).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data().as_array().map(|a| a.len()), Some(1));
    Ok(())
}

#[tokio::test]
async fn admin_only_entities_refuse_wereda_admins() -> Result<()> {
    let app = TestApp::new();
    let a = hierarchy(&app, "A").await?;
    let scoped = app.wereda_admin_token(&a.wereda).await?;

    let res = app.post("/wereda-units", &scoped, wereda_body("Another")).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = app.get("/wereda-units", &scoped).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = app.get("/marriages", &scoped).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = app
        .patch(&format!("/parishes/{}", a.parish), &scoped, json!({ "name": "Renamed" }))
        .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn members_stay_inside_the_unit() -> Result<()> {
    let app = TestApp::new();
    let a = hierarchy(&app, "A").await?;
    let b = hierarchy(&app, "B").await?;
    let scoped = app.wereda_admin_token(&a.wereda).await?;

    let res = app.post("/members", &scoped, member_body("Abebe", "Male", &b.parish)).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let mut no_parish = member_body("Abebe", "Male", &a.parish);
    no_parish["parish"] = json!(null);
    let res = app.post("/members", &scoped, no_parish).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let own = app.create_member(&scoped, member_body("Abebe", "Male", &a.parish)).await?;
    let foreign = app.create_member(&b.admin, member_body("Bekele", "Male", &b.parish)).await?;

    let res = app.get(&format!("/members/{}", foreign), &scoped).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .patch(&format!("/members/{}", own), &scoped, json!({ "parish": b.parish }))
        .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.get(&format!("/members?parish={}", b.parish), &scoped).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.get("/members", &scoped).await?;
    assert_eq!(res.data()["pagination"]["total"], 1);
    assert_eq!(res.data()["members"][0]["id"], own.as_str());

    let stats = app.get("/members/statistics", &scoped).await?;
    assert_eq!(stats.data()["total"], 1);
    Ok(())
}

#[tokio::test]
async fn records_follow_member_and_parish_scope() -> Result<()> {
    let app = TestApp::new();
    let a = hierarchy(&app, "A").await?;
    let b = hierarchy(&app, "B").await?;
    let scoped = app.wereda_admin_token(&a.wereda).await?;

    let own = app.create_member(&a.admin, member_body("Abebe", "Male", &a.parish)).await?;
    let foreign = app.create_member(&b.admin, member_body("Bekele", "Male", &b.parish)).await?;

    let res = app
        .post("/deaths", &scoped, json!({ "member": foreign, "dateOfDeath": "2020-01-01" }))
        .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .post(
            "/baptisms",
            &scoped,
            json!({ "member": own, "baptismDate": "1990-06-01", "parish": b.parish, "parentContact": { "name": "Almaz" } }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let baptism = app
        .post(
            "/baptisms",
            &scoped,
            json!({ "member": own, "baptismDate": "1990-06-01", "parish": a.parish, "parentContact": { "name": "Almaz" } }),
        )
        .await?;
    assert_eq!(baptism.status, StatusCode::CREATED);

    let res = app
        .patch(&format!("/baptisms/{}", baptism.id()), &scoped, json!({ "parish": b.parish }))
        .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let foreign_death = app
        .post("/deaths", &b.admin, json!({ "member": foreign, "dateOfDeath": "2020-01-01" }))
        .await?;
    let own_death = app
        .post("/deaths", &scoped, json!({ "member": own, "dateOfDeath": "2020-01-01" }))
        .await?;
    assert_eq!(own_death.status, StatusCode::CREATED);

    let res = app.get("/deaths", &scoped).await?;
    assert_eq!(res.data()["pagination"]["total"], 1);
    let res = app.get(&format!("/deaths/{}", foreign_death.id()), &scoped).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = app.delete(&format!("/deaths/{}", foreign_death.id()), &scoped).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = app.get(&format!("/deaths?member={}", foreign), &scoped).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    Ok(())
}
