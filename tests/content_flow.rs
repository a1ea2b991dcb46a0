mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn menu_availability_splits_tenant_and_admin_views() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_account("morador@empresa.com.br", "senha-forte", "tenant", "Morador")
        .await?;
    app.insert_account(
        "admin@boldworkplace.com.br",
        "senha-forte",
        "admin",
        "Admin",
    )
    .await?;

    let tenant = app.login_token("morador@empresa.com.br", "senha-forte").await?;
    let admin = app
        .login_token("admin@boldworkplace.com.br", "senha-forte")
        .await?;

    let created = app
        .post_json(
            "/api/menu",
            &json!({
                "name": "Pão de queijo",
                "price": 8.5,
                "category": "lanches"
            }),
            Some(&admin),
        )
        .await?;
    assert_eq!(created.status(), StatusCode::CREATED);
    let item = body_to_json(created.into_body()).await?;
    let item_id = item["id"].as_str().unwrap().to_string();
    assert_eq!(item["is_available"], true);

    let tenant_menu = app.get("/api/menu", Some(&tenant)).await?;
    let tenant_menu = body_to_json(tenant_menu.into_body()).await?;
    assert_eq!(tenant_menu.as_array().unwrap().len(), 1);

    // Toggling availability removes it from the tenant-facing list but not
    // from the management list.
    let toggled = app
        .patch_json(
            &format!("/api/menu/{item_id}"),
            &json!({ "is_available": false }),
            Some(&admin),
        )
        .await?;
    assert_eq!(toggled.status(), StatusCode::OK);

    let tenant_menu = app.get("/api/menu", Some(&tenant)).await?;
    let tenant_menu = body_to_json(tenant_menu.into_body()).await?;
    assert!(tenant_menu.as_array().unwrap().is_empty());

    let admin_menu = app.get("/api/menu", Some(&admin)).await?;
    let admin_menu = body_to_json(admin_menu.into_body()).await?;
    assert_eq!(admin_menu.as_array().unwrap().len(), 1);
    assert_eq!(admin_menu[0]["is_available"], false);

    // Tenants cannot curate the menu.
    let tenant_create = app
        .post_json(
            "/api/menu",
            &json!({ "name": "Suco", "price": 6.0 }),
            Some(&tenant),
        )
        .await?;
    assert_eq!(tenant_create.status(), StatusCode::FORBIDDEN);

    let negative_price = app
        .post_json(
            "/api/menu",
            &json!({ "name": "Café", "price": -1.0 }),
            Some(&admin),
        )
        .await?;
    assert_eq!(negative_price.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn announcements_follow_active_flag_per_role() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_account("morador@empresa.com.br", "senha-forte", "tenant", "Morador")
        .await?;
    app.insert_account(
        "central@boldworkplace.com.br",
        "senha-forte",
        "central_atendimento",
        "Central",
    )
    .await?;

    let tenant = app.login_token("morador@empresa.com.br", "senha-forte").await?;
    let central = app
        .login_token("central@boldworkplace.com.br", "senha-forte")
        .await?;

    let created = app
        .post_json(
            "/api/announcements",
            &json!({ "title": "Manutenção do elevador", "content": "Sexta, 8h às 12h" }),
            Some(&central),
        )
        .await?;
    assert_eq!(created.status(), StatusCode::CREATED);
    let announcement = body_to_json(created.into_body()).await?;
    let announcement_id = announcement["id"].as_str().unwrap().to_string();

    let tenant_view = app.get("/api/announcements", Some(&tenant)).await?;
    let tenant_view = body_to_json(tenant_view.into_body()).await?;
    assert_eq!(tenant_view.as_array().unwrap().len(), 1);

    let deactivated = app
        .patch_json(
            &format!("/api/announcements/{announcement_id}"),
            &json!({ "is_active": false }),
            Some(&central),
        )
        .await?;
    assert_eq!(deactivated.status(), StatusCode::OK);

    let tenant_view = app.get("/api/announcements", Some(&tenant)).await?;
    let tenant_view = body_to_json(tenant_view.into_body()).await?;
    assert!(tenant_view.as_array().unwrap().is_empty());

    let staff_view = app.get("/api/announcements", Some(&central)).await?;
    let staff_view = body_to_json(staff_view.into_body()).await?;
    assert_eq!(staff_view.as_array().unwrap().len(), 1);
    assert_eq!(staff_view[0]["is_active"], false);

    let tenant_create = app
        .post_json(
            "/api/announcements",
            &json!({ "title": "x", "content": "y" }),
            Some(&tenant),
        )
        .await?;
    assert_eq!(tenant_create.status(), StatusCode::FORBIDDEN);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn template_catalog_rules() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_account("morador@empresa.com.br", "senha-forte", "tenant", "Morador")
        .await?;
    app.insert_account(
        "recepcao@boldworkplace.com.br",
        "senha-forte",
        "recepcao",
        "Recepção",
    )
    .await?;
    app.insert_account(
        "central@boldworkplace.com.br",
        "senha-forte",
        "central_atendimento",
        "Central",
    )
    .await?;

    let tenant = app.login_token("morador@empresa.com.br", "senha-forte").await?;
    let reception = app
        .login_token("recepcao@boldworkplace.com.br", "senha-forte")
        .await?;
    let central = app
        .login_token("central@boldworkplace.com.br", "senha-forte")
        .await?;

    let created = app
        .post_json(
            "/api/templates",
            &json!({ "title": "Boas-vindas", "content": "Bem-vindo ao prédio!" }),
            Some(&central),
        )
        .await?;
    assert_eq!(created.status(), StatusCode::CREATED);

    // Reading is staff-wide; writing stays with content managers.
    let reception_view = app.get("/api/templates", Some(&reception)).await?;
    assert_eq!(reception_view.status(), StatusCode::OK);

    let reception_create = app
        .post_json(
            "/api/templates",
            &json!({ "title": "x", "content": "y" }),
            Some(&reception),
        )
        .await?;
    assert_eq!(reception_create.status(), StatusCode::FORBIDDEN);

    let tenant_view = app.get("/api/templates", Some(&tenant)).await?;
    assert_eq!(tenant_view.status(), StatusCode::FORBIDDEN);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn building_reference_data_is_visible_to_tenants() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_account("morador@empresa.com.br", "senha-forte", "tenant", "Morador")
        .await?;
    let tenant = app.login_token("morador@empresa.com.br", "senha-forte").await?;

    let floors = app.get("/api/floors", Some(&tenant)).await?;
    assert_eq!(floors.status(), StatusCode::OK);

    let rooms = app.get("/api/meeting-rooms", Some(&tenant)).await?;
    assert_eq!(rooms.status(), StatusCode::OK);

    app.cleanup().await?;
    Ok(())
}
