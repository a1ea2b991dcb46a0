mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn notification_response_lifecycle() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let tenant_id = app
        .insert_account("morador@empresa.com.br", "senha-forte", "tenant", "Morador")
        .await?;
    app.insert_account(
        "recepcao@boldworkplace.com.br",
        "senha-forte",
        "recepcao",
        "Recepção",
    )
    .await?;

    let tenant = app.login_token("morador@empresa.com.br", "senha-forte").await?;
    let reception = app
        .login_token("recepcao@boldworkplace.com.br", "senha-forte")
        .await?;

    let sent = app
        .post_json(
            "/api/notifications",
            &json!({
                "recipient_id": tenant_id,
                "custom_content": "Encomenda aguardando na recepção",
                "requires_response": true
            }),
            Some(&reception),
        )
        .await?;
    assert_eq!(sent.status(), StatusCode::CREATED);
    let notification = body_to_json(sent.into_body()).await?;
    let notification_id = notification["id"].as_str().unwrap().to_string();
    assert_eq!(notification["requires_response"], true);
    assert!(notification["response_value"].is_null());

    // The recipient sees it pending a response and unread.
    let inbox = app.get("/api/notifications", Some(&tenant)).await?;
    let inbox = body_to_json(inbox.into_body()).await?;
    let inbox = inbox.as_array().unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["is_read"], false);
    let pending: Vec<_> = inbox
        .iter()
        .filter(|n| n["requires_response"] == true && n["response_value"].is_null())
        .collect();
    assert_eq!(pending.len(), 1);

    // Responding populates the value and empties the pending set.
    let responded = app
        .post_json(
            &format!("/api/notifications/{notification_id}/response"),
            &json!({ "response_value": "Retiro às 18h" }),
            Some(&tenant),
        )
        .await?;
    assert_eq!(responded.status(), StatusCode::OK);
    let responded = body_to_json(responded.into_body()).await?;
    assert_eq!(responded["response_value"], "Retiro às 18h");
    assert!(!responded["responded_at"].is_null());

    let inbox = app.get("/api/notifications", Some(&tenant)).await?;
    let inbox = body_to_json(inbox.into_body()).await?;
    let pending: Vec<_> = inbox
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["requires_response"] == true && n["response_value"].is_null())
        .collect();
    assert!(pending.is_empty());

    // A second response attempt is rejected outright.
    let again = app
        .post_json(
            &format!("/api/notifications/{notification_id}/response"),
            &json!({ "response_value": "Mudei de ideia" }),
            Some(&tenant),
        )
        .await?;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    // Read flag belongs to the recipient.
    let read = app
        .post_json(
            &format!("/api/notifications/{notification_id}/read"),
            &json!({}),
            Some(&tenant),
        )
        .await?;
    assert_eq!(read.status(), StatusCode::NO_CONTENT);

    // The sender side sees the recorded response.
    let history = app.get("/api/notifications", Some(&reception)).await?;
    let history = body_to_json(history.into_body()).await?;
    assert_eq!(history[0]["response_value"], "Retiro às 18h");
    assert_eq!(history[0]["is_read"], true);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn notification_access_rules() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let tenant_id = app
        .insert_account("alvo@empresa.com.br", "senha-forte", "tenant", "Alvo")
        .await?;
    app.insert_account("outro@empresa.com.br", "senha-forte", "tenant", "Outro")
        .await?;
    app.insert_account(
        "recepcao@boldworkplace.com.br",
        "senha-forte",
        "recepcao",
        "Recepção",
    )
    .await?;

    let target = app.login_token("alvo@empresa.com.br", "senha-forte").await?;
    let other = app.login_token("outro@empresa.com.br", "senha-forte").await?;
    let reception = app
        .login_token("recepcao@boldworkplace.com.br", "senha-forte")
        .await?;

    // Tenants cannot send notifications.
    let tenant_send = app
        .post_json(
            "/api/notifications",
            &json!({ "recipient_id": tenant_id, "custom_content": "oi" }),
            Some(&target),
        )
        .await?;
    assert_eq!(tenant_send.status(), StatusCode::FORBIDDEN);

    // A notification with a response requirement reaches only its recipient.
    let sent = app
        .post_json(
            "/api/notifications",
            &json!({
                "recipient_id": tenant_id,
                "custom_content": "Visitante na recepção",
                "requires_response": true
            }),
            Some(&reception),
        )
        .await?;
    let notification = body_to_json(sent.into_body()).await?;
    let notification_id = notification["id"].as_str().unwrap().to_string();

    let other_inbox = app.get("/api/notifications", Some(&other)).await?;
    let other_inbox = body_to_json(other_inbox.into_body()).await?;
    assert!(other_inbox.as_array().unwrap().is_empty());

    // Neither another tenant nor the sender may answer for the recipient.
    let foreign_response = app
        .post_json(
            &format!("/api/notifications/{notification_id}/response"),
            &json!({ "response_value": "sou outro" }),
            Some(&other),
        )
        .await?;
    assert_eq!(foreign_response.status(), StatusCode::FORBIDDEN);

    let sender_response = app
        .post_json(
            &format!("/api/notifications/{notification_id}/response"),
            &json!({ "response_value": "respondo eu" }),
            Some(&reception),
        )
        .await?;
    assert_eq!(sender_response.status(), StatusCode::FORBIDDEN);

    // A notification that never asked for a response rejects one.
    let plain = app
        .post_json(
            "/api/notifications",
            &json!({ "recipient_id": tenant_id, "custom_content": "Aviso simples" }),
            Some(&reception),
        )
        .await?;
    let plain = body_to_json(plain.into_body()).await?;
    let plain_id = plain["id"].as_str().unwrap().to_string();

    let unsolicited = app
        .post_json(
            &format!("/api/notifications/{plain_id}/response"),
            &json!({ "response_value": "ok" }),
            Some(&target),
        )
        .await?;
    assert_eq!(unsolicited.status(), StatusCode::BAD_REQUEST);

    // Sending to a non-existent tenant or with no content at all fails fast.
    let no_content = app
        .post_json(
            "/api/notifications",
            &json!({ "recipient_id": tenant_id }),
            Some(&reception),
        )
        .await?;
    assert_eq!(no_content.status(), StatusCode::BAD_REQUEST);

    let unknown_recipient = app
        .post_json(
            "/api/notifications",
            &json!({
                "recipient_id": "00000000-0000-0000-0000-000000000000",
                "custom_content": "oi"
            }),
            Some(&reception),
        )
        .await?;
    assert_eq!(unknown_recipient.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn reception_message_catalog_is_staff_only() -> Result<()> {
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

    let denied = app.get("/api/reception/messages", Some(&tenant)).await?;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    // The recepcao gate admits reception itself and the escalated roles.
    let reception_view = app.get("/api/reception/messages", Some(&reception)).await?;
    assert_eq!(reception_view.status(), StatusCode::OK);
    let central_view = app.get("/api/reception/messages", Some(&central)).await?;
    assert_eq!(central_view.status(), StatusCode::OK);

    app.cleanup().await?;
    Ok(())
}
