//! REST client against the development backend.

mod common;

use std::sync::Arc;

use common::Backend;
use sidrex_widget::api::models::{ChatRequest, Credentials, PdfType, Registration};
use sidrex_widget::api::PdfListFilter;
use sidrex_widget::auth::{AuthBackend, LOGIN_PATH, Navigator, RecordingNavigator};
use sidrex_widget::{AuthContext, UserType};

#[tokio::test]
async fn session_login_and_logout() {
    let backend = Backend::default().await;
    let client = backend.client();

    let anonymous = client.current_user().await.unwrap_err();
    assert!(anonymous.is_unauthorized());

    assert!(client.csrf_token().is_none());
    client
        .login(&Credentials::new("admin", "admin123"))
        .await
        .unwrap();
    assert!(client.csrf_token().is_some());

    let user = client.current_user().await.unwrap();
    assert_eq!(user.username, "admin");
    assert!(user.is_admin());

    client.logout().await.unwrap();
    assert!(client.current_user().await.unwrap_err().is_unauthorized());
}

#[tokio::test]
async fn mutating_request_without_token_is_forbidden() {
    let backend = Backend::default().await;
    let client = backend.client();

    let err = client.logout().await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert!(err.server_message().unwrap().contains("CSRF"));
}

#[tokio::test]
async fn wrong_password_reports_server_message() {
    let backend = Backend::default().await;
    let client = backend.client();

    let err = client
        .login(&Credentials::new("admin", "yanlis"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(
        err.server_message(),
        Some("Unable to log in with provided credentials.")
    );
}

#[tokio::test]
async fn robots_by_id_and_slug() {
    let backend = Backend::default().await;
    let client = backend.client();

    let robots = client.list_robots().await.unwrap();
    assert_eq!(robots.len(), backend.state.robots.len());

    let zzen = client.robot_by_slug("zzen").await.unwrap();
    assert_eq!(client.robot(zzen.id).await.unwrap(), zzen);
    assert_eq!(client.robot_info("zzen").await.unwrap().name, "Zzen SidrexGPT");
    assert_eq!(client.robot_by_slug("yok").await.unwrap_err().status(), Some(404));
}

#[tokio::test]
async fn chat_reply_carries_citations() {
    let backend = Backend::default().await;
    let client = backend.client();

    let reply = client
        .send_chat(
            "zzen",
            &ChatRequest {
                message: "  uyku  ".to_string(),
                conversation_id: "robot_zzen".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(reply.reply_text(), Some("Zzen SidrexGPT: uyku"));
    assert!(reply.context_used);
    assert_eq!(reply.citations.len(), 1);
    assert_eq!(reply.citations[0].source, "zzen-bilgi.pdf");
    assert_eq!(backend.state.chat_calls(), 1);

    let err = client
        .send_chat(
            "zzen",
            &ChatRequest {
                message: " ".to_string(),
                conversation_id: "robot_zzen".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.server_message(), Some("Mesaj boş olamaz!"));
}

#[tokio::test]
async fn writes_invalidate_cached_reads() {
    let backend = Backend::default().await;
    let client = backend.client();
    client
        .login(&Credentials::new("admin", "admin123"))
        .await
        .unwrap();
    let zzen = client.robot_by_slug("zzen").await.unwrap();

    let before = client.robot_messages(zzen.id).await.unwrap();
    assert_eq!(before.messages.len(), 4);
    let again = client.robot_messages(zzen.id).await.unwrap();
    assert_eq!(again, before);
    assert!(client.cache_stats().hits >= 1);

    let updated = vec!["Yeni mesaj".to_string()];
    let _ = client
        .update_robot_messages(zzen.id, updated.clone())
        .await
        .unwrap();
    assert_eq!(client.cache_stats().entries, 0);
    assert_eq!(client.robot_messages(zzen.id).await.unwrap().messages, updated);
}

#[tokio::test]
async fn pdf_filters_and_toggle() {
    let backend = Backend::default().await;
    let client = backend.client();
    client
        .login(&Credentials::new("marka", "marka123"))
        .await
        .unwrap();
    let zzen = client.robot_by_slug("zzen").await.unwrap();

    let active = client
        .list_pdfs(PdfListFilter::for_robot(zzen.id).active_only())
        .await
        .unwrap();
    assert_eq!(active.len(), 1);

    let all = client.robot_pdfs(zzen.id).await.unwrap();
    let inactive = all.iter().find(|pdf| !pdf.is_active).unwrap();
    let toggled = client.toggle_pdf_active(inactive.id).await.unwrap();
    assert!(toggled.is_active);

    assert_eq!(client.robot_active_pdfs(zzen.id).await.unwrap().len(), 2);
    let rules = client
        .list_pdfs(PdfListFilter::default().with_type(PdfType::Kural))
        .await
        .unwrap();
    assert_eq!(rules.len(), 1);
}

#[tokio::test]
async fn auth_context_over_http() {
    let backend = Backend::default().await;
    let client: Arc<dyn AuthBackend> = Arc::new(backend.client());
    let navigator = Arc::new(RecordingNavigator::default());
    let auth = AuthContext::new(client, Arc::clone(&navigator) as Arc<dyn Navigator>);

    assert!(auth.init().await.is_none());
    assert!(!auth.is_loading());

    let failed = auth.login(&Credentials::new("marka", "yanlis")).await;
    assert!(!failed.success);
    assert!(failed.error.is_some());

    let ok = auth.login(&Credentials::new("marka", "marka123")).await;
    assert!(ok.success);
    assert!(auth.is_authenticated());
    assert!(auth.can_edit_pdf());
    assert!(!auth.can_edit_brand_management());
    assert_eq!(auth.permissions().user_type, UserType::BrandedPro);

    auth.logout().await;
    assert!(!auth.is_authenticated());
    assert_eq!(navigator.visited(), vec![LOGIN_PATH.to_string()]);
}

#[tokio::test]
async fn registration_logs_in_or_explains() {
    let backend = Backend::default().await;
    let client: Arc<dyn AuthBackend> = Arc::new(backend.client());
    let auth = AuthContext::new(client, Arc::new(RecordingNavigator::default()));

    let short = auth
        .register(&Registration {
            username: "yeni".to_string(),
            email: "yeni@example.com".to_string(),
            password1: "kisa".to_string(),
            password2: "kisa".to_string(),
        })
        .await;
    assert!(!short.success);
    assert_eq!(
        short.error.as_deref(),
        Some("Şifre çok kısa. En az 8 karakter olmalı.")
    );

    let created = auth
        .register(&Registration {
            username: "yeni".to_string(),
            email: "yeni@example.com".to_string(),
            password1: "uzun-sifre-42".to_string(),
            password2: "uzun-sifre-42".to_string(),
        })
        .await;
    assert!(created.success);
    assert_eq!(auth.user().unwrap().email, "yeni@example.com");
    assert_eq!(auth.permissions().user_type, UserType::Unbranded);
}
