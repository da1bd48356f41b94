use serde_json::json;

use crate::common::{TestApp, UploadFile, routes};

mod linking {
    use super::*;

    #[tokio::test]
    async fn creating_an_image_links_its_record() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin1").await;
        let url = app
            .upload_one("gallery", UploadFile::new("brunnen.jpg", "image/jpeg", 32), &token)
            .await;

        let res = app
            .post_with_token(
                routes::IMAGES,
                &json!({"title": "Dorfbrunnen", "url": url, "description": "  "}),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.body["description"].is_null());
        let file_id = res.body["file_record_id"].as_i64().unwrap() as i32;

        let record = app.get_with_token(&routes::file(file_id), &token).await;
        assert_eq!(record.body["associated_entity"], "image");
        assert_eq!(record.body["associated_entity_id"], res.id());
        assert_eq!(record.body["is_orphaned"], false);
    }

    #[tokio::test]
    async fn documents_events_and_news_link_their_files() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin1").await;
        let pdf = app
            .upload_one(
                "documents",
                UploadFile::new("satzung.pdf", "application/pdf", 64),
                &token,
            )
            .await;
        let poster = app
            .upload_one("events", UploadFile::new("plakat.png", "image/png", 32), &token)
            .await;
        let photo = app
            .upload_one("news", UploadFile::new("bank.jpg", "image/jpeg", 32), &token)
            .await;

        let doc = app
            .post_with_token(
                routes::DOCUMENTS,
                &json!({"title": "Satzung", "file_url": pdf, "category": "Verein"}),
                &token,
            )
            .await;
        assert_eq!(doc.status, 201, "{}", doc.text);
        assert!(doc.body["file_record_id"].is_i64());

        let event = app
            .post_with_token(
                routes::EVENTS,
                &json!({
                    "title": "Maifest",
                    "starts_at": "2027-05-01T10:00:00Z",
                    "thumbnail_url": poster,
                }),
                &token,
            )
            .await;
        assert_eq!(event.status, 201, "{}", event.text);
        assert!(event.body["file_record_id"].is_i64());

        let news = app
            .post_with_token(
                routes::NEWS,
                &json!({"title": "Neue Bank", "body": "Am Dorfplatz.", "image_url": photo}),
                &token,
            )
            .await;
        assert_eq!(news.status, 201, "{}", news.text);
        let record_id = news.body["file_record_id"].as_i64().unwrap() as i32;

        let record = app.get_with_token(&routes::file(record_id), &token).await;
        assert_eq!(record.body["associated_entity"], "news");
        assert_eq!(record.body["associated_entity_id"], news.id());
    }

    #[tokio::test]
    async fn external_urls_have_no_record() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin1").await;

        let res = app
            .post_with_token(
                routes::IMAGES,
                &json!({"title": "Luftbild", "url": "https://example.org/luftbild.jpg"}),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.body["file_record_id"].is_null());
    }

    #[tokio::test]
    async fn event_without_thumbnail_is_accepted() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin1").await;

        let res = app
            .post_with_token(
                routes::EVENTS,
                &json!({"title": "Laternenumzug", "starts_at": "2027-11-11T17:00:00Z"}),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.body["thumbnail_url"].is_null());
        assert!(res.body["file_record_id"].is_null());
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin1").await;

        let res = app
            .post_with_token(
                routes::IMAGES,
                &json!({"title": "   ", "url": "/uploads/gallery/x.jpg"}),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod owner_deletion {
    use super::*;
    use sea_orm::EntityTrait;
    use village_server::entity::event;

    #[tokio::test]
    async fn deleting_an_owner_keeps_the_record() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin1").await;
        let url = app
            .upload_one(
                "documents",
                UploadFile::new("haushalt.pdf", "application/pdf", 64),
                &token,
            )
            .await;
        let doc = app
            .post_with_token(
                routes::DOCUMENTS,
                &json!({"title": "Haushalt", "file_url": url}),
                &token,
            )
            .await;
        let record_id = doc.body["file_record_id"].as_i64().unwrap() as i32;

        let res = app.delete_with_token(&routes::document(doc.id()), &token).await;
        assert_eq!(res.status, 204);

        let record = app.get_with_token(&routes::file(record_id), &token).await;
        assert_eq!(record.status, 200);
        assert_eq!(record.body["associated_entity"], "document");

        let served = app.get_without_token(&url).await;
        assert_eq!(served.status, 200);
    }

    #[tokio::test]
    async fn deleting_a_missing_owner_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin1").await;

        assert_eq!(app.delete_with_token(&routes::image(5), &token).await.status, 404);
        assert_eq!(app.delete_with_token(&routes::document(5), &token).await.status, 404);
        assert_eq!(app.delete_with_token(&routes::event(5), &token).await.status, 404);
        assert_eq!(app.delete_with_token(&routes::news(5), &token).await.status, 404);
    }

    #[tokio::test]
    async fn deleting_a_file_detaches_optional_owner_columns() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin1").await;
        let poster = app
            .upload_one("events", UploadFile::new("kirmes.png", "image/png", 32), &token)
            .await;
        let created = app
            .post_with_token(
                routes::EVENTS,
                &json!({
                    "title": "Kirmes",
                    "starts_at": "2027-08-20T14:00:00Z",
                    "thumbnail_url": poster,
                }),
                &token,
            )
            .await;
        let record_id = created.body["file_record_id"].as_i64().unwrap() as i32;

        let res = app.delete_with_token(&routes::file(record_id), &token).await;
        assert_eq!(res.status, 200, "{}", res.text);

        let served = app.get_without_token(&poster).await;
        assert_eq!(served.status, 404);

        let row = event::Entity::find_by_id(created.id())
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert!(row.thumbnail_url.is_none());
    }
}
