use serde_json::json;

use crate::common::{TestApp, UploadFile, routes};

async fn upload_record(app: &TestApp, upload_type: &str, name: &'static str, token: &str) -> (i32, String) {
    let res = app
        .upload_with_token(upload_type, vec![UploadFile::new(name, "image/jpeg", 32)], token)
        .await;
    assert_eq!(res.status, 201, "upload failed: {}", res.text);
    let result = &res.body["results"][0];
    (
        result["record_id"].as_i64().unwrap() as i32,
        result["file_path"].as_str().unwrap().to_string(),
    )
}

mod records {
    use super::*;

    #[tokio::test]
    async fn list_filters_by_upload_type() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin1").await;
        upload_record(&app, "gallery", "a.jpg", &token).await;
        upload_record(&app, "gallery", "b.jpg", &token).await;
        upload_record(&app, "news", "c.jpg", &token).await;

        let all = app.get_with_token(routes::FILES, &token).await;
        assert_eq!(all.status, 200);
        assert_eq!(all.body["total"], 3);

        let gallery = app
            .get_with_token(&format!("{}?upload_type=gallery", routes::FILES), &token)
            .await;
        assert_eq!(gallery.body["total"], 2);
        for file in gallery.body["files"].as_array().unwrap() {
            assert_eq!(file["upload_type"], "gallery");
        }
    }

    #[tokio::test]
    async fn get_missing_record_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin1").await;

        let res = app.get_with_token(&routes::file(999), &token).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn patch_updates_and_clears_association() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin1").await;
        let (id, _) = upload_record(&app, "gallery", "a.jpg", &token).await;

        let res = app
            .patch_with_token(
                &routes::file(id),
                &json!({
                    "original_name": "Kirmes.jpg",
                    "associated_entity": "image",
                    "associated_entity_id": 7,
                }),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["original_name"], "Kirmes.jpg");
        assert_eq!(res.body["associated_entity"], "image");
        assert_eq!(res.body["associated_entity_id"], 7);

        let res = app
            .patch_with_token(
                &routes::file(id),
                &json!({"associated_entity": null, "associated_entity_id": null}),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["associated_entity"].is_null());
        assert!(res.body["associated_entity_id"].is_null());
        assert_eq!(res.body["original_name"], "Kirmes.jpg");
    }

    #[tokio::test]
    async fn patch_rejects_unknown_owner_kind() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin1").await;
        let (id, _) = upload_record(&app, "gallery", "a.jpg", &token).await;

        let res = app
            .patch_with_token(
                &routes::file(id),
                &json!({"associated_entity": "sportverein"}),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn delete_removes_blob_and_record() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin1").await;
        let (id, file_path) = upload_record(&app, "gallery", "a.jpg", &token).await;
        assert!(app.blob_path(&file_path).exists());

        let res = app.delete_with_token(&routes::file(id), &token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["success"], true);
        assert!(res.body.get("warning").is_none());
        assert!(!app.blob_path(&file_path).exists());

        let res = app.get_with_token(&routes::file(id), &token).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn delete_with_missing_blob_warns_but_succeeds() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin1").await;
        let (id, file_path) = upload_record(&app, "gallery", "a.jpg", &token).await;
        std::fs::remove_file(app.blob_path(&file_path)).unwrap();

        let res = app.delete_with_token(&routes::file(id), &token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["success"], true);
        assert_eq!(
            res.body["warning"],
            format!("Physical file not found: {file_path}")
        );

        let res = app.get_with_token(&routes::file(id), &token).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn delete_unknown_record_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin1").await;

        let res = app.delete_with_token(&routes::file(42), &token).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn bulk_delete_reports_per_id() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin1").await;
        let (first, _) = upload_record(&app, "gallery", "a.jpg", &token).await;
        let (second, _) = upload_record(&app, "events", "b.jpg", &token).await;

        let res = app
            .post_with_token(
                routes::BULK_DELETE,
                &json!({"file_ids": [first, 9999, second]}),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["success_count"], 2);

        let results = res.body["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["id"], first);
        assert_eq!(results[0]["success"], true);
        assert_eq!(results[1]["id"], 9999);
        assert_eq!(results[1]["success"], false);
        assert_eq!(results[1]["error"], "File record 9999 not found");
        assert_eq!(results[2]["success"], true);

        let files = app.get_with_token(routes::FILES, &token).await;
        assert_eq!(files.body["total"], 0);
    }

    #[tokio::test]
    async fn bulk_delete_validates_ids() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin1").await;

        let empty = app
            .post_with_token(routes::BULK_DELETE, &json!({"file_ids": []}), &token)
            .await;
        assert_eq!(empty.status, 400);

        let duplicate = app
            .post_with_token(routes::BULK_DELETE, &json!({"file_ids": [1, 1]}), &token)
            .await;
        assert_eq!(duplicate.status, 400);

        let too_many: Vec<i32> = (1..=101).collect();
        let res = app
            .post_with_token(routes::BULK_DELETE, &json!({"file_ids": too_many}), &token)
            .await;
        assert_eq!(res.status, 400);
    }
}

mod orphans {
    use super::*;

    #[tokio::test]
    async fn fresh_unassociated_upload_is_not_an_orphan() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin1").await;
        upload_record(&app, "gallery", "a.jpg", &token).await;

        let res = app.get_with_token(routes::ORPHANS, &token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["total"], 0);
        assert_eq!(res.body["grace_period_secs"], 3600);
    }

    #[tokio::test]
    async fn unassociated_upload_past_grace_is_an_orphan() {
        let app = TestApp::spawn_with_grace(0).await;
        let token = app.create_admin("admin1").await;
        let (id, _) = upload_record(&app, "gallery", "a.jpg", &token).await;

        let res = app.get_with_token(routes::ORPHANS, &token).await;
        assert_eq!(res.body["total"], 1);
        assert_eq!(res.body["files"][0]["id"], id);
    }

    #[tokio::test]
    async fn deleted_owner_leaves_an_orphan() {
        let app = TestApp::spawn_with_grace(0).await;
        let token = app.create_admin("admin1").await;
        let url = app
            .upload_one("gallery", UploadFile::new("a.jpg", "image/jpeg", 32), &token)
            .await;
        let image_id = app.create_image(&token, &url).await;

        let res = app.get_with_token(routes::ORPHANS, &token).await;
        assert_eq!(res.body["total"], 0);

        let res = app.delete_with_token(&routes::image(image_id), &token).await;
        assert_eq!(res.status, 204);

        let res = app.get_with_token(routes::ORPHANS, &token).await;
        assert_eq!(res.body["total"], 1);
        assert_eq!(res.body["files"][0]["public_url"], url);
    }

    #[tokio::test]
    async fn refresh_sets_and_clears_flags() {
        let app = TestApp::spawn_with_grace(0).await;
        let token = app.create_admin("admin1").await;
        let (id, _) = upload_record(&app, "gallery", "a.jpg", &token).await;

        let res = app.post_with_token(routes::ORPHANS_REFRESH, &json!({}), &token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["flagged"], 1);
        assert_eq!(res.body["cleared"], 0);

        let record = app.get_with_token(&routes::file(id), &token).await;
        assert_eq!(record.body["is_orphaned"], true);

        let again = app.post_with_token(routes::ORPHANS_REFRESH, &json!({}), &token).await;
        assert_eq!(again.body["flagged"], 0);

        let url = record.body["public_url"].as_str().unwrap().to_string();
        app.create_image(&token, &url).await;
        let record = app.get_with_token(&routes::file(id), &token).await;
        assert_eq!(record.body["is_orphaned"], false);
    }
}

mod cleanup {
    use super::*;

    async fn three_orphans(app: &TestApp, token: &str) -> Vec<String> {
        let mut paths = Vec::new();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            let (_, path) = upload_record(app, "gallery", name, token).await;
            paths.push(path);
        }
        paths
    }

    #[tokio::test]
    async fn defaults_to_dry_run() {
        let app = TestApp::spawn_with_grace(0).await;
        let token = app.create_admin("admin1").await;
        let paths = three_orphans(&app, &token).await;

        let res = app.post_with_token(routes::CLEANUP, &json!({}), &token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["dry_run"], true);
        assert_eq!(res.body["candidates"].as_array().unwrap().len(), 3);
        assert!(res.body.get("report").is_none());

        for path in &paths {
            assert!(app.blob_path(path).exists());
        }
        let files = app.get_with_token(routes::FILES, &token).await;
        assert_eq!(files.body["total"], 3);
    }

    #[tokio::test]
    async fn removes_orphans_and_their_files() {
        let app = TestApp::spawn_with_grace(0).await;
        let token = app.create_admin("admin1").await;
        let paths = three_orphans(&app, &token).await;

        let res = app
            .post_with_token(
                routes::CLEANUP,
                &json!({"dry_run": false, "delete_files": true}),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let report = &res.body["report"];
        assert_eq!(report["files_deleted"], 3);
        assert_eq!(report["records_deleted"], 3);
        assert!(report["errors"].as_array().unwrap().is_empty());

        for path in &paths {
            assert!(!app.blob_path(path).exists());
        }

        let again = app
            .post_with_token(
                routes::CLEANUP,
                &json!({"dry_run": false, "delete_files": true}),
                &token,
            )
            .await;
        assert_eq!(again.body["report"]["files_deleted"], 0);
        assert_eq!(again.body["report"]["records_deleted"], 0);
    }

    #[tokio::test]
    async fn keeping_files_reports_them_untracked() {
        let app = TestApp::spawn_with_grace(0).await;
        let token = app.create_admin("admin1").await;
        let paths = three_orphans(&app, &token).await;

        let res = app
            .post_with_token(routes::CLEANUP, &json!({"dry_run": false}), &token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let report = &res.body["report"];
        assert_eq!(report["records_deleted"], 3);
        assert_eq!(report["files_deleted"], 0);
        assert_eq!(report["untracked_files"].as_array().unwrap().len(), 3);

        for path in &paths {
            assert!(app.blob_path(path).exists());
        }
    }

    #[tokio::test]
    async fn live_files_survive_cleanup() {
        let app = TestApp::spawn_with_grace(0).await;
        let token = app.create_admin("admin1").await;
        let url = app
            .upload_one("gallery", UploadFile::new("keep.jpg", "image/jpeg", 32), &token)
            .await;
        app.create_image(&token, &url).await;
        three_orphans(&app, &token).await;

        let res = app
            .post_with_token(
                routes::CLEANUP,
                &json!({"dry_run": false, "delete_files": true}),
                &token,
            )
            .await;
        assert_eq!(res.body["report"]["records_deleted"], 3);

        let files = app.get_with_token(routes::FILES, &token).await;
        assert_eq!(files.body["total"], 1);
        assert_eq!(files.body["files"][0]["public_url"], url);
    }
}
