//! Mock Layer platform endpoints

use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Encrypted archive body served by [`mount_archive`]
pub const ARCHIVE_BYTES: &[u8] = b"\x1f\x8b-not-really-encrypted";

/// Accept `PUT export_security` for `app`
pub async fn mount_key_registration(server: &MockServer, app: &str) {
    Mock::given(method("PUT"))
        .and(path(format!("/apps/{}/export_security", app)))
        .and(header("Accept", "application/vnd.layer+json; version=1.0"))
        .and(header("Authorization", "Bearer e2e-token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(server)
        .await;
}

/// Serve `exports` as the export list of `app`
pub async fn mount_export_list(server: &MockServer, app: &str, exports: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/apps/{}/exports", app)))
        .respond_with(ResponseTemplate::new(200).set_body_json(exports))
        .expect(1)
        .mount(server)
        .await;
}

/// Create export `export_id` on `POST exports`
pub async fn mount_export_creation(server: &MockServer, app: &str, export_id: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/apps/{}/exports", app)))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": export_id,
            "created_at": "2017-05-23T18:08:17.178Z"
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Report the export pending `pending` times, then ready with a download URL
pub async fn mount_export_status(server: &MockServer, app: &str, export_id: &str, pending: u64) {
    let status_path = format!("/apps/{}/exports/{}/status", app, export_id);
    if pending > 0 {
        Mock::given(method("GET"))
            .and(path(status_path.clone()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "download_url": "",
                "encrypted_aes_key": null,
                "aes_iv": null
            })))
            .up_to_n_times(pending)
            .expect(pending)
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(status_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "download_url": format!("{}/storage/export.enc.tar.gz", server.uri()),
            "encrypted_aes_key": "cGxhdGZvcm0ta2V5",
            "aes_iv": "aXYtYnl0ZXM="
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Serve the encrypted archive
pub async fn mount_archive(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/storage/export.enc.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(ARCHIVE_BYTES.to_vec()))
        .expect(1)
        .mount(server)
        .await;
}

/// Serve `body` at `/storage/files/{name}` and return its URL
pub async fn mount_attachment(server: &MockServer, name: &str, body: &[u8]) -> String {
    let file_path = format!("/storage/files/{}", name);
    Mock::given(method("GET"))
        .and(path(file_path.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(1)
        .mount(server)
        .await;
    format!("{}{}", server.uri(), file_path)
}
