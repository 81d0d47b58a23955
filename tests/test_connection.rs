//! End-to-end request handling over an in-memory connection.

mod common;

use common::{ParsedResponse, TestPortal, PORTAL_ADDRESS};
use portico::http::connection::Connection;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

#[tokio::test]
async fn test_domain_host_is_redirected() {
    let t = TestPortal::new();
    let resp = t.get("/", Some("example.com")).await;

    assert_eq!(resp.status, 302);
    assert_eq!(resp.header("Location"), Some("http://192.168.4.1/"));
    assert_eq!(resp.header("Connection"), Some("close"));
    assert!(resp.body.is_empty());
}

#[tokio::test]
async fn test_domain_host_with_port_is_redirected() {
    let t = TestPortal::new();
    let resp = t.get("/api/user", Some("captive.apple.com:80")).await;
    assert_eq!(resp.status, 302);
}

#[tokio::test]
async fn test_redirected_post_with_unread_body_still_closes() {
    let t = TestPortal::new();
    let body = br#"{"name":"never read"}"#;
    let mut req = format!(
        "POST /admin/user HTTP/1.1\r\nHost: example.com\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    req.extend_from_slice(body);

    let raw = tokio::time::timeout(Duration::from_secs(5), t.exchange(&req))
        .await
        .expect("connection must close");
    let resp = ParsedResponse::parse(&raw);

    assert_eq!(resp.status, 302);
    assert_eq!(resp.header("Location"), Some("http://192.168.4.1/"));
    assert!(resp.body.is_empty());
    assert!(!t.data().join("user.json").exists());
}

#[tokio::test]
async fn test_portal_host_is_served() {
    let t = TestPortal::new();
    let resp = t.get("/", Some(PORTAL_ADDRESS)).await;

    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("Content-Type"), Some("text/html"));
    assert_eq!(resp.text(), "User data is empty. Please go to /admin/user");
}

#[tokio::test]
async fn test_probe_path_redirects_for_any_host() {
    let t = TestPortal::new();
    for host in [Some(PORTAL_ADDRESS), Some("connectivitycheck.gstatic.com"), None] {
        let resp = t.get("/generate_204", host).await;
        assert_eq!(resp.status, 302);
        assert_eq!(resp.header("Location"), Some("http://192.168.4.1/"));
    }
}

#[tokio::test]
async fn test_two_token_request_line_is_rejected() {
    let t = TestPortal::new();
    let raw = tokio::time::timeout(Duration::from_secs(5), t.exchange(b"GET /\r\n\r\n"))
        .await
        .expect("connection must close");
    let resp = ParsedResponse::parse(&raw);

    assert_eq!(resp.status, 400);
    assert_eq!(resp.json(), json!({"status": "error", "message": "Bad Request Line"}));
}

#[tokio::test]
async fn test_invalid_content_length_is_rejected() {
    let t = TestPortal::new();
    let raw = t
        .exchange(b"POST /api/user HTTP/1.1\r\nContent-Length: twelve\r\n\r\n")
        .await;
    assert_eq!(ParsedResponse::parse(&raw).status, 400);
}

#[tokio::test]
async fn test_empty_connection_gets_400() {
    let t = TestPortal::new();
    let resp = ParsedResponse::parse(&t.exchange(b"").await);
    assert_eq!(resp.status, 400);
    assert_eq!(resp.json()["message"], "Null Request");
}

#[tokio::test]
async fn test_static_content_types() {
    let t = TestPortal::new();
    t.write_www("style.css", b"body{}");
    t.write_www("app.js", b"let a;");
    t.write_www("photo.jpg", &[0xff, 0xd8, 0xff]);
    t.write_www("page.html", b"<p>hi</p>");
    t.write_www("notes.md", b"# notes");

    let cases = [
        ("/style.css", "text/css"),
        ("/app.js", "application/javascript"),
        ("/photo.jpg", "image/jpeg"),
        ("/page.html", "text/html"),
        ("/notes.md", "text/plain"),
    ];
    for (path, content_type) in cases {
        let resp = t.get(path, Some(PORTAL_ADDRESS)).await;
        assert_eq!(resp.status, 200, "{}", path);
        assert_eq!(resp.header("Content-Type"), Some(content_type), "{}", path);
    }

    let resp = t.get("/photo.jpg", None).await;
    assert_eq!(resp.body, vec![0xff, 0xd8, 0xff]);
}

#[tokio::test]
async fn test_static_file_larger_than_buffer() {
    let t = TestPortal::new();
    let contents: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    t.write_www("big.js", &contents);

    let resp = t.get("/big.js", None).await;
    assert_eq!(resp.body, contents);
}

#[tokio::test]
async fn test_static_get_is_idempotent() {
    let t = TestPortal::new();
    t.write_www("style.css", b"body{color:red}");

    let first = t.get("/style.css", None).await;
    let second = t.get("/style.css", None).await;
    assert_eq!(first.raw, second.raw);
}

#[tokio::test]
async fn test_missing_static_file_is_404() {
    let t = TestPortal::new();
    let resp = t.get("/nope.css", None).await;

    assert_eq!(resp.status, 404);
    assert_eq!(resp.header("Content-Type"), Some("application/json"));
    assert_eq!(resp.json(), json!({"status": "error", "message": "Not Found"}));
}

#[tokio::test]
async fn test_traversal_is_forbidden_for_every_method() {
    let t = TestPortal::new();
    std::fs::write(t.dir.path().join("secret.txt"), b"secret").unwrap();

    let requests: [&[u8]; 4] = [
        b"GET /../secret.txt HTTP/1.1\r\n\r\n",
        b"POST /../secret.txt HTTP/1.1\r\nContent-Length: 0\r\n\r\n",
        b"POST /../secret.txt HTTP/1.1\r\nContent-Length: 2\r\n\r\n{}",
        b"DELETE /a/../../secret.txt HTTP/1.1\r\n\r\n",
    ];
    for req in requests {
        let resp = ParsedResponse::parse(&t.exchange(req).await);
        assert_eq!(resp.status, 403);
        assert_eq!(resp.json()["message"], "Access Denied");
    }
}

#[tokio::test]
async fn test_admin_page_served_from_template() {
    let t = TestPortal::new();
    t.write_www("user.html", b"<form>user</form>");

    let resp = t.get("/admin/user", Some(PORTAL_ADDRESS)).await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("Content-Type"), Some("text/html"));
    assert_eq!(resp.text(), "<form>user</form>");
}

#[tokio::test]
async fn test_admin_post_stores_profile() {
    let t = TestPortal::new();
    t.write_www("index.html", b"<h1>welcome</h1>");

    let resp = t.post("/admin/user", &[], br#"{"name":"Ada"}"#).await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.json(), json!({"status": "success"}));

    let resp = t.get("/api/user", Some(PORTAL_ADDRESS)).await;
    assert_eq!(resp.header("Content-Type"), Some("application/json"));
    assert_eq!(resp.json(), json!({"name": "Ada"}));

    let resp = t.get("/", Some(PORTAL_ADDRESS)).await;
    assert_eq!(resp.text(), "<h1>welcome</h1>");
}

#[tokio::test]
async fn test_spool_file_is_removed() {
    let t = TestPortal::new();
    t.post("/admin/simplehist", &[], br#"{"visits":[1,2]}"#).await;

    let leftovers = std::fs::read_dir(t.dir.path().join("spool")).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_invalid_json_body_is_400() {
    let t = TestPortal::new();
    let resp = t.post("/admin/user", &[], b"{not json").await;

    assert_eq!(resp.status, 400);
    assert_eq!(resp.json()["message"], "JSON Decode Error");
}

#[tokio::test]
async fn test_unallocatable_buffer_is_503() {
    let t = TestPortal::with_config(|cfg| cfg.server.buffer_size = usize::MAX);
    let resp = t.post("/admin/user", &[], br#"{"name":"Ada"}"#).await;

    assert_eq!(resp.status, 503);
    assert_eq!(resp.header("Connection"), Some("close"));
    assert_eq!(resp.json(), json!({"status": "error", "message": "Memory Error"}));
    assert!(!t.data().join("user.json").exists());
}

#[tokio::test]
async fn test_admin_page_ignores_other_methods() {
    let t = TestPortal::new();
    let raw = t
        .exchange(b"PUT /admin/user HTTP/1.1\r\nHost: 192.168.4.1\r\n\r\n")
        .await;
    let resp = ParsedResponse::parse(&raw);

    assert_eq!(resp.status, 200);
    assert!(resp.body.is_empty());
}

#[tokio::test]
async fn test_api_wrong_method_is_json_error_under_200() {
    let t = TestPortal::new();
    let resp = t.post("/api/user", &[], b"{}").await;

    assert_eq!(resp.status, 200);
    assert_eq!(resp.json(), json!({"status": "error", "message": "Method not allowed"}));
}

#[tokio::test]
async fn test_jobhist_csv_as_json() {
    let t = TestPortal::new();
    t.write_data("jobhist.csv", b"1,Job One,Desc<br>Multiline\n");

    let resp = t.get("/api/jobhist", Some(PORTAL_ADDRESS)).await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("Content-Type"), Some("application/json"));
    assert_eq!(
        resp.json()[0],
        json!({"job_no": 1, "job_name": "Job One", "job_description": "Desc\nMultiline"})
    );
}

#[tokio::test]
async fn test_jobhist_post_then_read() {
    let t = TestPortal::new();
    let body = br#"{"job_no": 7, "job_name": "Seven", "job_description": "a\nb"}"#;
    let resp = t.post("/admin/jobhist", &[], body).await;
    assert_eq!(resp.json(), json!({"status": "success"}));

    let resp = t.get("/api/jobhist", None).await;
    assert_eq!(
        resp.json(),
        json!([{"job_no": 7, "job_name": "Seven", "job_description": "a\nb"}])
    );
}

#[tokio::test]
async fn test_upload_sequence() {
    let t = TestPortal::new();

    let first = t
        .post("/api/upload", &[("X-Filename", "a.jpg"), ("X-Final", "false")], b"AAA")
        .await;
    assert_eq!(first.status, 200);
    assert_eq!(first.json(), json!({"status": "success", "message": "Chunk received"}));

    let second = t
        .post("/api/upload", &[("X-Filename", "a.jpg"), ("X-Final", "true")], b"BBB")
        .await;
    assert_eq!(second.json(), json!({"status": "success", "message": "Upload complete"}));

    assert_eq!(std::fs::read(t.www().join("image.jpg")).unwrap(), b"AAABBB");
    assert!(!t.uploads().join("a.jpg").exists());
    assert!(!t.www().join("a.jpg").exists());
}

#[tokio::test]
async fn test_upload_without_filename_uses_default() {
    let t = TestPortal::new();
    let resp = t.post("/api/upload", &[], b"xyz").await;

    assert_eq!(resp.json()["status"], "success");
    assert_eq!(std::fs::read(t.uploads().join("tmp.jpg")).unwrap(), b"xyz");
}

#[tokio::test]
async fn test_upload_named_after_page_does_not_touch_page() {
    let t = TestPortal::new();
    t.write_www("index.html", b"<h1>welcome</h1>");
    t.post("/admin/user", &[], br#"{"name":"Ada"}"#).await;

    let resp = t
        .post("/api/upload", &[("X-Filename", "index.html")], b"<script>")
        .await;
    assert_eq!(resp.json()["status"], "success");

    assert_eq!(t.get("/", Some(PORTAL_ADDRESS)).await.text(), "<h1>welcome</h1>");
    assert_eq!(t.get("/index.html", Some(PORTAL_ADDRESS)).await.text(), "<h1>welcome</h1>");
}

#[tokio::test]
async fn test_upload_rejects_path_in_filename() {
    let t = TestPortal::new();
    let resp = t
        .post("/api/upload", &[("X-Filename", "../evil.jpg")], b"xyz")
        .await;

    assert_eq!(resp.status, 200);
    assert_eq!(resp.json()["status"], "error");
    assert!(!t.dir.path().join("evil.jpg").exists());
}

#[tokio::test]
async fn test_upload_get_is_method_not_allowed() {
    let t = TestPortal::new();
    let resp = t.get("/api/upload", None).await;
    assert_eq!(resp.json(), json!({"status": "error", "message": "Method not allowed"}));
}

#[tokio::test]
async fn test_network_info() {
    let t = TestPortal::new();
    let resp = t.get("/api/network", Some(PORTAL_ADDRESS)).await;

    assert_eq!(
        resp.json(),
        json!({"ap": {"ip": "192.168.4.1", "netmask": "255.255.255.0"}, "sta": null})
    );
}

#[tokio::test]
async fn test_admin_log_streams_file() {
    let t = TestPortal::new();
    std::fs::write(t.dir.path().join("log.txt"), "line one\nline two\n").unwrap();

    let resp = t.get("/admin/log", Some(PORTAL_ADDRESS)).await;
    assert_eq!(resp.header("Content-Type"), Some("text/plain"));
    assert_eq!(resp.text(), "line one\nline two\n");

    std::fs::remove_file(t.dir.path().join("log.txt")).unwrap();
    let resp = t.get("/admin/log", None).await;
    assert_eq!(resp.status, 200);
    assert!(resp.body.is_empty());
}

#[tokio::test]
async fn test_expect_continue_sent_before_body_is_read() {
    let t = TestPortal::new();
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server);
    let conn = Connection::from_parts(9, BufReader::new(server_read), server_write, Arc::clone(&t.portal));
    let task = tokio::spawn(conn.run());

    let (mut client_read, mut client_write) = tokio::io::split(client);
    let body = br#"{"name":"Grace"}"#;
    let head = format!(
        "POST /admin/user HTTP/1.1\r\nHost: {}\r\nContent-Length: {}\r\nExpect: 100-continue\r\n\r\n",
        PORTAL_ADDRESS,
        body.len()
    );
    client_write.write_all(head.as_bytes()).await.unwrap();

    // No body byte has been sent yet; the interim reply must arrive anyway.
    let mut interim = [0u8; 25];
    tokio::time::timeout(Duration::from_secs(5), client_read.read_exact(&mut interim))
        .await
        .expect("interim response before body")
        .unwrap();
    assert_eq!(&interim, b"HTTP/1.1 100 Continue\r\n\r\n");

    client_write.write_all(body).await.unwrap();
    let mut rest = Vec::new();
    client_read.read_to_end(&mut rest).await.unwrap();
    task.await.unwrap();

    let resp = ParsedResponse::parse(&rest);
    assert_eq!(resp.status, 200);
    assert_eq!(resp.json(), json!({"status": "success"}));
}
