// SPDX-License-Identifier: Apache-2.0

use larder_server::{build_router, AppState, ServerConfig};
use larder_store::Store;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const ADMIN_PASSWORD: &str = "larder-admin-pass";
const USER_PASSWORD: &str = "larder-user-pass";

async fn spawn_server() -> (SocketAddr, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("create tempdir");
    let store = Store::new(dir.path().join("larder.db"));
    store.init_schema().expect("init schema");
    let config = ServerConfig {
        admin_password: ADMIN_PASSWORD.to_string(),
        user_password: USER_PASSWORD.to_string(),
        session_secret: "adjustment-race-secret".to_string(),
        ..ServerConfig::default()
    };
    let app = build_router(AppState::new(store, config));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve app");
    });
    (addr, dir)
}

async fn send_request(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<(&str, &str)>,
) -> (u16, String, String) {
    let mut request = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\n");
    for (name, value) in headers {
        request.push_str(&format!("{name}: {value}\r\n"));
    }
    if let Some((content_type, payload)) = body {
        request.push_str(&format!(
            "Content-Type: {content_type}\r\nContent-Length: {}\r\n",
            payload.len()
        ));
    }
    request.push_str("Connection: close\r\n\r\n");
    if let Some((_, payload)) = body {
        request.push_str(payload);
    }
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect to server");
    stream
        .write_all(request.as_bytes())
        .await
        .expect("write request");
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.expect("read response");
    let text = String::from_utf8_lossy(&raw).to_string();
    let (head, payload) = text.split_once("\r\n\r\n").unwrap_or((text.as_str(), ""));
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse::<u16>().ok())
        .expect("status line");
    (status, head.to_string(), payload.to_string())
}

fn cookie_from_head(head: &str) -> String {
    for line in head.lines() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.eq_ignore_ascii_case("set-cookie") {
            return value.trim().split(';').next().unwrap_or("").to_string();
        }
    }
    panic!("no set-cookie header in: {head}");
}

async fn login(addr: SocketAddr, password: &str) -> String {
    let form = format!("password={password}");
    let (status, head, _) = send_request(
        addr,
        "POST",
        "/login",
        &[],
        Some(("application/x-www-form-urlencoded", &form)),
    )
    .await;
    assert_eq!(status, 303, "login should redirect: {head}");
    cookie_from_head(&head)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_withdrawals_never_double_spend() {
    let (addr, _dir) = spawn_server().await;
    let admin = login(addr, ADMIN_PASSWORD).await;
    let user = login(addr, USER_PASSWORD).await;

    let (status, _, body) = send_request(
        addr,
        "POST",
        "/api/raw-materials",
        &[("Cookie", &admin)],
        Some((
            "application/json",
            r#"{"name":"Flour","quantity":10,"unit":"kg"}"#,
        )),
    )
    .await;
    assert_eq!(status, 201);
    let row: serde_json::Value = serde_json::from_str(&body).expect("created row");
    let id = row["id"].as_i64().expect("row id");

    // Two withdrawals of 7 against a stock of 10. Whatever the interleaving,
    // the conditional write lets exactly one through.
    let path = format!("/api/raw-materials/{id}/adjust");
    let user_headers = [("Cookie", user.as_str())];
    let (first, second) = tokio::join!(
        send_request(
            addr,
            "POST",
            &path,
            &user_headers,
            Some(("application/json", r#"{"adjustment":-7}"#)),
        ),
        send_request(
            addr,
            "POST",
            &path,
            &user_headers,
            Some(("application/json", r#"{"adjustment":-7}"#)),
        ),
    );

    let mut statuses = [first.0, second.0];
    statuses.sort_unstable();
    assert_eq!(statuses, [200, 400]);

    for (status, _, body) in [first, second] {
        if status == 200 {
            let row: serde_json::Value = serde_json::from_str(&body).expect("adjusted row");
            assert_eq!(row["quantity"].as_f64(), Some(3.0));
        } else {
            let err: serde_json::Value = serde_json::from_str(&body).expect("error body");
            assert_eq!(err["error"], "Insufficient quantity");
        }
    }

    let (_, _, body) = send_request(
        addr,
        "GET",
        "/api/raw-materials",
        &[("Cookie", &user)],
        None,
    )
    .await;
    let rows: serde_json::Value = serde_json::from_str(&body).expect("row array");
    assert_eq!(rows[0]["quantity"].as_f64(), Some(3.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unit_withdrawals_stop_exactly_at_zero() {
    let (addr, _dir) = spawn_server().await;
    let admin = login(addr, ADMIN_PASSWORD).await;

    let (status, _, body) = send_request(
        addr,
        "POST",
        "/api/food-items",
        &[("Cookie", &admin)],
        Some((
            "application/json",
            r#"{"name":"Beans","quantity":12,"category":"canned"}"#,
        )),
    )
    .await;
    assert_eq!(status, 201);
    let row: serde_json::Value = serde_json::from_str(&body).expect("created row");
    let id = row["id"].as_i64().expect("row id");

    let path = format!("/api/food-items/{id}/adjust");
    let mut handles = Vec::new();
    for _ in 0..20 {
        let path = path.clone();
        let cookie = admin.clone();
        handles.push(tokio::spawn(async move {
            let (status, _, _) = send_request(
                addr,
                "POST",
                &path,
                &[("Cookie", &cookie)],
                Some(("application/json", r#"{"adjustment":-1}"#)),
            )
            .await;
            status
        }));
    }

    let mut accepted = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.expect("join withdrawal task") {
            200 => accepted += 1,
            400 => refused += 1,
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(accepted, 12);
    assert_eq!(refused, 8);

    let (_, _, body) = send_request(
        addr,
        "GET",
        "/api/food-items",
        &[("Cookie", &admin)],
        None,
    )
    .await;
    let rows: serde_json::Value = serde_json::from_str(&body).expect("row array");
    assert_eq!(rows[0]["quantity"], 0);
}
