use chrono::Utc;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Deserialize;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct EmailLoginResponse {
    dev_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    token: String,
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    email: String,
}

#[derive(Debug, Deserialize)]
struct Habit {
    id: String,
    name: String,
    display_order: i64,
}

#[derive(Debug, Deserialize)]
struct DailyMetric {
    mood: i64,
    energy: i64,
    productivity: i64,
    momentum: f64,
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HabitLog {
    completed: bool,
}

#[derive(Debug, Deserialize)]
struct LoggedHabit {
    log: HabitLog,
    habit: Habit,
}

#[derive(Debug, Deserialize)]
struct DayResponse {
    metric: DailyMetric,
    habit_logs: Vec<LoggedHabit>,
}

#[derive(Debug, Deserialize)]
struct HabitStatistic {
    name: String,
    current_streak: u32,
    completion_rate: f64,
}

#[derive(Debug, Deserialize)]
struct OverallStats {
    total_habits: usize,
}

#[derive(Debug, Deserialize)]
struct HabitInsightsResponse {
    stats: Vec<HabitStatistic>,
    overall: OverallStats,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_db_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("daystack_http_{}_{}.db", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/health")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let base_url = format!("http://127.0.0.1:{port}");
    let child = Command::new(env!("CARGO_BIN_EXE_daystack"))
        .env("PORT", port.to_string())
        .env("DAYSTACK_DB_PATH", unique_db_path())
        .env("JWT_SECRET", "integration-test-secret")
        .env("APP_URL", &base_url)
        .env("RUST_LOG", "info")
        // No SMTP configuration: sign-in links come back in the response.
        .env_remove("SMTP_HOST")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

/// Runs the magic-link flow for the address and returns a session token.
async fn sign_in(client: &Client, base_url: &str, email: &str) -> String {
    let response: EmailLoginResponse = client
        .post(format!("{base_url}/api/auth/email/request"))
        .json(&serde_json::json!({ "email": email }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let link = response.dev_link.expect("dev link without SMTP config");

    let session: SessionResponse = client.get(&link).send().await.unwrap().json().await.unwrap();
    assert_eq!(session.user.email, email);
    session.token
}

fn today() -> String {
    Utc::now().date_naive().to_string()
}

#[tokio::test]
async fn http_protected_routes_require_a_session() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/api/habits", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = client
        .get(format!("{}/api/metrics/day?date={}", server.base_url, today()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn http_magic_link_is_single_use() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response: EmailLoginResponse = client
        .post(format!("{}/api/auth/email/request", server.base_url))
        .json(&serde_json::json!({ "email": "onetime@example.com" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let link = response.dev_link.unwrap();

    let first = client.get(&link).send().await.unwrap();
    assert!(first.status().is_success());

    let second = client.get(&link).send().await.unwrap();
    assert_eq!(second.status(), 401);
}

#[tokio::test]
async fn http_habit_and_metric_flow() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let token = sign_in(&client, &server.base_url, "flow@example.com").await;
    let auth = format!("Bearer {token}");

    // Starts with no habits.
    let habits: Vec<Habit> = client
        .get(format!("{}/api/habits", server.base_url))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(habits.is_empty());

    // Create two habits; orders are assigned sequentially.
    let meditate: Habit = client
        .post(format!("{}/api/habits", server.base_url))
        .header("Authorization", &auth)
        .json(&serde_json::json!({ "name": "Meditate", "type": "boolean", "color": "#10B981" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let read: Habit = client
        .post(format!("{}/api/habits", server.base_url))
        .header("Authorization", &auth)
        .json(&serde_json::json!({ "name": "Read", "type": "quantity", "target": 20, "color": "#3B82F6" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(meditate.display_order, 0);
    assert_eq!(read.display_order, 1);

    // Toggle the boolean habit on and then off for today.
    for completed in [true, false] {
        let response = client
            .post(format!("{}/api/habits/log", server.base_url))
            .header("Authorization", &auth)
            .json(&serde_json::json!({
                "habit_id": meditate.id,
                "date": today(),
                "completed": completed,
            }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
    }

    // The lazily created metric has neutral scores and exactly one log row.
    let day: DayResponse = client
        .get(format!("{}/api/metrics/day?date={}", server.base_url, today()))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(day.metric.mood, 5);
    assert_eq!(day.metric.momentum, 5.0);
    assert_eq!(day.habit_logs.len(), 1);
    assert!(!day.habit_logs[0].log.completed);
    assert_eq!(day.habit_logs[0].habit.name, "Meditate");

    // Overwrite the metric; momentum is recomputed.
    let metric: DailyMetric = client
        .put(format!("{}/api/metrics", server.base_url))
        .header("Authorization", &auth)
        .json(&serde_json::json!({
            "date": today(),
            "mood": 8,
            "energy": 6,
            "productivity": 7,
            "note": "solid day",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(metric.momentum, 7.0);
    assert_eq!(metric.note.as_deref(), Some("solid day"));

    // Reorder and verify the listing follows.
    let reordered: Vec<Habit> = client
        .post(format!("{}/api/habits/reorder", server.base_url))
        .header("Authorization", &auth)
        .json(&serde_json::json!({ "habit_ids": [read.id, meditate.id] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reordered[0].name, "Read");
    assert_eq!(reordered[1].name, "Meditate");
}

#[tokio::test]
async fn http_insights_and_soft_delete() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let token = sign_in(&client, &server.base_url, "insights@example.com").await;
    let auth = format!("Bearer {token}");

    let habit: Habit = client
        .post(format!("{}/api/habits", server.base_url))
        .header("Authorization", &auth)
        .json(&serde_json::json!({ "name": "Stretch", "type": "boolean", "color": "#F59E0B" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let response = client
        .post(format!("{}/api/habits/log", server.base_url))
        .header("Authorization", &auth)
        .json(&serde_json::json!({
            "habit_id": habit.id,
            "date": today(),
            "completed": true,
        }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let insights: HabitInsightsResponse = client
        .get(format!("{}/api/insights/habits?days=30", server.base_url))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(insights.overall.total_habits, 1);
    let stretch = insights.stats.iter().find(|s| s.name == "Stretch").unwrap();
    assert_eq!(stretch.current_streak, 1);
    assert!(stretch.completion_rate > 0.0);

    // Soft delete: gone from the listing, still joined on the historical day.
    let response = client
        .delete(format!("{}/api/habits/{}", server.base_url, habit.id))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let habits: Vec<Habit> = client
        .get(format!("{}/api/habits", server.base_url))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(habits.is_empty());

    let day: DayResponse = client
        .get(format!("{}/api/metrics/day?date={}", server.base_url, today()))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(day.habit_logs.len(), 1);
    assert_eq!(day.habit_logs[0].habit.name, "Stretch");
}

#[tokio::test]
async fn http_export_endpoints() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let token = sign_in(&client, &server.base_url, "export@example.com").await;
    let auth = format!("Bearer {token}");

    let response = client
        .put(format!("{}/api/metrics", server.base_url))
        .header("Authorization", &auth)
        .json(&serde_json::json!({
            "date": today(),
            "mood": 7,
            "energy": 7,
            "productivity": 7,
        }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = client
        .get(format!(
            "{}/api/export/csv?category=metrics&range=7d",
            server.base_url
        ))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let body = response.text().await.unwrap();
    assert!(body.starts_with("date,mood,energy,productivity,momentum,note"));
    assert!(body.contains(&today()));

    let response = client
        .get(format!("{}/api/export/json?range=all", server.base_url))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let bundle: serde_json::Value = response.json().await.unwrap();
    assert_eq!(bundle["export_info"]["range"], "All time");
    assert_eq!(bundle["metrics"].as_array().unwrap().len(), 1);

    // Unknown category is a structured validation error.
    let response = client
        .get(format!(
            "{}/api/export/csv?category=everything",
            server.base_url
        ))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Validation");
}

#[tokio::test]
async fn http_logout_revokes_the_session() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let token = sign_in(&client, &server.base_url, "logout@example.com").await;

    let response = client
        .post(format!("{}/api/auth/logout", server.base_url))
        .json(&serde_json::json!({ "token": token }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/api/habits", server.base_url))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}
