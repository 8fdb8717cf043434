#![cfg(test)]

use std::sync::Arc;

use async_trait::async_trait;
use autoreply_bot::{
    base::{
        config::{Config, ConfigInner},
        types::{Author, InboundMessage, Void},
    },
    interaction::message::process_message,
    runtime::Runtime,
    service::chat::{ChatClient, GenericChatClient},
    store::activity::{ActivityEvent, ActivityRecord},
};
use mockall::mock;
use parking_lot::Mutex;
use tempfile::TempDir;

// Mocks.

// Mock chat client for testing.

mock! {
    pub Chat {}

    #[async_trait]
    impl GenericChatClient for Chat {
        fn bot_user_id(&self) -> &str;
        async fn start(&self, runtime: Runtime) -> Void;
        async fn send_message(&self, channel_id: &str, text: &str) -> Void;
        async fn send_document(&self, channel_id: &str, title: &str, filename: &str, body: &str) -> Void;
    }
}

type Outbox = Arc<Mutex<Vec<(String, String)>>>;

fn get_mock_chat(outbox: Outbox) -> MockChat {
    let mut mock = MockChat::new();

    let messages = outbox.clone();
    let documents = outbox;

    mock.expect_bot_user_id().return_const("UBOT".to_string());
    mock.expect_start().returning(|_| Ok(()));
    mock.expect_send_message().returning(move |channel, text| {
        messages.lock().push((channel.to_string(), text.to_string()));
        Ok(())
    });
    mock.expect_send_document().returning(move |channel, title, filename, body| {
        documents.lock().push((channel.to_string(), format!("[{filename}] {title}\n{body}")));
        Ok(())
    });

    mock
}

const CONFIG: &str = r#"{
    "allowed_channels": ["C1", 200],
    "admin_user_id": ["UADMIN"],
    "log_channel_id": "CLOG",
    "system_log_channel_id": "CSYS"
}"#;

const RESPONSES: &str = r#"
hello:
  - "hi [userName]"
  - "yo [userName]"
ne: "short"
neta: "long"
"#;

struct TestEnv {
    dir: TempDir,
    runtime: Runtime,
    outbox: Outbox,
}

impl TestEnv {
    fn write(&self, name: &str, text: &str) {
        std::fs::write(self.dir.path().join(name), text).unwrap();
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.outbox.lock().clone()
    }

    fn sent_to(&self, channel: &str) -> Vec<String> {
        self.sent().into_iter().filter(|(c, _)| c == channel).map(|(_, t)| t).collect()
    }

    fn clear(&self) {
        self.outbox.lock().clear();
    }

    async fn say(&self, channel: &str, author: Author, text: &str) {
        let message = InboundMessage {
            channel_id: channel.to_string(),
            author,
            text: text.to_string(),
        };

        process_message(&message, &self.runtime).await.unwrap();
    }
}

/// Helper function to setup the test environment.
fn setup_test_environment() -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.json"), CONFIG).unwrap();
    std::fs::write(dir.path().join("responses.yml"), RESPONSES).unwrap();
    std::fs::write(dir.path().join("profiles.json"), r#"{ "U1": { "display_name": "Ann", "team": "infra" } }"#).unwrap();

    let config = Config {
        inner: Arc::new(ConfigInner {
            slack_app_token: "xapp-test".to_string(),
            slack_bot_token: "xoxb-test".to_string(),
            responses_path: dir.path().join("responses.yml"),
            access_config_path: dir.path().join("config.json"),
            activity_log_path: dir.path().join("bot_activity.log"),
            profiles_path: dir.path().join("profiles.json"),
            ..Default::default()
        }),
    };

    // We create a mocked version of the chat client that records everything it is asked to send.
    let outbox = Outbox::default();
    let chat = ChatClient::new(Arc::new(get_mock_chat(outbox.clone())));

    let runtime = Runtime::with_chat(config, chat).unwrap();

    TestEnv { dir, runtime, outbox }
}

fn ann() -> Author {
    Author::new("U1", "Ann")
}

fn bo() -> Author {
    Author::new("U2", "Bo")
}

fn admin() -> Author {
    Author::new("UADMIN", "Root")
}

#[tokio::test]
async fn test_trigger_reply_and_audit_notice() {
    let env = setup_test_environment();

    env.say("C1", ann(), "hello bot").await;

    let replies = env.sent_to("C1");
    assert_eq!(replies.len(), 1);
    assert!(replies[0] == "hi Ann" || replies[0] == "yo Ann");

    let notices = env.sent_to("CLOG");
    assert_eq!(notices.len(), 1);
    assert!(notices[0].contains("<@U1>"));
    assert!(notices[0].contains("`hello`"));
}

#[tokio::test]
async fn test_replies_do_not_repeat_back_to_back() {
    let env = setup_test_environment();

    for _ in 0..6 {
        env.say("C1", ann(), "hello").await;
    }

    let replies = env.sent_to("C1");
    assert_eq!(replies.len(), 6);
    for pair in replies.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
}

#[tokio::test]
async fn test_numeric_channel_ids_are_permitted() {
    let env = setup_test_environment();

    env.say("200", ann(), "neta").await;

    assert_eq!(env.sent_to("200").len(), 1);
}

#[tokio::test]
async fn test_overlapping_triggers_send_one_reply() {
    let env = setup_test_environment();

    env.say("C1", ann(), "this is neta").await;

    assert_eq!(env.sent_to("C1"), vec!["short".to_string()]);
}

#[tokio::test]
async fn test_ignores_unpermitted_channels_bots_and_self() {
    let env = setup_test_environment();

    env.say("C9", ann(), "hello").await;
    env.say("C1", Author::new("UBOT", "autoreply"), "hello").await;
    env.say(
        "C1",
        Author {
            is_bot: true,
            ..Author::new("B7", "other bot")
        },
        "hello",
    )
    .await;

    assert!(env.sent().is_empty());
    assert!(env.runtime.activity.read_lines().unwrap().iter().all(|l| !l.contains("Match:")));
}

#[tokio::test]
async fn test_log_reset_then_status_reports_only_the_marker() {
    let env = setup_test_environment();

    env.say("C1", ann(), "hello").await;
    env.say("C1", ann(), "!log-reset").await;
    env.clear();

    env.say("C1", ann(), "!status").await;

    let status = env.sent_to("C1");
    assert_eq!(status.len(), 1);
    assert!(status[0].contains("✅ OK: 0 / ❌ ERR: 0 / ⚠️ WARN: 0"));
    assert!(status[0].contains("Last 1 log lines"));
    assert!(status[0].contains("Log reset by Ann (U1)"));

    // The status command itself is recorded after it renders.
    let lines = env.runtime.activity.read_lines().unwrap();
    assert_eq!(lines.len(), 2);
    let last = ActivityRecord::parse(&lines[1]).unwrap();
    assert_eq!(last.event(), Some(ActivityEvent::Command { name: "status", by: "Ann (U1)" }));
}

#[tokio::test]
async fn test_status_counts_matches() {
    let env = setup_test_environment();
    env.runtime.activity.reset("setup").unwrap();

    env.say("C1", ann(), "hello").await;
    env.say("C1", bo(), "neta").await;
    env.clear();

    env.say("C1", ann(), "!status").await;

    let status = &env.sent_to("C1")[0];
    assert!(status.contains("✅ OK: 2 / ❌ ERR: 0 / ⚠️ WARN: 0"));
    assert!(status.contains("*Responses:* 2"));
}

#[tokio::test]
async fn test_restart_requires_an_admin() {
    let env = setup_test_environment();

    env.say("C1", bo(), "!restart").await;

    let replies = env.sent_to("C1");
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("⛔"));

    let lines = env.runtime.activity.read_lines().unwrap();
    assert!(lines.iter().any(|l| l.contains("[WARNING] Denied: restart by Bo (U2)")));

    env.clear();
    env.say("C1", admin(), "!restart").await;
    assert_eq!(env.sent_to("C1"), vec!["♻️ Restarting ...".to_string()]);

    // The restart record is written exactly once.
    let lines = env.runtime.activity.read_lines().unwrap();
    let records: Vec<_> = lines.iter().filter(|l| l.contains("Command: restart by Root (UADMIN)")).collect();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_admin_only_commands_follow_the_config() {
    let env = setup_test_environment();
    env.write("config.json", r#"{ "allowed_channels": ["C1"], "admin_user_id": "UADMIN", "admin_only_commands": ["status"] }"#);
    env.say("C1", ann(), "!reload").await;
    env.clear();

    env.say("C1", ann(), "!status").await;
    assert!(env.sent_to("C1")[0].starts_with("⛔"));

    env.clear();
    env.say("C1", admin(), "!status").await;
    assert!(env.sent_to("C1")[0].contains("Bot Status Report"));
}

#[tokio::test]
async fn test_reload_with_bad_config_keeps_old_config() {
    let env = setup_test_environment();
    env.write("config.json", "{ not json");
    env.write("responses.yml", "bye: \"see you [userName]\"\n");

    env.say("C1", ann(), "!reload").await;

    let reply = &env.sent_to("C1")[0];
    assert!(reply.contains("❌ config kept: `config.json` is malformed"));
    assert!(reply.contains("✅ 1 triggers reloaded"));
    assert_eq!(env.sent_to("CSYS").len(), 1);

    // Old config still permits C1; the new table is live.
    env.clear();
    env.say("C1", ann(), "bye now").await;
    env.say("C1", ann(), "hello").await;
    assert_eq!(env.sent_to("C1"), vec!["see you Ann".to_string()]);
}

#[tokio::test]
async fn test_detailed_report_sends_document_and_summary() {
    let env = setup_test_environment();

    env.say("C1", ann(), "hello").await;
    env.say("C1", ann(), "hello").await;
    env.say("C1", bo(), "neta").await;
    env.clear();

    env.say("C1", ann(), "!monthly-report").await;

    let sent = env.sent_to("C1");
    assert_eq!(sent.len(), 2);
    let today = chrono::Local::now().date_naive();
    assert!(sent[0].starts_with(&format!("[activity-report-{today}.md] Activity report (30 days)")));
    assert!(sent[0].contains("1. `hello`: 2"));
    assert!(sent[0].contains("2. `ne`: 1"));
    assert!(sent[0].contains("Response variations: 4"));
    assert!(sent[1].contains("top trigger `hello` (2)"));
}

#[tokio::test]
async fn test_user_info_lookup() {
    let env = setup_test_environment();

    env.say("C1", bo(), "!user-info <@U1>").await;
    env.say("C1", bo(), "!user-info nobody").await;

    let sent = env.sent_to("C1");
    assert!(sent[0].contains("Ann"));
    assert!(sent[0].contains("*team:* infra"));
    assert_eq!(sent[1], "No profile found for `nobody`.");
}

#[tokio::test]
async fn test_failed_command_renders_a_readable_message() {
    let env = setup_test_environment();
    env.write("profiles.json", "[ broken");

    env.say("C1", bo(), "!user-info Ann").await;

    assert_eq!(env.sent_to("C1"), vec!["❌ `user-info` failed; see the activity log for details.".to_string()]);
    let lines = env.runtime.activity.read_lines().unwrap();
    assert!(lines.iter().any(|l| l.contains("[ERROR] Command user-info failed")));
}
