//! Integration tests for file relay.
//!
//! The server never interprets file content: it stamps the sender onto each
//! frame, routes by group over `to` over broadcast, and announces transfers
//! with a notice ahead of the `file_info` frame to the same audience.

mod common;

use std::time::Duration;

use common::TestServer;
use papo_proto::Message;

fn info(to: Option<&str>, group: Option<&str>) -> Message {
    Message::FileInfo {
        name: Some("notes.txt".into()),
        size: Some(11),
        from: None,
        to: to.map(Into::into),
        group: group.map(Into::into),
    }
}

#[tokio::test]
async fn test_broadcast_file_flow() {
    let server = TestServer::spawn().await.expect("failed to spawn server");

    let mut alice = server.join("alice").await.expect("join failed");
    let mut bob = server.join("bob").await.expect("join failed");
    let mut carol = server.join("carol").await.expect("join failed");
    alice.recv().await.expect("no notice"); // bob joined
    alice.recv().await.expect("no notice"); // carol joined
    bob.recv().await.expect("no notice"); // carol joined

    // The client-supplied `from` is attacker-controlled and must be replaced.
    alice
        .send(&Message::FileInfo {
            name: Some("notes.txt".into()),
            size: Some(11),
            from: Some("mallory".into()),
            to: None,
            group: None,
        })
        .await
        .expect("send failed");
    alice
        .send(&Message::FileData {
            name: Some("notes.txt".into()),
            data: Some("aGVsbG8gd29ybGQ=".into()),
            from: None,
            to: None,
            group: None,
        })
        .await
        .expect("send failed");
    alice
        .send(&Message::FileEnd {
            name: Some("notes.txt".into()),
            from: None,
            to: None,
            group: None,
        })
        .await
        .expect("send failed");

    for receiver in [&mut bob, &mut carol] {
        let notice = receiver.recv().await.expect("no notice");
        assert_eq!(
            notice,
            Message::system("alice is sending file 'notes.txt' (11 bytes)")
        );

        let info = receiver.recv().await.expect("no file_info");
        assert_eq!(
            info,
            Message::FileInfo {
                name: Some("notes.txt".into()),
                size: Some(11),
                from: Some("alice".into()),
                to: None,
                group: None,
            }
        );

        let data = receiver.recv().await.expect("no file_data");
        assert_eq!(
            data,
            Message::FileData {
                name: Some("notes.txt".into()),
                data: Some("aGVsbG8gd29ybGQ=".into()),
                from: Some("alice".into()),
                to: None,
                group: None,
            }
        );

        let end = receiver.recv().await.expect("no file_end");
        assert_eq!(
            end,
            Message::FileEnd {
                name: Some("notes.txt".into()),
                from: Some("alice".into()),
                to: None,
                group: None,
            }
        );
    }

    // No echo back to the sender.
    alice.assert_silent(Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_private_file_keeps_to() {
    let server = TestServer::spawn().await.expect("failed to spawn server");

    let mut alice = server.join("alice").await.expect("join failed");
    let mut bob = server.join("bob").await.expect("join failed");
    let mut carol = server.join("carol").await.expect("join failed");
    alice.recv().await.expect("no notice"); // bob joined
    alice.recv().await.expect("no notice"); // carol joined
    bob.recv().await.expect("no notice"); // carol joined

    alice
        .send(&info(Some("bob"), None))
        .await
        .expect("send failed");

    let notice = bob.recv().await.expect("no notice");
    assert_eq!(
        notice,
        Message::system("alice is sending file 'notes.txt' (11 bytes)")
    );
    let received = bob.recv().await.expect("no file_info");
    assert_eq!(
        received,
        Message::FileInfo {
            name: Some("notes.txt".into()),
            size: Some(11),
            from: Some("alice".into()),
            to: Some("bob".into()),
            group: None,
        }
    );

    // Addressed delivery: nothing for bystanders, nothing back to the sender.
    carol.assert_silent(Duration::from_millis(300)).await;
    alice.assert_silent(Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_group_file_reaches_members_only() {
    let server = TestServer::spawn().await.expect("failed to spawn server");

    let mut alice = server.join("alice").await.expect("join failed");
    let mut bob = server.join("bob").await.expect("join failed");
    let mut carol = server.join("carol").await.expect("join failed");
    alice.recv().await.expect("no notice"); // bob joined
    alice.recv().await.expect("no notice"); // carol joined
    bob.recv().await.expect("no notice"); // carol joined

    alice
        .send(&Message::CreateGroup {
            group: Some("devs".into()),
        })
        .await
        .expect("send failed");
    alice.recv().await.expect("no reply"); // group 'devs' created
    bob.send(&Message::JoinGroup {
        group: Some("devs".into()),
    })
    .await
    .expect("send failed");
    bob.recv().await.expect("no reply"); // joined group 'devs'

    alice
        .send(&info(None, Some("devs")))
        .await
        .expect("send failed");

    let notice = bob.recv().await.expect("no notice");
    assert_eq!(
        notice,
        Message::system("alice is sending file 'notes.txt' (11 bytes)")
    );
    let received = bob.recv().await.expect("no file_info");
    assert_eq!(
        received,
        Message::FileInfo {
            name: Some("notes.txt".into()),
            size: Some(11),
            from: Some("alice".into()),
            to: None,
            group: Some("devs".into()),
        }
    );

    carol.assert_silent(Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_file_to_missing_user() {
    let server = TestServer::spawn().await.expect("failed to spawn server");

    let mut alice = server.join("alice").await.expect("join failed");
    let mut bob = server.join("bob").await.expect("join failed");
    alice.recv().await.expect("no notice"); // bob joined

    alice
        .send(&info(Some("ghost"), None))
        .await
        .expect("send failed");

    let reply = alice.recv().await.expect("no reply");
    assert_eq!(reply, Message::error("user_not_found"));

    // An unresolvable target never downgrades to a broadcast.
    bob.assert_silent(Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_group_outranks_to_and_never_falls_back() {
    let server = TestServer::spawn().await.expect("failed to spawn server");

    let mut alice = server.join("alice").await.expect("join failed");
    let mut bob = server.join("bob").await.expect("join failed");
    alice.recv().await.expect("no notice"); // bob joined

    // `group` wins even though `to` names a perfectly reachable user.
    alice
        .send(&info(Some("bob"), Some("nope")))
        .await
        .expect("send failed");

    let reply = alice.recv().await.expect("no reply");
    assert_eq!(reply, Message::error("grupo_inexistente"));
    bob.assert_silent(Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_data_frame_alone_is_relayed_without_notice() {
    let server = TestServer::spawn().await.expect("failed to spawn server");

    let mut alice = server.join("alice").await.expect("join failed");
    let mut bob = server.join("bob").await.expect("join failed");
    alice.recv().await.expect("no notice"); // bob joined

    // Only file_info earns a notice; chunks for a transfer the server never
    // saw announced still flow through.
    alice
        .send(&Message::FileData {
            name: Some("notes.txt".into()),
            data: Some("aGVsbG8gd29ybGQ=".into()),
            from: None,
            to: None,
            group: None,
        })
        .await
        .expect("send failed");

    let received = bob.recv().await.expect("no file_data");
    assert_eq!(
        received,
        Message::FileData {
            name: Some("notes.txt".into()),
            data: Some("aGVsbG8gd29ybGQ=".into()),
            from: Some("alice".into()),
            to: None,
            group: None,
        }
    );
}

#[tokio::test]
async fn test_notice_fallbacks_for_nameless_info() {
    let server = TestServer::spawn().await.expect("failed to spawn server");

    let mut alice = server.join("alice").await.expect("join failed");
    let mut bob = server.join("bob").await.expect("join failed");
    alice.recv().await.expect("no notice"); // bob joined

    alice
        .send_raw(r#"{"type":"file_info"}"#)
        .await
        .expect("send failed");

    let notice = bob.recv().await.expect("no notice");
    assert_eq!(notice, Message::system("alice is sending file '?' (0 bytes)"));
    let received = bob.recv().await.expect("no file_info");
    assert_eq!(
        received,
        Message::FileInfo {
            name: None,
            size: None,
            from: Some("alice".into()),
            to: None,
            group: None,
        }
    );
}
