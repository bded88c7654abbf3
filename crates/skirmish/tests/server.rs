//! Integration tests for the server, handler, and full connection flow.
//!
//! Each test starts a real server on an OS-assigned port and talks to it
//! with plain TCP clients speaking the line protocol.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use skirmish::prelude::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

/// How long to wait for a line that should arrive.
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to listen before concluding nothing more is coming.
const QUIET_PERIOD: Duration = Duration::from_millis(100);

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    let server = SkirmishServerBuilder::new()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    /// Connects and sends `nickname` as the registration line.
    async fn join(addr: &str, nickname: &str) -> Self {
        let stream = TcpStream::connect(addr).await.expect("should connect");
        let (read_half, writer) = stream.into_split();
        let mut client = Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        };
        client.send(nickname).await;
        client
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("write should succeed");
    }

    async fn recv(&mut self) -> String {
        tokio::time::timeout(RECV_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .expect("read should succeed")
            .expect("connection closed unexpectedly")
    }

    /// Asserts that nothing arrives for a short while.
    async fn expect_quiet(&mut self) {
        if let Ok(line) = tokio::time::timeout(QUIET_PERIOD, self.lines.next_line()).await {
            panic!("expected silence, got {line:?}");
        }
    }

    /// Reads until `prefix` shows up, returning that line.
    async fn recv_starting_with(&mut self, prefix: &str) -> String {
        loop {
            let line = self.recv().await;
            if line.starts_with(prefix) {
                return line;
            }
        }
    }

    /// Everything that arrives before the connection goes quiet.
    async fn drain(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(next) = tokio::time::timeout(QUIET_PERIOD * 3, self.lines.next_line()).await {
            match next.expect("read should succeed") {
                Some(line) => lines.push(line),
                None => break,
            }
        }
        lines
    }

    /// Waits for the server to close the connection.
    async fn expect_closed(&mut self) {
        let next = tokio::time::timeout(RECV_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for close");
        assert!(matches!(next, Ok(None)), "expected EOF, got {next:?}");
    }
}

/// Joins `Alice` then `Bob`, consuming Bob's arrival notice at Alice so
/// both are known to be registered.
async fn alice_and_bob(addr: &str) -> (Client, Client) {
    let mut alice = Client::join(addr, "Alice").await;
    // Alice is registered once the server has read her name; LOOK proves it.
    alice.send("LOOK").await;
    assert_eq!(alice.recv().await, "Players in Tavern: Alice");

    let bob = Client::join(addr, "Bob").await;
    assert_eq!(alice.recv().await, "[SERVER] Bob has entered Tavern.");
    (alice, bob)
}

// =========================================================================
// Registration and presence
// =========================================================================

#[tokio::test]
async fn test_register_duplicate_name_gets_suffix() {
    let addr = start_server().await;
    let mut first = Client::join(&addr, "Bob").await;
    first.send("LOOK").await;
    assert_eq!(first.recv().await, "Players in Tavern: Bob");

    let mut second = Client::join(&addr, "Bob").await;

    assert_eq!(
        second.recv().await,
        "[SERVER] Nickname 'Bob' is taken. You are now known as 'Bob1'."
    );
    assert_eq!(first.recv().await, "[SERVER] Bob1 has entered Tavern.");
}

#[tokio::test]
async fn test_register_empty_name_falls_back_to_connection_name() {
    let addr = start_server().await;
    let mut alice = Client::join(&addr, "Alice").await;
    alice.send("LOOK").await;
    alice.recv().await;

    let _anon = Client::join(&addr, "   ").await;

    let notice = alice.recv().await;
    assert!(notice.starts_with("[SERVER] Player conn-"), "got {notice:?}");
    assert!(notice.ends_with(" has entered Tavern."), "got {notice:?}");
}

#[tokio::test]
async fn test_disconnect_broadcasts_left_chat() {
    let addr = start_server().await;
    let (mut alice, bob) = alice_and_bob(&addr).await;

    drop(bob);

    assert_eq!(alice.recv().await, "[SERVER] Bob has left the chat.");
    alice.send("LOOK").await;
    assert_eq!(alice.recv().await, "Players in Tavern: Alice");
}

#[tokio::test]
async fn test_quit_closes_connection_and_frees_name() {
    let addr = start_server().await;
    let (mut alice, mut bob) = alice_and_bob(&addr).await;

    bob.send("QUIT").await;

    bob.expect_closed().await;
    assert_eq!(alice.recv().await, "[SERVER] Bob has left the chat.");

    let mut bob_again = Client::join(&addr, "Bob").await;
    assert_eq!(alice.recv().await, "[SERVER] Bob has entered Tavern.");
    bob_again.expect_quiet().await;
}

// =========================================================================
// Locations
// =========================================================================

#[tokio::test]
async fn test_go_moves_and_look_is_scoped() {
    let addr = start_server().await;
    let (mut alice, mut bob) = alice_and_bob(&addr).await;

    bob.send("GO Forest").await;

    assert_eq!(bob.recv().await, "[SERVER] You have entered Forest");
    assert_eq!(alice.recv().await, "[SERVER] Bob has left Tavern and entered Forest.");

    alice.send("LOOK").await;
    assert_eq!(alice.recv().await, "Players in Tavern: Alice");
    bob.send("LOOK").await;
    assert_eq!(bob.recv().await, "Players in Forest: Bob");
}

#[tokio::test]
async fn test_go_same_or_unknown_location_rejected() {
    let addr = start_server().await;
    let (mut alice, mut bob) = alice_and_bob(&addr).await;

    alice.send("GO Tavern").await;
    assert_eq!(alice.recv().await, "[SERVER] Invalid location or already there.");
    alice.send("GO Nowhere").await;
    assert_eq!(alice.recv().await, "[SERVER] Invalid location or already there.");

    bob.expect_quiet().await;
}

#[tokio::test]
async fn test_say_reaches_same_location_only() {
    let addr = start_server().await;
    let (mut alice, mut bob) = alice_and_bob(&addr).await;
    let mut carol = Client::join(&addr, "Carol").await;
    assert_eq!(alice.recv().await, "[SERVER] Carol has entered Tavern.");
    assert_eq!(bob.recv().await, "[SERVER] Carol has entered Tavern.");
    carol.send("GO Forest").await;
    assert_eq!(carol.recv().await, "[SERVER] You have entered Forest");
    alice.recv().await;
    bob.recv().await;

    alice.send("SAY anyone here?").await;

    assert_eq!(bob.recv().await, "[Tavern] Alice: anyone here?");
    carol.expect_quiet().await;
    alice.expect_quiet().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_register_concurrent_duplicates_get_distinct_names() {
    const CLIENTS: usize = 12;
    let addr = start_server().await;

    let joins = (0..CLIENTS).map(|_| {
        let addr = addr.clone();
        tokio::spawn(async move {
            let mut client = Client::join(&addr, "Bob").await;
            client.send("LOOK").await;
            client.recv_starting_with("Players in Tavern: ").await;
            client
        })
    });
    let mut clients = Vec::new();
    for join in joins.collect::<Vec<_>>() {
        clients.push(join.await.expect("join task"));
    }

    let mut watcher = Client::join(&addr, "Watcher").await;
    watcher.send("LOOK").await;
    let look = watcher.recv_starting_with("Players in Tavern: ").await;

    let names: Vec<&str> = look["Players in Tavern: ".len()..].split(", ").collect();
    let distinct: std::collections::HashSet<&str> = names.iter().copied().collect();
    assert_eq!(names.len(), CLIENTS + 1, "got {look:?}");
    assert_eq!(distinct.len(), CLIENTS + 1, "got {look:?}");
    assert!(distinct.contains("Bob"));
    for name in names.iter().filter(|n| **n != "Watcher") {
        let suffix = &name["Bob".len()..];
        assert!(suffix.chars().all(|c| c.is_ascii_digit()), "got {name:?}");
    }
    drop(clients);
}

// =========================================================================
// Combat
// =========================================================================

#[tokio::test]
async fn test_attack_heal_attack_scenario() {
    let addr = start_server().await;
    let (mut alice, mut bob) = alice_and_bob(&addr).await;

    alice.send("ATTACK Bob").await;
    assert_eq!(alice.recv().await, "You have attacked Bob for 10 dmg");
    assert_eq!(bob.recv().await, "Alice has attacked you for 10 dmg. Remaining health: 20");

    bob.send("HEAL").await;
    assert_eq!(bob.recv().await, "You have healed for 6 health");
    assert_eq!(
        alice.recv().await,
        "Bob has healed for 6 health. Their remaining health is now: 26"
    );

    alice.send("ATTACK").await;
    assert_eq!(alice.recv().await, "You have attacked Bob for 10 dmg");
    assert_eq!(bob.recv().await, "Alice has attacked you for 10 dmg. Remaining health: 16");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simultaneous_actions_alternate_turns() {
    const ACTIONS: usize = 40;
    let addr = start_server().await;
    let (mut alice, mut bob) = alice_and_bob(&addr).await;
    alice.send("ATTACK Bob").await;
    alice.recv().await;
    bob.recv().await;

    // Both fire every line at once; nothing here can kill.
    let burst: String = (0..ACTIONS)
        .map(|i| if i % 2 == 0 { "HEAL\n" } else { "DEFEND\n" })
        .collect();
    let (ra, rb) = tokio::join!(
        alice.writer.write_all(burst.as_bytes()),
        bob.writer.write_all(burst.as_bytes()),
    );
    ra.expect("alice write");
    rb.expect("bob write");
    let (alice_lines, bob_lines) = tokio::join!(alice.drain(), bob.drain());

    let acted = |lines: &[String]| {
        lines
            .iter()
            .filter(|l| l.starts_with("You have healed") || l.as_str() == "You have entered a defensive stance")
            .count()
    };
    let waited = |lines: &[String], other: &str| {
        lines.iter().filter(|l| **l == format!("Waiting for {other}")).count()
    };
    let (alice_acted, bob_acted) = (acted(&alice_lines), acted(&bob_lines));

    // Every line got exactly one answer.
    assert_eq!(alice_acted + waited(&alice_lines, "Bob"), ACTIONS);
    assert_eq!(bob_acted + waited(&bob_lines, "Alice"), ACTIONS);
    // Bob held the turn first, so turns taken differ by at most his lead.
    assert!(bob_acted == alice_acted || bob_acted == alice_acted + 1);
    for line in alice_lines.iter().chain(&bob_lines) {
        if let Some(health) = line.split("remaining health is now: ").nth(1) {
            let health: u32 = health.parse().expect("health");
            assert!(health <= 30, "got {line:?}");
        }
    }

    // Exactly one of them holds the turn now.
    let (mut holder, mut waiter, waiting_on) = if bob_acted == alice_acted {
        (bob, alice, "Bob")
    } else {
        (alice, bob, "Alice")
    };
    waiter.send("DEFEND").await;
    assert_eq!(waiter.recv().await, format!("Waiting for {waiting_on}"));
    holder.send("DEFEND").await;
    assert_eq!(holder.recv().await, "You have entered a defensive stance");
}

#[tokio::test]
async fn test_acting_out_of_turn_waits() {
    let addr = start_server().await;
    let (mut alice, mut bob) = alice_and_bob(&addr).await;
    alice.send("ATTACK Bob").await;
    alice.recv().await;
    bob.recv().await;

    alice.send("ATTACK").await;

    assert_eq!(alice.recv().await, "Waiting for Bob");
    bob.expect_quiet().await;
}

#[tokio::test]
async fn test_attack_target_in_other_location_not_in_range() {
    let addr = start_server().await;
    let (mut alice, mut bob) = alice_and_bob(&addr).await;
    bob.send("GO Forest").await;
    bob.recv().await;
    alice.recv().await;

    alice.send("ATTACK Bob").await;
    assert_eq!(alice.recv().await, "Target is not in range");
    alice.send("ATTACK Nobody").await;
    assert_eq!(alice.recv().await, "Target player not found");
}

#[tokio::test]
async fn test_attack_while_idle_usage_and_heal_rejected() {
    let addr = start_server().await;
    let (mut alice, _bob) = alice_and_bob(&addr).await;

    alice.send("ATTACK").await;
    assert_eq!(alice.recv().await, "[SERVER] Usage: ATTACK <username>");
    alice.send("HEAL").await;
    assert_eq!(alice.recv().await, "You can only heal in battle.");
    alice.send("DEFEND").await;
    assert_eq!(alice.recv().await, "You can only defend in battle.");
}

#[tokio::test]
async fn test_disconnect_mid_fight_releases_survivor_holding_turn() {
    let addr = start_server().await;
    let (mut alice, mut bob) = alice_and_bob(&addr).await;
    alice.send("ATTACK Bob").await;
    alice.recv().await;
    bob.recv().await;
    bob.send("DEFEND").await;
    bob.recv().await;
    assert_eq!(alice.recv().await, "Bob has entered a defensive stance.");

    drop(bob);
    assert_eq!(alice.recv().await, "[SERVER] Bob has left the chat.");

    alice.send("ATTACK").await;
    assert_eq!(alice.recv().await, "Bob is no longer in battle.");
    alice.send("STATS").await;
    assert_eq!(
        alice.recv().await,
        "Level 1 | Health 30/30 | Attack 15 | Defense 5 | Experience 0 (100 to next level)"
    );
}

// =========================================================================
// WebSocket
// =========================================================================

#[tokio::test]
async fn test_websocket_clients_share_the_world() {
    let server = SkirmishServerBuilder::new()
        .bind("127.0.0.1:0")
        .build_websocket()
        .await
        .expect("server should build");
    let addr = server.local_addr().expect("local addr").to_string();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let (mut alice, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    alice.send(Message::text("Alice")).await.unwrap();
    alice.send(Message::text("LOOK")).await.unwrap();
    let reply = alice.next().await.expect("frame").expect("ok");
    assert_eq!(reply.into_text().unwrap().as_str(), "Players in Tavern: Alice");

    let (mut bob, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    bob.send(Message::text("Bob")).await.unwrap();

    let notice = alice.next().await.expect("frame").expect("ok");
    assert_eq!(notice.into_text().unwrap().as_str(), "[SERVER] Bob has entered Tavern.");
}
