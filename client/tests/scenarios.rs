use std::time::Duration;

use anchor_lang::prelude::Pubkey;
use chrono::{TimeDelta, Utc};
use message_bottle::errors::BottleError;
use message_bottle::utils::{MAX_INLINE_CONTENT_BYTES, PACKET_DATA_SIZE};
use message_bottle_client::{
    BottleClient, BottleRecord, CacheKey, ClientConfig, ClientError, LedgerEvent, LedgerSource,
    Locale, MemoryLedger,
};

fn setup() -> (BottleClient<MemoryLedger>, Pubkey) {
    let admin = Pubkey::new_unique();
    let client = BottleClient::new(MemoryLedger::new(admin), ClientConfig::default());
    (client, admin)
}

fn ledger(client: &BottleClient<MemoryLedger>) -> &MemoryLedger {
    client.source()
}

#[tokio::test]
async fn send_creates_one_active_bottle() {
    let (client, _) = setup();
    let alice = Pubkey::new_unique();

    for n in 1..=3u64 {
        let before = client.get_active_bottle_count().await.unwrap();
        let sent = client.send_bottle(&alice, "hello from the shore").await.unwrap();
        assert_eq!(sent.bottle_id, n);
        assert_eq!(sent.sender, alice);

        let bottle = client.get_bottle(n).await.unwrap();
        assert!(bottle.active);
        assert_eq!(bottle.reply_count, 0);
        assert_eq!(bottle.content, "hello from the shore");
        assert_eq!(client.get_active_bottle_count().await.unwrap(), before + 1);
    }
    assert_eq!(client.get_bottle_count().await.unwrap(), 3);
    assert_eq!(client.get_user_bottles(&alice).await.unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn invalid_content_never_reaches_the_ledger() {
    let (client, _) = setup();
    let alice = Pubkey::new_unique();

    let err = client.send_bottle(&alice, "   \n\t").await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(BottleError::EmptyContent)));

    let err = client.send_bottle(&alice, &"x".repeat(1001)).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(BottleError::ContentTooLong)));
    assert_eq!(ledger(&client).call_count(), 0);

    // the limit counts characters, not bytes
    client.send_bottle(&alice, &"é".repeat(1000)).await.unwrap();
}

#[tokio::test]
async fn out_of_range_ids_are_not_found() {
    let (client, _) = setup();
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    client.send_bottle(&alice, "only one").await.unwrap();

    for id in [0, 2, 99] {
        assert!(matches!(
            client.get_bottle(id).await,
            Err(ClientError::Rejected(BottleError::BottleNotFound))
        ));
        assert!(matches!(
            client.get_bottle_replies(id).await,
            Err(ClientError::Rejected(BottleError::BottleNotFound))
        ));
        assert!(matches!(
            client.get_user_bottle_state(&bob, id).await,
            Err(ClientError::Rejected(BottleError::BottleNotFound))
        ));
        assert!(matches!(
            client.has_user_replied_to_bottle(&bob, id).await,
            Err(ClientError::Rejected(BottleError::BottleNotFound))
        ));
        assert!(matches!(
            client.reply_to_bottle(&bob, id, "anyone?").await,
            Err(ClientError::Rejected(BottleError::BottleNotFound))
        ));
    }
    assert!(matches!(
        client.get_reply(1).await,
        Err(ClientError::Rejected(BottleError::ReplyNotFound))
    ));
    assert!(matches!(
        client.reply_to_reply(&bob, 1, "hello?").await,
        Err(ClientError::Rejected(BottleError::ReplyNotFound))
    ));
}

#[tokio::test]
async fn second_reply_is_a_duplicate_but_others_may_reply() {
    let (client, _) = setup();
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    let carol = Pubkey::new_unique();
    client.send_bottle(&alice, "anyone out there?").await.unwrap();

    let first = client.reply_to_bottle(&bob, 1, "yes!").await.unwrap();
    assert_eq!(first.reply_id, 1);
    assert_eq!(first.parent_reply_id, 0);
    assert!(client.has_user_replied_to_bottle(&bob, 1).await.unwrap());

    let err = client.reply_to_bottle(&bob, 1, "me again").await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(BottleError::AlreadyReplied)));
    assert!(client.describe(&err).contains("already replied"));

    let second = client.reply_to_bottle(&carol, 1, "me too").await.unwrap();
    assert_eq!(second.reply_id, 2);

    let bottle = client.get_bottle(1).await.unwrap();
    assert_eq!(bottle.reply_count, 2);
    assert_eq!(client.get_bottle_replies(1).await.unwrap(), vec![1, 2]);
    assert_eq!(client.get_total_replies().await.unwrap(), 2);
    assert_eq!(client.get_user_replies(&bob).await.unwrap(), vec![1]);

    let flags = client.get_user_bottle_state(&bob, 1).await.unwrap();
    assert!(flags.has_viewed && flags.has_replied && !flags.has_skipped);

    let err = client.reply_to_bottle(&alice, 1, "talking to myself").await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(BottleError::CannotReplyOwnBottle)));
}

#[tokio::test]
async fn threaded_replies_bypass_the_guard() {
    let (client, _) = setup();
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    client.send_bottle(&alice, "ahoy").await.unwrap();
    client.reply_to_bottle(&bob, 1, "ahoy yourself").await.unwrap();

    let back = client.reply_to_reply(&alice, 1, "nice to meet you").await.unwrap();
    assert_eq!(back.bottle_id, 1);
    assert_eq!(back.parent_reply_id, 1);

    client.reply_to_reply(&bob, back.reply_id, "likewise").await.unwrap();
    client.reply_to_reply(&bob, back.reply_id, "where are you?").await.unwrap();

    let err = client
        .reply_to_reply(&alice, back.reply_id, "echo")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Rejected(BottleError::CannotReplyOwnReply)));

    let thread = client.get_thread(1).await.unwrap();
    assert_eq!(thread.len(), 4);
    assert!(!thread[0].is_threaded());
    assert!(thread[1..].iter().all(|r| r.is_threaded()));
    assert_eq!(client.get_bottle(1).await.unwrap().reply_count, 4);
    assert_eq!(client.get_user_replies(&alice).await.unwrap(), vec![2]);
}

#[tokio::test]
async fn deactivation_takes_a_bottle_out_of_the_sea() {
    let (client, _) = setup();
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    for text in ["one", "two", "three"] {
        client.send_bottle(&alice, text).await.unwrap();
    }

    let err = client.deactivate_bottle(&bob, 1).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(BottleError::NotBottleOwner)));

    // warm the cache so the write has something to invalidate
    assert!(client.get_bottle(1).await.unwrap().active);

    let event = client.deactivate_bottle(&alice, 1).await.unwrap();
    assert_eq!(event.bottle_id, 1);
    assert!(!client.get_bottle(1).await.unwrap().active);
    assert_eq!(client.get_active_bottle_count().await.unwrap(), 2);
    assert_eq!(client.get_bottle_count().await.unwrap(), 3);

    for _ in 0..20 {
        let id = client.source().get_random_bottle(&bob).await.unwrap();
        assert_ne!(id, 1);
    }

    for result in [
        client.reply_to_bottle(&bob, 1, "too late").await.map(|_| ()),
        client.open_bottle(&bob, 1).await.map(|_| ()),
        client.skip_on_chain(&bob, 1).await.map(|_| ()),
        client.deactivate_bottle(&alice, 1).await.map(|_| ()),
    ] {
        assert!(matches!(
            result,
            Err(ClientError::Rejected(BottleError::BottleInactive))
        ));
    }
}

#[tokio::test]
async fn swap_remove_keeps_reverse_index_consistent() {
    let (client, _) = setup();
    let alice = Pubkey::new_unique();
    for n in 0..5 {
        client.send_bottle(&alice, &format!("bottle {n}")).await.unwrap();
    }

    client.deactivate_bottle(&alice, 2).await.unwrap();
    assert_eq!(ledger(&client).active_bottle_ids().await, vec![1, 5, 3, 4]);

    client.deactivate_bottle(&alice, 4).await.unwrap();
    client.deactivate_bottle(&alice, 1).await.unwrap();

    let active = ledger(&client).active_bottle_ids().await;
    assert_eq!(active.len(), 2);
    for (slot, id) in active.iter().enumerate() {
        assert_eq!(ledger(&client).active_slot(*id).await.unwrap(), slot as u32);
    }
}

#[tokio::test]
async fn sender_of_the_only_bottle_cannot_draw() {
    let (client, _) = setup();
    let alice = Pubkey::new_unique();

    let err = client.discover(&alice).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(BottleError::NoBottlesAvailable)));

    client.send_bottle(&alice, "lonely").await.unwrap();
    for _ in 0..5 {
        assert!(matches!(
            client.source().get_random_bottle(&alice).await,
            Err(ClientError::Rejected(BottleError::CannotViewOwnBottle))
        ));
    }

    let before = ledger(&client).call_count();
    let err = client.discover(&alice).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(BottleError::CannotViewOwnBottle)));
    // one draw per configured attempt
    assert_eq!(ledger(&client).call_count() - before, 3);
}

#[tokio::test]
async fn draws_only_return_active_bottles_of_others() {
    let (client, _) = setup();
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    for text in ["a", "b", "c"] {
        client.send_bottle(&alice, text).await.unwrap();
    }

    for _ in 0..5 {
        let found = client.discover(&bob).await.unwrap();
        assert!(!found.exhausted);
        assert_eq!(found.attempts, 1);
        assert_eq!(found.bottle.sender, alice);
        assert!(found.bottle.active);
        assert!((1..=3).contains(&found.bottle.id));
    }
}

#[tokio::test]
async fn discovery_rerolls_handled_bottles_then_gives_up() {
    let (client, _) = setup();
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    client.send_bottle(&alice, "just one").await.unwrap();

    assert!(client.skip_locally(&bob, 1).await);
    assert!(!client.skip_locally(&bob, 1).await);
    assert!(client.is_skipped_locally(&bob, 1).await);

    let found = client.discover(&bob).await.unwrap();
    assert!(found.exhausted);
    assert_eq!(found.attempts, 3);
    assert_eq!(found.bottle.id, 1);

    // a local skip leaves no trace on the ledger
    let flags = client.get_user_bottle_state(&bob, 1).await.unwrap();
    assert!(!flags.has_skipped);
}

#[tokio::test]
async fn skip_rules() {
    let (client, _) = setup();
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    let carol = Pubkey::new_unique();
    client.send_bottle(&alice, "skip me").await.unwrap();

    let event = client.skip_on_chain(&bob, 1).await.unwrap();
    assert_eq!(event.skipper, bob);
    assert!(client.is_skipped_locally(&bob, 1).await);
    assert!(client.get_user_bottle_state(&bob, 1).await.unwrap().has_skipped);

    let err = client.skip_on_chain(&bob, 1).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(BottleError::AlreadySkipped)));

    let err = client.skip_on_chain(&alice, 1).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(BottleError::CannotSkipOwnBottle)));

    client.reply_to_bottle(&carol, 1, "replied first").await.unwrap();
    let err = client.skip_on_chain(&carol, 1).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(BottleError::AlreadyReplied)));

    // skipping does not stop a later reply
    client.reply_to_bottle(&bob, 1, "changed my mind").await.unwrap();
}

#[tokio::test]
async fn open_marks_the_bottle_viewed() {
    let (client, _) = setup();
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    client.send_bottle(&alice, "read me").await.unwrap();

    let event = client.open_bottle(&bob, 1).await.unwrap();
    assert_eq!(event.receiver, bob);
    let flags = client.get_user_bottle_state(&bob, 1).await.unwrap();
    assert!(flags.has_viewed && !flags.has_replied);

    // opening again is harmless
    client.open_bottle(&bob, 1).await.unwrap();

    let err = client.open_bottle(&alice, 1).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(BottleError::CannotViewOwnBottle)));
}

#[tokio::test]
async fn failed_write_leaves_no_partial_state() {
    let (client, admin) = setup();
    let alice = Pubkey::new_unique();
    client.send_bottle(&alice, "first").await.unwrap();

    // staging succeeds, the write itself is refused
    ledger(&client).update_config(&admin, None, Some(true)).await.unwrap();
    let long = "浪".repeat(900);
    let err = client.send_bottle(&alice, &long).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(BottleError::LedgerPaused)));

    assert_eq!(client.get_bottle_count().await.unwrap(), 1);
    assert_eq!(client.get_active_bottle_count().await.unwrap(), 1);
    assert_eq!(client.get_user_bottles(&alice).await.unwrap(), vec![1]);
    assert!(matches!(
        client.get_bottle(2).await,
        Err(ClientError::Rejected(BottleError::BottleNotFound))
    ));

    // the staged draft went with the failed write
    assert!(matches!(
        client.source().discard_draft(&alice).await,
        Err(ClientError::Program(_))
    ));

    ledger(&client).update_config(&admin, None, Some(false)).await.unwrap();
    client.send_bottle(&alice, &long).await.unwrap();
    assert_eq!(client.get_bottle(2).await.unwrap().content, long);
}

#[tokio::test]
async fn longest_message_is_staged_across_transactions() {
    let (client, _) = setup();
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    let longest = "瓶".repeat(1000);

    // too big to carry inline
    let err = client.source().send_bottle(&alice, &longest, false).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::PacketTooLarge { bytes, limit } if bytes > limit && limit == PACKET_DATA_SIZE
    ));
    assert_eq!(ledger(&client).call_count(), 0);

    let calls = ledger(&client).call_count();
    let sent = client.send_bottle(&alice, &longest).await.unwrap();
    // three chunks, then the write
    assert_eq!(ledger(&client).call_count(), calls + 4);
    assert_eq!(client.get_bottle(sent.bottle_id).await.unwrap().content, longest);

    let reply = client.reply_to_bottle(&bob, sent.bottle_id, &longest).await.unwrap();
    assert_eq!(client.get_reply(reply.reply_id).await.unwrap().content, longest);
    let back = client.reply_to_reply(&alice, reply.reply_id, &longest).await.unwrap();
    assert_eq!(client.get_reply(back.reply_id).await.unwrap().content, longest);

    // a message just under the inline limit needs no staging
    let calls = ledger(&client).call_count();
    client
        .send_bottle(&alice, &"a".repeat(MAX_INLINE_CONTENT_BYTES))
        .await
        .unwrap();
    assert_eq!(ledger(&client).call_count(), calls + 1);
}

#[tokio::test]
async fn lists_and_the_sea_keep_growing() {
    let (client, _) = setup();
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();

    for n in 0..300u64 {
        let sent = client.send_bottle(&alice, &format!("#{n}")).await.unwrap();
        assert_eq!(sent.bottle_id, n + 1);
    }
    assert_eq!(client.get_active_bottle_count().await.unwrap(), 300);
    let mine = client.get_user_bottles(&alice).await.unwrap();
    assert_eq!(mine, (1..=300).collect::<Vec<u64>>());

    for n in 0..80u64 {
        let replier = Pubkey::new_unique();
        let reply = client.reply_to_bottle(&replier, 1, "hi").await.unwrap();
        assert_eq!(reply.reply_id, n + 1);
    }
    assert_eq!(client.get_bottle(1).await.unwrap().reply_count, 80);
    assert_eq!(client.get_bottle_replies(1).await.unwrap().len(), 80);

    for id in 2..=150u64 {
        client.reply_to_bottle(&bob, id, "hello").await.unwrap();
    }
    let bobs = client.get_user_replies(&bob).await.unwrap();
    assert_eq!(bobs.len(), 149);
    assert_eq!(bobs.first(), Some(&81));
    assert_eq!(bobs.last(), Some(&229));
}

#[tokio::test]
async fn pause_blocks_new_content_only() {
    let (client, admin) = setup();
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    client.send_bottle(&alice, "before the storm").await.unwrap();

    let err = ledger(&client)
        .update_config(&alice, None, Some(true))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Rejected(BottleError::Unauthorized)));

    ledger(&client).update_config(&admin, None, Some(true)).await.unwrap();
    for result in [
        client.send_bottle(&alice, "during").await.map(|_| ()),
        client.reply_to_bottle(&bob, 1, "during").await.map(|_| ()),
    ] {
        assert!(matches!(result, Err(ClientError::Rejected(BottleError::LedgerPaused))));
    }

    // reads and draws keep working
    assert_eq!(client.discover(&bob).await.unwrap().bottle.id, 1);

    ledger(&client)
        .update_config(&admin, Some(alice), Some(false))
        .await
        .unwrap();
    client.send_bottle(&alice, "after").await.unwrap();
    ledger(&client).update_config(&alice, None, None).await.unwrap();
}

#[tokio::test]
async fn reads_are_idempotent_and_cached() {
    let (client, _) = setup();
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    client.send_bottle(&alice, "same every time").await.unwrap();

    let calls = ledger(&client).call_count();
    let first = client.get_bottle(1).await.unwrap();
    let second = client.get_bottle(1).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(ledger(&client).call_count(), calls + 1);

    assert_eq!(
        client.get_active_bottle_count().await.unwrap(),
        client.get_active_bottle_count().await.unwrap()
    );

    client.reply_to_bottle(&bob, 1, "fresh data please").await.unwrap();
    assert_eq!(client.get_bottle(1).await.unwrap().reply_count, 1);
    assert_eq!(client.get_bottle_replies(1).await.unwrap(), vec![1]);
}

#[tokio::test]
async fn concurrent_readers_share_one_fetch() {
    let (client, _) = setup();
    let alice = Pubkey::new_unique();
    client.send_bottle(&alice, "popular").await.unwrap();

    let calls = ledger(&client).call_count();
    let (a, b, c) = tokio::join!(client.get_bottle(1), client.get_bottle(1), client.get_bottle(1));
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(c.unwrap().id, 1);
    assert_eq!(ledger(&client).call_count(), calls + 1);
}

#[tokio::test(start_paused = true)]
async fn transient_read_failures_are_retried() {
    let (client, _) = setup();
    let alice = Pubkey::new_unique();
    client.send_bottle(&alice, "flaky network").await.unwrap();

    ledger(&client).fail_next_calls(2);
    let calls = ledger(&client).call_count();
    assert_eq!(client.get_bottle_count().await.unwrap(), 1);
    assert_eq!(ledger(&client).call_count(), calls + 3);

    ledger(&client).fail_next_calls(3);
    let err = client.get_bottle(1).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(err.is_transient());
    assert!(client.describe(&err).contains("retry"));
}

#[tokio::test(start_paused = true)]
async fn writes_and_rejections_are_not_retried() {
    let (client, _) = setup();
    let alice = Pubkey::new_unique();

    ledger(&client).fail_next_calls(1);
    let err = client.send_bottle(&alice, "lost in transit").await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert_eq!(client.get_bottle_count().await.unwrap(), 0);

    let calls = ledger(&client).call_count();
    let err = client.get_bottle(7).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(BottleError::BottleNotFound)));
    assert_eq!(ledger(&client).call_count(), calls + 1);
}

#[tokio::test(start_paused = true)]
async fn busy_key_falls_back_to_stale_entry() {
    let admin = Pubkey::new_unique();
    let config = ClientConfig {
        lock_wait_ms: 200,
        ..ClientConfig::default()
    };
    let client = BottleClient::new(MemoryLedger::new(admin), config);
    let alice = Pubkey::new_unique();
    client.send_bottle(&alice, "old news").await.unwrap();

    let stale = BottleRecord {
        id: 1,
        sender: alice,
        content: "old news".into(),
        created_at: 0,
        active: true,
        reply_count: 0,
    };
    let long_ago = Utc::now() - TimeDelta::hours(2);
    client
        .cache()
        .put_at(CacheKey::Bottle(1), stale.clone(), long_ago)
        .await;

    let held = client
        .locks()
        .try_acquire(&CacheKey::Bottle(1).to_string(), Duration::from_secs(10))
        .unwrap();
    assert_eq!(client.get_bottle(1).await.unwrap(), stale);

    let err = client.get_reply(1).await;
    assert!(matches!(err, Err(ClientError::Rejected(BottleError::ReplyNotFound))));

    let other = client
        .locks()
        .try_acquire(&CacheKey::Reply(1).to_string(), Duration::from_secs(10))
        .unwrap();
    let err = client.get_reply(1).await.unwrap_err();
    assert!(matches!(err, ClientError::LockTimeout { .. }));
    drop(other);

    drop(held);
    let current = client.source().get_bottle(1).await.unwrap();
    assert_eq!(client.get_bottle(1).await.unwrap(), current);
}

#[tokio::test]
async fn snapshot_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache").join("bottles.json");
    let config = ClientConfig {
        snapshot_path: Some(path.clone()),
        locale: Locale::Zh,
        ..ClientConfig::default()
    };

    let alice = Pubkey::new_unique();
    let client = BottleClient::open(MemoryLedger::new(alice), config.clone())
        .await
        .unwrap();
    client.send_bottle(&alice, "remember me").await.unwrap();
    let original = client.get_bottle(1).await.unwrap();
    assert_eq!(client.save_snapshot().await.unwrap(), Some(1));
    assert!(path.exists());

    // a fresh ledger knows nothing; the restored cache still answers
    let restarted = BottleClient::open(MemoryLedger::new(alice), config).await.unwrap();
    assert_eq!(restarted.get_bottle(1).await.unwrap(), original);
    assert_eq!(restarted.source().call_count(), 0);

    let err = restarted.get_bottle(2).await.unwrap_err();
    assert!(restarted.describe(&err).contains("漂流瓶"));
}

#[tokio::test]
async fn corrupt_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bottles.json");
    tokio::fs::write(&path, b"{ not json").await.unwrap();

    let config = ClientConfig {
        snapshot_path: Some(path),
        ..ClientConfig::default()
    };
    let client = BottleClient::open(MemoryLedger::new(Pubkey::new_unique()), config)
        .await
        .unwrap();
    assert_eq!(client.cache().len().await, 0);
}

#[tokio::test]
async fn events_follow_commit_order() {
    let (client, _) = setup();
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();

    client.send_bottle(&alice, "log me").await.unwrap();
    client.open_bottle(&bob, 1).await.unwrap();
    client.reply_to_bottle(&bob, 1, "logged").await.unwrap();
    client.reply_to_reply(&alice, 1, "thanks").await.unwrap();
    let _ = client.reply_to_bottle(&bob, 1, "dup").await;
    client.deactivate_bottle(&alice, 1).await.unwrap();

    let events = ledger(&client).events().await;
    assert_eq!(events.len(), 5);
    assert!(matches!(&events[0], LedgerEvent::Sent(e) if e.bottle_id == 1 && e.sender == alice));
    assert!(matches!(&events[1], LedgerEvent::Received(e) if e.receiver == bob));
    assert!(matches!(&events[2], LedgerEvent::Replied(e) if e.reply_id == 1 && e.parent_reply_id == 0));
    assert!(matches!(&events[3], LedgerEvent::Replied(e) if e.reply_id == 2 && e.parent_reply_id == 1));
    assert!(matches!(&events[4], LedgerEvent::Deactivated(e) if e.bottle_id == 1));
}
