use serde_json::json;
use std::sync::Arc;
use strata_cache::{Cache, DomainEvent};
use strata_gateway::{
    ControlEvent, Envelope, ErrorKind, EventBus, Gateway, GatewayConfig, GatewayEvent,
};
use strata_models::{
    id::{ChannelId, GuildId, UserId},
    presence::{ActivityType, Status},
    stats::GatewayStats,
};
use tokio_stream::StreamExt;

fn setup() -> (Cache, EventBus) {
    let stats = Arc::new(GatewayStats::new(0).unwrap());
    (Cache::new(stats), EventBus::new())
}

fn guild_create(sequence: u64) -> Envelope {
    Envelope::dispatch(
        "GUILD_CREATE",
        sequence,
        json!({
            "id": "1",
            "name": "Test",
            "owner_id": "100",
            "channels": [
                { "id": "10", "type": 4, "name": "Info", "position": 0 },
                { "id": "11", "type": 0, "name": "rules", "position": 1, "parent_id": "10" }
            ],
            "members": [{ "user": { "id": "100", "username": "owner" } }]
        }),
    )
}

#[tokio::test]
async fn dispatches_are_applied_and_published_in_order() {
    let (cache, bus) = setup();
    let mut events = bus.subscribe();
    let mut gateway = Gateway::start(&GatewayConfig::default(), cache.clone(), bus.clone()).unwrap();
    let mut control = gateway.control().unwrap();
    assert!(gateway.control().is_none());

    gateway
        .send(Envelope {
            op: 10,
            t: None,
            s: None,
            d: json!({ "heartbeat_interval": 41250 }),
        })
        .await
        .unwrap();
    gateway.send(guild_create(1)).await.unwrap();
    gateway
        .send(Envelope::dispatch(
            "CHANNEL_UPDATE",
            2,
            json!({ "id": "11", "guild_id": "1", "name": "rules-v2" }),
        ))
        .await
        .unwrap();
    gateway
        .send(Envelope::dispatch("TYPING_START", 3, json!({ "channel_id": "11" })))
        .await
        .unwrap();

    let kinds = [
        events.next().await.unwrap().kind(),
        events.next().await.unwrap().kind(),
        events.next().await.unwrap().kind(),
    ];
    assert_eq!(kinds, ["guild-available", "channel-updated", "unknown"]);

    match control.next().await.unwrap() {
        ControlEvent::Forward(GatewayEvent::Hello { heartbeat_interval }) => {
            assert_eq!(heartbeat_interval, 41250);
        }
        other => panic!("unexpected control event {:?}", other),
    }

    assert_eq!(gateway.last_sequence(), Some(3));
    gateway.stop().await.unwrap();

    assert_eq!(
        cache.channel(ChannelId::new(11)).unwrap().name.as_deref(),
        Some("rules-v2")
    );
    assert_eq!(
        cache.channel_parent(ChannelId::new(11)).map(|c| c.id),
        Some(ChannelId::new(10))
    );
}

#[tokio::test]
async fn bad_envelopes_do_not_stop_the_stream() {
    let (cache, bus) = setup();
    let mut events = bus.subscribe();
    let mut gateway = Gateway::start(&GatewayConfig::default(), cache.clone(), bus.clone()).unwrap();
    let mut control = gateway.control().unwrap();

    gateway.send(guild_create(1)).await.unwrap();
    gateway
        .send(Envelope::dispatch("GUILD_ROLE_DELETE", 2, json!({ "guild_id": "1" })))
        .await
        .unwrap();
    gateway
        .send(Envelope::dispatch(
            "GUILD_MEMBER_ADD",
            3,
            json!({ "guild_id": "404", "user": { "id": "7", "username": "lost" } }),
        ))
        .await
        .unwrap();
    gateway
        .send(Envelope::dispatch(
            "PRESENCE_UPDATE",
            4,
            json!({ "guild_id": "1", "user": { "id": "100" }, "status": "online", "game": null }),
        ))
        .await
        .unwrap();
    gateway
        .send(Envelope::dispatch(
            "PRESENCE_UPDATE",
            5,
            json!({ "guild_id": "1", "user": { "id": "100" }, "game": { "name": "Chess", "type": 0 } }),
        ))
        .await
        .unwrap();
    gateway.stop().await.unwrap();

    match control.next().await.unwrap() {
        ControlEvent::DecodeFailed(err) => {
            assert_eq!(err.event(), Some("GUILD_ROLE_DELETE"));
            assert_eq!(err.payload(), &json!({ "guild_id": "1" }));
        }
        other => panic!("unexpected control event {:?}", other),
    }

    let mut kinds = Vec::new();
    while let Some(event) = events.next().await {
        kinds.push(event.kind());
        if kinds.len() == 3 {
            break;
        }
    }
    assert_eq!(
        kinds,
        ["guild-available", "presence-updated", "presence-updated"]
    );

    let presence = cache.presence(GuildId::new(1), UserId::new(100)).unwrap();
    assert_eq!(presence.status(), Status::Online);
    let activity = presence.activity().unwrap();
    assert_eq!(activity.name, "Chess");
    assert_eq!(activity.kind, ActivityType::Game);

    assert!(cache.member(GuildId::new(404), UserId::new(7)).is_none());
    let stats = cache.stats();
    assert_eq!(stats.decode_failures.get(), 1);
    assert_eq!(stats.inconsistent_references.get(), 1);
}

#[tokio::test]
async fn stop_drains_queued_envelopes() {
    let (cache, bus) = setup();
    let gateway = Gateway::start(
        &GatewayConfig::default().queue_capacity(64),
        cache.clone(),
        bus,
    )
    .unwrap();

    gateway.send(guild_create(1)).await.unwrap();
    for i in 0..50_u64 {
        gateway
            .send(Envelope::dispatch(
                "GUILD_MEMBER_ADD",
                i + 2,
                json!({ "guild_id": "1", "user": { "id": (1_000 + i).to_string(), "username": "m" } }),
            ))
            .await
            .unwrap();
    }
    gateway.stop().await.unwrap();

    assert_eq!(cache.members(GuildId::new(1)).len(), 51);
    assert_eq!(cache.member_count(GuildId::new(1)), 51);
}

#[tokio::test]
async fn guild_delete_reports_the_removed_subtree() {
    let (cache, bus) = setup();
    let mut events = bus.subscribe();
    let gateway = Gateway::start(&GatewayConfig::default(), cache.clone(), bus.clone()).unwrap();

    gateway.send(guild_create(1)).await.unwrap();
    gateway
        .send(Envelope::dispatch("GUILD_DELETE", 2, json!({ "id": "1" })))
        .await
        .unwrap();
    gateway.stop().await.unwrap();

    assert_eq!(events.next().await.unwrap().kind(), "guild-available");
    let deleted = events.next().await.unwrap();
    match &*deleted {
        DomainEvent::GuildUnavailable {
            prior: Some(prior), ..
        } => {
            let ids = prior.channels.iter().map(|c| c.id).collect::<Vec<_>>();
            assert_eq!(ids, vec![ChannelId::new(10), ChannelId::new(11)]);
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(cache.channel(ChannelId::new(10)).is_none());
    assert!(cache.channel(ChannelId::new(11)).is_none());
}

#[tokio::test]
async fn zero_capacity_is_rejected_and_dropped_control_is_ignored() {
    let (cache, bus) = setup();
    let config = GatewayConfig::default().queue_capacity(0);
    let err = Gateway::start(&config, cache.clone(), bus.clone()).err().unwrap();
    assert_eq!(err.kind(), &ErrorKind::Configuration);

    let mut gateway = Gateway::start(&GatewayConfig::default(), cache, bus).unwrap();
    drop(gateway.control());
    gateway
        .send(Envelope {
            op: 11,
            t: None,
            s: None,
            d: json!(null),
        })
        .await
        .unwrap();
    gateway.stop().await.unwrap();
}
