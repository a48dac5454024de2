//! End-to-end flows through the router, driven by declarative config.

use std::sync::Arc;

use serde_json::json;
use tgui_core::testing::{MockMessenger, RecordingFaultSink, Sent};
use tgui_core::validator::fault_message;
use tgui_core::{
    BotConfig, DispatchOutcome, FieldOutcome, FieldsFactory, Router, ValidatorsFactory,
};
use tgui_proto::{Destination, InboundEvent, InboundMessage};

const CHAT: Destination = Destination { chat_id: 42 };

fn example_config() -> BotConfig {
    BotConfig::from_yaml(include_str!("../../../tgui.example.yml")).unwrap()
}

async fn press(router: &Router, messenger: &MockMessenger, title: &str) -> DispatchOutcome {
    let payload = messenger
        .payload_of(title)
        .unwrap_or_else(|| panic!("no button titled {title}"));
    router
        .dispatch(CHAT, InboundEvent::press(format!("cb-{title}"), payload))
        .await
}

async fn say(router: &Router, messenger: &MockMessenger, text: &str) -> DispatchOutcome {
    router.dispatch(CHAT, messenger.user_text(text)).await
}

#[tokio::test]
async fn example_form_collects_every_element() {
    let messenger = Arc::new(MockMessenger::new());
    let router = Router::new(messenger.clone());
    let config = example_config();
    let form = FieldsFactory::default().form(&config.form).unwrap();
    let pending = router.arm(CHAT, form).await;

    assert_eq!(messenger.prompts(), ["What should we call you?"]);

    assert_eq!(say(&router, &messenger, "").await, DispatchOutcome::Rejected);
    assert_eq!(say(&router, &messenger, &"x".repeat(41)).await, DispatchOutcome::Rejected);
    assert_eq!(say(&router, &messenger, "Ann").await, DispatchOutcome::Advanced);

    assert_eq!(say(&router, &messenger, "13").await, DispatchOutcome::Rejected);
    assert_eq!(press(&router, &messenger, "Just me").await, DispatchOutcome::Advanced);

    assert_eq!(say(&router, &messenger, "large please").await, DispatchOutcome::Rejected);
    assert_eq!(press(&router, &messenger, "Large").await, DispatchOutcome::Advanced);

    assert_eq!(press(&router, &messenger, "Cutlery").await, DispatchOutcome::Updated);
    assert_eq!(press(&router, &messenger, "✅ Napkins").await, DispatchOutcome::Updated);
    assert_eq!(say(&router, &messenger, "napkins").await, DispatchOutcome::Ignored);
    assert_eq!(press(&router, &messenger, "Done").await, DispatchOutcome::Advanced);

    assert_eq!(say(&router, &messenger, "2,5").await, DispatchOutcome::Rejected);
    assert_eq!(say(&router, &messenger, "2.5").await, DispatchOutcome::Advanced);

    let photo_id = messenger.next_message_id();
    let photo = InboundMessage {
        message_id: photo_id,
        caption: Some("Ring twice".into()),
        ..InboundMessage::default()
    };
    assert_eq!(
        router.dispatch(CHAT, InboundEvent::Message(photo)).await,
        DispatchOutcome::Advanced
    );

    assert_eq!(press(&router, &messenger, "Yes").await, DispatchOutcome::Resolved);

    let FieldOutcome::Resolved(value) = pending.wait().await else {
        panic!("form was cancelled");
    };
    assert_eq!(
        value.to_json(),
        json!({
            "name": "Ann",
            "guests": 1,
            "size": "L",
            "delivery": {
                "extras": [
                    {"value": "napkins", "is_on": false},
                    {"value": "cutlery", "is_on": true},
                ],
                "tip": 2.5,
                "note": {"message_id": photo_id, "text": "Ring twice", "caption": "Ring twice"},
            },
            "newsletter": true,
        })
    );

    assert_eq!(messenger.errors().len(), 5);
    assert!(!router.is_armed(CHAT).await);
    assert_eq!(router.session_count(), 0);
    assert_eq!(say(&router, &messenger, "late").await, DispatchOutcome::Stale);
}

#[tokio::test]
async fn button_answers_are_acknowledged() {
    let messenger = Arc::new(MockMessenger::new());
    let router = Router::new(messenger.clone());
    let config = example_config();
    let form = FieldsFactory::default().form(&config.form).unwrap();
    let _pending = router.arm(CHAT, form).await;

    say(&router, &messenger, "Ann").await;
    press(&router, &messenger, "Just me").await;
    press(&router, &messenger, "Small").await;

    assert!(messenger.sent().contains(&Sent::Acknowledge {
        callback_id: "cb-Small".into(),
        text: Some("Small it is".into()),
    }));
}

#[tokio::test]
async fn cancelling_mid_form_tears_everything_down() {
    let messenger = Arc::new(MockMessenger::new());
    let router = Router::new(messenger.clone());
    let config = example_config();
    let form = FieldsFactory::default().form(&config.form).unwrap();
    let pending = router.arm(CHAT, form).await;

    say(&router, &messenger, "Ann").await;
    let just_me = messenger.payload_of("Just me").unwrap();
    assert!(router.cancel(CHAT).await);
    assert_eq!(pending.wait().await, FieldOutcome::Cancelled);

    assert_eq!(
        router
            .dispatch(CHAT, InboundEvent::press("cb", just_me))
            .await,
        DispatchOutcome::Stale
    );
    assert!(matches!(messenger.sent().last(), Some(Sent::Acknowledge { text: None, .. })));
}

#[tokio::test]
async fn validator_faults_are_logged_once_and_shown_generically() {
    let sink = Arc::new(RecordingFaultSink::default());
    let messenger = Arc::new(MockMessenger::new());
    let router = Router::new(messenger.clone());

    let validators = ValidatorsFactory::new(sink.clone());
    let flaky = tgui_core::validator::guard(sink.clone(), |object| {
        if object.text() == "boom" {
            anyhow::bail!("lookup service unavailable");
        }
        Ok(object)
    });
    let form = tgui_core::FormState::new(
        "f",
        vec![
            tgui_core::FormElement::new(
                "lookup",
                tgui_core::InputField::new(flaky).with_greeting("Code?"),
            ),
            tgui_core::FormElement::new(
                "count",
                tgui_core::InputField::new(validators.integer("number", None, None))
                    .with_greeting("Count?"),
            ),
        ],
    )
    .unwrap();
    let pending = router.arm(CHAT, form).await;

    assert_eq!(say(&router, &messenger, "boom").await, DispatchOutcome::Rejected);
    assert_eq!(
        messenger.errors(),
        [fault_message("lookup service unavailable")]
    );
    assert_eq!(sink.faults().len(), 1);

    assert_eq!(say(&router, &messenger, "ok").await, DispatchOutcome::Advanced);
    assert_eq!(say(&router, &messenger, "3").await, DispatchOutcome::Resolved);
    assert_eq!(sink.faults().len(), 1);

    let FieldOutcome::Resolved(value) = pending.wait().await else {
        panic!("cancelled");
    };
    assert_eq!(value.to_json()["count"], json!(3));
}
