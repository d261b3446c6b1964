//! Tests for intent dispatch, interactivity layering and teardown.

mod common;

use std::sync::Arc;

use common::{Intent, Journal, MemoryAssets, Scripted, scripted_router};
use lattice_nav::debug::{TreeFormatOptions, TreeStyle};
use lattice_nav::prelude::*;
use lattice_nav::ConfigError;

fn routed(journal: &Journal) -> TransitionAuthority<Intent> {
    TransitionAuthority::new(scripted_router(journal))
}

#[tokio::test]
async fn test_modal_suspends_page_until_popped() {
    let journal = Journal::new();
    let authority = routed(&journal);

    let page = authority
        .dispatch(Intent::Show(ContainerKind::Page, "a"))
        .unwrap()
        .await
        .unwrap()
        .entry()
        .unwrap();
    assert_eq!(authority.interactive_entry(), Some((ContainerKind::Page, page)));

    let modal = authority
        .dispatch(Intent::Show(ContainerKind::Modal, "b"))
        .unwrap()
        .await
        .unwrap()
        .entry()
        .unwrap();
    assert_eq!(authority.interactive_entry(), Some((ContainerKind::Modal, modal)));
    assert_eq!(authority.container(ContainerKind::Page).phase(page), Some(ScreenPhase::Active));

    authority.dispatch(Intent::Back).unwrap().await.unwrap();

    assert!(authority.container(ContainerKind::Modal).is_empty());
    assert_eq!(authority.interactive_entry(), Some((ContainerKind::Page, page)));
    // Regaining input does not replay the enter phase.
    assert_eq!(journal.count("a:enter"), 1);
    assert_eq!(
        journal.of("a")[3..].to_vec(),
        vec!["interactive=true", "interactive=false", "interactive=true"]
    );
}

#[tokio::test]
async fn test_sheet_sits_between_pages_and_modals() {
    let journal = Journal::new();
    let authority = routed(&journal);

    authority
        .dispatch(Intent::Show(ContainerKind::Page, "p"))
        .unwrap()
        .await
        .unwrap();
    let sheet = authority
        .dispatch(Intent::Show(ContainerKind::Sheet, "s"))
        .unwrap()
        .await
        .unwrap()
        .entry()
        .unwrap();
    assert_eq!(authority.interactive_entry(), Some((ContainerKind::Sheet, sheet)));

    authority
        .dispatch(Intent::Show(ContainerKind::Modal, "m"))
        .unwrap()
        .await
        .unwrap();
    assert_eq!(
        authority.interactive_entry().map(|(kind, _)| kind),
        Some(ContainerKind::Modal)
    );

    // Back pops the highest layer first.
    authority.dispatch(Intent::Back).unwrap().await.unwrap();
    assert_eq!(authority.interactive_entry(), Some((ContainerKind::Sheet, sheet)));
    authority.dispatch(Intent::Back).unwrap().await.unwrap();
    assert_eq!(
        authority.interactive_entry().map(|(kind, _)| kind),
        Some(ContainerKind::Page)
    );
}

#[tokio::test]
async fn test_at_most_one_interactive_entry() {
    let journal = Journal::new();
    let authority = routed(&journal);
    let interactive = Arc::new(parking_lot::Mutex::new(0_i32));
    let peak = Arc::new(parking_lot::Mutex::new(0_i32));
    let (count, max) = (interactive.clone(), peak.clone());
    let _events = authority
        .on_lifecycle(move |event| {
            if let LifecycleEvent::Interactivity { interactive, .. } = event {
                let mut count = count.lock();
                *count += if *interactive { 1 } else { -1 };
                let mut max = max.lock();
                *max = (*max).max(*count);
            }
        })
        .unwrap();

    let intents = [
        Intent::Show(ContainerKind::Page, "a"),
        Intent::Show(ContainerKind::Modal, "m1"),
        Intent::Show(ContainerKind::Page, "b"),
        Intent::Show(ContainerKind::Sheet, "s1"),
        Intent::Show(ContainerKind::Sheet, "s2"),
        Intent::Show(ContainerKind::Modal, "m2"),
        Intent::Back,
        Intent::Close(ContainerKind::Page),
        Intent::Back,
    ];
    for intent in intents {
        let _ = authority.dispatch(intent).unwrap();
    }
    authority.settled().await;

    assert_eq!(*peak.lock(), 1);
    assert_eq!(*interactive.lock(), 1);
    assert!(authority.container(ContainerKind::Modal).is_empty());
    assert_eq!(authority.container(ContainerKind::Page).len(), 1);
    assert_eq!(
        authority.interactive_entry().map(|(kind, _)| kind),
        Some(ContainerKind::Sheet)
    );
}

#[tokio::test]
async fn test_pop_active_with_nothing_to_pop() {
    let authority = routed(&Journal::new());

    let err = authority.dispatch(Intent::Back).unwrap_err();
    assert!(matches!(err, NavError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_pop_active_targets_pending_push() {
    let journal = Journal::new();
    let authority = routed(&journal);

    // The modal push has not started yet, but Back must still target it.
    let push = authority.dispatch(Intent::Show(ContainerKind::Modal, "m")).unwrap();
    let back = authority.dispatch(Intent::Back).unwrap();
    assert_eq!(back.kind(), ContainerKind::Modal);

    push.await.unwrap();
    back.await.unwrap();
    assert_eq!(journal.count("m:dispose"), 1);
}

#[test]
fn test_router_rejection_is_reported() {
    let authority = routed(&Journal::new());

    let err = authority.dispatch(Intent::Unknown).unwrap_err();
    assert!(matches!(err, NavError::InvalidIntent(_)));
}

#[test]
fn test_handle_outliving_authority() {
    let authority = routed(&Journal::new());
    let handle = authority.handle();
    assert!(handle.is_available());

    drop(authority);

    assert!(!handle.is_available());
    let err = handle.dispatch(Intent::Back).unwrap_err();
    assert!(matches!(err, NavError::AuthorityUnavailable));
}

#[tokio::test]
async fn test_router_receives_working_handle() {
    let journal = Journal::new();
    let inner = journal.clone();
    let authority = TransitionAuthority::new(
        move |intent: Intent, transitions: &TransitionHandle<Intent>| -> NavResult<NavCommand> {
            match intent {
                // Opening the modal also queues a page underneath it.
                Intent::Show(ContainerKind::Modal, name) => {
                    let _ = transitions
                        .execute(NavCommand::push_page(Scripted::new("under", &inner)))?;
                    Ok(NavCommand::push_modal(Scripted::new(name, &inner)))
                }
                Intent::Show(kind, name) => Ok(NavCommand::push(kind, Scripted::new(name, &inner))),
                _ => Ok(NavCommand::PopActive),
            }
        },
    );

    let _ = authority.dispatch(Intent::Show(ContainerKind::Modal, "m")).unwrap();
    authority.settled().await;

    assert_eq!(authority.container(ContainerKind::Page).len(), 1);
    assert_eq!(authority.container(ContainerKind::Modal).len(), 1);
    assert_eq!(
        authority.interactive_entry().map(|(kind, _)| kind),
        Some(ContainerKind::Modal)
    );
}

#[tokio::test]
async fn test_shutdown_disposes_everything() {
    let journal = Journal::new();
    let authority = routed(&journal);

    for intent in [
        Intent::Show(ContainerKind::Page, "a"),
        Intent::Show(ContainerKind::Page, "b"),
        Intent::Show(ContainerKind::Sheet, "s"),
        Intent::Show(ContainerKind::Modal, "m"),
    ] {
        let _ = authority.dispatch(intent).unwrap();
    }
    authority.settled().await;

    authority.shutdown().await.unwrap();

    for kind in ContainerKind::ALL {
        assert!(authority.container(kind).is_empty(), "{kind} not cleared");
    }
    for name in ["a", "b", "s", "m"] {
        assert_eq!(journal.count(&format!("{name}:release")), 1);
        assert_eq!(journal.count(&format!("{name}:dispose")), 1);
    }
    assert!(journal.position("b:exit") < journal.position("a:exit"));
    assert_eq!(authority.interactive_entry(), None);
}

#[tokio::test]
async fn test_assets_released_with_screen() {
    let journal = Journal::new();
    let assets = MemoryAssets::with(&[("backdrop", "sunset.png"), ("font", "mono.ttf")]);
    let authority = TransitionAuthority::builder(scripted_router(&journal))
        .shared_assets(assets.clone())
        .build()
        .unwrap();

    authority
        .execute(NavCommand::push_page(
            Scripted::new("gallery", &journal).loading("backdrop").loading("font"),
        ))
        .unwrap()
        .await
        .unwrap();
    assert_eq!(assets.live(), 2);

    authority
        .execute(NavCommand::pop(ContainerKind::Page))
        .unwrap()
        .await
        .unwrap();
    assert_eq!(assets.live(), 0);
}

#[tokio::test]
async fn test_missing_asset_fails_push() {
    let journal = Journal::new();
    let assets = MemoryAssets::with(&[("backdrop", "sunset.png")]);
    let authority = TransitionAuthority::builder(scripted_router(&journal))
        .shared_assets(assets.clone())
        .build()
        .unwrap();

    let err = authority
        .execute(NavCommand::push_page(
            Scripted::new("gallery", &journal).loading("backdrop").loading("missing"),
        ))
        .unwrap()
        .await
        .unwrap_err();

    let source = match err {
        NavError::PushFailed { source, .. } => source,
        other => panic!("expected PushFailed, got {other:?}"),
    };
    assert!(matches!(*source, NavError::Asset(AssetError::AssetNotFound(ref key)) if key == "missing"));
    // The asset that did load was released by the rollback.
    assert_eq!(assets.live(), 0);
    assert!(authority.container(ContainerKind::Page).is_empty());
}

#[tokio::test]
async fn test_debug_tree_marks_interactive_entry() {
    let journal = Journal::new();
    let authority = routed(&journal);

    for intent in [
        Intent::Show(ContainerKind::Page, "loading"),
        Intent::Show(ContainerKind::Page, "home"),
        Intent::Show(ContainerKind::Modal, "settings"),
    ] {
        let _ = authority.dispatch(intent).unwrap();
    }
    authority.settled().await;

    let tree = authority.debug_tree().to_string();
    assert!(tree.starts_with("Navigation (3 entries):"));
    assert!(tree.contains("page (2)"));
    assert!(tree.contains("sheet (empty)"));
    assert!(tree.contains("settings [Active] *"));
    assert!(tree.contains("home [Active]\n"));

    let minimal = authority
        .debug_tree()
        .with_options(TreeFormatOptions {
            style: TreeStyle::Ascii,
            ..TreeFormatOptions::minimal()
        })
        .format();
    assert!(!minimal.contains("sheet"));
    assert!(minimal.contains("`-- settings *"));
    assert!(!minimal.contains("[Active]"));
}

#[test]
fn test_builder_validates_config() {
    let config = NavigatorConfig::new().sheets(ContainerConfig::new().max_pending_transitions(0));

    let err = TransitionAuthority::builder(scripted_router(&Journal::new()))
        .config(config)
        .build()
        .unwrap_err();

    assert!(matches!(err, ConfigError::InvalidValue { .. }));
}
