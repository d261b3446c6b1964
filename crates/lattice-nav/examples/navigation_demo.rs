//! Navigation walkthrough: a loading page hands off to a home page, which
//! opens a settings modal; a toast sheet is shown and replaced on the way.
//!
//! Run with: cargo run -p lattice-nav --example navigation_demo

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use lattice_nav::prelude::*;
use parking_lot::Mutex;

#[derive(Debug, Clone)]
enum Intent {
    ShowHome,
    OpenSettings,
    Toast(String),
    Back,
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// Serves assets from memory after a short simulated delay.
struct MemoryAssets {
    assets: HashMap<&'static str, &'static str>,
}

impl AssetResolver for MemoryAssets {
    fn load<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<AssetHandle, AssetError>> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let asset = self
                .assets
                .get(key)
                .ok_or_else(|| AssetError::AssetNotFound(key.to_string()))?;
            Ok(AssetHandle::new(key, asset.to_string()))
        })
    }

    fn release(&self, handle: &AssetHandle) {
        tracing::info!(key = handle.key(), "asset released");
    }
}

// ---------------------------------------------------------------------------
// Loading page
// ---------------------------------------------------------------------------

struct LoadingState {
    lifetime: StateLifetime,
    progress: ObservableProperty<u8>,
}

impl ViewState for LoadingState {
    fn lifetime(&self) -> &StateLifetime {
        &self.lifetime
    }
}

struct LoadingView;

impl View for LoadingView {
    type State = LoadingState;

    fn initialize<'a>(
        &'a self,
        state: &'a Arc<LoadingState>,
        cx: &'a ScreenContext,
    ) -> BoxFuture<'a, NavResult<()>> {
        Box::pin(async move {
            state
                .progress
                .read_only()
                .subscribe(|progress| println!("  [loading] {progress}%"))?
                .add_to(cx.scope())?;
            Ok(())
        })
    }
}

struct LoadingPresenter {
    transitions: TransitionHandle<Intent>,
}

impl Presenter for LoadingPresenter {
    type State = LoadingState;

    fn create_state(&self, cx: &ScreenContext) -> NavResult<LoadingState> {
        let lifetime = StateLifetime::new(cx.screen_name());
        Ok(LoadingState {
            progress: lifetime.property("progress", 0),
            lifetime,
        })
    }

    fn view_did_load<'a>(
        &'a self,
        state: &'a Arc<LoadingState>,
        cx: &'a ScreenContext,
    ) -> BoxFuture<'a, NavResult<()>> {
        Box::pin(async move {
            let logo = cx.load_asset("logo").await?;
            state.progress.set(50);
            let font = cx.load_asset("font").await?;
            state.progress.set(100);
            println!(
                "  [loading] loaded {} and {}",
                logo.downcast::<String>()?,
                font.downcast::<String>()?
            );
            Ok(())
        })
    }

    fn view_did_push_enter(&self, _state: &Arc<LoadingState>, _cx: &ScreenContext) {
        // Fully visible: move on.
        if let Err(err) = self.transitions.dispatch(Intent::ShowHome) {
            tracing::warn!(error = %err, "could not leave the loading page");
        }
    }
}

// ---------------------------------------------------------------------------
// Home page
// ---------------------------------------------------------------------------

struct HomeState {
    lifetime: StateLifetime,
    greeting: ObservableProperty<String>,
    open_settings: IntentStream<()>,
}

impl ViewState for HomeState {
    fn lifetime(&self) -> &StateLifetime {
        &self.lifetime
    }
}

struct HomeView;

impl View for HomeView {
    type State = HomeState;

    fn initialize<'a>(
        &'a self,
        state: &'a Arc<HomeState>,
        cx: &'a ScreenContext,
    ) -> BoxFuture<'a, NavResult<()>> {
        Box::pin(async move {
            state
                .greeting
                .read_only()
                .subscribe(|greeting| println!("  [home] {greeting}"))?
                .add_to(cx.scope())?;
            Ok(())
        })
    }

    fn play_enter<'a>(&'a self, _cx: &'a ScreenContext) -> BoxFuture<'a, ()> {
        Box::pin(tokio::time::sleep(Duration::from_millis(30)))
    }

    fn set_interactive(&self, interactive: bool) {
        println!("  [home] interactive = {interactive}");
    }
}

struct HomePresenter {
    transitions: TransitionHandle<Intent>,
}

impl Presenter for HomePresenter {
    type State = HomeState;

    fn create_state(&self, cx: &ScreenContext) -> NavResult<HomeState> {
        let lifetime = StateLifetime::new(cx.screen_name());
        Ok(HomeState {
            greeting: lifetime.property("greeting", String::from("...")),
            open_settings: lifetime.intent("open_settings"),
            lifetime,
        })
    }

    fn view_did_load<'a>(
        &'a self,
        state: &'a Arc<HomeState>,
        cx: &'a ScreenContext,
    ) -> BoxFuture<'a, NavResult<()>> {
        Box::pin(async move {
            state.greeting.set("Welcome back".to_string());

            let transitions = self.transitions.clone();
            state
                .open_settings
                .subscribe(move |_| {
                    if let Err(err) = transitions.dispatch(Intent::OpenSettings) {
                        tracing::warn!(error = %err, "could not open settings");
                    }
                })?
                .add_to(cx.scope())?;
            Ok(())
        })
    }
}

type HomeScreen = MvpScreen<HomeView, HomePresenter>;

// ---------------------------------------------------------------------------
// Plain screens: the settings modal and toast sheets
// ---------------------------------------------------------------------------

struct Panel {
    name: String,
}

impl Screen for Panel {
    fn name(&self) -> &str {
        &self.name
    }

    fn construct(&self, cx: &ScreenContext) -> NavResult<()> {
        let name = self.name.clone();
        cx.scope().register(move || println!("  [{name}] released"))?;
        Ok(())
    }

    fn initialize<'a>(&'a self, _cx: &'a ScreenContext) -> BoxFuture<'a, NavResult<()>> {
        ready(Ok(()))
    }

    fn enter<'a>(&'a self, _cx: &'a ScreenContext) -> BoxFuture<'a, ()> {
        println!("  [{}] slides in", self.name);
        ready(())
    }

    fn exit<'a>(&'a self, _cx: &'a ScreenContext) -> BoxFuture<'a, ()> {
        println!("  [{}] slides out", self.name);
        ready(())
    }

    fn set_interactive(&self, interactive: bool) {
        println!("  [{}] interactive = {interactive}", self.name);
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

fn router(home: Arc<Mutex<Option<Arc<HomeScreen>>>>) -> impl IntentRouter<Intent> {
    move |intent: Intent, transitions: &TransitionHandle<Intent>| -> NavResult<NavCommand> {
        Ok(match intent {
            Intent::ShowHome => {
                let screen = Arc::new(MvpScreen::new(
                    "home",
                    HomeView,
                    HomePresenter {
                        transitions: transitions.clone(),
                    },
                ));
                *home.lock() = Some(screen.clone());
                NavCommand::Push {
                    kind: ContainerKind::Page,
                    screen,
                }
            }
            Intent::OpenSettings => NavCommand::push_modal(Panel {
                name: "settings".into(),
            }),
            Intent::Toast(message) => NavCommand::show_sheet(Panel { name: message }),
            Intent::Back => NavCommand::PopActive,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("lattice_nav=debug,navigation_demo=info")
        .init();

    let home: Arc<Mutex<Option<Arc<HomeScreen>>>> = Arc::default();
    let authority = TransitionAuthority::builder(router(home.clone()))
        .assets(MemoryAssets {
            assets: HashMap::from([("logo", "logo.png"), ("font", "inter.ttf")]),
        })
        .build()?;

    println!("== launch");
    let loading = Arc::new(MvpScreen::new(
        "loading",
        LoadingView,
        LoadingPresenter {
            transitions: authority.handle(),
        },
    ));
    authority
        .execute(NavCommand::Push {
            kind: ContainerKind::Page,
            screen: loading,
        })?
        .await?;
    // The loading page queues the home page once it is fully visible.
    authority.settled().await;
    println!("{}", authority.debug_tree());

    println!("== toasts");
    let _ = authority.dispatch(Intent::Toast("saved".into()))?;
    let _ = authority.dispatch(Intent::Toast("synced".into()))?;
    authority.settled().await;

    println!("== settings");
    let home_screen = home.lock().clone();
    if let Some(state) = home_screen.as_ref().and_then(|screen| screen.state()) {
        state.open_settings.fire(());
    }
    authority.settled().await;
    println!("{}", authority.debug_tree());

    println!("== back");
    authority.dispatch(Intent::Back)?.await?;
    authority.dispatch(Intent::Back)?.await?;
    println!("{}", authority.debug_tree());

    println!("== shutdown");
    authority.shutdown().await?;
    Ok(())
}
